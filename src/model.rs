use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// One harvested profile. Field names are the interchange shape shared by the
/// JSON mirror and the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub verdict: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the extractor starts from: where the page came from and which numeric
/// id was fetched. The id never leaves the seed.
#[derive(Debug, Clone)]
pub struct Seed {
    pub url: String,
    pub fetch_id: u32,
}

impl Seed {
    pub fn new(base_url: &str, fetch_id: u32) -> Self {
        Self {
            url: profile_url(base_url, fetch_id),
            fetch_id,
        }
    }

    /// Identity used when the page yields no name.
    pub fn placeholder(&self) -> String {
        synthetic_identity(self.fetch_id)
    }
}

pub fn profile_url(base_url: &str, id: u32) -> String {
    format!("{}/profile.jsp?ID={}", base_url.trim_end_matches('/'), id)
}

pub fn synthetic_identity(id: u32) -> String {
    format!("Profile {}", id)
}

/// Current time at the second precision stored on records.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

impl Record {
    /// Empty record for a seed; extraction fills it in.
    pub fn from_seed(seed: &Seed) -> Self {
        let ts = now();
        Record {
            name: String::new(),
            url: seed.url.clone(),
            verdict: String::new(),
            description: String::new(),
            pros: Vec::new(),
            cons: Vec::new(),
            score: 0.0,
            category: String::new(),
            image_url: String::new(),
            created_at: ts,
            updated_at: ts,
        }
    }

    /// The fields whose change marks a stored record as updated.
    pub fn differs_from(&self, other: &Record) -> bool {
        self.verdict != other.verdict
            || self.description != other.description
            || self.pros.len() != other.pros.len()
            || self.cons.len() != other.cons.len()
    }
}
