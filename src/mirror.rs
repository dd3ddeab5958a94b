use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::error::HarvestError;
use crate::model::Record;
use crate::store::RecordStore;

/// One pretty-printed JSON file per profile, named after the escaped name.
pub struct JsonMirror {
    dir: PathBuf,
}

impl JsonMirror {
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(name)))
    }

    fn read(path: &Path) -> Result<Record> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
    }

    fn write(&self, record: &Record) -> Result<()> {
        let path = self.path_for(&record.name);
        let mut record = record.clone();
        if let Ok(prior) = Self::read(&path) {
            record.created_at = prior.created_at;
            if record.updated_at < record.created_at {
                record.updated_at = record.created_at;
            }
        }
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Every `*.json` file in the directory. Unreadable files are skipped.
    pub fn read_all(&self) -> Result<Vec<Record>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut records = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::read(&path) {
                Ok(r) => records.push(r),
                Err(e) => warn!("Skipping {}: {:#}", path.display(), e),
            }
        }
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }
}

impl RecordStore for JsonMirror {
    fn label(&self) -> &'static str {
        "json"
    }

    fn upsert(&mut self, record: &Record) -> crate::error::Result<()> {
        self.write(record).map_err(HarvestError::persistence)
    }

    fn load_all(&self) -> crate::error::Result<Vec<Record>> {
        self.read_all().map_err(HarvestError::persistence)
    }
}
