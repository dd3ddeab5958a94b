use thiserror::Error;

/// Failure kinds seen during a harvest. Only `Initialization` ends a run; the
/// rest are counted and logged per record.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("no identity extracted from {url}")]
    EmptyExtraction { url: String },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("initialization failed: {0}")]
    Initialization(String),
}

impl HarvestError {
    pub fn transport(url: &str, message: impl ToString) -> Self {
        HarvestError::Transport {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    /// Wrap an `anyhow` chain from a store, keeping every context line.
    pub fn persistence(err: anyhow::Error) -> Self {
        HarvestError::Persistence(format!("{:#}", err))
    }

    pub fn init(err: anyhow::Error) -> Self {
        HarvestError::Initialization(format!("{:#}", err))
    }
}

pub type Result<T> = std::result::Result<T, HarvestError>;
