use thiserror::Error;

#[derive(Error, Debug)]
pub enum WordcastError {
    #[error("Failed to load {resource}: {reason}")]
    Load { resource: String, reason: String },

    #[error("Malformed record in {resource} at line {line}: {reason}")]
    Parse {
        resource: String,
        line: usize,
        reason: String,
    },

    #[error("Chunk {index} failed to load after {attempts} attempt(s): {reason}")]
    ChunkLoad {
        index: usize,
        attempts: u32,
        reason: String,
    },

    #[error("Playback refused to start: {0}")]
    Autoplay(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

impl WordcastError {
    pub fn load(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        WordcastError::Load {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WordcastError>;
