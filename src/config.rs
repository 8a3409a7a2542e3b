use crate::error::{Result, WordcastError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 41:01:51 of narrated content.
pub const DEFAULT_TOTAL_CONTENT_SECS: f64 = (41 * 3600 + 60 + 51) as f64;

/// 23:59:50, leaving ten seconds of silence before the midnight restart.
pub const DEFAULT_SYNC_SECS: f64 = (24 * 3600 - 10) as f64;

pub const DEFAULT_TOTAL_CHUNKS: usize = 798;

const SECONDS_PER_DAY: f64 = 24.0 * 3600.0;

/// Upper bound on chunk-load retries.
pub const MAX_CHUNK_RETRIES: u32 = 16;

/// What to do with a speech-mark line that does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinePolicy {
    /// Fail the whole resource.
    #[default]
    Strict,
    /// Drop the line with a warning.
    Skip,
}

impl std::fmt::Display for LinePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinePolicy::Strict => write!(f, "strict"),
            LinePolicy::Skip => write!(f, "skip"),
        }
    }
}

impl std::str::FromStr for LinePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(LinePolicy::Strict),
            "skip" => Ok(LinePolicy::Skip),
            _ => Err(format!("Unknown line policy: {}. Use 'strict' or 'skip'", s)),
        }
    }
}

/// Whether a hyphenated fragment survives a chunk boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HyphenPolicy {
    /// Keep the pending fragment and join it with the next chunk's first word.
    #[default]
    Carry,
    /// Discard the pending fragment when a new chunk loads.
    Drop,
}

impl std::fmt::Display for HyphenPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HyphenPolicy::Carry => write!(f, "carry"),
            HyphenPolicy::Drop => write!(f, "drop"),
        }
    }
}

impl std::str::FromStr for HyphenPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "carry" => Ok(HyphenPolicy::Carry),
            "drop" => Ok(HyphenPolicy::Drop),
            _ => Err(format!("Unknown hyphen policy: {}. Use 'carry' or 'drop'", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory or base URL holding the speech-mark and audio assets.
    pub asset_root: String,
    /// Speech-mark file for the single-file player.
    pub marks_file: String,
    /// Audio extension of the chunk files.
    pub audio_extension: String,
    pub total_chunks: usize,
    pub total_content_secs: f64,
    pub sync_secs: f64,
    pub tick_interval_ms: u64,
    pub resync_interval_ms: u64,
    pub loop_pause_secs: u64,
    pub chunk_retries: u32,
    pub retry_base_delay_ms: u64,
    pub line_policy: LinePolicy,
    pub hyphen_policy: HyphenPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_root: "assets/chunks".to_string(),
            marks_file: "speech_marks_fixed_v3.json".to_string(),
            audio_extension: "mp3".to_string(),
            total_chunks: DEFAULT_TOTAL_CHUNKS,
            total_content_secs: DEFAULT_TOTAL_CONTENT_SECS,
            sync_secs: DEFAULT_SYNC_SECS,
            tick_interval_ms: 16,
            resync_interval_ms: 300_000,
            loop_pause_secs: 20,
            chunk_retries: 3,
            retry_base_delay_ms: 1000,
            line_policy: LinePolicy::default(),
            hyphen_policy: HyphenPolicy::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str::<Config>(&contents)?;
            }
        }

        // Override with environment variables
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        // Asset locations
        if let Ok(root) = std::env::var("WORDCAST_ASSET_ROOT") {
            self.asset_root = root;
        }
        if let Ok(file) = std::env::var("WORDCAST_MARKS_FILE") {
            self.marks_file = file;
        }

        // Program shape; unparseable values are ignored
        if let Ok(chunks) = std::env::var("WORDCAST_TOTAL_CHUNKS") {
            if let Ok(c) = chunks.parse() {
                self.total_chunks = c;
            }
        }
        if let Ok(retries) = std::env::var("WORDCAST_CHUNK_RETRIES") {
            if let Ok(r) = retries.parse() {
                self.chunk_retries = r;
            }
        }

        // Policies
        if let Ok(policy) = std::env::var("WORDCAST_LINE_POLICY") {
            if let Ok(p) = policy.parse() {
                self.line_policy = p;
            }
        }
        if let Ok(policy) = std::env::var("WORDCAST_HYPHEN_POLICY") {
            if let Ok(p) = policy.parse() {
                self.hyphen_policy = p;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.total_chunks == 0 {
            return Err(WordcastError::Config(
                "total_chunks must be greater than 0".to_string(),
            ));
        }
        if !(self.total_content_secs > 0.0) {
            return Err(WordcastError::Config(
                "total_content_secs must be positive".to_string(),
            ));
        }
        if !(self.sync_secs > 0.0) || self.sync_secs > SECONDS_PER_DAY {
            return Err(WordcastError::Config(format!(
                "sync_secs must be in (0, {}]",
                SECONDS_PER_DAY
            )));
        }
        if self.chunk_retries > MAX_CHUNK_RETRIES {
            return Err(WordcastError::Config(format!(
                "chunk_retries must be at most {}",
                MAX_CHUNK_RETRIES
            )));
        }
        if self.tick_interval_ms == 0 {
            return Err(WordcastError::Config(
                "tick_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Playback rate that compresses the whole program into the sync window.
    pub fn base_speed(&self) -> f64 {
        self.total_content_secs / self.sync_secs
    }

    pub fn average_chunk_secs(&self) -> f64 {
        self.total_content_secs / self.total_chunks as f64
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_millis(self.resync_interval_ms)
    }

    pub fn loop_pause(&self) -> Duration {
        Duration::from_secs(self.loop_pause_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("wordcast").join("config.toml"))
    }
}
