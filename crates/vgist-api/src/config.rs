//! API configuration.

use std::path::PathBuf;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory for per-job artifacts (transcripts, frame text, summaries)
    pub results_dir: PathBuf,
    /// Directory for cached digests
    pub cache_dir: PathBuf,
    /// Transcription language hint
    pub language: String,
    /// Groq API key; requests needing it fail with a clear error when unset
    pub groq_api_key: Option<String>,
    /// Max request body size
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            results_dir: PathBuf::from("/tmp/vgist/results"),
            cache_dir: PathBuf::from("/tmp/vgist/cache"),
            language: "en".to_string(),
            groq_api_key: None,
            max_body_size: 1024 * 1024, // 1MB of JSON is plenty
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            results_dir: std::env::var("RESULTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.results_dir),
            cache_dir: std::env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            language: std::env::var("TRANSCRIPTION_LANGUAGE").unwrap_or(defaults.language),
            groq_api_key: std::env::var("GROQ_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            max_body_size: std::env::var("API_MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
        }
    }
}
