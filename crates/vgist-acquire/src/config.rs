//! Acquisition configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Where this service is running, from the perspective of bot detection.
///
/// Threaded explicitly into the orchestrator at construction; core logic
/// never reads ambient process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    /// Shared hosting suspected of being easily bot-detected: front-load the
    /// indirect strategies (mirror proxies, manifest scraping).
    Hosted,
    /// Trusted network (local/dedicated): front-load the platform client and
    /// the external downloader.
    Trusted,
}

/// Acquisition configuration.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    pub environment: RuntimeEnvironment,
    /// Directory for downloaded media, keyed by job id.
    pub work_dir: PathBuf,
    /// Maximum strategies raced concurrently for platform URLs.
    pub max_concurrent: usize,
    /// Per-strategy budgets.
    pub mirror_timeout: Duration,
    pub manifest_timeout: Duration,
    pub platform_timeout: Duration,
    pub external_timeout: Duration,
    pub direct_timeout: Duration,
    /// Mirror instance base URLs, tried in randomized order.
    pub mirror_instances: Vec<String>,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::Trusted,
            work_dir: PathBuf::from("/tmp/vgist/uploads"),
            max_concurrent: 3,
            mirror_timeout: Duration::from_secs(10),
            manifest_timeout: Duration::from_secs(10),
            platform_timeout: Duration::from_secs(25),
            external_timeout: Duration::from_secs(40),
            direct_timeout: Duration::from_secs(60),
            mirror_instances: default_mirror_instances(),
        }
    }
}

impl AcquireConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            environment: match std::env::var("ACQUIRE_ENVIRONMENT").as_deref() {
                Ok("hosted") => RuntimeEnvironment::Hosted,
                Ok("trusted") => RuntimeEnvironment::Trusted,
                _ => defaults.environment,
            },
            work_dir: std::env::var("ACQUIRE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_concurrent: std::env::var("ACQUIRE_MAX_CONCURRENT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent),
            mirror_timeout: env_secs("ACQUIRE_MIRROR_TIMEOUT_SECS", defaults.mirror_timeout),
            manifest_timeout: env_secs("ACQUIRE_MANIFEST_TIMEOUT_SECS", defaults.manifest_timeout),
            platform_timeout: env_secs("ACQUIRE_PLATFORM_TIMEOUT_SECS", defaults.platform_timeout),
            external_timeout: env_secs("ACQUIRE_EXTERNAL_TIMEOUT_SECS", defaults.external_timeout),
            direct_timeout: env_secs("ACQUIRE_DIRECT_TIMEOUT_SECS", defaults.direct_timeout),
            mirror_instances: std::env::var("ACQUIRE_MIRROR_INSTANCES")
                .map(|s| {
                    s.split(',')
                        .map(|i| i.trim().trim_end_matches('/').to_string())
                        .filter(|i| !i.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.mirror_instances),
        }
    }
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Mirror instances churn; this list is a fallback for deployments that
/// don't configure their own.
fn default_mirror_instances() -> Vec<String> {
    vec![
        "https://inv.nadeko.net".to_string(),
        "https://yewtu.be".to_string(),
        "https://invidious.nerdvpn.de".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AcquireConfig::default();
        assert_eq!(config.environment, RuntimeEnvironment::Trusted);
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.mirror_timeout, Duration::from_secs(10));
        assert_eq!(config.external_timeout, Duration::from_secs(40));
        assert!(!config.mirror_instances.is_empty());
    }
}
