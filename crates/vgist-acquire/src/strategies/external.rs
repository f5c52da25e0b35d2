//! External downloader strategy (`yt-dlp` subprocess).
//!
//! Iterates over impersonation profiles until one succeeds. The stealth
//! variant additionally injects referer/origin/language headers and paced
//! request intervals.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use vgist_models::{Platform, VideoReference};

use crate::error::StrategyError;
use crate::evasion::{DelayPolicy, Identity, IdentityProvider};
use crate::strategy::{part_path, AcquireStrategy};

/// Prefer a progressive mp4, fall back to the best muxable pair.
const FORMAT_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Impersonation profiles tried per attempt.
const PROFILE_ATTEMPTS: usize = 3;

pub struct ExternalDownloaderStrategy {
    identities: Arc<dyn IdentityProvider>,
    delays: Arc<dyn DelayPolicy>,
    budget: Duration,
    stealth: bool,
}

impl ExternalDownloaderStrategy {
    pub fn new(
        identities: Arc<dyn IdentityProvider>,
        delays: Arc<dyn DelayPolicy>,
        budget: Duration,
    ) -> Self {
        Self {
            identities,
            delays,
            budget,
            stealth: false,
        }
    }

    /// Upgrade to the stealth variant (headers + pacing).
    pub fn stealth(mut self) -> Self {
        self.stealth = true;
        self
    }
}

#[async_trait]
impl AcquireStrategy for ExternalDownloaderStrategy {
    fn name(&self) -> &'static str {
        if self.stealth {
            "external_downloader_stealth"
        } else {
            "external_downloader"
        }
    }

    fn supports(&self, reference: &VideoReference) -> bool {
        reference.platform != Platform::Unknown
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn attempt(
        &self,
        reference: &VideoReference,
        dest: &Path,
    ) -> Result<PathBuf, StrategyError> {
        if which::which("yt-dlp").is_err() {
            return Err(StrategyError::no_stream("yt-dlp not found in PATH"));
        }

        let part = part_path(dest, self.name());
        let mut last = StrategyError::no_stream("no impersonation profile succeeded");

        for profile in 0..PROFILE_ATTEMPTS {
            if profile > 0 {
                self.delays.pause().await;
                let _ = tokio::fs::remove_file(&part).await;
            }

            let identity = self.identities.next_identity();
            let args = build_args(
                &reference.canonical_url,
                &part.to_string_lossy(),
                &identity,
                self.stealth,
                reference.platform,
            );

            debug!(
                url = %reference.canonical_url,
                impersonation = identity.impersonation,
                stealth = self.stealth,
                "Running yt-dlp"
            );

            let output = Command::new("yt-dlp")
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output()
                .await?;

            if output.status.success() && part.exists() {
                tokio::fs::rename(&part, dest).await?;
                return Ok(dest.to_path_buf());
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            last = classify_stderr(&stderr);
            warn!(
                url = %reference.canonical_url,
                impersonation = identity.impersonation,
                error = %last,
                "yt-dlp profile failed"
            );
        }

        Err(last)
    }
}

/// Build the yt-dlp argument list for one impersonation profile.
fn build_args(
    url: &str,
    output: &str,
    identity: &Identity,
    stealth: bool,
    platform: Platform,
) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "--no-playlist".into(),
        "--impersonate".into(),
        identity.impersonation.into(),
        "--user-agent".into(),
        identity.user_agent.into(),
        "-f".into(),
        FORMAT_SELECTOR.into(),
        "-o".into(),
        output.into(),
    ];

    if stealth {
        args.push("--add-header".into());
        args.push(format!("Accept-Language:{}", identity.accept_language));

        if let Some(origin) = platform_origin(platform) {
            args.push("--add-header".into());
            args.push(format!("Referer:{origin}/"));
            args.push("--add-header".into());
            args.push(format!("Origin:{origin}"));
        }

        // Paced request intervals, kept well under the strategy budget.
        args.extend(
            [
                "--sleep-requests",
                "0.75",
                "--sleep-interval",
                "1",
                "--max-sleep-interval",
                "3",
                "--limit-rate",
                "2M",
                "--concurrent-fragments",
                "1",
            ]
            .map(String::from),
        );
    }

    args.push(url.into());
    args
}

fn platform_origin(platform: Platform) -> Option<&'static str> {
    match platform {
        Platform::YouTube => Some("https://www.youtube.com"),
        Platform::Vimeo => Some("https://vimeo.com"),
        Platform::Dailymotion => Some("https://www.dailymotion.com"),
        Platform::Direct | Platform::Unknown => None,
    }
}

/// Map yt-dlp stderr onto the failure taxonomy.
fn classify_stderr(stderr: &str) -> StrategyError {
    let message = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("Unknown error")
        .to_string();

    let rate_limited = stderr.contains("429")
        || stderr.contains("Too Many Requests")
        || stderr.contains("rate limit")
        || stderr.contains("Sign in to confirm");

    if rate_limited {
        StrategyError::blocked(message)
    } else if stderr.contains("Unsupported URL")
        || stderr.contains("No video formats")
        || stderr.contains("Video unavailable")
    {
        StrategyError::no_stream(message)
    } else {
        StrategyError::transient(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evasion::DEFAULT_IDENTITY;

    #[test]
    fn test_basic_args() {
        let args = build_args(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "/tmp/j.external_downloader.mp4",
            &DEFAULT_IDENTITY,
            false,
            Platform::YouTube,
        );

        assert!(args.contains(&"--impersonate".to_string()));
        assert!(args.contains(&FORMAT_SELECTOR.to_string()));
        assert!(!args.iter().any(|a| a.starts_with("Referer:")));
        assert!(!args.contains(&"--sleep-requests".to_string()));
        assert_eq!(
            args.last().unwrap(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_stealth_args_add_headers_and_pacing() {
        let args = build_args(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "/tmp/j.external_downloader_stealth.mp4",
            &DEFAULT_IDENTITY,
            true,
            Platform::YouTube,
        );

        assert!(args.contains(&"Referer:https://www.youtube.com/".to_string()));
        assert!(args.contains(&"Origin:https://www.youtube.com".to_string()));
        assert!(args
            .iter()
            .any(|a| a.starts_with("Accept-Language:")));
        assert!(args.contains(&"--sleep-requests".to_string()));
        assert!(args.contains(&"--limit-rate".to_string()));
    }

    #[test]
    fn test_stderr_classification() {
        assert!(matches!(
            classify_stderr("ERROR: HTTP Error 429: Too Many Requests"),
            StrategyError::BlockedOrRateLimited(_)
        ));
        assert!(matches!(
            classify_stderr("ERROR: Sign in to confirm you're not a bot"),
            StrategyError::BlockedOrRateLimited(_)
        ));
        assert!(matches!(
            classify_stderr("ERROR: Unsupported URL: https://example.com"),
            StrategyError::NoStreamFound(_)
        ));
        assert!(matches!(
            classify_stderr("ERROR: unable to connect"),
            StrategyError::TransientNetwork(_)
        ));
    }
}
