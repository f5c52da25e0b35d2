//! Manifest-scraping strategy.
//!
//! Fetches the platform's page or config endpoint directly, extracts an
//! embedded HLS manifest URL, and streams the best variant's first media
//! segment to disk. Format-version sensitive by nature; used as a late
//! fallback only.

use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;
use url::Url;

use vgist_models::{Platform, VideoReference};

use crate::error::StrategyError;
use crate::evasion::DEFAULT_IDENTITY;
use crate::net::{classify_status, stream_to_file};
use crate::strategy::{part_path, AcquireStrategy};

static HLS_MANIFEST_RE: OnceLock<Regex> = OnceLock::new();

pub struct ManifestScrapeStrategy {
    client: reqwest::Client,
    budget: Duration,
}

impl ManifestScrapeStrategy {
    pub fn new(client: reqwest::Client, budget: Duration) -> Self {
        Self { client, budget }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, StrategyError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, DEFAULT_IDENTITY.user_agent)
            .send()
            .await
            .map_err(StrategyError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        response.text().await.map_err(StrategyError::from)
    }

    /// Locate the HLS manifest URL for the reference's platform.
    async fn manifest_url(&self, reference: &VideoReference) -> Result<String, StrategyError> {
        let video_id = reference
            .video_id
            .as_deref()
            .ok_or(StrategyError::NotApplicable)?;

        let found = match reference.platform {
            Platform::YouTube => {
                let html = self.fetch_text(&reference.canonical_url).await?;
                extract_hls_manifest_url(&html)
            }
            Platform::Vimeo => {
                let config = self
                    .fetch_text(&format!("https://player.vimeo.com/video/{video_id}/config"))
                    .await?;
                serde_json::from_str::<serde_json::Value>(&config)
                    .ok()
                    .as_ref()
                    .and_then(vimeo_hls_url)
            }
            Platform::Dailymotion => {
                let metadata = self
                    .fetch_text(&format!(
                        "https://www.dailymotion.com/player/metadata/video/{video_id}"
                    ))
                    .await?;
                serde_json::from_str::<serde_json::Value>(&metadata)
                    .ok()
                    .as_ref()
                    .and_then(dailymotion_hls_url)
            }
            Platform::Direct | Platform::Unknown => return Err(StrategyError::NotApplicable),
        };

        found.ok_or_else(|| StrategyError::no_stream("no embedded manifest URL found"))
    }
}

#[async_trait]
impl AcquireStrategy for ManifestScrapeStrategy {
    fn name(&self) -> &'static str {
        "manifest_scrape"
    }

    fn supports(&self, reference: &VideoReference) -> bool {
        reference.platform.is_hosted()
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn attempt(
        &self,
        reference: &VideoReference,
        dest: &Path,
    ) -> Result<PathBuf, StrategyError> {
        let manifest_url = self.manifest_url(reference).await?;
        debug!(url = %manifest_url, "Found embedded manifest");

        let manifest = self.fetch_text(&manifest_url).await?;

        let playlist_url = if is_master_playlist(&manifest) {
            let variant = best_variant(&manifest)
                .ok_or_else(|| StrategyError::no_stream("master playlist had no variants"))?;
            resolve(&manifest_url, &variant)?
        } else {
            manifest_url.clone()
        };

        let playlist = if playlist_url == manifest_url {
            manifest
        } else {
            self.fetch_text(&playlist_url).await?
        };

        let segment = first_segment(&playlist)
            .ok_or_else(|| StrategyError::no_stream("media playlist had no segments"))?;
        let segment_url = resolve(&playlist_url, segment)?;

        debug!(url = %segment_url, "Streaming manifest media segment");

        let part = part_path(dest, self.name());
        stream_to_file(
            self.client
                .get(&segment_url)
                .header(reqwest::header::USER_AGENT, DEFAULT_IDENTITY.user_agent),
            &part,
            dest,
        )
        .await
    }
}

/// Pull `hlsManifestUrl` out of a watch-page HTML blob.
fn extract_hls_manifest_url(html: &str) -> Option<String> {
    let re = HLS_MANIFEST_RE
        .get_or_init(|| Regex::new(r#""hlsManifestUrl"\s*:\s*"([^"]+)""#).expect("static regex"));

    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().replace("\\/", "/").replace("\\u0026", "&"))
}

/// First CDN URL from a Vimeo player config document.
fn vimeo_hls_url(config: &serde_json::Value) -> Option<String> {
    config["request"]["files"]["hls"]["cdns"]
        .as_object()?
        .values()
        .find_map(|cdn| cdn["url"].as_str())
        .map(String::from)
}

/// Auto-quality HLS URL from Dailymotion player metadata.
fn dailymotion_hls_url(metadata: &serde_json::Value) -> Option<String> {
    metadata["qualities"]["auto"][0]["url"]
        .as_str()
        .map(String::from)
}

fn is_master_playlist(manifest: &str) -> bool {
    manifest.contains("#EXT-X-STREAM-INF")
}

/// Highest-bandwidth variant URI from a master playlist.
fn best_variant(manifest: &str) -> Option<String> {
    let mut best: Option<(u64, String)> = None;
    let mut pending_bandwidth: Option<u64> = None;

    for line in manifest.lines().map(str::trim) {
        if line.starts_with("#EXT-X-STREAM-INF") {
            pending_bandwidth = line
                .split("BANDWIDTH=")
                .nth(1)
                .map(|rest| rest.chars().take_while(|c| c.is_ascii_digit()).collect())
                .and_then(|digits: String| digits.parse().ok());
        } else if !line.is_empty() && !line.starts_with('#') {
            if let Some(bandwidth) = pending_bandwidth.take() {
                if best.as_ref().map(|(b, _)| bandwidth > *b).unwrap_or(true) {
                    best = Some((bandwidth, line.to_string()));
                }
            }
        }
    }

    best.map(|(_, uri)| uri)
}

/// First media segment URI from a media playlist.
fn first_segment(playlist: &str) -> Option<&str> {
    playlist
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'))
}

/// Resolve a possibly-relative playlist URI against its manifest URL.
fn resolve(base: &str, uri: &str) -> Result<String, StrategyError> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return Ok(uri.to_string());
    }

    Url::parse(base)
        .and_then(|b| b.join(uri))
        .map(|u| u.to_string())
        .map_err(|e| StrategyError::no_stream(format!("bad manifest URI: {e}")))
}
