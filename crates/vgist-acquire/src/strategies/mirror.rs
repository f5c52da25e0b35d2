//! Mirror-proxy strategy.
//!
//! Third-party mirror instances re-expose platform video metadata through
//! their own JSON APIs, acting as an indirection layer against direct
//! platform rate limiting. Instances are tried in randomized order until one
//! responds with usable data.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

use vgist_models::{Platform, VideoReference};

use crate::error::StrategyError;
use crate::net::{classify_status, stream_to_file};
use crate::strategy::{part_path, AcquireStrategy};

pub struct MirrorProxyStrategy {
    client: reqwest::Client,
    instances: Vec<String>,
    budget: Duration,
}

impl MirrorProxyStrategy {
    pub fn new(client: reqwest::Client, instances: Vec<String>, budget: Duration) -> Self {
        Self {
            client,
            instances,
            budget,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MirrorVideo {
    #[serde(default)]
    pub(crate) format_streams: Vec<MirrorFormat>,
    #[serde(default)]
    pub(crate) adaptive_formats: Vec<MirrorFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MirrorFormat {
    pub(crate) url: Option<String>,
    pub(crate) quality_label: Option<String>,
    #[serde(rename = "type")]
    pub(crate) mime_type: Option<String>,
}

/// Numeric rank for a declared quality label ("720p" -> 720).
fn quality_rank(format: &MirrorFormat) -> u32 {
    format
        .quality_label
        .as_deref()
        .map(|label| {
            label
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
        })
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0)
}

/// Best declared format: progressive streams by quality, else the best
/// adaptive video format.
pub(crate) fn select_format(video: &MirrorVideo) -> Option<&MirrorFormat> {
    video
        .format_streams
        .iter()
        .filter(|f| f.url.is_some())
        .max_by_key(|f| quality_rank(f))
        .or_else(|| {
            video
                .adaptive_formats
                .iter()
                .filter(|f| f.url.is_some())
                .filter(|f| {
                    f.mime_type
                        .as_deref()
                        .is_some_and(|m| m.starts_with("video/"))
                })
                .max_by_key(|f| quality_rank(f))
        })
}

#[async_trait]
impl AcquireStrategy for MirrorProxyStrategy {
    fn name(&self) -> &'static str {
        "mirror_proxy"
    }

    fn supports(&self, reference: &VideoReference) -> bool {
        reference.platform == Platform::YouTube && !self.instances.is_empty()
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn attempt(
        &self,
        reference: &VideoReference,
        dest: &Path,
    ) -> Result<PathBuf, StrategyError> {
        let video_id = reference
            .video_id
            .as_deref()
            .ok_or(StrategyError::NotApplicable)?;

        let mut order = self.instances.clone();
        order.shuffle(&mut rand::rng());

        let mut last = StrategyError::no_stream("no mirror instance responded with usable data");

        for instance in &order {
            let api_url = format!("{instance}/api/v1/videos/{video_id}");
            debug!(instance = instance.as_str(), "Querying mirror instance");

            let video = match self.fetch_video(&api_url).await {
                Ok(video) => video,
                Err(e) => {
                    warn!(instance = instance.as_str(), error = %e, "Mirror instance failed");
                    last = e;
                    continue;
                }
            };

            let Some(format) = select_format(&video) else {
                last = StrategyError::no_stream(format!("{instance} listed no usable formats"));
                continue;
            };
            let url = format.url.as_deref().unwrap_or_default();

            let part = part_path(dest, self.name());
            match stream_to_file(self.client.get(url), &part, dest).await {
                Ok(path) => return Ok(path),
                Err(e) => {
                    warn!(instance = instance.as_str(), error = %e, "Mirror download failed");
                    last = e;
                }
            }
        }

        Err(last)
    }
}

impl MirrorProxyStrategy {
    async fn fetch_video(&self, api_url: &str) -> Result<MirrorVideo, StrategyError> {
        let response = self
            .client
            .get(api_url)
            .send()
            .await
            .map_err(StrategyError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        response.json().await.map_err(StrategyError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(url: Option<&str>, quality: Option<&str>, mime: &str) -> MirrorFormat {
        MirrorFormat {
            url: url.map(String::from),
            quality_label: quality.map(String::from),
            mime_type: Some(mime.to_string()),
        }
    }

    #[test]
    fn test_progressive_sorted_by_quality_label() {
        let video = MirrorVideo {
            format_streams: vec![
                format(Some("http://m/360"), Some("360p"), "video/mp4"),
                format(Some("http://m/720"), Some("720p"), "video/mp4"),
            ],
            adaptive_formats: vec![],
        };
        assert_eq!(
            select_format(&video).unwrap().url.as_deref(),
            Some("http://m/720")
        );
    }

    #[test]
    fn test_adaptive_fallback() {
        let video = MirrorVideo {
            format_streams: vec![],
            adaptive_formats: vec![
                format(Some("http://m/audio"), None, "audio/webm"),
                format(Some("http://m/1080"), Some("1080p"), "video/mp4"),
            ],
        };
        assert_eq!(
            select_format(&video).unwrap().url.as_deref(),
            Some("http://m/1080")
        );
    }

    #[test]
    fn test_mirror_api_response_parses() {
        let video: MirrorVideo = serde_json::from_str(
            r#"{"formatStreams":[{"url":"http://m/x","qualityLabel":"720p","type":"video/mp4"}],
                "adaptiveFormats":[]}"#,
        )
        .unwrap();
        assert_eq!(video.format_streams.len(), 1);
        assert_eq!(quality_rank(&video.format_streams[0]), 720);
    }

    #[test]
    fn test_no_formats() {
        assert!(select_format(&MirrorVideo::default()).is_none());
    }
}
