//! Platform player-API stream resolution.
//!
//! Resolves streams through the platform's innertube player endpoint:
//! progressive (audio+video) formats first, sorted by descending resolution,
//! falling back to the best adaptive video-only format. The stealth variant
//! rotates the presented player client and user-agent per attempt and adds
//! randomized pre-request delays.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use vgist_models::{Platform, VideoReference};

use crate::error::StrategyError;
use crate::evasion::{DelayPolicy, Identity, IdentityProvider, DEFAULT_IDENTITY};
use crate::net::{classify_status, stream_to_file};
use crate::strategy::{part_path, AcquireStrategy};

const PLAYER_ENDPOINT: &str = "https://www.youtube.com/youtubei/v1/player";

pub struct PlatformClientStrategy {
    client: reqwest::Client,
    budget: Duration,
    evasion: Option<(Arc<dyn IdentityProvider>, Arc<dyn DelayPolicy>)>,
}

impl PlatformClientStrategy {
    pub fn new(client: reqwest::Client, budget: Duration) -> Self {
        Self {
            client,
            budget,
            evasion: None,
        }
    }

    /// Upgrade to the stealth variant.
    pub fn with_evasion(
        mut self,
        identities: Arc<dyn IdentityProvider>,
        delays: Arc<dyn DelayPolicy>,
    ) -> Self {
        self.evasion = Some((identities, delays));
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerRequest<'a> {
    video_id: &'a str,
    context: PlayerContext,
}

#[derive(Debug, Serialize)]
struct PlayerContext {
    client: PlayerClient,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerClient {
    client_name: &'static str,
    client_version: &'static str,
}

fn client_version(player_client: &str) -> &'static str {
    match player_client {
        "ANDROID" => "19.09.37",
        "IOS" => "19.09.3",
        _ => "2.20240401.00.00",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    streaming_data: Option<StreamingData>,
    playability_status: Option<PlayabilityStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StreamingData {
    #[serde(default)]
    pub(crate) formats: Vec<StreamFormat>,
    #[serde(default)]
    pub(crate) adaptive_formats: Vec<StreamFormat>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StreamFormat {
    pub(crate) url: Option<String>,
    pub(crate) mime_type: Option<String>,
    pub(crate) height: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayabilityStatus {
    status: Option<String>,
    reason: Option<String>,
}

/// Pick the best stream: progressive by descending height, else the best
/// adaptive video-only format. Formats without a plain URL (ciphered) are
/// unusable here and skipped.
pub(crate) fn select_stream(data: &StreamingData) -> Option<&StreamFormat> {
    best_of(&data.formats, false).or_else(|| best_of(&data.adaptive_formats, true))
}

fn best_of(formats: &[StreamFormat], video_only: bool) -> Option<&StreamFormat> {
    formats
        .iter()
        .filter(|f| f.url.is_some())
        .filter(|f| {
            !video_only
                || f.mime_type
                    .as_deref()
                    .is_some_and(|m| m.starts_with("video/"))
        })
        .max_by_key(|f| f.height.unwrap_or(0))
}

#[async_trait]
impl AcquireStrategy for PlatformClientStrategy {
    fn name(&self) -> &'static str {
        if self.evasion.is_some() {
            "platform_client_stealth"
        } else {
            "platform_client"
        }
    }

    fn supports(&self, reference: &VideoReference) -> bool {
        reference.platform == Platform::YouTube
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

        let identity: Identity = match &self.evasion {
            Some((identities, delays)) => {
                delays.pause().await;
                identities.next_identity()
            }
            None => DEFAULT_IDENTITY,
        };

        debug!(
            video_id = video_id,
            player_client = identity.player_client,
            "Resolving streams via player API"
        );

        let request = PlayerRequest {
            video_id,
            context: PlayerContext {
                client: PlayerClient {
                    client_name: identity.player_client,
                    client_version: client_version(identity.player_client),
                },
            },
        };

        let response = self
            .client
            .post(PLAYER_ENDPOINT)
            .header(reqwest::header::USER_AGENT, identity.user_agent)
            .json(&request)
            .send()
            .await
            .map_err(StrategyError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let player: PlayerResponse = response.json().await.map_err(StrategyError::from)?;

        if let Some(playability) = &player.playability_status {
            match playability.status.as_deref() {
                Some("OK") | None => {}
                Some("LOGIN_REQUIRED") => {
                    return Err(StrategyError::blocked(
                        playability
                            .reason
                            .clone()
                            .unwrap_or_else(|| "login required".to_string()),
                    ))
                }
                Some(other) => {
                    return Err(StrategyError::no_stream(format!(
                        "playability {}: {}",
                        other,
                        playability.reason.as_deref().unwrap_or("no reason given")
                    )))
                }
            }
        }

        let streaming = player
            .streaming_data
            .ok_or_else(|| StrategyError::no_stream("player response had no streaming data"))?;

        let stream = select_stream(&streaming)
            .ok_or_else(|| StrategyError::no_stream("no usable progressive or adaptive format"))?;
        let url = stream.url.as_deref().unwrap_or_default();

        debug!(
            height = stream.height.unwrap_or(0),
            "Downloading resolved stream"
        );

        let part = part_path(dest, self.name());
        stream_to_file(
            self.client
                .get(url)
                .header(reqwest::header::USER_AGENT, identity.user_agent),
            &part,
            dest,
        )
        .await
    }
}
