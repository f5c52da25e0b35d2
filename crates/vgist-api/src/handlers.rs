//! HTTP handlers.
//!
//! JSON field names are camelCase on the wire, matching what the browser
//! extension sends.

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vgist_models::{classify, JobId, VideoDigest};

use crate::cache::DigestCache;
use crate::error::{ApiError, ApiResult};
use crate::groq::{chat_system_prompt, ChatMessage};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(rename = "pageUrl")]
    pub page_url: String,
    #[serde(rename = "pageTitle", default)]
    pub page_title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    #[serde(rename = "videoTitle")]
    pub video_title: String,
    #[serde(rename = "videoSource")]
    pub video_source: String,
    pub summary: String,
    pub transcript: String,
}

impl ProcessResponse {
    fn from_digest(digest: &VideoDigest, fallback_title: &str) -> Self {
        Self {
            video_title: if digest.title.is_empty() {
                fallback_title.to_string()
            } else {
                digest.title.clone()
            },
            video_source: digest.platform.display_name().to_string(),
            summary: digest.summary.clone(),
            transcript: digest.transcript.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NoVideoResponse {
    #[serde(rename = "noVideo")]
    pub no_video: bool,
    pub message: String,
}

/// Process a page URL into a digest.
pub async fn process_video(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> ApiResult<Response> {
    let page_url = request.page_url.trim();
    if page_url.is_empty() {
        return Err(ApiError::bad_request("No page URL provided"));
    }
    let page_title = request
        .page_title
        .as_deref()
        .unwrap_or("Unknown Title")
        .to_string();

    let reference = classify(page_url);
    if reference.is_unknown() {
        info!(url = page_url, "No supported video found");
        return Ok(Json(NoVideoResponse {
            no_video: true,
            message: "No supported video found on this page".to_string(),
        })
        .into_response());
    }

    let cache_key = DigestCache::key(&reference);
    if let Some(cached) = state.cache.get(&cache_key).await {
        return Ok(Json(ProcessResponse::from_digest(&cached, &page_title)).into_response());
    }

    let job_id = JobId::new();
    let outcome = state.driver.process(&reference, &page_title, &job_id).await?;

    if let Err(e) = state.cache.put(&cache_key, &outcome.digest).await {
        warn!(key = cache_key.as_str(), error = %e, "Failed to cache digest");
    }

    Ok(Json(ProcessResponse::from_digest(&outcome.digest, &page_title)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(rename = "chatHistory", default)]
    pub chat_history: Vec<ChatMessage>,
    #[serde(rename = "videoData")]
    pub video_data: ChatVideoData,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatVideoData {
    #[serde(rename = "videoTitle", default)]
    pub video_title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatAnswer {
    pub response: String,
}

/// Answer a follow-up question about an already-processed video.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<Json<ChatAnswer>> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("Missing required data"));
    }

    let system = chat_system_prompt(
        request.video_data.video_title.as_deref().unwrap_or("Unknown"),
        request
            .video_data
            .summary
            .as_deref()
            .unwrap_or("No summary available"),
    );

    let mut messages = vec![ChatMessage::system(system)];
    messages.extend(request.chat_history);
    messages.push(ChatMessage::user(request.message));

    let answer = state.groq.chat(&messages, 0.7, 1024).await?;
    Ok(Json(ChatAnswer { response: answer }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_request_wire_names() {
        let request: ProcessRequest = serde_json::from_str(
            r#"{"pageUrl":"https://youtu.be/dQw4w9WgXcQ","pageTitle":"A talk"}"#,
        )
        .unwrap();
        assert_eq!(request.page_url, "https://youtu.be/dQw4w9WgXcQ");
        assert_eq!(request.page_title.as_deref(), Some("A talk"));

        // pageTitle is optional
        let request: ProcessRequest =
            serde_json::from_str(r#"{"pageUrl":"https://example.com"}"#).unwrap();
        assert!(request.page_title.is_none());
    }

    #[test]
    fn test_no_video_response_shape() {
        let json = serde_json::to_value(NoVideoResponse {
            no_video: true,
            message: "nothing here".to_string(),
        })
        .unwrap();
        assert_eq!(json["noVideo"], true);
        assert_eq!(json["message"], "nothing here");
    }

    #[test]
    fn test_process_response_shape() {
        let digest = VideoDigest {
            title: "Title".to_string(),
            platform: vgist_models::Platform::YouTube,
            summary: "s".to_string(),
            transcript: "t".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(ProcessResponse::from_digest(&digest, "fallback")).unwrap();
        assert_eq!(json["videoTitle"], "Title");
        assert_eq!(json["videoSource"], "YouTube");
    }

    #[test]
    fn test_chat_request_defaults() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"message":"what is this about?","videoData":{"videoTitle":"T"}}"#,
        )
        .unwrap();
        assert!(request.chat_history.is_empty());
        assert_eq!(request.video_data.video_title.as_deref(), Some("T"));
    }
}
