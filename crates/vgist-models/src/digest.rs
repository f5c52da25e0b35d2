//! Finished digest records.
//!
//! A [`VideoDigest`] is the durable outcome of one processing job: the video
//! title, transcript and AI summary. It is what the on-disk cache stores and
//! what the API returns to the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Cached result of a completed processing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoDigest {
    pub title: String,
    pub platform: Platform,
    pub summary: String,
    pub transcript: String,
    pub created_at: DateTime<Utc>,
}

/// OCR text for one sampled frame, persisted alongside the digest.
///
/// Rasters are never persisted; only the extracted text survives the job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameText {
    pub frame_id: usize,
    /// Seconds from the start of the video.
    pub timestamp: f64,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_round_trip() {
        let digest = VideoDigest {
            title: "A talk".to_string(),
            platform: Platform::YouTube,
            summary: "## Summary".to_string(),
            transcript: "hello".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&digest).unwrap();
        let back: VideoDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.title, digest.title);
        assert_eq!(back.platform, Platform::YouTube);
    }

    #[test]
    fn test_platform_serializes_lowercase() {
        let json = serde_json::to_string(&Platform::YouTube).unwrap();
        assert_eq!(json, "\"youtube\"");
    }
}
