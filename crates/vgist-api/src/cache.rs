//! Keyed on-disk cache of finished digests.
//!
//! One JSON file per processed video, keyed by platform + video id (or a
//! URL hash for direct media). Corrupt or unreadable entries are treated as
//! misses.

use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tracing::{debug, warn};

use vgist_models::{VideoDigest, VideoReference};

use crate::error::ApiResult;

/// On-disk digest cache.
#[derive(Debug, Clone)]
pub struct DigestCache {
    dir: PathBuf,
}

impl DigestCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache key for a classified reference: `platform_videoid` for hosted
    /// platforms, `platform_urlhash` otherwise.
    pub fn key(reference: &VideoReference) -> String {
        match &reference.video_id {
            Some(id) => format!("{}_{}", reference.platform, id),
            None => {
                let digest = Sha256::digest(reference.raw_url.as_bytes());
                let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
                format!("{}_{}", reference.platform, hex)
            }
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Look up a cached digest. Any read or parse failure is a miss.
    pub async fn get(&self, key: &str) -> Option<VideoDigest> {
        let path = self.entry_path(key);
        let bytes = tokio::fs::read(&path).await.ok()?;

        match serde_json::from_slice(&bytes) {
            Ok(digest) => {
                debug!(key = key, "Cache hit");
                Some(digest)
            }
            Err(e) => {
                warn!(key = key, error = %e, "Corrupt cache entry, ignoring");
                None
            }
        }
    }

    /// Store a digest. Written to a temp file and renamed so readers never
    /// observe a partial entry.
    pub async fn put(&self, key: &str, digest: &VideoDigest) -> ApiResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.entry_path(key);
        let tmp = path.with_extension("json.tmp");

        let bytes = serde_json::to_vec_pretty(digest)
            .map_err(|e| crate::error::ApiError::internal(e.to_string()))?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(key = key, path = %path.display(), "Cached digest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;
    use vgist_models::{classify, Platform};

    fn digest() -> VideoDigest {
        VideoDigest {
            title: "A talk".to_string(),
            platform: Platform::YouTube,
            summary: "## Summary".to_string(),
            transcript: "hello world".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_hosted_key_uses_platform_and_id() {
        let reference = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(DigestCache::key(&reference), "youtube_dQw4w9WgXcQ");
    }

    #[test]
    fn test_direct_key_hashes_url() {
        let reference = classify("https://example.com/clip.mp4");
        let key = DigestCache::key(&reference);
        assert!(key.starts_with("direct_"));
        // Hash is stable
        assert_eq!(key, DigestCache::key(&reference));
        // Different URL, different key
        let other = classify("https://example.com/other.mp4");
        assert_ne!(key, DigestCache::key(&other));
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let cache = DigestCache::new(dir.path());

        assert!(cache.get("youtube_abc").await.is_none());

        cache.put("youtube_abc", &digest()).await.unwrap();
        let loaded = cache.get("youtube_abc").await.unwrap();
        assert_eq!(loaded.title, "A talk");
        assert_eq!(loaded.transcript, "hello world");
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = DigestCache::new(dir.path());

        tokio::fs::write(dir.path().join("bad.json"), b"{not json")
            .await
            .unwrap();
        assert!(cache.get("bad").await.is_none());
    }
}
