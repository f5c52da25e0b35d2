//! Video platform classification.
//!
//! `classify` turns an arbitrary page URL into a [`VideoReference`] by
//! matching it against platform-specific URL grammars. Classification is
//! pure and total: unrecognized input yields [`Platform::Unknown`] rather
//! than an error.

use serde::{Deserialize, Serialize};
use url::Url;

/// Raw media extensions that mark a URL as directly downloadable.
const DIRECT_EXTENSIONS: [&str; 5] = [".mp4", ".webm", ".ogg", ".mov", ".m4v"];

/// A recognized video hosting platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    YouTube,
    Vimeo,
    Dailymotion,
    /// URL points straight at a media file.
    Direct,
    /// No supported video found at this URL.
    Unknown,
}

impl Platform {
    /// True for platforms with their own id grammar and stream resolution.
    pub fn is_hosted(&self) -> bool {
        matches!(
            self,
            Platform::YouTube | Platform::Vimeo | Platform::Dailymotion
        )
    }

    /// Stable lowercase name, used in cache keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Vimeo => "vimeo",
            Platform::Dailymotion => "dailymotion",
            Platform::Direct => "direct",
            Platform::Unknown => "unknown",
        }
    }

    /// Capitalized display name for API responses.
    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::Vimeo => "Vimeo",
            Platform::Dailymotion => "Dailymotion",
            Platform::Direct => "Direct",
            Platform::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable, classified reference to a video.
///
/// Invariant: `video_id` is present iff the platform is hosted
/// (YouTube/Vimeo/Dailymotion).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoReference {
    /// The URL as submitted by the client.
    pub raw_url: String,
    pub platform: Platform,
    pub video_id: Option<String>,
    /// Normalized URL used for acquisition.
    pub canonical_url: String,
}

impl VideoReference {
    fn hosted(raw_url: &str, platform: Platform, video_id: String, canonical_url: String) -> Self {
        Self {
            raw_url: raw_url.to_string(),
            platform,
            video_id: Some(video_id),
            canonical_url,
        }
    }

    fn bare(raw_url: &str, platform: Platform) -> Self {
        Self {
            raw_url: raw_url.to_string(),
            platform,
            video_id: None,
            canonical_url: raw_url.to_string(),
        }
    }

    /// True when classification found nothing acquirable.
    pub fn is_unknown(&self) -> bool {
        self.platform == Platform::Unknown
    }
}

/// Classify a page URL into a [`VideoReference`].
///
/// Grammars are tried in platform priority order (YouTube, Vimeo,
/// Dailymotion, direct media extension); the first match wins. Never fails.
pub fn classify(raw_url: &str) -> VideoReference {
    let trimmed = raw_url.trim();

    if let Ok(parsed) = Url::parse(trimmed) {
        if let Some(host) = parsed.host_str().map(|h| h.to_ascii_lowercase()) {
            if is_youtube_host(&host) {
                if let Some(id) = youtube_video_id(&parsed, &host) {
                    let canonical = format!("https://www.youtube.com/watch?v={id}");
                    return VideoReference::hosted(trimmed, Platform::YouTube, id, canonical);
                }
            }

            if is_vimeo_host(&host) {
                if let Some(id) = vimeo_video_id(&parsed) {
                    let canonical = format!("https://vimeo.com/{id}");
                    return VideoReference::hosted(trimmed, Platform::Vimeo, id, canonical);
                }
            }

            if is_dailymotion_host(&host) {
                if let Some(id) = dailymotion_video_id(&parsed) {
                    let canonical = format!("https://www.dailymotion.com/video/{id}");
                    return VideoReference::hosted(trimmed, Platform::Dailymotion, id, canonical);
                }
            }
        }

        if has_direct_extension(parsed.path()) {
            return VideoReference::bare(trimmed, Platform::Direct);
        }
    } else if has_direct_extension(trimmed) {
        return VideoReference::bare(trimmed, Platform::Direct);
    }

    VideoReference::bare(trimmed, Platform::Unknown)
}

fn is_youtube_host(host: &str) -> bool {
    host == "youtube.com"
        || host == "youtu.be"
        || host == "m.youtube.com"
        || host.ends_with(".youtube.com")
}

fn is_vimeo_host(host: &str) -> bool {
    host == "vimeo.com" || host.ends_with(".vimeo.com")
}

fn is_dailymotion_host(host: &str) -> bool {
    host == "dailymotion.com" || host.ends_with(".dailymotion.com")
}

/// Extract the 11-character video id from any supported YouTube URL shape:
/// `watch?v=`, `youtu.be/<id>`, `/embed/<id>`, `/v/<id>`, `/shorts/<id>`.
fn youtube_video_id(url: &Url, host: &str) -> Option<String> {
    if host == "youtu.be" {
        let seg = url.path_segments()?.next()?.trim();
        return validate_youtube_id(seg);
    }

    if url.path().starts_with("/watch") {
        for (key, value) in url.query_pairs() {
            if key == "v" {
                if let Some(id) = validate_youtube_id(value.trim()) {
                    return Some(id);
                }
            }
        }
    }

    let mut segments = url.path_segments()?;
    let first = segments.next().unwrap_or("");
    let second = segments.next().unwrap_or("");
    if matches!(first, "embed" | "v" | "shorts") {
        return validate_youtube_id(second.trim());
    }

    None
}

/// YouTube video ids are exactly 11 characters of `[A-Za-z0-9_-]`.
fn validate_youtube_id(id: &str) -> Option<String> {
    if id.len() == 11
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Some(id.to_string())
    } else {
        None
    }
}

/// Vimeo ids are numeric: `vimeo.com/<id>`, `vimeo.com/channels/<name>/<id>`,
/// `player.vimeo.com/video/<id>`.
fn vimeo_video_id(url: &Url) -> Option<String> {
    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();

    let candidate = match segments.as_slice() {
        [id] => id,
        ["channels", _, id] => id,
        ["video", id] => id,
        _ => return None,
    };

    if !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_digit()) {
        Some((*candidate).to_string())
    } else {
        None
    }
}

/// Dailymotion ids follow `dailymotion.com/video/<alnum>`.
fn dailymotion_video_id(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    if segments.next() != Some("video") {
        return None;
    }
    let id = segments.next()?.trim();
    if !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(id.to_string())
    } else {
        None
    }
}

fn has_direct_extension(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    DIRECT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_youtube_watch_url() {
        let reference = classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(reference.platform, Platform::YouTube);
        assert_eq!(reference.video_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(
            reference.canonical_url,
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_youtube_url_shapes() {
        for url in [
            "https://youtu.be/dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://m.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PLrAXtmRdnEQy4qtr",
        ] {
            let reference = classify(url);
            assert_eq!(reference.platform, Platform::YouTube, "url: {url}");
            assert_eq!(reference.video_id.as_deref(), Some("dQw4w9WgXcQ"));
        }
    }

    #[test]
    fn test_youtube_invalid_id_rejected() {
        // Too short, too long, bad characters
        assert_eq!(
            classify("https://youtube.com/watch?v=abc123").platform,
            Platform::Unknown
        );
        assert_eq!(
            classify("https://youtu.be/abc123def456789").platform,
            Platform::Unknown
        );
        assert_eq!(
            classify("https://youtube.com/watch?v=abc123def!!").platform,
            Platform::Unknown
        );
    }

    #[test]
    fn test_vimeo_url_shapes() {
        for url in [
            "https://vimeo.com/123456789",
            "https://vimeo.com/channels/staffpicks/123456789",
            "https://player.vimeo.com/video/123456789",
        ] {
            let reference = classify(url);
            assert_eq!(reference.platform, Platform::Vimeo, "url: {url}");
            assert_eq!(reference.video_id.as_deref(), Some("123456789"));
            assert_eq!(reference.canonical_url, "https://vimeo.com/123456789");
        }
    }

    #[test]
    fn test_vimeo_non_numeric_rejected() {
        assert_eq!(
            classify("https://vimeo.com/about").platform,
            Platform::Unknown
        );
    }

    #[test]
    fn test_dailymotion() {
        let reference = classify("https://www.dailymotion.com/video/x8abcd1");
        assert_eq!(reference.platform, Platform::Dailymotion);
        assert_eq!(reference.video_id.as_deref(), Some("x8abcd1"));
        assert_eq!(
            reference.canonical_url,
            "https://www.dailymotion.com/video/x8abcd1"
        );
    }

    #[test]
    fn test_direct_media_url() {
        let reference = classify("https://example.com/clip.mp4");
        assert_eq!(reference.platform, Platform::Direct);
        assert_eq!(reference.video_id, None);
        assert_eq!(reference.canonical_url, "https://example.com/clip.mp4");

        assert_eq!(
            classify("https://cdn.example.com/a/b/movie.WEBM").platform,
            Platform::Direct
        );
    }

    #[test]
    fn test_unknown_url() {
        let reference = classify("https://example.com/article");
        assert_eq!(reference.platform, Platform::Unknown);
        assert_eq!(reference.video_id, None);
        assert!(reference.is_unknown());
    }

    #[test]
    fn test_classification_is_deterministic() {
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
        assert_eq!(classify(url), classify(url));
    }

    #[test]
    fn test_video_id_invariant() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://vimeo.com/123456789",
            "https://www.dailymotion.com/video/x8abcd1",
            "https://example.com/clip.mp4",
            "https://example.com/article",
            "not a url at all",
        ] {
            let reference = classify(url);
            assert_eq!(
                reference.video_id.is_some(),
                reference.platform.is_hosted(),
                "url: {url}"
            );
        }
    }

    #[test]
    fn test_whitespace_trimmed() {
        let reference = classify("  https://youtu.be/dQw4w9WgXcQ  ");
        assert_eq!(reference.platform, Platform::YouTube);
        assert_eq!(reference.raw_url, "https://youtu.be/dQw4w9WgXcQ");
    }
}
