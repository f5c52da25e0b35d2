//! Groq API client for transcription and summarization.
//!
//! Thin delegation layer: audio goes to the hosted Whisper endpoint, the
//! summary and chat answers come from the hosted chat-completions endpoint.
//! The models themselves are out of scope here.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};

const TRANSCRIPTION_URL: &str = "https://api.groq.com/openai/v1/audio/transcriptions";
const CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

const TRANSCRIPTION_MODEL: &str = "whisper-large-v3";
const CHAT_MODEL: &str = "llama3-70b-8192";

/// Character caps applied to prompt inputs.
const TRANSCRIPT_PROMPT_CAP: usize = 4000;
const FRAMES_PROMPT_CAP: usize = 2000;

/// Groq API client.
#[derive(Clone)]
pub struct GroqClient {
    api_key: Option<String>,
    client: Client,
}

/// A chat message in OpenAI wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'static str,
    messages: &'a [ChatMessage],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: String,
}

impl GroqClient {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }

    fn key(&self) -> ApiResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ApiError::not_configured("GROQ_API_KEY is not set"))
    }

    /// Transcribe an audio file with the hosted Whisper model.
    pub async fn transcribe(&self, audio_path: &Path, language: &str) -> ApiResult<String> {
        let key = self.key()?;

        let bytes = tokio::fs::read(audio_path).await?;
        debug!(bytes = bytes.len(), "Uploading audio for transcription");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("audio.mp3")
            .mime_str("audio/mpeg")
            .map_err(|e| ApiError::internal(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", TRANSCRIPTION_MODEL)
            .text("language", language.to_string())
            .text("response_format", "json");

        let response = self
            .client
            .post(TRANSCRIPTION_URL)
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::upstream(format!(
                "transcription failed ({status}): {body}"
            )));
        }

        let transcript: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::upstream(e.to_string()))?;

        info!(chars = transcript.text.len(), "Transcription complete");
        Ok(transcript.text)
    }

    /// One chat-completions round trip.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> ApiResult<String> {
        let key = self.key()?;

        let request = ChatRequest {
            model: CHAT_MODEL,
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(CHAT_URL)
            .bearer_auth(key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::upstream(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::upstream(format!(
                "chat completion failed ({status}): {body}"
            )));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| ApiError::upstream(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ApiError::upstream("chat completion returned no choices"))
    }

    /// Generate the markdown digest summary.
    pub async fn summarize(
        &self,
        transcript: &str,
        frames_text: &str,
        video_title: &str,
    ) -> ApiResult<String> {
        let messages = [
            ChatMessage::system(
                "You are a helpful assistant that creates detailed, structured summaries of \
                 videos based on their transcript and visual content. Your summaries are \
                 concise, well-organized, and formatted in Markdown.",
            ),
            ChatMessage::user(summary_prompt(transcript, frames_text, video_title)),
        ];

        self.chat(&messages, 0.3, 2048).await
    }
}

/// Build the summary prompt, capping both inputs so the request stays inside
/// the model's context window.
pub fn summary_prompt(transcript: &str, frames_text: &str, video_title: &str) -> String {
    format!(
        "I need you to create a detailed, structured summary of a video titled \"{video_title}\".\n\
         \n\
         I'll provide you with:\n\
         1. The transcript of the video's audio\n\
         2. Text extracted from key frames of the video\n\
         \n\
         Please analyze this information and create a comprehensive summary with the following sections:\n\
         - **Summary**: A brief 2-3 sentence overview of the video content\n\
         - **Main Points**: Bullet points of the key ideas or arguments presented\n\
         - **Key Insights**: The most important takeaways or conclusions\n\
         - **Timeline**: A brief chronological breakdown of the video's content (if applicable)\n\
         \n\
         Format your response in Markdown with clear headings and bullet points. Keep the summary \
         concise and focused on the most important information.\n\
         \n\
         Here's the transcript:\n{}\n\
         \n\
         Here's the text extracted from key frames:\n{}\n",
        truncate_chars(transcript, TRANSCRIPT_PROMPT_CAP),
        truncate_chars(frames_text, FRAMES_PROMPT_CAP),
    )
}

/// Build the system prompt for follow-up chat about a processed video.
pub fn chat_system_prompt(video_title: &str, summary: &str) -> String {
    format!(
        "You are a helpful assistant that can answer questions about a specific video.\n\
         You have access to the video's transcript, summary, and title.\n\
         \n\
         Video Title: {video_title}\n\
         \n\
         Video Summary:\n{summary}\n\
         \n\
         Based on the above information, please answer the user's question.\n\
         If you don't know the answer based on the provided information, say so honestly."
    )
}

fn truncate_chars(text: &str, cap: usize) -> String {
    text.chars().take(cap).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_prompt_caps_inputs() {
        let transcript = "t".repeat(10_000);
        let frames = "f".repeat(10_000);
        let prompt = summary_prompt(&transcript, &frames, "Title");

        assert!(prompt.contains("Title"));
        assert!(prompt.len() < transcript.len() + frames.len());
        assert!(prompt.matches('t').count() >= TRANSCRIPT_PROMPT_CAP);
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }

    #[test]
    fn test_missing_key_errors() {
        let client = GroqClient::new(None);
        assert!(matches!(client.key(), Err(ApiError::NotConfigured(_))));
    }

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::system("x").role, "system");
        assert_eq!(ChatMessage::user("x").role, "user");
    }
}
