//! The Job Driver.
//!
//! Drives one processing job end to end: acquire the video, sample key
//! frames, OCR them, transcribe the audio, summarize, and persist per-job
//! artifacts under the results directory. The caller (handler) owns cache
//! lookup and storage.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use vgist_acquire::Orchestrator;
use vgist_media::{
    extract_audio, FfmpegFrameDecoder, KeyFrameSelector, OcrEngine, SelectorConfig,
};
use vgist_models::{FrameText, JobId, VideoDigest, VideoReference};

use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::groq::GroqClient;

/// Everything one job produced.
pub struct ProcessOutcome {
    pub digest: VideoDigest,
    pub frames: Vec<FrameText>,
}

/// Drives acquisition, frame selection, and the hosted AI delegations.
pub struct JobDriver {
    orchestrator: Arc<Orchestrator>,
    selector: KeyFrameSelector,
    ocr: OcrEngine,
    groq: GroqClient,
    results_dir: PathBuf,
    work_dir: PathBuf,
    language: String,
}

impl JobDriver {
    pub fn new(
        config: &ApiConfig,
        orchestrator: Arc<Orchestrator>,
        selector_config: SelectorConfig,
        groq: GroqClient,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            orchestrator,
            selector: KeyFrameSelector::new(selector_config),
            ocr: OcrEngine::default(),
            groq,
            results_dir: config.results_dir.clone(),
            work_dir,
            language: config.language.clone(),
        }
    }

    /// Process one classified reference into a digest.
    pub async fn process(
        &self,
        reference: &VideoReference,
        page_title: &str,
        job_id: &JobId,
    ) -> ApiResult<ProcessOutcome> {
        tokio::fs::create_dir_all(&self.results_dir).await?;

        info!(job_id = %job_id, url = %reference.raw_url, "Processing video");

        let video_path = self
            .orchestrator
            .acquire(&reference.raw_url, job_id.as_str())
            .await?;

        let frames = self.extract_frame_text(&video_path, job_id).await?;
        let transcript = self.transcribe(&video_path, job_id).await?;

        let frames_text = frames
            .iter()
            .filter(|f| !f.text.is_empty())
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        self.persist(job_id, "frames_text.txt", frames_text.as_bytes())
            .await?;

        let summary = self
            .groq
            .summarize(&transcript, &frames_text, page_title)
            .await?;
        self.persist(job_id, "summary.md", summary.as_bytes()).await?;

        info!(
            job_id = %job_id,
            frames = frames.len(),
            transcript_chars = transcript.len(),
            summary_chars = summary.len(),
            "Job complete"
        );

        Ok(ProcessOutcome {
            digest: VideoDigest {
                title: page_title.to_string(),
                platform: reference.platform,
                summary,
                transcript,
                created_at: Utc::now(),
            },
            frames,
        })
    }

    /// Sample key frames and OCR each one. OCR failures degrade to empty
    /// text; frame selection failures are fatal to the job.
    async fn extract_frame_text(
        &self,
        video_path: &std::path::Path,
        job_id: &JobId,
    ) -> ApiResult<Vec<FrameText>> {
        let decoder = FfmpegFrameDecoder::open(video_path).await?;
        let sampled = self.selector.select_frames(&decoder).await?;

        let mut frames = Vec::with_capacity(sampled.len());
        for (frame_id, frame) in sampled.iter().enumerate() {
            let text = match self.ocr.extract_text(&frame.pixels).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(job_id = %job_id, frame_id, error = %e, "OCR failed for frame");
                    String::new()
                }
            };
            frames.push(FrameText {
                frame_id,
                timestamp: frame.timestamp,
                text,
            });
        }

        let json = serde_json::to_vec_pretty(&frames)
            .map_err(|e| crate::error::ApiError::internal(e.to_string()))?;
        self.persist(job_id, "frames.json", &json).await?;

        Ok(frames)
    }

    /// Extract the audio track and transcribe it. Videos without audio get
    /// an empty transcript instead of an error.
    async fn transcribe(
        &self,
        video_path: &std::path::Path,
        job_id: &JobId,
    ) -> ApiResult<String> {
        let audio_path = self.work_dir.join(format!("{job_id}.mp3"));

        let transcript = match extract_audio(video_path, &audio_path).await? {
            Some(audio) => self.groq.transcribe(&audio, &self.language).await?,
            None => String::new(),
        };

        self.persist(job_id, "transcript.txt", transcript.as_bytes())
            .await?;
        Ok(transcript)
    }

    async fn persist(&self, job_id: &JobId, suffix: &str, bytes: &[u8]) -> ApiResult<()> {
        let path = self.results_dir.join(format!("{job_id}_{suffix}"));
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }
}
