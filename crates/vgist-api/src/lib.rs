//! Axum HTTP API server.
//!
//! This crate wires the core together as the Job Driver: classify the
//! submitted page URL, consult the digest cache, acquire the video, sample
//! key frames, OCR them, transcribe the audio, summarize, persist artifacts,
//! and return the digest to the client.

pub mod cache;
pub mod config;
pub mod error;
pub mod groq;
pub mod handlers;
pub mod metrics;
pub mod pipeline;
pub mod routes;
pub mod state;

pub use cache::DigestCache;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use groq::GroqClient;
pub use pipeline::JobDriver;
pub use routes::create_router;
pub use state::AppState;
