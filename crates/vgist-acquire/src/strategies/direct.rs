//! Direct HTTP streaming of raw media URLs.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use vgist_models::{Platform, VideoReference};

use crate::error::StrategyError;
use crate::net::stream_to_file;
use crate::strategy::{part_path, AcquireStrategy};

/// Streams the URL's body straight to disk. The only strategy with no
/// detection evasion: it applies only when the URL already is the media.
pub struct DirectHttpStrategy {
    client: reqwest::Client,
    budget: Duration,
}

impl DirectHttpStrategy {
    pub fn new(client: reqwest::Client, budget: Duration) -> Self {
        Self { client, budget }
    }
}

#[async_trait]
impl AcquireStrategy for DirectHttpStrategy {
    fn name(&self) -> &'static str {
        "direct_http"
    }

    fn supports(&self, reference: &VideoReference) -> bool {
        reference.platform == Platform::Direct
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn attempt(
        &self,
        reference: &VideoReference,
        dest: &Path,
    ) -> Result<PathBuf, StrategyError> {
        debug!(url = %reference.canonical_url, "Direct HTTP download");

        let part = part_path(dest, self.name());
        stream_to_file(self.client.get(&reference.canonical_url), &part, dest).await
    }
}
