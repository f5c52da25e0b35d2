//! The acquisition strategy interface and the environment-ordered registry.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use vgist_models::VideoReference;

use crate::config::{AcquireConfig, RuntimeEnvironment};
use crate::error::StrategyError;
use crate::evasion::{DelayPolicy, IdentityProvider};
use crate::strategies::{
    DirectHttpStrategy, ExternalDownloaderStrategy, ManifestScrapeStrategy, MirrorProxyStrategy,
    PlatformClientStrategy,
};

/// One way of turning a video reference into a local file.
///
/// Implementations are stateless across attempts and share nothing with
/// sibling attempts except the destination path, which they claim by writing
/// a private `.part` file and renaming it into place on success.
#[async_trait]
pub trait AcquireStrategy: Send + Sync {
    /// Stable name, used in logs and the aggregate failure list.
    fn name(&self) -> &'static str;

    /// Whether this strategy applies to the given reference. Returning
    /// `false` means the strategy is skipped, not failed.
    fn supports(&self, reference: &VideoReference) -> bool;

    /// Per-attempt time budget enforced by the orchestrator.
    fn budget(&self) -> Duration;

    /// Try to produce a playable file at `dest`.
    async fn attempt(
        &self,
        reference: &VideoReference,
        dest: &Path,
    ) -> Result<PathBuf, StrategyError>;
}

/// Private in-flight path for one strategy's download.
///
/// Keeping the extension `.mp4` matters for tools that infer the output
/// container from the file name.
pub(crate) fn part_path(dest: &Path, strategy: &str) -> PathBuf {
    dest.with_extension(format!("{strategy}.mp4"))
}

/// Ordered strategy set for one runtime environment.
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn AcquireStrategy>>,
}

impl StrategyRegistry {
    /// Build the full strategy set, ordered for the given environment.
    ///
    /// The direct-HTTP strategy leads both profiles; it only ever applies to
    /// raw media URLs, where it is the obvious first choice.
    pub fn for_environment(
        config: &AcquireConfig,
        http: reqwest::Client,
        identities: Arc<dyn IdentityProvider>,
        delays: Arc<dyn DelayPolicy>,
    ) -> Self {
        let direct: Arc<dyn AcquireStrategy> =
            Arc::new(DirectHttpStrategy::new(http.clone(), config.direct_timeout));
        let platform: Arc<dyn AcquireStrategy> = Arc::new(PlatformClientStrategy::new(
            http.clone(),
            config.platform_timeout,
        ));
        let platform_stealth: Arc<dyn AcquireStrategy> = Arc::new(
            PlatformClientStrategy::new(http.clone(), config.platform_timeout)
                .with_evasion(Arc::clone(&identities), Arc::clone(&delays)),
        );
        let external: Arc<dyn AcquireStrategy> = Arc::new(ExternalDownloaderStrategy::new(
            Arc::clone(&identities),
            Arc::clone(&delays),
            config.external_timeout,
        ));
        let external_stealth: Arc<dyn AcquireStrategy> = Arc::new(
            ExternalDownloaderStrategy::new(
                Arc::clone(&identities),
                Arc::clone(&delays),
                config.external_timeout,
            )
            .stealth(),
        );
        let manifest: Arc<dyn AcquireStrategy> = Arc::new(ManifestScrapeStrategy::new(
            http.clone(),
            config.manifest_timeout,
        ));
        let mirror: Arc<dyn AcquireStrategy> = Arc::new(MirrorProxyStrategy::new(
            http,
            config.mirror_instances.clone(),
            config.mirror_timeout,
        ));

        let strategies = match config.environment {
            RuntimeEnvironment::Hosted => vec![
                direct,
                mirror,
                manifest,
                platform_stealth,
                external_stealth,
                platform,
                external,
            ],
            RuntimeEnvironment::Trusted => vec![
                direct,
                platform,
                external,
                platform_stealth,
                external_stealth,
                mirror,
                manifest,
            ],
        };

        Self { strategies }
    }

    /// Build a registry from an explicit strategy list (tests, embedding).
    pub fn from_strategies(strategies: Vec<Arc<dyn AcquireStrategy>>) -> Self {
        Self { strategies }
    }

    /// Strategies applicable to a reference, in registry order.
    pub fn applicable(&self, reference: &VideoReference) -> Vec<Arc<dyn AcquireStrategy>> {
        self.strategies
            .iter()
            .filter(|s| s.supports(reference))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}
