//! The acquisition orchestrator.
//!
//! Classifies the input URL, selects the applicable strategies for the
//! runtime environment, and drives them to the first success: sequentially
//! for raw media URLs, raced concurrently (bounded, per-strategy timeouts)
//! for recognized platforms. Individual failures are collected, never
//! propagated mid-flight; only full exhaustion surfaces to the caller.

use metrics::counter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use vgist_models::{classify, Platform, VideoReference};

use crate::config::AcquireConfig;
use crate::error::{AcquireError, AcquireResult, AttemptFailure, StrategyError};
use crate::evasion::{DelayPolicy, JitteredDelays, RotatingIdentities};
use crate::strategy::{AcquireStrategy, StrategyRegistry};

/// Transient record of one strategy invocation. Lives for the duration of a
/// single `acquire` call; only the failure reason outlives it.
struct AcquisitionAttempt {
    strategy: &'static str,
    started_at: Instant,
    budget: Duration,
}

impl AcquisitionAttempt {
    fn begin(strategy: &dyn AcquireStrategy) -> Self {
        Self {
            strategy: strategy.name(),
            started_at: Instant::now(),
            budget: strategy.budget(),
        }
    }

    fn succeeded(&self, path: &Path) {
        counter!("vgist_acquire_success_total", "strategy" => self.strategy).increment(1);
        info!(
            strategy = self.strategy,
            elapsed_ms = self.started_at.elapsed().as_millis() as u64,
            path = %path.display(),
            "Strategy succeeded"
        );
    }

    fn failed(&self, error: &StrategyError) -> AttemptFailure {
        counter!("vgist_acquire_failure_total", "strategy" => self.strategy).increment(1);
        warn!(
            strategy = self.strategy,
            elapsed_ms = self.started_at.elapsed().as_millis() as u64,
            error = %error,
            "Strategy failed"
        );
        AttemptFailure {
            strategy: self.strategy,
            reason: error.to_string(),
        }
    }

    fn timed_out(&self) -> AttemptFailure {
        self.failed(&StrategyError::Timeout(self.budget.as_secs()))
    }
}

type AttemptResult =
    Result<Result<Result<PathBuf, StrategyError>, tokio::task::JoinError>, tokio::time::error::Elapsed>;

/// Orchestrates acquisition strategies for one runtime environment.
pub struct Orchestrator {
    config: AcquireConfig,
    registry: StrategyRegistry,
    delays: Arc<dyn DelayPolicy>,
}

impl Orchestrator {
    /// Build an orchestrator with the full strategy set, rotating identities
    /// and jittered delays.
    pub fn new(config: AcquireConfig) -> Self {
        let delays: Arc<dyn DelayPolicy> = Arc::new(JitteredDelays::default());
        let registry = StrategyRegistry::for_environment(
            &config,
            reqwest::Client::new(),
            Arc::new(RotatingIdentities),
            Arc::clone(&delays),
        );
        Self {
            config,
            registry,
            delays,
        }
    }

    /// Build an orchestrator over an explicit registry and delay policy.
    pub fn with_registry(
        config: AcquireConfig,
        registry: StrategyRegistry,
        delays: Arc<dyn DelayPolicy>,
    ) -> Self {
        Self {
            config,
            registry,
            delays,
        }
    }

    /// Acquire the video behind `url` into the work directory.
    pub async fn acquire(&self, url: &str, job_id: &str) -> AcquireResult<PathBuf> {
        self.acquire_with_attempts(url, job_id)
            .await
            .map(|(path, _)| path)
    }

    /// Like [`acquire`](Self::acquire), additionally returning the failures
    /// recorded before success.
    pub async fn acquire_with_attempts(
        &self,
        url: &str,
        job_id: &str,
    ) -> AcquireResult<(PathBuf, Vec<AttemptFailure>)> {
        let reference = classify(url);
        if reference.is_unknown() {
            counter!("vgist_acquire_not_a_video_total").increment(1);
            info!(url = url, "No supported video found");
            return Err(AcquireError::NotAVideo);
        }

        info!(
            url = url,
            platform = %reference.platform,
            video_id = reference.video_id.as_deref().unwrap_or("-"),
            job_id = job_id,
            "Starting acquisition"
        );

        tokio::fs::create_dir_all(&self.config.work_dir).await?;
        let dest = self.config.work_dir.join(format!("{job_id}.mp4"));

        let strategies = self.registry.applicable(&reference);
        debug!(
            count = strategies.len(),
            names = ?strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            "Applicable strategies"
        );

        let mut failures = Vec::new();

        if reference.platform.is_hosted() {
            let window = self.config.max_concurrent.min(strategies.len());
            let (raced, remainder) = strategies.split_at(window);

            if let Some(path) = self.race(raced, &reference, &dest, &mut failures).await {
                return Ok((path, failures));
            }

            for strategy in remainder {
                self.delays.pause().await;
                if let Some(path) = self.run_one(strategy, &reference, &dest, &mut failures).await
                {
                    return Ok((path, failures));
                }
            }
        } else {
            for (i, strategy) in strategies.iter().enumerate() {
                if i > 0 {
                    self.delays.pause().await;
                }
                if let Some(path) = self.run_one(strategy, &reference, &dest, &mut failures).await
                {
                    return Ok((path, failures));
                }
            }

            // One last direct byte-stream attempt for raw media extensions.
            if reference.platform == Platform::Direct {
                if let Some(direct) = strategies.iter().find(|s| s.name() == "direct_http") {
                    self.delays.pause().await;
                    if let Some(path) =
                        self.run_one(direct, &reference, &dest, &mut failures).await
                    {
                        return Ok((path, failures));
                    }
                }
            }
        }

        counter!("vgist_acquire_exhausted_total").increment(1);
        Err(AcquireError::AllStrategiesExhausted { attempts: failures })
    }

    /// Run one strategy under its budget. A timed-out attempt is recorded as
    /// a failure but not forcibly killed: the task is abandoned, and a late
    /// write to the destination is simply never observed.
    async fn run_one(
        &self,
        strategy: &Arc<dyn AcquireStrategy>,
        reference: &VideoReference,
        dest: &Path,
        failures: &mut Vec<AttemptFailure>,
    ) -> Option<PathBuf> {
        let attempt = AcquisitionAttempt::begin(&**strategy);
        let strategy = Arc::clone(strategy);
        let reference = reference.clone();
        let dest = dest.to_path_buf();

        let handle = tokio::spawn(async move { strategy.attempt(&reference, &dest).await });
        let result: AttemptResult = tokio::time::timeout(attempt.budget, handle).await;

        self.settle(attempt, result, failures)
    }

    /// Race a window of strategies; first success wins and losers are
    /// cancelled best-effort (an attempt already writing may finish in the
    /// background, its rename unobserved).
    async fn race(
        &self,
        window: &[Arc<dyn AcquireStrategy>],
        reference: &VideoReference,
        dest: &Path,
        failures: &mut Vec<AttemptFailure>,
    ) -> Option<PathBuf> {
        let mut set = JoinSet::new();

        for strategy in window {
            let attempt = AcquisitionAttempt::begin(&**strategy);
            let strategy = Arc::clone(strategy);
            let reference = reference.clone();
            let dest = dest.to_path_buf();

            set.spawn(async move {
                let inner =
                    tokio::spawn(async move { strategy.attempt(&reference, &dest).await });
                let result: AttemptResult = tokio::time::timeout(attempt.budget, inner).await;
                (attempt, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            let Ok((attempt, result)) = joined else {
                continue;
            };

            if let Some(path) = self.settle(attempt, result, failures) {
                set.abort_all();
                return Some(path);
            }
        }

        None
    }

    /// Convert a completed attempt into either the winning path or a
    /// recorded failure. `NotApplicable` is a skip, not a failure.
    fn settle(
        &self,
        attempt: AcquisitionAttempt,
        result: AttemptResult,
        failures: &mut Vec<AttemptFailure>,
    ) -> Option<PathBuf> {
        match result {
            Ok(Ok(Ok(path))) => {
                attempt.succeeded(&path);
                Some(path)
            }
            Ok(Ok(Err(StrategyError::NotApplicable))) => {
                debug!(strategy = attempt.strategy, "Strategy not applicable, skipped");
                None
            }
            Ok(Ok(Err(error))) => {
                failures.push(attempt.failed(&error));
                None
            }
            Ok(Err(join_error)) => {
                failures.push(attempt.failed(&StrategyError::transient(format!(
                    "attempt task failed: {join_error}"
                ))));
                None
            }
            Err(_elapsed) => {
                failures.push(attempt.timed_out());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evasion::NoDelay;
    use async_trait::async_trait;
    use tempfile::TempDir;

    #[derive(Clone, Copy)]
    enum Behavior {
        Succeed,
        Fail(&'static str),
        Hang,
    }

    struct TestStrategy {
        name: &'static str,
        budget: Duration,
        behavior: Behavior,
    }

    impl TestStrategy {
        fn arc(
            name: &'static str,
            budget_ms: u64,
            behavior: Behavior,
        ) -> Arc<dyn AcquireStrategy> {
            Arc::new(Self {
                name,
                budget: Duration::from_millis(budget_ms),
                behavior,
            })
        }
    }

    #[async_trait]
    impl AcquireStrategy for TestStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        fn supports(&self, _reference: &VideoReference) -> bool {
            true
        }

        fn budget(&self) -> Duration {
            self.budget
        }

        async fn attempt(
            &self,
            _reference: &VideoReference,
            dest: &Path,
        ) -> Result<PathBuf, StrategyError> {
            match self.behavior {
                Behavior::Succeed => {
                    tokio::fs::write(dest, b"video bytes").await?;
                    Ok(dest.to_path_buf())
                }
                Behavior::Fail(reason) => Err(StrategyError::no_stream(reason)),
                Behavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(StrategyError::transient("should never be reached"))
                }
            }
        }
    }

    fn orchestrator(work_dir: &TempDir, strategies: Vec<Arc<dyn AcquireStrategy>>) -> Orchestrator {
        let config = AcquireConfig {
            work_dir: work_dir.path().to_path_buf(),
            ..AcquireConfig::default()
        };
        Orchestrator::with_registry(
            config,
            StrategyRegistry::from_strategies(strategies),
            Arc::new(NoDelay),
        )
    }

    const DIRECT_URL: &str = "https://example.com/clip.mp4";
    const YOUTUBE_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    #[tokio::test]
    async fn test_failures_are_aggregated_before_success() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(
            &dir,
            vec![
                TestStrategy::arc("alpha", 1_000, Behavior::Fail("alpha broke")),
                TestStrategy::arc("beta", 1_000, Behavior::Succeed),
            ],
        );

        let (path, failures) = orchestrator
            .acquire_with_attempts(DIRECT_URL, "job1")
            .await
            .unwrap();

        assert!(path.exists());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].strategy, "alpha");
        assert!(failures[0].reason.contains("alpha broke"));
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(
            &dir,
            vec![
                TestStrategy::arc("alpha", 1_000, Behavior::Succeed),
                TestStrategy::arc("beta", 1_000, Behavior::Fail("never runs")),
            ],
        );

        let (_, failures) = orchestrator
            .acquire_with_attempts(DIRECT_URL, "job2")
            .await
            .unwrap();

        assert!(failures.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_url_fails_fast_without_attempts() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(
            &dir,
            vec![TestStrategy::arc("alpha", 1_000, Behavior::Succeed)],
        );

        let started = Instant::now();
        let result = orchestrator.acquire("https://example.com/article", "job3").await;

        assert!(matches!(result, Err(AcquireError::NotAVideo)));
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_exhaustion_lists_reasons_in_order() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(
            &dir,
            vec![
                TestStrategy::arc("alpha", 1_000, Behavior::Fail("first reason")),
                TestStrategy::arc("beta", 1_000, Behavior::Fail("second reason")),
            ],
        );

        let result = orchestrator.acquire(DIRECT_URL, "job4").await;

        let Err(AcquireError::AllStrategiesExhausted { attempts }) = result else {
            panic!("expected exhaustion");
        };
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].strategy, "alpha");
        assert_eq!(attempts[1].strategy, "beta");
    }

    #[tokio::test]
    async fn test_racing_is_bounded_by_max_budget_not_sum() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(
            &dir,
            vec![
                TestStrategy::arc("alpha", 300, Behavior::Hang),
                TestStrategy::arc("beta", 300, Behavior::Hang),
                TestStrategy::arc("gamma", 300, Behavior::Hang),
            ],
        );

        let started = Instant::now();
        let result = orchestrator.acquire(YOUTUBE_URL, "job5").await;
        let elapsed = started.elapsed();

        let Err(AcquireError::AllStrategiesExhausted { attempts }) = result else {
            panic!("expected exhaustion");
        };
        assert_eq!(attempts.len(), 3);
        for attempt in &attempts {
            assert!(attempt.reason.contains("timed out"));
        }
        // Raced, not serialized: well under the 900ms sum of budgets.
        assert!(
            elapsed < Duration::from_millis(800),
            "race took {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn test_race_winner_cancels_losers() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(
            &dir,
            vec![
                TestStrategy::arc("slow", 5_000, Behavior::Hang),
                TestStrategy::arc("fast", 5_000, Behavior::Succeed),
            ],
        );

        let started = Instant::now();
        let path = orchestrator.acquire(YOUTUBE_URL, "job6").await.unwrap();

        assert!(path.exists());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_platform_race_falls_back_to_sequential_remainder() {
        let dir = TempDir::new().unwrap();
        // Window of 3 all fail; the fourth (sequential remainder) succeeds.
        let orchestrator = orchestrator(
            &dir,
            vec![
                TestStrategy::arc("alpha", 300, Behavior::Fail("a")),
                TestStrategy::arc("beta", 300, Behavior::Fail("b")),
                TestStrategy::arc("gamma", 300, Behavior::Fail("c")),
                TestStrategy::arc("delta", 1_000, Behavior::Succeed),
            ],
        );

        let (path, failures) = orchestrator
            .acquire_with_attempts(YOUTUBE_URL, "job7")
            .await
            .unwrap();

        assert!(path.exists());
        assert_eq!(failures.len(), 3);
    }
}
