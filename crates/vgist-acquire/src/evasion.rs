//! Injectable evasion policies.
//!
//! Identity rotation and randomized delays are rate-limiting/evasion
//! measures, not correctness requirements. They sit behind traits so tests
//! can supply a fixed-identity, no-delay pair and stay deterministic.

use async_trait::async_trait;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::time::Duration;

/// Browser identity presented to the remote side for one attempt.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_agent: &'static str,
    pub accept_language: &'static str,
    /// `yt-dlp --impersonate` target.
    pub impersonation: &'static str,
    /// Platform player client presented to the innertube API.
    pub player_client: &'static str,
}

pub const DEFAULT_IDENTITY: Identity = Identity {
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    accept_language: "en-US,en;q=0.5",
    impersonation: "chrome",
    player_client: "ANDROID",
};

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
];

const ACCEPT_LANGUAGES: [&str; 3] = ["en-US,en;q=0.5", "en-US,en;q=0.9", "en-GB,en;q=0.8"];

const IMPERSONATIONS: [&str; 3] = ["chrome", "safari", "edge"];

const PLAYER_CLIENTS: [&str; 3] = ["ANDROID", "IOS", "WEB"];

/// Supplies a browser identity per attempt.
pub trait IdentityProvider: Send + Sync {
    fn next_identity(&self) -> Identity;
}

/// Randomizes every identity field per attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotatingIdentities;

impl IdentityProvider for RotatingIdentities {
    fn next_identity(&self) -> Identity {
        let mut rng = rand::rng();
        Identity {
            user_agent: USER_AGENTS.choose(&mut rng).copied().unwrap_or(DEFAULT_IDENTITY.user_agent),
            accept_language: ACCEPT_LANGUAGES
                .choose(&mut rng)
                .copied()
                .unwrap_or(DEFAULT_IDENTITY.accept_language),
            impersonation: IMPERSONATIONS
                .choose(&mut rng)
                .copied()
                .unwrap_or(DEFAULT_IDENTITY.impersonation),
            player_client: PLAYER_CLIENTS
                .choose(&mut rng)
                .copied()
                .unwrap_or(DEFAULT_IDENTITY.player_client),
        }
    }
}

/// Always returns the same identity. For tests.
#[derive(Debug, Clone)]
pub struct FixedIdentity(pub Identity);

impl Default for FixedIdentity {
    fn default() -> Self {
        Self(DEFAULT_IDENTITY)
    }
}

impl IdentityProvider for FixedIdentity {
    fn next_identity(&self) -> Identity {
        self.0.clone()
    }
}

/// Pauses between requests/attempts.
#[async_trait]
pub trait DelayPolicy: Send + Sync {
    async fn pause(&self);
}

/// Sleeps a random duration in `[min, max]`.
#[derive(Debug, Clone)]
pub struct JitteredDelays {
    min: Duration,
    max: Duration,
}

impl JitteredDelays {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }
}

impl Default for JitteredDelays {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(2500))
    }
}

#[async_trait]
impl DelayPolicy for JitteredDelays {
    async fn pause(&self) {
        let millis = {
            let mut rng = rand::rng();
            rng.random_range(self.min.as_millis() as u64..=self.max.as_millis() as u64)
        };
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}

/// Never sleeps. For tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl DelayPolicy for NoDelay {
    async fn pause(&self) {}
}
