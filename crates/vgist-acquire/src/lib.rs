//! Video acquisition.
//!
//! This crate turns a classified [`vgist_models::VideoReference`] into a
//! playable local file by running multiple independent download strategies
//! under per-strategy timeouts. Recognized platform URLs race a bounded set
//! of strategies concurrently; everything else runs sequentially. Individual
//! strategy failures are aggregated, never propagated mid-flight: callers see
//! either a local file or one error listing every attempted strategy and its
//! reason.
//!
//! Strategy ordering depends on the runtime environment: hosting environments
//! suspected of bot detection front-load mirror and manifest scraping, while
//! trusted environments front-load the platform client and the external
//! downloader. The environment is an explicit configuration value, never
//! auto-detected here.

pub mod config;
pub mod error;
pub mod evasion;
mod net;
pub mod orchestrator;
pub mod strategies;
pub mod strategy;

pub use config::{AcquireConfig, RuntimeEnvironment};
pub use error::{AcquireError, AcquireResult, AttemptFailure, StrategyError};
pub use evasion::{
    DelayPolicy, FixedIdentity, Identity, IdentityProvider, JitteredDelays, NoDelay,
    RotatingIdentities,
};
pub use orchestrator::Orchestrator;
pub use strategy::{AcquireStrategy, StrategyRegistry};
