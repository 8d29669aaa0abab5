//! # visitcount Core Library
//!
//! This library provides the count-acquisition pipeline behind a page visit
//! counter. The page asks for one number; the library always produces one,
//! even when every counting service is unreachable.
//!
//! ## Architecture
//!
//! - **Session Gatekeeper**: increments at most once per session per counter
//! - **Source Chain Resolver**: ordered remote sources, direct then proxied,
//!   first success wins
//! - **Persistent Cache**: durable last-known count and local-only counting
//! - **Estimator**: deterministic time-based estimate as the last resort
//! - **Orchestrator**: composes the above into a call that never fails
//! - **Animator**: frame-driven count-up into a display target
//!
//! ## Key Components
//!
//! - [`CountAcquirer`]: acquisition state machine
//! - [`SourceChainResolver`]: remote candidate chain
//! - [`CounterWidget`]: page-load flow with animation and tracking
//! - [`Config`]: application configuration management

pub mod animator;
pub mod cache;
pub mod diagnostics;
pub mod error;
pub mod estimator;
pub mod key;
pub mod orchestrator;
pub mod session;
pub mod sources;
pub mod storage;
pub mod widget;

pub use animator::{Animation, Animator, DisplayTarget, RecordingTarget};
pub use cache::PersistentCache;
pub use diagnostics::{CounterStats, StatsReport};
pub use error::{
    CandidateFailure, ConfigError, CoreError, FailureReason, ResolveError, Result, StorageError,
};
pub use estimator::{Estimator, GrowthModel};
pub use key::{derive_page_key, CounterKey};
pub use orchestrator::{Acquisition, CountAcquirer, Origin};
pub use session::SessionGatekeeper;
pub use sources::{CountTransport, CounterSource, HttpTransport, Operation, OpStyle, Proxy, SourceChainResolver};
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore, UnavailableStore};
pub use widget::{CounterWidget, PageLoad};
