//! # mentormatch
//!
//! Mentor matchmaking for an alumni/student mentorship platform.
//!
//! Two layers, composed top-down:
//!
//! - [`ScoreEngine`] computes a deterministic compatibility score between a
//!   student ([`SubjectProfile`]) and an alumni mentor ([`CandidateProfile`])
//!   from overlapping domains and skills, career-goal alignment and seniority.
//! - [`MatchCache`] loads the eligible mentor pool, ranks it with the engine
//!   and keeps the ranking in a write-through two-tier cache. The fast tier
//!   is in-process with a TTL; the durable tier is a [`SnapshotStore`].
//!
//! Profiles and snapshots are reached through the [`ProfileSource`] and
//! [`SnapshotStore`] ports. In-memory adapters ship with the crate; the
//! `embedded` feature adds [`RedbSnapshotStore`], and `server` adds the
//! axum HTTP service in [`server`].
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use mentormatch::{
//!     CacheConfig, Capacity, CandidateProfile, InMemoryProfileStore, InMemorySnapshotStore,
//!     MatchCache, ScoreEngine, SubjectProfile,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), mentormatch::MatchError> {
//! let profiles = Arc::new(InMemoryProfileStore::new());
//! profiles.upsert_subject(SubjectProfile {
//!     id: "student-1".into(),
//!     skills: vec!["Rust".into()],
//!     domains: vec!["Systems".into()],
//!     career_goals: Some("become a compiler engineer".into()),
//! });
//! profiles.upsert_candidate(CandidateProfile {
//!     id: "mentor-1".into(),
//!     skills: vec!["rust".into()],
//!     domains: vec!["systems".into()],
//!     job_title: Some("Compiler Engineer".into()),
//!     years_of_experience: 8,
//!     is_available: true,
//!     capacity: Capacity { current: 0, max: 2 },
//!     ..Default::default()
//! });
//!
//! let cache = MatchCache::new(
//!     profiles,
//!     Arc::new(InMemorySnapshotStore::new()),
//!     ScoreEngine::default(),
//!     CacheConfig::default(),
//! );
//!
//! let matches = cache.get_matches("student-1", 5, false).await?;
//! assert_eq!(matches[0].candidate.id, "mentor-1");
//! assert_eq!(matches[0].score, 3 + 2 + 1 + 1);
//! # Ok(())
//! # }
//! ```
//!
//! ## Observability
//!
//! Cache activity is logged through `tracing` and counted through the
//! `metrics` facade (`mentormatch_cache_hits_total`,
//! `mentormatch_cache_misses_total`, `mentormatch_recomputes_total`,
//! `mentormatch_invalidations_total`, `mentormatch_recompute_seconds`).
//! Nothing is recorded until the host installs a metrics recorder.

pub mod cache;
pub mod error;
pub mod profile;
pub mod score;
pub mod store;

#[cfg(feature = "server")]
pub mod server;

pub use crate::cache::{CacheConfig, CacheStats, DEFAULT_TTL, MAX_TTL, MatchCache};
pub use crate::error::{MatchError, StoreError};
pub use crate::profile::{
    CandidateProfile, Capacity, MatchDetail, MatchResult, PersistedSnapshot, SubjectProfile,
};
pub use crate::score::{MatchingWeights, ScoreEngine, Scored};
#[cfg(feature = "embedded")]
pub use crate::store::RedbSnapshotStore;
pub use crate::store::{
    InMemoryProfileStore, InMemorySnapshotStore, PoolFilter, ProfileSource, Role, SeedData,
    SnapshotBackendConfig, SnapshotStore,
};
