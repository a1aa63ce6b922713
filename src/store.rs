//! Collaborator ports consumed by [`MatchCache`](crate::MatchCache) and the
//! adapters shipped with the crate.
//!
//! - [`ProfileSource`] loads the subject and the mentor pool.
//! - [`SnapshotStore`] is the durable cache tier. Rows are upserted on every
//!   recompute and are only read back through an explicit warm-up.
//!
//! Out of the box the crate provides in-memory adapters for both ports and,
//! with the `embedded` feature, a redb-backed [`SnapshotStore`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::profile::{CandidateProfile, PersistedSnapshot, SubjectProfile};

#[cfg(feature = "embedded")]
pub mod redb;

#[cfg(feature = "embedded")]
pub use self::redb::RedbSnapshotStore;

/// Which profiles make up a candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mentor,
}

/// Filter passed to [`ProfileSource::load_candidate_pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolFilter {
    pub role: Role,
    pub available_only: bool,
    pub under_capacity_only: bool,
}

impl PoolFilter {
    /// Available mentors with spare capacity; the only pool the cache asks for.
    pub const fn eligible_mentors() -> Self {
        Self {
            role: Role::Mentor,
            available_only: true,
            under_capacity_only: true,
        }
    }

    pub fn admits(&self, candidate: &CandidateProfile) -> bool {
        (!self.available_only || candidate.is_available)
            && (!self.under_capacity_only || candidate.capacity.has_room())
    }
}

/// Source of subject profiles and candidate pools.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// `Ok(None)` when the subject has no profile.
    async fn load_subject_profile(
        &self,
        subject_id: &str,
    ) -> Result<Option<SubjectProfile>, StoreError>;

    async fn load_candidate_pool(
        &self,
        filter: PoolFilter,
    ) -> Result<Vec<CandidateProfile>, StoreError>;
}

/// Durable tier for ranked match snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Insert or replace the row for `snapshot.subject_id`.
    async fn persist_snapshot(&self, snapshot: &PersistedSnapshot) -> Result<(), StoreError>;

    /// Return the stored row, expired or not. Callers check
    /// [`PersistedSnapshot::is_live`].
    async fn load_snapshot(&self, subject_id: &str)
        -> Result<Option<PersistedSnapshot>, StoreError>;
}

/// Selects and builds the durable tier.
///
/// ```
/// use mentormatch::SnapshotBackendConfig;
///
/// let config = SnapshotBackendConfig::in_memory();
/// let store = config.build().unwrap();
/// # let _ = store;
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SnapshotBackendConfig {
    /// Redb file at `path`. Requires the `embedded` feature.
    Redb { path: String },
    /// Process-local map; lost on restart.
    #[default]
    InMemory,
}

impl SnapshotBackendConfig {
    pub fn in_memory() -> Self {
        SnapshotBackendConfig::InMemory
    }

    pub fn redb<P: Into<String>>(path: P) -> Self {
        SnapshotBackendConfig::Redb { path: path.into() }
    }

    pub fn build(&self) -> Result<Arc<dyn SnapshotStore>, StoreError> {
        match self {
            SnapshotBackendConfig::InMemory => Ok(Arc::new(InMemorySnapshotStore::new())),
            SnapshotBackendConfig::Redb { path } => {
                #[cfg(feature = "embedded")]
                {
                    Ok(Arc::new(RedbSnapshotStore::open(path)?))
                }
                #[cfg(not(feature = "embedded"))]
                {
                    let _ = path;
                    Err(StoreError::backend("redb backend disabled at compile time"))
                }
            }
        }
    }
}

/// JSON seed file layout for [`InMemoryProfileStore::from_seed_file`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub subjects: Vec<SubjectProfile>,
    #[serde(default)]
    pub candidates: Vec<CandidateProfile>,
}

/// Profile source backed by in-process maps.
///
/// Candidates are kept ordered by id so pool loads are reproducible.
#[derive(Default)]
pub struct InMemoryProfileStore {
    subjects: RwLock<HashMap<String, SubjectProfile>>,
    candidates: RwLock<BTreeMap<String, CandidateProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: SeedData) -> Self {
        let store = Self::new();
        let mut skipped = 0usize;
        for subject in seed.subjects {
            if subject.id.is_empty() {
                skipped += 1;
                continue;
            }
            store.upsert_subject(subject);
        }
        for candidate in seed.candidates {
            if candidate.id.is_empty() {
                skipped += 1;
                continue;
            }
            store.upsert_candidate(candidate);
        }
        if skipped > 0 {
            tracing::warn!(skipped, "seed profiles without an id were skipped");
        }
        store
    }

    pub fn from_seed_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .map_err(|e| StoreError::backend(format!("read {}: {e}", path.display())))?;
        let seed: SeedData = serde_json::from_slice(&raw)?;
        tracing::info!(
            path = %path.display(),
            subjects = seed.subjects.len(),
            candidates = seed.candidates.len(),
            "loaded profile seed"
        );
        Ok(Self::from_seed(seed))
    }

    /// Returns `true` when an existing profile was replaced.
    pub fn upsert_subject(&self, subject: SubjectProfile) -> bool {
        self.subjects
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(subject.id.clone(), subject)
            .is_some()
    }

    /// Returns `true` when an existing profile was replaced.
    pub fn upsert_candidate(&self, candidate: CandidateProfile) -> bool {
        self.candidates
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(candidate.id.clone(), candidate)
            .is_some()
    }

    pub fn remove_candidate(&self, candidate_id: &str) -> Option<CandidateProfile> {
        self.candidates
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(candidate_id)
    }

    pub fn subject_count(&self) -> usize {
        self.subjects
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[async_trait]
impl ProfileSource for InMemoryProfileStore {
    async fn load_subject_profile(
        &self,
        subject_id: &str,
    ) -> Result<Option<SubjectProfile>, StoreError> {
        let guard = self
            .subjects
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard.get(subject_id).cloned())
    }

    async fn load_candidate_pool(
        &self,
        filter: PoolFilter,
    ) -> Result<Vec<CandidateProfile>, StoreError> {
        let guard = self
            .candidates
            .read()
            .map_err(|_| StoreError::backend("poisoned lock"))?;
        Ok(guard
            .values()
            .filter(|candidate| filter.admits(candidate))
            .cloned()
            .collect())
    }
}

/// Durable-tier stand-in that keeps JSON-encoded snapshots in memory.
pub struct InMemorySnapshotStore {
    rows: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.rows
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn persist_snapshot(&self, snapshot: &PersistedSnapshot) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec(snapshot)?;
        self.rows
            .write()
            .map_err(|_| StoreError::backend("poisoned lock"))?
            .insert(snapshot.subject_id.clone(), encoded);
        Ok(())
    }

    async fn load_snapshot(
        &self,
        subject_id: &str,
    ) -> Result<Option<PersistedSnapshot>, StoreError> {
        let encoded = {
            let guard = self
                .rows
                .read()
                .map_err(|_| StoreError::backend("poisoned lock"))?;
            guard.get(subject_id).cloned()
        };
        encoded
            .map(|bytes| serde_json::from_slice(&bytes).map_err(StoreError::from))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Capacity;
    use chrono::{Duration, Utc};

    fn mentor(id: &str, available: bool, current: u32, max: u32) -> CandidateProfile {
        CandidateProfile {
            id: id.into(),
            is_available: available,
            capacity: Capacity { current, max },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn pool_filter_drops_unavailable_and_full_mentors() {
        let store = InMemoryProfileStore::new();
        store.upsert_candidate(mentor("b-open", true, 0, 2));
        store.upsert_candidate(mentor("a-open", true, 1, 2));
        store.upsert_candidate(mentor("c-full", true, 2, 2));
        store.upsert_candidate(mentor("d-away", false, 0, 2));

        let pool = store
            .load_candidate_pool(PoolFilter::eligible_mentors())
            .await
            .unwrap();

        let ids: Vec<&str> = pool.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a-open", "b-open"]);
    }

    #[tokio::test]
    async fn missing_subject_is_none() {
        let store = InMemoryProfileStore::new();
        assert!(store.load_subject_profile("ghost").await.unwrap().is_none());
    }

    #[test]
    fn upsert_reports_replacement() {
        let store = InMemoryProfileStore::new();
        let subject = SubjectProfile {
            id: "s-1".into(),
            ..Default::default()
        };
        assert!(!store.upsert_subject(subject.clone()));
        assert!(store.upsert_subject(subject));
        assert_eq!(store.subject_count(), 1);
    }

    #[test]
    fn seed_file_loads_profiles() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"{
                "subjects": [{"id": "s-1", "skills": ["Rust"]}],
                "candidates": [
                    {"id": "m-1", "is_available": true, "capacity": {"current": 0, "max": 1}},
                    {"id": "m-2"},
                    {"name": "no id"}
                ]
            }"#,
        )
        .unwrap();

        let store = InMemoryProfileStore::from_seed_file(file.path()).unwrap();
        assert_eq!(store.subject_count(), 1);
        assert_eq!(store.candidate_count(), 2);
    }

    #[test]
    fn seed_file_with_bad_json_is_serialization_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "not json").unwrap();

        let err = InMemoryProfileStore::from_seed_file(file.path())
            .err()
            .expect("bad seed rejected");
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[tokio::test]
    async fn snapshot_upsert_replaces_prior_row() {
        let store = InMemorySnapshotStore::new();
        let now = Utc::now();
        let mut snapshot = PersistedSnapshot {
            subject_id: "s-1".into(),
            results: Vec::new(),
            created_at: now,
            expires_at: now + Duration::seconds(300),
        };
        store.persist_snapshot(&snapshot).await.unwrap();

        snapshot.expires_at = now + Duration::seconds(600);
        store.persist_snapshot(&snapshot).await.unwrap();

        assert_eq!(store.len(), 1);
        let loaded = store.load_snapshot("s-1").await.unwrap().unwrap();
        assert_eq!(loaded.expires_at, snapshot.expires_at);
        assert!(store.load_snapshot("s-2").await.unwrap().is_none());
    }

    #[test]
    fn in_memory_backend_config_builds() {
        assert!(SnapshotBackendConfig::default().build().is_ok());
    }
}
