//! Write-through, two-tier match cache.
//!
//! The fast tier is an in-process map from subject id to the full ranked
//! candidate pool, guarded by a single `RwLock`. Entries carry a TTL and are
//! checked lazily on read; nothing sweeps them in the background.
//!
//! Every recompute is written to the durable [`SnapshotStore`] first and to
//! the fast tier second, so a failed persist leaves the fast tier untouched.
//! Reads only ever consult the fast tier. The durable tier comes back into
//! play through [`MatchCache::warm`], an explicit recovery step.
//!
//! Concurrent misses for the same subject may recompute twice; the last
//! write wins. Scoring is deterministic, so the duplicate work is harmless.
//!
//! Each subject carries a generation that [`MatchCache::invalidate`] and
//! [`MatchCache::clear_all`] advance. A recompute remembers the generation
//! it started under and skips the fast-tier install if it moved, so a
//! ranking built from a profile that was replaced mid-flight is returned
//! to its caller but never cached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::error::MatchError;
use crate::profile::{MatchResult, PersistedSnapshot};
use crate::score::ScoreEngine;
use crate::store::{PoolFilter, ProfileSource, SnapshotStore};

/// Default time-to-live for both tiers.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Upper bound accepted for a TTL.
pub const MAX_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Cache tuning. Construct through [`CacheConfig::new`] to get validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    ttl: Duration,
}

impl CacheConfig {
    pub fn new(ttl: Duration) -> Result<Self, MatchError> {
        if ttl.is_zero() {
            return Err(MatchError::Validation(
                "cache ttl must be greater than zero".into(),
            ));
        }
        if ttl > MAX_TTL {
            return Err(MatchError::Validation(format!(
                "cache ttl must be at most {}s",
                MAX_TTL.as_secs()
            )));
        }
        Ok(Self { ttl })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

struct CacheEntry {
    results: Arc<[MatchResult]>,
    created_at: Instant,
    expires_at: Instant,
}

/// Marks the state of a subject's cache slot when a recompute began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Generation {
    epoch: u64,
    subject: u64,
}

#[derive(Default)]
struct FastTier {
    entries: HashMap<String, CacheEntry>,
    /// Bumped per subject by `invalidate`.
    generations: HashMap<String, u64>,
    /// Bumped by `clear_all`.
    epoch: u64,
}

impl FastTier {
    fn generation(&self, subject_id: &str) -> Generation {
        Generation {
            epoch: self.epoch,
            subject: self.generations.get(subject_id).copied().unwrap_or(0),
        }
    }
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    recomputes: AtomicU64,
    invalidations: AtomicU64,
}

/// Point-in-time view of cache activity.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub recomputes: u64,
    pub invalidations: u64,
    /// Fast-tier entries, live or expired-but-not-yet-replaced.
    pub entries: usize,
}

/// Ranked, paginated matches for a subject, backed by the two cache tiers.
///
/// One instance is owned by whatever composes the service and shared as
/// `Arc<MatchCache>`; tests build a fresh instance each.
pub struct MatchCache {
    profiles: Arc<dyn ProfileSource>,
    snapshots: Arc<dyn SnapshotStore>,
    engine: ScoreEngine,
    config: CacheConfig,
    tier: RwLock<FastTier>,
    counters: Counters,
}

impl MatchCache {
    pub fn new(
        profiles: Arc<dyn ProfileSource>,
        snapshots: Arc<dyn SnapshotStore>,
        engine: ScoreEngine,
        config: CacheConfig,
    ) -> Self {
        Self {
            profiles,
            snapshots,
            engine,
            config,
            tier: RwLock::new(FastTier::default()),
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn engine(&self) -> &ScoreEngine {
        &self.engine
    }

    /// Return at most `limit` top-ranked matches for `subject_id`.
    ///
    /// A live fast-tier entry is served as-is unless `force_refresh` is set.
    /// Otherwise the subject and the eligible pool are loaded, scored,
    /// persisted to the durable tier and installed in the fast tier.
    ///
    /// # Errors
    /// - [`MatchError::Validation`] when `limit` is zero.
    /// - [`MatchError::NotFound`] when the subject has no profile.
    /// - [`MatchError::Collaborator`] when a load or the persist fails; in
    ///   that case neither tier is modified.
    pub async fn get_matches(
        &self,
        subject_id: &str,
        limit: usize,
        force_refresh: bool,
    ) -> Result<Vec<MatchResult>, MatchError> {
        if limit == 0 {
            return Err(MatchError::Validation(
                "limit must be greater than zero".into(),
            ));
        }

        if !force_refresh {
            if let Some(results) = self.lookup(subject_id) {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                metrics::counter!("mentormatch_cache_hits_total").increment(1);
                tracing::debug!(subject_id, limit, cached = results.len(), "match cache hit");
                return Ok(page(&results, limit));
            }
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("mentormatch_cache_misses_total").increment(1);
        }

        let results = self.recompute(subject_id).await?;
        Ok(page(&results, limit))
    }

    /// Drop the fast-tier entry for `subject_id`. Returns whether one existed.
    ///
    /// The durable row is left alone; the next recompute overwrites it.
    ///
    /// A recompute already in flight for the subject will not install its
    /// result afterwards.
    pub fn invalidate(&self, subject_id: &str) -> bool {
        let removed = {
            let mut tier = self.write_tier();
            *tier.generations.entry(subject_id.to_string()).or_insert(0) += 1;
            tier.entries.remove(subject_id).is_some()
        };
        self.counters.invalidations.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("mentormatch_invalidations_total").increment(1);
        tracing::debug!(subject_id, removed, "match cache invalidated");
        removed
    }

    /// Drop every fast-tier entry. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let removed = {
            let mut tier = self.write_tier();
            let removed = tier.entries.len();
            tier.entries.clear();
            tier.generations.clear();
            tier.epoch += 1;
            removed
        };
        tracing::info!(removed, "match cache cleared");
        removed
    }

    /// Reinstall a subject's durable snapshot in the fast tier.
    ///
    /// Only a snapshot that has not yet expired is installed, and it keeps
    /// its original expiry. Returns whether an entry was installed.
    pub async fn warm(&self, subject_id: &str) -> Result<bool, MatchError> {
        let generation = self.read_tier().generation(subject_id);
        let Some(snapshot) = self.snapshots.load_snapshot(subject_id).await? else {
            tracing::debug!(subject_id, "no durable snapshot to warm from");
            return Ok(false);
        };

        let now_utc = Utc::now();
        if !snapshot.is_live(now_utc) {
            tracing::debug!(
                subject_id,
                expired_at = %snapshot.expires_at,
                "durable snapshot expired; not warming"
            );
            return Ok(false);
        }

        let remaining = (snapshot.expires_at - now_utc)
            .to_std()
            .unwrap_or_default()
            .min(self.config.ttl);
        let entries = snapshot.results.len();
        if !self.install(subject_id, snapshot.results.into(), remaining, generation) {
            return Ok(false);
        }

        tracing::info!(subject_id, entries, remaining_secs = remaining.as_secs(), "match cache warmed");
        Ok(true)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            recomputes: self.counters.recomputes.load(Ordering::Relaxed),
            invalidations: self.counters.invalidations.load(Ordering::Relaxed),
            entries: self.read_tier().entries.len(),
        }
    }

    /// Age of the live fast-tier entry, if any.
    pub fn entry_age(&self, subject_id: &str) -> Option<Duration> {
        let now = Instant::now();
        self.read_tier()
            .entries
            .get(subject_id)
            .filter(|entry| entry.is_live(now))
            .map(|entry| now.duration_since(entry.created_at))
    }

    fn lookup(&self, subject_id: &str) -> Option<Arc<[MatchResult]>> {
        let now = Instant::now();
        self.read_tier()
            .entries
            .get(subject_id)
            .filter(|entry| entry.is_live(now))
            .map(|entry| Arc::clone(&entry.results))
    }

    async fn recompute(&self, subject_id: &str) -> Result<Arc<[MatchResult]>, MatchError> {
        let started = Instant::now();
        let generation = self.read_tier().generation(subject_id);

        let subject = self
            .profiles
            .load_subject_profile(subject_id)
            .await
            .inspect_err(|err| tracing::warn!(subject_id, error = %err, "subject load failed"))?
            .ok_or_else(|| MatchError::NotFound(subject_id.to_string()))?;

        let pool = self
            .profiles
            .load_candidate_pool(PoolFilter::eligible_mentors())
            .await
            .inspect_err(|err| tracing::warn!(subject_id, error = %err, "candidate pool load failed"))?;
        let pool_size = pool.len();

        let ranked = self.engine.rank_pool(&subject, pool);

        let created_at = Utc::now();
        let snapshot = PersistedSnapshot {
            subject_id: subject_id.to_string(),
            results: ranked,
            created_at,
            expires_at: utc_expiry(created_at, self.config.ttl),
        };
        self.snapshots
            .persist_snapshot(&snapshot)
            .await
            .inspect_err(|err| tracing::warn!(subject_id, error = %err, "snapshot persist failed"))?;

        let results: Arc<[MatchResult]> = snapshot.results.into();
        let installed = self.install(subject_id, Arc::clone(&results), self.config.ttl, generation);

        let elapsed = started.elapsed();
        self.counters.recomputes.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("mentormatch_recomputes_total").increment(1);
        metrics::histogram!("mentormatch_recompute_seconds").record(elapsed.as_secs_f64());
        tracing::info!(
            subject_id,
            pool_size,
            ranked = results.len(),
            installed,
            elapsed_ms = elapsed.as_millis() as u64,
            "match pool recomputed"
        );

        Ok(results)
    }

    /// Insert unless the subject was invalidated since `generation` was
    /// taken. Returns whether the entry was installed.
    fn install(
        &self,
        subject_id: &str,
        results: Arc<[MatchResult]>,
        ttl: Duration,
        generation: Generation,
    ) -> bool {
        let now = Instant::now();
        let mut tier = self.write_tier();
        if tier.generation(subject_id) != generation {
            tracing::debug!(subject_id, "subject invalidated during recompute; not caching");
            return false;
        }
        tier.entries.insert(
            subject_id.to_string(),
            CacheEntry {
                results,
                created_at: now,
                expires_at: now + ttl,
            },
        );
        true
    }

    fn read_tier(&self) -> RwLockReadGuard<'_, FastTier> {
        self.tier
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_tier(&self) -> RwLockWriteGuard<'_, FastTier> {
        self.tier
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn page(results: &[MatchResult], limit: usize) -> Vec<MatchResult> {
    results.iter().take(limit).cloned().collect()
}

fn utc_expiry(created_at: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| created_at.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
