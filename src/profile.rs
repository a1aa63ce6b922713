//! Typed profile and result records shared by scoring, caching and the
//! HTTP layer.
//!
//! Every collection field defaults to empty on deserialization so that a
//! sparse profile (a student who has not filled in their interests yet)
//! scores as "no overlap" instead of failing to parse.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The party seeking a match (a student).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubjectProfile {
    /// May be omitted where the id is carried elsewhere, e.g. an HTTP path.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Domain-of-interest tags.
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub career_goals: Option<String>,
}

/// Mentoring load of a candidate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capacity {
    /// Mentees currently assigned.
    pub current: u32,
    /// Maximum mentees the candidate accepts.
    pub max: u32,
}

impl Capacity {
    pub fn has_room(&self) -> bool {
        self.current < self.max
    }
}

/// The party being matched against (an alumni mentor).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateProfile {
    #[serde(default)]
    pub id: String,
    /// Display name; not used for scoring.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    /// Expertise domains.
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub years_of_experience: u32,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub capacity: Capacity,
}

/// Per-signal breakdown of a score.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchDetail {
    /// Domains present on both sides, in the candidate's casing.
    pub matched_domains: Vec<String>,
    /// Skills present on both sides, in the candidate's casing.
    pub matched_skills: Vec<String>,
    pub domain_match_count: usize,
    pub skill_match_count: usize,
    /// Whether a career-goal keyword appears in the job title or company.
    pub has_career_alignment: bool,
}

/// A scored candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchResult {
    pub candidate: CandidateProfile,
    pub score: u32,
    pub detail: MatchDetail,
}

/// Durable-tier row: the full ranked pool for one subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedSnapshot {
    pub subject_id: String,
    pub results: Vec<MatchResult>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PersistedSnapshot {
    /// A snapshot is only usable while `now` is strictly before its expiry.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
