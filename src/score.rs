//! Deterministic compatibility scoring between a subject and a candidate.
//!
//! The score is a weighted sum of interpretable signals:
//!
//! - overlapping domain tags (`domain_match` points each),
//! - overlapping skill tags (`skill_overlap` points each),
//! - a one-off `career_alignment` point when a career-goal keyword shows up
//!   in the candidate's job title or company,
//! - a flat `experience_bonus` for candidates with at least
//!   `senior_experience_years` of experience.
//!
//! Tag comparison is case-insensitive. The reported [`MatchDetail`] keeps
//! the candidate's casing so the UI shows tags the way the mentor wrote them.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::profile::{CandidateProfile, MatchDetail, MatchResult, SubjectProfile};


/// Immutable weight configuration injected into [`ScoreEngine`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchingWeights {
    /// Points per overlapping domain tag.
    pub domain_match: u32,
    /// Points per overlapping skill tag.
    pub skill_overlap: u32,
    /// Points awarded at most once for career alignment.
    pub career_alignment: u32,
    /// Flat bonus for senior candidates.
    pub experience_bonus: u32,
    /// Years of experience at which the bonus applies (inclusive).
    pub senior_experience_years: u32,
    /// Career-goal tokens must be strictly longer than this many characters.
    pub min_keyword_len: usize,
}

impl Default for MatchingWeights {
    fn default() -> Self {
        Self {
            domain_match: 3,
            skill_overlap: 2,
            career_alignment: 1,
            experience_bonus: 1,
            senior_experience_years: 5,
            min_keyword_len: 3,
        }
    }
}

/// Output of a single scoring pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scored {
    pub score: u32,
    pub detail: MatchDetail,
}

/// Pure scoring engine. Cheap to clone and safe to share across tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreEngine {
    weights: MatchingWeights,
}

impl ScoreEngine {
    pub fn new(weights: MatchingWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &MatchingWeights {
        &self.weights
    }

    /// Only available candidates with spare capacity may be scored.
    pub fn is_eligible(candidate: &CandidateProfile) -> bool {
        candidate.is_available && candidate.capacity.has_room()
    }

    /// Score one candidate against one subject.
    pub fn score(&self, subject: &SubjectProfile, candidate: &CandidateProfile) -> Scored {
        let matched_domains = overlap(&subject.domains, &candidate.domains);
        let matched_skills = overlap(&subject.skills, &candidate.skills);

        let mut score = weighted(matched_domains.len(), self.weights.domain_match)
            .saturating_add(weighted(matched_skills.len(), self.weights.skill_overlap));

        let has_career_alignment = self.has_career_alignment(subject, candidate);
        if has_career_alignment {
            score = score.saturating_add(self.weights.career_alignment);
        }

        if candidate.years_of_experience >= self.weights.senior_experience_years {
            score = score.saturating_add(self.weights.experience_bonus);
        }

        Scored {
            score,
            detail: MatchDetail {
                domain_match_count: matched_domains.len(),
                skill_match_count: matched_skills.len(),
                matched_domains,
                matched_skills,
                has_career_alignment,
            },
        }
    }

    /// Score every eligible candidate in `pool` and return them ranked.
    ///
    /// Ineligible candidates are dropped even if the pool source already
    /// filtered them.
    pub fn rank_pool(
        &self,
        subject: &SubjectProfile,
        pool: Vec<CandidateProfile>,
    ) -> Vec<MatchResult> {
        let mut results: Vec<MatchResult> = pool
            .into_iter()
            .filter(Self::is_eligible)
            .map(|candidate| {
                let Scored { score, detail } = self.score(subject, &candidate);
                MatchResult {
                    candidate,
                    score,
                    detail,
                }
            })
            .collect();
        sort_results(&mut results);
        results
    }

    fn has_career_alignment(&self, subject: &SubjectProfile, candidate: &CandidateProfile) -> bool {
        let Some(goals) = non_empty(subject.career_goals.as_deref()) else {
            return false;
        };
        // A whitespace-only title still counts as present; only absence or
        // the empty string turns alignment off.
        let Some(title) = non_empty(candidate.job_title.as_deref()) else {
            return false;
        };

        let title = title.to_lowercase();
        let company = candidate
            .company
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();

        goals
            .split_whitespace()
            .filter(|token| token.chars().count() > self.weights.min_keyword_len)
            .map(str::to_lowercase)
            .any(|keyword| title.contains(&keyword) || company.contains(&keyword))
    }
}

/// Order by score descending, then candidate id ascending.
pub fn sort_results(results: &mut [MatchResult]) {
    results.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.candidate.id.cmp(&b.candidate.id))
    });
}

/// `count * weight`, saturating at `u32::MAX`.
fn weighted(count: usize, weight: u32) -> u32 {
    u32::try_from(count)
        .unwrap_or(u32::MAX)
        .saturating_mul(weight)
}

/// Candidate tags that also appear (case-insensitively) in the subject's
/// tags, in candidate order, without duplicates.
///
/// Empty tags on either side never match.
fn overlap(subject_tags: &[String], candidate_tags: &[String]) -> Vec<String> {
    let wanted: HashSet<String> = subject_tags
        .iter()
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.to_lowercase())
        .collect();

    let mut seen = HashSet::new();
    candidate_tags
        .iter()
        .filter(|tag| !tag.is_empty())
        .filter(|tag| {
            let key = tag.to_lowercase();
            wanted.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
