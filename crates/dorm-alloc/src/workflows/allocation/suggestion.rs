use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::domain::StudentId;
use super::scoring::{CompatibilityScore, CompatibilityScorer, ScoringProfile};

/// A candidate roommate and how well they match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub candidate_id: StudentId,
    pub candidate_name: String,
    pub compatibility_score: f64,
    pub breakdown: CompatibilityScore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub student_id: StudentId,
    pub student_major: String,
    pub suggestions: Vec<Suggestion>,
}

/// Ranks candidates by descending score, breaking ties by candidate id.
pub struct SuggestionRanker<'a> {
    scorer: &'a CompatibilityScorer,
    limit: usize,
}

impl<'a> SuggestionRanker<'a> {
    pub fn new(scorer: &'a CompatibilityScorer, limit: usize) -> Self {
        Self { scorer, limit }
    }

    /// The student itself is never part of the result, even if it shows up
    /// in `candidates`.
    pub fn rank(&self, student: &ScoringProfile, candidates: &[ScoringProfile]) -> Vec<Suggestion> {
        let mut ranked: Vec<Suggestion> = candidates
            .iter()
            .filter(|candidate| candidate.id() != student.id())
            .map(|candidate| {
                let breakdown = self.scorer.score(student, candidate);
                Suggestion {
                    candidate_id: candidate.id().clone(),
                    candidate_name: candidate.profile.name.clone(),
                    compatibility_score: breakdown.total,
                    breakdown,
                }
            })
            .collect();

        ranked.sort_by(|a, b| {
            match b.compatibility_score.total_cmp(&a.compatibility_score) {
                Ordering::Equal => a.candidate_id.cmp(&b.candidate_id),
                other => other,
            }
        });
        ranked.truncate(self.limit);
        ranked
    }
}
