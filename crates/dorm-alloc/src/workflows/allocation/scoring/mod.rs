mod rules;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{
    BedType, Gender, QuestionnaireAnswer, RoommateTag, StudentId, StudentProfile, WeightDimension,
};
use super::weights::WeightConfig;

/// Everything the scorer knows about one student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringProfile {
    pub profile: StudentProfile,
    pub questionnaire: Option<QuestionnaireAnswer>,
    tag_names: BTreeSet<String>,
}

impl ScoringProfile {
    pub fn new(
        profile: StudentProfile,
        questionnaire: Option<QuestionnaireAnswer>,
        tags: &[RoommateTag],
    ) -> Self {
        Self {
            profile,
            questionnaire,
            tag_names: rules::normalized_tag_names(tags),
        }
    }

    pub fn id(&self) -> &StudentId {
        &self.profile.id
    }

    pub fn gender(&self) -> Gender {
        self.profile.gender
    }

    pub fn major(&self) -> &str {
        &self.profile.major
    }

    pub fn bed_preference(&self) -> Option<BedType> {
        self.questionnaire
            .as_ref()
            .and_then(|answer| answer.bed_preference)
    }

    /// Deduplicated, normalized tag names.
    pub fn tag_names(&self) -> &BTreeSet<String> {
        &self.tag_names
    }
}

/// Per-dimension breakdown of a pairwise score. Disabled dimensions are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CompatibilityScore {
    pub questionnaire: Option<f64>,
    pub tag: Option<f64>,
    pub major: Option<f64>,
    pub gender: Option<f64>,
    pub total: f64,
}

/// Pure pairwise scorer bound to one weight snapshot.
#[derive(Debug, Clone)]
pub struct CompatibilityScorer {
    weights: WeightConfig,
}

impl CompatibilityScorer {
    pub fn new(weights: WeightConfig) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &WeightConfig {
        &self.weights
    }

    pub fn score(&self, a: &ScoringProfile, b: &ScoringProfile) -> CompatibilityScore {
        let mut score = CompatibilityScore::default();

        if let Some(weight) = self.weights.enabled_weight(WeightDimension::Questionnaire) {
            let sub = rules::questionnaire_similarity(
                a.questionnaire.as_ref(),
                b.questionnaire.as_ref(),
            );
            score.questionnaire = Some(sub);
            score.total += weight * sub;
        }

        if let Some(weight) = self.weights.enabled_weight(WeightDimension::Tag) {
            let sub = rules::tag_similarity(&a.tag_names, &b.tag_names);
            score.tag = Some(sub);
            score.total += weight * sub;
        }

        if let Some(weight) = self.weights.enabled_weight(WeightDimension::Major) {
            let sub = rules::exact_match(a.major(), b.major());
            score.major = Some(sub);
            score.total += weight * sub;
        }

        if let Some(weight) = self.weights.enabled_weight(WeightDimension::Gender) {
            let sub = rules::exact_match(&a.gender(), &b.gender());
            score.gender = Some(sub);
            score.total += weight * sub;
        }

        score
    }

    /// Mean total score of `candidate` against every occupant; 0.0 for an empty room.
    pub fn average_against<'a, I>(&self, candidate: &ScoringProfile, occupants: I) -> f64
    where
        I: IntoIterator<Item = &'a ScoringProfile>,
    {
        let (sum, count) = occupants
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), occupant| {
                (sum + self.score(candidate, occupant).total, count + 1)
            });

        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// Bed-type sub-score; `None` when the dimension is off or no preference exists.
    pub fn bed_type_score(
        &self,
        preference: Option<BedType>,
        assigned: BedType,
    ) -> Option<f64> {
        if !self.weights.is_enabled(WeightDimension::BedType) {
            return None;
        }
        preference.map(|preferred| rules::exact_match(&preferred, &assigned))
    }
}
