use std::collections::BTreeSet;

use super::super::domain::{QuestionnaireAnswer, RoommateTag};

pub(crate) fn normalized_tag_names(tags: &[RoommateTag]) -> BTreeSet<String> {
    tags.iter()
        .map(|tag| tag.name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Fraction of lifestyle fields answered identically; 0.0 if either side is missing.
pub(crate) fn questionnaire_similarity(
    a: Option<&QuestionnaireAnswer>,
    b: Option<&QuestionnaireAnswer>,
) -> f64 {
    match (a, b) {
        (Some(a), Some(b)) => {
            a.matching_fields(b) as f64 / QuestionnaireAnswer::LIFESTYLE_FIELDS as f64
        }
        _ => 0.0,
    }
}

/// Jaccard index over tag names; 0.0 if either set is empty.
pub(crate) fn tag_similarity(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

pub(crate) fn exact_match<T: PartialEq + ?Sized>(a: &T, b: &T) -> f64 {
    if a == b {
        1.0
    } else {
        0.0
    }
}
