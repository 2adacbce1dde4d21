use std::sync::Arc;

use super::common::*;

use crate::workflows::allocation::domain::Gender;
use crate::workflows::allocation::memory::InMemoryCampus;
use crate::workflows::allocation::repository::AllocationStores;
use crate::workflows::allocation::scoring::CompatibilityScorer;
use crate::workflows::allocation::service::{
    AllocationServiceError, AllocationSettings, DormitoryAllocationService,
};
use crate::workflows::allocation::suggestion::SuggestionRanker;
use crate::workflows::allocation::weights::WeightConfig;

#[test]
fn ranker_sorts_descending_and_breaks_ties_by_id() {
    let scorer = CompatibilityScorer::new(WeightConfig::default());
    let student = profile("s-1", Gender::Male, "CS", Some(calm_answers("s-1")), &["quiet"]);
    let candidates = vec![
        profile("s-4", Gender::Male, "CS", Some(lively_answers("s-4")), &[]),
        profile("s-3", Gender::Male, "CS", Some(calm_answers("s-3")), &[]),
        profile("s-2", Gender::Male, "CS", Some(calm_answers("s-2")), &["quiet"]),
        profile("s-0", Gender::Male, "CS", Some(calm_answers("s-0")), &[]),
    ];

    let ranked = SuggestionRanker::new(&scorer, 5).rank(&student, &candidates);

    let ids: Vec<&str> = ranked
        .iter()
        .map(|suggestion| suggestion.candidate_id.0.as_str())
        .collect();
    assert_eq!(ids, vec!["s-2", "s-0", "s-3", "s-4"]);
    for pair in ranked.windows(2) {
        assert!(pair[0].compatibility_score >= pair[1].compatibility_score);
    }
}

#[test]
fn ranker_excludes_the_student_and_truncates() {
    let scorer = CompatibilityScorer::new(WeightConfig::default());
    let student = profile("s-1", Gender::Male, "CS", None, &[]);
    let candidates: Vec<_> = (0..8)
        .map(|index| profile(&format!("s-{index}"), Gender::Male, "CS", None, &[]))
        .collect();

    let ranked = SuggestionRanker::new(&scorer, 3).rank(&student, &candidates);

    assert_eq!(ranked.len(), 3);
    assert!(ranked
        .iter()
        .all(|suggestion| suggestion.candidate_id != sid("s-1")));
}

fn suggestion_campus() -> Arc<InMemoryCampus> {
    let campus = Arc::new(InMemoryCampus::new());
    enroll(&campus, "s-1", Gender::Female, "SE", Some(calm_answers("s-1")));
    enroll(&campus, "s-2", Gender::Female, "SE", Some(lively_answers("s-2")));
    enroll(&campus, "s-3", Gender::Female, "SE", Some(calm_answers("s-3")));
    enroll(&campus, "s-4", Gender::Male, "SE", Some(calm_answers("s-4")));
    enroll(&campus, "s-5", Gender::Female, "CS", Some(calm_answers("s-5")));
    campus
}

#[test]
fn suggest_limits_the_pool_to_same_major_and_gender() {
    let service = build_service(suggestion_campus());

    let result = service.suggest(&sid("s-1")).expect("suggestions");

    assert_eq!(result.student_major, "SE");
    let ids: Vec<&str> = result
        .suggestions
        .iter()
        .map(|suggestion| suggestion.candidate_id.0.as_str())
        .collect();
    assert_eq!(ids, vec!["s-3", "s-2"]);
    assert_eq!(result.suggestions[0].candidate_name, "Student s-3");
    assert_eq!(result.suggestions[0].breakdown.questionnaire, Some(1.0));
}

#[test]
fn suggest_respects_the_configured_limit() {
    let service = build_service_with(
        suggestion_campus(),
        AllocationSettings {
            suggestion_limit: 1,
            ..AllocationSettings::default()
        },
    );

    let result = service.suggest(&sid("s-1")).expect("suggestions");

    assert_eq!(result.suggestions.len(), 1);
}

#[test]
fn suggest_for_unknown_student_is_not_found() {
    let service = build_service(suggestion_campus());

    let err = service.suggest(&sid("ghost")).expect_err("unknown student");

    assert!(matches!(err, AllocationServiceError::StudentNotFound(ref id) if *id == sid("ghost")));
    assert!(err.to_string().contains("not found"));
}

#[test]
fn suggest_propagates_directory_outages() {
    let campus = suggestion_campus();
    let mut stores = AllocationStores::from_shared(campus);
    stores.students = Arc::new(UnavailableDirectory);
    let service = DormitoryAllocationService::new(stores, AllocationSettings::default());

    let err = service.suggest(&sid("s-1")).expect_err("directory offline");

    assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
}
