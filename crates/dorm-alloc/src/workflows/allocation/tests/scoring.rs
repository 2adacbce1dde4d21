use super::common::*;

use crate::workflows::allocation::domain::{BedType, Gender, WeightDimension, WeightEntry};
use crate::workflows::allocation::scoring::CompatibilityScorer;
use crate::workflows::allocation::weights::WeightConfig;

fn approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn disabled(dimension: WeightDimension) -> WeightEntry {
    WeightEntry {
        dimension,
        weight: 0.5,
        enabled: false,
    }
}

#[test]
fn identical_profiles_score_every_enabled_dimension() {
    let scorer = CompatibilityScorer::new(WeightConfig::default());
    let a = profile("s-1", Gender::Male, "CS", Some(calm_answers("s-1")), &["quiet"]);
    let b = profile("s-2", Gender::Male, "CS", Some(calm_answers("s-2")), &["Quiet"]);

    let score = scorer.score(&a, &b);

    assert_eq!(score.questionnaire, Some(1.0));
    assert_eq!(score.tag, Some(1.0));
    assert_eq!(score.major, Some(1.0));
    assert_eq!(score.gender, Some(1.0));
    // 0.30 + 0.15 + 0.35 + 0.0
    approx(score.total, 0.80);
}

#[test]
fn opposite_lifestyles_and_majors_score_zero() {
    let scorer = CompatibilityScorer::new(WeightConfig::default());
    let a = profile("s-1", Gender::Male, "CS", Some(calm_answers("s-1")), &["quiet"]);
    let b = profile("s-2", Gender::Male, "EE", Some(lively_answers("s-2")), &["gamer"]);

    let score = scorer.score(&a, &b);

    assert_eq!(score.questionnaire, Some(0.0));
    assert_eq!(score.tag, Some(0.0));
    assert_eq!(score.major, Some(0.0));
    approx(score.total, 0.0);
}

#[test]
fn partial_questionnaire_overlap_is_fractional() {
    let scorer = CompatibilityScorer::new(WeightConfig::default());
    let mut other = calm_answers("s-2");
    other.sleep_schedule = lively_answers("s-2").sleep_schedule;
    other.spending_habit = lively_answers("s-2").spending_habit;
    let a = profile("s-1", Gender::Female, "SE", Some(calm_answers("s-1")), &[]);
    let b = profile("s-2", Gender::Female, "SE", Some(other), &[]);

    let score = scorer.score(&a, &b);

    approx(score.questionnaire.expect("enabled"), 0.6);
    approx(score.total, 0.30 * 0.6 + 0.35);
}

#[test]
fn missing_questionnaire_scores_zero_for_that_dimension() {
    let scorer = CompatibilityScorer::new(WeightConfig::default());
    let a = profile("s-1", Gender::Female, "SE", Some(calm_answers("s-1")), &[]);
    let b = profile("s-2", Gender::Female, "SE", None, &[]);

    let score = scorer.score(&a, &b);

    assert_eq!(score.questionnaire, Some(0.0));
    approx(score.total, 0.35);
}

#[test]
fn disabled_dimensions_are_absent_and_contribute_nothing() {
    let weights = WeightConfig::from_entries(&[
        disabled(WeightDimension::Questionnaire),
        disabled(WeightDimension::Tag),
    ]);
    let scorer = CompatibilityScorer::new(weights);
    let a = profile("s-1", Gender::Male, "CS", Some(calm_answers("s-1")), &["quiet"]);
    let b = profile("s-2", Gender::Male, "CS", Some(calm_answers("s-2")), &["quiet"]);

    let score = scorer.score(&a, &b);

    assert!(score.questionnaire.is_none());
    assert!(score.tag.is_none());
    assert_eq!(score.major, Some(1.0));
    approx(score.total, 0.35);
}

#[test]
fn average_against_an_empty_room_is_zero() {
    let scorer = CompatibilityScorer::new(WeightConfig::default());
    let candidate = profile("s-1", Gender::Male, "CS", None, &[]);
    approx(scorer.average_against(&candidate, std::iter::empty()), 0.0);
}

#[test]
fn average_against_occupants_is_the_mean_total() {
    let scorer = CompatibilityScorer::new(WeightConfig::default());
    let candidate = profile("s-1", Gender::Male, "CS", Some(calm_answers("s-1")), &[]);
    let occupants = vec![
        profile("s-2", Gender::Male, "CS", Some(calm_answers("s-2")), &[]),
        profile("s-3", Gender::Male, "EE", Some(lively_answers("s-3")), &[]),
    ];

    // (0.30 + 0.35) and 0.0
    approx(scorer.average_against(&candidate, &occupants), 0.325);
}

#[test]
fn bed_type_score_reflects_preference_and_dimension_state() {
    let scorer = CompatibilityScorer::new(WeightConfig::default());
    assert_eq!(
        scorer.bed_type_score(Some(BedType::Upper), BedType::Upper),
        Some(1.0)
    );
    assert_eq!(
        scorer.bed_type_score(Some(BedType::Upper), BedType::Lower),
        Some(0.0)
    );
    assert_eq!(scorer.bed_type_score(None, BedType::Lower), None);

    let scorer =
        CompatibilityScorer::new(WeightConfig::from_entries(&[disabled(WeightDimension::BedType)]));
    assert_eq!(
        scorer.bed_type_score(Some(BedType::Upper), BedType::Upper),
        None
    );
}
