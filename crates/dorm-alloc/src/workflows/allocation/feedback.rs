use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    AllocationFeedback, AllocationId, AllocationRecord, FeedbackId, FeedbackSubmission, StudentId,
    WeightDimension,
};
use super::weights::WeightConfig;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Validation errors raised before feedback is stored.
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("{field} must be between 1 and 5, got {value}")]
    InvalidRating { field: &'static str, value: u8 },
    #[error("allocation {0} not found")]
    UnknownAllocation(AllocationId),
    #[error("allocation {allocation_id} does not belong to student {student_id}")]
    ForeignAllocation {
        allocation_id: AllocationId,
        student_id: StudentId,
    },
    #[error("feedback for allocation {allocation_id} already submitted by {student_id}")]
    Duplicate {
        allocation_id: AllocationId,
        student_id: StudentId,
    },
}

/// Acknowledgement returned to the submitting student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackReceipt {
    pub success: bool,
    pub feedback_id: FeedbackId,
    pub message: String,
}

/// Aggregate satisfaction figures; descriptive only, weights are never tuned from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationStatistics {
    pub total_feedbacks: usize,
    pub average_roommate_satisfaction: f64,
    pub average_environment_satisfaction: f64,
    pub average_overall_satisfaction: f64,
    pub satisfaction_distribution: BTreeMap<u8, usize>,
    pub willing_to_switch: usize,
    pub current_weights: BTreeMap<WeightDimension, f64>,
}

/// Validation and aggregation rules for allocation feedback.
pub struct FeedbackAggregator {
    verify_allocation: bool,
}

impl FeedbackAggregator {
    pub fn new(verify_allocation: bool) -> Self {
        Self { verify_allocation }
    }

    pub fn verifies_allocation(&self) -> bool {
        self.verify_allocation
    }

    /// Rejects out-of-range ratings, and when verification is on, allocations
    /// that are missing or belong to someone else. `allocation` is the ledger
    /// lookup for the referenced id.
    pub fn validate(
        &self,
        submission: &FeedbackSubmission,
        allocation: Option<&AllocationRecord>,
        previous: &[AllocationFeedback],
    ) -> Result<(), FeedbackError> {
        for (field, value) in [
            ("roommate_satisfaction", submission.roommate_satisfaction),
            ("environment_satisfaction", submission.environment_satisfaction),
            ("overall_satisfaction", submission.overall_satisfaction),
        ] {
            if !(MIN_RATING..=MAX_RATING).contains(&value) {
                return Err(FeedbackError::InvalidRating { field, value });
            }
        }

        if self.verify_allocation {
            match allocation {
                None => return Err(FeedbackError::UnknownAllocation(submission.allocation_id)),
                Some(record) if record.student_id != submission.student_id => {
                    return Err(FeedbackError::ForeignAllocation {
                        allocation_id: submission.allocation_id,
                        student_id: submission.student_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        if previous
            .iter()
            .any(|feedback| feedback.allocation_id == submission.allocation_id)
        {
            return Err(FeedbackError::Duplicate {
                allocation_id: submission.allocation_id,
                student_id: submission.student_id.clone(),
            });
        }

        Ok(())
    }

    pub fn statistics(
        &self,
        feedbacks: &[AllocationFeedback],
        weights: &WeightConfig,
    ) -> AllocationStatistics {
        let total = feedbacks.len();
        let mean = |rating: fn(&AllocationFeedback) -> u8| -> f64 {
            if total == 0 {
                return 0.0;
            }
            let sum: u64 = feedbacks.iter().map(|f| u64::from(rating(f))).sum();
            sum as f64 / total as f64
        };

        let mut distribution = BTreeMap::new();
        for feedback in feedbacks {
            *distribution.entry(feedback.satisfaction_bucket()).or_insert(0) += 1;
        }

        AllocationStatistics {
            total_feedbacks: total,
            average_roommate_satisfaction: mean(|f| f.roommate_satisfaction),
            average_environment_satisfaction: mean(|f| f.environment_satisfaction),
            average_overall_satisfaction: mean(|f| f.overall_satisfaction),
            satisfaction_distribution: distribution,
            willing_to_switch: feedbacks.iter().filter(|f| f.willing_to_switch).count(),
            current_weights: weights.snapshot(),
        }
    }
}
