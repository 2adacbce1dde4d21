//! Roommate-aware dormitory allocation: compatibility scoring, greedy room
//! grouping with bed binding, roommate suggestions and satisfaction feedback.

pub(crate) mod capacity;
pub mod domain;
pub mod feedback;
pub mod memory;
pub(crate) mod planner;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod suggestion;
pub mod weights;

#[cfg(test)]
mod tests;

pub use domain::{
    AllocationFeedback, AllocationId, AllocationRecord, AllocationStatus, Bed, BedId, BedStatus,
    BedType, BuildingId, CleanlinessLevel, Dormitory, DormitoryId, EatingHabit, FeedbackId,
    FeedbackSubmission, Gender, NoiseTolerance, QuestionnaireAnswer, RoomStatus, RoommateTag,
    SleepSchedule, SpendingHabit, StudentId, StudentProfile, TagKind, TagSource, WeightDimension,
    WeightEntry,
};
pub use feedback::{AllocationStatistics, FeedbackError, FeedbackReceipt};
pub use memory::InMemoryCampus;
pub use planner::Placement;
pub use repository::{
    AllocationLedger, AllocationStores, BedFilter, FeedbackStore, QuestionnaireStore,
    RepositoryError, RoomInventory, StudentDirectory, TagStore, WeightStore,
};
pub use router::allocation_router;
pub use scoring::{CompatibilityScore, CompatibilityScorer, ScoringProfile};
pub use service::{
    AllocationOutcome, AllocationServiceError, AllocationSettings, DormitoryAllocationService,
};
pub use suggestion::{Suggestion, Suggestions};
pub use weights::WeightConfig;
