use std::sync::Arc;

use chrono::NaiveDate;

use super::domain::{
    AllocationFeedback, AllocationId, AllocationRecord, Bed, BedId, BedStatus, Dormitory,
    DormitoryId, FeedbackSubmission, Gender, NewAllocation, QuestionnaireAnswer, RoommateTag,
    StudentId, StudentProfile, WeightEntry,
};

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists or was claimed concurrently")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Read access to the campus student directory.
pub trait StudentDirectory: Send + Sync {
    fn get(&self, id: &StudentId) -> Result<Option<StudentProfile>, RepositoryError>;
    fn list_by_major(&self, major: &str) -> Result<Vec<StudentProfile>, RepositoryError>;
}

pub trait QuestionnaireStore: Send + Sync {
    fn answers_for(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<QuestionnaireAnswer>, RepositoryError>;
}

pub trait TagStore: Send + Sync {
    fn tags_for(&self, student_id: &StudentId) -> Result<Vec<RoommateTag>, RepositoryError>;
}

/// Optional restrictions applied when listing beds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BedFilter {
    pub dormitory_id: Option<DormitoryId>,
    pub status: Option<BedStatus>,
}

impl BedFilter {
    pub fn available() -> Self {
        Self {
            dormitory_id: None,
            status: Some(BedStatus::Available),
        }
    }

    pub fn matches(&self, bed: &Bed) -> bool {
        self.dormitory_id
            .as_ref()
            .map_or(true, |id| *id == bed.dormitory_id)
            && self.status.map_or(true, |status| status == bed.status)
    }
}

/// Room and bed inventory. Bed occupancy only changes through `claim_bed`
/// and `release_bed`.
pub trait RoomInventory: Send + Sync {
    /// Beds in stable listing order.
    fn list_beds(&self, filter: &BedFilter) -> Result<Vec<Bed>, RepositoryError>;
    fn get_bed(&self, id: &BedId) -> Result<Option<Bed>, RepositoryError>;
    fn get_room(&self, id: &DormitoryId) -> Result<Option<Dormitory>, RepositoryError>;
    /// Atomically flips an available bed to occupied; `Conflict` if it was taken.
    fn claim_bed(&self, id: &BedId) -> Result<Bed, RepositoryError>;
    fn release_bed(&self, id: &BedId) -> Result<(), RepositoryError>;
    /// Applies an occupancy delta and recomputes the room status.
    fn update_room_occupancy(
        &self,
        id: &DormitoryId,
        delta: i32,
    ) -> Result<Dormitory, RepositoryError>;
    fn restrict_room_gender(&self, id: &DormitoryId, gender: Gender)
        -> Result<(), RepositoryError>;
}

pub trait AllocationLedger: Send + Sync {
    fn insert(&self, allocation: NewAllocation) -> Result<AllocationRecord, RepositoryError>;
    fn find(&self, id: AllocationId) -> Result<Option<AllocationRecord>, RepositoryError>;
    fn find_active_by_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<AllocationRecord>, RepositoryError>;
    fn find_active_by_room(
        &self,
        dormitory_id: &DormitoryId,
    ) -> Result<Vec<AllocationRecord>, RepositoryError>;
    fn end(&self, id: AllocationId, check_out: NaiveDate)
        -> Result<AllocationRecord, RepositoryError>;
    /// Drops a record whose placement was rolled back before it took effect.
    fn remove(&self, id: AllocationId) -> Result<(), RepositoryError>;
}

/// Weight configuration is maintained by an external admin operation.
pub trait WeightStore: Send + Sync {
    fn list_weights(&self) -> Result<Vec<WeightEntry>, RepositoryError>;
}

pub trait FeedbackStore: Send + Sync {
    fn append(&self, feedback: FeedbackSubmission) -> Result<AllocationFeedback, RepositoryError>;
    fn list_all(&self) -> Result<Vec<AllocationFeedback>, RepositoryError>;
    fn list_by_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<AllocationFeedback>, RepositoryError>;
}

/// Every collaborator the allocation service reads from or writes to.
#[derive(Clone)]
pub struct AllocationStores {
    pub students: Arc<dyn StudentDirectory>,
    pub questionnaires: Arc<dyn QuestionnaireStore>,
    pub tags: Arc<dyn TagStore>,
    pub inventory: Arc<dyn RoomInventory>,
    pub ledger: Arc<dyn AllocationLedger>,
    pub weights: Arc<dyn WeightStore>,
    pub feedback: Arc<dyn FeedbackStore>,
}

impl AllocationStores {
    /// Wires a single backing store that implements every collaborator.
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: StudentDirectory
            + QuestionnaireStore
            + TagStore
            + RoomInventory
            + AllocationLedger
            + WeightStore
            + FeedbackStore
            + 'static,
    {
        Self {
            students: store.clone(),
            questionnaires: store.clone(),
            tags: store.clone(),
            inventory: store.clone(),
            ledger: store.clone(),
            weights: store.clone(),
            feedback: store,
        }
    }
}
