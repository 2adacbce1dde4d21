use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use axum::http::StatusCode;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::capacity::CapacityModel;
use super::domain::{
    AllocationFeedback, AllocationRecord, BedId, DormitoryId, FeedbackSubmission, Gender,
    NewAllocation, StudentId, StudentProfile,
};
use super::feedback::{AllocationStatistics, FeedbackAggregator, FeedbackError, FeedbackReceipt};
use super::planner::{
    AllocationPlanner, CommitError, Placement, PlacementCommitter, PlannedPlacement,
};
use super::repository::{AllocationStores, RepositoryError};
use super::scoring::{CompatibilityScorer, ScoringProfile};
use super::suggestion::{SuggestionRanker, Suggestions};
use super::weights::WeightConfig;

/// Runtime knobs for the allocation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationSettings {
    /// Claim conflicts tolerated per student before giving up on them.
    pub max_claim_retries: u8,
    pub suggestion_limit: usize,
    /// Require feedback to reference an allocation owned by the submitter.
    pub verify_feedback_allocation: bool,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            max_claim_retries: 3,
            suggestion_limit: 5,
            verify_feedback_allocation: true,
        }
    }
}

/// Result of one batch allocation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub allocations: Vec<Placement>,
    pub unallocated_students: Vec<StudentId>,
    pub already_allocated: Vec<StudentId>,
    pub unknown_students: Vec<StudentId>,
    pub total_allocated: usize,
    pub total_unallocated: usize,
}

/// Facade over scoring, planning, suggestions and feedback.
pub struct DormitoryAllocationService {
    stores: AllocationStores,
    settings: AllocationSettings,
    lock: Mutex<()>,
}

impl DormitoryAllocationService {
    pub fn new(stores: AllocationStores, settings: AllocationSettings) -> Self {
        Self {
            stores,
            settings,
            lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &AllocationSettings {
        &self.settings
    }

    /// Allocate beds for `student_ids`, dated today.
    pub fn allocate(
        &self,
        student_ids: &[StudentId],
    ) -> Result<AllocationOutcome, AllocationServiceError> {
        self.allocate_as_of(student_ids, Utc::now().date_naive())
    }

    pub fn allocate_as_of(
        &self,
        student_ids: &[StudentId],
        check_in: NaiveDate,
    ) -> Result<AllocationOutcome, AllocationServiceError> {
        let _guard = self.exclusive();
        let mut outcome = AllocationOutcome::default();
        let mut seen = HashSet::new();
        let mut batch = Vec::new();

        for id in student_ids {
            if !seen.insert(id.clone()) {
                continue;
            }
            let Some(profile) = self.stores.students.get(id)? else {
                outcome.unknown_students.push(id.clone());
                continue;
            };
            if !self.stores.ledger.find_active_by_student(id)?.is_empty() {
                outcome.already_allocated.push(id.clone());
                continue;
            }
            batch.push(self.scoring_profile(profile)?);
        }

        if batch.is_empty() {
            info!(
                requested = student_ids.len(),
                already_allocated = outcome.already_allocated.len(),
                unknown = outcome.unknown_students.len(),
                "nothing to allocate"
            );
            return Ok(outcome);
        }

        let scorer = CompatibilityScorer::new(self.load_weights()?);
        let mut model = CapacityModel::load(
            self.stores.inventory.as_ref(),
            self.stores.ledger.as_ref(),
            |id| self.load_profile(id),
        )?;
        info!(
            batch = batch.len(),
            free_beds = model.free_bed_count(),
            "starting allocation run"
        );

        let mut committer = StoreCommitter {
            stores: &self.stores,
            check_in,
        };
        let report = AllocationPlanner::new(&scorer, self.settings.max_claim_retries).plan(
            batch,
            &mut model,
            &mut committer,
        );

        outcome.total_allocated = report.placements.len();
        outcome.total_unallocated = report.unallocated.len();
        outcome.allocations = report.placements;
        outcome.unallocated_students = report.unallocated;

        info!(
            allocated = outcome.total_allocated,
            unallocated = outcome.total_unallocated,
            already_allocated = outcome.already_allocated.len(),
            unknown = outcome.unknown_students.len(),
            "allocation run finished"
        );
        Ok(outcome)
    }

    /// Top compatible roommates of the same major and gender.
    pub fn suggest(&self, student_id: &StudentId) -> Result<Suggestions, AllocationServiceError> {
        let profile = self
            .stores
            .students
            .get(student_id)?
            .ok_or_else(|| AllocationServiceError::StudentNotFound(student_id.clone()))?;
        let major = profile.major.clone();
        let gender = profile.gender;
        let student = self.scoring_profile(profile)?;

        let mut candidates = Vec::new();
        for candidate in self.stores.students.list_by_major(&major)? {
            if candidate.id == *student_id || candidate.gender != gender {
                continue;
            }
            candidates.push(self.scoring_profile(candidate)?);
        }

        let scorer = CompatibilityScorer::new(self.load_weights()?);
        let suggestions =
            SuggestionRanker::new(&scorer, self.settings.suggestion_limit).rank(&student, &candidates);

        Ok(Suggestions {
            student_id: student_id.clone(),
            student_major: major,
            suggestions,
        })
    }

    pub fn submit_feedback(
        &self,
        submission: FeedbackSubmission,
    ) -> Result<FeedbackReceipt, AllocationServiceError> {
        let aggregator = FeedbackAggregator::new(self.settings.verify_feedback_allocation);
        let allocation = if aggregator.verifies_allocation() {
            self.stores.ledger.find(submission.allocation_id)?
        } else {
            None
        };
        let previous = self.stores.feedback.list_by_student(&submission.student_id)?;
        aggregator.validate(&submission, allocation.as_ref(), &previous)?;

        let student_id = submission.student_id.clone();
        let allocation_id = submission.allocation_id;
        let stored = match self.stores.feedback.append(submission) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                return Err(FeedbackError::Duplicate {
                    allocation_id,
                    student_id,
                }
                .into())
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            student = %stored.student_id,
            allocation = %stored.allocation_id,
            feedback = %stored.id,
            overall = stored.overall_satisfaction,
            "allocation feedback recorded"
        );
        Ok(FeedbackReceipt {
            success: true,
            feedback_id: stored.id,
            message: "feedback submitted".to_string(),
        })
    }

    pub fn statistics(&self) -> Result<AllocationStatistics, AllocationServiceError> {
        let feedbacks = self.stores.feedback.list_all()?;
        let weights = self.load_weights()?;
        Ok(FeedbackAggregator::new(self.settings.verify_feedback_allocation)
            .statistics(&feedbacks, &weights))
    }

    pub fn list_feedback_by_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<AllocationFeedback>, AllocationServiceError> {
        Ok(self.stores.feedback.list_by_student(student_id)?)
    }

    /// Manually bind a student to a specific bed, dated today.
    pub fn choose_bed(
        &self,
        student_id: &StudentId,
        bed_id: &BedId,
    ) -> Result<AllocationRecord, AllocationServiceError> {
        self.choose_bed_as_of(student_id, bed_id, Utc::now().date_naive())
    }

    pub fn choose_bed_as_of(
        &self,
        student_id: &StudentId,
        bed_id: &BedId,
        check_in: NaiveDate,
    ) -> Result<AllocationRecord, AllocationServiceError> {
        let _guard = self.exclusive();

        let student = self
            .stores
            .students
            .get(student_id)?
            .ok_or_else(|| AllocationServiceError::StudentNotFound(student_id.clone()))?;
        if !self.stores.ledger.find_active_by_student(student_id)?.is_empty() {
            return Err(AllocationServiceError::AlreadyAllocated(student_id.clone()));
        }

        let bed = self
            .stores
            .inventory
            .get_bed(bed_id)?
            .ok_or_else(|| AllocationServiceError::BedNotFound(bed_id.clone()))?;
        if !bed.is_available() {
            return Err(AllocationServiceError::BedUnavailable(bed_id.clone()));
        }
        let room = self
            .stores
            .inventory
            .get_room(&bed.dormitory_id)?
            .ok_or(RepositoryError::NotFound)?;
        if room.is_full() {
            return Err(AllocationServiceError::RoomFull(room.id));
        }
        if !room.accepts(student.gender) {
            return Err(AllocationServiceError::GenderMismatch {
                student_id: student_id.clone(),
                dormitory_id: room.id,
            });
        }

        let planned = PlannedPlacement {
            student_id: student_id.clone(),
            gender: student.gender,
            dormitory_id: room.id.clone(),
            bed_id: bed.id.clone(),
            bed_type: bed.bed_type,
        };
        let mut committer = StoreCommitter {
            stores: &self.stores,
            check_in,
        };
        let record = committer.commit(&planned).map_err(|err| match err {
            CommitError::BedTaken(bed_id) => AllocationServiceError::BedUnavailable(bed_id),
            CommitError::RoomRestricted(dormitory_id) => AllocationServiceError::GenderMismatch {
                student_id: student_id.clone(),
                dormitory_id,
            },
            CommitError::Store(err) => AllocationServiceError::Repository(err),
        })?;

        info!(
            student = %student_id,
            bed = %record.bed_id,
            room = %record.dormitory_id,
            "bed chosen manually"
        );
        Ok(record)
    }

    /// End every active allocation of the student, dated today.
    pub fn checkout(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<AllocationRecord>, AllocationServiceError> {
        self.checkout_as_of(student_id, Utc::now().date_naive())
    }

    pub fn checkout_as_of(
        &self,
        student_id: &StudentId,
        check_out: NaiveDate,
    ) -> Result<Vec<AllocationRecord>, AllocationServiceError> {
        let _guard = self.exclusive();

        let active = self.stores.ledger.find_active_by_student(student_id)?;
        if active.is_empty() {
            return Err(AllocationServiceError::NotCheckedIn(student_id.clone()));
        }

        let inventory = &self.stores.inventory;
        let mut ended = Vec::with_capacity(active.len());
        for record in active {
            let room_gender = inventory
                .get_room(&record.dormitory_id)?
                .and_then(|room| room.gender);

            inventory.release_bed(&record.bed_id)?;
            if let Err(err) = inventory.update_room_occupancy(&record.dormitory_id, -1) {
                self.restore_occupancy(&record, None);
                return Err(err.into());
            }
            let closed = match self.stores.ledger.end(record.id, check_out) {
                Ok(closed) => closed,
                Err(err) => {
                    self.restore_occupancy(&record, Some(room_gender));
                    return Err(err.into());
                }
            };
            info!(
                student = %student_id,
                bed = %closed.bed_id,
                room = %closed.dormitory_id,
                "student checked out"
            );
            ended.push(closed);
        }
        Ok(ended)
    }

    /// Puts a still-active record's bed back to occupied after a failed
    /// checkout. `room` carries the gender to restore when the occupancy
    /// decrement had already been applied.
    fn restore_occupancy(&self, record: &AllocationRecord, room: Option<Option<Gender>>) {
        let inventory = &self.stores.inventory;
        if let Err(err) = inventory.claim_bed(&record.bed_id) {
            warn!(
                bed = %record.bed_id,
                error = %err,
                "failed to re-occupy bed after aborted checkout"
            );
        }
        let Some(gender) = room else {
            return;
        };
        if let Err(err) = inventory.update_room_occupancy(&record.dormitory_id, 1) {
            warn!(
                room = %record.dormitory_id,
                error = %err,
                "failed to restore room occupancy after aborted checkout"
            );
        }
        if let Some(gender) = gender {
            if let Err(err) = inventory.restrict_room_gender(&record.dormitory_id, gender) {
                warn!(
                    room = %record.dormitory_id,
                    error = %err,
                    "failed to restore room gender after aborted checkout"
                );
            }
        }
    }

    fn exclusive(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load_weights(&self) -> Result<WeightConfig, RepositoryError> {
        let entries = self.stores.weights.list_weights()?;
        Ok(WeightConfig::from_entries(&entries))
    }

    fn load_profile(&self, id: &StudentId) -> Result<Option<ScoringProfile>, RepositoryError> {
        match self.stores.students.get(id)? {
            Some(profile) => self.scoring_profile(profile).map(Some),
            None => {
                warn!(student = %id, "occupant missing from student directory");
                Ok(None)
            }
        }
    }

    fn scoring_profile(&self, profile: StudentProfile) -> Result<ScoringProfile, RepositoryError> {
        let questionnaire = self.stores.questionnaires.answers_for(&profile.id)?;
        let tags = self.stores.tags.tags_for(&profile.id)?;
        Ok(ScoringProfile::new(profile, questionnaire, &tags))
    }
}

/// Writes placements through the inventory and ledger, undoing partial
/// progress when a later step fails.
struct StoreCommitter<'a> {
    stores: &'a AllocationStores,
    check_in: NaiveDate,
}

impl StoreCommitter<'_> {
    fn release(&self, bed_id: &BedId) {
        if let Err(err) = self.stores.inventory.release_bed(bed_id) {
            warn!(bed = %bed_id, error = %err, "failed to release bed after aborted placement");
        }
    }

    /// Undoes an inserted record and its claimed bed.
    fn discard(&self, record: &AllocationRecord) {
        if let Err(err) = self.stores.ledger.remove(record.id) {
            warn!(allocation = %record.id, error = %err, "failed to remove aborted allocation");
        }
        self.release(&record.bed_id);
    }
}

impl PlacementCommitter for StoreCommitter<'_> {
    fn commit(&mut self, placement: &PlannedPlacement) -> Result<AllocationRecord, CommitError> {
        let inventory = &self.stores.inventory;

        match inventory.claim_bed(&placement.bed_id) {
            Ok(_) => {}
            Err(RepositoryError::Conflict) => {
                warn!(
                    student = %placement.student_id,
                    bed = %placement.bed_id,
                    "bed claimed concurrently"
                );
                return Err(CommitError::BedTaken(placement.bed_id.clone()));
            }
            Err(err) => return Err(err.into()),
        }

        let record = match self.stores.ledger.insert(NewAllocation {
            student_id: placement.student_id.clone(),
            dormitory_id: placement.dormitory_id.clone(),
            bed_id: placement.bed_id.clone(),
            check_in: self.check_in,
        }) {
            Ok(record) => record,
            Err(err) => {
                self.release(&placement.bed_id);
                return Err(err.into());
            }
        };

        if let Err(err) = inventory.update_room_occupancy(&placement.dormitory_id, 1) {
            warn!(
                room = %placement.dormitory_id,
                error = %err,
                "failed to update room occupancy; rolling back placement"
            );
            self.discard(&record);
            return Err(err.into());
        }

        // Occupancy goes back to its old value, which also drops a gender
        // the room only had because of this placement.
        if let Err(err) = inventory.restrict_room_gender(&placement.dormitory_id, placement.gender)
        {
            if let Err(undo_err) = inventory.update_room_occupancy(&placement.dormitory_id, -1) {
                warn!(
                    room = %placement.dormitory_id,
                    error = %undo_err,
                    "failed to restore room occupancy after aborted placement"
                );
            }
            self.discard(&record);
            return Err(match err {
                RepositoryError::Conflict => {
                    CommitError::RoomRestricted(placement.dormitory_id.clone())
                }
                other => other.into(),
            });
        }

        Ok(record)
    }
}

/// Error raised by the allocation service.
#[derive(Debug, thiserror::Error)]
pub enum AllocationServiceError {
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("student {0} already holds an active allocation")]
    AlreadyAllocated(StudentId),
    #[error("bed {0} not found")]
    BedNotFound(BedId),
    #[error("bed {0} is not available")]
    BedUnavailable(BedId),
    #[error("room {0} is full")]
    RoomFull(DormitoryId),
    #[error("room {dormitory_id} does not accept student {student_id}")]
    GenderMismatch {
        student_id: StudentId,
        dormitory_id: DormitoryId,
    },
    #[error("student {0} is not checked in")]
    NotCheckedIn(StudentId),
    #[error(transparent)]
    Feedback(#[from] FeedbackError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl AllocationServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AllocationServiceError::StudentNotFound(_)
            | AllocationServiceError::BedNotFound(_)
            | AllocationServiceError::NotCheckedIn(_)
            | AllocationServiceError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            AllocationServiceError::AlreadyAllocated(_)
            | AllocationServiceError::BedUnavailable(_)
            | AllocationServiceError::RoomFull(_)
            | AllocationServiceError::GenderMismatch { .. }
            | AllocationServiceError::Feedback(FeedbackError::Duplicate { .. })
            | AllocationServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            AllocationServiceError::Feedback(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AllocationServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
