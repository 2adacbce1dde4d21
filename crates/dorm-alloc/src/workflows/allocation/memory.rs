use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, Utc};

use super::domain::{
    AllocationFeedback, AllocationId, AllocationRecord, AllocationStatus, Bed, BedId, BedStatus,
    Dormitory, DormitoryId, FeedbackId, FeedbackSubmission, Gender, NewAllocation,
    QuestionnaireAnswer, RoomStatus, RoommateTag, StudentId, StudentProfile, WeightEntry,
};
use super::repository::{
    AllocationLedger, BedFilter, FeedbackStore, QuestionnaireStore, RepositoryError,
    RoomInventory, StudentDirectory, TagStore, WeightStore,
};

#[derive(Debug, Default)]
struct CampusState {
    students: Vec<StudentProfile>,
    questionnaires: HashMap<StudentId, QuestionnaireAnswer>,
    tags: HashMap<StudentId, Vec<RoommateTag>>,
    rooms: HashMap<DormitoryId, Dormitory>,
    beds: Vec<Bed>,
    allocations: Vec<AllocationRecord>,
    weights: Vec<WeightEntry>,
    feedback: Vec<AllocationFeedback>,
    next_allocation: u64,
    next_feedback: u64,
}

impl CampusState {
    fn room_mut(&mut self, id: &DormitoryId) -> Result<&mut Dormitory, RepositoryError> {
        self.rooms.get_mut(id).ok_or(RepositoryError::NotFound)
    }

    fn bed_mut(&mut self, id: &BedId) -> Result<&mut Bed, RepositoryError> {
        self.beds
            .iter_mut()
            .find(|bed| bed.id == *id)
            .ok_or(RepositoryError::NotFound)
    }
}

/// Mutex-backed store implementing every allocation collaborator. Used by the
/// HTTP service when seeded from a roster, and by tests.
#[derive(Debug, Default)]
pub struct InMemoryCampus {
    state: Mutex<CampusState>,
}

impl InMemoryCampus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, CampusState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("campus store mutex poisoned".to_string()))
    }

    /// Adds or replaces a student profile.
    pub fn upsert_student(&self, profile: StudentProfile) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        match state.students.iter_mut().find(|s| s.id == profile.id) {
            Some(existing) => *existing = profile,
            None => state.students.push(profile),
        }
        Ok(())
    }

    pub fn set_questionnaire(&self, answer: QuestionnaireAnswer) -> Result<(), RepositoryError> {
        self.state()?
            .questionnaires
            .insert(answer.student_id.clone(), answer);
        Ok(())
    }

    pub fn add_tag(&self, tag: RoommateTag) -> Result<(), RepositoryError> {
        self.state()?
            .tags
            .entry(tag.student_id.clone())
            .or_default()
            .push(tag);
        Ok(())
    }

    pub fn add_room(&self, room: Dormitory) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if state.rooms.contains_key(&room.id) {
            return Err(RepositoryError::Conflict);
        }
        state.rooms.insert(room.id.clone(), room);
        Ok(())
    }

    /// Beds are listed in the order they were added. The room must exist.
    pub fn add_bed(&self, bed: Bed) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !state.rooms.contains_key(&bed.dormitory_id) {
            return Err(RepositoryError::NotFound);
        }
        if state.beds.iter().any(|existing| existing.id == bed.id) {
            return Err(RepositoryError::Conflict);
        }
        state.beds.push(bed);
        Ok(())
    }

    /// Replaces the weight entry for the same dimension, if any.
    pub fn set_weight(&self, entry: WeightEntry) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state
            .weights
            .retain(|existing| existing.dimension != entry.dimension);
        state.weights.push(entry);
        Ok(())
    }

    /// Student ids in enrollment order.
    pub fn student_ids(&self) -> Result<Vec<StudentId>, RepositoryError> {
        Ok(self
            .state()?
            .students
            .iter()
            .map(|student| student.id.clone())
            .collect())
    }

    /// Every ledger record, active and ended, in insertion order.
    pub fn allocations(&self) -> Result<Vec<AllocationRecord>, RepositoryError> {
        Ok(self.state()?.allocations.clone())
    }

    pub fn rooms(&self) -> Result<Vec<Dormitory>, RepositoryError> {
        let mut rooms: Vec<Dormitory> = self.state()?.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rooms)
    }
}

impl StudentDirectory for InMemoryCampus {
    fn get(&self, id: &StudentId) -> Result<Option<StudentProfile>, RepositoryError> {
        Ok(self.state()?.students.iter().find(|s| s.id == *id).cloned())
    }

    fn list_by_major(&self, major: &str) -> Result<Vec<StudentProfile>, RepositoryError> {
        Ok(self
            .state()?
            .students
            .iter()
            .filter(|s| s.major == major)
            .cloned()
            .collect())
    }
}

impl QuestionnaireStore for InMemoryCampus {
    fn answers_for(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<QuestionnaireAnswer>, RepositoryError> {
        Ok(self.state()?.questionnaires.get(student_id).cloned())
    }
}

impl TagStore for InMemoryCampus {
    fn tags_for(&self, student_id: &StudentId) -> Result<Vec<RoommateTag>, RepositoryError> {
        Ok(self
            .state()?
            .tags
            .get(student_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl RoomInventory for InMemoryCampus {
    fn list_beds(&self, filter: &BedFilter) -> Result<Vec<Bed>, RepositoryError> {
        Ok(self
            .state()?
            .beds
            .iter()
            .filter(|bed| filter.matches(bed))
            .cloned()
            .collect())
    }

    fn get_bed(&self, id: &BedId) -> Result<Option<Bed>, RepositoryError> {
        Ok(self.state()?.beds.iter().find(|bed| bed.id == *id).cloned())
    }

    fn get_room(&self, id: &DormitoryId) -> Result<Option<Dormitory>, RepositoryError> {
        Ok(self.state()?.rooms.get(id).cloned())
    }

    fn claim_bed(&self, id: &BedId) -> Result<Bed, RepositoryError> {
        let mut state = self.state()?;
        let bed = state.bed_mut(id)?;
        if bed.status != BedStatus::Available {
            return Err(RepositoryError::Conflict);
        }
        bed.status = BedStatus::Occupied;
        Ok(bed.clone())
    }

    fn release_bed(&self, id: &BedId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        state.bed_mut(id)?.status = BedStatus::Available;
        Ok(())
    }

    fn update_room_occupancy(
        &self,
        id: &DormitoryId,
        delta: i32,
    ) -> Result<Dormitory, RepositoryError> {
        let mut state = self.state()?;
        let room = state.room_mut(id)?;
        let occupancy = i64::from(room.occupancy) + i64::from(delta);
        room.occupancy = occupancy.clamp(0, i64::from(room.capacity)) as u32;
        room.status = if room.occupancy >= room.capacity {
            RoomStatus::Full
        } else {
            RoomStatus::Available
        };
        if room.occupancy == 0 {
            room.gender = None;
        }
        Ok(room.clone())
    }

    fn restrict_room_gender(
        &self,
        id: &DormitoryId,
        gender: Gender,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let room = state.room_mut(id)?;
        match room.gender {
            None => {
                room.gender = Some(gender);
                Ok(())
            }
            Some(current) if current == gender => Ok(()),
            Some(_) => Err(RepositoryError::Conflict),
        }
    }
}

impl AllocationLedger for InMemoryCampus {
    fn insert(&self, allocation: NewAllocation) -> Result<AllocationRecord, RepositoryError> {
        let mut state = self.state()?;
        let clashes = state.allocations.iter().any(|record| {
            record.is_active()
                && (record.student_id == allocation.student_id || record.bed_id == allocation.bed_id)
        });
        if clashes {
            return Err(RepositoryError::Conflict);
        }

        state.next_allocation += 1;
        let record = AllocationRecord {
            id: AllocationId(state.next_allocation),
            student_id: allocation.student_id,
            dormitory_id: allocation.dormitory_id,
            bed_id: allocation.bed_id,
            status: AllocationStatus::Active,
            check_in: allocation.check_in,
            check_out: None,
        };
        state.allocations.push(record.clone());
        Ok(record)
    }

    fn find(&self, id: AllocationId) -> Result<Option<AllocationRecord>, RepositoryError> {
        Ok(self
            .state()?
            .allocations
            .iter()
            .find(|record| record.id == id)
            .cloned())
    }

    fn find_active_by_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<AllocationRecord>, RepositoryError> {
        Ok(self
            .state()?
            .allocations
            .iter()
            .filter(|record| record.is_active() && record.student_id == *student_id)
            .cloned()
            .collect())
    }

    fn find_active_by_room(
        &self,
        dormitory_id: &DormitoryId,
    ) -> Result<Vec<AllocationRecord>, RepositoryError> {
        Ok(self
            .state()?
            .allocations
            .iter()
            .filter(|record| record.is_active() && record.dormitory_id == *dormitory_id)
            .cloned()
            .collect())
    }

    fn end(
        &self,
        id: AllocationId,
        check_out: NaiveDate,
    ) -> Result<AllocationRecord, RepositoryError> {
        let mut state = self.state()?;
        let record = state
            .allocations
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if !record.is_active() {
            return Err(RepositoryError::Conflict);
        }
        record.status = AllocationStatus::Ended;
        record.check_out = Some(check_out);
        Ok(record.clone())
    }

    fn remove(&self, id: AllocationId) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        let before = state.allocations.len();
        state.allocations.retain(|record| record.id != id);
        if state.allocations.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

impl WeightStore for InMemoryCampus {
    fn list_weights(&self) -> Result<Vec<WeightEntry>, RepositoryError> {
        Ok(self.state()?.weights.clone())
    }
}

impl FeedbackStore for InMemoryCampus {
    fn append(&self, feedback: FeedbackSubmission) -> Result<AllocationFeedback, RepositoryError> {
        let mut state = self.state()?;
        if state.feedback.iter().any(|existing| {
            existing.student_id == feedback.student_id
                && existing.allocation_id == feedback.allocation_id
        }) {
            return Err(RepositoryError::Conflict);
        }

        state.next_feedback += 1;
        let stored = AllocationFeedback {
            id: FeedbackId(state.next_feedback),
            student_id: feedback.student_id,
            allocation_id: feedback.allocation_id,
            roommate_satisfaction: feedback.roommate_satisfaction,
            environment_satisfaction: feedback.environment_satisfaction,
            overall_satisfaction: feedback.overall_satisfaction,
            content: feedback.content,
            suggestions: feedback.suggestions,
            willing_to_switch: feedback.willing_to_switch,
            submitted_at: Utc::now(),
        };
        state.feedback.push(stored.clone());
        Ok(stored)
    }

    fn list_all(&self) -> Result<Vec<AllocationFeedback>, RepositoryError> {
        Ok(self.state()?.feedback.clone())
    }

    fn list_by_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<AllocationFeedback>, RepositoryError> {
        Ok(self
            .state()?
            .feedback
            .iter()
            .filter(|feedback| feedback.student_id == *student_id)
            .cloned()
            .collect())
    }
}
