use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::allocation::domain::{
    AllocationId, AllocationRecord, Bed, BedId, BedStatus, BedType, BuildingId, CleanlinessLevel,
    Dormitory, DormitoryId, EatingHabit, FeedbackSubmission, Gender, NewAllocation,
    NoiseTolerance, QuestionnaireAnswer, RoomStatus, RoommateTag, SleepSchedule, SpendingHabit,
    StudentId, StudentProfile, TagKind, TagSource,
};
use crate::workflows::allocation::memory::InMemoryCampus;
use crate::workflows::allocation::repository::{
    AllocationLedger, AllocationStores, BedFilter, RepositoryError, RoomInventory,
    StudentDirectory,
};
use crate::workflows::allocation::scoring::ScoringProfile;
use crate::workflows::allocation::service::{AllocationSettings, DormitoryAllocationService};

pub(super) fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 9, 1).expect("valid date")
}

pub(super) fn sid(id: &str) -> StudentId {
    StudentId(id.to_string())
}

pub(super) fn rid(id: &str) -> DormitoryId {
    DormitoryId(id.to_string())
}

pub(super) fn bid(id: &str) -> BedId {
    BedId(id.to_string())
}

pub(super) fn student(id: &str, gender: Gender, major: &str) -> StudentProfile {
    StudentProfile {
        id: sid(id),
        name: format!("Student {id}"),
        gender,
        major: major.to_string(),
        grade: 1,
    }
}

/// Early riser, tidy, quiet, never eats in the room, shares costs.
pub(super) fn calm_answers(id: &str) -> QuestionnaireAnswer {
    QuestionnaireAnswer {
        student_id: sid(id),
        sleep_schedule: SleepSchedule::EarlyBird,
        cleanliness: CleanlinessLevel::Tidy,
        noise_tolerance: NoiseTolerance::Quiet,
        eating_in_room: EatingHabit::Never,
        spending_habit: SpendingHabit::Shared,
        bed_preference: None,
    }
}

/// Opposite of [`calm_answers`] on every lifestyle field.
pub(super) fn lively_answers(id: &str) -> QuestionnaireAnswer {
    QuestionnaireAnswer {
        student_id: sid(id),
        sleep_schedule: SleepSchedule::NightOwl,
        cleanliness: CleanlinessLevel::Relaxed,
        noise_tolerance: NoiseTolerance::Tolerant,
        eating_in_room: EatingHabit::Often,
        spending_habit: SpendingHabit::Independent,
        bed_preference: None,
    }
}

pub(super) fn tag(id: &str, name: &str) -> RoommateTag {
    RoommateTag {
        student_id: sid(id),
        name: name.to_string(),
        kind: TagKind::ManualPositive,
        source: TagSource::Manual,
    }
}

pub(super) fn profile(
    id: &str,
    gender: Gender,
    major: &str,
    answers: Option<QuestionnaireAnswer>,
    tags: &[&str],
) -> ScoringProfile {
    let tags: Vec<RoommateTag> = tags.iter().map(|name| tag(id, name)).collect();
    ScoringProfile::new(student(id, gender, major), answers, &tags)
}

pub(super) fn room(id: &str, capacity: u32) -> Dormitory {
    Dormitory {
        id: rid(id),
        building_id: BuildingId("b-1".to_string()),
        room_number: id.trim_start_matches("r-").to_string(),
        capacity,
        occupancy: 0,
        status: RoomStatus::Available,
        gender: None,
    }
}

pub(super) fn bed(room_id: &str, suffix: &str, bed_type: BedType) -> Bed {
    Bed {
        id: bid(&format!("{room_id}-{suffix}")),
        dormitory_id: rid(room_id),
        label: suffix.to_uppercase(),
        bed_type,
        status: BedStatus::Available,
    }
}

/// Adds a room whose beds alternate lower/upper, labelled a, b, c, ...
pub(super) fn add_room(campus: &InMemoryCampus, room_id: &str, capacity: u32) {
    campus.add_room(room(room_id, capacity)).expect("room");
    for index in 0..capacity {
        let suffix = ((b'a' + index as u8) as char).to_string();
        let bed_type = if index % 2 == 0 {
            BedType::Lower
        } else {
            BedType::Upper
        };
        campus
            .add_bed(bed(room_id, &suffix, bed_type))
            .expect("bed");
    }
}

pub(super) fn enroll(
    campus: &InMemoryCampus,
    id: &str,
    gender: Gender,
    major: &str,
    answers: Option<QuestionnaireAnswer>,
) {
    campus
        .upsert_student(student(id, gender, major))
        .expect("student");
    if let Some(answers) = answers {
        campus.set_questionnaire(answers).expect("questionnaire");
    }
}

/// Two male CS students and two female SE students, pairwise identical
/// questionnaires, and two empty four-bed rooms.
pub(super) fn four_student_campus() -> Arc<InMemoryCampus> {
    let campus = Arc::new(InMemoryCampus::new());
    enroll(&campus, "m-1", Gender::Male, "CS", Some(calm_answers("m-1")));
    enroll(&campus, "m-2", Gender::Male, "CS", Some(calm_answers("m-2")));
    enroll(&campus, "f-1", Gender::Female, "SE", Some(lively_answers("f-1")));
    enroll(&campus, "f-2", Gender::Female, "SE", Some(lively_answers("f-2")));
    add_room(&campus, "r-101", 4);
    add_room(&campus, "r-102", 4);
    campus
}

pub(super) fn build_service(campus: Arc<InMemoryCampus>) -> DormitoryAllocationService {
    build_service_with(campus, AllocationSettings::default())
}

pub(super) fn build_service_with(
    campus: Arc<InMemoryCampus>,
    settings: AllocationSettings,
) -> DormitoryAllocationService {
    DormitoryAllocationService::new(AllocationStores::from_shared(campus), settings)
}

pub(super) fn feedback(student_id: &str, allocation_id: AllocationId) -> FeedbackSubmission {
    FeedbackSubmission {
        student_id: sid(student_id),
        allocation_id,
        roommate_satisfaction: 4,
        environment_satisfaction: 5,
        overall_satisfaction: 4,
        content: "Quiet room, good neighbours".to_string(),
        suggestions: None,
        willing_to_switch: false,
    }
}

pub(super) fn active_record(campus: &InMemoryCampus, student_id: &str) -> AllocationRecord {
    let mut records = campus
        .find_active_by_student(&sid(student_id))
        .expect("ledger lookup");
    assert_eq!(records.len(), 1, "expected one active record for {student_id}");
    records.remove(0)
}

pub(super) fn bed_status(campus: &InMemoryCampus, bed_id: &BedId) -> BedStatus {
    campus
        .get_bed(bed_id)
        .expect("bed lookup")
        .expect("bed present")
        .status
}

pub(super) fn room_state(campus: &InMemoryCampus, room_id: &str) -> Dormitory {
    campus
        .get_room(&rid(room_id))
        .expect("room lookup")
        .expect("room present")
}

/// Inventory whose listed beds are taken by another writer the moment this
/// process tries to claim them.
pub(super) struct ContestedInventory {
    pub(super) inner: Arc<InMemoryCampus>,
    pub(super) contested: Mutex<HashSet<BedId>>,
}

impl ContestedInventory {
    pub(super) fn new(inner: Arc<InMemoryCampus>, contested: &[&str]) -> Self {
        Self {
            inner,
            contested: Mutex::new(contested.iter().map(|id| bid(id)).collect()),
        }
    }
}

impl RoomInventory for ContestedInventory {
    fn list_beds(&self, filter: &BedFilter) -> Result<Vec<Bed>, RepositoryError> {
        self.inner.list_beds(filter)
    }

    fn get_bed(&self, id: &BedId) -> Result<Option<Bed>, RepositoryError> {
        self.inner.get_bed(id)
    }

    fn get_room(&self, id: &DormitoryId) -> Result<Option<Dormitory>, RepositoryError> {
        self.inner.get_room(id)
    }

    fn claim_bed(&self, id: &BedId) -> Result<Bed, RepositoryError> {
        let stolen = self
            .contested
            .lock()
            .expect("contested mutex poisoned")
            .remove(id);
        if stolen {
            self.inner.claim_bed(id)?;
            return Err(RepositoryError::Conflict);
        }
        self.inner.claim_bed(id)
    }

    fn release_bed(&self, id: &BedId) -> Result<(), RepositoryError> {
        self.inner.release_bed(id)
    }

    fn update_room_occupancy(
        &self,
        id: &DormitoryId,
        delta: i32,
    ) -> Result<Dormitory, RepositoryError> {
        self.inner.update_room_occupancy(id, delta)
    }

    fn restrict_room_gender(&self, id: &DormitoryId, gender: Gender) -> Result<(), RepositoryError> {
        self.inner.restrict_room_gender(id, gender)
    }
}

/// Ledger that accepts lookups but refuses every write.
pub(super) struct ReadOnlyLedger {
    pub(super) inner: Arc<InMemoryCampus>,
}

impl AllocationLedger for ReadOnlyLedger {
    fn insert(&self, _allocation: NewAllocation) -> Result<AllocationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("ledger read only".to_string()))
    }

    fn find(&self, id: AllocationId) -> Result<Option<AllocationRecord>, RepositoryError> {
        self.inner.find(id)
    }

    fn find_active_by_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<AllocationRecord>, RepositoryError> {
        self.inner.find_active_by_student(student_id)
    }

    fn find_active_by_room(
        &self,
        dormitory_id: &DormitoryId,
    ) -> Result<Vec<AllocationRecord>, RepositoryError> {
        self.inner.find_active_by_room(dormitory_id)
    }

    fn end(
        &self,
        _id: AllocationId,
        _check_out: NaiveDate,
    ) -> Result<AllocationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("ledger read only".to_string()))
    }

    fn remove(&self, _id: AllocationId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("ledger read only".to_string()))
    }
}

/// Inventory write that [`FaultyInventory`] refuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum InventoryFault {
    Release,
    Occupancy,
    RestrictConflict,
}

/// Delegates to the campus except for one failing write.
pub(super) struct FaultyInventory {
    pub(super) inner: Arc<InMemoryCampus>,
    pub(super) fault: InventoryFault,
}

impl RoomInventory for FaultyInventory {
    fn list_beds(&self, filter: &BedFilter) -> Result<Vec<Bed>, RepositoryError> {
        self.inner.list_beds(filter)
    }

    fn get_bed(&self, id: &BedId) -> Result<Option<Bed>, RepositoryError> {
        self.inner.get_bed(id)
    }

    fn get_room(&self, id: &DormitoryId) -> Result<Option<Dormitory>, RepositoryError> {
        self.inner.get_room(id)
    }

    fn claim_bed(&self, id: &BedId) -> Result<Bed, RepositoryError> {
        self.inner.claim_bed(id)
    }

    fn release_bed(&self, id: &BedId) -> Result<(), RepositoryError> {
        if self.fault == InventoryFault::Release {
            return Err(RepositoryError::Unavailable("inventory offline".to_string()));
        }
        self.inner.release_bed(id)
    }

    fn update_room_occupancy(
        &self,
        id: &DormitoryId,
        delta: i32,
    ) -> Result<Dormitory, RepositoryError> {
        if self.fault == InventoryFault::Occupancy {
            return Err(RepositoryError::Unavailable("inventory offline".to_string()));
        }
        self.inner.update_room_occupancy(id, delta)
    }

    fn restrict_room_gender(&self, id: &DormitoryId, gender: Gender) -> Result<(), RepositoryError> {
        if self.fault == InventoryFault::RestrictConflict {
            return Err(RepositoryError::Conflict);
        }
        self.inner.restrict_room_gender(id, gender)
    }
}

/// Service over `campus` whose inventory fails with `fault`.
pub(super) fn service_with_faulty_inventory(
    campus: &Arc<InMemoryCampus>,
    fault: InventoryFault,
) -> DormitoryAllocationService {
    let mut stores = AllocationStores::from_shared(campus.clone());
    stores.inventory = Arc::new(FaultyInventory {
        inner: campus.clone(),
        fault,
    });
    DormitoryAllocationService::new(stores, AllocationSettings::default())
}

pub(super) struct UnavailableDirectory;

impl StudentDirectory for UnavailableDirectory {
    fn get(&self, _id: &StudentId) -> Result<Option<StudentProfile>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }

    fn list_by_major(&self, _major: &str) -> Result<Vec<StudentProfile>, RepositoryError> {
        Err(RepositoryError::Unavailable("directory offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
