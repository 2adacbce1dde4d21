use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier issued by the external student directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentId(pub String);

/// Identifier of a shared room.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DormitoryId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BedId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BuildingId(pub String);

/// Sequence number assigned by the allocation ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AllocationId(pub u64);

/// Sequence number assigned by the feedback store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeedbackId(pub u64);

macro_rules! display_inner {
    ($($ty:ty),+) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        })+
    };
}

display_inner!(StudentId, DormitoryId, BedId, BuildingId, AllocationId, FeedbackId);

/// Hard partition key: rooms never mix genders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const fn label(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// Read-only student snapshot owned by the external directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: StudentId,
    pub name: String,
    pub gender: Gender,
    pub major: String,
    pub grade: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepSchedule {
    EarlyBird,
    Regular,
    NightOwl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanlinessLevel {
    Tidy,
    Moderate,
    Relaxed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseTolerance {
    Quiet,
    Moderate,
    Tolerant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EatingHabit {
    Never,
    Occasionally,
    Often,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpendingHabit {
    Shared,
    Independent,
}

/// Lifestyle questionnaire filled in before the allocation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionnaireAnswer {
    pub student_id: StudentId,
    pub sleep_schedule: SleepSchedule,
    pub cleanliness: CleanlinessLevel,
    pub noise_tolerance: NoiseTolerance,
    pub eating_in_room: EatingHabit,
    pub spending_habit: SpendingHabit,
    #[serde(default)]
    pub bed_preference: Option<BedType>,
}

impl QuestionnaireAnswer {
    /// Number of lifestyle fields compared during scoring.
    pub const LIFESTYLE_FIELDS: usize = 5;

    pub fn matching_fields(&self, other: &QuestionnaireAnswer) -> usize {
        [
            self.sleep_schedule == other.sleep_schedule,
            self.cleanliness == other.cleanliness,
            self.noise_tolerance == other.noise_tolerance,
            self.eating_in_room == other.eating_in_room,
            self.spending_habit == other.spending_habit,
        ]
        .into_iter()
        .filter(|matched| *matched)
        .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    QuestionnaireDerived,
    ManualPositive,
    ManualNeutral,
    ManualNegative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSource {
    Questionnaire,
    Manual,
}

/// Free-text lifestyle tag attached to a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoommateTag {
    pub student_id: StudentId,
    pub name: String,
    pub kind: TagKind,
    pub source: TagSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedType {
    Lower,
    Upper,
}

impl BedType {
    /// Default bed order when no explicit preference applies.
    pub const fn default_rank(self) -> u8 {
        match self {
            BedType::Lower => 0,
            BedType::Upper => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BedStatus {
    Available,
    Occupied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    pub id: BedId,
    pub dormitory_id: DormitoryId,
    pub label: String,
    pub bed_type: BedType,
    pub status: BedStatus,
}

impl Bed {
    pub fn is_available(&self) -> bool {
        self.status == BedStatus::Available
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Available,
    Full,
}

/// Shared room with an explicit gender restriction set on first occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dormitory {
    pub id: DormitoryId,
    pub building_id: BuildingId,
    pub room_number: String,
    pub capacity: u32,
    pub occupancy: u32,
    pub status: RoomStatus,
    pub gender: Option<Gender>,
}

impl Dormitory {
    pub fn accepts(&self, gender: Gender) -> bool {
        self.gender.map_or(true, |restriction| restriction == gender)
    }

    pub fn is_full(&self) -> bool {
        self.status == RoomStatus::Full || self.occupancy >= self.capacity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Active,
    Ended,
}

/// Binding of one student to one bed for a period of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub id: AllocationId,
    pub student_id: StudentId,
    pub dormitory_id: DormitoryId,
    pub bed_id: BedId,
    pub status: AllocationStatus,
    pub check_in: NaiveDate,
    pub check_out: Option<NaiveDate>,
}

impl AllocationRecord {
    pub fn is_active(&self) -> bool {
        self.status == AllocationStatus::Active
    }
}

/// Record payload before the ledger assigns an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAllocation {
    pub student_id: StudentId,
    pub dormitory_id: DormitoryId,
    pub bed_id: BedId,
    pub check_in: NaiveDate,
}

/// Independently enable-able contributor to the compatibility score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeightDimension {
    Questionnaire,
    Tag,
    Major,
    Gender,
    BedType,
}

impl WeightDimension {
    pub const fn ordered() -> [WeightDimension; 5] {
        [
            WeightDimension::Questionnaire,
            WeightDimension::Tag,
            WeightDimension::Major,
            WeightDimension::Gender,
            WeightDimension::BedType,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            WeightDimension::Questionnaire => "QUESTIONNAIRE",
            WeightDimension::Tag => "TAG",
            WeightDimension::Major => "MAJOR",
            WeightDimension::Gender => "GENDER",
            WeightDimension::BedType => "BED_TYPE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub dimension: WeightDimension,
    pub weight: f64,
    pub enabled: bool,
}

/// Satisfaction survey as submitted by a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSubmission {
    pub student_id: StudentId,
    pub allocation_id: AllocationId,
    pub roommate_satisfaction: u8,
    pub environment_satisfaction: u8,
    pub overall_satisfaction: u8,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub suggestions: Option<String>,
    #[serde(default)]
    pub willing_to_switch: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationFeedback {
    pub id: FeedbackId,
    pub student_id: StudentId,
    pub allocation_id: AllocationId,
    pub roommate_satisfaction: u8,
    pub environment_satisfaction: u8,
    pub overall_satisfaction: u8,
    pub content: String,
    pub suggestions: Option<String>,
    pub willing_to_switch: bool,
    pub submitted_at: DateTime<Utc>,
}

impl AllocationFeedback {
    /// Integer mean of the three ratings, used as the distribution bucket.
    pub fn satisfaction_bucket(&self) -> u8 {
        let sum = u16::from(self.roommate_satisfaction)
            + u16::from(self.environment_satisfaction)
            + u16::from(self.overall_satisfaction);
        (sum / 3) as u8
    }
}
