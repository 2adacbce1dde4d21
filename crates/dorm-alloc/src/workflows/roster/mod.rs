//! CSV roster import used to seed an [`InMemoryCampus`].
//!
//! Students: `id,name,gender,major,grade` followed by the optional lifestyle
//! columns `sleep_schedule,cleanliness,noise_tolerance,eating_in_room,
//! spending_habit,bed_preference` and a `;`-separated `tags` column.
//! Beds: `dormitory_id,building_id,room_number,capacity,bed_id,label,bed_type`;
//! the first row of a room defines it.

mod parser;

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use tracing::info;

use crate::workflows::allocation::domain::{
    Bed, BedId, BedStatus, BuildingId, Dormitory, DormitoryId, QuestionnaireAnswer, RoomStatus,
    RoommateTag, StudentId, StudentProfile, TagKind, TagSource,
};
use crate::workflows::allocation::memory::InMemoryCampus;
use crate::workflows::allocation::repository::RepositoryError;

use parser::{BedRow, StudentRow};

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    IncompleteQuestionnaire { student_id: String },
    Store(RepositoryError),
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster: {}", err),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {}", err),
            RosterImportError::IncompleteQuestionnaire { student_id } => write!(
                f,
                "student {} has a partially filled questionnaire",
                student_id
            ),
            RosterImportError::Store(err) => write!(f, "could not store roster row: {}", err),
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
            RosterImportError::IncompleteQuestionnaire { .. } => None,
            RosterImportError::Store(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<RepositoryError> for RosterImportError {
    fn from(err: RepositoryError) -> Self {
        Self::Store(err)
    }
}

/// Counts of what a roster import added to the campus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RosterSummary {
    pub students: usize,
    pub questionnaires: usize,
    pub tags: usize,
    pub rooms: usize,
    pub beds: usize,
}

pub struct RosterImporter;

impl RosterImporter {
    pub fn students_from_path<P: AsRef<Path>>(
        path: P,
        campus: &InMemoryCampus,
    ) -> Result<RosterSummary, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::students_from_reader(file, campus)
    }

    pub fn students_from_reader<R: Read>(
        reader: R,
        campus: &InMemoryCampus,
    ) -> Result<RosterSummary, RosterImportError> {
        let mut summary = RosterSummary::default();

        for row in parser::parse_students(reader)? {
            let student_id = StudentId(row.id.clone());
            let questionnaire = questionnaire_from_row(&row)?;
            for name in &row.tags {
                campus.add_tag(RoommateTag {
                    student_id: student_id.clone(),
                    name: name.clone(),
                    kind: TagKind::ManualNeutral,
                    source: TagSource::Manual,
                })?;
                summary.tags += 1;
            }
            if let Some(answer) = questionnaire {
                campus.set_questionnaire(answer)?;
                summary.questionnaires += 1;
            }
            campus.upsert_student(StudentProfile {
                id: student_id,
                name: row.name,
                gender: row.gender,
                major: row.major,
                grade: row.grade,
            })?;
            summary.students += 1;
        }

        info!(
            students = summary.students,
            questionnaires = summary.questionnaires,
            tags = summary.tags,
            "student roster imported"
        );
        Ok(summary)
    }

    pub fn beds_from_path<P: AsRef<Path>>(
        path: P,
        campus: &InMemoryCampus,
    ) -> Result<RosterSummary, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::beds_from_reader(file, campus)
    }

    pub fn beds_from_reader<R: Read>(
        reader: R,
        campus: &InMemoryCampus,
    ) -> Result<RosterSummary, RosterImportError> {
        let mut summary = RosterSummary::default();
        let mut known_rooms: HashSet<String> = HashSet::new();

        for row in parser::parse_beds(reader)? {
            if known_rooms.insert(row.dormitory_id.clone()) {
                campus.add_room(room_from_row(&row))?;
                summary.rooms += 1;
            }
            campus.add_bed(bed_from_row(row))?;
            summary.beds += 1;
        }

        info!(rooms = summary.rooms, beds = summary.beds, "bed inventory imported");
        Ok(summary)
    }
}

/// All five lifestyle answers or none; anything in between is rejected.
fn questionnaire_from_row(
    row: &StudentRow,
) -> Result<Option<QuestionnaireAnswer>, RosterImportError> {
    match (
        row.sleep_schedule,
        row.cleanliness,
        row.noise_tolerance,
        row.eating_in_room,
        row.spending_habit,
    ) {
        (
            Some(sleep_schedule),
            Some(cleanliness),
            Some(noise_tolerance),
            Some(eating_in_room),
            Some(spending_habit),
        ) => Ok(Some(QuestionnaireAnswer {
            student_id: StudentId(row.id.clone()),
            sleep_schedule,
            cleanliness,
            noise_tolerance,
            eating_in_room,
            spending_habit,
            bed_preference: row.bed_preference,
        })),
        (None, None, None, None, None) => Ok(None),
        _ => Err(RosterImportError::IncompleteQuestionnaire {
            student_id: row.id.clone(),
        }),
    }
}

fn room_from_row(row: &BedRow) -> Dormitory {
    Dormitory {
        id: DormitoryId(row.dormitory_id.clone()),
        building_id: BuildingId(row.building_id.clone()),
        room_number: row.room_number.clone(),
        capacity: row.capacity,
        occupancy: 0,
        status: RoomStatus::Available,
        gender: None,
    }
}

fn bed_from_row(row: BedRow) -> Bed {
    let label = if row.label.is_empty() {
        row.bed_id.clone()
    } else {
        row.label
    };
    Bed {
        id: BedId(row.bed_id),
        dormitory_id: DormitoryId(row.dormitory_id),
        label,
        bed_type: row.bed_type,
        status: BedStatus::Available,
    }
}
