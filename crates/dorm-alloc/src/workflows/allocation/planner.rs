use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::capacity::CapacityModel;
use super::domain::{
    AllocationId, AllocationRecord, Bed, BedId, BedType, DormitoryId, Gender, StudentId,
    WeightDimension,
};
use super::repository::RepositoryError;
use super::scoring::{CompatibilityScorer, ScoringProfile};

/// Bed and room picked for a student, handed to the committer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPlacement {
    pub student_id: StudentId,
    pub gender: Gender,
    pub dormitory_id: DormitoryId,
    pub bed_id: BedId,
    pub bed_type: BedType,
}

/// Failure modes when persisting a planned placement.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("bed {0} was claimed by another writer")]
    BedTaken(BedId),
    #[error("room {0} is now restricted to another gender")]
    RoomRestricted(DormitoryId),
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// Persists placements. Implementations must either fully apply a placement
/// or leave no trace of it.
pub trait PlacementCommitter {
    fn commit(&mut self, placement: &PlannedPlacement) -> Result<AllocationRecord, CommitError>;
}

/// One student bound to one bed by an allocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub student_id: StudentId,
    pub dormitory_id: DormitoryId,
    pub bed_id: BedId,
    pub allocation_id: AllocationId,
    pub gender: Gender,
    pub bed_type: BedType,
    /// Average pairwise score against the roommates present at placement time.
    pub compatibility: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bed_type_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanReport {
    pub placements: Vec<Placement>,
    pub unallocated: Vec<StudentId>,
}

/// Greedy roommate grouping with bed binding.
pub struct AllocationPlanner<'a> {
    scorer: &'a CompatibilityScorer,
    max_claim_retries: u8,
}

impl<'a> AllocationPlanner<'a> {
    pub fn new(scorer: &'a CompatibilityScorer, max_claim_retries: u8) -> Self {
        Self {
            scorer,
            max_claim_retries,
        }
    }

    /// Places `students` (in input order) into the rooms of `model`.
    pub fn plan<C>(
        &self,
        students: Vec<ScoringProfile>,
        model: &mut CapacityModel,
        committer: &mut C,
    ) -> PlanReport
    where
        C: PlacementCommitter,
    {
        let input_rank: HashMap<StudentId, usize> = students
            .iter()
            .enumerate()
            .map(|(rank, student)| (student.id().clone(), rank))
            .collect();

        let mut placements = Vec::new();
        let mut unallocated = Vec::new();

        for student in processing_order(students) {
            match self.place_student(&student, model, committer) {
                Some(placement) => placements.push(placement),
                None => unallocated.push(student.id().clone()),
            }
        }

        let rank_of = |id: &StudentId| input_rank.get(id).copied().unwrap_or(usize::MAX);
        placements.sort_by_key(|placement| rank_of(&placement.student_id));
        unallocated.sort_by_key(|id| rank_of(id));

        PlanReport {
            placements,
            unallocated,
        }
    }

    fn place_student<C>(
        &self,
        student: &ScoringProfile,
        model: &mut CapacityModel,
        committer: &mut C,
    ) -> Option<Placement>
    where
        C: PlacementCommitter,
    {
        let mut conflicts: u8 = 0;

        loop {
            let Some((index, compatibility)) = self.choose_room(student, model) else {
                debug!(student = %student.id(), "no room can host student");
                return None;
            };

            let bed = self.choose_bed(student, model.slot(index).free_beds())?.clone();
            let planned = PlannedPlacement {
                student_id: student.id().clone(),
                gender: student.gender(),
                dormitory_id: model.slot(index).room.id.clone(),
                bed_id: bed.id.clone(),
                bed_type: bed.bed_type,
            };

            match committer.commit(&planned) {
                Ok(record) => {
                    model.occupy(index, &bed.id, student.clone());
                    return Some(Placement {
                        student_id: planned.student_id,
                        dormitory_id: planned.dormitory_id,
                        bed_id: planned.bed_id,
                        allocation_id: record.id,
                        gender: planned.gender,
                        bed_type: planned.bed_type,
                        compatibility,
                        bed_type_score: self
                            .scorer
                            .bed_type_score(student.bed_preference(), bed.bed_type),
                    });
                }
                Err(CommitError::BedTaken(bed_id)) => {
                    model.drop_bed(index, &bed_id);
                    conflicts += 1;
                }
                Err(CommitError::RoomRestricted(room_id)) => {
                    debug!(room = %room_id, "room restricted concurrently; excluding");
                    model.exclude_room(index);
                    conflicts += 1;
                }
                Err(CommitError::Store(err)) => {
                    warn!(student = %student.id(), error = %err, "failed to persist placement");
                    return None;
                }
            }

            if conflicts > self.max_claim_retries {
                warn!(
                    student = %student.id(),
                    conflicts,
                    "claim retries exhausted; leaving student unallocated"
                );
                return None;
            }
        }
    }

    /// Best partially filled room by average compatibility, else the first
    /// empty room. Ties keep the earlier room.
    fn choose_room(&self, student: &ScoringProfile, model: &CapacityModel) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;

        for (index, slot) in model.slots().iter().enumerate() {
            if slot.is_empty() || !slot.can_host(student) {
                continue;
            }
            let average = self.scorer.average_against(student, slot.occupants());
            if best.map_or(true, |(_, current)| average > current) {
                best = Some((index, average));
            }
        }

        best.or_else(|| {
            model
                .first_empty_room(student)
                .map(|index| (index, 0.0))
        })
    }

    /// Preferred bed type when the bed-type dimension is on and such a bed is
    /// free, otherwise lower before upper in listing order.
    fn choose_bed<'b>(&self, student: &ScoringProfile, beds: &'b [Bed]) -> Option<&'b Bed> {
        let preference = student
            .bed_preference()
            .filter(|_| self.scorer.weights().is_enabled(WeightDimension::BedType));

        if let Some(preferred) = preference {
            if let Some(bed) = beds.iter().find(|bed| bed.bed_type == preferred) {
                return Some(bed);
            }
        }

        beds.iter().min_by_key(|bed| bed.bed_type.default_rank())
    }
}

/// Gender groups in first-appearance order; inside each, major clusters in
/// first-appearance order; inside each cluster, input order.
fn processing_order(students: Vec<ScoringProfile>) -> Vec<ScoringProfile> {
    let mut genders: Vec<Gender> = Vec::new();
    let mut clusters: Vec<(Gender, String, Vec<ScoringProfile>)> = Vec::new();

    for student in students {
        if !genders.contains(&student.gender()) {
            genders.push(student.gender());
        }
        match clusters
            .iter_mut()
            .find(|(gender, major, _)| *gender == student.gender() && major == student.major())
        {
            Some((_, _, members)) => members.push(student),
            None => clusters.push((
                student.gender(),
                student.major().to_string(),
                vec![student],
            )),
        }
    }

    let mut ordered = Vec::new();
    for gender in genders {
        for (_, _, members) in clusters.iter_mut().filter(|(g, _, _)| *g == gender) {
            ordered.append(members);
        }
    }
    ordered
}
