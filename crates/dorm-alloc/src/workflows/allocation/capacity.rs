use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use super::domain::{Bed, BedId, Dormitory, DormitoryId, Gender, RoomStatus, StudentId};
use super::repository::{AllocationLedger, BedFilter, RepositoryError, RoomInventory};
use super::scoring::ScoringProfile;

/// Rooms may hold students from at most this many majors.
pub const MAX_MAJORS_PER_ROOM: usize = 2;

/// A room that still has at least one free bed, with its current occupants.
#[derive(Debug, Clone)]
pub struct RoomSlot {
    pub room: Dormitory,
    free_beds: Vec<Bed>,
    occupants: Vec<ScoringProfile>,
    majors: BTreeSet<String>,
    excluded: bool,
}

impl RoomSlot {
    fn new(room: Dormitory, free_beds: Vec<Bed>, occupants: Vec<ScoringProfile>) -> Self {
        let majors = occupants
            .iter()
            .map(|occupant| occupant.major().to_string())
            .collect();
        Self {
            room,
            free_beds,
            occupants,
            majors,
            excluded: false,
        }
    }

    pub fn free_beds(&self) -> &[Bed] {
        &self.free_beds
    }

    pub fn occupants(&self) -> &[ScoringProfile] {
        &self.occupants
    }

    pub fn majors(&self) -> &BTreeSet<String> {
        &self.majors
    }

    /// Nobody lives here yet.
    pub fn is_empty(&self) -> bool {
        self.room.occupancy == 0 && self.occupants.is_empty()
    }

    /// Effective gender restriction: the stored one, else whatever the known
    /// occupants are.
    pub fn gender(&self) -> Option<Gender> {
        self.room
            .gender
            .or_else(|| self.occupants.first().map(ScoringProfile::gender))
    }

    /// Hard constraints: free bed, same gender (or empty), major cap. A
    /// non-empty room whose gender cannot be determined hosts nobody.
    pub fn can_host(&self, student: &ScoringProfile) -> bool {
        if self.excluded || self.free_beds.is_empty() || self.room.is_full() {
            return false;
        }

        match self.gender() {
            Some(gender) if gender != student.gender() => return false,
            None if !self.is_empty() => return false,
            _ => {}
        }

        self.majors.contains(student.major()) || self.majors.len() < MAX_MAJORS_PER_ROOM
    }
}

/// Snapshot of free capacity used while planning one run.
#[derive(Debug, Clone, Default)]
pub struct CapacityModel {
    slots: Vec<RoomSlot>,
}

impl CapacityModel {
    /// Builds the model from the inventory. Rooms keep the order in which
    /// their first free bed is listed; full or unknown rooms are left out.
    pub fn load<F>(
        inventory: &dyn RoomInventory,
        ledger: &dyn AllocationLedger,
        mut load_profile: F,
    ) -> Result<Self, RepositoryError>
    where
        F: FnMut(&StudentId) -> Result<Option<ScoringProfile>, RepositoryError>,
    {
        let mut order: Vec<DormitoryId> = Vec::new();
        let mut beds_by_room: HashMap<DormitoryId, Vec<Bed>> = HashMap::new();
        for bed in inventory.list_beds(&BedFilter::available())? {
            if !beds_by_room.contains_key(&bed.dormitory_id) {
                order.push(bed.dormitory_id.clone());
            }
            beds_by_room
                .entry(bed.dormitory_id.clone())
                .or_default()
                .push(bed);
        }

        let mut slots = Vec::with_capacity(order.len());
        for room_id in order {
            let Some(room) = inventory.get_room(&room_id)? else {
                warn!(room = %room_id, "bed references unknown room; skipping");
                continue;
            };
            if room.is_full() {
                debug!(room = %room_id, "room marked full despite free beds; skipping");
                continue;
            }

            let mut occupants = Vec::new();
            for record in ledger.find_active_by_room(&room_id)? {
                if let Some(profile) = load_profile(&record.student_id)? {
                    occupants.push(profile);
                }
            }

            let free_beds = beds_by_room.remove(&room_id).unwrap_or_default();
            slots.push(RoomSlot::new(room, free_beds, occupants));
        }

        Ok(Self { slots })
    }

    pub fn from_slots(rooms: Vec<(Dormitory, Vec<Bed>, Vec<ScoringProfile>)>) -> Self {
        Self {
            slots: rooms
                .into_iter()
                .map(|(room, beds, occupants)| RoomSlot::new(room, beds, occupants))
                .collect(),
        }
    }

    pub fn slots(&self) -> &[RoomSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> &RoomSlot {
        &self.slots[index]
    }

    pub fn free_bed_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !slot.excluded)
            .map(|slot| slot.free_beds.len())
            .sum()
    }

    /// First room nobody lives in that can take the student.
    pub fn first_empty_room(&self, student: &ScoringProfile) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.is_empty() && slot.can_host(student))
    }

    /// Applies a committed placement to the snapshot.
    pub fn occupy(&mut self, index: usize, bed_id: &BedId, student: ScoringProfile) {
        let slot = &mut self.slots[index];
        slot.free_beds.retain(|bed| bed.id != *bed_id);
        slot.room.occupancy += 1;
        if slot.room.occupancy >= slot.room.capacity {
            slot.room.status = RoomStatus::Full;
        }
        if slot.room.gender.is_none() {
            slot.room.gender = Some(student.gender());
        }
        slot.majors.insert(student.major().to_string());
        slot.occupants.push(student);
    }

    /// Forgets a bed that another writer claimed first.
    pub fn drop_bed(&mut self, index: usize, bed_id: &BedId) {
        self.slots[index].free_beds.retain(|bed| bed.id != *bed_id);
    }

    /// Takes a room out of consideration for the rest of the run.
    pub fn exclude_room(&mut self, index: usize) {
        self.slots[index].excluded = true;
    }
}
