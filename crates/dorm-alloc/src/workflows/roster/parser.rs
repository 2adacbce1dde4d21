use std::io::Read;

use serde::{Deserialize, Deserializer};

use crate::workflows::allocation::domain::{
    BedType, CleanlinessLevel, EatingHabit, Gender, NoiseTolerance, SleepSchedule, SpendingHabit,
};

#[derive(Debug, Deserialize)]
pub(crate) struct StudentRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) gender: Gender,
    pub(crate) major: String,
    pub(crate) grade: u8,
    #[serde(default)]
    pub(crate) sleep_schedule: Option<SleepSchedule>,
    #[serde(default)]
    pub(crate) cleanliness: Option<CleanlinessLevel>,
    #[serde(default)]
    pub(crate) noise_tolerance: Option<NoiseTolerance>,
    #[serde(default)]
    pub(crate) eating_in_room: Option<EatingHabit>,
    #[serde(default)]
    pub(crate) spending_habit: Option<SpendingHabit>,
    #[serde(default)]
    pub(crate) bed_preference: Option<BedType>,
    #[serde(default, deserialize_with = "semicolon_list")]
    pub(crate) tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BedRow {
    pub(crate) dormitory_id: String,
    pub(crate) building_id: String,
    pub(crate) room_number: String,
    pub(crate) capacity: u32,
    pub(crate) bed_id: String,
    #[serde(default)]
    pub(crate) label: String,
    pub(crate) bed_type: BedType,
}

pub(crate) fn parse_students<R: Read>(reader: R) -> Result<Vec<StudentRow>, csv::Error> {
    parse_rows(reader)
}

pub(crate) fn parse_beds<R: Read>(reader: R) -> Result<Vec<BedRow>, csv::Error> {
    parse_rows(reader)
}

fn parse_rows<R, T>(reader: R) -> Result<Vec<T>, csv::Error>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.deserialize::<T>().collect()
}

fn semicolon_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|value| {
            value
                .split(';')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}
