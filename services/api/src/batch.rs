use crate::infra::seed_campus;
use chrono::{Local, NaiveDate};
use clap::Args;
use dorm_alloc::config::AppConfig;
use dorm_alloc::error::AppError;
use dorm_alloc::workflows::allocation::{
    AllocationOutcome, AllocationStores, DormitoryAllocationService, StudentId,
};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct AllocateArgs {
    /// Student roster CSV
    #[arg(long)]
    pub(crate) students: PathBuf,
    /// Bed inventory CSV
    #[arg(long)]
    pub(crate) beds: PathBuf,
    /// Allocate only these students (repeatable). Defaults to the whole roster.
    #[arg(long = "student")]
    pub(crate) student_ids: Vec<String>,
    /// Check-in date recorded on every allocation (defaults to today)
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) check_in: Option<NaiveDate>,
    /// Print the outcome as JSON instead of a text report
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_allocation(args: AllocateArgs) -> Result<(), AppError> {
    let AllocateArgs {
        students,
        beds,
        student_ids,
        check_in,
        json,
    } = args;

    let config = AppConfig::load()?;
    let campus = seed_campus(Some(&students), Some(&beds))?;
    let service = DormitoryAllocationService::new(
        AllocationStores::from_shared(campus.clone()),
        config.allocation,
    );

    let requested: Vec<StudentId> = if student_ids.is_empty() {
        campus.student_ids().map_err(|err| AppError::Allocation(err.into()))?
    } else {
        student_ids.into_iter().map(StudentId).collect()
    };
    let check_in = check_in.unwrap_or_else(|| Local::now().date_naive());

    let outcome = service.allocate_as_of(&requested, check_in)?;

    if json {
        let rendered = serde_json::to_string_pretty(&outcome).map_err(std::io::Error::from)?;
        println!("{rendered}");
    } else {
        print!("{}", render_outcome(&outcome, check_in));
    }

    Ok(())
}

fn render_outcome(outcome: &AllocationOutcome, check_in: NaiveDate) -> String {
    let mut lines = vec![format!(
        "Dormitory allocation for {} ({} allocated, {} unallocated)",
        check_in, outcome.total_allocated, outcome.total_unallocated
    )];

    let mut by_room: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for placement in &outcome.allocations {
        by_room
            .entry(placement.dormitory_id.0.as_str())
            .or_default()
            .push(format!(
                "{} -> bed {} ({}, compatibility {:.2})",
                placement.student_id,
                placement.bed_id,
                placement.gender.label(),
                placement.compatibility
            ));
    }

    if !by_room.is_empty() {
        lines.push(String::new());
        lines.push("Placements".to_string());
        for (room, entries) in by_room {
            lines.push(format!("  {room}"));
            lines.extend(entries.into_iter().map(|entry| format!("    {entry}")));
        }
    }

    for (title, students) in [
        ("Unallocated (no suitable bed)", &outcome.unallocated_students),
        ("Skipped (already allocated)", &outcome.already_allocated),
        ("Unknown student ids", &outcome.unknown_students),
    ] {
        if students.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(title.to_string());
        lines.extend(students.iter().map(|id| format!("  - {id}")));
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}
