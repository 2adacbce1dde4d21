use chrono::NaiveDate;
use dorm_alloc::error::AppError;
use dorm_alloc::workflows::allocation::InMemoryCampus;
use dorm_alloc::workflows::roster::RosterImporter;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Builds a campus from optional roster files. Beds are loaded first so a
/// bad inventory fails before any student rows are read.
pub(crate) fn seed_campus(
    students: Option<&Path>,
    beds: Option<&Path>,
) -> Result<Arc<InMemoryCampus>, AppError> {
    let campus = Arc::new(InMemoryCampus::new());

    if let Some(path) = beds {
        let summary = RosterImporter::beds_from_path(path, &campus)?;
        info!(
            path = %path.display(),
            rooms = summary.rooms,
            beds = summary.beds,
            "seeded bed inventory"
        );
    }
    if let Some(path) = students {
        let summary = RosterImporter::students_from_path(path, &campus)?;
        info!(path = %path.display(), students = summary.students, "seeded student roster");
    }

    Ok(campus)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
