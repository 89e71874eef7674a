//! Derived Paths and Filenames
//!
//! Data directories and dataset filenames are never stored: they are
//! composed from stored fields plus the current date. The functions here
//! are pure so they can be tested without a live store; callers fetch the
//! inputs and pass them explicitly.

use super::ExperimentClass;
use chrono::Local;
use std::path::{Path, PathBuf};

/// The current date as `YYYY-MM-DD`.
///
/// Datasets recorded around midnight land in the next day's directory;
/// the store deliberately does not pin the date.
pub fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Directory where the current experiment's data is written:
/// `<base>/<class>/<PI>/<project>/<date>`.
pub fn data_dir(
    base: &Path,
    class: ExperimentClass,
    pi_name: &str,
    project_id: &str,
    date: &str,
) -> PathBuf {
    base.join(class.as_str())
        .join(pi_name)
        .join(project_id)
        .join(date)
}

/// Directory where analysis output is written:
/// `<base>/<class>/<PI>/<project>`.
pub fn working_dir(
    base: &Path,
    class: ExperimentClass,
    pi_name: &str,
    project_id: &str,
) -> PathBuf {
    base.join(class.as_str()).join(pi_name).join(project_id)
}

/// Filename for a dataset: `<date>_<tag>_<NNN>`.
///
/// The file id is zero-padded to three digits so directory listings sort
/// in acquisition order.
pub fn dataset_filename(measurement_tag: &str, file_id: i64, date: &str) -> String {
    format!("{date}_{measurement_tag}_{file_id:03}")
}
