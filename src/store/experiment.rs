//! Experiment Metadata
//!
//! Typed accessors for the shared experiment configuration. All machines
//! in the setup read and write the same fixed keys through a [`KvStore`]
//! handle, so everyone agrees on operator, project, and output layout.
//!
//! ## Keys
//!
//! | key                | meaning                                   |
//! |--------------------|-------------------------------------------|
//! | `PI_name`          | principal investigator                    |
//! | `project_id`       | project the data belongs to               |
//! | `experiment_class` | `UniVie`, `External`, or `IP`             |
//! | `base_data_dir`    | root of the data tree                     |
//! | `measurement_tag`  | sample label used in filenames            |
//! | `file_id`          | shared dataset counter, atomic increment  |
//! | `last_dataset`     | path of the most recently recorded set    |
//!
//! Derived values (data directory, working directory, dataset filename)
//! are computed from these plus the current date and are never stored;
//! see [`paths`](super::paths).

use super::{paths, KvStore, StoreError};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

const KEY_PI_NAME: &str = "PI_name";
const KEY_PROJECT_ID: &str = "project_id";
const KEY_EXPERIMENT_CLASS: &str = "experiment_class";
const KEY_BASE_DATA_DIR: &str = "base_data_dir";
const KEY_MEASUREMENT_TAG: &str = "measurement_tag";
const KEY_FILE_ID: &str = "file_id";
const KEY_LAST_DATASET: &str = "last_dataset";

/// Who the experiment is billed to; first component under the data root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentClass {
    /// In-house university experiments
    UniVie,
    /// External user groups
    External,
    /// Instrument and pipeline development
    IP,
}

impl ExperimentClass {
    /// All accepted classes, in display order.
    pub const ALL: [ExperimentClass; 3] = [
        ExperimentClass::UniVie,
        ExperimentClass::External,
        ExperimentClass::IP,
    ];

    /// The exact string stored for this class.
    pub fn as_str(self) -> &'static str {
        match self {
            ExperimentClass::UniVie => "UniVie",
            ExperimentClass::External => "External",
            ExperimentClass::IP => "IP",
        }
    }
}

impl fmt::Display for ExperimentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExperimentClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UniVie" => Ok(ExperimentClass::UniVie),
            "External" => Ok(ExperimentClass::External),
            "IP" => Ok(ExperimentClass::IP),
            other => Err(format!(
                "invalid experiment class '{other}', expected one of: UniVie, External, IP"
            )),
        }
    }
}

/// Typed view of the shared experiment configuration.
///
/// Holds an injected store handle; opening and closing the underlying
/// connection is the caller's concern.
///
/// # Example
///
/// ```
/// use beamlink::store::{ExperimentClass, ExperimentConfig, MemoryStore};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let cfg = ExperimentConfig::new(Arc::new(MemoryStore::new()));
/// cfg.set_pi_name("Erik").await.unwrap();
/// cfg.set_experiment_class(ExperimentClass::UniVie).await.unwrap();
/// assert_eq!(cfg.pi_name().await.unwrap(), "Erik");
/// # });
/// ```
pub struct ExperimentConfig {
    store: Arc<dyn KvStore>,
}

impl ExperimentConfig {
    /// Creates a view over the given store handle.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Reads a key that the schema requires to be present.
    async fn require(&self, key: &str) -> Result<String, StoreError> {
        self.store
            .get(key)
            .await?
            .ok_or_else(|| StoreError::KeyNotSet(key.to_string()))
    }

    /// Principal investigator name.
    pub async fn pi_name(&self) -> Result<String, StoreError> {
        self.require(KEY_PI_NAME).await
    }

    pub async fn set_pi_name(&self, value: &str) -> Result<(), StoreError> {
        self.store.set(KEY_PI_NAME, value).await
    }

    /// Project identifier.
    pub async fn project_id(&self) -> Result<String, StoreError> {
        self.require(KEY_PROJECT_ID).await
    }

    pub async fn set_project_id(&self, value: &str) -> Result<(), StoreError> {
        self.store.set(KEY_PROJECT_ID, value).await
    }

    /// Experiment class. A stored value outside the accepted set is
    /// reported as invalid rather than passed through.
    pub async fn experiment_class(&self) -> Result<ExperimentClass, StoreError> {
        let raw = self.require(KEY_EXPERIMENT_CLASS).await?;
        raw.parse().map_err(|reason| StoreError::InvalidValue {
            key: KEY_EXPERIMENT_CLASS.to_string(),
            reason,
        })
    }

    /// Sets the experiment class. Taking the enum rather than a string
    /// makes an invalid class unrepresentable at this boundary.
    pub async fn set_experiment_class(&self, class: ExperimentClass) -> Result<(), StoreError> {
        self.store.set(KEY_EXPERIMENT_CLASS, class.as_str()).await
    }

    /// Root of the data tree.
    pub async fn base_data_dir(&self) -> Result<PathBuf, StoreError> {
        Ok(PathBuf::from(self.require(KEY_BASE_DATA_DIR).await?))
    }

    /// Stores the data root. The path must be valid UTF-8 since the
    /// store only holds strings.
    pub async fn set_base_data_dir(&self, value: &std::path::Path) -> Result<(), StoreError> {
        let as_str = value.to_str().ok_or_else(|| StoreError::InvalidValue {
            key: KEY_BASE_DATA_DIR.to_string(),
            reason: "path is not valid UTF-8".to_string(),
        })?;
        self.store.set(KEY_BASE_DATA_DIR, as_str).await
    }

    /// Sample label used in dataset filenames.
    pub async fn measurement_tag(&self) -> Result<String, StoreError> {
        self.require(KEY_MEASUREMENT_TAG).await
    }

    pub async fn set_measurement_tag(&self, value: &str) -> Result<(), StoreError> {
        self.store.set(KEY_MEASUREMENT_TAG, value).await
    }

    /// Current value of the shared dataset counter (zero when unset).
    pub async fn file_id(&self) -> Result<i64, StoreError> {
        match self.store.get(KEY_FILE_ID).await? {
            None => Ok(0),
            Some(raw) => raw.parse().map_err(|_| StoreError::InvalidValue {
                key: KEY_FILE_ID.to_string(),
                reason: format!("'{raw}' is not an integer"),
            }),
        }
    }

    /// Claims the next dataset id. Atomic across all machines sharing
    /// the store, so two acquisitions can never collide on a filename.
    pub async fn next_file_id(&self) -> Result<i64, StoreError> {
        self.store.incr(KEY_FILE_ID).await
    }

    /// Path of the most recently recorded dataset, if any.
    pub async fn last_dataset(&self) -> Result<Option<PathBuf>, StoreError> {
        Ok(self.store.get(KEY_LAST_DATASET).await?.map(PathBuf::from))
    }

    pub async fn set_last_dataset(&self, value: &std::path::Path) -> Result<(), StoreError> {
        let as_str = value.to_str().ok_or_else(|| StoreError::InvalidValue {
            key: KEY_LAST_DATASET.to_string(),
            reason: "path is not valid UTF-8".to_string(),
        })?;
        self.store.set(KEY_LAST_DATASET, as_str).await
    }

    /// Directory where today's data is written. Derived, never stored.
    pub async fn data_dir(&self) -> Result<PathBuf, StoreError> {
        Ok(paths::data_dir(
            &self.base_data_dir().await?,
            self.experiment_class().await?,
            &self.pi_name().await?,
            &self.project_id().await?,
            &paths::today(),
        ))
    }

    /// Directory for analysis output. Derived, never stored.
    pub async fn working_dir(&self) -> Result<PathBuf, StoreError> {
        Ok(paths::working_dir(
            &self.base_data_dir().await?,
            self.experiment_class().await?,
            &self.pi_name().await?,
            &self.project_id().await?,
        ))
    }

    /// Filename for the dataset with the current counter value.
    ///
    /// An acquisition claims its id with [`next_file_id`](Self::next_file_id)
    /// first, then derives the name.
    pub async fn fname(&self) -> Result<String, StoreError> {
        Ok(paths::dataset_filename(
            &self.measurement_tag().await?,
            self.file_id().await?,
            &paths::today(),
        ))
    }

    /// Human-readable dump of the current configuration.
    pub async fn summary(&self) -> Result<String, StoreError> {
        let last = match self.last_dataset().await? {
            Some(path) => path.display().to_string(),
            None => "-".to_string(),
        };
        Ok(format!(
            "Configuration:\n\
             \tPI_name: {}\n\
             \tproject_id: {}\n\
             \texperiment_class: {}\n\
             \tdata_dir: {}\n\
             \tfname: {}\n\
             \tlast_dataset: {}",
            self.pi_name().await?,
            self.project_id().await?,
            self.experiment_class().await?,
            self.data_dir().await?.display(),
            self.fname().await?,
            last,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::path::Path;

    fn config() -> ExperimentConfig {
        ExperimentConfig::new(Arc::new(MemoryStore::new()))
    }

    async fn populated() -> ExperimentConfig {
        let cfg = config();
        cfg.set_pi_name("Erik").await.unwrap();
        cfg.set_project_id("epoc").await.unwrap();
        cfg.set_experiment_class(ExperimentClass::UniVie)
            .await
            .unwrap();
        cfg.set_base_data_dir(Path::new("/data/instruments/jem2100plus"))
            .await
            .unwrap();
        cfg.set_measurement_tag("lysozyme").await.unwrap();
        cfg
    }

    #[tokio::test]
    async fn test_unset_key_is_an_error() {
        let cfg = config();
        let err = cfg.pi_name().await.unwrap_err();
        assert!(matches!(err, StoreError::KeyNotSet(key) if key == "PI_name"));
    }

    #[tokio::test]
    async fn test_round_trip_strings() {
        let cfg = populated().await;
        assert_eq!(cfg.pi_name().await.unwrap(), "Erik");
        assert_eq!(cfg.project_id().await.unwrap(), "epoc");
        assert_eq!(cfg.measurement_tag().await.unwrap(), "lysozyme");
    }

    #[tokio::test]
    async fn test_experiment_class_round_trip() {
        let cfg = populated().await;
        assert_eq!(
            cfg.experiment_class().await.unwrap(),
            ExperimentClass::UniVie
        );
    }

    #[tokio::test]
    async fn test_corrupt_experiment_class_is_rejected() {
        // Another (buggy) writer put a bad value in the shared store.
        let store = Arc::new(MemoryStore::new());
        store.set("experiment_class", "Internal").await.unwrap();
        let cfg = ExperimentConfig::new(store);

        let err = cfg.experiment_class().await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn test_file_counter() {
        let cfg = populated().await;
        assert_eq!(cfg.file_id().await.unwrap(), 0);
        assert_eq!(cfg.next_file_id().await.unwrap(), 1);
        assert_eq!(cfg.next_file_id().await.unwrap(), 2);
        assert_eq!(cfg.file_id().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_last_dataset_optional() {
        let cfg = populated().await;
        assert_eq!(cfg.last_dataset().await.unwrap(), None);

        cfg.set_last_dataset(Path::new("/data/out/2026-08-31_lysozyme_001"))
            .await
            .unwrap();
        assert_eq!(
            cfg.last_dataset().await.unwrap(),
            Some(PathBuf::from("/data/out/2026-08-31_lysozyme_001"))
        );
    }

    #[tokio::test]
    async fn test_derived_paths_compose_stored_fields() {
        let cfg = populated().await;

        let data_dir = cfg.data_dir().await.unwrap();
        let expected_prefix = Path::new("/data/instruments/jem2100plus/UniVie/Erik/epoc");
        assert!(data_dir.starts_with(expected_prefix));

        assert_eq!(
            cfg.working_dir().await.unwrap(),
            PathBuf::from("/data/instruments/jem2100plus/UniVie/Erik/epoc")
        );
    }

    #[tokio::test]
    async fn test_fname_uses_counter_and_tag() {
        let cfg = populated().await;
        cfg.next_file_id().await.unwrap();
        let fname = cfg.fname().await.unwrap();
        assert!(fname.ends_with("_lysozyme_001"));
    }

    #[tokio::test]
    async fn test_summary_mentions_all_fields() {
        let cfg = populated().await;
        let summary = cfg.summary().await.unwrap();
        assert!(summary.contains("PI_name: Erik"));
        assert!(summary.contains("project_id: epoc"));
        assert!(summary.contains("experiment_class: UniVie"));
        assert!(summary.contains("last_dataset: -"));
    }
}
