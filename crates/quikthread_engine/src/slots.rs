use std::sync::Arc;

use quikthread_core::{JobDescriptor, JobStatus};
use quikthread_logging::qt_warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{KeyValueStorage, StorageError};

pub const CURRENT_JOB_KEY: &str = "currentJob";
pub const COMPLETED_JOB_KEY: &str = "completedJob";

/// The single-value slots shared between the generator, the processing view
/// and the results view.
pub struct SlotStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl SlotStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// The job waiting to be shown by the processing view, if any.
    pub fn current_job(&self) -> Option<JobDescriptor> {
        self.read(CURRENT_JOB_KEY)
    }

    pub fn set_current_job(&self, job: &JobDescriptor) -> Result<(), StorageError> {
        self.write(CURRENT_JOB_KEY, job)
    }

    pub fn clear_current_job(&self) -> Result<(), StorageError> {
        self.storage.remove(CURRENT_JOB_KEY)
    }

    /// Clears the current job only while it still describes `job_id`.
    pub fn clear_current_job_if(&self, job_id: &str) -> Result<bool, StorageError> {
        match self.current_job() {
            Some(current) if current.job_id == job_id => {
                self.clear_current_job()?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Full payload of the most recently completed job.
    pub fn completed_job(&self) -> Option<JobStatus> {
        self.read(COMPLETED_JOB_KEY)
    }

    pub fn set_completed_job(&self, status: &JobStatus) -> Result<(), StorageError> {
        self.write(COMPLETED_JOB_KEY, status)
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                qt_warn!("Failed to read slot {}: {}", key, err);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                qt_warn!("Slot {} holds unreadable data, ignoring it: {}", key, err);
                None
            }
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.storage.set(key, &json)
    }
}
