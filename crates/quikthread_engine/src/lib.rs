//! QuikThread engine: local persistence, the job API client, the shared job
//! poller and the processing-view effect driver.
mod api;
mod driver;
mod notify;
mod persist;
mod poller;
mod slots;
mod storage;
mod thread_store;
mod types;

pub use api::{ApiSettings, JobApi, ReqwestJobApi};
pub use driver::{DriverSettings, ProcessingDriver};
pub use notify::{LogNotifier, Notifier, Toast, ToastKind};
pub use persist::{ensure_data_dir, AtomicFileWriter};
pub use poller::{CompletionCallback, ErrorCallback, JobPoller, PollSettings};
pub use slots::{SlotStore, COMPLETED_JOB_KEY, CURRENT_JOB_KEY};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use thread_store::{ThreadStore, THREADS_KEY};
pub use types::{ApiError, ApiFailureKind, StorageError};
