//! QuikThread core: job and thread data model, status translation and the
//! pure processing-view state machine.
mod effect;
mod job;
mod msg;
mod state;
pub mod status;
mod thread;
mod update;
mod view_model;

pub use effect::{Effect, Route};
pub use job::{
    CompletedJob, FailedJob, JobDescriptor, JobId, JobPhase, JobStatus, JobType, PendingJob,
    PostsByFormat, RemoteStage, DEFAULT_FAILURE_MESSAGE, PREVIEW_CHARS, PREVIEW_FALLBACK,
};
pub use msg::Msg;
pub use state::{ProcessingState, STATUS_FAILED_MESSAGE, STEP_STARTING};
pub use status::ThreadStatus;
pub use thread::{
    dedupe_by_id, insert_if_absent, remove_by_id, update_by_id, ThreadPatch, ThreadQuery,
    ThreadRecord, ThreadStats,
};
pub use update::update;
pub use view_model::ProcessingViewModel;
