use crate::status::{estimate_progress, stage_display, STEP_COMPLETE, STEP_FAILED, STEP_UNKNOWN};
use crate::view_model::ProcessingViewModel;
use crate::{JobDescriptor, JobId, JobStatus, RemoteStage};

pub const STEP_STARTING: &str = "Starting...";
pub const STATUS_FAILED_MESSAGE: &str = "Generation failed. Please try again.";

/// State of the processing view for one pending job.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessingState {
    job: Option<JobDescriptor>,
    mounted: bool,
    progress: u8,
    step: String,
    error: Option<String>,
    redirect_scheduled: bool,
    dirty: bool,
}

impl ProcessingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> ProcessingViewModel {
        let (headline, subtitle) = match (&self.error, &self.job) {
            (Some(_), _) => (
                "Generation Failed".to_string(),
                "Something went wrong during generation".to_string(),
            ),
            (None, Some(job)) => (
                "Generating Your Thread".to_string(),
                format!("Processing: {}", job.title),
            ),
            (None, None) => (
                "Generating Your Thread".to_string(),
                "This will take just a few seconds.".to_string(),
            ),
        };
        ProcessingViewModel {
            headline,
            subtitle,
            step: self.step.clone(),
            progress: self.progress,
            error: self.error.clone(),
            can_view_thread: self.progress == 100,
            dirty: self.dirty,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job.as_ref().map(|job| &job.job_id)
    }

    /// Returns whether the view changed since the last call and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mount(&mut self, job: JobDescriptor) {
        *self = Self {
            job: Some(job),
            mounted: true,
            progress: 0,
            step: STEP_STARTING.to_string(),
            error: None,
            redirect_scheduled: false,
            dirty: true,
        };
    }

    pub(crate) fn unmount(&mut self) -> bool {
        std::mem::replace(&mut self.mounted, false)
    }

    pub(crate) fn apply_polled(&mut self, status: &JobStatus) {
        match &status.status {
            RemoteStage::Failed => {
                let message = status
                    .error
                    .clone()
                    .unwrap_or_else(|| STATUS_FAILED_MESSAGE.to_string());
                self.apply_failure(message);
            }
            stage => {
                self.progress = estimate_progress(stage, status.progress, self.progress);
                self.step = stage_display(stage)
                    .map_or(STEP_UNKNOWN, |(_, step)| step)
                    .to_string();
                self.mark_dirty();
            }
        }
    }

    pub(crate) fn apply_completed(&mut self) {
        self.progress = 100;
        self.step = STEP_COMPLETE.to_string();
        self.error = None;
        self.mark_dirty();
    }

    pub(crate) fn apply_failure(&mut self, message: String) {
        self.progress = 0;
        self.step = STEP_FAILED.to_string();
        self.error = Some(message);
        self.mark_dirty();
    }

    /// Marks the redirect as scheduled; false if it already was.
    pub(crate) fn claim_redirect(&mut self) -> bool {
        !std::mem::replace(&mut self.redirect_scheduled, true)
    }
}
