use crate::JobId;

/// Views the processing flow can hand off to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Generator,
    Dashboard,
    Editor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Register the job with the shared poller.
    RegisterWatch { job_id: JobId, topic: String },
    /// Start the view's own display polling for the job.
    StartStatusPolling { job_id: JobId },
    StopStatusPolling,
    /// Deliver `Msg::RedirectElapsed(route)` after the redirect delay.
    ScheduleRedirect { route: Route },
    Navigate(Route),
}
