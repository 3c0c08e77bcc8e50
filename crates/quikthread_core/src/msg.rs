#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The view was opened. `pending` is the content of the current-job slot.
    Entered {
        pending: Option<crate::JobDescriptor>,
        already_watched: bool,
    },
    /// Display polling returned a status.
    StatusPolled(crate::JobStatus),
    /// Display polling failed; the message is for the log only.
    StatusPollFailed(String),
    /// The shared poller saw the job complete.
    WatchCompleted(crate::JobStatus),
    /// The shared poller saw the job fail (or time out).
    WatchFailed(String),
    /// The redirect delay for `route` has elapsed.
    RedirectElapsed(crate::Route),
    TryAgainClicked,
    DashboardClicked,
    ViewThreadClicked,
    /// The view was closed.
    Unmounted,
    /// Fallback for placeholder wiring.
    NoOp,
}
