#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessingViewModel {
    pub headline: String,
    pub subtitle: String,
    pub step: String,
    pub progress: u8,
    pub error: Option<String>,
    /// Whether "View your thread" is offered.
    pub can_view_thread: bool,
    pub dirty: bool,
}
