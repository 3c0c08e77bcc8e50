//! Translation between the job API's stage labels and what this client shows.
use serde::{Deserialize, Serialize};

use crate::RemoteStage;

/// Status vocabulary of a stored thread record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Processing,
    #[serde(alias = "completed")]
    Complete,
    Failed,
}

impl ThreadStatus {
    /// The single mapping from API stages to record status.
    ///
    /// Every non-terminal stage, including labels this client does not know,
    /// is `Processing`.
    pub fn from_remote(stage: &RemoteStage) -> Self {
        match stage {
            RemoteStage::Completed => ThreadStatus::Complete,
            RemoteStage::Failed => ThreadStatus::Failed,
            RemoteStage::Processing
            | RemoteStage::Transcribing
            | RemoteStage::Generating
            | RemoteStage::Other(_) => ThreadStatus::Processing,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThreadStatus::Processing => "processing",
            ThreadStatus::Complete => "complete",
            ThreadStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for ThreadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processing" => Ok(ThreadStatus::Processing),
            "complete" | "completed" => Ok(ThreadStatus::Complete),
            "failed" => Ok(ThreadStatus::Failed),
            other => Err(format!("unknown thread status '{other}'")),
        }
    }
}

pub const STEP_QUEUING: &str = "Queuing your request...";
pub const STEP_TRANSCRIBING: &str = "Transcribing audio...";
pub const STEP_GENERATING: &str = "Crafting engaging tweets...";
pub const STEP_COMPLETE: &str = "Complete!";
pub const STEP_FAILED: &str = "Generation failed";
pub const STEP_UNKNOWN: &str = "Processing...";

/// Progress floor and step label shown for a stage.
///
/// Returns `None` for labels this client does not know; callers keep their
/// current percentage in that case.
pub fn stage_display(stage: &RemoteStage) -> Option<(u8, &'static str)> {
    match stage {
        RemoteStage::Processing => Some((10, STEP_QUEUING)),
        RemoteStage::Transcribing => Some((25, STEP_TRANSCRIBING)),
        RemoteStage::Generating => Some((75, STEP_GENERATING)),
        RemoteStage::Completed => Some((100, STEP_COMPLETE)),
        RemoteStage::Failed => Some((0, STEP_FAILED)),
        RemoteStage::Other(_) => None,
    }
}

/// Percentage estimate for a running job: the reported value, raised to the
/// stage's floor.
pub fn estimate_progress(stage: &RemoteStage, reported: Option<f64>, current: u8) -> u8 {
    let reported = reported.map(clamp_percent);
    match stage_display(stage) {
        Some((fixed, _)) if stage.is_terminal() => fixed,
        Some((floor, _)) => reported.unwrap_or(0).max(floor),
        None => reported.unwrap_or(current).max(current),
    }
}

/// Progress to record for a job that is still running, if there is anything
/// worth recording. Terminal stages have their own record updates.
pub fn running_progress(stage: &RemoteStage, reported: Option<f64>) -> Option<u8> {
    match stage {
        RemoteStage::Completed | RemoteStage::Failed => None,
        RemoteStage::Other(_) => reported.map(clamp_percent),
        known => Some(estimate_progress(known, reported, 0)),
    }
}

pub(crate) fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_stages_all_map_to_processing() {
        for stage in [
            RemoteStage::Processing,
            RemoteStage::Transcribing,
            RemoteStage::Generating,
            RemoteStage::Other("queued".into()),
        ] {
            assert_eq!(ThreadStatus::from_remote(&stage), ThreadStatus::Processing);
        }
        assert_eq!(
            ThreadStatus::from_remote(&RemoteStage::Completed),
            ThreadStatus::Complete
        );
        assert_eq!(
            ThreadStatus::from_remote(&RemoteStage::Failed),
            ThreadStatus::Failed
        );
    }

    #[test]
    fn reported_progress_raises_the_floor() {
        assert_eq!(estimate_progress(&RemoteStage::Transcribing, None, 0), 25);
        assert_eq!(estimate_progress(&RemoteStage::Transcribing, Some(40.0), 0), 40);
        assert_eq!(estimate_progress(&RemoteStage::Generating, Some(12.0), 0), 75);
        assert_eq!(estimate_progress(&RemoteStage::Generating, Some(250.0), 0), 100);
    }

    #[test]
    fn terminal_stages_ignore_reported_progress() {
        assert_eq!(estimate_progress(&RemoteStage::Completed, Some(3.0), 50), 100);
        assert_eq!(estimate_progress(&RemoteStage::Failed, Some(80.0), 50), 0);
    }

    #[test]
    fn running_progress_skips_terminal_and_silent_unknown_stages() {
        assert_eq!(running_progress(&RemoteStage::Processing, None), Some(10));
        assert_eq!(running_progress(&RemoteStage::Completed, Some(100.0)), None);
        assert_eq!(running_progress(&RemoteStage::Other("x".into()), None), None);
        assert_eq!(
            running_progress(&RemoteStage::Other("x".into()), Some(42.4)),
            Some(42)
        );
    }

    #[test]
    fn unknown_stage_keeps_current_value() {
        let stage = RemoteStage::Other("uploading".into());
        assert_eq!(estimate_progress(&stage, None, 25), 25);
        assert_eq!(estimate_progress(&stage, Some(30.0), 25), 30);
        assert_eq!(stage_display(&stage), None);
    }
}
