use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type JobId = String;

/// Generated posts keyed by format name, in the order the backend sent them.
pub type PostsByFormat = IndexMap<String, Vec<String>>;

pub const PREVIEW_CHARS: usize = 100;
pub const PREVIEW_FALLBACK: &str = "Posts generated successfully";
pub const DEFAULT_FAILURE_MESSAGE: &str = "Generation failed";

/// Lifecycle label reported by the job API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RemoteStage {
    Processing,
    Transcribing,
    Generating,
    Completed,
    Failed,
    /// Any label this client does not know about.
    Other(String),
}

impl RemoteStage {
    pub fn as_str(&self) -> &str {
        match self {
            RemoteStage::Processing => "processing",
            RemoteStage::Transcribing => "transcribing",
            RemoteStage::Generating => "generating",
            RemoteStage::Completed => "completed",
            RemoteStage::Failed => "failed",
            RemoteStage::Other(label) => label,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteStage::Completed | RemoteStage::Failed)
    }
}

impl From<String> for RemoteStage {
    fn from(label: String) -> Self {
        match label.as_str() {
            "processing" => RemoteStage::Processing,
            "transcribing" => RemoteStage::Transcribing,
            "generating" => RemoteStage::Generating,
            "completed" => RemoteStage::Completed,
            "failed" => RemoteStage::Failed,
            _ => RemoteStage::Other(label),
        }
    }
}

impl From<RemoteStage> for String {
    fn from(stage: RemoteStage) -> Self {
        match stage {
            RemoteStage::Other(label) => label,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RemoteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `GET /jobs/{id}`.
///
/// Fields this client does not interpret are kept in `extra` so the payload
/// can be stored and handed on unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: RemoteStage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posts: Option<PostsByFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobStatus {
    pub fn new(status: RemoteStage) -> Self {
        Self {
            status,
            progress: None,
            posts: None,
            error: None,
            extra: Map::new(),
        }
    }

    pub fn with_posts(mut self, posts: PostsByFormat) -> Self {
        self.posts = Some(posts);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Classifies the payload into its lifecycle stage.
    ///
    /// `completed` without a `posts` field is still pending: the backend has
    /// not attached the result yet. An empty `posts` map is a completion.
    pub fn phase(&self) -> JobPhase {
        match (&self.status, &self.posts) {
            (RemoteStage::Completed, Some(posts)) => JobPhase::Completed(CompletedJob {
                posts: posts.clone(),
                raw: self.clone(),
            }),
            (RemoteStage::Failed, _) => JobPhase::Failed(FailedJob {
                error: self
                    .error
                    .clone()
                    .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            }),
            (stage, _) => JobPhase::Pending(PendingJob {
                stage: stage.clone(),
                progress: self.progress,
            }),
        }
    }

    /// Payload as opaque JSON, for storage in a record or a slot.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobPhase {
    Pending(PendingJob),
    Completed(CompletedJob),
    Failed(FailedJob),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingJob {
    pub stage: RemoteStage,
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletedJob {
    pub posts: PostsByFormat,
    pub raw: JobStatus,
}

impl CompletedJob {
    /// Number of posts across every format.
    pub fn total_posts(&self) -> u32 {
        self.posts.values().map(|posts| posts.len() as u32).sum()
    }

    /// First post in format order, cut to `PREVIEW_CHARS` characters.
    pub fn preview(&self) -> String {
        match self.posts.values().flatten().next() {
            Some(first) => first.chars().take(PREVIEW_CHARS).collect(),
            None => PREVIEW_FALLBACK.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedJob {
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    File,
    Url,
    #[default]
    Topic,
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(JobType::File),
            "url" => Ok(JobType::Url),
            "topic" => Ok(JobType::Topic),
            other => Err(format!("unknown job type '{other}' (expected file, url or topic)")),
        }
    }
}

/// The pending job handed from the generator to the processing view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub job_id: JobId,
    pub title: String,
    #[serde(rename = "type", default)]
    pub job_type: JobType,
    pub created_at: DateTime<Utc>,
    pub status: RemoteStage,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobDescriptor {
    pub fn new(
        job_id: impl Into<JobId>,
        title: impl Into<String>,
        job_type: JobType,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            title: title.into(),
            job_type,
            created_at,
            status: RemoteStage::Processing,
            extra: Map::new(),
        }
    }
}
