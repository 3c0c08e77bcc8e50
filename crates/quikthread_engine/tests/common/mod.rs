#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use quikthread_core::{JobStatus, PostsByFormat, RemoteStage};
use quikthread_engine::{ApiError, ApiFailureKind, JobApi, Notifier, Toast};

/// Job API answering from per-job scripts. The last answer repeats once a
/// script runs out.
#[derive(Default)]
pub struct ScriptedApi {
    scripts: Mutex<HashMap<String, VecDeque<Result<JobStatus, ApiError>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, job_id: &str, answer: Result<JobStatus, ApiError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(job_id.to_string())
            .or_default()
            .push_back(answer);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, job_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == job_id)
            .count()
    }
}

#[async_trait::async_trait]
impl JobApi for ScriptedApi {
    async fn get_job(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        self.calls.lock().unwrap().push(job_id.to_string());
        let mut scripts = self.scripts.lock().unwrap();
        let script = scripts.entry(job_id.to_string()).or_default();
        let answer = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        answer.unwrap_or_else(|| Err(network_error()))
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, toast: Toast) {
        self.toasts.lock().unwrap().push(toast);
    }
}

/// Collects callback invocations.
#[derive(Clone)]
pub struct Calls<T> {
    inner: Arc<Mutex<Vec<T>>>,
}

impl<T> Default for Calls<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone + Send + 'static> Calls<T> {
    pub fn recorder(&self) -> impl FnOnce(T) + Send + 'static {
        let inner = self.inner.clone();
        move |value| inner.lock().unwrap().push(value)
    }

    pub fn all(&self) -> Vec<T> {
        self.inner.lock().unwrap().clone()
    }
}

pub fn network_error() -> ApiError {
    ApiError {
        kind: ApiFailureKind::Network,
        message: "connection refused".to_string(),
    }
}

pub fn posts(entries: &[(&str, &[&str])]) -> PostsByFormat {
    entries
        .iter()
        .map(|(format, posts)| {
            (
                format.to_string(),
                posts.iter().map(|p| p.to_string()).collect(),
            )
        })
        .collect()
}

pub fn completed(entries: &[(&str, &[&str])]) -> JobStatus {
    JobStatus::new(RemoteStage::Completed).with_posts(posts(entries))
}
