use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::status::clamp_percent;
use crate::{CompletedJob, JobId, ThreadStatus};

/// Persisted, user-visible outcome of one job. Keyed by `id` (the job id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRecord {
    pub id: JobId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "any_percent")]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Fields written by other flows; carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accepts any JSON number (or null) and clamps it to 0..=100.
fn any_percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.map_or(0, clamp_percent))
}

impl ThreadRecord {
    /// A freshly seeded record for a job that has just been submitted.
    pub fn processing(id: impl Into<JobId>, title: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        let title = title.into();
        Self {
            id: id.into(),
            topic: Some(title.clone()),
            title,
            status: ThreadStatus::Processing,
            created_at,
            progress: 0,
            tweets: None,
            result: None,
            preview: None,
            error: None,
            extra: Map::new(),
        }
    }

    /// A record for a job first seen at completion.
    pub fn completed(
        id: impl Into<JobId>,
        title: impl Into<String>,
        job: &CompletedJob,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::processing(id, title, created_at);
        ThreadPatch::completed(job).apply(&mut record);
        record
    }
}

/// Shallow update of a record: every `Some` field replaces the stored value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ThreadPatch {
    pub title: Option<String>,
    pub status: Option<ThreadStatus>,
    pub progress: Option<u8>,
    pub tweets: Option<u32>,
    pub result: Option<Value>,
    pub preview: Option<String>,
    pub error: Option<String>,
}

impl ThreadPatch {
    pub fn progress(status: ThreadStatus, progress: u8) -> Self {
        Self {
            status: Some(status),
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn completed(job: &CompletedJob) -> Self {
        Self {
            status: Some(ThreadStatus::Complete),
            progress: Some(100),
            tweets: Some(job.total_posts()),
            result: Some(job.raw.to_value()),
            preview: Some(job.preview()),
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: Some(ThreadStatus::Failed),
            progress: Some(0),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn apply(&self, record: &mut ThreadRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(progress) = self.progress {
            record.progress = progress.min(100);
        }
        if let Some(tweets) = self.tweets {
            record.tweets = Some(tweets);
        }
        if let Some(result) = &self.result {
            record.result = Some(result.clone());
        }
        if let Some(preview) = &self.preview {
            record.preview = Some(preview.clone());
        }
        if let Some(error) = &self.error {
            record.error = Some(error.clone());
        }
    }
}

/// Prepends `record` unless a record with the same id exists.
pub fn insert_if_absent(threads: &mut Vec<ThreadRecord>, record: ThreadRecord) -> bool {
    if threads.iter().any(|t| t.id == record.id) {
        return false;
    }
    threads.insert(0, record);
    true
}

/// Merges `patch` into the first record with `id`. Returns false when absent.
pub fn update_by_id(threads: &mut [ThreadRecord], id: &str, patch: &ThreadPatch) -> bool {
    match threads.iter_mut().find(|t| t.id == id) {
        Some(record) => {
            patch.apply(record);
            true
        }
        None => false,
    }
}

/// Drops every record with `id`; returns how many were removed.
pub fn remove_by_id(threads: &mut Vec<ThreadRecord>, id: &str) -> usize {
    let before = threads.len();
    threads.retain(|t| t.id != id);
    before - threads.len()
}

/// Keeps the first occurrence of each id, preserving order.
/// Returns the filtered list and the ids that were dropped.
pub fn dedupe_by_id(threads: Vec<ThreadRecord>) -> (Vec<ThreadRecord>, Vec<JobId>) {
    let mut seen = HashSet::with_capacity(threads.len());
    let mut dropped = Vec::new();
    let mut unique = Vec::with_capacity(threads.len());
    for thread in threads {
        if seen.contains(&thread.id) {
            dropped.push(thread.id);
        } else {
            seen.insert(thread.id.clone());
            unique.push(thread);
        }
    }
    (unique, dropped)
}

/// Filter for the thread list view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThreadQuery {
    pub search: Option<String>,
    pub status: Option<ThreadStatus>,
}

impl ThreadQuery {
    pub fn matches(&self, thread: &ThreadRecord) -> bool {
        let status_ok = self.status.is_none_or(|status| thread.status == status);
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => thread
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        };
        status_ok && search_ok
    }

    /// Matching records, most recent first.
    pub fn apply<'a>(&self, threads: &'a [ThreadRecord]) -> Vec<&'a ThreadRecord> {
        let mut hits: Vec<_> = threads.iter().filter(|t| self.matches(t)).collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        hits
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThreadStats {
    pub total: usize,
    pub processing: usize,
    pub complete: usize,
    pub failed: usize,
    pub posts: u64,
}

impl ThreadStats {
    pub fn collect(threads: &[ThreadRecord]) -> Self {
        threads.iter().fold(Self::default(), |mut stats, thread| {
            stats.total += 1;
            match thread.status {
                ThreadStatus::Processing => stats.processing += 1,
                ThreadStatus::Complete => stats.complete += 1,
                ThreadStatus::Failed => stats.failed += 1,
            }
            stats.posts += u64::from(thread.tweets.unwrap_or(0));
            stats
        })
    }
}
