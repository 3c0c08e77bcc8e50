use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use quikthread_core::status::running_progress;
use quikthread_core::{
    CompletedJob, JobId, JobPhase, JobStatus, PendingJob, ThreadPatch, ThreadRecord, ThreadStatus,
};
use quikthread_logging::{qt_debug, qt_error, qt_info, qt_warn};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{JobApi, Notifier, ThreadStore, Toast};

pub type CompletionCallback = Box<dyn FnOnce(JobStatus) + Send>;
pub type ErrorCallback = Box<dyn FnOnce(String) + Send>;

#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Period of the reconciliation tick.
    pub interval: Duration,
    /// Status checks allowed per watch before it is failed as timed out.
    /// `None` polls until the job reaches a terminal stage.
    pub max_ticks: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_ticks: Some(400),
        }
    }
}

struct PollWatch {
    topic: String,
    ticks: u32,
    on_complete: CompletionCallback,
    on_error: ErrorCallback,
}

#[derive(Default)]
struct Watches {
    by_id: HashMap<JobId, PollWatch>,
    timer: Option<CancellationToken>,
    timers_started: u64,
}

struct Shared {
    api: Arc<dyn JobApi>,
    store: Arc<ThreadStore>,
    notifier: Arc<dyn Notifier>,
    settings: PollSettings,
    watches: Mutex<Watches>,
}

/// Background reconciliation of watched jobs against the job API.
///
/// One shared timer runs while at least one job is watched. Each tick checks
/// every watched job, records progress in the [`ThreadStore`], and on a
/// terminal stage notifies, fires the watch's callback once and drops the
/// watch. Failed status checks are logged and retried on the next tick.
///
/// Watches are started from within a Tokio runtime.
#[derive(Clone)]
pub struct JobPoller {
    shared: Arc<Shared>,
}

impl JobPoller {
    pub fn new(
        api: Arc<dyn JobApi>,
        store: Arc<ThreadStore>,
        notifier: Arc<dyn Notifier>,
        settings: PollSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                api,
                store,
                notifier,
                settings,
                watches: Mutex::new(Watches::default()),
            }),
        }
    }

    /// Watches `job_id`. Returns false (and keeps the existing watch) if the
    /// job is already watched.
    pub fn start_watch<C, E>(
        &self,
        job_id: impl Into<JobId>,
        topic: impl Into<String>,
        on_complete: C,
        on_error: E,
    ) -> bool
    where
        C: FnOnce(JobStatus) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        let job_id = job_id.into();
        let mut watches = self.shared.lock_watches();
        if watches.by_id.contains_key(&job_id) {
            qt_debug!(job = job_id; "already watched");
            return false;
        }
        watches.by_id.insert(
            job_id.clone(),
            PollWatch {
                topic: topic.into(),
                ticks: 0,
                on_complete: Box::new(on_complete),
                on_error: Box::new(on_error),
            },
        );
        qt_info!(job = job_id; "watch started ({} active)", watches.by_id.len());

        if watches.timer.is_none() {
            let cancel = CancellationToken::new();
            watches.timer = Some(cancel.clone());
            watches.timers_started += 1;
            tokio::spawn(run_timer(self.shared.clone(), cancel));
        }
        true
    }

    /// Drops the watch for `job_id` without firing its callbacks.
    pub fn stop_watch(&self, job_id: &str) -> bool {
        self.shared.take_watch(job_id).is_some()
    }

    pub fn is_watched(&self, job_id: &str) -> bool {
        self.shared.lock_watches().by_id.contains_key(job_id)
    }

    pub fn watch_count(&self) -> usize {
        self.shared.lock_watches().by_id.len()
    }

    /// Whether the shared timer is running.
    pub fn is_polling(&self) -> bool {
        self.shared.lock_watches().timer.is_some()
    }

    /// How many times the shared timer has been started.
    pub fn timers_started(&self) -> u64 {
        self.shared.lock_watches().timers_started
    }

    /// Runs one reconciliation tick immediately.
    pub async fn tick(&self) {
        self.shared.reconcile().await;
    }
}

async fn run_timer(shared: Arc<Shared>, cancel: CancellationToken) {
    let period = shared.settings.interval;
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    qt_debug!("poll timer started ({:?})", period);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => shared.reconcile().await,
        }
    }
    qt_debug!("poll timer stopped");
}

impl Shared {
    fn lock_watches(&self) -> MutexGuard<'_, Watches> {
        self.watches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Removes a watch; stops the timer when it was the last one.
    fn take_watch(&self, job_id: &str) -> Option<PollWatch> {
        let mut watches = self.lock_watches();
        let watch = watches.by_id.remove(job_id)?;
        qt_info!(job = job_id; "watch stopped ({} active)", watches.by_id.len());
        if watches.by_id.is_empty() {
            if let Some(cancel) = watches.timer.take() {
                cancel.cancel();
            }
        }
        Some(watch)
    }

    fn topic_of(&self, job_id: &str) -> Option<String> {
        self.lock_watches()
            .by_id
            .get(job_id)
            .map(|watch| watch.topic.clone())
    }

    async fn reconcile(&self) {
        let (due, expired) = self.advance_ticks();
        for (job_id, ticks) in expired {
            qt_warn!(job = job_id; "no terminal status after {} checks", ticks);
            self.fail(
                &job_id,
                format!("Timed out waiting for job {job_id} after {ticks} status checks"),
            );
        }
        join_all(due.iter().map(|job_id| self.reconcile_job(job_id))).await;
    }

    /// Counts this tick against every watch's budget and splits the watches
    /// into those to check now and those that ran out.
    fn advance_ticks(&self) -> (Vec<JobId>, Vec<(JobId, u32)>) {
        let max_ticks = self.settings.max_ticks;
        let mut watches = self.lock_watches();
        let mut due = Vec::with_capacity(watches.by_id.len());
        let mut expired = Vec::new();
        for (job_id, watch) in watches.by_id.iter_mut() {
            if max_ticks.is_some_and(|max| watch.ticks >= max) {
                expired.push((job_id.clone(), watch.ticks));
            } else {
                watch.ticks += 1;
                due.push(job_id.clone());
            }
        }
        (due, expired)
    }

    async fn reconcile_job(&self, job_id: &str) {
        match self.api.get_job(job_id).await {
            Ok(status) => match status.phase() {
                JobPhase::Pending(pending) => self.record_progress(job_id, &pending),
                JobPhase::Completed(done) => self.complete(job_id, done),
                JobPhase::Failed(failed) => self.fail(job_id, failed.error),
            },
            Err(err) => {
                qt_warn!(job = job_id; "status check failed, retrying next tick: {}", err);
            }
        }
    }

    fn record_progress(&self, job_id: &str, pending: &PendingJob) {
        let Some(progress) = running_progress(&pending.stage, pending.progress) else {
            return;
        };
        let patch = ThreadPatch::progress(ThreadStatus::Processing, progress);
        match self.store.update_by_id(job_id, &patch) {
            Ok(true) => qt_debug!(job = job_id; "{} at {}%", pending.stage, progress),
            Ok(false) => qt_debug!(job = job_id; "no thread record yet, progress dropped"),
            Err(err) => qt_error!(job = job_id; "failed to record progress: {}", err),
        }
    }

    fn complete(&self, job_id: &str, done: CompletedJob) {
        let patch = ThreadPatch::completed(&done);
        let stored = self.store.update_by_id(job_id, &patch).and_then(|updated| {
            if updated {
                return Ok(());
            }
            let title = self.topic_of(job_id).unwrap_or_else(|| job_id.to_string());
            let record = ThreadRecord::completed(job_id, title, &done, Utc::now());
            if !self.store.insert_if_absent(record)? {
                // Seeded between the two calls.
                self.store.update_by_id(job_id, &patch)?;
            }
            Ok(())
        });
        if let Err(err) = stored {
            qt_error!(job = job_id; "failed to store completed thread: {}", err);
        }

        let Some(watch) = self.take_watch(job_id) else {
            qt_debug!(job = job_id; "completion seen after the watch was dropped");
            return;
        };
        qt_info!(job = job_id; "completed with {} post(s)", done.total_posts());
        self.notifier.notify(Toast::generated(&watch.topic));
        (watch.on_complete)(done.raw);
    }

    fn fail(&self, job_id: &str, error: String) {
        match self.store.update_by_id(job_id, &ThreadPatch::failed(error.clone())) {
            Ok(true) => {}
            Ok(false) => qt_debug!(job = job_id; "no thread record to mark failed"),
            Err(err) => qt_error!(job = job_id; "failed to store failure: {}", err),
        }

        let Some(watch) = self.take_watch(job_id) else {
            return;
        };
        qt_warn!(job = job_id; "failed: {}", error);
        self.notifier.notify(Toast::generation_failed(&watch.topic));
        (watch.on_error)(error);
    }
}
