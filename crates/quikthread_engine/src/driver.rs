use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quikthread_core::{Effect, JobId, JobStatus, Msg, Route};
use quikthread_logging::{qt_debug, qt_error, qt_warn};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{JobApi, JobPoller, SlotStore};

#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Period of the view's own display polling.
    pub status_interval: Duration,
    /// Pause between completion and the redirect to the results view.
    pub redirect_delay: Duration,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_secs(2),
            redirect_delay: Duration::from_secs(1),
        }
    }
}

/// Executes processing-view effects against the engine and feeds results
/// back as [`Msg`]s on `msg_tx`.
///
/// The presence flag is shared with the poller callbacks. Completion always
/// updates the slots; the view only hears about it while present.
pub struct ProcessingDriver {
    api: Arc<dyn JobApi>,
    poller: JobPoller,
    slots: Arc<SlotStore>,
    settings: DriverSettings,
    present: Arc<AtomicBool>,
    msg_tx: UnboundedSender<Msg>,
    status_poll: Option<CancellationToken>,
}

impl ProcessingDriver {
    pub fn new(
        api: Arc<dyn JobApi>,
        poller: JobPoller,
        slots: Arc<SlotStore>,
        settings: DriverSettings,
        msg_tx: UnboundedSender<Msg>,
    ) -> Self {
        Self {
            api,
            poller,
            slots,
            settings,
            present: Arc::new(AtomicBool::new(false)),
            msg_tx,
            status_poll: None,
        }
    }

    /// Opens the view: reads the pending job and marks the view present.
    pub fn enter(&self) -> Msg {
        let pending = self.slots.current_job();
        let already_watched = pending
            .as_ref()
            .is_some_and(|job| self.poller.is_watched(&job.job_id));
        self.present.store(pending.is_some(), Ordering::SeqCst);
        Msg::Entered {
            pending,
            already_watched,
        }
    }

    /// Closes the view. Feed the returned message through `update`.
    pub fn leave(&self) -> Msg {
        self.present.store(false, Ordering::SeqCst);
        Msg::Unmounted
    }

    pub fn is_present(&self) -> bool {
        self.present.load(Ordering::SeqCst)
    }

    /// Runs `effects`; navigation requests are returned to the caller.
    pub fn run(&mut self, effects: Vec<Effect>) -> Vec<Route> {
        let mut routes = Vec::new();
        for effect in effects {
            match effect {
                Effect::RegisterWatch { job_id, topic } => self.register_watch(job_id, topic),
                Effect::StartStatusPolling { job_id } => self.start_status_polling(job_id),
                Effect::StopStatusPolling => self.stop_status_polling(),
                Effect::ScheduleRedirect { route } => self.schedule_redirect(route),
                Effect::Navigate(route) => routes.push(route),
            }
        }
        routes
    }

    fn register_watch(&self, job_id: JobId, topic: String) {
        let slots = self.slots.clone();
        let present = self.present.clone();
        let tx = self.msg_tx.clone();
        let watched = job_id.clone();
        let on_complete = move |status: JobStatus| {
            if let Err(err) = slots.set_completed_job(&status) {
                qt_error!("Failed to store completed job: {}", err);
            }
            match slots.clear_current_job_if(&watched) {
                Ok(true) => {}
                Ok(false) => qt_debug!(job = watched; "current job slot moved on, left in place"),
                Err(err) => qt_error!("Failed to clear current job: {}", err),
            }
            if present.load(Ordering::SeqCst) {
                let _ = tx.send(Msg::WatchCompleted(status));
            }
        };

        let present = self.present.clone();
        let tx = self.msg_tx.clone();
        let on_error = move |message: String| {
            if present.load(Ordering::SeqCst) {
                let _ = tx.send(Msg::WatchFailed(message));
            }
        };

        self.poller.start_watch(job_id, topic, on_complete, on_error);
    }

    fn start_status_polling(&mut self, job_id: JobId) {
        self.stop_status_polling();
        let cancel = CancellationToken::new();
        self.status_poll = Some(cancel.clone());

        let api = self.api.clone();
        let tx = self.msg_tx.clone();
        let period = self.settings.status_interval;
        tokio::spawn(async move {
            // First tick fires immediately.
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    result = api.get_job(&job_id) => result,
                };
                let msg = match result {
                    Ok(status) => Msg::StatusPolled(status),
                    Err(err) => {
                        qt_warn!(job = job_id; "display poll failed: {}", err);
                        Msg::StatusPollFailed(err.to_string())
                    }
                };
                if tx.send(msg).is_err() {
                    break;
                }
            }
            qt_debug!(job = job_id; "display polling stopped");
        });
    }

    fn stop_status_polling(&mut self) {
        if let Some(cancel) = self.status_poll.take() {
            cancel.cancel();
        }
    }

    fn schedule_redirect(&self, route: Route) {
        let tx = self.msg_tx.clone();
        let delay = self.settings.redirect_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Msg::RedirectElapsed(route));
        });
    }
}

impl Drop for ProcessingDriver {
    fn drop(&mut self) {
        self.stop_status_polling();
    }
}
