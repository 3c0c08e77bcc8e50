use crate::{Effect, Msg, ProcessingState, Route};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ProcessingState, msg: Msg) -> (ProcessingState, Vec<Effect>) {
    let effects = match msg {
        Msg::Entered {
            pending,
            already_watched,
        } => match pending {
            None => {
                // Nothing to show: leave straight away.
                state.unmount();
                vec![Effect::Navigate(Route::Generator)]
            }
            Some(job) => {
                let job_id = job.job_id.clone();
                let topic = job.title.clone();
                state.mount(job);
                let mut effects = Vec::with_capacity(2);
                if !already_watched {
                    effects.push(Effect::RegisterWatch {
                        job_id: job_id.clone(),
                        topic,
                    });
                }
                effects.push(Effect::StartStatusPolling { job_id });
                effects
            }
        },
        Msg::StatusPolled(status) => {
            if state.is_mounted() {
                state.apply_polled(&status);
            }
            Vec::new()
        }
        Msg::WatchCompleted(_status) => {
            if !state.is_mounted() {
                return (state, Vec::new());
            }
            state.apply_completed();
            if state.claim_redirect() {
                vec![Effect::ScheduleRedirect {
                    route: Route::Editor,
                }]
            } else {
                Vec::new()
            }
        }
        Msg::WatchFailed(message) => {
            if state.is_mounted() {
                state.apply_failure(message);
            }
            Vec::new()
        }
        Msg::RedirectElapsed(route) => {
            if state.is_mounted() {
                vec![Effect::Navigate(route)]
            } else {
                Vec::new()
            }
        }
        Msg::TryAgainClicked => vec![Effect::Navigate(Route::Generator)],
        Msg::DashboardClicked => vec![Effect::Navigate(Route::Dashboard)],
        Msg::ViewThreadClicked => {
            if state.view().can_view_thread {
                vec![Effect::Navigate(Route::Editor)]
            } else {
                Vec::new()
            }
        }
        Msg::Unmounted => {
            if state.unmount() {
                state.mark_dirty();
                vec![Effect::StopStatusPolling]
            } else {
                Vec::new()
            }
        }
        Msg::StatusPollFailed(_) | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
