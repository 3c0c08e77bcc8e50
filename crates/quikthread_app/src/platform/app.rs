use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{bail, Context};
use chrono::Utc;
use quikthread_core::{
    update, JobDescriptor, JobType, Msg, ProcessingState, Route, ThreadQuery, ThreadRecord,
    ThreadStats,
};
use quikthread_engine::{
    ensure_data_dir, FileStorage, JobApi, JobPoller, ProcessingDriver, ReqwestJobApi, SlotStore,
    ThreadStore,
};
use quikthread_logging::{qt_debug, qt_info, LevelFilter, LogDestination};
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use super::config::{AppConfig, LogOutput, CONFIG_FILENAME, LOG_FILENAME};
use super::notifier::TerminalNotifier;
use super::render;
use crate::cli::{Cli, Command, ThreadsCommand};

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    ensure_data_dir(&cli.data_dir)
        .with_context(|| format!("opening data directory {}", cli.data_dir.display()))?;
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.data_dir.join(CONFIG_FILENAME));
    let from_file = AppConfig::read(&config_path)?;
    let found = from_file.is_some();
    let config = from_file
        .unwrap_or_default()
        .with_overrides(cli.api_base_url.clone(), cli.token.clone());
    init_logging(&config, cli.verbose, &cli.data_dir);
    if found {
        qt_info!("Loaded configuration from {:?}", config_path);
    } else {
        qt_debug!("No configuration at {:?}, using defaults", config_path);
    }

    let app = App::open(&cli.data_dir)?;
    match cli.command {
        Command::Track {
            job_id,
            title,
            job_type,
        } => app.track(job_id, title, job_type),
        Command::Watch => app.watch(&config).await,
        Command::Threads { command } => app.threads(command),
        Command::Result => {
            app.print_result();
            Ok(())
        }
    }
}

fn init_logging(config: &AppConfig, verbose: bool, data_dir: &Path) {
    let (destination, level) = if verbose {
        let destination = match config.log {
            LogOutput::Terminal => LogDestination::Terminal,
            LogOutput::File | LogOutput::Both => LogDestination::Both,
        };
        (destination, LevelFilter::Debug)
    } else {
        (config.log.into(), LevelFilter::Info)
    };
    quikthread_logging::initialize(destination, level, &data_dir.join(LOG_FILENAME));
}

struct App {
    store: Arc<ThreadStore>,
    slots: Arc<SlotStore>,
}

impl App {
    /// Opens the stores under `data_dir` and drops duplicate thread entries.
    fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let storage = Arc::new(FileStorage::open(data_dir)?);
        let store = Arc::new(ThreadStore::new(storage.clone()));
        let threads = store
            .deduplicate()
            .context("cleaning up the thread list")?;
        qt_info!("Opened {:?} ({} threads)", data_dir, threads.len());
        Ok(Self {
            store,
            slots: Arc::new(SlotStore::new(storage)),
        })
    }

    fn track(&self, job_id: String, title: String, job_type: JobType) -> anyhow::Result<()> {
        let job = JobDescriptor::new(job_id, title, job_type, Utc::now());
        self.slots.set_current_job(&job)?;
        self.store.insert_if_absent(ThreadRecord::processing(
            job.job_id.clone(),
            job.title.clone(),
            job.created_at,
        ))?;
        println!(
            "Tracking job {} (\"{}\"). Run `quikthread watch` to follow it.",
            job.job_id, job.title
        );
        Ok(())
    }

    async fn watch(&self, config: &AppConfig) -> anyhow::Result<()> {
        let api: Arc<dyn JobApi> = Arc::new(ReqwestJobApi::new(config.api_settings())?);
        let poller = JobPoller::new(
            api.clone(),
            self.store.clone(),
            Arc::new(TerminalNotifier),
            config.poll_settings(),
        );
        let (msg_tx, mut msg_rx) = unbounded_channel();
        spawn_key_reader(msg_tx.clone());
        let mut driver = ProcessingDriver::new(
            api,
            poller,
            self.slots.clone(),
            config.driver_settings(),
            msg_tx,
        );

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut state = ProcessingState::new();
        let mut last_frame = String::new();
        let mut next = Some(driver.enter());
        let route = loop {
            let msg = match next.take() {
                Some(msg) => msg,
                None => tokio::select! {
                    msg = msg_rx.recv() => match msg {
                        Some(msg) => msg,
                        None => break None,
                    },
                    _ = &mut ctrl_c => {
                        qt_info!("Interrupted");
                        break None;
                    }
                },
            };
            let (updated, effects) = update(state, msg);
            state = updated;
            if state.consume_dirty() {
                let frame = render::processing_view(&state.view());
                if frame != last_frame {
                    println!("{frame}");
                    last_frame = frame;
                }
            }
            if let Some(route) = driver.run(effects).into_iter().next() {
                break Some(route);
            }
        };

        let (_, effects) = update(state, driver.leave());
        driver.run(effects);
        if let Some(route) = route {
            qt_debug!("Navigating to {:?}", route);
            self.show(route);
        }
        Ok(())
    }

    fn show(&self, route: Route) {
        match route {
            Route::Editor => self.print_result(),
            Route::Dashboard => {
                let threads = self.store.list();
                print!("{}", render::stats(&ThreadStats::collect(&threads)));
                print!(
                    "{}",
                    render::thread_table(&ThreadQuery::default().apply(&threads))
                );
            }
            Route::Generator => println!(
                "No job in progress. Submit one, then run `quikthread track <job-id> --title <title>`."
            ),
        }
    }

    fn print_result(&self) {
        match self.slots.completed_job() {
            Some(status) => print!("{}", render::completed_job(&status)),
            None => println!("No completed job yet."),
        }
    }

    fn threads(&self, command: ThreadsCommand) -> anyhow::Result<()> {
        match command {
            ThreadsCommand::List { search, status } => {
                let threads = self.store.list();
                let query = ThreadQuery { search, status };
                print!("{}", render::thread_table(&query.apply(&threads)));
            }
            ThreadsCommand::Show { id } => match self.store.find_by_id(&id) {
                Some(thread) => print!("{}", render::thread_details(&thread)),
                None => bail!("no thread with id {id}"),
            },
            ThreadsCommand::Remove { id } => {
                let existed = self.store.find_by_id(&id).is_some();
                self.store.remove_by_id(&id)?;
                if existed {
                    println!("Removed {id}");
                } else {
                    println!("No thread with id {id}");
                }
            }
            ThreadsCommand::Dedupe => {
                let before = self.store.list().len();
                let after = self.store.deduplicate()?.len();
                println!("Removed {} duplicate threads", before.saturating_sub(after));
            }
            ThreadsCommand::Stats => {
                print!("{}", render::stats(&ThreadStats::collect(&self.store.list())));
            }
        }
        Ok(())
    }
}

/// Forwards button presses typed on stdin to the processing view.
fn spawn_key_reader(tx: UnboundedSender<Msg>) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if let Some(msg) = button_for(&line) {
                if tx.send(msg).is_err() {
                    break;
                }
            }
        }
    });
}

fn button_for(input: &str) -> Option<Msg> {
    match input.trim().to_ascii_lowercase().as_str() {
        "t" | "try" | "try again" => Some(Msg::TryAgainClicked),
        "d" | "dashboard" => Some(Msg::DashboardClicked),
        "v" | "view" => Some(Msg::ViewThreadClicked),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use quikthread_core::ThreadStatus;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn keys_map_to_buttons() {
        assert_eq!(button_for("t"), Some(Msg::TryAgainClicked));
        assert_eq!(button_for(" Dashboard \n"), Some(Msg::DashboardClicked));
        assert_eq!(button_for("v"), Some(Msg::ViewThreadClicked));
        assert_eq!(button_for("x"), None);
    }

    #[test]
    fn opening_removes_duplicate_threads() {
        let temp = TempDir::new().unwrap();
        let record = r#"{"id":"a","title":"First","status":"processing","createdAt":"2024-03-01T08:00:00Z"}"#;
        let later = r#"{"id":"a","title":"Second","status":"complete","createdAt":"2024-03-02T08:00:00Z"}"#;
        fs::write(
            temp.path().join("threads.json"),
            format!("[{record},{later}]"),
        )
        .unwrap();

        let app = App::open(temp.path()).unwrap();
        let threads = app.store.list();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].title, "First");
    }

    #[test]
    fn track_seeds_slot_and_processing_record() {
        let temp = TempDir::new().unwrap();
        let app = App::open(temp.path()).unwrap();

        app.track("job-1".to_string(), "My Topic".to_string(), JobType::File)
            .unwrap();
        app.track("job-1".to_string(), "My Topic".to_string(), JobType::File)
            .unwrap();

        let pending = app.slots.current_job().unwrap();
        assert_eq!(pending.job_id, "job-1");
        assert_eq!(pending.job_type, JobType::File);
        let threads = app.store.list();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].status, ThreadStatus::Processing);
        assert_eq!(threads[0].progress, 0);
    }
}
