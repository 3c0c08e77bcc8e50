use std::path::PathBuf;

use clap::{Parser, Subcommand};
use quikthread_core::{JobType, ThreadStatus};

#[derive(Debug, Parser)]
#[command(
    name = "quikthread",
    version,
    about = "Follow QuikThread generation jobs and browse the threads they produced"
)]
pub struct Cli {
    /// Directory holding the thread list, job slots, config file and log.
    #[arg(
        long,
        global = true,
        env = "QUIKTHREAD_DATA_DIR",
        default_value = "./.quikthread"
    )]
    pub data_dir: PathBuf,

    /// Configuration file (RON). Defaults to `<data-dir>/quikthread.ron`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides `api_base_url` from the configuration file.
    #[arg(long, global = true)]
    pub api_base_url: Option<String>,

    /// Bearer token for the job API.
    #[arg(long, global = true, env = "QUIKTHREAD_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Debug-level logging, echoed to the terminal.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a submitted job as the one to follow next.
    Track {
        job_id: String,
        #[arg(long)]
        title: String,
        #[arg(long = "type", value_name = "TYPE", default_value = "topic")]
        job_type: JobType,
    },
    /// Show live progress for the tracked job until it finishes.
    Watch,
    /// Inspect and maintain the saved thread list.
    Threads {
        #[command(subcommand)]
        command: ThreadsCommand,
    },
    /// Print the posts of the most recently completed job.
    Result,
}

#[derive(Debug, Subcommand)]
pub enum ThreadsCommand {
    /// List threads, most recent first.
    List {
        /// Case-insensitive title filter.
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        status: Option<ThreadStatus>,
    },
    Show {
        id: String,
    },
    Remove {
        id: String,
    },
    /// Drop duplicate entries, keeping the first of each id.
    Dedupe,
    Stats,
}
