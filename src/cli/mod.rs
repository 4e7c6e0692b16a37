pub mod output;
pub mod status;
pub mod timeline;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{level_filters::LevelFilter, warn};

use crate::{
    journal::entry_journal::{EntryJournal, JournalStorage},
    timer::{entry::Entry, machine::ActivityTimer, store::FileRunningStateStore},
    utils::{clock::DefaultClock, dir::create_application_default_path, logging::enable_logging},
};

use self::{
    output::format_duration,
    status::process_status_command,
    timeline::{process_timeline_command, TimelineCommand},
};

pub(crate) const JOURNAL_DIR: &str = "journal";

#[derive(Parser, Debug)]
#[command(name = "Taplog", version, long_about = None)]
#[command(about = "One-tap time tracking across named activities", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start, stop or switch with a single gesture on an activity")]
    Tap {
        #[arg(help = "Name of the activity")]
        activity: String,
    },
    #[command(about = "Stop whatever is currently running")]
    Stop {},
    #[command(about = "Show the running activity and its elapsed time")]
    Status {
        #[arg(short, long, help = "Keep re-rendering once per second until Ctrl-C")]
        follow: bool,
    },
    #[command(about = "List recorded blocks in a date range")]
    Timeline {
        #[command(flatten)]
        command: TimelineCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args.dir.map_or_else(create_application_default_path, Ok)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(&app_dir, logging_level, args.log)?;

    match args.commands {
        Commands::Tap { activity } => process_gesture(&app_dir, Gesture::Tap(activity)).await,
        Commands::Stop {} => process_gesture(&app_dir, Gesture::Stop).await,
        Commands::Status { follow } => process_status_command(build_timer(&app_dir), follow).await,
        Commands::Timeline { command } => process_timeline_command(&app_dir, command).await,
    }
}

enum Gesture {
    Tap(String),
    Stop,
}

fn build_timer(app_dir: &Path) -> ActivityTimer {
    ActivityTimer::new(
        Box::new(DefaultClock),
        Some(Box::new(FileRunningStateStore::new(app_dir))),
    )
}

/// Applies one gesture to the timer, drains any newly completed block into
/// the journal, and checkpoints the running state before the process goes
/// away. Each invocation is one gesture; the timer restores the running
/// session from the previous invocation through its store.
async fn process_gesture(app_dir: &Path, gesture: Gesture) -> Result<()> {
    let journal = JournalStorage::new(app_dir.join(JOURNAL_DIR))?;
    let mut timer = build_timer(app_dir);

    let before = timer.current_entry().cloned();
    let recorded_before = timer.entries().len();

    match &gesture {
        Gesture::Tap(activity) => timer.tap(activity),
        Gesture::Stop => timer.stop(),
    }

    for entry in &timer.entries()[recorded_before..] {
        if !journal.append(entry.clone()).await? {
            warn!("Journal rejected a block for {}", entry.activity);
        }
    }

    report_transition(&timer, before.as_ref(), recorded_before);

    timer.persist();
    Ok(())
}

fn report_transition(timer: &ActivityTimer, before: Option<&Entry>, recorded_before: usize) {
    let recorded = timer.entries().len() > recorded_before;
    let last_duration = timer.entries().last().and_then(Entry::duration);

    match (before, timer.current_entry()) {
        (None, Some(next)) => println!("Started {}.", next.activity),
        (Some(prev), None) => match last_duration.filter(|_| recorded) {
            Some(duration) => {
                println!("Stopped {} after {}.", prev.activity, format_duration(duration))
            }
            None => println!(
                "Stopped {}. Blocks shorter than 10 seconds are not recorded.",
                prev.activity
            ),
        },
        (Some(prev), Some(next)) => match last_duration.filter(|_| recorded) {
            Some(duration) => println!(
                "Switched from {} to {}, recorded {}.",
                prev.activity,
                next.activity,
                format_duration(duration)
            ),
            None => println!(
                "Switched from {} to {}. The previous block was too short to record.",
                prev.activity, next.activity
            ),
        },
        (None, None) => println!("Nothing was running."),
    }
}
