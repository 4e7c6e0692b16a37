use std::{io::Write, time::Duration};

use ansi_term::Colour;
use anyhow::Result;
use tokio::select;
use tokio_util::sync::CancellationToken;

use crate::{
    timer::machine::ActivityTimer,
    utils::clock::{Clock, DefaultClock},
};

use super::output::format_duration;

const FOLLOW_INTERVAL: Duration = Duration::from_secs(1);

/// Shows what is currently running. With `follow` the line re-renders once a
/// second until Ctrl-C; the timer is only read, never mutated, so there is
/// nothing to checkpoint on the way out.
pub async fn process_status_command(timer: ActivityTimer, follow: bool) -> Result<()> {
    if !follow {
        println!("{}", status_line(&timer));
        return Ok(());
    }

    let shutdown_token = CancellationToken::new();
    tokio::join!(
        detect_shutdown(shutdown_token.clone()),
        follow_status(&timer, shutdown_token),
    );
    Ok(())
}

fn status_line(timer: &ActivityTimer) -> String {
    match timer.current_entry() {
        Some(running) => format!(
            "{} {}",
            Colour::Green.bold().paint(&*running.activity),
            format_duration(timer.elapsed(&running.activity))
        ),
        None => "Nothing is running.".to_string(),
    }
}

/// Re-renders the status line on a fixed beat. The next tick is computed from
/// the previous one instead of from "now" so the loop doesn't drift.
async fn follow_status(timer: &ActivityTimer, shutdown: CancellationToken) {
    let clock: Box<dyn Clock> = Box::new(DefaultClock);
    let mut tick = clock.instant();
    loop {
        print!("\r\x1b[2K{}", status_line(timer));
        let _ = std::io::stdout().flush();

        tick += FOLLOW_INTERVAL;
        select! {
            _ = shutdown.cancelled() => {
                println!();
                return;
            }
            _ = clock.sleep_until(tick) => ()
        }
    }
}

async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
    };
}
