use std::{fmt::Display, path::Path};

use anyhow::Result;
use chrono::{DateTime, Local};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use futures::{pin_mut, StreamExt};
use now::DateTimeNow;

use crate::{journal::entry_journal::JournalStorage, utils::time::next_day_start};

use super::{
    output::{entries_between, format_duration, ExtractConfig},
    Args, JOURNAL_DIR,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct TimelineCommand {
    #[arg(
        long = "start",
        short,
        help = "Start of the range. Examples are \"yesterday\", \"1 hour ago\", \"15/03/2025\", \"12:00 16/03/2025\". Defaults to the beginning of today"
    )]
    start_date: Option<String>,
    #[arg(
        long = "end",
        short,
        help = "End of the range. Same formats as --start. Defaults to now"
    )]
    end_date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
    #[arg(
        long = "days",
        default_value_t = false,
        help = "Take inputs as whole days. For example if start and end are both 15/03/2025 this option allows to extract the whole day"
    )]
    treat_as_days: bool,
}

/// Lists the recorded blocks in the requested range, one line per block. No
/// grouping or totals, the journal is shown as it was written.
pub async fn process_timeline_command(app_dir: &Path, command: TimelineCommand) -> Result<()> {
    let TimelineCommand {
        start_date,
        end_date,
        date_style,
        treat_as_days,
    } = command;

    let (start, end) = parse_range(start_date, end_date, date_style, treat_as_days)?;

    let journal = JournalStorage::new(app_dir.join(JOURNAL_DIR))?;
    let results = entries_between(
        journal,
        ExtractConfig {
            start: start.into(),
            end: end.into(),
        },
    );
    pin_mut!(results);

    let mut printed = 0usize;
    while let Some(entry) = results.next().await {
        let entry = entry?;
        let Some((end_at, duration)) = entry.end.zip(entry.duration()) else {
            continue;
        };
        println!(
            "{}\t{}\t{}\t{}",
            entry.start.with_timezone(&Local).format("%x %H:%M:%S"),
            end_at.with_timezone(&Local).format("%x %H:%M:%S"),
            format_duration(duration),
            entry.activity
        );
        printed += 1;
    }

    if printed == 0 {
        println!("No recorded blocks in the requested range.");
    }
    Ok(())
}

/// Also provides sensible defaults: from the beginning of today until now.
fn parse_range(
    start_date: Option<String>,
    end_date: Option<String>,
    date_style: DateStyle,
    treat_as_days: bool,
) -> Result<(DateTime<Local>, DateTime<Local>)> {
    let now = Local::now();
    let dialect: chrono_english::Dialect = date_style.into();

    let mut start = match start_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate start date {e}"),
                )
                .into());
        }
        None => now.beginning_of_day(),
    };
    let mut end = match end_date.map(|s| parse_date_string(&s, now, dialect)) {
        Some(Ok(v)) => v.with_timezone(&Local),
        Some(Err(e)) => {
            return Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate end date {e}"),
                )
                .into());
        }
        None => now,
    };

    if treat_as_days {
        start = start.beginning_of_day();
        end = next_day_start(end);
    }

    Ok((start, end))
}
