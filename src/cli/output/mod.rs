use std::{future, sync::Arc};

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use futures::{stream, Stream, StreamExt};
use tracing::error;

use crate::{journal::entry_journal::EntryJournal, timer::entry::Entry};

pub struct ExtractConfig {
    pub end: DateTime<Utc>,
    pub start: DateTime<Utc>,
}

impl ExtractConfig {
    fn contains(&self, entry: &Entry) -> bool {
        entry.start >= self.start && entry.start < self.end
    }
}

/// Extracts completed entries between 2 dates. The day files of the range are
/// streamed so a long range doesn't have to sit in memory at once.
pub fn entries_between(
    journal: impl EntryJournal + Send + Sync + 'static,
    config: ExtractConfig,
) -> impl Stream<Item = Result<Entry>> {
    let journal = Arc::new(journal);
    let start = config.start;
    let end = config.end;

    let date_iteration = date_range(start.date_naive(), end.date_naive());

    let files = date_iteration
        .map(move |day| {
            let journal = journal.clone();
            async move { (day, journal.entries_for(day).await) }
        })
        .buffered(4);

    files
        .flat_map(|(day, data)| match data {
            Ok(data) => stream::iter(data).map(Ok).boxed(),
            Err(e) => {
                error!("Failed to read journal file {day} {e}");
                stream::once(future::ready(Err(e))).boxed()
            }
        })
        .filter(move |v| {
            future::ready(match v {
                Ok(entry) => config.contains(entry),
                Err(_) => true,
            })
        })
}

/// Returns a stream of dates between start (inclusive) and end (inclusive).
fn date_range(start: NaiveDate, end: NaiveDate) -> impl Stream<Item = NaiveDate> {
    stream::unfold((start, end), |(mut current, end)| {
        future::ready({
            if current <= end {
                let last_current = current;
                current = current.succ_opt().expect("End of time should never happen");
                Some(((last_current), (current, end)))
            } else {
                None
            }
        })
    })
}

pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}
