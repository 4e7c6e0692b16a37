use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::NaiveDate;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncSeekExt, AsyncWriteExt, BufReader},
};
use tracing::{debug, warn};

use crate::{timer::entry::Entry, utils::time::date_to_journal_name};

/// Interface for abstracting durable history of completed entries.
pub trait EntryJournal {
    /// Appends a completed entry to the day file of its start date. Returns
    /// whether the entry was recorded: open entries and entries starting
    /// before the last stored end are rejected without touching the file.
    fn append(&self, entry: Entry) -> impl Future<Output = Result<bool>>;

    /// Retrieves the entries recorded for a certain day.
    fn entries_for(&self, date: NaiveDate) -> impl Future<Output = Result<Vec<Entry>>> + Send;
}

impl<T: Deref> EntryJournal for T
where
    T::Target: EntryJournal,
{
    fn append(&self, entry: Entry) -> impl Future<Output = Result<bool>> {
        self.deref().append(entry)
    }

    fn entries_for(&self, date: NaiveDate) -> impl Future<Output = Result<Vec<Entry>>> + Send {
        self.deref().entries_for(date)
    }
}

/// The main realization of [EntryJournal].
pub struct JournalStorage {
    journal_dir: PathBuf,
}

impl JournalStorage {
    pub fn new(journal_dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&journal_dir)?;

        Ok(Self { journal_dir })
    }

    fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.journal_dir.join(date_to_journal_name(date))
    }

    /// Reads the day file forward, remembering the last valid record, then
    /// appends unless the new entry starts inside that record. Day files hold
    /// at most a handful of taps, so a forward read is cheap.
    async fn append_with_file(file: &mut File, entry: Entry) -> Result<bool> {
        let mut last: Option<Entry> = None;
        {
            let mut lines = BufReader::new(&mut *file).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<Entry>(&line) {
                    Ok(v) => last = Some(v),
                    Err(e) => {
                        // Torn writes from a dirty shutdown are not a reason
                        // to lose the new block.
                        warn!("Skipping illegal journal line {line}: {e}")
                    }
                }
            }
        }

        if let Some(last_end) = last.and_then(|v| v.end) {
            if entry.start < last_end {
                warn!(
                    "Rejecting block for {} starting {} inside the last recorded block",
                    entry.activity, entry.start
                );
                return Ok(false);
            }
        }

        let mut buffer = serde_json::to_vec(&entry)?;
        buffer.push(b'\n');

        file.seek(std::io::SeekFrom::End(0)).await?;
        file.write_all(&buffer).await?;
        file.flush().await?;
        Ok(true)
    }

    async fn read_day(path: &Path) -> Result<Vec<Entry>> {
        async fn extract(path: &Path) -> std::result::Result<Vec<Entry>, std::io::Error> {
            debug!("Reading journal file {path:?}");
            let file = File::open(path).await?;
            file.lock_shared()?;
            let buffer = BufReader::new(file);
            let mut lines = buffer.lines();
            let mut entries = vec![];
            while let Ok(Some(line)) = lines.next_line().await {
                match serde_json::from_str::<Entry>(&line) {
                    Ok(entry) if entry.is_running() => {
                        warn!("Skipping open entry in journal file {path:?}")
                    }
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        warn!(
                            "During parsing in path {:?} found illegal json string {}:  {e}",
                            path, &line
                        )
                    }
                }
            }

            lines.into_inner().into_inner().unlock_async().await?;

            Ok(entries)
        }

        match extract(path).await {
            Ok(s) => Ok(s),
            Err(e) => {
                if e.kind() == ErrorKind::NotFound {
                    Ok(vec![])
                } else {
                    Err(e)?
                }
            }
        }
    }
}

impl EntryJournal for JournalStorage {
    async fn append(&self, entry: Entry) -> Result<bool> {
        if entry.is_running() {
            warn!("Refusing to journal an open entry for {}", entry.activity);
            return Ok(false);
        }

        let path = self.day_path(entry.start.date_naive());
        let mut file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(path)
            .await?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = Self::append_with_file(&mut file, entry).await;
        file.unlock_async().await?;
        result
    }

    async fn entries_for(&self, date: NaiveDate) -> Result<Vec<Entry>> {
        Self::read_day(&self.day_path(date)).await
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use anyhow::Result;
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::{timer::entry::Entry, utils::time::date_to_journal_name};

    use super::{EntryJournal, JournalStorage};

    fn ts(epoch_seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(epoch_seconds, 0).unwrap()
    }

    fn closed_entry(activity: &str, start: i64, end: i64) -> Entry {
        Entry::open(activity.into(), ts(start)).with_end(ts(end))
    }

    fn epoch_day() -> NaiveDate {
        ts(0).date_naive()
    }

    #[tokio::test]
    async fn append_then_read_round_trips() -> Result<()> {
        let dir = tempdir()?;
        let journal = JournalStorage::new(dir.path().to_owned())?;

        assert!(journal.append(closed_entry("reading", 7_000, 7_015)).await?);
        assert!(journal.append(closed_entry("writing", 7_015, 7_040)).await?);

        let stored = journal.entries_for(epoch_day()).await?;
        assert_eq!(
            stored,
            vec![
                closed_entry("reading", 7_000, 7_015),
                closed_entry("writing", 7_015, 7_040),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn append_rejects_overlap_even_across_a_reopen() -> Result<()> {
        let dir = tempdir()?;
        {
            let journal = JournalStorage::new(dir.path().to_owned())?;
            assert!(journal.append(closed_entry("reading", 7_000, 7_015)).await?);
        }

        // A fresh process starts with an empty in-memory history; the file is
        // what still knows about the previous block.
        let journal = JournalStorage::new(dir.path().to_owned())?;
        assert!(!journal.append(closed_entry("reading", 7_010, 7_020)).await?);

        let stored = journal.entries_for(epoch_day()).await?;
        assert_eq!(stored, vec![closed_entry("reading", 7_000, 7_015)]);
        Ok(())
    }

    #[tokio::test]
    async fn append_accepts_a_touching_boundary() -> Result<()> {
        let dir = tempdir()?;
        let journal = JournalStorage::new(dir.path().to_owned())?;

        assert!(journal.append(closed_entry("reading", 7_000, 7_015)).await?);
        assert!(journal.append(closed_entry("reading", 7_015, 7_025)).await?);

        assert_eq!(journal.entries_for(epoch_day()).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn append_rejects_an_open_entry() -> Result<()> {
        let dir = tempdir()?;
        let journal = JournalStorage::new(dir.path().to_owned())?;

        let open = Entry::open("reading".into(), ts(7_000));
        assert!(!journal.append(open).await?);

        assert!(journal.entries_for(epoch_day()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped_on_read() -> Result<()> {
        let dir = tempdir()?;
        let journal = JournalStorage::new(dir.path().to_owned())?;
        assert!(journal.append(closed_entry("reading", 7_000, 7_015)).await?);

        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(dir.path().join(date_to_journal_name(epoch_day())))?;
        file.write_all(b"{\"activity\": \"rea\n")?;
        drop(file);

        assert!(journal.append(closed_entry("writing", 7_020, 7_035)).await?);

        let stored = journal.entries_for(epoch_day()).await?;
        assert_eq!(
            stored,
            vec![
                closed_entry("reading", 7_000, 7_015),
                closed_entry("writing", 7_020, 7_035),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn missing_day_file_reads_as_empty() -> Result<()> {
        let dir = tempdir()?;
        let journal = JournalStorage::new(dir.path().to_owned())?;

        assert!(journal.entries_for(epoch_day()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn entries_land_in_the_day_file_of_their_start() -> Result<()> {
        let dir = tempdir()?;
        let journal = JournalStorage::new(dir.path().to_owned())?;
        let next_day = 86_400;

        assert!(journal.append(closed_entry("reading", 7_000, 7_015)).await?);
        assert!(
            journal
                .append(closed_entry("writing", next_day + 100, next_day + 200))
                .await?
        );

        assert_eq!(journal.entries_for(epoch_day()).await?.len(), 1);
        assert_eq!(
            journal.entries_for(ts(next_day).date_naive()).await?.len(),
            1
        );
        Ok(())
    }
}
