use std::{
    fs::{self, File},
    io::{ErrorKind, Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::entry::Entry;

/// Durable home of the single optional running entry. Saving is best-effort:
/// a failed write must never surface to the timer, which stays authoritative
/// over its in-memory state. `load` is called once, when the timer is
/// constructed, to pick up a session that survived process termination.
#[cfg_attr(test, mockall::automock)]
pub trait RunningStateStore: Send + Sync + 'static {
    fn save(&self, entry: Option<Entry>);

    fn load(&self) -> Option<Entry>;
}

/// What actually lands on disk: the activity in string form plus the start
/// instant in epoch seconds. The end instant is never written, a stored entry
/// is running by definition.
#[derive(Serialize, Deserialize)]
struct RunningSnapshot {
    activity: Arc<str>,
    #[serde(with = "chrono::serde::ts_seconds")]
    start: DateTime<Utc>,
}

const RUNNING_STATE_FILE: &str = "running_state.json";

/// Stores the snapshot as a single json file in the application directory.
pub struct FileRunningStateStore {
    path: PathBuf,
}

impl FileRunningStateStore {
    pub fn new(application_dir: &Path) -> Self {
        Self {
            path: application_dir.join(RUNNING_STATE_FILE),
        }
    }

    fn write_snapshot(&self, entry: &Entry) -> Result<()> {
        let snapshot = RunningSnapshot {
            activity: entry.activity.clone(),
            start: entry.start,
        };
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let result = file
            .write_all(&serde_json::to_vec(&snapshot)?)
            .and_then(|_| file.flush());
        file.unlock()?;
        result?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_snapshot(&self) -> Result<Option<RunningSnapshot>> {
        let mut file = match File::open(&self.path) {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        file.lock_shared()?;
        let mut content = String::new();
        let result = file.read_to_string(&mut content);
        file.unlock()?;
        result?;

        match serde_json::from_str::<RunningSnapshot>(&content) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                // A torn write from a previous shutdown means there is nothing
                // worth restoring.
                warn!("Stored running state at {:?} is malformed: {e}", self.path);
                Ok(None)
            }
        }
    }
}

impl RunningStateStore for FileRunningStateStore {
    fn save(&self, entry: Option<Entry>) {
        let result = match entry.as_ref() {
            Some(entry) => self.write_snapshot(entry),
            None => self.clear(),
        };
        if let Err(e) = result {
            warn!("Failed to persist running state: {e:?}");
        }
    }

    fn load(&self) -> Option<Entry> {
        match self.read_snapshot() {
            Ok(Some(snapshot)) => {
                debug!("Restoring running entry for {}", snapshot.activity);
                Some(Entry::open(snapshot.activity, snapshot.start))
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read running state: {e:?}");
                None
            }
        }
    }
}
