use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::utils::clock::Clock;

use super::{entry::Entry, store::RunningStateStore};

/// Blocks shorter than this are treated as accidental taps and dropped.
const MINIMUM_DURATION: Duration = Duration::seconds(10);

/// Owns the single running session and the ordered history of completed
/// blocks. At most one entry is running at any instant, and no two recorded
/// entries overlap; touching boundaries are allowed. All state lives behind
/// read-only accessors so that only the operations below can move it.
///
/// Every operation is a guard, not a failure: calls made in the wrong state
/// degrade to no-ops, and [insert](ActivityTimer::insert) reports rejection
/// through its return value.
pub struct ActivityTimer {
    current: Option<Entry>,
    entries: Vec<Entry>,
    clock: Box<dyn Clock>,
    store: Option<Box<dyn RunningStateStore>>,
}

impl ActivityTimer {
    /// Creates the timer, restoring a running entry that survived process
    /// termination if the store holds one.
    pub fn new(clock: Box<dyn Clock>, store: Option<Box<dyn RunningStateStore>>) -> Self {
        let current = store.as_ref().and_then(|store| store.load());
        Self {
            current,
            entries: Vec::new(),
            clock,
            store,
        }
    }

    /// One-tap dispatch: start when idle, stop when tapping the running
    /// activity, switch when tapping another one.
    pub fn tap(&mut self, activity: &str) {
        match self.current.as_ref() {
            Some(running) if &*running.activity == activity => self.stop(),
            Some(_) => self.switch_to(activity),
            None => self.start(activity),
        }
    }

    pub fn start(&mut self, activity: &str) {
        if self.current.is_some() {
            return;
        }
        let now = self.clock.time();
        debug!("Starting {activity} at {now}");
        self.current = Some(Entry::open(activity.into(), now));
        self.save_running_state();
    }

    pub fn stop(&mut self) {
        let Some(running) = self.current.take() else {
            return;
        };
        let now = self.clock.time();
        debug!("Stopping {} at {now}", running.activity);
        self.record_closed(running, now);
        self.save_running_state();
    }

    /// Closes the running block and opens the next one at the identical
    /// instant, so no untracked time exists between the two. Behaves as
    /// [start](ActivityTimer::start) when nothing is running.
    pub fn switch_to(&mut self, activity: &str) {
        let now = self.clock.time();
        if let Some(running) = self.current.take() {
            debug!("Switching {} -> {activity} at {now}", running.activity);
            self.record_closed(running, now);
        }
        self.current = Some(Entry::open(activity.into(), now));
        self.save_running_state();
    }

    pub fn is_running(&self, activity: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|running| &*running.activity == activity)
    }

    /// Time the given activity has been running. Reads the clock on every
    /// call, so repeated calls during a session return increasing values.
    /// Zero for anything that is not the running activity.
    pub fn elapsed(&self, activity: &str) -> Duration {
        match self.current.as_ref() {
            Some(running) if &*running.activity == activity => self.clock.time() - running.start,
            _ => Duration::zero(),
        }
    }

    /// Appends a completed entry if and only if it does not overlap the last
    /// recorded one. Starting exactly where the previous entry ended is
    /// valid. Open entries never get in. Returns whether the entry was
    /// recorded; a rejection leaves the history untouched.
    pub fn insert(&mut self, entry: Entry) -> bool {
        if entry.end.is_none() {
            return false;
        }
        if let Some(last) = self.entries.last() {
            match last.end {
                Some(last_end) if entry.start < last_end => return false,
                _ => {}
            }
        }
        self.entries.push(entry);
        true
    }

    /// Explicit checkpoint of the running state, for hosts about to be
    /// suspended or terminated without an orderly stop.
    pub fn persist(&self) {
        self.save_running_state();
    }

    pub fn current_entry(&self) -> Option<&Entry> {
        self.current.as_ref()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Shared tail of stop and switch: close the block at `end` and record
    /// it, unless it is short enough to be an accidental tap.
    fn record_closed(&mut self, running: Entry, end: DateTime<Utc>) {
        if end - running.start >= MINIMUM_DURATION {
            self.insert(running.with_end(end));
        } else {
            debug!("Dropping short block for {}", running.activity);
        }
    }

    fn save_running_state(&self) {
        if let Some(store) = self.store.as_ref() {
            store.save(self.current.clone());
        }
    }
}
