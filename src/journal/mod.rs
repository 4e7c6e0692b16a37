//! Durable history of completed blocks, organized through
//! [entry_journal::JournalStorage]. The basic idea is:
//!  - There is a directory with all the journal files.
//!  - Completed entries are stored as json lines in the file for the UTC day
//!    of their start.
//!  - The timer core does not know the journal exists; the host drains newly
//!    completed entries into it after every gesture.
//!  - Appending re-checks the non-overlap rule against the last stored
//!    record, since each process starts with an empty in-memory history.

pub mod entry_journal;
