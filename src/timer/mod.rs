//! The timer core. The basic idea is:
//!  - [machine::ActivityTimer] owns the one optional running entry and the
//!    ordered history of completed blocks.
//!  - A tap on an activity starts it, stops it, or switches to it depending
//!    on what is currently running.
//!  - Blocks shorter than ten seconds are dropped as accidental taps.
//!  - The running entry is persisted through [store::RunningStateStore] so a
//!    session survives process termination; history durability is the
//!    journal's job, not the core's.

pub mod entry;
pub mod machine;
pub mod store;
