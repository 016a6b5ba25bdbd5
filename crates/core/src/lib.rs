//! `triageq-core` -- pure domain logic for the TriageQ field monitor.
//!
//! Nothing in this crate performs I/O or reads a clock. The state
//! machines ([`alarm::AlarmManager`], [`protocol::ProtocolMachine`]) return
//! effect values that the runtime in `triageq-monitor` executes.

pub mod alarm;
pub mod classifier;
pub mod cue;
pub mod error;
pub mod history;
pub mod insight;
pub mod profile;
pub mod protocol;
pub mod triage;
pub mod types;
pub mod vitals;
