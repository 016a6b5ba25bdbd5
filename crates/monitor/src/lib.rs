//! `triageq-monitor` library crate.
//!
//! The real-time side of the triage monitor: polls the remote vitals
//! service, keeps the bounded histories, escalates alarms and runs the
//! assessment protocol. Everything is driven by a single controller task;
//! see [`controller::spawn`]. The binary entrypoint lives in `main.rs`.

pub mod api;
pub mod audio;
pub mod config;
pub mod console;
pub mod controller;
pub mod snapshot;
pub mod source;

mod alarm;
mod protocol;
mod sampler;
mod timer;
