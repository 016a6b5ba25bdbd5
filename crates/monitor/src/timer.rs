//! Cancellable timer slots.
//!
//! A [`TimerSlot`] holds at most one scheduled task. Arming it always
//! aborts whatever it held before, so a component that owns a slot can
//! never end up with two live timers for the same purpose. Dropping the
//! slot aborts the task.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

pub(crate) struct TimerSlot {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl TimerSlot {
    pub(crate) fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    /// Run `fire` once after `after`, replacing any armed timer.
    pub(crate) fn once<F>(&mut self, after: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();
        tracing::trace!(timer = self.name, after_ms = after.as_millis() as u64, "Timer armed");
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            fire();
        }));
    }

    /// Run `tick` every `period`, starting one period from now, replacing
    /// any armed timer. The loop ends when `tick` returns `false`.
    pub(crate) fn every<F>(&mut self, period: Duration, mut tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.cancel();
        tracing::trace!(timer = self.name, period_ms = period.as_millis() as u64, "Periodic timer armed");
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !tick() {
                    break;
                }
            }
        }));
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::trace!(timer = self.name, "Timer cancelled");
        }
    }

    /// Whether a task is armed and has not finished yet.
    pub(crate) fn is_armed(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
