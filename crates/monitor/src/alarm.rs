//! Executes alarm state-machine effects against a [`CuePlayer`] and the
//! auto-stop timer.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use triageq_core::alarm::{AlarmEffect, AlarmManager, AlarmState};
use triageq_core::triage::TriageClass;
use triageq_core::types::Timestamp;

use crate::audio::CuePlayer;
use crate::controller::Event;
use crate::timer::TimerSlot;

pub(crate) struct AlarmDriver<P> {
    machine: AlarmManager,
    player: P,
    auto_stop: TimerSlot,
    expires_at: Option<Timestamp>,
    events: mpsc::UnboundedSender<Event>,
}

impl<P: CuePlayer> AlarmDriver<P> {
    pub(crate) fn new(
        auto_stop_after: Duration,
        player: P,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            machine: AlarmManager::new(auto_stop_after),
            player,
            auto_stop: TimerSlot::new("alarm_auto_stop"),
            expires_at: None,
            events,
        }
    }

    pub(crate) fn state(&self) -> AlarmState {
        self.machine.state()
    }

    pub(crate) fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    pub(crate) fn observe(&mut self, class: TriageClass) {
        let previous = self.machine.state().active_class;
        let effects = self.machine.observe(class);
        if !effects.is_empty() {
            tracing::info!(
                from = ?previous,
                to = %class,
                "Alarm escalated",
            );
        }
        self.apply(effects);
    }

    pub(crate) fn on_auto_stop(&mut self, generation: u64) {
        let effects = self.machine.on_auto_stop(generation);
        if effects.is_empty() {
            tracing::debug!(generation, "Ignoring superseded alarm deadline");
            return;
        }
        tracing::info!("Alarm auto-stopped");
        self.expires_at = None;
        self.apply(effects);
    }

    pub(crate) fn play_profile_cue(&mut self) {
        let effects = self.machine.play_profile_cue();
        self.apply(effects);
    }

    pub(crate) fn shutdown(&mut self) {
        let effects = self.machine.shutdown();
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<AlarmEffect>) {
        for effect in effects {
            match effect {
                AlarmEffect::Stop(cue) => self.player.stop(cue),
                AlarmEffect::Play(cue) => {
                    // The alarm still counts as active for auto-stop.
                    if let Err(e) = self.player.play(cue) {
                        tracing::warn!(%cue, error = %e, "Cue playback failed");
                    }
                }
                AlarmEffect::ScheduleAutoStop { generation, after } => {
                    let events = self.events.clone();
                    self.auto_stop.once(after, move || {
                        let _ = events.send(Event::AlarmAutoStop { generation });
                    });
                    self.expires_at = chrono::Duration::from_std(after)
                        .ok()
                        .map(|d| Utc::now() + d);
                }
                AlarmEffect::CancelAutoStop => {
                    self.auto_stop.cancel();
                    self.expires_at = None;
                }
            }
        }
    }
}
