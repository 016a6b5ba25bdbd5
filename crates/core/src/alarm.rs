//! Single-active-alarm escalation state machine.
//!
//! Pure logic -- no timers and no audio. Each transition returns the
//! [`AlarmEffect`]s the caller must carry out, in order. Auto-stop deadlines
//! carry a generation; a fire from a superseded deadline is ignored even if
//! the caller failed to cancel it in time.

use std::time::Duration;

use serde::Serialize;

use crate::cue::Cue;
use crate::triage::TriageClass;
use crate::types::TimerGeneration;

/// How long an alarm sounds before it is considered acknowledged.
pub const DEFAULT_AUTO_STOP: Duration = Duration::from_secs(30);

/// Side effect requested by an alarm transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmEffect {
    /// Halt the cue and rewind it.
    Stop(Cue),
    Play(Cue),
    /// Arm the auto-stop deadline, replacing any pending one.
    ScheduleAutoStop {
        generation: TimerGeneration,
        after: Duration,
    },
    CancelAutoStop,
}

/// Observable alarm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AlarmState {
    /// Class whose cue is considered playing; `None` means idle.
    pub active_class: Option<TriageClass>,
    /// The profile-change cue was started and has not been stopped yet.
    /// Nothing reports when a cue finishes on its own, so this stays set
    /// until a triage cue starts or the manager shuts down.
    pub profile_cue_active: bool,
}

impl AlarmState {
    pub fn is_idle(&self) -> bool {
        self.active_class.is_none()
    }
}

#[derive(Debug)]
pub struct AlarmManager {
    auto_stop_after: Duration,
    active: Option<TriageClass>,
    last_observed: Option<TriageClass>,
    profile_cue_active: bool,
    generation: TimerGeneration,
}

impl Default for AlarmManager {
    fn default() -> Self {
        Self::new(DEFAULT_AUTO_STOP)
    }
}

impl AlarmManager {
    pub fn new(auto_stop_after: Duration) -> Self {
        Self {
            auto_stop_after,
            active: None,
            last_observed: None,
            profile_cue_active: false,
            generation: 0,
        }
    }

    pub fn state(&self) -> AlarmState {
        AlarmState {
            active_class: self.active,
            profile_cue_active: self.profile_cue_active,
        }
    }

    pub fn auto_stop_after(&self) -> Duration {
        self.auto_stop_after
    }

    /// React to the class of the latest verdict.
    ///
    /// Only a change of class starts a cue. Re-observing the class that
    /// last triggered is a no-op, including after the alarm auto-stopped.
    pub fn observe(&mut self, class: TriageClass) -> Vec<AlarmEffect> {
        if self.last_observed == Some(class) {
            return Vec::new();
        }
        self.last_observed = Some(class);

        let mut effects = Vec::with_capacity(4);
        if let Some(previous) = self.active.take() {
            effects.push(AlarmEffect::Stop(previous.cue()));
        }
        if self.profile_cue_active {
            self.profile_cue_active = false;
            effects.push(AlarmEffect::Stop(Cue::ProfileChange));
        }

        self.generation += 1;
        self.active = Some(class);
        effects.push(AlarmEffect::Play(class.cue()));
        effects.push(AlarmEffect::ScheduleAutoStop {
            generation: self.generation,
            after: self.auto_stop_after,
        });
        effects
    }

    /// Handle an auto-stop deadline firing.
    pub fn on_auto_stop(&mut self, generation: TimerGeneration) -> Vec<AlarmEffect> {
        if generation != self.generation {
            return Vec::new();
        }
        match self.active.take() {
            Some(class) => vec![AlarmEffect::Stop(class.cue())],
            None => Vec::new(),
        }
    }

    /// Sound the out-of-band profile-change cue, restarting it if it is
    /// already playing. The triage alarm is left alone.
    pub fn play_profile_cue(&mut self) -> Vec<AlarmEffect> {
        let mut effects = Vec::with_capacity(2);
        if self.profile_cue_active {
            effects.push(AlarmEffect::Stop(Cue::ProfileChange));
        }
        self.profile_cue_active = true;
        effects.push(AlarmEffect::Play(Cue::ProfileChange));
        effects
    }

    /// Silence everything and invalidate any pending deadline.
    pub fn shutdown(&mut self) -> Vec<AlarmEffect> {
        let mut effects = Vec::with_capacity(3);
        if let Some(class) = self.active.take() {
            effects.push(AlarmEffect::Stop(class.cue()));
        }
        if self.profile_cue_active {
            self.profile_cue_active = false;
            effects.push(AlarmEffect::Stop(Cue::ProfileChange));
        }
        self.generation += 1;
        effects.push(AlarmEffect::CancelAutoStop);
        effects
    }
}
