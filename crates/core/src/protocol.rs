//! Timed assessment-protocol state machine.
//!
//! The machine walks a fixed table of timed steps. It owns no clock: the
//! caller arms a timer for each [`ProtocolEffect::ScheduleStep`] and feeds
//! the fire back through [`ProtocolMachine::on_step_elapsed`]. The VOT
//! action is resolved to a [`VotPlan`] for the caller to execute; nothing
//! here performs I/O.
//!
//! Hold/resume is not modelled here. Pausing the data feed never pauses
//! the step clock.

use std::time::Duration;

use serde::Serialize;

use crate::profile::Profile;
use crate::types::TimerGeneration;

/// Index of the VOT window in the default table.
pub const DEFAULT_VOT_STEP: usize = 2;

/// Delay between the occlusion request and the recovery request.
pub const DEFAULT_VOT_RECOVERY_DELAY: Duration = Duration::from_secs(5);

pub const IDLE_MESSAGE: &str = "Ready";
pub const COMPLETE_MESSAGE: &str = "Assessment complete";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProtocolStep {
    pub duration: Duration,
    pub message: String,
}

impl ProtocolStep {
    pub fn new(duration_secs: u64, message: impl Into<String>) -> Self {
        Self {
            duration: Duration::from_secs(duration_secs),
            message: message.into(),
        }
    }
}

/// The four-step field assessment.
pub fn default_steps() -> Vec<ProtocolStep> {
    vec![
        ProtocolStep::new(5, "Acquiring stable signal..."),
        ProtocolStep::new(10, "Monitoring vitals..."),
        ProtocolStep::new(5, "VOT window active..."),
        ProtocolStep::new(10, "Finalizing assessment..."),
    ]
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Protocol already running at step {step}")]
    AlreadyRunning { step: usize },

    #[error("Protocol has no steps")]
    EmptyProtocol,

    #[error("VOT step {vot_step} is outside a {steps}-step protocol")]
    VotStepOutOfRange { vot_step: usize, steps: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "step", rename_all = "snake_case")]
pub enum ProtocolPhase {
    Idle,
    Running(usize),
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolEffect {
    /// Arm the step timer, replacing any pending one.
    ScheduleStep {
        generation: TimerGeneration,
        after: Duration,
    },
    CancelStep,
}

/// VOT configuration: which step accepts it and how recovery is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotSettings {
    pub step: usize,
    pub recovery_profile: Profile,
    pub recovery_delay: Duration,
}

impl Default for VotSettings {
    fn default() -> Self {
        Self {
            step: DEFAULT_VOT_STEP,
            recovery_profile: Profile::Stable,
            recovery_delay: DEFAULT_VOT_RECOVERY_DELAY,
        }
    }
}

/// A profile request to issue `after` the VOT was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledProfileChange {
    pub profile: Profile,
    pub after: Duration,
}

/// Profile requests an accepted VOT asks the executor to issue. The
/// executor also sounds the profile-change cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotPlan {
    pub requests: Vec<ScheduledProfileChange>,
}

/// Render-ready view of the protocol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolSnapshot {
    pub phase: ProtocolPhase,
    pub running: bool,
    pub step_index: usize,
    /// 1-based, as shown in `STEP n/4`; 0 when not running.
    pub step_number: usize,
    pub total_steps: usize,
    pub message: String,
    pub progress_percent: f64,
    pub vot_available: bool,
}

#[derive(Debug)]
pub struct ProtocolMachine {
    steps: Vec<ProtocolStep>,
    vot: VotSettings,
    phase: ProtocolPhase,
    generation: TimerGeneration,
}

impl Default for ProtocolMachine {
    fn default() -> Self {
        Self {
            steps: default_steps(),
            vot: VotSettings::default(),
            phase: ProtocolPhase::Idle,
            generation: 0,
        }
    }
}

impl ProtocolMachine {
    pub fn new(steps: Vec<ProtocolStep>, vot: VotSettings) -> Result<Self, ProtocolError> {
        if steps.is_empty() {
            return Err(ProtocolError::EmptyProtocol);
        }
        if vot.step >= steps.len() {
            return Err(ProtocolError::VotStepOutOfRange {
                vot_step: vot.step,
                steps: steps.len(),
            });
        }
        Ok(Self {
            steps,
            vot,
            phase: ProtocolPhase::Idle,
            generation: 0,
        })
    }

    /// Default step table with custom VOT recovery settings.
    pub fn with_vot(vot: VotSettings) -> Result<Self, ProtocolError> {
        Self::new(default_steps(), vot)
    }

    pub fn phase(&self) -> ProtocolPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, ProtocolPhase::Running(_))
    }

    /// Current step index; 0 whenever the machine is not running.
    pub fn step_index(&self) -> usize {
        match self.phase {
            ProtocolPhase::Running(i) => i,
            ProtocolPhase::Idle | ProtocolPhase::Complete => 0,
        }
    }

    pub fn steps(&self) -> &[ProtocolStep] {
        &self.steps
    }

    pub fn current_step(&self) -> Option<&ProtocolStep> {
        match self.phase {
            ProtocolPhase::Running(i) => self.steps.get(i),
            ProtocolPhase::Idle | ProtocolPhase::Complete => None,
        }
    }

    /// Begin at step 0. Valid from `Idle` or `Complete` only.
    pub fn start(&mut self) -> Result<Vec<ProtocolEffect>, ProtocolError> {
        if let ProtocolPhase::Running(step) = self.phase {
            return Err(ProtocolError::AlreadyRunning { step });
        }
        Ok(self.enter(0))
    }

    /// Advance after the current step's duration elapsed.
    pub fn on_step_elapsed(&mut self, generation: TimerGeneration) -> Vec<ProtocolEffect> {
        if generation != self.generation {
            return Vec::new();
        }
        let ProtocolPhase::Running(i) = self.phase else {
            return Vec::new();
        };

        let next = i + 1;
        if next >= self.steps.len() {
            self.phase = ProtocolPhase::Complete;
            self.generation += 1;
            return Vec::new();
        }
        self.enter(next)
    }

    /// Return to `Idle` from any phase, invalidating the pending step timer.
    pub fn reset(&mut self) -> Vec<ProtocolEffect> {
        self.phase = ProtocolPhase::Idle;
        self.generation += 1;
        vec![ProtocolEffect::CancelStep]
    }

    /// Resolve the VOT action. `None` outside the VOT step.
    pub fn vot(&self) -> Option<VotPlan> {
        if self.phase != ProtocolPhase::Running(self.vot.step) {
            return None;
        }
        Some(VotPlan {
            requests: vec![
                ScheduledProfileChange {
                    profile: Profile::VotOcclusion,
                    after: Duration::ZERO,
                },
                ScheduledProfileChange {
                    profile: self.vot.recovery_profile,
                    after: self.vot.recovery_delay,
                },
            ],
        })
    }

    /// Progress through the current step given the time spent in it.
    pub fn progress_percent(&self, elapsed_in_step: Duration) -> f64 {
        let Some(step) = self.current_step() else {
            return match self.phase {
                ProtocolPhase::Complete => 100.0,
                _ => 0.0,
            };
        };
        if step.duration.is_zero() {
            return 100.0;
        }
        let ratio = elapsed_in_step.as_secs_f64() / step.duration.as_secs_f64();
        (ratio * 100.0).clamp(0.0, 100.0)
    }

    pub fn snapshot(&self, elapsed_in_step: Duration) -> ProtocolSnapshot {
        let message = match self.phase {
            ProtocolPhase::Idle => IDLE_MESSAGE.to_string(),
            ProtocolPhase::Complete => COMPLETE_MESSAGE.to_string(),
            ProtocolPhase::Running(i) => self.steps[i].message.clone(),
        };
        ProtocolSnapshot {
            phase: self.phase,
            running: self.is_running(),
            step_index: self.step_index(),
            step_number: match self.phase {
                ProtocolPhase::Running(i) => i + 1,
                ProtocolPhase::Idle | ProtocolPhase::Complete => 0,
            },
            total_steps: self.steps.len(),
            message,
            progress_percent: self.progress_percent(elapsed_in_step),
            vot_available: self.phase == ProtocolPhase::Running(self.vot.step),
        }
    }

    fn enter(&mut self, index: usize) -> Vec<ProtocolEffect> {
        self.phase = ProtocolPhase::Running(index);
        self.generation += 1;
        vec![ProtocolEffect::ScheduleStep {
            generation: self.generation,
            after: self.steps[index].duration,
        }]
    }
}
