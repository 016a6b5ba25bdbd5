//! Drives the assessment protocol's step timer.

use tokio::sync::mpsc;
use tokio::time::Instant;
use triageq_core::protocol::{
    ProtocolEffect, ProtocolError, ProtocolMachine, ProtocolPhase, ProtocolSnapshot, VotPlan,
};

use crate::controller::Event;
use crate::timer::TimerSlot;

pub(crate) struct ProtocolDriver {
    machine: ProtocolMachine,
    step_timer: TimerSlot,
    step_started: Option<Instant>,
    events: mpsc::UnboundedSender<Event>,
}

impl ProtocolDriver {
    pub(crate) fn new(machine: ProtocolMachine, events: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            machine,
            step_timer: TimerSlot::new("protocol_step"),
            step_started: None,
            events,
        }
    }

    pub(crate) fn start(&mut self) -> Result<(), ProtocolError> {
        let effects = self.machine.start()?;
        tracing::info!(steps = self.machine.steps().len(), "Assessment protocol started");
        self.apply(effects);
        self.log_step();
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        let effects = self.machine.reset();
        tracing::info!("Assessment protocol reset");
        self.apply(effects);
    }

    pub(crate) fn on_step_elapsed(&mut self, generation: u64) {
        let before = self.machine.phase();
        let effects = self.machine.on_step_elapsed(generation);
        let after = self.machine.phase();
        if before == after {
            tracing::debug!(generation, "Ignoring superseded protocol timer");
            return;
        }
        self.apply(effects);
        if after == ProtocolPhase::Complete {
            self.step_started = None;
            tracing::info!("Assessment protocol complete");
        } else {
            self.log_step();
        }
    }

    /// Resolve a VOT press; `None` when the current step does not allow it.
    pub(crate) fn vot(&self) -> Option<VotPlan> {
        self.machine.vot()
    }

    pub(crate) fn snapshot(&self) -> ProtocolSnapshot {
        let elapsed = self
            .step_started
            .map(|started| started.elapsed())
            .unwrap_or_default();
        self.machine.snapshot(elapsed)
    }

    pub(crate) fn stop(&mut self) {
        self.step_timer.cancel();
    }

    fn apply(&mut self, effects: Vec<ProtocolEffect>) {
        for effect in effects {
            match effect {
                ProtocolEffect::ScheduleStep { generation, after } => {
                    let events = self.events.clone();
                    self.step_timer.once(after, move || {
                        let _ = events.send(Event::StepElapsed { generation });
                    });
                    self.step_started = Some(Instant::now());
                }
                ProtocolEffect::CancelStep => {
                    self.step_timer.cancel();
                    self.step_started = None;
                }
            }
        }
    }

    fn log_step(&self) {
        if let Some(step) = self.machine.current_step() {
            tracing::info!(
                step = self.machine.step_index() + 1,
                duration_secs = step.duration.as_secs(),
                message = %step.message,
                "Protocol step entered",
            );
        }
    }
}
