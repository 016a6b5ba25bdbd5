//! Immutable views of monitor state published to the presentation layer.

use serde::Serialize;
use triageq_core::alarm::AlarmState;
use triageq_core::protocol::{ProtocolMachine, ProtocolSnapshot};
use triageq_core::triage::TriageVerdict;
use triageq_core::types::Timestamp;
use triageq_core::vitals::{VitalCard, VitalsSample};

/// Everything a renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    pub triage: TriageVerdict,
    /// Latest successful sample; `None` until the first poll succeeds.
    pub vitals: Option<VitalsSample>,
    pub cards: Vec<VitalCard>,
    pub waveform: Vec<f64>,
    pub sample_count: usize,
    pub last_sample_at: Option<Timestamp>,
    pub held: bool,
    pub polling: bool,
    pub alarm: AlarmState,
    pub alarm_expires_at: Option<Timestamp>,
    pub protocol: ProtocolSnapshot,
}

impl MonitorSnapshot {
    /// State before the controller has processed anything.
    pub fn initial() -> Self {
        Self {
            triage: TriageVerdict::initializing(),
            vitals: None,
            cards: Vec::new(),
            waveform: Vec::new(),
            sample_count: 0,
            last_sample_at: None,
            held: false,
            polling: false,
            alarm: AlarmState::default(),
            alarm_expires_at: None,
            protocol: ProtocolMachine::default().snapshot(std::time::Duration::ZERO),
        }
    }

    /// One-line summary used by the console.
    pub fn status_line(&self) -> String {
        let alarm = match self.alarm.active_class {
            Some(class) => format!("alarm {class}"),
            None => "alarm idle".to_string(),
        };
        let protocol = if self.protocol.running {
            format!(
                "STEP {}/{} {} ({:.0}%)",
                self.protocol.step_number,
                self.protocol.total_steps,
                self.protocol.message,
                self.protocol.progress_percent,
            )
        } else {
            self.protocol.message.clone()
        };
        format!(
            "{} [{}] | {} | {} | samples {}{}",
            self.triage.class.banner_text(),
            self.triage.reasons_line(),
            alarm,
            protocol,
            self.sample_count,
            if self.held { " | HELD" } else { "" },
        )
    }
}
