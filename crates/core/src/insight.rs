//! Explanatory text and trend data for inspecting a single vital card.

use serde::Serialize;

use crate::classifier::{
    classify_vital, VitalStatus, BFI_CRITICAL_GT, HR_CRITICAL_GE, HR_WARNING_LT, PI_CRITICAL_LT,
    RR_CRITICAL_GE, RR_CRITICAL_LT, SPO2_CRITICAL_LT, SPO2_WARNING_LE,
};
use crate::history::HistoryBuffer;
use crate::vitals::{VitalLabel, VitalsSample};

/// Signal Trust below this means the reading should not be relied on.
pub const SIGNAL_TRUST_UNRELIABLE_LT: f64 = 50.0;

pub fn definition(label: VitalLabel) -> &'static str {
    match label {
        VitalLabel::Hr => "Heart Rate (HR) is the number of times a person's heart beats per minute (bpm). It's a key indicator of cardiac health and stress.",
        VitalLabel::SpO2 => "Blood Oxygen Saturation (SpO2) measures the percentage of oxygen in the blood. Low levels can indicate respiratory issues.",
        VitalLabel::Pi => "Perfusion Index (PI) is an indicator of the pulse strength at the sensor site. A low PI can indicate poor blood flow to the extremities.",
        VitalLabel::Rr => "Respiratory Rate (RR) is the number of breaths a person takes per minute. It's a critical sign for assessing respiratory function.",
        VitalLabel::Bfi => "Blood-Flow Index (BFI) is a novel metric derived from light correlation that indicates microvascular blood flow, a key factor in perfusion.",
        VitalLabel::SignalTrust => "Signal Trust is a quality score (0-100%) indicating how reliable the current sensor reading is, accounting for motion and other interference.",
    }
}

/// One-sentence clinical reading of `value`.
pub fn interpretation(label: VitalLabel, value: f64) -> &'static str {
    match label {
        VitalLabel::Hr if value >= HR_CRITICAL_GE => {
            "This indicates tachycardia (a very fast heart rate)."
        }
        VitalLabel::Hr if value < HR_WARNING_LT => "This indicates bradycardia (a slow heart rate).",
        VitalLabel::Hr => "This is a normal resting heart rate.",
        VitalLabel::SpO2 if value < SPO2_CRITICAL_LT => {
            "This is a critically low oxygen level (hypoxemia)."
        }
        VitalLabel::SpO2 if value <= SPO2_WARNING_LE => {
            "This level is borderline and warrants monitoring."
        }
        VitalLabel::SpO2 => "This is a healthy blood oxygen level.",
        VitalLabel::Pi if value < PI_CRITICAL_LT => "This indicates very weak peripheral perfusion.",
        VitalLabel::Pi => "This indicates strong peripheral perfusion.",
        VitalLabel::Rr if value >= RR_CRITICAL_GE => {
            "This indicates tachypnea (abnormally rapid breathing)."
        }
        VitalLabel::Rr if value < RR_CRITICAL_LT => {
            "This indicates bradypnea (abnormally slow breathing)."
        }
        VitalLabel::Rr => "This is a normal respiratory rate.",
        VitalLabel::Bfi if value > BFI_CRITICAL_GT => {
            "This indicates severely restricted microvascular blood flow."
        }
        VitalLabel::Bfi => "This indicates excellent microvascular blood flow.",
        VitalLabel::SignalTrust if value < SIGNAL_TRUST_UNRELIABLE_LT => {
            "The signal quality is poor; the reading is unreliable."
        }
        VitalLabel::SignalTrust => "The signal quality is excellent.",
    }
}

/// Values of one vital across the sample history, oldest first.
pub fn trend(samples: &HistoryBuffer<VitalsSample>, label: VitalLabel) -> Vec<f64> {
    samples.iter().map(|s| s.value(label)).collect()
}

/// Everything the focus view shows for one card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalInsight {
    pub label: VitalLabel,
    pub unit: &'static str,
    pub current_value: f64,
    pub status: VitalStatus,
    pub definition: &'static str,
    pub interpretation: &'static str,
    pub history: Vec<f64>,
}

impl VitalInsight {
    /// Build the insight from the latest sample in `samples`; `None` before
    /// the first successful poll.
    pub fn from_history(samples: &HistoryBuffer<VitalsSample>, label: VitalLabel) -> Option<Self> {
        let current_value = samples.latest()?.value(label);
        Some(Self {
            label,
            unit: label.unit(),
            current_value,
            status: classify_vital(label, current_value),
            definition: definition(label),
            interpretation: interpretation(label, current_value),
            history: trend(samples, label),
        })
    }
}
