//! Per-vital threshold classifier.
//!
//! Pure logic, recomputed for every render. The classifier can disagree
//! with the aggregate [`TriageVerdict`](crate::triage::TriageVerdict); both
//! are surfaced and never reconciled here.

use serde::Serialize;

use crate::vitals::VitalLabel;

/// HR at or above this is tachycardic.
pub const HR_CRITICAL_GE: f64 = 120.0;
/// HR below this is bradycardic.
pub const HR_WARNING_LT: f64 = 50.0;
pub const SPO2_CRITICAL_LT: f64 = 90.0;
/// Upper bound (inclusive) of the borderline SpO2 band.
pub const SPO2_WARNING_LE: f64 = 93.0;
pub const PI_CRITICAL_LT: f64 = 0.5;
pub const RR_CRITICAL_GE: f64 = 30.0;
pub const RR_CRITICAL_LT: f64 = 8.0;
pub const BFI_CRITICAL_GT: f64 = 120.0;

/// Severity tier of a single card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VitalStatus {
    #[serde(rename = "critical")]
    Critical,
    #[serde(rename = "warning")]
    Warning,
    #[serde(rename = "normal")]
    Normal,
    /// SpO2 in the healthy range; styled differently from other normals.
    #[serde(rename = "normal-spo2")]
    NormalSpo2,
}

impl VitalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VitalStatus::Critical => "critical",
            VitalStatus::Warning => "warning",
            VitalStatus::Normal => "normal",
            VitalStatus::NormalSpo2 => "normal-spo2",
        }
    }
}

/// Classify a reading by its display label. Unknown labels are `Normal`.
pub fn classify(label: &str, value: f64) -> VitalStatus {
    match label.parse::<VitalLabel>() {
        Ok(label) => classify_vital(label, value),
        Err(_) => VitalStatus::Normal,
    }
}

pub fn classify_vital(label: VitalLabel, value: f64) -> VitalStatus {
    match label {
        VitalLabel::Hr => {
            if value >= HR_CRITICAL_GE {
                VitalStatus::Critical
            } else if value < HR_WARNING_LT {
                VitalStatus::Warning
            } else {
                VitalStatus::Normal
            }
        }
        VitalLabel::SpO2 => {
            if value < SPO2_CRITICAL_LT {
                VitalStatus::Critical
            } else if value <= SPO2_WARNING_LE {
                VitalStatus::Warning
            } else {
                VitalStatus::NormalSpo2
            }
        }
        VitalLabel::Pi if value < PI_CRITICAL_LT => VitalStatus::Critical,
        VitalLabel::Rr if value >= RR_CRITICAL_GE || value < RR_CRITICAL_LT => {
            VitalStatus::Critical
        }
        VitalLabel::Bfi if value > BFI_CRITICAL_GT => VitalStatus::Critical,
        VitalLabel::Pi | VitalLabel::Rr | VitalLabel::Bfi | VitalLabel::SignalTrust => {
            VitalStatus::Normal
        }
    }
}
