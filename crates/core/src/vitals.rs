//! Physiological sample types.
//!
//! Field names on the wire follow the data source exactly (`HR`, `SpO2`,
//! `tau_us`, ...). The BFI card displays `tau_us`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::classifier::{classify_vital, VitalStatus};
use crate::error::CoreError;

/// One poll's worth of physiological readings. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct VitalsSample {
    #[serde(rename = "HR")]
    pub hr: f64,
    #[serde(rename = "SpO2")]
    pub spo2: f64,
    #[serde(rename = "PI")]
    pub pi: f64,
    #[serde(rename = "RR")]
    pub rr: f64,
    /// Correlation decay time in microseconds, shown as the blood-flow index.
    pub tau_us: f64,
    #[serde(rename = "SignalTrust")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub signal_trust: f64,
    pub ppg_point: f64,
}

impl VitalsSample {
    /// Enforce payload invariants on a received sample.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()?;
        Ok(())
    }

    /// Reading for a single card.
    pub fn value(&self, label: VitalLabel) -> f64 {
        match label {
            VitalLabel::Hr => self.hr,
            VitalLabel::SpO2 => self.spo2,
            VitalLabel::Pi => self.pi,
            VitalLabel::Rr => self.rr,
            VitalLabel::Bfi => self.tau_us,
            VitalLabel::SignalTrust => self.signal_trust,
        }
    }

    /// All six display cards with their derived status, in grid order.
    pub fn cards(&self) -> Vec<VitalCard> {
        VitalLabel::ALL
            .iter()
            .map(|&label| {
                let value = self.value(label);
                VitalCard {
                    label,
                    value,
                    unit: label.unit(),
                    status: classify_vital(label, value),
                }
            })
            .collect()
    }
}

/// The six vitals shown on the monitor grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VitalLabel {
    #[serde(rename = "HR")]
    Hr,
    #[serde(rename = "SpO2")]
    SpO2,
    #[serde(rename = "PI")]
    Pi,
    #[serde(rename = "RR")]
    Rr,
    #[serde(rename = "BFI")]
    Bfi,
    #[serde(rename = "Signal Trust")]
    SignalTrust,
}

impl VitalLabel {
    pub const ALL: [VitalLabel; 6] = [
        VitalLabel::Hr,
        VitalLabel::SpO2,
        VitalLabel::Pi,
        VitalLabel::Rr,
        VitalLabel::Bfi,
        VitalLabel::SignalTrust,
    ];

    /// Display label, also the key accepted by [`crate::classifier::classify`].
    pub fn as_str(self) -> &'static str {
        match self {
            VitalLabel::Hr => "HR",
            VitalLabel::SpO2 => "SpO2",
            VitalLabel::Pi => "PI",
            VitalLabel::Rr => "RR",
            VitalLabel::Bfi => "BFI",
            VitalLabel::SignalTrust => "Signal Trust",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            VitalLabel::Hr | VitalLabel::Rr => "bpm",
            VitalLabel::SpO2 | VitalLabel::Pi | VitalLabel::SignalTrust => "%",
            VitalLabel::Bfi => "μs (τc)",
        }
    }
}

impl FromStr for VitalLabel {
    type Err = CoreError;

    /// Accepts display labels case-insensitively, plus `tau_us` and
    /// `SignalTrust` as they appear on the wire.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hr" => Ok(VitalLabel::Hr),
            "spo2" => Ok(VitalLabel::SpO2),
            "pi" => Ok(VitalLabel::Pi),
            "rr" => Ok(VitalLabel::Rr),
            "bfi" | "tau_us" => Ok(VitalLabel::Bfi),
            "signal trust" | "signaltrust" | "trust" => Ok(VitalLabel::SignalTrust),
            _ => Err(CoreError::UnknownVital(s.to_string())),
        }
    }
}

impl std::fmt::Display for VitalLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered vital card: current value plus derived severity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalCard {
    pub label: VitalLabel,
    pub value: f64,
    pub unit: &'static str,
    pub status: VitalStatus,
}

#[cfg(test)]
pub(crate) fn sample_with(hr: f64, spo2: f64) -> VitalsSample {
    VitalsSample {
        hr,
        spo2,
        pi: 2.5,
        rr: 16.0,
        tau_us: 70.0,
        signal_trust: 98.0,
        ppg_point: 1.01,
    }
}
