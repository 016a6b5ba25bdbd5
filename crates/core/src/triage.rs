//! Aggregate triage verdict types.
//!
//! The verdict is produced by the remote triage service and is the only
//! input the alarm manager reacts to. [`TriageClass`] is a closed set, so
//! every per-class lookup (banner text, colour, cue) is an exhaustive
//! `match` rather than a string-keyed table.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::cue::Cue;
use crate::error::CoreError;

/// Reason attached to the verdict substituted when a poll fails.
pub const CONNECTION_ERROR_REASON: &str = "Backend Connection Error";

/// Reason attached to the verdict shown before the first poll completes.
pub const INITIALIZING_REASON: &str = "Initializing...";

/// Aggregate severity verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriageClass {
    Immediate,
    Delayed,
    Minor,
    Assess,
}

impl TriageClass {
    pub const ALL: [TriageClass; 4] = [
        TriageClass::Immediate,
        TriageClass::Delayed,
        TriageClass::Minor,
        TriageClass::Assess,
    ];

    /// Upper-case label rendered on the triage banner.
    pub fn banner_text(self) -> &'static str {
        match self {
            TriageClass::Immediate => "IMMEDIATE",
            TriageClass::Delayed => "DELAYED",
            TriageClass::Minor => "MINOR",
            TriageClass::Assess => "ASSESS",
        }
    }

    /// Banner background colour as a CSS hex string.
    pub fn color_hex(self) -> &'static str {
        match self {
            TriageClass::Immediate => "#D32F2F",
            TriageClass::Delayed => "#FBC02D",
            TriageClass::Minor => "#388E3C",
            TriageClass::Assess => "#616161",
        }
    }

    /// Alarm cue sounded when the verdict switches to this class.
    pub fn cue(self) -> Cue {
        match self {
            TriageClass::Immediate => Cue::Immediate,
            TriageClass::Delayed => Cue::Delayed,
            TriageClass::Minor => Cue::Minor,
            TriageClass::Assess => Cue::Assess,
        }
    }
}

impl std::fmt::Display for TriageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TriageClass::Immediate => "Immediate",
            TriageClass::Delayed => "Delayed",
            TriageClass::Minor => "Minor",
            TriageClass::Assess => "Assess",
        };
        f.write_str(name)
    }
}

/// Triage class plus the ordered reasons that produced it.
///
/// `reasons` is never empty; payloads that violate this are rejected by
/// [`TriageVerdict::check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct TriageVerdict {
    pub class: TriageClass,
    #[validate(length(min = 1))]
    pub reasons: Vec<String>,
}

impl TriageVerdict {
    pub fn new(class: TriageClass, reasons: Vec<String>) -> Self {
        Self { class, reasons }
    }

    /// Verdict substituted for a failed poll.
    pub fn connection_error() -> Self {
        Self::new(
            TriageClass::Assess,
            vec![CONNECTION_ERROR_REASON.to_string()],
        )
    }

    /// Verdict shown before any poll has completed.
    pub fn initializing() -> Self {
        Self::new(TriageClass::Assess, vec![INITIALIZING_REASON.to_string()])
    }

    /// Enforce the non-empty `reasons` invariant on a received payload.
    pub fn check(&self) -> Result<(), CoreError> {
        self.validate()?;
        Ok(())
    }

    /// Reasons joined the way the banner renders them.
    pub fn reasons_line(&self) -> String {
        self.reasons.join(", ")
    }
}
