//! Audio cue identifiers and their asset files.

use serde::Serialize;

/// An audio alert. Four cues track the triage classes; `ProfileChange`
/// is sounded out-of-band on explicit user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cue {
    Immediate,
    Delayed,
    Minor,
    Assess,
    ProfileChange,
}

impl Cue {
    /// File name of the sound asset, relative to the configured sound directory.
    pub fn asset(self) -> &'static str {
        match self {
            Cue::Immediate => "alarm_immediate.wav",
            Cue::Delayed => "alarm_delayed.wav",
            Cue::Minor => "alarm_minor.wav",
            Cue::Assess => "alarm_assess.wav",
            Cue::ProfileChange => "profile_change.wav",
        }
    }
}

impl std::fmt::Display for Cue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Cue::Immediate => "immediate",
            Cue::Delayed => "delayed",
            Cue::Minor => "minor",
            Cue::Assess => "assess",
            Cue::ProfileChange => "profile_change",
        };
        f.write_str(name)
    }
}
