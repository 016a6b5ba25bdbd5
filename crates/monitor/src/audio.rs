//! Audio cue playback.
//!
//! [`CuePlayer`] is the seam between the alarm state machine and the
//! speaker. Playback failures are reported to the caller, which logs them;
//! they never change alarm state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};
use triageq_core::cue::Cue;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Failed to start audio player: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Sound asset not found: {}", .0.display())]
    MissingAsset(PathBuf),
}

/// Starts and stops cues. `stop` must be idempotent.
pub trait CuePlayer: Send + 'static {
    fn play(&mut self, cue: Cue) -> Result<(), AudioError>;

    /// Halt `cue` and rewind it. A cue that is not playing is ignored.
    fn stop(&mut self, cue: Cue);
}

/// Player for hosts without audio output: records cues in the log only.
#[derive(Debug, Default)]
pub struct SilentPlayer;

impl CuePlayer for SilentPlayer {
    fn play(&mut self, cue: Cue) -> Result<(), AudioError> {
        tracing::info!(%cue, "Cue (silent)");
        Ok(())
    }

    fn stop(&mut self, cue: Cue) {
        tracing::debug!(%cue, "Cue stopped (silent)");
    }
}

/// Plays each cue by spawning an external player on its sound asset,
/// e.g. `aplay -q <dir>/alarm_immediate.wav`.
///
/// Stopping a cue kills its child process, so the next play starts the
/// asset from the beginning.
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
    sound_dir: PathBuf,
    children: HashMap<Cue, Child>,
}

impl CommandPlayer {
    /// `command` is split on whitespace: the first word is the program,
    /// the rest are passed before the asset path.
    pub fn new(command: &str, sound_dir: impl Into<PathBuf>) -> Option<Self> {
        let mut words = command.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
            sound_dir: sound_dir.into(),
            children: HashMap::new(),
        })
    }

    fn asset_path(&self, cue: Cue) -> PathBuf {
        self.sound_dir.join(cue.asset())
    }
}

impl CuePlayer for CommandPlayer {
    fn play(&mut self, cue: Cue) -> Result<(), AudioError> {
        self.stop(cue);

        let path = self.asset_path(cue);
        if !path.is_file() {
            return Err(AudioError::MissingAsset(path));
        }

        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        tracing::debug!(%cue, path = %path.display(), "Cue playing");
        self.children.insert(cue, child);
        Ok(())
    }

    fn stop(&mut self, cue: Cue) {
        if let Some(mut child) = self.children.remove(&cue) {
            if let Err(e) = child.start_kill() {
                // Already exited on its own.
                tracing::trace!(%cue, error = %e, "Cue player already gone");
            }
        }
    }
}
