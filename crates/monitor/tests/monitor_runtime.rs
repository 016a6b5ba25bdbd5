//! End-to-end tests of the controller against a scripted vitals source and a
//! recording cue player, on paused Tokio time.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use triageq_core::cue::Cue;
use triageq_core::profile::Profile;
use triageq_core::protocol::{ProtocolError, ProtocolPhase};
use triageq_core::triage::{TriageClass, TriageVerdict};
use triageq_core::vitals::{VitalLabel, VitalsSample};
use triageq_monitor::api::{ApiError, VitalsReading};
use triageq_monitor::audio::{AudioError, CuePlayer};
use triageq_monitor::config::MonitorSettings;
use triageq_monitor::controller::{self, MonitorError, MonitorHandle};
use triageq_monitor::source::VitalsSource;

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SourceState {
    /// `None` makes every fetch fail.
    respond_with: Option<TriageClass>,
    /// Every `set_profile` call is recorded, then rejected.
    reject_profiles: bool,
    fetches: usize,
    ppg: f64,
    profile_calls: Vec<(Profile, Instant)>,
}

#[derive(Clone, Default)]
struct ScriptedSource(Arc<Mutex<SourceState>>);

impl ScriptedSource {
    fn responding(class: TriageClass) -> Self {
        let source = Self::default();
        source.respond_with(Some(class));
        source
    }

    fn failing() -> Self {
        Self::default()
    }

    fn reject_profiles(&self) {
        self.0.lock().unwrap().reject_profiles = true;
    }

    fn respond_with(&self, class: Option<TriageClass>) {
        self.0.lock().unwrap().respond_with = class;
    }

    fn fetches(&self) -> usize {
        self.0.lock().unwrap().fetches
    }

    fn profile_calls(&self) -> Vec<(Profile, Instant)> {
        self.0.lock().unwrap().profile_calls.clone()
    }
}

impl VitalsSource for ScriptedSource {
    async fn fetch_vitals(&self) -> Result<VitalsReading, ApiError> {
        let mut state = self.0.lock().unwrap();
        state.fetches += 1;
        state.ppg += 1.0;
        match state.respond_with {
            Some(class) => Ok(VitalsReading {
                vitals: VitalsSample {
                    hr: 130.0,
                    spo2: 97.0,
                    pi: 2.0,
                    rr: 18.0,
                    tau_us: 80.0,
                    signal_trust: 95.0,
                    ppg_point: state.ppg,
                },
                triage: TriageVerdict::new(class, vec!["Scripted".to_string()]),
                received_at: Utc::now(),
            }),
            None => Err(ApiError::Api {
                status: 503,
                body: "unavailable".to_string(),
            }),
        }
    }

    async fn set_profile(&self, profile: Profile) -> Result<(), ApiError> {
        let mut state = self.0.lock().unwrap();
        state.profile_calls.push((profile, Instant::now()));
        if state.reject_profiles {
            return Err(ApiError::Api {
                status: 500,
                body: "simulator busy".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlayerCall {
    Play(Cue),
    Stop(Cue),
}

#[derive(Clone, Default)]
struct RecordingPlayer {
    calls: Arc<Mutex<Vec<PlayerCall>>>,
    /// Record each play, then report the asset as missing.
    broken: bool,
}

impl RecordingPlayer {
    fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn plays(&self, cue: Cue) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == PlayerCall::Play(cue))
            .count()
    }
}

impl CuePlayer for RecordingPlayer {
    fn play(&mut self, cue: Cue) -> Result<(), AudioError> {
        self.calls.lock().unwrap().push(PlayerCall::Play(cue));
        if self.broken {
            return Err(AudioError::MissingAsset(PathBuf::from(cue.asset())));
        }
        Ok(())
    }

    fn stop(&mut self, cue: Cue) {
        self.calls.lock().unwrap().push(PlayerCall::Stop(cue));
    }
}

fn start(source: &ScriptedSource, player: &RecordingPlayer) -> (MonitorHandle, JoinHandle<()>) {
    controller::spawn(MonitorSettings::default(), source.clone(), player.clone()).unwrap()
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ---------------------------------------------------------------------------
// Sampling
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn fetch_failure_shows_connection_error_without_buffering() {
    let source = ScriptedSource::failing();
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    advance(250).await;

    let snap = handle.snapshot();
    assert!(source.fetches() >= 1);
    assert_eq!(snap.triage, TriageVerdict::connection_error());
    assert_eq!(snap.sample_count, 0);
    assert!(snap.waveform.is_empty());
    assert!(snap.vitals.is_none());
    assert_eq!(snap.alarm.active_class, Some(TriageClass::Assess));
    assert_eq!(player.plays(Cue::Assess), 1);
}

#[tokio::test(start_paused = true)]
async fn each_poll_appends_one_sample() {
    let source = ScriptedSource::responding(TriageClass::Minor);
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    assert_eq!(handle.snapshot().triage, TriageVerdict::initializing());

    advance(650).await;

    let snap = handle.snapshot();
    assert_eq!(source.fetches(), 3);
    assert_eq!(snap.sample_count, 3);
    assert_eq!(snap.waveform, vec![1.0, 2.0, 3.0]);
    assert_eq!(snap.cards.len(), 6);
    assert_eq!(snap.triage.class, TriageClass::Minor);
    assert!(snap.last_sample_at.is_some());
    assert_eq!(player.plays(Cue::Minor), 1);
}

#[tokio::test(start_paused = true)]
async fn hold_stops_fetching_and_resume_keeps_history() {
    let source = ScriptedSource::responding(TriageClass::Minor);
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    advance(450).await;
    handle.set_hold(true).unwrap();
    advance(1).await;
    let fetched = source.fetches();
    assert_eq!(fetched, 2);

    advance(2_000).await;
    let snap = handle.snapshot();
    assert_eq!(source.fetches(), fetched);
    assert!(snap.held);
    assert!(!snap.polling);
    assert_eq!(snap.sample_count, 2);

    handle.toggle_hold().unwrap();
    advance(250).await;
    let snap = handle.snapshot();
    assert!(!snap.held);
    assert!(snap.polling);
    assert_eq!(source.fetches(), fetched + 1);
    assert_eq!(snap.sample_count, 3);
}

// ---------------------------------------------------------------------------
// Alarms
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn alarm_auto_stops_after_thirty_seconds() {
    let source = ScriptedSource::responding(TriageClass::Delayed);
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    advance(250).await;
    let snap = handle.snapshot();
    assert_eq!(snap.alarm.active_class, Some(TriageClass::Delayed));
    assert!(snap.alarm_expires_at.is_some());

    // First sample landed at 200 ms; deadline is 30.2 s.
    advance(29_900).await;
    assert_eq!(handle.snapshot().alarm.active_class, Some(TriageClass::Delayed));

    advance(200).await;
    let snap = handle.snapshot();
    assert!(snap.alarm.is_idle());
    assert!(snap.alarm_expires_at.is_none());
    assert_eq!(player.calls().last(), Some(&PlayerCall::Stop(Cue::Delayed)));

    // Same class keeps arriving; it must not re-trigger.
    advance(5_000).await;
    assert_eq!(player.plays(Cue::Delayed), 1);
}

#[tokio::test(start_paused = true)]
async fn escalation_stops_previous_cue_first() {
    let source = ScriptedSource::responding(TriageClass::Minor);
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    advance(250).await;
    source.respond_with(Some(TriageClass::Immediate));
    advance(200).await;

    assert_eq!(
        player.calls(),
        vec![
            PlayerCall::Play(Cue::Minor),
            PlayerCall::Stop(Cue::Minor),
            PlayerCall::Play(Cue::Immediate),
        ]
    );
    assert_eq!(handle.snapshot().alarm.active_class, Some(TriageClass::Immediate));

    // The superseded deadline must not silence the new alarm early.
    advance(29_900).await;
    assert_eq!(handle.snapshot().alarm.active_class, Some(TriageClass::Immediate));
}

#[tokio::test(start_paused = true)]
async fn failed_playback_still_counts_as_active_and_auto_stops() {
    let source = ScriptedSource::responding(TriageClass::Immediate);
    let player = RecordingPlayer::broken();
    let (handle, _join) = start(&source, &player);

    advance(250).await;
    let snap = handle.snapshot();
    assert_eq!(snap.alarm.active_class, Some(TriageClass::Immediate));
    assert!(snap.alarm_expires_at.is_some());
    assert_eq!(player.plays(Cue::Immediate), 1);

    // First sample landed at 200 ms; deadline is 30.2 s.
    advance(29_900).await;
    assert_eq!(handle.snapshot().alarm.active_class, Some(TriageClass::Immediate));

    advance(200).await;
    assert!(handle.snapshot().alarm.is_idle());
    assert_eq!(player.calls().last(), Some(&PlayerCall::Stop(Cue::Immediate)));
    assert_eq!(player.plays(Cue::Immediate), 1);
}

// ---------------------------------------------------------------------------
// Assessment protocol
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn protocol_advances_on_step_durations() {
    let source = ScriptedSource::responding(TriageClass::Minor);
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    assert_eq!(handle.snapshot().protocol.phase, ProtocolPhase::Idle);
    handle.start_protocol().await.unwrap();
    let snap = handle.snapshot();
    assert_eq!(snap.protocol.phase, ProtocolPhase::Running(0));
    assert_eq!(snap.protocol.step_number, 1);
    assert_eq!(snap.protocol.total_steps, 4);

    advance(5_050).await;
    assert_eq!(handle.snapshot().protocol.phase, ProtocolPhase::Running(1));
    advance(10_000).await;
    assert_eq!(handle.snapshot().protocol.phase, ProtocolPhase::Running(2));
    advance(5_000).await;
    assert_eq!(handle.snapshot().protocol.phase, ProtocolPhase::Running(3));
    advance(10_000).await;

    let snap = handle.snapshot();
    assert_eq!(snap.protocol.phase, ProtocolPhase::Complete);
    assert!(!snap.protocol.running);
    assert_eq!(snap.protocol.progress_percent, 100.0);
}

#[tokio::test(start_paused = true)]
async fn start_while_running_is_rejected() {
    let source = ScriptedSource::responding(TriageClass::Minor);
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    handle.start_protocol().await.unwrap();
    assert_matches!(
        handle.start_protocol().await,
        Err(MonitorError::Protocol(ProtocolError::AlreadyRunning { step: 0 }))
    );
}

#[tokio::test(start_paused = true)]
async fn reset_then_restart_ignores_previous_timer() {
    let source = ScriptedSource::responding(TriageClass::Minor);
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    handle.start_protocol().await.unwrap();
    advance(7_000).await;
    assert_eq!(handle.snapshot().protocol.phase, ProtocolPhase::Running(1));

    handle.reset_protocol().unwrap();
    advance(1).await;
    let snap = handle.snapshot();
    assert_eq!(snap.protocol.phase, ProtocolPhase::Idle);
    assert_eq!(snap.protocol.message, "Ready");

    handle.start_protocol().await.unwrap();
    advance(4_900).await;
    assert_eq!(handle.snapshot().protocol.phase, ProtocolPhase::Running(0));
    advance(200).await;
    assert_eq!(handle.snapshot().protocol.phase, ProtocolPhase::Running(1));

    // The first run's step-2 timer was due at 15 s.
    advance(3_000).await;
    assert_eq!(handle.snapshot().protocol.phase, ProtocolPhase::Running(1));
}

#[tokio::test(start_paused = true)]
async fn vot_is_ignored_outside_the_occlusion_step() {
    let source = ScriptedSource::responding(TriageClass::Minor);
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    assert!(!handle.vot().await.unwrap());

    handle.start_protocol().await.unwrap();
    assert!(!handle.vot().await.unwrap());
    advance(6_000).await;
    assert!(!handle.vot().await.unwrap());
    advance(15_000).await;
    assert_eq!(handle.snapshot().protocol.phase, ProtocolPhase::Running(3));
    assert!(!handle.vot().await.unwrap());

    advance(10_000).await;
    assert!(!handle.vot().await.unwrap());
    assert!(source.profile_calls().is_empty());
    assert_eq!(player.plays(Cue::ProfileChange), 0);
}

#[tokio::test(start_paused = true)]
async fn vot_requests_occlusion_then_recovery() {
    let source = ScriptedSource::responding(TriageClass::Minor);
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    handle.start_protocol().await.unwrap();
    advance(16_000).await;
    let snap = handle.snapshot();
    assert_eq!(snap.protocol.phase, ProtocolPhase::Running(2));
    assert!(snap.protocol.vot_available);

    let pressed_at = Instant::now();
    assert!(handle.vot().await.unwrap());
    advance(1).await;
    assert_eq!(player.plays(Cue::ProfileChange), 1);
    assert!(handle.snapshot().alarm.profile_cue_active);

    let calls = source.profile_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, Profile::VotOcclusion);
    assert!(calls[0].1 - pressed_at < Duration::from_millis(10));

    advance(5_100).await;
    let calls = source.profile_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].0, Profile::Stable);
    let gap = calls[1].1 - calls[0].1;
    assert!(gap >= Duration::from_secs(5));
    assert!(gap < Duration::from_secs(5) + Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn rejected_occlusion_request_keeps_recovery_scheduled() {
    let source = ScriptedSource::responding(TriageClass::Minor);
    source.reject_profiles();
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    handle.start_protocol().await.unwrap();
    advance(16_000).await;
    let before = handle.snapshot();
    assert_eq!(before.protocol.phase, ProtocolPhase::Running(2));

    assert!(handle.vot().await.unwrap());
    advance(1).await;
    let calls = source.profile_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, Profile::VotOcclusion);

    let after = handle.snapshot();
    assert_eq!(after.triage, before.triage);
    assert_eq!(after.alarm.active_class, before.alarm.active_class);
    assert_eq!(after.protocol.phase, ProtocolPhase::Running(2));

    advance(5_100).await;
    let calls = source.profile_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].0, Profile::Stable);
    assert!(calls[1].1 - calls[0].1 >= Duration::from_secs(5));

    // Failures are not retried, and the protocol keeps its own schedule.
    advance(3_000).await;
    assert_eq!(source.profile_calls().len(), 2);
    let snap = handle.snapshot();
    assert_eq!(snap.protocol.phase, ProtocolPhase::Running(3));
    assert_eq!(snap.triage, before.triage);
    assert_eq!(snap.alarm.active_class, Some(TriageClass::Minor));
}

#[tokio::test(start_paused = true)]
async fn rejected_profile_change_leaves_state_alone() {
    let source = ScriptedSource::responding(TriageClass::Minor);
    source.reject_profiles();
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    advance(250).await;
    let before = handle.snapshot();

    handle.change_profile(Profile::Shock).unwrap();
    advance(1_000).await;

    assert_eq!(source.profile_calls().len(), 1);
    let snap = handle.snapshot();
    assert_eq!(snap.triage, before.triage);
    assert_eq!(snap.alarm.active_class, before.alarm.active_class);
    assert_eq!(snap.protocol.phase, before.protocol.phase);
    assert!(snap.polling);
}

// ---------------------------------------------------------------------------
// Controls
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn change_profile_plays_cue_and_posts() {
    let source = ScriptedSource::responding(TriageClass::Minor);
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    handle.change_profile(Profile::Shock).unwrap();
    advance(1).await;

    assert_eq!(player.plays(Cue::ProfileChange), 1);
    let calls = source.profile_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, Profile::Shock);

    // A triage cue starting silences the profile cue.
    advance(250).await;
    assert!(player.calls().contains(&PlayerCall::Stop(Cue::ProfileChange)));
    assert!(!handle.snapshot().alarm.profile_cue_active);
}

#[tokio::test(start_paused = true)]
async fn inspect_reports_trend_from_history() {
    let source = ScriptedSource::responding(TriageClass::Immediate);
    let player = RecordingPlayer::default();
    let (handle, _join) = start(&source, &player);

    assert!(handle.inspect(VitalLabel::Hr).await.unwrap().is_none());

    advance(650).await;
    let insight = handle.inspect(VitalLabel::Hr).await.unwrap().unwrap();
    assert_eq!(insight.current_value, 130.0);
    assert_eq!(insight.history, vec![130.0, 130.0, 130.0]);
    assert_eq!(insight.status.as_str(), "critical");
    assert_eq!(insight.unit, "bpm");
    assert!(insight.interpretation.contains("achycardia"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_cues_and_closes_handle() {
    let source = ScriptedSource::responding(TriageClass::Immediate);
    let player = RecordingPlayer::default();
    let (handle, join) = start(&source, &player);

    advance(250).await;
    handle.shutdown();
    join.await.unwrap();

    assert_eq!(player.calls().last(), Some(&PlayerCall::Stop(Cue::Immediate)));
    assert!(handle.snapshot().alarm.is_idle());

    let fetched = source.fetches();
    advance(1_000).await;
    assert_eq!(source.fetches(), fetched);
    assert_matches!(handle.set_hold(true), Err(MonitorError::Closed));
}
