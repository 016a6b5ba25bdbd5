//! The monitor controller: one task that owns every piece of mutable state.
//!
//! Timers, fetch completions and user commands all arrive as [`Event`]s on a
//! single channel and are handled one at a time, so the sampler, alarm and
//! protocol never observe each other mid-transition. After every event the
//! controller publishes a fresh [`MonitorSnapshot`] on a watch channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use triageq_core::insight::VitalInsight;
use triageq_core::profile::Profile;
use triageq_core::protocol::{ProtocolError, ProtocolMachine};
use triageq_core::triage::TriageVerdict;
use triageq_core::types::{FetchSeq, TimerGeneration};
use triageq_core::vitals::VitalLabel;

use crate::alarm::AlarmDriver;
use crate::api::{ApiError, VitalsReading};
use crate::audio::CuePlayer;
use crate::config::MonitorSettings;
use crate::protocol::ProtocolDriver;
use crate::sampler::{SampleOutcome, Sampler};
use crate::snapshot::MonitorSnapshot;
use crate::source::VitalsSource;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Monitor has shut down")]
    Closed,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Requests from a [`MonitorHandle`].
#[derive(Debug)]
pub(crate) enum Command {
    SetHold(bool),
    ToggleHold,
    Vot(oneshot::Sender<bool>),
    StartProtocol(oneshot::Sender<Result<(), ProtocolError>>),
    ResetProtocol,
    ChangeProfile(Profile),
    Inspect(VitalLabel, oneshot::Sender<Option<VitalInsight>>),
}

#[derive(Debug)]
pub(crate) enum Event {
    Command(Command),
    PollTick,
    Fetched {
        seq: FetchSeq,
        result: Result<VitalsReading, ApiError>,
    },
    AlarmAutoStop {
        generation: TimerGeneration,
    },
    StepElapsed {
        generation: TimerGeneration,
    },
}

/// Start the controller task and begin polling `source`.
///
/// Must be called from within a Tokio runtime. The protocol is left idle;
/// call [`MonitorHandle::start_protocol`] to begin an assessment.
pub fn spawn<S, P>(
    settings: MonitorSettings,
    source: S,
    player: P,
) -> Result<(MonitorHandle, JoinHandle<()>), MonitorError>
where
    S: VitalsSource,
    P: CuePlayer,
{
    let machine = ProtocolMachine::with_vot(settings.vot)?;
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(MonitorSnapshot::initial());
    let shutdown = CancellationToken::new();

    let monitor = Monitor {
        source: Arc::new(source),
        sampler: Sampler::new(
            settings.poll_interval,
            settings.drop_stale_responses,
            events_tx.clone(),
        ),
        alarm: AlarmDriver::new(settings.alarm_auto_stop, player, events_tx.clone()),
        protocol: ProtocolDriver::new(machine, events_tx.clone()),
        triage: TriageVerdict::initializing(),
        snapshot_tx,
        events_tx: events_tx.clone(),
        shutdown: shutdown.clone(),
    };

    tracing::info!(
        poll_interval_ms = settings.poll_interval.as_millis() as u64,
        auto_stop_secs = settings.alarm_auto_stop.as_secs(),
        drop_stale = settings.drop_stale_responses,
        "Monitor starting",
    );
    let join = tokio::spawn(monitor.run(events_rx));

    let handle = MonitorHandle {
        events: events_tx,
        snapshots: snapshot_rx,
        shutdown,
    };
    Ok((handle, join))
}

struct Monitor<S, P> {
    source: Arc<S>,
    sampler: Sampler,
    alarm: AlarmDriver<P>,
    protocol: ProtocolDriver,
    triage: TriageVerdict,
    snapshot_tx: watch::Sender<MonitorSnapshot>,
    events_tx: mpsc::UnboundedSender<Event>,
    shutdown: CancellationToken,
}

impl<S: VitalsSource, P: CuePlayer> Monitor<S, P> {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        self.sampler.start();
        self.publish();

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle(event);
                        self.publish();
                    }
                    None => break,
                },
            }
        }

        self.teardown();
        tracing::info!("Monitor stopped");
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::PollTick => self.poll(),
            Event::Fetched { seq, result } => match self.sampler.complete(seq, result) {
                SampleOutcome::Applied(verdict) | SampleOutcome::Failed(verdict) => {
                    self.apply_verdict(verdict);
                }
                SampleOutcome::Stale => {}
            },
            Event::AlarmAutoStop { generation } => self.alarm.on_auto_stop(generation),
            Event::StepElapsed { generation } => self.protocol.on_step_elapsed(generation),
            Event::Command(command) => self.command(command),
        }
    }

    fn command(&mut self, command: Command) {
        match command {
            Command::SetHold(held) => self.sampler.set_hold(held),
            Command::ToggleHold => {
                let held = !self.sampler.is_held();
                self.sampler.set_hold(held);
            }
            Command::Vot(reply) => {
                let accepted = self.vot();
                let _ = reply.send(accepted);
            }
            Command::StartProtocol(reply) => {
                let result = self.protocol.start();
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "Protocol start rejected");
                }
                let _ = reply.send(result);
            }
            Command::ResetProtocol => self.protocol.reset(),
            Command::ChangeProfile(profile) => {
                tracing::info!(%profile, "Simulation profile change requested");
                self.alarm.play_profile_cue();
                self.dispatch_profile_change(profile, Duration::ZERO);
            }
            Command::Inspect(label, reply) => {
                let _ = reply.send(VitalInsight::from_history(self.sampler.samples(), label));
            }
        }
    }

    fn poll(&mut self) {
        let Some(seq) = self.sampler.begin_fetch() else {
            return;
        };
        let source = Arc::clone(&self.source);
        let events = self.events_tx.clone();
        let token = self.shutdown.child_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                result = source.fetch_vitals() => {
                    let _ = events.send(Event::Fetched { seq, result });
                }
            }
        });
    }

    fn apply_verdict(&mut self, verdict: TriageVerdict) {
        if verdict.class != self.triage.class {
            tracing::info!(
                from = %self.triage.class,
                to = %verdict.class,
                reasons = %verdict.reasons_line(),
                "Triage class changed",
            );
        }
        self.alarm.observe(verdict.class);
        self.triage = verdict;
    }

    fn vot(&mut self) -> bool {
        let Some(plan) = self.protocol.vot() else {
            tracing::debug!("VOT ignored outside its protocol step");
            return false;
        };
        tracing::info!("VOT accepted");
        self.alarm.play_profile_cue();
        for request in plan.requests {
            self.dispatch_profile_change(request.profile, request.after);
        }
        true
    }

    /// Fire-and-forget `set_profile`, optionally delayed. Failures are logged
    /// and never retried.
    fn dispatch_profile_change(&self, profile: Profile, after: Duration) {
        let source = Arc::clone(&self.source);
        let token = self.shutdown.child_token();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(%profile, "Profile change abandoned on shutdown");
                }
                result = async {
                    tokio::time::sleep(after).await;
                    source.set_profile(profile).await
                } => match result {
                    Ok(()) => tracing::info!(%profile, "Simulation profile set"),
                    Err(e) => tracing::warn!(%profile, error = %e, "Failed to set simulation profile"),
                },
            }
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn snapshot(&self) -> MonitorSnapshot {
        let samples = self.sampler.samples();
        let latest = samples.latest().cloned();
        MonitorSnapshot {
            triage: self.triage.clone(),
            cards: latest.as_ref().map(|s| s.cards()).unwrap_or_default(),
            vitals: latest,
            waveform: self.sampler.waveform().to_vec(),
            sample_count: samples.len(),
            last_sample_at: self.sampler.last_sample_at(),
            held: self.sampler.is_held(),
            polling: self.sampler.is_polling(),
            alarm: self.alarm.state(),
            alarm_expires_at: self.alarm.expires_at(),
            protocol: self.protocol.snapshot(),
        }
    }

    fn teardown(&mut self) {
        self.shutdown.cancel();
        self.sampler.stop();
        self.protocol.stop();
        self.alarm.shutdown();
        self.publish();
    }
}

/// Cloneable front end to a running monitor.
#[derive(Clone)]
pub struct MonitorHandle {
    events: mpsc::UnboundedSender<Event>,
    snapshots: watch::Receiver<MonitorSnapshot>,
    shutdown: CancellationToken,
}

impl MonitorHandle {
    pub fn set_hold(&self, held: bool) -> Result<(), MonitorError> {
        self.send(Command::SetHold(held))
    }

    pub fn toggle_hold(&self) -> Result<(), MonitorError> {
        self.send(Command::ToggleHold)
    }

    /// Press the VOT control. Returns whether the current step accepted it.
    pub async fn vot(&self) -> Result<bool, MonitorError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Vot(tx))?;
        rx.await.map_err(|_| MonitorError::Closed)
    }

    pub async fn start_protocol(&self) -> Result<(), MonitorError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::StartProtocol(tx))?;
        rx.await.map_err(|_| MonitorError::Closed)??;
        Ok(())
    }

    pub fn reset_protocol(&self) -> Result<(), MonitorError> {
        self.send(Command::ResetProtocol)
    }

    pub fn change_profile(&self, profile: Profile) -> Result<(), MonitorError> {
        self.send(Command::ChangeProfile(profile))
    }

    /// Focus view data for one vital; `None` before the first sample.
    pub async fn inspect(&self, label: VitalLabel) -> Result<Option<VitalInsight>, MonitorError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Inspect(label, tx))?;
        rx.await.map_err(|_| MonitorError::Closed)
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.snapshots.clone()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> MonitorSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Stop the controller, all timers and all cues.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn send(&self, command: Command) -> Result<(), MonitorError> {
        self.events
            .send(Event::Command(command))
            .map_err(|_| MonitorError::Closed)
    }
}
