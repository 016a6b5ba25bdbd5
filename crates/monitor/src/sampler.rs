//! Timer-driven vitals sampler.
//!
//! The sampler owns the poll timer, the hold flag, and both history
//! buffers. It never awaits a fetch: the controller spawns one request per
//! tick and hands each completion back through [`Sampler::complete`], so
//! requests may overlap and finish out of order. Each request carries a
//! sequence number; with stale-dropping enabled, a completion older than
//! the last applied one is discarded.

use std::time::Duration;

use tokio::sync::mpsc;
use triageq_core::history::{HistoryBuffer, SAMPLE_CAPACITY, WAVEFORM_CAPACITY};
use triageq_core::triage::TriageVerdict;
use triageq_core::types::{FetchSeq, Timestamp};
use triageq_core::vitals::VitalsSample;

use crate::api::{ApiError, VitalsReading};
use crate::controller::Event;
use crate::timer::TimerSlot;

/// What a fetch completion amounted to.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SampleOutcome {
    /// Buffers updated; forward the server verdict.
    Applied(TriageVerdict),
    /// Buffers untouched; forward the fallback verdict.
    Failed(TriageVerdict),
    /// Superseded by a newer completion; ignore entirely.
    Stale,
}

pub(crate) struct Sampler {
    period: Duration,
    drop_stale: bool,
    held: bool,
    ticker: TimerSlot,
    events: mpsc::UnboundedSender<Event>,
    next_seq: FetchSeq,
    last_applied: Option<FetchSeq>,
    waveform: HistoryBuffer<f64>,
    samples: HistoryBuffer<VitalsSample>,
    last_sample_at: Option<Timestamp>,
}

impl Sampler {
    pub(crate) fn new(
        period: Duration,
        drop_stale: bool,
        events: mpsc::UnboundedSender<Event>,
    ) -> Self {
        Self {
            period,
            drop_stale,
            held: false,
            ticker: TimerSlot::new("poll"),
            events,
            next_seq: 0,
            last_applied: None,
            waveform: HistoryBuffer::new(WAVEFORM_CAPACITY),
            samples: HistoryBuffer::new(SAMPLE_CAPACITY),
            last_sample_at: None,
        }
    }

    /// Begin polling unless held.
    pub(crate) fn start(&mut self) {
        if !self.held {
            self.arm();
        }
    }

    pub(crate) fn is_held(&self) -> bool {
        self.held
    }

    pub(crate) fn is_polling(&self) -> bool {
        self.ticker.is_armed()
    }

    /// Pause or resume polling. Buffers are kept either way.
    pub(crate) fn set_hold(&mut self, held: bool) {
        if held == self.held {
            return;
        }
        self.held = held;
        if held {
            self.ticker.cancel();
            tracing::info!("Sampling held");
        } else {
            self.arm();
            tracing::info!(period_ms = self.period.as_millis() as u64, "Sampling resumed");
        }
    }

    /// Claim a sequence number for a new fetch; `None` while held.
    pub(crate) fn begin_fetch(&mut self) -> Option<FetchSeq> {
        if self.held {
            return None;
        }
        self.next_seq += 1;
        Some(self.next_seq)
    }

    pub(crate) fn complete(
        &mut self,
        seq: FetchSeq,
        result: Result<VitalsReading, ApiError>,
    ) -> SampleOutcome {
        if self.drop_stale && self.last_applied.is_some_and(|last| seq <= last) {
            tracing::debug!(seq, last_applied = ?self.last_applied, "Dropping stale vitals response");
            return SampleOutcome::Stale;
        }
        self.last_applied = Some(seq);

        match result {
            Ok(reading) => {
                self.waveform.push(reading.vitals.ppg_point);
                self.samples.push(reading.vitals);
                self.last_sample_at = Some(reading.received_at);
                SampleOutcome::Applied(reading.triage)
            }
            Err(e) => {
                tracing::warn!(seq, error = %e, "Vitals fetch failed");
                SampleOutcome::Failed(TriageVerdict::connection_error())
            }
        }
    }

    pub(crate) fn waveform(&self) -> &HistoryBuffer<f64> {
        &self.waveform
    }

    pub(crate) fn samples(&self) -> &HistoryBuffer<VitalsSample> {
        &self.samples
    }

    pub(crate) fn last_sample_at(&self) -> Option<Timestamp> {
        self.last_sample_at
    }

    pub(crate) fn stop(&mut self) {
        self.ticker.cancel();
    }

    fn arm(&mut self) {
        let events = self.events.clone();
        self.ticker
            .every(self.period, move || events.send(Event::PollTick).is_ok());
    }
}
