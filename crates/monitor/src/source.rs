//! The data-source seam between the monitor and the triage service.

use std::future::Future;

use triageq_core::profile::Profile;

use crate::api::{ApiError, VitalsReading};

/// Anything that can supply vitals and accept simulation profile changes.
///
/// [`TriageApi`](crate::api::TriageApi) is the production implementation.
/// Futures must be `Send` because every request runs on its own task.
pub trait VitalsSource: Send + Sync + 'static {
    fn fetch_vitals(&self) -> impl Future<Output = Result<VitalsReading, ApiError>> + Send;

    fn set_profile(&self, profile: Profile) -> impl Future<Output = Result<(), ApiError>> + Send;
}
