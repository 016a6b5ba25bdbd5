//! HTTP client for the remote vitals/triage service.
//!
//! Wraps the two endpoints the monitor depends on using [`reqwest`]:
//! `GET /api/vitals` and `POST /api/set_profile`.

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use triageq_core::profile::{Profile, SetProfileRequest};
use triageq_core::triage::TriageVerdict;
use triageq_core::types::Timestamp;
use triageq_core::vitals::VitalsSample;

use crate::source::VitalsSource;

/// Body of a `GET /api/vitals` response.
#[derive(Debug, Clone, Deserialize)]
pub struct VitalsResponse {
    pub vitals: VitalsSample,
    pub triage: TriageVerdict,
    /// Server clock in seconds since the epoch. Informational only.
    #[serde(default)]
    pub timestamp: Option<f64>,
}

/// A validated sample/verdict pair, stamped on receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct VitalsReading {
    pub vitals: VitalsSample,
    pub triage: TriageVerdict,
    pub received_at: Timestamp,
}

impl VitalsReading {
    /// Check payload invariants and stamp the reading.
    pub fn from_response(response: VitalsResponse) -> Result<Self, ApiError> {
        response
            .triage
            .check()
            .map_err(|e| ApiError::Invalid(format!("triage: {e}")))?;
        response
            .vitals
            .check()
            .map_err(|e| ApiError::Invalid(format!("vitals: {e}")))?;
        Ok(Self {
            vitals: response.vitals,
            triage: response.triage,
            received_at: Utc::now(),
        })
    }
}

/// Errors from the data-source HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, timeout, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Triage API error ({status}): {body}")]
    Api {
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The body parsed but violates the payload contract.
    #[error("Invalid payload: {0}")]
    Invalid(String),
}

/// HTTP client for one triage service instance.
pub struct TriageApi {
    client: reqwest::Client,
    api_url: String,
}

impl TriageApi {
    /// Create a client for `api_url` (e.g. `http://127.0.0.1:5000`).
    ///
    /// Every request is bounded by `timeout`; an expired request surfaces
    /// as [`ApiError::Request`].
    pub fn new(api_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Fetch the latest sample and verdict.
    pub async fn fetch_vitals(&self) -> Result<VitalsReading, ApiError> {
        let response = self
            .client
            .get(format!("{}/api/vitals", self.api_url))
            .send()
            .await?;

        let body: VitalsResponse = Self::parse_response(response).await?;
        VitalsReading::from_response(body)
    }

    /// Switch the simulated patient profile. The response body is ignored.
    pub async fn set_profile(&self, profile: Profile) -> Result<(), ApiError> {
        let response = self
            .client
            .post(format!("{}/api/set_profile", self.api_url))
            .json(&SetProfileRequest { profile })
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, capturing the body
    /// text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

impl VitalsSource for TriageApi {
    async fn fetch_vitals(&self) -> Result<VitalsReading, ApiError> {
        TriageApi::fetch_vitals(self).await
    }

    async fn set_profile(&self, profile: Profile) -> Result<(), ApiError> {
        TriageApi::set_profile(self, profile).await
    }
}

#[cfg(test)]
mod tests {
    use triageq_core::triage::TriageClass;

    use super::*;

    fn response(json: &str) -> VitalsResponse {
        serde_json::from_str(json).expect("valid response json")
    }

    #[test]
    fn accepts_well_formed_response() {
        let body = response(
            r#"{
                "timestamp": 1718000000.5,
                "vitals": {"HR":78,"SpO2":98,"PI":2.5,"RR":16,"tau_us":70,"SignalTrust":98,"ppg_point":1.01},
                "triage": {"class":"Minor","reasons":["Stable vitals"]}
            }"#,
        );
        let reading = VitalsReading::from_response(body).unwrap();
        assert_eq!(reading.triage.class, TriageClass::Minor);
        assert_eq!(reading.vitals.ppg_point, 1.01);
    }

    #[test]
    fn rejects_empty_reasons() {
        let body = response(
            r#"{
                "vitals": {"HR":78,"SpO2":98,"PI":2.5,"RR":16,"tau_us":70,"SignalTrust":98,"ppg_point":1.0},
                "triage": {"class":"Minor","reasons":[]}
            }"#,
        );
        let err = VitalsReading::from_response(body).unwrap_err();
        assert!(matches!(err, ApiError::Invalid(msg) if msg.starts_with("triage")));
    }

    #[test]
    fn rejects_signal_trust_out_of_range() {
        let body = response(
            r#"{
                "vitals": {"HR":78,"SpO2":98,"PI":2.5,"RR":16,"tau_us":70,"SignalTrust":101,"ppg_point":1.0},
                "triage": {"class":"Minor","reasons":["Stable vitals"]}
            }"#,
        );
        assert!(matches!(
            VitalsReading::from_response(body),
            Err(ApiError::Invalid(_))
        ));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = TriageApi::with_client(reqwest::Client::new(), "http://127.0.0.1:5000/");
        assert_eq!(api.api_url(), "http://127.0.0.1:5000");
    }

    #[test]
    fn api_error_display() {
        let err = ApiError::Api {
            status: 503,
            body: "down".to_string(),
        };
        assert_eq!(err.to_string(), "Triage API error (503): down");
    }
}
