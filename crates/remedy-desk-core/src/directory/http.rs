//! HTTP implementation of the directory client.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{DeskConfig, DirectoryEndpoint};
use crate::models::{mask_phone, Patient, Visit};

use super::{
    decode_ack, decode_lookup, Ack, DirectoryClient, DirectoryError, DirectoryResult,
    PatientRecord, SavePatientRequest, SaveVisitRequest,
};

/// Longest error body kept in [`DirectoryError::Http`].
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Blocking HTTP client for the directory script endpoint.
pub struct HttpDirectoryClient {
    endpoint: Option<DirectoryEndpoint>,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl HttpDirectoryClient {
    /// Create a client. A missing endpoint is allowed; calls then fail with
    /// [`DirectoryError::ConfigurationMissing`] without touching the network.
    pub fn new(endpoint: Option<DirectoryEndpoint>, timeout_secs: u64) -> DirectoryResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DirectoryError::Connection(e.without_url().to_string()))?;

        Ok(Self {
            endpoint,
            client,
            timeout_secs,
        })
    }

    pub fn from_config(config: &DeskConfig) -> DirectoryResult<Self> {
        Self::new(config.directory_endpoint.clone(), config.request_timeout_secs)
    }

    fn endpoint(&self) -> DirectoryResult<&str> {
        self.endpoint
            .as_ref()
            .map(DirectoryEndpoint::expose)
            .ok_or(DirectoryError::ConfigurationMissing)
    }

    /// Map a transport error without leaking the endpoint URL.
    fn transport_error(&self, e: reqwest::Error) -> DirectoryError {
        if e.is_timeout() {
            DirectoryError::Connection(format!("request timed out after {}s", self.timeout_secs))
        } else {
            DirectoryError::Connection(e.without_url().to_string())
        }
    }

    /// Read a response body, turning non-2xx statuses into errors.
    fn read_body(&self, response: reqwest::blocking::Response) -> DirectoryResult<String> {
        let status = response.status();
        let body = response.text().map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            return Err(DirectoryError::Http {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        Ok(body)
    }

    fn post<T: Serialize>(&self, payload: &T) -> DirectoryResult<Ack> {
        let url = self.endpoint()?;
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .map_err(|e| self.transport_error(e))?;
        let body = self.read_body(response)?;
        decode_ack(&body)
    }
}

/// Error pages can be whole HTML documents; keep the start only.
fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

impl DirectoryClient for HttpDirectoryClient {
    fn find_patient(&self, phone: &str) -> DirectoryResult<Option<PatientRecord>> {
        let url = self.endpoint()?;
        debug!(phone = %mask_phone(phone), "Looking up patient");

        let response = self
            .client
            .get(url)
            .query(&[("action", "getPatient"), ("phone", phone)])
            .send()
            .map_err(|e| self.transport_error(e))?;
        let body = self.read_body(response)?;
        let record = decode_lookup(&body)?;

        debug!(
            found = record.is_some(),
            visits = record.as_ref().map_or(0, |r| r.history.len()),
            "Patient lookup complete"
        );
        Ok(record)
    }

    fn save_patient(&self, patient: &Patient) -> DirectoryResult<Ack> {
        let ack = self.post(&SavePatientRequest::new(patient))?;
        info!(phone = %patient.masked_phone(), "Patient saved");
        Ok(ack)
    }

    fn save_visit(&self, phone: &str, visit: &Visit) -> DirectoryResult<Ack> {
        let request = SaveVisitRequest::new(phone, visit);
        let ack = self.post(&request)?;
        info!(phone = %mask_phone(phone), request_id = %request.request_id, "Visit saved");
        Ok(ack)
    }
}
