//! Remote patient directory.
//!
//! The directory is a spreadsheet-backed script service. Every response is a
//! JSON envelope with a `status` discriminator:
//!
//! ```text
//! GET  {endpoint}?action=getPatient&phone=...  → {status, patient, history}
//! POST {endpoint} {action: "savePatient", ...} → {status, message}
//! POST {endpoint} {action: "saveVisit", ...}   → {status, message}
//! ```

mod http;

pub use http::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Patient, Visit};

/// Status value the directory uses for success.
pub const STATUS_SUCCESS: &str = "success";

/// Directory errors.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Directory endpoint is not configured")]
    ConfigurationMissing,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Directory returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed directory response: {0}")]
    MalformedResponse(String),

    #[error("Directory rejected the request: {0}")]
    Rejected(String),
}

impl DirectoryError {
    /// Network, HTTP and decoding failures all surface as connection errors.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DirectoryError::Connection(_)
                | DirectoryError::Http { .. }
                | DirectoryError::MalformedResponse(_)
        )
    }
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// A patient together with their visit history, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub patient: Patient,
    pub history: Vec<Visit>,
}

/// Acknowledgement of a successful save.
#[derive(Debug, Clone, PartialEq)]
pub struct Ack {
    /// Optional message from the directory
    pub message: Option<String>,
}

/// Access to the patient/visit system of record.
pub trait DirectoryClient: Send + Sync {
    /// Look up a patient by phone. `Ok(None)` means the directory has no match.
    fn find_patient(&self, phone: &str) -> DirectoryResult<Option<PatientRecord>>;

    /// Create or update a patient record.
    fn save_patient(&self, patient: &Patient) -> DirectoryResult<Ack>;

    /// Append a visit to the patient identified by `phone`.
    fn save_visit(&self, phone: &str, visit: &Visit) -> DirectoryResult<Ack>;
}

/// Raw response envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    status: Option<String>,
    #[serde(default)]
    patient: Option<Patient>,
    #[serde(default)]
    history: Option<Vec<Visit>>,
    #[serde(default)]
    message: Option<String>,
}

impl Envelope {
    fn parse(body: &str) -> DirectoryResult<Self> {
        serde_json::from_str(body).map_err(|e| DirectoryError::MalformedResponse(e.to_string()))
    }

    fn is_success(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(STATUS_SUCCESS))
    }
}

/// Decode a `getPatient` response body.
pub fn decode_lookup(body: &str) -> DirectoryResult<Option<PatientRecord>> {
    let envelope = Envelope::parse(body)?;
    if !envelope.is_success() {
        return Ok(None);
    }
    let patient = envelope.patient.ok_or_else(|| {
        DirectoryError::MalformedResponse("success response without a patient".into())
    })?;
    Ok(Some(PatientRecord {
        patient,
        history: envelope.history.unwrap_or_default(),
    }))
}

/// Decode a save response body.
pub fn decode_ack(body: &str) -> DirectoryResult<Ack> {
    let envelope = Envelope::parse(body)?;
    if envelope.is_success() {
        Ok(Ack {
            message: envelope.message,
        })
    } else {
        Err(DirectoryError::Rejected(envelope.message.unwrap_or_else(|| {
            format!(
                "status {}",
                envelope.status.as_deref().unwrap_or("missing")
            )
        })))
    }
}

/// POST body for `savePatient`.
#[derive(Debug, Serialize)]
pub struct SavePatientRequest<'a> {
    pub action: &'static str,
    pub patient: &'a Patient,
}

impl<'a> SavePatientRequest<'a> {
    pub fn new(patient: &'a Patient) -> Self {
        Self {
            action: "savePatient",
            patient,
        }
    }
}

/// POST body for `saveVisit`. `request_id` lets the directory drop replays.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveVisitRequest<'a> {
    pub action: &'static str,
    pub phone: &'a str,
    pub visit: &'a Visit,
    pub request_id: String,
}

impl<'a> SaveVisitRequest<'a> {
    pub fn new(phone: &'a str, visit: &'a Visit) -> Self {
        Self {
            action: "saveVisit",
            phone,
            visit,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_lookup_success() {
        let body = r#"{
            "status": "success",
            "patient": {"firstName":"Asha","lastName":"Rao","sex":"Female","city":"Pune","phone":"9876543210"},
            "history": [
                {"date":"2024-03-01","symptoms":"fever","diagnosis":"flu","prescription":"Aconite 6C"},
                {"date":"2024-01-15","symptoms":"cough","diagnosis":"","prescription":"Bryonia 30C"}
            ]
        }"#;

        let record = decode_lookup(body).unwrap().unwrap();
        assert_eq!(record.patient.first_name, "Asha");
        assert_eq!(record.history.len(), 2);
        assert_eq!(record.history[0].date, "2024-03-01");
        assert_eq!(record.history[1].date, "2024-01-15");
    }

    #[test]
    fn test_decode_lookup_not_found() {
        let record = decode_lookup(r#"{"status":"not_found"}"#).unwrap();
        assert!(record.is_none());

        let record = decode_lookup(r#"{"status":"error","message":"no rows"}"#).unwrap();
        assert!(record.is_none());
    }

    #[test]
    fn test_decode_lookup_without_history() {
        let body = r#"{"status":"success","patient":{"firstName":"Asha","phone":"1"}}"#;
        let record = decode_lookup(body).unwrap().unwrap();
        assert!(record.history.is_empty());
    }

    #[test]
    fn test_decode_lookup_malformed() {
        let err = decode_lookup("<html>Sign in</html>").unwrap_err();
        assert!(matches!(err, DirectoryError::MalformedResponse(_)));
        assert!(err.is_connection_error());

        let err = decode_lookup(r#"{"status":"success"}"#).unwrap_err();
        assert!(matches!(err, DirectoryError::MalformedResponse(_)));
    }

    #[test]
    fn test_decode_ack() {
        let ack = decode_ack(r#"{"status":"success","message":"saved"}"#).unwrap();
        assert_eq!(ack.message.as_deref(), Some("saved"));

        let err = decode_ack(r#"{"status":"error","message":"duplicate phone"}"#).unwrap_err();
        assert!(matches!(err, DirectoryError::Rejected(ref m) if m == "duplicate phone"));
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_save_visit_request_shape() {
        let visit = Visit {
            date: "2024-03-01".into(),
            symptoms: "fever".into(),
            diagnosis: "flu".into(),
            prescription: "Aconite 6C".into(),
        };
        let json = serde_json::to_value(SaveVisitRequest::new("555", &visit)).unwrap();
        assert_eq!(json["action"], "saveVisit");
        assert_eq!(json["phone"], "555");
        assert_eq!(json["visit"]["prescription"], "Aconite 6C");
        assert_eq!(json["requestId"].as_str().unwrap().len(), 36);
    }

    #[test]
    fn test_save_patient_request_shape() {
        let patient = Patient {
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            sex: crate::models::Sex::Female,
            city: "Pune".into(),
            phone: "5551234".into(),
        };
        let json = serde_json::to_value(SavePatientRequest::new(&patient)).unwrap();
        assert_eq!(json["action"], "savePatient");
        assert_eq!(json["patient"]["firstName"], "Asha");
        assert_eq!(json["patient"]["lastName"], "Rao");
        assert_eq!(json["patient"]["phone"], "5551234");
        assert!(json["patient"].get("first_name").is_none());
    }
}
