//! Remedy Desk Core Library
//!
//! Clinic front desk: patient lookup and registration against a remote
//! directory, visit recording, and prescription autocomplete over a synced
//! remedy spreadsheet.
//!
//! # Architecture
//!
//! ```text
//!   user intent
//!       │
//!       ▼
//!   FrontDesk::prepare ──(local)──────────────────────────────┐
//!       │                                                     │
//!       ▼ remote                                              │
//!   SessionState::begin  (at most one in flight per action)   │
//!       │                                                     │
//!       ├──► DirectoryClient ── GET/POST {endpoint} ──┐       │
//!       └──► CatalogSource   ── CSV sheet ────────────┤       │
//!                                                     ▼       ▼
//!                                               desk::finish → SessionState
//!                                                                 │
//!                                                                 ▼
//!                                                          view::render
//! ```
//!
//! # Core Principle
//!
//! **Session state is a snapshot.** Every transition returns a new
//! [`SessionState`]; nothing mutates it behind the caller's back.
//!
//! # Modules
//!
//! - [`config`]: Endpoint, sheet and reference configuration
//! - [`models`]: Domain types (Patient, Visit, RemedyEntry)
//! - [`directory`]: Remote patient directory client
//! - [`catalog`]: Remedy CSV loader
//! - [`matcher`]: Prescription autocomplete
//! - [`session`]: Session snapshot and transitions
//! - [`desk`]: Intent controller
//! - [`view`]: Screen composition

pub mod catalog;
pub mod config;
pub mod desk;
pub mod directory;
pub mod matcher;
pub mod models;
pub mod session;
pub mod view;

// Re-export commonly used types
pub use catalog::{load_catalog, CatalogSource, RemedyCatalog};
pub use config::{DeskConfig, DirectoryEndpoint};
pub use desk::{finish, FrontDesk, Intent, Notice, NoticeLevel, Step, Transition};
pub use directory::{DirectoryClient, HttpDirectoryClient, PatientRecord};
pub use matcher::{apply_selection, search, Suggestions};
pub use models::{Patient, PatientForm, RemedyEntry, Sex, Visit, VisitForm};
pub use session::{RemoteAction, SessionState};
pub use view::{render, Screen};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex, RwLock};

use chrono::NaiveDate;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FrontDeskError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<desk::DeskError> for FrontDeskError {
    fn from(e: desk::DeskError) -> Self {
        FrontDeskError::ConfigurationError(e.to_string())
    }
}

impl From<session::SessionError> for FrontDeskError {
    fn from(e: session::SessionError) -> Self {
        match e {
            session::SessionError::Busy(_) => FrontDeskError::Busy(e.to_string()),
            other => FrontDeskError::InvalidInput(other.to_string()),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for FrontDeskError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        FrontDeskError::InternalError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open a desk session with the given configuration.
#[uniffi::export]
pub fn open_front_desk(config: FfiDeskConfig) -> Result<Arc<FrontDeskCore>, FrontDeskError> {
    let desk = FrontDesk::from_config(config.into())?;
    Ok(Arc::new(FrontDeskCore::new(desk)))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe desk session for FFI.
///
/// The session lock is never held across a network call. A second call for
/// an action that is still in flight fails with [`FrontDeskError::Busy`].
/// Calls already in flight finish against the desk they started with.
#[derive(uniffi::Object)]
pub struct FrontDeskCore {
    desk: RwLock<Arc<FrontDesk>>,
    state: Mutex<SessionState>,
}

impl FrontDeskCore {
    /// Wrap an already-built desk (custom clients, tests).
    pub fn new(desk: FrontDesk) -> Self {
        Self {
            desk: RwLock::new(Arc::new(desk)),
            state: Mutex::new(SessionState::new()),
        }
    }

    fn desk(&self) -> Result<Arc<FrontDesk>, FrontDeskError> {
        Ok(Arc::clone(&*self.desk.read()?))
    }

    fn run<F>(&self, build: F) -> Result<FfiSnapshot, FrontDeskError>
    where
        F: FnOnce(&SessionState) -> Result<Intent, FrontDeskError>,
    {
        let desk = self.desk()?;
        let request = {
            let mut guard = self.state.lock()?;
            let intent = build(&*guard)?;
            let state = std::mem::take(&mut *guard);
            match desk.prepare(state, intent) {
                Step::Done(transition) => {
                    *guard = transition.state;
                    return Ok(FfiSnapshot::capture(&guard, transition.notice));
                }
                Step::Remote(state, request) => match state.begin(request.action()) {
                    Ok(begun) => {
                        *guard = begun;
                        request
                    }
                    Err(e) => {
                        *guard = state;
                        return Err(e.into());
                    }
                },
            }
        };
        let outcome = desk.execute(&request);

        let mut guard = self.state.lock()?;
        let current = std::mem::take(&mut *guard);
        let transition = desk::finish(current, outcome);
        *guard = transition.state;
        Ok(FfiSnapshot::capture(&guard, transition.notice))
    }
}

#[uniffi::export]
impl FrontDeskCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Look up a patient by phone number.
    pub fn search_patient(&self, phone: String) -> Result<FfiSnapshot, FrontDeskError> {
        self.run(|_| Ok(Intent::Search { phone }))
    }

    /// Register or update a patient.
    pub fn save_patient(&self, patient: FfiPatient) -> Result<FfiSnapshot, FrontDeskError> {
        self.run(|_| Ok(Intent::SavePatient(patient.into())))
    }

    /// Record a visit for the current patient.
    ///
    /// `date` is `YYYY-MM-DD` (today when absent). A missing prescription
    /// uses the current draft.
    pub fn complete_visit(&self, visit: FfiVisitForm) -> Result<FfiSnapshot, FrontDeskError> {
        self.run(|state| {
            let date = match visit.date.as_deref().map(str::trim) {
                Some(text) if !text.is_empty() => NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .map_err(|e| FrontDeskError::InvalidInput(format!("date {}: {}", text, e)))?,
                _ => chrono::Local::now().date_naive(),
            };
            let mut form = state.visit_form(date);
            form.set_symptoms(&visit.symptoms);
            form.diagnosis = visit.diagnosis;
            if let Some(prescription) = visit.prescription {
                form.prescription = prescription;
            }
            Ok(Intent::CompleteVisit(form))
        })
    }

    /// Copy a previous visit's prescription (1-based) into the draft.
    pub fn repeat_visit(&self, index: u32) -> Result<FfiSnapshot, FrontDeskError> {
        self.run(|_| Ok(Intent::RepeatVisit(index as usize)))
    }

    // =========================================================================
    // Remedy Operations
    // =========================================================================

    /// Reload the remedy catalog from the configured sheet.
    pub fn sync_remedies(&self) -> Result<FfiSnapshot, FrontDeskError> {
        self.run(|_| Ok(Intent::SyncRemedies))
    }

    /// Replace the draft prescription text.
    pub fn edit_prescription(&self, text: String) -> Result<FfiSnapshot, FrontDeskError> {
        self.run(|_| Ok(Intent::EditPrescription(text)))
    }

    /// Pick suggestion `index` (1-based) for the active token.
    pub fn select_remedy(&self, index: u32) -> Result<FfiSnapshot, FrontDeskError> {
        self.run(|_| Ok(Intent::SelectRemedy(index as usize)))
    }

    // =========================================================================
    // Session Operations
    // =========================================================================

    /// Set the directory endpoint entered by the operator. Blank clears it.
    /// The URL is held in memory only.
    pub fn set_directory_endpoint(&self, url: String) -> Result<FfiSnapshot, FrontDeskError> {
        let mut desk = FrontDesk::clone(&*self.desk()?);
        desk.set_directory_endpoint(&url)?;
        *self.desk.write()? = Arc::new(desk);
        self.snapshot()
    }

    /// Forget the current patient and draft.
    pub fn reset(&self) -> Result<FfiSnapshot, FrontDeskError> {
        self.run(|_| Ok(Intent::Reset))
    }

    /// Current state without changing it.
    pub fn snapshot(&self) -> Result<FfiSnapshot, FrontDeskError> {
        let guard = self.state.lock()?;
        Ok(FfiSnapshot::capture(&guard, None))
    }

    /// Text rendering of the current screen.
    pub fn render_text(&self) -> Result<String, FrontDeskError> {
        let desk = self.desk()?;
        let guard = self.state.lock()?;
        Ok(render(&guard, desk.config()).to_string())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe desk configuration. Absent fields take their defaults.
#[derive(Clone, Default, uniffi::Record)]
pub struct FfiDeskConfig {
    pub directory_endpoint: Option<String>,
    pub remedy_sheet_url: Option<String>,
    pub reference_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl From<FfiDeskConfig> for DeskConfig {
    fn from(config: FfiDeskConfig) -> Self {
        let defaults = DeskConfig::default();
        DeskConfig {
            directory_endpoint: config.directory_endpoint.and_then(DirectoryEndpoint::new),
            remedy_sheet_url: config.remedy_sheet_url.unwrap_or(defaults.remedy_sheet_url),
            reference_url: config.reference_url.unwrap_or(defaults.reference_url),
            request_timeout_secs: config
                .request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.request_timeout_secs),
        }
    }
}

/// FFI-safe patient.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub first_name: String,
    pub last_name: String,
    pub sex: String,
    pub city: String,
    pub phone: String,
}

impl From<Patient> for FfiPatient {
    fn from(patient: Patient) -> Self {
        Self {
            sex: patient.sex.as_str().to_string(),
            first_name: patient.first_name,
            last_name: patient.last_name,
            city: patient.city,
            phone: patient.phone,
        }
    }
}

impl From<FfiPatient> for PatientForm {
    fn from(patient: FfiPatient) -> Self {
        PatientForm {
            first_name: patient.first_name,
            last_name: patient.last_name,
            sex: Sex::parse(&patient.sex),
            city: patient.city,
            phone: patient.phone,
        }
    }
}

/// FFI-safe visit.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisit {
    pub date: String,
    pub symptoms: String,
    pub diagnosis: String,
    pub prescription: String,
}

impl From<Visit> for FfiVisit {
    fn from(visit: Visit) -> Self {
        Self {
            date: visit.date,
            symptoms: visit.symptoms,
            diagnosis: visit.diagnosis,
            prescription: visit.prescription,
        }
    }
}

/// FFI-safe consultation form.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiVisitForm {
    pub date: Option<String>,
    pub symptoms: String,
    pub diagnosis: String,
    pub prescription: Option<String>,
}

/// FFI-safe remedy suggestion.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRemedyHit {
    /// 1-based, as accepted by `select_remedy`
    pub index: u32,
    pub name: String,
    pub potency: String,
    pub box_number: String,
    pub available: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiNoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl From<NoticeLevel> for FfiNoticeLevel {
    fn from(level: NoticeLevel) -> Self {
        match level {
            NoticeLevel::Success => FfiNoticeLevel::Success,
            NoticeLevel::Info => FfiNoticeLevel::Info,
            NoticeLevel::Warning => FfiNoticeLevel::Warning,
            NoticeLevel::Error => FfiNoticeLevel::Error,
        }
    }
}

/// FFI-safe notice.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiNotice {
    pub level: FfiNoticeLevel,
    pub message: String,
}

impl From<Notice> for FfiNotice {
    fn from(notice: Notice) -> Self {
        Self {
            level: notice.level.into(),
            message: notice.message,
        }
    }
}

/// FFI-safe view of the session after an operation.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSnapshot {
    pub patient: Option<FfiPatient>,
    pub history: Vec<FfiVisit>,
    pub draft_prescription: String,
    pub suggestions: Vec<FfiRemedyHit>,
    /// Spelling hints when the active token matches nothing
    pub hints: Vec<String>,
    pub catalog_size: u32,
    pub pending: Vec<String>,
    pub notice: Option<FfiNotice>,
}

impl FfiSnapshot {
    fn capture(state: &SessionState, notice: Option<Notice>) -> Self {
        let (suggestions, hints) = match state.suggestions() {
            Suggestions::Hits(hits) => (
                hits.into_iter()
                    .enumerate()
                    .map(|(i, hit)| FfiRemedyHit {
                        index: (i + 1) as u32,
                        name: hit.entry.name.unwrap_or_default(),
                        potency: hit.entry.potency,
                        box_number: hit.entry.box_number,
                        available: hit.entry.available,
                    })
                    .collect(),
                Vec::new(),
            ),
            Suggestions::NoMatches { closest, .. } => (Vec::new(), closest),
            Suggestions::TypeToSearch => (Vec::new(), Vec::new()),
        };

        Self {
            patient: state.current_patient().cloned().map(Into::into),
            history: state.visit_history().iter().cloned().map(Into::into).collect(),
            draft_prescription: state.draft_prescription().to_string(),
            suggestions,
            hints,
            catalog_size: state.catalog().len() as u32,
            pending: state.pending().map(|a| a.to_string()).collect(),
            notice: notice.map(Into::into),
        }
    }
}
