//! Front desk controller.
//!
//! Turns user intents into session transitions:
//!
//! ```text
//! Intent ──prepare──► local transition ─────────────────────────┐
//!           │                                                   ▼
//!           └──► Request ──begin──► execute (network) ──finish──► Transition
//! ```
//!
//! `prepare` and `finish` are pure; only `execute` talks to the outside world,
//! and it never holds session state. Every failure ends up as a [`Notice`];
//! nothing here is fatal to the session.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::catalog::{load_catalog, CatalogError, CatalogSource, DefaultCatalogSource, RemedyCatalog};
use crate::config::DeskConfig;
use crate::directory::{DirectoryClient, DirectoryError, HttpDirectoryClient, PatientRecord};
use crate::models::{mask_phone, Patient, PatientForm, Visit, VisitForm};
use crate::session::{RemoteAction, SessionError, SessionState};

/// Desk errors.
#[derive(Error, Debug)]
pub enum DeskError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("Error loading remedies: {0}")]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{0}")]
    InvalidInput(String),
}

pub type DeskResult<T> = Result<T, DeskError>;

/// What the user asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Search { phone: String },
    SavePatient(PatientForm),
    CompleteVisit(VisitForm),
    SyncRemedies,
    EditPrescription(String),
    /// 1-based index into the displayed suggestions
    SelectRemedy(usize),
    /// 1-based index into the displayed history
    RepeatVisit(usize),
    Reset,
}

/// A validated remote call.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Search { phone: String },
    SavePatient(Patient),
    SaveVisit { phone: String, visit: Visit },
    SyncRemedies { location: String },
}

impl Request {
    pub fn action(&self) -> RemoteAction {
        match self {
            Request::Search { .. } => RemoteAction::Search,
            Request::SavePatient(_) => RemoteAction::SavePatient,
            Request::SaveVisit { .. } => RemoteAction::CompleteVisit,
            Request::SyncRemedies { .. } => RemoteAction::SyncRemedies,
        }
    }
}

/// Result of executing a [`Request`].
#[derive(Debug)]
pub enum Outcome {
    PatientFound { query: String, record: PatientRecord },
    PatientNotFound { query: String },
    PatientSaved(Patient),
    VisitSaved { phone: String, visit: Visit },
    CatalogLoaded(RemedyCatalog),
    Failed { action: RemoteAction, error: DeskError },
}

impl Outcome {
    pub fn action(&self) -> RemoteAction {
        match self {
            Outcome::PatientFound { .. } | Outcome::PatientNotFound { .. } => RemoteAction::Search,
            Outcome::PatientSaved(_) => RemoteAction::SavePatient,
            Outcome::VisitSaved { .. } => RemoteAction::CompleteVisit,
            Outcome::CatalogLoaded(_) => RemoteAction::SyncRemedies,
            Outcome::Failed { action, .. } => *action,
        }
    }
}

/// Severity of a user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A user-facing message produced by a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// Map an error onto the notice the user sees.
    pub fn from_error(error: &DeskError) -> Self {
        match error {
            DeskError::Directory(DirectoryError::ConfigurationMissing) => Self::warning(
                "Directory endpoint is not configured. Enter it before searching or saving.",
            ),
            DeskError::Directory(DirectoryError::Connection(reason)) => {
                Self::error(format!("Connection error: {}", reason))
            }
            DeskError::Directory(e) if e.is_connection_error() => {
                Self::error(format!("Connection error: {}", e))
            }
            DeskError::Directory(_) | DeskError::Catalog(_) => Self::error(error.to_string()),
            DeskError::Session(_) | DeskError::InvalidInput(_) => Self::warning(error.to_string()),
        }
    }
}

/// New snapshot plus an optional message for the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: SessionState,
    pub notice: Option<Notice>,
}

impl Transition {
    pub fn quiet(state: SessionState) -> Self {
        Self { state, notice: None }
    }

    pub fn with_notice(state: SessionState, notice: Notice) -> Self {
        Self { state, notice: Some(notice) }
    }

    fn rejected(state: SessionState, error: impl Into<DeskError>) -> Self {
        Self::with_notice(state, Notice::from_error(&error.into()))
    }
}

/// Outcome of [`FrontDesk::prepare`].
#[derive(Debug)]
pub enum Step {
    /// Handled locally; nothing to send
    Done(Transition),
    /// Needs a remote call
    Remote(SessionState, Request),
}

/// The desk: configuration plus the two remote collaborators.
#[derive(Clone)]
pub struct FrontDesk {
    config: DeskConfig,
    directory: Arc<dyn DirectoryClient>,
    catalog_source: Arc<dyn CatalogSource>,
}

impl FrontDesk {
    pub fn new(
        config: DeskConfig,
        directory: Box<dyn DirectoryClient>,
        catalog_source: Box<dyn CatalogSource>,
    ) -> Self {
        Self {
            config,
            directory: Arc::from(directory),
            catalog_source: Arc::from(catalog_source),
        }
    }

    /// Desk backed by the HTTP directory client and the default catalog source.
    pub fn from_config(config: DeskConfig) -> DeskResult<Self> {
        let directory = HttpDirectoryClient::from_config(&config)?;
        let catalog_source = DefaultCatalogSource::new(config.request_timeout_secs)?;
        Ok(Self::new(config, Box::new(directory), Box::new(catalog_source)))
    }

    pub fn config(&self) -> &DeskConfig {
        &self.config
    }

    /// Point the desk at a new directory endpoint, entered by the operator
    /// mid-session. Blank input clears it. The directory client is rebuilt
    /// over HTTP; the catalog source is kept.
    pub fn set_directory_endpoint(&mut self, url: &str) -> DeskResult<()> {
        let config = self.config.clone().with_endpoint(url);
        let directory = HttpDirectoryClient::from_config(&config)?;
        info!(configured = config.is_directory_configured(), "Directory endpoint updated");
        self.config = config;
        self.directory = Arc::new(directory);
        Ok(())
    }

    /// Run one intent to completion.
    pub fn dispatch(&self, state: SessionState, intent: Intent) -> Transition {
        match self.prepare(state, intent) {
            Step::Done(transition) => transition,
            Step::Remote(state, request) => {
                let state = match state.begin(request.action()) {
                    Ok(next) => next,
                    Err(e) => return Transition::rejected(state, e),
                };
                let outcome = self.execute(&request);
                finish(state, outcome)
            }
        }
    }

    /// Validate an intent. Local intents are completed here.
    pub fn prepare(&self, state: SessionState, intent: Intent) -> Step {
        let request = match intent {
            Intent::EditPrescription(text) => {
                return Step::Done(Transition::quiet(state.prescription_edited(text)))
            }
            Intent::SelectRemedy(n) => {
                return Step::Done(match state.remedy_selected(n) {
                    Ok(next) => Transition::quiet(next),
                    Err(e) => Transition::rejected(state, e),
                })
            }
            Intent::RepeatVisit(n) => {
                return Step::Done(match state.visit_repeated(n) {
                    Ok(next) => Transition::quiet(next),
                    Err(e) => Transition::rejected(state, e),
                })
            }
            Intent::Reset => return Step::Done(Transition::quiet(state.reset())),
            Intent::Search { phone } => {
                let phone = phone.trim().to_string();
                if phone.is_empty() {
                    return Step::Done(Transition::rejected(
                        state,
                        DeskError::InvalidInput("Enter a phone number to search".into()),
                    ));
                }
                Request::Search { phone }
            }
            Intent::SavePatient(form) => match form.validate() {
                Ok(patient) => Request::SavePatient(patient),
                Err(missing) => {
                    return Step::Done(Transition::rejected(
                        state,
                        DeskError::InvalidInput(format!(
                            "Missing required fields: {}",
                            missing.join(", ")
                        )),
                    ))
                }
            },
            Intent::CompleteVisit(form) => {
                let Some(patient) = state.current_patient() else {
                    return Step::Done(Transition::rejected(state, SessionError::NoPatient));
                };
                Request::SaveVisit {
                    phone: patient.phone.clone(),
                    visit: form.into_visit(),
                }
            }
            Intent::SyncRemedies => Request::SyncRemedies {
                location: self.config.remedy_sheet_url.clone(),
            },
        };
        Step::Remote(state, request)
    }

    /// Perform the remote call. Holds no session state.
    pub fn execute(&self, request: &Request) -> Outcome {
        let action = request.action();
        let result = match request {
            Request::Search { phone } => self
                .directory
                .find_patient(phone)
                .map(|found| match found {
                    Some(record) => Outcome::PatientFound {
                        query: phone.clone(),
                        record,
                    },
                    None => Outcome::PatientNotFound {
                        query: phone.clone(),
                    },
                })
                .map_err(DeskError::from),
            Request::SavePatient(patient) => self
                .directory
                .save_patient(patient)
                .map(|_| Outcome::PatientSaved(patient.clone()))
                .map_err(DeskError::from),
            Request::SaveVisit { phone, visit } => self
                .directory
                .save_visit(phone, visit)
                .map(|_| Outcome::VisitSaved {
                    phone: phone.clone(),
                    visit: visit.clone(),
                })
                .map_err(DeskError::from),
            Request::SyncRemedies { location } => load_catalog(self.catalog_source.as_ref(), location)
                .map(Outcome::CatalogLoaded)
                .map_err(DeskError::from),
        };

        result.unwrap_or_else(|error| {
            warn!(action = ?action, error = %error, "Remote action failed");
            Outcome::Failed { action, error }
        })
    }
}

/// Fold an outcome into the snapshot that started it.
pub fn finish(state: SessionState, outcome: Outcome) -> Transition {
    let state = state.complete(outcome.action());

    match outcome {
        Outcome::PatientFound { query, record } => {
            let notice = Notice::success(format!(
                "Loaded {} ({} previous visits)",
                record.patient.display_name(),
                record.history.len()
            ));
            Transition::with_notice(state.patient_loaded(&query, record), notice)
        }
        Outcome::PatientNotFound { query } => {
            tracing::debug!(phone = %mask_phone(&query), "Patient not found");
            Transition::with_notice(
                state.patient_not_found(&query),
                Notice::info("Patient not found. Please register."),
            )
        }
        Outcome::PatientSaved(patient) => {
            let notice = Notice::success(format!("Patient {} saved", patient.display_name()));
            Transition::with_notice(state.patient_saved(patient), notice)
        }
        Outcome::VisitSaved { phone, visit } => Transition::with_notice(
            state.visit_recorded(&phone, visit),
            Notice::success("Visit saved!"),
        ),
        Outcome::CatalogLoaded(catalog) => {
            let unchanged = !state.catalog().fingerprint.is_empty()
                && state.catalog().fingerprint == catalog.fingerprint;
            let notice = Notice::success(format!(
                "Remedies synced! {} entries, {} available{}",
                catalog.len(),
                catalog.available_count(),
                if unchanged { " (unchanged)" } else { "" }
            ));
            Transition::with_notice(state.catalog_replaced(catalog), notice)
        }
        Outcome::Failed { error, .. } => Transition::with_notice(state, Notice::from_error(&error)),
    }
}
