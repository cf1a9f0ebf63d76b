//! Session state and its transitions.
//!
//! A [`SessionState`] is a snapshot. Transitions produce a new snapshot rather
//! than mutating in place; infallible ones consume `self`, fallible ones borrow
//! it so a rejected transition leaves the caller's snapshot untouched. The
//! remedy catalog sits behind an `Arc`, so snapshots are cheap to clone.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;

use crate::catalog::RemedyCatalog;
use crate::directory::PatientRecord;
use crate::matcher::{self, MatchError, Suggestions};
use crate::models::{Patient, PatientForm, Visit, VisitForm};

/// Actions that go over the network. At most one of each may be in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RemoteAction {
    Search,
    SavePatient,
    CompleteVisit,
    SyncRemedies,
}

impl fmt::Display for RemoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RemoteAction::Search => "Patient search",
            RemoteAction::SavePatient => "Saving patient",
            RemoteAction::CompleteVisit => "Saving visit",
            RemoteAction::SyncRemedies => "Remedy sync",
        })
    }
}

/// Session errors.
#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("{0} is already in progress")]
    Busy(RemoteAction),

    #[error("Please search or register a patient first")]
    NoPatient,

    #[error("No remedy suggestion #{0}")]
    UnknownSuggestion(usize),

    #[error("No visit #{0} in history")]
    UnknownVisit(usize),

    #[error(transparent)]
    Match(#[from] MatchError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Everything the desk knows during one user session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    current_patient: Option<Patient>,
    /// Newest first, exactly as provided by the directory
    visit_history: Vec<Visit>,
    catalog: Arc<RemedyCatalog>,
    draft_prescription: String,
    last_search: Option<String>,
    pending: BTreeSet<RemoteAction>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn current_patient(&self) -> Option<&Patient> {
        self.current_patient.as_ref()
    }

    pub fn visit_history(&self) -> &[Visit] {
        &self.visit_history
    }

    pub fn catalog(&self) -> &RemedyCatalog {
        &self.catalog
    }

    pub fn draft_prescription(&self) -> &str {
        &self.draft_prescription
    }

    pub fn last_search(&self) -> Option<&str> {
        self.last_search.as_deref()
    }

    pub fn is_pending(&self, action: RemoteAction) -> bool {
        self.pending.contains(&action)
    }

    pub fn pending(&self) -> impl Iterator<Item = RemoteAction> + '_ {
        self.pending.iter().copied()
    }

    /// History is only ever held alongside the patient it belongs to.
    pub fn is_consistent(&self) -> bool {
        self.visit_history.is_empty() || self.current_patient.is_some()
    }

    /// Autocomplete suggestions for the current draft.
    pub fn suggestions(&self) -> Suggestions {
        matcher::search(&self.draft_prescription, &self.catalog)
    }

    /// Registration form prefilled from the current patient, else the last searched phone.
    pub fn registration_form(&self) -> PatientForm {
        match (&self.current_patient, &self.last_search) {
            (Some(patient), _) => PatientForm::from_patient(patient),
            (None, Some(phone)) => PatientForm::with_phone(phone),
            (None, None) => PatientForm::default(),
        }
    }

    /// Consultation form for `date`, carrying the draft prescription.
    pub fn visit_form(&self, date: NaiveDate) -> VisitForm {
        VisitForm {
            prescription: self.draft_prescription.clone(),
            ..VisitForm::new(date)
        }
    }

    // =========================================================================
    // Remote action bracketing
    // =========================================================================

    /// Mark `action` as in flight. Refused if it already is.
    pub fn begin(&self, action: RemoteAction) -> SessionResult<Self> {
        if self.pending.contains(&action) {
            return Err(SessionError::Busy(action));
        }
        let mut next = self.clone();
        next.pending.insert(action);
        Ok(next)
    }

    /// Clear the in-flight marker for `action`.
    pub fn complete(mut self, action: RemoteAction) -> Self {
        self.pending.remove(&action);
        self
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// A search by `query` found a patient. Replaces patient, history and draft.
    pub fn patient_loaded(mut self, query: &str, record: PatientRecord) -> Self {
        self.last_search = Some(query.trim().to_string());
        self.current_patient = Some(record.patient);
        self.visit_history = record.history;
        self.draft_prescription.clear();
        self
    }

    /// A search by `query` found nothing. Clears patient, history and draft.
    pub fn patient_not_found(mut self, query: &str) -> Self {
        self.last_search = Some(query.trim().to_string());
        self.current_patient = None;
        self.visit_history.clear();
        self.draft_prescription.clear();
        self
    }

    /// A patient record was saved. History is kept only if it is the same patient.
    pub fn patient_saved(mut self, patient: Patient) -> Self {
        let same_patient = self
            .current_patient
            .as_ref()
            .is_some_and(|p| p.phone == patient.phone);
        if !same_patient {
            self.visit_history.clear();
            self.draft_prescription.clear();
        }
        self.current_patient = Some(patient);
        self
    }

    /// A visit for `phone` was saved. Added to history, newest first, if that
    /// patient is still current; the draft prescription is then cleared.
    pub fn visit_recorded(mut self, phone: &str, visit: Visit) -> Self {
        let is_current = self
            .current_patient
            .as_ref()
            .is_some_and(|p| p.phone == phone);
        if is_current {
            let position = history_position(&self.visit_history, &visit);
            self.visit_history.insert(position, visit);
            self.draft_prescription.clear();
        }
        self
    }

    /// Swap in a freshly loaded catalog.
    pub fn catalog_replaced(mut self, catalog: RemedyCatalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    /// The prescription text changed.
    pub fn prescription_edited(mut self, text: impl Into<String>) -> Self {
        self.draft_prescription = text.into();
        self
    }

    /// Pick suggestion `n` (1-based, as displayed) for the active token.
    pub fn remedy_selected(&self, n: usize) -> SessionResult<Self> {
        let suggestions = self.suggestions();
        let hit = n
            .checked_sub(1)
            .and_then(|i| suggestions.hits().get(i))
            .ok_or(SessionError::UnknownSuggestion(n))?;

        let draft = matcher::apply_selection(&self.draft_prescription, &hit.entry)?;
        Ok(self.clone().prescription_edited(draft))
    }

    /// Copy the prescription of history entry `n` (1-based) into the draft.
    pub fn visit_repeated(&self, n: usize) -> SessionResult<Self> {
        if self.current_patient.is_none() {
            return Err(SessionError::NoPatient);
        }
        let visit = n
            .checked_sub(1)
            .and_then(|i| self.visit_history.get(i))
            .ok_or(SessionError::UnknownVisit(n))?;
        Ok(self.clone().prescription_edited(visit.prescription.clone()))
    }

    /// Forget the patient and draft. The catalog and in-flight markers survive.
    pub fn reset(self) -> Self {
        Self {
            catalog: self.catalog,
            pending: self.pending,
            ..Self::default()
        }
    }
}

/// Index that keeps `history` newest first. Undated visits go to the front;
/// existing undated entries are never reordered past.
fn history_position(history: &[Visit], visit: &Visit) -> usize {
    let Some(date) = visit.calendar_date() else {
        return 0;
    };
    history
        .iter()
        .position(|v| v.calendar_date().map_or(true, |d| d <= date))
        .unwrap_or(history.len())
}
