//! Visit (consultation) models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::lenient_string;

/// A single consultation. Belongs to exactly one patient; append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Visit {
    /// Visit date as stored by the directory (ISO `YYYY-MM-DD` when created here)
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub symptoms: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub diagnosis: String,
    /// Comma-separated remedy list, e.g. "Aconite 6C, Belladonna 30C"
    #[serde(default, deserialize_with = "lenient_string")]
    pub prescription: String,
}

impl Visit {
    /// Parse the leading calendar date, if the stored value has one.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        let head = self.date.get(..10)?;
        NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
    }
}

/// Consultation form input, validated into a [`Visit`].
#[derive(Debug, Clone, PartialEq)]
pub struct VisitForm {
    pub date: NaiveDate,
    pub symptoms: String,
    pub diagnosis: String,
    pub prescription: String,
}

impl VisitForm {
    /// New form for the given day, with symptoms prefixed by the date.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            symptoms: format!("{}; ", date.format("%Y-%m-%d")),
            diagnosis: String::new(),
            prescription: String::new(),
        }
    }

    /// New form for today (local time).
    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    /// Fill in the symptoms after the date prefix. Text that already starts
    /// with the visit date replaces the prefill as is.
    pub fn set_symptoms(&mut self, text: &str) {
        let text = text.trim();
        let date = self.date.format("%Y-%m-%d").to_string();
        self.symptoms = if text.starts_with(&date) {
            text.to_string()
        } else {
            format!("{}; {}", date, text)
        };
    }

    /// Build the visit record. Trailing separators left by the autocomplete are dropped.
    pub fn into_visit(self) -> Visit {
        Visit {
            date: self.date.format("%Y-%m-%d").to_string(),
            symptoms: self.symptoms.trim().to_string(),
            diagnosis: self.diagnosis.trim().to_string(),
            prescription: self
                .prescription
                .trim()
                .trim_end_matches(',')
                .trim_end()
                .to_string(),
        }
    }
}
