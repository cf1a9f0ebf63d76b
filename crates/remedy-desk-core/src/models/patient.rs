//! Patient models.

use serde::{Deserialize, Deserializer, Serialize};

use super::lenient_string;

/// A patient record as held by the directory endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Given name
    #[serde(default, deserialize_with = "lenient_string")]
    pub first_name: String,
    /// Family name (optional at registration)
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_name: String,
    /// Sex
    #[serde(default)]
    pub sex: Sex,
    /// City of residence
    #[serde(default, deserialize_with = "lenient_string")]
    pub city: String,
    /// Phone number - unique lookup key
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: String,
}

/// Patient sex as offered by the registration form.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub enum Sex {
    #[default]
    Male,
    Female,
    Other,
}

impl Sex {
    /// Parse a form or wire value. Unknown values map to `Other`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "male" | "m" => Sex::Male,
            "female" | "f" => Sex::Female,
            _ => Sex::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Other => "Other",
        }
    }
}

impl<'de> Deserialize<'de> for Sex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = lenient_string(deserializer)?;
        Ok(Sex::parse(&raw))
    }
}

impl Patient {
    /// Full display name, tolerating a missing last name.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Phone with everything but the last four digits masked, for logs.
    pub fn masked_phone(&self) -> String {
        mask_phone(&self.phone)
    }
}

/// Mask a phone number down to its last four characters.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.trim().chars().collect();
    let keep = chars.len().saturating_sub(4);
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| if i < keep { '*' } else { *c })
        .collect()
}

/// Registration form input, validated into a [`Patient`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientForm {
    pub first_name: String,
    pub last_name: String,
    pub sex: Sex,
    pub city: String,
    pub phone: String,
}

impl PatientForm {
    /// Prefill from an existing patient.
    pub fn from_patient(patient: &Patient) -> Self {
        Self {
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            sex: patient.sex,
            city: patient.city.clone(),
            phone: patient.phone.clone(),
        }
    }

    /// Empty form carrying only a phone number (from a failed search).
    pub fn with_phone(phone: &str) -> Self {
        Self {
            phone: phone.trim().to_string(),
            ..Self::default()
        }
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.first_name.trim().is_empty() {
            missing.push("first name");
        }
        if self.city.trim().is_empty() {
            missing.push("city");
        }
        if self.phone.trim().is_empty() {
            missing.push("phone");
        }
        missing
    }

    /// Build a patient record, or return the list of missing required fields.
    pub fn validate(&self) -> Result<Patient, Vec<&'static str>> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(missing);
        }
        Ok(Patient {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            sex: self.sex,
            city: self.city.trim().to_string(),
            phone: self.phone.trim().to_string(),
        })
    }
}
