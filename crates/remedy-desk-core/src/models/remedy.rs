//! Remedy catalog models.

use serde::{Deserialize, Serialize};

/// One row of the remedy spreadsheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemedyEntry {
    /// Remedy name; `None` when the cell is blank
    pub name: Option<String>,
    /// Potency designator (e.g., "30C", "200C", "1M")
    pub potency: String,
    /// Physical storage box
    pub box_number: String,
    /// Whether the remedy is in stock
    pub available: bool,
}

impl RemedyEntry {
    /// Create an available entry.
    pub fn new(name: &str, potency: &str, box_number: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            potency: potency.to_string(),
            box_number: box_number.to_string(),
            available: true,
        }
    }

    /// Mark as out of stock.
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    /// Interpret an availability cell. Only `y`/`yes` count as available.
    pub fn parse_availability(cell: &str) -> bool {
        matches!(cell.trim().to_lowercase().as_str(), "y" | "yes")
    }

    /// Text inserted into a prescription: "<name> <potency>".
    pub fn prescription_label(&self) -> Option<String> {
        let name = self.name.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        let potency = self.potency.trim();
        if potency.is_empty() {
            Some(name.to_string())
        } else {
            Some(format!("{} {}", name, potency))
        }
    }
}
