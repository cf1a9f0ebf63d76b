//! Domain models for the front desk.

mod patient;
mod remedy;
mod visit;

pub use patient::*;
pub use remedy::*;
pub use visit::*;

use serde::{Deserialize, Deserializer};

/// Spreadsheet-backed JSON may carry numbers or nulls where text is expected.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientValue {
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

/// Deserialize a string field, accepting numbers, booleans and null.
pub(crate) fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<LenientValue>::deserialize(deserializer)?;
    Ok(match value {
        None => String::new(),
        Some(LenientValue::Text(s)) => s,
        Some(LenientValue::Int(n)) => n.to_string(),
        Some(LenientValue::UInt(n)) => n.to_string(),
        Some(LenientValue::Float(n)) => n.to_string(),
        Some(LenientValue::Bool(b)) => b.to_string(),
    })
}
