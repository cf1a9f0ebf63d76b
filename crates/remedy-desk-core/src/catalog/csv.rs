//! CSV parsing for the remedy spreadsheet export.
//!
//! Handles RFC 4180 quoting: quoted fields may contain commas, doubled
//! quotes and line breaks. CRLF line endings and a leading BOM are accepted.

use crate::models::RemedyEntry;

use super::{CatalogError, CatalogResult};

pub const COLUMN_NAME: &str = "Remedy Name";
pub const COLUMN_POTENCY: &str = "Potency";
pub const COLUMN_BOX: &str = "BOX Number";
pub const COLUMN_AVAILABLE: &str = "Available y/n";

/// Split a CSV document into records of fields.
pub fn parse_records(text: &str) -> CatalogResult<Vec<Vec<String>>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1usize;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
                line += 1;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(CatalogError::Parse {
            line,
            reason: "unterminated quoted field".into(),
        });
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }

    Ok(records)
}

/// Column positions resolved from the header row.
struct Columns {
    name: usize,
    potency: Option<usize>,
    box_number: Option<usize>,
    available: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> CatalogResult<Self> {
        let find = |wanted: &str| {
            header
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(wanted))
        };

        Ok(Self {
            name: find(COLUMN_NAME)
                .ok_or_else(|| CatalogError::MissingColumn(COLUMN_NAME.to_string()))?,
            potency: find(COLUMN_POTENCY),
            box_number: find(COLUMN_BOX),
            available: find(COLUMN_AVAILABLE),
        })
    }
}

fn cell(record: &[String], index: Option<usize>) -> &str {
    index
        .and_then(|i| record.get(i))
        .map(|s| s.trim())
        .unwrap_or("")
}

/// Parse the remedy sheet into entries, in sheet order.
pub fn parse_catalog(text: &str) -> CatalogResult<Vec<RemedyEntry>> {
    let mut records = parse_records(text)?.into_iter();
    let header = records.next().ok_or(CatalogError::Empty)?;
    let columns = Columns::from_header(&header)?;

    let entries = records
        .filter(|record| record.iter().any(|f| !f.trim().is_empty()))
        .map(|record| {
            let name = cell(&record, Some(columns.name));
            RemedyEntry {
                name: (!name.is_empty()).then(|| name.to_string()),
                potency: cell(&record, columns.potency).to_string(),
                box_number: cell(&record, columns.box_number).to_string(),
                available: RemedyEntry::parse_availability(cell(&record, columns.available)),
            }
        })
        .collect();

    Ok(entries)
}
