//! Raw input representation and record tokenizing
//!
//! Acquisition exports come in two shapes: plain numeric CSV rows, and
//! six-field records (`time,max_pressure,timestamp,contact_area,total_pressure,data`)
//! whose last field packs a whole frame as a bracketed or quoted list.
//! This module only splits lines into records; deciding what a record means
//! is left to the shape introspection and the frame parser.

use crate::error::{PResult, PipelineError};
use std::borrow::Cow;

/// Raw analysis input, borrowed from the caller
#[derive(Clone, Copy, Debug)]
pub enum RawData<'a> {
    /// CSV-like text
    Text(&'a str),
    /// CSV-like bytes, must be UTF-8
    Bytes(&'a [u8]),
    /// Pre-parsed numeric rows
    Rows(&'a [Vec<f64>]),
}

/// One tokenized input line
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    /// Comma-separated cells; `None` where a cell is not a number
    Row(Vec<Option<f64>>),
    /// Values of a packed array field
    Packed(Vec<f64>),
    /// Packed array field that could not be read
    Malformed(String),
}

impl Record {
    /// Number of cells (rows) or packed values
    pub fn len(&self) -> usize {
        match self {
            Record::Row(cells) => cells.len(),
            Record::Packed(values) => values.len(),
            Record::Malformed(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All values when every cell parsed
    pub fn numbers(&self) -> Option<Vec<f64>> {
        match self {
            Record::Row(cells) => cells.iter().copied().collect(),
            Record::Packed(values) => Some(values.clone()),
            Record::Malformed(_) => None,
        }
    }
}

impl<'a> RawData<'a> {
    fn text(&self) -> PResult<Option<Cow<'a, str>>> {
        match *self {
            RawData::Text(text) => Ok(Some(Cow::Borrowed(text))),
            RawData::Bytes(bytes) => std::str::from_utf8(bytes)
                .map(|text| Some(Cow::Borrowed(text)))
                .map_err(|e| PipelineError::Encoding(e.valid_up_to())),
            RawData::Rows(_) => Ok(None),
        }
    }

    /// Tokenize every data line, dropping blank and header lines
    pub fn records(&self) -> PResult<Vec<Record>> {
        if let RawData::Rows(rows) = *self {
            return Ok(rows
                .iter()
                .filter(|row| !row.is_empty())
                .map(|row| Record::Row(row.iter().map(|v| Some(*v)).collect()))
                .collect());
        }

        let text = match self.text()? {
            Some(text) => text,
            None => return Ok(Vec::new()),
        };
        let text = text.trim_start_matches('\u{feff}');

        Ok(text.lines().filter_map(tokenize_line).collect())
    }
}

/// Split one line; `None` for blank and header lines
fn tokenize_line(line: &str) -> Option<Record> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    if let Some(field) = packed_field(line) {
        return Some(match parse_packed(field) {
            Ok(values) => Record::Packed(values),
            Err(reason) => Record::Malformed(reason),
        });
    }

    let mut cells: Vec<Option<f64>> = line.split(',').map(parse_cell).collect();
    // Trailing separators produce empty cells, not data
    while line.ends_with(',') && matches!(cells.last(), Some(None)) {
        cells.pop();
        if cells.is_empty() {
            break;
        }
    }

    if cells.iter().all(Option::is_none) {
        // Header or free text
        return None;
    }
    Some(Record::Row(cells))
}

fn parse_cell(cell: &str) -> Option<f64> {
    let cell = cell.trim().trim_matches(|c| c == '"' || c == '\'');
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok()
}

/// Metadata fields ahead of the packed field in the six-column export
const PACKED_LEADING_FIELDS: usize = 5;

/// Locate a bracketed array field, or a quoted field holding several values
///
/// Header cells such as `p0[kPa]` or `"max pressure"` look similar, so a
/// candidate only counts when it follows the export's metadata fields or
/// carries at least one number.
fn packed_field(line: &str) -> Option<&str> {
    if let Some(start) = line.find('[') {
        if let Some(end) = line.rfind(']').filter(|&end| end > start) {
            if looks_packed(line, start, &line[start + 1..end]) {
                return Some(&line[start..=end]);
            }
        }
    }

    // Quoted scalar cells ("0.5") are ordinary row cells
    let mut rest = 0;
    while let Some(open) = line[rest..].find('"').map(|i| rest + i) {
        let close = open + 1 + line[open + 1..].find('"')?;
        let inner = &line[open + 1..close];
        if inner.trim().contains(|c: char| c == ',' || c.is_whitespace())
            && looks_packed(line, open, inner)
        {
            return Some(&line[open..=close]);
        }
        rest = close + 1;
    }
    None
}

fn looks_packed(line: &str, field_start: usize, inner: &str) -> bool {
    line[..field_start].matches(',').count() >= PACKED_LEADING_FIELDS
        || inner
            .split(|c: char| c == ',' || c.is_whitespace())
            .any(|token| token.parse::<f64>().is_ok())
}

fn parse_packed(field: &str) -> Result<Vec<f64>, String> {
    let trimmed = field.trim_matches(|c| c == '"' || c == '\'');

    // Well-formed exports write a JSON array
    if let Ok(values) = serde_json::from_str::<Vec<f64>>(trimmed) {
        return Ok(values);
    }

    let inner = trimmed.trim_start_matches('[').trim_end_matches(']');
    inner
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| format!("non-numeric value '{}' in packed field", token))
        })
        .collect()
}
