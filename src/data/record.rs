//! Lenient numeric parsing of data lines.

use crate::data::schema::Schema;

/// One parsed row, one value per schema column.
///
/// The sample index is not stored here; it is assigned when the record is
/// folded into the [`TelemetryWindow`](crate::data::window::TelemetryWindow).
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub values: Vec<f64>,
}

impl Record {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<f64>> for Record {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// Result of parsing one data line against the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Accepted(Record),
    /// Wrong number of fields; the line is dropped.
    Discarded { expected: usize, found: usize },
}

/// Coerce one field to a number, never failing.
///
/// Fields containing a decimal point parse as floats, everything else as an
/// integer. Anything unparseable becomes `0.0`.
pub fn coerce_field(field: &str) -> f64 {
    let field = field.trim();
    if field.contains('.') {
        return field.parse::<f64>().unwrap_or(0.0);
    }
    match field.parse::<i64>() {
        Ok(v) => v as f64,
        // integer literals wider than i64 still have a well-defined float value
        Err(_) if is_integer_literal(field) => field.parse::<f64>().unwrap_or(0.0),
        Err(_) => 0.0,
    }
}

fn is_integer_literal(field: &str) -> bool {
    let digits = field.strip_prefix(&['+', '-'][..]).unwrap_or(field);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Splits data lines and coerces their fields.
#[derive(Debug, Clone, Copy)]
pub struct RecordParser {
    separator: char,
}

impl RecordParser {
    pub fn new(separator: char) -> Self {
        Self { separator }
    }

    pub fn parse(&self, line: &str, schema: &Schema) -> ParseOutcome {
        let found = line.split(self.separator).count();
        if found != schema.len() {
            return ParseOutcome::Discarded {
                expected: schema.len(),
                found,
            };
        }
        let values = line.split(self.separator).map(coerce_field).collect();
        ParseOutcome::Accepted(Record::new(values))
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(',')
    }
}
