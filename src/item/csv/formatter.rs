use crate::{
    core::{parser::RawRecord, record::Field},
    error::CsvError,
};

use super::csv_writer::RecordFormatter;

/// Guards spreadsheet consumers against formula injection.
///
/// String fields starting with one of the trigger characters get the escape
/// sequence prepended. Numbers and booleans are never escaped, so `-1` written
/// as an int stays `-1`.
///
/// # Examples
///
/// ```
/// use csv_document::core::record::Field;
/// use csv_document::item::csv::csv_writer::CsvItemWriterBuilder;
/// use csv_document::item::csv::formatter::EscapeFormula;
///
/// let writer = CsvItemWriterBuilder::new()
///     .formatter(EscapeFormula::default())
///     .from_writer(vec![]);
///
/// writer
///     .insert_one(&vec![Field::from("=SUM(A1:A2)"), Field::from(-1), Field::from("ok")])
///     .unwrap();
///
/// let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "\t=SUM(A1:A2),-1,ok\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeFormula {
    escape: String,
    triggers: Vec<char>,
}

impl Default for EscapeFormula {
    /// Tab escape, `=`, `-`, `+` and `@` triggers.
    fn default() -> Self {
        Self {
            escape: "\t".to_string(),
            triggers: vec!['=', '-', '+', '@'],
        }
    }
}

impl EscapeFormula {
    /// Builds a guard with a custom escape and trigger set.
    ///
    /// # Errors
    ///
    /// [`CsvError::InvalidArgument`] when a trigger is not a single character
    /// or the escape is empty.
    pub fn new<S: AsRef<str>>(escape: &str, triggers: &[S]) -> Result<Self, CsvError> {
        if escape.is_empty() {
            return Err(CsvError::InvalidArgument(
                "the formula escape cannot be empty".to_string(),
            ));
        }

        let triggers = triggers
            .iter()
            .map(|trigger| {
                let trigger = trigger.as_ref();
                let mut chars = trigger.chars();
                match (chars.next(), chars.next()) {
                    (Some(first), None) => Ok(first),
                    _ => Err(CsvError::InvalidArgument(format!(
                        "the formula trigger {trigger:?} must be a single character"
                    ))),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            escape: escape.to_string(),
            triggers,
        })
    }

    pub fn escape(&self) -> &str {
        &self.escape
    }

    pub fn triggers(&self) -> &[char] {
        &self.triggers
    }

    fn is_formula(&self, text: &str) -> bool {
        text.chars()
            .next()
            .is_some_and(|first| self.triggers.contains(&first))
    }

    pub fn escape_record(&self, record: Vec<Field>) -> Vec<Field> {
        record
            .into_iter()
            .map(|field| match field {
                Field::Str(text) if self.is_formula(&text) => {
                    Field::Str(format!("{}{text}", self.escape))
                }
                field => field,
            })
            .collect()
    }

    /// Removes the escape written by [`EscapeFormula::escape_record`] from a
    /// parsed record.
    pub fn unescape_record(&self, record: RawRecord) -> RawRecord {
        record
            .into_iter()
            .map(|field| {
                field.map(|text| match text.strip_prefix(self.escape.as_str()) {
                    Some(rest) if self.is_formula(rest) => rest.to_string(),
                    _ => text,
                })
            })
            .collect()
    }
}

impl RecordFormatter for EscapeFormula {
    fn format(&self, record: Vec<Field>) -> Vec<Field> {
        self.escape_record(record)
    }
}
