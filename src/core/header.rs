use std::collections::HashSet;

use crate::error::CsvError;

use super::parser::RawRecord;

/// Ordered, unique column names. An empty header means "no header row":
/// records are then keyed by their zero-based field offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    names: Vec<String>,
}

impl Header {
    /// Builds a header from names, rejecting duplicates and empty names.
    ///
    /// ```
    /// use csv_document::core::header::Header;
    ///
    /// let header = Header::new(["date", "temperature", "place"]).unwrap();
    /// assert_eq!(header.position("place"), Some(2));
    ///
    /// assert!(Header::new(["a", "a", "b"]).is_err());
    /// ```
    pub fn new<I, S>(names: I) -> Result<Self, CsvError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_record(names.into_iter().map(|name| Some(name.into())).collect())
    }

    /// Validates a parsed record as a header.
    ///
    /// Every field must be a non-empty string and names must be unique
    /// (case sensitive). The error lists every duplicated name and the offset
    /// of every invalid column.
    pub fn from_record(record: RawRecord) -> Result<Self, CsvError> {
        let mut seen = HashSet::with_capacity(record.len());
        let mut duplicates: Vec<String> = Vec::new();
        let mut invalid = Vec::new();
        let mut names = Vec::with_capacity(record.len());

        for (offset, field) in record.into_iter().enumerate() {
            match field {
                Some(name) if !name.is_empty() => {
                    if !seen.insert(name.clone()) && !duplicates.contains(&name) {
                        duplicates.push(name.clone());
                    }
                    names.push(name);
                }
                _ => invalid.push(offset),
            }
        }

        if duplicates.is_empty() && invalid.is_empty() {
            Ok(Self { names })
        } else {
            Err(CsvError::DuplicateOrInvalidHeaderColumns {
                duplicates,
                invalid,
            })
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|candidate| candidate == name)
    }

    /// Zips `record` against the header.
    ///
    /// Missing trailing fields become `None` and extra fields are dropped, so
    /// the result always holds exactly `self.len()` values. Without a header
    /// the record is returned unchanged.
    pub fn combine(&self, mut record: RawRecord) -> RawRecord {
        if self.is_empty() {
            return record;
        }
        record.resize(self.len(), None);
        record
    }
}
