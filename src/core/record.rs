use std::{fmt, sync::Arc};

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::{header::Header, parser::RawRecord};

/// A column designated by its header name or by its zero-based offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRef<'a> {
    Name(&'a str),
    Index(usize),
}

impl<'a> From<&'a str> for ColumnRef<'a> {
    fn from(name: &'a str) -> Self {
        ColumnRef::Name(name)
    }
}

impl<'a> From<&'a String> for ColumnRef<'a> {
    fn from(name: &'a String) -> Self {
        ColumnRef::Name(name)
    }
}

impl From<usize> for ColumnRef<'_> {
    fn from(index: usize) -> Self {
        ColumnRef::Index(index)
    }
}

impl fmt::Display for ColumnRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Name(name) => write!(f, "`{name}`"),
            ColumnRef::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// Whether every field of `record` is null or empty.
pub(crate) fn is_blank(record: &[Option<String>]) -> bool {
    record
        .iter()
        .all(|field| field.as_deref().is_none_or(str::is_empty))
}

/// A record combined with the document header.
///
/// With a header of length H the record holds exactly H values, missing
/// trailing fields being `None`. Without a header values are keyed by offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    offset: usize,
    header: Arc<Header>,
    values: RawRecord,
}

impl Record {
    pub(crate) fn new(offset: usize, header: Arc<Header>, raw: RawRecord) -> Self {
        let values = header.combine(raw);
        Self {
            offset,
            header,
            values,
        }
    }

    /// Offset of the record among the non-empty records of the document.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn values(&self) -> &[Option<String>] {
        &self.values
    }

    pub fn into_values(self) -> RawRecord {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Offset of `column` in this record, if it exists.
    pub fn index_of(&self, column: ColumnRef<'_>) -> Option<usize> {
        match column {
            ColumnRef::Name(name) => self.header.position(name),
            ColumnRef::Index(index) if index < self.values.len() => Some(index),
            ColumnRef::Index(_) => None,
        }
    }

    /// The value of `column`, `None` when the column is missing or null.
    pub fn get<'c>(&self, column: impl Into<ColumnRef<'c>>) -> Option<&str> {
        self.field(column).and_then(Option::as_deref)
    }

    /// The raw value of `column`, distinguishing a missing column from a null value.
    pub fn field<'c>(&self, column: impl Into<ColumnRef<'c>>) -> Option<&Option<String>> {
        self.index_of(column.into())
            .and_then(|index| self.values.get(index))
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        if self.header.is_empty() {
            for (index, value) in self.values.iter().enumerate() {
                map.serialize_entry(&index, value)?;
            }
        } else {
            for (name, value) in self.header.names().iter().zip(&self.values) {
                map.serialize_entry(name, value)?;
            }
        }
        map.end()
    }
}

/// A scalar handed to the writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Field {
    pub fn is_string(&self) -> bool {
        matches!(self, Field::Str(_))
    }

    /// Canonical text of the field, null being the empty string.
    pub fn into_text(self) -> String {
        match self {
            Field::Null => String::new(),
            Field::Str(value) => value,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Null => Ok(()),
            Field::Str(value) => f.write_str(value),
            Field::Int(value) => write!(f, "{value}"),
            Field::Float(value) => write!(f, "{value}"),
            Field::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::Str(value.to_string())
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        Field::Str(value)
    }
}

impl From<&String> for Field {
    fn from(value: &String) -> Self {
        Field::Str(value.clone())
    }
}

impl From<char> for Field {
    fn from(value: char) -> Self {
        Field::Str(value.to_string())
    }
}

impl From<bool> for Field {
    fn from(value: bool) -> Self {
        Field::Bool(value)
    }
}

impl From<f64> for Field {
    fn from(value: f64) -> Self {
        Field::Float(value)
    }
}

impl From<f32> for Field {
    fn from(value: f32) -> Self {
        Field::Float(f64::from(value))
    }
}

macro_rules! int_field {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Field {
            fn from(value: $ty) -> Self {
                Field::Int(i64::from(value))
            }
        })*
    };
}

int_field!(i8, i16, i32, i64, u8, u16, u32);

impl<T: Into<Field>> From<Option<T>> for Field {
    fn from(value: Option<T>) -> Self {
        value.map_or(Field::Null, Into::into)
    }
}

/// Conversion of an item into the ordered fields of one CSV record.
pub trait ToRecord {
    fn to_record(&self) -> Vec<Field>;
}

impl<T: Clone + Into<Field>> ToRecord for [T] {
    fn to_record(&self) -> Vec<Field> {
        self.iter().cloned().map(Into::into).collect()
    }
}

impl<T: Clone + Into<Field>> ToRecord for Vec<T> {
    fn to_record(&self) -> Vec<Field> {
        self.as_slice().to_record()
    }
}

impl<T: Clone + Into<Field>, const N: usize> ToRecord for [T; N] {
    fn to_record(&self) -> Vec<Field> {
        self.as_slice().to_record()
    }
}

impl ToRecord for Record {
    fn to_record(&self) -> Vec<Field> {
        self.values.to_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weather(header: &Header) -> Record {
        Record::new(
            1,
            Arc::new(header.clone()),
            vec![Some("2011-01-01".to_string()), Some("1".to_string())],
        )
    }

    #[test]
    fn record_should_be_padded_to_the_header() {
        let header = Header::new(["date", "temperature", "place"]).unwrap();
        let record = weather(&header);

        assert_eq!(record.len(), 3);
        assert_eq!(record.get("date"), Some("2011-01-01"));
        assert_eq!(record.get(1usize), Some("1"));
        assert_eq!(record.field("place"), Some(&None));
        assert_eq!(record.field("country"), None);
    }

    #[test]
    fn record_without_header_should_be_positional() {
        let record = weather(&Header::default());

        assert_eq!(record.get(0usize), Some("2011-01-01"));
        assert_eq!(record.get(5usize), None);
        assert_eq!(record.get("date"), None);
    }

    #[test]
    fn record_should_serialize_as_a_map() {
        let header = Header::new(["date", "temperature", "place"]).unwrap();

        let json = serde_json::to_string(&weather(&header)).unwrap();
        assert_eq!(
            json,
            r#"{"date":"2011-01-01","temperature":"1","place":null}"#
        );

        let json = serde_json::to_string(&weather(&Header::default())).unwrap();
        assert_eq!(json, r#"{"0":"2011-01-01","1":"1"}"#);
    }

    #[test]
    fn blank_records_should_only_hold_nulls_or_empty_strings() {
        assert!(is_blank(&[None]));
        assert!(is_blank(&[Some(String::new()), None]));
        assert!(!is_blank(&[None, Some(" ".to_string())]));
    }

    #[test]
    fn fields_should_render_canonically() {
        let record = vec![
            Field::from("a"),
            Field::from(-1),
            Field::from(1.5),
            Field::from(true),
            Field::from(None::<i32>),
        ];

        let texts: Vec<String> = record.into_iter().map(Field::into_text).collect();
        assert_eq!(texts, vec!["a", "-1", "1.5", "true", ""]);
    }
}
