use crate::error::CsvError;

/// Whitespace bytes skipped before an enclosure and trimmed from unenclosed fields.
const WHITESPACE: &[u8] = b" \t\0\x0B";

/// The delimiter, enclosure and escape characters bound to a parse or write operation.
///
/// Each character is exactly one byte. The escape may be disabled, which switches
/// the parser and the writer to strict RFC4180 doubled-enclosure semantics.
///
/// # Examples
///
/// ```
/// use csv_document::core::control::ControlSet;
///
/// let controls = ControlSet::new(";", "'", "").unwrap();
/// assert_eq!(controls.delimiter(), b';');
/// assert_eq!(controls.enclosure(), b'\'');
/// assert_eq!(controls.escape(), None);
///
/// assert!(ControlSet::new("::", "\"", "\\").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSet {
    delimiter: u8,
    enclosure: u8,
    escape: Option<u8>,
}

impl Default for ControlSet {
    /// Comma delimiter, double quote enclosure, backslash escape.
    fn default() -> Self {
        Self {
            delimiter: b',',
            enclosure: b'"',
            escape: Some(b'\\'),
        }
    }
}

impl ControlSet {
    /// Validates and binds the three control characters.
    ///
    /// An empty `escape` disables the escape character.
    pub fn new(delimiter: &str, enclosure: &str, escape: &str) -> Result<Self, CsvError> {
        Ok(Self {
            delimiter: single_byte("delimiter", delimiter)?,
            enclosure: single_byte("enclosure", enclosure)?,
            escape: if escape.is_empty() {
                None
            } else {
                Some(single_byte("escape", escape)?)
            },
        })
    }

    pub fn from_bytes(delimiter: u8, enclosure: u8, escape: Option<u8>) -> Self {
        Self {
            delimiter,
            enclosure,
            escape,
        }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn enclosure(&self) -> u8 {
        self.enclosure
    }

    pub fn escape(&self) -> Option<u8> {
        self.escape
    }

    pub fn with_delimiter(self, delimiter: &str) -> Result<Self, CsvError> {
        Ok(Self {
            delimiter: single_byte("delimiter", delimiter)?,
            ..self
        })
    }

    pub fn with_enclosure(self, enclosure: &str) -> Result<Self, CsvError> {
        Ok(Self {
            enclosure: single_byte("enclosure", enclosure)?,
            ..self
        })
    }

    pub fn with_escape(self, escape: &str) -> Result<Self, CsvError> {
        let escape = if escape.is_empty() {
            None
        } else {
            Some(single_byte("escape", escape)?)
        };
        Ok(Self { escape, ..self })
    }

    /// The escape byte when it is active, i.e. set and distinct from the enclosure.
    pub(crate) fn active_escape(&self) -> Option<u8> {
        self.escape.filter(|escape| *escape != self.enclosure)
    }

    /// Whether `byte` belongs to the whitespace mask, which never includes
    /// the delimiter nor the enclosure.
    pub(crate) fn is_whitespace(&self, byte: u8) -> bool {
        byte != self.delimiter && byte != self.enclosure && WHITESPACE.contains(&byte)
    }

    pub(crate) fn trim<'a>(&self, mut field: &'a [u8]) -> &'a [u8] {
        while let [first, rest @ ..] = field {
            if !self.is_whitespace(*first) {
                break;
            }
            field = rest;
        }
        while let [rest @ .., last] = field {
            if !self.is_whitespace(*last) {
                break;
            }
            field = rest;
        }
        field
    }
}

fn single_byte(name: &'static str, value: &str) -> Result<u8, CsvError> {
    match value.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(CsvError::InvalidControlCharacter {
            name,
            value: value.to_string(),
        }),
    }
}
