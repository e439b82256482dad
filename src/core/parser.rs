//! RFC4180 record parser.
//!
//! The parser is line buffered: it pulls one physical line from a [`Source`],
//! splits it into fields and only pulls further lines while an enclosed field
//! is still open. It never fails on malformed content; unbalanced or stray
//! enclosures are recovered the way `fgetcsv` does.

use std::io;

use log::warn;

use super::{control::ControlSet, stream::Source};

/// A parsed record. `None` marks the absence of a field: an empty line, or the
/// empty tail following a trailing delimiter.
pub type RawRecord = Vec<Option<String>>;

/// Whitespace handling for unenclosed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trim {
    /// Keep unenclosed fields verbatim.
    #[default]
    None,
    /// Trim spaces, tabs, NUL and vertical tabs around unenclosed fields,
    /// unless they are the delimiter or the enclosure.
    Fields,
}

/// What follows an extracted field.
#[derive(Debug, PartialEq)]
enum Next {
    Field,
    EndOfRecord,
}

/// The physical line being split and the start of the next field.
#[derive(Default)]
struct LineCursor {
    line: Vec<u8>,
    pos: usize,
}

impl LineCursor {
    fn rest(&self) -> &[u8] {
        &self.line[self.pos..]
    }

    fn advance(&mut self, len: usize) {
        self.pos += len;
    }

    fn finish(&mut self) {
        self.pos = self.line.len();
    }

    /// Replaces the buffer with the next physical line, `false` at the end of the document.
    fn reload<S: Source + ?Sized>(&mut self, source: &mut S) -> io::Result<bool> {
        self.line.clear();
        self.pos = 0;
        Ok(source.read_line(&mut self.line)? > 0)
    }
}

fn is_line_break(rest: &[u8]) -> bool {
    matches!(rest, [] | [b'\n'] | [b'\r'] | [b'\r', b'\n'])
}

fn strip_line_break(mut field: &[u8]) -> &[u8] {
    while let [rest @ .., b'\r' | b'\n'] = field {
        field = rest;
    }
    field
}

fn decode(field: Vec<u8>) -> String {
    match String::from_utf8(field) {
        Ok(field) => field,
        Err(error) => {
            warn!("invalid UTF-8 sequence in field, decoding lossily");
            String::from_utf8_lossy(error.as_bytes()).into_owned()
        }
    }
}

/// Splits physical lines into records according to a [`ControlSet`].
///
/// # Examples
///
/// ```
/// use csv_document::core::parser::RecordParser;
/// use csv_document::core::stream::Stream;
///
/// let mut source = Stream::new("\"a\nb\",c\n\"a\"\"b\",c\n".as_bytes());
/// let records: Vec<_> = RecordParser::default()
///     .iter(&mut source)
///     .collect::<Result<_, _>>()
///     .unwrap();
///
/// assert_eq!(
///     records,
///     vec![
///         vec![Some("a\nb".to_string()), Some("c".to_string())],
///         vec![Some("a\"b".to_string()), Some("c".to_string())],
///     ]
/// );
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordParser {
    controls: ControlSet,
    trim: Trim,
}

impl RecordParser {
    pub fn new(controls: ControlSet, trim: Trim) -> Self {
        Self { controls, trim }
    }

    pub fn controls(&self) -> ControlSet {
        self.controls
    }

    pub fn trim(&self) -> Trim {
        self.trim
    }

    /// Parses the next logical record, `None` at the end of the document.
    pub fn next_record<S: Source + ?Sized>(&self, source: &mut S) -> io::Result<Option<RawRecord>> {
        let mut cursor = LineCursor::default();
        if !cursor.reload(source)? {
            return Ok(None);
        }

        let mut record = Vec::new();
        loop {
            let rest = cursor.rest();
            let lead = rest
                .iter()
                .take_while(|byte| self.controls.is_whitespace(**byte))
                .count();

            let (field, next) = if rest.get(lead) == Some(&self.controls.enclosure()) {
                cursor.advance(lead + 1);
                self.enclosed_field(&mut cursor, source)?
            } else {
                self.unenclosed_field(&mut cursor)
            };

            record.push(field.map(decode));
            if next == Next::EndOfRecord {
                return Ok(Some(record));
            }
        }
    }

    /// Lazily parses every remaining record of `source`.
    pub fn iter<'a, S: Source + ?Sized>(&'a self, source: &'a mut S) -> RawRecords<'a, S> {
        RawRecords {
            parser: self,
            source,
        }
    }

    fn unenclosed_field(&self, cursor: &mut LineCursor) -> (Option<Vec<u8>>, Next) {
        let rest = cursor.rest();
        if is_line_break(rest) {
            cursor.finish();
            return (None, Next::EndOfRecord);
        }

        match rest.iter().position(|byte| *byte == self.controls.delimiter()) {
            Some(index) => {
                let field = self.trimmed(&rest[..index]).to_vec();
                cursor.advance(index + 1);
                (Some(field), Next::Field)
            }
            None => {
                let field = self.trimmed(strip_line_break(rest)).to_vec();
                cursor.finish();
                (Some(field), Next::EndOfRecord)
            }
        }
    }

    /// Extracts a field whose opening enclosure was already consumed.
    fn enclosed_field<S: Source + ?Sized>(
        &self,
        cursor: &mut LineCursor,
        source: &mut S,
    ) -> io::Result<(Option<Vec<u8>>, Next)> {
        let enclosure = self.controls.enclosure();
        let mut content = Vec::new();

        loop {
            let Some(index) = self.closing_enclosure(cursor.rest()) else {
                content.extend_from_slice(cursor.rest());
                if cursor.reload(source)? {
                    continue;
                }
                // Unbalanced enclosure: the field closes at the end of the document.
                let len = strip_line_break(&content).len();
                content.truncate(len);
                return Ok((Some(content), Next::EndOfRecord));
            };

            content.extend_from_slice(&cursor.rest()[..index]);
            cursor.advance(index + 1);

            let rest = cursor.rest();
            if is_line_break(rest) {
                cursor.finish();
                return Ok((Some(content), Next::EndOfRecord));
            }

            let first = rest[0];
            if first == enclosure {
                content.push(enclosure);
                cursor.advance(1);
            } else if first == self.controls.delimiter() {
                cursor.advance(1);
                return Ok((Some(content), Next::Field));
            } else {
                // Bytes between the closing enclosure and the delimiter are kept.
                let (tail, next) = self.unenclosed_field(cursor);
                content.extend(tail.unwrap_or_default());
                return Ok((Some(content), next));
            }
        }
    }

    /// Offset of the next enclosure that is not made literal by the escape.
    fn closing_enclosure(&self, rest: &[u8]) -> Option<usize> {
        let escape = self.controls.active_escape();
        let mut index = 0;
        while index < rest.len() {
            let byte = rest[index];
            if Some(byte) == escape {
                index += 2;
                continue;
            }
            if byte == self.controls.enclosure() {
                return Some(index);
            }
            index += 1;
        }
        None
    }

    fn trimmed<'a>(&self, field: &'a [u8]) -> &'a [u8] {
        match self.trim {
            Trim::None => field,
            Trim::Fields => self.controls.trim(field),
        }
    }
}

/// Iterator returned by [`RecordParser::iter`].
pub struct RawRecords<'a, S: ?Sized> {
    parser: &'a RecordParser,
    source: &'a mut S,
}

impl<S: Source + ?Sized> Iterator for RawRecords<'_, S> {
    type Item = io::Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_record(self.source).transpose()
    }
}
