use std::{
    cell::{Cell, RefCell},
    fs::File,
    io::Write,
    path::Path,
};

use log::{debug, error};

use crate::{
    core::{
        bom::ByteOrderMark,
        control::ControlSet,
        item::{ItemWriter, ItemWriterResult},
        record::{Field, ToRecord},
    },
    error::CsvError,
};

/// When fields get wrapped in the enclosure character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Enclosure {
    /// Only fields holding the delimiter, the enclosure or a line break.
    #[default]
    Necessary,
    /// Every field.
    Always,
}

/// Rewrites a record before it is validated and serialized.
///
/// Closures taking and returning the record fields are formatters too.
pub trait RecordFormatter {
    fn format(&self, record: Vec<Field>) -> Vec<Field>;
}

impl<F> RecordFormatter for F
where
    F: Fn(Vec<Field>) -> Vec<Field>,
{
    fn format(&self, record: Vec<Field>) -> Vec<Field> {
        self(record)
    }
}

/// Accepts or rejects a formatted record.
pub trait RecordValidator {
    fn validate(&self, record: &[Field]) -> bool;
}

impl<F> RecordValidator for F
where
    F: Fn(&[Field]) -> bool,
{
    fn validate(&self, record: &[Field]) -> bool {
        self(record)
    }
}

/// A CSV document writer.
///
/// Each record goes through the formatters in registration order, then the
/// validators, then is serialized as one line. The output BOM and the header
/// line, when configured, are written once before the first record.
///
/// # Examples
///
/// ```
/// use csv_document::item::csv::csv_writer::CsvItemWriterBuilder;
///
/// let writer = CsvItemWriterBuilder::new()
///     .header(["city", "country", "popcount"])
///     .from_writer(vec![]);
///
/// writer.insert_one(&["Boston", "United States", "4628910"]).unwrap();
/// writer.insert_one(&["Concord, MA", "United States", "42695"]).unwrap();
///
/// let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
/// assert_eq!(data, "\
/// city,country,popcount
/// Boston,United States,4628910
/// \"Concord, MA\",United States,42695
/// ");
/// ```
pub struct CsvItemWriter<W: Write> {
    sink: RefCell<W>,
    controls: ControlSet,
    newline: String,
    enclosure: Enclosure,
    formatters: Vec<Box<dyn RecordFormatter>>,
    validators: Vec<(String, Box<dyn RecordValidator>)>,
    output_bom: Option<ByteOrderMark>,
    header: Option<Vec<String>>,
    opened: Cell<bool>,
}

impl<W: Write> CsvItemWriter<W> {
    pub fn controls(&self) -> ControlSet {
        self.controls
    }

    pub fn newline(&self) -> &str {
        &self.newline
    }

    /// Writes one record and returns the number of bytes written, newline
    /// included, along with the BOM and header line on the first call.
    ///
    /// # Errors
    ///
    /// [`CsvError::CannotWrite`] when a validator rejects the record or the sink fails.
    pub fn insert_one<R: ToRecord + ?Sized>(&self, record: &R) -> ItemWriterResult {
        let record = self
            .formatters
            .iter()
            .fold(record.to_record(), |record, formatter| formatter.format(record));

        if let Some((name, _)) = self
            .validators
            .iter()
            .find(|(_, validator)| !validator.validate(&record))
        {
            let record = texts(record);
            error!("Record {:?} rejected by the validator {}", record, name);
            return Err(CsvError::CannotWrite {
                record,
                validator: Some(name.clone()),
                reason: format!("the record was rejected by the validator `{name}`"),
            });
        }

        let written = self.open()?;
        Ok(written + self.write_line(texts(record))?)
    }

    /// Writes every record and returns the total number of bytes written.
    ///
    /// Stops at the first failure; the records before it stay written.
    pub fn insert_all<'a, R, I>(&self, records: I) -> ItemWriterResult
    where
        R: ToRecord + ?Sized + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        records
            .into_iter()
            .try_fold(0, |written, record| Ok(written + self.insert_one(record)?))
    }

    /// Writes the output BOM and the header line unless already written.
    ///
    /// The prologue is written in one piece; after a sink failure the next
    /// record writes it again.
    pub fn open(&self) -> ItemWriterResult {
        if self.opened.get() {
            return Ok(0);
        }

        let mut prologue = Vec::new();
        if let Some(bom) = self.output_bom {
            prologue.extend_from_slice(bom.as_bytes());
        }
        if let Some(header) = &self.header {
            prologue.extend(self.encode_line(header));
        }

        if !prologue.is_empty() {
            self.sink.borrow_mut().write_all(&prologue).map_err(|e| {
                cannot_write(self.header.clone().unwrap_or_default(), e)
            })?;
        }
        self.opened.set(true);

        debug!("Opened CSV document, {} byte(s) of prologue", prologue.len());
        Ok(prologue.len())
    }

    pub fn flush(&self) -> Result<(), CsvError> {
        self.sink.borrow_mut().flush().map_err(CsvError::from)
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(self) -> Result<W, CsvError> {
        self.flush()?;
        Ok(self.sink.into_inner())
    }

    fn write_line(&self, record: Vec<String>) -> ItemWriterResult {
        let line = self.encode_line(&record);
        match self.sink.borrow_mut().write_all(&line) {
            Ok(()) => Ok(line.len()),
            Err(e) => Err(cannot_write(record, e)),
        }
    }

    fn encode_line(&self, record: &[String]) -> Vec<u8> {
        let mut line = Vec::new();
        for (index, field) in record.iter().enumerate() {
            if index > 0 {
                line.push(self.controls.delimiter());
            }
            self.write_field(field.as_bytes(), &mut line);
        }
        line.extend_from_slice(self.newline.as_bytes());
        line
    }

    fn write_field(&self, field: &[u8], line: &mut Vec<u8>) {
        let delimiter = self.controls.delimiter();
        let enclosure = self.controls.enclosure();

        let enclose = self.enclosure == Enclosure::Always
            || field
                .iter()
                .any(|byte| {
                    matches!(*byte, b'\n' | b'\r') || *byte == delimiter || *byte == enclosure
                });
        if !enclose {
            line.extend_from_slice(field);
            return;
        }

        let escape = self.controls.active_escape();
        let mut escaped = false;
        line.push(enclosure);
        for &byte in field {
            if escaped {
                escaped = false;
            } else if Some(byte) == escape {
                escaped = true;
            } else if byte == enclosure {
                line.push(enclosure);
            }
            line.push(byte);
        }

        // A trailing escape stays outside the enclosure it would otherwise escape.
        if escaped {
            let pending = line.pop();
            line.push(enclosure);
            line.extend(pending);
        } else {
            line.push(enclosure);
        }
    }
}

fn texts(record: Vec<Field>) -> Vec<String> {
    record.into_iter().map(Field::into_text).collect()
}

fn cannot_write(record: Vec<String>, e: std::io::Error) -> CsvError {
    error!("Unable to write record {:?}: {}", record, e);
    CsvError::CannotWrite {
        record,
        validator: None,
        reason: e.to_string(),
    }
}

impl<W: Write, R: ToRecord> ItemWriter<R> for CsvItemWriter<W> {
    fn write(&self, items: &[R]) -> ItemWriterResult {
        self.insert_all(items)
    }

    /// Flush the contents of the internal buffer to the underlying writer.
    fn flush(&self) -> Result<(), CsvError> {
        CsvItemWriter::flush(self)
    }

    fn open(&self) -> ItemWriterResult {
        CsvItemWriter::open(self)
    }
}

/// A builder for configuring CSV document writing.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Enclosure: double quote ("), only when necessary
/// - Escape: backslash (\\)
/// - Newline: `\n`
/// - No formatter, no validator, no BOM, no header line
#[derive(Default)]
pub struct CsvItemWriterBuilder {
    controls: ControlSet,
    newline: Option<String>,
    enclosure: Enclosure,
    formatters: Vec<Box<dyn RecordFormatter>>,
    validators: Vec<(String, Box<dyn RecordValidator>)>,
    output_bom: Option<ByteOrderMark>,
    header: Option<Vec<String>>,
}

impl CsvItemWriterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.controls =
            ControlSet::from_bytes(delimiter, self.controls.enclosure(), self.controls.escape());
        self
    }

    pub fn enclosure(mut self, enclosure: u8) -> Self {
        self.controls =
            ControlSet::from_bytes(self.controls.delimiter(), enclosure, self.controls.escape());
        self
    }

    /// Sets the escape character, `None` for strict RFC4180 output.
    pub fn escape(mut self, escape: Option<u8>) -> Self {
        self.controls =
            ControlSet::from_bytes(self.controls.delimiter(), self.controls.enclosure(), escape);
        self
    }

    pub fn controls(mut self, controls: ControlSet) -> Self {
        self.controls = controls;
        self
    }

    /// Sets the line terminator, e.g. `"\r\n"`.
    pub fn newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = Some(newline.into());
        self
    }

    pub fn enclose(mut self, enclosure: Enclosure) -> Self {
        self.enclosure = enclosure;
        self
    }

    pub fn formatter(mut self, formatter: impl RecordFormatter + 'static) -> Self {
        self.formatters.push(Box::new(formatter));
        self
    }

    /// Adds a validator; the name is reported when it rejects a record.
    pub fn validator(
        mut self,
        name: impl Into<String>,
        validator: impl RecordValidator + 'static,
    ) -> Self {
        self.validators.push((name.into(), Box::new(validator)));
        self
    }

    pub fn output_bom(mut self, bom: Option<ByteOrderMark>) -> Self {
        self.output_bom = bom;
        self
    }

    /// Writes `names` as the first line of the document.
    pub fn header<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.header = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn from_writer<W: Write>(self, wtr: W) -> CsvItemWriter<W> {
        CsvItemWriter {
            sink: RefCell::new(wtr),
            controls: self.controls,
            newline: self.newline.unwrap_or_else(|| "\n".to_string()),
            enclosure: self.enclosure,
            formatters: self.formatters,
            validators: self.validators,
            output_bom: self.output_bom,
            header: self.header,
            opened: Cell::new(false),
        }
    }

    /// Creates (or truncates) the file at `path` and writes into it.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> Result<CsvItemWriter<File>, CsvError> {
        let file_path = path.as_ref();
        let file = File::create(file_path).inspect_err(|e| {
            error!("Failed to create CSV file {}: {}", file_path.display(), e);
        })?;

        Ok(self.from_writer(file))
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    fn written(writer: CsvItemWriter<Vec<u8>>) -> Result<String, Box<dyn Error>> {
        Ok(String::from_utf8(writer.into_inner()?)?)
    }

    #[test]
    fn fields_should_only_be_enclosed_when_necessary() -> Result<(), Box<dyn Error>> {
        let writer = CsvItemWriterBuilder::new().from_writer(vec![]);

        let bytes = writer.insert_one(&["plain", "a,b", "say \"hi\"", "two\nlines", "cr\r"])?;

        let data = written(writer)?;
        assert_eq!(
            data,
            "plain,\"a,b\",\"say \"\"hi\"\"\",\"two\nlines\",\"cr\r\"\n"
        );
        assert_eq!(bytes, data.len());

        Ok(())
    }

    #[test]
    fn scalars_should_be_written_canonically() -> Result<(), Box<dyn Error>> {
        let writer = CsvItemWriterBuilder::new().from_writer(vec![]);

        writer.insert_one(&vec![
            Field::from("a"),
            Field::Null,
            Field::from(-3),
            Field::from(2.5),
            Field::from(false),
        ])?;

        assert_eq!(written(writer)?, "a,,-3,2.5,false\n");

        Ok(())
    }

    #[test]
    fn always_enclosure_and_custom_controls_should_apply() -> Result<(), Box<dyn Error>> {
        let writer = CsvItemWriterBuilder::new()
            .delimiter(b';')
            .enclosure(b'\'')
            .newline("\r\n")
            .enclose(Enclosure::Always)
            .from_writer(vec![]);

        writer.insert_one(&["a", "", "it's"])?;

        assert_eq!(written(writer)?, "'a';'';'it''s'\r\n");

        Ok(())
    }

    #[test]
    fn escaped_enclosure_should_not_be_doubled() -> Result<(), Box<dyn Error>> {
        let writer = CsvItemWriterBuilder::new().from_writer(vec![]);
        writer.insert_one(&["a\\\"b", "c\\\\\"d"])?;
        assert_eq!(written(writer)?, "\"a\\\"b\",\"c\\\\\"\"d\"\n");

        let writer = CsvItemWriterBuilder::new().escape(None).from_writer(vec![]);
        writer.insert_one(&["a\\\"b"])?;
        assert_eq!(written(writer)?, "\"a\\\"\"b\"\n");

        Ok(())
    }

    #[test]
    fn trailing_escape_should_stay_outside_the_enclosure() -> Result<(), Box<dyn Error>> {
        let writer = CsvItemWriterBuilder::new()
            .enclose(Enclosure::Always)
            .from_writer(vec![]);
        writer.insert_one(&["x\\", "y"])?;
        writer.insert_one(&["\\\\", "z"])?;
        let data = written(writer)?;
        assert_eq!(data, "\"x\"\\,\"y\"\n\"\\\\\",\"z\"\n");

        let reader = crate::item::csv::csv_reader::CsvItemReaderBuilder::new().from_string(data);
        let read = reader
            .records()
            .map(|record| record.map(|record| record.into_values()))
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(
            read,
            vec![
                vec![Some("x\\".to_string()), Some("y".to_string())],
                vec![Some("\\\\".to_string()), Some("z".to_string())],
            ]
        );

        Ok(())
    }

    #[test]
    fn bom_and_header_should_be_written_once() -> Result<(), Box<dyn Error>> {
        let writer = CsvItemWriterBuilder::new()
            .output_bom(Some(ByteOrderMark::Utf8))
            .header(["name", "age"])
            .from_writer(vec![]);

        let first = writer.insert_one(&["Alice", "30"])?;
        let second = writer.insert_all(&[["Bob", "25"], ["Carol", "41"]])?;

        assert_eq!(first, 3 + "name,age\n".len() + "Alice,30\n".len());
        assert_eq!(second, "Bob,25\nCarol,41\n".len());
        assert_eq!(
            written(writer)?,
            "\u{FEFF}name,age\nAlice,30\nBob,25\nCarol,41\n"
        );

        Ok(())
    }

    #[test]
    fn formatters_should_run_in_order_before_validators() -> Result<(), Box<dyn Error>> {
        let writer = CsvItemWriterBuilder::new()
            .formatter(|record: Vec<Field>| -> Vec<Field> {
                record
                    .into_iter()
                    .map(|field| Field::from(field.into_text().to_uppercase()))
                    .collect()
            })
            .formatter(|mut record: Vec<Field>| -> Vec<Field> {
                record.push(Field::from("!"));
                record
            })
            .validator("three columns", |record: &[Field]| record.len() == 3)
            .from_writer(vec![]);

        writer.insert_one(&["a", "b"])?;
        let error = writer.insert_one(&["a", "b", "c"]).unwrap_err();

        match error {
            CsvError::CannotWrite { record, validator, .. } => {
                assert_eq!(record, vec!["A", "B", "C", "!"]);
                assert_eq!(validator.as_deref(), Some("three columns"));
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(written(writer)?, "A,B,!\n");

        Ok(())
    }

    #[test]
    fn item_writer_should_write_slices() -> Result<(), Box<dyn Error>> {
        let writer = CsvItemWriterBuilder::new().from_writer(vec![]);

        let bytes = ItemWriter::write(&writer, &[vec!["a", "b"], vec!["c", "d"]])?;
        ItemWriter::<Vec<&str>>::close(&writer)?;

        assert_eq!(bytes, 8);
        assert_eq!(written(writer)?, "a,b\nc,d\n");

        Ok(())
    }
}
