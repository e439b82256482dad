use std::{
    cell::{RefCell, RefMut},
    collections::VecDeque,
    fs::File,
    io::{Cursor, Read, Seek},
    path::Path,
    sync::Arc,
};

use log::{debug, error};

use crate::{
    core::{
        bom::ByteOrderMark,
        control::ControlSet,
        header::Header,
        item::{ItemReader, ItemReaderResult},
        parser::{RawRecord, RecordParser, Trim},
        record::{is_blank, ColumnRef, Record},
        stream::{Source, Stream},
    },
    error::CsvError,
    mapping::{Mappable, RecordMapper},
};

/// Per pass state of a [`CsvItemReader`].
#[derive(Default)]
struct ReaderState {
    /// Whether the current pass resolved its BOM and header.
    started: bool,
    /// Whether the current pass handed out at least one record.
    yielded: bool,
    header: Arc<Header>,
    /// Detected once per document, survives passes.
    bom: Option<Option<ByteOrderMark>>,
    /// Records found before the header record, waiting to be read.
    pending: VecDeque<(usize, RawRecord)>,
    /// Offset given to the next record.
    next_offset: usize,
}

impl ReaderState {
    /// Drops everything but the detected BOM.
    fn invalidate(&mut self) {
        let bom = self.bom;
        *self = ReaderState {
            bom,
            ..Default::default()
        };
    }
}

/// A CSV document reader.
///
/// The reader binds a [`Source`] to a [`RecordParser`] and exposes the document
/// as associative [`Record`]s: it strips (or keeps) the input BOM, resolves the
/// header record, skips empty records and combines every other record with the
/// header.
///
/// Reading goes through `&self` thanks to interior mutability, so the reader
/// works as an [`ItemReader`] and can serve several successive passes.
/// Passes share the source cursor: iterating the same reader from two places
/// at once interleaves their records.
///
/// Record offsets count the records the reader considers: blank records are
/// not counted unless [`CsvItemReaderBuilder::include_empty_records`] is set.
/// The header offset uses the same numbering.
///
/// # Examples
///
/// ```
/// use csv_document::item::csv::csv_reader::CsvItemReaderBuilder;
///
/// let csv = "date,temperature,place\n2011-01-01,1,Galway\n2011-01-02,-1,Galway\n";
///
/// let reader = CsvItemReaderBuilder::new()
///     .has_headers(true)
///     .from_string(csv);
///
/// let records = reader.records().collect::<Result<Vec<_>, _>>().unwrap();
///
/// assert_eq!(records.len(), 2);
/// assert_eq!(records[0].get("date"), Some("2011-01-01"));
/// assert_eq!(records[1].get("temperature"), Some("-1"));
/// assert_eq!(records[1].get("place"), Some("Galway"));
/// ```
pub struct CsvItemReader<S> {
    source: RefCell<S>,
    parser: RecordParser,
    header_offset: Option<usize>,
    include_input_bom: bool,
    include_empty_records: bool,
    state: RefCell<ReaderState>,
}

impl<S: Source> CsvItemReader<S> {
    fn new(source: S, builder: CsvItemReaderBuilder) -> Self {
        Self {
            source: RefCell::new(source),
            parser: RecordParser::new(builder.controls, builder.trim),
            header_offset: builder.header_offset,
            include_input_bom: builder.include_input_bom,
            include_empty_records: builder.include_empty_records,
            state: RefCell::new(ReaderState::default()),
        }
    }

    pub fn controls(&self) -> ControlSet {
        self.parser.controls()
    }

    pub fn header_offset(&self) -> Option<usize> {
        self.header_offset
    }

    /// Selects the header record, `None` meaning the document has no header.
    pub fn set_header_offset(&mut self, offset: Option<usize>) {
        self.header_offset = offset;
        self.state.get_mut().invalidate();
    }

    pub fn set_delimiter(&mut self, delimiter: &str) -> Result<(), CsvError> {
        let controls = self.parser.controls().with_delimiter(delimiter)?;
        self.set_controls(controls);
        Ok(())
    }

    pub fn set_enclosure(&mut self, enclosure: &str) -> Result<(), CsvError> {
        let controls = self.parser.controls().with_enclosure(enclosure)?;
        self.set_controls(controls);
        Ok(())
    }

    /// An empty `escape` switches the parser to strict RFC4180 mode.
    pub fn set_escape(&mut self, escape: &str) -> Result<(), CsvError> {
        let controls = self.parser.controls().with_escape(escape)?;
        self.set_controls(controls);
        Ok(())
    }

    pub fn set_controls(&mut self, controls: ControlSet) {
        self.parser = RecordParser::new(controls, self.parser.trim());
        self.state.get_mut().invalidate();
    }

    pub fn set_trim(&mut self, trim: Trim) {
        self.parser = RecordParser::new(self.parser.controls(), trim);
        self.state.get_mut().invalidate();
    }

    /// Keeps the input BOM bytes in front of the first field when `yes`.
    pub fn include_input_bom(&mut self, yes: bool) {
        self.include_input_bom = yes;
        self.state.get_mut().invalidate();
    }

    /// Yields blank records as all-null records instead of skipping them when `yes`.
    pub fn include_empty_records(&mut self, yes: bool) {
        self.include_empty_records = yes;
        self.state.get_mut().invalidate();
    }

    /// The BOM the document starts with, detected once and cached.
    pub fn input_bom(&self) -> Result<Option<ByteOrderMark>, CsvError> {
        let mut state = self.state.borrow_mut();
        if let Some(bom) = state.bom {
            return Ok(bom);
        }

        let mut source = self.source.borrow_mut();
        if source.tell() != 0 {
            source.rewind()?;
            state.started = false;
        }
        let bom = ByteOrderMark::detect(source.peek(ByteOrderMark::MAX_LEN)?);
        debug!("Detected input BOM: {:?}", bom);
        state.bom = Some(bom);

        Ok(bom)
    }

    /// The header record, resolved the first time it is needed.
    ///
    /// Without a header offset the header is empty.
    ///
    /// # Errors
    ///
    /// - [`CsvError::HeaderNotFound`] when the document has fewer records than the offset
    /// - [`CsvError::DuplicateOrInvalidHeaderColumns`] when the header record is invalid
    pub fn header(&self) -> Result<Header, CsvError> {
        let mut state = self.state.borrow_mut();
        if !state.started {
            self.prepare(&mut state, self.source.borrow_mut())?;
        }
        Ok(Header::clone(&state.header))
    }

    /// Starts a pass over the records, rewinding the document when a previous
    /// pass already handed out records.
    pub fn records(&self) -> Records<'_, S> {
        let mut state = self.state.borrow_mut();
        if state.yielded {
            state.started = false;
        }
        Records {
            reader: self,
            done: false,
        }
    }

    /// The record at `offset` in a fresh pass.
    pub fn nth(&self, offset: usize) -> Result<Option<Record>, CsvError> {
        self.records().nth(offset).transpose()
    }

    /// Records `offset..offset + limit` of a fresh pass.
    pub fn slice(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> impl Iterator<Item = Result<Record, CsvError>> {
        self.records()
            .skip(offset)
            .take(limit.unwrap_or(usize::MAX))
    }

    /// Number of records, the header excluded.
    pub fn count(&self) -> Result<usize, CsvError> {
        self.records()
            .try_fold(0, |count, record| record.map(|_| count + 1))
    }

    /// The values of one column, by header name or offset.
    ///
    /// Records too short to hold the column are skipped.
    pub fn fetch_column<'c>(
        &self,
        column: impl Into<ColumnRef<'c>>,
    ) -> Result<impl Iterator<Item = Result<Option<String>, CsvError>>, CsvError> {
        let index = self.column_index(column.into())?;

        Ok(self.records().filter_map(move |record| match record {
            Ok(record) => record.into_values().into_iter().nth(index).map(Ok),
            Err(error) => Some(Err(error)),
        }))
    }

    /// `(key, value)` pairs taken from two columns of every record.
    pub fn fetch_pairs<'c>(
        &self,
        key: impl Into<ColumnRef<'c>>,
        value: impl Into<ColumnRef<'c>>,
    ) -> Result<
        impl Iterator<Item = Result<(Option<String>, Option<String>), CsvError>>,
        CsvError,
    > {
        let key = self.column_index(key.into())?;
        let value = self.column_index(value.into())?;

        Ok(self.records().map(move |record| {
            let values = record?.into_values();
            let field = |index: usize| values.get(index).cloned().flatten();
            Ok((field(key), field(value)))
        }))
    }

    /// Compiles a [`RecordMapper`] for `T` against the document header.
    pub fn mapper<T: Mappable>(&self) -> Result<RecordMapper<T>, CsvError> {
        RecordMapper::new(&self.header()?)
    }

    /// Maps every record into `T`.
    ///
    /// The mapping is compiled before the first record is read, so schema
    /// errors surface even for a document without records.
    pub fn records_as<T: Mappable>(
        &self,
    ) -> Result<impl Iterator<Item = Result<T, CsvError>>, CsvError> {
        let mapper = self.mapper::<T>()?;
        Ok(self.records_with(mapper))
    }

    /// Maps every record with an already compiled mapper.
    pub fn records_with<T: Mappable>(
        &self,
        mapper: RecordMapper<T>,
    ) -> impl Iterator<Item = Result<T, CsvError>> {
        self.records()
            .map(move |record| mapper.map_record(&record?))
    }

    fn column_index(&self, column: ColumnRef<'_>) -> Result<usize, CsvError> {
        let header = self.header()?;
        match column {
            ColumnRef::Name(name) => header.position(name).ok_or_else(|| {
                CsvError::InvalidArgument(format!(
                    "the column {column} does not exist in the header"
                ))
            }),
            ColumnRef::Index(index) if !header.is_empty() && index >= header.len() => {
                Err(CsvError::InvalidArgument(format!(
                    "the column {column} is out of the header bounds"
                )))
            }
            ColumnRef::Index(index) => Ok(index),
        }
    }

    /// Rewinds the document, handles the BOM and resolves the header.
    fn prepare(&self, state: &mut ReaderState, mut source: RefMut<'_, S>) -> Result<(), CsvError> {
        if source.tell() != 0 {
            debug!("Rewinding the document");
            source.rewind().inspect_err(|e| error!("Unable to rewind the document: {}", e))?;
        }
        state.invalidate();

        let bom = match state.bom {
            Some(bom) => bom,
            None => {
                let bom = ByteOrderMark::detect(source.peek(ByteOrderMark::MAX_LEN)?);
                debug!("Detected input BOM: {:?}", bom);
                state.bom = Some(bom);
                bom
            }
        };
        if let Some(bom) = bom.filter(|_| !self.include_input_bom) {
            source.read_bytes(bom.len())?;
        }

        if let Some(offset) = self.header_offset {
            loop {
                match self.next_raw(state, &mut *source)? {
                    None => return Err(CsvError::HeaderNotFound(offset)),
                    Some((index, raw)) if index == offset => {
                        let header = Header::from_record(raw)?;
                        debug!("Resolved header at offset {}: {:?}", offset, header.names());
                        state.header = Arc::new(header);
                        break;
                    }
                    Some(entry) => state.pending.push_back(entry),
                }
            }
        }

        state.started = true;
        Ok(())
    }

    fn next_raw(
        &self,
        state: &mut ReaderState,
        source: &mut S,
    ) -> Result<Option<(usize, RawRecord)>, CsvError> {
        while let Some(raw) = self.parser.next_record(source)? {
            if !self.include_empty_records && is_blank(&raw) {
                continue;
            }
            let offset = state.next_offset;
            state.next_offset += 1;
            return Ok(Some((offset, raw)));
        }
        Ok(None)
    }
}

impl<S: Source> ItemReader<Record> for CsvItemReader<S> {
    /// Reads the next record of the current pass.
    ///
    /// # Returns
    /// - `Ok(Some(record))` if a record is successfully read
    /// - `Ok(None)` if there are no more records to read
    /// - `Err(error)` if the header cannot be resolved or the source fails
    fn read(&self) -> ItemReaderResult<Record> {
        let mut state = self.state.borrow_mut();
        if !state.started {
            self.prepare(&mut state, self.source.borrow_mut())?;
        }

        let entry = match state.pending.pop_front() {
            Some(entry) => Some(entry),
            None => self.next_raw(&mut state, &mut self.source.borrow_mut())?,
        };

        Ok(entry.map(|(offset, raw)| {
            state.yielded = true;
            Record::new(offset, Arc::clone(&state.header), raw)
        }))
    }
}

/// Iterator over the records of one pass, see [`CsvItemReader::records`].
///
/// The iterator stops after the first error.
pub struct Records<'a, S> {
    reader: &'a CsvItemReader<S>,
    done: bool,
}

impl<S: Source> Iterator for Records<'_, S> {
    type Item = Result<Record, CsvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.reader.read().transpose();
        self.done = !matches!(result, Some(Ok(_)));
        result
    }
}

/// A builder for configuring CSV document reading.
///
/// # Default Configuration
///
/// - Delimiter: comma (,)
/// - Enclosure: double quote (")
/// - Escape: backslash (\\)
/// - Trimming: none
/// - Headers: disabled
/// - Input BOM: stripped
/// - Empty records: skipped
///
/// # Examples
///
/// ```
/// use csv_document::item::csv::csv_reader::CsvItemReaderBuilder;
///
/// let reader = CsvItemReaderBuilder::new()
///     .delimiter(b';')
///     .escape(None)
///     .has_headers(true)
///     .from_reader("name;age\nAlice;30".as_bytes());
///
/// assert_eq!(reader.header().unwrap().names(), ["name", "age"]);
/// ```
#[derive(Default)]
pub struct CsvItemReaderBuilder {
    controls: ControlSet,
    trim: Trim,
    header_offset: Option<usize>,
    include_input_bom: bool,
    include_empty_records: bool,
}

impl CsvItemReaderBuilder {
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

    /// Sets the escape character, `None` for strict RFC4180 parsing.
    pub fn escape(mut self, escape: Option<u8>) -> Self {
        self.controls =
            ControlSet::from_bytes(self.controls.delimiter(), self.controls.enclosure(), escape);
        self
    }

    /// Uses control characters validated from strings, see [`ControlSet::new`].
    pub fn controls(mut self, controls: ControlSet) -> Self {
        self.controls = controls;
        self
    }

    pub fn trim(mut self, trim: Trim) -> Self {
        self.trim = trim;
        self
    }

    /// Sets whether the first record is the header.
    pub fn has_headers(mut self, yes: bool) -> Self {
        self.header_offset = yes.then_some(0);
        self
    }

    /// Uses the record at `offset` as the header. Records before it are still read.
    pub fn header_offset(mut self, offset: usize) -> Self {
        self.header_offset = Some(offset);
        self
    }

    pub fn include_input_bom(mut self, yes: bool) -> Self {
        self.include_input_bom = yes;
        self
    }

    pub fn include_empty_records(mut self, yes: bool) -> Self {
        self.include_empty_records = yes;
        self
    }

    /// Creates a single pass reader from any [`Read`] implementation.
    pub fn from_reader<R: Read>(self, rdr: R) -> CsvItemReader<Stream<R>> {
        CsvItemReader::new(Stream::new(rdr), self)
    }

    /// Creates a rewindable reader.
    pub fn from_seekable<R: Read + Seek>(self, rdr: R) -> CsvItemReader<Stream<R>> {
        CsvItemReader::new(Stream::seekable(rdr), self)
    }

    /// Creates a rewindable reader over an in-memory document.
    pub fn from_string<T: Into<String>>(
        self,
        document: T,
    ) -> CsvItemReader<Stream<Cursor<Vec<u8>>>> {
        self.from_seekable(Cursor::new(document.into().into_bytes()))
    }

    /// Creates a rewindable reader over a file.
    pub fn from_path<P: AsRef<Path>>(
        self,
        path: P,
    ) -> Result<CsvItemReader<Stream<File>>, CsvError> {
        let file_path = path.as_ref();
        let file = File::open(file_path).inspect_err(|e| {
            error!("Failed to open CSV file {}: {}", file_path.display(), e);
        })?;

        Ok(self.from_seekable(file))
    }

    pub fn from_source<S: Source>(self, source: S) -> CsvItemReader<S> {
        CsvItemReader::new(source, self)
    }
}
