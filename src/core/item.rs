use crate::error::CsvError;

/// Result of reading one item, `Ok(None)` once the document is exhausted.
pub type ItemReaderResult<I> = Result<Option<I>, CsvError>;

/// Result of writing items: the number of bytes sent to the sink.
pub type ItemWriterResult = Result<usize, CsvError>;

/// Pull based access to the items of a document, one at a time.
pub trait ItemReader<I> {
    fn read(&self) -> ItemReaderResult<I>;
}

/// Serializes items into a sink.
pub trait ItemWriter<O> {
    fn write(&self, items: &[O]) -> ItemWriterResult;

    fn flush(&self) -> Result<(), CsvError>;

    /// Writes whatever precedes the first item. Called lazily by `write` when omitted.
    fn open(&self) -> ItemWriterResult {
        Ok(0)
    }

    fn close(&self) -> Result<(), CsvError> {
        self.flush()
    }
}
