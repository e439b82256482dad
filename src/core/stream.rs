use std::io::{self, ErrorKind, Read, Seek, SeekFrom};

/// Bytes requested from the underlying reader on each refill.
const CAPACITY: usize = 8 * 1024;

/// A byte oriented document the parser pulls physical lines from.
///
/// A physical line ends with `\r\n`, `\n` or `\r`; the terminator is part of
/// the returned bytes so that enclosed fields can keep embedded line breaks.
pub trait Source {
    /// Appends the next physical line to `line` and returns the number of bytes
    /// appended, `0` meaning the end of the document.
    fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<usize>;

    /// Consumes up to `len` bytes.
    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>>;

    /// Returns up to `len` upcoming bytes without consuming them.
    fn peek(&mut self, len: usize) -> io::Result<&[u8]>;

    /// Moves the cursor to the absolute byte `position`.
    fn seek(&mut self, position: u64) -> io::Result<()>;

    fn rewind(&mut self) -> io::Result<()> {
        self.seek(0)
    }

    /// Absolute byte position of the cursor.
    fn tell(&self) -> u64;

    fn is_seekable(&self) -> bool;
}

type SeekFn<R> = fn(&mut R, u64) -> io::Result<u64>;

/// Buffered [`Source`] over any [`Read`] implementation.
///
/// Built with [`Stream::new`] the source is single pass; built with
/// [`Stream::seekable`] it can be rewound. The underlying reader is expected to
/// be positioned at the start of the document.
pub struct Stream<R> {
    inner: R,
    buffer: Vec<u8>,
    /// First unconsumed byte of `buffer`.
    start: usize,
    /// Absolute position of `buffer[start]`.
    position: u64,
    eof: bool,
    seek: Option<SeekFn<R>>,
}

impl<R: Read> Stream<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buffer: Vec::with_capacity(CAPACITY),
            start: 0,
            position: 0,
            eof: false,
            seek: None,
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn available(&self) -> usize {
        self.buffer.len() - self.start
    }

    fn consume_into(&mut self, len: usize, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.buffer[self.start..self.start + len]);
        self.start += len;
        self.position += len as u64;
    }

    /// Pulls more bytes from the reader, returns `false` at the end of the document.
    fn fill(&mut self) -> io::Result<bool> {
        if self.eof {
            return Ok(false);
        }
        if self.start > 0 {
            self.buffer.drain(..self.start);
            self.start = 0;
        }

        let len = self.buffer.len();
        self.buffer.resize(len + CAPACITY, 0);
        let read = loop {
            match self.inner.read(&mut self.buffer[len..]) {
                Ok(read) => break read,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => {
                    self.buffer.truncate(len);
                    return Err(error);
                }
            }
        };
        self.buffer.truncate(len + read);
        self.eof = read == 0;

        Ok(read > 0)
    }

    fn fill_to(&mut self, len: usize) -> io::Result<usize> {
        while self.available() < len && self.fill()? {}
        Ok(self.available().min(len))
    }
}

impl<R: Read + Seek> Stream<R> {
    pub fn seekable(inner: R) -> Self {
        let mut stream = Self::new(inner);
        stream.seek = Some(|inner, position| inner.seek(SeekFrom::Start(position)));
        stream
    }
}

impl<R: Read> Source for Stream<R> {
    fn read_line(&mut self, line: &mut Vec<u8>) -> io::Result<usize> {
        let mut total = 0;
        loop {
            let available = &self.buffer[self.start..];
            let Some(index) = available.iter().position(|b| *b == b'\n' || *b == b'\r') else {
                let len = available.len();
                self.consume_into(len, line);
                total += len;
                if !self.fill()? {
                    return Ok(total);
                }
                continue;
            };

            if available[index] == b'\n' {
                self.consume_into(index + 1, line);
                return Ok(total + index + 1);
            }

            if index + 1 < available.len() {
                let end = if available[index + 1] == b'\n' {
                    index + 2
                } else {
                    index + 1
                };
                self.consume_into(end, line);
                return Ok(total + end);
            }

            // A trailing `\r` needs one more byte to tell `\r` from `\r\n`.
            self.consume_into(index + 1, line);
            total += index + 1;
            if self.fill()? && self.buffer[self.start] == b'\n' {
                self.consume_into(1, line);
                total += 1;
            }
            return Ok(total);
        }
    }

    fn read_bytes(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let len = self.fill_to(len)?;
        let mut bytes = Vec::with_capacity(len);
        self.consume_into(len, &mut bytes);
        Ok(bytes)
    }

    fn peek(&mut self, len: usize) -> io::Result<&[u8]> {
        let len = self.fill_to(len)?;
        Ok(&self.buffer[self.start..self.start + len])
    }

    fn seek(&mut self, position: u64) -> io::Result<()> {
        match self.seek {
            Some(seek) => {
                seek(&mut self.inner, position)?;
                self.buffer.clear();
                self.start = 0;
                self.position = position;
                self.eof = false;
                Ok(())
            }
            None if position == self.position => Ok(()),
            None => Err(io::Error::new(
                ErrorKind::Unsupported,
                "the document is not seekable",
            )),
        }
    }

    fn tell(&self) -> u64 {
        self.position
    }

    fn is_seekable(&self) -> bool {
        self.seek.is_some()
    }
}
