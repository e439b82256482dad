use std::fmt;

/// A byte order mark recognised at the very start of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrderMark {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

impl ByteOrderMark {
    /// Detection order matters: the UTF-32 LE sequence starts with the UTF-16 LE one.
    const ALL: [ByteOrderMark; 5] = [
        ByteOrderMark::Utf32Le,
        ByteOrderMark::Utf32Be,
        ByteOrderMark::Utf8,
        ByteOrderMark::Utf16Le,
        ByteOrderMark::Utf16Be,
    ];

    /// The longest sequence, i.e. how many bytes `detect` needs to look at.
    pub const MAX_LEN: usize = 4;

    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            ByteOrderMark::Utf8 => b"\xEF\xBB\xBF",
            ByteOrderMark::Utf16Le => b"\xFF\xFE",
            ByteOrderMark::Utf16Be => b"\xFE\xFF",
            ByteOrderMark::Utf32Le => b"\xFF\xFE\x00\x00",
            ByteOrderMark::Utf32Be => b"\x00\x00\xFE\xFF",
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns the mark `buffer` starts with, if any.
    ///
    /// ```
    /// use csv_document::core::bom::ByteOrderMark;
    ///
    /// assert_eq!(ByteOrderMark::detect(b"\xEF\xBB\xBFa,b"), Some(ByteOrderMark::Utf8));
    /// assert_eq!(ByteOrderMark::detect(b"\xFF\xFE\x00\x00"), Some(ByteOrderMark::Utf32Le));
    /// assert_eq!(ByteOrderMark::detect(b"a,b"), None);
    /// ```
    pub fn detect(buffer: &[u8]) -> Option<ByteOrderMark> {
        Self::ALL
            .into_iter()
            .find(|bom| buffer.starts_with(bom.as_bytes()))
    }

    /// Strips the detected mark from the start of `buffer`.
    pub fn strip(buffer: &[u8]) -> &[u8] {
        match Self::detect(buffer) {
            Some(bom) => &buffer[bom.len()..],
            None => buffer,
        }
    }
}

impl fmt::Display for ByteOrderMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ByteOrderMark::Utf8 => "UTF-8",
            ByteOrderMark::Utf16Le => "UTF-16LE",
            ByteOrderMark::Utf16Be => "UTF-16BE",
            ByteOrderMark::Utf32Le => "UTF-32LE",
            ByteOrderMark::Utf32Be => "UTF-32BE",
        };
        f.write_str(name)
    }
}
