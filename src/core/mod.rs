//! Building blocks shared by the readers, the writers and the mapper.

/// Byte order mark detection.
pub mod bom;

/// Delimiter, enclosure and escape validation.
pub mod control;

/// Header validation and record combination.
pub mod header;

/// Item reader and writer traits.
pub mod item;

/// The RFC4180 record parser.
pub mod parser;

/// Associative records and writable fields.
pub mod record;

/// Byte sources the parser reads physical lines from.
pub mod stream;
