//! CSV document reading and writing.
//!
//! # Module Architecture
//!
//! The CSV module consists of three components:
//!
//! 1. **CsvItemReader**: reads a document record by record. It strips the
//!    input BOM, binds the header record and combines every other record with
//!    it. Beyond plain iteration it extracts columns and pairs, slices, counts
//!    and maps records into user types.
//!
//! 2. **CsvItemWriter**: serializes records into lines, enclosing fields only
//!    when necessary (or always), after running the registered formatters and
//!    validators.
//!
//! 3. **EscapeFormula**: a writer formatter that neutralizes spreadsheet
//!    formulas.
//!
//! Both the reader and the writer follow the builder pattern and implement
//! the [`ItemReader`](crate::core::item::ItemReader) and
//! [`ItemWriter`](crate::core::item::ItemWriter) traits.
//!
//! # Sources and Passes
//!
//! Readers built from a [`Read`](std::io::Read) implementation are single
//! pass: the document can be iterated once, and asking for a second pass
//! fails with an I/O error. Readers built from a string, a path or a
//! [`Seek`](std::io::Seek) implementation rewind on every new pass.
//!
//! # Examples
//!
//! ## Reading from CSV
//!
//! ```
//! use csv_document::item::csv::csv_reader::CsvItemReaderBuilder;
//! use csv_document::core::item::ItemReader;
//!
//! let csv_data = "\
//! city,country,pop
//! Boston,United States,4628910
//! \"Concord\nMA\",United States,42695
//! ";
//!
//! let reader = CsvItemReaderBuilder::new()
//!     .has_headers(true)
//!     .delimiter(b',')
//!     .from_reader(csv_data.as_bytes());
//!
//! let mut cities = Vec::new();
//! while let Some(record) = reader.read().unwrap() {
//!     cities.push(record);
//! }
//!
//! assert_eq!(cities.len(), 2);
//! assert_eq!(cities[0].get("city"), Some("Boston"));
//! assert_eq!(cities[1].get("city"), Some("Concord\nMA"));
//! assert_eq!(cities[1].get("pop"), Some("42695"));
//! ```
//!
//! ## Writing to CSV
//!
//! ```
//! use csv_document::item::csv::csv_writer::{CsvItemWriterBuilder, Enclosure};
//!
//! let writer = CsvItemWriterBuilder::new()
//!     .delimiter(b';')
//!     .newline("\r\n")
//!     .enclose(Enclosure::Always)
//!     .from_writer(vec![]);
//!
//! let bytes = writer.insert_all(&[["Boston", "4628910"], ["Concord", "42695"]]).unwrap();
//!
//! let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
//! assert_eq!(data, "\"Boston\";\"4628910\"\r\n\"Concord\";\"42695\"\r\n");
//! assert_eq!(bytes, data.len());
//! ```
//!
//! ## Round trip
//!
//! ```
//! use csv_document::item::csv::csv_reader::CsvItemReaderBuilder;
//! use csv_document::item::csv::csv_writer::CsvItemWriterBuilder;
//!
//! let writer = CsvItemWriterBuilder::new().from_writer(vec![]);
//! writer.insert_one(&["say \"hi\"", "a,b", "two\nlines"]).unwrap();
//! let data = String::from_utf8(writer.into_inner().unwrap()).unwrap();
//!
//! let reader = CsvItemReaderBuilder::new().from_string(data);
//! let record = reader.nth(0).unwrap().unwrap();
//! assert_eq!(record.get(0usize), Some("say \"hi\""));
//! assert_eq!(record.get(1usize), Some("a,b"));
//! assert_eq!(record.get(2usize), Some("two\nlines"));
//! ```

/// A module providing facilities for reading CSV documents.
pub mod csv_reader;

/// A module providing facilities for writing CSV documents.
pub mod csv_writer;

/// Record formatters for the writer.
pub mod formatter;
