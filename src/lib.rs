#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # CSV Document

 An RFC4180 CSV toolkit: a permissive record parser, a writer, header binding
 and typed record mapping, behind reader and writer builders.

 ## Core Concepts

- **RecordParser:** Turns a byte source into records. It never fails on malformed content: unbalanced enclosures close at the end of the document, stray bytes after a closing enclosure are kept.
- **ControlSet:** The delimiter, enclosure and escape characters, one byte each. Without an escape the parser follows strict RFC4180 doubled-enclosure rules.
- **Header:** The record naming the columns, validated for duplicates and empty names. Records are combined with it and always hold one value per column.
- **CsvItemReader:** The document facade. It strips the input BOM, resolves the header and exposes records, columns, pairs, slices and counts.
- **CsvItemWriter:** Serializes records with formatters, validators, an optional BOM and header line.
- **RecordMapper:** Maps records into user types through a schema compiled once per header.

 ## Features

| **Feature**   | **Description**                                               |
|---------------|---------------------------------------------------------------|
| date          | Enables the date caster and chrono date members (default)     |
| full          | Enables all available features                                |

 ## Getting Started

```rust
# use csv_document::{
#     error::CsvError,
#     item::csv::{csv_reader::CsvItemReaderBuilder, csv_writer::CsvItemWriterBuilder},
#     mapping::{Mappable, Member},
# };
#[derive(Debug, Default)]
struct Weather {
    date: String,
    temperature: i32,
    place: String,
}

impl Mappable for Weather {
    fn members() -> Vec<Member<Self>> {
        vec![
            Member::new("date", |w: &mut Self, v: String| w.date = v),
            Member::new("temperature", |w: &mut Self, v: i32| w.temperature = v),
            Member::new("place", |w: &mut Self, v: String| w.place = v),
        ]
    }
}

fn main() -> Result<(), CsvError> {
    let csv = "date,temperature,place
2011-01-01,1,Galway
2011-01-02,-1,Galway
2011-01-03,0,Galway
";

    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_string(csv);

    let writer = CsvItemWriterBuilder::new()
        .header(["place", "temperature"])
        .from_writer(vec![]);

    for weather in reader.records_as::<Weather>()? {
        let weather = weather?;
        if weather.temperature <= 0 {
            writer.insert_one(&[weather.place, weather.temperature.to_string()])?;
        }
    }

    let output = writer.into_inner()?;
    assert_eq!(output, b"place,temperature\nGalway,-1\nGalway,0\n");

    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.

 ## Contribution
 Unless you explicitly state otherwise, any contribution intentionally submitted
 for inclusion in the work by you, as defined in the Apache-2.0 license, shall be
 dual licensed as above, without any additional terms or conditions

 */

/// Parser, header, records and the item traits
pub mod core;

/// Error types for reading, writing and mapping
pub mod error;

#[doc(inline)]
pub use error::*;

/// CSV items readers and writers
pub mod item;

/// Typed mapping of records
pub mod mapping;
