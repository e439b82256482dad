//! Typed mapping of records into user types.
//!
//! A [`Mappable`] type lists its settable [`Member`]s. A [`RecordMapper`]
//! compiles that list once against a document header: each member is bound to
//! a column, given a [`TypeCaster`](caster::TypeCaster) inferred from its Rust
//! type (or declared explicitly) and checked. Every schema problem surfaces at
//! this point as [`CsvError::MappingConstructionFailed`](crate::CsvError::MappingConstructionFailed).
//! Records are then mapped by casting and assigning each bound field, a bad
//! field failing with [`CsvError::TypeCastingFailed`](crate::CsvError::TypeCastingFailed).
//!
//! # Examples
//!
//! ```
//! use csv_document::cast_enum;
//! use csv_document::item::csv::csv_reader::CsvItemReaderBuilder;
//! use csv_document::mapping::{Mappable, Member};
//!
//! #[derive(Debug, Default, PartialEq)]
//! enum Place {
//!     #[default]
//!     Galway,
//!     Berkeley,
//! }
//!
//! cast_enum!(Place {
//!     Galway => "Galway",
//!     Berkeley => "Berkeley",
//! });
//!
//! #[derive(Debug, Default)]
//! struct Weather {
//!     temperature: f64,
//!     place: Place,
//!     tags: Vec<String>,
//! }
//!
//! impl Mappable for Weather {
//!     fn members() -> Vec<Member<Self>> {
//!         vec![
//!             Member::new("temperature", |w: &mut Self, v: f64| w.temperature = v),
//!             Member::new("place", |w: &mut Self, v: Place| w.place = v),
//!             Member::new("tags", |w: &mut Self, v: Vec<String>| w.tags = v)
//!                 .option("separator", "|"),
//!         ]
//!     }
//! }
//!
//! let reader = CsvItemReaderBuilder::new()
//!     .has_headers(true)
//!     .from_string("temperature,place,tags\n-1.5,Berkeley,cold|windy\n");
//!
//! let weather: Vec<Weather> = reader
//!     .records_as::<Weather>()
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//!
//! assert_eq!(weather[0].temperature, -1.5);
//! assert_eq!(weather[0].place, Place::Berkeley);
//! assert_eq!(weather[0].tags, ["cold", "windy"]);
//! ```

/// Built-in and user casters.
pub mod caster;

/// Compilation of a mapping schema and its application to records.
pub mod mapper;

/// Member declarations.
pub mod member;

/// Casters registered under an alias.
pub mod registry;

/// Cast values and the Rust types they are assigned to.
pub mod value;

pub use mapper::{Mappable, RecordMapper, RecordMapperBuilder};
pub use member::{EnumCase, Member, MemberType};
pub use registry::CasterRegistry;
pub use value::{CastEnum, MemberValue, Value};
