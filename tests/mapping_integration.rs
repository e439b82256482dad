use std::error::Error;

use csv_document::{
    cast_enum,
    error::CsvError,
    item::csv::csv_reader::CsvItemReaderBuilder,
    mapping::{
        caster::BoolCaster, CasterRegistry, Mappable, Member, MemberType, MemberValue,
        RecordMapperBuilder, Value,
    },
};

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum Place {
    #[default]
    Galway,
    Berkeley,
}

cast_enum!(Place {
    Galway => "Galway",
    Berkeley => "Berkeley",
});

#[derive(Debug, Default, PartialEq)]
struct Weather {
    temperature: f64,
    place: Place,
    note: Option<String>,
    freezing: bool,
}

impl Mappable for Weather {
    fn members() -> Vec<Member<Self>> {
        vec![
            Member::new("temperature", |w: &mut Self, v: f64| w.temperature = v),
            Member::new("place", |w: &mut Self, v: Place| w.place = v),
            Member::new("note", |w: &mut Self, v: Option<String>| w.note = v),
            Member::new("freezing", |w: &mut Self, v: bool| w.freezing = v).ignore(),
        ]
    }

    fn after_mapping(&mut self) {
        self.freezing = self.temperature <= 0.0;
    }
}

#[test]
fn records_should_map_into_enums_and_options() -> Result<(), Box<dyn Error>> {
    let _ = env_logger::builder().is_test(true).try_init();

    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_string("temperature,place,note\n1,Galway,sunny\n-1.5,Berkeley\n");

    let weather = reader
        .records_as::<Weather>()?
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(
        weather,
        vec![
            Weather {
                temperature: 1.0,
                place: Place::Galway,
                note: Some("sunny".to_string()),
                freezing: false,
            },
            Weather {
                temperature: -1.5,
                place: Place::Berkeley,
                note: None,
                freezing: true,
            },
        ]
    );

    Ok(())
}

#[test]
fn unknown_enum_case_should_fail_the_record() {
    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_string("temperature,place\n3,Dublin\n");

    let result = reader.records_as::<Weather>().unwrap().next();

    assert!(matches!(
        result,
        Some(Err(CsvError::TypeCastingFailed { member, .. })) if member == "place"
    ));
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum Sky {
    #[default]
    Clear,
    Overcast,
}

cast_enum!(Sky {
    Clear => "Clear" = "CLR",
    Overcast => "Overcast" = "OVC",
});

#[derive(Debug, Default)]
struct Observation {
    reported: Sky,
    coded: Sky,
}

impl Mappable for Observation {
    fn members() -> Vec<Member<Self>> {
        vec![
            Member::new("reported", |o: &mut Self, v: Sky| o.reported = v),
            Member::new("coded", |o: &mut Self, v: Sky| o.coded = v).option("by", "value"),
        ]
    }
}

#[test]
fn enums_should_map_by_name_or_backing_value() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_string("reported,coded
Overcast,OVC
Clear,CLR
CLR,Clear
");

    let results: Vec<_> = reader.records_as::<Observation>()?.collect();

    let first = results[0].as_ref().unwrap();
    assert_eq!((first.reported, first.coded), (Sky::Overcast, Sky::Overcast));
    let second = results[1].as_ref().unwrap();
    assert_eq!((second.reported, second.coded), (Sky::Clear, Sky::Clear));
    assert!(matches!(
        &results[2],
        Err(CsvError::TypeCastingFailed { member, .. }) if member == "reported"
    ));

    Ok(())
}

#[cfg(feature = "date")]
mod dates {
    use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

    use super::*;

    #[derive(Debug, Default)]
    struct Reading {
        day: Option<NaiveDate>,
        at: Option<DateTime<FixedOffset>>,
    }

    impl Mappable for Reading {
        fn members() -> Vec<Member<Self>> {
            vec![
                Member::new("day", |r: &mut Self, v: NaiveDate| r.day = Some(v))
                    .option("format", "%d/%m/%Y"),
                Member::new("at", |r: &mut Self, v: DateTime<FixedOffset>| r.at = Some(v))
                    .option("timezone", "+01:00"),
            ]
        }
    }

    #[test]
    fn dates_should_follow_format_and_timezone() -> Result<(), Box<dyn Error>> {
        let reader = CsvItemReaderBuilder::new()
            .has_headers(true)
            .from_string("day,at\n02/01/2011,2011-01-02 06:30:00\n");

        let reading = reader.records_as::<Reading>()?.next().unwrap()?;

        assert_eq!(reading.day, NaiveDate::from_ymd_opt(2011, 1, 2));
        let offset = FixedOffset::east_opt(3600).unwrap();
        assert_eq!(
            reading.at,
            offset.with_ymd_and_hms(2011, 1, 2, 6, 30, 0).single()
        );

        Ok(())
    }

    #[test]
    fn invalid_timezone_should_fail_the_construction() {
        #[derive(Debug, Default)]
        struct Broken {
            at: Option<DateTime<FixedOffset>>,
        }

        impl Mappable for Broken {
            fn members() -> Vec<Member<Self>> {
                vec![Member::new("at", |b: &mut Self, v: DateTime<FixedOffset>| b.at = Some(v))
                    .option("timezone", "Mars/Olympus")]
            }
        }

        let reader = CsvItemReaderBuilder::new()
            .has_headers(true)
            .from_string("at\n");

        assert!(matches!(
            reader.records_as::<Broken>(),
            Err(CsvError::MappingConstructionFailed { .. })
        ));
    }
}

#[derive(Debug, Default)]
struct Series {
    readings: Vec<f64>,
    labels: Vec<String>,
    flags: Vec<bool>,
}

impl Mappable for Series {
    fn members() -> Vec<Member<Self>> {
        vec![
            Member::new("readings", |s: &mut Self, v: Vec<f64>| s.readings = v)
                .option("shape", "json"),
            Member::new("labels", |s: &mut Self, v: Vec<String>| s.labels = v)
                .option("shape", "csv")
                .option("delimiter", ";"),
            Member::new("flags", |s: &mut Self, v: Vec<bool>| s.flags = v)
                .option("separator", "|"),
        ]
    }
}

#[test]
fn arrays_should_be_unpacked_from_one_field() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_string(
            "readings,labels,flags\n\"[1, 2.5, 3]\",\"cold;\"\"very windy\"\"\",yes|no|on\n",
        );

    let series = reader.records_as::<Series>()?.next().unwrap()?;

    assert_eq!(series.readings, vec![1.0, 2.5, 3.0]);
    assert_eq!(series.labels, vec!["cold", "very windy"]);
    assert_eq!(series.flags, vec![true, false, true]);

    Ok(())
}

/// An amount stored in cents.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct Money(i64);

impl MemberValue for Money {
    fn member_type() -> MemberType {
        MemberType::Custom("money".to_string())
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Int(cents) => Ok(Money(cents)),
            other => Err(format!("expected cents, got {}", other.kind())),
        }
    }
}

#[derive(Debug, Default)]
struct Invoice {
    customer: String,
    total: Money,
    paid: bool,
}

impl Mappable for Invoice {
    fn members() -> Vec<Member<Self>> {
        vec![
            Member::new("customer", |i: &mut Self, v: String| i.customer = v),
            Member::new("total", |i: &mut Self, v: Money| i.total = v),
            Member::new("paid", |i: &mut Self, v: bool| i.paid = v).caster(BoolCaster),
        ]
    }
}

fn money_registry() -> CasterRegistry {
    let mut registry = CasterRegistry::new();
    registry
        .register("money", |field: Option<&str>| -> Result<Value, String> {
            let text = field.ok_or("missing amount")?;
            let amount: f64 = text
                .trim_start_matches('$')
                .parse()
                .map_err(|_| format!("`{text}` is not an amount"))?;
            Ok(Value::Int((amount * 100.0).round() as i64))
        })
        .unwrap();
    registry
}

#[test]
fn custom_types_should_use_the_registry() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_string("customer,total,paid\nACME,$12.50,yes\nInitech,$3,no\n");

    let mapper = RecordMapperBuilder::<Invoice>::new()
        .registry(money_registry())
        .build(&reader.header()?)?;
    let invoices = reader
        .records_with(mapper)
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(invoices[0].customer, "ACME");
    assert_eq!(invoices[0].total, Money(1250));
    assert!(invoices[0].paid);
    assert_eq!(invoices[1].total, Money(300));
    assert!(!invoices[1].paid);

    assert!(matches!(
        reader.records_as::<Invoice>(),
        Err(CsvError::MappingConstructionFailed { .. })
    ));

    Ok(())
}

#[derive(Debug, Default)]
struct Station {
    name: String,
    elevation: Option<i64>,
    comment: Option<String>,
}

impl Mappable for Station {
    fn members() -> Vec<Member<Self>> {
        vec![
            Member::new("name", |s: &mut Self, v: String| s.name = v).offset(0),
            Member::new("elevation", |s: &mut Self, v: Option<i64>| s.elevation = v).offset(1),
            Member::new("comment", |s: &mut Self, v: Option<String>| s.comment = v).offset(2),
        ]
    }
}

#[test]
fn empty_strings_should_read_as_null_on_demand() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new().from_string("Mace Head,,\n");

    let station = reader.records_as::<Station>()?.next().unwrap();
    assert!(matches!(
        station,
        Err(CsvError::TypeCastingFailed { member, .. }) if member == "elevation"
    ));

    let mapper = RecordMapperBuilder::<Station>::new()
        .empty_string_as_null(true)
        .build(&reader.header()?)?;
    let station = reader.records_with(mapper).next().unwrap()?;

    assert_eq!(station.name, "Mace Head");
    assert_eq!(station.elevation, None);
    assert_eq!(station.comment, None);

    Ok(())
}

#[test]
fn positional_members_should_map_without_header() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new().from_string("Mace Head,5,clean air\nValentia\n");

    let stations = reader
        .records_as::<Station>()?
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(stations.len(), 2);
    assert_eq!(stations[0].elevation, Some(5));
    assert_eq!(stations[0].comment.as_deref(), Some("clean air"));
    assert_eq!(stations[1].name, "Valentia");
    assert_eq!(stations[1].elevation, None);
    assert_eq!(stations[1].comment, None);

    Ok(())
}

#[derive(Debug, Default)]
struct Sample {
    site: String,
    depth: i64,
    unit: String,
}

impl Mappable for Sample {
    fn members() -> Vec<Member<Self>> {
        vec![
            Member::new("site", |s: &mut Self, v: String| s.site = v),
            Member::new("depth", |s: &mut Self, v: i64| s.depth = v).option("default", "10"),
            Member::new("unit", |s: &mut Self, v: String| s.unit = v).with_default(),
        ]
    }
}

#[test]
fn defaults_should_fill_missing_fields() -> Result<(), Box<dyn Error>> {
    let reader = CsvItemReaderBuilder::new()
        .has_headers(true)
        .from_string("site,depth\nA,3\nB\n");

    let samples = reader
        .records_as::<Sample>()?
        .collect::<Result<Vec<_>, _>>()?;

    assert_eq!(samples[0].depth, 3);
    assert_eq!(samples[1].site, "B");
    assert_eq!(samples[1].depth, 10);
    assert_eq!(samples[1].unit, "");

    Ok(())
}
