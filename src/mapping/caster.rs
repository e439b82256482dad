use std::{collections::BTreeMap, io::Cursor, rc::Rc};

#[cfg(feature = "date")]
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

use crate::core::{
    control::ControlSet,
    parser::{RecordParser, Trim},
    stream::Stream,
};

use super::{
    member::{EnumCase, MemberType},
    value::Value,
};

/// Options attached to a member, keyed by option name.
pub type CasterOptions = BTreeMap<String, String>;

/// Converts a raw field into a [`Value`].
///
/// `None` stands for a missing or null field. Closures with the matching
/// signature are casters too.
///
/// ```
/// use csv_document::mapping::caster::TypeCaster;
/// use csv_document::mapping::value::Value;
///
/// let cents = |field: Option<&str>| -> Result<Value, String> {
///     let text = field.ok_or("missing amount")?;
///     let amount: f64 = text.parse().map_err(|_| format!("`{text}` is not an amount"))?;
///     Ok(Value::Int((amount * 100.0).round() as i64))
/// };
///
/// assert_eq!(cents.cast(Some("12.5")), Ok(Value::Int(1250)));
/// assert!(cents.cast(None).is_err());
/// ```
pub trait TypeCaster {
    fn cast(&self, field: Option<&str>) -> Result<Value, String>;

    /// Whether the caster can produce values for `member_type`.
    fn supports(&self, member_type: &MemberType) -> bool {
        let _ = member_type;
        true
    }
}

impl<F> TypeCaster for F
where
    F: Fn(Option<&str>) -> Result<Value, String>,
{
    fn cast(&self, field: Option<&str>) -> Result<Value, String> {
        self(field)
    }
}

fn required<'a>(field: Option<&'a str>, kind: &str) -> Result<&'a str, String> {
    field.ok_or_else(|| format!("null cannot be cast to {kind}"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringCaster;

impl TypeCaster for StringCaster {
    fn cast(&self, field: Option<&str>) -> Result<Value, String> {
        required(field, "string").map(|text| Value::String(text.to_string()))
    }

    fn supports(&self, member_type: &MemberType) -> bool {
        matches!(member_type, MemberType::String | MemberType::Mixed)
    }
}

/// Decimal integers, surrounding whitespace allowed.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntCaster;

impl TypeCaster for IntCaster {
    fn cast(&self, field: Option<&str>) -> Result<Value, String> {
        let text = required(field, "int")?;
        text.trim()
            .parse()
            .map(Value::Int)
            .map_err(|_| format!("`{text}` is not a valid int"))
    }

    fn supports(&self, member_type: &MemberType) -> bool {
        matches!(
            member_type,
            MemberType::Int | MemberType::Float | MemberType::Mixed
        )
    }
}

/// Finite decimal numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatCaster;

impl TypeCaster for FloatCaster {
    fn cast(&self, field: Option<&str>) -> Result<Value, String> {
        let text = required(field, "float")?;
        match text.trim().parse::<f64>() {
            Ok(number) if number.is_finite() => Ok(Value::Float(number)),
            _ => Err(format!("`{text}` is not a valid float")),
        }
    }

    fn supports(&self, member_type: &MemberType) -> bool {
        matches!(member_type, MemberType::Float | MemberType::Mixed)
    }
}

/// `1`, `true`, `on`, `yes` and `0`, `false`, `off`, `no`, the empty string,
/// case insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoolCaster;

impl TypeCaster for BoolCaster {
    fn cast(&self, field: Option<&str>) -> Result<Value, String> {
        let text = required(field, "bool")?;
        match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "on" | "yes" => Ok(Value::Bool(true)),
            "0" | "false" | "off" | "no" | "" => Ok(Value::Bool(false)),
            _ => Err(format!("`{text}` is not a valid bool")),
        }
    }

    fn supports(&self, member_type: &MemberType) -> bool {
        matches!(member_type, MemberType::Bool | MemberType::Mixed)
    }
}

/// Dates and date-times.
///
/// Without a format the caster accepts RFC 3339, `%Y-%m-%d %H:%M:%S` and
/// `%Y-%m-%d`. Texts without an offset are read in the configured timezone,
/// UTC by default.
#[cfg(feature = "date")]
#[derive(Debug, Clone)]
pub struct DateCaster {
    format: Option<String>,
    timezone: FixedOffset,
}

#[cfg(feature = "date")]
impl DateCaster {
    pub fn new(format: Option<&str>, timezone: Option<&str>) -> Result<Self, String> {
        let timezone = match timezone {
            None => utc(),
            Some(name) => parse_timezone(name)?,
        };
        Ok(Self {
            format: format.map(str::to_string),
            timezone,
        })
    }

    fn parse_with(&self, text: &str, format: &str) -> Option<DateTime<FixedOffset>> {
        if let Ok(date) = DateTime::parse_from_str(text, format) {
            return Some(date);
        }
        let naive = NaiveDateTime::parse_from_str(text, format).ok().or_else(|| {
            NaiveDate::parse_from_str(text, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
        naive.and_local_timezone(self.timezone).single()
    }
}

#[cfg(feature = "date")]
fn utc() -> FixedOffset {
    Utc.fix()
}

#[cfg(feature = "date")]
fn parse_timezone(name: &str) -> Result<FixedOffset, String> {
    if matches!(name, "UTC" | "utc" | "Z") {
        return Ok(utc());
    }
    ["%:z", "%z"]
        .iter()
        .find_map(|format| {
            let probe = format!("2000-01-01 00:00:00 {name}");
            DateTime::parse_from_str(&probe, &format!("%Y-%m-%d %H:%M:%S {format}")).ok()
        })
        .map(|date| *date.offset())
        .ok_or_else(|| format!("`{name}` is not a valid timezone offset"))
}

#[cfg(feature = "date")]
impl TypeCaster for DateCaster {
    fn cast(&self, field: Option<&str>) -> Result<Value, String> {
        let text = required(field, "date")?;
        let trimmed = text.trim();

        let date = match &self.format {
            Some(format) => self.parse_with(trimmed, format),
            None => DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .or_else(|| self.parse_with(trimmed, "%Y-%m-%d %H:%M:%S"))
                .or_else(|| self.parse_with(trimmed, "%Y-%m-%d")),
        };

        date.map(Value::Date)
            .ok_or_else(|| format!("`{text}` is not a valid date"))
    }

    fn supports(&self, member_type: &MemberType) -> bool {
        matches!(member_type, MemberType::Date | MemberType::Mixed)
    }
}

/// Which text of an enum case a field holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnumMatch {
    #[default]
    Name,
    /// The backing value.
    Value,
}

/// Enum cases matched on their exact name or backing value.
///
/// Either way the cast value is the case name.
#[derive(Debug, Clone)]
pub struct EnumCaster {
    cases: Vec<EnumCase>,
    by: EnumMatch,
}

impl EnumCaster {
    pub fn new(cases: Vec<EnumCase>) -> Self {
        Self {
            cases,
            by: EnumMatch::Name,
        }
    }

    pub fn by(mut self, by: EnumMatch) -> Self {
        self.by = by;
        self
    }

    fn key<'a>(&self, case: &'a EnumCase) -> &'a str {
        match self.by {
            EnumMatch::Name => &case.name,
            EnumMatch::Value => &case.value,
        }
    }
}

impl TypeCaster for EnumCaster {
    fn cast(&self, field: Option<&str>) -> Result<Value, String> {
        let text = required(field, "enum")?;
        match self.cases.iter().find(|case| self.key(case) == text) {
            Some(case) => Ok(Value::Enum(case.name.clone())),
            None => {
                let keys: Vec<&str> = self.cases.iter().map(|case| self.key(case)).collect();
                Err(format!("`{text}` is not one of [{}]", keys.join(", ")))
            }
        }
    }

    fn supports(&self, member_type: &MemberType) -> bool {
        matches!(member_type, MemberType::Enum(_))
    }
}

/// How an array is laid out inside a single field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArrayShape {
    /// Items split on a separator.
    #[default]
    List,
    /// Items parsed as one CSV record.
    Csv,
    /// A JSON array.
    Json,
}

/// Arrays of scalars packed into one field.
///
/// Options: `shape` (`list`, `csv` or `json`), `separator` for lists,
/// `delimiter` and `enclosure` for the csv shape and `type` (`string`, `int`,
/// `float` or `bool`) for the items.
#[derive(Debug, Clone)]
pub struct ArrayCaster {
    shape: ArrayShape,
    separator: String,
    parser: RecordParser,
    element: MemberType,
}

impl ArrayCaster {
    pub fn new(shape: ArrayShape, element: MemberType) -> Self {
        Self {
            shape,
            separator: ",".to_string(),
            parser: RecordParser::new(ControlSet::from_bytes(b',', b'"', None), Trim::None),
            element,
        }
    }

    pub(crate) fn from_options(
        element: &MemberType,
        options: &CasterOptions,
    ) -> Result<Self, String> {
        let shape = match options.get("shape").map(String::as_str) {
            None | Some("list") => ArrayShape::List,
            Some("csv") => ArrayShape::Csv,
            Some("json") => ArrayShape::Json,
            Some(other) => return Err(format!("unknown array shape `{other}`")),
        };

        let element = match options.get("type").map(String::as_str) {
            None => element.clone(),
            Some(name) => {
                let declared = match name {
                    "string" => MemberType::String,
                    "int" => MemberType::Int,
                    "float" => MemberType::Float,
                    "bool" => MemberType::Bool,
                    other => return Err(format!("unknown array item type `{other}`")),
                };
                if *element != MemberType::Mixed && *element != declared {
                    return Err(format!(
                        "the item type `{name}` conflicts with the member items of type {element}"
                    ));
                }
                declared
            }
        };
        if !matches!(
            element,
            MemberType::String
                | MemberType::Int
                | MemberType::Float
                | MemberType::Bool
                | MemberType::Mixed
        ) {
            return Err(format!("array items of type {element} are not supported"));
        }

        let mut caster = Self::new(shape, element);
        if let Some(separator) = options.get("separator") {
            if separator.is_empty() {
                return Err("the array separator cannot be empty".to_string());
            }
            caster.separator = separator.clone();
        }
        let delimiter = options.get("delimiter").map_or(",", String::as_str);
        let enclosure = options.get("enclosure").map_or("\"", String::as_str);
        let controls = ControlSet::new(delimiter, enclosure, "").map_err(|e| e.to_string())?;
        caster.parser = RecordParser::new(controls, Trim::None);

        Ok(caster)
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn controls(mut self, controls: ControlSet) -> Self {
        self.parser = RecordParser::new(controls, Trim::None);
        self
    }

    fn cast_item(&self, text: &str) -> Result<Value, String> {
        match self.element {
            MemberType::Int => IntCaster.cast(Some(text)),
            MemberType::Float => FloatCaster.cast(Some(text)),
            MemberType::Bool => BoolCaster.cast(Some(text)),
            _ => Ok(Value::String(text.to_string())),
        }
    }

    fn coerce(&self, item: Value) -> Result<Value, String> {
        match (&self.element, item) {
            (_, Value::Null) => Ok(Value::Null),
            (MemberType::Mixed, item) => Ok(item),
            (_, Value::String(text)) => self.cast_item(&text),
            (MemberType::Int, item @ Value::Int(_))
            | (MemberType::Float, item @ Value::Float(_))
            | (MemberType::Bool, item @ Value::Bool(_)) => Ok(item),
            (MemberType::Float, Value::Int(number)) => Ok(Value::Float(number as f64)),
            (MemberType::String, Value::Int(number)) => Ok(Value::String(number.to_string())),
            (MemberType::String, Value::Float(number)) => Ok(Value::String(number.to_string())),
            (MemberType::String, Value::Bool(flag)) => Ok(Value::String(flag.to_string())),
            (element, item) => Err(format!("{} cannot be cast to {element}", item.kind())),
        }
    }

    fn list(&self, text: &str) -> Result<Vec<Value>, String> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        text.split(self.separator.as_str())
            .map(|item| self.cast_item(item))
            .collect()
    }

    fn csv(&self, text: &str) -> Result<Vec<Value>, String> {
        let mut source = Stream::new(Cursor::new(text.as_bytes()));
        let record = self
            .parser
            .next_record(&mut source)
            .map_err(|e| e.to_string())?
            .unwrap_or_default();

        record
            .into_iter()
            .map(|item| match item {
                Some(text) => self.cast_item(&text),
                None => Ok(Value::Null),
            })
            .collect()
    }

    fn json(&self, text: &str) -> Result<Vec<Value>, String> {
        let items = match serde_json::from_str(text).map_err(|e| e.to_string())? {
            serde_json::Value::Array(items) => items,
            _ => return Err(format!("`{text}` is not a JSON array")),
        };

        items
            .into_iter()
            .map(|item| from_json(item).and_then(|item| self.coerce(item)))
            .collect()
    }
}

fn from_json(item: serde_json::Value) -> Result<Value, String> {
    Ok(match item {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(flag) => Value::Bool(flag),
        serde_json::Value::Number(number) => match number.as_i64() {
            Some(int) => Value::Int(int),
            None => Value::Float(number.as_f64().ok_or("unsupported JSON number")?),
        },
        serde_json::Value::String(text) => Value::String(text),
        serde_json::Value::Array(items) => {
            Value::Array(items.into_iter().map(from_json).collect::<Result<_, _>>()?)
        }
        serde_json::Value::Object(_) => return Err("JSON objects are not supported".to_string()),
    })
}

impl TypeCaster for ArrayCaster {
    fn cast(&self, field: Option<&str>) -> Result<Value, String> {
        let text = required(field, "array")?;
        let items = match self.shape {
            ArrayShape::List => self.list(text)?,
            ArrayShape::Csv => self.csv(text)?,
            ArrayShape::Json => self.json(text)?,
        };
        Ok(Value::Array(items))
    }

    fn supports(&self, member_type: &MemberType) -> bool {
        matches!(member_type, MemberType::Array(_) | MemberType::Mixed)
    }
}

/// Rejects every option but `default` and `allowed`.
pub(crate) fn check_options(options: &CasterOptions, allowed: &[&str]) -> Result<(), String> {
    match options
        .keys()
        .find(|key| key.as_str() != "default" && !allowed.contains(&key.as_str()))
    {
        Some(key) => Err(format!("unknown caster option `{key}`")),
        None => Ok(()),
    }
}

/// The built-in caster inferred from a member type.
pub(crate) fn builtin_caster(
    member_type: &MemberType,
    options: &CasterOptions,
) -> Result<Rc<dyn TypeCaster>, String> {
    let caster: Rc<dyn TypeCaster> = match member_type {
        MemberType::String => {
            check_options(options, &[])?;
            Rc::new(StringCaster)
        }
        MemberType::Int => {
            check_options(options, &[])?;
            Rc::new(IntCaster)
        }
        MemberType::Float => {
            check_options(options, &[])?;
            Rc::new(FloatCaster)
        }
        MemberType::Bool => {
            check_options(options, &[])?;
            Rc::new(BoolCaster)
        }
        #[cfg(feature = "date")]
        MemberType::Date => {
            check_options(options, &["format", "timezone"])?;
            Rc::new(DateCaster::new(
                options.get("format").map(String::as_str),
                options.get("timezone").map(String::as_str),
            )?)
        }
        MemberType::Enum(cases) => {
            check_options(options, &["by"])?;
            let by = match options.get("by").map(String::as_str) {
                None | Some("name") => EnumMatch::Name,
                Some("value") => EnumMatch::Value,
                Some(other) => return Err(format!("unknown enum match `{other}`")),
            };
            Rc::new(EnumCaster::new(cases.clone()).by(by))
        }
        MemberType::Array(element) => {
            check_options(options, &["shape", "separator", "delimiter", "enclosure", "type"])?;
            Rc::new(ArrayCaster::from_options(element, options)?)
        }
        MemberType::Custom(alias) => {
            return Err(format!("no caster is registered under the alias `{alias}`"));
        }
        MemberType::Mixed => {
            return Err("the member is untyped and has no explicit caster".to_string());
        }
    };
    Ok(caster)
}
