#[cfg(feature = "date")]
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

use super::member::MemberType;

/// A field value after casting, before it is handed to a member setter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    #[cfg(feature = "date")]
    Date(DateTime<FixedOffset>),
    /// The text of an enum case.
    Enum(String),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in cast diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::String(_) => "string",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            #[cfg(feature = "date")]
            Value::Date(_) => "date",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
        }
    }
}

fn mismatch<T>(expected: &str, value: &Value) -> Result<T, String> {
    Err(format!("expected {expected}, got {}", value.kind()))
}

/// A Rust type a record field can be assigned to.
///
/// The implementation drives caster inference: [`MemberValue::member_type`]
/// selects the built-in caster and [`MemberValue::from_value`] converts its
/// output.
pub trait MemberValue: Sized {
    fn member_type() -> MemberType;

    /// Whether a missing field may be assigned as null.
    fn nullable() -> bool {
        false
    }

    fn from_value(value: Value) -> Result<Self, String>;
}

impl MemberValue for Value {
    fn member_type() -> MemberType {
        MemberType::Mixed
    }

    fn nullable() -> bool {
        true
    }

    fn from_value(value: Value) -> Result<Self, String> {
        Ok(value)
    }
}

impl MemberValue for String {
    fn member_type() -> MemberType {
        MemberType::String
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::String(text) | Value::Enum(text) => Ok(text),
            Value::Int(number) => Ok(number.to_string()),
            Value::Float(number) => Ok(number.to_string()),
            Value::Bool(flag) => Ok(flag.to_string()),
            other => mismatch("a string", &other),
        }
    }
}

macro_rules! int_member {
    ($($ty:ty),*) => {
        $(impl MemberValue for $ty {
            fn member_type() -> MemberType {
                MemberType::Int
            }

            fn from_value(value: Value) -> Result<Self, String> {
                match value {
                    Value::Int(number) => <$ty>::try_from(number)
                        .map_err(|_| format!("{number} is out of range for {}", stringify!($ty))),
                    other => mismatch("an int", &other),
                }
            }
        })*
    };
}

int_member!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl MemberValue for f64 {
    fn member_type() -> MemberType {
        MemberType::Float
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Float(number) => Ok(number),
            Value::Int(number) => Ok(number as f64),
            other => mismatch("a float", &other),
        }
    }
}

impl MemberValue for f32 {
    fn member_type() -> MemberType {
        MemberType::Float
    }

    fn from_value(value: Value) -> Result<Self, String> {
        f64::from_value(value).map(|number| number as f32)
    }
}

impl MemberValue for bool {
    fn member_type() -> MemberType {
        MemberType::Bool
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(flag) => Ok(flag),
            other => mismatch("a bool", &other),
        }
    }
}

impl<V: MemberValue> MemberValue for Option<V> {
    fn member_type() -> MemberType {
        V::member_type()
    }

    fn nullable() -> bool {
        true
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            value => V::from_value(value).map(Some),
        }
    }
}

impl<V: MemberValue> MemberValue for Vec<V> {
    fn member_type() -> MemberType {
        MemberType::Array(Box::new(V::member_type()))
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Array(items) => items.into_iter().map(V::from_value).collect(),
            other => mismatch("an array", &other),
        }
    }
}

#[cfg(feature = "date")]
impl MemberValue for DateTime<FixedOffset> {
    fn member_type() -> MemberType {
        MemberType::Date
    }

    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Date(date) => Ok(date),
            other => mismatch("a date", &other),
        }
    }
}

#[cfg(feature = "date")]
impl MemberValue for DateTime<Utc> {
    fn member_type() -> MemberType {
        MemberType::Date
    }

    fn from_value(value: Value) -> Result<Self, String> {
        DateTime::<FixedOffset>::from_value(value).map(|date| date.with_timezone(&Utc))
    }
}

#[cfg(feature = "date")]
impl MemberValue for NaiveDateTime {
    fn member_type() -> MemberType {
        MemberType::Date
    }

    fn from_value(value: Value) -> Result<Self, String> {
        DateTime::<FixedOffset>::from_value(value).map(|date| date.naive_local())
    }
}

#[cfg(feature = "date")]
impl MemberValue for NaiveDate {
    fn member_type() -> MemberType {
        MemberType::Date
    }

    fn from_value(value: Value) -> Result<Self, String> {
        DateTime::<FixedOffset>::from_value(value).map(|date| date.date_naive())
    }
}

/// A fieldless enum whose variants are cast from their case name or backing
/// value.
///
/// Implemented through [`cast_enum!`](crate::cast_enum), which also makes the
/// enum a [`MemberValue`].
pub trait CastEnum: Sized {
    /// Names of every case, in declaration order.
    fn cases() -> &'static [&'static str];

    /// Backing values, in the order of [`CastEnum::cases`].
    fn values() -> &'static [&'static str] {
        Self::cases()
    }

    fn from_case(case: &str) -> Option<Self>;
}

/// Implements [`CastEnum`] and [`MemberValue`] for a fieldless enum.
///
/// Each variant gets a case name and, after `=`, an optional backing value.
/// Members read names unless given the `by` option set to `value`.
///
/// # Examples
///
/// ```
/// use csv_document::cast_enum;
/// use csv_document::mapping::value::{CastEnum, MemberValue, Value};
///
/// #[derive(Debug, PartialEq)]
/// enum Place {
///     Galway,
///     Berkeley,
/// }
///
/// cast_enum!(Place {
///     Galway => "Galway" = "GWY",
///     Berkeley => "Berkeley" = "BKY",
/// });
///
/// assert_eq!(Place::cases(), ["Galway", "Berkeley"]);
/// assert_eq!(Place::values(), ["GWY", "BKY"]);
/// assert_eq!(Place::from_value(Value::Enum("Berkeley".into())), Ok(Place::Berkeley));
/// ```
#[macro_export]
macro_rules! cast_enum {
    (@value $case:literal) => {
        $case
    };
    (@value $case:literal, $value:literal) => {
        $value
    };
    ($name:ident { $($variant:ident => $case:literal $(= $value:literal)?),+ $(,)? }) => {
        impl $crate::mapping::value::CastEnum for $name {
            fn cases() -> &'static [&'static str] {
                &[$($case),+]
            }

            fn values() -> &'static [&'static str] {
                &[$($crate::cast_enum!(@value $case $(, $value)?)),+]
            }

            fn from_case(case: &str) -> Option<Self> {
                match case {
                    $($case => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl $crate::mapping::value::MemberValue for $name {
            fn member_type() -> $crate::mapping::member::MemberType {
                $crate::mapping::member::MemberType::Enum(
                    <$name as $crate::mapping::value::CastEnum>::cases()
                        .iter()
                        .zip(<$name as $crate::mapping::value::CastEnum>::values())
                        .map(|(case, value)| $crate::mapping::member::EnumCase::new(*case, *value))
                        .collect(),
                )
            }

            fn from_value(value: $crate::mapping::value::Value) -> Result<Self, String> {
                match value {
                    $crate::mapping::value::Value::Enum(case)
                    | $crate::mapping::value::Value::String(case) => {
                        <$name as $crate::mapping::value::CastEnum>::from_case(&case)
                            .ok_or_else(|| {
                                format!("`{case}` is not a case of {}", stringify!($name))
                            })
                    }
                    other => Err(format!("expected an enum case, got {}", other.kind())),
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::member::EnumCase;

    #[derive(Debug, PartialEq)]
    enum Unit {
        Celsius,
        Fahrenheit,
    }

    crate::cast_enum!(Unit {
        Celsius => "Celsius" = "C",
        Fahrenheit => "Fahrenheit" = "F",
    });

    #[test]
    fn ints_should_be_range_checked() {
        assert_eq!(u8::from_value(Value::Int(255)), Ok(255));
        assert!(u8::from_value(Value::Int(256)).is_err());
        assert!(u32::from_value(Value::Int(-1)).is_err());
    }

    #[test]
    fn option_should_accept_null() {
        assert!(<Option<i64>>::nullable());
        assert_eq!(<Option<i64>>::from_value(Value::Null), Ok(None));
        assert_eq!(<Option<i64>>::from_value(Value::Int(3)), Ok(Some(3)));
        assert!(!i64::nullable());
        assert!(i64::from_value(Value::Null).is_err());
    }

    #[test]
    fn vec_should_describe_its_elements() {
        assert_eq!(
            <Vec<f64>>::member_type(),
            MemberType::Array(Box::new(MemberType::Float))
        );
        assert_eq!(
            <Vec<f64>>::from_value(Value::Array(vec![Value::Int(1), Value::Float(2.5)])),
            Ok(vec![1.0, 2.5])
        );
    }

    #[test]
    fn enum_should_be_cast_from_its_case_name() {
        assert_eq!(
            Unit::member_type(),
            MemberType::Enum(vec![
                EnumCase::new("Celsius", "C"),
                EnumCase::new("Fahrenheit", "F"),
            ])
        );
        assert_eq!(
            Unit::from_value(Value::Enum("Fahrenheit".to_string())),
            Ok(Unit::Fahrenheit)
        );
        assert_eq!(Unit::from_case("Celsius"), Some(Unit::Celsius));
        assert_eq!(Unit::values(), ["C", "F"]);
        assert!(Unit::from_value(Value::Enum("C".to_string())).is_err());
    }

    #[test]
    fn values_should_serialize_untagged() {
        let value = Value::Array(vec![Value::Int(1), Value::Null, Value::String("a".to_string())]);

        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[1,null,"a"]"#);
    }
}
