use thiserror::Error;

#[derive(Error, Debug)]
/// Errors raised while reading, writing or mapping CSV documents.
///
/// Malformed CSV content is never an error: the parser recovers permissively.
pub enum CsvError {
    /// A delimiter, enclosure or escape is not exactly one byte.
    #[error("the {name} character must be a single byte, got {value:?}")]
    InvalidControlCharacter { name: &'static str, value: String },

    /// The configured header offset is past the last record.
    #[error("the header record does not exist at offset {0}")]
    HeaderNotFound(usize),

    /// The header record holds duplicated names or non string columns.
    #[error(
        "the header record contains duplicate names [{}] or invalid columns at offsets {invalid:?}",
        .duplicates.join(", ")
    )]
    DuplicateOrInvalidHeaderColumns {
        duplicates: Vec<String>,
        invalid: Vec<usize>,
    },

    /// The destination type cannot be mapped against the header.
    #[error("mapping construction failed for `{target}`: {reason}")]
    MappingConstructionFailed { target: String, reason: String },

    /// One field of one record could not be cast for its member.
    #[error("unable to cast {value:?} into the `{member}` member: {reason}")]
    TypeCastingFailed {
        member: String,
        value: Option<String>,
        reason: String,
    },

    /// The sink rejected the record or a validator refused it.
    #[error("unable to write record {record:?}: {reason}")]
    CannotWrite {
        record: Vec<String>,
        validator: Option<String>,
        reason: String,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CsvError {
    pub(crate) fn mapping<T: ?Sized>(reason: impl Into<String>) -> Self {
        CsvError::MappingConstructionFailed {
            target: short_type_name::<T>().to_string(),
            reason: reason.into(),
        }
    }
}

/// Last path segment of a type name, `my_crate::model::Weather` → `Weather`.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let type_str = std::any::type_name::<T>();
    let base = type_str.split('<').next().unwrap_or(type_str);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Weather;

    #[test]
    fn short_type_name_should_strip_the_module_path() {
        assert_eq!(short_type_name::<Weather>(), "Weather");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }

    #[test]
    fn header_error_should_list_duplicates() {
        let error = CsvError::DuplicateOrInvalidHeaderColumns {
            duplicates: vec!["a".to_string(), "b".to_string()],
            invalid: vec![3],
        };

        assert_eq!(
            error.to_string(),
            "the header record contains duplicate names [a, b] or invalid columns at offsets [3]"
        );
    }
}
