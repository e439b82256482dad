use std::{collections::HashMap, fmt, rc::Rc};

use crate::error::CsvError;

use super::caster::TypeCaster;

/// Names the built-in casters answer to; user aliases cannot shadow them.
const RESERVED: &[&str] = &["string", "int", "float", "bool", "date", "enum", "array", "mixed"];

/// User casters registered under an alias.
///
/// Members typed [`MemberType::Custom`](super::member::MemberType::Custom) and
/// members declared with [`Member::caster_alias`](super::member::Member::caster_alias)
/// resolve their caster here.
///
/// ```
/// use csv_document::mapping::registry::CasterRegistry;
/// use csv_document::mapping::value::Value;
///
/// let mut registry = CasterRegistry::new();
/// registry
///     .register("upper", |field: Option<&str>| -> Result<Value, String> {
///         Ok(field.map_or(Value::Null, |text| Value::String(text.to_uppercase())))
///     })
///     .unwrap();
///
/// assert!(registry.contains("upper"));
/// assert!(registry.register("int", |_: Option<&str>| -> Result<Value, String> { Ok(Value::Null) }).is_err());
/// ```
#[derive(Clone, Default)]
pub struct CasterRegistry {
    casters: HashMap<String, Rc<dyn TypeCaster>>,
}

impl CasterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `caster` under `alias`, replacing any previous caster with that alias.
    pub fn register(
        &mut self,
        alias: impl Into<String>,
        caster: impl TypeCaster + 'static,
    ) -> Result<&mut Self, CsvError> {
        let alias = alias.into();
        if alias.is_empty() {
            return Err(CsvError::InvalidArgument(
                "a caster alias cannot be empty".to_string(),
            ));
        }
        if RESERVED.contains(&alias.as_str()) {
            return Err(CsvError::InvalidArgument(format!(
                "the caster alias `{alias}` is reserved"
            )));
        }
        self.casters.insert(alias, Rc::new(caster));
        Ok(self)
    }

    pub fn unregister(&mut self, alias: &str) -> bool {
        self.casters.remove(alias).is_some()
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.casters.contains_key(alias)
    }

    pub(crate) fn get(&self, alias: &str) -> Option<Rc<dyn TypeCaster>> {
        self.casters.get(alias).cloned()
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.casters.keys().map(String::as_str)
    }
}

impl fmt::Debug for CasterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut aliases: Vec<&str> = self.aliases().collect();
        aliases.sort_unstable();
        f.debug_struct("CasterRegistry")
            .field("aliases", &aliases)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::value::Value;

    fn nothing(_: Option<&str>) -> Result<Value, String> {
        Ok(Value::Null)
    }

    #[test]
    fn aliases_should_be_registered_and_removed() {
        let mut registry = CasterRegistry::new();

        registry.register("a", nothing).unwrap().register("b", nothing).unwrap();
        assert!(registry.contains("a"));
        assert_eq!(format!("{registry:?}"), r#"CasterRegistry { aliases: ["a", "b"] }"#);

        assert!(registry.unregister("a"));
        assert!(!registry.unregister("a"));
        assert!(registry.get("a").is_none());
        assert_eq!(registry.get("b").unwrap().cast(Some("x")), Ok(Value::Null));
    }

    #[test]
    fn reserved_and_empty_aliases_should_be_rejected() {
        let mut registry = CasterRegistry::new();

        assert!(matches!(
            registry.register("", nothing),
            Err(CsvError::InvalidArgument(_))
        ));
        assert!(matches!(
            registry.register("date", nothing),
            Err(CsvError::InvalidArgument(_))
        ));
    }
}
