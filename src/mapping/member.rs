use std::{collections::BTreeMap, fmt, rc::Rc};

use super::{
    caster::TypeCaster,
    value::{MemberValue, Value},
};

/// The declared type of a member, as seen by caster inference.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberType {
    String,
    Int,
    Float,
    Bool,
    #[cfg(feature = "date")]
    Date,
    /// An enum and its cases.
    Enum(Vec<EnumCase>),
    Array(Box<MemberType>),
    /// A type cast by the registry caster registered under this alias.
    Custom(String),
    /// Any value; needs an explicit caster.
    Mixed,
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberType::String => f.write_str("string"),
            MemberType::Int => f.write_str("int"),
            MemberType::Float => f.write_str("float"),
            MemberType::Bool => f.write_str("bool"),
            #[cfg(feature = "date")]
            MemberType::Date => f.write_str("date"),
            MemberType::Enum(_) => f.write_str("enum"),
            MemberType::Array(element) => write!(f, "array<{element}>"),
            MemberType::Custom(alias) => write!(f, "custom `{alias}`"),
            MemberType::Mixed => f.write_str("mixed"),
        }
    }
}

/// One case of an enum member: its name and the backing value it is stored as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumCase {
    pub name: String,
    pub value: String,
}

impl EnumCase {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// A case whose backing value is its name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            value: name.clone(),
            name,
        }
    }
}

/// An explicit column binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Name(String),
    Offset(usize),
}

#[derive(Clone)]
pub(crate) enum CasterChoice {
    Instance(Rc<dyn TypeCaster>),
    Alias(String),
}

pub(crate) type Setter<T> = Box<dyn Fn(&mut T, Value) -> Result<(), String>>;

/// One settable member of a [`Mappable`](super::mapper::Mappable) type.
///
/// The member is bound to the header column carrying its name unless an
/// explicit [`column`](Member::column) or [`offset`](Member::offset) is given.
///
/// ```
/// use csv_document::mapping::member::Member;
///
/// #[derive(Default)]
/// struct Weather {
///     temperature: f64,
///     place: Option<String>,
/// }
///
/// let members: Vec<Member<Weather>> = vec![
///     Member::new("temperature", |weather: &mut Weather, value: f64| {
///         weather.temperature = value
///     })
///         .offset(1),
///     Member::new("place", |weather: &mut Weather, value: Option<String>| {
///         weather.place = value
///     }),
/// ];
/// assert_eq!(members[1].name(), "place");
/// ```
pub struct Member<T> {
    pub(crate) name: String,
    pub(crate) member_type: MemberType,
    pub(crate) nullable: bool,
    pub(crate) bindings: Vec<Binding>,
    pub(crate) casters: Vec<CasterChoice>,
    pub(crate) options: BTreeMap<String, String>,
    pub(crate) has_default: bool,
    pub(crate) ignored: bool,
    pub(crate) setter: Setter<T>,
}

impl<T: 'static> Member<T> {
    /// Declares a member whose type is inferred from the setter argument.
    pub fn new<V, F>(name: impl Into<String>, setter: F) -> Self
    where
        V: MemberValue + 'static,
        F: Fn(&mut T, V) + 'static,
    {
        Self {
            name: name.into(),
            member_type: V::member_type(),
            nullable: V::nullable(),
            bindings: Vec::new(),
            casters: Vec::new(),
            options: BTreeMap::new(),
            has_default: false,
            ignored: false,
            setter: Box::new(move |item: &mut T, value: Value| {
                setter(item, V::from_value(value)?);
                Ok(())
            }),
        }
    }
}

impl<T> Member<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn member_type(&self) -> &MemberType {
        &self.member_type
    }

    /// Binds the member to the header column `name`.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.bindings.push(Binding::Name(name.into()));
        self
    }

    /// Binds the member to the zero-based field `offset`.
    pub fn offset(mut self, offset: usize) -> Self {
        self.bindings.push(Binding::Offset(offset));
        self
    }

    pub fn caster(mut self, caster: impl TypeCaster + 'static) -> Self {
        self.casters.push(CasterChoice::Instance(Rc::new(caster)));
        self
    }

    /// Casts with the caster registered under `alias`.
    pub fn caster_alias(mut self, alias: impl Into<String>) -> Self {
        self.casters.push(CasterChoice::Alias(alias.into()));
        self
    }

    /// Sets a built-in caster option such as `default`, `format` or `shape`.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// The member keeps its `Default` value when left unbound.
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Excludes the member from the mapping.
    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    /// Whether the member must be bound to a column.
    pub(crate) fn is_required(&self) -> bool {
        !self.ignored
            && !self.nullable
            && !self.has_default
            && !self.options.contains_key("default")
    }
}

impl<T> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("member_type", &self.member_type)
            .field("bindings", &self.bindings)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Weather {
        temperature: i64,
        place: Option<String>,
    }

    #[test]
    fn member_type_should_be_inferred_from_the_setter() {
        let temperature = Member::new("temperature", |w: &mut Weather, v: i64| w.temperature = v);
        let place = Member::new("place", |w: &mut Weather, v: Option<String>| w.place = v);

        assert_eq!(temperature.member_type(), &MemberType::Int);
        assert!(temperature.is_required());
        assert_eq!(place.member_type(), &MemberType::String);
        assert!(!place.is_required());
    }

    #[test]
    fn defaults_and_ignored_members_should_not_be_required() {
        let member = || Member::new("temperature", |w: &mut Weather, v: i64| w.temperature = v);

        assert!(!member().with_default().is_required());
        assert!(!member().option("default", "0").is_required());
        assert!(!member().ignore().is_required());
    }

    #[test]
    fn setter_should_convert_the_value() {
        let member = Member::new("temperature", |w: &mut Weather, v: i64| w.temperature = v);
        let mut weather = Weather::default();

        (member.setter)(&mut weather, Value::Int(-3)).unwrap();
        assert_eq!(weather.temperature, -3);
        assert!((member.setter)(&mut weather, Value::Bool(true)).is_err());
    }

    #[test]
    fn bindings_should_accumulate() {
        let member = Member::new("place", |w: &mut Weather, v: Option<String>| w.place = v)
            .column("city")
            .offset(2);

        assert_eq!(
            member.bindings,
            vec![Binding::Name("city".to_string()), Binding::Offset(2)]
        );
    }

    #[test]
    fn member_types_should_display() {
        let array = MemberType::Array(Box::new(MemberType::Int));

        assert_eq!(array.to_string(), "array<int>");
        assert_eq!(MemberType::Custom("money".to_string()).to_string(), "custom `money`");
    }
}
