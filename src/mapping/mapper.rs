use std::{collections::HashSet, fmt, marker::PhantomData, rc::Rc};

use log::debug;

use crate::{
    core::{header::Header, record::Record},
    error::{short_type_name, CsvError},
};

use super::{
    caster::{builtin_caster, check_options, TypeCaster},
    member::{Binding, CasterChoice, Member, MemberType, Setter},
    registry::CasterRegistry,
    value::Value,
};

/// A type records can be mapped into.
///
/// # Examples
///
/// ```
/// use csv_document::mapping::{mapper::Mappable, member::Member};
///
/// #[derive(Debug, Default)]
/// struct Weather {
///     date: String,
///     temperature: i64,
///     place: Option<String>,
/// }
///
/// impl Mappable for Weather {
///     fn members() -> Vec<Member<Self>> {
///         vec![
///             Member::new("date", |w: &mut Self, v: String| w.date = v),
///             Member::new("temperature", |w: &mut Self, v: i64| w.temperature = v),
///             Member::new("place", |w: &mut Self, v: Option<String>| w.place = v),
///         ]
///     }
/// }
/// ```
pub trait Mappable: Default + 'static {
    /// The settable members, in assignment order.
    fn members() -> Vec<Member<Self>>;

    /// Runs once every member of a mapped record is assigned.
    fn after_mapping(&mut self) {}
}

/// One compiled member: where to read, how to cast, how to assign.
struct FieldSetter<T> {
    member: String,
    index: usize,
    caster: Rc<dyn TypeCaster>,
    nullable: bool,
    default: Option<String>,
    setter: Setter<T>,
}

/// Maps records into `T` through a schema compiled once against a header.
///
/// Every schema error is raised by the constructor, before any record is
/// read; mapping a record can then only fail on that record's values.
pub struct RecordMapper<T> {
    setters: Vec<FieldSetter<T>>,
    empty_string_as_null: bool,
}

impl<T: Mappable> RecordMapper<T> {
    /// Compiles the mapping of `T` with the default options.
    pub fn new(header: &Header) -> Result<Self, CsvError> {
        RecordMapperBuilder::new().build(header)
    }

    /// Offsets of the columns read by the mapper, in assignment order.
    pub fn columns(&self) -> Vec<usize> {
        self.setters.iter().map(|setter| setter.index).collect()
    }

    pub fn map_record(&self, record: &Record) -> Result<T, CsvError> {
        self.map_values(record.values())
    }

    /// Maps positional values, a missing offset reading as null.
    pub fn map_values(&self, values: &[Option<String>]) -> Result<T, CsvError> {
        let mut item = T::default();

        for setter in &self.setters {
            let field = values
                .get(setter.index)
                .and_then(Option::as_deref)
                .filter(|text| !(self.empty_string_as_null && text.is_empty()));
            let failed = |reason: String| CsvError::TypeCastingFailed {
                member: setter.member.clone(),
                value: field.map(str::to_string),
                reason,
            };

            let value = match field.or(setter.default.as_deref()) {
                None if setter.nullable => Value::Null,
                input => setter.caster.cast(input).map_err(failed)?,
            };
            (setter.setter)(&mut item, value).map_err(failed)?;
        }

        item.after_mapping();
        Ok(item)
    }
}

impl<T> fmt::Debug for RecordMapper<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<(&str, usize)> = self
            .setters
            .iter()
            .map(|setter| (setter.member.as_str(), setter.index))
            .collect();
        f.debug_struct("RecordMapper")
            .field("members", &members)
            .field("empty_string_as_null", &self.empty_string_as_null)
            .finish()
    }
}

/// A builder for compiling a [`RecordMapper`].
///
/// # Default Configuration
///
/// - Registry: empty
/// - Empty strings: kept as empty strings
#[derive(Debug, Default)]
pub struct RecordMapperBuilder<T> {
    registry: CasterRegistry,
    empty_string_as_null: bool,
    _item: PhantomData<T>,
}

impl<T: Mappable> RecordMapperBuilder<T> {
    pub fn new() -> Self {
        Self {
            registry: CasterRegistry::default(),
            empty_string_as_null: false,
            _item: PhantomData,
        }
    }

    pub fn registry(mut self, registry: CasterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Reads empty fields as null.
    pub fn empty_string_as_null(mut self, yes: bool) -> Self {
        self.empty_string_as_null = yes;
        self
    }

    /// Binds every member of `T` to a column of `header` and resolves its caster.
    ///
    /// # Errors
    ///
    /// [`CsvError::MappingConstructionFailed`] when a member is declared twice,
    /// carries several bindings or casters, is bound to a missing column, has
    /// no usable caster or invalid options, when a required member is left
    /// unbound, or when no member is bound at all.
    pub fn build(self, header: &Header) -> Result<RecordMapper<T>, CsvError> {
        let fail = |reason: String| CsvError::mapping::<T>(reason);
        let members = T::members();

        {
            let mut names = HashSet::with_capacity(members.len());
            if let Some(member) = members
                .iter()
                .find(|member| !names.insert(member.name.as_str()))
            {
                return Err(fail(format!(
                    "the member `{}` is declared more than once",
                    member.name
                )));
            }
        }

        let mut setters = Vec::with_capacity(members.len());
        for member in members {
            if member.ignored {
                continue;
            }
            let Some(index) = bind(&member, header).map_err(&fail)? else {
                if member.is_required() {
                    return Err(fail(format!(
                        "the required member `{}` is not bound to any column",
                        member.name
                    )));
                }
                continue;
            };

            let caster = self.resolve_caster(&member).map_err(&fail)?;
            let default = member.options.get("default").cloned();
            if let Some(text) = default.as_deref() {
                caster.cast(Some(text)).map_err(|reason| {
                    fail(format!("invalid default for the member `{}`: {reason}", member.name))
                })?;
            }

            setters.push(FieldSetter {
                member: member.name,
                index,
                caster,
                nullable: member.nullable,
                default,
                setter: member.setter,
            });
        }

        if setters.is_empty() {
            return Err(fail("no member is bound to a column".to_string()));
        }

        debug!(
            "Compiled the mapping of {} over {} member(s)",
            short_type_name::<T>(),
            setters.len()
        );

        Ok(RecordMapper {
            setters,
            empty_string_as_null: self.empty_string_as_null,
        })
    }

    fn resolve_caster(&self, member: &Member<T>) -> Result<Rc<dyn TypeCaster>, String> {
        let caster = match member.casters.as_slice() {
            [] => match &member.member_type {
                MemberType::Custom(alias) => {
                    check_options(&member.options, &[])?;
                    self.registered(alias)?
                }
                member_type => return builtin_caster(member_type, &member.options)
                    .map_err(|reason| format!("the member `{}`: {reason}", member.name)),
            },
            [choice] => {
                check_options(&member.options, &[])?;
                match choice {
                    CasterChoice::Instance(caster) => Rc::clone(caster),
                    CasterChoice::Alias(alias) => self.registered(alias)?,
                }
            }
            _ => {
                return Err(format!(
                    "the member `{}` declares more than one caster",
                    member.name
                ));
            }
        };

        if caster.supports(&member.member_type) {
            Ok(caster)
        } else {
            Err(format!(
                "the caster of the member `{}` does not support the {} type",
                member.name, member.member_type
            ))
        }
    }

    fn registered(&self, alias: &str) -> Result<Rc<dyn TypeCaster>, String> {
        self.registry
            .get(alias)
            .ok_or_else(|| format!("no caster is registered under the alias `{alias}`"))
    }
}

/// The column offset `member` reads, `None` when it stays unbound.
fn bind<T>(member: &Member<T>, header: &Header) -> Result<Option<usize>, String> {
    match member.bindings.as_slice() {
        [] => Ok(header.position(&member.name)),
        [Binding::Name(name)] if header.is_empty() => Err(format!(
            "the member `{}` is bound to the column `{name}` but the document has no header",
            member.name
        )),
        [Binding::Name(name)] => header.position(name).map(Some).ok_or_else(|| {
            format!(
                "the member `{}` is bound to the unknown column `{name}`",
                member.name
            )
        }),
        [Binding::Offset(offset)] if !header.is_empty() && *offset >= header.len() => Err(format!(
            "the member `{}` is bound to the offset {offset} outside of the header",
            member.name
        )),
        [Binding::Offset(offset)] => Ok(Some(*offset)),
        _ => Err(format!(
            "the member `{}` declares more than one column binding",
            member.name
        )),
    }
}
