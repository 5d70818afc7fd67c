//! Wrapper types for primitive identifiers
//!
//! Assigns each primitive field the first matching wrapper type from the
//! value-type table, so that unrelated identifiers (chat ids, message ids,
//! file ids) cannot be mixed up in the generated library.

use crate::config::ValueTypeRule;
use crate::schema::{ApiModel, ElementName, Field, FieldType, Primitive};
use crate::variations::ExpandedMethod;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// The type a renderer should use for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectiveType<'a> {
    Wrapper(&'static str),
    Raw(&'a FieldType),
}

impl fmt::Display for EffectiveType<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wrapper(name) => f.write_str(name),
            Self::Raw(ty) => write!(f, "{ty}"),
        }
    }
}

/// A wrapper type that at least one field resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrapperType {
    pub name: &'static str,
    pub backing: Primitive,
    pub doc: &'static str,
}

/// Wrapper type per field, keyed by owner and wire name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValueTypeAssignment {
    pub fields: BTreeMap<ElementName, BTreeMap<String, &'static str>>,
    /// Wrappers in use, in table order
    pub wrappers: Vec<WrapperType>,
}

impl ValueTypeAssignment {
    pub fn wrapper(&self, owner: &ElementName, wire_name: &str) -> Option<&'static str> {
        self.fields.get(owner)?.get(wire_name).copied()
    }

    /// Wrapper type if one was assigned, the declared type otherwise.
    pub fn effective_type<'a>(&self, owner: &ElementName, field: &'a Field) -> EffectiveType<'a> {
        self.wrapper(owner, &field.wire_name)
            .map_or(EffectiveType::Raw(&field.declared_type), EffectiveType::Wrapper)
    }
}

/// First rule, in table order, whose backing primitive and predicate both match.
pub fn resolve(
    rules: &[ValueTypeRule],
    owner: &ElementName,
    field: &Field,
) -> Option<&'static str> {
    let primitive = field.declared_type.as_primitive()?;
    rules
        .iter()
        .find(|rule| rule.backing == primitive && (rule.predicate)(owner, field))
        .map(|rule| rule.name)
}

/// Resolve every record field and every expanded method parameter.
pub fn assign(
    model: &ApiModel,
    methods: &[ExpandedMethod],
    rules: &[ValueTypeRule],
) -> ValueTypeAssignment {
    let mut fields: BTreeMap<ElementName, BTreeMap<String, &'static str>> = BTreeMap::new();

    let owners = model
        .types
        .iter()
        .map(|t| (&t.name, t.fields()))
        .chain(
            methods
                .iter()
                .map(|m| (&m.method.name, m.method.parameters.as_slice())),
        );

    for (owner, owner_fields) in owners {
        for field in owner_fields {
            if let Some(wrapper) = resolve(rules, owner, field) {
                tracing::trace!(%owner, field = %field.wire_name, wrapper, "assigned wrapper type");
                fields
                    .entry(owner.clone())
                    .or_default()
                    .insert(field.wire_name.clone(), wrapper);
            }
        }
    }

    let wrappers = rules
        .iter()
        .filter(|rule| {
            fields
                .values()
                .any(|assigned| assigned.values().any(|name| *name == rule.name))
        })
        .map(|rule| WrapperType {
            name: rule.name,
            backing: rule.backing,
            doc: rule.doc,
        })
        .collect();

    ValueTypeAssignment { fields, wrappers }
}
