//! Raw API model
//!
//! The ordered list of type and method declarations produced by the document
//! front-end. Read-only once loaded; every later stage derives from it.

use crate::error::ResolveError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

/// Name of a declared type or method.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementName(String);

impl ElementName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for ElementName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ElementName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Built-in scalar types of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Primitive {
    Integer,
    Float,
    String,
    Boolean,
}

impl Primitive {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "Integer" | "Int" => Some(Self::Integer),
            "Float" | "Float number" => Some(Self::Float),
            "String" => Some(Self::String),
            "Boolean" | "True" => Some(Self::Boolean),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::String => "String",
            Self::Boolean => "Boolean",
        }
    }
}

/// Declared type of a field, parameter or method result.
///
/// Written the way the API documentation spells it: `Integer`, `Message`,
/// `Array of Array of PhotoSize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    Primitive(Primitive),
    Reference(ElementName),
    Array(Box<FieldType>),
}

impl FieldType {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty type".to_string());
        }
        if let Some(inner) = s.strip_prefix("Array of ") {
            return Ok(Self::Array(Box::new(Self::parse(inner)?)));
        }
        if s.contains(char::is_whitespace) {
            return Err(format!("unrecognized type `{s}`"));
        }
        Ok(Primitive::parse(s).map_or_else(
            || Self::Reference(ElementName::new(s)),
            Self::Primitive,
        ))
    }

    /// The primitive this type is, if it is one directly (not inside an array).
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Self::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Innermost referenced element, looking through arrays.
    pub fn referenced(&self) -> Option<&ElementName> {
        match self {
            Self::Primitive(_) => None,
            Self::Reference(name) => Some(name),
            Self::Array(inner) => inner.referenced(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => f.write_str(p.as_str()),
            Self::Reference(name) => write!(f, "{name}"),
            Self::Array(inner) => write!(f, "Array of {inner}"),
        }
    }
}

impl TryFrom<String> for FieldType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FieldType> for String {
    fn from(ty: FieldType) -> Self {
        ty.to_string()
    }
}

/// A record member or method parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Identifier in target casing
    pub name: String,

    /// Serialized key; unique within the owning element
    pub wire_name: String,

    #[serde(rename = "type")]
    pub declared_type: FieldType,

    /// Free text; may embed hints such as tag literals
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    /// Only meaningful for optional fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

#[cfg(test)]
impl Field {
    /// A required field whose wire name equals its identifier.
    pub fn new(name: &str, declared_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            wire_name: name.to_string(),
            declared_type,
            description: String::new(),
            optional: false,
            default: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

impl Field {
    /// Same field, forced non-optional with its default cleared.
    pub fn into_required(mut self) -> Self {
        self.optional = false;
        self.default = None;
        self
    }
}

/// A declared type: either a record with fields or a union of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTypeElement", into = "RawTypeElement")]
pub struct TypeElement {
    pub name: ElementName,
    pub description: String,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Record(Vec<Field>),
    Union(Vec<ElementName>),
}

#[cfg(test)]
impl TypeElement {
    pub fn record(name: &str, fields: Vec<Field>) -> Self {
        Self {
            name: ElementName::new(name),
            description: String::new(),
            kind: TypeKind::Record(fields),
        }
    }

    pub fn union(name: &str, members: &[&str]) -> Self {
        Self {
            name: ElementName::new(name),
            description: String::new(),
            kind: TypeKind::Union(members.iter().map(|m| ElementName::new(*m)).collect()),
        }
    }
}

impl TypeElement {
    /// Fields of a record; empty for unions.
    pub fn fields(&self) -> &[Field] {
        match &self.kind {
            TypeKind::Record(fields) => fields,
            TypeKind::Union(_) => &[],
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self.kind, TypeKind::Record(_))
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().iter().find(|f| f.name == name)
    }
}

/// Wire shape of a type element: `fields` or `members`, never both.
#[derive(Serialize, Deserialize)]
struct RawTypeElement {
    name: ElementName,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<Field>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    members: Option<Vec<ElementName>>,
}

impl TryFrom<RawTypeElement> for TypeElement {
    type Error = String;

    fn try_from(raw: RawTypeElement) -> Result<Self, Self::Error> {
        let kind = match (raw.fields, raw.members) {
            (Some(_), Some(_)) => {
                return Err(format!(
                    "type `{}` declares both fields and union members",
                    raw.name
                ))
            }
            (_, Some(members)) => TypeKind::Union(members),
            (fields, None) => TypeKind::Record(fields.unwrap_or_default()),
        };
        Ok(Self {
            name: raw.name,
            description: raw.description,
            kind,
        })
    }
}

impl From<TypeElement> for RawTypeElement {
    fn from(element: TypeElement) -> Self {
        let (fields, members) = match element.kind {
            TypeKind::Record(fields) => (Some(fields), None),
            TypeKind::Union(members) => (None, Some(members)),
        };
        Self {
            name: element.name,
            description: element.description,
            fields,
            members,
        }
    }
}

/// A remote operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodElement {
    pub name: ElementName,

    #[serde(default)]
    pub parameters: Vec<Field>,

    pub returns: FieldType,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl MethodElement {
    #[cfg(test)]
    pub fn new(name: &str, parameters: Vec<Field>, returns: FieldType) -> Self {
        Self {
            name: ElementName::new(name),
            parameters,
            returns,
            description: String::new(),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Field> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// The complete raw model, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiModel {
    #[serde(default)]
    pub types: Vec<TypeElement>,

    #[serde(default)]
    pub methods: Vec<MethodElement>,
}

impl ApiModel {
    /// Load a model from disk. `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;

        let model = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON model {}", path.display()))?
        } else {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML model {}", path.display()))?
        };

        Ok(model)
    }

    pub fn type_element(&self, name: &str) -> Option<&TypeElement> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodElement> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Check the structural invariants every later stage relies on.
    pub fn validate(&self) -> Result<(), ResolveError> {
        let mut seen = BTreeSet::new();
        for element in &self.types {
            if !seen.insert(&element.name) {
                return Err(ResolveError::DuplicateElement {
                    kind: "type",
                    name: element.name.clone(),
                });
            }
        }

        let mut seen = BTreeSet::new();
        for method in &self.methods {
            if !seen.insert(&method.name) {
                return Err(ResolveError::DuplicateElement {
                    kind: "method",
                    name: method.name.clone(),
                });
            }
        }

        for element in &self.types {
            self.validate_fields(&element.name, element.fields())?;
        }

        for method in &self.methods {
            self.validate_fields(&method.name, &method.parameters)?;
            self.validate_reference(&method.name, "<returns>", &method.returns)?;
        }

        Ok(())
    }

    fn validate_fields(&self, owner: &ElementName, fields: &[Field]) -> Result<(), ResolveError> {
        let mut wire_names = BTreeSet::new();
        for field in fields {
            if !wire_names.insert(field.wire_name.as_str()) {
                return Err(ResolveError::DuplicateWireName {
                    owner: owner.clone(),
                    wire_name: field.wire_name.clone(),
                });
            }
            if !field.optional && field.default.is_some() {
                return Err(ResolveError::DefaultOnRequiredField {
                    owner: owner.clone(),
                    field: field.name.clone(),
                });
            }
            self.validate_reference(owner, &field.name, &field.declared_type)?;
        }
        Ok(())
    }

    pub(crate) fn validate_reference(
        &self,
        owner: &ElementName,
        field: &str,
        ty: &FieldType,
    ) -> Result<(), ResolveError> {
        match ty.referenced() {
            Some(target) if self.type_element(target.as_str()).is_none() => {
                Err(ResolveError::UnknownTypeReference {
                    owner: owner.clone(),
                    field: field.to_string(),
                    target: target.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}
