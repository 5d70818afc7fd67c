//! Union hierarchy resolution
//!
//! Finds the polymorphic parents of the model and decides, once per
//! hierarchy, how a payload selects its member:
//!
//! - **Tagged**: every member carries the same recognized tag field
//!   (`type`, `status`, ...) and its description names the literal value.
//! - **Structural**: no shared tag field; each member is recognized by the
//!   first of its keys that no sibling uses.
//!
//! The incoming-event envelope is a flat record whose optional fields are
//! mutually exclusive events. It is split into one sibling record per event
//! and selected by which event key is present.

use crate::config::{EventEnvelopeRule, UnionConfig};
use crate::error::{DispatchError, ResolveError};
use crate::schema::{ApiModel, ElementName, Field, TypeElement, TypeKind};
use heck::{ToShoutySnakeCase, ToUpperCamelCase};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// How the members of one hierarchy are told apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Discriminator {
    /// Shared tag field; `elided` members drop it from their own field list.
    Tagged { field: String, elided: bool },
    /// First sibling-unique key of each member.
    Structural,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnionVariant {
    pub member: ElementName,
    /// Tag literal for tagged unions, unique wire key for structural ones
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnionHierarchy {
    pub name: ElementName,
    pub discriminator: Discriminator,
    /// Members in declared order
    pub variants: Vec<UnionVariant>,
}

impl UnionHierarchy {
    /// Pick the member a raw payload represents.
    ///
    /// Tagged unions compare the tag field's string value; structural unions
    /// take the first member, in declared order, whose key is present. A key
    /// holding `null` counts as absent.
    pub fn select(&self, payload: &Map<String, Value>) -> Result<&ElementName, DispatchError> {
        let found = match &self.discriminator {
            Discriminator::Tagged { field, .. } => {
                let tag = payload.get(field).and_then(Value::as_str);
                self.variants.iter().find(|v| Some(v.key.as_str()) == tag)
            }
            Discriminator::Structural => self.variants.iter().find(|v| has_key(payload, &v.key)),
        };

        found.map(|v| &v.member).ok_or_else(|| DispatchError {
            union: self.name.to_string(),
            matched: vec![],
            keys: present_keys(payload),
        })
    }
}

/// One event of the envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventKind {
    /// Upper-snake tag, e.g. `EDITED_MESSAGE`
    pub tag: String,
    pub wire_name: String,
    /// Synthesized sibling record, e.g. `EditedMessageUpdate`
    pub sibling: ElementName,
    /// The event's field, made required
    pub payload: Field,
}

/// The incoming-event envelope split into its events.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEnvelope {
    pub name: ElementName,
    pub kind_enum: String,
    /// Required fields carried by every sibling, identifier first
    pub common: Vec<Field>,
    pub kinds: Vec<EventKind>,
}

impl EventEnvelope {
    /// Fields of one sibling record: the common fields plus its payload.
    pub fn sibling_fields(&self, kind: &EventKind) -> Vec<Field> {
        let mut fields = self.common.clone();
        fields.push(kind.payload.clone());
        fields
    }

    /// The event a raw payload carries.
    ///
    /// Exactly one event key must be present; none or several is an error.
    pub fn select(&self, payload: &Map<String, Value>) -> Result<&EventKind, DispatchError> {
        let present: Vec<&EventKind> = self
            .kinds
            .iter()
            .filter(|kind| has_key(payload, &kind.wire_name))
            .collect();

        match present.as_slice() {
            [kind] => Ok(*kind),
            _ => Err(DispatchError {
                union: self.name.to_string(),
                matched: present.iter().map(|k| k.wire_name.clone()).collect(),
                keys: present_keys(payload),
            }),
        }
    }
}

/// Everything the resolver derived about polymorphic types.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnionResolution {
    /// In model declaration order
    pub hierarchies: Vec<UnionHierarchy>,
    /// Member -> parent union
    pub parents: BTreeMap<ElementName, ElementName>,
    /// (member, wire name) of tag fields removed from member records
    pub elided: BTreeSet<(ElementName, String)>,
    pub envelope: Option<EventEnvelope>,
}

impl UnionResolution {
    pub fn hierarchy(&self, name: &ElementName) -> Option<&UnionHierarchy> {
        self.hierarchies.iter().find(|h| &h.name == name)
    }

    pub fn is_elided(&self, owner: &ElementName, wire_name: &str) -> bool {
        self.elided
            .contains(&(owner.clone(), wire_name.to_string()))
    }
}

/// Resolve every union declaration and the event envelope.
pub fn resolve(
    model: &ApiModel,
    config: &UnionConfig,
    envelope: Option<&EventEnvelopeRule>,
) -> Result<UnionResolution, ResolveError> {
    for name in config.keep_discriminator {
        if model.type_element(name).is_none() {
            return Err(ResolveError::UnresolvedSpecialType {
                name: (*name).to_string(),
            });
        }
    }

    let mut resolution = UnionResolution::default();

    for element in &model.types {
        let TypeKind::Union(member_names) = &element.kind else {
            continue;
        };

        let members = collect_members(model, element, member_names, &mut resolution.parents)?;
        let hierarchy = resolve_hierarchy(element, &members, config, &mut resolution.elided)?;
        tracing::debug!(
            union = %element.name,
            discriminator = ?hierarchy.discriminator,
            members = hierarchy.variants.len(),
            "resolved union"
        );
        resolution.hierarchies.push(hierarchy);
    }

    if let Some(rule) = envelope {
        resolution.envelope = Some(resolve_envelope(model, rule)?);
    }

    Ok(resolution)
}

fn collect_members<'a>(
    model: &'a ApiModel,
    union: &TypeElement,
    member_names: &[ElementName],
    parents: &mut BTreeMap<ElementName, ElementName>,
) -> Result<Vec<&'a TypeElement>, ResolveError> {
    if member_names.is_empty() {
        return Err(ResolveError::EmptyUnion {
            union: union.name.clone(),
        });
    }

    let mut members = Vec::with_capacity(member_names.len());
    for name in member_names {
        let member = model.type_element(name.as_str()).ok_or_else(|| {
            ResolveError::UnknownUnionMember {
                union: union.name.clone(),
                member: name.clone(),
            }
        })?;

        if !member.is_record() {
            return Err(ResolveError::NonRecordMember {
                union: union.name.clone(),
                member: name.clone(),
            });
        }

        if let Some(first) = parents.insert(name.clone(), union.name.clone()) {
            return Err(ResolveError::MultipleParents {
                member: name.clone(),
                first,
                second: union.name.clone(),
            });
        }

        members.push(member);
    }

    Ok(members)
}

fn resolve_hierarchy(
    union: &TypeElement,
    members: &[&TypeElement],
    config: &UnionConfig,
    elided: &mut BTreeSet<(ElementName, String)>,
) -> Result<UnionHierarchy, ResolveError> {
    let tag_fields: Vec<Vec<&Field>> = members
        .iter()
        .map(|member| {
            member
                .fields()
                .iter()
                .filter(|f| config.discriminator_names.contains(&f.wire_name.as_str()))
                .collect()
        })
        .collect();

    if tag_fields.iter().all(|fields| !fields.is_empty()) {
        resolve_tagged(union, members, &tag_fields, config, elided)
    } else {
        resolve_structural(union, members, config)
    }
}

fn resolve_tagged(
    union: &TypeElement,
    members: &[&TypeElement],
    tag_fields: &[Vec<&Field>],
    config: &UnionConfig,
    elided: &mut BTreeSet<(ElementName, String)>,
) -> Result<UnionHierarchy, ResolveError> {
    let names: BTreeSet<&str> = tag_fields
        .iter()
        .flatten()
        .map(|f| f.wire_name.as_str())
        .collect();

    if names.len() != 1 {
        return Err(ResolveError::AmbiguousDiscriminator {
            union: union.name.clone(),
            names: names.into_iter().map(str::to_string).collect(),
        });
    }

    let keep = config.keep_discriminator.contains(&union.name.as_str());
    let mut variants: Vec<UnionVariant> = Vec::with_capacity(members.len());

    for (member, fields) in members.iter().zip(tag_fields) {
        let field = fields[0];
        let tag = extract_tag_literal(&field.description).ok_or_else(|| {
            ResolveError::UndiscoverableTagLiteral {
                union: union.name.clone(),
                member: member.name.clone(),
                field: field.name.clone(),
            }
        })?;

        if let Some(existing) = variants.iter().find(|v| v.key == tag) {
            return Err(ResolveError::DuplicateTag {
                union: union.name.clone(),
                first: existing.member.clone(),
                second: member.name.clone(),
                tag,
            });
        }

        if !keep {
            elided.insert((member.name.clone(), field.wire_name.clone()));
        }

        variants.push(UnionVariant {
            member: member.name.clone(),
            key: tag,
        });
    }

    Ok(UnionHierarchy {
        name: union.name.clone(),
        discriminator: Discriminator::Tagged {
            field: tag_fields[0][0].wire_name.clone(),
            elided: !keep,
        },
        variants,
    })
}

fn resolve_structural(
    union: &TypeElement,
    members: &[&TypeElement],
    config: &UnionConfig,
) -> Result<UnionHierarchy, ResolveError> {
    let mut variants = Vec::with_capacity(members.len());

    for (index, member) in members.iter().enumerate() {
        let others: BTreeSet<&str> = members
            .iter()
            .enumerate()
            .filter(|(other, _)| *other != index)
            .flat_map(|(_, m)| m.fields().iter().map(|f| f.wire_name.as_str()))
            .collect();

        let unique = member.fields().iter().find(|f| {
            !config
                .structural_blocklist
                .contains(&f.wire_name.as_str())
                && !others.contains(f.wire_name.as_str())
        });

        let field = unique.ok_or_else(|| ResolveError::UndiscoverableDiscriminator {
            union: union.name.clone(),
            member: member.name.clone(),
        })?;

        variants.push(UnionVariant {
            member: member.name.clone(),
            key: field.wire_name.clone(),
        });
    }

    Ok(UnionHierarchy {
        name: union.name.clone(),
        discriminator: Discriminator::Structural,
        variants,
    })
}

fn resolve_envelope(
    model: &ApiModel,
    rule: &EventEnvelopeRule,
) -> Result<EventEnvelope, ResolveError> {
    let element = model
        .type_element(rule.type_name)
        .filter(|t| t.is_record())
        .ok_or_else(|| ResolveError::UnresolvedSpecialType {
            name: rule.type_name.to_string(),
        })?;

    let id = element
        .fields()
        .iter()
        .find(|f| f.wire_name == rule.id_field && !f.optional)
        .ok_or_else(|| ResolveError::MissingEnvelopeField {
            envelope: element.name.clone(),
            field: rule.id_field.to_string(),
        })?;

    let mut common = vec![id.clone()];
    common.extend(
        element
            .fields()
            .iter()
            .filter(|f| !f.optional && f.wire_name != rule.id_field)
            .cloned(),
    );

    let mut kinds = Vec::new();
    for field in element.fields().iter().filter(|f| f.optional) {
        let sibling = ElementName::new(format!(
            "{}{}",
            field.wire_name.to_upper_camel_case(),
            rule.sibling_suffix
        ));
        if model.type_element(sibling.as_str()).is_some() {
            return Err(ResolveError::DuplicateElement {
                kind: "type",
                name: sibling,
            });
        }

        kinds.push(EventKind {
            tag: field.wire_name.to_shouty_snake_case(),
            wire_name: field.wire_name.clone(),
            sibling,
            payload: field.clone().into_required(),
        });
    }

    tracing::debug!(envelope = %element.name, events = kinds.len(), "resolved event envelope");

    Ok(EventEnvelope {
        name: element.name.clone(),
        kind_enum: rule.kind_enum.to_string(),
        common,
        kinds,
    })
}

fn has_key(payload: &Map<String, Value>, key: &str) -> bool {
    payload.get(key).is_some_and(|v| !v.is_null())
}

fn present_keys(payload: &Map<String, Value>) -> Vec<String> {
    payload
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, _)| k.clone())
        .collect()
}

/// Find the literal in phrases like `must be *default*`, `always “creator”`
/// or `must be photo`.
fn extract_tag_literal(description: &str) -> Option<String> {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let re = TAG.get_or_init(|| {
        Regex::new(
            r#"(?:must be|always)\s+(?:\*([^*]+)\*|"([^"]+)"|“([^”]+)”|'([^']+)'|([A-Za-z0-9_\-]+))"#,
        )
        .expect("tag literal pattern is valid")
    });

    let captures = re.captures(description)?;
    (1..=5)
        .find_map(|group| captures.get(group))
        .map(|m| m.as_str().trim().to_string())
        .filter(|tag| !tag.is_empty())
}
