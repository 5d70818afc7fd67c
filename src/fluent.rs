//! Fluent method synthesis
//!
//! Derives convenience methods on receiver types (`message.reply(...)`)
//! that forward to an expanded method with some arguments taken from the
//! receiver.

use crate::config::{Binding, FluentRule, Literal};
use crate::error::ResolveError;
use crate::schema::{ApiModel, ElementName, Field, FieldType, Primitive, TypeElement};
use crate::value_types::ValueTypeAssignment;
use crate::variations::ExpandedMethod;
use serde::Serialize;

/// Where one delegate argument comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "binding", rename_all = "snake_case")]
pub enum ArgumentSource {
    /// Passed through from the fluent method's own parameter
    Caller,
    Bound(Binding),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluentArgument {
    /// Delegate parameter name
    pub parameter: String,
    pub source: ArgumentSource,
}

/// A synthesized method bound to a receiver type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FluentMethod {
    pub receiver: ElementName,
    pub name: String,
    /// Final name of the expanded method it forwards to
    pub delegate: ElementName,
    /// Delegate parameters the caller still supplies
    pub parameters: Vec<Field>,
    /// One entry per delegate parameter, in delegate order
    pub arguments: Vec<FluentArgument>,
    pub returns: FieldType,
}

/// Synthesize every fluent method, in rule-table order.
///
/// Rules whose delegate is not among the expanded methods are skipped.
/// A binding that names anything but a delegate parameter, names one twice,
/// or yields a value of another type than the parameter's is fatal.
pub fn synthesize(
    model: &ApiModel,
    methods: &[ExpandedMethod],
    value_types: &ValueTypeAssignment,
    rules: &[FluentRule],
) -> Result<Vec<FluentMethod>, ResolveError> {
    let mut synthesized = Vec::new();

    for rule in rules {
        let Some(delegate) = methods.iter().find(|m| m.method.name == rule.delegate) else {
            tracing::warn!(
                receiver = rule.receiver,
                method = rule.name,
                delegate = rule.delegate,
                "skipping fluent method: delegate not declared"
            );
            continue;
        };

        synthesized.push(synthesize_one(model, value_types, delegate, rule)?);
    }

    Ok(synthesized)
}

fn synthesize_one(
    model: &ApiModel,
    value_types: &ValueTypeAssignment,
    delegate: &ExpandedMethod,
    rule: &FluentRule,
) -> Result<FluentMethod, ResolveError> {
    let receiver = model
        .type_element(rule.receiver)
        .filter(|t| t.is_record())
        .ok_or_else(|| ResolveError::UnknownReceiver {
            receiver: rule.receiver.to_string(),
            method: rule.name.to_string(),
        })?;

    for (index, (param, binding)) in rule.bindings.iter().enumerate() {
        if rule.bindings[..index].iter().any(|(earlier, _)| earlier == param) {
            return Err(ResolveError::DuplicateFluentBinding {
                receiver: rule.receiver.to_string(),
                method: rule.name.to_string(),
                param: (*param).to_string(),
            });
        }
        let Some(target) = delegate.method.parameter(param) else {
            return Err(ResolveError::InvalidFluentBinding {
                receiver: rule.receiver.to_string(),
                method: rule.name.to_string(),
                delegate: rule.delegate.to_string(),
                param: (*param).to_string(),
            });
        };

        // The bound value must carry the parameter's effective type
        let expected = value_types.effective_type(&delegate.method.name, target);
        let mismatch = |found: String| ResolveError::MismatchedBindingValue {
            receiver: rule.receiver.to_string(),
            method: rule.name.to_string(),
            param: (*param).to_string(),
            expected: expected.to_string(),
            found,
        };

        match binding {
            Binding::Receiver => {
                if target.declared_type != FieldType::Reference(receiver.name.clone()) {
                    return Err(mismatch(format!("the receiver `{}`", receiver.name)));
                }
            }
            Binding::Field(path) => {
                let invalid = |reason: String| ResolveError::InvalidBindingPath {
                    receiver: rule.receiver.to_string(),
                    method: rule.name.to_string(),
                    param: (*param).to_string(),
                    path: path.join("."),
                    reason,
                };
                let (owner, leaf) = check_path(model, receiver, path).map_err(invalid)?;
                let found = value_types.effective_type(&owner.name, leaf);
                if found != expected {
                    return Err(invalid(format!(
                        "`{}.{}` is `{found}`, expected `{expected}`",
                        owner.name, leaf.name
                    )));
                }
            }
            Binding::Literal(literal) => {
                let (backing, value) = match literal {
                    Literal::Bool(value) => (Primitive::Boolean, value.to_string()),
                    Literal::Integer(value) => (Primitive::Integer, value.to_string()),
                    Literal::String(value) => (Primitive::String, format!("{value:?}")),
                };
                if target.declared_type.as_primitive() != Some(backing) {
                    return Err(mismatch(format!("literal `{value}`")));
                }
            }
        }
    }

    let bound = |name: &str| {
        rule.bindings
            .iter()
            .find(|(param, _)| *param == name)
            .map(|(_, binding)| binding)
    };

    let parameters = delegate
        .method
        .parameters
        .iter()
        .filter(|p| bound(p.name.as_str()).is_none())
        .cloned()
        .collect();

    let arguments = delegate
        .method
        .parameters
        .iter()
        .map(|p| FluentArgument {
            parameter: p.name.clone(),
            source: bound(p.name.as_str())
                .map_or(ArgumentSource::Caller, |b| ArgumentSource::Bound(b.clone())),
        })
        .collect();

    tracing::debug!(
        receiver = rule.receiver,
        method = rule.name,
        delegate = rule.delegate,
        "synthesized fluent method"
    );

    Ok(FluentMethod {
        receiver: receiver.name.clone(),
        name: rule.name.to_string(),
        delegate: delegate.method.name.clone(),
        parameters,
        arguments,
        returns: delegate.method.returns.clone(),
    })
}

/// Walk a receiver field path: every segment must exist and be required,
/// and every segment but the last must lead to another record. Returns the
/// record owning the last segment along with its field.
fn check_path<'a>(
    model: &'a ApiModel,
    receiver: &'a TypeElement,
    path: &[&str],
) -> Result<(&'a TypeElement, &'a Field), String> {
    let Some((last, init)) = path.split_last() else {
        return Err("empty path".to_string());
    };

    let mut current = receiver;
    for segment in init {
        let field = required_field(current, segment)?;
        current = match &field.declared_type {
            FieldType::Reference(target) => model
                .type_element(target.as_str())
                .filter(|t| t.is_record())
                .ok_or_else(|| format!("`{segment}` is not a record"))?,
            _ => return Err(format!("`{segment}` is not a record")),
        };
    }

    required_field(current, last).map(|field| (current, field))
}

fn required_field<'a>(record: &'a TypeElement, name: &str) -> Result<&'a Field, String> {
    let field = record
        .field(name)
        .ok_or_else(|| format!("`{}` has no field `{name}`", record.name))?;
    if field.optional {
        return Err(format!("`{}.{name}` is optional", record.name));
    }
    Ok(field)
}
