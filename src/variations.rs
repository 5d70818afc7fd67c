//! Method variation expansion
//!
//! Some methods accept one of several mutually exclusive parameter groups
//! (a chat/message pair *or* an inline message id). The raw model cannot
//! express that, so each such method is replaced by one concrete method per
//! variation rule, with the group's parameters required and the competing
//! group removed.

use crate::config::MethodVariationRule;
use crate::error::ResolveError;
use crate::schema::{ApiModel, ElementName, FieldType, MethodElement};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

/// A method after expansion, remembering the method it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpandedMethod {
    /// Name of the base method; this is what goes over the wire
    pub base: ElementName,

    #[serde(flatten)]
    pub method: MethodElement,
}

impl ExpandedMethod {
    pub fn unchanged(method: &MethodElement) -> Self {
        Self {
            base: method.name.clone(),
            method: method.clone(),
        }
    }
}

/// Expand one method with the rules keyed by its name.
///
/// Without a matching rule the method comes back unchanged as a single entry.
pub fn expand(
    method: &MethodElement,
    rules: &[MethodVariationRule],
) -> Result<Vec<ExpandedMethod>, ResolveError> {
    let matching: Vec<&MethodVariationRule> =
        rules.iter().filter(|rule| method.name == rule.method).collect();

    if matching.is_empty() {
        return Ok(vec![ExpandedMethod::unchanged(method)]);
    }

    matching
        .into_iter()
        .map(|rule| apply_rule(method, rule))
        .collect()
}

/// Expand every method of the model, keeping declaration order and placing
/// each method's variations where the method was.
pub fn expand_all(
    model: &ApiModel,
    rules: &[MethodVariationRule],
) -> Result<Vec<ExpandedMethod>, ResolveError> {
    for rule in rules {
        if model.method(rule.method).is_none() {
            tracing::debug!(
                method = rule.method,
                variation = rule.new_name,
                "variation rule does not apply: base method not declared"
            );
        }
    }

    let mut expanded = Vec::new();
    for method in &model.methods {
        expanded.extend(expand(method, rules)?);
    }

    let mut seen = BTreeSet::new();
    for method in &expanded {
        if !seen.insert(&method.method.name) {
            return Err(ResolveError::DuplicateMethod {
                name: method.method.name.clone(),
            });
        }
        model.validate_reference(&method.method.name, "<returns>", &method.method.returns)?;
    }

    Ok(expanded)
}

fn apply_rule(
    method: &MethodElement,
    rule: &MethodVariationRule,
) -> Result<ExpandedMethod, ResolveError> {
    check_rule(method, rule)?;

    let parameters = method
        .parameters
        .iter()
        .filter(|param| !rule.skip.contains(&param.name.as_str()))
        .map(|param| {
            if rule.required.contains(&param.name.as_str()) {
                param.clone().into_required()
            } else {
                param.clone()
            }
        })
        .collect();

    let returns =
        FieldType::parse(rule.new_returns).map_err(|message| ResolveError::InvalidReturnType {
            method: method.name.clone(),
            rule: rule.new_name.to_string(),
            message,
        })?;

    let mut description = method.description.clone();
    for (pattern, replacement) in rule.rewrites {
        let re = Regex::new(pattern).map_err(|e| ResolveError::InvalidRewritePattern {
            method: method.name.clone(),
            rule: rule.new_name.to_string(),
            pattern: (*pattern).to_string(),
            message: e.to_string(),
        })?;
        description = re.replace_all(&description, *replacement).into_owned();
    }

    tracing::debug!(
        base = %method.name,
        variation = rule.new_name,
        "expanded method variation"
    );

    Ok(ExpandedMethod {
        base: method.name.clone(),
        method: MethodElement {
            name: ElementName::new(rule.new_name),
            parameters,
            returns,
            description,
        },
    })
}

fn check_rule(method: &MethodElement, rule: &MethodVariationRule) -> Result<(), ResolveError> {
    if let Some(param) = rule.required.iter().find(|p| rule.skip.contains(p)) {
        return Err(ResolveError::ConflictingVariation {
            method: method.name.clone(),
            rule: rule.new_name.to_string(),
            param: (*param).to_string(),
        });
    }

    let unknown = rule
        .required
        .iter()
        .chain(rule.skip)
        .find(|p| method.parameter(p).is_none());
    if let Some(param) = unknown {
        return Err(ResolveError::UnknownVariationParam {
            method: method.name.clone(),
            rule: rule.new_name.to_string(),
            param: (*param).to_string(),
        });
    }

    Ok(())
}
