//! Resolution errors
//!
//! Every failure in the resolution pipeline is a construction-time
//! invariant violation. Nothing is retried; the run aborts with the
//! element, field and rule names involved.

use crate::schema::ElementName;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("duplicate {kind} `{name}`")]
    DuplicateElement {
        kind: &'static str,
        name: ElementName,
    },

    #[error("`{owner}` declares wire name `{wire_name}` more than once")]
    DuplicateWireName {
        owner: ElementName,
        wire_name: String,
    },

    #[error("`{owner}.{field}` is required but carries a default value")]
    DefaultOnRequiredField { owner: ElementName, field: String },

    #[error("`{owner}.{field}` references undeclared type `{target}`")]
    UnknownTypeReference {
        owner: ElementName,
        field: String,
        target: ElementName,
    },

    #[error("union `{union}` declares unknown member `{member}`")]
    UnknownUnionMember {
        union: ElementName,
        member: ElementName,
    },

    #[error("union `{union}` declares no members")]
    EmptyUnion { union: ElementName },

    #[error("union `{union}` member `{member}` is not a record")]
    NonRecordMember {
        union: ElementName,
        member: ElementName,
    },

    #[error("`{member}` is a member of both `{first}` and `{second}`")]
    MultipleParents {
        member: ElementName,
        first: ElementName,
        second: ElementName,
    },

    #[error("union `{union}` has ambiguous discriminator fields: {}", .names.join(", "))]
    AmbiguousDiscriminator {
        union: ElementName,
        names: Vec<String>,
    },

    #[error("union `{union}`: no field of `{member}` is unique among its siblings")]
    UndiscoverableDiscriminator {
        union: ElementName,
        member: ElementName,
    },

    #[error("union `{union}`: no tag literal in the description of `{member}.{field}`")]
    UndiscoverableTagLiteral {
        union: ElementName,
        member: ElementName,
        field: String,
    },

    #[error("union `{union}`: members `{first}` and `{second}` share tag `{tag}`")]
    DuplicateTag {
        union: ElementName,
        first: ElementName,
        second: ElementName,
        tag: String,
    },

    #[error("special-case type `{name}` is not declared in the model")]
    UnresolvedSpecialType { name: String },

    #[error("event envelope `{envelope}` has no field `{field}`")]
    MissingEnvelopeField {
        envelope: ElementName,
        field: String,
    },

    #[error("variation `{rule}` of `{method}`: parameter `{param}` is both required and skipped")]
    ConflictingVariation {
        method: ElementName,
        rule: String,
        param: String,
    },

    #[error("variation `{rule}` of `{method}`: `{param}` is not a parameter of the base method")]
    UnknownVariationParam {
        method: ElementName,
        rule: String,
        param: String,
    },

    #[error("variation `{rule}` of `{method}`: invalid rewrite pattern `{pattern}`: {message}")]
    InvalidRewritePattern {
        method: ElementName,
        rule: String,
        pattern: String,
        message: String,
    },

    #[error("variation `{rule}` of `{method}`: invalid return type: {message}")]
    InvalidReturnType {
        method: ElementName,
        rule: String,
        message: String,
    },

    #[error("method `{name}` is produced more than once after variation expansion")]
    DuplicateMethod { name: ElementName },

    #[error("fluent method `{receiver}::{method}`: receiver is not a declared record")]
    UnknownReceiver { receiver: String, method: String },

    #[error("fluent method `{receiver}::{method}`: `{param}` is not a parameter of `{delegate}`")]
    InvalidFluentBinding {
        receiver: String,
        method: String,
        delegate: String,
        param: String,
    },

    #[error("fluent method `{receiver}::{method}`: `{param}` is bound more than once")]
    DuplicateFluentBinding {
        receiver: String,
        method: String,
        param: String,
    },

    #[error("fluent method `{receiver}::{method}`: `{param}` takes `{expected}`, bound to {found}")]
    MismatchedBindingValue {
        receiver: String,
        method: String,
        param: String,
        expected: String,
        found: String,
    },

    #[error("fluent method `{receiver}::{method}`: binding for `{param}` reads `{path}`: {reason}")]
    InvalidBindingPath {
        receiver: String,
        method: String,
        param: String,
        path: String,
        reason: String,
    },
}

/// Selection failure when a payload matches no union variant, or an event
/// envelope carries zero or several event keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "failed to deserialize `{union}`: expected exactly one variant to match, matched [{}] with keys [{}]",
    .matched.join(", "),
    .keys.join(", ")
)]
pub struct DispatchError {
    pub union: String,
    /// Variants (or event keys) that matched
    pub matched: Vec<String>,
    /// Non-null payload keys
    pub keys: Vec<String>,
}
