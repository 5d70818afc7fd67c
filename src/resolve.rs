//! Resolution pipeline
//!
//! Runs every stage once, in order, over an immutable raw model and hands
//! the renderer a single resolved view of it.

use crate::config::RuleSet;
use crate::error::ResolveError;
use crate::fluent::{self, FluentMethod};
use crate::schema::{ApiModel, ElementName, Field, TypeElement};
use crate::unions::{self, UnionResolution};
use crate::value_types::{self, EffectiveType, ValueTypeAssignment};
use crate::variations::{self, ExpandedMethod};
use serde::Serialize;

/// Output of the pipeline: the model plus everything derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedApi {
    pub model: ApiModel,
    pub value_types: ValueTypeAssignment,
    pub unions: UnionResolution,
    /// Model methods with variations expanded in place
    pub methods: Vec<ExpandedMethod>,
    /// In rule-table order
    pub fluent: Vec<FluentMethod>,
}

/// Resolve a model against a rule set. Any invariant violation aborts the
/// whole run.
pub fn resolve(model: ApiModel, rules: &RuleSet) -> Result<ResolvedApi, ResolveError> {
    model.validate()?;

    let unions = unions::resolve(&model, &rules.unions, rules.envelope.as_ref())?;
    let methods = variations::expand_all(&model, &rules.variations)?;
    let value_types = value_types::assign(&model, &methods, &rules.value_types);
    let fluent = fluent::synthesize(&model, &methods, &value_types, &rules.fluent)?;

    tracing::info!(
        types = model.types.len(),
        unions = unions.hierarchies.len(),
        methods = methods.len(),
        fluent = fluent.len(),
        wrappers = value_types.wrappers.len(),
        "resolved model"
    );

    Ok(ResolvedApi {
        model,
        value_types,
        unions,
        methods,
        fluent,
    })
}

impl ResolvedApi {
    /// Wrapper type if one was assigned, the declared type otherwise.
    pub fn effective_type<'a>(&self, owner: &ElementName, field: &'a Field) -> EffectiveType<'a> {
        self.value_types.effective_type(owner, field)
    }

    /// Whether the field is a union tag re-derived by the parent.
    pub fn is_elided_discriminator(&self, owner: &ElementName, field: &Field) -> bool {
        self.unions.is_elided(owner, &field.wire_name)
    }

    /// Fields a record keeps after elision.
    pub fn visible_fields<'a>(&self, element: &'a TypeElement) -> Vec<&'a Field> {
        element
            .fields()
            .iter()
            .filter(|f| !self.is_elided_discriminator(&element.name, f))
            .collect()
    }

    /// Final signature of a method after variation expansion.
    pub fn method(&self, name: &str) -> Option<&ExpandedMethod> {
        self.methods.iter().find(|m| m.method.name == name)
    }

    pub fn fluent_methods_for<'a>(
        &'a self,
        receiver: &'a ElementName,
    ) -> impl Iterator<Item = &'a FluentMethod> + 'a {
        self.fluent.iter().filter(move |f| &f.receiver == receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::schema::{FieldType, Primitive};

    fn resolved() -> ResolvedApi {
        resolve(fixtures::model(), &RuleSet::telegram()).unwrap()
    }

    #[test]
    fn test_effective_types() {
        let api = resolved();
        let message = api.model.type_element("Message").unwrap();

        let id = message.field("message_id").unwrap();
        assert_eq!(
            api.effective_type(&message.name, id),
            EffectiveType::Wrapper("MessageId")
        );

        let text = message.field("text").unwrap();
        assert_eq!(
            api.effective_type(&message.name, text),
            EffectiveType::Raw(&FieldType::Primitive(Primitive::String))
        );

        let inline = api.method("editInlineMessageText").unwrap();
        let param = inline.method.parameter("inline_message_id").unwrap();
        assert_eq!(
            api.effective_type(&inline.method.name, param),
            EffectiveType::Wrapper("InlineMessageId")
        );
    }

    #[test]
    fn test_elided_discriminators() {
        let api = resolved();

        let scope = api.model.type_element("BotCommandScopeChat").unwrap();
        let visible: Vec<_> = api
            .visible_fields(scope)
            .iter()
            .map(|f| f.wire_name.as_str())
            .collect();
        assert_eq!(visible, vec!["chat_id"]);

        // ChatMember is allow-listed and keeps its status field
        let owner = api.model.type_element("ChatMemberOwner").unwrap();
        let status = owner.field("status").unwrap();
        assert!(!api.is_elided_discriminator(&owner.name, status));
    }

    #[test]
    fn test_signatures_after_expansion() {
        let api = resolved();

        let edit = api.method("editMessageText").unwrap();
        let params: Vec<_> = edit
            .method
            .parameters
            .iter()
            .map(|p| (p.name.as_str(), p.optional))
            .collect();
        assert_eq!(
            params,
            vec![("chat_id", false), ("message_id", false), ("text", false)]
        );

        let message = ElementName::new("Message");
        assert_eq!(api.fluent_methods_for(&message).count(), 5);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let first = serde_json::to_string(&resolved()).unwrap();
        let second = serde_json::to_string(&resolved()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_model_fails_before_resolution() {
        let mut model = fixtures::model();
        model.types.push(model.types[0].clone());

        assert!(matches!(
            resolve(model, &RuleSet::telegram()),
            Err(ResolveError::DuplicateElement { kind: "type", .. })
        ));
    }
}
