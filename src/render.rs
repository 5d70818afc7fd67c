//! Rust source emitter
//!
//! Turns a resolved model into one self-contained client module built on
//! serde. Items are emitted in model order (wrappers, types, requests, the
//! client, fluent methods), so identical input renders byte-identical output.

use crate::compact::push_doc;
use crate::config::{Binding, Literal};
use crate::fluent::{ArgumentSource, FluentMethod};
use crate::resolve::ResolvedApi;
use crate::schema::{ElementName, Field, FieldType, Primitive, TypeElement, TypeKind};
use crate::unions::{Discriminator, EventEnvelope, UnionHierarchy};
use crate::value_types::EffectiveType;
use crate::variations::ExpandedMethod;
use heck::{ToSnakeCase, ToUpperCamelCase};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Keep only the first sentence of each description
    pub compact: bool,
}

const PREAMBLE: &str = r#"// @generated by botgen. Do not edit by hand.
#![allow(clippy::all, dead_code, unused_imports)]

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A method call: wire name, parameters and response type.
pub trait Request: Serialize {
    const METHOD: &'static str;
    type Response: DeserializeOwned;
}

/// Sends requests to the API server.
pub trait Transport {
    type Error;

    fn call<R: Request>(&self, request: &R) -> Result<R::Response, Self::Error>;
}

/// Client exposing one function per API method.
pub struct Bot<T> {
    transport: T,
}

impl<T> Bot<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

fn has_key(payload: &Map<String, Value>, key: &str) -> bool {
    payload.get(key).is_some_and(|value| !value.is_null())
}

fn no_match(union: &str, matched: &[&str], payload: &Map<String, Value>) -> String {
    let keys: Vec<&str> = payload
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, _)| key.as_str())
        .collect();
    format!(
        "failed to deserialize `{union}`: expected exactly one variant to match, matched [{}] with keys [{}]",
        matched.join(", "),
        keys.join(", ")
    )
}

fn from_payload<T: DeserializeOwned, E: de::Error>(payload: Map<String, Value>) -> Result<T, E> {
    serde_json::from_value(Value::Object(payload)).map_err(E::custom)
}
"#;

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Render the whole client module.
pub fn render(api: &ResolvedApi, options: RenderOptions) -> String {
    let mut renderer = Renderer {
        api,
        options,
        out: String::from(PREAMBLE),
    };
    renderer.wrappers();
    renderer.types();
    renderer.methods();
    renderer.fluent();
    renderer.out
}

struct Renderer<'a> {
    api: &'a ResolvedApi,
    options: RenderOptions,
    out: String,
}

impl<'a> Renderer<'a> {
    fn push(&mut self, text: impl AsRef<str>) {
        self.out.push_str(text.as_ref());
    }

    fn doc(&mut self, indent: &str, description: &str) {
        push_doc(&mut self.out, indent, description, self.options.compact);
    }

    fn field_doc(&mut self, indent: &str, field: &Field) {
        self.doc(indent, &field.description);
        if let Some(default) = &field.default {
            if !field.description.trim().is_empty() {
                self.push(format!("{indent}///\n"));
            }
            self.push(format!("{indent}/// Defaults to `{default}`.\n"));
        }
    }

    fn wrappers(&mut self) {
        let api = self.api;
        for wrapper in &api.value_types.wrappers {
            let backing = primitive_type(wrapper.backing);
            let derives = match wrapper.backing {
                Primitive::Integer | Primitive::Boolean => {
                    "Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize"
                }
                Primitive::String => {
                    "Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize"
                }
                Primitive::Float => {
                    "Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize"
                }
            };
            let name = wrapper.name;

            self.push("\n");
            self.doc("", wrapper.doc);
            self.push(format!(
                "#[derive({derives})]\n#[serde(transparent)]\npub struct {name}(pub {backing});\n"
            ));
            self.push(format!(
                "\nimpl From<{backing}> for {name} {{\n    fn from(value: {backing}) -> Self {{\n        Self(value)\n    }}\n}}\n"
            ));
        }
    }

    fn types(&mut self) {
        let api = self.api;
        for element in &api.model.types {
            if let Some(envelope) = api
                .unions
                .envelope
                .as_ref()
                .filter(|e| e.name == element.name)
            {
                self.envelope(element, envelope);
                continue;
            }
            match &element.kind {
                TypeKind::Record(_) => {
                    let fields = api.visible_fields(element);
                    self.record(
                        &type_ident(&element.name),
                        &element.name,
                        &element.description,
                        &fields,
                    );
                }
                TypeKind::Union(_) => {
                    if let Some(hierarchy) = api.unions.hierarchy(&element.name) {
                        self.union(element, hierarchy);
                    }
                }
            }
        }
    }

    /// `owner` is the element wrappers and boxing are looked up against,
    /// which differs from `name` for envelope siblings.
    fn record(&mut self, name: &str, owner: &ElementName, description: &str, fields: &[&Field]) {
        self.push("\n");
        self.doc("", description);
        self.push("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
        if fields.is_empty() {
            self.push(format!("pub struct {name} {{}}\n"));
            return;
        }

        self.push(format!("pub struct {name} {{\n"));
        for field in fields {
            self.field_doc("    ", field);
            let ident = field_ident(&field.name);
            if unraw(&ident) != field.wire_name {
                self.push(format!("    #[serde(rename = \"{}\")]\n", field.wire_name));
            }
            if field.optional {
                self.push("    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n");
            }
            let ty = self.field_type(owner, field);
            self.push(format!("    pub {ident}: {ty},\n"));
        }
        self.push("}\n");
    }

    fn union(&mut self, element: &TypeElement, hierarchy: &UnionHierarchy) {
        let name = type_ident(&element.name);
        let idents = variant_idents(hierarchy);

        self.push("\n");
        self.doc("", &element.description);

        if let Discriminator::Tagged { field, elided: true } = &hierarchy.discriminator {
            self.push("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
            self.push(format!("#[serde(tag = \"{field}\")]\npub enum {name} {{\n"));
            for (ident, variant) in idents.iter().zip(&hierarchy.variants) {
                self.push(format!(
                    "    #[serde(rename = \"{}\")]\n    {ident}({}),\n",
                    variant.key,
                    type_ident(&variant.member)
                ));
            }
            self.push("}\n");
            return;
        }

        self.push("#[derive(Debug, Clone, PartialEq, Serialize)]\n#[serde(untagged)]\n");
        self.push(format!("pub enum {name} {{\n"));
        for (ident, variant) in idents.iter().zip(&hierarchy.variants) {
            self.push(format!("    {ident}({}),\n", type_ident(&variant.member)));
        }
        self.push("}\n");

        self.push(format!(
            "\nimpl<'de> Deserialize<'de> for {name} {{\n    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {{\n        let payload = Map::<String, Value>::deserialize(deserializer)?;\n"
        ));
        let no_match = format!(
            "Err(de::Error::custom(no_match(\"{}\", &[], &payload)))",
            element.name
        );

        match &hierarchy.discriminator {
            Discriminator::Tagged { field, .. } => {
                self.push(format!(
                    "        let tag = payload.get(\"{field}\").and_then(Value::as_str).map(str::to_owned);\n        match tag.as_deref() {{\n"
                ));
                for (ident, variant) in idents.iter().zip(&hierarchy.variants) {
                    self.push(format!(
                        "            Some({:?}) => from_payload(payload).map(Self::{ident}),\n",
                        variant.key
                    ));
                }
                self.push(format!("            _ => {no_match},\n        }}\n"));
            }
            Discriminator::Structural => {
                for (ident, variant) in idents.iter().zip(&hierarchy.variants) {
                    self.push(format!(
                        "        if has_key(&payload, {:?}) {{\n            return from_payload(payload).map(Self::{ident});\n        }}\n",
                        variant.key
                    ));
                }
                self.push(format!("        {no_match}\n"));
            }
        }
        self.push("    }\n}\n");
    }

    fn envelope(&mut self, element: &TypeElement, envelope: &EventEnvelope) {
        let name = type_ident(&element.name);
        let kind_enum = &envelope.kind_enum;
        let variants: Vec<String> = envelope
            .kinds
            .iter()
            .map(|kind| kind.wire_name.to_upper_camel_case())
            .collect();

        self.push(format!(
            "\n/// Kind of event an [`{name}`] carries.\n#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]\npub enum {kind_enum} {{\n"
        ));
        for variant in &variants {
            self.push(format!("    {variant},\n"));
        }
        self.push("}\n");

        self.push(format!(
            "\nimpl {kind_enum} {{\n    pub const ALL: [Self; {}] = [\n",
            variants.len()
        ));
        for variant in &variants {
            self.push(format!("        Self::{variant},\n"));
        }
        self.push("    ];\n\n    pub fn tag(self) -> &'static str {\n        match self {\n");
        for (variant, kind) in variants.iter().zip(&envelope.kinds) {
            self.push(format!("            Self::{variant} => {:?},\n", kind.tag));
        }
        self.push("        }\n    }\n\n    pub fn wire_name(self) -> &'static str {\n        match self {\n");
        for (variant, kind) in variants.iter().zip(&envelope.kinds) {
            self.push(format!("            Self::{variant} => {:?},\n", kind.wire_name));
        }
        self.push("        }\n    }\n}\n");

        for kind in &envelope.kinds {
            let fields = envelope.sibling_fields(kind);
            let fields: Vec<&Field> = fields.iter().collect();
            self.record(
                &type_ident(&kind.sibling),
                &envelope.name,
                &kind.payload.description,
                &fields,
            );
        }

        self.push("\n");
        self.doc("", &element.description);
        self.push(format!(
            "#[derive(Debug, Clone, PartialEq, Serialize)]\n#[serde(untagged)]\npub enum {name} {{\n"
        ));
        for (variant, kind) in variants.iter().zip(&envelope.kinds) {
            self.push(format!("    {variant}({}),\n", type_ident(&kind.sibling)));
        }
        self.push("}\n");

        self.push(format!(
            "\nimpl {name} {{\n    pub fn kind(&self) -> {kind_enum} {{\n        match self {{\n"
        ));
        for variant in &variants {
            self.push(format!(
                "            Self::{variant}(_) => {kind_enum}::{variant},\n"
            ));
        }
        self.push("        }\n    }\n");

        for field in &envelope.common {
            let ident = field_ident(&field.name);
            let ty = self.field_type(&envelope.name, field);
            self.push(format!(
                "\n    pub fn {ident}(&self) -> &{ty} {{\n        match self {{\n"
            ));
            for variant in &variants {
                self.push(format!(
                    "            Self::{variant}(event) => &event.{ident},\n"
                ));
            }
            self.push("        }\n    }\n");
        }

        self.push(format!(
            "\n    /// Event kind of a raw payload. Exactly one event key must be present.\n    pub fn select(payload: &Map<String, Value>) -> Result<{kind_enum}, String> {{\n        let present: Vec<{kind_enum}> = {kind_enum}::ALL\n            .into_iter()\n            .filter(|kind| has_key(payload, kind.wire_name()))\n            .collect();\n        match present.as_slice() {{\n            [kind] => Ok(*kind),\n            _ => {{\n                let names: Vec<&str> = present.iter().map(|kind| kind.wire_name()).collect();\n                Err(no_match(\"{}\", &names, payload))\n            }}\n        }}\n    }}\n}}\n",
            element.name
        ));

        self.push(format!(
            "\nimpl<'de> Deserialize<'de> for {name} {{\n    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {{\n        let payload = Map::<String, Value>::deserialize(deserializer)?;\n        match Self::select(&payload).map_err(de::Error::custom)? {{\n"
        ));
        for variant in &variants {
            self.push(format!(
                "            {kind_enum}::{variant} => from_payload(payload).map(Self::{variant}),\n"
            ));
        }
        self.push("        }\n    }\n}\n");
    }

    fn methods(&mut self) {
        let api = self.api;
        if api.methods.is_empty() {
            return;
        }

        for method in &api.methods {
            self.request(method);
        }

        self.push("\nimpl<T: Transport> Bot<T> {\n");
        for (index, method) in api.methods.iter().enumerate() {
            if index > 0 {
                self.push("\n");
            }
            self.client_method(method);
        }
        self.push("}\n");
    }

    fn request(&mut self, expanded: &ExpandedMethod) {
        let method = &expanded.method;
        let name = request_ident(&method.name);

        self.push(format!(
            "\n/// Parameters of [`Bot::{}`].\n#[derive(Debug, Clone, PartialEq, Serialize)]\n",
            fn_ident(method.name.as_str())
        ));
        if method.parameters.is_empty() {
            self.push(format!("pub struct {name} {{}}\n"));
        } else {
            self.push(format!("pub struct {name} {{\n"));
            for param in &method.parameters {
                self.field_doc("    ", param);
                let ident = field_ident(&param.name);
                if unraw(&ident) != param.wire_name {
                    self.push(format!("    #[serde(rename = \"{}\")]\n", param.wire_name));
                }
                if param.optional {
                    self.push("    #[serde(skip_serializing_if = \"Option::is_none\")]\n");
                }
                let ty = self.field_type(&method.name, param);
                self.push(format!("    pub {ident}: {ty},\n"));
            }
            self.push("}\n");
        }

        self.push(format!(
            "\nimpl Request for {name} {{\n    const METHOD: &'static str = \"{}\";\n    type Response = {};\n}}\n",
            expanded.base,
            rust_type(&method.returns)
        ));
    }

    fn client_method(&mut self, expanded: &ExpandedMethod) {
        let method = &expanded.method;
        let ident = fn_ident(method.name.as_str());
        let returns = rust_type(&method.returns);

        self.doc("    ", &method.description);
        if method.parameters.is_empty() {
            self.push(format!(
                "    pub fn {ident}(&self) -> Result<{returns}, T::Error> {{\n        self.transport.call(&{} {{}})\n    }}\n",
                request_ident(&method.name)
            ));
            return;
        }

        self.push(format!("    pub fn {ident}(\n        &self,\n"));
        for param in &method.parameters {
            let ty = self.field_type(&method.name, param);
            self.push(format!("        {}: {ty},\n", field_ident(&param.name)));
        }
        self.push(format!(
            "    ) -> Result<{returns}, T::Error> {{\n        self.transport.call(&{} {{\n",
            request_ident(&method.name)
        ));
        for param in &method.parameters {
            self.push(format!("            {},\n", field_ident(&param.name)));
        }
        self.push("        })\n    }\n");
    }

    fn fluent(&mut self) {
        let api = self.api;
        let mut receivers: Vec<&ElementName> = Vec::new();
        for method in &api.fluent {
            if !receivers.contains(&&method.receiver) {
                receivers.push(&method.receiver);
            }
        }

        for receiver in receivers {
            self.push(format!("\nimpl {} {{\n", type_ident(receiver)));
            for (index, method) in api.fluent_methods_for(receiver).enumerate() {
                if index > 0 {
                    self.push("\n");
                }
                self.fluent_method(method);
            }
            self.push("}\n");
        }
    }

    fn fluent_method(&mut self, method: &FluentMethod) {
        let api = self.api;
        let delegate = api.method(method.delegate.as_str());
        let delegate_fn = fn_ident(method.delegate.as_str());
        let returns = rust_type(&method.returns);

        self.push(format!(
            "    /// Calls [`Bot::{delegate_fn}`] with arguments taken from this `{}`.\n",
            method.receiver
        ));
        self.push(format!(
            "    pub fn {}<T: Transport>(\n        &self,\n        bot: &Bot<T>,\n",
            fn_ident(&method.name)
        ));
        for param in &method.parameters {
            let ty = self.field_type(&method.delegate, param);
            self.push(format!("        {}: {ty},\n", field_ident(&param.name)));
        }
        self.push(format!("    ) -> Result<{returns}, T::Error> {{\n"));

        let arguments: Vec<String> = method
            .arguments
            .iter()
            .map(|argument| {
                let param = delegate.and_then(|d| d.method.parameter(&argument.parameter));
                match &argument.source {
                    ArgumentSource::Caller => field_ident(&argument.parameter),
                    ArgumentSource::Bound(binding) => {
                        let expr =
                            self.bound_expr(&method.receiver, &method.delegate, param, binding);
                        if param.is_some_and(|p| p.optional) {
                            format!("Some({expr})")
                        } else {
                            expr
                        }
                    }
                }
            })
            .collect();

        self.push(format!(
            "        bot.{delegate_fn}({})\n    }}\n",
            arguments.join(", ")
        ));
    }

    fn bound_expr(
        &self,
        receiver: &ElementName,
        delegate: &ElementName,
        param: Option<&Field>,
        binding: &Binding,
    ) -> String {
        match binding {
            Binding::Receiver => "self.clone()".to_string(),
            Binding::Field(path) => self.path_expr(receiver, path),
            Binding::Literal(literal) => {
                let raw = match literal {
                    Literal::Bool(value) => value.to_string(),
                    Literal::Integer(value) => value.to_string(),
                    Literal::String(value) => format!("{value:?}.to_string()"),
                };
                match param.map(|p| self.api.effective_type(delegate, p)) {
                    Some(EffectiveType::Wrapper(wrapper)) => format!("{wrapper}({raw})"),
                    _ => raw,
                }
            }
        }
    }

    /// `self.a.b`, cloned unless the final value is `Copy`.
    fn path_expr(&self, receiver: &ElementName, path: &[&str]) -> String {
        let api = self.api;
        let mut expr = String::from("self");
        let mut current = api.model.type_element(receiver.as_str());
        let mut copy = false;
        let mut boxed = false;

        for segment in path {
            let Some(record) = current else { break };
            let Some(field) = record.field(segment) else { break };
            expr.push('.');
            expr.push_str(&field_ident(&field.name));
            copy = self.is_copy(&record.name, field);
            boxed = self.needs_box(&record.name, &field.declared_type);
            current = field
                .declared_type
                .referenced()
                .and_then(|target| api.model.type_element(target.as_str()));
        }

        if copy {
            expr
        } else if boxed {
            format!("(*{expr}).clone()")
        } else {
            format!("{expr}.clone()")
        }
    }

    fn is_copy(&self, owner: &ElementName, field: &Field) -> bool {
        let primitive = match self.api.effective_type(owner, field) {
            EffectiveType::Wrapper(name) => self
                .api
                .value_types
                .wrappers
                .iter()
                .find(|w| w.name == name)
                .map(|w| w.backing),
            EffectiveType::Raw(ty) => ty.as_primitive(),
        };
        matches!(
            primitive,
            Some(Primitive::Integer | Primitive::Float | Primitive::Boolean)
        )
    }

    fn field_type(&self, owner: &ElementName, field: &Field) -> String {
        let ty = match self.api.effective_type(owner, field) {
            EffectiveType::Wrapper(name) => name.to_string(),
            EffectiveType::Raw(ty) if self.needs_box(owner, ty) => {
                format!("Box<{}>", rust_type(ty))
            }
            EffectiveType::Raw(ty) => rust_type(ty),
        };
        if field.optional {
            format!("Option<{ty}>")
        } else {
            ty
        }
    }

    /// A direct reference needs a box when it leads back to its owner.
    fn needs_box(&self, owner: &ElementName, ty: &FieldType) -> bool {
        match ty {
            FieldType::Reference(target) => self.reaches(target, owner),
            _ => false,
        }
    }

    /// Whether `to` is reachable from `from` without passing through a `Vec`.
    fn reaches(&self, from: &ElementName, to: &ElementName) -> bool {
        let mut stack = vec![from];
        let mut seen = BTreeSet::new();

        while let Some(name) = stack.pop() {
            if name == to {
                return true;
            }
            if !seen.insert(name) {
                continue;
            }
            let Some(element) = self.api.model.type_element(name.as_str()) else {
                continue;
            };
            match &element.kind {
                TypeKind::Record(fields) => {
                    stack.extend(fields.iter().filter_map(|f| match &f.declared_type {
                        FieldType::Reference(target) => Some(target),
                        _ => None,
                    }))
                }
                TypeKind::Union(members) => stack.extend(members),
            }
        }
        false
    }
}

fn primitive_type(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Integer => "i64",
        Primitive::Float => "f64",
        Primitive::String => "String",
        Primitive::Boolean => "bool",
    }
}

fn rust_type(ty: &FieldType) -> String {
    match ty {
        FieldType::Primitive(primitive) => primitive_type(*primitive).to_string(),
        FieldType::Reference(name) => type_ident(name),
        FieldType::Array(inner) => format!("Vec<{}>", rust_type(inner)),
    }
}

fn type_ident(name: &ElementName) -> String {
    name.as_str().to_upper_camel_case()
}

fn request_ident(name: &ElementName) -> String {
    format!("{}Request", type_ident(name))
}

fn fn_ident(name: &str) -> String {
    escape(name.to_snake_case())
}

fn field_ident(name: &str) -> String {
    escape(name.to_snake_case())
}

fn escape(ident: String) -> String {
    if matches!(ident.as_str(), "self" | "Self" | "super" | "crate") {
        format!("{ident}_")
    } else if KEYWORDS.contains(&ident.as_str()) {
        format!("r#{ident}")
    } else {
        ident
    }
}

fn unraw(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

/// Member name minus the union's prefix (`BotCommandScopeChat` -> `Chat`),
/// or the full name where stripping would be empty or ambiguous.
fn variant_idents(hierarchy: &UnionHierarchy) -> Vec<String> {
    let union = hierarchy.name.as_str();
    let candidates: Vec<String> = hierarchy
        .variants
        .iter()
        .map(|variant| {
            let member = variant.member.as_str();
            member
                .strip_prefix(union)
                .filter(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
                .unwrap_or(member)
                .to_upper_camel_case()
        })
        .collect();

    candidates
        .iter()
        .zip(&hierarchy.variants)
        .map(|(candidate, variant)| {
            if candidates.iter().filter(|c| *c == candidate).count() > 1 {
                type_ident(&variant.member)
            } else {
                candidate.clone()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FluentRule, RuleSet};
    use crate::fixtures;
    use crate::resolve;
    use crate::schema::MethodElement;
    use crate::unions::UnionVariant;

    fn rendered(compact: bool) -> String {
        let api = resolve::resolve(fixtures::model(), &RuleSet::telegram()).unwrap();
        render(&api, RenderOptions { compact })
    }

    /// The item starting at `header`, up to its closing brace.
    fn item<'a>(out: &'a str, header: &str) -> &'a str {
        let start = out
            .find(header)
            .unwrap_or_else(|| panic!("missing `{header}`"));
        let end = out[start..]
            .find("\n}\n")
            .map_or(out.len(), |end| start + end + 3);
        &out[start..end]
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(rendered(false), rendered(false));
        assert!(rendered(false).starts_with("// @generated by botgen"));
    }

    #[test]
    fn test_wrapper_types() {
        let out = rendered(false);

        assert!(out.contains(
            "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]\n#[serde(transparent)]\npub struct ChatId(pub i64);"
        ));
        assert!(out.contains("pub struct InlineMessageId(pub String);"));
        assert!(out.contains("impl From<i64> for ChatId {"));
        // Unused wrappers are not emitted
        assert!(!out.contains("pub struct FileId("));
    }

    #[test]
    fn test_records() {
        let out = rendered(false);

        let message = item(&out, "pub struct Message {");
        assert!(message.contains("    pub message_id: MessageId,\n"));
        assert!(message.contains(
            "    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n    pub reply_to_message: Option<Box<Message>>,\n"
        ));
        assert!(message.contains("    pub chat: Chat,\n"));

        let callback = item(&out, "pub struct CallbackQuery {");
        assert!(callback.contains("    pub id: CallbackQueryId,\n"));
        assert!(callback.contains("    pub message: Option<Message>,\n"));
        assert!(callback.contains("    pub inline_message_id: Option<InlineMessageId>,\n"));

        let chat = item(&out, "pub struct Chat {");
        assert!(chat.contains("    pub r#type: String,\n"));
        assert!(!chat.contains("rename"));
    }

    #[test]
    fn test_elided_tag_union() {
        let out = rendered(false);

        let scope = item(&out, "pub struct BotCommandScopeChat {");
        assert!(scope.contains("    pub chat_id: ChatId,\n"));
        assert!(!scope.contains("type"));
        assert!(out.contains("pub struct BotCommandScopeDefault {}\n"));

        let union = item(&out, "#[serde(tag = \"type\")]\npub enum BotCommandScope {");
        assert!(union.contains(
            "    #[serde(rename = \"all_private_chats\")]\n    AllPrivateChats(BotCommandScopeAllPrivateChats),\n"
        ));
        assert!(!out.contains("impl<'de> Deserialize<'de> for BotCommandScope "));
    }

    #[test]
    fn test_kept_tag_and_structural_unions() {
        let out = rendered(false);

        let owner = item(&out, "pub struct ChatMemberOwner {");
        assert!(owner.contains("    pub status: String,\n"));

        let member = item(&out, "impl<'de> Deserialize<'de> for ChatMember {");
        assert!(member.contains("payload.get(\"status\")"));
        assert!(member.contains("Some(\"kicked\") => from_payload(payload).map(Self::Banned),"));

        let content = item(&out, "impl<'de> Deserialize<'de> for InputMessageContent {");
        assert!(content.contains(
            "        if has_key(&payload, \"latitude\") {\n            return from_payload(payload).map(Self::InputLocationMessageContent);\n        }\n"
        ));
        assert!(content.contains("no_match(\"InputMessageContent\""));
    }

    #[test]
    fn test_event_envelope() {
        let out = rendered(false);

        assert!(!out.contains("pub struct Update {"));
        let kinds = item(&out, "pub enum UpdateKind {");
        assert!(kinds.contains("    EditedMessage,\n"));
        assert!(out.contains("            Self::EditedMessage => \"EDITED_MESSAGE\",\n"));

        let sibling = item(&out, "pub struct EditedMessageUpdate {");
        assert!(sibling.contains("    pub update_id: UpdateId,\n"));
        assert!(sibling.contains("    pub edited_message: Message,\n"));

        let envelope = item(&out, "pub enum Update {");
        assert!(envelope.contains("    CallbackQuery(CallbackQueryUpdate),\n"));
        assert!(out.contains("    pub fn update_id(&self) -> &UpdateId {"));
        assert!(
            out.contains("UpdateKind::InlineQuery => from_payload(payload).map(Self::InlineQuery),")
        );
    }

    #[test]
    fn test_requests_and_client() {
        let out = rendered(false);

        let inline = item(&out, "pub struct EditInlineMessageTextRequest {");
        assert!(inline.contains("    pub inline_message_id: InlineMessageId,\n"));
        assert!(!inline.contains("pub chat_id"));
        assert_eq!(
            out.matches("const METHOD: &'static str = \"editMessageText\";")
                .count(),
            2
        );

        let response = item(&out, "impl Request for EditInlineMessageTextRequest {");
        assert!(response.contains("type Response = bool;"));

        let send = item(&out, "pub struct SendMessageRequest {");
        assert!(send.contains("    /// Defaults to `false`.\n"));
        assert!(send.contains(
            "    #[serde(skip_serializing_if = \"Option::is_none\")]\n    pub reply_to_message_id: Option<MessageId>,\n"
        ));

        assert!(out.contains("    pub fn get_me(&self) -> Result<User, T::Error> {"));
        assert!(out.contains("        self.transport.call(&GetMeRequest {})\n"));
        assert!(out.contains("    pub fn get_chat_member(\n        &self,\n        chat_id: ChatId,\n        user_id: UserId,\n    ) -> Result<ChatMember, T::Error> {"));
        assert!(out.contains("        scope: Option<BotCommandScope>,\n"));
    }

    #[test]
    fn test_fluent_methods() {
        let out = rendered(false);

        let message = item(&out, "impl Message {");
        assert!(message.contains("    pub fn reply<T: Transport>(\n        &self,\n        bot: &Bot<T>,\n        text: String,\n        disable_notification: Option<bool>,\n    ) -> Result<Message, T::Error> {\n"));
        assert!(message.contains(
            "        bot.send_message(self.chat.id, text, Some(self.message_id), disable_notification)\n"
        ));
        assert!(
            message.contains("        bot.edit_message_text(self.chat.id, self.message_id, text)\n")
        );

        let chat = item(&out, "impl Chat {");
        assert!(
            chat.contains("        bot.send_message(self.id, text, reply_to_message_id, Some(true))\n")
        );

        let callback = item(&out, "impl CallbackQuery {");
        assert!(callback.contains("        bot.answer_callback_query(self.id.clone(), text)\n"));
        assert!(!out.contains("impl InlineQuery {"));
    }

    #[test]
    fn test_fluent_receiver_and_literal_arguments() {
        let mut model = fixtures::model();
        model.methods.push(MethodElement::new(
            "sendContactCard",
            vec![
                Field::new("chat_id", FieldType::Primitive(Primitive::Integer)),
                Field::new("user", FieldType::Reference(ElementName::new("User"))).optional(),
            ],
            FieldType::Reference(ElementName::new("Message")),
        ));
        let mut rules = RuleSet::telegram();
        rules.fluent.extend([
            FluentRule {
                receiver: "User",
                name: "share_to",
                delegate: "sendContactCard",
                bindings: &[("user", Binding::Receiver)],
            },
            FluentRule {
                receiver: "Chat",
                name: "reply_to_first",
                delegate: "sendMessage",
                bindings: &[
                    ("chat_id", Binding::Field(&["id"])),
                    ("reply_to_message_id", Binding::Literal(Literal::Integer(1))),
                ],
            },
            FluentRule {
                receiver: "CallbackQuery",
                name: "acknowledge",
                delegate: "answerCallbackQuery",
                bindings: &[
                    ("callback_query_id", Binding::Literal(Literal::String("x"))),
                    ("text", Binding::Literal(Literal::String("Done"))),
                ],
            },
        ]);
        let api = resolve::resolve(model, &rules).unwrap();
        let out = render(&api, RenderOptions { compact: false });

        let user = item(&out, "impl User {");
        assert!(user.contains("        chat_id: ChatId,\n    ) -> Result<Message, T::Error> {\n"));
        assert!(user.contains("        bot.send_contact_card(chat_id, Some(self.clone()))\n"));

        let chat = item(&out, "impl Chat {");
        assert!(chat.contains(
            "        bot.send_message(self.id, text, Some(MessageId(1)), disable_notification)\n"
        ));

        let callback = item(&out, "impl CallbackQuery {");
        assert!(callback.contains(
            "        bot.answer_callback_query(CallbackQueryId(\"x\".to_string()), Some(\"Done\".to_string()))\n"
        ));
    }

    #[test]
    fn test_compact_docs() {
        let full = rendered(false);
        let compact = rendered(true);

        assert!(full.contains("At most one of the optional parameters"));
        assert!(!compact.contains("At most one of the optional parameters"));
        assert!(compact.contains("/// This object represents an incoming update.\n"));
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(field_ident("type"), "r#type");
        assert_eq!(field_ident("self"), "self_");
        assert_eq!(field_ident("from"), "from");
        assert_eq!(fn_ident("editMessageText"), "edit_message_text");
        assert_eq!(request_ident(&ElementName::new("getMe")), "GetMeRequest");
    }

    #[test]
    fn test_variant_idents_fall_back_on_collision() {
        let variant = |member: &str| UnionVariant {
            member: ElementName::new(member),
            key: String::new(),
        };
        let hierarchy = UnionHierarchy {
            name: ElementName::new("Origin"),
            discriminator: Discriminator::Structural,
            variants: vec![variant("OriginUser"), variant("User"), variant("Originator")],
        };

        assert_eq!(
            variant_idents(&hierarchy),
            vec!["OriginUser", "User", "Originator"]
        );
    }
}
