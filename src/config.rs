//! Static generation rules
//!
//! The closed set of tables that drive resolution: wrapper types for
//! primitive identifiers, method variations, fluent methods, union
//! discriminator conventions and the event envelope. Supplied once at
//! startup; changing a table changes the generated output deterministically.

use crate::schema::{ElementName, Field, Primitive};
use serde::Serialize;

/// Decides whether a field of `owner` gets a wrapper type.
pub type FieldPredicate = fn(&ElementName, &Field) -> bool;

/// Maps a primitive field onto a single-field wrapper type.
#[derive(Debug, Clone)]
pub struct ValueTypeRule {
    /// Wrapper type name
    pub name: &'static str,
    pub backing: Primitive,
    pub doc: &'static str,
    pub predicate: FieldPredicate,
}

/// Derives one concrete operation from a base method.
#[derive(Debug, Clone)]
pub struct MethodVariationRule {
    /// Base method name
    pub method: &'static str,
    /// Parameters forced non-optional, default cleared
    pub required: &'static [&'static str],
    /// Parameters dropped entirely
    pub skip: &'static [&'static str],
    pub new_name: &'static str,
    /// Written like a declared type, e.g. `Message` or `True`
    pub new_returns: &'static str,
    /// Ordered (regex pattern, replacement) pairs applied to the description
    pub rewrites: &'static [(&'static str, &'static str)],
}

/// A convenience method on `receiver` that forwards to `delegate`.
#[derive(Debug, Clone)]
pub struct FluentRule {
    pub receiver: &'static str,
    pub name: &'static str,
    /// Final (post-variation) name of the delegate method
    pub delegate: &'static str,
    /// Delegate parameter name -> value taken from the receiver
    pub bindings: &'static [(&'static str, Binding)],
}

/// Where a bound fluent argument comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "from", content = "value", rename_all = "snake_case")]
pub enum Binding {
    /// The receiver itself
    Receiver,
    /// A field path on the receiver, e.g. `["chat", "id"]`
    Field(&'static [&'static str]),
    Literal(Literal),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Integer(i64),
    String(&'static str),
}

/// Discriminator conventions for union hierarchies.
#[derive(Debug, Clone)]
pub struct UnionConfig {
    /// Wire names recognized as explicit tag fields
    pub discriminator_names: &'static [&'static str],
    /// Unions whose members keep the tag field as an ordinary field
    pub keep_discriminator: &'static [&'static str],
    /// Wire names never chosen as a structural discriminator
    pub structural_blocklist: &'static [&'static str],
}

/// The flat incoming-event record whose optional fields are its variants.
#[derive(Debug, Clone)]
pub struct EventEnvelopeRule {
    pub type_name: &'static str,
    /// Field shared by every event
    pub id_field: &'static str,
    /// Name of the synthesized event-kind enumeration
    pub kind_enum: &'static str,
    /// Appended to the payload name to build each sibling record name
    pub sibling_suffix: &'static str,
}

/// Every table the pipeline reads.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub value_types: Vec<ValueTypeRule>,
    pub variations: Vec<MethodVariationRule>,
    pub fluent: Vec<FluentRule>,
    pub unions: UnionConfig,
    pub envelope: Option<EventEnvelopeRule>,
}

impl RuleSet {
    /// Tables for the Telegram Bot API.
    pub fn telegram() -> Self {
        Self {
            value_types: telegram_value_types(),
            variations: telegram_variations(),
            fluent: telegram_fluent(),
            unions: UnionConfig {
                discriminator_names: &["type", "status", "source"],
                keep_discriminator: &["ChatMember"],
                structural_blocklist: &["description"],
            },
            envelope: Some(EventEnvelopeRule {
                type_name: "Update",
                id_field: "update_id",
                kind_enum: "UpdateKind",
                sibling_suffix: "Update",
            }),
        }
    }
}

fn is_own_id(owner: &ElementName, field: &Field, type_name: &str) -> bool {
    owner == type_name && field.wire_name == "id"
}

// Suffix predicates overlap ("inline_message_id" ends with "message_id"),
// so each one excludes its competitors explicitly.
fn telegram_value_types() -> Vec<ValueTypeRule> {
    vec![
        ValueTypeRule {
            name: "UserId",
            backing: Primitive::Integer,
            doc: "Unique identifier of a user or bot.",
            predicate: |owner, field| {
                field.wire_name.ends_with("user_id") || is_own_id(owner, field, "User")
            },
        },
        ValueTypeRule {
            name: "ChatId",
            backing: Primitive::Integer,
            doc: "Unique identifier of a chat.",
            predicate: |owner, field| {
                field.wire_name.ends_with("chat_id") || is_own_id(owner, field, "Chat")
            },
        },
        ValueTypeRule {
            name: "MessageId",
            backing: Primitive::Integer,
            doc: "Unique identifier of a message inside its chat.",
            predicate: |_, field| {
                field.wire_name.ends_with("message_id")
                    && !field.wire_name.ends_with("inline_message_id")
            },
        },
        ValueTypeRule {
            name: "InlineMessageId",
            backing: Primitive::String,
            doc: "Identifier of a message sent via the bot in inline mode.",
            predicate: |_, field| field.wire_name.ends_with("inline_message_id"),
        },
        ValueTypeRule {
            name: "FileId",
            backing: Primitive::String,
            doc: "Identifier used to download or reuse a file.",
            predicate: |_, field| field.wire_name.ends_with("file_id"),
        },
        ValueTypeRule {
            name: "FileUniqueId",
            backing: Primitive::String,
            doc: "Identifier of a file that is stable over time and across bots.",
            predicate: |_, field| field.wire_name.ends_with("file_unique_id"),
        },
        ValueTypeRule {
            name: "UpdateId",
            backing: Primitive::Integer,
            doc: "Sequential identifier of an incoming update.",
            predicate: |owner, field| owner == "Update" && field.wire_name == "update_id",
        },
        ValueTypeRule {
            name: "CallbackQueryId",
            backing: Primitive::String,
            doc: "Unique identifier of a callback query.",
            predicate: |owner, field| {
                field.wire_name == "callback_query_id" || is_own_id(owner, field, "CallbackQuery")
            },
        },
        ValueTypeRule {
            name: "InlineQueryId",
            backing: Primitive::String,
            doc: "Unique identifier of an inline query.",
            predicate: |owner, field| {
                field.wire_name == "inline_query_id" || is_own_id(owner, field, "InlineQuery")
            },
        },
    ]
}

const EDITED_RESULT: &str = r"if the edited message is not an inline message, the edited Message is returned, otherwise True is returned";
const STOPPED_RESULT: &str = r"if the message is not an inline message, the edited Message is returned, otherwise True is returned";

type Rewrites = &'static [(&'static str, &'static str)];

const EDITED_TO_MESSAGE: Rewrites = &[(EDITED_RESULT, "the edited Message is returned")];
const EDITED_TO_TRUE: Rewrites = &[(EDITED_RESULT, "True is returned")];
const STOPPED_TO_MESSAGE: Rewrites = &[(STOPPED_RESULT, "the edited Message is returned")];
const STOPPED_TO_TRUE: Rewrites = &[(STOPPED_RESULT, "True is returned")];

// Each editable-message method accepts either a chat/message pair or an
// inline message identifier; the server rejects any other combination.
fn telegram_variations() -> Vec<MethodVariationRule> {
    let mut rules = Vec::new();
    for (method, inline_name, to_message, to_true) in [
        (
            "editMessageText",
            "editInlineMessageText",
            EDITED_TO_MESSAGE,
            EDITED_TO_TRUE,
        ),
        (
            "editMessageCaption",
            "editInlineMessageCaption",
            EDITED_TO_MESSAGE,
            EDITED_TO_TRUE,
        ),
        (
            "editMessageMedia",
            "editInlineMessageMedia",
            EDITED_TO_MESSAGE,
            EDITED_TO_TRUE,
        ),
        (
            "editMessageReplyMarkup",
            "editInlineMessageReplyMarkup",
            EDITED_TO_MESSAGE,
            EDITED_TO_TRUE,
        ),
        (
            "editMessageLiveLocation",
            "editInlineMessageLiveLocation",
            EDITED_TO_MESSAGE,
            EDITED_TO_TRUE,
        ),
        (
            "stopMessageLiveLocation",
            "stopInlineMessageLiveLocation",
            STOPPED_TO_MESSAGE,
            STOPPED_TO_TRUE,
        ),
    ] {
        rules.push(MethodVariationRule {
            method,
            required: &["chat_id", "message_id"],
            skip: &["inline_message_id"],
            new_name: method,
            new_returns: "Message",
            rewrites: to_message,
        });
        rules.push(MethodVariationRule {
            method,
            required: &["inline_message_id"],
            skip: &["chat_id", "message_id"],
            new_name: inline_name,
            new_returns: "True",
            rewrites: to_true,
        });
    }
    rules
}

fn telegram_fluent() -> Vec<FluentRule> {
    const CHAT_ID: Binding = Binding::Field(&["chat", "id"]);
    const MESSAGE_ID: Binding = Binding::Field(&["message_id"]);

    vec![
        FluentRule {
            receiver: "Message",
            name: "reply",
            delegate: "sendMessage",
            bindings: &[("chat_id", CHAT_ID), ("reply_to_message_id", MESSAGE_ID)],
        },
        FluentRule {
            receiver: "Message",
            name: "forward_to",
            delegate: "forwardMessage",
            bindings: &[("from_chat_id", CHAT_ID), ("message_id", MESSAGE_ID)],
        },
        FluentRule {
            receiver: "Message",
            name: "edit_text",
            delegate: "editMessageText",
            bindings: &[("chat_id", CHAT_ID), ("message_id", MESSAGE_ID)],
        },
        FluentRule {
            receiver: "Message",
            name: "delete",
            delegate: "deleteMessage",
            bindings: &[("chat_id", CHAT_ID), ("message_id", MESSAGE_ID)],
        },
        FluentRule {
            receiver: "Message",
            name: "pin",
            delegate: "pinChatMessage",
            bindings: &[("chat_id", CHAT_ID), ("message_id", MESSAGE_ID)],
        },
        FluentRule {
            receiver: "Chat",
            name: "send_message",
            delegate: "sendMessage",
            bindings: &[("chat_id", Binding::Field(&["id"]))],
        },
        FluentRule {
            receiver: "Chat",
            name: "send_silent_message",
            delegate: "sendMessage",
            bindings: &[
                ("chat_id", Binding::Field(&["id"])),
                ("disable_notification", Binding::Literal(Literal::Bool(true))),
            ],
        },
        FluentRule {
            receiver: "Chat",
            name: "leave",
            delegate: "leaveChat",
            bindings: &[("chat_id", Binding::Field(&["id"]))],
        },
        FluentRule {
            receiver: "CallbackQuery",
            name: "answer",
            delegate: "answerCallbackQuery",
            bindings: &[("callback_query_id", Binding::Field(&["id"]))],
        },
        FluentRule {
            receiver: "InlineQuery",
            name: "answer",
            delegate: "answerInlineQuery",
            bindings: &[("inline_query_id", Binding::Field(&["id"]))],
        },
    ]
}
