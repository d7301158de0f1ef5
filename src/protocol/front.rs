//! Front protocol wire types: the Messages-style surface exposed to callers.

use serde::{Deserialize, Deserializer, Serialize};

/// Messages API request wire type.
///
/// `model` is optional at the type level so that its absence can be reported
/// as an invalid request rather than a deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system: Option<FrontSystem>,
    pub messages: Vec<FrontMessage>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub top_p: Option<f64>,
    #[serde(default)]
    pub stop_sequences: Option<Vec<String>>,
    #[serde(default, deserialize_with = "deserialize_truthy")]
    pub stream: bool,
}

/// Top-level system prompt: a plain string or a list of content blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FrontSystem {
    Text(String),
    Blocks(Vec<FrontContentBlock>),
}

impl FrontSystem {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            FrontSystem::Text(text) => text.is_empty(),
            FrontSystem::Blocks(blocks) => blocks.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontRole {
    System,
    User,
    Assistant,
}

/// Messages API message wire type.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontMessage {
    pub role: FrontRole,
    pub content: FrontContent,
}

/// Message content: a plain string or an ordered list of blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FrontContent {
    Text(String),
    Blocks(Vec<FrontContentBlock>),
}

/// A content block in a request message.
///
/// Blocks of an unmodeled kind, and modeled kinds missing their required
/// fields, are kept verbatim in [`FrontContentBlock::Other`].
#[derive(Debug, Clone, PartialEq)]
pub enum FrontContentBlock {
    Text { text: String },
    Image { media_type: String, data: String },
    Other(serde_json::Value),
}

impl FrontContentBlock {
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Self {
        match value.get("type").and_then(serde_json::Value::as_str) {
            Some("text") => match value.get("text").and_then(serde_json::Value::as_str) {
                Some(text) => FrontContentBlock::Text {
                    text: text.to_string(),
                },
                None => FrontContentBlock::Other(value),
            },
            Some("image") => {
                let source = value.get("source");
                let media_type = source
                    .and_then(|s| s.get("media_type"))
                    .and_then(serde_json::Value::as_str);
                let data = source
                    .and_then(|s| s.get("data"))
                    .and_then(serde_json::Value::as_str);
                match (media_type, data) {
                    (Some(media_type), Some(data)) => FrontContentBlock::Image {
                        media_type: media_type.to_string(),
                        data: data.to_string(),
                    },
                    _ => FrontContentBlock::Other(value),
                }
            }
            _ => FrontContentBlock::Other(value),
        }
    }
}

impl<'de> Deserialize<'de> for FrontContentBlock {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(FrontContentBlock::from_value)
    }
}

/// JSON truthiness: `null`, `false`, `0`, `""` are false; everything else is true.
#[must_use]
pub fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

fn deserialize_truthy<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(|value| is_truthy(&value))
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontStopReason {
    EndTurn,
    MaxTokens,
}

/// A content block in a response. This protocol pair only yields text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrontResponseBlock {
    Text { text: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Messages API response wire type, also the `message_start` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub role: String,
    pub content: Vec<FrontResponseBlock>,
    pub model: String,
    pub stop_reason: Option<FrontStopReason>,
    pub usage: FrontUsage,
}

impl FrontResponse {
    #[must_use]
    pub fn assistant(
        id: String,
        model: String,
        content: Vec<FrontResponseBlock>,
        stop_reason: Option<FrontStopReason>,
        usage: FrontUsage,
    ) -> Self {
        Self {
            id,
            type_: "message".to_string(),
            role: "assistant".to_string(),
            content,
            model,
            stop_reason,
            usage,
        }
    }
}

// ---------------------------------------------------------------------------
// Stream events
// ---------------------------------------------------------------------------

/// Front SSE stream event. Serialized as the `data:` payload; the `event:`
/// line carries [`FrontStreamEvent::event_name`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrontStreamEvent {
    MessageStart {
        message: FrontResponse,
    },
    ContentBlockStart {
        index: usize,
        content_block: FrontResponseBlock,
    },
    ContentBlockDelta {
        index: usize,
        delta: FrontDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: FrontMessageDelta,
        usage: FrontDeltaUsage,
    },
    MessageStop {},
}

impl FrontStreamEvent {
    #[must_use]
    pub fn event_name(&self) -> &'static str {
        match self {
            FrontStreamEvent::MessageStart { .. } => "message_start",
            FrontStreamEvent::ContentBlockStart { .. } => "content_block_start",
            FrontStreamEvent::ContentBlockDelta { .. } => "content_block_delta",
            FrontStreamEvent::ContentBlockStop { .. } => "content_block_stop",
            FrontStreamEvent::MessageDelta { .. } => "message_delta",
            FrontStreamEvent::MessageStop {} => "message_stop",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FrontDelta {
    TextDelta { text: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontMessageDelta {
    pub stop_reason: FrontStopReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontDeltaUsage {
    pub output_tokens: u64,
}

// ---------------------------------------------------------------------------
// Model listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontModelInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub display_name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontModelList {
    pub data: Vec<FrontModelInfo>,
    pub has_more: bool,
    pub first_id: Option<String>,
    pub last_id: Option<String>,
}

impl FrontModelList {
    #[must_use]
    pub fn from_models(data: Vec<FrontModelInfo>) -> Self {
        let first_id = data.first().map(|m| m.id.clone());
        let last_id = data.last().map(|m| m.id.clone());
        Self {
            data,
            has_more: false,
            first_id,
            last_id,
        }
    }
}
