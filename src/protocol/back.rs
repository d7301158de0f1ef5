//! Back protocol wire types: the OpenAI-compatible chat-completions upstream.

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Chat Completion request wire type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackRequest {
    pub model: String,
    pub messages: Vec<BackMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackMessage {
    pub role: &'static str,
    pub content: BackContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BackContent {
    Text(String),
    Parts(Vec<BackContentPart>),
}

/// A typed content part, or a value forwarded exactly as the caller sent it.
#[derive(Debug, Clone, PartialEq)]
pub enum BackContentPart {
    Text { text: String },
    ImageUrl { url: String },
    Passthrough(serde_json::Value),
}

#[derive(Serialize)]
struct ImageUrlRef<'a> {
    url: &'a str,
}

impl Serialize for BackContentPart {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            BackContentPart::Text { text } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "text")?;
                map.serialize_entry("text", text)?;
                map.end()
            }
            BackContentPart::ImageUrl { url } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "image_url")?;
                map.serialize_entry("image_url", &ImageUrlRef { url })?;
                map.end()
            }
            BackContentPart::Passthrough(value) => value.serialize(serializer),
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient field decoding
// ---------------------------------------------------------------------------

/// Decode a field, falling back to its default when the value is `null` or
/// of an unexpected type.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Token counts: integers as sent, finite non-negative floats truncated,
/// anything else absent.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_tokens<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n as u64)
    }))
}

// ---------------------------------------------------------------------------
// Non-streaming response
// ---------------------------------------------------------------------------

/// Chat Completion response. Every field tolerates absence, `null` and
/// mistyped values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub choices: Vec<BackChoice>,
    #[serde(default, deserialize_with = "lenient")]
    pub usage: Option<BackUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackChoice {
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<BackResponseMessage>,
    #[serde(default, deserialize_with = "lenient")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackResponseMessage {
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BackUsage {
    #[serde(default, deserialize_with = "lenient_tokens")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient_tokens")]
    pub completion_tokens: Option<u64>,
}

// ---------------------------------------------------------------------------
// Streaming chunk
// ---------------------------------------------------------------------------

/// One decoded `data:` payload of a streaming response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackStreamChunk {
    #[serde(default, deserialize_with = "lenient")]
    pub choices: Vec<BackStreamChoice>,
    #[serde(default, deserialize_with = "lenient")]
    pub usage: Option<BackUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackStreamChoice {
    #[serde(default, deserialize_with = "lenient")]
    pub delta: Option<BackDelta>,
    #[serde(default, deserialize_with = "lenient")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackDelta {
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<String>,
}

impl BackStreamChunk {
    /// Text fragment of the first choice, if non-empty.
    #[must_use]
    pub fn content_fragment(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.as_ref())
            .and_then(|delta| delta.content.as_deref())
            .filter(|text| !text.is_empty())
    }

    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.finish_reason.as_deref())
    }

    #[must_use]
    pub fn completion_tokens(&self) -> Option<u64> {
        self.usage.and_then(|usage| usage.completion_tokens)
    }
}

// ---------------------------------------------------------------------------
// Model listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackModelList {
    #[serde(default, deserialize_with = "lenient")]
    pub data: Vec<BackModel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackModel {
    pub id: String,
    /// Unix seconds.
    #[serde(default, deserialize_with = "lenient")]
    pub created: Option<i64>,
}
