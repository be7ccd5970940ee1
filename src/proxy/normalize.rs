// Response normalization for heterogeneous OpenRouter message shapes

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::NormalizationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DirectorSummary {
    pub grade: Grade,
    pub judgement: String,
    pub next_step: String,
    pub strength: String,
    pub title: String,
    pub warning: String,
}

/// `choices[0].message` of a chat-completion payload.
pub fn first_message(payload: &Value) -> Option<&Value> {
    payload.pointer("/choices/0/message")
}

/// Flattens message content into plain text.
///
/// Strings are returned as-is. For a list of parts, each part contributes its
/// `text` (or failing that, its `content`) string; empty contributions are
/// dropped and the rest joined with newlines.
pub fn message_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| {
                part.get("text")
                    .and_then(Value::as_str)
                    .or_else(|| part.get("content").and_then(Value::as_str))
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    }
}

/// First non-empty URL under `image_url.url` or `imageUrl.url`.
pub fn image_url(images: Option<&Value>) -> Option<String> {
    let url_at = |part: &Value, key: &str| {
        part.get(key)
            .and_then(|v| v.get("url"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    };

    images?
        .as_array()?
        .iter()
        .find_map(|part| url_at(part, "image_url").or_else(|| url_at(part, "imageUrl")))
}

pub fn director_summary(raw: &str) -> Result<DirectorSummary, NormalizationError> {
    serde_json::from_str(raw).map_err(NormalizationError::MalformedSummary)
}
