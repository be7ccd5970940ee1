// Proxy module - validates client input, calls OpenRouter, normalizes the reply

pub mod client;
pub mod error;
pub mod input;
pub mod normalize;
pub mod request;
pub mod runtime;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

pub use client::{CallOptions, ChatCompletions, ProviderClient};
pub use error::{NormalizationError, ProxyError, UpstreamError};
pub use input::ActionInput;
pub use normalize::{DirectorSummary, Grade};
pub use runtime::{EnvMap, EnvSource, RuntimeConfig};

const DEFAULT_IMAGE_CAPTION: &str = "AI generated clue image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CharacterReply,
    DirectorSummary,
    ClueImage,
}

impl ActionKind {
    pub const ALL: [ActionKind; 3] = [
        ActionKind::CharacterReply,
        ActionKind::DirectorSummary,
        ActionKind::ClueImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::CharacterReply => "character-reply",
            ActionKind::DirectorSummary => "director-summary",
            ActionKind::ClueImage => "clue-image",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ProxyError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == tag)
            .ok_or_else(|| ProxyError::UnknownAction(tag.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterReply {
    pub reply: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedClueImage {
    pub caption: String,
    pub image_url: String,
}

/// Result of a successful action, serialized as the bare output shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionOutput {
    CharacterReply(CharacterReply),
    DirectorSummary(DirectorSummary),
    ClueImage(GeneratedClueImage),
}

/// Runs one action end to end: validate, resolve config, build, call, normalize.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn ChatCompletions>,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn ChatCompletions>) -> Self {
        Self { client }
    }

    /// Parses the action tag before touching configuration or the network.
    pub async fn execute_tag(
        &self,
        tag: &str,
        raw_input: &Value,
        env: &dyn EnvSource,
        options: &CallOptions,
    ) -> Result<ActionOutput, ProxyError> {
        let action: ActionKind = tag.parse()?;
        self.execute(action, raw_input, env, options).await
    }

    pub async fn execute(
        &self,
        action: ActionKind,
        raw_input: &Value,
        env: &dyn EnvSource,
        options: &CallOptions,
    ) -> Result<ActionOutput, ProxyError> {
        let input = input::validate(action, raw_input)?;
        let config = RuntimeConfig::resolve(env)?;

        match input {
            ActionInput::CharacterReply(input) => {
                let payload = self
                    .client
                    .complete(&config, &request::character_reply(&input, &config), options)
                    .await?;
                let content = normalize::first_message(&payload).and_then(|m| m.get("content"));

                Ok(ActionOutput::CharacterReply(CharacterReply {
                    reply: normalize::message_text(content).trim().to_string(),
                }))
            }
            ActionInput::DirectorSummary(input) => {
                let payload = self
                    .client
                    .complete(&config, &request::director_summary(&input, &config), options)
                    .await?;
                let content = normalize::first_message(&payload).and_then(|m| m.get("content"));
                let summary = normalize::director_summary(&normalize::message_text(content))?;

                Ok(ActionOutput::DirectorSummary(summary))
            }
            ActionInput::ClueImage(input) => {
                let payload = self
                    .client
                    .complete(&config, &request::clue_image(&input, &config), options)
                    .await?;
                let message = normalize::first_message(&payload);
                let image_url = normalize::image_url(message.and_then(|m| m.get("images")))
                    .ok_or(NormalizationError::MissingImage)?;
                let text = normalize::message_text(message.and_then(|m| m.get("content")));
                let caption = match text.trim() {
                    "" => DEFAULT_IMAGE_CAPTION.to_string(),
                    trimmed => trimmed.to_string(),
                };

                Ok(ActionOutput::ClueImage(GeneratedClueImage { caption, image_url }))
            }
        }
    }
}
