// Request payload builders for the OpenRouter chat-completions API

use serde::Serialize;
use serde_json::{json, Value};

use super::input::{CharacterReplyInput, ClueImageInput, DirectorSummaryInput, HistoryRole};
use super::runtime::RuntimeConfig;

const CLUE_SEPARATOR: &str = "；";
const NO_CLUES_YET: &str = "尚未發現關鍵線索";

const CHARACTER_TEMPERATURE: f32 = 0.8;
const CHARACTER_MAX_TOKENS: u32 = 220;
const DIRECTOR_TEMPERATURE: f32 = 0.4;
const DIRECTOR_MAX_TOKENS: u32 = 260;
const IMAGE_TEMPERATURE: f32 = 0.7;
const IMAGE_MAX_TOKENS: u32 = 120;

const DIRECTOR_PERSONA: &str = "You are 司馬遷 serving as a cinematic mission director. \
Evaluate the player's performance as Lin Xiangru. Respond only with JSON matching the schema. \
Write all fields in Traditional Chinese except the grade, which should be one of S, A, B, C, D.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl From<HistoryRole> for ChatRole {
    fn from(role: HistoryRole) -> Self {
        match role {
            HistoryRole::User => ChatRole::User,
            HistoryRole::Assistant => ChatRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageConfig {
    pub aspect_ratio: &'static str,
    pub image_size: &'static str,
}

/// Body of a `POST /chat/completions` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatRequest {
    fn chat(model: &str, messages: Vec<ChatMessage>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            messages,
            temperature,
            max_tokens,
            response_format: None,
            modalities: None,
            image_config: None,
            stream: None,
        }
    }
}

fn join_or(items: &[String], fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(CLUE_SEPARATOR)
    }
}

/// System persona, then the full prior history, then the new prompt.
pub fn character_reply(input: &CharacterReplyInput, config: &RuntimeConfig) -> ChatRequest {
    let system = format!(
        "{}\n\n\
         You are inside the \"完璧歸趙\" historical incident.\n\
         Current node: {}\n\
         Known clues: {}\n\n\
         Stay historically plausible, answer in Traditional Chinese, and never reveal future facts your character could not know.",
        input.system_prompt,
        input.current_node,
        join_or(&input.discovered_clues, NO_CLUES_YET),
    );

    let mut messages = Vec::with_capacity(input.history.len() + 2);
    messages.push(ChatMessage::new(ChatRole::System, system));
    messages.extend(
        input
            .history
            .iter()
            .map(|entry| ChatMessage::new(entry.role.into(), entry.text.clone())),
    );
    messages.push(ChatMessage::new(ChatRole::User, input.prompt.clone()));

    ChatRequest::chat(
        &config.chat_model,
        messages,
        CHARACTER_TEMPERATURE,
        CHARACTER_MAX_TOKENS,
    )
}

pub fn director_summary(input: &DirectorSummaryInput, config: &RuntimeConfig) -> ChatRequest {
    let report = format!(
        "Current node: {}\n\
         Time remaining: {}\n\
         Stats: insight {}, leverage {}, composure {}\n\
         Clues: {}\n\
         Mission log: {}",
        input.current_node,
        input.time_remaining,
        input.stats.insight,
        input.stats.leverage,
        input.stats.composure,
        join_or(&input.clues, "none"),
        join_or(&input.mission_log, "mission just started"),
    );

    let mut request = ChatRequest::chat(
        &config.chat_model,
        vec![
            ChatMessage::new(ChatRole::System, DIRECTOR_PERSONA),
            ChatMessage::new(ChatRole::User, report),
        ],
        DIRECTOR_TEMPERATURE,
        DIRECTOR_MAX_TOKENS,
    );
    request.response_format = Some(director_summary_format());
    request
}

pub fn clue_image(input: &ClueImageInput, config: &RuntimeConfig) -> ChatRequest {
    let mut request = ChatRequest::chat(
        &config.image_model,
        vec![ChatMessage::new(ChatRole::User, input.prompt.clone())],
        IMAGE_TEMPERATURE,
        IMAGE_MAX_TOKENS,
    );
    request.modalities = Some(vec!["image", "text"]);
    request.image_config = Some(ImageConfig {
        aspect_ratio: "16:9",
        image_size: "1K",
    });
    request.stream = Some(false);
    request
}

/// Strict JSON-schema response format for the director summary.
pub fn director_summary_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "director_summary",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "grade": {
                        "type": "string",
                        "enum": ["S", "A", "B", "C", "D"]
                    },
                    "judgement": {
                        "type": "string",
                        "description": "One short assessment of how Lin Xiangru is performing."
                    },
                    "nextStep": {
                        "type": "string",
                        "description": "The next most important strategic move."
                    },
                    "strength": {
                        "type": "string",
                        "description": "The player's clearest strength right now."
                    },
                    "title": {
                        "type": "string",
                        "description": "A dramatic headline for the mission status."
                    },
                    "warning": {
                        "type": "string",
                        "description": "The main danger if the player hesitates or misreads Qin."
                    }
                },
                "required": ["grade", "judgement", "nextStep", "strength", "title", "warning"],
                "additionalProperties": false
            }
        }
    })
}
