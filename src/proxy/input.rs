// Input validation for untrusted client bodies

use serde_json::{Map, Value};

use super::error::ProxyError;
use super::ActionKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterReplyInput {
    pub current_node: String,
    pub discovered_clues: Vec<String>,
    pub history: Vec<HistoryEntry>,
    pub prompt: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionStats {
    pub composure: f64,
    pub insight: f64,
    pub leverage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectorSummaryInput {
    pub clues: Vec<String>,
    pub current_node: String,
    pub mission_log: Vec<String>,
    pub stats: MissionStats,
    pub time_remaining: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClueImageInput {
    pub prompt: String,
}

/// Validated input for one of the three actions.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionInput {
    CharacterReply(CharacterReplyInput),
    DirectorSummary(DirectorSummaryInput),
    ClueImage(ClueImageInput),
}

pub fn validate(action: ActionKind, value: &Value) -> Result<ActionInput, ProxyError> {
    match action {
        ActionKind::CharacterReply => character_reply(value).map(ActionInput::CharacterReply),
        ActionKind::DirectorSummary => director_summary(value).map(ActionInput::DirectorSummary),
        ActionKind::ClueImage => clue_image(value).map(ActionInput::ClueImage),
    }
}

pub fn character_reply(value: &Value) -> Result<CharacterReplyInput, ProxyError> {
    let obj = as_object(value, "character reply input")?;

    Ok(CharacterReplyInput {
        current_node: required_string(obj, "currentNode")?,
        discovered_clues: string_array(obj, "discoveredClues")?,
        history: history(obj.get("history"))?,
        prompt: required_string(obj, "prompt")?,
        system_prompt: required_string(obj, "systemPrompt")?,
    })
}

pub fn director_summary(value: &Value) -> Result<DirectorSummaryInput, ProxyError> {
    let (obj, stats) = value
        .as_object()
        .and_then(|obj| obj.get("stats").and_then(Value::as_object).map(|s| (obj, s)))
        .ok_or_else(|| ProxyError::validation("director summary input"))?;

    Ok(DirectorSummaryInput {
        clues: string_array(obj, "clues")?,
        current_node: required_string(obj, "currentNode")?,
        mission_log: string_array(obj, "missionLog")?,
        stats: MissionStats {
            composure: number(stats.get("composure"), "stats.composure")?,
            insight: number(stats.get("insight"), "stats.insight")?,
            leverage: number(stats.get("leverage"), "stats.leverage")?,
        },
        time_remaining: number(obj.get("timeRemaining"), "timeRemaining")?,
    })
}

pub fn clue_image(value: &Value) -> Result<ClueImageInput, ProxyError> {
    let obj = as_object(value, "clue image input")?;

    Ok(ClueImageInput {
        prompt: required_string(obj, "prompt")?,
    })
}

fn as_object<'a>(value: &'a Value, shape: &str) -> Result<&'a Map<String, Value>, ProxyError> {
    value.as_object().ok_or_else(|| ProxyError::validation(shape))
}

/// Non-blank string; the untrimmed value is returned.
fn required_string(obj: &Map<String, Value>, field: &str) -> Result<String, ProxyError> {
    match obj.get(field).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(ProxyError::validation(field)),
    }
}

fn string_array(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>, ProxyError> {
    obj.get(field)
        .and_then(Value::as_array)
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| ProxyError::validation(field))
}

fn history(value: Option<&Value>) -> Result<Vec<HistoryEntry>, ProxyError> {
    let entries = value
        .and_then(Value::as_array)
        .ok_or_else(|| ProxyError::validation("history"))?;

    entries
        .iter()
        .map(|entry| {
            let role = match entry.get("role").and_then(Value::as_str) {
                Some("user") => HistoryRole::User,
                Some("assistant") => HistoryRole::Assistant,
                _ => return Err(ProxyError::validation("history")),
            };
            let text = entry
                .get("text")
                .and_then(Value::as_str)
                .ok_or_else(|| ProxyError::validation("history"))?;

            Ok(HistoryEntry {
                role,
                text: text.to_string(),
            })
        })
        .collect()
}

/// Lenient numeric read: numbers pass through, numeric strings (decimal or
/// `0x`/`0o`/`0b` prefixed), booleans and null are coerced. Anything that
/// does not end up finite is rejected.
fn number(value: Option<&Value>, field: &str) -> Result<f64, ProxyError> {
    let coerced = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Some(0.0)
            } else {
                parse_numeric(s)
            }
        }
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        Some(Value::Null) => Some(0.0),
        _ => None,
    };

    coerced
        .filter(|n| n.is_finite())
        .ok_or_else(|| ProxyError::validation(field))
}

fn parse_numeric(s: &str) -> Option<f64> {
    let radix = match s.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => return s.parse::<f64>().ok(),
    };
    let digits = &s[2..];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return None;
    }
    u128::from_str_radix(digits, radix).ok().map(|n| n as f64)
}
