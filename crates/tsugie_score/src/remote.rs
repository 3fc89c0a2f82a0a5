//! Remote JSON-mode chat scoring call (§4.4).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tsugie_core::text::clean_text;

use crate::input::ScoreInput;

const PROMPT_TEMPLATE: &str = "次の日本語イベント情報をもとに、今年の注目度を評価してください。\n出力は次のJSONオブジェクトのみ: {\"initial_heat_score\": 0-100の整数, \"surprise_score\": 0-100の整数, \"reason\": \"80字以内の理由\"}\n\nイベント情報:\n{イベント情報}";

#[derive(Debug, Error)]
pub enum RemoteScoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("response parse error: {0}")]
    Parse(String),
}

/// A parsed, range-validated score from the remote model.
pub struct RemoteScore {
    pub initial_heat_score: i64,
    pub surprise_score: i64,
    pub reason: String,
}

/// Calls a JSON-mode chat completion endpoint for one event's score.
pub struct RemoteScorer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl RemoteScorer {
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: "https://api.openai.com/v1/chat/completions".to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Scores one input, requiring an integer `initial_heat_score`/
    /// `surprise_score` (clamped 0-100) and a `reason` (≤80 chars after
    /// cleanup) in the model's JSON response.
    pub async fn score(&self, input: &ScoreInput) -> Result<RemoteScore, RemoteScoreError> {
        let prompt = PROMPT_TEMPLATE.replace(
            "{イベント情報}",
            &serde_json::to_string(input).map_err(|e| RemoteScoreError::Parse(e.to_string()))?,
        );

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: &prompt }],
            response_format: ResponseFormat { format_type: "json_object" },
        };

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RemoteScoreError::Parse(format!("http {status}: {body}")));
        }

        let envelope: ChatEnvelope = serde_json::from_str(&body).map_err(|e| RemoteScoreError::Parse(e.to_string()))?;
        let content = envelope
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        let parsed = parse_score_object(content).ok_or_else(|| RemoteScoreError::Parse("missing score fields".to_string()))?;
        Ok(RemoteScore {
            initial_heat_score: parsed.initial_heat_score.clamp(0, 100),
            surprise_score: parsed.surprise_score.clamp(0, 100),
            reason: clean_text(&parsed.reason).chars().take(80).collect(),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatEnvelope {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ScoreObject {
    initial_heat_score: i64,
    surprise_score: i64,
    reason: String,
}

/// Parses the model's JSON object out of a response that may wrap it in a
/// fenced code block or surrounding prose, mirroring the content stage's
/// translation-bundle parser.
fn parse_score_object(raw: &str) -> Option<ScoreObject> {
    if let Ok(parsed) = serde_json::from_str::<ScoreObject>(raw.trim()) {
        return Some(parsed);
    }

    let value: Value = serde_json::from_str(raw.trim()).ok().or_else(|| {
        let first = raw.find('{')?;
        let last = raw.rfind('}')?;
        if last <= first {
            return None;
        }
        serde_json::from_str(&raw[first..=last]).ok()
    })?;

    serde_json::from_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_score_object_handles_surrounding_prose() {
        let raw = "here: {\"initial_heat_score\": 70, \"surprise_score\": 40, \"reason\": \"activity\"} thanks";
        let parsed = parse_score_object(raw).unwrap();
        assert_eq!(parsed.initial_heat_score, 70);
        assert_eq!(parsed.surprise_score, 40);
    }

    #[test]
    fn parse_score_object_rejects_garbage() {
        assert!(parse_score_object("not json").is_none());
    }
}
