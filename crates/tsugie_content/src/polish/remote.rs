//! Remote chat/response API polisher (§4.3 "Polishing", `openai` backend).
//!
//! Two calls per event: a description-polish prompt, then a one-liner
//! prompt, both against the Responses API. Unless
//! `codex_single_pass_i18n` is set, a third call requests the ZH/EN bundle
//! as a JSON object in one shot.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{PolishBundle, PolishError, Polisher};

const DESCRIPTION_PROMPT: &str = "次の日本語の文章を、イベント紹介として自然な一段落（200〜400字程度）に書き直してください。事実を追加せず、原文にない情報を創作しないでください。\n\n原始文本:\n{原始文本}";
const ONE_LINER_PROMPT: &str = "次の文章を40字前後の一行紹介文に要約してください。\n\n原始文本:\n{原始文本}";
const TRANSLATE_BUNDLE_PROMPT: &str = "次の日本語イベント紹介文を中国語(zh)と英語(en)に翻訳し、それぞれの一段落説明文(description)と一行紹介文(one_liner, 40字前後)を含む次のJSONオブジェクトだけを出力してください。前置きや説明文は不要です。\n{\"description_zh\": \"...\", \"one_liner_zh\": \"...\", \"description_en\": \"...\", \"one_liner_en\": \"...\"}\n\n原始文本:\n{原始文本}";

/// Calls the Responses API for text polishing and JSON-mode translation.
pub struct RemoteChatPolisher {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl RemoteChatPolisher {
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: "https://api.openai.com/v1/responses".to_string(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn call(&self, prompt: &str) -> Result<String, PolishError> {
        let request = ResponsesRequest {
            model: &self.model,
            input: prompt,
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
            let message = serde_json::from_str::<ResponsesErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(PolishError::Parse(format!("http {status}: {message}")));
        }

        let parsed: ResponsesEnvelope =
            serde_json::from_str(&body).map_err(|e| PolishError::Parse(e.to_string()))?;
        let text = extract_output_text(&parsed);
        if text.trim().is_empty() {
            return Err(PolishError::Empty);
        }
        Ok(text.trim().to_string())
    }
}

#[async_trait::async_trait]
impl Polisher for RemoteChatPolisher {
    async fn polish(&self, raw_text: &str, single_pass_i18n: bool) -> Result<PolishBundle, PolishError> {
        let description_ja = self
            .call(&DESCRIPTION_PROMPT.replace("{原始文本}", raw_text))
            .await?;
        let one_liner_ja = self
            .call(&ONE_LINER_PROMPT.replace("{原始文本}", &description_ja))
            .await
            .unwrap_or_else(|_| super::fallback_one_liner(&description_ja));

        let mut bundle = PolishBundle {
            description_ja,
            one_liner_ja,
            model: self.model.clone(),
            ..Default::default()
        };

        if single_pass_i18n {
            bundle.i18n_incomplete = true;
            return Ok(bundle);
        }

        match self
            .call(&TRANSLATE_BUNDLE_PROMPT.replace("{原始文本}", &bundle.description_ja))
            .await
        {
            Ok(raw_json) => {
                if let Some(parsed) = parse_translation_bundle(&raw_json) {
                    bundle.description_zh = parsed.description_zh;
                    bundle.one_liner_zh = parsed.one_liner_zh;
                    bundle.description_en = parsed.description_en;
                    bundle.one_liner_en = parsed.one_liner_en;
                } else {
                    bundle.i18n_incomplete = true;
                }
            }
            Err(_) => bundle.i18n_incomplete = true,
        }

        Ok(bundle)
    }

    fn backend_name(&self) -> &'static str {
        "openai"
    }
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct ResponsesErrorEnvelope {
    error: ResponsesErrorDetail,
}

#[derive(Deserialize)]
struct ResponsesErrorDetail {
    message: String,
}

#[derive(Deserialize)]
struct ResponsesEnvelope {
    output_text: Option<String>,
    #[serde(default)]
    output: Vec<Value>,
}

/// Extracts assistant text from a Responses API payload: the scalar
/// `output_text` convenience field when present, else the first
/// `output[].content[]` chunk of type `output_text`/`text`.
fn extract_output_text(envelope: &ResponsesEnvelope) -> String {
    if let Some(text) = &envelope.output_text
        && !text.trim().is_empty()
    {
        return text.clone();
    }

    for item in &envelope.output {
        let Some(content) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for chunk in content {
            let chunk_type = chunk.get("type").and_then(Value::as_str).unwrap_or("");
            if chunk_type == "output_text" || chunk_type == "text" {
                if let Some(text) = chunk.get("text").and_then(Value::as_str) {
                    if !text.trim().is_empty() {
                        return text.to_string();
                    }
                }
            }
        }
    }
    String::new()
}

#[derive(Deserialize)]
struct TranslationBundle {
    description_zh: String,
    one_liner_zh: String,
    description_en: String,
    one_liner_en: String,
}

/// Parses a JSON object out of a model response that may wrap it in a
/// fenced code block or surrounding prose (§9 `parse_json_object`):
/// direct parse, then a fenced ```` ```json ... ``` ```` block, then the
/// substring between the first `{` and the last `}`.
fn parse_translation_bundle(raw: &str) -> Option<TranslationBundle> {
    if let Ok(bundle) = serde_json::from_str::<TranslationBundle>(raw.trim()) {
        return Some(bundle);
    }

    if let Some(start) = raw.find("```") {
        let after_fence = &raw[start + 3..];
        let after_lang = after_fence.strip_prefix("json").unwrap_or(after_fence);
        if let Some(end) = after_lang.find("```")
            && let Ok(bundle) = serde_json::from_str::<TranslationBundle>(after_lang[..end].trim())
        {
            return Some(bundle);
        }
    }

    let first = raw.find('{')?;
    let last = raw.rfind('}')?;
    if last <= first {
        return None;
    }
    serde_json::from_str::<TranslationBundle>(&raw[first..=last]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_output_text_prefers_scalar_field() {
        let envelope = ResponsesEnvelope {
            output_text: Some("こんにちは".to_string()),
            output: Vec::new(),
        };
        assert_eq!(extract_output_text(&envelope), "こんにちは");
    }

    #[test]
    fn extract_output_text_falls_back_to_nested_chunks() {
        let envelope = ResponsesEnvelope {
            output_text: None,
            output: vec![serde_json::json!({
                "content": [{"type": "output_text", "text": "夏祭り"}]
            })],
        };
        assert_eq!(extract_output_text(&envelope), "夏祭り");
    }

    #[test]
    fn parse_translation_bundle_handles_fenced_json() {
        let raw = "```json\n{\"description_zh\": \"a\", \"one_liner_zh\": \"b\", \"description_en\": \"c\", \"one_liner_en\": \"d\"}\n```";
        let parsed = parse_translation_bundle(raw).unwrap();
        assert_eq!(parsed.description_zh, "a");
        assert_eq!(parsed.one_liner_en, "d");
    }

    #[test]
    fn parse_translation_bundle_handles_surrounding_prose() {
        let raw = "here you go: {\"description_zh\": \"a\", \"one_liner_zh\": \"b\", \"description_en\": \"c\", \"one_liner_en\": \"d\"} thanks";
        assert!(parse_translation_bundle(raw).is_some());
    }
}
