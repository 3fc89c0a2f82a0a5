//! Local subprocess-invoked model polisher (§4.3, §9 "Subprocess-invoked
//! local model"): runs `codex exec` with the prompt on stdin, reads the
//! model's last message back from a temp file, retries up to two times
//! per candidate model, and falls back to a fixed model id on failure.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{PolishBundle, PolishError, Polisher};

const FALLBACK_MODEL: &str = "gpt-5";
const PROBE_PROMPT: &str = "Reply with exactly OK";
const MAX_RETRIES_PER_MODEL: u32 = 2;

const DESCRIPTION_PROMPT: &str = "次の日本語の文章を、イベント紹介として自然な一段落（200〜400字程度）に書き直してください。事実を追加せず、原文にない情報を創作しないでください。\n\n原始文本:\n{原始文本}";
const ONE_LINER_PROMPT: &str = "次の文章を40字前後の一行紹介文に要約してください。\n\n原始文本:\n{原始文本}";
const TRANSLATE_BUNDLE_PROMPT: &str = "次の日本語イベント紹介文を中国語(zh)と英語(en)に翻訳し、それぞれの一段落説明文(description)と一行紹介文(one_liner, 40字前後)を含む次のJSONオブジェクトだけを出力してください。前置きや説明文は不要です。\n{\"description_zh\": \"...\", \"one_liner_zh\": \"...\", \"description_en\": \"...\", \"one_liner_en\": \"...\"}\n\n原始文本:\n{原始文本}";

/// Invokes a `codex exec`-style binary per call. Candidate model ids are
/// tried in order; each is retried up to [`MAX_RETRIES_PER_MODEL`] times
/// before moving to the next, and [`FALLBACK_MODEL`] is tried last if
/// every candidate failed.
pub struct LocalSubprocessPolisher {
    binary: String,
    candidate_models: Vec<String>,
    timeout: Duration,
}

impl LocalSubprocessPolisher {
    #[must_use]
    pub fn new(binary: String, candidate_models: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            binary,
            candidate_models,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// Resolves `"auto"`/`"cheapest"` candidate entries to the first model
    /// that answers the sentinel probe prompt, falling back to
    /// [`FALLBACK_MODEL`] if none respond.
    pub async fn probe_model(&self) -> String {
        for candidate in &self.candidate_models {
            if candidate == "auto" || candidate == "cheapest" {
                continue;
            }
            if self.invoke(candidate, PROBE_PROMPT).await.is_ok() {
                return candidate.clone();
            }
        }
        FALLBACK_MODEL.to_string()
    }

    async fn invoke(&self, model: &str, prompt: &str) -> Result<String, PolishError> {
        let result_file = tempfile_path();

        let mut child = Command::new(&self.binary)
            .arg("exec")
            .arg("--model")
            .arg(model)
            .arg("--output-last-message")
            .arg(&result_file)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PolishError::Subprocess(format!("failed to spawn {}: {e}", self.binary)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(prompt.as_bytes())
                .await
                .map_err(|e| PolishError::Subprocess(format!("failed to write stdin: {e}")))?;
        }

        let outcome = tokio::time::timeout(self.timeout, child.wait()).await;
        let status = match outcome {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => return Err(PolishError::Subprocess(format!("subprocess wait failed: {e}"))),
            Err(_) => {
                let _ = child.kill().await;
                return Err(PolishError::Timeout(self.timeout));
            }
        };

        if !status.success() {
            return Err(PolishError::Subprocess(format!(
                "{} exited with {status}",
                self.binary
            )));
        }

        let text = tokio::fs::read_to_string(&result_file)
            .await
            .map_err(|e| PolishError::Subprocess(format!("failed to read result file: {e}")))?;
        let _ = tokio::fs::remove_file(&result_file).await;

        let trimmed = text.trim().to_string();
        if trimmed.is_empty() {
            return Err(PolishError::Empty);
        }
        Ok(trimmed)
    }

    async fn invoke_with_retries(&self, prompt: &str) -> Result<String, PolishError> {
        let mut models: Vec<&str> = self
            .candidate_models
            .iter()
            .map(String::as_str)
            .filter(|m| *m != "auto" && *m != "cheapest")
            .collect();
        if models.is_empty() {
            models.push(FALLBACK_MODEL);
        }

        let mut last_error = PolishError::Empty;
        for model in models {
            for _ in 0..MAX_RETRIES_PER_MODEL {
                match self.invoke(model, prompt).await {
                    Ok(text) => return Ok(text),
                    Err(e) => last_error = e,
                }
            }
        }

        match self.invoke(FALLBACK_MODEL, prompt).await {
            Ok(text) => Ok(text),
            Err(_) => Err(last_error),
        }
    }
}

fn tempfile_path() -> PathBuf {
    std::env::temp_dir().join(format!(
        "tsugie_codex_{}_{}.txt",
        std::process::id(),
        next_counter()
    ))
}

fn next_counter() -> u64 {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

#[async_trait::async_trait]
impl Polisher for LocalSubprocessPolisher {
    async fn polish(&self, raw_text: &str, single_pass_i18n: bool) -> Result<PolishBundle, PolishError> {
        let description_ja = self
            .invoke_with_retries(&DESCRIPTION_PROMPT.replace("{原始文本}", raw_text))
            .await?;
        let one_liner_ja = self
            .invoke_with_retries(&ONE_LINER_PROMPT.replace("{原始文本}", &description_ja))
            .await
            .unwrap_or_else(|_| super::fallback_one_liner(&description_ja));

        let mut bundle = PolishBundle {
            description_ja,
            one_liner_ja,
            model: self
                .candidate_models
                .first()
                .cloned()
                .unwrap_or_else(|| FALLBACK_MODEL.to_string()),
            ..Default::default()
        };

        if single_pass_i18n {
            bundle.i18n_incomplete = true;
            return Ok(bundle);
        }

        match self
            .invoke_with_retries(&TRANSLATE_BUNDLE_PROMPT.replace("{原始文本}", &bundle.description_ja))
            .await
        {
            Ok(raw_json) => match parse_translation_json(&raw_json) {
                Some((zh_desc, zh_one, en_desc, en_one)) => {
                    bundle.description_zh = zh_desc;
                    bundle.one_liner_zh = zh_one;
                    bundle.description_en = en_desc;
                    bundle.one_liner_en = en_one;
                }
                None => bundle.i18n_incomplete = true,
            },
            Err(_) => bundle.i18n_incomplete = true,
        }

        Ok(bundle)
    }

    fn backend_name(&self) -> &'static str {
        "codex"
    }
}

fn parse_translation_json(raw: &str) -> Option<(String, String, String, String)> {
    #[derive(serde::Deserialize)]
    struct Bundle {
        description_zh: String,
        one_liner_zh: String,
        description_en: String,
        one_liner_en: String,
    }

    let parse = |s: &str| serde_json::from_str::<Bundle>(s).ok();

    let bundle = parse(raw.trim()).or_else(|| {
        let first = raw.find('{')?;
        let last = raw.rfind('}')?;
        if last <= first {
            return None;
        }
        parse(&raw[first..=last])
    })?;

    Some((
        bundle.description_zh,
        bundle.one_liner_zh,
        bundle.description_en,
        bundle.one_liner_en,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_translation_json_handles_surrounding_text() {
        let raw = "result: {\"description_zh\": \"a\", \"one_liner_zh\": \"b\", \"description_en\": \"c\", \"one_liner_en\": \"d\"}";
        let parsed = parse_translation_json(raw).unwrap();
        assert_eq!(parsed.0, "a");
        assert_eq!(parsed.3, "d");
    }

    #[test]
    fn parse_translation_json_rejects_garbage() {
        assert!(parse_translation_json("not json at all").is_none());
    }
}
