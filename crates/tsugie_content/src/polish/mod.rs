//! Polishing backends (§4.3 "Polishing", §9 "Subprocess-invoked local
//! model"): a narrow two-variant capability, `RemoteChatPolisher` and
//! `LocalSubprocessPolisher`, each producing a six-field `{ja,zh,en} x
//! {description,one_liner}` bundle from one raw description.

pub mod remote;
pub mod subprocess;

use thiserror::Error;
use tsugie_core::text::clean_text;

/// A fully- or partially-filled polish result. Missing fields are left
/// empty; the caller decides whether to retry or fall back.
#[derive(Debug, Clone, Default)]
pub struct PolishBundle {
    pub description_ja: String,
    pub one_liner_ja: String,
    pub description_zh: String,
    pub one_liner_zh: String,
    pub description_en: String,
    pub one_liner_en: String,
    pub model: String,
    /// Set when `codex_single_pass_i18n` suppressed a translation
    /// follow-up and ZH/EN fields are still missing.
    pub i18n_incomplete: bool,
}

impl PolishBundle {
    #[must_use]
    pub fn i18n_complete(&self) -> bool {
        !self.description_zh.trim().is_empty() && !self.description_en.trim().is_empty()
    }
}

#[derive(Debug, Error)]
pub enum PolishError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("subprocess error: {0}")]
    Subprocess(String),

    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("response parse error: {0}")]
    Parse(String),

    #[error("empty response")]
    Empty,
}

impl PolishError {
    /// The per-record `status` value a failed polish attempt writes,
    /// distinguishing backend (`openai_failed` / `codex_failed`).
    #[must_use]
    pub fn status_label(&self, backend: &str) -> String {
        format!("{backend}_failed")
    }
}

/// Narrow polisher capability. Each call is blocking (from the caller's
/// perspective) with a bounded timeout; no concurrent calls share one
/// subprocess (§9).
#[async_trait::async_trait]
pub trait Polisher: Send + Sync {
    /// Produces the six-field bundle for one raw description.
    ///
    /// When `single_pass_i18n` is `true`, missing ZH/EN fields after the
    /// primary call are left empty and flagged via
    /// [`PolishBundle::i18n_incomplete`] rather than triggering a
    /// follow-up translation call.
    async fn polish(&self, raw_text: &str, single_pass_i18n: bool) -> Result<PolishBundle, PolishError>;

    /// Identifies the backend for diagnostics (`openai`, `codex`).
    fn backend_name(&self) -> &'static str;
}

/// Truncates raw text to a trailing ellipsis one-liner when no polisher is
/// configured or polishing failed (§4.3, original fallback behavior).
#[must_use]
pub fn fallback_one_liner(raw_text: &str) -> String {
    let text = clean_text(raw_text);
    let char_count = text.chars().count();
    if char_count <= 45 {
        return text;
    }
    let truncated: String = text.chars().take(44).collect();
    format!("{}…", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_one_liner_passes_through_short_text() {
        assert_eq!(fallback_one_liner("隅田川花火大会"), "隅田川花火大会");
    }

    #[test]
    fn fallback_one_liner_truncates_long_text() {
        let long = "あ".repeat(60);
        let result = fallback_one_liner(&long);
        assert_eq!(result.chars().count(), 45);
        assert!(result.ends_with('…'));
    }
}
