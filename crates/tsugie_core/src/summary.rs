//! Compact `[stage] key=value, key=value` summary-line builder.
//!
//! Every stage binary emits exactly one of these on completion, per the
//! error-handling design's "user-visible output is a compact summary line"
//! rule. Mirrors the `print(f"[ok] ...")` lines the Python stages end with.

use std::fmt::Display;

/// Accumulates `key=value` pairs for one stage's completion line.
#[derive(Debug, Default)]
pub struct SummaryLine {
    stage: String,
    fields: Vec<(String, String)>,
}

impl SummaryLine {
    /// Starts a summary line for the named stage (`fuse`, `repair-geo`, …).
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a `key=value` field, in call order.
    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }
}

impl Display for SummaryLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.stage)?;
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i == 0 {
                write!(f, " {key}={value}")?;
            } else {
                write!(f, ", {key}={value}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_expected_shape() {
        let line = SummaryLine::new("fuse")
            .field("total", 120)
            .field("geocoded", 87)
            .to_string();
        assert_eq!(line, "[fuse] total=120, geocoded=87");
    }

    #[test]
    fn empty_fields_just_names_stage() {
        assert_eq!(SummaryLine::new("export").to_string(), "[export]");
    }
}
