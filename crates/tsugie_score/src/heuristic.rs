//! Deterministic fallback scoring (§4.4), used whenever no API key is
//! configured or the remote call fails.

use std::sync::LazyLock;

use regex::Regex;

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([0-9][0-9,]*)(万)?").unwrap());

/// Extracts a leading magnitude from a free-text count field (e.g.
/// `"約2万発"`, `"20,000発"`), applying a ×10000 multiplier when the
/// number is followed by `万`. Returns `0` when no digits are found.
#[must_use]
pub fn parse_magnitude(text: &str) -> u64 {
    let Some(caps) = LEADING_NUMBER.captures(text) else {
        return 0;
    };
    let digits: String = caps[1].chars().filter(|c| c.is_ascii_digit()).collect();
    let Ok(base) = digits.parse::<u64>() else {
        return 0;
    };
    if caps.get(2).is_some() { base * 10_000 } else { base }
}

fn isqrt(n: u64) -> u64 {
    (n as f64).sqrt().floor() as u64
}

/// Result of the heuristic scoring formula.
pub struct HeuristicScore {
    pub heat_score: i64,
    pub surprise_score: i64,
}

/// Computes the deterministic fallback scores per §4.4's formula:
/// `base = 42 + min(source_count*7, 22) [+5 if hanabi]
/// [+min(floor(sqrt(launch)/3), 18)] [+min(floor(sqrt(visitors)/9), 18)]`,
/// `heat = clamp(base, 20, 95)`, `surprise = clamp(45 + (heat*29) mod 41, 12, 96)`.
///
/// The fused data model carries no visitor-count field, so the visitor
/// term is always `0` here; see `DESIGN.md`.
#[must_use]
pub fn compute(source_count: usize, category: &str, launch_count: &str) -> HeuristicScore {
    let mut base: i64 = 42;
    base += i64::try_from(source_count.saturating_mul(7).min(22)).unwrap_or(22);
    if category == "hanabi" {
        base += 5;
    }
    let launch_magnitude = parse_magnitude(launch_count);
    base += i64::try_from((isqrt(launch_magnitude) / 3).min(18)).unwrap_or(18);

    let heat_score = base.clamp(20, 95);
    let surprise_score = (45 + (heat_score * 29) % 41).clamp(12, 96);

    HeuristicScore { heat_score, surprise_score }
}

/// Builds the short, cleaned-up `reason` string for a fallback score.
#[must_use]
pub fn fallback_reason(category: &str, source_count: usize) -> String {
    let label = if category == "hanabi" { "花火大会" } else { "祭り" };
    let reason = format!("{label}・{source_count}ソースからのヒューリスティック推定");
    reason.chars().take(80).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_magnitude_applies_man_multiplier() {
        assert_eq!(parse_magnitude("約2万発"), 20_000);
        assert_eq!(parse_magnitude("20,000発"), 20000);
        assert_eq!(parse_magnitude("未定"), 0);
    }

    #[test]
    fn heat_score_is_clamped() {
        let result = compute(0, "matsuri", "");
        assert!((20..=95).contains(&result.heat_score));
    }

    #[test]
    fn hanabi_category_scores_higher_than_matsuri() {
        let hanabi = compute(3, "hanabi", "5000");
        let matsuri = compute(3, "matsuri", "5000");
        assert!(hanabi.heat_score > matsuri.heat_score);
    }

    #[test]
    fn surprise_score_stays_in_bounds() {
        for heat in 20..=95 {
            let surprise = (45 + (heat * 29) % 41).clamp(12, 96);
            assert!((12..=96).contains(&surprise));
        }
    }
}
