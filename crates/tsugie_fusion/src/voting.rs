//! Field-level quality voting (§4.1 "Field voting").

/// Fixed per-site trust multiplier used during field voting. Unknown
/// sites fall back to weight 1.
#[must_use]
pub fn site_weight(site: &str) -> u32 {
    match site {
        "hanabi_cloud" => 8,
        "jorudan" => 6,
        "walkerplus" => 5,
        "jalan" => 5,
        "navitime" => 4,
        "tripadvisor" => 4,
        "yahoo_events" => 3,
        "hanabeam" => 2,
        _ => 1,
    }
}

const MISSING_TOKENS: &[&str] = &["--", "未定", "非公表", "調査中"];

fn is_missing_placeholder(value: &str) -> bool {
    value.is_empty() || MISSING_TOKENS.contains(&value.trim())
}

/// A field's value and the score it earns for voting, per the rules in
/// §4.1: missing/placeholder tokens always score 1, overriding the
/// field-specific formula.
#[must_use]
pub fn generic_score(site: &str, value: &str) -> u32 {
    if is_missing_placeholder(value) {
        return 1;
    }
    site_weight(site) * 10 + value.chars().count().min(200) as u32
}

/// `event_name` voting prefers concise canonical titles: shorter is
/// better, up to an 80-character budget.
#[must_use]
pub fn event_name_score(site: &str, value: &str) -> u32 {
    if is_missing_placeholder(value) {
        return 1;
    }
    let len = value.chars().count() as u32;
    site_weight(site) * 10 + 80u32.saturating_sub(len)
}

/// Coordinate fields are strongly preferred from authoritative sites —
/// any parseable float beats any text field's score.
#[must_use]
pub fn coordinate_score(site: &str, value: &str) -> u32 {
    if value.trim().parse::<f64>().is_err() {
        return 1;
    }
    site_weight(site) * 100 + 100
}

/// Picks the highest-scoring `(site, value)` pair for a field using
/// `score_fn`, returning `None` if every candidate scores as missing.
#[must_use]
pub fn vote<'a, F>(candidates: &'a [(String, String)], score_fn: F) -> Option<&'a (String, String)>
where
    F: Fn(&str, &str) -> u32,
{
    candidates
        .iter()
        .map(|(site, value)| (score_fn(site, value), value))
        .enumerate()
        .map(|(i, (score, _))| (score, i))
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, i)| &candidates[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_placeholder_scores_one() {
        assert_eq!(generic_score("hanabi_cloud", "未定"), 1);
        assert_eq!(generic_score("hanabi_cloud", ""), 1);
    }

    #[test]
    fn higher_weight_site_wins_generic() {
        let a = generic_score("hanabi_cloud", "some value");
        let b = generic_score("hanabeam", "some value");
        assert!(a > b);
    }

    #[test]
    fn event_name_prefers_shorter() {
        let short = event_name_score("jorudan", "隅田川花火大会");
        let long = event_name_score(
            "jorudan",
            "第47回隅田川花火大会〜夏の夜空を彩る伝統の競技花火〜開催のご案内",
        );
        assert!(short > long);
    }

    #[test]
    fn coordinate_prefers_parseable_float() {
        assert!(coordinate_score("hanabeam", "35.68") > coordinate_score("hanabi_cloud", "unknown"));
    }

    #[test]
    fn vote_picks_max_score() {
        let candidates = vec![
            ("hanabeam".to_string(), "short".to_string()),
            ("hanabi_cloud".to_string(), "short".to_string()),
        ];
        let winner = vote(&candidates, generic_score).unwrap();
        assert_eq!(winner.0, "hanabi_cloud");
    }
}
