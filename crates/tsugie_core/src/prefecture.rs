//! The closed set of 47 Japanese prefectures: extraction regex and the
//! fallback center-point table used by `pref_center_fallback` geocoding.

use std::sync::LazyLock;

use regex::Regex;

/// `(name, center_lat, center_lng)`, centered on each prefectural capital.
/// Ordered longest-name-first so the extraction regex cannot short-match
/// `東京` before `東京都`.
pub const PREFECTURE_CENTER: &[(&str, f64, f64)] = &[
    ("北海道", 43.0642, 141.3469),
    ("青森県", 40.8244, 140.7400),
    ("岩手県", 39.7036, 141.1527),
    ("宮城県", 38.2682, 140.8694),
    ("秋田県", 39.7186, 140.1024),
    ("山形県", 38.2404, 140.3633),
    ("福島県", 37.7503, 140.4676),
    ("茨城県", 36.3418, 140.4468),
    ("栃木県", 36.5658, 139.8836),
    ("群馬県", 36.3911, 139.0608),
    ("埼玉県", 35.8617, 139.6455),
    ("千葉県", 35.6073, 140.1065),
    ("東京都", 35.6895, 139.6917),
    ("神奈川県", 35.4478, 139.6425),
    ("新潟県", 37.9026, 139.0232),
    ("富山県", 36.6953, 137.2113),
    ("石川県", 36.5947, 136.6256),
    ("福井県", 36.0652, 136.2216),
    ("山梨県", 35.6642, 138.5684),
    ("長野県", 36.6513, 138.1810),
    ("岐阜県", 35.3912, 136.7223),
    ("静岡県", 34.9769, 138.3831),
    ("愛知県", 35.1802, 136.9066),
    ("三重県", 34.7303, 136.5086),
    ("滋賀県", 35.0045, 135.8686),
    ("京都府", 35.0116, 135.7681),
    ("大阪府", 34.6937, 135.5023),
    ("兵庫県", 34.6913, 135.1830),
    ("奈良県", 34.6851, 135.8048),
    ("和歌山県", 34.2261, 135.1675),
    ("鳥取県", 35.5036, 134.2383),
    ("島根県", 35.4723, 133.0505),
    ("岡山県", 34.6618, 133.9344),
    ("広島県", 34.3966, 132.4596),
    ("山口県", 34.1859, 131.4714),
    ("徳島県", 34.0657, 134.5593),
    ("香川県", 34.3401, 134.0434),
    ("愛媛県", 33.8416, 132.7657),
    ("高知県", 33.5597, 133.5311),
    ("福岡県", 33.6064, 130.4181),
    ("佐賀県", 33.2494, 130.2988),
    ("長崎県", 32.7448, 129.8737),
    ("熊本県", 32.7898, 130.7417),
    ("大分県", 33.2382, 131.6126),
    ("宮崎県", 31.9111, 131.4239),
    ("鹿児島県", 31.5602, 130.5581),
    ("沖縄県", 26.2124, 127.6809),
];

static PREF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alt = PREFECTURE_CENTER
        .iter()
        .map(|(name, _, _)| *name)
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&alt).unwrap()
});

/// Finds the first prefecture name occurring in `text`, searching
/// `venue_address`, then `venue_name`, then `event_name` in that order at
/// the call site (this function itself just matches one string).
#[must_use]
pub fn extract_prefecture(text: &str) -> Option<String> {
    PREF_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// Looks up the fallback center point for a known prefecture name.
///
/// Returns `None` for anything outside the closed 47-prefecture set —
/// deliberately, not a Tokyo Station default. A legacy variant of this
/// pipeline defaulted unknown prefectures to Tokyo Station; that behavior
/// is not carried forward.
#[must_use]
pub fn resolve_prefecture_center(name: &str) -> Option<(f64, f64)> {
    PREFECTURE_CENTER
        .iter()
        .find(|(n, _, _)| *n == name)
        .map(|(_, lat, lng)| (*lat, *lng))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tokyo_not_substring() {
        assert_eq!(
            extract_prefecture("東京都千代田区丸の内1丁目"),
            Some("東京都".to_string())
        );
    }

    #[test]
    fn unknown_prefecture_has_no_center() {
        assert_eq!(resolve_prefecture_center("存在しない県"), None);
    }

    #[test]
    fn all_47_resolve() {
        assert_eq!(PREFECTURE_CENTER.len(), 47);
        for (name, _, _) in PREFECTURE_CENTER {
            assert!(resolve_prefecture_center(name).is_some());
        }
    }
}
