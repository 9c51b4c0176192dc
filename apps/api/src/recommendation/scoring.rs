//! Compatibility Scorer — deterministic top/bottom pair scoring.
//!
//! Operates on typed `AttributeRecord`s only; raw JSON is normalized at the
//! extraction boundary, never here. Total = weighted sum of four sub-scores,
//! each already in [0, 1].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::extraction::models::AttributeRecord;

pub const COLOR_WEIGHT: f64 = 0.4;
pub const STYLE_WEIGHT: f64 = 0.3;
pub const FORMALITY_WEIGHT: f64 = 0.2;
pub const SEASON_WEIGHT: f64 = 0.1;

const ACHROMATIC: &[&str] = &["black", "white", "gray"];

/// Canonical color → position on the hue wheel, in degrees.
/// Colors absent here (charcoal, silver, other, unknown) have no hue.
const HUE_WHEEL: &[(&str, f64)] = &[
    ("red", 0.0),
    ("brown", 25.0),
    ("orange", 30.0),
    ("camel", 35.0),
    ("beige", 45.0),
    ("cream", 50.0),
    ("gold", 50.0),
    ("mustard", 50.0),
    ("ivory", 55.0),
    ("yellow", 60.0),
    ("olive", 80.0),
    ("khaki", 90.0),
    ("green", 120.0),
    ("mint", 150.0),
    ("skyblue", 180.0),
    ("blue", 210.0),
    ("denim", 215.0),
    ("indigo", 235.0),
    ("navy", 240.0),
    ("purple", 270.0),
    ("lavender", 275.0),
    ("pink", 300.0),
    ("wine", 345.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub color: f64,
    pub style: f64,
    pub formality: f64,
    pub season: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutfitScore {
    pub total: f64,
    pub breakdown: ScoreBreakdown,
    /// Never empty.
    pub reasons: Vec<String>,
}

pub fn score_outfit(top: &AttributeRecord, bottom: &AttributeRecord) -> OutfitScore {
    let breakdown = ScoreBreakdown {
        color: color_harmony(&top.color.primary, &bottom.color.primary),
        style: style_match(&top.style_tags, &bottom.style_tags),
        formality: formality_match(top.scores.formality, bottom.scores.formality),
        season: season_match(&top.scores.season, &bottom.scores.season),
    };

    let total = breakdown.color * COLOR_WEIGHT
        + breakdown.style * STYLE_WEIGHT
        + breakdown.formality * FORMALITY_WEIGHT
        + breakdown.season * SEASON_WEIGHT;

    let mut reasons = Vec::new();
    if breakdown.color >= 0.8 {
        reasons.push("color harmony".to_string());
    }
    if breakdown.style >= 0.6 {
        reasons.push("style match".to_string());
    }
    if breakdown.formality >= 0.7 {
        reasons.push("formality balance".to_string());
    }
    if breakdown.season >= 0.8 {
        reasons.push("season fit".to_string());
    }
    if reasons.is_empty() {
        reasons.push("balanced combination".to_string());
    }

    OutfitScore {
        total: total.clamp(0.0, 1.0),
        breakdown,
        reasons,
    }
}

pub fn hue(color: &str) -> Option<f64> {
    HUE_WHEEL
        .iter()
        .find(|(name, _)| *name == color)
        .map(|(_, degrees)| *degrees)
}

pub fn color_harmony(a: &str, b: &str) -> f64 {
    if ACHROMATIC.contains(&a) || ACHROMATIC.contains(&b) {
        return 0.8;
    }
    let (Some(h1), Some(h2)) = (hue(a), hue(b)) else {
        return 0.5;
    };
    if a == b {
        return 0.9;
    }

    let diff = (h1 - h2).abs();
    let d = diff.min(360.0 - diff);

    if (170.0..=190.0).contains(&d) {
        0.95 // complementary
    } else if d <= 60.0 {
        0.85 // analogous
    } else if (110.0..=130.0).contains(&d) {
        0.75 // triadic
    } else if d <= 90.0 {
        0.6
    } else {
        0.4
    }
}

/// Jaccard overlap lifted onto [0.3, 1.0].
pub fn style_match(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.3;
    }
    let a: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b: HashSet<&str> = b.iter().map(String::as_str).collect();
    let common = a.intersection(&b).count() as f64;
    let union = a.union(&b).count() as f64;
    (0.3 + 0.7 * common / union).min(1.0)
}

pub fn formality_match(a: f64, b: f64) -> f64 {
    (1.0 - 2.0 * (a - b).abs()).max(0.0)
}

pub fn season_match(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.5;
    }
    if a.iter().any(|s| b.contains(s)) {
        1.0
    } else {
        0.3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::vocab::{default_record, Field};

    fn item(color: &str, tags: &[&str], formality: f64, seasons: &[&str]) -> AttributeRecord {
        let mut r = default_record();
        r.color.primary = color.to_string();
        r.style_tags = tags.iter().map(|t| t.to_string()).collect();
        r.scores.formality = formality;
        r.scores.season = seasons.iter().map(|s| s.to_string()).collect();
        r
    }

    #[test]
    fn test_worked_example_black_top_beige_bottom() {
        let top = item("black", &["minimal", "classic"], 0.3, &["fall"]);
        let bottom = item("beige", &["minimal"], 0.4, &["fall", "winter"]);
        let score = score_outfit(&top, &bottom);

        assert_eq!(score.breakdown.color, 0.8);
        assert!((score.breakdown.style - 0.65).abs() < 1e-9);
        assert!((score.breakdown.formality - 0.8).abs() < 1e-9);
        assert_eq!(score.breakdown.season, 1.0);
        assert!((score.total - 0.775).abs() < 1e-9);
        assert!(score.reasons.contains(&"color harmony".to_string()));
        assert!(score.reasons.contains(&"formality balance".to_string()));
        assert!(score.reasons.contains(&"style match".to_string()));
        assert!(score.reasons.contains(&"season fit".to_string()));
    }

    #[test]
    fn test_color_harmony_bands() {
        assert_eq!(color_harmony("red", "skyblue"), 0.95);
        assert_eq!(color_harmony("red", "orange"), 0.85);
        assert_eq!(color_harmony("red", "green"), 0.75);
        assert_eq!(color_harmony("red", "khaki"), 0.6);
        assert_eq!(color_harmony("red", "blue"), 0.4);
        assert_eq!(color_harmony("navy", "navy"), 0.9);
        // wraps around the wheel: 345° vs 0° is 15° apart
        assert_eq!(color_harmony("wine", "red"), 0.85);
    }

    #[test]
    fn test_achromatic_and_undefined_hues() {
        assert_eq!(color_harmony("white", "unknown"), 0.8);
        assert_eq!(color_harmony("other", "gray"), 0.8);
        assert_eq!(color_harmony("other", "red"), 0.5);
        assert_eq!(color_harmony("unknown", "unknown"), 0.5);
        assert_eq!(color_harmony("charcoal", "charcoal"), 0.5);
    }

    #[test]
    fn test_every_hue_is_a_canonical_color() {
        for (name, degrees) in HUE_WHEEL {
            assert!(Field::Color.values().contains(name), "{name}");
            assert!((0.0..360.0).contains(degrees));
        }
    }

    #[test]
    fn test_sub_scores() {
        let tags = |t: &[&str]| t.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(style_match(&[], &tags(&["street"])), 0.3);
        assert!((style_match(&tags(&["street"]), &tags(&["street"])) - 1.0).abs() < 1e-9);
        assert_eq!(style_match(&tags(&["street"]), &tags(&["formal"])), 0.3);
        assert_eq!(formality_match(0.0, 1.0), 0.0);
        assert_eq!(formality_match(0.5, 0.5), 1.0);
        assert_eq!(season_match(&[], &tags(&["fall"])), 0.5);
        assert_eq!(season_match(&tags(&["summer"]), &tags(&["fall"])), 0.3);
    }

    #[test]
    fn test_no_threshold_crossed_gives_generic_reason() {
        let top = item("red", &["street"], 0.0, &["summer"]);
        let bottom = item("blue", &["formal"], 1.0, &["winter"]);
        let score = score_outfit(&top, &bottom);
        assert_eq!(score.reasons, vec!["balanced combination"]);
    }

    #[test]
    fn test_scores_bounded_and_reasons_nonempty() {
        let colors = ["black", "red", "navy", "other", "unknown", "charcoal", "wine", "mint"];
        let tag_sets: [&[&str]; 3] = [&[], &["minimal"], &["street", "sporty", "casual"]];
        let seasons: [&[&str]; 3] = [&[], &["fall"], &["spring", "summer"]];
        let formalities = [0.0, 0.45, 1.0];

        let mut records = Vec::new();
        for c in colors {
            for (i, t) in tag_sets.iter().enumerate() {
                records.push(item(c, t, formalities[i], seasons[(i + 1) % 3]));
            }
        }
        for a in &records {
            for b in &records {
                let s = score_outfit(a, b);
                assert!((0.0..=1.0).contains(&s.total));
                assert!(!s.reasons.is_empty());
            }
        }
    }
}
