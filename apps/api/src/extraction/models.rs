use serde::{Deserialize, Serialize};

/// Canonical structured description of one clothing item.
///
/// The serialized form is the wire format: exactly the thirteen top-level
/// keys in `vocab::REQUIRED_TOP_KEYS`. Values are only ever produced by
/// `normalize`, so every enum field holds a canonical token or "unknown".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    pub category: Category,
    pub color: Color,
    pub pattern: Pattern,
    pub material: Material,
    pub fit: Fit,
    pub neckline: String,
    pub sleeve: String,
    pub length: String,
    pub closure: Vec<String>,
    pub style_tags: Vec<String>,
    pub scores: Scores,
    pub meta: Meta,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub main: String,
    pub sub: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub primary: String,
    pub secondary: Vec<String>, // ≤3
    pub tone: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub guess: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fit {
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f64,
}

/// Numeric styling scores, each in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub formality: f64, // casual 0 – formal 1
    pub warmth: f64,
    pub thickness: f64,
    pub season: Vec<String>, // ≤4
    pub versatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub is_layering_piece: bool,
    /// 1 = innermost, 2 = mid, 3 = outer.
    pub layering_rank: u8,
    pub print_or_logo: bool,
    pub notes: Option<String>,
}

impl AttributeRecord {
    /// Sub-category if known, else main category, else the given fallback.
    pub fn display_category<'a>(&'a self, fallback: &'a str) -> &'a str {
        [self.category.sub.as_str(), self.category.main.as_str()]
            .into_iter()
            .find(|c| *c != crate::extraction::vocab::UNKNOWN)
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use crate::extraction::vocab::{default_record, REQUIRED_TOP_KEYS};

    #[test]
    fn test_wire_format_has_exact_top_level_keys() {
        let value = serde_json::to_value(default_record()).unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        assert_eq!(keys, REQUIRED_TOP_KEYS.to_vec());
    }

    #[test]
    fn test_type_fields_serialize_as_type() {
        let value = serde_json::to_value(default_record()).unwrap();
        assert_eq!(value["pattern"]["type"], "unknown");
        assert_eq!(value["fit"]["type"], "unknown");
        assert!(value["meta"]["notes"].is_null());
    }

    #[test]
    fn test_display_category_prefers_sub() {
        let mut record = default_record();
        assert_eq!(record.display_category("Top"), "Top");
        record.category.main = "top".to_string();
        assert_eq!(record.display_category("Top"), "top");
        record.category.sub = "shirt".to_string();
        assert_eq!(record.display_category("Top"), "shirt");
    }
}
