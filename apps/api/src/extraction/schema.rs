use serde_json::{Map, Value};

use crate::extraction::vocab::{Field, REQUIRED_TOP_KEYS};

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaCheck {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Strict structural check of a parsed model response.
///
/// The top-level key set must equal `REQUIRED_TOP_KEYS` exactly: missing and
/// extra keys are both errors. Enum fields must hold a canonical token or
/// "unknown" verbatim (case-sensitive; no alias resolution here).
pub fn validate_schema(obj: &Map<String, Value>) -> SchemaCheck {
    let mut errors = Vec::new();

    let missing: Vec<&str> = REQUIRED_TOP_KEYS
        .iter()
        .copied()
        .filter(|k| !obj.contains_key(*k))
        .collect();
    let mut extra: Vec<&str> = obj
        .keys()
        .map(String::as_str)
        .filter(|k| !REQUIRED_TOP_KEYS.contains(k))
        .collect();
    extra.sort_unstable();

    if !missing.is_empty() {
        errors.push(format!("Missing top-level keys: {missing:?}"));
    }
    if !extra.is_empty() {
        errors.push(format!("Extra top-level keys not allowed: {extra:?}"));
    }

    let mut check = Checker { errors };

    if let Some(cat) = check.object(obj, "category") {
        check.enum_string(cat, "main", Field::CategoryMain);
        check.enum_string(cat, "sub", Field::CategorySub);
        check.unit_number(cat, "category.confidence", "confidence");
    }

    if let Some(color) = check.object(obj, "color") {
        check.enum_string(color, "primary", Field::Color);
        check.enum_list(color, "color.secondary", "secondary", Field::Color);
        check.enum_string(color, "tone", Field::Tone);
        check.unit_number(color, "color.confidence", "confidence");
    }

    if let Some(pattern) = check.object(obj, "pattern") {
        check.enum_string(pattern, "type", Field::Pattern);
        check.unit_number(pattern, "pattern.confidence", "confidence");
    }

    if let Some(material) = check.object(obj, "material") {
        check.enum_string(material, "guess", Field::Material);
        check.unit_number(material, "material.confidence", "confidence");
    }

    if let Some(fit) = check.object(obj, "fit") {
        check.enum_string(fit, "type", Field::Fit);
        check.unit_number(fit, "fit.confidence", "confidence");
    }

    check.enum_string(obj, "neckline", Field::Neckline);
    check.enum_string(obj, "sleeve", Field::Sleeve);
    check.enum_string(obj, "length", Field::Length);
    check.enum_list(obj, "closure", "closure", Field::Closure);
    check.enum_list(obj, "style_tags", "style_tags", Field::StyleTag);

    if let Some(scores) = check.object(obj, "scores") {
        check.unit_number(scores, "scores.formality", "formality");
        check.unit_number(scores, "scores.warmth", "warmth");
        check.unit_number(scores, "scores.thickness", "thickness");
        check.unit_number(scores, "scores.versatility", "versatility");
        check.enum_list(scores, "scores.season", "season", Field::Season);
    }

    if let Some(meta) = check.object(obj, "meta") {
        for key in ["is_layering_piece", "print_or_logo"] {
            if !matches!(meta.get(key), Some(Value::Bool(_))) {
                check.errors.push(format!("meta.{key} must be boolean"));
            }
        }

        match meta.get("layering_rank").and_then(integer) {
            None => check
                .errors
                .push("meta.layering_rank must be integer".to_string()),
            Some(rank) if !(1..=3).contains(&rank) => check
                .errors
                .push("meta.layering_rank must be 1, 2, or 3".to_string()),
            Some(_) => {}
        }

        if !matches!(meta.get("notes"), Some(Value::String(_)) | Some(Value::Null)) {
            check
                .errors
                .push("meta.notes must be string|null".to_string());
        }
    }

    check.unit_number(obj, "confidence", "confidence");

    SchemaCheck {
        valid: check.errors.is_empty(),
        errors: check.errors,
    }
}

struct Checker {
    errors: Vec<String>,
}

impl Checker {
    fn object<'a>(
        &mut self,
        obj: &'a Map<String, Value>,
        key: &str,
    ) -> Option<&'a Map<String, Value>> {
        let found = obj.get(key).and_then(Value::as_object);
        if found.is_none() {
            self.errors.push(format!("{key} must be an object"));
        }
        found
    }

    fn enum_string(&mut self, obj: &Map<String, Value>, key: &str, field: Field) {
        let path = field.path();
        match obj.get(key) {
            Some(Value::String(s)) if field.accepts(s) => {}
            Some(Value::String(s)) => self
                .errors
                .push(format!("{path} has invalid value '{s}' (not in enum)")),
            _ => self.errors.push(format!("{path} must be string")),
        }
    }

    fn enum_list(&mut self, obj: &Map<String, Value>, path: &str, key: &str, field: Field) {
        let Some(Value::Array(items)) = obj.get(key) else {
            self.errors.push(format!("{path} must be [string]"));
            return;
        };
        if items.iter().any(|v| !v.is_string()) {
            self.errors.push(format!("{path} must be [string]"));
            return;
        }
        for s in items.iter().filter_map(Value::as_str) {
            if !field.accepts(s) {
                self.errors
                    .push(format!("{path} has invalid value '{s}' (not in enum)"));
            }
        }
    }

    fn unit_number(&mut self, obj: &Map<String, Value>, path: &str, key: &str) {
        let in_range = obj
            .get(key)
            .and_then(Value::as_f64)
            .is_some_and(|v| (0.0..=1.0).contains(&v));
        if !in_range {
            self.errors
                .push(format!("{path} must be number in [0,1]"));
        }
    }
}

fn integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) if n.is_i64() || n.is_u64() => {
            Some(n.as_i64().unwrap_or(i64::MAX))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::vocab::default_record;
    use serde_json::json;

    fn valid_object() -> Map<String, Value> {
        let mut v = serde_json::to_value(default_record()).unwrap();
        v["category"]["main"] = json!("top");
        v["category"]["sub"] = json!("tshirt");
        v["color"]["primary"] = json!("white");
        v["color"]["secondary"] = json!(["navy"]);
        v["style_tags"] = json!(["casual", "minimal"]);
        v["scores"]["season"] = json!(["summer"]);
        v["meta"]["notes"] = json!("small chest logo");
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_valid_object_passes() {
        let check = validate_schema(&valid_object());
        assert!(check.valid, "{:?}", check.errors);
        assert!(check.errors.is_empty());
    }

    #[test]
    fn test_default_record_is_schema_valid() {
        let v = serde_json::to_value(default_record()).unwrap();
        assert!(validate_schema(v.as_object().unwrap()).valid);
    }

    #[test]
    fn test_extra_top_level_key_rejected() {
        let mut obj = valid_object();
        obj.insert("brand".to_string(), json!("acme"));
        let check = validate_schema(&obj);
        assert!(!check.valid);
        assert_eq!(
            check.errors,
            vec![r#"Extra top-level keys not allowed: ["brand"]"#.to_string()]
        );
    }

    #[test]
    fn test_missing_top_level_key_rejected() {
        let mut obj = valid_object();
        obj.remove("sleeve");
        let check = validate_schema(&obj);
        assert!(!check.valid);
        assert_eq!(check.errors[0], r#"Missing top-level keys: ["sleeve"]"#);
        assert!(check.errors.contains(&"sleeve must be string".to_string()));
    }

    #[test]
    fn test_enum_membership_is_exact() {
        let mut obj = valid_object();
        obj["neckline"] = json!("Crew");
        obj["scores"]["season"] = json!(["autumn"]);
        let check = validate_schema(&obj);
        assert!(!check.valid);
        assert!(check
            .errors
            .contains(&"neckline has invalid value 'Crew' (not in enum)".to_string()));
        assert!(check
            .errors
            .contains(&"scores.season has invalid value 'autumn' (not in enum)".to_string()));
    }

    #[test]
    fn test_unknown_is_accepted_everywhere() {
        let mut obj = valid_object();
        obj["fit"]["type"] = json!("unknown");
        obj["closure"] = json!(["unknown"]);
        assert!(validate_schema(&obj).valid);
    }

    #[test]
    fn test_numeric_ranges_and_types() {
        let mut obj = valid_object();
        obj["scores"]["warmth"] = json!(1.2);
        obj["confidence"] = json!("0.9");
        obj["meta"]["layering_rank"] = json!(4);
        obj["meta"]["is_layering_piece"] = json!("yes");
        obj["style_tags"] = json!(["casual", 3]);
        let check = validate_schema(&obj);
        assert_eq!(
            check.errors,
            vec![
                "style_tags must be [string]",
                "scores.warmth must be number in [0,1]",
                "meta.is_layering_piece must be boolean",
                "meta.layering_rank must be 1, 2, or 3",
                "confidence must be number in [0,1]",
            ]
        );
    }

    #[test]
    fn test_float_layering_rank_is_not_integer() {
        let mut obj = valid_object();
        obj["meta"]["layering_rank"] = json!(2.0);
        let check = validate_schema(&obj);
        assert_eq!(check.errors, vec!["meta.layering_rank must be integer"]);
    }

    #[test]
    fn test_non_object_group_reported_once() {
        let mut obj = valid_object();
        obj["scores"] = json!([0.1, 0.2]);
        obj["meta"]["notes"] = json!(5);
        let check = validate_schema(&obj);
        assert_eq!(
            check.errors,
            vec!["scores must be an object", "meta.notes must be string|null"]
        );
    }
}
