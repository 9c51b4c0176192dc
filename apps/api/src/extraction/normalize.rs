//! Coerces any JSON value into a complete `AttributeRecord`.
//!
//! Starts from `default_record()` and overlays each field after per-field
//! coercion. Total over arbitrary input and idempotent:
//! `normalize(normalize(x)) == normalize(x)`.

use serde_json::{Map, Value};

use crate::extraction::models::AttributeRecord;
use crate::extraction::vocab::{
    default_record, Field, MAX_CLOSURES, MAX_SEASONS, MAX_SECONDARY_COLORS, MAX_STYLE_TAGS,
    UNKNOWN,
};

pub fn normalize(input: &Value) -> AttributeRecord {
    let empty = Map::new();
    let obj = input.as_object().unwrap_or(&empty);
    let mut out = default_record();

    // ── category ──────────────────────────────────────────────────────────
    match obj.get("category") {
        Some(Value::Object(cat)) => {
            out.category.main = enum_value(Field::CategoryMain, cat.get("main"));
            out.category.sub = enum_value(Field::CategorySub, cat.get("sub"));
            out.category.confidence = number(cat.get("confidence"), out.category.confidence);
        }
        Some(raw @ Value::String(_)) => {
            out.category.main = enum_value(Field::CategoryMain, Some(raw));
        }
        _ => {}
    }

    // ── color ─────────────────────────────────────────────────────────────
    match obj.get("color") {
        Some(Value::Object(color)) => {
            out.color.primary = enum_value(Field::Color, color.get("primary"));
            out.color.secondary = list(
                Field::Color,
                color.get("secondary"),
                MAX_SECONDARY_COLORS,
                false,
            );
            out.color.tone = enum_value(Field::Tone, color.get("tone"));
            out.color.confidence = number(color.get("confidence"), out.color.confidence);
        }
        Some(raw @ Value::String(_)) => {
            out.color.primary = enum_value(Field::Color, Some(raw));
        }
        _ => {}
    }

    // ── pattern / material / fit ──────────────────────────────────────────
    if let Some(pattern) = sub_object(obj, "pattern") {
        out.pattern.kind = enum_value(Field::Pattern, pattern.get("type"));
        out.pattern.confidence = number(pattern.get("confidence"), out.pattern.confidence);
    }
    if let Some(material) = sub_object(obj, "material") {
        out.material.guess = enum_value(Field::Material, material.get("guess"));
        out.material.confidence = number(material.get("confidence"), out.material.confidence);
    }
    if let Some(fit) = sub_object(obj, "fit") {
        out.fit.kind = enum_value(Field::Fit, fit.get("type"));
        out.fit.confidence = number(fit.get("confidence"), out.fit.confidence);
    }

    out.neckline = enum_value(Field::Neckline, obj.get("neckline"));
    out.sleeve = enum_value(Field::Sleeve, obj.get("sleeve"));
    out.length = enum_value(Field::Length, obj.get("length"));

    if obj.contains_key("closure") {
        out.closure = list(Field::Closure, obj.get("closure"), MAX_CLOSURES, true);
        if out.closure.is_empty() {
            out.closure.push("none".to_string());
        }
    }
    out.style_tags = list(Field::StyleTag, obj.get("style_tags"), MAX_STYLE_TAGS, false);

    // ── scores ────────────────────────────────────────────────────────────
    if let Some(scores) = sub_object(obj, "scores") {
        out.scores.formality = number(scores.get("formality"), out.scores.formality);
        out.scores.warmth = number(scores.get("warmth"), out.scores.warmth);
        out.scores.thickness = number(scores.get("thickness"), out.scores.thickness);
        out.scores.season = list(Field::Season, scores.get("season"), MAX_SEASONS, false);
        out.scores.versatility = number(scores.get("versatility"), out.scores.versatility);
    }

    // ── meta ──────────────────────────────────────────────────────────────
    if let Some(meta) = sub_object(obj, "meta") {
        out.meta.is_layering_piece =
            boolean(meta.get("is_layering_piece"), out.meta.is_layering_piece);
        out.meta.layering_rank = layering_rank(meta.get("layering_rank"));
        out.meta.print_or_logo = boolean(meta.get("print_or_logo"), out.meta.print_or_logo);
        out.meta.notes = notes(meta.get("notes"));
    }

    out.confidence = number(obj.get("confidence"), out.confidence);
    out
}

fn sub_object<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key).and_then(Value::as_object)
}

fn enum_value(field: Field, raw: Option<&Value>) -> String {
    match raw {
        Some(Value::String(s)) => field.resolve(s).to_string(),
        Some(Value::Number(n)) => field.resolve(&n.to_string()).to_string(),
        _ => UNKNOWN.to_string(),
    }
}

/// Finite numbers and numeric strings, clamped to [0, 1]. Anything else
/// keeps `default`.
fn number(raw: Option<&Value>, default: f64) -> f64 {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(default)
}

fn boolean(raw: Option<&Value>, default: bool) -> bool {
    match raw {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(default),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => true,
            "false" | "no" | "n" | "0" => false,
            _ => default,
        },
        _ => default,
    }
}

/// Accepts arrays or comma-separated strings. Output is resolved, de-duplicated
/// in first-seen order, and capped.
fn list(field: Field, raw: Option<&Value>, cap: usize, keep_unknown: bool) -> Vec<String> {
    let tokens: Vec<String> = match raw {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };

    let mut out: Vec<String> = Vec::new();
    for token in tokens {
        if token.trim().is_empty() {
            continue;
        }
        let resolved = field.resolve(&token);
        if resolved == UNKNOWN && !keep_unknown {
            continue;
        }
        if !out.iter().any(|v| v == resolved) {
            out.push(resolved.to_string());
        }
        if out.len() == cap {
            break;
        }
    }
    out
}

fn layering_rank(raw: Option<&Value>) -> u8 {
    let from_float = |f: f64| f.is_finite().then(|| f.trunc() as i64);
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().and_then(from_float)),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(from_float))
        }
        _ => None,
    };
    parsed.map(|r| r.clamp(1, 3) as u8).unwrap_or(2)
}

fn notes(raw: Option<&Value>) -> Option<String> {
    match raw {
        Some(Value::String(s)) => Some(s.clone()),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Some(v.to_string()),
        _ => None,
    }
}
