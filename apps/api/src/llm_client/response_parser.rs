//! Response Parser — recovers JSON from free-form model output.
//!
//! Model text arrives wrapped in code fences, followed by commentary, with
//! Python literals, trailing commas, or single quotes. Both entry points share
//! one recovery pass and never fail: they return `(value_or_none, repaired)`
//! so the repaired text can be logged.
//!
//! Recovery:
//! 1. strip Markdown code fences
//! 2. locate the first balanced `{...}` / `[...]` (string- and escape-aware)
//! 3. repair: single-quote-dominant text → double quotes,
//!    `None/True/False` → `null/true/false`, drop trailing commas
//! 4. structural parse

use serde_json::{Map, Value};

/// Parses a JSON object. Arrays and scalars are discarded.
pub fn parse_dict(text: &str) -> (Option<Map<String, Value>>, String) {
    let stripped = strip_json_fences(text);
    let candidate = first_balanced(stripped, '{', '}')
        .map(|(start, end)| &stripped[start..end])
        .unwrap_or(stripped);

    let repaired = repair_json_like(candidate);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Object(map)) => (Some(map), repaired),
        _ => (None, repaired),
    }
}

/// Parses a JSON array or object, preferring a top-level array.
///
/// An array nested inside the first object (e.g. `{"items": [...]}`) does
/// not count as a top-level array; the enclosing object wins.
pub fn parse_any(text: &str) -> (Option<Value>, String) {
    let stripped = strip_json_fences(text);
    let array = first_balanced(stripped, '[', ']');
    let object = first_balanced(stripped, '{', '}');

    let nested = matches!(
        (array, object),
        (Some((a_start, a_end)), Some((o_start, o_end))) if a_start > o_start && a_end <= o_end
    );

    if let Some((start, end)) = array.filter(|_| !nested) {
        let repaired = repair_json_like(&stripped[start..end]);
        if let Ok(value @ Value::Array(_)) = serde_json::from_str::<Value>(&repaired) {
            return (Some(value), repaired);
        }
    }

    let candidate = object
        .map(|(start, end)| &stripped[start..end])
        .unwrap_or(stripped);
    let repaired = repair_json_like(candidate);
    match serde_json::from_str::<Value>(&repaired) {
        Ok(value @ (Value::Object(_) | Value::Array(_))) => (Some(value), repaired),
        _ => (None, repaired),
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
        .or_else(|| text.strip_prefix("```"));

    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim()),
        None => text,
    }
}

/// Byte span `[start, end)` of the first balanced `open ... close` group.
/// Brackets inside double-quoted strings (with backslash escapes) are ignored.
fn first_balanced(s: &str, open: char, close: char) -> Option<(usize, usize)> {
    let start = s.find(open)?;

    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;

    for (i, ch) in s[start..].char_indices() {
        if in_str {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_str = false;
            }
            continue;
        }

        if ch == '"' {
            in_str = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some((start, start + i + ch.len_utf8()));
            }
        }
    }
    None
}

fn repair_json_like(s: &str) -> String {
    let s = strip_json_fences(s);
    let s = if is_single_quote_dominant(s) {
        single_to_double_quotes(s)
    } else {
        s.to_string()
    };
    repair_literals_and_commas(&s)
}

fn is_single_quote_dominant(s: &str) -> bool {
    let singles = s.matches('\'').count();
    let doubles = s.matches('"').count();
    singles > doubles
}

/// Rewrites single-quoted strings as double-quoted ones. Double-quoted
/// strings pass through untouched so apostrophes inside them survive.
fn single_to_double_quotes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_double = false;
    let mut in_single = false;
    let mut escaped = false;

    for ch in s.chars() {
        if in_double {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_double = false;
            }
        } else if in_single {
            if escaped {
                // \' is not a JSON escape; everything else is kept verbatim
                if ch != '\'' {
                    out.push('\\');
                }
                out.push(ch);
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '\'' {
                out.push('"');
                in_single = false;
            } else if ch == '"' {
                out.push_str("\\\"");
            } else {
                out.push(ch);
            }
        } else if ch == '"' {
            in_double = true;
            out.push(ch);
        } else if ch == '\'' {
            in_single = true;
            out.push('"');
        } else {
            out.push(ch);
        }
    }
    out
}

/// Outside strings: maps bare `None`/`True`/`False` tokens to JSON literals
/// and drops commas that directly precede `}` or `]`.
fn repair_literals_and_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_str = false;
    let mut escaped = false;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];

        if in_str {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_str = false;
            }
            i += 1;
            continue;
        }

        if ch == '"' {
            in_str = true;
            out.push(ch);
            i += 1;
        } else if is_ident_char(ch) {
            let start = i;
            while i < chars.len() && is_ident_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            out.push_str(match word.as_str() {
                "None" => "null",
                "True" => "true",
                "False" => "false",
                other => other,
            });
        } else if ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if !matches!(next, Some('}') | Some(']')) {
                out.push(ch);
            }
            i += 1;
        } else {
            out.push(ch);
            i += 1;
        }
    }
    out
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
