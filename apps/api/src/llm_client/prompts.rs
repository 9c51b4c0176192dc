// Shared prompt fragments.
// Each service that needs model calls defines its own prompts.rs alongside it;
// this file holds the cross-cutting pieces.

/// System instruction that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Fills `{name}` placeholders in a single pass over `template`.
///
/// Inserted values are never rescanned, so placeholder-looking text inside
/// model output or user input stays literal. Braces that do not name one of
/// `values` (JSON examples in the templates) are copied through unchanged.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = tail.find('}').and_then(|end| {
            let name = &tail[..end];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, end))
        });
        match hit {
            Some((value, end)) => {
                out.push_str(value);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
