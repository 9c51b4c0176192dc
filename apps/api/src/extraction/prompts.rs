// Extraction prompt templates.
// Every prompt sent to the vision model for attribute extraction is built here.

use crate::extraction::vocab::{Field, REQUIRED_TOP_KEYS};
use crate::llm_client::prompts::fill_template;

/// Retry prompts embed at most this many validation errors.
pub const MAX_RETRY_ERRORS: usize = 10;

pub const EXTRACTION_SYSTEM: &str = "\
You are a clothing-attribute extractor. \
You MUST output ONLY a valid JSON object. No extra text, no markdown, no code blocks. \
Follow the schema EXACTLY. \
If uncertain, use \"unknown\" or null and lower the confidence.";

const EXTRACTION_PROMPT: &str = r#"You are a fashion item analyst.
Look at the clothing photo and extract its attributes as ONE JSON object.

OUTPUT SCHEMA (return exactly this structure):
{
  "category": {"main": "<category.main>", "sub": "<category.sub>", "confidence": 0.0-1.0},
  "color": {"primary": "<color>", "secondary": ["<color>", ...at most 3], "tone": "<color.tone>", "confidence": 0.0-1.0},
  "pattern": {"type": "<pattern.type>", "confidence": 0.0-1.0},
  "material": {"guess": "<material.guess>", "confidence": 0.0-1.0},
  "fit": {"type": "<fit.type>", "confidence": 0.0-1.0},
  "neckline": "<neckline>",
  "sleeve": "<sleeve>",
  "length": "<length>",
  "closure": ["<closure>", ...at most 3],
  "style_tags": ["<style_tags>", ...at most 8],
  "scores": {
    "formality": 0.0-1.0 (casual 0 to formal 1),
    "warmth": 0.0-1.0 (cool 0 to warm 1),
    "thickness": 0.0-1.0 (thin 0.1 to heavy 1.0),
    "season": ["<scores.season>", ...at most 4],
    "versatility": 0.0-1.0
  },
  "meta": {
    "is_layering_piece": true | false,
    "layering_rank": 1 | 2 | 3 (1 inner, 2 mid, 3 outer),
    "print_or_logo": true | false,
    "notes": "string" | null
  },
  "confidence": 0.0-1.0 (overall)
}

ALLOWED VALUES:
{enums}

RULES:
- Output JSON only. No markdown fences, comments or prose.
- Fill every field. If unsure or not visible, use "unknown" and lower the confidence.
- Use lowercase English tokens from the allowed values only.
- closure, style_tags and scores.season are always arrays.
- neckline, sleeve, length and closure are top-level keys."#;

const RETRY_PROMPT: &str = r#"Fix your output to be VALID JSON and match the schema EXACTLY.

Errors detected in your previous response:
{errors}

MUST FOLLOW THESE CRITICAL RULES:
1. Return ONLY ONE JSON object. No extra text, no markdown (no ```json), no code blocks.
2. Top-level keys must be EXACTLY: {keys}
3. "neckline", "sleeve" and "length" MUST be top-level keys (NOT nested).
4. "closure", "style_tags" and "scores.season" MUST be ARRAYS of strings (e.g. ["button"], ["spring", "fall"]).
5. All confidence and score fields must be numbers between 0.0 and 1.0.
6. "meta.layering_rank" must be an integer (1, 2, or 3).

STRICT ENUM VALIDATION:
{enums}

Use "unknown" for any field if you are unsure or the attribute is not visible.
Return corrected JSON ONLY."#;

/// Initial prompt: full schema plus every enumerated vocabulary inline.
pub fn build_extraction_prompt() -> String {
    fill_template(EXTRACTION_PROMPT, &[("enums", enum_listing().as_str())])
}

/// Retry prompt: the failed attempt's errors (first `MAX_RETRY_ERRORS`),
/// the sorted required key set, and the full enum listing.
pub fn build_retry_prompt(errors: &[String]) -> String {
    let errors = if errors.is_empty() {
        "- (no specific errors recorded)".to_string()
    } else {
        errors
            .iter()
            .take(MAX_RETRY_ERRORS)
            .map(|e| format!("- {e}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    fill_template(
        RETRY_PROMPT,
        &[
            ("errors", errors.as_str()),
            ("keys", format!("{REQUIRED_TOP_KEYS:?}").as_str()),
            ("enums", enum_listing().as_str()),
        ],
    )
}

fn enum_listing() -> String {
    Field::ALL
        .iter()
        .map(|f| format!("- {}: {} | unknown", f.path(), f.values().join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}
