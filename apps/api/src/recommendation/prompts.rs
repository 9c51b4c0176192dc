// Outfit re-ranking prompt templates.

use crate::llm_client::prompts::fill_template;
use crate::recommendation::reranker::{ItemSummary, RankContext};

pub const RERANK_PROMPT: &str = r#"Recommend {count} best outfit(s) from these pre-filtered combinations.

Tops: {tops}
Bottoms: {bottoms}

Consider color harmony, style match and formality balance.

Return a JSON array with {count} object(s):
{
  "top_id": "string",
  "bottom_id": "string",
  "score": 0.0-1.0,
  "reasoning": "at most 100 characters",
  "style_description": "at most 50 characters"
}

JSON only, no markdown, no code blocks."#;

pub const TPO_RERANK_PROMPT: &str = r#"Recommend {count} outfit(s) based on the context.

[Context]
User Request: {user_request}
{weather}
[Available Items]
{items}

[Styling Rules]
1. Weather: match "warm" and "thick" to the temperature.
2. Safety: if precipitation is not "none", avoid items whose "mat" is suede, silk or leather.
3. Layering: follow "layer" (1 inner, 2 mid, 3 outer).
4. Category: always 1 top + 1 bottom. Add 1 outer if the temperature is below 15°C.

Return ONLY a JSON array of {count} objects:
{
  "outfit_id": "outfit_n",
  "combination": {
    "outer_id": "string|null",
    "top_id": "string",
    "bottom_id": "string"
  },
  "score": 0.0-1.0,
  "reasoning": "at most 100 characters (weather, occasion, material)",
  "style_description": "at most 50 characters"
}

JSON only, no markdown."#;

pub fn build_rerank_prompt(
    tops: &[ItemSummary],
    bottoms: &[ItemSummary],
    count: usize,
) -> String {
    fill_template(
        RERANK_PROMPT,
        &[
            ("count", count.to_string().as_str()),
            ("tops", to_json(tops).as_str()),
            ("bottoms", to_json(bottoms).as_str()),
        ],
    )
}

pub fn build_tpo_rerank_prompt(
    tops: &[ItemSummary],
    bottoms: &[ItemSummary],
    outers: &[ItemSummary],
    count: usize,
    context: &RankContext,
) -> String {
    let weather = match &context.weather {
        Some(w) => format!(
            "\nCurrent Weather:\n- Temp: {}°C\n- Condition: {}\n- Precipitation: {}\n",
            w.temperature
                .map(|t| t.to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            w.condition.as_deref().unwrap_or("N/A"),
            w.precipitation.as_deref().unwrap_or("N/A"),
        ),
        None => String::new(),
    };

    let items = serde_json::json!({
        "top": tops,
        "bottom": bottoms,
        "outer": outers,
    });

    fill_template(
        TPO_RERANK_PROMPT,
        &[
            ("count", count.to_string().as_str()),
            ("user_request", context.user_request.as_deref().unwrap_or("")),
            ("weather", weather.as_str()),
            ("items", items.to_string().as_str()),
        ],
    )
}

fn to_json(items: &[ItemSummary]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendation::reranker::Weather;
    use uuid::Uuid;

    fn summary(cat: &str) -> ItemSummary {
        ItemSummary {
            id: Uuid::nil(),
            cat: cat.to_string(),
            col: "navy".to_string(),
            style: vec!["classic".to_string()],
            form: 0.55,
            warm: 0.7,
            thick: 0.6,
            mat: "wool".to_string(),
            layer: 2,
        }
    }

    #[test]
    fn test_basic_prompt_embeds_summaries() {
        let prompt = build_rerank_prompt(&[summary("shirt")], &[summary("slacks")], 2);
        assert!(prompt.starts_with("Recommend 2 best outfit(s)"));
        assert!(prompt.contains(r#""cat":"shirt""#));
        assert!(prompt.contains(r#""cat":"slacks""#));
        assert!(prompt.contains(r#""id":"00000000-0000-0000-0000-000000000000""#));
    }

    #[test]
    fn test_tpo_prompt_includes_weather_and_outers() {
        let context = RankContext {
            user_request: Some("job interview".to_string()),
            weather: Some(Weather {
                temperature: Some(8.5),
                condition: Some("cloudy".to_string()),
                precipitation: None,
            }),
        };
        let prompt = build_tpo_rerank_prompt(
            &[summary("shirt")],
            &[summary("slacks")],
            &[summary("coat")],
            1,
            &context,
        );
        assert!(prompt.contains("User Request: job interview"));
        assert!(prompt.contains("- Temp: 8.5°C"));
        assert!(prompt.contains("- Precipitation: N/A"));
        assert!(prompt.contains(r#""cat":"coat""#));
        assert!(prompt.contains(r#""outer_id": "string|null""#));
        assert!(prompt.contains(r#""mat":"wool""#));
        assert!(prompt.contains(r#""layer":2"#));
    }

    #[test]
    fn test_tpo_prompt_keeps_user_request_literal() {
        let context = RankContext {
            user_request: Some("something like {items} or {weather}".to_string()),
            weather: None,
        };
        let prompt = build_tpo_rerank_prompt(
            &[summary("shirt")],
            &[summary("slacks")],
            &[],
            1,
            &context,
        );
        assert!(prompt.contains("User Request: something like {items} or {weather}"));
        assert_eq!(prompt.matches(r#""cat":"shirt""#).count(), 1);
    }
}
