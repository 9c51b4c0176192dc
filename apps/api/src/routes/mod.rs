pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::extraction::handlers::{self as extraction, MAX_FILES_PER_REQUEST};
use crate::recommendation::handlers as recommendation;
use crate::state::AppState;
use crate::wardrobe::handlers as wardrobe;

/// Multipart framing on top of the raw image bytes.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state
        .config
        .max_upload_bytes
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health::health_handler))
        // Extraction
        .route("/api/v1/extract", post(extraction::handle_extract))
        // Wardrobe
        .route("/api/v1/wardrobe", get(wardrobe::handle_list_items))
        .route(
            "/api/v1/wardrobe/:id",
            get(wardrobe::handle_get_item).delete(wardrobe::handle_delete_item),
        )
        // Recommendation
        .route("/api/v1/recommend", post(recommendation::handle_recommend))
        .route(
            "/api/v1/outfit/score",
            get(recommendation::handle_outfit_score),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::extraction::pipeline::ExtractionPipeline;
    use crate::extraction::vocab::default_record;
    use crate::llm_client::{LlmError, VisionModel, VisionRequest};
    use crate::recommendation::cache::RankCache;
    use crate::recommendation::ranker::CandidateRanker;
    use crate::wardrobe::{WardrobeItem, WardrobeStore};

    const BOUNDARY: &str = "outfitter-test-boundary";
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

    /// Always answers with a valid white-shirt record.
    struct ShirtVision;

    #[async_trait]
    impl VisionModel for ShirtVision {
        async fn generate(&self, _request: VisionRequest<'_>) -> Result<String, LlmError> {
            let mut record = default_record();
            record.category.main = "top".to_string();
            record.category.sub = "shirt".to_string();
            record.color.primary = "white".to_string();
            record.confidence = 0.9;
            Ok(serde_json::to_string(&record).unwrap())
        }
    }

    fn test_state() -> AppState {
        let config = Config {
            gemini_api_key: "test".to_string(),
            gemini_model: "test-model".to_string(),
            gemini_vision_model: "test-model".to_string(),
            port: 0,
            rust_log: "info".to_string(),
            max_upload_bytes: 1024,
            rank_cache_capacity: 4,
            rerank_timeout_secs: 1,
            candidate_limit: 10,
        };
        AppState {
            pipeline: ExtractionPipeline::new(Arc::new(ShirtVision), config.max_upload_bytes),
            ranker: Arc::new(CandidateRanker::new(
                RankCache::new(config.rank_cache_capacity),
                None,
                config.candidate_limit,
                Duration::from_secs(config.rerank_timeout_secs),
            )),
            wardrobe: Arc::new(WardrobeStore::new()),
            config,
        }
    }

    fn stored(state: &AppState, main: &str, sub: &str, color: &str) -> WardrobeItem {
        let mut attrs = default_record();
        attrs.category.main = main.to_string();
        attrs.category.sub = sub.to_string();
        attrs.color.primary = color.to_string();
        let item = WardrobeItem::new(attrs);
        state.wardrobe.insert(item.clone());
        item
    }

    fn multipart(files: &[(&str, &str, &[u8])]) -> Body {
        let mut body = Vec::new();
        for (field, filename, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                     filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Body::from(body)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_multipart(body: Body) -> Request<Body> {
        Request::post("/api/v1/extract")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(body)
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state());
        let (status, body) = send(&app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "outfitter");
    }

    #[tokio::test]
    async fn test_extract_stores_accepted_and_reports_rejected() {
        let state = test_state();
        let app = build_router(state.clone());
        let body = multipart(&[
            ("images", "a.png", PNG),
            ("images", "notes.txt", b"just some text"),
            ("images", "b.png", PNG),
        ]);
        let (status, body) = send(&app, post_multipart(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["succeeded"], 2);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items[0]["success"], true);
        assert_eq!(items[0]["attributes"]["category"]["sub"], "shirt");
        assert_eq!(items[1]["success"], false);
        assert_eq!(items[1]["filename"], "notes.txt");
        assert!(items[1]["error"].as_str().unwrap().contains("file type"));
        assert_eq!(state.wardrobe.len(), 2);

        let id = items[2]["item_id"].as_str().unwrap();
        let (status, item) = send(&app, get_req(&format!("/api/v1/wardrobe/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(item["attributes"]["color"]["primary"], "white");
    }

    #[tokio::test]
    async fn test_extract_without_images_is_bad_request() {
        let app = build_router(test_state());
        let body = multipart(&[("photo", "a.png", PNG)]);
        let (status, body) = send(&app, post_multipart(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_wardrobe_list_filter_and_delete() {
        let state = test_state();
        let app = build_router(state.clone());
        let top = stored(&state, "top", "shirt", "white");
        stored(&state, "bottom", "jeans", "denim");

        let (_, all) = send(&app, get_req("/api/v1/wardrobe")).await;
        assert_eq!(all["count"], 2);
        let (_, tops) = send(&app, get_req("/api/v1/wardrobe?category=top")).await;
        assert_eq!(tops["count"], 1);

        let uri = format!("/api/v1/wardrobe/{}", top.id);
        let delete = Request::delete(uri.as_str()).body(Body::empty()).unwrap();
        let (status, _) = send(&app, delete).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, get_req(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_recommend_empty_pools_and_rule_based() {
        let state = test_state();
        let app = build_router(state.clone());
        stored(&state, "top", "shirt", "white");

        let (status, body) = send(&app, post_json("/api/v1/recommend", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["method"], "none");
        assert_eq!(body["outfits"], json!([]));
        assert!(body["message"].as_str().unwrap().starts_with("Not enough items"));

        stored(&state, "bottom", "slacks", "navy");
        let (_, body) = send(
            &app,
            post_json("/api/v1/recommend", json!({"count": 1, "use_llm": false})),
        )
        .await;
        assert_eq!(body["method"], "rule-based");
        assert_eq!(body["count"], 1);
        assert_eq!(body["outfits"][0]["style_description"], "shirt & slacks");

        let (_, body) = send(
            &app,
            post_json("/api/v1/recommend", json!({"season": "summer"})),
        )
        .await;
        assert_eq!(body["method"], "none");
        assert_eq!(body["message"], "No items match the filters");

        let (status, _) = send(&app, post_json("/api/v1/recommend", json!({"count": 0}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_outfit_score_endpoint() {
        let state = test_state();
        let app = build_router(state.clone());
        let top = stored(&state, "top", "shirt", "navy");
        let bottom = stored(&state, "bottom", "slacks", "white");

        let uri = format!(
            "/api/v1/outfit/score?top_id={}&bottom_id={}",
            top.id, bottom.id
        );
        let (status, body) = send(&app, get_req(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        let score = body["score"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&score));
        assert_eq!(
            body["score_percent"].as_u64().unwrap(),
            (score * 100.0).round() as u64
        );
        assert!(body["breakdown"]["color"].is_number());

        let missing = format!(
            "/api/v1/outfit/score?top_id={}&bottom_id={}",
            top.id,
            uuid::Uuid::new_v4()
        );
        let (status, _) = send(&app, get_req(&missing)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
