use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;
use crate::wardrobe::WardrobeItem;

#[derive(Deserialize)]
pub struct WardrobeQuery {
    pub category: Option<String>,
}

#[derive(Serialize)]
pub struct WardrobeListResponse {
    pub count: usize,
    pub items: Vec<WardrobeItem>,
}

/// GET /api/v1/wardrobe
pub async fn handle_list_items(
    State(state): State<AppState>,
    Query(params): Query<WardrobeQuery>,
) -> Result<Json<WardrobeListResponse>, AppError> {
    let items = match params.category.as_deref().map(str::trim) {
        Some(category) if !category.is_empty() => state.wardrobe.by_category(category),
        _ => state.wardrobe.list(),
    };
    Ok(Json(WardrobeListResponse {
        count: items.len(),
        items,
    }))
}

/// GET /api/v1/wardrobe/:id
pub async fn handle_get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<WardrobeItem>, AppError> {
    state
        .wardrobe
        .get(id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Item {id} not found")))
}

/// DELETE /api/v1/wardrobe/:id
pub async fn handle_delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .wardrobe
        .remove(id)
        .ok_or_else(|| AppError::NotFound(format!("Item {id} not found")))?;
    info!("Removed wardrobe item {id}");
    Ok(StatusCode::NO_CONTENT)
}
