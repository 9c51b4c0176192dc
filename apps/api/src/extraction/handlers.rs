use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::models::AttributeRecord;
use crate::state::AppState;
use crate::wardrobe::WardrobeItem;

pub const IMAGE_FIELD: &str = "images";
pub const MAX_FILES_PER_REQUEST: usize = 10;

const ACCEPTED_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Deserialize)]
pub struct ExtractQuery {
    #[serde(default = "default_retry")]
    pub retry: bool,
}

fn default_retry() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ExtractedItem {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<AttributeRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub count: usize,
    pub succeeded: usize,
    pub items: Vec<ExtractedItem>,
}

struct Upload {
    filename: Option<String>,
    data: Bytes,
}

/// POST /api/v1/extract
pub async fn handle_extract(
    State(state): State<AppState>,
    Query(query): Query<ExtractQuery>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        uploads.push(Upload { filename, data });
    }

    if uploads.is_empty() {
        return Err(AppError::Validation(format!(
            "No image files provided (multipart field '{IMAGE_FIELD}')"
        )));
    }
    if uploads.len() > MAX_FILES_PER_REQUEST {
        return Err(AppError::Validation(format!(
            "At most {MAX_FILES_PER_REQUEST} images per request, got {}",
            uploads.len()
        )));
    }

    info!("Extracting attributes from {} upload(s)", uploads.len());

    let limit = state.config.max_upload_bytes;
    let checks: Vec<Result<(), String>> = uploads
        .iter()
        .map(|upload| check_upload(&upload.data, limit))
        .collect();
    let accepted: Vec<Bytes> = uploads
        .iter()
        .zip(&checks)
        .filter(|(_, check)| check.is_ok())
        .map(|(upload, _)| upload.data.clone())
        .collect();

    let mut extracted = state
        .pipeline
        .extract_batch(accepted, query.retry)
        .await
        .into_iter();

    let outcomes = uploads.into_iter().zip(checks).map(|(upload, check)| {
        let result = check.and_then(|()| match extracted.next() {
            Some(result) => result.map_err(|e| e.to_string()),
            None => Err("Extraction did not run".to_string()),
        });
        (upload.filename, result)
    });

    let items: Vec<ExtractedItem> = outcomes
        .into_iter()
        .map(|(filename, result)| match result {
            Ok(attributes) => {
                let item = WardrobeItem::new(attributes);
                let id = item.id;
                let attributes = item.attributes.clone();
                state.wardrobe.insert(item);
                ExtractedItem {
                    success: true,
                    filename,
                    item_id: Some(id),
                    attributes: Some(attributes),
                    error: None,
                }
            }
            Err(error) => {
                warn!("Rejected upload {:?}: {error}", filename);
                ExtractedItem {
                    success: false,
                    filename,
                    item_id: None,
                    attributes: None,
                    error: Some(error),
                }
            }
        })
        .collect();

    let succeeded = items.iter().filter(|i| i.success).count();
    info!("Extraction finished: {succeeded}/{} stored", items.len());

    Ok(Json(ExtractResponse {
        count: items.len(),
        succeeded,
        items,
    }))
}

/// Size and magic-byte checks applied before an upload reaches the model.
fn check_upload(data: &[u8], limit: usize) -> Result<(), String> {
    if data.is_empty() {
        return Err("File is empty".to_string());
    }
    if data.len() > limit {
        return Err(format!(
            "File size exceeds maximum allowed size ({:.1}MB)",
            limit as f64 / (1024.0 * 1024.0)
        ));
    }
    match infer::get(data).map(|kind| kind.mime_type()) {
        Some(mime) if ACCEPTED_MIME_TYPES.contains(&mime) => Ok(()),
        Some(mime) => Err(format!(
            "Invalid file type '{mime}'. Allowed: {}",
            ACCEPTED_MIME_TYPES.join(", ")
        )),
        None => Err(format!(
            "Unrecognised file type. Allowed: {}",
            ACCEPTED_MIME_TYPES.join(", ")
        )),
    }
}
