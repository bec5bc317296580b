use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::{StatusCode, header},
    response::Json,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::AppState;
use crate::analysis::VisionProvider;
use crate::analysis::normalize::ToReport;
use crate::analysis::plant_id::PlantIdAnalysis;
use crate::error::ApiError;
use crate::ingestion::{self, RequestSource, UploadedFile, validation};
use crate::storage;

use super::models::{NewPhoto, PhotoUpdate};
use super::queries;

const DEFAULT_USER_ID: i64 = 1;

/// POST /api/photos — upload a photo and create its record with analysis
/// status "pending".
pub async fn upload_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let mut upload = None;
    let mut user_id = DEFAULT_USER_ID;
    let mut source = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("unknown").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::InvalidInput(format!("Failed to read file: {}", e)))?;
                upload = Some(UploadedFile {
                    name: file_name,
                    mime_type: content_type,
                    data,
                });
            }
            "userId" => {
                if let Ok(text) = field.text().await {
                    if let Ok(id) = text.trim().parse() {
                        user_id = id;
                    }
                }
            }
            "source" => {
                source = field.text().await.ok();
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| ApiError::InvalidInput("No file provided".to_string()))?;
    let input = ingestion::from_upload(upload, state.config.max_photo_size)?;
    validation::probe_decode(&input.bytes)?;

    let saved = storage::save_uploaded_file(
        &state.config.upload_dir,
        user_id,
        &input.filename,
        &input.bytes,
    )
    .await
    .map_err(ApiError::Internal)?;

    let photo = queries::create_photo(
        &state.db_pool,
        &NewPhoto {
            user_id,
            filename: saved.filename,
            original_name: Some(input.filename.clone()),
            file_path: saved.filepath,
            file_size: Some(input.bytes.len() as i64),
            mime_type: Some(input.mime_type.clone()),
            source: source.or_else(|| Some("upload".to_string())),
        },
    )
    .await
    .map_err(ApiError::Internal)?;

    tracing::info!("Created photo record {} for user {}", photo.id, user_id);

    Ok(Json(json!({
        "success": true,
        "photo": photo.api_shape(),
        "message": "Photo uploaded successfully",
    })))
}

/// POST /api/photos/analyze
///
/// Accepts multipart or JSON; exactly one of file / photoId / imageBase64.
/// Resolves the image, runs the Plant.id adapter, normalizes the result, and
/// attaches it to the photo record when one was referenced.
pub async fn analyze_photo(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<Value>, ApiError> {
    tracing::info!("Plant.id crop analysis request received");

    let (mut source, user_id) = parse_request(&state, request).await?;
    tracing::debug!("Analysis source: {:?} (user {})", source.kind(), user_id);
    let max_bytes = state.config.max_photo_size;

    let (input, filename) = if let Some(upload) = source.file.take() {
        let input = ingestion::from_upload(upload, max_bytes)?;
        validation::probe_decode(&input.bytes)?;

        let saved = storage::save_uploaded_file(
            &state.config.upload_dir,
            user_id,
            &input.filename,
            &input.bytes,
        )
        .await
        .map_err(ApiError::Internal)?;

        (input, saved.filename)
    } else {
        let input = ingestion::resolve_source(&state.db_pool, source, max_bytes).await?;
        let filename = input.filename.clone();
        (input, filename)
    };

    // Whole-request budget; large uploads get the full window, not just the
    // provider timeout.
    let budget = Duration::from_secs(state.config.max_processing_secs);
    let raw = tokio::time::timeout(budget, state.plant_id.analyze(&input))
        .await
        .map_err(|_| {
            ApiError::ProviderUnavailable(format!(
                "Analysis exceeded {}s processing budget",
                state.config.max_processing_secs
            ))
        })??;

    let analysis = PlantIdAnalysis::from_response(&raw, &input)?;
    let report = analysis.to_report();
    tracing::info!(
        "{} analysis complete: {} / {} ({:.2})",
        state.plant_id.tag(),
        report.crop_name,
        report.disease_name,
        report.confidence
    );

    if let Some(photo_id) = input.source_photo_id {
        let results =
            serde_json::to_value(&report).map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;
        let attached =
            queries::update_photo_analysis(&state.db_pool, photo_id, &results, "completed")
                .await
                .map_err(ApiError::Internal)?;
        if !attached {
            return Err(ApiError::NotFound("Photo not found".to_string()));
        }
        tracing::info!("Attached analysis to photo {}", photo_id);
    }

    Ok(Json(json!({
        "success": true,
        "analysis": report,
        "imageInfo": analysis.image_info,
        "filename": filename,
        "message": "Crop disease analysis completed successfully via Plant.id",
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeJsonBody {
    photo_id: Option<Value>,
    user_id: Option<Value>,
    image_base64: Option<String>,
}

/// Pull the analysis source out of either a multipart form or a JSON body,
/// mirroring clients that send `FormData` and clients that post JSON.
async fn parse_request(
    state: &AppState,
    request: Request,
) -> Result<(RequestSource, i64), ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(|e| ApiError::InvalidInput(format!("Failed to read multipart: {}", e)))?;
        parse_multipart(multipart).await
    } else {
        let bytes = axum::body::to_bytes(request.into_body(), state.config.max_photo_size * 2)
            .await
            .map_err(|e| ApiError::InvalidInput(format!("Failed to read body: {}", e)))?;
        let body: AnalyzeJsonBody = if bytes.is_empty() {
            AnalyzeJsonBody::default()
        } else {
            serde_json::from_slice(&bytes)
                .map_err(|e| ApiError::InvalidInput(format!("Invalid JSON body: {}", e)))?
        };

        let source = RequestSource {
            file: None,
            photo_id: body.photo_id.as_ref().and_then(value_to_i64),
            image_base64: body.image_base64,
        };
        let user_id = body
            .user_id
            .as_ref()
            .and_then(value_to_i64)
            .unwrap_or(DEFAULT_USER_ID);
        Ok((source, user_id))
    }
}

async fn parse_multipart(mut multipart: Multipart) -> Result<(RequestSource, i64), ApiError> {
    let mut source = RequestSource::default();
    let mut user_id = DEFAULT_USER_ID;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("unknown").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::InvalidInput(format!("Failed to read file: {}", e)))?;
                source.file = Some(UploadedFile {
                    name: file_name,
                    mime_type: content_type,
                    data,
                });
            }
            "photoId" => {
                source.photo_id = field.text().await.ok().and_then(|s| s.trim().parse().ok());
            }
            "userId" => {
                if let Ok(text) = field.text().await {
                    if let Ok(id) = text.trim().parse() {
                        user_id = id;
                    }
                }
            }
            "imageBase64" => {
                source.image_base64 = field.text().await.ok();
            }
            _ => {}
        }
    }

    Ok((source, user_id))
}

/// Ids arrive as JSON numbers from some clients and strings from others.
fn value_to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    limit: Option<i64>,
}

/// GET /api/photos/analyze?userId&limit — analysis history.
pub async fn analysis_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Value>, ApiError> {
    let user_id = params
        .user_id
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_USER_ID);
    let limit = params.limit.unwrap_or(10);

    let photos = queries::get_recent_photos(&state.db_pool, user_id, limit)
        .await
        .map_err(ApiError::Internal)?;

    let history: Vec<Value> = photos
        .iter()
        .filter(|p| p.analysis_results.is_some())
        .map(|p| {
            let results = p.analysis_results.as_ref().cloned().unwrap_or(Value::Null);
            json!({
                "id": p.id,
                "filename": p.filename,
                "originalName": p.original_name,
                "uploadedAt": p.created_at,
                "analysisStatus": p.analysis_status,
                "analysisResults": results,
                "cropName": results.get("cropName").cloned().unwrap_or(Value::Null),
                "diseaseName": results.get("diseaseName").cloned().unwrap_or(Value::Null),
                "severity": results.get("severity").cloned().unwrap_or(Value::Null),
                "confidence": results.get("confidence").cloned().unwrap_or(Value::Null),
            })
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "analysisHistory": history,
        "totalCount": history.len(),
        "message": "Analysis history retrieved successfully",
    })))
}

/// GET /api/photos/analyze-enhanced — history restricted to Plant.id reports.
pub async fn enhanced_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Value>, ApiError> {
    let user_id = params
        .user_id
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_USER_ID);

    let photos = queries::get_recent_photos(&state.db_pool, user_id, 20)
        .await
        .map_err(ApiError::Internal)?;

    let history: Vec<Value> = photos
        .iter()
        .filter_map(|p| {
            let results = p.analysis_results.as_ref()?;
            let tag = results.get("analysisType").and_then(Value::as_str)?;
            if tag != "plant_id_v3" && tag != "plant_id_fallback" {
                return None;
            }
            Some(json!({
                "id": p.id,
                "filename": p.filename,
                "originalName": p.original_name,
                "uploadedAt": p.created_at,
                "analyzedAt": results.get("lastAnalyzed").cloned().unwrap_or(Value::Null),
                "cropName": results.get("cropName").cloned().unwrap_or(Value::Null),
                "diseaseName": results.get("diseaseName").cloned().unwrap_or(Value::Null),
                "severity": results.get("severity").cloned().unwrap_or(Value::Null),
                "confidence": results.get("confidence").cloned().unwrap_or(Value::Null),
                "urgency": results.get("urgency").cloned().unwrap_or(Value::Null),
                "estimatedYieldLoss": results.get("estimatedYieldLoss").cloned().unwrap_or(Value::Null),
            }))
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "enhancedAnalysisHistory": history,
        "totalCount": history.len(),
        "message": "Enhanced analysis history retrieved successfully",
    })))
}

/// POST /api/photos/analyze-enhanced — deactivated, kept for old clients.
pub async fn analyze_enhanced_gone() -> (StatusCode, Json<Value>) {
    (
        StatusCode::GONE,
        Json(json!({
            "error": "Deprecated endpoint",
            "message": "Use POST /api/photos/analyze",
        })),
    )
}

/// GET /api/photos/{id}
pub async fn get_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let photo_id = parse_photo_id(&id)?;

    let photo = queries::get_photo_by_id(&state.db_pool, photo_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Photo not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "photo": photo.api_shape(),
    })))
}

/// DELETE /api/photos/{id} — removes the stored file, then the record.
pub async fn delete_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let photo_id = parse_photo_id(&id)?;

    let photo = queries::get_photo_by_id(&state.db_pool, photo_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Photo not found".to_string()))?;

    storage::delete_file(&photo.file_path).await;
    queries::delete_photo(&state.db_pool, photo_id)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(json!({
        "success": true,
        "message": "Photo deleted successfully",
    })))
}

/// PATCH /api/photos/{id} — partial update over tags/analysisStatus/analysisResults.
pub async fn patch_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(update): Json<PhotoUpdate>,
) -> Result<Json<Value>, ApiError> {
    let photo_id = parse_photo_id(&id)?;

    if update.is_empty() {
        return Err(ApiError::InvalidInput("No fields to update".to_string()));
    }

    let photo = queries::update_photo(&state.db_pool, photo_id, &update)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Photo not found".to_string()))?;

    Ok(Json(json!({
        "success": true,
        "photo": photo.api_shape(),
    })))
}

fn parse_photo_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::InvalidInput("Invalid photo ID".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_to_i64_accepts_both_wire_shapes() {
        assert_eq!(value_to_i64(&json!(42)), Some(42));
        assert_eq!(value_to_i64(&json!("42")), Some(42));
        assert_eq!(value_to_i64(&json!(" 7 ")), Some(7));
        assert_eq!(value_to_i64(&json!(true)), None);
        assert_eq!(value_to_i64(&json!("abc")), None);
    }

    #[test]
    fn test_parse_photo_id() {
        assert_eq!(parse_photo_id("12").unwrap(), 12);
        assert!(matches!(
            parse_photo_id("abc").unwrap_err(),
            ApiError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_json_body_field_names() {
        let body: AnalyzeJsonBody =
            serde_json::from_str(r#"{"photoId":"5","userId":2,"imageBase64":"aGk="}"#).unwrap();
        assert_eq!(body.photo_id.as_ref().and_then(value_to_i64), Some(5));
        assert_eq!(body.user_id.as_ref().and_then(value_to_i64), Some(2));
        assert_eq!(body.image_base64.as_deref(), Some("aGk="));
    }
}
