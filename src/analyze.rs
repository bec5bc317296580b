use axum::{
    extract::{Multipart, State},
    response::Json,
};

use crate::AppState;
use crate::analysis::VisionProvider;
use crate::analysis::schema::{self, Diagnosis};
use crate::error::ApiError;
use crate::ingestion::{self, UploadedFile};

/// POST /analyze (multipart, field `image`)
///
/// Direct diagnosis path: uploaded image → Gemini → schema validation →
/// strict `Diagnosis` JSON. Nothing is persisted here.
pub async fn analyze_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Diagnosis>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() == Some("image") {
            let name = field.file_name().unwrap_or("unknown").to_string();
            let mime_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidInput(format!("Failed to read file: {}", e)))?;
            upload = Some(UploadedFile {
                name,
                mime_type,
                data,
            });
        }
    }

    let upload = upload.ok_or_else(|| ApiError::InvalidInput("No image uploaded".to_string()))?;
    let input = ingestion::from_upload(upload, state.config.max_file_size)?;

    tracing::info!(
        "Analyzing {} ({} bytes, {})",
        input.filename,
        input.bytes.len(),
        input.mime_type
    );

    let raw = state.gemini.analyze(&input).await?;

    let diagnosis =
        schema::validate(&raw).map_err(|issues| ApiError::SchemaValidation { issues })?;

    tracing::info!(
        "{} diagnosis: {} / {} ({:.2})",
        state.gemini.tag(),
        diagnosis.crop_name,
        diagnosis.disease_name,
        diagnosis.confidence
    );

    Ok(Json(diagnosis))
}
