pub mod validation;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use sqlx::PgPool;

use crate::error::ApiError;
use crate::storage::TempImage;
use validation::validate_image_upload;

/// One resolved image, whatever shape the request arrived in.
///
/// Ephemeral: consumed by the analysis adapter, never persisted. When the
/// input came in as base64 the temp-file guard rides along so the artifact is
/// removed once the input goes out of scope, adapter failure included.
#[derive(Debug)]
pub struct ImageInput {
    pub bytes: Bytes,
    pub mime_type: String,
    pub filename: String,
    /// Set when the image was resolved from a stored photo record.
    pub source_photo_id: Option<i64>,
    _temp: Option<TempImage>,
}

/// The at-most-one-of-three payload accepted by the analysis endpoints.
#[derive(Debug, Default)]
pub struct RequestSource {
    pub file: Option<UploadedFile>,
    pub photo_id: Option<i64>,
    pub image_base64: Option<String>,
}

#[derive(Debug)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Upload,
    StoredPhoto,
    Base64,
}

impl RequestSource {
    /// Fixed precedence: uploaded file > stored reference > base64.
    pub fn kind(&self) -> Option<SourceKind> {
        if self.file.is_some() {
            Some(SourceKind::Upload)
        } else if self.photo_id.is_some() {
            Some(SourceKind::StoredPhoto)
        } else if self.image_base64.is_some() {
            Some(SourceKind::Base64)
        } else {
            None
        }
    }
}

/// Resolve a request payload into exactly one `ImageInput`, applying the
/// fixed precedence.
pub async fn resolve_source(
    pool: &PgPool,
    source: RequestSource,
    max_bytes: usize,
) -> Result<ImageInput, ApiError> {
    if let Some(upload) = source.file {
        from_upload(upload, max_bytes)
    } else if let Some(photo_id) = source.photo_id {
        from_stored_photo(pool, photo_id).await
    } else if let Some(raw) = source.image_base64 {
        from_base64(&raw, max_bytes)
    } else {
        Err(ApiError::InvalidInput(
            "Provide one of: file, photoId, or imageBase64".to_string(),
        ))
    }
}

pub fn from_upload(upload: UploadedFile, max_bytes: usize) -> Result<ImageInput, ApiError> {
    validate_image_upload(&upload.mime_type, &upload.data, max_bytes)?;

    Ok(ImageInput {
        bytes: upload.data,
        mime_type: upload.mime_type,
        filename: upload.name,
        source_photo_id: None,
        _temp: None,
    })
}

async fn from_stored_photo(pool: &PgPool, photo_id: i64) -> Result<ImageInput, ApiError> {
    let photo = crate::photos::queries::get_photo_by_id(pool, photo_id)
        .await
        .map_err(ApiError::Internal)?
        .ok_or_else(|| ApiError::NotFound("Photo not found".to_string()))?;

    let bytes = tokio::fs::read(&photo.file_path).await.map_err(|e| {
        ApiError::Internal(anyhow::anyhow!(
            "Stored photo file {} unreadable: {}",
            photo.file_path,
            e
        ))
    })?;

    let mime_type = photo.mime_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&photo.file_path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    });

    Ok(ImageInput {
        bytes: Bytes::from(bytes),
        mime_type,
        filename: photo.filename,
        source_photo_id: Some(photo_id),
        _temp: None,
    })
}

pub fn from_base64(raw: &str, max_bytes: usize) -> Result<ImageInput, ApiError> {
    let payload = strip_data_url_prefix(raw);

    let decoded = BASE64
        .decode(payload.trim())
        .map_err(|e| ApiError::InvalidInput(format!("Invalid base64 image data: {}", e)))?;

    validate_image_upload("image/jpeg", &decoded, max_bytes)?;

    // Written to a uniquely named temp file so every input shape presents the
    // same file-backed interface downstream.
    let temp = TempImage::create(&decoded).map_err(ApiError::Internal)?;
    let filename = temp.filename();

    Ok(ImageInput {
        bytes: Bytes::from(decoded),
        mime_type: "image/jpeg".to_string(),
        filename,
        source_photo_id: None,
        _temp: Some(temp),
    })
}

/// Strip an optional `data:<mime>;base64,` prefix.
fn strip_data_url_prefix(raw: &str) -> &str {
    if raw.starts_with("data:") {
        raw.split_once(',').map(|(_, rest)| rest).unwrap_or(raw)
    } else {
        raw
    }
}
