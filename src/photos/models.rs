use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::FromRow;

/// One photo record. Created on upload, mutated by the analysis flow only
/// through the attach-analysis operation, deleted independently.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Photo {
    pub id: i64,
    pub user_id: i64,
    pub field_id: Option<i64>,
    pub filename: String,
    pub original_name: Option<String>,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub source: Option<String>,
    pub capture_date: Option<DateTime<Utc>>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub analysis_status: String,
    pub analysis_results: Option<Value>,
    pub tags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl Photo {
    /// Wire shape of a single photo, camelCase field names.
    pub fn api_shape(&self) -> Value {
        json!({
            "id": self.id,
            "userId": self.user_id,
            "fieldId": self.field_id,
            "filename": self.filename,
            "originalName": self.original_name,
            "filePath": self.file_path,
            "fileSize": self.file_size,
            "mimeType": self.mime_type,
            "source": self.source,
            "captureDate": self.capture_date,
            "gpsLatitude": self.gps_latitude,
            "gpsLongitude": self.gps_longitude,
            "altitude": self.altitude,
            "analysisStatus": self.analysis_status,
            "analysisResults": self.analysis_results,
            "tags": self.tags,
            "createdAt": self.created_at,
        })
    }
}

/// Fields a new upload provides; everything else is defaulted by the schema.
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub user_id: i64,
    pub filename: String,
    pub original_name: Option<String>,
    pub file_path: String,
    pub file_size: Option<i64>,
    pub mime_type: Option<String>,
    pub source: Option<String>,
}

/// Partial PATCH body. Only tags, analysis status, and analysis results are
/// updatable; anything else in the request body is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUpdate {
    pub tags: Option<Vec<String>>,
    pub analysis_status: Option<String>,
    pub analysis_results: Option<Value>,
}

impl PhotoUpdate {
    pub fn is_empty(&self) -> bool {
        self.tags.is_none() && self.analysis_status.is_none() && self.analysis_results.is_none()
    }
}
