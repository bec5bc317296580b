use serde::Serialize;

/// Server configuration, read once at startup.
///
/// Every size/time limit used by the handlers lives here so the entry points
/// cannot silently diverge on scattered literals.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub google_api_key: Option<String>,
    pub plant_id_api_key: Option<String>,
    pub upload_dir: String,
    /// Max upload size for POST /analyze (bytes).
    pub max_file_size: usize,
    /// Max upload size for the photo-analysis path (bytes).
    pub max_photo_size: usize,
    /// Timeout for a single provider round trip.
    pub provider_timeout_secs: u64,
    /// Overall budget for one analysis request, large uploads included.
    pub max_processing_secs: u64,
    pub port: u16,
    pub environment: String,
}

const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10MB
const DEFAULT_MAX_PHOTO_SIZE: usize = 20 * 1024 * 1024; // 20MB

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            google_api_key: std::env::var("GOOGLE_API_KEY").ok(),
            plant_id_api_key: std::env::var("PLANT_ID_API_KEY").ok(),
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
            max_file_size: env_usize("MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),
            max_photo_size: env_usize("MAX_PHOTO_SIZE", DEFAULT_MAX_PHOTO_SIZE),
            provider_timeout_secs: env_usize("PROVIDER_TIMEOUT_SECS", 30) as u64,
            max_processing_secs: env_usize("MAX_PROCESSING_SECS", 300) as u64,
            port: env_usize("PORT", 3000) as u16,
            environment: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Serialize)]
pub struct ConfigCheck {
    pub google_api_key: KeyStatus,
    pub plant_id_api_key: KeyStatus,
    pub upload_dir: String,
    pub max_file_size: usize,
    pub max_photo_size: usize,
    pub environment: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct KeyStatus {
    pub configured: bool,
    pub value: &'static str,
}

impl KeyStatus {
    fn for_key(key: &Option<String>) -> Self {
        let configured = key.as_deref().is_some_and(|k| !k.is_empty());
        Self {
            configured,
            value: if configured { "Configured" } else { "Not configured" },
        }
    }
}

impl ConfigCheck {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            google_api_key: KeyStatus::for_key(&config.google_api_key),
            plant_id_api_key: KeyStatus::for_key(&config.plant_id_api_key),
            upload_dir: config.upload_dir.clone(),
            max_file_size: config.max_file_size,
            max_photo_size: config.max_photo_size,
            environment: config.environment.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_status() {
        let status = KeyStatus::for_key(&Some("abc123".to_string()));
        assert!(status.configured);
        assert_eq!(status.value, "Configured");

        let missing = KeyStatus::for_key(&None);
        assert!(!missing.configured);
        assert_eq!(missing.value, "Not configured");

        // Empty string counts as not configured
        let empty = KeyStatus::for_key(&Some(String::new()));
        assert!(!empty.configured);
    }
}
