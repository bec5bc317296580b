use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::VisionProvider;
use crate::error::ApiError;
use crate::ingestion::ImageInput;

const ENDPOINT: &str = "https://plant.id/api/v3/health_assessment";

/// Plant.id v3 health-assessment adapter. Second strategy behind the same
/// trait as Gemini; the photos route uses this one.
#[derive(Clone)]
pub struct PlantIdProvider {
    http_client: reqwest::Client,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct HealthAssessmentRequest {
    images: Vec<String>,
    similar_images: bool,
    health: &'static str,
}

impl PlantIdProvider {
    pub fn new(http_client: reqwest::Client, api_key: String, timeout_secs: u64) -> Self {
        Self {
            http_client,
            api_key,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

impl VisionProvider for PlantIdProvider {
    fn tag(&self) -> &'static str {
        "plant_id_v3"
    }

    async fn analyze(&self, image: &ImageInput) -> Result<Value, ApiError> {
        let body = HealthAssessmentRequest {
            images: vec![BASE64.encode(&image.bytes)],
            similar_images: true,
            health: "all",
        };

        let res = self
            .http_client
            .post(ENDPOINT)
            .header("Api-Key", &self.api_key)
            .query(&[("details", "description,treatment,cause,classification")])
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::ProviderUnavailable(e.to_string()))?;

        let status = res.status();
        let raw_body = res
            .text()
            .await
            .map_err(|e| ApiError::ProviderUnavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::ProviderUnavailable(format!(
                "Plant.id error {}: {}",
                status, raw_body
            )));
        }

        serde_json::from_str(&raw_body).map_err(|_| ApiError::MalformedProviderResponse {
            raw_text: raw_body,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct HealthAssessmentResponse {
    #[serde(default)]
    result: AssessmentResult,
}

#[derive(Debug, Default, Deserialize)]
struct AssessmentResult {
    #[serde(default)]
    is_healthy: HealthFlag,
    #[serde(default)]
    disease: SuggestionList,
    #[serde(default)]
    classification: SuggestionList,
}

#[derive(Debug, Default, Deserialize)]
struct HealthFlag {
    #[serde(default)]
    binary: bool,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestionList {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Default, Deserialize)]
struct Suggestion {
    #[serde(default)]
    name: String,
    #[serde(default)]
    probability: f64,
    #[serde(default)]
    details: SuggestionDetails,
}

#[derive(Debug, Default, Deserialize)]
struct SuggestionDetails {
    description: Option<String>,
    cause: Option<String>,
    #[serde(default)]
    treatment: Treatment,
}

#[derive(Debug, Default, Deserialize)]
struct Treatment {
    #[serde(default)]
    biological: Vec<String>,
    #[serde(default)]
    chemical: Vec<String>,
    #[serde(default)]
    prevention: Vec<String>,
}

/// Provider-shaped analysis extracted from a Plant.id response, ready for
/// normalization.
#[derive(Debug, Clone, Serialize)]
pub struct PlantIdAnalysis {
    pub crop_name: String,
    pub disease_name: String,
    pub confidence: f64,
    pub severity: String,
    pub symptoms: Vec<String>,
    pub causes: Vec<String>,
    pub treatments: Vec<String>,
    pub prevention: Vec<String>,
    pub recommendations: Vec<String>,
    pub urgency: String,
    pub estimated_yield_loss: String,
    pub cost_of_treatment: String,
    pub image_info: ImageInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInfo {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

impl PlantIdAnalysis {
    pub fn from_response(raw: &Value, image: &ImageInput) -> Result<Self, ApiError> {
        let response: HealthAssessmentResponse =
            serde_json::from_value(raw.clone()).map_err(|_| {
                ApiError::MalformedProviderResponse {
                    raw_text: raw.to_string(),
                }
            })?;

        let result = response.result;
        let healthy = result.is_healthy.binary;
        let top_disease = result.disease.suggestions.into_iter().next();
        let top_crop = result.classification.suggestions.into_iter().next();

        let (disease_name, confidence, details) = match top_disease {
            Some(s) if !healthy => (s.name, s.probability, s.details),
            _ => ("Healthy".to_string(), 1.0, SuggestionDetails::default()),
        };

        let severity = severity_for(healthy, confidence);
        let urgency = match severity {
            "high" => "high",
            "moderate" => "medium",
            _ => "low",
        };

        let mut treatments: Vec<String> = details.treatment.chemical.clone();
        treatments.extend(details.treatment.biological.clone());

        let mut recommendations = Vec::new();
        if healthy {
            recommendations.push("No disease detected; continue routine monitoring".to_string());
        } else {
            recommendations.push("Re-inspect the field within 7 days".to_string());
            if let Some(first) = treatments.first() {
                recommendations.push(format!("Start with: {}", first));
            }
        }

        Ok(Self {
            crop_name: top_crop
                .map(|s| s.name)
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown crop".to_string()),
            disease_name,
            confidence,
            severity: severity.to_string(),
            symptoms: details.description.into_iter().collect(),
            causes: details.cause.into_iter().collect(),
            treatments,
            prevention: details.treatment.prevention,
            recommendations,
            urgency: urgency.to_string(),
            estimated_yield_loss: yield_loss_for(severity).to_string(),
            cost_of_treatment: cost_for(severity).to_string(),
            image_info: ImageInfo {
                filename: image.filename.clone(),
                mime_type: image.mime_type.clone(),
                size_bytes: image.bytes.len(),
            },
        })
    }
}

fn severity_for(healthy: bool, probability: f64) -> &'static str {
    if healthy {
        "low"
    } else if probability >= 0.75 {
        "high"
    } else if probability >= 0.4 {
        "moderate"
    } else {
        "low"
    }
}

fn yield_loss_for(severity: &str) -> &'static str {
    match severity {
        "high" => "25-50%",
        "moderate" => "10-25%",
        _ => "0-10%",
    }
}

fn cost_for(severity: &str) -> &'static str {
    match severity {
        "high" => "$300-450 per hectare",
        "moderate" => "$150-300 per hectare",
        _ => "$0-150 per hectare",
    }
}
