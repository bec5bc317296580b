use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{VisionProvider, parse_model_json};
use crate::error::ApiError;
use crate::ingestion::ImageInput;

pub const MODEL_ID: &str = "gemini-2.0-flash-001";

const SYSTEM_INSTRUCTION: &str = "\
You are an agricultural plant pathology assistant for India. \
From a single plant image, infer: \
1) crop common name, \
2) most likely disease (or \"not a disease / abiotic stress\"), \
3) evidence-based explanation, \
4) a practical fertilizer plan that supports recovery or strengthens plant health \
(avoid banned chemicals; if unsure, recommend safe general-use NPK or organic soil amendments). \
Output ONLY JSON matching the schema provided. Use short, specific, farmer-friendly language. \
If low confidence, say so and suggest next steps.";

const OUTPUT_CONTRACT: &str = r#"Return JSON with keys exactly as in this type:
{
  "crop_name": string,
  "disease_name": string,
  "confidence": number,
  "explanation": string,
  "recommended_fertilizer": {
    "type": "NPK" | "organic" | "micronutrient" | "mixed",
    "product_example": string,
    "dosage_per_area": string,
    "application_method": string,
    "frequency": string
  },
  "additional_care": string[],
  "urgency": "low" | "medium" | "high",
  "alternatives_organic": string[],
  "warnings": string[],
  "references"?: string[]
}
Important: respond with raw JSON only, no backticks, no prose."#;

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(mime_type: &str, data: String) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Missing or empty text is treated as the empty string; it then fails the
    /// JSON parse downstream instead of silently succeeding.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.clone())
            .unwrap_or_default()
    }
}

/// Gemini generateContent adapter over raw HTTP.
#[derive(Clone)]
pub struct GeminiProvider {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(http_client: reqwest::Client, api_key: String, timeout_secs: u64) -> Self {
        Self {
            http_client,
            api_key,
            model: MODEL_ID.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        )
    }

    fn build_request(&self, image: &ImageInput) -> GenerateContentRequest {
        let encoded = BASE64.encode(&image.bytes);
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(SYSTEM_INSTRUCTION),
                    Part::inline(&image.mime_type, encoded),
                    Part::text(OUTPUT_CONTRACT),
                ],
            }],
        }
    }
}

impl VisionProvider for GeminiProvider {
    fn tag(&self) -> &'static str {
        "gemini_diagnosis"
    }

    async fn analyze(&self, image: &ImageInput) -> Result<Value, ApiError> {
        let body = self.build_request(image);

        let res = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
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
                "Gemini error {}: {}",
                status, raw_body
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&raw_body)
            .map_err(|e| ApiError::ProviderUnavailable(format!(
                "Unreadable Gemini response: {} | body: {}",
                e, raw_body
            )))?;

        let text = parsed.text();
        tracing::debug!("Gemini returned {} chars of text", text.len());

        parse_model_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn sample_image() -> ImageInput {
        crate::ingestion::from_upload(
            crate::ingestion::UploadedFile {
                name: "leaf.jpg".to_string(),
                mime_type: "image/jpeg".to_string(),
                data: Bytes::from_static(b"\xff\xd8\xff fake jpeg"),
            },
            1024,
        )
        .unwrap()
    }

    #[test]
    fn test_request_carries_inline_image() {
        let provider = GeminiProvider::new(reqwest::Client::new(), "key".into(), 30);
        let req = provider.build_request(&sample_image());

        let wire = serde_json::to_value(&req).unwrap();
        let parts = wire["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");

        let data = parts[1]["inlineData"]["data"].as_str().unwrap();
        assert_eq!(BASE64.decode(data).unwrap(), b"\xff\xd8\xff fake jpeg");
    }

    #[test]
    fn test_request_demands_raw_json() {
        let provider = GeminiProvider::new(reqwest::Client::new(), "key".into(), 30);
        let req = provider.build_request(&sample_image());
        let wire = serde_json::to_string(&req).unwrap();
        assert!(wire.contains("raw JSON only"));
        assert!(wire.contains("recommended_fertilizer"));
    }

    #[test]
    fn test_missing_text_degrades_to_empty_string() {
        let parsed: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{}]}}]}"#).unwrap();
        assert_eq!(parsed.text(), "");

        let parsed: GenerateContentResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(parsed.text(), "");
    }

    #[test]
    fn test_text_extraction() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text(), "{\"a\":1}");
    }
}
