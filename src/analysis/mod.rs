pub mod gemini;
pub mod normalize;
pub mod plant_id;
pub mod schema;

use serde_json::Value;

use crate::error::ApiError;
use crate::ingestion::ImageInput;

/// One external model round trip: request construction, response extraction.
///
/// Two peer strategies exist (Gemini, Plant.id); neither supersedes the other.
/// The returned `Value` is provider-shaped raw output; downstream validation
/// and normalization give it a stable shape.
pub trait VisionProvider {
    /// Tag stamped into the normalized report as `analysisType`.
    fn tag(&self) -> &'static str;

    async fn analyze(&self, image: &ImageInput) -> Result<Value, ApiError>;
}

/// Strip leading/trailing markdown code-fence markers from model output.
/// Models routinely wrap JSON in ```json blocks despite being told not to.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let opened = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let closed = opened.trim_end().strip_suffix("```").unwrap_or(opened);
    closed.trim()
}

/// Parse cleaned model text as JSON, keeping the original text for
/// diagnostics on failure.
pub fn parse_model_json(text: &str) -> Result<Value, ApiError> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(cleaned).map_err(|_| ApiError::MalformedProviderResponse {
        raw_text: text.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences() {
        let text = "```json\n{\"crop_name\":\"Tomato\"}\n```";
        assert_eq!(strip_code_fences(text), "{\"crop_name\":\"Tomato\"}");
    }

    #[test]
    fn test_strip_bare_fences() {
        let text = "```\n{\"a\":1}\n```";
        assert_eq!(strip_code_fences(text), "{\"a\":1}");
    }

    #[test]
    fn test_unfenced_text_untouched() {
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_fenced_json_parses() {
        let value = parse_model_json("```json\n{\"crop_name\":\"Tomato\"}\n```").unwrap();
        assert_eq!(value["crop_name"], "Tomato");
    }

    #[test]
    fn test_prose_keeps_raw_text() {
        let prose = "The plant in the image appears to be a tomato with early blight.";
        let err = parse_model_json(prose).unwrap_err();
        match err {
            ApiError::MalformedProviderResponse { raw_text } => assert_eq!(raw_text, prose),
            other => panic!("expected MalformedProviderResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_text_is_parse_failure() {
        // A missing provider text field degrades to "", which must fail the
        // parse rather than succeed silently.
        assert!(parse_model_json("").is_err());
    }
}
