use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Issue;

/// Validated diagnosis for one image.
///
/// Only constructible through [`validate`]; a partially valid diagnosis is not
/// representable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnosis {
    pub crop_name: String,
    pub disease_name: String,
    pub confidence: f64,
    pub explanation: String,
    pub recommended_fertilizer: FertilizerPlan,
    pub additional_care: Vec<String>,
    pub urgency: Urgency,
    pub alternatives_organic: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FertilizerPlan {
    #[serde(rename = "type")]
    pub plan_type: FertilizerType,
    pub product_example: String,
    pub dosage_per_area: String,
    pub application_method: String,
    pub frequency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FertilizerType {
    #[serde(rename = "NPK")]
    Npk,
    #[serde(rename = "organic")]
    Organic,
    #[serde(rename = "micronutrient")]
    Micronutrient,
    #[serde(rename = "mixed")]
    Mixed,
}

impl FertilizerType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "NPK" => Some(Self::Npk),
            "organic" => Some(Self::Organic),
            "micronutrient" => Some(Self::Micronutrient),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Validate raw provider output against the diagnosis schema.
///
/// Collects every field-level problem rather than stopping at the first, so a
/// caller sees the complete issue list in one round trip.
pub fn validate(raw: &Value) -> Result<Diagnosis, Vec<Issue>> {
    let Some(obj) = raw.as_object() else {
        return Err(vec![Issue::new("", "Expected a JSON object")]);
    };

    let mut issues = Vec::new();

    let crop_name = require_string(obj, "crop_name", 2, &mut issues);
    let disease_name = require_string(obj, "disease_name", 2, &mut issues);
    let confidence = require_confidence(obj, &mut issues);
    let explanation = require_string(obj, "explanation", 10, &mut issues);
    let fertilizer = require_fertilizer(obj, &mut issues);
    let urgency = require_urgency(obj, &mut issues);
    let additional_care = string_array_or_default(obj, "additional_care", &mut issues);
    let alternatives_organic = string_array_or_default(obj, "alternatives_organic", &mut issues);
    let warnings = string_array_or_default(obj, "warnings", &mut issues);
    let references = optional_string_array(obj, "references", &mut issues);

    match (crop_name, disease_name, confidence, explanation, fertilizer, urgency) {
        (
            Some(crop_name),
            Some(disease_name),
            Some(confidence),
            Some(explanation),
            Some(recommended_fertilizer),
            Some(urgency),
        ) if issues.is_empty() => Ok(Diagnosis {
            crop_name,
            disease_name,
            confidence,
            explanation,
            recommended_fertilizer,
            additional_care,
            urgency,
            alternatives_organic,
            warnings,
            references,
        }),
        _ => Err(issues),
    }
}

fn require_string(
    obj: &Map<String, Value>,
    key: &str,
    min_len: usize,
    issues: &mut Vec<Issue>,
) -> Option<String> {
    match obj.get(key) {
        Some(Value::String(s)) if s.chars().count() >= min_len => Some(s.clone()),
        Some(Value::String(_)) => {
            issues.push(Issue::new(
                key,
                format!("String must contain at least {} character(s)", min_len),
            ));
            None
        }
        Some(_) => {
            issues.push(Issue::new(key, "Expected string"));
            None
        }
        None => {
            issues.push(Issue::new(key, "Required"));
            None
        }
    }
}

fn require_confidence(obj: &Map<String, Value>, issues: &mut Vec<Issue>) -> Option<f64> {
    match obj.get("confidence").and_then(Value::as_f64) {
        Some(n) if (0.0..=1.0).contains(&n) => Some(n),
        Some(n) => {
            issues.push(Issue::new(
                "confidence",
                format!("Number must be between 0 and 1, got {}", n),
            ));
            None
        }
        None => {
            issues.push(Issue::new(
                "confidence",
                if obj.contains_key("confidence") {
                    "Expected number"
                } else {
                    "Required"
                },
            ));
            None
        }
    }
}

fn require_urgency(obj: &Map<String, Value>, issues: &mut Vec<Issue>) -> Option<Urgency> {
    match obj.get("urgency") {
        Some(Value::String(s)) => {
            let parsed = Urgency::parse(s);
            if parsed.is_none() {
                issues.push(Issue::new(
                    "urgency",
                    format!("Expected one of: low, medium, high; got \"{}\"", s),
                ));
            }
            parsed
        }
        Some(_) => {
            issues.push(Issue::new("urgency", "Expected string"));
            None
        }
        None => {
            issues.push(Issue::new("urgency", "Required"));
            None
        }
    }
}

fn require_fertilizer(obj: &Map<String, Value>, issues: &mut Vec<Issue>) -> Option<FertilizerPlan> {
    let Some(value) = obj.get("recommended_fertilizer") else {
        issues.push(Issue::new("recommended_fertilizer", "Required"));
        return None;
    };
    let Some(plan) = value.as_object() else {
        issues.push(Issue::new("recommended_fertilizer", "Expected object"));
        return None;
    };

    let plan_type = match plan.get("type") {
        Some(Value::String(s)) => {
            let parsed = FertilizerType::parse(s);
            if parsed.is_none() {
                issues.push(Issue::new(
                    "recommended_fertilizer.type",
                    format!("Expected one of: NPK, organic, micronutrient, mixed; got \"{}\"", s),
                ));
            }
            parsed
        }
        Some(_) => {
            issues.push(Issue::new("recommended_fertilizer.type", "Expected string"));
            None
        }
        None => {
            issues.push(Issue::new("recommended_fertilizer.type", "Required"));
            None
        }
    };

    let product_example = fertilizer_string(plan, "product_example", issues);
    let dosage_per_area = fertilizer_string(plan, "dosage_per_area", issues);
    let application_method = fertilizer_string(plan, "application_method", issues);
    let frequency = fertilizer_string(plan, "frequency", issues);

    Some(FertilizerPlan {
        plan_type: plan_type?,
        product_example: product_example?,
        dosage_per_area: dosage_per_area?,
        application_method: application_method?,
        frequency: frequency?,
    })
}

fn fertilizer_string(
    plan: &Map<String, Value>,
    key: &str,
    issues: &mut Vec<Issue>,
) -> Option<String> {
    match plan.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            issues.push(Issue::new(
                format!("recommended_fertilizer.{}", key),
                "Expected string",
            ));
            None
        }
        None => {
            issues.push(Issue::new(format!("recommended_fertilizer.{}", key), "Required"));
            None
        }
    }
}

/// Missing field defaults to an empty list; a present field must be an array
/// of strings.
fn string_array_or_default(
    obj: &Map<String, Value>,
    key: &str,
    issues: &mut Vec<Issue>,
) -> Vec<String> {
    match obj.get(key) {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => parse_string_array(value, key, issues).unwrap_or_default(),
    }
}

fn optional_string_array(
    obj: &Map<String, Value>,
    key: &str,
    issues: &mut Vec<Issue>,
) -> Option<Vec<String>> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(value) => parse_string_array(value, key, issues),
    }
}

fn parse_string_array(value: &Value, key: &str, issues: &mut Vec<Issue>) -> Option<Vec<String>> {
    let Some(items) = value.as_array() else {
        issues.push(Issue::new(key, "Expected array of strings"));
        return None;
    };

    let mut out = Vec::with_capacity(items.len());
    let mut ok = true;
    for (idx, item) in items.iter().enumerate() {
        match item {
            Value::String(s) => out.push(s.clone()),
            _ => {
                issues.push(Issue::new(format!("{}[{}]", key, idx), "Expected string"));
                ok = false;
            }
        }
    }
    ok.then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_diagnosis_json() -> Value {
        json!({
            "crop_name": "Tomato",
            "disease_name": "Early Blight",
            "confidence": 0.87,
            "explanation": "Dark brown spots with concentric rings on lower leaves.",
            "recommended_fertilizer": {
                "type": "NPK",
                "product_example": "10-10-10 balanced fertilizer",
                "dosage_per_area": "2-3 kg per 100 sq m",
                "application_method": "Broadcast around the base, water in",
                "frequency": "Every 3 weeks"
            },
            "additional_care": ["Remove infected leaves", "Improve air circulation"],
            "urgency": "medium",
            "alternatives_organic": ["Compost tea"],
            "warnings": ["Avoid overhead watering"],
            "references": ["ICAR advisory 2023"]
        })
    }

    #[test]
    fn test_valid_diagnosis_passes() {
        let diagnosis = validate(&valid_diagnosis_json()).unwrap();
        assert_eq!(diagnosis.crop_name, "Tomato");
        assert_eq!(diagnosis.urgency, Urgency::Medium);
        assert_eq!(diagnosis.recommended_fertilizer.plan_type, FertilizerType::Npk);
        assert_eq!(diagnosis.references.as_deref().unwrap().len(), 1);
    }

    #[test]
    fn test_reports_all_issues_not_just_first() {
        let mut raw = valid_diagnosis_json();
        raw["disease_name"] = json!(null);
        raw["confidence"] = json!(1.5);

        let issues = validate(&raw).unwrap_err();
        assert!(issues.iter().any(|i| i.path == "disease_name"));
        assert!(issues.iter().any(|i| i.path == "confidence"));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_out_of_range_confidence_names_field() {
        let mut raw = valid_diagnosis_json();
        raw["confidence"] = json!(1.5);

        let issues = validate(&raw).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "confidence");
        assert!(issues[0].reason.contains("between 0 and 1"));
    }

    #[test]
    fn test_short_strings_rejected() {
        let mut raw = valid_diagnosis_json();
        raw["crop_name"] = json!("T");
        raw["explanation"] = json!("too short");

        let issues = validate(&raw).unwrap_err();
        assert!(issues.iter().any(|i| i.path == "crop_name"));
        assert!(issues.iter().any(|i| i.path == "explanation"));
    }

    #[test]
    fn test_bad_fertilizer_type_path() {
        let mut raw = valid_diagnosis_json();
        raw["recommended_fertilizer"]["type"] = json!("chemical");

        let issues = validate(&raw).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "recommended_fertilizer.type");
    }

    #[test]
    fn test_missing_fertilizer_fields() {
        let mut raw = valid_diagnosis_json();
        raw["recommended_fertilizer"] = json!({ "type": "organic" });

        let issues = validate(&raw).unwrap_err();
        assert!(issues.iter().any(|i| i.path == "recommended_fertilizer.product_example"));
        assert!(issues.iter().any(|i| i.path == "recommended_fertilizer.frequency"));
    }

    #[test]
    fn test_optional_arrays_default_empty() {
        let mut raw = valid_diagnosis_json();
        raw.as_object_mut().unwrap().remove("additional_care");
        raw.as_object_mut().unwrap().remove("warnings");
        raw.as_object_mut().unwrap().remove("references");

        let diagnosis = validate(&raw).unwrap();
        assert!(diagnosis.additional_care.is_empty());
        assert!(diagnosis.warnings.is_empty());
        assert!(diagnosis.references.is_none());
    }

    #[test]
    fn test_non_string_array_element_named_by_index() {
        let mut raw = valid_diagnosis_json();
        raw["warnings"] = json!(["ok", 7]);

        let issues = validate(&raw).unwrap_err();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "warnings[1]");
    }

    #[test]
    fn test_bad_urgency_rejected() {
        let mut raw = valid_diagnosis_json();
        raw["urgency"] = json!("urgent");

        let issues = validate(&raw).unwrap_err();
        assert_eq!(issues[0].path, "urgency");
    }

    #[test]
    fn test_non_object_rejected() {
        let issues = validate(&json!("just a string")).unwrap_err();
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_serialized_shape_uses_wire_names() {
        let diagnosis = validate(&valid_diagnosis_json()).unwrap();
        let wire = serde_json::to_value(&diagnosis).unwrap();
        assert_eq!(wire["recommended_fertilizer"]["type"], "NPK");
        assert_eq!(wire["urgency"], "medium");
    }
}
