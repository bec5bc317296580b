use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Deterministic severity-to-actions lookup. Pure: no model call, no clock
/// other than the response timestamp. Unrecognized severities fall back to
/// the moderate bucket.
pub fn severity_actions(severity: &str) -> &'static [&'static str] {
    match severity.to_lowercase().as_str() {
        "low" => &[
            "Increase monitoring frequency",
            "Optimize irrigation to avoid leaf wetness",
        ],
        "high" => &[
            "Apply systemic fungicide immediately",
            "Isolate affected area and sanitize tools",
        ],
        "critical" => &[
            "Begin emergency containment protocol",
            "Consult agronomist for field visit",
        ],
        _ => &[
            "Apply targeted fungicide per label",
            "Remove heavily infected leaves",
        ],
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentDetailsRequest {
    pub recommendation_id: Option<i64>,
    #[serde(default = "default_disease")]
    pub disease_type: String,
    #[serde(default = "default_crop")]
    pub crop_type: String,
    #[serde(default = "default_severity")]
    pub severity: String,
}

fn default_disease() -> String {
    "Rust Disease".to_string()
}

fn default_crop() -> String {
    "Wheat".to_string()
}

fn default_severity() -> String {
    "moderate".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatmentPlan {
    pub id: Option<i64>,
    pub title: String,
    pub severity: String,
    pub affected_area: String,
    pub recommendations: Vec<String>,
    pub detailed_analysis: DetailedAnalysis,
    pub estimated_cost: String,
    pub timeline: String,
    pub success_rate: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalysis {
    pub disease_type: String,
    pub infection_level: String,
    pub spread_rate: String,
    pub weather_impact: String,
}

#[derive(Debug, Serialize)]
pub struct TreatmentDetailsResponse {
    pub success: bool,
    pub data: TreatmentPlan,
}

pub fn build_treatment_plan(req: &TreatmentDetailsRequest) -> TreatmentPlan {
    let recommendations = severity_actions(&req.severity)
        .iter()
        .map(|s| s.to_string())
        .collect();

    TreatmentPlan {
        id: req.recommendation_id,
        title: format!("{} Treatment Plan - {}", req.disease_type, req.crop_type),
        severity: req.severity.clone(),
        affected_area: "2.5 hectares".to_string(),
        recommendations,
        detailed_analysis: DetailedAnalysis {
            disease_type: req.disease_type.clone(),
            infection_level: "35%".to_string(),
            spread_rate: req.severity.clone(),
            weather_impact: "High humidity may accelerate spread".to_string(),
        },
        estimated_cost: "$450 per hectare".to_string(),
        timeline: "3-4 weeks for full recovery".to_string(),
        success_rate: "85%".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// POST /api/treatments/details
pub async fn treatment_details(
    Json(req): Json<TreatmentDetailsRequest>,
) -> Result<Json<TreatmentDetailsResponse>, ApiError> {
    let plan = build_treatment_plan(&req);
    tracing::info!(
        "Treatment details generated for {} / {} ({})",
        req.disease_type,
        req.crop_type,
        req.severity
    );

    Ok(Json(TreatmentDetailsResponse {
        success: true,
        data: plan,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_pure() {
        let first = severity_actions("high");
        let second = severity_actions("high");
        assert_eq!(first, second);
    }

    #[test]
    fn test_known_severities() {
        assert_eq!(severity_actions("low")[0], "Increase monitoring frequency");
        assert_eq!(severity_actions("critical")[0], "Begin emergency containment protocol");
        assert_eq!(severity_actions("moderate")[0], "Apply targeted fungicide per label");
    }

    #[test]
    fn test_unknown_severity_falls_back_to_moderate() {
        assert_eq!(severity_actions("apocalyptic"), severity_actions("moderate"));
        assert_eq!(severity_actions(""), severity_actions("moderate"));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(severity_actions("HIGH"), severity_actions("high"));
    }

    #[test]
    fn test_plan_uses_lookup_table() {
        let req = TreatmentDetailsRequest {
            recommendation_id: Some(7),
            disease_type: "Early Blight".to_string(),
            crop_type: "Tomato".to_string(),
            severity: "high".to_string(),
        };
        let plan = build_treatment_plan(&req);

        assert_eq!(plan.title, "Early Blight Treatment Plan - Tomato");
        assert_eq!(plan.id, Some(7));
        assert_eq!(
            plan.recommendations,
            vec![
                "Apply systemic fungicide immediately",
                "Isolate affected area and sanitize tools"
            ]
        );
    }
}
