use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::plant_id::PlantIdAnalysis;
use super::schema::{Diagnosis, Urgency};

/// Provider-agnostic analysis result, the only shape photo records and
/// clients ever see. Written once per analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
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
    pub last_analyzed: DateTime<Utc>,
    pub analysis_type: String,
}

/// One normalization strategy per provider variant. Adding a provider means
/// adding one impl, nothing else changes shape.
pub trait ToReport {
    fn analysis_type(&self) -> &'static str;

    fn to_report(&self) -> AnalysisReport;
}

impl ToReport for Diagnosis {
    fn analysis_type(&self) -> &'static str {
        "gemini_diagnosis"
    }

    fn to_report(&self) -> AnalysisReport {
        let f = &self.recommended_fertilizer;
        let fertilizer_line = format!(
            "Apply {} ({}) via {}, {}",
            f.product_example, f.dosage_per_area, f.application_method, f.frequency
        );

        let mut treatments = vec![fertilizer_line];
        treatments.extend(
            self.alternatives_organic
                .iter()
                .map(|a| format!("Organic alternative: {}", a)),
        );

        let mut recommendations = self.additional_care.clone();
        recommendations.extend(self.warnings.iter().map(|w| format!("Warning: {}", w)));

        AnalysisReport {
            crop_name: self.crop_name.clone(),
            disease_name: self.disease_name.clone(),
            confidence: self.confidence,
            // The diagnosis shape carries no severity of its own; urgency is
            // the closest stable signal.
            severity: severity_from_urgency(self.urgency).to_string(),
            symptoms: vec![self.explanation.clone()],
            causes: Vec::new(),
            treatments,
            prevention: self.additional_care.clone(),
            recommendations,
            urgency: self.urgency.as_str().to_string(),
            estimated_yield_loss: "Not estimated".to_string(),
            cost_of_treatment: "Not estimated".to_string(),
            last_analyzed: Utc::now(),
            analysis_type: self.analysis_type().to_string(),
        }
    }
}

fn severity_from_urgency(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Low => "low",
        Urgency::Medium => "moderate",
        Urgency::High => "high",
    }
}

impl ToReport for PlantIdAnalysis {
    fn analysis_type(&self) -> &'static str {
        "plant_id_v3"
    }

    fn to_report(&self) -> AnalysisReport {
        AnalysisReport {
            crop_name: self.crop_name.clone(),
            disease_name: self.disease_name.clone(),
            confidence: self.confidence,
            severity: self.severity.clone(),
            symptoms: self.symptoms.clone(),
            causes: self.causes.clone(),
            treatments: self.treatments.clone(),
            prevention: self.prevention.clone(),
            recommendations: self.recommendations.clone(),
            urgency: self.urgency.clone(),
            estimated_yield_loss: self.estimated_yield_loss.clone(),
            cost_of_treatment: self.cost_of_treatment.clone(),
            last_analyzed: Utc::now(),
            analysis_type: self.analysis_type().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_diagnosis() -> Diagnosis {
        super::super::schema::validate(&json!({
            "crop_name": "Tomato",
            "disease_name": "Early Blight",
            "confidence": 0.87,
            "explanation": "Dark brown spots with concentric rings on lower leaves.",
            "recommended_fertilizer": {
                "type": "NPK",
                "product_example": "10-10-10 balanced fertilizer",
                "dosage_per_area": "2-3 kg per 100 sq m",
                "application_method": "Broadcast and water in",
                "frequency": "Every 3 weeks"
            },
            "additional_care": ["Remove infected leaves"],
            "urgency": "medium",
            "alternatives_organic": ["Compost tea"],
            "warnings": ["Avoid overhead watering"]
        }))
        .unwrap()
    }

    #[test]
    fn test_diagnosis_report_is_tagged_and_stamped() {
        let started = Utc::now();
        let report = sample_diagnosis().to_report();

        assert_eq!(report.analysis_type, "gemini_diagnosis");
        assert!(!report.analysis_type.is_empty());
        assert!(report.last_analyzed >= started);
    }

    #[test]
    fn test_diagnosis_field_mapping() {
        let report = sample_diagnosis().to_report();

        assert_eq!(report.crop_name, "Tomato");
        assert_eq!(report.severity, "moderate");
        assert_eq!(report.urgency, "medium");
        assert!(report.treatments[0].contains("10-10-10"));
        assert!(report.treatments[1].starts_with("Organic alternative:"));
        assert_eq!(report.symptoms.len(), 1);
        assert!(report.recommendations.iter().any(|r| r.starts_with("Warning:")));
    }

    #[test]
    fn test_severity_from_urgency() {
        assert_eq!(severity_from_urgency(Urgency::Low), "low");
        assert_eq!(severity_from_urgency(Urgency::Medium), "moderate");
        assert_eq!(severity_from_urgency(Urgency::High), "high");
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = sample_diagnosis().to_report();
        let wire = serde_json::to_value(&report).unwrap();

        assert!(wire.get("cropName").is_some());
        assert!(wire.get("diseaseName").is_some());
        assert!(wire.get("lastAnalyzed").is_some());
        assert!(wire.get("analysisType").is_some());
        assert!(wire.get("estimatedYieldLoss").is_some());
        assert!(wire.get("crop_name").is_none());
    }
}
