use serde::{Deserialize, Serialize};

use super::lenient;

/// Headcount split reported for a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserCount {
    #[serde(deserialize_with = "lenient::count")]
    pub total: u32,
    #[serde(deserialize_with = "lenient::count")]
    pub back_office: u32,
    #[serde(deserialize_with = "lenient::count")]
    pub field: u32,
}

impl UserCount {
    /// field / total, or 0.0 when total is zero.
    pub fn field_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.field as f64 / self.total as f64
        }
    }

    /// Fills a missing total from the field and back-office split.
    pub fn normalize(&mut self) {
        if self.total == 0 {
            self.total = self.field.saturating_add(self.back_office);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Services {
    #[serde(deserialize_with = "lenient::string_list")]
    pub types: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Requirements {
    #[serde(deserialize_with = "lenient::string_list")]
    pub key_features: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub integrations: Vec<String>,
}

/// Industry classification produced by the score adjuster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndustryCategory {
    Preferred,
    #[default]
    Neutral,
    Blacklisted,
}

impl IndustryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndustryCategory::Preferred => "preferred",
            IndustryCategory::Neutral => "neutral",
            IndustryCategory::Blacklisted => "blacklisted",
        }
    }
}

/// Itemized, explainable fit score.
///
/// Invariants: `final_score == clamp(component_sum(), 0, 100)` and every
/// nonzero component owns exactly one `rationale` entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreBreakdown {
    pub base_score: i32,
    pub industry_adjustment: i32,
    pub field_worker_bonus: i32,
    pub requirements_alignment: i32,
    pub complexity_penalty: i32,
    pub size_adjustment: i32,
    pub final_score: u32,
    pub category: IndustryCategory,
    pub rationale: Vec<String>,
}

impl ScoreBreakdown {
    pub fn components(&self) -> [i32; 5] {
        [
            self.industry_adjustment,
            self.requirements_alignment,
            self.field_worker_bonus,
            self.size_adjustment,
            self.complexity_penalty,
        ]
    }

    pub fn component_sum(&self) -> i32 {
        self.base_score + self.components().iter().sum::<i32>()
    }

    pub fn nonzero_components(&self) -> usize {
        self.components().iter().filter(|c| **c != 0).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionTitle {
    IndustryMatch,
    SizeMatch,
    ComplexityMatch,
}

/// One historical customer surfaced as comparable to the prospect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimilarCustomer {
    pub name: String,
    pub industry: String,
    pub user_count: UserCount,
    pub fit_score: u32,
    pub industry_score: u32,
    pub size_score: u32,
    pub field_ratio_score: u32,
    pub service_score: u32,
    pub match_score: u32,
    pub match_reasons: Vec<String>,
    pub key_learnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarCustomerSection {
    pub section_title: SectionTitle,
    pub description: String,
    pub customers: Vec<SimilarCustomer>,
}

/// Structured prospect profile extracted from a sales transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerProfile {
    #[serde(deserialize_with = "lenient::string")]
    pub customer_name: String,
    #[serde(deserialize_with = "lenient::string")]
    pub industry: String,
    #[serde(deserialize_with = "lenient::user_count")]
    pub user_count: UserCount,
    #[serde(deserialize_with = "lenient::services")]
    pub services: Services,
    #[serde(deserialize_with = "lenient::requirements")]
    pub requirements: Requirements,
    #[serde(deserialize_with = "lenient::string")]
    pub current_state: String,
    #[serde(deserialize_with = "lenient::string")]
    pub timeline: String,
    #[serde(deserialize_with = "lenient::string")]
    pub budget: String,
    #[serde(deserialize_with = "lenient::score")]
    pub fit_score: u32,
    #[serde(deserialize_with = "lenient::or_default")]
    pub score_breakdown: Option<ScoreBreakdown>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub strengths: Vec<String>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub challenges: Vec<String>,
    #[serde(deserialize_with = "lenient::or_default")]
    pub similar_customers: Vec<SimilarCustomerSection>,
    #[serde(deserialize_with = "lenient::string_list")]
    pub recommendations: Vec<String>,
    /// Set only when the profile came from the degraded recovery fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_warning: Option<String>,
}

impl CustomerProfile {
    /// Builds a profile from a recovered JSON object. Never fails: a value of
    /// the wrong shape yields an empty profile flagged with a parse warning.
    pub fn from_value(value: serde_json::Value) -> Self {
        match serde_json::from_value::<CustomerProfile>(value) {
            Ok(profile) => profile,
            Err(e) => CustomerProfile {
                parse_warning: Some(format!("Model output was not a profile object: {e}")),
                ..CustomerProfile::default()
            },
        }
    }

    /// Pipeline-level cleanup applied before scoring.
    pub fn normalize(&mut self) {
        self.customer_name = self.customer_name.trim().to_string();
        self.industry = self.industry.trim().to_string();
        self.user_count.normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_deserializes_camel_case() {
        let value = json!({
            "customerName": "Acme Heating",
            "industry": "HVAC",
            "userCount": {"total": 100, "backOffice": 20, "field": 80},
            "services": {"types": ["Maintenance", "Installation"], "details": "Residential"},
            "requirements": {"keyFeatures": ["Dispatch"], "integrations": ["QuickBooks"]},
            "fitScore": 72,
            "recommendations": ["Lead with dispatch demo"]
        });
        let profile = CustomerProfile::from_value(value);
        assert_eq!(profile.customer_name, "Acme Heating");
        assert_eq!(profile.user_count.field, 80);
        assert_eq!(profile.services.types.len(), 2);
        assert_eq!(profile.requirements.integrations, vec!["QuickBooks"]);
        assert_eq!(profile.fit_score, 72);
        assert!(profile.parse_warning.is_none());
    }

    #[test]
    fn test_profile_missing_fields_default_to_zero() {
        let profile = CustomerProfile::from_value(json!({"customerName": "Bare"}));
        assert_eq!(profile.fit_score, 0);
        assert_eq!(profile.user_count, UserCount::default());
        assert!(profile.strengths.is_empty());
    }

    #[test]
    fn test_profile_lenient_shapes() {
        let value = json!({
            "customerName": "Loose Co",
            "userCount": "250",
            "services": ["Plumbing", "Drain cleaning"],
            "requirements": "GPS tracking, Mobile app",
            "fitScore": "88",
            "strengths": "Clear budget",
            "scoreBreakdown": "n/a",
            "timeline": {"start": "Q3", "goLive": "Q4"}
        });
        let profile = CustomerProfile::from_value(value);
        assert_eq!(profile.user_count.total, 250);
        assert_eq!(profile.services.types, vec!["Plumbing", "Drain cleaning"]);
        assert_eq!(
            profile.requirements.key_features,
            vec!["GPS tracking", "Mobile app"]
        );
        assert_eq!(profile.fit_score, 88);
        assert_eq!(profile.strengths, vec!["Clear budget"]);
        assert!(profile.score_breakdown.is_none());
        assert!(profile.timeline.contains("Q3"));
    }

    #[test]
    fn test_fit_score_clamped_to_100() {
        let profile = CustomerProfile::from_value(json!({"fitScore": 140}));
        assert_eq!(profile.fit_score, 100);
    }

    #[test]
    fn test_non_object_value_is_flagged() {
        let profile = CustomerProfile::from_value(json!([1, 2, 3]));
        assert!(profile.parse_warning.is_some());
    }

    #[test]
    fn test_normalize_derives_total_from_split() {
        let mut profile = CustomerProfile {
            user_count: UserCount {
                total: 0,
                back_office: 15,
                field: 45,
            },
            ..CustomerProfile::default()
        };
        profile.normalize();
        assert_eq!(profile.user_count.total, 60);
    }

    #[test]
    fn test_field_ratio_zero_total() {
        let uc = UserCount {
            total: 0,
            back_office: 0,
            field: 10,
        };
        assert_eq!(uc.field_ratio(), 0.0);
    }

    #[test]
    fn test_parse_warning_skipped_when_absent() {
        let json = serde_json::to_value(CustomerProfile::default()).unwrap();
        assert!(json.get("parseWarning").is_none());
        assert!(json.get("customerName").is_some());
    }
}
