use serde::{Deserialize, Serialize};

use super::lenient;
use super::profile::{Requirements, Services, UserCount};

/// Outcome metrics for a customer that has already been onboarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BusinessMetrics {
    /// Annual recurring revenue, in account currency.
    #[serde(deserialize_with = "lenient::amount")]
    pub arr: f64,
    #[serde(deserialize_with = "lenient::string")]
    pub health: String,
    #[serde(deserialize_with = "lenient::count")]
    pub days_to_onboard: u32,
}

/// Canonical shape every historical source is normalized into.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoricalCustomerRecord {
    pub customer_name: String,
    pub industry: String,
    pub user_count: UserCount,
    pub services: Services,
    pub requirements: Requirements,
    pub fit_score: u32,
    pub strengths: Vec<String>,
    pub challenges: Vec<String>,
    pub business_metrics: BusinessMetrics,
    /// Label of the provider the record came from.
    pub source: String,
}

impl HistoricalCustomerRecord {
    /// Case-insensitive name key used for de-duplication and self-exclusion.
    pub fn name_key(&self) -> String {
        self.customer_name.trim().to_lowercase()
    }

    /// Fills empty or zero fields from `other`. Populated fields are kept.
    pub fn merge_missing(&mut self, other: &HistoricalCustomerRecord) {
        fill_str(&mut self.industry, &other.industry);
        // counts from different records don't mix
        if self.user_count == UserCount::default() {
            self.user_count = other.user_count.clone();
        }
        fill_vec(&mut self.services.types, &other.services.types);
        fill_str(&mut self.services.details, &other.services.details);
        fill_vec(
            &mut self.requirements.key_features,
            &other.requirements.key_features,
        );
        fill_vec(
            &mut self.requirements.integrations,
            &other.requirements.integrations,
        );
        fill_num(&mut self.fit_score, other.fit_score);
        fill_vec(&mut self.strengths, &other.strengths);
        fill_vec(&mut self.challenges, &other.challenges);
        if self.business_metrics.arr == 0.0 {
            self.business_metrics.arr = other.business_metrics.arr;
        }
        fill_str(
            &mut self.business_metrics.health,
            &other.business_metrics.health,
        );
        fill_num(
            &mut self.business_metrics.days_to_onboard,
            other.business_metrics.days_to_onboard,
        );
    }
}

fn fill_str(target: &mut String, other: &str) {
    if target.trim().is_empty() {
        *target = other.to_string();
    }
}

fn fill_num(target: &mut u32, other: u32) {
    if *target == 0 {
        *target = other;
    }
}

fn fill_vec(target: &mut Vec<String>, other: &[String]) {
    if target.is_empty() {
        *target = other.to_vec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_missing_keeps_populated_fields() {
        let mut first = HistoricalCustomerRecord {
            customer_name: "Polar Air".to_string(),
            industry: "HVAC".to_string(),
            fit_score: 0,
            ..HistoricalCustomerRecord::default()
        };
        let second = HistoricalCustomerRecord {
            customer_name: "polar air".to_string(),
            industry: "Plumbing".to_string(),
            fit_score: 81,
            business_metrics: BusinessMetrics {
                arr: 42_000.0,
                health: "Green".to_string(),
                days_to_onboard: 30,
            },
            ..HistoricalCustomerRecord::default()
        };

        first.merge_missing(&second);

        assert_eq!(first.industry, "HVAC");
        assert_eq!(first.fit_score, 81);
        assert_eq!(first.business_metrics.health, "Green");
        assert_eq!(first.business_metrics.days_to_onboard, 30);
    }

    #[test]
    fn test_merge_missing_takes_user_count_as_a_unit() {
        let mut first = HistoricalCustomerRecord {
            customer_name: "Polar Air".to_string(),
            user_count: UserCount {
                total: 20,
                back_office: 0,
                field: 0,
            },
            ..HistoricalCustomerRecord::default()
        };
        let second = HistoricalCustomerRecord {
            customer_name: "Polar Air".to_string(),
            user_count: UserCount {
                total: 200,
                back_office: 50,
                field: 150,
            },
            ..HistoricalCustomerRecord::default()
        };

        first.merge_missing(&second);
        assert_eq!(first.user_count.total, 20);
        assert_eq!(first.user_count.field, 0);
        assert_eq!(first.user_count.back_office, 0);

        let mut empty = HistoricalCustomerRecord::default();
        empty.merge_missing(&second);
        assert_eq!(empty.user_count, second.user_count);
    }

    #[test]
    fn test_name_key_is_case_insensitive() {
        let record = HistoricalCustomerRecord {
            customer_name: "  Polar Air ".to_string(),
            ..HistoricalCustomerRecord::default()
        };
        assert_eq!(record.name_key(), "polar air");
    }
}
