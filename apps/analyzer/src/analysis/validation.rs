use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::CustomerProfile;
use crate::similarity::MatchThresholds;

const MAX_SCORE: i32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

/// Structural problems found in a finished profile. Issues are reported,
/// never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            field: field.to_string(),
            message: message.into(),
        });
    }
}

/// Checks score bounds, breakdown consistency, identity fields, similar
/// customer bucket caps and exclusivity, and the degraded-parse marker.
pub fn validate_profile(
    profile: &CustomerProfile,
    thresholds: &MatchThresholds,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    if profile.fit_score > MAX_SCORE as u32 {
        report.push("fitScore", format!("{} is outside 0-100", profile.fit_score));
    }

    match &profile.score_breakdown {
        None => report.push("scoreBreakdown", "missing"),
        Some(breakdown) => {
            let expected = breakdown.component_sum().clamp(0, MAX_SCORE) as u32;
            if breakdown.final_score != expected {
                report.push(
                    "scoreBreakdown.finalScore",
                    format!(
                        "{} does not equal the clamped component sum {}",
                        breakdown.final_score, expected
                    ),
                );
            }
            if profile.fit_score != breakdown.final_score {
                report.push(
                    "fitScore",
                    format!(
                        "{} differs from scoreBreakdown.finalScore {}",
                        profile.fit_score, breakdown.final_score
                    ),
                );
            }
            let nonzero = breakdown.nonzero_components();
            if breakdown.rationale.len() != nonzero {
                report.push(
                    "scoreBreakdown.rationale",
                    format!(
                        "{} entries for {} nonzero components",
                        breakdown.rationale.len(),
                        nonzero
                    ),
                );
            }
        }
    }

    if profile.customer_name.trim().is_empty() {
        report.push("customerName", "empty");
    }
    if profile.industry.trim().is_empty() {
        report.push("industry", "empty");
    }

    let mut titles = HashSet::new();
    let mut names = HashSet::new();
    for section in &profile.similar_customers {
        if !titles.insert(section.section_title) {
            report.push(
                "similarCustomers",
                format!("duplicate section {:?}", section.section_title),
            );
        }
        let cap = thresholds.cap(section.section_title);
        if section.customers.len() > cap {
            report.push(
                "similarCustomers",
                format!(
                    "{:?} has {} customers (cap {})",
                    section.section_title,
                    section.customers.len(),
                    cap
                ),
            );
        }
        if section.customers.is_empty() {
            report.push(
                "similarCustomers",
                format!("{:?} is empty", section.section_title),
            );
        }
        for customer in &section.customers {
            if !names.insert(customer.name.trim().to_lowercase()) {
                report.push(
                    "similarCustomers",
                    format!("{} appears in more than one section", customer.name),
                );
            }
        }
    }

    if let Some(warning) = &profile.parse_warning {
        report.push("parseWarning", warning.clone());
    }

    report
}
