//! Human-readable reasons and learnings attached to each similar customer.

use crate::models::{BusinessMetrics, CustomerProfile, HistoricalCustomerRecord};

use super::dimensions::{matching_services, MatchResult, INDUSTRY_EXACT_SCORE};
use super::MatchThresholds;

const FAST_ONBOARDING_DAYS: u32 = 30;
const SLOW_ONBOARDING_DAYS: u32 = 90;

/// One reason per dimension whose score crossed its bucket threshold.
pub fn match_reasons(
    current: &CustomerProfile,
    record: &HistoricalCustomerRecord,
    m: &MatchResult,
    thresholds: &MatchThresholds,
) -> Vec<String> {
    let mut reasons = Vec::new();

    if m.industry_score >= thresholds.industry_min {
        if m.industry_score == INDUSTRY_EXACT_SCORE {
            reasons.push(format!("Same industry: {}", record.industry));
        } else {
            reasons.push(format!(
                "Related industry: {} vs {}",
                record.industry, current.industry
            ));
        }
    }

    if m.size_score >= thresholds.size_min {
        reasons.push(format!(
            "Similar size: {} vs {} users",
            record.user_count.total, current.user_count.total
        ));
    }

    if m.field_ratio_score >= thresholds.field_ratio_min {
        reasons.push(format!(
            "Similar field workforce: {}% vs {}% field users",
            percent(record.user_count.field_ratio()),
            percent(current.user_count.field_ratio())
        ));
    }

    if m.service_score >= thresholds.service_min {
        let mut shared: Vec<&str> = Vec::new();
        for (_, historical) in matching_services(&current.services.types, &record.services.types) {
            if !shared.contains(&historical) {
                shared.push(historical);
            }
        }
        reasons.push(format!("Overlapping services: {}", shared.join(", ")));
    }

    reasons
}

/// Learnings drawn from the historical customer's outcome metrics.
pub fn key_learnings(metrics: &BusinessMetrics) -> Vec<String> {
    let mut learnings = Vec::new();

    let health = metrics.health.trim();
    if !health.is_empty() {
        let lower = health.to_lowercase();
        let line = if ["green", "healthy", "good", "excellent"]
            .iter()
            .any(|k| lower.contains(k))
        {
            format!("Healthy account ({health}); a strong reference for this prospect")
        } else if ["red", "risk", "churn", "poor"]
            .iter()
            .any(|k| lower.contains(k))
        {
            format!("Account health is {health}; review what went wrong before committing to similar scope")
        } else if ["yellow", "amber", "fair"].iter().any(|k| lower.contains(k)) {
            format!("Account health is {health}; watch for similar adoption issues")
        } else {
            format!("Account health: {health}")
        };
        learnings.push(line);
    }

    match metrics.days_to_onboard {
        0 => {}
        d if d <= FAST_ONBOARDING_DAYS => learnings.push(format!("Onboarded quickly in {d} days")),
        d if d <= SLOW_ONBOARDING_DAYS => learnings.push(format!("Onboarded in {d} days")),
        d => learnings.push(format!(
            "Long onboarding ({d} days); plan implementation resources early"
        )),
    }

    if metrics.arr > 0.0 {
        learnings.push(format!("ARR of {}", format_currency(metrics.arr)));
    }

    learnings
}

fn percent(ratio: f64) -> u32 {
    (ratio * 100.0).round() as u32
}

/// Whole-dollar amount with thousands separators, e.g. `$48,000`.
pub fn format_currency(amount: f64) -> String {
    let whole = amount.round().max(0.0) as u64;
    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    format!("${out}")
}
