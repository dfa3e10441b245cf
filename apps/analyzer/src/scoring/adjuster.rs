//! Criteria-Based Score Adjuster: recomputes a deterministic, explainable
//! fit score from the model's raw score and the configured criteria.
//!
//! Rules run in a fixed order and each nonzero component contributes exactly
//! one rationale line:
//! 1. industry (blacklist cap / whitelist +10 / otherwise −5)
//! 2–4. requirements alignment (unsupported −20, weakness −10, strengths +3 each up to +10)
//! 5. field-worker ratio (+10 / +5 / −15)
//! 6. company size (+3 / −8)
//! 7. integration count (−8 / −15)

use crate::models::{Criteria, CustomerProfile, IndustryCategory, ScoreBreakdown};
use crate::scoring::matching::{find_blacklisted, find_whitelisted, matched_entries};

pub const BLACKLIST_SCORE_CAP: i32 = 25;
pub const PREFERRED_INDUSTRY_BONUS: i32 = 10;
pub const NEUTRAL_INDUSTRY_PENALTY: i32 = -5;

pub const UNSUPPORTED_PENALTY: i32 = -20;
pub const WEAKNESS_PENALTY: i32 = -10;
pub const STRENGTH_POINTS: i32 = 3;
pub const STRENGTH_BONUS_CAP: i32 = 10;

pub const HIGH_FIELD_RATIO: f64 = 0.70;
pub const HIGH_FIELD_BONUS: i32 = 10;
pub const MID_FIELD_RATIO: f64 = 0.50;
pub const MID_FIELD_BONUS: i32 = 5;
pub const LOW_FIELD_RATIO: f64 = 0.30;
pub const LOW_FIELD_PENALTY: i32 = -15;

pub const IDEAL_SIZE_MIN: u32 = 50;
pub const IDEAL_SIZE_MAX: u32 = 200;
pub const IDEAL_SIZE_BONUS: i32 = 3;
pub const LARGE_SIZE_THRESHOLD: u32 = 500;
pub const LARGE_SIZE_PENALTY: i32 = -8;

pub const HEAVY_INTEGRATION_COUNT: usize = 5;
pub const HEAVY_INTEGRATION_PENALTY: i32 = -15;
pub const MODERATE_INTEGRATION_COUNT: usize = 3;
pub const MODERATE_INTEGRATION_PENALTY: i32 = -8;

/// Scores a freshly extracted profile: its `fit_score` is taken as the raw
/// base score, then replaced by the adjusted final score.
pub fn adjust_score(mut profile: CustomerProfile, criteria: &Criteria) -> CustomerProfile {
    let base = profile.fit_score as i32;
    let breakdown = compute_breakdown(&profile, criteria, base);
    profile.fit_score = breakdown.final_score;
    profile.score_breakdown = Some(breakdown);
    profile
}

/// Re-scores a profile that was already adjusted (e.g. after a criteria
/// change). The original base score is reused so adjustments never compound.
pub fn rescore(profile: CustomerProfile, criteria: &Criteria) -> CustomerProfile {
    let base = profile
        .score_breakdown
        .as_ref()
        .map(|b| b.base_score)
        .unwrap_or(profile.fit_score as i32);
    let mut profile = profile;
    profile.fit_score = base.clamp(0, 100) as u32;
    adjust_score(profile, criteria)
}

/// Pure breakdown computation. Identical inputs give identical output,
/// rationale strings included.
pub fn compute_breakdown(
    profile: &CustomerProfile,
    criteria: &Criteria,
    base_score: i32,
) -> ScoreBreakdown {
    let industry = industry_rule(&profile.industry, criteria);
    let requirements = requirements_rule(&profile.requirements.key_features, criteria);
    let field = field_worker_rule(profile);
    let size = size_rule(profile.user_count.total);
    let complexity = integration_rule(profile.requirements.integrations.len());

    let others = requirements.points + field.points + size.points + complexity.points;

    let (industry_points, industry_reason) = match &industry {
        IndustryVerdict::Blacklisted { entry } => {
            // The cap is expressed as a negative adjustment so the components
            // still sum to the final score.
            let cap = (BLACKLIST_SCORE_CAP - (base_score + others)).min(0);
            let reason = format!(
                "Industry '{}' matches blacklisted industry '{}': score capped at {} ({:+})",
                profile.industry.trim(),
                entry,
                BLACKLIST_SCORE_CAP,
                cap
            );
            (cap, reason)
        }
        IndustryVerdict::Preferred { entry } => (
            PREFERRED_INDUSTRY_BONUS,
            format!(
                "Industry '{}' matches preferred industry '{}' ({:+})",
                profile.industry.trim(),
                entry,
                PREFERRED_INDUSTRY_BONUS
            ),
        ),
        IndustryVerdict::Neutral => {
            let reason = if profile.industry.trim().is_empty() {
                format!("Industry not identified ({NEUTRAL_INDUSTRY_PENALTY:+})")
            } else {
                format!(
                    "Industry '{}' is not a preferred industry ({:+})",
                    profile.industry.trim(),
                    NEUTRAL_INDUSTRY_PENALTY
                )
            };
            (NEUTRAL_INDUSTRY_PENALTY, reason)
        }
    };

    let mut rationale = Vec::new();
    for (points, reason) in [
        (industry_points, Some(industry_reason)),
        (requirements.points, requirements.reason),
        (field.points, field.reason),
        (size.points, size.reason),
        (complexity.points, complexity.reason),
    ] {
        if points != 0 {
            if let Some(reason) = reason {
                rationale.push(reason);
            }
        }
    }

    let final_score = (base_score + industry_points + others).clamp(0, 100) as u32;

    ScoreBreakdown {
        base_score,
        industry_adjustment: industry_points,
        field_worker_bonus: field.points,
        requirements_alignment: requirements.points,
        complexity_penalty: complexity.points,
        size_adjustment: size.points,
        final_score,
        category: industry.category(),
        rationale,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rules
// ────────────────────────────────────────────────────────────────────────────

enum IndustryVerdict<'a> {
    Blacklisted { entry: &'a str },
    Preferred { entry: &'a str },
    Neutral,
}

impl IndustryVerdict<'_> {
    fn category(&self) -> IndustryCategory {
        match self {
            IndustryVerdict::Blacklisted { .. } => IndustryCategory::Blacklisted,
            IndustryVerdict::Preferred { .. } => IndustryCategory::Preferred,
            IndustryVerdict::Neutral => IndustryCategory::Neutral,
        }
    }
}

fn industry_rule<'a>(industry: &str, criteria: &'a Criteria) -> IndustryVerdict<'a> {
    if let Some(entry) = find_blacklisted(industry, &criteria.industries.blacklist) {
        return IndustryVerdict::Blacklisted { entry };
    }
    match find_whitelisted(industry, &criteria.industries.whitelist) {
        Some((entry, _)) => IndustryVerdict::Preferred { entry },
        None => IndustryVerdict::Neutral,
    }
}

/// Points for one component plus its rationale line.
struct RuleResult {
    points: i32,
    reason: Option<String>,
}

impl RuleResult {
    fn zero() -> Self {
        Self {
            points: 0,
            reason: None,
        }
    }

    fn new(points: i32, reason: String) -> Self {
        Self {
            points,
            reason: Some(reason),
        }
    }
}

fn requirements_rule(features: &[String], criteria: &Criteria) -> RuleResult {
    let reqs = &criteria.requirements;
    let mut points = 0;
    let mut parts = Vec::new();

    // Unsupported and weakness penalties are evaluated independently; one
    // feature can trigger both.
    if let Some(entry) = matched_entries(features, &reqs.unsupported).first() {
        points += UNSUPPORTED_PENALTY;
        parts.push(format!(
            "unsupported requirement '{entry}' ({UNSUPPORTED_PENALTY:+})"
        ));
    }

    if let Some(entry) = matched_entries(features, &reqs.weaknesses).first() {
        points += WEAKNESS_PENALTY;
        parts.push(format!("weakness '{entry}' ({WEAKNESS_PENALTY:+})"));
    }

    let strengths = matched_entries(features, &reqs.strengths);
    if !strengths.is_empty() {
        let bonus = (strengths.len() as i32 * STRENGTH_POINTS).min(STRENGTH_BONUS_CAP);
        points += bonus;
        let noun = if strengths.len() == 1 { "match" } else { "matches" };
        parts.push(format!(
            "{} strength {} [{}] ({:+})",
            strengths.len(),
            noun,
            strengths.join(", "),
            bonus
        ));
    }

    if points == 0 {
        return RuleResult::zero();
    }
    RuleResult::new(
        points,
        format!("Requirements alignment {points:+}: {}", parts.join("; ")),
    )
}

fn field_worker_rule(profile: &CustomerProfile) -> RuleResult {
    let counts = &profile.user_count;
    let ratio = counts.field_ratio();
    let percent = (ratio * 100.0).round() as i64;

    if ratio >= HIGH_FIELD_RATIO {
        RuleResult::new(
            HIGH_FIELD_BONUS,
            format!(
                "Field workforce is {percent}% of users ({}/{}) ({HIGH_FIELD_BONUS:+})",
                counts.field, counts.total
            ),
        )
    } else if ratio >= MID_FIELD_RATIO {
        RuleResult::new(
            MID_FIELD_BONUS,
            format!(
                "Field workforce is {percent}% of users ({}/{}) ({MID_FIELD_BONUS:+})",
                counts.field, counts.total
            ),
        )
    } else if ratio < LOW_FIELD_RATIO && counts.total > 0 {
        RuleResult::new(
            LOW_FIELD_PENALTY,
            format!(
                "Field workforce is only {percent}% of users ({}/{}) ({LOW_FIELD_PENALTY:+})",
                counts.field, counts.total
            ),
        )
    } else {
        RuleResult::zero()
    }
}

fn size_rule(total: u32) -> RuleResult {
    if (IDEAL_SIZE_MIN..=IDEAL_SIZE_MAX).contains(&total) {
        RuleResult::new(
            IDEAL_SIZE_BONUS,
            format!(
                "{total} users is within the ideal {IDEAL_SIZE_MIN}-{IDEAL_SIZE_MAX} range ({IDEAL_SIZE_BONUS:+})"
            ),
        )
    } else if total > LARGE_SIZE_THRESHOLD {
        RuleResult::new(
            LARGE_SIZE_PENALTY,
            format!(
                "{total} users exceeds {LARGE_SIZE_THRESHOLD}, above the target size ({LARGE_SIZE_PENALTY:+})"
            ),
        )
    } else {
        RuleResult::zero()
    }
}

fn integration_rule(count: usize) -> RuleResult {
    if count > HEAVY_INTEGRATION_COUNT {
        RuleResult::new(
            HEAVY_INTEGRATION_PENALTY,
            format!("{count} required integrations add significant complexity ({HEAVY_INTEGRATION_PENALTY:+})"),
        )
    } else if count > MODERATE_INTEGRATION_COUNT {
        RuleResult::new(
            MODERATE_INTEGRATION_PENALTY,
            format!("{count} required integrations add moderate complexity ({MODERATE_INTEGRATION_PENALTY:+})"),
        )
    } else {
        RuleResult::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IndustryCriteria, RequirementCriteria, Requirements, UserCount};

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn criteria() -> Criteria {
        Criteria {
            industries: IndustryCriteria {
                whitelist: list(&["HVAC", "Plumbing", "Electrical"]),
                blacklist: list(&["Pure SaaS", "Retail"]),
            },
            requirements: RequirementCriteria {
                strengths: list(&["Dispatch", "Scheduling", "Invoicing", "Mobile app"]),
                weaknesses: list(&["Inventory"]),
                unsupported: list(&["Payroll", "Inventory management"]),
            },
        }
    }

    fn profile(industry: &str, total: u32, field: u32, base: u32) -> CustomerProfile {
        CustomerProfile {
            customer_name: "Test Co".to_string(),
            industry: industry.to_string(),
            user_count: UserCount {
                total,
                back_office: total.saturating_sub(field),
                field,
            },
            fit_score: base,
            ..CustomerProfile::default()
        }
    }

    fn with_features(mut p: CustomerProfile, features: &[&str]) -> CustomerProfile {
        p.requirements.key_features = list(features);
        p
    }

    #[test]
    fn test_preferred_hvac_with_strength_match() {
        let p = with_features(profile("HVAC", 100, 80, 55), &["Dispatch board"]);
        let scored = adjust_score(p, &criteria());
        let b = scored.score_breakdown.unwrap();

        assert_eq!(b.industry_adjustment, 10);
        assert_eq!(b.field_worker_bonus, 10);
        assert_eq!(b.requirements_alignment, 3);
        // 100 users falls in the 50-200 ideal band
        assert_eq!(b.size_adjustment, 3);
        assert_eq!(b.final_score, 81);
        assert_eq!(b.category, IndustryCategory::Preferred);
        assert_eq!(scored.fit_score, 81);
    }

    #[test]
    fn test_preferred_hvac_outside_size_band_scores_78() {
        let p = with_features(profile("HVAC", 300, 240, 55), &["Dispatch board"]);
        let b = adjust_score(p, &criteria()).score_breakdown.unwrap();
        assert_eq!(b.size_adjustment, 0);
        assert_eq!(b.final_score, 78);
        assert_eq!(b.rationale.len(), 3);
    }

    #[test]
    fn test_blacklisted_industry_capped_at_25() {
        let p = profile("Pure SaaS", 100, 80, 90);
        let b = adjust_score(p, &criteria()).score_breakdown.unwrap();
        assert!(b.final_score <= 25);
        assert_eq!(b.final_score, 25);
        assert_eq!(b.category, IndustryCategory::Blacklisted);
        assert!(b.rationale[0].contains("blacklisted"));
    }

    #[test]
    fn test_blacklist_below_cap_adds_no_adjustment() {
        let p = profile("Retail", 10, 1, 20);
        let b = adjust_score(p, &criteria()).score_breakdown.unwrap();
        assert_eq!(b.industry_adjustment, 0);
        assert_eq!(b.category, IndustryCategory::Blacklisted);
        // 20 - 15 (low field ratio) = 5
        assert_eq!(b.final_score, 5);
        assert_eq!(b.rationale.len(), 1);
    }

    #[test]
    fn test_blacklist_checked_before_whitelist() {
        let mut c = criteria();
        c.industries.whitelist.push("SaaS".to_string());
        let b = adjust_score(profile("Pure SaaS", 100, 80, 90), &c)
            .score_breakdown
            .unwrap();
        assert_eq!(b.category, IndustryCategory::Blacklisted);
    }

    #[test]
    fn test_empty_whitelist_is_neutral() {
        let b = adjust_score(profile("HVAC", 100, 60, 50), &Criteria::default())
            .score_breakdown
            .unwrap();
        assert_eq!(b.category, IndustryCategory::Neutral);
        assert_eq!(b.industry_adjustment, -5);
    }

    #[test]
    fn test_unsupported_and_weakness_both_apply() {
        // "Inventory management" hits the unsupported entry and the "Inventory" weakness
        let p = with_features(profile("HVAC", 100, 60, 60), &["Inventory management"]);
        let b = adjust_score(p, &criteria()).score_breakdown.unwrap();
        assert_eq!(b.requirements_alignment, -30);
        let req_reason = b
            .rationale
            .iter()
            .find(|r| r.starts_with("Requirements alignment"))
            .unwrap();
        assert!(req_reason.contains("unsupported requirement 'Inventory management'"));
        assert!(req_reason.contains("weakness 'Inventory'"));
    }

    #[test]
    fn test_unsupported_penalty_applies_once() {
        let p = with_features(profile("HVAC", 100, 60, 60), &["Payroll", "payroll export"]);
        let b = adjust_score(p, &criteria()).score_breakdown.unwrap();
        assert_eq!(b.requirements_alignment, -20);
    }

    #[test]
    fn test_strength_bonus_capped_at_10() {
        let p = with_features(
            profile("HVAC", 100, 60, 50),
            &["Dispatch", "Scheduling", "Invoicing", "Mobile app"],
        );
        let b = adjust_score(p, &criteria()).score_breakdown.unwrap();
        assert_eq!(b.requirements_alignment, 10);
    }

    #[test]
    fn test_field_ratio_thresholds() {
        let c = Criteria::default();
        let bonus = |total, field| {
            compute_breakdown(&profile("HVAC", total, field, 50), &c, 50).field_worker_bonus
        };
        assert_eq!(bonus(100, 70), 10);
        assert_eq!(bonus(100, 50), 5);
        assert_eq!(bonus(100, 40), 0);
        assert_eq!(bonus(100, 29), -15);
        assert_eq!(bonus(0, 0), 0);
    }

    #[test]
    fn test_size_and_integration_rules() {
        let c = Criteria::default();
        let mut p = profile("HVAC", 800, 600, 50);
        p.requirements = Requirements {
            key_features: vec![],
            integrations: list(&["QuickBooks", "Salesforce", "HubSpot", "Stripe", "ADP", "Gusto"]),
        };
        let b = compute_breakdown(&p, &c, 50);
        assert_eq!(b.size_adjustment, -8);
        assert_eq!(b.complexity_penalty, -15);

        p.requirements.integrations.truncate(4);
        let b = compute_breakdown(&p, &c, 50);
        assert_eq!(b.complexity_penalty, -8);

        p.requirements.integrations.truncate(3);
        let b = compute_breakdown(&p, &c, 50);
        assert_eq!(b.complexity_penalty, 0);
    }

    #[test]
    fn test_rationale_order_follows_rules() {
        let mut p = with_features(profile("Plumbing", 150, 120, 60), &["Scheduling"]);
        p.requirements.integrations = list(&["A", "B", "C", "D"]);
        let b = adjust_score(p, &criteria()).score_breakdown.unwrap();
        assert_eq!(b.rationale.len(), 5);
        assert!(b.rationale[0].starts_with("Industry"));
        assert!(b.rationale[1].starts_with("Requirements alignment"));
        assert!(b.rationale[2].starts_with("Field workforce"));
        assert!(b.rationale[3].contains("ideal"));
        assert!(b.rationale[4].contains("integrations"));
    }

    #[test]
    fn test_deterministic_output() {
        let p = with_features(profile("Electrical", 220, 90, 64), &["Invoicing", "Payroll"]);
        let first = adjust_score(p.clone(), &criteria());
        let second = adjust_score(p, &criteria());
        assert_eq!(first, second);
    }

    #[test]
    fn test_invariants_hold_across_inputs() {
        let c = criteria();
        let industries = ["HVAC", "Pure SaaS", "Retail", "Landscaping", "", "plumbers"];
        let sizes = [(0, 0), (10, 1), (60, 50), (100, 80), (450, 100), (900, 800)];
        let feature_sets: [&[&str]; 3] = [&[], &["Dispatch", "Payroll"], &["Inventory management"]];
        let integration_counts = [0, 4, 7];

        for industry in industries {
            for (total, field) in sizes {
                for features in feature_sets {
                    for n in integration_counts {
                        for base in [0, 35, 90, 100] {
                            let mut p = with_features(profile(industry, total, field, base), features);
                            p.requirements.integrations = (0..n).map(|i| format!("sys{i}")).collect();
                            let b = adjust_score(p, &c).score_breakdown.unwrap();

                            assert!(b.final_score <= 100);
                            assert_eq!(
                                b.final_score as i32,
                                b.component_sum().clamp(0, 100),
                                "sum invariant for {industry}/{total}/{base}"
                            );
                            assert_eq!(b.rationale.len(), b.nonzero_components());
                            if b.category == IndustryCategory::Blacklisted {
                                assert!(b.final_score <= 25);
                            }
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_rescore_reuses_base() {
        let p = with_features(profile("HVAC", 100, 80, 55), &["Dispatch"]);
        let scored = adjust_score(p, &criteria());
        let rescored = rescore(scored.clone(), &criteria());
        assert_eq!(scored.fit_score, rescored.fit_score);
        assert_eq!(rescored.score_breakdown.unwrap().base_score, 55);
    }
}
