//! Per-dimension similarity scores. Each dimension is capped independently.

use std::collections::BTreeSet;

use crate::models::{HistoricalCustomerRecord, UserCount};
use crate::scoring::matching::{contains_either, normalize, tokens};

pub const INDUSTRY_EXACT_SCORE: u32 = 40;
pub const INDUSTRY_TOKEN_WEIGHT: f64 = 35.0;
const INDUSTRY_SEPARATORS: &[char] = &[',', '/', '-', '&'];
/// Tokens must be longer than two characters.
const INDUSTRY_MIN_TOKEN: usize = 3;
/// Tokens shorter than this only match on equality.
const INDUSTRY_CONTAINMENT_MIN: usize = 4;

pub const SIZE_TIERS: [(f64, u32); 3] = [(0.8, 30), (0.6, 20), (0.4, 10)];

pub const FIELD_RATIO_FLOOR: f64 = 0.5;
pub const FIELD_RATIO_CLOSE: (f64, u32) = (0.15, 20);
pub const FIELD_RATIO_NEAR: (f64, u32) = (0.30, 15);
pub const FIELD_RATIO_BASE: u32 = 10;

pub const SERVICE_POINTS: u32 = 3;
pub const SERVICE_CAP: u32 = 10;

/// Scores for one historical candidate. `index` points into the corpus slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub index: usize,
    pub industry_score: u32,
    pub size_score: u32,
    pub field_ratio_score: u32,
    pub service_score: u32,
    pub total_score: u32,
}

impl MatchResult {
    pub fn new(
        index: usize,
        industry_score: u32,
        size_score: u32,
        field_ratio_score: u32,
        service_score: u32,
    ) -> Self {
        Self {
            index,
            industry_score,
            size_score,
            field_ratio_score,
            service_score,
            total_score: industry_score + size_score + field_ratio_score + service_score,
        }
    }
}

pub fn score_candidate(
    index: usize,
    industry: &str,
    counts: &UserCount,
    services: &[String],
    record: &HistoricalCustomerRecord,
) -> MatchResult {
    MatchResult::new(
        index,
        industry_score(industry, &record.industry),
        size_score(counts.total, record.user_count.total),
        field_ratio_score(counts, &record.user_count),
        service_score(services, &record.services.types),
    )
}

/// 40 for an exact (case-insensitive) match, else token overlap scaled to 35.
pub fn industry_score(current: &str, historical: &str) -> u32 {
    let (a, b) = (normalize(current), normalize(historical));
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return INDUSTRY_EXACT_SCORE;
    }

    let a_tokens: BTreeSet<String> = tokens(&a, INDUSTRY_SEPARATORS, INDUSTRY_MIN_TOKEN)
        .into_iter()
        .collect();
    let b_tokens: BTreeSet<String> = tokens(&b, INDUSTRY_SEPARATORS, INDUSTRY_MIN_TOKEN)
        .into_iter()
        .collect();

    let union = a_tokens.union(&b_tokens).count();
    if union == 0 {
        return 0;
    }

    let common = a_tokens
        .iter()
        .filter(|ta| {
            b_tokens.iter().any(|tb| {
                ta == &tb
                    || (ta.chars().count() >= INDUSTRY_CONTAINMENT_MIN
                        && tb.chars().count() >= INDUSTRY_CONTAINMENT_MIN
                        && (ta.contains(tb.as_str()) || tb.contains(ta.as_str())))
            })
        })
        .count();

    let score = (common as f64 / union as f64 * INDUSTRY_TOKEN_WEIGHT).round() as u32;
    score.min(INDUSTRY_EXACT_SCORE)
}

/// Ratio of the smaller to the larger headcount, tiered.
pub fn size_score(current_total: u32, historical_total: u32) -> u32 {
    if current_total == 0 || historical_total == 0 {
        return 0;
    }
    let ratio =
        current_total.min(historical_total) as f64 / current_total.max(historical_total) as f64;
    SIZE_TIERS
        .iter()
        .find(|(threshold, _)| ratio > *threshold)
        .map(|(_, score)| *score)
        .unwrap_or(0)
}

/// Only field-heavy pairs (both ratios above 0.5) are compared.
pub fn field_ratio_score(current: &UserCount, historical: &UserCount) -> u32 {
    let (a, b) = (current.field_ratio(), historical.field_ratio());
    if a <= FIELD_RATIO_FLOOR || b <= FIELD_RATIO_FLOOR {
        return 0;
    }
    let diff = (a - b).abs();
    if diff < FIELD_RATIO_CLOSE.0 {
        FIELD_RATIO_CLOSE.1
    } else if diff < FIELD_RATIO_NEAR.0 {
        FIELD_RATIO_NEAR.1
    } else {
        FIELD_RATIO_BASE
    }
}

/// 3 points per matching (current, historical) service pair, capped at 10.
pub fn service_score(current: &[String], historical: &[String]) -> u32 {
    let pairs = matching_services(current, historical).len() as u32;
    (pairs * SERVICE_POINTS).min(SERVICE_CAP)
}

/// Every (current, historical) pair whose names contain one another.
pub fn matching_services<'a>(
    current: &'a [String],
    historical: &'a [String],
) -> Vec<(&'a str, &'a str)> {
    current
        .iter()
        .flat_map(|c| {
            historical
                .iter()
                .filter(move |h| contains_either(c, h))
                .map(move |h| (c.as_str(), h.as_str()))
        })
        .collect()
}
