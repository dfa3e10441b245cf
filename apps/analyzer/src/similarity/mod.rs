//! Similarity matcher.
//!
//! Scores every historical customer against the prospect on four
//! independent dimensions, then sorts the survivors into exclusive
//! buckets (industry, size, complexity) with per-bucket caps.

pub mod dimensions;
pub mod insights;

use tracing::debug;

use crate::models::{
    CustomerProfile, HistoricalCustomerRecord, SectionTitle, SimilarCustomer,
    SimilarCustomerSection,
};
use dimensions::{score_candidate, MatchResult};

// ────────────────────────────────────────────────────────────────────────────
// Thresholds
// ────────────────────────────────────────────────────────────────────────────

/// Bucket thresholds and caps. `Default` carries the production values.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchThresholds {
    /// Candidates with a total at or below this are discarded.
    pub min_total: u32,
    pub industry_min: u32,
    pub size_min: u32,
    pub field_ratio_min: u32,
    pub service_min: u32,
    pub industry_cap: usize,
    pub size_cap: usize,
    pub complexity_cap: usize,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            min_total: 20,
            industry_min: 25,
            size_min: 20,
            field_ratio_min: 15,
            service_min: 8,
            industry_cap: 3,
            size_cap: 2,
            complexity_cap: 2,
        }
    }
}

impl MatchThresholds {
    pub fn cap(&self, section: SectionTitle) -> usize {
        match section {
            SectionTitle::IndustryMatch => self.industry_cap,
            SectionTitle::SizeMatch => self.size_cap,
            SectionTitle::ComplexityMatch => self.complexity_cap,
        }
    }
}

impl SectionTitle {
    pub fn description(&self) -> &'static str {
        match self {
            SectionTitle::IndustryMatch => "Customers in the same or a closely related industry",
            SectionTitle::SizeMatch => "Customers of comparable size in other industries",
            SectionTitle::ComplexityMatch => {
                "Customers with a similar field workforce mix or service offering"
            }
        }
    }
}

const SECTION_ORDER: [SectionTitle; 3] = [
    SectionTitle::IndustryMatch,
    SectionTitle::SizeMatch,
    SectionTitle::ComplexityMatch,
];

// ────────────────────────────────────────────────────────────────────────────
// Bucketing
// ────────────────────────────────────────────────────────────────────────────

/// Assigns a match to at most one bucket, in precedence order.
pub fn classify(m: &MatchResult, thresholds: &MatchThresholds) -> Option<SectionTitle> {
    if m.industry_score >= thresholds.industry_min {
        Some(SectionTitle::IndustryMatch)
    } else if m.size_score >= thresholds.size_min {
        Some(SectionTitle::SizeMatch)
    } else if m.field_ratio_score >= thresholds.field_ratio_min
        || m.service_score >= thresholds.service_min
    {
        Some(SectionTitle::ComplexityMatch)
    } else {
        None
    }
}

/// Scores the corpus against `current`, skipping records with the same
/// (non-empty) name and discarding totals at or below the threshold.
/// Results keep corpus order.
pub fn score_corpus(
    current: &CustomerProfile,
    corpus: &[HistoricalCustomerRecord],
    thresholds: &MatchThresholds,
) -> Vec<MatchResult> {
    let own_key = current.customer_name.trim().to_lowercase();
    corpus
        .iter()
        .enumerate()
        .filter(|(_, record)| own_key.is_empty() || record.name_key() != own_key)
        .map(|(i, record)| {
            score_candidate(
                i,
                &current.industry,
                &current.user_count,
                &current.services.types,
                record,
            )
        })
        .filter(|m| m.total_score > thresholds.min_total)
        .collect()
}

/// Builds the similar-customer sections for `current`. Empty buckets are omitted.
pub fn find_similar(
    current: &CustomerProfile,
    corpus: &[HistoricalCustomerRecord],
    thresholds: &MatchThresholds,
) -> Vec<SimilarCustomerSection> {
    let matches = score_corpus(current, corpus, thresholds);

    let mut buckets: [Vec<MatchResult>; 3] = Default::default();
    for m in matches {
        if let Some(section) = classify(&m, thresholds) {
            buckets[section as usize].push(m);
        }
    }

    let sections: Vec<SimilarCustomerSection> = SECTION_ORDER
        .iter()
        .zip(buckets)
        .filter_map(|(section, mut bucket)| {
            if bucket.is_empty() {
                return None;
            }
            // stable: ties keep corpus order
            bucket.sort_by(|a, b| b.total_score.cmp(&a.total_score));
            bucket.truncate(thresholds.cap(*section));
            let customers = bucket
                .iter()
                .map(|m| to_similar(current, &corpus[m.index], m, thresholds))
                .collect();
            Some(SimilarCustomerSection {
                section_title: *section,
                description: section.description().to_string(),
                customers,
            })
        })
        .collect();

    debug!(
        candidates = corpus.len(),
        sections = sections.len(),
        "Similarity matching complete"
    );
    sections
}

fn to_similar(
    current: &CustomerProfile,
    record: &HistoricalCustomerRecord,
    m: &MatchResult,
    thresholds: &MatchThresholds,
) -> SimilarCustomer {
    SimilarCustomer {
        name: record.customer_name.clone(),
        industry: record.industry.clone(),
        user_count: record.user_count.clone(),
        fit_score: record.fit_score,
        industry_score: m.industry_score,
        size_score: m.size_score,
        field_ratio_score: m.field_ratio_score,
        service_score: m.service_score,
        match_score: m.total_score,
        match_reasons: insights::match_reasons(current, record, m, thresholds),
        key_learnings: insights::key_learnings(&record.business_metrics),
    }
}
