//! Analysis pipeline: orchestrates one transcript analysis end to end.
//!
//! Flow: quick extraction → historical corpus + reference customers →
//!       full prompt → model call (retry + timeout) → JSON recovery →
//!       criteria adjustment → similarity enrichment → validation.
//!
//! Only the model call is retried. Every later phase is local and
//! deterministic; a malformed model response degrades the result instead
//! of failing it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analysis::prompts::{
    ANALYSIS_PROMPT_TEMPLATE, QUICK_EXTRACTION_TEMPLATE, QUICK_TRANSCRIPT_CHARS,
};
use crate::analysis::validation::{validate_profile, ValidationReport};
use crate::cache::TtlCache;
use crate::config::Config;
use crate::criteria_provider::CriteriaProvider;
use crate::errors::AppError;
use crate::history::{aggregate, Corpus, CorpusStats, HistoricalSource};
use crate::llm_client::{LanguageModel, LlmError};
use crate::models::{Criteria, CriteriaUpdate, CustomerProfile, SimilarCustomer};
use crate::recovery::{self, recover_json};
use crate::retry::{retry_with_delay, RetryPolicy};
use crate::scoring;
use crate::similarity::{find_similar, MatchThresholds};

/// Reference customers embedded in the analysis prompt.
const MAX_REFERENCE_CUSTOMERS: usize = 5;

// ────────────────────────────────────────────────────────────────────────────
// Settings and output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub max_tokens: u32,
    pub quick_max_tokens: u32,
    /// Bound on one model call, retries included.
    pub llm_timeout: Duration,
    /// Policy for the full analysis call. Quick extraction is tried once.
    pub retry: RetryPolicy,
    pub cache_ttl: Duration,
    pub thresholds: MatchThresholds,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            quick_max_tokens: 512,
            llm_timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
            cache_ttl: Duration::from_secs(300),
            thresholds: MatchThresholds::default(),
        }
    }
}

impl AnalyzerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_tokens: config.max_tokens,
            quick_max_tokens: config.quick_max_tokens,
            llm_timeout: config.llm_timeout,
            retry: RetryPolicy::fixed(config.llm_max_attempts, config.llm_retry_delay),
            cache_ttl: config.cache_ttl,
            thresholds: MatchThresholds::default(),
        }
    }
}

/// Result of one analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub analysis_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub profile: CustomerProfile,
    pub validation: ValidationReport,
    pub corpus_stats: CorpusStats,
    /// True when the model output could not be parsed and only scalar
    /// fields were recovered.
    pub degraded: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Analyzer
// ────────────────────────────────────────────────────────────────────────────

pub struct Analyzer {
    llm: Arc<dyn LanguageModel>,
    criteria: Arc<dyn CriteriaProvider>,
    sources: Vec<Arc<dyn HistoricalSource>>,
    criteria_cache: TtlCache<Criteria>,
    corpus_cache: TtlCache<Corpus>,
    settings: AnalyzerSettings,
}

impl Analyzer {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        criteria: Arc<dyn CriteriaProvider>,
        sources: Vec<Arc<dyn HistoricalSource>>,
        settings: AnalyzerSettings,
    ) -> Self {
        Self {
            llm,
            criteria,
            sources,
            criteria_cache: TtlCache::new("criteria", settings.cache_ttl),
            corpus_cache: TtlCache::new("corpus", settings.cache_ttl),
            settings,
        }
    }

    /// Runs the full analysis pipeline for one sales transcript.
    ///
    /// Steps:
    /// 1. quick extraction (best-effort) → provisional profile
    /// 2. historical corpus (cached) → reference customers for the prompt
    /// 3. criteria snapshot (cached) → full prompt
    /// 4. model call with retry, bounded by `llm_timeout`
    /// 5. JSON recovery → CustomerProfile
    /// 6. normalization + criteria score adjustment
    /// 7. similarity enrichment against the full corpus
    /// 8. structural validation (reported, never fatal)
    pub async fn analyze(&self, transcript: &str) -> Result<AnalysisOutcome, AppError> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(AppError::Validation("Transcript is empty".to_string()));
        }
        let analysis_id = Uuid::new_v4();
        info!(
            "Analysis {} started ({} transcript chars)",
            analysis_id,
            transcript.chars().count()
        );

        // Step 1: Quick extraction
        let quick = self.quick_extract(transcript).await;
        debug!(
            "Quick profile: industry={:?}, users={}",
            quick.industry, quick.user_count.total
        );

        // Step 2: Historical corpus and reference customers
        let corpus = self.current_corpus().await;
        let references = reference_customers(&quick, &corpus, &self.settings.thresholds);
        info!(
            "Corpus has {} customers; {} references selected",
            corpus.records.len(),
            references.len()
        );

        // Step 3: Criteria and prompt
        let criteria = self.current_criteria().await;
        let prompt = build_analysis_prompt(transcript, &criteria, &corpus.stats, &references)?;

        // Step 4: Model call
        let raw = self
            .call_model(
                &prompt,
                self.settings.max_tokens,
                "analysis",
                self.settings.retry,
            )
            .await?;

        // Step 5: Recovery
        let recovered = recover_json(&raw);
        let mut degraded = recovered.is_degraded();
        let mut profile = CustomerProfile::from_value(recovered.value);
        if profile.parse_warning.is_some() && !degraded {
            let fallback = recovery::fallback(&raw, "recovered object is not a profile");
            profile = CustomerProfile::from_value(fallback.value);
            degraded = true;
        }

        // Step 6: Normalize and score. The model's own breakdown is discarded.
        profile.normalize();
        profile.score_breakdown = None;
        let mut profile = scoring::adjust_score(profile, &criteria);
        if let Some(breakdown) = &profile.score_breakdown {
            info!(
                "Fit score {} → {} ({})",
                breakdown.base_score,
                breakdown.final_score,
                breakdown.category.as_str()
            );
        }

        // Step 7: Similarity enrichment
        profile.similar_customers =
            find_similar(&profile, &corpus.records, &self.settings.thresholds);

        // Step 8: Validation
        let validation = validate_profile(&profile, &self.settings.thresholds);
        for issue in &validation.issues {
            warn!("Analysis {}: {}: {}", analysis_id, issue.field, issue.message);
        }

        info!(
            "Analysis {} finished: fit score {}, {} similar sections, degraded={}",
            analysis_id,
            profile.fit_score,
            profile.similar_customers.len(),
            degraded
        );

        Ok(AnalysisOutcome {
            analysis_id,
            analyzed_at: Utc::now(),
            profile,
            validation,
            corpus_stats: corpus.stats.clone(),
            degraded,
        })
    }

    /// Re-applies the current criteria to an already analyzed profile.
    pub async fn rescore(&self, profile: CustomerProfile) -> CustomerProfile {
        let criteria = self.current_criteria().await;
        scoring::rescore(profile, &criteria)
    }

    /// Applies a partial criteria update and drops the cached snapshot.
    pub async fn update_criteria(&self, update: CriteriaUpdate) -> Result<Criteria, AppError> {
        let updated = self.criteria.update(update).await?;
        self.criteria_cache.invalidate().await;
        info!("Criteria cache invalidated after update");
        Ok(updated)
    }

    /// Drops the cached corpus; the next analysis re-reads every source.
    pub async fn refresh_corpus(&self) {
        self.corpus_cache.invalidate().await;
        info!("Historical corpus cache invalidated");
    }

    async fn quick_extract(&self, transcript: &str) -> CustomerProfile {
        let excerpt: String = transcript.chars().take(QUICK_TRANSCRIPT_CHARS).collect();
        let prompt = QUICK_EXTRACTION_TEMPLATE.replace("{transcript}", &excerpt);

        match self
            .call_model(
                &prompt,
                self.settings.quick_max_tokens,
                "quick extraction",
                RetryPolicy::none(),
            )
            .await
        {
            Ok(raw) => {
                let mut quick = CustomerProfile::from_value(recover_json(&raw).value);
                quick.normalize();
                quick
            }
            Err(e) => {
                warn!("Quick extraction failed, continuing without it: {}", e);
                CustomerProfile::default()
            }
        }
    }

    async fn current_criteria(&self) -> Arc<Criteria> {
        match self
            .criteria_cache
            .get_or_try_refresh(|| self.criteria.get())
            .await
        {
            Ok(criteria) => criteria,
            Err(e) => {
                warn!("Criteria unavailable, scoring without constraints: {:#}", e);
                Arc::new(Criteria::default())
            }
        }
    }

    async fn current_corpus(&self) -> Arc<Corpus> {
        if let Some(corpus) = self.corpus_cache.get().await {
            return corpus;
        }
        let corpus = aggregate(&self.sources).await;
        self.corpus_cache.insert(corpus).await
    }

    /// One model call: retried per `policy`, the whole loop bounded by
    /// `llm_timeout`.
    async fn call_model(
        &self,
        prompt: &str,
        max_tokens: u32,
        label: &str,
        policy: RetryPolicy,
    ) -> Result<String, LlmError> {
        let llm: &dyn LanguageModel = self.llm.as_ref();
        let attempts = retry_with_delay(policy, label, move |attempt| {
            debug!("{label}: attempt {attempt}");
            llm.invoke(prompt, max_tokens)
        });

        match tokio::time::timeout(self.settings.llm_timeout, attempts).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(e.after_attempts(policy.max_attempts)),
            Err(_) => {
                warn!("{label}: timed out after {:?}", self.settings.llm_timeout);
                Err(LlmError::Timeout {
                    after: self.settings.llm_timeout,
                })
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt assembly
// ────────────────────────────────────────────────────────────────────────────

fn reference_customers(
    quick: &CustomerProfile,
    corpus: &Corpus,
    thresholds: &MatchThresholds,
) -> Vec<SimilarCustomer> {
    find_similar(quick, &corpus.records, thresholds)
        .into_iter()
        .flat_map(|section| section.customers)
        .take(MAX_REFERENCE_CUSTOMERS)
        .collect()
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "none configured".to_string()
    } else {
        items.join(", ")
    }
}

fn criteria_summary(criteria: &Criteria) -> String {
    format!(
        "- Preferred industries: {}\n\
         - Excluded industries: {}\n\
         - Product strengths: {}\n\
         - Known product weaknesses: {}\n\
         - Unsupported requirements: {}",
        list_or_none(&criteria.industries.whitelist),
        list_or_none(&criteria.industries.blacklist),
        list_or_none(&criteria.requirements.strengths),
        list_or_none(&criteria.requirements.weaknesses),
        list_or_none(&criteria.requirements.unsupported),
    )
}

fn corpus_summary(stats: &CorpusStats) -> String {
    if stats.total_customers == 0 {
        return "No historical customers available.".to_string();
    }
    let industries = stats
        .top_industries
        .iter()
        .map(|i| format!("{} ({})", i.industry, i.count))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} past customers, average fit score {:.1}. Most common industries: {}",
        stats.total_customers, stats.average_fit_score, industries
    )
}

fn build_analysis_prompt(
    transcript: &str,
    criteria: &Criteria,
    stats: &CorpusStats,
    references: &[SimilarCustomer],
) -> Result<String, AppError> {
    let references_json = if references.is_empty() {
        "None available.".to_string()
    } else {
        serde_json::to_string_pretty(
            &references
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "name": c.name,
                        "industry": c.industry,
                        "userCount": c.user_count,
                        "fitScore": c.fit_score,
                        "matchReasons": c.match_reasons,
                        "keyLearnings": c.key_learnings,
                    })
                })
                .collect::<Vec<_>>(),
        )
        .map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Failed to serialize reference customers: {e}"))
        })?
    };

    // transcript last: text inside it is never expanded
    Ok(ANALYSIS_PROMPT_TEMPLATE
        .replace("{criteria_summary}", &criteria_summary(criteria))
        .replace("{corpus_stats}", &corpus_summary(stats))
        .replace("{reference_customers}", &references_json)
        .replace("{transcript}", transcript))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
