//! Corpus aggregation: fetch every source, normalize, merge duplicates, and
//! compute summary statistics.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::HistoricalCustomerRecord;

use super::sources::HistoricalSource;

pub const TOP_INDUSTRIES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndustryCount {
    pub industry: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorpusStats {
    pub total_customers: usize,
    /// Mean over every record, rounded to one decimal. 0 for an empty corpus.
    pub average_fit_score: f64,
    pub top_industries: Vec<IndustryCount>,
}

/// Normalized historical corpus plus its statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    pub records: Vec<HistoricalCustomerRecord>,
    pub stats: CorpusStats,
}

impl Corpus {
    pub fn from_records(records: Vec<HistoricalCustomerRecord>) -> Self {
        let stats = compute_stats(&records, TOP_INDUSTRIES);
        Self { records, stats }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Fetches every source in order. A failing source is logged and skipped.
pub async fn aggregate(sources: &[Arc<dyn HistoricalSource>]) -> Corpus {
    let mut records: Vec<HistoricalCustomerRecord> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();
    let mut merged = 0usize;

    for source in sources {
        let raw = match source.fetch().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Historical source {} failed, skipping: {:#}", source.name(), e);
                continue;
            }
        };

        let fetched = raw.len();
        let mut kept = 0usize;
        for mut record in raw.iter().filter_map(|r| r.normalize()) {
            if record.source.is_empty() {
                record.source = source.name().to_string();
            }
            kept += 1;
            match by_name.get(&record.name_key()) {
                Some(&idx) => {
                    records[idx].merge_missing(&record);
                    merged += 1;
                }
                None => {
                    by_name.insert(record.name_key(), records.len());
                    records.push(record);
                }
            }
        }
        info!(
            "Source {}: {} of {} records usable",
            source.name(),
            kept,
            fetched
        );
    }

    let corpus = Corpus::from_records(records);
    info!(
        "Historical corpus: {} customers ({} duplicates merged)",
        corpus.records.len(),
        merged
    );
    corpus
}

pub fn compute_stats(records: &[HistoricalCustomerRecord], top_n: usize) -> CorpusStats {
    let average_fit_score = if records.is_empty() {
        0.0
    } else {
        let sum: u64 = records.iter().map(|r| u64::from(r.fit_score)).sum();
        (sum as f64 / records.len() as f64 * 10.0).round() / 10.0
    };

    CorpusStats {
        total_customers: records.len(),
        average_fit_score,
        top_industries: top_industries(records, top_n),
    }
}

/// Most frequent industries (case-insensitive). Ties keep first appearance;
/// the first spelling seen is the one reported.
pub fn top_industries(records: &[HistoricalCustomerRecord], top_n: usize) -> Vec<IndustryCount> {
    let mut counts: Vec<IndustryCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let industry = record.industry.trim();
        if industry.is_empty() {
            continue;
        }
        let key = industry.to_lowercase();
        match index.get(&key) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(key, counts.len());
                counts.push(IndustryCount {
                    industry: industry.to_string(),
                    count: 1,
                });
            }
        }
    }

    // stable: ties keep first appearance
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(top_n);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::records::{DocumentRecord, SourceRecord, TabularRecord};
    use crate::history::sources::StaticSource;
    use async_trait::async_trait;

    struct FailingSource;

    #[async_trait]
    impl HistoricalSource for FailingSource {
        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch(&self) -> anyhow::Result<Vec<SourceRecord>> {
            anyhow::bail!("connection refused")
        }
    }

    fn row(pairs: &[(&str, &str)]) -> SourceRecord {
        SourceRecord::Tabular(TabularRecord {
            source: "crm".into(),
            cells: pairs
                .iter()
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect(),
        })
    }

    fn record(name: &str, industry: &str, fit_score: u32) -> HistoricalCustomerRecord {
        HistoricalCustomerRecord {
            customer_name: name.into(),
            industry: industry.into(),
            fit_score,
            ..HistoricalCustomerRecord::default()
        }
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let sources: Vec<Arc<dyn HistoricalSource>> = vec![
            Arc::new(FailingSource),
            Arc::new(StaticSource::new(
                "crm",
                vec![row(&[("Customer", "Polar Air"), ("Industry", "HVAC")])],
            )),
        ];
        let corpus = aggregate(&sources).await;
        assert_eq!(corpus.records.len(), 1);
        assert_eq!(corpus.records[0].customer_name, "Polar Air");
    }

    #[tokio::test]
    async fn test_duplicates_merged_first_wins() {
        let sources: Vec<Arc<dyn HistoricalSource>> = vec![
            Arc::new(StaticSource::new(
                "crm",
                vec![row(&[("Customer", "Polar Air"), ("Industry", "HVAC")])],
            )),
            Arc::new(StaticSource::new(
                "reports",
                vec![SourceRecord::Document(DocumentRecord {
                    name: "polar.md".into(),
                    content: "Fit Score: 82\nCustomer: polar air\nIndustry: Heating\nHealth: Green\n"
                        .into(),
                })],
            )),
        ];
        let corpus = aggregate(&sources).await;
        assert_eq!(corpus.records.len(), 1);
        let polar = &corpus.records[0];
        assert_eq!(polar.industry, "HVAC");
        assert_eq!(polar.fit_score, 82);
        assert_eq!(polar.business_metrics.health, "Green");
        assert_eq!(polar.source, "crm");
    }

    #[tokio::test]
    async fn test_document_records_take_source_name() {
        let sources: Vec<Arc<dyn HistoricalSource>> = vec![Arc::new(StaticSource::new(
            "reports",
            vec![SourceRecord::Document(DocumentRecord {
                name: "acme.md".into(),
                content: "Fit Score: 70\n".into(),
            })],
        ))];
        let corpus = aggregate(&sources).await;
        assert_eq!(corpus.records[0].customer_name, "acme");
        assert_eq!(corpus.records[0].source, "reports");
    }

    #[tokio::test]
    async fn test_empty_sources_yield_empty_corpus() {
        let corpus = aggregate(&[]).await;
        assert!(corpus.is_empty());
        assert_eq!(corpus.stats.average_fit_score, 0.0);
    }

    #[test]
    fn test_stats_average_and_top_industries() {
        let records = vec![
            record("A", "HVAC", 80),
            record("B", "Plumbing", 70),
            record("C", "hvac", 0),
            record("D", "Electrical", 65),
            record("E", "Plumbing", 90),
            record("F", "", 50),
        ];
        let stats = compute_stats(&records, 2);
        assert_eq!(stats.total_customers, 6);
        // (80+70+0+65+90+50)/6 = 59.17
        assert_eq!(stats.average_fit_score, 59.2);
        assert_eq!(
            stats.top_industries,
            vec![
                IndustryCount {
                    industry: "HVAC".into(),
                    count: 2
                },
                IndustryCount {
                    industry: "Plumbing".into(),
                    count: 2
                },
            ]
        );
    }
}
