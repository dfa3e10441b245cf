//! Historical Sources: pluggable providers of past customer records.
//!
//! Each adapter delivers raw `SourceRecord`s. Normalization and merging happen
//! in the aggregator, so adapters stay thin.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::lenient::value_to_string;

use super::records::{DocumentRecord, FormRecord, SourceRecord};
use super::tabular::parse_csv;

const DOCUMENT_EXTENSIONS: &[&str] = &["txt", "md"];

#[async_trait]
pub trait HistoricalSource: Send + Sync {
    /// Label carried into every record from this source.
    fn name(&self) -> &str;

    async fn fetch(&self) -> anyhow::Result<Vec<SourceRecord>>;
}

// ────────────────────────────────────────────────────────────────────────────
// CSV export (tabular)
// ────────────────────────────────────────────────────────────────────────────

pub struct CsvFileSource {
    name: String,
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

#[async_trait]
impl HistoricalSource for CsvFileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> anyhow::Result<Vec<SourceRecord>> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let rows = parse_csv(&self.name, bytes.as_slice())
            .with_context(|| format!("Invalid CSV in {}", self.path.display()))?;
        debug!("{}: {} rows", self.name, rows.len());
        Ok(rows.into_iter().map(SourceRecord::Tabular).collect())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Form export (JSON array of submissions)
// ────────────────────────────────────────────────────────────────────────────

/// Reads a JSON array of form submissions. Each element is either
/// `{"submittedAt": ..., "answers": {question: answer}}`, the same with
/// `answers` as `[{"question", "answer"}]`, or a flat `{question: answer}` map.
pub struct JsonFormSource {
    name: String,
    path: PathBuf,
}

impl JsonFormSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

const SUBMITTED_AT_KEYS: &[&str] = &["submittedAt", "submitted_at"];

fn parse_submission(source: &str, item: &Value) -> Option<FormRecord> {
    let obj = item.as_object()?;

    let submitted_at = SUBMITTED_AT_KEYS
        .iter()
        .find_map(|k| obj.get(*k))
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    let answers = match obj.get("answers") {
        Some(Value::Object(map)) => map
            .iter()
            .map(|(q, a)| (q.clone(), value_to_string(a)))
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|entry| {
                let question = entry.get("question").map(value_to_string)?;
                let answer = entry.get("answer").map(value_to_string).unwrap_or_default();
                Some((question, answer))
            })
            .collect(),
        _ => obj
            .iter()
            .filter(|(k, _)| !SUBMITTED_AT_KEYS.contains(&k.as_str()))
            .map(|(q, a)| (q.clone(), value_to_string(a)))
            .collect(),
    };

    Some(FormRecord {
        source: source.to_string(),
        submitted_at,
        answers,
    })
}

#[async_trait]
impl HistoricalSource for JsonFormSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> anyhow::Result<Vec<SourceRecord>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let value: Value = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in {}", self.path.display()))?;
        let Value::Array(items) = value else {
            bail!("{} must contain a JSON array of submissions", self.path.display());
        };

        let forms: Vec<SourceRecord> = items
            .iter()
            .filter_map(|item| parse_submission(&self.name, item))
            .map(SourceRecord::Form)
            .collect();
        debug!("{}: {} submissions", self.name, forms.len());
        Ok(forms)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Document folder (.txt / .md reports)
// ────────────────────────────────────────────────────────────────────────────

pub struct DocumentDirectorySource {
    name: String,
    dir: PathBuf,
}

impl DocumentDirectorySource {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
        }
    }
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DOCUMENT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl HistoricalSource for DocumentDirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> anyhow::Result<Vec<SourceRecord>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to list {}", self.dir.display()))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_document(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut docs = Vec::with_capacity(paths.len());
        for path in paths {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => docs.push(SourceRecord::Document(DocumentRecord {
                    name: path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    content,
                })),
                Err(e) => warn!("Skipping unreadable document {}: {}", path.display(), e),
            }
        }
        debug!("{}: {} documents", self.name, docs.len());
        Ok(docs)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static (in-memory)
// ────────────────────────────────────────────────────────────────────────────

pub struct StaticSource {
    name: String,
    records: Vec<SourceRecord>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, records: Vec<SourceRecord>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }
}

#[async_trait]
impl HistoricalSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> anyhow::Result<Vec<SourceRecord>> {
        Ok(self.records.clone())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Directory discovery
// ────────────────────────────────────────────────────────────────────────────

/// Builds one source per `.csv` and `.json` file in `dir`, plus a single
/// document source when the directory holds any `.txt`/`.md` report.
/// Sources are ordered by file name, documents last.
pub async fn discover_sources(dir: &Path) -> anyhow::Result<Vec<Arc<dyn HistoricalSource>>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list history directory {}", dir.display()))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        paths.push(entry.path());
    }
    paths.sort();

    let mut sources: Vec<Arc<dyn HistoricalSource>> = Vec::new();
    let mut has_documents = false;
    for path in paths {
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match path.extension().and_then(|e| e.to_str()).map(str::to_lowercase).as_deref() {
            Some("csv") => sources.push(Arc::new(CsvFileSource::new(label, path))),
            Some("json") => sources.push(Arc::new(JsonFormSource::new(label, path))),
            _ if is_document(&path) => has_documents = true,
            _ => debug!("Ignoring {} in history directory", path.display()),
        }
    }
    if has_documents {
        sources.push(Arc::new(DocumentDirectorySource::new("documents", dir)));
    }
    Ok(sources)
}
