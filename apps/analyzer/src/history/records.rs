use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::HistoricalCustomerRecord;

use super::{document, tabular};

/// Raw record as delivered by a historical source, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SourceRecord {
    Tabular(TabularRecord),
    Form(FormRecord),
    Document(DocumentRecord),
}

/// One spreadsheet row: `(header, value)` pairs in column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabularRecord {
    pub source: String,
    pub cells: Vec<(String, String)>,
}

/// One form submission: `(question, answer)` pairs in form order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRecord {
    pub source: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub answers: Vec<(String, String)>,
}

/// Free-text document, e.g. an exported fit analysis report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub name: String,
    pub content: String,
}

impl SourceRecord {
    /// Maps the record into the canonical shape. `None` means the record
    /// carried nothing usable (no customer name, not a fit analysis document).
    pub fn normalize(&self) -> Option<HistoricalCustomerRecord> {
        match self {
            SourceRecord::Tabular(row) => tabular::normalize_tabular(row),
            SourceRecord::Form(form) => tabular::normalize_form(form),
            SourceRecord::Document(doc) => document::extract_document(doc),
        }
    }
}
