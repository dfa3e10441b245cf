//! Best-effort extraction of historical customers from free-text fit reports.
//!
//! Only documents that look like a fit analysis are considered. Fields are
//! read from `Label: value` lines; list fields may instead be followed by a
//! bullet list. Anything that does not fit is skipped without error.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::HistoricalCustomerRecord;

use super::records::DocumentRecord;
use super::tabular::{apply_field, CanonicalField};

const MARKERS: &[&str] = &[
    "customer fit analysis",
    "fit analysis report",
    "icp fit analysis",
    "fit score:",
];

static LABEL_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*•]\s+)?(?:#+\s*)?\**\s*([A-Za-z][A-Za-z ]*?)\s*\**\s*:\s*\**\s*(.*?)\s*$")
        .expect("label regex")
});

static BULLET_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)])\s+(.+?)\s*$").expect("bullet regex"));

fn label_field(label: &str) -> Option<CanonicalField> {
    let field = match label.trim().to_lowercase().as_str() {
        "customer" => CanonicalField::CustomerName,
        "industry" => CanonicalField::Industry,
        "fit score" => CanonicalField::FitScore,
        "total users" => CanonicalField::TotalUsers,
        "field users" => CanonicalField::FieldUsers,
        "back office users" => CanonicalField::BackOfficeUsers,
        "services" => CanonicalField::Services,
        "integrations" => CanonicalField::Integrations,
        "key features" => CanonicalField::KeyFeatures,
        "strengths" => CanonicalField::Strengths,
        "challenges" => CanonicalField::Challenges,
        "arr" => CanonicalField::Arr,
        "health" => CanonicalField::Health,
        "days to onboard" => CanonicalField::DaysToOnboard,
        _ => return None,
    };
    Some(field)
}

fn list_target(
    record: &mut HistoricalCustomerRecord,
    field: CanonicalField,
) -> Option<&mut Vec<String>> {
    match field {
        CanonicalField::Services => Some(&mut record.services.types),
        CanonicalField::Integrations => Some(&mut record.requirements.integrations),
        CanonicalField::KeyFeatures => Some(&mut record.requirements.key_features),
        CanonicalField::Strengths => Some(&mut record.strengths),
        CanonicalField::Challenges => Some(&mut record.challenges),
        _ => None,
    }
}

fn is_list(field: CanonicalField) -> bool {
    matches!(
        field,
        CanonicalField::Services
            | CanonicalField::Integrations
            | CanonicalField::KeyFeatures
            | CanonicalField::Strengths
            | CanonicalField::Challenges
    )
}

fn clean(value: &str) -> String {
    value.replace("**", "").trim().to_string()
}

fn flush_bullets(
    record: &mut HistoricalCustomerRecord,
    pending: Option<CanonicalField>,
    bullets: &mut Vec<String>,
) {
    if let Some(target) = pending.and_then(|field| list_target(record, field)) {
        if target.is_empty() && !bullets.is_empty() {
            *target = std::mem::take(bullets);
        }
    }
    bullets.clear();
}

pub fn is_fit_report(content: &str) -> bool {
    let lower = content.to_lowercase();
    MARKERS.iter().any(|m| lower.contains(m))
}

/// Extracts a canonical record from a fit analysis document. Returns `None`
/// for documents without a marker phrase or without any usable name.
pub fn extract_document(doc: &DocumentRecord) -> Option<HistoricalCustomerRecord> {
    if !is_fit_report(&doc.content) {
        debug!("Skipping document {}: not a fit analysis", doc.name);
        return None;
    }

    let mut record = HistoricalCustomerRecord::default();
    let mut pending: Option<CanonicalField> = None;
    let mut bullets: Vec<String> = Vec::new();

    for line in doc.content.lines() {
        let labeled = LABEL_LINE
            .captures(line)
            .and_then(|caps| label_field(&caps[1]).map(|field| (field, clean(&caps[2]))));

        if let Some((field, value)) = labeled {
            flush_bullets(&mut record, pending.take(), &mut bullets);
            if value.is_empty() && is_list(field) {
                pending = Some(field);
            } else {
                apply_field(&mut record, field, &value);
            }
            continue;
        }

        if pending.is_some() {
            if let Some(caps) = BULLET_LINE.captures(line) {
                let item = clean(&caps[1]);
                if !item.is_empty() {
                    bullets.push(item);
                }
                continue;
            }
            if line.trim().is_empty() && bullets.is_empty() {
                continue;
            }
            flush_bullets(&mut record, pending.take(), &mut bullets);
        }
    }
    flush_bullets(&mut record, pending.take(), &mut bullets);

    if record.customer_name.trim().is_empty() {
        record.customer_name = Path::new(&doc.name)
            .file_stem()
            .map(|s| s.to_string_lossy().trim().to_string())
            .unwrap_or_default();
    }
    if record.customer_name.is_empty() {
        debug!("Skipping document {}: no customer name", doc.name);
        return None;
    }

    record.user_count.normalize();
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str, content: &str) -> DocumentRecord {
        DocumentRecord {
            name: name.into(),
            content: content.into(),
        }
    }

    const REPORT: &str = "# Customer Fit Analysis\n\
        \n\
        **Customer:** Polar Air\n\
        Industry: HVAC\n\
        Fit Score: 82/100\n\
        Field Users: 70\n\
        Back Office Users: 20\n\
        Services: Maintenance, Installation\n\
        Strengths:\n\
        \n\
        - Dispatch-heavy operation, clear owner\n\
        - Budget approved\n\
        Challenges:\n\
        * Legacy ERP\n\
        ARR: $48,000\n\
        Health: Green\n\
        Days to Onboard: 21\n";

    #[test]
    fn test_extract_labeled_fields() {
        let record = extract_document(&doc("polar.md", REPORT)).unwrap();
        assert_eq!(record.customer_name, "Polar Air");
        assert_eq!(record.industry, "HVAC");
        assert_eq!(record.fit_score, 82);
        assert_eq!(record.user_count.total, 90);
        assert_eq!(record.services.types, vec!["Maintenance", "Installation"]);
        assert_eq!(record.business_metrics.arr, 48_000.0);
        assert_eq!(record.business_metrics.health, "Green");
        assert_eq!(record.business_metrics.days_to_onboard, 21);
    }

    #[test]
    fn test_bullet_lists_keep_commas() {
        let record = extract_document(&doc("polar.md", REPORT)).unwrap();
        assert_eq!(
            record.strengths,
            vec!["Dispatch-heavy operation, clear owner", "Budget approved"]
        );
        assert_eq!(record.challenges, vec!["Legacy ERP"]);
    }

    #[test]
    fn test_document_without_marker_skipped() {
        let content = "Meeting notes\nCustomer: Polar Air\nIndustry: HVAC\n";
        assert!(extract_document(&doc("notes.txt", content)).is_none());
    }

    #[test]
    fn test_name_falls_back_to_document_name() {
        let content = "ICP Fit Analysis\nIndustry: Plumbing\nTotal Users: 40\n";
        let record = extract_document(&doc("Drain Kings.txt", content)).unwrap();
        assert_eq!(record.customer_name, "Drain Kings");
        assert_eq!(record.user_count.total, 40);
    }

    #[test]
    fn test_unknown_labels_ignored() {
        let content = "Fit Score: 70\nCustomer: Acme\nRandom Label: whatever\nNotes: - not a list\n";
        let record = extract_document(&doc("acme.md", content)).unwrap();
        assert_eq!(record.customer_name, "Acme");
        assert_eq!(record.fit_score, 70);
        assert!(record.strengths.is_empty());
    }
}
