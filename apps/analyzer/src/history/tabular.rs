//! Header-driven normalization for spreadsheet rows and form submissions.
//!
//! Column headers and form questions are free text, so each one is mapped to
//! a canonical field by keyword rules. The first matching rule wins.

use std::io::Read;

use crate::models::lenient::{parse_number, split_list, to_u32};
use crate::models::HistoricalCustomerRecord;

use super::records::{FormRecord, TabularRecord};

const MAX_FIT_SCORE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    Health,
    Arr,
    DaysToOnboard,
    FitScore,
    FieldUsers,
    BackOfficeUsers,
    TotalUsers,
    Industry,
    Services,
    Integrations,
    KeyFeatures,
    Strengths,
    Challenges,
    CustomerName,
}

const FIELD_QUALIFIERS: &[&str] = &["staff", "user", "employee", "worker", "tech"];

/// Words that make a company/customer header describe an attribute of the
/// account ("Account Manager", "Company Size") rather than its name.
const NAME_ATTRIBUTE_WORDS: &[&str] = &[
    "manager", "owner", "rep", "size", "type", "id", "since", "email", "phone",
];

/// Maps a header or question to a canonical field, case-insensitively.
pub fn classify_header(header: &str) -> Option<CanonicalField> {
    let h = header.trim().to_lowercase();
    if h.is_empty() {
        return None;
    }
    let has = |needle: &str| h.contains(needle);
    let has_any = |needles: &[&str]| needles.iter().any(|n| h.contains(n));
    let words: Vec<&str> = h.split(|c: char| !c.is_alphanumeric()).collect();

    let field = if has("health") {
        CanonicalField::Health
    } else if words.contains(&"arr") || has("annual recurring") || has("revenue") {
        CanonicalField::Arr
    } else if has("onboard") {
        CanonicalField::DaysToOnboard
    } else if has("score") {
        CanonicalField::FitScore
    } else if has("field") && has_any(FIELD_QUALIFIERS) {
        CanonicalField::FieldUsers
    } else if has("back office") || has("office") {
        CanonicalField::BackOfficeUsers
    } else if has_any(&["total", "users", "employees", "headcount"]) {
        CanonicalField::TotalUsers
    } else if has_any(&["industry", "vertical", "sector"]) {
        CanonicalField::Industry
    } else if has("service") {
        CanonicalField::Services
    } else if has("integration") {
        CanonicalField::Integrations
    } else if has_any(&["feature", "requirement"]) {
        CanonicalField::KeyFeatures
    } else if has("strength") {
        CanonicalField::Strengths
    } else if has_any(&["challenge", "pain"]) {
        CanonicalField::Challenges
    } else if h == "name"
        || (has_any(&["company", "customer", "client", "account"])
            && !words.iter().any(|w| NAME_ATTRIBUTE_WORDS.contains(w)))
    {
        CanonicalField::CustomerName
    } else {
        return None;
    };
    Some(field)
}

/// Writes `value` into `field` unless the field is already populated.
/// Numeric cells that do not parse are ignored.
pub(crate) fn apply_field(
    record: &mut HistoricalCustomerRecord,
    field: CanonicalField,
    value: &str,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    let number = || parse_number(value);
    let set_num = |target: &mut u32, v: Option<f64>| {
        if *target == 0 {
            if let Some(v) = v {
                *target = to_u32(v);
            }
        }
    };
    let set_list = |target: &mut Vec<String>| {
        if target.is_empty() {
            *target = split_list(value);
        }
    };
    let set_str = |target: &mut String| {
        if target.is_empty() {
            *target = value.to_string();
        }
    };

    match field {
        CanonicalField::Health => set_str(&mut record.business_metrics.health),
        CanonicalField::Arr => {
            if record.business_metrics.arr == 0.0 {
                record.business_metrics.arr = number().unwrap_or(0.0).max(0.0);
            }
        }
        CanonicalField::DaysToOnboard => {
            set_num(&mut record.business_metrics.days_to_onboard, number())
        }
        CanonicalField::FitScore => {
            set_num(&mut record.fit_score, number());
            record.fit_score = record.fit_score.min(MAX_FIT_SCORE);
        }
        CanonicalField::FieldUsers => set_num(&mut record.user_count.field, number()),
        CanonicalField::BackOfficeUsers => set_num(&mut record.user_count.back_office, number()),
        CanonicalField::TotalUsers => set_num(&mut record.user_count.total, number()),
        CanonicalField::Industry => set_str(&mut record.industry),
        CanonicalField::Services => set_list(&mut record.services.types),
        CanonicalField::Integrations => set_list(&mut record.requirements.integrations),
        CanonicalField::KeyFeatures => set_list(&mut record.requirements.key_features),
        CanonicalField::Strengths => set_list(&mut record.strengths),
        CanonicalField::Challenges => set_list(&mut record.challenges),
        CanonicalField::CustomerName => set_str(&mut record.customer_name),
    }
}

fn from_pairs(source: &str, pairs: &[(String, String)]) -> Option<HistoricalCustomerRecord> {
    let mut record = HistoricalCustomerRecord {
        source: source.to_string(),
        ..HistoricalCustomerRecord::default()
    };
    for (header, value) in pairs {
        if let Some(field) = classify_header(header) {
            apply_field(&mut record, field, value);
        }
    }
    if record.customer_name.trim().is_empty() {
        return None;
    }
    record.user_count.normalize();
    Some(record)
}

/// Spreadsheet row → canonical record. Rows without a customer name yield `None`.
pub fn normalize_tabular(row: &TabularRecord) -> Option<HistoricalCustomerRecord> {
    from_pairs(&row.source, &row.cells)
}

/// Form submission → canonical record. Submissions without a customer name yield `None`.
pub fn normalize_form(form: &FormRecord) -> Option<HistoricalCustomerRecord> {
    from_pairs(&form.source, &form.answers)
}

/// Reads CSV with a header row into tabular records. Cells are trimmed and
/// short rows are allowed.
pub fn parse_csv<R: Read>(source: &str, reader: R) -> Result<Vec<TabularRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let mut rows = Vec::new();
    for result in csv_reader.records() {
        let row = result?;
        let cells = headers
            .iter()
            .zip(row.iter())
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect();
        rows.push(TabularRecord {
            source: source.to_string(),
            cells,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(h, v)| (h.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_classify_header_rules() {
        use CanonicalField::*;
        let cases = [
            ("Account Health", Health),
            ("ARR", Arr),
            ("Annual Recurring Revenue", Arr),
            ("Days to Onboard", DaysToOnboard),
            ("ICP Fit Score", FitScore),
            ("Field Technicians", FieldUsers),
            ("# Field Users", FieldUsers),
            ("Back Office Users", BackOfficeUsers),
            ("Office Staff", BackOfficeUsers),
            ("Total Users", TotalUsers),
            ("Employees", TotalUsers),
            ("Vertical", Industry),
            ("Services Offered", Services),
            ("Integrations", Integrations),
            ("Key Requirements", KeyFeatures),
            ("Strengths", Strengths),
            ("Pain Points", Challenges),
            ("Company Name", CustomerName),
            ("Name", CustomerName),
        ];
        for (header, expected) in cases {
            assert_eq!(classify_header(header), Some(expected), "header {header:?}");
        }
        assert_eq!(classify_header("Notes"), None);
        // "arr" must be a whole word
        assert_eq!(classify_header("Arrival Date"), None);
    }

    #[test]
    fn test_account_attribute_headers_are_not_names() {
        for header in ["Account Manager", "Company Size", "Customer ID", "Client Since", "Account Owner"] {
            assert_eq!(classify_header(header), None, "header {header:?}");
        }

        let row = TabularRecord {
            source: "crm.csv".into(),
            cells: cells(&[
                ("Account Manager", "Dana Ruiz"),
                ("Company Size", "Mid-market"),
                ("Company", "Polar Air"),
            ]),
        };
        let record = normalize_tabular(&row).unwrap();
        assert_eq!(record.customer_name, "Polar Air");
    }

    #[test]
    fn test_field_without_qualifier_is_not_field_users() {
        assert_eq!(classify_header("Field"), None);
        assert_eq!(
            classify_header("Field Service Area"),
            Some(CanonicalField::Services)
        );
    }

    #[test]
    fn test_normalize_tabular_row() {
        let row = TabularRecord {
            source: "crm.csv".into(),
            cells: cells(&[
                ("Customer", "Polar Air"),
                ("Industry", "HVAC"),
                ("Field Techs", "70"),
                ("Office Staff", "20"),
                ("ARR", "$48k"),
                ("Services", "Maintenance, Installation"),
                ("Fit Score", "82"),
                ("Health", "Green"),
                ("Days to Onboard", "21"),
            ]),
        };
        let record = normalize_tabular(&row).unwrap();
        assert_eq!(record.customer_name, "Polar Air");
        assert_eq!(record.user_count.field, 70);
        assert_eq!(record.user_count.back_office, 20);
        // total derived from the split
        assert_eq!(record.user_count.total, 90);
        assert_eq!(record.business_metrics.arr, 48_000.0);
        assert_eq!(record.services.types, vec!["Maintenance", "Installation"]);
        assert_eq!(record.fit_score, 82);
        assert_eq!(record.business_metrics.days_to_onboard, 21);
        assert_eq!(record.source, "crm.csv");
    }

    #[test]
    fn test_row_without_name_skipped() {
        let row = TabularRecord {
            source: "crm.csv".into(),
            cells: cells(&[("Customer", "  "), ("Industry", "HVAC")]),
        };
        assert!(normalize_tabular(&row).is_none());
    }

    #[test]
    fn test_normalize_form_questions() {
        let form = FormRecord {
            source: "intake".into(),
            submitted_at: None,
            answers: cells(&[
                ("What is your company name?", "Drain Kings"),
                ("Which industry are you in?", "Plumbing"),
                ("How many field technicians do you have?", "1,200"),
                ("What are your biggest pain points?", "Scheduling; Invoicing"),
            ]),
        };
        let record = normalize_form(&form).unwrap();
        assert_eq!(record.customer_name, "Drain Kings");
        assert_eq!(record.industry, "Plumbing");
        assert_eq!(record.user_count.field, 1200);
        assert_eq!(record.challenges, vec!["Scheduling", "Invoicing"]);
    }

    #[test]
    fn test_unparseable_numbers_ignored() {
        let row = TabularRecord {
            source: "crm.csv".into(),
            cells: cells(&[("Customer", "Acme"), ("Total Users", "lots"), ("Score", "140")]),
        };
        let record = normalize_tabular(&row).unwrap();
        assert_eq!(record.user_count.total, 0);
        assert_eq!(record.fit_score, 100);
    }

    #[test]
    fn test_parse_csv_trims_and_allows_short_rows() {
        let data = "Customer , Industry, Total Users\n Polar Air , HVAC , 90\nSpark Electric, Electrical\n";
        let rows = parse_csv("crm.csv", data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].cells[0], ("Customer".to_string(), "Polar Air".to_string()));
        assert_eq!(rows[1].cells.len(), 2);
    }
}
