//! Lenient field deserializers for model-produced and spreadsheet-produced JSON.
//!
//! Every helper accepts whatever shape shows up and falls back to the field's
//! zero value instead of failing the whole object.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::profile::{Requirements, Services, UserCount};

/// Number, numeric string (`"1,200"`, `"$45k"`) or null → u32. Negatives → 0.
pub fn count<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value_to_f64(&value).map(to_u32).unwrap_or(0))
}

/// Like [`count`] but clamped to 0–100.
pub fn score<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    count(d).map(|v| v.min(100))
}

/// Number or numeric string → f64, anything else → 0.0.
pub fn amount<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value_to_f64(&value).unwrap_or(0.0))
}

/// Any JSON value flattened to a display string.
pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value_to_string(&value))
}

/// Array of values, or one comma-separated string, → list of non-empty strings.
pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value_to_list(&value))
}

/// Deserializes `T`, substituting `T::default()` if the value has the wrong shape.
pub fn or_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(d)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// A bare number is read as the total user count.
pub fn user_count<'de, D: Deserializer<'de>>(d: D) -> Result<UserCount, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match &value {
        Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        other => UserCount {
            total: value_to_f64(other).map(to_u32).unwrap_or(0),
            ..UserCount::default()
        },
    })
}

/// A bare list or string is read as the service types.
pub fn services<'de, D: Deserializer<'de>>(d: D) -> Result<Services, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match &value {
        Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        other => Services {
            types: value_to_list(other),
            details: String::new(),
        },
    })
}

/// A bare list or string is read as the key features.
pub fn requirements<'de, D: Deserializer<'de>>(d: D) -> Result<Requirements, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match &value {
        Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        other => Requirements {
            key_features: value_to_list(other),
            integrations: Vec::new(),
        },
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Value helpers (also used by the tabular/document normalizers)
// ────────────────────────────────────────────────────────────────────────────

pub(crate) fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Parses spreadsheet-style numbers: `"1,200"`, `"$45k"`, `"1.2M"`, `"85/100"`.
pub(crate) fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .split('/')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '%' | '€' | '£'))
        .collect();
    let lower = cleaned.to_lowercase();

    let (digits, multiplier) = if let Some(d) = lower.strip_suffix('k') {
        (d, 1_000.0)
    } else if let Some(d) = lower.strip_suffix('m') {
        (d, 1_000_000.0)
    } else {
        (lower.as_str(), 1.0)
    };

    digits
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v * multiplier)
}

pub(crate) fn to_u32(v: f64) -> u32 {
    if v <= 0.0 {
        0
    } else if v >= u32::MAX as f64 {
        u32::MAX
    } else {
        v.round() as u32
    }
}

pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| (k, value_to_string(v)))
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; "),
    }
}

pub(crate) fn value_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                // Objects like {"name": "..."} are common in model output.
                Value::Object(map) => map
                    .get("name")
                    .map(value_to_string)
                    .unwrap_or_else(|| value_to_string(item)),
                other => value_to_string(other),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => split_list(s),
        Value::Null => Vec::new(),
        other => vec![value_to_string(other)],
    }
}

/// Splits a comma/semicolon/newline separated cell into trimmed, non-empty items.
pub(crate) fn split_list(raw: &str) -> Vec<String> {
    raw.split([',', ';', '\n'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
