//! JSON Recovery: turns raw model text into a structured object, always.
//!
//! Model output may be wrapped in prose or code fences, or cut off by the
//! output token limit. Recovery order:
//! 1. take first `{` .. last `}` and parse, on the raw text and then on the
//!    first fenced block that holds an object;
//! 2. close the truncated tail as-is (missing `]`/`}` appended innermost first);
//! 3. truncate at the last complete property boundary and close again;
//! 4. fall back to scalar field extraction, flagged with `parseWarning`.
//!
//! Text that ends inside an unterminated string is not repaired: the leaf
//! token can't be completed, so it goes straight to the fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Field set on fallback objects so callers can detect degradation.
pub const PARSE_WARNING_FIELD: &str = "parseWarning";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryOutcome {
    /// Parsed without modification (fences/prose aside).
    Clean,
    /// Parsed after truncation repair.
    Repaired,
    /// Could not be parsed; only scalar fields were extracted.
    Fallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveredJson {
    pub value: Value,
    pub outcome: RecoveryOutcome,
}

impl RecoveredJson {
    pub fn is_degraded(&self) -> bool {
        self.outcome == RecoveryOutcome::Fallback
    }
}

/// Recovers a JSON object from raw model text. Never panics, never errors.
pub fn recover_json(raw: &str) -> RecoveredJson {
    let text = raw.trim();

    // raw text first: fence markers may sit inside string values
    if let Some(value) = parse_complete(text) {
        return clean(value);
    }

    let candidate = fenced_json_block(text).unwrap_or(text);
    let Some(start) = candidate.find('{') else {
        return fallback(raw, "no JSON object found in model output");
    };
    let body = &candidate[start..];

    if let Some(value) = parse_complete(body) {
        return clean(value);
    }

    let scan = scan(body);
    match repair(body, &scan) {
        Some(value) => {
            warn!("Model output was truncated or malformed; repaired JSON structure");
            RecoveredJson {
                value,
                outcome: RecoveryOutcome::Repaired,
            }
        }
        None => fallback(raw, "model output could not be repaired into valid JSON"),
    }
}

fn clean(value: Value) -> RecoveredJson {
    RecoveredJson {
        value,
        outcome: RecoveryOutcome::Clean,
    }
}

fn parse_object(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(Value::is_object)
}

/// Parses first `{` .. last `}`, then first `{` .. the brace that closes it
/// (prose after the object may itself contain braces).
fn parse_complete(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let body = &text[start..];
    if let Some(value) = body.rfind('}').and_then(|end| parse_object(&body[..=end])) {
        return Some(value);
    }
    let close = scan(body).top_level_close?;
    parse_object(&body[..=close])
}

/// Content of the first fenced block that holds a `{`. Blocks without one
/// (sample data, quoted snippets) are skipped. An unclosed fence runs to the
/// end of the text.
fn fenced_json_block(text: &str) -> Option<&str> {
    text.split("```")
        .skip(1)
        .step_by(2)
        .map(fence_content)
        .find(|content| content.contains('{'))
}

fn fence_content(block: &str) -> &str {
    // Skip the language tag (```json) up to the end of the marker line.
    let content = match block.find('\n') {
        Some(nl) if !block[..nl].contains('{') => &block[nl + 1..],
        _ => block.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    content.trim()
}

// ────────────────────────────────────────────────────────────────────────────
// Structural scan
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Scan {
    /// Openers still unmatched at the end of the scanned text.
    stack: Vec<char>,
    /// Text ended inside a string literal.
    in_string: bool,
    /// Byte offset of the `}` that closes the top-level object, if reached.
    top_level_close: Option<usize>,
    /// Byte offset of the last `,` that follows a closed string/array/object.
    last_boundary: Option<usize>,
}

fn scan(text: &str) -> Scan {
    let mut result = Scan::default();
    let mut escaped = false;
    let mut last_significant: Option<char> = None;

    for (i, c) in text.char_indices() {
        if result.in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                result.in_string = false;
                last_significant = Some('"');
            }
            continue;
        }

        match c {
            '"' => result.in_string = true,
            '{' | '[' => result.stack.push(c),
            '}' | ']' => {
                let expected = if c == '}' { '{' } else { '[' };
                if result.stack.last() == Some(&expected) {
                    result.stack.pop();
                }
                if result.stack.is_empty() {
                    result.top_level_close = Some(i);
                    return result;
                }
            }
            ',' => {
                if matches!(last_significant, Some('"' | '}' | ']')) {
                    result.last_boundary = Some(i);
                }
            }
            _ => {}
        }

        if !c.is_whitespace() && c != '"' {
            last_significant = Some(c);
        }
    }

    result
}

fn closers(stack: &[char]) -> String {
    stack
        .iter()
        .rev()
        .map(|c| if *c == '{' { '}' } else { ']' })
        .collect()
}

fn repair(body: &str, scan_result: &Scan) -> Option<Value> {
    if scan_result.in_string {
        return None;
    }

    let tail = body.trim_end();
    let closed = format!("{tail}{}", closers(&scan_result.stack));
    if let Some(value) = parse_object(&closed) {
        return Some(value);
    }

    let boundary = scan_result.last_boundary?;
    let prefix = &body[..boundary];
    let prefix_scan = scan(prefix);
    let truncated = format!("{prefix}{}", closers(&prefix_scan.stack));
    parse_object(&truncated)
}

// ────────────────────────────────────────────────────────────────────────────
// Scalar fallback
// ────────────────────────────────────────────────────────────────────────────

static STRING_FIELD_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    ["customerName", "industry", "category"]
        .into_iter()
        .map(|field| {
            let pattern = format!(r#""{field}"\s*:\s*"((?:[^"\\]|\\.)*)""#);
            (field, Regex::new(&pattern).expect("string field regex should compile"))
        })
        .collect()
});

static FIT_SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""fitScore"\s*:\s*"?(\d+(?:\.\d+)?)"#).expect("fitScore regex should compile")
});

static COUNT_FIELD_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    ["total", "backOffice", "field"]
        .into_iter()
        .map(|field| {
            let pattern = format!(r#""{field}"\s*:\s*"?(\d+)"#);
            (field, Regex::new(&pattern).expect("count field regex should compile"))
        })
        .collect()
});

/// Scalar field extraction straight from the raw text, flagged with
/// `parseWarning`. Also used when a recovered object is not a usable profile.
pub fn fallback(raw: &str, reason: &str) -> RecoveredJson {
    warn!("JSON recovery fell back to scalar extraction: {reason}");

    let mut object = Map::new();

    for (field, re) in STRING_FIELD_RES.iter() {
        if let Some(cap) = re.captures(raw).and_then(|c| c.get(1)) {
            object.insert(field.to_string(), Value::String(unescape(cap.as_str())));
        }
    }

    if let Some(score) = FIT_SCORE_RE
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        object.insert("fitScore".to_string(), Value::from(score.round().clamp(0.0, 100.0) as u64));
    }

    let mut counts = Map::new();
    for (field, re) in COUNT_FIELD_RES.iter() {
        if let Some(n) = re
            .captures(raw)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            counts.insert(field.to_string(), Value::from(n));
        }
    }
    if !counts.is_empty() {
        object.insert("userCount".to_string(), Value::Object(counts));
    }

    object.insert(
        PARSE_WARNING_FIELD.to_string(),
        Value::String(format!("{reason}; only scalar fields were recovered")),
    );

    RecoveredJson {
        value: Value::Object(object),
        outcome: RecoveryOutcome::Fallback,
    }
}

fn unescape(captured: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{captured}\"")).unwrap_or_else(|_| captured.to_string())
}
