//! Text matching primitives shared by the score adjuster.

/// Lowercase + trim.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// True when either normalized string contains the other. Empty strings never match.
pub fn contains_either(a: &str, b: &str) -> bool {
    let (a, b) = (normalize(a), normalize(b));
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

/// Splits an industry label into lowercase tokens of at least `min_len` chars.
pub fn tokens(text: &str, separators: &[char], min_len: usize) -> Vec<String> {
    normalize(text)
        .split(|c: char| c.is_whitespace() || separators.contains(&c))
        .filter(|t| t.chars().count() >= min_len)
        .map(String::from)
        .collect()
}

fn shares_prefix(a: &str, b: &str, len: usize) -> bool {
    let pa: String = a.chars().take(len).collect();
    let pb: String = b.chars().take(len).collect();
    pa.chars().count() == len && pa == pb
}

/// How an industry matched a configured list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndustryMatchKind {
    Exact,
    Substring,
    Token,
}

const INDUSTRY_SEPARATORS: &[char] = &['-', ',', '&'];
const INDUSTRY_MIN_TOKEN: usize = 3;
const TOKEN_PREFIX_LEN: usize = 3;

/// First blacklist entry that bidirectionally contains the industry.
pub fn find_blacklisted<'a>(industry: &str, blacklist: &'a [String]) -> Option<&'a str> {
    blacklist
        .iter()
        .find(|entry| contains_either(industry, entry))
        .map(String::as_str)
}

/// Whitelist lookup with escalating strategies: exact, then bidirectional
/// containment, then token-level (containment or shared 3-char prefix).
/// Each strategy is tried against every entry before moving to the next.
pub fn find_whitelisted<'a>(
    industry: &str,
    whitelist: &'a [String],
) -> Option<(&'a str, IndustryMatchKind)> {
    let industry_norm = normalize(industry);
    if industry_norm.is_empty() {
        return None;
    }

    if let Some(entry) = whitelist.iter().find(|e| normalize(e) == industry_norm) {
        return Some((entry.as_str(), IndustryMatchKind::Exact));
    }

    if let Some(entry) = whitelist.iter().find(|e| contains_either(industry, e)) {
        return Some((entry.as_str(), IndustryMatchKind::Substring));
    }

    let industry_tokens = tokens(industry, INDUSTRY_SEPARATORS, INDUSTRY_MIN_TOKEN);
    whitelist
        .iter()
        .find(|entry| {
            let entry_tokens = tokens(entry, INDUSTRY_SEPARATORS, INDUSTRY_MIN_TOKEN);
            industry_tokens.iter().any(|a| {
                entry_tokens.iter().any(|b| {
                    a.contains(b.as_str())
                        || b.contains(a.as_str())
                        || shares_prefix(a, b, TOKEN_PREFIX_LEN)
                })
            })
        })
        .map(|entry| (entry.as_str(), IndustryMatchKind::Token))
}

/// Configured entries (in configuration order) matched by any requested feature.
pub fn matched_entries<'a>(features: &[String], entries: &'a [String]) -> Vec<&'a str> {
    let mut seen = Vec::<String>::new();
    entries
        .iter()
        .filter(|entry| features.iter().any(|f| contains_either(f, entry)))
        .filter(|entry| {
            let key = normalize(entry);
            if seen.contains(&key) {
                false
            } else {
                seen.push(key);
                true
            }
        })
        .map(String::as_str)
        .collect()
}
