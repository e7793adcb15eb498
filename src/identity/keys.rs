//! Match keys, canonical company names and trigram similarity.
//!
//! Nothing in here raises. An unresolvable identity comes back as a key the
//! caller must check with `is_valid_match_key` (or `MatchKey::parse`) before
//! deduplicating or persisting on it.

use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const EMAIL_KEYS: &[&str] = &["email", "email_address", "emailAddress", "work_email", "Email"];
pub const FIRST_NAME_KEYS: &[&str] = &["first_name", "firstName", "first"];
pub const LAST_NAME_KEYS: &[&str] = &["last_name", "lastName", "last"];
pub const DOMAIN_KEYS: &[&str] = &["domain", "company_domain", "website"];

/// The key produced when neither an email nor name/domain parts exist.
pub const EMPTY_MATCH_KEY: &str = "@";

fn legal_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)[\s,]+(inc|llc|co|corp|ltd|lp|plc|pllc|pc|pa|dba|group|holdings|enterprises)\.?\s*$",
        )
        .unwrap()
    })
}

/// First non-blank string among `keys` in a JSON object.
fn record_str<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a str> {
    let obj = record.as_object()?;
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// A usable email: one `@`-separated local part and domain, no whitespace.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.rsplit_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !local.contains('@'),
        None => false,
    }
}

/// Strip scheme, a leading `www.`, any path and whitespace; lowercase.
///
/// Example: "https://www.Acme.com/about" → "acme.com"
pub fn normalize_domain(raw: &str) -> String {
    let lower: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let without_www = without_scheme.strip_prefix("www.").unwrap_or(without_scheme);
    without_www
        .split(|c: char| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or("")
        .to_string()
}

fn squash_name(part: Option<&str>) -> String {
    part.unwrap_or("")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Build a match key from already-extracted parts. Email wins when valid.
pub fn match_key_from_parts(
    email: Option<&str>,
    first_name: Option<&str>,
    last_name: Option<&str>,
    domain: Option<&str>,
) -> String {
    if let Some(email) = email.filter(|e| is_valid_email(e)) {
        return email.trim().to_lowercase();
    }
    format!(
        "{}{}@{}",
        squash_name(first_name),
        squash_name(last_name),
        normalize_domain(domain.unwrap_or(""))
    )
}

/// Compute the dedup key for an untyped contact record.
///
/// `{"email": "A@B.com"}` → `"a@b.com"`;
/// `{"first_name": "Jane", "last_name": "Doe", "domain": "https://www.Acme.com"}`
/// → `"janedoe@acme.com"`; `{}` → `"@"`.
pub fn normalize_match_key(record: &Value) -> String {
    match_key_from_parts(
        record_str(record, EMAIL_KEYS),
        record_str(record, FIRST_NAME_KEYS),
        record_str(record, LAST_NAME_KEYS),
        record_str(record, DOMAIN_KEYS),
    )
}

/// Whether a key may be used for dedup or persistence.
///
/// Rejects the bare `"@"` and any key with an empty name or domain side,
/// which would otherwise collapse unrelated contacts together.
pub fn is_valid_match_key(key: &str) -> bool {
    let key = key.trim();
    if key.is_empty() || key == EMPTY_MATCH_KEY {
        return false;
    }
    match key.rsplit_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    }
}

/// A match key that has passed `is_valid_match_key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchKey(String);

impl MatchKey {
    pub fn parse(key: &str) -> Option<Self> {
        is_valid_match_key(key).then(|| MatchKey(key.trim().to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute and validate in one step.
pub fn resolve_match_key(record: &Value) -> Option<MatchKey> {
    MatchKey::parse(&normalize_match_key(record))
}

/// Comparison form of a company name. Never shown to users.
///
/// Strips one trailing legal suffix, folds accents, drops punctuation,
/// collapses whitespace and lowercases: "Acme, Inc." and "ACME INC" both
/// become "acme".
pub fn canonical_company_name(name: &str) -> String {
    let trimmed = name.trim();
    let stripped = legal_suffix_re().replacen(trimmed, 1, "");
    let without_suffix: &str = &stripped;
    let folded: String = without_suffix
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn trigrams(s: &str) -> HashSet<String> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Jaccard similarity of character trigram sets, in `[0, 1]`.
///
/// Equal strings are 1. Strings too short to have trigrams only match when
/// equal; the zero-denominator case is handled explicitly.
pub fn fuzzy_match(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let ta = trigrams(a);
    let tb = trigrams(b);
    let union = ta.union(&tb).count();
    if union == 0 {
        return 0.0;
    }
    ta.intersection(&tb).count() as f64 / union as f64
}

/// Set union of tags, existing first. No cap.
pub fn merge_tags(existing: &[String], new: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    existing
        .iter()
        .chain(new.iter())
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_string()))
        .map(str::to_string)
        .collect()
}
