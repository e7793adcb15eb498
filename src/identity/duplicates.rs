//! Duplicate detection across import sources.
//!
//! Companies are compared on their canonical names (exact, then trigram
//! similarity). Contacts without a shared match key are compared pairwise on
//! names within the same email domain.

use std::collections::BTreeMap;

use serde::Serialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::keys::{canonical_company_name, fuzzy_match, MatchKey};
use crate::util::email_domain;

/// Minimum Jaro-Winkler similarity for two full names to be "similar".
const NAME_SIMILARITY_THRESHOLD: f64 = 0.92;

#[derive(Debug, Clone)]
pub struct CompanyName {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDuplicate {
    pub company1_id: String,
    pub company1_name: String,
    pub company2_id: String,
    pub company2_name: String,
    pub confidence: f64,
    pub reason: String,
}

/// Best match for `name` among `candidates`, at or above `threshold`.
///
/// An exact canonical match scores 1.0. Candidates whose canonical name is
/// empty are never matched.
pub fn best_company_match<'a>(
    name: &str,
    candidates: &'a [CompanyName],
    threshold: f64,
) -> Option<(&'a CompanyName, f64)> {
    let canonical = canonical_company_name(name);
    if canonical.is_empty() {
        return None;
    }
    candidates
        .iter()
        .filter_map(|c| {
            let other = canonical_company_name(&c.name);
            if other.is_empty() {
                return None;
            }
            let score = fuzzy_match(&canonical, &other);
            (score >= threshold).then_some((c, score))
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

/// Pairwise duplicate candidates among `companies`, sorted by confidence.
pub fn find_company_duplicates(companies: &[CompanyName], threshold: f64) -> Vec<CompanyDuplicate> {
    let canonical: Vec<String> = companies
        .iter()
        .map(|c| canonical_company_name(&c.name))
        .collect();

    let mut candidates = Vec::new();
    for i in 0..companies.len() {
        if canonical[i].is_empty() {
            continue;
        }
        for j in (i + 1)..companies.len() {
            if canonical[j].is_empty() {
                continue;
            }
            let confidence = fuzzy_match(&canonical[i], &canonical[j]);
            if confidence < threshold {
                continue;
            }
            let reason = if confidence >= 1.0 {
                format!("Same canonical name \"{}\"", canonical[i])
            } else {
                format!("Similar names: \"{}\" ~ \"{}\"", canonical[i], canonical[j])
            };
            candidates.push(CompanyDuplicate {
                company1_id: companies[i].id.clone(),
                company1_name: companies[i].name.clone(),
                company2_id: companies[j].id.clone(),
                company2_name: companies[j].name.clone(),
                confidence,
                reason,
            });
        }
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    candidates
}

#[derive(Debug, Clone)]
pub struct ContactName {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDuplicate {
    pub contact1_id: String,
    pub contact1_name: String,
    pub contact2_id: String,
    pub contact2_name: String,
    pub confidence: f32,
    pub reason: String,
}

/// A name folded for comparison: lowercase, accents and punctuation
/// dropped. `last` is everything after the first word.
#[derive(Debug, Clone, PartialEq)]
struct PersonName {
    first: String,
    last: String,
}

impl PersonName {
    /// `None` for blank names and for email addresses used as names.
    fn parse(name: &str) -> Option<Self> {
        if name.contains('@') {
            return None;
        }
        let folded: String = name
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .filter(|c| c.is_alphanumeric() || c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        let mut words = folded.split_whitespace();
        let first = words.next()?.to_string();
        let last = words.collect::<Vec<_>>().join(" ");
        Some(Self { first, last })
    }

    fn full(&self) -> String {
        if self.last.is_empty() {
            self.first.clone()
        } else {
            format!("{} {}", self.first, self.last)
        }
    }

    fn last_initial(&self) -> Option<char> {
        self.last.chars().next()
    }
}

struct NameTier {
    reason: &'static str,
    confidence: f32,
    matches: fn(&PersonName, &PersonName) -> bool,
}

/// Strongest first; a pair takes the first tier it meets.
const NAME_TIERS: &[NameTier] = &[
    NameTier {
        reason: "Exact name match",
        confidence: 0.95,
        matches: |a, b| a == b,
    },
    NameTier {
        reason: "Same first name and last initial",
        confidence: 0.70,
        matches: |a, b| {
            a.first == b.first && a.last_initial().is_some() && a.last_initial() == b.last_initial()
        },
    },
    NameTier {
        reason: "Similar names",
        confidence: 0.60,
        matches: |a, b| {
            !a.last.is_empty()
                && !b.last.is_empty()
                && strsim::jaro_winkler(&a.full(), &b.full()) >= NAME_SIMILARITY_THRESHOLD
        },
    },
    NameTier {
        reason: "Same last name on same domain",
        confidence: 0.40,
        matches: |a, b| a.last.chars().count() >= 3 && a.last == b.last,
    },
];

fn name_similarity(name1: &str, name2: &str) -> Option<(f32, String)> {
    let a = PersonName::parse(name1)?;
    let b = PersonName::parse(name2)?;
    let tier = NAME_TIERS.iter().find(|tier| (tier.matches)(&a, &b))?;
    Some((
        tier.confidence,
        format!("{}: \"{}\" ~ \"{}\"", tier.reason, a.full(), b.full()),
    ))
}

/// Flag likely duplicate contacts that import under different emails.
///
/// Contacts sharing an email domain are compared pairwise on folded names
/// (see `NAME_TIERS`). Two rows with the same email match key are the same
/// contact and are not flagged.
pub fn detect_duplicate_contacts(contacts: &[ContactName]) -> Vec<ContactDuplicate> {
    let mut by_domain: BTreeMap<String, Vec<(&ContactName, Option<MatchKey>)>> = BTreeMap::new();
    for contact in contacts {
        let domain = email_domain(&contact.email);
        if !domain.is_empty() {
            by_domain
                .entry(domain)
                .or_default()
                .push((contact, MatchKey::parse(&contact.email)));
        }
    }

    let mut candidates = Vec::new();
    for group in by_domain.values() {
        for (i, (c1, key1)) in group.iter().enumerate() {
            for (c2, key2) in &group[i + 1..] {
                if key1.is_some() && key1 == key2 {
                    continue;
                }
                let Some((confidence, reason)) = name_similarity(&c1.name, &c2.name) else {
                    continue;
                };
                candidates.push(ContactDuplicate {
                    contact1_id: c1.id.clone(),
                    contact1_name: c1.name.clone(),
                    contact2_id: c2.id.clone(),
                    contact2_name: c2.name.clone(),
                    confidence,
                    reason,
                });
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.contact1_id.cmp(&b.contact1_id))
    });
    candidates
}
