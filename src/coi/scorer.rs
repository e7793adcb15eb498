//! COI (Center of Influence) scoring.
//!
//! Four components, summed and capped at 100:
//! - Category relevance (10–40): firm type against referral-category tables
//! - Regional activity (15–45): Massachusetts > rest of New England > elsewhere
//! - Warmth (pluggable, default 8): relationship strength
//! - Contactability (2–10): channels available on the best contact

use serde::{Deserialize, Serialize};

use crate::region::{is_massachusetts, region_tier, RegionTier};

pub const MAX_SCORE: u32 = 100;
pub const DEFAULT_WARMTH: u32 = 8;

/// Firm types that refer benefits business directly.
const PRIMARY_CATEGORIES: &[(&str, u32)] = &[
    ("accountant", 40),
    ("cpa", 40),
    ("accounting", 38),
    ("benefits attorney", 38),
    ("employment attorney", 37),
    ("attorney", 36),
    ("law firm", 36),
    ("legal", 35),
    ("payroll", 35),
];

/// Adjacent advisors: worth knowing, weaker referral paths.
const SECONDARY_CATEGORIES: &[(&str, u32)] = &[
    ("bank", 28),
    ("wealth", 26),
    ("financial advisor", 26),
    ("financial planner", 25),
    ("insurance", 24),
    ("professional employer", 22),
    ("hr consult", 22),
    ("consult", 20),
];

const UNMATCHED_CATEGORY: u32 = 15;
const UNKNOWN_CATEGORY: u32 = 10;

const MASSACHUSETTS_SCORE: u32 = 45;
const NEW_ENGLAND_SCORE: u32 = 35;
const OTHER_REGION_SCORE: u32 = 15;

const CONTACT_BASE: u32 = 2;
const CONTACT_CAP: u32 = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoiContact {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoiRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub firm_type: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub contacts: Vec<CoiContact>,
}

/// Per-component breakdown of a COI score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoiReason {
    pub category_relevance: u32,
    pub regional_activity: u32,
    pub warmth: u32,
    pub contactability: u32,
}

impl CoiReason {
    pub fn total(&self) -> u32 {
        [self.regional_activity, self.warmth, self.contactability]
            .iter()
            .fold(self.category_relevance, |sum, part| sum.saturating_add(*part))
            .min(MAX_SCORE)
    }
}

#[derive(Debug, Clone)]
pub struct ScoredCoi {
    pub record: CoiRecord,
    pub score: u32,
    pub reason: CoiReason,
    pub best_contact: Option<CoiContact>,
    pub in_massachusetts: bool,
}

/// Relationship warmth for a partner firm.
///
/// The default is a constant until a relationship graph exists to feed it.
pub trait WarmthScorer: Send + Sync {
    fn warmth(&self, record: &CoiRecord) -> u32;
}

#[derive(Debug, Clone, Copy)]
pub struct DefaultWarmth {
    pub value: u32,
}

impl Default for DefaultWarmth {
    fn default() -> Self {
        Self {
            value: DEFAULT_WARMTH,
        }
    }
}

impl WarmthScorer for DefaultWarmth {
    fn warmth(&self, _record: &CoiRecord) -> u32 {
        self.value
    }
}

fn blank(field: &Option<String>) -> bool {
    field.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}

fn best_in_table(firm_type: &str, table: &[(&str, u32)]) -> Option<u32> {
    table
        .iter()
        .filter(|(needle, _)| firm_type.contains(needle))
        .map(|(_, score)| *score)
        .max()
}

pub fn category_relevance(firm_type: Option<&str>) -> u32 {
    let firm_type = match firm_type.map(|f| f.trim().to_lowercase()) {
        Some(f) if !f.is_empty() => f,
        _ => return UNKNOWN_CATEGORY,
    };
    best_in_table(&firm_type, PRIMARY_CATEGORIES)
        .or_else(|| best_in_table(&firm_type, SECONDARY_CATEGORIES))
        .unwrap_or(UNMATCHED_CATEGORY)
}

pub fn is_massachusetts_region(region: Option<&str>) -> bool {
    is_massachusetts(region)
}

pub fn regional_activity(region: Option<&str>) -> u32 {
    match region_tier(region) {
        Some(RegionTier::Massachusetts) => MASSACHUSETTS_SCORE,
        Some(RegionTier::NewEngland) => NEW_ENGLAND_SCORE,
        Some(RegionTier::Elsewhere) | None => OTHER_REGION_SCORE,
    }
}

pub fn contactability(contact: Option<&CoiContact>) -> u32 {
    let mut points = CONTACT_BASE;
    if let Some(c) = contact {
        if !blank(&c.email) {
            points += 3;
        }
        if !blank(&c.phone) {
            points += 2;
        }
        if !blank(&c.linkedin_url) {
            points += 2;
        }
        if !blank(&c.title) {
            points += 1;
        }
    }
    points.min(CONTACT_CAP)
}

/// The contact with the most channels. Earlier contacts win ties.
pub fn best_contact(contacts: &[CoiContact]) -> Option<&CoiContact> {
    contacts.iter().reduce(|best, c| {
        if contactability(Some(c)) > contactability(Some(best)) {
            c
        } else {
            best
        }
    })
}

pub struct CoiScorer {
    warmth: Box<dyn WarmthScorer>,
}

impl Default for CoiScorer {
    fn default() -> Self {
        Self::new(Box::new(DefaultWarmth::default()))
    }
}

impl CoiScorer {
    pub fn new(warmth: Box<dyn WarmthScorer>) -> Self {
        Self { warmth }
    }

    pub fn score(&self, record: &CoiRecord) -> ScoredCoi {
        let best = best_contact(&record.contacts).cloned();
        let reason = CoiReason {
            category_relevance: category_relevance(record.firm_type.as_deref()),
            regional_activity: regional_activity(record.region.as_deref()),
            warmth: self.warmth.warmth(record).min(MAX_SCORE),
            contactability: contactability(best.as_ref()),
        };
        ScoredCoi {
            record: record.clone(),
            score: reason.total(),
            reason,
            best_contact: best,
            in_massachusetts: is_massachusetts_region(record.region.as_deref()),
        }
    }

    /// Score and rank: score desc, Massachusetts first on ties, then name.
    pub fn rank(&self, records: &[CoiRecord]) -> Vec<ScoredCoi> {
        let mut scored: Vec<ScoredCoi> = records.iter().map(|r| self.score(r)).collect();
        scored.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.in_massachusetts.cmp(&a.in_massachusetts))
                .then_with(|| a.record.name.cmp(&b.record.name))
        });
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, firm_type: Option<&str>, region: Option<&str>) -> CoiRecord {
        CoiRecord {
            id: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            firm_type: firm_type.map(str::to_string),
            region: region.map(str::to_string),
            contacts: Vec::new(),
        }
    }

    fn full_contact() -> CoiContact {
        CoiContact {
            name: Some("Pat Lee".into()),
            email: Some("pat@firm.com".into()),
            phone: Some("617-555-0100".into()),
            linkedin_url: Some("https://linkedin.com/in/patlee".into()),
            title: None,
        }
    }

    #[test]
    fn total_saturates_at_max_score() {
        let reason = CoiReason {
            category_relevance: 40,
            regional_activity: 45,
            warmth: u32::MAX,
            contactability: u32::MAX,
        };
        assert_eq!(reason.total(), MAX_SCORE);

        let scorer = CoiScorer::new(Box::new(DefaultWarmth { value: u32::MAX }));
        let r = record("Lee & Co CPAs", Some("CPA"), Some("Boston, MA"));
        let scored = scorer.score(&r);
        assert_eq!(scored.reason.warmth, MAX_SCORE);
        assert_eq!(scored.score, MAX_SCORE);
    }

    #[test]
    fn accountant_in_boston_caps_at_100() {
        let mut r = record("Lee & Co CPAs", Some("Certified Public Accountant"), Some("Boston, MA"));
        r.contacts.push(full_contact());
        let scored = CoiScorer::default().score(&r);
        assert_eq!(scored.reason.category_relevance, 40);
        assert_eq!(scored.reason.regional_activity, 45);
        assert_eq!(scored.reason.warmth, 8);
        assert_eq!(scored.reason.contactability, 9);
        assert_eq!(scored.score, 100);
        assert!(scored.in_massachusetts);
    }

    #[test]
    fn category_tables() {
        assert_eq!(category_relevance(Some("Employment Attorney")), 37);
        assert_eq!(category_relevance(Some("Community Bank")), 28);
        assert_eq!(category_relevance(Some("HR Consulting")), 22);
        assert_eq!(category_relevance(Some("Architect")), 15);
        assert_eq!(category_relevance(Some("  ")), 10);
        assert_eq!(category_relevance(None), 10);
    }

    #[test]
    fn region_tiers() {
        assert_eq!(regional_activity(Some("Worcester, Massachusetts")), 45);
        assert_eq!(regional_activity(Some("Hartford, CT")), 35);
        assert_eq!(regional_activity(Some("Manchester, NH")), 35);
        assert_eq!(regional_activity(Some("Austin, TX")), 15);
        assert_eq!(regional_activity(None), 15);
    }

    #[test]
    fn contactability_is_capped() {
        let mut c = full_contact();
        c.title = Some("Partner".into());
        assert_eq!(contactability(Some(&c)), 10);
        assert_eq!(contactability(None), 2);
        assert_eq!(contactability(Some(&CoiContact::default())), 2);
    }

    #[test]
    fn best_contact_has_most_channels() {
        let weak = CoiContact {
            title: Some("Partner".into()),
            ..Default::default()
        };
        let contacts = vec![weak, full_contact()];
        assert_eq!(best_contact(&contacts).and_then(|c| c.name.as_deref()), Some("Pat Lee"));
        assert!(best_contact(&[]).is_none());
    }

    #[test]
    fn ranks_by_score_then_name() {
        let records = vec![
            record("Alpha Advisors", Some("Bank"), Some("Hartford, CT")),
            record("Zeta Bank", Some("Bank"), Some("Boston, MA")),
            record("Beta Bank", Some("Bank"), Some("Providence, RI")),
        ];
        let ranked = CoiScorer::default().rank(&records);
        assert_eq!(ranked[0].record.name, "Zeta Bank");
        assert_eq!(ranked[1].record.name, "Alpha Advisors");
        assert_eq!(ranked[2].record.name, "Beta Bank");
    }

    #[test]
    fn equal_scores_break_on_massachusetts() {
        struct Flat;
        impl WarmthScorer for Flat {
            fn warmth(&self, r: &CoiRecord) -> u32 {
                // Offsets the regional gap so both firms land on the same score.
                if is_massachusetts_region(r.region.as_deref()) {
                    0
                } else {
                    10
                }
            }
        }
        let records = vec![
            record("Aaron CPA", Some("CPA"), Some("Hartford, CT")),
            record("Zoe CPA", Some("CPA"), Some("Boston, MA")),
        ];
        let ranked = CoiScorer::new(Box::new(Flat)).rank(&records);
        assert_eq!(ranked[0].score, ranked[1].score);
        assert_eq!(ranked[0].record.name, "Zoe CPA");
    }

    #[test]
    fn warmth_is_pluggable() {
        struct Warm;
        impl WarmthScorer for Warm {
            fn warmth(&self, _r: &CoiRecord) -> u32 {
                20
            }
        }
        let r = record("Firm", Some("Bank"), None);
        assert_eq!(CoiScorer::new(Box::new(Warm)).score(&r).reason.warmth, 20);
        assert_eq!(CoiScorer::default().score(&r).reason.warmth, DEFAULT_WARMTH);
    }
}
