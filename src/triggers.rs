//! Outreach trigger inference and merging.
//!
//! Baseline triggers are derived from role, industry, headcount, region and
//! domain using additive rule tables: every matching rule contributes its
//! tags. Trigger lists are bounded (`TRIGGER_CAP`) because they feed outreach
//! copy, unlike tags which are unbounded labels (see `identity::merge_tags`).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::region::{region_tier, RegionTier};
use crate::util::contains_any_keyword;

/// Maximum triggers kept on a contact or lead.
pub const TRIGGER_CAP: usize = 12;

/// Returned when no rule matches. The engine never returns zero triggers.
pub const FALLBACK_TRIGGER: &str = "plan optimization";

/// Keyword table entry: any keyword matching contributes all tags.
struct TagRule {
    keywords: &'static [&'static str],
    tags: &'static [&'static str],
}

const ROLE_RULES: &[TagRule] = &[
    TagRule {
        keywords: &["cfo", "finance", "controller", "treasurer", "accounting"],
        tags: &["cost control", "budget predictability", "renewal cost review"],
    },
    TagRule {
        keywords: &["hr", "human resources", "people", "talent", "chro", "benefits"],
        tags: &["employee retention", "benefits competitiveness", "open enrollment support"],
    },
    TagRule {
        keywords: &["ceo", "founder", "co-founder", "owner", "president"],
        tags: &["strategic growth", "total rewards strategy"],
    },
    TagRule {
        keywords: &["coo", "operations", "ops"],
        tags: &["operational efficiency", "admin burden reduction"],
    },
];

/// Industry keyword table. `vertical` is the key persona targeting uses.
struct IndustryRule {
    vertical: &'static str,
    keywords: &'static [&'static str],
    tags: &'static [&'static str],
}

const INDUSTRY_RULES: &[IndustryRule] = &[
    IndustryRule {
        vertical: "tech_pst",
        keywords: &["tech", "technology", "software", "saas", "it services"],
        tags: &["talent competition", "equity-heavy compensation"],
    },
    IndustryRule {
        vertical: "healthcare",
        keywords: &["healthcare", "health", "medical", "clinic", "hospital"],
        tags: &["clinical staff retention", "compliance pressure", "shift workforce benefits"],
    },
    IndustryRule {
        vertical: "manufacturing",
        keywords: &["manufacturing", "industrial", "fabrication"],
        tags: &["workforce safety", "hourly workforce benefits"],
    },
    IndustryRule {
        vertical: "construction",
        keywords: &["construction", "contractor", "trades"],
        tags: &["field workforce benefits", "seasonal headcount"],
    },
    IndustryRule {
        vertical: "tech_pst",
        keywords: &["professional services", "consulting", "legal", "law", "accounting"],
        tags: &["talent retention", "billable staff benefits"],
    },
    IndustryRule {
        vertical: "nonprofit",
        keywords: &["nonprofit", "non-profit", "charity", "foundation"],
        tags: &["budget-constrained benefits", "mission-driven retention"],
    },
    IndustryRule {
        vertical: "financial_services",
        keywords: &["financial services", "banking", "bank", "insurance", "fintech"],
        tags: &["regulatory pressure", "talent competition"],
    },
    IndustryRule {
        vertical: "retail_hospitality",
        keywords: &["retail", "hospitality", "restaurant", "food service"],
        tags: &["high turnover", "part-time eligibility"],
    },
    IndustryRule {
        vertical: "education",
        keywords: &["education", "school", "university", "college", "academy"],
        tags: &["academic calendar staffing", "budget-constrained benefits"],
    },
];

/// Headcount bands: inclusive lower bound, inclusive upper bound, tags.
const SIZE_BANDS: &[(i64, i64, &[&str])] = &[
    (20, 249, &["scaling benefits program", "broker review"]),
    (250, 1000, &["aca compliance", "self-funding evaluation"]),
    (1001, i64::MAX, &["enterprise benefits strategy"]),
];

const MASSACHUSETTS_TAGS: &[&str] = &["massachusetts pfml", "local market expertise"];

const NEW_ENGLAND_TAGS: &[&str] = &["new england market"];

const NONPROFIT_DOMAIN_TAG: &str = "budget-constrained benefits";

fn lowered(text: Option<&str>) -> Option<String> {
    text.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty())
}

fn rule_tags(text: Option<&str>, rules: &[TagRule]) -> Vec<&'static str> {
    let Some(text) = lowered(text) else {
        return Vec::new();
    };
    rules
        .iter()
        .filter(|rule| contains_any_keyword(&text, rule.keywords))
        .flat_map(|rule| rule.tags.iter().copied())
        .collect()
}

fn industry_tags(industry: Option<&str>) -> Vec<&'static str> {
    let Some(text) = lowered(industry) else {
        return Vec::new();
    };
    INDUSTRY_RULES
        .iter()
        .filter(|rule| contains_any_keyword(&text, rule.keywords))
        .flat_map(|rule| rule.tags.iter().copied())
        .collect()
}

/// Vertical key for an industry: the key itself when already given one,
/// else the first industry rule whose keywords match the free text.
pub fn industry_vertical(industry: Option<&str>) -> Option<&'static str> {
    let text = lowered(industry)?;
    INDUSTRY_RULES
        .iter()
        .find(|rule| rule.vertical == text)
        .or_else(|| {
            INDUSTRY_RULES
                .iter()
                .find(|rule| contains_any_keyword(&text, rule.keywords))
        })
        .map(|rule| rule.vertical)
}

fn size_tags(employee_count: Option<i64>) -> Vec<&'static str> {
    let count = match employee_count {
        Some(c) => c,
        None => return Vec::new(),
    };
    SIZE_BANDS
        .iter()
        .filter(|(lo, hi, _)| count >= *lo && count <= *hi)
        .flat_map(|(_, _, tags)| tags.iter().copied())
        .collect()
}

fn region_tags(region: Option<&str>) -> Vec<&'static str> {
    match region_tier(region) {
        Some(RegionTier::Massachusetts) => MASSACHUSETTS_TAGS.to_vec(),
        Some(RegionTier::NewEngland) => NEW_ENGLAND_TAGS.to_vec(),
        Some(RegionTier::Elsewhere) | None => Vec::new(),
    }
}

fn domain_tags(domain: Option<&str>) -> Vec<&'static str> {
    let domain = domain.map(|d| d.trim().to_lowercase()).unwrap_or_default();
    let host = domain
        .trim_end_matches('/')
        .split('/')
        .find(|part| part.contains('.'))
        .unwrap_or("");
    if host.ends_with(".org") {
        vec![NONPROFIT_DOMAIN_TAG]
    } else {
        Vec::new()
    }
}

/// Derive baseline outreach triggers for a contact/company.
///
/// Rules are additive. If nothing matches, returns exactly
/// `["plan optimization"]`.
pub fn infer_baseline_triggers(
    role_title: Option<&str>,
    industry: Option<&str>,
    employee_count: Option<i64>,
    region: Option<&str>,
    domain: Option<&str>,
) -> Vec<String> {
    let mut tags: Vec<&str> = Vec::new();
    tags.extend(rule_tags(role_title, ROLE_RULES));
    tags.extend(industry_tags(industry));
    tags.extend(size_tags(employee_count));
    tags.extend(region_tags(region));
    tags.extend(domain_tags(domain));

    let normalized = normalize_triggers(tags);
    if normalized.is_empty() {
        vec![FALLBACK_TRIGGER.to_string()]
    } else {
        normalized
    }
}

/// Lowercase, trim, drop blanks and dedupe, keeping first-seen order.
pub fn normalize_triggers<I, S>(triggers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for t in triggers {
        let t = t.as_ref().trim().to_lowercase();
        if t.is_empty() {
            continue;
        }
        if seen.insert(t.clone()) {
            out.push(t);
        }
    }
    out
}

/// Which side of a merge survives when the union exceeds the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapPriority {
    /// Keep the first `TRIGGER_CAP` members in union order.
    #[default]
    Insertion,
    /// Keep every member of the new sets first, then fill from `existing`.
    Newest,
}

/// Union of `existing` and every new set, truncated to the first
/// `TRIGGER_CAP` members in union order.
///
/// Callers that need new triggers to survive the cap should use
/// `merge_trigger_sets_with(.., CapPriority::Newest)`.
pub fn merge_trigger_sets(existing: &[String], new_sets: &[&[String]]) -> Vec<String> {
    merge_trigger_sets_with(existing, new_sets, CapPriority::Insertion)
}

pub fn merge_trigger_sets_with(
    existing: &[String],
    new_sets: &[&[String]],
    priority: CapPriority,
) -> Vec<String> {
    let old = normalize_triggers(existing);
    let incoming = normalize_triggers(new_sets.iter().flat_map(|set| set.iter()));
    let union = normalize_triggers(old.iter().chain(incoming.iter()));

    if union.len() <= TRIGGER_CAP {
        return union;
    }

    match priority {
        CapPriority::Insertion => union.into_iter().take(TRIGGER_CAP).collect(),
        CapPriority::Newest => {
            let mut keep: HashSet<&str> = incoming
                .iter()
                .take(TRIGGER_CAP)
                .map(String::as_str)
                .collect();
            for t in &old {
                if keep.len() >= TRIGGER_CAP {
                    break;
                }
                keep.insert(t.as_str());
            }
            union
                .iter()
                .filter(|t| keep.contains(t.as_str()))
                .cloned()
                .collect()
        }
    }
}

/// Whether a trigger was entered by a person or inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Manual,
    Auto,
}

/// Whether a trigger label comes from the built-in catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerCategory {
    Standard,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutreachTrigger {
    pub label: String,
    pub source: TriggerSource,
    pub category: TriggerCategory,
}

/// Whether `label` is one of the tags this module can infer.
pub fn is_standard_trigger(label: &str) -> bool {
    let label = label.trim().to_lowercase();
    if label == FALLBACK_TRIGGER || label == NONPROFIT_DOMAIN_TAG {
        return true;
    }
    let in_rules = |rules: &[TagRule]| rules.iter().any(|r| r.tags.contains(&label.as_str()));
    in_rules(ROLE_RULES)
        || INDUSTRY_RULES.iter().any(|r| r.tags.contains(&label.as_str()))
        || SIZE_BANDS.iter().any(|(_, _, tags)| tags.contains(&label.as_str()))
        || MASSACHUSETTS_TAGS.contains(&label.as_str())
        || NEW_ENGLAND_TAGS.contains(&label.as_str())
}

impl OutreachTrigger {
    fn new(label: &str, source: TriggerSource) -> Self {
        let label = label.trim().to_lowercase();
        let category = if is_standard_trigger(&label) {
            TriggerCategory::Standard
        } else {
            TriggerCategory::Custom
        };
        Self {
            label,
            source,
            category,
        }
    }

    pub fn auto(label: &str) -> Self {
        Self::new(label, TriggerSource::Auto)
    }

    pub fn manual(label: &str) -> Self {
        Self::new(label, TriggerSource::Manual)
    }
}

/// Merge trigger lists newest first, dedupe on label, cap at `TRIGGER_CAP`.
///
/// A manual trigger is never demoted: if the same label appears as auto in
/// `incoming` and manual in `existing`, the kept entry is manual.
pub fn merge_outreach_triggers(
    existing: &[OutreachTrigger],
    incoming: &[OutreachTrigger],
) -> Vec<OutreachTrigger> {
    let mut out: Vec<OutreachTrigger> = Vec::new();
    for trigger in incoming.iter().chain(existing.iter()) {
        let label = trigger.label.trim().to_lowercase();
        if label.is_empty() {
            continue;
        }
        if let Some(kept) = out.iter_mut().find(|t| t.label == label) {
            if trigger.source == TriggerSource::Manual {
                kept.source = TriggerSource::Manual;
            }
            continue;
        }
        out.push(OutreachTrigger {
            label,
            source: trigger.source,
            category: trigger.category,
        });
    }
    out.truncate(TRIGGER_CAP);
    out
}
