//! Persona recommendation: which job titles to target at an account.
//!
//! Sources in priority order: a signal override chain, an industry table,
//! then headcount bands. The first non-empty source wins; headcount-band
//! titles also pad out industry lists.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::signals::bag::{is_truthy, object_number, object_str, TriggerBag};
use crate::signals::classify::{
    months_ago, open_roles_60d, role_change_days, role_change_text, DAYS_AGO_KEYS, FUNDING_KEYS,
    HR_KEYWORDS, ROLE_CHANGE_KEYS,
};
use crate::triggers::industry_vertical;
use crate::util::contains_any_keyword;

const MAX_PERSONAS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaRecommendation {
    pub primary: String,
    pub alternates: Vec<String>,
}

/// A recent HR leadership change, as far as persona targeting cares.
#[derive(Debug, Clone, PartialEq)]
pub struct HrChange {
    pub days_ago: f64,
    pub new_title: Option<String>,
}

/// Signals the override chain reads, extracted best-effort from a bag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonaSignals {
    pub funding_days_ago: Option<f64>,
    pub carrier_change: bool,
    pub hr_change: Option<HrChange>,
    pub jobs_60d: Option<f64>,
}

impl PersonaSignals {
    pub fn from_bag(bag: &TriggerBag) -> Self {
        let funding_days_ago = bag.first_of(FUNDING_KEYS).and_then(days_ago);

        let carrier_change = bag
            .first_of(&["carrier_change", "carrierChange"])
            .map(is_truthy)
            .unwrap_or(false);

        Self {
            funding_days_ago,
            carrier_change,
            hr_change: hr_change_from_bag(bag),
            jobs_60d: open_roles_60d(bag),
        }
    }
}

/// Days since a dated signal object: a day field, else months * 30.
fn days_ago(value: &Value) -> Option<f64> {
    object_number(value, DAYS_AGO_KEYS)
        .or_else(|| object_number(value, &["days_since"]))
        .or_else(|| months_ago(value).map(|m| m * 30.0))
}

/// Freshest HR change: an explicit `hr_change` object, else an HR-matching
/// role-change entry.
fn hr_change_from_bag(bag: &TriggerBag) -> Option<HrChange> {
    if let Some(explicit) = bag.first_of(&["hr_change", "hrChange"]) {
        if let Some(days) = days_ago(explicit) {
            return Some(HrChange {
                days_ago: days.max(0.0),
                new_title: object_str(explicit, &["new_title", "newTitle", "title"])
                    .map(str::to_string),
            });
        }
    }

    bag.entries(ROLE_CHANGE_KEYS)
        .into_iter()
        .filter_map(|entry: &Value| {
            let text = role_change_text(entry)?;
            if !contains_any_keyword(&text, HR_KEYWORDS) {
                return None;
            }
            Some(HrChange {
                days_ago: role_change_days(entry)?,
                new_title: object_str(entry, &["new_title", "title"]).map(str::to_string),
            })
        })
        .min_by(|a, b| {
            a.days_ago
                .partial_cmp(&b.days_ago)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// One link of the override chain.
pub struct PersonaRule {
    pub name: &'static str,
    pub pick: fn(&PersonaSignals) -> Option<Vec<String>>,
}

fn titles(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Evaluated top to bottom; only the first rule that picks applies.
pub const SIGNAL_RULES: &[PersonaRule] = &[
    PersonaRule {
        name: "funding_or_carrier_change",
        pick: |s| {
            let funded = s.funding_days_ago.map(|d| d <= 90.0).unwrap_or(false);
            (funded || s.carrier_change).then(|| titles(&["CFO", "VP People"]))
        },
    },
    PersonaRule {
        name: "hr_leadership_change",
        pick: |s| {
            let change = s.hr_change.as_ref().filter(|c| c.days_ago <= 60.0)?;
            Some(match &change.new_title {
                Some(title) => vec![title.clone()],
                None => titles(&["HR Director"]),
            })
        },
    },
    PersonaRule {
        name: "heavy_hiring",
        pick: |s| {
            s.jobs_60d
                .filter(|n| *n >= 10.0)
                .map(|_| titles(&["HR Director", "Recruiting Lead"]))
        },
    },
];

const INDUSTRY_PERSONAS: &[(&str, &[&str])] = &[
    ("tech_pst", &["VP People", "Head of Talent", "CFO"]),
    ("healthcare", &["HR Director", "Practice Administrator", "CFO"]),
    ("manufacturing", &["HR Manager", "Plant Controller", "VP Operations"]),
    ("construction", &["Controller", "HR Manager", "Owner"]),
    ("nonprofit", &["Executive Director", "Finance Director", "HR Manager"]),
    ("financial_services", &["CHRO", "CFO", "Benefits Manager"]),
    ("retail_hospitality", &["HR Director", "Director of Operations", "CFO"]),
    ("education", &["HR Director", "Business Manager", "Head of School"]),
];

fn size_band_personas(employee_count: Option<i64>) -> &'static [&'static str] {
    match employee_count {
        Some(n) if n < 50 => &["CEO", "Office Manager", "Controller"],
        Some(n) if n < 75 => &["CFO", "HR Manager", "CEO"],
        Some(n) if n >= 150 => &["VP People", "CHRO", "Benefits Manager"],
        // 75–149 and unknown headcount share the mid-size band.
        _ => &["HR Director", "CFO", "VP Operations"],
    }
}

/// `industry` is a vertical key or an account's free-text industry.
fn industry_personas(industry: Option<&str>) -> Option<&'static [&'static str]> {
    let key = industry_vertical(industry)?;
    INDUSTRY_PERSONAS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, list)| *list)
}

/// The override rule that fires for `signals`, if any.
pub fn matching_signal_rule(signals: &PersonaSignals) -> Option<(&'static str, Vec<String>)> {
    SIGNAL_RULES
        .iter()
        .find_map(|rule| (rule.pick)(signals).map(|list| (rule.name, list)))
}

fn candidate_list(
    employee_count: Option<i64>,
    industry_key: Option<&str>,
    signals: &PersonaSignals,
) -> Vec<String> {
    if let Some((_, list)) = matching_signal_rule(signals).filter(|(_, l)| !l.is_empty()) {
        return list;
    }
    let band = size_band_personas(employee_count);
    match industry_personas(industry_key) {
        Some(industry) => industry.iter().chain(band.iter()).map(|s| s.to_string()).collect(),
        None => band.iter().map(|s| s.to_string()).collect(),
    }
}

/// Recommend up to three distinct job titles to target.
pub fn recommend_persona(
    employee_count: Option<i64>,
    industry_key: Option<&str>,
    signals: &TriggerBag,
) -> PersonaRecommendation {
    let persona_signals = PersonaSignals::from_bag(signals);
    let mut distinct: Vec<String> = Vec::new();
    for title in candidate_list(employee_count, industry_key, &persona_signals) {
        let title = title.trim().to_string();
        if title.is_empty() || distinct.iter().any(|t| t.eq_ignore_ascii_case(&title)) {
            continue;
        }
        distinct.push(title);
        if distinct.len() == MAX_PERSONAS {
            break;
        }
    }

    let mut iter = distinct.into_iter();
    // The size band is never empty, so there is always a primary.
    let primary = iter.next().unwrap_or_default();
    PersonaRecommendation {
        primary,
        alternates: iter.collect(),
    }
}
