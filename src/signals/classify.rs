//! Signal classification: trigger bag → four independent size tiers.
//!
//! Each classifier reads one family of triggers and returns `None` for
//! anything it cannot interpret. Missing fields, nulls and odd shapes are
//! "no signal", never an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::bag::{is_truthy, object_number, TriggerBag};
use crate::util::contains_any_keyword;

/// Strength tier of a single signal family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSize {
    Small,
    Medium,
    Large,
}

impl SignalSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSize::Small => "small",
            SignalSize::Medium => "medium",
            SignalSize::Large => "large",
        }
    }
}

/// Size tiers for one company. Computed fresh per call, never stored here.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalSizes {
    pub role_change_size: Option<SignalSize>,
    pub hiring_size: Option<SignalSize>,
    pub funding_size: Option<SignalSize>,
    pub exec_change_size: Option<SignalSize>,
}

impl SignalSizes {
    pub fn all(&self) -> [Option<SignalSize>; 4] {
        [
            self.role_change_size,
            self.hiring_size,
            self.funding_size,
            self.exec_change_size,
        ]
    }

    /// Number of fields at exactly `size`.
    pub fn count(&self, size: SignalSize) -> usize {
        self.all().iter().filter(|s| **s == Some(size)).count()
    }
}

pub const ROLE_CHANGE_KEYS: &[&str] = &["role_changes", "role_change", "hr_role_change"];
pub const DAYS_SINCE_KEYS: &[&str] = &["days_since", "days_ago", "daysSince"];
pub const HIRING_KEYS: &[&str] = &["open_roles_60d", "jobs_60d", "open_roles", "hiring_count"];
pub const FUNDING_KEYS: &[&str] = &["funding", "recent_funding"];
pub const EXEC_CHANGE_KEYS: &[&str] = &["exec_change", "executive_change", "leadership_change"];
pub const MONTHS_AGO_KEYS: &[&str] = &["months_ago", "monthsAgo"];
pub const DAYS_AGO_KEYS: &[&str] = &["days_ago", "daysAgo"];

pub const HR_KEYWORDS: &[&str] = &[
    "hr",
    "human resources",
    "people",
    "talent",
    "chro",
    "benefits",
    "total rewards",
];

pub const FINANCE_PAYROLL_KEYWORDS: &[&str] = &[
    "finance",
    "financial",
    "cfo",
    "controller",
    "accounting",
    "payroll",
];

/// A matching role change with no recency value is treated as this old.
const UNDATED_ROLE_CHANGE_DAYS: f64 = 180.0;

/// Classify a primary trigger bag, backed by optional account-level triggers.
pub fn classify_signals(triggers: Option<&Value>, account_triggers: Option<&Value>) -> SignalSizes {
    let primary = TriggerBag::from_value(triggers);
    let secondary = TriggerBag::from_value(account_triggers);
    classify_bag(&primary.merged_with(&secondary))
}

pub fn classify_bag(bag: &TriggerBag) -> SignalSizes {
    SignalSizes {
        role_change_size: role_change_size(bag),
        hiring_size: hiring_size(bag),
        funding_size: funding_size(bag),
        exec_change_size: exec_change_size(bag),
    }
}

/// Lowercased "title department" text of a role-change entry.
pub fn role_change_text(entry: &Value) -> Option<String> {
    let obj = entry.as_object()?;
    let field = |k: &str| obj.get(k).and_then(Value::as_str).unwrap_or("").trim();
    let text = format!("{} {}", field("title"), field("department"))
        .trim()
        .to_lowercase();
    (!text.is_empty()).then_some(text)
}

/// Whether a role-change text concerns HR, Finance or Payroll.
pub fn is_hr_finance_role(text: &str) -> bool {
    contains_any_keyword(text, HR_KEYWORDS) || contains_any_keyword(text, FINANCE_PAYROLL_KEYWORDS)
}

/// Days since a role-change entry, clamped at zero.
pub fn role_change_days(entry: &Value) -> Option<f64> {
    object_number(entry, DAYS_SINCE_KEYS).map(|d| d.max(0.0))
}

pub fn role_change_size(bag: &TriggerBag) -> Option<SignalSize> {
    let freshest = bag
        .entries(ROLE_CHANGE_KEYS)
        .into_iter()
        .filter_map(|entry| {
            let text = role_change_text(entry)?;
            if !is_hr_finance_role(&text) {
                return None;
            }
            Some(role_change_days(entry).unwrap_or(UNDATED_ROLE_CHANGE_DAYS))
        })
        .fold(None, |min: Option<f64>, d| Some(min.map_or(d, |m| m.min(d))))?;

    if freshest <= 14.0 {
        Some(SignalSize::Large)
    } else if freshest <= 60.0 {
        Some(SignalSize::Medium)
    } else if freshest <= 180.0 {
        Some(SignalSize::Small)
    } else {
        None
    }
}

/// Open roles in the last 60 days, from the first present alias.
pub fn open_roles_60d(bag: &TriggerBag) -> Option<f64> {
    bag.number(HIRING_KEYS)
}

pub fn hiring_size(bag: &TriggerBag) -> Option<SignalSize> {
    let count = open_roles_60d(bag)?;
    if count >= 10.0 {
        Some(SignalSize::Large)
    } else if count >= 6.0 {
        Some(SignalSize::Medium)
    } else if count >= 3.0 {
        Some(SignalSize::Small)
    } else {
        None
    }
}

/// Months since a funding or executive-change object. `days_ago` is read as
/// days / 30 when no month field is present.
pub(crate) fn months_ago(value: &Value) -> Option<f64> {
    object_number(value, MONTHS_AGO_KEYS)
        .or_else(|| object_number(value, DAYS_AGO_KEYS).map(|d| d / 30.0))
}

pub fn funding_size(bag: &TriggerBag) -> Option<SignalSize> {
    let value = bag.first_of(FUNDING_KEYS)?;
    match value {
        Value::Bool(true) => Some(SignalSize::Medium),
        Value::Bool(false) => None,
        Value::Object(map) => match months_ago(value) {
            Some(m) if m <= 3.0 => Some(SignalSize::Large),
            Some(m) if m <= 6.0 => Some(SignalSize::Medium),
            Some(m) if m <= 12.0 => Some(SignalSize::Small),
            Some(_) => None,
            None if !map.is_empty() => Some(SignalSize::Small),
            None => None,
        },
        // Arrays of funding events are not a recognised shape.
        Value::Array(_) => None,
        other if is_truthy(other) => Some(SignalSize::Small),
        _ => None,
    }
}

/// Executive changes alone never justify `Large`.
pub fn exec_change_size(bag: &TriggerBag) -> Option<SignalSize> {
    let value = bag.first_of(EXEC_CHANGE_KEYS)?;
    match value {
        Value::Bool(true) => Some(SignalSize::Medium),
        Value::Object(map) => match months_ago(value) {
            Some(m) if m <= 3.0 => Some(SignalSize::Medium),
            Some(m) if m <= 6.0 => Some(SignalSize::Small),
            Some(_) => None,
            None if !map.is_empty() => Some(SignalSize::Medium),
            None => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sizes(v: Value) -> SignalSizes {
        classify_signals(Some(&v), None)
    }

    #[test]
    fn empty_and_garbage_inputs_classify_to_nothing() {
        let garbage = [
            json!(null),
            json!("funding"),
            json!([1, 2, 3]),
            json!({"role_changes": "yes", "open_roles_60d": "many", "funding": [1], "exec_change": 7}),
            json!({"role_changes": [null, 3, {"title": 5}], "funding": {}, "exec_change": {}}),
        ];
        for g in garbage {
            assert_eq!(classify_signals(Some(&g), Some(&g)), SignalSizes::default());
        }
        assert_eq!(classify_signals(None, None), SignalSizes::default());
    }

    #[test]
    fn role_change_uses_freshest_matching_entry() {
        let s = sizes(json!({"role_changes": [
            {"title": "VP Engineering", "days_since": 2},
            {"title": "Payroll Manager", "days_since": 40},
            {"title": "Head of People", "department": "HR", "days_since": 100}
        ]}));
        assert_eq!(s.role_change_size, Some(SignalSize::Medium));
    }

    #[test]
    fn role_change_thresholds() {
        let at = |d: i64| {
            sizes(json!({"role_change": {"title": "Controller", "days_since": d}})).role_change_size
        };
        assert_eq!(at(14), Some(SignalSize::Large));
        assert_eq!(at(15), Some(SignalSize::Medium));
        assert_eq!(at(60), Some(SignalSize::Medium));
        assert_eq!(at(180), Some(SignalSize::Small));
        assert_eq!(at(181), None);
    }

    #[test]
    fn role_change_without_keyword_match_stays_none() {
        let s = sizes(json!({"role_changes": [{"title": "CTO", "days_since": 1}]}));
        assert_eq!(s.role_change_size, None);
    }

    #[test]
    fn role_change_keyword_needs_word_boundary() {
        let s = sizes(json!({"role_change": {"title": "Three Rivers GM", "days_since": 1}}));
        assert_eq!(s.role_change_size, None);
    }

    #[test]
    fn hiring_thresholds_and_aliases() {
        assert_eq!(sizes(json!({"open_roles_60d": 10})).hiring_size, Some(SignalSize::Large));
        assert_eq!(sizes(json!({"jobs_60d": "6"})).hiring_size, Some(SignalSize::Medium));
        assert_eq!(sizes(json!({"open_roles": 3})).hiring_size, Some(SignalSize::Small));
        assert_eq!(sizes(json!({"hiring_count": 2})).hiring_size, None);
    }

    #[test]
    fn funding_shapes() {
        assert_eq!(sizes(json!({"funding": true})).funding_size, Some(SignalSize::Medium));
        assert_eq!(sizes(json!({"funding": false})).funding_size, None);
        assert_eq!(
            sizes(json!({"funding": {"months_ago": 2}})).funding_size,
            Some(SignalSize::Large)
        );
        assert_eq!(
            sizes(json!({"funding": {"months_ago": 5}})).funding_size,
            Some(SignalSize::Medium)
        );
        assert_eq!(
            sizes(json!({"funding": {"months_ago": 12}})).funding_size,
            Some(SignalSize::Small)
        );
        assert_eq!(sizes(json!({"funding": {"months_ago": 13}})).funding_size, None);
        assert_eq!(
            sizes(json!({"funding": {"days_ago": 10}})).funding_size,
            Some(SignalSize::Large)
        );
        assert_eq!(
            sizes(json!({"recent_funding": "Series A"})).funding_size,
            Some(SignalSize::Small)
        );
    }

    #[test]
    fn exec_change_is_capped_at_medium() {
        assert_eq!(sizes(json!({"exec_change": true})).exec_change_size, Some(SignalSize::Medium));
        assert_eq!(
            sizes(json!({"executive_change": {"months_ago": 0}})).exec_change_size,
            Some(SignalSize::Medium)
        );
        assert_eq!(
            sizes(json!({"exec_change": {"months_ago": 5}})).exec_change_size,
            Some(SignalSize::Small)
        );
        assert_eq!(sizes(json!({"exec_change": {"months_ago": 9}})).exec_change_size, None);
        assert_eq!(
            sizes(json!({"leadership_change": {"who": "New CEO"}})).exec_change_size,
            Some(SignalSize::Medium)
        );
    }

    #[test]
    fn exec_change_days_ago_alias() {
        assert_eq!(
            sizes(json!({"exec_change": {"days_ago": 45}})).exec_change_size,
            Some(SignalSize::Medium)
        );
        assert_eq!(
            sizes(json!({"exec_change": {"daysAgo": 150}})).exec_change_size,
            Some(SignalSize::Small)
        );
        assert_eq!(sizes(json!({"exec_change": {"days_ago": 400}})).exec_change_size, None);
        // A month field wins over days when both are present.
        assert_eq!(
            sizes(json!({"exec_change": {"months_ago": 1, "days_ago": 400}})).exec_change_size,
            Some(SignalSize::Medium)
        );
    }

    #[test]
    fn account_triggers_fill_missing_fields() {
        let primary = json!({"funding": null});
        let account = json!({"funding": true, "open_roles_60d": 12});
        let s = classify_signals(Some(&primary), Some(&account));
        assert_eq!(s.funding_size, Some(SignalSize::Medium));
        assert_eq!(s.hiring_size, Some(SignalSize::Large));
    }

    #[test]
    fn count_by_size() {
        let s = SignalSizes {
            role_change_size: Some(SignalSize::Medium),
            hiring_size: Some(SignalSize::Medium),
            funding_size: Some(SignalSize::Small),
            exec_change_size: None,
        };
        assert_eq!(s.count(SignalSize::Medium), 2);
        assert_eq!(s.count(SignalSize::Small), 1);
        assert_eq!(s.count(SignalSize::Large), 0);
    }
}
