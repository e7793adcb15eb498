//! Star ranking: signal sizes + reachability → 1–3 stars.
//!
//! Two independent scales are produced. `signal` stars measure how strong the
//! timing signals are; `reach` stars measure how contactable the account is.
//! They are rendered side by side and never combined into one number.

use serde::{Deserialize, Serialize};

use super::classify::{SignalSize, SignalSizes};

/// Reachability score at or above which an account without contact rows is
/// treated as reach-ready.
pub const REACH_READY_SCORE: f64 = 12.0;

pub const SIGNAL_STAR_LEGEND: [(u8, &str); 3] = [
    (3, "Strong timing signal: reach out now"),
    (2, "Moderate signals: worth a touch this cycle"),
    (1, "Little or no signal"),
];

pub const REACH_STAR_LEGEND: [(u8, &str); 3] = [
    (3, "Multiple direct channels to the right person"),
    (2, "At least one direct channel"),
    (1, "No direct channel yet"),
];

/// Priority label derived from signal stars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn from_stars(stars: u8) -> Self {
        match stars {
            s if s >= 3 => Priority::High,
            2 => Priority::Medium,
            _ => Priority::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

/// Contact channels for one contact, as far as reachability is concerned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactReach {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
}

impl ContactReach {
    pub fn has_direct_channel(&self) -> bool {
        present(&self.email) || present(&self.phone)
    }

    fn channel_points(&self) -> u32 {
        let mut points = 0;
        if present(&self.email) {
            points += 2;
        }
        if present(&self.phone) {
            points += 2;
        }
        if present(&self.linkedin_url) {
            points += 1;
        }
        points
    }
}

/// Whether the account can be contacted directly.
///
/// With contact rows, any email or phone qualifies. Without them (`None`),
/// fall back to the numeric reachability score.
pub fn is_reach_ready(contacts: Option<&[ContactReach]>, reach_score: Option<f64>) -> bool {
    match contacts {
        Some(list) => list.iter().any(ContactReach::has_direct_channel),
        None => reach_score.map(|s| s >= REACH_READY_SCORE).unwrap_or(false),
    }
}

/// Counts the star rules look at.
#[derive(Debug, Clone, Copy)]
pub struct StarInputs {
    pub large: usize,
    pub medium: usize,
    pub small: usize,
    pub reach_ready: bool,
}

impl StarInputs {
    pub fn new(sizes: &SignalSizes, reach_ready: bool) -> Self {
        Self {
            large: sizes.count(SignalSize::Large),
            medium: sizes.count(SignalSize::Medium),
            small: sizes.count(SignalSize::Small),
            reach_ready,
        }
    }
}

/// A single star rule: name, predicate, stars awarded when it matches.
pub struct StarRule {
    pub name: &'static str,
    pub matches: fn(&StarInputs) -> bool,
    pub stars: u8,
}

/// Evaluated top to bottom; the first matching rule decides.
pub const STAR_RULES: &[StarRule] = &[
    StarRule {
        name: "any_large",
        matches: |i| i.large >= 1,
        stars: 3,
    },
    StarRule {
        name: "two_medium",
        matches: |i| i.medium >= 2,
        stars: 3,
    },
    StarRule {
        name: "medium_and_reachable",
        matches: |i| i.medium >= 1 && i.reach_ready,
        stars: 3,
    },
    StarRule {
        name: "one_medium",
        matches: |i| i.medium >= 1,
        stars: 2,
    },
    StarRule {
        name: "two_small",
        matches: |i| i.small >= 2,
        stars: 2,
    },
];

const FALLBACK_STARS: u8 = 1;

/// The rule that decided, or `None` when the fallback applies.
pub fn matching_star_rule(sizes: &SignalSizes, reach_ready: bool) -> Option<&'static StarRule> {
    let inputs = StarInputs::new(sizes, reach_ready);
    STAR_RULES.iter().find(|rule| (rule.matches)(&inputs))
}

pub fn compute_stars(sizes: &SignalSizes, reach_ready: bool) -> u8 {
    matching_star_rule(sizes, reach_ready)
        .map(|rule| rule.stars)
        .unwrap_or(FALLBACK_STARS)
}

/// A valid server-computed value always wins over recomputation.
pub fn resolve_stars(server_stars: Option<i64>, sizes: &SignalSizes, reach_ready: bool) -> u8 {
    match server_stars {
        Some(s @ 1..=3) => s as u8,
        Some(other) => {
            log::debug!("Ignoring out-of-range server stars {}", other);
            compute_stars(sizes, reach_ready)
        }
        None => compute_stars(sizes, reach_ready),
    }
}

/// Contactability on its own 1–3 scale.
///
/// Scored on the best contact when contact rows exist, otherwise on the
/// numeric reachability score.
pub fn reach_stars(contacts: Option<&[ContactReach]>, reach_score: Option<f64>) -> u8 {
    match contacts {
        Some(list) => {
            let best = list.iter().map(ContactReach::channel_points).max().unwrap_or(0);
            match best {
                p if p >= 4 => 3,
                p if p >= 2 => 2,
                _ => 1,
            }
        }
        None => match reach_score {
            Some(s) if s >= 20.0 => 3,
            Some(s) if s >= REACH_READY_SCORE => 2,
            _ => 1,
        },
    }
}

/// Both star scales for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DualStars {
    pub signal: u8,
    pub reach: u8,
}

impl DualStars {
    pub fn compute(
        server_stars: Option<i64>,
        sizes: &SignalSizes,
        contacts: Option<&[ContactReach]>,
        reach_score: Option<f64>,
    ) -> Self {
        let ready = is_reach_ready(contacts, reach_score);
        Self {
            signal: resolve_stars(server_stars, sizes, ready),
            reach: reach_stars(contacts, reach_score),
        }
    }

    pub fn priority(&self) -> Priority {
        Priority::from_stars(self.signal)
    }
}
