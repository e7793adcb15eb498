use serde::{Deserialize, Serialize};

use crate::coi::DEFAULT_TOP_N;
use crate::signals::stars::REACH_READY_SCORE;
use crate::triggers::TRIGGER_CAP;

/// Configuration loaded from `~/.leadqueue/config.json`.
///
/// Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Overrides `~/.leadqueue/leadqueue.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    #[serde(default = "default_coi_top_n")]
    pub coi_top_n: usize,
    #[serde(default = "default_trigger_cap")]
    pub trigger_cap: usize,
    #[serde(default = "default_reach_score_threshold")]
    pub reach_score_threshold: f64,
    #[serde(default = "default_company_match_threshold")]
    pub company_match_threshold: f64,
    #[serde(default = "default_warmth")]
    pub default_warmth: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            coi_top_n: default_coi_top_n(),
            trigger_cap: default_trigger_cap(),
            reach_score_threshold: default_reach_score_threshold(),
            company_match_threshold: default_company_match_threshold(),
            default_warmth: default_warmth(),
        }
    }
}

fn default_coi_top_n() -> usize {
    DEFAULT_TOP_N
}

fn default_trigger_cap() -> usize {
    TRIGGER_CAP
}

fn default_reach_score_threshold() -> f64 {
    REACH_READY_SCORE
}

fn default_company_match_threshold() -> f64 {
    0.8
}

fn default_warmth() -> u32 {
    crate::coi::scorer::DEFAULT_WARMTH
}
