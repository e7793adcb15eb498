//! Lead queue ordering: classify, star and sort a snapshot of leads.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::persona::{recommend_persona, PersonaRecommendation};
use crate::signals::stars::{is_reach_ready, reach_stars, REACH_READY_SCORE};
use crate::signals::{
    classify_bag, resolve_stars, ContactReach, DualStars, Priority, SignalSizes, TriggerBag,
};

/// A lead as the queue sees it: one contact plus its account's signals.
#[derive(Debug, Clone, Default)]
pub struct LeadRow {
    pub id: String,
    pub name: String,
    pub company: Option<String>,
    pub industry: Option<String>,
    pub employee_count: Option<i64>,
    pub campaign: Option<String>,
    pub server_stars: Option<i64>,
    pub signals: TriggerBag,
    pub account_signals: TriggerBag,
    /// `None` when contact rows were not loaded; reach then falls back to
    /// `reach_score`.
    pub contacts: Option<Vec<ContactReach>>,
    pub reach_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedLead {
    pub id: String,
    pub name: String,
    pub company: Option<String>,
    pub campaign: Option<String>,
    pub sizes: SignalSizes,
    pub stars: DualStars,
    pub priority: Priority,
    pub persona: PersonaRecommendation,
}

pub fn rank_lead(row: &LeadRow) -> RankedLead {
    rank_lead_with(row, REACH_READY_SCORE)
}

/// Like `rank_lead`, with a configurable reach-score threshold for leads
/// whose contact rows were not loaded.
pub fn rank_lead_with(row: &LeadRow, reach_score_threshold: f64) -> RankedLead {
    let signals = row.signals.merged_with(&row.account_signals);
    let sizes = classify_bag(&signals);
    let reach_ready = match row.contacts.as_deref() {
        Some(contacts) => is_reach_ready(Some(contacts), None),
        None => row
            .reach_score
            .map(|s| s >= reach_score_threshold)
            .unwrap_or(false),
    };
    let stars = DualStars {
        signal: resolve_stars(row.server_stars, &sizes, reach_ready),
        reach: reach_stars(row.contacts.as_deref(), row.reach_score),
    };
    RankedLead {
        id: row.id.clone(),
        name: row.name.clone(),
        company: row.company.clone(),
        campaign: row.campaign.clone(),
        sizes,
        priority: stars.priority(),
        stars,
        persona: recommend_persona(row.employee_count, row.industry.as_deref(), &signals),
    }
}

/// Signal stars desc, reach stars desc, then name.
pub fn rank_leads(rows: &[LeadRow]) -> Vec<RankedLead> {
    rank_leads_with(rows, REACH_READY_SCORE)
}

pub fn rank_leads_with(rows: &[LeadRow], reach_score_threshold: f64) -> Vec<RankedLead> {
    let mut ranked: Vec<RankedLead> = rows
        .iter()
        .map(|row| rank_lead_with(row, reach_score_threshold))
        .collect();
    ranked.sort_by(|a, b| {
        b.stars
            .signal
            .cmp(&a.stars.signal)
            .then_with(|| b.stars.reach.cmp(&a.stars.reach))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    ranked
}

/// Contacts per campaign in this snapshot. Rows without a campaign are not
/// counted.
pub fn campaign_counts(rows: &[LeadRow]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for campaign in rows.iter().filter_map(|r| r.campaign.as_deref()) {
        let campaign = campaign.trim();
        if campaign.is_empty() {
            continue;
        }
        *counts.entry(campaign.to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lead(id: &str, name: &str, signals: serde_json::Value) -> LeadRow {
        LeadRow {
            id: id.to_string(),
            name: name.to_string(),
            signals: TriggerBag::from(signals),
            ..Default::default()
        }
    }

    #[test]
    fn orders_by_stars_then_reach_then_name() {
        let mut reachable = lead("b", "Bravo", json!({"jobs_60d": 3, "funding": true}));
        reachable.contacts = Some(vec![ContactReach {
            email: Some("x@bravo.com".into()),
            phone: Some("555".into()),
            linkedin_url: None,
        }]);
        let rows = vec![
            lead("z", "zulu", json!({})),
            lead("a", "Alpha", json!({})),
            lead("c", "Charlie", json!({"hiring_count": 12})),
            reachable,
        ];
        let ranked = rank_leads(&rows);
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a", "z"]);
        assert_eq!(ranked[0].priority, Priority::High);
        assert_eq!(ranked[3].priority, Priority::Low);
    }

    #[test]
    fn account_signals_fill_gaps() {
        let mut row = lead("a", "Alpha", json!({}));
        row.account_signals = TriggerBag::from(json!({"funding": {"months_ago": 2}}));
        assert_eq!(rank_lead(&row).stars.signal, 3);
    }

    #[test]
    fn server_stars_win() {
        let mut row = lead("a", "Alpha", json!({"hiring_count": 20}));
        row.server_stars = Some(1);
        assert_eq!(rank_lead(&row).stars.signal, 1);
    }

    #[test]
    fn persona_uses_account_facts_and_signals() {
        let mut row = lead("a", "Alpha", json!({}));
        row.industry = Some("Healthcare".into());
        assert_eq!(rank_lead(&row).persona.primary, "HR Director");

        row.account_signals = TriggerBag::from(json!({"carrier_change": true}));
        assert_eq!(rank_lead(&row).persona.primary, "CFO");
    }

    #[test]
    fn persona_maps_free_text_industry() {
        let mut row = lead("a", "Alpha", json!({}));
        row.industry = Some("Financial Services".into());
        row.employee_count = Some(100);
        let persona = rank_lead(&row).persona;
        assert_eq!(persona.primary, "CHRO");
        assert_eq!(persona.alternates, vec!["CFO", "Benefits Manager"]);

        row.industry = Some("Retail & Hospitality".into());
        assert_eq!(rank_lead(&row).persona.primary, "HR Director");
        assert_eq!(rank_lead(&row).persona.alternates, vec!["Director of Operations", "CFO"]);
    }

    #[test]
    fn reach_threshold_is_configurable() {
        let mut row = lead("a", "Alpha", json!({"jobs_60d": 7}));
        row.reach_score = Some(10.0);
        assert_eq!(rank_lead(&row).stars.signal, 2);
        assert_eq!(rank_lead_with(&row, 8.0).stars.signal, 3);
    }

    #[test]
    fn campaign_counts_per_snapshot() {
        let mut rows = vec![lead("1", "A", json!({})), lead("2", "B", json!({})), lead("3", "C", json!({}))];
        rows[0].campaign = Some("spring".into());
        rows[1].campaign = Some(" spring ".into());
        rows[2].campaign = Some("".into());
        let counts = campaign_counts(&rows);
        assert_eq!(counts.get("spring"), Some(&2));
        assert_eq!(counts.len(), 1);
        assert!(campaign_counts(&[]).is_empty());
    }
}
