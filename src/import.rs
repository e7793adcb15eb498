//! Merge incoming contact records into the store.
//!
//! Each row is resolved to an identity (match key) and a company (canonical
//! name, then fuzzy match), given baseline outreach triggers, and then either
//! created or merged into the existing contact. Merges never overwrite a
//! populated field; they only fill blanks, union tags and prepend triggers.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::db::{DbAccount, DbContact};
use crate::error::EngineError;
use crate::identity::keys::{normalize_domain, DOMAIN_KEYS, EMAIL_KEYS, FIRST_NAME_KEYS, LAST_NAME_KEYS};
use crate::identity::{
    best_company_match, canonical_company_name, merge_tags, normalize_match_key,
    resolve_match_key, CompanyName, MatchKey,
};
use crate::signals::bag::{as_number, object_str};
use crate::signals::TriggerBag;
use crate::triggers::{infer_baseline_triggers, merge_outreach_triggers, OutreachTrigger, TRIGGER_CAP};
use crate::types::Config;
use crate::util::email_domain;

/// Record store seam for imports.
pub trait ContactStore {
    fn find_contact_by_match_key(&self, key: &MatchKey) -> Result<Option<DbContact>, EngineError>;
    fn upsert_contact(&self, contact: &DbContact) -> Result<(), EngineError>;
    fn find_account_by_canonical_name(&self, canonical: &str)
        -> Result<Option<DbAccount>, EngineError>;
    fn list_accounts(&self) -> Result<Vec<DbAccount>, EngineError>;
    fn upsert_account(&self, account: &DbAccount) -> Result<(), EngineError>;
}

#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub company_match_threshold: f64,
    pub trigger_cap: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            company_match_threshold: 0.8,
            trigger_cap: TRIGGER_CAP,
        }
    }
}

impl From<&Config> for ImportOptions {
    fn from(config: &Config) -> Self {
        Self {
            company_match_threshold: config.company_match_threshold,
            trigger_cap: config.trigger_cap.min(TRIGGER_CAP),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ImportOutcome {
    Created { id: String },
    Updated { id: String, fields_updated: Vec<String> },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

const PHONE_KEYS: &[&str] = &["phone", "phone_number", "phoneNumber", "mobile"];
const LINKEDIN_KEYS: &[&str] = &["linkedin_url", "linkedinUrl", "linkedin"];
const TITLE_KEYS: &[&str] = &["title", "job_title", "jobTitle", "role"];
const COMPANY_KEYS: &[&str] = &["company", "company_name", "companyName", "account"];
const INDUSTRY_KEYS: &[&str] = &["industry", "industry_key"];
const HEADCOUNT_KEYS: &[&str] = &["employee_count", "employeeCount", "employees", "headcount"];
const REGION_KEYS: &[&str] = &["region", "state", "location"];
const CAMPAIGN_KEYS: &[&str] = &["campaign", "campaign_name"];
const REACH_SCORE_KEYS: &[&str] = &["reach_score", "reachScore"];
const STARS_KEYS: &[&str] = &["stars", "server_stars"];
const TAG_KEYS: &[&str] = &["tags"];
const MANUAL_TRIGGER_KEYS: &[&str] = &["triggers", "outreach_triggers", "outreachTriggers"];
const SIGNAL_KEYS: &[&str] = &["signals", "trigger_signals"];
const ACCOUNT_SIGNAL_KEYS: &[&str] = &["account_signals", "accountSignals"];

fn text(record: &Value, keys: &[&str]) -> Option<String> {
    object_str(record, keys).map(str::to_string)
}

fn number(record: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| record.get(*k))
        .find_map(as_number)
}

/// A list field given as a JSON array or a comma-separated string.
fn string_list(record: &Value, keys: &[&str]) -> Vec<String> {
    let Some(value) = keys.iter().find_map(|k| record.get(*k)) else {
        return Vec::new();
    };
    let items: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        _ => Vec::new(),
    };
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn bag(record: &Value, keys: &[&str]) -> TriggerBag {
    TriggerBag::from_value(keys.iter().find_map(|k| record.get(*k)))
}

/// The fields of one import row this module reads.
#[derive(Debug, Clone, Default)]
struct IncomingRecord {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    linkedin_url: Option<String>,
    title: Option<String>,
    company: Option<String>,
    industry: Option<String>,
    employee_count: Option<i64>,
    region: Option<String>,
    domain: Option<String>,
    campaign: Option<String>,
    reach_score: Option<f64>,
    server_stars: Option<i64>,
    tags: Vec<String>,
    manual_triggers: Vec<String>,
    signals: TriggerBag,
    account_signals: TriggerBag,
}

impl IncomingRecord {
    fn from_value(record: &Value) -> Self {
        let email = text(record, EMAIL_KEYS).map(|e| e.to_lowercase());
        let domain = text(record, DOMAIN_KEYS)
            .map(|d| normalize_domain(&d))
            .or_else(|| email.as_deref().map(email_domain))
            .filter(|d| !d.is_empty());
        Self {
            first_name: text(record, FIRST_NAME_KEYS),
            last_name: text(record, LAST_NAME_KEYS),
            email,
            phone: text(record, PHONE_KEYS),
            linkedin_url: text(record, LINKEDIN_KEYS),
            title: text(record, TITLE_KEYS),
            company: text(record, COMPANY_KEYS),
            industry: text(record, INDUSTRY_KEYS),
            employee_count: number(record, HEADCOUNT_KEYS).map(|n| n.round() as i64),
            region: text(record, REGION_KEYS),
            domain,
            campaign: text(record, CAMPAIGN_KEYS),
            reach_score: number(record, REACH_SCORE_KEYS),
            server_stars: number(record, STARS_KEYS).map(|n| n as i64),
            tags: string_list(record, TAG_KEYS),
            manual_triggers: string_list(record, MANUAL_TRIGGER_KEYS),
            signals: bag(record, SIGNAL_KEYS),
            account_signals: bag(record, ACCOUNT_SIGNAL_KEYS),
        }
    }
}

/// Set `field` from `incoming` if it is blank. Records the field name.
fn fill_blank<T: Clone>(
    field: &mut Option<T>,
    incoming: &Option<T>,
    name: &str,
    updated: &mut Vec<String>,
) {
    if field.is_none() && incoming.is_some() {
        *field = incoming.clone();
        updated.push(name.to_string());
    }
}

/// Find the account for `company`, creating one when nothing matches.
fn resolve_account(
    store: &dyn ContactStore,
    company: &str,
    incoming: &IncomingRecord,
    options: &ImportOptions,
    now: &str,
) -> Result<Option<DbAccount>, EngineError> {
    let canonical = canonical_company_name(company);
    if canonical.is_empty() {
        return Ok(None);
    }

    let mut account = match store.find_account_by_canonical_name(&canonical)? {
        Some(found) => Some(found),
        None => {
            let accounts = store.list_accounts()?;
            let names: Vec<CompanyName> = accounts
                .iter()
                .map(|a| CompanyName {
                    id: a.id.clone(),
                    name: a.name.clone(),
                })
                .collect();
            let hit = best_company_match(company, &names, options.company_match_threshold)
                .map(|(c, score)| (c.id.clone(), score));
            match hit {
                Some((id, score)) => {
                    log::debug!("Matched company {:?} to account {} ({:.2})", company, id, score);
                    accounts.into_iter().find(|a| a.id == id)
                }
                None => None,
            }
        }
    };

    match account.as_mut() {
        Some(existing) => {
            let mut changed = Vec::new();
            fill_blank(&mut existing.domain, &incoming.domain, "domain", &mut changed);
            fill_blank(&mut existing.industry, &incoming.industry, "industry", &mut changed);
            fill_blank(
                &mut existing.employee_count,
                &incoming.employee_count,
                "employee_count",
                &mut changed,
            );
            fill_blank(&mut existing.region, &incoming.region, "region", &mut changed);
            if !incoming.account_signals.is_empty() {
                existing.signals = incoming.account_signals.merged_with(&existing.signals);
                changed.push("signals".to_string());
            }
            if !changed.is_empty() {
                existing.updated_at = now.to_string();
                store.upsert_account(existing)?;
            }
        }
        None => {
            let created = DbAccount {
                id: Uuid::new_v4().to_string(),
                name: company.trim().to_string(),
                canonical_name: canonical,
                domain: incoming.domain.clone(),
                industry: incoming.industry.clone(),
                employee_count: incoming.employee_count,
                region: incoming.region.clone(),
                signals: incoming.account_signals.clone(),
                updated_at: now.to_string(),
            };
            store.upsert_account(&created)?;
            log::info!("Created account {} for {:?}", created.id, company);
            account = Some(created);
        }
    }
    Ok(account)
}

/// Merge one import row into the store.
pub fn merge_incoming_contact(
    store: &dyn ContactStore,
    record: &Value,
    options: &ImportOptions,
) -> Result<ImportOutcome, EngineError> {
    let Some(key) = resolve_match_key(record) else {
        let raw = normalize_match_key(record);
        log::warn!("Skipping import row without a usable identity (key {:?})", raw);
        return Ok(ImportOutcome::Skipped {
            reason: format!("No usable identity (match key {:?})", raw),
        });
    };

    let incoming = IncomingRecord::from_value(record);
    let now = Utc::now().to_rfc3339();

    let account = match incoming.company.as_deref() {
        Some(company) => resolve_account(store, company, &incoming, options, &now)?,
        None => None,
    };

    // Account facts fill in what the row itself leaves out.
    let industry = incoming
        .industry
        .clone()
        .or_else(|| account.as_ref().and_then(|a| a.industry.clone()));
    let employee_count = incoming
        .employee_count
        .or_else(|| account.as_ref().and_then(|a| a.employee_count));
    let region = incoming
        .region
        .clone()
        .or_else(|| account.as_ref().and_then(|a| a.region.clone()));
    let domain = incoming
        .domain
        .clone()
        .or_else(|| account.as_ref().and_then(|a| a.domain.clone()));

    let baseline = infer_baseline_triggers(
        incoming.title.as_deref(),
        industry.as_deref(),
        employee_count,
        region.as_deref(),
        domain.as_deref(),
    );
    let new_triggers: Vec<OutreachTrigger> = incoming
        .manual_triggers
        .iter()
        .map(|t| OutreachTrigger::manual(t))
        .chain(baseline.iter().map(|t| OutreachTrigger::auto(t)))
        .collect();

    let account_id = account.as_ref().map(|a| a.id.clone());

    match store.find_contact_by_match_key(&key)? {
        Some(mut existing) => {
            let mut updated = Vec::new();
            fill_blank(&mut existing.first_name, &incoming.first_name, "first_name", &mut updated);
            fill_blank(&mut existing.last_name, &incoming.last_name, "last_name", &mut updated);
            fill_blank(&mut existing.email, &incoming.email, "email", &mut updated);
            fill_blank(&mut existing.phone, &incoming.phone, "phone", &mut updated);
            fill_blank(&mut existing.linkedin_url, &incoming.linkedin_url, "linkedin_url", &mut updated);
            fill_blank(&mut existing.title, &incoming.title, "title", &mut updated);
            fill_blank(&mut existing.account_id, &account_id, "account_id", &mut updated);
            fill_blank(&mut existing.campaign, &incoming.campaign, "campaign", &mut updated);
            fill_blank(&mut existing.reach_score, &incoming.reach_score, "reach_score", &mut updated);
            fill_blank(&mut existing.server_stars, &incoming.server_stars, "server_stars", &mut updated);

            let mut triggers = merge_outreach_triggers(&existing.triggers, &new_triggers);
            triggers.truncate(options.trigger_cap);
            if triggers != existing.triggers {
                existing.triggers = triggers;
                updated.push("triggers".to_string());
            }

            let tags = merge_tags(&existing.tags, &incoming.tags);
            if tags != existing.tags {
                existing.tags = tags;
                updated.push("tags".to_string());
            }

            if !incoming.signals.is_empty() {
                let signals = incoming.signals.merged_with(&existing.signals);
                if signals != existing.signals {
                    existing.signals = signals;
                    updated.push("signals".to_string());
                }
            }

            if !updated.is_empty() {
                existing.updated_at = now;
                store.upsert_contact(&existing)?;
            }
            log::debug!("Merged {} into contact {} ({:?})", key, existing.id, updated);
            Ok(ImportOutcome::Updated {
                id: existing.id,
                fields_updated: updated,
            })
        }
        None => {
            let mut triggers = merge_outreach_triggers(&[], &new_triggers);
            triggers.truncate(options.trigger_cap);
            let contact = DbContact {
                id: Uuid::new_v4().to_string(),
                match_key: key.to_string(),
                first_name: incoming.first_name,
                last_name: incoming.last_name,
                email: incoming.email,
                phone: incoming.phone,
                linkedin_url: incoming.linkedin_url,
                title: incoming.title,
                account_id,
                campaign: incoming.campaign,
                reach_score: incoming.reach_score,
                server_stars: incoming.server_stars,
                triggers,
                tags: merge_tags(&[], &incoming.tags),
                signals: incoming.signals,
                created_at: now.clone(),
                updated_at: now,
            };
            store.upsert_contact(&contact)?;
            log::debug!("Created contact {} for {}", contact.id, key);
            Ok(ImportOutcome::Created { id: contact.id })
        }
    }
}

/// Merge a batch of rows. A store failure stops the batch; bad rows do not.
pub fn import_contacts(
    store: &dyn ContactStore,
    records: &[Value],
    options: &ImportOptions,
) -> Result<ImportSummary, EngineError> {
    let mut summary = ImportSummary::default();
    for record in records {
        match merge_incoming_contact(store, record, options)? {
            ImportOutcome::Created { .. } => summary.created += 1,
            ImportOutcome::Updated { .. } => summary.updated += 1,
            ImportOutcome::Skipped { .. } => summary.skipped += 1,
        }
    }
    log::info!(
        "Import finished: {} created, {} updated, {} skipped",
        summary.created,
        summary.updated,
        summary.skipped
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::test_db;
    use crate::triggers::{TriggerSource, FALLBACK_TRIGGER};
    use serde_json::json;

    fn options() -> ImportOptions {
        ImportOptions::default()
    }

    #[test]
    fn creates_then_merges_same_identity() {
        let db = test_db();
        let first = json!({
            "email": "Jane.Doe@Acme.com",
            "first_name": "Jane",
            "title": "VP People",
            "company": "Acme, Inc.",
            "tags": ["webinar"],
            "triggers": ["board mandate"]
        });
        let created = merge_incoming_contact(&db, &first, &options()).expect("import");
        let ImportOutcome::Created { id } = created else {
            panic!("expected a new contact, got {created:?}");
        };

        let second = json!({
            "email": "jane.doe@acme.com",
            "last_name": "Doe",
            "phone": "617-555-0100",
            "tags": "webinar, conference",
            "triggers": "Board Mandate"
        });
        let updated = merge_incoming_contact(&db, &second, &options()).expect("import");
        match updated {
            ImportOutcome::Updated { id: same, fields_updated } => {
                assert_eq!(same, id);
                assert!(fields_updated.contains(&"last_name".to_string()));
                assert!(fields_updated.contains(&"phone".to_string()));
                assert!(fields_updated.contains(&"tags".to_string()));
            }
            other => panic!("expected an update, got {other:?}"),
        }

        let stored = db
            .get_contact_by_match_key("jane.doe@acme.com")
            .expect("query")
            .expect("stored");
        assert_eq!(stored.first_name.as_deref(), Some("Jane"));
        assert_eq!(stored.last_name.as_deref(), Some("Doe"));
        assert_eq!(stored.tags, vec!["webinar", "conference"]);
        let mandate: Vec<_> = stored
            .triggers
            .iter()
            .filter(|t| t.label == "board mandate")
            .collect();
        assert_eq!(mandate.len(), 1);
        assert_eq!(mandate[0].source, TriggerSource::Manual);
        assert!(stored.triggers.len() <= TRIGGER_CAP);
    }

    #[test]
    fn populated_fields_are_not_overwritten() {
        let db = test_db();
        merge_incoming_contact(&db, &json!({"email": "a@b.com", "title": "CFO"}), &options())
            .expect("import");
        merge_incoming_contact(&db, &json!({"email": "a@b.com", "title": "CEO"}), &options())
            .expect("import");
        let stored = db.get_contact_by_match_key("a@b.com").expect("query").expect("stored");
        assert_eq!(stored.title.as_deref(), Some("CFO"));
    }

    #[test]
    fn rows_without_identity_are_skipped() {
        let db = test_db();
        let outcome = merge_incoming_contact(&db, &json!({"title": "CFO"}), &options())
            .expect("import");
        assert!(matches!(outcome, ImportOutcome::Skipped { .. }));

        let half = json!({"first_name": "Jane", "last_name": "Doe"});
        let outcome = merge_incoming_contact(&db, &half, &options()).expect("import");
        assert!(matches!(outcome, ImportOutcome::Skipped { .. }));
        assert!(db.get_contacts().expect("list").is_empty());
    }

    #[test]
    fn name_and_domain_identity_without_email() {
        let db = test_db();
        let row = json!({"first_name": "Jane", "last_name": "Doe", "website": "https://www.acme.com/about"});
        merge_incoming_contact(&db, &row, &options()).expect("import");
        assert!(db.get_contact_by_match_key("janedoe@acme.com").expect("query").is_some());
    }

    #[test]
    fn company_variants_share_one_account() {
        let db = test_db();
        let rows = vec![
            json!({"email": "a@acme.com", "company": "Acme Widgets, Inc."}),
            json!({"email": "b@acme.com", "company": "ACME WIDGETS LLC"}),
            json!({"email": "c@acme.com", "company": "Acme Widget"}),
            json!({"email": "d@initech.com", "company": "Initech"}),
        ];
        let summary = import_contacts(&db, &rows, &options()).expect("import");
        assert_eq!(summary.created, 4);
        assert_eq!(db.get_accounts().expect("accounts").len(), 2);

        let accounts: Vec<Option<String>> = ["a@acme.com", "b@acme.com", "c@acme.com", "d@initech.com"]
            .iter()
            .map(|key| {
                db.get_contact_by_match_key(key)
                    .expect("query")
                    .and_then(|c| c.account_id)
            })
            .collect();
        assert!(accounts[0].is_some());
        assert_eq!(accounts[0], accounts[1]);
        assert_eq!(accounts[0], accounts[2]);
        assert_ne!(accounts[0], accounts[3]);
    }

    #[test]
    fn baseline_triggers_use_account_facts() {
        let db = test_db();
        merge_incoming_contact(
            &db,
            &json!({"email": "x@hope.org", "company": "Hope Shelter", "employees": 80}),
            &options(),
        )
        .expect("import");
        let stored = db.get_contact_by_match_key("x@hope.org").expect("query").expect("stored");
        assert!(stored
            .triggers
            .iter()
            .any(|t| t.label == "budget-constrained benefits"));

        merge_incoming_contact(&db, &json!({"email": "nobody@example.com"}), &options())
            .expect("import");
        let bare = db
            .get_contact_by_match_key("nobody@example.com")
            .expect("query")
            .expect("stored");
        assert_eq!(bare.triggers.len(), 1);
        assert_eq!(bare.triggers[0].label, FALLBACK_TRIGGER);
    }

    #[test]
    fn trigger_cap_option_truncates() {
        let db = test_db();
        let opts = ImportOptions {
            trigger_cap: 2,
            ..Default::default()
        };
        let row = json!({"email": "cfo@acme.com", "title": "CFO", "region": "Boston, MA"});
        merge_incoming_contact(&db, &row, &opts).expect("import");
        let stored = db.get_contact_by_match_key("cfo@acme.com").expect("query").expect("stored");
        assert_eq!(stored.triggers.len(), 2);
    }

    #[test]
    fn options_follow_config() {
        let config = Config {
            company_match_threshold: 0.9,
            trigger_cap: 40,
            ..Default::default()
        };
        let opts = ImportOptions::from(&config);
        assert_eq!(opts.company_match_threshold, 0.9);
        assert_eq!(opts.trigger_cap, TRIGGER_CAP);
    }
}
