//! Import contact rows and print the resulting lead queue.
//!
//! Usage: `leadqueue-import <rows.json> [--db PATH]`
//!
//! `rows.json` holds a JSON array of contact records in any of the accepted
//! field spellings.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde_json::{json, Value};

use leadqueue_lib::db::LeadDb;
use leadqueue_lib::identity::{
    detect_duplicate_contacts, find_company_duplicates, CompanyName, ContactName,
};
use leadqueue_lib::import::{import_contacts, ImportOptions};
use leadqueue_lib::queue::{campaign_counts, rank_leads_with};
use leadqueue_lib::state::load_config;

#[derive(Parser)]
#[command(name = "leadqueue-import")]
#[command(about = "Import contact rows and print the ranked lead queue", long_about = None)]
struct Args {
    /// JSON array of contact records
    input: PathBuf,
    /// Database path, overrides the configured one
    #[arg(long)]
    db: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let Args { input, db } = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config().context("Failed to load leadqueue config")?;
    let db_path = db.or_else(|| config.database_path.as_ref().map(PathBuf::from));
    let db = LeadDb::open_configured(db_path.as_deref()).context("Failed to open database")?;

    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let rows: Vec<Value> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of records", input.display()))?;

    let summary = import_contacts(&db, &rows, &ImportOptions::from(&config))?;
    let leads = db.get_lead_rows()?;

    // Identities that imported under different keys or spellings, for review.
    let companies: Vec<CompanyName> = db
        .get_accounts()?
        .into_iter()
        .map(|a| CompanyName { id: a.id, name: a.name })
        .collect();
    let contacts: Vec<ContactName> = db
        .get_contacts()?
        .into_iter()
        .filter_map(|c| {
            let email = c.email.clone()?;
            Some(ContactName {
                name: c.display_name(),
                id: c.id,
                email,
            })
        })
        .collect();

    let report = json!({
        "import": summary,
        "campaigns": campaign_counts(&leads),
        "queue": rank_leads_with(&leads, config.reach_score_threshold),
        "possibleDuplicates": {
            "companies": find_company_duplicates(&companies, config.company_match_threshold),
            "contacts": detect_duplicate_contacts(&contacts),
        },
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
