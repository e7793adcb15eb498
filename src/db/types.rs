//! Shared type definitions for the database layer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signals::TriggerBag;
use crate::triggers::OutreachTrigger;
use crate::util::name_from_email;

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),

    #[error("Schema migration failed: {0}")]
    Migration(String),
}

/// A row from the `contacts` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbContact {
    pub id: String,
    /// Identity key; unique across the table.
    pub match_key: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub title: Option<String>,
    pub account_id: Option<String>,
    pub campaign: Option<String>,
    /// Numeric reachability from an enrichment provider.
    pub reach_score: Option<f64>,
    /// Star rating computed upstream; wins over local computation when 1–3.
    pub server_stars: Option<i64>,
    /// Newest first, capped.
    pub triggers: Vec<OutreachTrigger>,
    pub tags: Vec<String>,
    pub signals: TriggerBag,
    pub created_at: String,
    pub updated_at: String,
}

impl DbContact {
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .iter()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if full.is_empty() {
            match self.email.as_deref() {
                Some(email) => name_from_email(email),
                None => self.match_key.clone(),
            }
        } else {
            full
        }
    }
}

/// A row from the `accounts` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DbAccount {
    pub id: String,
    pub name: String,
    /// `canonical_company_name(name)`, indexed for exact lookups.
    pub canonical_name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub employee_count: Option<i64>,
    pub region: Option<String>,
    pub signals: TriggerBag,
    pub updated_at: String,
}
