use rusqlite::{params, OptionalExtension, Row};

use super::*;
use crate::error::EngineError;
use crate::identity::MatchKey;
use crate::import::ContactStore;
use crate::queue::LeadRow;
use crate::signals::{ContactReach, TriggerBag};
use crate::triggers::OutreachTrigger;

const CONTACT_COLUMNS: &str = "id, match_key, first_name, last_name, email, phone, linkedin_url,
     title, account_id, campaign, reach_score, server_stars, triggers_json, tags_json,
     signals_json, created_at, updated_at";

const ACCOUNT_COLUMNS: &str =
    "id, name, canonical_name, domain, industry, employee_count, region, signals_json, updated_at";

fn decode_list<T: serde::de::DeserializeOwned>(raw: &str, column: &str, id: &str) -> Vec<T> {
    match serde_json::from_str(raw) {
        Ok(list) => list,
        Err(e) => {
            log::warn!("Ignoring unreadable {column} on {id}: {e}");
            Vec::new()
        }
    }
}

fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, DbError> {
    serde_json::to_string(value)
        .map_err(|e| DbError::Sqlite(rusqlite::Error::ToSqlConversionFailure(Box::new(e))))
}

impl LeadDb {
    fn map_contact_row(row: &Row) -> rusqlite::Result<DbContact> {
        let id: String = row.get(0)?;
        let triggers_json: String = row.get(12)?;
        let tags_json: String = row.get(13)?;
        let signals_json: Option<String> = row.get(14)?;
        Ok(DbContact {
            match_key: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
            linkedin_url: row.get(6)?,
            title: row.get(7)?,
            account_id: row.get(8)?,
            campaign: row.get(9)?,
            reach_score: row.get(10)?,
            server_stars: row.get(11)?,
            triggers: decode_list::<OutreachTrigger>(&triggers_json, "triggers_json", &id),
            tags: decode_list::<String>(&tags_json, "tags_json", &id),
            signals: TriggerBag::from_json_str(signals_json.as_deref()),
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
            id,
        })
    }

    fn map_account_row(row: &Row) -> rusqlite::Result<DbAccount> {
        let signals_json: Option<String> = row.get(7)?;
        Ok(DbAccount {
            id: row.get(0)?,
            name: row.get(1)?,
            canonical_name: row.get(2)?,
            domain: row.get(3)?,
            industry: row.get(4)?,
            employee_count: row.get(5)?,
            region: row.get(6)?,
            signals: TriggerBag::from_json_str(signals_json.as_deref()),
            updated_at: row.get(8)?,
        })
    }

    // =========================================================================
    // Contacts
    // =========================================================================

    pub fn get_contact_by_match_key(&self, key: &str) -> Result<Option<DbContact>, DbError> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE match_key = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![key], Self::map_contact_row)
            .optional()?)
    }

    pub fn get_contacts(&self) -> Result<Vec<DbContact>, DbError> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::map_contact_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Insert or update a contact keyed by `id`. `match_key` stays unique.
    pub fn save_contact(&self, contact: &DbContact) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO contacts (
                id, match_key, first_name, last_name, email, phone, linkedin_url, title,
                account_id, campaign, reach_score, server_stars, triggers_json, tags_json,
                signals_json, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
             ON CONFLICT(id) DO UPDATE SET
                match_key = excluded.match_key,
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                email = excluded.email,
                phone = excluded.phone,
                linkedin_url = excluded.linkedin_url,
                title = excluded.title,
                account_id = excluded.account_id,
                campaign = excluded.campaign,
                reach_score = excluded.reach_score,
                server_stars = excluded.server_stars,
                triggers_json = excluded.triggers_json,
                tags_json = excluded.tags_json,
                signals_json = excluded.signals_json,
                updated_at = excluded.updated_at",
            params![
                contact.id,
                contact.match_key,
                contact.first_name,
                contact.last_name,
                contact.email,
                contact.phone,
                contact.linkedin_url,
                contact.title,
                contact.account_id,
                contact.campaign,
                contact.reach_score,
                contact.server_stars,
                encode(&contact.triggers)?,
                encode(&contact.tags)?,
                encode(&contact.signals)?,
                contact.created_at,
                contact.updated_at,
            ],
        )?;
        Ok(())
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub fn get_account_by_canonical_name(
        &self,
        canonical: &str,
    ) -> Result<Option<DbAccount>, DbError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE canonical_name = ?1
             ORDER BY updated_at LIMIT 1"
        );
        Ok(self
            .conn
            .query_row(&sql, params![canonical], Self::map_account_row)
            .optional()?)
    }

    pub fn get_account(&self, id: &str) -> Result<Option<DbAccount>, DbError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], Self::map_account_row)
            .optional()?)
    }

    pub fn get_accounts(&self) -> Result<Vec<DbAccount>, DbError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY name, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::map_account_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn save_account(&self, account: &DbAccount) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO accounts (
                id, name, canonical_name, domain, industry, employee_count, region,
                signals_json, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                canonical_name = excluded.canonical_name,
                domain = excluded.domain,
                industry = excluded.industry,
                employee_count = excluded.employee_count,
                region = excluded.region,
                signals_json = excluded.signals_json,
                updated_at = excluded.updated_at",
            params![
                account.id,
                account.name,
                account.canonical_name,
                account.domain,
                account.industry,
                account.employee_count,
                account.region,
                encode(&account.signals)?,
                account.updated_at,
            ],
        )?;
        Ok(())
    }

    // =========================================================================
    // Lead queue snapshot
    // =========================================================================

    /// One lead row per contact, joined with its account's signals.
    pub fn get_lead_rows(&self) -> Result<Vec<LeadRow>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.first_name, c.last_name, c.email, c.phone, c.linkedin_url,
                    c.campaign, c.reach_score, c.server_stars, c.signals_json,
                    a.name, a.signals_json, a.industry, a.employee_count
             FROM contacts c
             LEFT JOIN accounts a ON a.id = c.account_id",
        )?;
        let rows = stmt.query_map([], |row| {
            let contact = DbContact {
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                email: row.get(3)?,
                ..Default::default()
            };
            let signals: Option<String> = row.get(9)?;
            let account_signals: Option<String> = row.get(11)?;
            Ok(LeadRow {
                id: row.get(0)?,
                name: contact.display_name(),
                company: row.get(10)?,
                industry: row.get(12)?,
                employee_count: row.get(13)?,
                campaign: row.get(6)?,
                server_stars: row.get(8)?,
                signals: TriggerBag::from_json_str(signals.as_deref()),
                account_signals: TriggerBag::from_json_str(account_signals.as_deref()),
                contacts: Some(vec![ContactReach {
                    email: contact.email,
                    phone: row.get(4)?,
                    linkedin_url: row.get(5)?,
                }]),
                reach_score: row.get(7)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

impl ContactStore for LeadDb {
    fn find_contact_by_match_key(&self, key: &MatchKey) -> Result<Option<DbContact>, EngineError> {
        Ok(self.get_contact_by_match_key(key.as_str())?)
    }

    fn upsert_contact(&self, contact: &DbContact) -> Result<(), EngineError> {
        Ok(self.save_contact(contact)?)
    }

    fn find_account_by_canonical_name(
        &self,
        canonical: &str,
    ) -> Result<Option<DbAccount>, EngineError> {
        Ok(self.get_account_by_canonical_name(canonical)?)
    }

    fn list_accounts(&self) -> Result<Vec<DbAccount>, EngineError> {
        Ok(self.get_accounts()?)
    }

    fn upsert_account(&self, account: &DbAccount) -> Result<(), EngineError> {
        Ok(self.save_account(account)?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::test_db;
    use super::*;
    use crate::triggers::TriggerSource;
    use serde_json::json;

    fn account(id: &str, name: &str) -> DbAccount {
        DbAccount {
            id: id.to_string(),
            name: name.to_string(),
            canonical_name: crate::identity::canonical_company_name(name),
            industry: Some("Healthcare".to_string()),
            employee_count: Some(120),
            signals: TriggerBag::from(json!({"funding": true})),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            ..Default::default()
        }
    }

    fn contact(id: &str, key: &str) -> DbContact {
        DbContact {
            id: id.to_string(),
            match_key: key.to_string(),
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
            email: Some(key.to_string()),
            triggers: vec![OutreachTrigger::manual("board mandate")],
            tags: vec!["vip".to_string()],
            signals: TriggerBag::from(json!({"jobs_60d": 7})),
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_contact_round_trip() {
        let db = test_db();
        db.save_contact(&contact("c1", "jane@acme.com")).expect("save");

        let found = db
            .get_contact_by_match_key("jane@acme.com")
            .expect("query")
            .expect("contact exists");
        assert_eq!(found.id, "c1");
        assert_eq!(found.triggers.len(), 1);
        assert_eq!(found.triggers[0].source, TriggerSource::Manual);
        assert_eq!(found.tags, vec!["vip"]);
        assert_eq!(found.signals.number(&["jobs_60d"]), Some(7.0));
        assert!(db.get_contact_by_match_key("nobody@acme.com").expect("query").is_none());
    }

    #[test]
    fn test_duplicate_match_key_is_rejected() {
        let db = test_db();
        db.save_contact(&contact("c1", "jane@acme.com")).expect("save");
        assert!(db.save_contact(&contact("c2", "jane@acme.com")).is_err());
    }

    #[test]
    fn test_account_lookup_by_canonical_name() {
        let db = test_db();
        db.save_account(&account("a1", "Acme, Inc.")).expect("save");
        let found = db
            .get_account_by_canonical_name("acme")
            .expect("query")
            .expect("account exists");
        assert_eq!(found.id, "a1");
        assert_eq!(found.employee_count, Some(120));
        assert_eq!(db.get_accounts().expect("list").len(), 1);
    }

    #[test]
    fn test_lead_rows_join_account_signals() {
        let db = test_db();
        db.save_account(&account("a1", "Acme")).expect("account");
        let mut c = contact("c1", "jane@acme.com");
        c.account_id = Some("a1".to_string());
        c.campaign = Some("spring".to_string());
        db.save_contact(&c).expect("contact");

        let rows = db.get_lead_rows().expect("rows");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Jane Doe");
        assert_eq!(rows[0].contacts.as_ref().map(Vec::len), Some(1));
        assert_eq!(rows[0].company.as_deref(), Some("Acme"));
        assert_eq!(rows[0].campaign.as_deref(), Some("spring"));
        assert!(rows[0].account_signals.get("funding").is_some());
        assert_eq!(db.get_account("a1").expect("query").map(|a| a.name), Some("Acme".to_string()));
    }
}
