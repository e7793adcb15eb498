use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

use super::*;
use crate::coi::{CoiContact, CoiReason, CoiRecord, CoiStore, QueueRow};
use crate::error::EngineError;

/// Only a UNIQUE index hit means another run wrote this date. NOT NULL and
/// CHECK failures stay storage errors.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl LeadDb {
    // =========================================================================
    // Referral partners
    // =========================================================================

    /// Insert or update a partner and replace its contact list.
    pub fn upsert_partner(&self, partner: &CoiRecord) -> Result<(), DbError> {
        self.with_transaction(|db| {
            db.conn.execute(
                "INSERT INTO coi_partners (id, name, firm_type, region, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    firm_type = excluded.firm_type,
                    region = excluded.region,
                    updated_at = excluded.updated_at",
                params![
                    partner.id,
                    partner.name,
                    partner.firm_type,
                    partner.region,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            db.conn.execute(
                "DELETE FROM coi_contacts WHERE partner_id = ?1",
                params![partner.id],
            )?;
            for (position, contact) in partner.contacts.iter().enumerate() {
                db.conn.execute(
                    "INSERT INTO coi_contacts
                        (partner_id, position, name, email, phone, linkedin_url, title)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        partner.id,
                        position as i64,
                        contact.name,
                        contact.email,
                        contact.phone,
                        contact.linkedin_url,
                        contact.title,
                    ],
                )?;
            }
            Ok(())
        })
    }

    fn partner_contacts(&self) -> Result<HashMap<String, Vec<CoiContact>>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT partner_id, name, email, phone, linkedin_url, title
             FROM coi_contacts
             ORDER BY partner_id, position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                CoiContact {
                    name: row.get(1)?,
                    email: row.get(2)?,
                    phone: row.get(3)?,
                    linkedin_url: row.get(4)?,
                    title: row.get(5)?,
                },
            ))
        })?;

        let mut by_partner: HashMap<String, Vec<CoiContact>> = HashMap::new();
        for row in rows {
            let (partner_id, contact) = row?;
            by_partner.entry(partner_id).or_default().push(contact);
        }
        Ok(by_partner)
    }

    /// Every partner with its contacts, ordered by name.
    pub fn get_partners(&self) -> Result<Vec<CoiRecord>, DbError> {
        let mut contacts = self.partner_contacts()?;
        let mut stmt = self.conn.prepare(
            "SELECT id, name, firm_type, region FROM coi_partners ORDER BY name, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CoiRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                firm_type: row.get(2)?,
                region: row.get(3)?,
                contacts: Vec::new(),
            })
        })?;

        let mut partners = Vec::new();
        for row in rows {
            let mut partner = row?;
            partner.contacts = contacts.remove(&partner.id).unwrap_or_default();
            partners.push(partner);
        }
        Ok(partners)
    }

    // =========================================================================
    // Daily queue
    // =========================================================================

    pub fn queue_exists_for(&self, run_date: NaiveDate) -> Result<bool, DbError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM coi_queue WHERE run_date = ?1 LIMIT 1",
                params![run_date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Queue rows for a date in rank order.
    pub fn get_queue_for(&self, run_date: NaiveDate) -> Result<Vec<QueueRow>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT rank, coi_id, score, reason_json, best_contact_json
             FROM coi_queue
             WHERE run_date = ?1
             ORDER BY rank",
        )?;
        let rows = stmt.query_map(params![run_date.to_string()], |row| {
            let reason_json: String = row.get(3)?;
            let contact_json: Option<String> = row.get(4)?;
            Ok(QueueRow {
                run_date,
                rank: row.get(0)?,
                coi_id: row.get(1)?,
                score: row.get(2)?,
                reason: serde_json::from_str::<CoiReason>(&reason_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?,
                best_contact: contact_json
                    .and_then(|s| serde_json::from_str::<CoiContact>(&s).ok()),
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn insert_queue_row(&self, row: &QueueRow) -> Result<(), EngineError> {
        let reason_json = serde_json::to_string(&row.reason)
            .map_err(|e| EngineError::Store(format!("Failed to encode reason: {e}")))?;
        let contact_json = row
            .best_contact
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| EngineError::Store(format!("Failed to encode contact: {e}")))?;

        self.conn
            .execute(
                "INSERT INTO coi_queue (run_date, rank, coi_id, score, reason_json, best_contact_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    row.run_date.to_string(),
                    row.rank,
                    row.coi_id,
                    row.score,
                    reason_json,
                    contact_json,
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    EngineError::AlreadyScored(row.run_date)
                } else {
                    EngineError::from(DbError::Sqlite(e))
                }
            })?;
        Ok(())
    }
}

impl CoiStore for LeadDb {
    fn load_partners(&self) -> Result<Vec<CoiRecord>, EngineError> {
        Ok(self.get_partners()?)
    }

    fn has_queue_for(&self, run_date: NaiveDate) -> Result<bool, EngineError> {
        Ok(self.queue_exists_for(run_date)?)
    }

    /// One transaction per run. The date is re-checked under the write lock,
    /// and the unique `(run_date, rank)` index catches any writer that got
    /// past it anyway.
    fn write_queue(&self, run_date: NaiveDate, rows: &[QueueRow]) -> Result<(), EngineError> {
        self.with_transaction(|db| {
            if db.queue_exists_for(run_date)? {
                return Err(EngineError::AlreadyScored(run_date));
            }
            for row in rows {
                db.insert_queue_row(row)?;
            }
            Ok(())
        })
    }
}
