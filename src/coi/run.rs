//! Daily COI scoring run: load partners, score, keep the top N, persist once
//! per run date.

use chrono::NaiveDate;
use serde::Serialize;

use super::scorer::{CoiContact, CoiReason, CoiRecord, CoiScorer, ScoredCoi};
use crate::error::{EngineError, ErrorType, RunFailure};

pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Clone, Copy, Default)]
pub struct RunRequest {
    pub dry_run: bool,
    /// Defaults to today when absent.
    pub run_date: Option<NaiveDate>,
}

/// One persisted queue entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueueRow {
    pub run_date: NaiveDate,
    pub rank: u32,
    pub coi_id: String,
    pub score: u32,
    pub reason: CoiReason,
    pub best_contact: Option<CoiContact>,
}

/// Record store seam for scoring runs.
pub trait CoiStore {
    fn load_partners(&self) -> Result<Vec<CoiRecord>, EngineError>;

    fn has_queue_for(&self, run_date: NaiveDate) -> Result<bool, EngineError>;

    /// Write every row or none. Implementations must reject a date that
    /// already has rows with `EngineError::AlreadyScored`.
    fn write_queue(&self, run_date: NaiveDate, rows: &[QueueRow]) -> Result<(), EngineError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub total: usize,
    pub total_candidates: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedCoi {
    pub rank: u32,
    pub id: String,
    pub score: u32,
    pub name: String,
    pub firm_type: Option<String>,
    pub region: Option<String>,
    pub best_contact: Option<CoiContact>,
    pub reasons: CoiReason,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    pub success: bool,
    pub dry_run: bool,
    pub run_date: NaiveDate,
    pub stats: RunStats,
    pub cois: Vec<RankedCoi>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureResponse {
    pub success: bool,
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RunBody {
    Success(RunResponse),
    Failure(FailureResponse),
}

/// Run outcome with an HTTP-equivalent status code.
#[derive(Debug, Clone, Serialize)]
pub struct RunEnvelope {
    pub status: u16,
    pub body: RunBody,
}

impl RunEnvelope {
    pub fn is_success(&self) -> bool {
        matches!(self.body, RunBody::Success(_))
    }
}

fn ranked(position: usize, scored: ScoredCoi) -> RankedCoi {
    RankedCoi {
        rank: position as u32 + 1,
        id: scored.record.id,
        score: scored.score,
        name: scored.record.name,
        firm_type: scored.record.firm_type,
        region: scored.record.region,
        best_contact: scored.best_contact,
        reasons: scored.reason,
    }
}

fn queue_row(run_date: NaiveDate, coi: &RankedCoi) -> QueueRow {
    QueueRow {
        run_date,
        rank: coi.rank,
        coi_id: coi.id.clone(),
        score: coi.score,
        reason: coi.reasons,
        best_contact: coi.best_contact.clone(),
    }
}

/// Score every partner and keep the top `top_n`.
///
/// Non-dry runs refuse a date that already has a queue and persist the kept
/// rows as one batch. Dry runs neither check nor write.
pub fn run_scoring(
    store: &dyn CoiStore,
    scorer: &CoiScorer,
    request: RunRequest,
    today: NaiveDate,
    top_n: usize,
) -> Result<RunResponse, EngineError> {
    if top_n == 0 {
        return Err(EngineError::InvalidRequest(
            "top N must be at least 1".to_string(),
        ));
    }
    let run_date = request.run_date.unwrap_or(today);

    if !request.dry_run && store.has_queue_for(run_date)? {
        return Err(EngineError::AlreadyScored(run_date));
    }

    let partners = store.load_partners()?;
    let total_candidates = partners.len();
    let cois: Vec<RankedCoi> = scorer
        .rank(&partners)
        .into_iter()
        .take(top_n)
        .enumerate()
        .map(|(i, scored)| ranked(i, scored))
        .collect();

    if request.dry_run {
        log::info!(
            "COI dry run for {}: {} of {} partners would be queued",
            run_date,
            cois.len(),
            total_candidates
        );
    } else {
        let rows: Vec<QueueRow> = cois.iter().map(|c| queue_row(run_date, c)).collect();
        store.write_queue(run_date, &rows)?;
        log::info!(
            "COI queue for {}: wrote {} of {} partners",
            run_date,
            rows.len(),
            total_candidates
        );
    }

    Ok(RunResponse {
        success: true,
        dry_run: request.dry_run,
        run_date,
        stats: RunStats {
            total: cois.len(),
            total_candidates,
        },
        cois,
    })
}

/// Wrap a run for a caller that wants a status code and a JSON body.
pub fn run_envelope(
    store: &dyn CoiStore,
    scorer: &CoiScorer,
    request: RunRequest,
    today: NaiveDate,
    top_n: usize,
) -> RunEnvelope {
    match run_scoring(store, scorer, request, today, top_n) {
        Ok(response) => RunEnvelope {
            status: 200,
            body: RunBody::Success(response),
        },
        Err(err) => {
            let failure = RunFailure::from(&err);
            let message = if err.is_conflict() {
                log::warn!("COI scoring skipped: {}", err);
                failure.message
            } else {
                log::error!("COI scoring failed: {}", err);
                "COI scoring failed".to_string()
            };
            RunEnvelope {
                status: err.status_code(),
                body: RunBody::Failure(FailureResponse {
                    success: false,
                    message,
                    error_type: failure.error_type,
                    can_retry: failure.can_retry,
                    recovery_suggestion: failure.recovery_suggestion,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStore {
        partners: Vec<CoiRecord>,
        queues: RefCell<HashMap<NaiveDate, Vec<QueueRow>>>,
        fail_loads: bool,
    }

    impl CoiStore for MemoryStore {
        fn load_partners(&self) -> Result<Vec<CoiRecord>, EngineError> {
            if self.fail_loads {
                return Err(EngineError::Store("disk I/O error".to_string()));
            }
            Ok(self.partners.clone())
        }

        fn has_queue_for(&self, run_date: NaiveDate) -> Result<bool, EngineError> {
            Ok(self.queues.borrow().contains_key(&run_date))
        }

        fn write_queue(&self, run_date: NaiveDate, rows: &[QueueRow]) -> Result<(), EngineError> {
            let mut queues = self.queues.borrow_mut();
            if queues.contains_key(&run_date) {
                return Err(EngineError::AlreadyScored(run_date));
            }
            queues.insert(run_date, rows.to_vec());
            Ok(())
        }
    }

    fn partner(id: &str, firm_type: &str, region: &str) -> CoiRecord {
        CoiRecord {
            id: id.to_string(),
            name: format!("Firm {id}"),
            firm_type: Some(firm_type.to_string()),
            region: Some(region.to_string()),
            contacts: Vec::new(),
        }
    }

    fn store_with(count: usize) -> MemoryStore {
        MemoryStore {
            partners: (0..count)
                .map(|i| partner(&format!("p{i:02}"), "CPA", "Boston, MA"))
                .collect(),
            ..Default::default()
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).expect("valid date")
    }

    #[test]
    fn keeps_top_n_and_persists_once() {
        let store = store_with(8);
        let response = run_scoring(&store, &CoiScorer::default(), RunRequest::default(), day(), 5)
            .expect("first run");
        assert_eq!(response.stats.total, 5);
        assert_eq!(response.stats.total_candidates, 8);
        assert_eq!(response.cois[0].rank, 1);
        assert_eq!(response.cois[4].rank, 5);

        let queues = store.queues.borrow();
        let rows = queues.get(&day()).expect("queue written");
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.run_date == day()));
    }

    #[test]
    fn second_run_same_day_conflicts() {
        let store = store_with(3);
        let scorer = CoiScorer::default();
        run_scoring(&store, &scorer, RunRequest::default(), day(), 5).expect("first run");
        let err = run_scoring(&store, &scorer, RunRequest::default(), day(), 5)
            .expect_err("second run must conflict");
        assert!(err.is_conflict());
        assert_eq!(store.queues.borrow().get(&day()).map(Vec::len), Some(3));
    }

    #[test]
    fn dry_run_neither_checks_nor_writes() {
        let store = store_with(3);
        let scorer = CoiScorer::default();
        run_scoring(&store, &scorer, RunRequest::default(), day(), 5).expect("first run");

        let dry = RunRequest {
            dry_run: true,
            run_date: None,
        };
        let response = run_scoring(&store, &scorer, dry, day(), 5).expect("dry run");
        assert!(response.dry_run);
        assert_eq!(response.stats.total, 3);

        let other_day = NaiveDate::from_ymd_opt(2026, 3, 3).expect("valid date");
        let dry_other = RunRequest {
            dry_run: true,
            run_date: Some(other_day),
        };
        run_scoring(&store, &scorer, dry_other, day(), 5).expect("dry run");
        assert!(!store.queues.borrow().contains_key(&other_day));
    }

    #[test]
    fn explicit_run_date_overrides_today() {
        let store = store_with(1);
        let other_day = NaiveDate::from_ymd_opt(2026, 4, 1).expect("valid date");
        let request = RunRequest {
            dry_run: false,
            run_date: Some(other_day),
        };
        let response =
            run_scoring(&store, &CoiScorer::default(), request, day(), 5).expect("run");
        assert_eq!(response.run_date, other_day);
        assert!(store.queues.borrow().contains_key(&other_day));
    }

    #[test]
    fn zero_top_n_is_rejected() {
        let err = run_scoring(&store_with(1), &CoiScorer::default(), RunRequest::default(), day(), 0)
            .expect_err("invalid");
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn envelope_status_codes() {
        let store = store_with(2);
        let scorer = CoiScorer::default();

        let ok = run_envelope(&store, &scorer, RunRequest::default(), day(), 5);
        assert_eq!(ok.status, 200);
        assert!(ok.is_success());
        let json = serde_json::to_value(&ok.body).expect("serialize");
        assert_eq!(json["success"], true);
        assert_eq!(json["run_date"], "2026-03-02");
        assert_eq!(json["stats"]["total_candidates"], 2);
        assert_eq!(json["cois"][0]["reasons"]["regional_activity"], 45);

        let conflict = run_envelope(&store, &scorer, RunRequest::default(), day(), 5);
        assert_eq!(conflict.status, 409);
        let json = serde_json::to_value(&conflict.body).expect("serialize");
        assert_eq!(json["success"], false);
        assert_eq!(json["error_type"], "conflict");
        assert!(json["message"].as_str().unwrap_or_default().contains("2026-03-02"));
    }

    #[test]
    fn store_failure_is_generic() {
        let store = MemoryStore {
            fail_loads: true,
            ..Default::default()
        };
        let envelope = run_envelope(&store, &CoiScorer::default(), RunRequest::default(), day(), 5);
        assert_eq!(envelope.status, 500);
        let json = serde_json::to_value(&envelope.body).expect("serialize");
        assert_eq!(json["message"], "COI scoring failed");
        assert_eq!(json["can_retry"], false);
    }
}
