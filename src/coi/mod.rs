//! Center-of-Influence (referral partner) scoring and the daily queue run.

pub mod run;
pub mod scorer;

pub use run::{
    run_envelope, run_scoring, CoiStore, QueueRow, RankedCoi, RunEnvelope, RunRequest,
    RunResponse, DEFAULT_TOP_N,
};
pub use scorer::{
    CoiContact, CoiReason, CoiRecord, CoiScorer, DefaultWarmth, ScoredCoi, WarmthScorer,
};
