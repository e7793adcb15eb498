//! Lead prioritization and identity resolution.
//!
//! Raw company and contact records go in; a ranked, deduplicated outreach
//! queue and a daily referral-partner (COI) queue come out. The scoring and
//! matching modules are pure; `db` is the SQLite record store behind the
//! `CoiStore` and `ContactStore` seams.

pub mod coi;
pub mod db;
pub mod error;
pub mod identity;
pub mod import;
mod migrations;
pub mod persona;
pub mod queue;
pub mod region;
pub mod signals;
pub mod state;
pub mod triggers;
pub mod types;
pub mod util;
