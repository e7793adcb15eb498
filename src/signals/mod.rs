//! Trigger signals: best-effort payload access, size classification and
//! star ranking.
//!
//! Payloads arrive from heterogeneous imports, so every accessor here is
//! tolerant. A field that cannot be read is "no signal".

pub mod bag;
pub mod classify;
pub mod stars;

pub use bag::TriggerBag;
pub use classify::{classify_bag, classify_signals, SignalSize, SignalSizes};
pub use stars::{compute_stars, resolve_stars, ContactReach, DualStars, Priority};
