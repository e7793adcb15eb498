//! Identity resolution for contacts and companies arriving from multiple
//! import sources.

pub mod duplicates;
pub mod keys;

pub use duplicates::{
    best_company_match, detect_duplicate_contacts, find_company_duplicates, CompanyName,
    ContactName,
};
pub use keys::{
    canonical_company_name, fuzzy_match, is_valid_match_key, merge_tags, normalize_match_key,
    resolve_match_key, MatchKey,
};
