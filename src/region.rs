//! Region markers shared by trigger inference and COI scoring.
//!
//! Regions are free text ("Boston, MA", "Hartford CT", "Rhode Island"), so
//! markers are matched as whole words after lowercasing.

use crate::util::contains_any_keyword;

const MASSACHUSETTS_MARKERS: &[&str] = &[
    "ma",
    "mass",
    "massachusetts",
    "boston",
    "worcester",
    "cambridge",
    "lowell",
    "quincy",
];

const NEW_ENGLAND_MARKERS: &[&str] = &[
    "new england",
    "ct",
    "connecticut",
    "hartford",
    "ri",
    "rhode island",
    "providence",
    "nh",
    "new hampshire",
    "vt",
    "vermont",
    "me",
    "maine",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionTier {
    Massachusetts,
    NewEngland,
    Elsewhere,
}

/// Tier for a free-text region. `None` when the region is blank or missing.
pub fn region_tier(region: Option<&str>) -> Option<RegionTier> {
    let region = region
        .map(|r| r.trim().to_lowercase())
        .filter(|r| !r.is_empty())?;
    Some(if contains_any_keyword(&region, MASSACHUSETTS_MARKERS) {
        RegionTier::Massachusetts
    } else if contains_any_keyword(&region, NEW_ENGLAND_MARKERS) {
        RegionTier::NewEngland
    } else {
        RegionTier::Elsewhere
    })
}

pub fn is_massachusetts(region: Option<&str>) -> bool {
    region_tier(region) == Some(RegionTier::Massachusetts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_and_state_markers() {
        assert_eq!(region_tier(Some("Boston")), Some(RegionTier::Massachusetts));
        assert_eq!(region_tier(Some("Worcester, MA")), Some(RegionTier::Massachusetts));
        assert_eq!(region_tier(Some("Providence")), Some(RegionTier::NewEngland));
        assert_eq!(region_tier(Some("Portland, ME")), Some(RegionTier::NewEngland));
        assert_eq!(region_tier(Some("Austin, TX")), Some(RegionTier::Elsewhere));
        assert_eq!(region_tier(Some("  ")), None);
        assert_eq!(region_tier(None), None);
    }

    #[test]
    fn markers_match_whole_words() {
        // "ma" inside "Omaha" is not Massachusetts.
        assert_eq!(region_tier(Some("Omaha, NE")), Some(RegionTier::Elsewhere));
        assert!(!is_massachusetts(Some("Miami")));
    }
}
