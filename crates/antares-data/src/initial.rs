//! Scenario placements.
//!
//! An [`Initial`] places one object when a level is constructed. At
//! runtime each resolves to at most one live object; stale resolutions
//! are detected by id snapshot.

use antares_math::{Fixed, Point};
use serde::{Deserialize, Serialize};

/// Most objects a single base can offer to build.
pub const MAX_SHIP_CAN_BUILD: usize = 6;

/// One scenario-time placement record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Initial {
    /// Template (or race-ship) name.
    pub base: String,
    #[serde(skip)]
    pub base_id: Option<super::BaseId>,
    /// Scenario player index; absent is unowned.
    #[serde(default)]
    pub owner: Option<i32>,
    /// Level-relative position, rotated by the level angle at creation.
    pub at: Point,
    /// Created only when revealed by an action.
    #[serde(default)]
    pub hidden: bool,
    /// Becomes the owner's flagship.
    #[serde(default)]
    pub flagship: bool,
    /// Initial index this object is ordered toward.
    #[serde(default)]
    pub target: Option<usize>,
    /// Pin the destination so orders cannot change it.
    #[serde(default)]
    pub target_lock: bool,
    /// Display-name override.
    #[serde(default)]
    pub name_override: Option<String>,
    /// Sprite override.
    #[serde(default)]
    pub sprite_override: Option<String>,
    /// Earning rate contributed to the owner, for destinations.
    #[serde(default)]
    pub earning: Option<Fixed>,
    /// Buildable names offered at this object, up to
    /// [`MAX_SHIP_CAN_BUILD`].
    #[serde(default)]
    pub build: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_initial() {
        let json = r#"{ "base": "bunker", "at": { "h": -2000, "v": 1000 } }"#;
        let i: Initial = serde_json::from_str(json).unwrap();
        assert_eq!(i.base, "bunker");
        assert!(!i.hidden);
        assert!(i.owner.is_none());
        assert!(i.build.is_empty());
    }
}
