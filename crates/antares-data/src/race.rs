//! Races.
//!
//! A race maps buildable names to concrete templates, so the same
//! scenario can hand different fleets to different players.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A playable race.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Race {
    pub id: i32,
    #[serde(default)]
    pub name: String,
    /// Buildable name -> template name.
    #[serde(default)]
    pub ships: BTreeMap<String, String>,
}

impl Race {
    /// Resolve a buildable name through this race's ship table; names
    /// the race does not remap pass through unchanged.
    pub fn ship<'a>(&'a self, buildable: &'a str) -> &'a str {
        self.ships
            .get(buildable)
            .map(String::as_str)
            .unwrap_or(buildable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ship_lookup_falls_through() {
        let mut ships = BTreeMap::new();
        ships.insert("cruiser".to_owned(), "ishiman-cruiser".to_owned());
        let race = Race {
            id: 100,
            name: "Ishiman".to_owned(),
            ships,
        };
        assert_eq!(race.ship("cruiser"), "ishiman-cruiser");
        assert_eq!(race.ship("bunker"), "bunker");
    }
}
