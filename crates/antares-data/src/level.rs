//! Levels.
//!
//! A level bundles players, placements, and conditions. The start time
//! is the warmup the engine runs before handing control to the player.

use antares_math::{Fixed, Ticks};
use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::initial::Initial;

/// Most players a level can have.
pub const MAX_PLAYERS: usize = 4;

/// Who drives a player slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayerType {
    Human,
    Cpu,
}

/// Scenario-side configuration of one admiral.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub player_type: PlayerType,
    #[serde(default)]
    pub name: String,
    /// Race id; resolved against the plugin's race table.
    #[serde(default)]
    pub race: i32,
    #[serde(default)]
    pub earning_power: Fixed,
    #[serde(default)]
    pub hue: u8,
}

/// One playable chapter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    /// Rotation applied to every placement; negative draws a random
    /// angle from the global stream.
    #[serde(default = "minus_one")]
    pub angle: i32,
    /// Warmup duration simulated before time zero.
    #[serde(default)]
    pub start_time: Ticks,
    pub players: Vec<Player>,
    #[serde(default)]
    pub initials: Vec<Initial>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Status strings for the score area; referenced by index.
    #[serde(default)]
    pub score_strings: Vec<String>,
}

fn minus_one() -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_with_two_players() {
        let json = r#"{
            "name": "While the Iron is Hot",
            "start_time": 900,
            "players": [
                { "player_type": "human", "name": "Ishiman", "race": 100 },
                { "player_type": "cpu", "name": "Cantharan", "race": 200 }
            ]
        }"#;
        let level: Level = serde_json::from_str(json).unwrap();
        assert_eq!(level.players.len(), 2);
        assert_eq!(level.players[0].player_type, PlayerType::Human);
        assert_eq!(level.angle, -1, "angle defaults to random");
        assert_eq!(level.start_time, Ticks(900));
    }
}
