//! Level construction and end-of-level flow.
//!
//! Construction stages a level the way the loader screen does: admirals
//! first, then placements (rotated by the level angle), then the
//! double-back pass that wires scripted destinations, then the warmup
//! that simulates the pre-start time so the level opens mid-motion.

use std::sync::Arc;

use antares_data::{PlayerType, Plugin};
use antares_math::{add_angle, rot_point, Coord, Fixed, GameTime, Ticks, ROT_POS, UNIVERSAL_CENTER};
use tracing::{debug, info};

use crate::admiral::{self, Admiral};
use crate::game::Game;
use crate::handle::AdmHandle;
use crate::initial;

/// Why a level could not start.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("plugin has no level {0}")]
    NoSuchLevel(usize),

    #[error("level {0:?} has no players")]
    NoPlayers(String),
}

/// Build a running game from a loaded plugin: admirals, placements,
/// destination wiring, and the pre-start warmup.
pub fn start_level(plug: Arc<Plugin>, level: usize, seed: i32) -> Result<Game, SimError> {
    let lvl = plug
        .levels
        .get(level)
        .ok_or(SimError::NoSuchLevel(level))?
        .clone();
    if lvl.players.is_empty() {
        return Err(SimError::NoPlayers(lvl.name.clone()));
    }

    let mut g = Game::new(plug, level, seed);

    g.angle = if lvl.angle < 0 {
        g.random.next(ROT_POS)
    } else {
        lvl.angle
    };

    for (i, player) in lvl.players.iter().enumerate().take(g.admirals.len()) {
        g.admirals[i] = Admiral::make(player);
        g.admirals[i].pay(Fixed::from_long(5000));
        if player.player_type == PlayerType::Human && g.admiral.is_none() {
            g.admiral = AdmHandle(i as i32);
        }
    }

    for (n, condition) in lvl.conditions.iter().enumerate() {
        g.condition_enabled[n] = condition.initially_enabled;
    }

    for index in 0..lvl.initials.len() {
        initial::create_initial(&mut g, index);
    }
    // Double back and wire up scripted destinations now that every
    // placement exists.
    for index in 0..lvl.initials.len() {
        initial::set_initial_destination(&mut g, index, false);
    }
    admiral::recalc_all_admiral_build_data(&mut g);

    // Warm up through the level's negative start time.
    g.time = GameTime::ZERO - lvl.start_time;
    g.start_time = g.time;
    while g.time < GameTime::ZERO {
        g.tick();
    }

    info!(name = %lvl.name, angle = g.angle, "level constructed");
    Ok(g)
}

/// End the level. Without a winner the game is over immediately; with
/// one, a short grace period runs first.
pub fn declare_winner(
    g: &mut Game,
    winner: AdmHandle,
    next_level: Option<usize>,
    text: &str,
) {
    if winner.is_none() {
        g.next_level = next_level;
        g.victory_text = text.to_owned();
        g.game_over = true;
        g.game_over_at = g.time;
        debug!("level over, no winner");
    } else if g.victor.is_none() {
        g.victor = winner;
        g.victory_text = text.to_owned();
        g.next_level = next_level;
        if !g.game_over {
            g.game_over = true;
            g.game_over_at = g.time + Ticks(3 * 60);
        }
        debug!(winner = winner.0, "winner declared");
    }
}

/// Rotate level-relative coordinates into universe space by the game's
/// placement angle.
pub fn translate_coord(g: &Game, h: i32, v: i32) -> Coord {
    translate_coord_rotated(h, v, g.angle)
}

/// Rotate level-relative coordinates by an explicit angle.
pub fn translate_coord_rotated(h: i32, v: i32, rotation: i32) -> Coord {
    let mut rotation = rotation;
    add_angle(&mut rotation, 90);
    let (lcos, lsin) = rot_point(rotation);
    let (lcos, lsin) = (-lcos, -lsin);
    let ch = (Fixed::from_val(h) * lcos).val() - (Fixed::from_val(v) * lsin).val();
    let cv = (Fixed::from_val(h) * lsin).val() + (Fixed::from_val(v) * lcos).val();
    Coord::new(
        UNIVERSAL_CENTER.wrapping_add(ch as u32),
        UNIVERSAL_CENTER.wrapping_add(cv as u32),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_at_zero_rotation_recenters() {
        // At rotation 0 the transform is (close to) a pure translation
        // to the universal center; table sampling adds a small skew.
        let c = translate_coord_rotated(0, 0, 0);
        assert_eq!(c.h, UNIVERSAL_CENTER);
        assert_eq!(c.v, UNIVERSAL_CENTER);

        let c = translate_coord_rotated(1000, 0, 0);
        let dh = c.h.wrapping_sub(UNIVERSAL_CENTER) as i32;
        assert!((dh - 1000).abs() < 32, "dh {dh}");
    }

    #[test]
    fn winner_gets_grace_period_no_winner_does_not() {
        let mut g = crate::testutil::bare_game();
        declare_winner(&mut g, AdmHandle::NONE, None, "defeat");
        assert!(g.game_over);
        assert_eq!(g.game_over_at, g.time);

        let mut g = crate::testutil::bare_game();
        declare_winner(&mut g, AdmHandle(0), Some(1), "victory");
        assert!(g.game_over);
        assert_eq!(g.game_over_at, g.time + Ticks(180));
        assert_eq!(g.winner(), AdmHandle(0));
        assert_eq!(g.next_level(), Some(1));

        // A second declaration does not displace the first victor.
        declare_winner(&mut g, AdmHandle(1), None, "late");
        assert_eq!(g.winner(), AdmHandle(0));
    }
}
