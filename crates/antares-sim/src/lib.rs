//! Antares sim -- the deterministic fixed-tick combat engine.
//!
//! One [`Game`] value owns all per-run state: the 250-slot space-object
//! arena and its threaded active list, admirals and destinations, the
//! vector and sprite arenas, the delayed-action queue, and the clocks
//! and random streams. [`Game::tick`] advances one major tick (three
//! 60 Hz minor ticks) through the full pipeline -- motion, AI think,
//! admiral economy, queued actions, collision and locality, conditions,
//! culling -- in a fixed order, so that two runs fed identical per-tick
//! input words stay bit-identical forever. [`replay`] records and
//! verifies exactly that.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use antares_data::Plugin;
//! use antares_sim::prelude::*;
//!
//! # fn run(text: &str) -> anyhow::Result<()> {
//! let plug = Arc::new(Plugin::load(text)?);
//! let mut game = start_level(plug, 0, 12345)?;
//! loop {
//!     game.inject_input(0, 0);
//!     game.tick();
//!     for effect in game.drain_effects() {
//!         // hand sounds, messages, and flashes to their collaborators
//!         let _ = effect;
//!     }
//!     if game.is_game_over() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Rendering, audio, input capture, and UI flow are collaborators: the
//! renderer consumes [`Game::snapshot`] between ticks, audio and HUD
//! drain the effect buffer, and input arrives through
//! [`Game::inject_input`] as per-player key words.

#![deny(unsafe_code)]

pub mod action;
pub mod admiral;
pub mod condition;
pub mod game;
pub mod handle;
pub mod initial;
pub mod level;
pub mod motion;
pub mod obj;
pub mod replay;
pub mod sprite;
pub mod think;
pub mod vector;

pub use game::{Drawable, Effect, Game, MessageSink};
pub use handle::{AdmHandle, DestHandle, ObjHandle, SpriteHandle, VectorHandle};
pub use level::{declare_winner, start_level, SimError};
pub use replay::{replay, InputFrame, ReplayLog, ReplayRecorder, ReplayResult};

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::admiral::{Admiral, Destination};
    pub use crate::game::{Drawable, Effect, Game, MessageSink};
    pub use crate::handle::{AdmHandle, ObjHandle};
    pub use crate::level::{start_level, SimError};
    pub use crate::obj::{keys, Activity, Presence, SpaceObject};
    pub use crate::replay::{replay, InputFrame, ReplayLog, ReplayRecorder};
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use antares_data::object::attr;
    use antares_data::{Info, Plugin};
    use antares_math::{Coord, UNIVERSAL_CENTER};
    use serde_json::json;

    use crate::game::Game;
    use crate::handle::AdmHandle;

    pub fn center() -> Coord {
        Coord::new(UNIVERSAL_CENTER, UNIVERSAL_CENTER)
    }

    /// A small but complete plugin: blessed objects, a fighting ship
    /// with a gun, a projectile, and passive drones.
    pub fn fixture_plugin() -> Arc<Plugin> {
        let info = Info {
            identifier: "0123456789abcdef0123456789abcdef01234567".to_owned(),
            format: 1,
            title: "fixture".to_owned(),
            author: String::new(),
            version: String::new(),
            urls: vec![],
            warp_in_flare: "warp-in-flare".to_owned(),
            warp_out_flare: "warp-out-flare".to_owned(),
            player_body: "player-body".to_owned(),
            energy_blob: "energy-blob".to_owned(),
        };

        let flare_attrs = attr::IS_SELF_ANIMATED;
        let cruiser_attrs = attr::CAN_TURN
            | attr::CAN_BE_ENGAGED
            | attr::HAS_DIRECTION_GOAL
            | attr::SHAPE_FROM_DIRECTION
            | attr::CAN_ENGAGE
            | attr::CAN_EVADE
            | attr::CAN_ACCEPT_DESTINATION
            | attr::CAN_COLLIDE
            | attr::CAN_BE_HIT
            | attr::HATED
            | attr::OCCUPIES_SPACE
            | attr::CAN_BE_EVADED
            | attr::APPEAR_ON_RADAR;
        let body_attrs = attr::IS_PLAYER_SHIP | attr::CAN_TURN | attr::HAS_DIRECTION_GOAL;
        let bolt_attrs = attr::CAN_COLLIDE | attr::SHAPE_FROM_DIRECTION;
        let drone_attrs = attr::CAN_COLLIDE | attr::CAN_BE_HIT | attr::SHAPE_FROM_DIRECTION;
        let bouncer_attrs = drone_attrs | attr::DOES_BOUNCE;

        let objects = json!([
            {
                "name": "warp-in-flare",
                "attributes": flare_attrs,
                "animation": {
                    "sprite": "flare",
                    "last_shape": 2560,
                    "frame_speed": 256
                },
                "initial_age": 30
            },
            {
                "name": "warp-out-flare",
                "attributes": flare_attrs,
                "animation": {
                    "sprite": "flare",
                    "last_shape": 2560,
                    "frame_speed": 256
                },
                "initial_age": 30
            },
            {
                "name": "player-body",
                "attributes": body_attrs,
                "health": 1,
                "initial_age": 1800,
                "rotation": { "sprite": "body", "turn_rate": 512 }
            },
            {
                "name": "energy-blob",
                "attributes": drone_attrs,
                "health": 1,
                "energy": 500,
                "rotation": { "sprite": "blob" }
            },
            {
                "name": "bolt",
                "attributes": bolt_attrs,
                "damage": 10,
                "initial_age": 60,
                "max_velocity": 2048,
                "initial_velocity": 2048,
                "rotation": { "sprite": "bolt", "width": 4, "height": 4 }
            },
            {
                "name": "gun",
                "attributes": 0,
                "device": {
                    "usage": 2,
                    "energy_cost": 1,
                    "fire_time": 9,
                    "ammo": -1,
                    "range": 16384,
                    "inverse_speed": 32
                },
                "activate": [
                    {
                        "verb": {
                            "type": "create-object",
                            "base": "bolt",
                            "relative_velocity": true,
                            "relative_direction": true
                        },
                        "reflexive": true
                    }
                ]
            },
            {
                "name": "cruiser",
                "attributes": cruiser_attrs,
                "health": 100,
                "energy": 500,
                "damage": 5,
                "mass": 256,
                "max_velocity": 1024,
                "max_thrust": 512,
                "warp_speed": 4096,
                "warp_out_distance": 1000000,
                "rotation": {
                    "sprite": "cruiser",
                    "turn_rate": 512,
                    "width": 32,
                    "height": 32
                },
                "pulse": { "base": "gun" }
            },
            {
                "name": "drone",
                "attributes": drone_attrs,
                "health": 50,
                "mass": 256,
                "rotation": { "sprite": "drone" }
            },
            {
                "name": "bouncer",
                "attributes": bouncer_attrs,
                "health": 50,
                "mass": 256,
                "max_velocity": 1024,
                "rotation": { "sprite": "drone" }
            }
        ]);

        let levels = json!([
            {
                "name": "fixture level",
                "angle": 0,
                "start_time": 0,
                "players": [
                    { "player_type": "human", "name": "Us", "race": 0 },
                    { "player_type": "cpu", "name": "Them", "race": 0 }
                ],
                "initials": [],
                "conditions": []
            }
        ]);

        let objects = serde_json::from_value(objects).expect("fixture objects");
        let levels = serde_json::from_value(levels).expect("fixture levels");
        Arc::new(Plugin::from_parts(info, objects, vec![], levels).expect("fixture plugin"))
    }

    /// A game over the fixture plugin with two active admirals and no
    /// placements.
    pub fn bare_game() -> Game {
        let mut g = Game::new(fixture_plugin(), 0, 12345);
        for (i, name) in ["Us", "Them"].iter().enumerate() {
            g.admirals[i].active = true;
            g.admirals[i].name = (*name).to_owned();
            g.admirals[i].earning_power = antares_math::Fixed::from_long(1);
        }
        g.admiral = AdmHandle(0);
        g
    }
}
