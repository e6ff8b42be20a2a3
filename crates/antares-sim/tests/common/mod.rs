//! Shared fixture plugin for the integration suites.

use std::sync::Arc;

use antares_data::object::attr;
use antares_data::{Info, Plugin};
use antares_math::{Coord, UNIVERSAL_CENTER};
use serde_json::json;

/// Route engine tracing through the test harness; safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn center() -> Coord {
    Coord::new(UNIVERSAL_CENTER, UNIVERSAL_CENTER)
}

/// A complete plugin with fighting ships, a projectile weapon, energy
/// pods, delayed-action templates, and two levels:
///
/// - level 0 "skirmish": one cruiser per player, the human's flagged.
/// - level 1 "paired conditions": two drones near each other plus a
///   distance condition that bumps a counter and a counter condition
///   that declares the winner -- AND semantics via pairing.
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

    let objects = json!([
        {
            "name": "warp-in-flare",
            "attributes": flare_attrs,
            "animation": { "sprite": "flare", "last_shape": 2560, "frame_speed": 256 },
            "initial_age": 30
        },
        {
            "name": "warp-out-flare",
            "attributes": flare_attrs,
            "animation": { "sprite": "flare", "last_shape": 2560, "frame_speed": 256 },
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
            "rotation": { "sprite": "cruiser", "turn_rate": 512, "width": 32, "height": 32 },
            "pulse": { "base": "gun" }
        },
        {
            "name": "pod-ship",
            "attributes": cruiser_attrs,
            "health": 100,
            "energy": 500,
            "mass": 256,
            "max_velocity": 1024,
            "rotation": { "sprite": "cruiser", "width": 32, "height": 32 },
            "destroy": [
                { "verb": { "type": "release-energy", "percent": 256 } }
            ]
        },
        {
            "name": "drone",
            "attributes": drone_attrs,
            "health": 50,
            "mass": 256,
            "rotation": { "sprite": "drone" }
        },
        {
            "name": "delayed-a",
            "attributes": 0,
            "create": [
                {
                    "verb": { "type": "change-score", "player": 0, "which": 0, "amount": 1 },
                    "delay": 10,
                    "reflexive": true
                }
            ]
        },
        {
            "name": "delayed-b",
            "attributes": 0,
            "create": [
                {
                    "verb": { "type": "change-score", "player": 0, "which": 1, "amount": 1 },
                    "delay": 20,
                    "reflexive": true
                }
            ]
        },
        {
            "name": "delayed-c",
            "attributes": 0,
            "create": [
                {
                    "verb": { "type": "change-score", "player": 0, "which": 2, "amount": 1 },
                    "delay": 20,
                    "reflexive": true
                }
            ]
        }
    ]);

    let levels = json!([
        {
            "name": "skirmish",
            "angle": 0,
            "start_time": 0,
            "players": [
                { "player_type": "human", "name": "Us", "race": 0 },
                { "player_type": "cpu", "name": "Them", "race": 0 }
            ],
            "initials": [
                {
                    "base": "cruiser",
                    "owner": 0,
                    "at": { "h": -4000, "v": 0 },
                    "flagship": true
                },
                {
                    "base": "cruiser",
                    "owner": 1,
                    "at": { "h": 4000, "v": 0 }
                }
            ],
            "conditions": []
        },
        {
            "name": "paired conditions",
            "angle": 0,
            "start_time": 0,
            "players": [
                { "player_type": "human", "name": "Us", "race": 0 },
                { "player_type": "cpu", "name": "Them", "race": 0 }
            ],
            "initials": [
                { "base": "drone", "owner": 0, "at": { "h": 0, "v": 0 } },
                { "base": "drone", "owner": 1, "at": { "h": 0, "v": 500 } }
            ],
            "conditions": [
                {
                    "type": "distance",
                    "value": 1000000,
                    "op": "lt",
                    "persistent": false,
                    "subject": 0,
                    "object": 1,
                    "action": [
                        {
                            "verb": {
                                "type": "change-score",
                                "player": 0,
                                "which": 0,
                                "amount": 1
                            }
                        }
                    ]
                },
                {
                    "type": "counter",
                    "player": 0,
                    "counter": 0,
                    "value": 1,
                    "op": "eq",
                    "persistent": false,
                    "action": [
                        {
                            "verb": {
                                "type": "declare-winner",
                                "player": 0,
                                "text": "paired"
                            }
                        }
                    ]
                }
            ]
        }
    ]);

    let objects = serde_json::from_value(objects).expect("fixture objects");
    let levels = serde_json::from_value(levels).expect("fixture levels");
    Arc::new(Plugin::from_parts(info, objects, vec![], levels).expect("fixture plugin"))
}
