//! Antares data -- the parsed level/plug-in data model.
//!
//! The asset loader (out of scope here) produces a JSON document; this
//! crate deserializes it into the immutable tables the simulation reads:
//! object templates, the action and condition tagged unions, scenario
//! placements, races, and levels. [`Plugin::load`] resolves every
//! by-name reference to a table index and fails fast on anything the
//! engine cannot run without -- most importantly the four blessed
//! objects (warp-in flare, warp-out flare, player body, energy blob).
//!
//! Everything in this crate is immutable after load and shared read-only
//! with the simulation.

#![deny(unsafe_code)]

pub mod action;
pub mod condition;
pub mod initial;
pub mod level;
pub mod object;
pub mod plugin;
pub mod race;

pub use action::{Action, Alter, KillKind, MoveOrigin, OwnerFilter, PushKind, Verb, Weapon};
pub use condition::{Condition, ConditionKind, ConditionOp, SubjectValue};
pub use initial::{Initial, MAX_SHIP_CAN_BUILD};
pub use level::{Level, Player, PlayerType, MAX_PLAYERS};
pub use object::{
    attr, build_flag, runtime_flag, usage, Animation, BaseId, BaseObject, Device, RotationFrame,
    VectorFrame, VectorKind, WeaponDef, CLOAK_OFF_STATE_MAX, CLOAK_ON_STATE_MAX, ENERGY_POD_AMOUNT,
    ENGAGE_RANGE, HIT_STATE_MAX, MAX_SPACE_OBJECTS, WARP_ACCELERATION,
};
pub use plugin::{Blessed, Info, LoadError, Plugin};
pub use race::Race;

/// Screens on the player's mini-computer, referenced by conditions and
/// the computer-select verb.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Screen {
    Main,
    Build,
    Special,
    Message,
    Status,
}

/// Instrument zoom levels.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Zoom {
    Double = 0,
    #[default]
    Actual = 1,
    Half = 2,
    Quarter = 3,
    Sixteenth = 4,
    Foe = 5,
    Object = 6,
    All = 7,
}
