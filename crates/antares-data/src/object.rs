//! Object templates.
//!
//! A [`BaseObject`] is the immutable description of a kind of thing --
//! ship class, projectile, destination marker, weapon device -- from
//! which live objects are stamped. Templates are referenced by interned
//! name in the data files and by [`BaseId`] after load.

use antares_math::{Fixed, FixedPoint, Ticks};
use serde::{Deserialize, Serialize};

use crate::action::Action;

/// Capacity of the live-object arena.
pub const MAX_SPACE_OBJECTS: usize = 250;

/// Average energy per released pod.
pub const ENERGY_POD_AMOUNT: i32 = 500;

/// Warp-out deceleration per think slice, in whole velocity units.
pub const WARP_ACCELERATION: i32 = 1;

/// Range (squared) at which an object considers engaging its closest
/// target; about two subsectors.
pub const ENGAGE_RANGE: u32 = 1_048_576;

/// Hit-flash ramp maximum.
pub const HIT_STATE_MAX: i32 = 128;
/// Cloak ramp-on maximum.
pub const CLOAK_ON_STATE_MAX: i32 = 254;
/// Cloak ramp-off minimum.
pub const CLOAK_OFF_STATE_MAX: i32 = -252;

// ---------------------------------------------------------------------------
// Attribute bits
// ---------------------------------------------------------------------------

/// Capability and state bits carried by templates and live objects.
pub mod attr {
    pub const CAN_TURN: u32 = 0x0000_0001;
    pub const CAN_BE_ENGAGED: u32 = 0x0000_0002;
    pub const HAS_DIRECTION_GOAL: u32 = 0x0000_0004;
    pub const IS_REMOTE: u32 = 0x0000_0008;
    pub const IS_HUMAN_CONTROLLED: u32 = 0x0000_0010;
    pub const IS_VECTOR: u32 = 0x0000_0020;
    pub const DOES_BOUNCE: u32 = 0x0000_0040;
    pub const IS_SELF_ANIMATED: u32 = 0x0000_0080;
    pub const SHAPE_FROM_DIRECTION: u32 = 0x0000_0100;
    pub const IS_PLAYER_SHIP: u32 = 0x0000_0200;
    pub const CAN_BE_DESTINATION: u32 = 0x0000_0400;
    pub const CAN_ENGAGE: u32 = 0x0000_0800;
    pub const CAN_EVADE: u32 = 0x0000_1000;
    pub const CAN_ACCEPT_MESSAGES: u32 = 0x0000_2000;
    pub const CAN_ACCEPT_BUILD: u32 = 0x0000_4000;
    pub const CAN_ACCEPT_DESTINATION: u32 = 0x0000_8000;
    pub const AUTO_TARGET: u32 = 0x0001_0000;
    pub const ANIMATION_CYCLE: u32 = 0x0002_0000;
    pub const CAN_COLLIDE: u32 = 0x0004_0000;
    pub const CAN_BE_HIT: u32 = 0x0008_0000;
    pub const IS_DESTINATION: u32 = 0x0010_0000;
    pub const HIDE_EFFECT: u32 = 0x0020_0000;
    pub const RELEASE_ENERGY_ON_DEATH: u32 = 0x0040_0000;
    pub const HATED: u32 = 0x0080_0000;
    pub const OCCUPIES_SPACE: u32 = 0x0100_0000;
    pub const STATIC_DESTINATION: u32 = 0x0200_0000;
    pub const CAN_BE_EVADED: u32 = 0x0400_0000;
    pub const NEUTRAL_DEATH: u32 = 0x0800_0000;
    pub const IS_GUIDED: u32 = 0x1000_0000;
    pub const APPEAR_ON_RADAR: u32 = 0x2000_0000;
    pub const ON_AUTO_PILOT: u32 = 0x8000_0000;

    /// Not just "dumb": can engage, evade, or take orders.
    pub const CAN_THINK: u32 = CAN_ENGAGE | CAN_EVADE | CAN_ACCEPT_DESTINATION;
    pub const CONSIDER_DISTANCE: u32 = CAN_THINK | CAN_BE_DESTINATION;
    pub const POTENTIAL_TARGET: u32 = CAN_BE_ENGAGED | CAN_BE_EVADED;
    pub const REMOTE_OR_HUMAN: u32 = IS_PLAYER_SHIP;
}

/// Runtime flag bits on live objects.
pub mod runtime_flag {
    pub const HAS_ARRIVED: u32 = 0x0000_0001;
    pub const TARGET_LOCKED: u32 = 0x0000_0002;
    pub const IS_CLOAKED: u32 = 0x0000_0004;
    pub const IS_HIDDEN: u32 = 0x0000_0008;
    pub const IS_TARGET: u32 = 0x0000_0010;
}

/// Weapon usage bits.
pub mod usage {
    pub const TRANSPORTATION: u32 = 0x0000_0001;
    pub const ATTACKING: u32 = 0x0000_0002;
    pub const DEFENSE: u32 = 0x0000_0004;
}

/// Build flag bits sampled by the computer players.
pub mod build_flag {
    pub const UNCAPTURED_BASE_EXISTS: u32 = 0x0000_0001;
    pub const SUFFICIENT_ESCORTS_EXIST: u32 = 0x0000_0002;
    pub const THIS_BASE_NEEDS_PROTECTION: u32 = 0x0000_0004;
    pub const FRIEND_UP_TREND: u32 = 0x0000_0008;
    pub const FRIEND_DOWN_TREND: u32 = 0x0000_0010;
    pub const FOE_UP_TREND: u32 = 0x0000_0020;
    pub const FOE_DOWN_TREND: u32 = 0x0000_0040;
    pub const MATCHING_FOE_EXISTS: u32 = 0x0000_0080;
    pub const ONLY_ENGAGED_BY: u32 = 0x0040_0000;
    pub const CAN_ONLY_ENGAGE: u32 = 0x0080_0000;
}

// ---------------------------------------------------------------------------
// BaseId
// ---------------------------------------------------------------------------

/// Index of a template in the plugin's object table.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BaseId(pub u32);

// ---------------------------------------------------------------------------
// Frame data
// ---------------------------------------------------------------------------

/// Shape-from-direction sprite data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RotationFrame {
    /// Sprite resource name.
    #[serde(default)]
    pub sprite: Option<String>,
    #[serde(default)]
    pub layer: i16,
    /// Sprite scale; 4096 = 100%.
    #[serde(default = "default_scale")]
    pub scale: i32,
    /// Degrees of heading per sprite shape.
    #[serde(default = "default_rot_res")]
    pub rot_res: i32,
    /// Max turn rate, degrees of direction per tick in fixed point.
    #[serde(default)]
    pub turn_rate: Fixed,
    /// Unscaled frame size, for collision bounds.
    #[serde(default = "default_frame_size")]
    pub width: i32,
    #[serde(default = "default_frame_size")]
    pub height: i32,
}

fn default_frame_size() -> i32 {
    32
}

fn default_scale() -> i32 {
    4096
}

fn default_rot_res() -> i32 {
    360
}

impl Default for RotationFrame {
    fn default() -> Self {
        RotationFrame {
            sprite: None,
            layer: 0,
            scale: default_scale(),
            rot_res: default_rot_res(),
            turn_rate: Fixed::ZERO,
            width: default_frame_size(),
            height: default_frame_size(),
        }
    }
}

/// Self-animated sprite data.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Animation {
    #[serde(default)]
    pub sprite: Option<String>,
    #[serde(default)]
    pub layer: i16,
    #[serde(default = "default_scale")]
    pub scale: i32,
    /// First and last shape of the animation.
    #[serde(default)]
    pub first_shape: Fixed,
    #[serde(default)]
    pub last_shape: Fixed,
    /// Starting shape and random range.
    #[serde(default)]
    pub frame_shape: Fixed,
    #[serde(default)]
    pub frame_shape_range: Fixed,
    /// Playback direction: +1, -1, or 0; -1 range means "random sign".
    #[serde(default)]
    pub frame_direction: i32,
    #[serde(default)]
    pub frame_direction_range: i32,
    /// Shapes advanced per tick.
    #[serde(default)]
    pub frame_speed: Fixed,
    /// Unscaled frame size, for collision bounds.
    #[serde(default = "default_frame_size")]
    pub width: i32,
    #[serde(default = "default_frame_size")]
    pub height: i32,
}

impl Default for Animation {
    fn default() -> Self {
        Animation {
            sprite: None,
            layer: 0,
            scale: default_scale(),
            first_shape: Fixed::ZERO,
            last_shape: Fixed::ZERO,
            frame_shape: Fixed::ZERO,
            frame_shape_range: Fixed::ZERO,
            frame_direction: 0,
            frame_direction_range: 0,
            frame_speed: Fixed::ZERO,
            width: default_frame_size(),
            height: default_frame_size(),
        }
    }
}

/// The kinds of line entity a vector template can make.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VectorKind {
    /// A solid bolt from the object to its endpoint.
    #[default]
    Bolt,
    /// A beam pinned to a target object.
    BeamToObject,
    /// A lightning beam pinned to a target object.
    BeamToObjectLightning,
    /// A beam to a fixed relative coordinate.
    BeamToCoord,
    /// A lightning beam to a fixed relative coordinate.
    BeamToCoordLightning,
}

/// Vector (beam/bolt) template data.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VectorFrame {
    #[serde(default)]
    pub kind: VectorKind,
    /// Bolt color index; zero means invisible.
    #[serde(default)]
    pub color: u8,
    /// Hue for non-bolt beams.
    #[serde(default)]
    pub hue: Option<u8>,
    /// Endpoint jitter for inaccurate beams.
    #[serde(default)]
    pub accuracy: i32,
    #[serde(default)]
    pub range: i32,
}

/// Weapon device data. A weapon is itself a [`BaseObject`] whose
/// activate actions fire the shot.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Device {
    /// Usage bits: transportation, attacking, defense.
    #[serde(default)]
    pub usage: u32,
    #[serde(default)]
    pub energy_cost: i32,
    /// Cooldown between shots.
    #[serde(default)]
    pub fire_time: Ticks,
    /// Initial ammo; -1 is unlimited.
    #[serde(default = "default_ammo")]
    pub ammo: i32,
    /// Range (squared) the AI respects.
    #[serde(default)]
    pub range: i32,
    /// 1 / projectile speed, for target leading.
    #[serde(default)]
    pub inverse_speed: Fixed,
    /// Energy accumulated to restock one round; -1 means no restock.
    #[serde(default = "default_restock")]
    pub restock_cost: i32,
}

fn default_ammo() -> i32 {
    -1
}

fn default_restock() -> i32 {
    -1
}

/// A weapon slot on a template: the device's template name and the
/// unrotated mount offsets shots originate from.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WeaponDef {
    pub base: String,
    #[serde(skip)]
    pub base_id: Option<BaseId>,
    #[serde(default)]
    pub positions: Vec<FixedPoint>,
}

// ---------------------------------------------------------------------------
// BaseObject
// ---------------------------------------------------------------------------

/// An immutable object template.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaseObject {
    pub name: String,
    #[serde(default)]
    pub short_name: String,

    /// Capability bits; see [`attr`].
    pub attributes: u32,
    #[serde(default)]
    pub price: i32,
    #[serde(default)]
    pub offense_value: Fixed,
    #[serde(default = "default_destination_class")]
    pub destination_class: i32,

    #[serde(default)]
    pub max_velocity: Fixed,
    /// Warp speed multiplier; zero means cannot warp.
    #[serde(default)]
    pub warp_speed: Fixed,
    /// Distance (squared) at which to leave warp.
    #[serde(default)]
    pub warp_out_distance: u32,

    #[serde(default)]
    pub mass: Fixed,
    #[serde(default)]
    pub max_thrust: Fixed,

    #[serde(default)]
    pub health: i32,
    /// Damage dealt on impact.
    #[serde(default)]
    pub damage: i32,
    #[serde(default)]
    pub energy: i32,

    #[serde(default)]
    pub initial_velocity: Fixed,
    #[serde(default)]
    pub initial_velocity_range: Fixed,
    /// Lifetime before the expire hook; absent means immortal.
    #[serde(default)]
    pub initial_age: Option<Ticks>,
    #[serde(default)]
    pub initial_age_range: Ticks,
    #[serde(default)]
    pub initial_direction: i32,
    #[serde(default)]
    pub initial_direction_range: i32,

    /// Size of an occupying force that flips a neutral-death base.
    #[serde(default)]
    pub occupy_count: i32,

    /// Radar shield-flash hue; absent means no shield flash.
    #[serde(default)]
    pub shield_color: Option<u8>,
    #[serde(default)]
    pub tiny_size: i32,

    #[serde(default)]
    pub pulse: Option<WeaponDef>,
    #[serde(default)]
    pub beam: Option<WeaponDef>,
    #[serde(default)]
    pub special: Option<WeaponDef>,

    /// Distance (squared) at which walking to a destination triggers the
    /// arrive hook.
    #[serde(default)]
    pub arrive_action_distance: u32,

    #[serde(default)]
    pub destroy: Vec<Action>,
    #[serde(default)]
    pub expire: Vec<Action>,
    #[serde(default)]
    pub create: Vec<Action>,
    #[serde(default)]
    pub collide: Vec<Action>,
    #[serde(default)]
    pub activate: Vec<Action>,
    #[serde(default)]
    pub arrive: Vec<Action>,

    #[serde(default)]
    pub destroy_dont_die: bool,
    #[serde(default)]
    pub expire_dont_die: bool,

    /// Period of the activate hook; zero disables it.
    #[serde(default)]
    pub activate_period: Ticks,
    #[serde(default)]
    pub activate_period_range: Ticks,

    #[serde(default)]
    pub rotation: RotationFrame,
    #[serde(default)]
    pub animation: Animation,
    #[serde(default)]
    pub vector: VectorFrame,
    #[serde(default)]
    pub device: Device,

    #[serde(default)]
    pub build_flags: u32,
    #[serde(default)]
    pub order_flags: u32,
    #[serde(default)]
    pub level_key_tag: String,
    #[serde(default)]
    pub engage_key_tag: String,
    #[serde(default)]
    pub order_key_tag: String,
    #[serde(default)]
    pub build_ratio: Fixed,
    #[serde(default)]
    pub build_time: Ticks,

    /// AI skill gate: a motion-key draw below `skill_num` out of
    /// `skill_den` adopts the new keys.
    #[serde(default = "default_skill")]
    pub skill_num: u8,
    #[serde(default = "default_skill")]
    pub skill_den: u8,
}

fn default_destination_class() -> i32 {
    -1
}

fn default_skill() -> u8 {
    1
}

impl BaseObject {
    /// The natural sprite scale for this template.
    pub fn natural_scale(&self) -> i32 {
        if self.attributes & attr::SHAPE_FROM_DIRECTION != 0 {
            self.rotation.scale
        } else if self.attributes & attr::IS_SELF_ANIMATED != 0 {
            self.animation.scale
        } else {
            4096
        }
    }

    /// The sprite layer for this template.
    pub fn layer(&self) -> i16 {
        if self.attributes & attr::SHAPE_FROM_DIRECTION != 0 {
            self.rotation.layer
        } else if self.attributes & attr::IS_SELF_ANIMATED != 0 {
            self.animation.layer
        } else {
            0
        }
    }

    /// The sprite resource name, if any.
    pub fn sprite(&self) -> Option<&str> {
        if self.attributes & attr::SHAPE_FROM_DIRECTION != 0 {
            self.rotation.sprite.as_deref()
        } else if self.attributes & attr::IS_SELF_ANIMATED != 0 {
            self.animation.sprite.as_deref()
        } else {
            None
        }
    }

    /// Unscaled frame dimensions, for collision bounds.
    pub fn frame_size(&self) -> (i32, i32) {
        if self.attributes & attr::IS_SELF_ANIMATED != 0 {
            (self.animation.width, self.animation.height)
        } else {
            (self.rotation.width, self.rotation.height)
        }
    }

    /// Weapon slot accessor by index (0 pulse, 1 beam, 2 special).
    pub fn weapon(&self, which: usize) -> Option<&WeaponDef> {
        match which {
            0 => self.pulse.as_ref(),
            1 => self.beam.as_ref(),
            _ => self.special.as_ref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_think_is_composite() {
        assert_eq!(
            attr::CAN_THINK,
            attr::CAN_ENGAGE | attr::CAN_EVADE | attr::CAN_ACCEPT_DESTINATION
        );
        assert_ne!(attr::CAN_THINK & attr::CAN_ACCEPT_DESTINATION, 0);
    }

    #[test]
    fn template_deserializes_with_defaults() {
        let json = r#"{
            "name": "cruiser",
            "attributes": 2818,
            "health": 100,
            "max_velocity": 1024
        }"#;
        let base: BaseObject = serde_json::from_str(json).unwrap();
        assert_eq!(base.name, "cruiser");
        assert_eq!(base.health, 100);
        assert_eq!(base.max_velocity, Fixed::from_long(4));
        assert_eq!(base.device.ammo, -1, "default ammo is unlimited");
        assert!(base.initial_age.is_none());
        assert!(base.destroy.is_empty());
    }
}
