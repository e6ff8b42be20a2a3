//! Live space objects.
//!
//! A [`SpaceObject`] is one slot of the fixed arena: a live instance
//! stamped from a [`BaseObject`] template. Identity is (slot, id); the
//! id is drawn at creation and every stored cross-reference carries its
//! own id snapshot for staleness checks.

use antares_data::object::{attr, ENGAGE_RANGE};
use antares_data::{BaseId, BaseObject, Plugin};
use antares_math::{
    add_angle, rot_point, Coord, Fixed, FixedPoint, GameTime, Point, Random, Rect, Tag, Ticks,
};
use serde::{Deserialize, Serialize};

use crate::handle::{AdmHandle, DestHandle, ObjHandle, SpriteHandle, VectorHandle};

/// Sentinel id meaning "no ship".
pub const NO_SHIP: i32 = -1;

/// Largest coordinate difference that still counts as "relevant"; the
/// square just fits in 32 bits.
pub const MAXIMUM_RELEVANT_DISTANCE: u32 = 46_340;
/// The clamped sentinel for squared distances at or beyond relevance.
pub const MAXIMUM_RELEVANT_DISTANCE_SQUARED: u32 = 2_147_395_600;
/// Coordinate differences above this use the reduced-precision angle
/// path.
pub const MAXIMUM_ANGLE_DISTANCE: u32 = 32_767;

/// Fallback turn rate for objects without rotation frames.
pub const DEFAULT_TURN_RATE: Fixed = Fixed::from_long(2);

/// How long a new escort watches for trouble before heading home.
pub const TIME_TO_CHECK_HOME: Ticks = Ticks(15 * 60);

// ---------------------------------------------------------------------------
// Synthetic key bits
// ---------------------------------------------------------------------------

/// The synthetic "keys down" word produced by thinking and consumed by
/// kinematics; human input arrives in the same encoding.
pub mod keys {
    pub const UP: u32 = 0x0000_0001;
    pub const DOWN: u32 = 0x0000_0002;
    pub const LEFT: u32 = 0x0000_0004;
    pub const RIGHT: u32 = 0x0000_0008;
    pub const PULSE: u32 = 0x0000_0010;
    pub const BEAM: u32 = 0x0000_0020;
    pub const SPECIAL: u32 = 0x0000_0040;
    pub const WARP: u32 = 0x0000_0080;
    pub const GIVE_COMMAND: u32 = 0x0000_0100;
    pub const ADOPT_TARGET: u32 = 0x0000_0200;
    pub const AUTOPILOT: u32 = 0x0000_0400;
    /// Suppresses one cycle of AI key adoption.
    pub const MANUAL_OVERRIDE: u32 = 0x8000_0000;

    pub const MOTION_MASK: u32 = UP | DOWN | LEFT | RIGHT;
    pub const WEAPON_MASK: u32 = PULSE | BEAM | SPECIAL;
    pub const SPECIAL_MASK: u32 = GIVE_COMMAND | ADOPT_TARGET | AUTOPILOT;
    pub const MISC_MASK: u32 =
        !(MOTION_MASK | WEAPON_MASK | SPECIAL_MASK | MANUAL_OVERRIDE);
}

// ---------------------------------------------------------------------------
// Activity / presence / duty
// ---------------------------------------------------------------------------

/// Lifecycle state of an arena slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activity {
    /// Free slot.
    #[default]
    Available,
    /// Live object.
    InUse,
    /// Dead; reaped at cull time.
    ToBeFreed,
}

/// The warp/landing state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Presence {
    #[default]
    Normal,
    /// Shrinking onto a destination; `scale` is the current sprite
    /// scale, `speed` the per-tick decay.
    Landing { speed: i32, scale: i32 },
    /// Spooling up; `progress` counts think slices toward 100, `flares`
    /// latches the four escalating sound cues.
    WarpIn { progress: i32, flares: u8 },
    /// At warp; the payload is the warp velocity.
    Warping(Fixed),
    /// Decelerating out of warp; the payload is the decaying velocity.
    WarpOut(Fixed),
}

/// What a thinking object believes it is doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Duty {
    #[default]
    None,
    Escort,
    Guard,
    Assault,
}

// ---------------------------------------------------------------------------
// Weapons
// ---------------------------------------------------------------------------

/// Per-weapon live state for one of the three slots.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct WeaponState {
    /// The device template; `None` is an empty slot.
    pub base: Option<BaseId>,
    /// Next time this weapon may fire.
    pub time: GameTime,
    /// Rounds left; -1 is unlimited.
    pub ammo: i32,
    /// Cursor into the mount positions.
    pub position: usize,
    /// Energy accumulated toward a restocked round.
    pub charge: i32,
}

/// Animation playhead for self-animated objects.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct AnimState {
    pub this_shape: Fixed,
    pub frame_direction: i32,
    pub frame_fraction: Fixed,
    pub frame_speed: Fixed,
}

// ---------------------------------------------------------------------------
// SpaceObject
// ---------------------------------------------------------------------------

/// One live object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SpaceObject {
    pub active: Activity,
    /// Generation id; stale handles are detected by comparing this.
    pub id: i32,
    pub base: Option<BaseId>,

    pub attributes: u32,
    pub runtime_flags: u32,
    pub owner: AdmHandle,
    pub my_player_flag: u32,
    pub seen_by_player_flags: u32,

    pub location: Coord,
    pub velocity: FixedPoint,
    pub motion_fraction: FixedPoint,
    pub direction: i32,
    pub direction_goal: i32,
    pub turn_velocity: Fixed,
    pub turn_fraction: Fixed,
    pub thrust: Fixed,
    pub max_velocity: Fixed,
    pub max_thrust: Fixed,
    pub max_turn_rate: Fixed,

    pub health: i32,
    pub energy: i32,
    pub battery: i32,
    pub warp_energy_collected: i32,

    pub keys_down: u32,
    pub presence: Presence,
    pub duty: Duty,

    pub target: ObjHandle,
    pub target_id: i32,
    pub target_angle: i32,
    pub last_target: ObjHandle,
    pub last_target_distance: u32,
    pub closest_object: ObjHandle,
    pub closest_distance: u32,
    pub engage_range: u32,
    pub longest_weapon_range: i32,
    pub shortest_weapon_range: i32,

    pub dest_object: ObjHandle,
    pub dest_object_id: i32,
    pub dest_object_dest: ObjHandle,
    pub dest_object_dest_id: i32,
    /// Cached last-seen coordinates of the destination; h == 0 is the
    /// "no coordinate" sentinel.
    pub destination_location: Coord,

    pub pulse: WeaponState,
    pub beam: WeaponState,
    pub special: WeaponState,

    pub random: Random,

    pub expires: bool,
    pub expire_after: Ticks,
    pub periodic_time: Ticks,
    pub time_from_origin: Ticks,
    pub offline_time: i32,
    pub recharge_time: i32,

    pub cloak_state: i32,
    pub hit_state: i32,

    pub local_friend_strength: Fixed,
    pub local_foe_strength: Fixed,
    pub remote_friend_strength: Fixed,
    pub remote_foe_strength: Fixed,
    pub escort_strength: Fixed,
    pub best_considered_target_value: Fixed,
    pub current_target_value: Fixed,
    pub best_considered_target: ObjHandle,

    /// Per-object tag copies; actions may rewrite them.
    pub level_key_tag: String,
    pub engage_key_tag: String,
    pub order_key_tag: String,

    pub distance_from_player: u64,
    pub absolute_bounds: Rect,
    pub natural_scale: i32,
    pub tiny_size: i32,
    pub shield_color: Option<u8>,
    pub layer: i16,

    pub anim: AnimState,
    pub sprite: SpriteHandle,
    pub vector: VectorHandle,
    pub as_destination: DestHandle,

    // Global-list links and per-tick grid links.
    pub next_object: ObjHandle,
    pub previous_object: ObjHandle,
    pub next_near_object: ObjHandle,
    pub next_far_object: ObjHandle,
    pub collision_grid: Point,
    pub distance_grid: Point,
}

impl SpaceObject {
    /// Stamp a new live object from a template.
    ///
    /// The supplied substream seeds the object's own random stream; the
    /// draws here happen in a fixed order that recorded games depend on,
    /// including one discarded draw that once picked an id.
    #[allow(clippy::too_many_arguments)]
    pub fn from_base(
        plug: &Plugin,
        base_id: BaseId,
        seed: Random,
        id: i32,
        location: Coord,
        relative_direction: i32,
        relative_velocity: Option<FixedPoint>,
        owner: AdmHandle,
    ) -> SpaceObject {
        let base = plug.base(base_id);
        let mut o = SpaceObject {
            active: Activity::InUse,
            id,
            base: Some(base_id),
            random: seed,
            owner,
            location,
            attributes: base.attributes,
            shield_color: base.shield_color,
            tiny_size: base.tiny_size,
            layer: base.layer(),
            max_velocity: base.max_velocity,
            max_thrust: base.max_thrust,
            max_turn_rate: if base.attributes & attr::SHAPE_FROM_DIRECTION != 0 {
                base.rotation.turn_rate
            } else {
                DEFAULT_TURN_RATE
            },
            natural_scale: base.natural_scale(),
            health: base.health,
            energy: base.energy,
            battery: base.energy * 5,
            level_key_tag: base.level_key_tag.clone(),
            engage_key_tag: base.engage_key_tag.clone(),
            order_key_tag: base.order_key_tag.clone(),
            target: ObjHandle::NONE,
            target_id: NO_SHIP,
            last_target: ObjHandle::NONE,
            closest_object: ObjHandle::NONE,
            closest_distance: MAXIMUM_RELEVANT_DISTANCE_SQUARED,
            dest_object: ObjHandle::NONE,
            dest_object_id: NO_SHIP,
            dest_object_dest: ObjHandle::NONE,
            dest_object_dest_id: NO_SHIP,
            best_considered_target: ObjHandle::NONE,
            sprite: SpriteHandle::NONE,
            vector: VectorHandle::NONE,
            as_destination: DestHandle::NONE,
            next_object: ObjHandle::NONE,
            previous_object: ObjHandle::NONE,
            next_near_object: ObjHandle::NONE,
            next_far_object: ObjHandle::NONE,
            ..SpaceObject::default()
        };

        if let Some(adm) = owner.index() {
            o.my_player_flag = 1 << adm;
        }

        // An id used to be drawn here; the stream still cycles through
        // the same values so old recordings stay in sync.
        while o.random.next(-32768) == -1 {
            continue;
        }

        if base.activate_period != Ticks::ZERO {
            o.periodic_time = base.activate_period
                + Ticks(o.random.next(base.activate_period_range.count() as i32) as i64);
        }

        o.direction = base.initial_direction;
        add_angle(&mut o.direction, relative_direction);
        if base.initial_direction_range > 0 {
            let spin = o.random.next(base.initial_direction_range);
            add_angle(&mut o.direction, spin);
        }

        let mut f = base.initial_velocity;
        if base.initial_velocity_range > Fixed::ZERO {
            f = f + o.random.next_fixed(base.initial_velocity_range);
        }
        let (vh, vv) = rot_point(o.direction);
        o.velocity.h = vh * f;
        o.velocity.v = vv * f;
        if let Some(rel) = relative_velocity {
            o.velocity.h += rel.h;
            o.velocity.v += rel.v;
        }

        if o.attributes & (attr::CAN_THINK | attr::REMOTE_OR_HUMAN) == 0 {
            o.thrust = base.max_thrust;
        }

        if o.attributes & attr::IS_SELF_ANIMATED != 0 {
            o.init_animation(base);
        }

        if let Some(age) = base.initial_age {
            o.expire_after =
                age + Ticks(o.random.next(base.initial_age_range.count() as i32) as i64);
            o.expires = true;
        } else {
            o.expires = false;
        }

        o.reload_weapons(plug, base, true);
        o
    }

    fn init_animation(&mut self, base: &BaseObject) {
        self.anim.this_shape = base.animation.frame_shape;
        if base.animation.frame_shape_range > Fixed::ZERO {
            self.anim.this_shape =
                self.anim.this_shape + self.random.next_fixed(base.animation.frame_shape_range);
        }
        self.anim.frame_direction = base.animation.frame_direction;
        if base.animation.frame_direction_range == -1 {
            if self.random.next(2) == 1 {
                self.anim.frame_direction = 1;
            }
        } else if base.animation.frame_direction_range > 0 {
            self.anim.frame_direction += self.random.next(base.animation.frame_direction_range);
        }
        self.anim.frame_fraction = Fixed::ZERO;
        self.anim.frame_speed = base.animation.frame_speed;
    }

    /// Rebind the three weapon slots from a template and re-derive
    /// ranges. When `reset_ammo` is false, ammo and fire cursors survive
    /// (base-type changes with `keep_ammo`).
    pub fn reload_weapons(&mut self, plug: &Plugin, base: &BaseObject, reset_ammo: bool) {
        for which in 0..3 {
            let weapon_id = base.weapon(which).and_then(|d| d.base_id);
            let state = match which {
                0 => &mut self.pulse,
                1 => &mut self.beam,
                _ => &mut self.special,
            };
            state.base = weapon_id;
            match weapon_id {
                Some(id) if reset_ammo => {
                    state.ammo = plug.base(id).device.ammo;
                    state.position = 0;
                }
                None => {
                    state.ammo = 0;
                }
                _ => {}
            }
        }
        self.derive_ranges(plug);
    }

    /// True while the slot holds a live or dying object.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active != Activity::Available
    }

    /// Whether this object will consider engaging `other` at all.
    pub fn engages(&self, plug: &Plugin, other: &SpaceObject) -> bool {
        let mine = self.base.map(|b| plug.base(b));
        let theirs = other.base.map(|b| plug.base(b));
        let (Some(mine), Some(theirs)) = (mine, theirs) else {
            return false;
        };
        if (mine.build_flags & antares_data::build_flag::CAN_ONLY_ENGAGE != 0)
            || (theirs.build_flags & antares_data::build_flag::ONLY_ENGAGED_BY != 0)
        {
            return self.engage_key_tag == other.level_key_tag;
        }
        true
    }

    /// The live turn rate. Shape-from-direction templates carry one;
    /// everything else turns at the default rate, and actions may
    /// rewrite it.
    pub fn turn_rate(&self) -> Fixed {
        self.max_turn_rate
    }

    /// Maximum health from the template.
    pub fn max_health(&self, plug: &Plugin) -> i32 {
        self.base.map(|b| plug.base(b).health).unwrap_or(0)
    }

    /// Maximum energy from the template.
    pub fn max_energy(&self, plug: &Plugin) -> i32 {
        self.base.map(|b| plug.base(b).energy).unwrap_or(0)
    }

    /// Maximum battery: five times energy capacity.
    pub fn max_battery(&self, plug: &Plugin) -> i32 {
        self.max_energy(plug) * 5
    }

    /// Draw from this object's substream with a call-site tag.
    #[inline]
    pub fn rand(&mut self, range: i32, site: Tag) -> i32 {
        self.random.next_tagged(range, site)
    }

    /// Re-derive engage range and weapon ranges from the live devices.
    pub fn derive_ranges(&mut self, plug: &Plugin) {
        self.longest_weapon_range = 0;
        self.shortest_weapon_range = MAXIMUM_RELEVANT_DISTANCE as i32;
        for state in [&self.pulse, &self.beam, &self.special] {
            if let Some(id) = state.base {
                let device = &plug.base(id).device;
                if device.range > 0 && (device.usage & antares_data::usage::ATTACKING != 0) {
                    self.longest_weapon_range = self.longest_weapon_range.max(device.range);
                    self.shortest_weapon_range = self.shortest_weapon_range.min(device.range);
                }
            }
        }
        // With no attacking weapon, the shortest range collapses too.
        self.shortest_weapon_range = self.shortest_weapon_range.min(self.longest_weapon_range);
        self.engage_range = ENGAGE_RANGE.max(self.longest_weapon_range as u32);
    }
}

