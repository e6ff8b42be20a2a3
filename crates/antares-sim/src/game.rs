//! The game value: every per-run arena, table, and counter.
//!
//! One `Game` owns all simulation state; the tick loop is cooperative
//! and single-threaded, and everything external (rendering, audio, HUD)
//! consumes either the drawable snapshot taken between ticks or the
//! effect buffer drained after each tick.

use std::sync::Arc;

use antares_data::object::{attr, ENERGY_POD_AMOUNT};
use antares_data::{BaseId, Plugin, Screen, Zoom};
use antares_math::{
    add_angle, more_evil_fixed_to_long, Coord, Fixed, FixedPoint, GameTime, Point, Random, Ticks,
    CONDITION_TICK, FIXED_NONE, MAJOR_TICK,
};
use serde::Serialize;
use tracing::{debug, trace};

use crate::action::{ActionQueue, ActionRef, Hook};
use crate::admiral::{self, Admiral, Destination, MAX_DESTINATIONS};
use crate::handle::{AdmHandle, ObjHandle, SpriteHandle, VectorHandle};
use crate::obj::{Activity, SpaceObject, NO_SHIP};
use crate::sprite::{Sprite, Sprites};
use crate::vector::Vectors;

/// Grid cells per side of the two proximity grids.
pub(crate) const PROXIMITY_SUPER_SIZE: i32 = 16;
pub(crate) const PROXIMITY_GRID_LEN: usize =
    (PROXIMITY_SUPER_SIZE * PROXIMITY_SUPER_SIZE) as usize;
/// Masks a coordinate shift into a cell index.
pub(crate) const PROXIMITY_UNIT_AND_MODULO: i32 = PROXIMITY_SUPER_SIZE - 1;
/// Row stride shift: cell = (y << 4) + x.
pub(crate) const PROXIMITY_WIDTH_SHIFT: i32 = 4;

/// The five relative cells that visit every adjacent pair exactly once
/// when the outer loop walks cells in row-major order.
pub(crate) const ADJACENT_UNITS: [Point; 5] = [
    Point { h: 0, v: 0 },
    Point { h: 1, v: 0 },
    Point { h: -1, v: 1 },
    Point { h: 0, v: 1 },
    Point { h: 1, v: 1 },
];

// ---------------------------------------------------------------------------
// Effects
// ---------------------------------------------------------------------------

/// Side effects addressed to external collaborators, buffered per tick.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Effect {
    PlaySound {
        id: i32,
        volume: i32,
        persistence: Ticks,
        priority: u8,
        /// Positional sounds carry the emitting object.
        at: Option<ObjHandle>,
    },
    /// Status text for the message area.
    Message(String),
    /// Start a styled message by resource id and page.
    StartMessage { id: i32, page: i32 },
    ScoreChanged {
        admiral: AdmHandle,
        which: usize,
        value: i32,
    },
    /// Boolean screen flash.
    Flash { length: i32, hue: u8, shade: u8 },
    ZoomSet(Zoom),
    ComputerSelect { screen: Screen, line: i32 },
    Sparks {
        count: i32,
        decay: i32,
        velocity: Fixed,
        hue: u8,
        at: Point,
    },
    CloakOn { at: ObjHandle },
    CloakOff { at: ObjHandle },
    /// One of the four escalating warp-in cues.
    WarpSound { stage: u8, at: ObjHandle },
}

/// A consumer of tick effects registered with
/// [`Game::subscribe_messages`].
pub trait MessageSink {
    fn receive(&mut self, effect: &Effect);
}

// ---------------------------------------------------------------------------
// Proximity grid
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub(crate) struct GridCell {
    pub near: ObjHandle,
    pub far: ObjHandle,
    /// (cell index, super offset) for each of the five adjacent units.
    pub adjacent: [(usize, Point); 5],
}

#[derive(Clone, Debug)]
pub(crate) struct ProximityGrid {
    pub cells: Vec<GridCell>,
}

impl ProximityGrid {
    fn new() -> ProximityGrid {
        let mut cells = Vec::with_capacity(PROXIMITY_GRID_LEN);
        for y in 0..PROXIMITY_SUPER_SIZE {
            for x in 0..PROXIMITY_SUPER_SIZE {
                let mut adjacent = [(0usize, Point::new(0, 0)); 5];
                for (i, adj) in ADJACENT_UNITS.iter().enumerate() {
                    let mut ux = x + adj.h;
                    let mut uy = y + adj.v;
                    let mut sx = 0;
                    let mut sy = 0;
                    if ux < 0 {
                        ux += PROXIMITY_SUPER_SIZE;
                        sx -= 1;
                    } else if ux >= PROXIMITY_SUPER_SIZE {
                        ux -= PROXIMITY_SUPER_SIZE;
                        sx += 1;
                    }
                    if uy < 0 {
                        uy += PROXIMITY_SUPER_SIZE;
                        sy -= 1;
                    } else if uy >= PROXIMITY_SUPER_SIZE {
                        uy -= PROXIMITY_SUPER_SIZE;
                        sy += 1;
                    }
                    adjacent[i] = (
                        ((uy << PROXIMITY_WIDTH_SHIFT) + ux) as usize,
                        Point::new(sx, sy),
                    );
                }
                cells.push(GridCell {
                    near: ObjHandle::NONE,
                    far: ObjHandle::NONE,
                    adjacent,
                });
            }
        }
        ProximityGrid { cells }
    }

    pub(crate) fn reset_links(&mut self) {
        for cell in &mut self.cells {
            cell.near = ObjHandle::NONE;
            cell.far = ObjHandle::NONE;
        }
    }
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// All state of one running level.
pub struct Game {
    pub plug: Arc<Plugin>,
    /// Index of the running level in the plugin.
    pub level: usize,

    pub objects: Vec<SpaceObject>,
    /// Head of the doubly-linked active list; newest first.
    pub root: ObjHandle,
    pub vectors: Vectors,
    pub sprites: Sprites,
    pub admirals: Vec<Admiral>,
    pub destinations: Vec<Destination>,

    /// Resolved scenario placements and their id snapshots.
    pub initials: Vec<ObjHandle>,
    pub initial_ids: Vec<i32>,
    pub condition_enabled: Vec<bool>,

    pub queue: ActionQueue,
    pub time: GameTime,
    /// Epoch of the warmup; conditions key their cadence off this.
    pub start_time: GameTime,
    pub random: Random,
    /// The level's placement rotation.
    pub angle: i32,

    /// The local player.
    pub admiral: AdmHandle,
    /// The local player's flagship.
    pub ship: ObjHandle,
    pub closest: ObjHandle,
    pub farthest: ObjHandle,
    pub global_corner: Coord,

    /// Input bits currently inhibited by scripting.
    pub key_mask: u32,
    pub zoom: Zoom,
    /// Mini-computer cursor, for conditions and the select verb.
    pub computer_screen: Screen,
    pub computer_line: i32,
    /// Current styled message (id, page), for message conditions.
    pub current_message: (i32, i32),

    pub victor: AdmHandle,
    pub victory_text: String,
    pub next_level: Option<usize>,
    pub game_over: bool,
    pub game_over_at: GameTime,

    /// Running desync checksum, updated each think pass.
    pub sync: u32,

    pub effects: Vec<Effect>,
    pending_input: Vec<Option<u32>>,
    sinks: Vec<Box<dyn MessageSink>>,
    pub(crate) grid: ProximityGrid,
}

impl Game {
    /// A fresh game over a loaded plugin. Use
    /// [`crate::level::start_level`] to populate it.
    pub fn new(plug: Arc<Plugin>, level: usize, seed: i32) -> Game {
        let n_initials = plug
            .levels
            .get(level)
            .map(|l| l.initials.len())
            .unwrap_or(0);
        let n_conditions = plug
            .levels
            .get(level)
            .map(|l| l.conditions.len())
            .unwrap_or(0);
        Game {
            plug,
            level,
            objects: vec![SpaceObject::default(); antares_data::MAX_SPACE_OBJECTS],
            root: ObjHandle::NONE,
            vectors: Vectors::new(),
            sprites: Sprites::new(antares_data::MAX_SPACE_OBJECTS),
            admirals: vec![Admiral::default(); antares_data::MAX_PLAYERS],
            destinations: vec![Destination::default(); MAX_DESTINATIONS],
            initials: vec![ObjHandle::NONE; n_initials],
            initial_ids: vec![NO_SHIP; n_initials],
            condition_enabled: vec![false; n_conditions],
            queue: ActionQueue::new(),
            time: GameTime::ZERO,
            start_time: GameTime::ZERO,
            random: Random::new(seed),
            angle: 0,
            admiral: AdmHandle::NONE,
            ship: ObjHandle::NONE,
            closest: ObjHandle::NONE,
            farthest: ObjHandle::NONE,
            global_corner: Coord::default(),
            key_mask: 0,
            zoom: Zoom::default(),
            computer_screen: Screen::Main,
            computer_line: -1,
            current_message: (-1, -1),
            victor: AdmHandle::NONE,
            victory_text: String::new(),
            next_level: None,
            game_over: false,
            game_over_at: GameTime::ZERO,
            sync: 0,
            effects: Vec::new(),
            pending_input: vec![None; antares_data::MAX_PLAYERS],
            sinks: Vec::new(),
            grid: ProximityGrid::new(),
        }
    }

    // -- handle resolution ---------------------------------------------------

    /// Resolve a handle to a live-or-dying object.
    #[inline]
    pub fn obj(&self, h: ObjHandle) -> Option<&SpaceObject> {
        h.index()
            .and_then(|n| self.objects.get(n))
            .filter(|o| o.is_active())
    }

    #[inline]
    pub fn obj_mut(&mut self, h: ObjHandle) -> Option<&mut SpaceObject> {
        h.index()
            .and_then(|n| self.objects.get_mut(n))
            .filter(|o| o.is_active())
    }

    /// Resolve a (handle, id) pair; stale ids read as absent.
    #[inline]
    pub fn obj_checked(&self, h: ObjHandle, id: i32) -> Option<&SpaceObject> {
        self.obj(h).filter(|o| o.id == id)
    }

    /// Mutable access to two distinct slots at once.
    pub(crate) fn two_objs(&mut self, a: usize, b: usize) -> (&mut SpaceObject, &mut SpaceObject) {
        debug_assert_ne!(a, b, "pairwise access to the same slot");
        if a < b {
            let (lo, hi) = self.objects.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.objects.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        }
    }

    /// Snapshot of the currently active handles, in slot order.
    pub fn all(&self) -> impl Iterator<Item = ObjHandle> + '_ {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.is_active())
            .map(|(n, _)| ObjHandle(n as i32))
    }

    /// The display name of an object: its destination name if it is
    /// one, its template name otherwise.
    pub fn object_name(&self, h: ObjHandle) -> String {
        let Some(o) = self.obj(h) else {
            return String::new();
        };
        if o.attributes & attr::IS_DESTINATION != 0 {
            if let Some(d) = o.as_destination.index().and_then(|n| self.destinations.get(n)) {
                if d.active {
                    return d.name.clone();
                }
            }
        }
        o.base
            .map(|b| self.plug.base(b).name.clone())
            .unwrap_or_default()
    }

    /// Count live objects of a template (or any template), optionally
    /// restricted to an owner.
    pub fn count_objects_of_base_type(&self, base: Option<BaseId>, owner: AdmHandle) -> i32 {
        self.objects
            .iter()
            .filter(|o| o.is_active())
            .filter(|o| base.is_none() || o.base == base)
            .filter(|o| owner.is_none() || o.owner == owner)
            .count() as i32
    }

    // -- creation ------------------------------------------------------------

    /// Create a live object from a template. Returns the null handle
    /// when the arena is full; the spawn is suppressed and nothing else
    /// changes.
    pub fn create_object(
        &mut self,
        base_id: BaseId,
        relative_velocity: Option<FixedPoint>,
        location: Coord,
        direction: i32,
        owner: AdmHandle,
        special_attributes: u32,
        sprite_override: Option<&str>,
    ) -> ObjHandle {
        let plug = self.plug.clone();
        let (seed, id) = admiral::draw_identity(&mut self.random);
        let new = SpaceObject::from_base(
            &plug,
            base_id,
            seed,
            id,
            location,
            direction,
            relative_velocity,
            owner,
        );

        let Some(slot) = self.objects.iter().position(|o| !o.is_active()) else {
            trace!("arena full; spawn of base {} suppressed", base_id.0);
            return ObjHandle::NONE;
        };
        let handle = ObjHandle(slot as i32);
        self.objects[slot] = new;

        // Sprite companion.
        let base = plug.base(base_id);
        let sprite_name = sprite_override
            .map(str::to_owned)
            .or_else(|| base.sprite().map(str::to_owned));
        if let Some(name) = sprite_name {
            let which_shape = initial_shape(&self.objects[slot], base);
            let where_ = self.screen_position(location);
            let sprite = self.sprites.add(Sprite {
                table: Some(name),
                where_,
                which_shape,
                scale: base.natural_scale(),
                layer: base.layer(),
                tiny_size: base.tiny_size,
                ..Sprite::default()
            });
            self.objects[slot].sprite = sprite;
        }

        // Vector companion.
        if base.attributes & attr::IS_VECTOR != 0 {
            self.objects[slot].vector = self.vectors.add(location, &base.vector);
        }

        // Head-insert into the global list; iteration is newest-first.
        let old_root = self.root;
        self.objects[slot].next_object = old_root;
        self.objects[slot].previous_object = ObjHandle::NONE;
        if let Some(r) = old_root.index() {
            self.objects[r].previous_object = handle;
        }
        self.root = handle;

        self.objects[slot].attributes |= special_attributes;
        self.update_distance_from_player(slot);

        crate::action::exec(
            self,
            ActionRef::Base(base_id, Hook::Create),
            0,
            handle,
            ObjHandle::NONE,
            None,
        );
        handle
    }

    fn update_distance_from_player(&mut self, slot: usize) {
        let o = &self.objects[slot];
        if o.attributes
            & (attr::CAN_COLLIDE
                | attr::CAN_BE_HIT
                | attr::IS_DESTINATION
                | attr::CAN_THINK
                | attr::REMOTE_OR_HUMAN)
            == 0
        {
            return;
        }
        let reference = match self.obj(self.ship) {
            Some(ship) => ship.location,
            None => self.global_corner,
        };
        let xdiff = reference.dh(o.location).unsigned_abs();
        let ydiff = reference.dv(o.location).unsigned_abs();
        let dist = if xdiff > crate::obj::MAXIMUM_RELEVANT_DISTANCE
            || ydiff > crate::obj::MAXIMUM_RELEVANT_DISTANCE
        {
            u64::from(xdiff) * u64::from(xdiff) + u64::from(ydiff) * u64::from(ydiff)
        } else {
            u64::from(ydiff * ydiff + xdiff * xdiff)
        };
        self.objects[slot].distance_from_player = dist;
    }

    /// Project a universe location into screen space relative to the
    /// global corner.
    pub fn screen_position(&self, location: Coord) -> Point {
        let h = self.global_corner.dh(location);
        let v = self.global_corner.dv(location);
        let clamp = crate::sprite::SPRITE_MAX_SIZE;
        Point::new(h.clamp(-clamp, clamp), v.clamp(-clamp, clamp))
    }

    // -- lifecycle -----------------------------------------------------------

    /// Run the destroy pipeline.
    pub fn destroy_object(&mut self, h: ObjHandle) {
        let Some(oi) = h.index() else { return };
        if self.objects[oi].active != Activity::InUse {
            return;
        }
        let plug = self.plug.clone();
        let base_id = self.objects[oi].base;
        let base = base_id.map(|b| plug.base(b));

        if self.objects[oi].attributes & attr::NEUTRAL_DEATH != 0 {
            // Becomes neutral instead of dying.
            let max = self.objects[oi].max_health(&plug);
            self.objects[oi].health = max;
            for fix in 0..self.objects.len() {
                if self.objects[fix].attributes & attr::CAN_ACCEPT_DESTINATION != 0
                    && self.objects[fix].is_active()
                    && self.objects[fix].target == h
                {
                    self.objects[fix].target = ObjHandle::NONE;
                    self.objects[fix].target_id = NO_SHIP;
                }
            }
            self.set_owner(h, AdmHandle::NONE, true);
            self.objects[oi].attributes &=
                !(attr::HATED | attr::CAN_ENGAGE | attr::CAN_COLLIDE | attr::CAN_BE_HIT);
            if let Some(b) = base_id {
                crate::action::exec(
                    self,
                    ActionRef::Base(b, Hook::Destroy),
                    0,
                    h,
                    ObjHandle::NONE,
                    None,
                );
            }
            return;
        }

        // Credit the loss.
        if let Some(a) = self.objects[oi].owner.index() {
            self.admirals[a].losses += 1;
        }

        if self.objects[oi].attributes & attr::RELEASE_ENERGY_ON_DEATH != 0 {
            let mut pods = self.objects[oi].energy / ENERGY_POD_AMOUNT;
            let velocity = self.objects[oi].velocity;
            let location = self.objects[oi].location;
            let direction = self.objects[oi].direction;
            let blob = plug.blessed.energy_blob;
            while pods > 0 {
                self.create_object(
                    blob,
                    Some(velocity),
                    location,
                    direction,
                    AdmHandle::NONE,
                    0,
                    None,
                );
                pods -= 1;
            }
        }

        let dont_die = base.map(|b| b.destroy_dont_die).unwrap_or(false);

        // A dying destination must not linger in anyone's orders.
        if self.objects[oi].attributes & attr::IS_DESTINATION != 0 && !dont_die {
            admiral::remove_destination(self, self.objects[oi].as_destination);
            for fix in 0..self.objects.len() {
                if self.objects[fix].attributes & attr::CAN_ACCEPT_DESTINATION != 0
                    && self.objects[fix].is_active()
                    && self.objects[fix].dest_object == h
                {
                    self.objects[fix].dest_object = ObjHandle::NONE;
                    self.objects[fix].dest_object_id = NO_SHIP;
                    self.objects[fix].attributes &= !attr::STATIC_DESTINATION;
                }
            }
        }

        if let Some(b) = base_id {
            crate::action::exec(
                self,
                ActionRef::Base(b, Hook::Destroy),
                0,
                h,
                ObjHandle::NONE,
                None,
            );
        }

        if self.objects[oi].attributes & attr::CAN_ACCEPT_DESTINATION != 0 {
            admiral::remove_object_from_destination(self, h);
        }
        if !dont_die {
            self.objects[oi].active = Activity::ToBeFreed;
        }
    }

    /// Reap a slot at cull time: unlink, flag companions, clear state.
    pub fn free_object(&mut self, h: ObjHandle) {
        let Some(oi) = h.index() else { return };
        debug!(slot = oi, id = self.objects[oi].id, "free");
        let (sprite, vector) = (self.objects[oi].sprite, self.objects[oi].vector);
        if self.objects[oi].attributes & attr::IS_VECTOR != 0 {
            if let Some(v) = self.vectors.get_mut(vector) {
                v.kill_me = true;
            }
        } else if let Some(s) = self.sprites.get_mut(sprite) {
            s.kill_me = true;
        }

        let prev = self.objects[oi].previous_object;
        let next = self.objects[oi].next_object;
        if let Some(p) = prev.index() {
            self.objects[p].next_object = next;
        }
        if let Some(n) = next.index() {
            self.objects[n].previous_object = prev;
        }
        if self.root == h {
            self.root = next;
        }

        let id = self.objects[oi].id;
        self.objects[oi] = SpaceObject {
            // The id survives the free so that stale handles read as
            // mismatched until the slot is reused with a fresh id.
            id,
            ..SpaceObject::default()
        };

        for adm in &mut self.admirals {
            if adm.flagship == h {
                adm.flagship = ObjHandle::NONE;
                adm.flagship_id = NO_SHIP;
            }
        }
    }

    /// Rewrite an object from a different template.
    pub fn change_base_type(
        &mut self,
        h: ObjHandle,
        new_base: BaseId,
        sprite_override: Option<&str>,
        keep_ammo: bool,
    ) {
        let Some(oi) = h.index() else { return };
        if !self.objects[oi].is_active() {
            return;
        }
        let plug = self.plug.clone();
        let base = plug.base(new_base);
        let o = &mut self.objects[oi];

        o.attributes = base.attributes
            | (o.attributes
                & (attr::IS_HUMAN_CONTROLLED
                    | attr::IS_REMOTE
                    | attr::IS_PLAYER_SHIP
                    | attr::STATIC_DESTINATION));
        o.base = Some(new_base);
        o.tiny_size = base.tiny_size;
        o.shield_color = base.shield_color;
        o.layer = base.layer();
        o.direction_goal = 0;
        o.turn_fraction = Fixed::ZERO;
        o.turn_velocity = Fixed::ZERO;
        o.max_velocity = base.max_velocity;
        o.natural_scale = base.natural_scale();
        o.level_key_tag = base.level_key_tag.clone();
        o.engage_key_tag = base.engage_key_tag.clone();
        o.order_key_tag = base.order_key_tag.clone();
        o.active = Activity::InUse;

        if o.attributes & attr::IS_SELF_ANIMATED != 0 {
            o.anim.this_shape = base.animation.frame_shape;
            if base.animation.frame_shape_range > Fixed::ZERO {
                o.anim.this_shape =
                    o.anim.this_shape + o.random.next_fixed(base.animation.frame_shape_range);
            }
            o.anim.frame_direction = base.animation.frame_direction;
            if base.animation.frame_direction_range == -1 {
                if o.random.next(2) == 1 {
                    o.anim.frame_direction = 1;
                }
            } else if base.animation.frame_direction_range > 0 {
                o.anim.frame_direction += o.random.next(base.animation.frame_direction_range);
            }
            o.anim.frame_fraction = Fixed::ZERO;
            o.anim.frame_speed = base.animation.frame_speed;
        }

        if let Some(age) = base.initial_age {
            o.expire_after =
                age + Ticks(o.random.next(base.initial_age_range.count() as i32) as i64);
            o.expires = true;
        } else {
            o.expires = false;
            // An age used to be drawn unconditionally here; keep the
            // stream in step for old recordings.
            o.random.next(1);
        }

        o.periodic_time = Ticks::ZERO;
        if base.activate_period != Ticks::ZERO {
            o.periodic_time = base.activate_period
                + Ticks(o.random.next(base.activate_period_range.count() as i32) as i64);
        }

        o.reload_weapons(&plug, base, !keep_ammo);
        if !keep_ammo {
            let now = self.time;
            for weapon in [&mut o.pulse, &mut o.beam, &mut o.special] {
                if let Some(id) = weapon.base {
                    let fire_time = plug.base(id).device.fire_time;
                    if weapon.time > now + fire_time {
                        weapon.time = now + fire_time;
                    }
                } else {
                    weapon.time = now;
                }
            }
        }

        // Rebind the sprite.
        let sprite_name = sprite_override
            .map(str::to_owned)
            .or_else(|| base.sprite().map(str::to_owned));
        let which_shape = initial_shape(&self.objects[oi], base);
        let (tiny, layer, scale) = (base.tiny_size, base.layer(), base.natural_scale());
        let sprite_h = self.objects[oi].sprite;
        if let Some(s) = self.sprites.get_mut(sprite_h) {
            s.table = sprite_name;
            s.tiny_size = tiny;
            s.layer = layer;
            s.scale = scale;
            s.which_shape = which_shape;
        }
    }

    // -- stat alteration -----------------------------------------------------

    /// Add to health; negative totals run the destroy pipeline.
    pub fn alter_health(&mut self, h: ObjHandle, amount: i32) {
        let Some(o) = self.obj_mut(h) else { return };
        if amount <= 0 {
            o.health += amount;
        } else if o.health >= i32::MAX - amount {
            o.health = i32::MAX;
        } else {
            o.health += amount;
        }
        if o.health < 0 {
            self.destroy_object(h);
        }
    }

    /// Add to energy; overflow charges the battery.
    pub fn alter_energy(&mut self, h: ObjHandle, amount: i32) {
        let plug = self.plug.clone();
        let Some(o) = self.obj_mut(h) else { return };
        o.energy += amount;
        if o.energy < 0 {
            o.energy = 0;
        } else {
            let max = o.max_energy(&plug);
            if o.energy > max {
                let spill = o.energy - max;
                o.energy = max;
                self.alter_battery(h, spill);
            }
        }
    }

    /// Add to battery; overflow is paid to the owner as cash.
    pub fn alter_battery(&mut self, h: ObjHandle, amount: i32) {
        let plug = self.plug.clone();
        let Some(o) = self.obj_mut(h) else { return };
        o.battery += amount;
        let max = o.max_battery(&plug);
        if o.battery > max {
            let spill = o.battery - max;
            o.battery = max;
            let owner = o.owner;
            if let Some(a) = owner.index() {
                self.admirals[a].pay(Fixed::from_val(spill));
            }
        }
    }

    /// Siphon energy toward warp; returns false when the tank ran dry.
    pub fn collect_warp_energy(&mut self, h: ObjHandle, amount: i32) -> bool {
        let Some(o) = self.obj_mut(h) else {
            return false;
        };
        if amount >= o.energy {
            o.warp_energy_collected += o.energy;
            o.energy = 0;
            false
        } else {
            o.energy -= amount;
            o.warp_energy_collected += amount;
            true
        }
    }

    /// Return collected warp energy to the battery.
    pub fn refund_warp_energy(&mut self, h: ObjHandle) {
        let collected = match self.obj_mut(h) {
            Some(o) => std::mem::take(&mut o.warp_energy_collected),
            None => return,
        };
        self.alter_battery(h, collected);
    }

    /// Transfer ownership, with all the bookkeeping that hangs off it.
    pub fn set_owner(&mut self, h: ObjHandle, owner: AdmHandle, message: bool) {
        let Some(oi) = h.index() else { return };
        if !self.objects[oi].is_active() || self.objects[oi].owner == owner {
            return;
        }
        let plug = self.plug.clone();
        let old_owner = self.objects[oi].owner;

        // A human cannot change sides; eject the body first.
        let dont_die = self.objects[oi]
            .base
            .map(|b| plug.base(b).destroy_dont_die)
            .unwrap_or(false);
        if self.objects[oi].attributes & (attr::IS_PLAYER_SHIP | attr::REMOTE_OR_HUMAN) != 0
            && !dont_die
        {
            self.create_floating_player_body(h);
        }

        self.objects[oi].owner = owner;
        self.objects[oi].my_player_flag = match owner.index() {
            Some(a) => 1 << a,
            None => 0,
        };

        if owner.is_some() && self.objects[oi].attributes & attr::IS_DESTINATION != 0 {
            let a = owner.index().unwrap_or(0);
            if self.admirals[a].control.is_none() {
                self.admirals[a].control = h;
                self.admirals[a].control_id = self.objects[oi].id;
            }
            if self.admirals[a].build_at.is_none() {
                let dest = self.objects[oi].as_destination;
                let has_builds = dest
                    .index()
                    .map(|n| self.destinations[n].can_build_anything())
                    .unwrap_or(false);
                if has_builds {
                    self.admirals[a].build_at = dest;
                }
            }
            if self.admirals[a].target.is_none() {
                self.admirals[a].target = h;
                self.admirals[a].target_id = self.objects[oi].id;
            }
        }

        if self.objects[oi].attributes & attr::NEUTRAL_DEATH != 0 {
            if let Some(b) = self.objects[oi].base {
                self.objects[oi].attributes = plug.base(b).attributes;
            }
        }

        // Everything targeting this object reconsiders.
        for fix in 0..self.objects.len() {
            if fix == oi || !self.objects[fix].is_active() {
                continue;
            }
            if self.objects[fix].dest_object == h
                && self.objects[fix].attributes & attr::CAN_THINK != 0
            {
                self.objects[fix].current_target_value = FIXED_NONE;
            }
        }
        let o = &mut self.objects[oi];
        o.remote_foe_strength = Fixed::ZERO;
        o.remote_friend_strength = Fixed::ZERO;
        o.escort_strength = Fixed::ZERO;
        o.local_foe_strength = Fixed::ZERO;
        o.local_friend_strength = Fixed::ZERO;
        o.best_considered_target_value = FIXED_NONE;
        o.current_target_value = FIXED_NONE;
        o.best_considered_target = ObjHandle::NONE;

        if self.objects[oi].attributes & attr::IS_DESTINATION != 0 {
            let dest = self.objects[oi].as_destination;
            if self.objects[oi].attributes & attr::NEUTRAL_DEATH != 0 {
                let occupy = self.objects[oi]
                    .base
                    .map(|b| plug.base(b).occupy_count)
                    .unwrap_or(0);
                admiral::clear_all_occupants(self, dest, owner, occupy);
            }
            admiral::stop_building(self, dest);
            admiral::recalc_all_admiral_build_data(self);
        }

        if message {
            let name = self.object_name(h);
            let text = if let Some(a) = owner.index() {
                format!("{} captured by {}.", name, self.admirals[a].name)
            } else if let Some(a) = old_owner.index() {
                format!("{} lost by {}.", name, self.admirals[a].name)
            } else {
                String::new()
            };
            if !text.is_empty() {
                self.effects.push(Effect::Message(text));
            }
        }
    }

    /// Grow or shrink an occupation force; a full force flips the
    /// owner.
    pub fn alter_object_occupation(
        &mut self,
        h: ObjHandle,
        owner: AdmHandle,
        how_much: i32,
        message: bool,
    ) {
        let Some(oi) = h.index() else { return };
        let o = &self.objects[oi];
        if !(o.is_active()
            && o.attributes & attr::IS_DESTINATION != 0
            && o.attributes & attr::NEUTRAL_DEATH != 0)
        {
            return;
        }
        let dest = o.as_destination;
        let occupy_count = o
            .base
            .map(|b| self.plug.base(b).occupy_count)
            .unwrap_or(0);
        if admiral::alter_occupation(self, dest, owner, how_much) >= occupy_count {
            self.set_owner(h, owner, message);
        }
    }

    /// Begin or break a cloak.
    pub fn set_cloak(&mut self, h: ObjHandle, cloak: bool) {
        let Some(o) = self.obj_mut(h) else { return };
        if cloak && o.cloak_state == 0 {
            o.cloak_state = 1;
            self.effects.push(Effect::CloakOn { at: h });
        } else if (!cloak || (o.attributes & attr::REMOTE_OR_HUMAN != 0)) && o.cloak_state >= 250 {
            o.cloak_state = antares_data::CLOAK_OFF_STATE_MAX;
            self.effects.push(Effect::CloakOff { at: h });
        }
    }

    /// Eject a player body where a human-controlled ship was.
    pub fn create_floating_player_body(&mut self, h: ObjHandle) {
        let plug = self.plug.clone();
        let body_type = plug.blessed.player_body;
        let Some(o) = self.obj(h) else { return };
        // A body does not beget another body.
        if o.base == Some(body_type) {
            return;
        }
        let (velocity, location, direction, owner) =
            (o.velocity, o.location, o.direction, o.owner);
        let body = self.create_object(
            body_type,
            Some(velocity),
            location,
            direction,
            owner,
            0,
            None,
        );
        if body.is_some() {
            self.change_player_ship(owner, body);
        } else {
            self.player_ship_body_expire(h);
        }
    }

    /// Move an admiral's controlled-ship status onto another object.
    pub fn change_player_ship(&mut self, owner: AdmHandle, to: ObjHandle) {
        let Some(a) = owner.index() else { return };
        let old = self.admirals[a].flagship;
        if let Some(o) = self.obj_mut(old) {
            o.attributes &= !(attr::IS_HUMAN_CONTROLLED | attr::IS_PLAYER_SHIP);
        }
        let is_current_admiral = owner == self.admiral;
        let new_id = match self.obj_mut(to) {
            Some(o) => {
                o.attributes |= attr::IS_PLAYER_SHIP;
                if is_current_admiral {
                    o.attributes |= attr::IS_HUMAN_CONTROLLED;
                }
                o.id
            }
            None => return,
        };
        self.admirals[a].flagship = to;
        self.admirals[a].flagship_id = new_id;
        if owner == self.admiral {
            self.ship = to;
        }
    }

    /// A drifting player body ran out: find another ship to inhabit, or
    /// concede.
    pub fn player_ship_body_expire(&mut self, h: ObjHandle) {
        let owner = match self.obj(h) {
            Some(o) => o.owner,
            None => return,
        };
        let replacement = self
            .objects
            .iter()
            .enumerate()
            .find(|(n, o)| {
                ObjHandle(*n as i32) != h
                    && o.active == Activity::InUse
                    && o.owner == owner
                    && o.attributes & attr::CAN_THINK != 0
                    && o.attributes & attr::CAN_ACCEPT_DESTINATION != 0
            })
            .map(|(n, _)| ObjHandle(n as i32));
        match replacement {
            Some(to) => self.change_player_ship(owner, to),
            None => {
                if owner == self.admiral && !self.game_over {
                    self.game_over = true;
                    self.game_over_at = self.time;
                }
            }
        }
    }

    // -- outward surface -----------------------------------------------------

    /// Supply a player's input word for the upcoming tick.
    pub fn inject_input(&mut self, player: usize, keymask: u32) {
        if let Some(slot) = self.pending_input.get_mut(player) {
            *slot = Some(keymask);
        }
    }

    /// Register an effect sink.
    pub fn subscribe_messages(&mut self, sink: Box<dyn MessageSink>) {
        self.sinks.push(sink);
    }

    /// Take this tick's buffered effects.
    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over && self.time >= self.game_over_at
    }

    pub fn winner(&self) -> AdmHandle {
        self.victor
    }

    pub fn next_level(&self) -> Option<usize> {
        self.next_level
    }

    /// Advance one major tick.
    pub fn tick(&mut self) {
        self.apply_pending_input();

        self.time += MAJOR_TICK;
        crate::motion::move_objects(self, MAJOR_TICK);
        crate::think::nonplayer_ship_think(self);
        admiral::admiral_think(self);
        crate::action::execute_queue(self);
        crate::motion::collide_objects(self);
        if ((self.time - self.start_time) % CONDITION_TICK) == Ticks::ZERO {
            crate::condition::check_conditions(self);
        }
        self.sprites.cull();
        self.vectors.cull();

        // With sinks registered, effects are pushed and consumed here;
        // otherwise they accumulate for drain_effects().
        if !self.sinks.is_empty() && !self.effects.is_empty() {
            let fx = std::mem::take(&mut self.effects);
            for sink in &mut self.sinks {
                for e in &fx {
                    sink.receive(e);
                }
            }
        }
    }

    fn apply_pending_input(&mut self) {
        for player in 0..self.pending_input.len() {
            let Some(mask) = self.pending_input[player].take() else {
                continue;
            };
            let flagship = match self.admirals.get(player) {
                Some(a) if a.active => a.flagship,
                _ => continue,
            };
            let inhibited = self.key_mask;
            if let Some(o) = self.obj_mut(flagship) {
                o.keys_down = mask & !inhibited;
            }
        }
    }

    /// The drawable snapshot the renderer consumes between ticks.
    pub fn snapshot(&self) -> Vec<Drawable> {
        let mut out = Vec::new();
        for (h, s) in self.sprites.iter() {
            if s.kill_me {
                continue;
            }
            out.push(Drawable::Sprite {
                handle: h,
                table: s.table.clone(),
                at: s.where_,
                shape: s.which_shape,
                scale: s.scale,
                layer: s.layer,
                style: s.style,
                style_hue: s.style_hue,
                style_data: s.style_data,
                tiny_size: s.tiny_size,
                tiny_dim: s.tiny_dim,
            });
        }
        for (h, v) in self.vectors.iter() {
            if v.kill_me || !v.visible {
                continue;
            }
            out.push(Drawable::Vector {
                handle: h,
                from: self.screen_position(v.last_global_location),
                to: self.screen_position(v.object_location),
                color: v.color,
                hue: v.hue,
                lightning: v.lightning,
                bolt_points: v.bolt_points,
            });
        }
        out
    }

    /// A hex digest of everything that must match for two runs to be in
    /// sync.
    pub fn state_hash(&self) -> String {
        #[derive(Serialize)]
        struct Hashable<'a> {
            time: GameTime,
            random: Random,
            sync: u32,
            objects: &'a [SpaceObject],
            root: ObjHandle,
            admirals: &'a [Admiral],
            destinations: &'a [Destination],
            initials: &'a [ObjHandle],
            initial_ids: &'a [i32],
            condition_enabled: &'a [bool],
            queue: &'a ActionQueue,
        }
        let bytes = serde_json::to_vec(&Hashable {
            time: self.time,
            random: self.random,
            sync: self.sync,
            objects: &self.objects,
            root: self.root,
            admirals: &self.admirals,
            destinations: &self.destinations,
            initials: &self.initials,
            initial_ids: &self.initial_ids,
            condition_enabled: &self.condition_enabled,
            queue: &self.queue,
        })
        .unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}

/// The initial sprite shape for an object.
fn initial_shape(o: &SpaceObject, base: &antares_data::BaseObject) -> i32 {
    if o.attributes & attr::IS_SELF_ANIMATED != 0 {
        more_evil_fixed_to_long(o.anim.this_shape)
    } else if o.attributes & attr::SHAPE_FROM_DIRECTION != 0 {
        let mut angle = o.direction;
        add_angle(&mut angle, base.rotation.rot_res >> 1);
        angle / base.rotation.rot_res
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Drawables
// ---------------------------------------------------------------------------

/// One renderer-facing entity in the between-ticks snapshot.
#[derive(Clone, Debug)]
pub enum Drawable {
    Sprite {
        handle: SpriteHandle,
        table: Option<String>,
        at: Point,
        shape: i32,
        scale: i32,
        layer: i16,
        style: crate::sprite::SpriteStyle,
        style_hue: u8,
        style_data: i32,
        tiny_size: i32,
        tiny_dim: u8,
    },
    Vector {
        handle: VectorHandle,
        from: Point,
        to: Point,
        color: u8,
        hue: Option<u8>,
        lightning: bool,
        bolt_points: [Point; crate::vector::BOLT_POINT_NUM],
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn create_links_at_head() {
        let mut g = testutil::bare_game();
        let cruiser = g.plug.base_named("cruiser").unwrap();
        let a = g.create_object(
            cruiser,
            None,
            testutil::center(),
            0,
            AdmHandle(0),
            0,
            None,
        );
        let b = g.create_object(
            cruiser,
            None,
            testutil::center(),
            90,
            AdmHandle(0),
            0,
            None,
        );
        assert_eq!(g.root, b, "newest object heads the list");
        assert_eq!(g.obj(b).unwrap().next_object, a);
        assert_eq!(g.obj(a).unwrap().previous_object, b);
    }

    #[test]
    fn freed_slot_reads_stale() {
        let mut g = testutil::bare_game();
        let cruiser = g.plug.base_named("cruiser").unwrap();
        let h = g.create_object(
            cruiser,
            None,
            testutil::center(),
            0,
            AdmHandle(0),
            0,
            None,
        );
        let id = g.obj(h).unwrap().id;
        g.free_object(h);
        assert!(g.obj(h).is_none());
        assert!(g.obj_checked(h, id).is_none());
    }

    #[test]
    fn arena_exhaustion_suppresses_spawn() {
        let mut g = testutil::bare_game();
        let cruiser = g.plug.base_named("cruiser").unwrap();
        let mut made = 0;
        loop {
            let h = g.create_object(
                cruiser,
                None,
                testutil::center(),
                0,
                AdmHandle(0),
                0,
                None,
            );
            if h.is_none() {
                break;
            }
            made += 1;
            assert!(made <= antares_data::MAX_SPACE_OBJECTS);
        }
        assert_eq!(made, antares_data::MAX_SPACE_OBJECTS);
        // The world is still consistent and tickable.
        g.tick();
    }

    #[test]
    fn battery_overflow_pays_owner() {
        let mut g = testutil::bare_game();
        let cruiser = g.plug.base_named("cruiser").unwrap();
        let h = g.create_object(
            cruiser,
            None,
            testutil::center(),
            0,
            AdmHandle(0),
            0,
            None,
        );
        g.admirals[0].active = true;
        g.admirals[0].earning_power = Fixed::from_long(1);
        let before = g.admirals[0].cash;
        let max = g.obj(h).unwrap().max_battery(&g.plug);
        g.alter_battery(h, max + 100);
        assert_eq!(g.obj(h).unwrap().battery, max);
        assert!(g.admirals[0].cash > before);
    }
}
