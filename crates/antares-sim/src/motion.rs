//! Kinematics, spatial partitioning, and collision.
//!
//! Motion advances every active object by one minor tick per iteration:
//! turn, thrust, then position, all in fixed point with fractional
//! carry. Collision rebuilds the two-resolution 16x16 toroidal grids
//! each major tick, pairs adjacent cells through the five-offset walk,
//! and resolves hits, elastic pushes, and beam intersections. The
//! locality pass aggregates local friend/foe strength and per-player
//! visibility.

use antares_data::object::{attr, runtime_flag, CLOAK_ON_STATE_MAX};
use antares_math::{
    add_angle, lsqrt_fixed, more_evil_fixed_to_long, ratio_to_angle, rot_point, Coord, Fixed,
    Point, Rect, Ticks, FIXED_NONE, MAJOR_TICK, UNIVERSAL_CENTER,
};

use crate::game::{Game, PROXIMITY_GRID_LEN, PROXIMITY_UNIT_AND_MODULO, PROXIMITY_WIDTH_SHIFT};
use crate::handle::ObjHandle;
use crate::obj::{
    Activity, Presence, MAXIMUM_RELEVANT_DISTANCE, MAXIMUM_RELEVANT_DISTANCE_SQUARED,
};
use crate::sprite::SpriteStyle;
use crate::think;

/// Near-grid shifts: cells of 128 units, super cells of 2048.
const COLLISION_UNIT_SHIFT: u32 = 7;
const COLLISION_SUPER_UNIT_SHIFT: u32 = 11;
/// Far-grid shifts: cells of 2048 units, super cells of 32768.
const DISTANCE_UNIT_SHIFT: u32 = 11;
const DISTANCE_SUPER_UNIT_SHIFT: u32 = 15;

/// Sprite scale shift: 4096 = 100%.
const SHIFT_SCALE: u32 = 12;

/// The thinkable universe: outside this box, non-bouncing objects die.
const THINKIVERSE_TOP_LEFT: u32 = UNIVERSAL_CENTER - (2 * 65_534);
const THINKIVERSE_BOTTOM_RIGHT: u32 = UNIVERSAL_CENTER + (2 * 65_534);

/// Attributes that make an object participate in the distance pass.
const CONSIDER_DISTANCE_ATTRIBUTES: u32 = attr::CAN_COLLIDE
    | attr::CAN_BE_HIT
    | attr::IS_DESTINATION
    | attr::CAN_THINK
    | attr::CONSIDER_DISTANCE
    | attr::CAN_BE_EVADED
    | attr::IS_HUMAN_CONTROLLED
    | attr::IS_REMOTE;

/// Extract the whole part of a fractional accumulator with the biased
/// rounding the integrators use.
#[inline]
fn whole(f: Fixed) -> i32 {
    if f >= Fixed::ZERO {
        more_evil_fixed_to_long(f + Fixed::from_val(128))
    } else {
        more_evil_fixed_to_long(f - Fixed::from_val(128)) + 1
    }
}

// ---------------------------------------------------------------------------
// Motion
// ---------------------------------------------------------------------------

/// Advance every active object by `units` minor ticks, then refresh
/// sprite positions and styles.
pub fn move_objects(g: &mut Game, units: Ticks) {
    if units == Ticks::ZERO {
        return;
    }

    for _ in 0..units.count() {
        let mut h = g.root;
        while let Some(i) = h.index() {
            let next = g.objects[i].next_object;
            if g.objects[i].active == Activity::InUse {
                move_one(g, i);
                bounce(g, i);
                if g.objects[i].attributes & attr::IS_SELF_ANIMATED != 0 {
                    animate(g, i);
                } else if g.objects[i].attributes & attr::IS_VECTOR != 0 {
                    move_vector(g, i);
                }
            }
            h = next;
        }
    }

    if let Some(ship) = g.obj(g.ship) {
        if ship.active == Activity::InUse {
            g.global_corner = ship.location;
        }
    }

    // Nothing below can affect object actions; it only feeds rendering.
    let mut h = g.root;
    while let Some(i) = h.index() {
        let next = g.objects[i].next_object;
        let o = &g.objects[i];
        if o.active != Activity::InUse
            || o.attributes & attr::IS_VECTOR != 0
            || o.sprite.is_none()
        {
            h = next;
            continue;
        }
        let where_ = g.screen_position(o.location);
        let sprite_h = o.sprite;
        if let Some(s) = g.sprites.get_mut(sprite_h) {
            s.where_ = where_;
        }
        update_static(g, i, units);

        let o = &g.objects[i];
        let plug = g.plug.clone();
        let Some(base_id) = o.base else {
            h = next;
            continue;
        };
        let base = plug.base(base_id);
        let which_shape = if o.attributes & attr::IS_SELF_ANIMATED != 0 {
            if base.animation.frame_speed != Fixed::ZERO {
                Some(more_evil_fixed_to_long(o.anim.this_shape))
            } else {
                None
            }
        } else if o.attributes & attr::SHAPE_FROM_DIRECTION != 0 {
            let mut angle = o.direction;
            add_angle(&mut angle, base.rotation.rot_res >> 1);
            Some(angle / base.rotation.rot_res)
        } else {
            None
        };
        if let Some(shape) = which_shape {
            let sprite_h = o.sprite;
            if let Some(s) = g.sprites.get_mut(sprite_h) {
                s.which_shape = shape;
            }
        }
        h = next;
    }
}

fn move_one(g: &mut Game, i: usize) {
    let o = &mut g.objects[i];
    if o.max_velocity == Fixed::ZERO && o.attributes & attr::CAN_TURN == 0 {
        return;
    }

    if o.attributes & attr::CAN_TURN != 0 {
        o.turn_fraction += o.turn_velocity;
        let h = whole(o.turn_fraction);
        o.direction += h;
        o.turn_fraction -= Fixed::from_long(h);
        while o.direction >= 360 {
            o.direction -= 360;
        }
        while o.direction < 0 {
            o.direction += 360;
        }
    }

    if o.thrust != Fixed::ZERO {
        let (mut fa, mut fb, use_thrust);
        if o.thrust > Fixed::ZERO {
            // The goal vector is the heading at full allowed speed.
            let (ch, cv) = rot_point(o.direction);
            match o.presence {
                Presence::Warping(speed) => {
                    fa = ch * speed;
                    fb = cv * speed;
                }
                Presence::WarpOut(speed) => {
                    fa = ch * speed;
                    fb = cv * speed;
                }
                _ => {
                    fa = o.max_velocity * ch;
                    fb = o.max_velocity * cv;
                }
            }
            fa = fa - o.velocity.h;
            fb = fb - o.velocity.v;
            use_thrust = o.thrust;
        } else {
            fa = -o.velocity.h;
            fb = -o.velocity.v;
            use_thrust = -o.thrust;
        }

        // Clamp the velocity delta so acceleration cannot exceed the
        // thrust projected on the delta's own heading.
        let angle = ratio_to_angle(fa, fb);
        let (fh, fv) = rot_point(angle);
        let fh = use_thrust * fh;
        let fv = use_thrust * fv;

        if fh < Fixed::ZERO {
            if fa < fh {
                fa = fh;
            }
        } else if fa > fh {
            fa = fh;
        }
        if fv < Fixed::ZERO {
            if fb < fv {
                fb = fv;
            }
        } else if fb > fv {
            fb = fv;
        }

        o.velocity.h += fa;
        o.velocity.v += fb;
    }

    o.motion_fraction.h += o.velocity.h;
    o.motion_fraction.v += o.velocity.v;

    let h = whole(o.motion_fraction.h);
    o.location.h = o.location.h.wrapping_sub(h as u32);
    o.motion_fraction.h -= Fixed::from_long(h);

    let v = whole(o.motion_fraction.v);
    o.location.v = o.location.v.wrapping_sub(v as u32);
    o.motion_fraction.v -= Fixed::from_long(v);
}

fn bounce(g: &mut Game, i: usize) {
    let o = &mut g.objects[i];
    if o.attributes & attr::DOES_BOUNCE == 0 {
        if o.location.h < THINKIVERSE_TOP_LEFT
            || o.location.v < THINKIVERSE_TOP_LEFT
            || o.location.h > THINKIVERSE_BOTTOM_RIGHT
            || o.location.v > THINKIVERSE_BOTTOM_RIGHT
        {
            o.active = Activity::ToBeFreed;
        }
    } else {
        if o.location.h < THINKIVERSE_TOP_LEFT {
            o.location.h = THINKIVERSE_TOP_LEFT;
            o.velocity.h = -o.velocity.h;
        } else if o.location.h > THINKIVERSE_BOTTOM_RIGHT {
            o.location.h = THINKIVERSE_BOTTOM_RIGHT;
            o.velocity.h = -o.velocity.h;
        }
        if o.location.v < THINKIVERSE_TOP_LEFT {
            o.location.v = THINKIVERSE_TOP_LEFT;
            o.velocity.v = -o.velocity.v;
        } else if o.location.v > THINKIVERSE_BOTTOM_RIGHT {
            o.location.v = THINKIVERSE_BOTTOM_RIGHT;
            o.velocity.v = -o.velocity.v;
        }
    }
}

fn animate(g: &mut Game, i: usize) {
    let plug = g.plug.clone();
    let Some(base_id) = g.objects[i].base else {
        return;
    };
    let anim = &plug.base(base_id).animation;
    if anim.frame_speed == Fixed::ZERO {
        return;
    }
    let o = &mut g.objects[i];
    o.anim.this_shape += o.anim.frame_speed * o.anim.frame_direction;
    if o.attributes & attr::ANIMATION_CYCLE != 0 {
        let shape_num = (anim.last_shape - anim.first_shape) + Fixed::from_val(1);
        while o.anim.this_shape > anim.last_shape {
            o.anim.this_shape -= shape_num;
        }
        while o.anim.this_shape < anim.first_shape {
            o.anim.this_shape += shape_num;
        }
    } else if o.anim.this_shape > anim.last_shape || o.anim.this_shape < anim.first_shape {
        o.active = Activity::ToBeFreed;
        o.anim.this_shape = anim.last_shape;
    }
}

fn move_vector(g: &mut Game, i: usize) {
    let vector_h = g.objects[i].vector;
    let Some(v) = g.vectors.get(vector_h) else {
        // A vector object without its line entity cannot continue.
        g.objects[i].active = Activity::ToBeFreed;
        return;
    };
    let kind = (
        v.is_ray,
        v.to_coord,
        v.to_object,
        v.to_object_id,
        v.from_object,
        v.from_object_id,
        v.to_relative_coord,
    );
    let location = g.objects[i].location;
    if let Some(v) = g.vectors.get_mut(vector_h) {
        v.object_location = location;
    }

    let (is_ray, to_coord, to_object, to_object_id, from_object, from_object_id, rel) = kind;
    if is_ray && !to_coord {
        // Pinned to a target object at the far end.
        if to_object.is_some() {
            match g.obj_checked(to_object, to_object_id) {
                Some(t) => {
                    let loc = t.location;
                    g.objects[i].location = loc;
                    if let Some(v) = g.vectors.get_mut(vector_h) {
                        v.object_location = loc;
                    }
                }
                None => g.objects[i].active = Activity::ToBeFreed,
            }
        }
        if from_object.is_some() {
            match g.obj_checked(from_object, from_object_id) {
                Some(t) => {
                    let loc = t.location;
                    if let Some(v) = g.vectors.get_mut(vector_h) {
                        v.last_global_location = loc;
                        v.last_apparent_location = loc;
                    }
                }
                None => g.objects[i].active = Activity::ToBeFreed,
            }
        }
    } else if is_ray && to_coord {
        if from_object.is_some() {
            match g.obj_checked(from_object, from_object_id) {
                Some(t) => {
                    let loc = t.location;
                    let end = Coord::new(
                        loc.h.wrapping_add(rel.h as u32),
                        loc.v.wrapping_add(rel.v as u32),
                    );
                    g.objects[i].location = end;
                    if let Some(v) = g.vectors.get_mut(vector_h) {
                        v.last_global_location = loc;
                        v.last_apparent_location = loc;
                        v.object_location = end;
                    }
                }
                None => g.objects[i].active = Activity::ToBeFreed,
            }
        }
    }
    // Bolts ride their object; nothing to do for them here.
}

/// Advance hit-flash and cloak ramps, mirroring them into sprite style.
fn update_static(g: &mut Game, i: usize, units: Ticks) {
    let o = &mut g.objects[i];
    let sprite_h = o.sprite;
    let units = units.count() as i32;

    if o.hit_state != 0 {
        o.hit_state -= units << 2;
        let (style, hue, data) = if o.hit_state <= 0 {
            o.hit_state = 0;
            (SpriteStyle::Normal, 0, 0)
        } else {
            (
                SpriteStyle::Color,
                o.shield_color.unwrap_or(0),
                o.hit_state,
            )
        };
        if let Some(s) = g.sprites.get_mut(sprite_h) {
            s.style = style;
            s.style_hue = hue;
            s.style_data = data;
        }
        return;
    }

    if o.cloak_state > 0 {
        if o.cloak_state < CLOAK_ON_STATE_MAX {
            o.runtime_flags |= runtime_flag::IS_CLOAKED;
            o.cloak_state += units << 2;
            if o.cloak_state > CLOAK_ON_STATE_MAX {
                o.cloak_state = CLOAK_ON_STATE_MAX;
            }
        }
        let own = o.owner == g.admiral;
        let mut data = o.cloak_state;
        if own {
            data -= data >> 2;
        }
        if let Some(s) = g.sprites.get_mut(sprite_h) {
            s.style = SpriteStyle::Color;
            s.style_hue = 0;
            s.style_data = data;
        }
    } else if o.cloak_state < 0 {
        o.cloak_state += units << 2;
        if o.cloak_state >= 0 {
            o.runtime_flags &= !runtime_flag::IS_CLOAKED;
            o.cloak_state = 0;
            if let Some(s) = g.sprites.get_mut(sprite_h) {
                s.style = SpriteStyle::Normal;
            }
        } else {
            let own = o.owner == g.admiral;
            let mut data = -o.cloak_state;
            if own {
                data -= data >> 2;
            }
            if let Some(s) = g.sprites.get_mut(sprite_h) {
                s.style = SpriteStyle::Color;
                s.style_hue = 0;
                s.style_data = data;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Collision
// ---------------------------------------------------------------------------

/// The whole per-tick collision pipeline.
pub fn collide_objects(g: &mut Game) {
    calc_misc(g);
    calc_bounds(g);
    calc_impacts(g);
    calc_locality(g);
    calc_visibility(g);
    update_last_vector_locations(g);
}

/// Aging, periodic activation, radar distances, and grid insertion.
fn calc_misc(g: &mut Game) {
    let mut farthest_dist: u64 = 0;
    let mut closest_dist: u64 = u64::MAX;
    g.closest = ObjHandle::NONE;
    g.farthest = ObjHandle::NONE;
    g.grid.reset_links();

    let ship_state = g.obj(g.ship).map(|s| (s.active, s.location, s.owner));

    let mut h = g.root;
    while let Some(i) = h.index() {
        let next = g.objects[i].next_object;
        if !g.objects[i].is_active() {
            h = next;
            continue;
        }

        age_object(g, i);
        if !g.objects[i].is_active() || g.objects[i].active == Activity::ToBeFreed {
            h = next;
            continue;
        }
        activate_object(g, i);
        if !g.objects[i].is_active() || g.objects[i].active == Activity::ToBeFreed {
            h = next;
            continue;
        }

        // Closest/farthest radar object relative to the player, for
        // zoom.
        if let Some((Activity::InUse, ship_loc, ship_owner)) = ship_state {
            let o = &mut g.objects[i];
            if o.attributes & attr::APPEAR_ON_RADAR != 0 {
                let hdiff = u64::from(ship_loc.dh(o.location).unsigned_abs());
                let vdiff = u64::from(ship_loc.dv(o.location).unsigned_abs());
                let dist = vdiff * vdiff + hdiff * hdiff;
                o.distance_from_player = dist;
                if dist < closest_dist && ObjHandle(i as i32) != g.ship {
                    let foe_zoom_mismatch =
                        g.zoom == antares_data::Zoom::Foe && o.owner == ship_owner;
                    if !foe_zoom_mismatch {
                        closest_dist = dist;
                        g.closest = ObjHandle(i as i32);
                    }
                }
                if dist > farthest_dist {
                    farthest_dist = dist;
                    g.farthest = ObjHandle(i as i32);
                }
            }
        }

        let o = &mut g.objects[i];
        if o.attributes & CONSIDER_DISTANCE_ATTRIBUTES != 0 {
            o.local_friend_strength = o
                .base
                .map(|b| g.plug.base(b).offense_value)
                .unwrap_or(Fixed::ZERO);
            o.local_foe_strength = Fixed::ZERO;
            o.closest_object = ObjHandle::NONE;
            o.closest_distance = MAXIMUM_RELEVANT_DISTANCE_SQUARED;
            o.absolute_bounds = Rect::default();

            let loc = o.location;
            {
                let x1 = ((loc.h >> COLLISION_UNIT_SHIFT) as i32) & PROXIMITY_UNIT_AND_MODULO;
                let y1 = ((loc.v >> COLLISION_UNIT_SHIFT) as i32) & PROXIMITY_UNIT_AND_MODULO;
                let x2 = (loc.h >> COLLISION_SUPER_UNIT_SHIFT) as i32;
                let y2 = (loc.v >> COLLISION_SUPER_UNIT_SHIFT) as i32;
                let cell = ((y1 << PROXIMITY_WIDTH_SHIFT) + x1) as usize;
                o.next_near_object = g.grid.cells[cell].near;
                g.grid.cells[cell].near = ObjHandle(i as i32);
                g.objects[i].collision_grid = Point::new(x2, y2);
            }
            let o = &mut g.objects[i];
            {
                let x3 = ((loc.h >> DISTANCE_UNIT_SHIFT) as i32) & PROXIMITY_UNIT_AND_MODULO;
                let y3 = ((loc.v >> DISTANCE_UNIT_SHIFT) as i32) & PROXIMITY_UNIT_AND_MODULO;
                let x4 = (loc.h >> DISTANCE_SUPER_UNIT_SHIFT) as i32;
                let y4 = (loc.v >> DISTANCE_SUPER_UNIT_SHIFT) as i32;
                let cell = ((y3 << PROXIMITY_WIDTH_SHIFT) + x3) as usize;
                o.next_far_object = g.grid.cells[cell].far;
                g.grid.cells[cell].far = ObjHandle(i as i32);
                g.objects[i].distance_grid = Point::new(x4, y4);
            }

            let o = &mut g.objects[i];
            if o.attributes & attr::IS_DESTINATION == 0 {
                o.seen_by_player_flags = 0x8000_0000;
            }
            o.runtime_flags &= !runtime_flag::IS_HIDDEN;

            let tiny = o.tiny_size;
            let sprite_h = o.sprite;
            if let Some(s) = g.sprites.get_mut(sprite_h) {
                s.tiny_size = tiny;
            }
        }
        h = next;
    }
}

fn age_object(g: &mut Game, i: usize) {
    if !g.objects[i].expires {
        return;
    }
    g.objects[i].expire_after -= MAJOR_TICK;
    if g.objects[i].expire_after < Ticks::ZERO {
        let plug = g.plug.clone();
        let base_id = g.objects[i].base;
        let dont_die = base_id
            .map(|b| plug.base(b).expire_dont_die)
            .unwrap_or(false);
        if !dont_die {
            g.objects[i].active = Activity::ToBeFreed;
        }
        if let Some(b) = base_id {
            crate::action::exec(
                g,
                crate::action::ActionRef::Base(b, crate::action::Hook::Expire),
                0,
                ObjHandle(i as i32),
                ObjHandle::NONE,
                None,
            );
        }
    }
}

fn activate_object(g: &mut Game, i: usize) {
    if g.objects[i].periodic_time <= Ticks::ZERO {
        return;
    }
    g.objects[i].periodic_time -= Ticks(1);
    if g.objects[i].periodic_time <= Ticks::ZERO {
        let plug = g.plug.clone();
        let Some(base_id) = g.objects[i].base else {
            return;
        };
        crate::action::exec(
            g,
            crate::action::ActionRef::Base(base_id, crate::action::Hook::Activate),
            0,
            ObjHandle(i as i32),
            ObjHandle::NONE,
            None,
        );
        let base = plug.base(base_id);
        let o = &mut g.objects[i];
        o.periodic_time = base.activate_period
            + Ticks(o.random.next(base.activate_period_range.count() as i32) as i64);
    }
}

/// Set `absoluteBounds` on every object that needs fresh ones.
fn calc_bounds(g: &mut Game) {
    let plug = g.plug.clone();
    let mut h = g.root;
    while let Some(i) = h.index() {
        let next = g.objects[i].next_object;
        let o = &g.objects[i];
        if o.absolute_bounds.left >= o.absolute_bounds.right && o.sprite.is_some() {
            if let Some(base_id) = o.base {
                let (w, hgt) = plug.base(base_id).frame_size();
                let scale = o.natural_scale;
                let cw = ((w / 2) * scale) >> SHIFT_SCALE;
                let ch = ((hgt / 2) * scale) >> SHIFT_SCALE;
                let sw = (w * scale) >> SHIFT_SCALE;
                let sh = (hgt * scale) >> SHIFT_SCALE;
                let lh = o.location.h as i32;
                let lv = o.location.v as i32;
                g.objects[i].absolute_bounds =
                    Rect::new(lh - cw, lv - ch, lh - cw + sw, lv - ch + sh);
            }
        }
        h = next;
    }
}

// Collision uses inclusive rect bounds for historical reasons.
fn inclusive_intersect(mut x: Rect, mut y: Rect) -> bool {
    x.right += 1;
    x.bottom += 1;
    y.right += 1;
    y.bottom += 1;
    x.intersects(&y)
}

fn clip_code(x: i32, y: i32, bounds: &Rect) -> i32 {
    (i32::from(x < bounds.left) << 3)
        | (i32::from(x >= bounds.right) << 2)
        | (i32::from(y < bounds.top) << 1)
        | i32::from(y >= bounds.bottom)
}

/// Cohen-Sutherland walk of the vector's segment against a solid's
/// bounds.
fn vector_intersects(g: &Game, vector_i: usize, target_i: usize) -> bool {
    let vo = &g.objects[vector_i];
    if vo.active == Activity::ToBeFreed {
        return false;
    }
    let Some(v) = g.vectors.get(vo.vector) else {
        return false;
    };
    let bounds = g.objects[target_i].absolute_bounds;

    let mut start = Point::new(vo.location.h as i32, vo.location.v as i32);
    let end = Point::new(
        v.last_global_location.h as i32,
        v.last_global_location.v as i32,
    );

    let end_clip = clip_code(end.h, end.v, &bounds);
    if end_clip == 0 {
        return true;
    }

    loop {
        let start_clip = clip_code(start.h, start.v, &bounds);
        if start_clip == 0 {
            return true;
        } else if start_clip & end_clip != 0 {
            return false;
        }

        let xd = end.h - start.h;
        let yd = end.v - start.v;
        if start_clip & 8 != 0 {
            start.v += yd * (bounds.left - start.h) / xd;
            start.h = bounds.left;
        } else if start_clip & 4 != 0 {
            start.v += yd * (bounds.right - 1 - start.h) / xd;
            start.h = bounds.right - 1;
        } else if start_clip & 2 != 0 {
            start.h += xd * (bounds.top - start.v) / yd;
            start.v = bounds.top;
        } else if start_clip & 1 != 0 {
            start.h += xd * (bounds.bottom - 1 - start.v) / yd;
            start.v = bounds.bottom - 1;
        }
    }
}

/// Pair adjacent near-grid cells and resolve every hit exactly once.
fn calc_impacts(g: &mut Game) {
    for cell_index in 0..PROXIMITY_GRID_LEN {
        let mut a_h = g.grid.cells[cell_index].near;
        while let Some(a) = a_h.index() {
            for k in 0..5 {
                let (mut b_h, super_) = if k == 0 {
                    (g.objects[a].next_near_object, g.objects[a].collision_grid)
                } else {
                    let (adj_cell, offset) = g.grid.cells[cell_index].adjacent[k];
                    let mut s = g.objects[a].collision_grid;
                    s.offset(offset.h, offset.v);
                    (g.grid.cells[adj_cell].near, s)
                };
                if super_.h < 0 || super_.v < 0 {
                    continue;
                }

                while let Some(b) = b_h.index() {
                    let next_b = g.objects[b].next_near_object;
                    let (aa, ba) = (g.objects[a].attributes, g.objects[b].attributes);
                    if (aa | ba) & attr::CAN_COLLIDE == 0
                        || (aa | ba) & attr::CAN_BE_HIT == 0
                        || g.objects[b].collision_grid != super_
                        || g.objects[a].owner == g.objects[b].owner
                    {
                        b_h = next_b;
                        continue;
                    }

                    if aa & ba & attr::IS_VECTOR != 0 {
                        // Vectors could cross, but pairing them is not
                        // supported.
                    } else if aa & attr::IS_VECTOR != 0 {
                        if vector_intersects(g, a, b) {
                            think::hit_object(g, ObjHandle(b as i32), ObjHandle(a as i32));
                        }
                    } else if ba & attr::IS_VECTOR != 0 {
                        if vector_intersects(g, b, a) {
                            think::hit_object(g, ObjHandle(a as i32), ObjHandle(b as i32));
                        }
                    } else if inclusive_intersect(
                        g.objects[a].absolute_bounds,
                        g.objects[b].absolute_bounds,
                    ) {
                        think::hit_object(g, ObjHandle(a as i32), ObjHandle(b as i32));
                        think::hit_object(g, ObjHandle(b as i32), ObjHandle(a as i32));
                        correct_physical_space(g, a, b);
                    }
                    b_h = next_b;
                }
            }
            a_h = g.objects[a].next_near_object;
        }
    }
}

/// Pair adjacent far-grid cells: nearest targets, local strengths,
/// visibility, and hide effects.
fn calc_locality(g: &mut Game) {
    let plug = g.plug.clone();
    for cell_index in 0..PROXIMITY_GRID_LEN {
        let mut a_h = g.grid.cells[cell_index].far;
        while let Some(a) = a_h.index() {
            for k in 0..5 {
                let (mut b_h, super_) = if k == 0 {
                    (g.objects[a].next_far_object, g.objects[a].distance_grid)
                } else {
                    let (adj_cell, offset) = g.grid.cells[cell_index].adjacent[k];
                    let mut s = g.objects[a].distance_grid;
                    s.offset(offset.h, offset.v);
                    (g.grid.cells[adj_cell].far, s)
                };
                if super_.h < 0 || super_.v < 0 {
                    continue;
                }

                while let Some(b) = b_h.index() {
                    let next_b = g.objects[b].next_far_object;
                    if g.objects[b].distance_grid != super_ {
                        b_h = next_b;
                        continue;
                    }

                    let thinkish = |attrs: u32| {
                        attrs & (attr::CAN_THINK | attr::REMOTE_OR_HUMAN | attr::HATED) != 0
                    };
                    let (aa, ba) = (g.objects[a].attributes, g.objects[b].attributes);
                    let owners_differ = g.objects[a].owner != g.objects[b].owner;

                    if owners_differ && thinkish(aa) && thinkish(ba) {
                        let x_dist =
                            g.objects[a].location.dh(g.objects[b].location).unsigned_abs();
                        let y_dist =
                            g.objects[a].location.dv(g.objects[b].location).unsigned_abs();
                        let dist = if x_dist > MAXIMUM_RELEVANT_DISTANCE
                            || y_dist > MAXIMUM_RELEVANT_DISTANCE
                        {
                            MAXIMUM_RELEVANT_DISTANCE_SQUARED
                        } else {
                            y_dist * y_dist + x_dist * x_dist
                        };

                        if dist < MAXIMUM_RELEVANT_DISTANCE_SQUARED {
                            let (af, bf) =
                                (g.objects[a].my_player_flag, g.objects[b].my_player_flag);
                            g.objects[a].seen_by_player_flags |= bf;
                            g.objects[b].seen_by_player_flags |= af;
                            if ba & attr::HIDE_EFFECT != 0 {
                                g.objects[a].runtime_flags |= runtime_flag::IS_HIDDEN;
                            }
                            if aa & attr::HIDE_EFFECT != 0 {
                                g.objects[b].runtime_flags |= runtime_flag::IS_HIDDEN;
                            }
                        }

                        let a_engages = g.objects[a].engages(&plug, &g.objects[b]);
                        let b_engages = g.objects[b].engages(&plug, &g.objects[a]);
                        if a_engages
                            && dist < g.objects[a].closest_distance
                            && ba & attr::POTENTIAL_TARGET != 0
                        {
                            g.objects[a].closest_distance = dist;
                            g.objects[a].closest_object = ObjHandle(b as i32);
                        }
                        if b_engages
                            && dist < g.objects[b].closest_distance
                            && aa & attr::POTENTIAL_TARGET != 0
                        {
                            g.objects[b].closest_distance = dist;
                            g.objects[b].closest_object = ObjHandle(a as i32);
                        }

                        let (ao, bo) = g.two_objs(a, b);
                        bo.local_foe_strength += ao.local_friend_strength;
                        bo.local_friend_strength += ao.local_foe_strength;
                    } else if k == 0 {
                        let (ao, bo) = g.two_objs(a, b);
                        if ao.owner != bo.owner {
                            bo.local_foe_strength += ao.local_friend_strength;
                            bo.local_friend_strength += ao.local_foe_strength;
                        } else {
                            bo.local_foe_strength += ao.local_foe_strength;
                            bo.local_friend_strength += ao.local_friend_strength;
                        }
                    }
                    b_h = next_b;
                }
            }
            a_h = g.objects[a].next_far_object;
        }
    }
}

/// Apply cloak/hide results to visibility bits, free the dead, and hide
/// radar dots the local player cannot see.
fn calc_visibility(g: &mut Game) {
    let seen_by_me = match g.admiral.index() {
        Some(a) => 1u32 << a,
        None => 0,
    };
    for i in 0..g.objects.len() {
        if g.objects[i].active == Activity::ToBeFreed {
            g.free_object(ObjHandle(i as i32));
        } else if g.objects[i].is_active() {
            let o = &mut g.objects[i];
            if o.attributes & CONSIDER_DISTANCE_ATTRIBUTES != 0
                && o.attributes & attr::IS_DESTINATION == 0
            {
                if o.runtime_flags & runtime_flag::IS_CLOAKED != 0 {
                    o.seen_by_player_flags = 0;
                } else if o.runtime_flags & runtime_flag::IS_HIDDEN == 0 {
                    o.seen_by_player_flags = 0xffff_ffff;
                }
                o.seen_by_player_flags |= o.my_player_flag;
                let invisible = o.seen_by_player_flags & seen_by_me == 0;
                let sprite_h = o.sprite;
                if invisible {
                    if let Some(s) = g.sprites.get_mut(sprite_h) {
                        s.tiny_size = 0;
                    }
                }
            }
        }
    }
}

fn update_last_vector_locations(g: &mut Game) {
    for i in 0..g.objects.len() {
        if g.objects[i].active == Activity::InUse
            && g.objects[i].attributes & attr::IS_VECTOR != 0
        {
            let loc = g.objects[i].location;
            let vh = g.objects[i].vector;
            if let Some(v) = g.vectors.get_mut(vh) {
                v.last_global_location = loc;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Elastic push
// ---------------------------------------------------------------------------

fn adjust_velocity(g: &mut Game, i: usize, angle: i32, total_mass: Fixed, force: Fixed) {
    let mass = g.objects[i]
        .base
        .map(|b| g.plug.base(b).mass)
        .unwrap_or(Fixed::ZERO);
    let mut tfix = mass * force;
    if total_mass == Fixed::ZERO {
        tfix = FIXED_NONE;
    } else {
        tfix = tfix / total_mass;
    }
    tfix += g.objects[i].max_velocity >> 1;
    let (th, tv) = rot_point(angle);
    let o = &mut g.objects[i];
    o.velocity.h = tfix * th;
    o.velocity.v = tfix * tv;
}

fn push_step(g: &mut Game, i: usize) {
    let o = &mut g.objects[i];
    o.motion_fraction.h += o.velocity.h;
    o.motion_fraction.v += o.velocity.v;

    let h = whole(o.motion_fraction.h);
    o.location.h = o.location.h.wrapping_sub(h as u32);
    o.motion_fraction.h -= Fixed::from_long(h);

    let v = whole(o.motion_fraction.v);
    o.location.v = o.location.v.wrapping_sub(v as u32);
    o.motion_fraction.v -= Fixed::from_long(v);

    o.absolute_bounds.offset(-h, -v);
}

/// Separate two overlapping space-occupying objects: share an impulse
/// inversely by mass along the separation axis, then step both until
/// their bounds no longer overlap.
fn correct_physical_space(g: &mut Game, a: usize, b: usize) {
    let (aa, ba) = (g.objects[a].attributes, g.objects[b].attributes);
    if aa & ba & attr::OCCUPIES_SPACE == 0 {
        return;
    }
    // The collision may have changed an owner (flag pods); same side
    // no longer pushes.
    if g.objects[a].owner == g.objects[b].owner {
        return;
    }

    let dvx = g.objects[b].velocity.h - g.objects[a].velocity.h;
    let dvy = g.objects[b].velocity.v - g.objects[a].velocity.v;
    let force = lsqrt_fixed((dvx * dvx) + (dvy * dvy));
    let ah = g.objects[a].location.dh(g.objects[b].location);
    let av = g.objects[a].location.dv(g.objects[b].location);

    let mass_of = |g: &Game, i: usize| {
        g.objects[i]
            .base
            .map(|bb| g.plug.base(bb).mass)
            .unwrap_or(Fixed::ZERO)
    };
    let total_mass = mass_of(g, a) + mass_of(g, b);
    let mut angle = ratio_to_angle(Fixed::from_val(ah), Fixed::from_val(av));
    adjust_velocity(g, a, angle, total_mass, force);
    add_angle(&mut angle, 180);
    adjust_velocity(g, b, angle, total_mass, force);

    let stopped = |o: &crate::obj::SpaceObject| {
        o.velocity.h == Fixed::ZERO && o.velocity.v == Fixed::ZERO
    };
    if stopped(&g.objects[a]) && stopped(&g.objects[b]) {
        return;
    }

    loop {
        let (ab, bb) = (g.objects[a].absolute_bounds, g.objects[b].absolute_bounds);
        if ab.right < bb.left || ab.left > bb.right || ab.bottom < bb.top || ab.top > bb.bottom {
            break;
        }
        push_step(g, a);
        push_step(g, b);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use antares_math::FixedPoint;

    #[test]
    fn whole_extraction_is_biased() {
        assert_eq!(whole(Fixed::from_float(1.25)), 1);
        assert_eq!(whole(Fixed::from_float(-1.25)), -1);
        assert_eq!(whole(Fixed::from_float(0.75)), 1);
        assert_eq!(whole(Fixed::from_float(-0.75)), 0);
        assert_eq!(whole(Fixed::ZERO), 0);
    }

    #[test]
    fn non_bouncing_object_dies_past_the_edge() {
        let mut g = testutil::bare_game();
        let drone = g.plug.base_named("drone").unwrap();
        let h = g.create_object(
            drone,
            None,
            Coord::new(THINKIVERSE_TOP_LEFT - 1, UNIVERSAL_CENTER),
            0,
            crate::handle::AdmHandle::NONE,
            0,
            None,
        );
        let i = h.index().unwrap();
        bounce(&mut g, i);
        assert_eq!(g.objects[i].active, Activity::ToBeFreed);
    }

    #[test]
    fn bouncing_object_reflects_at_the_wall() {
        let mut g = testutil::bare_game();
        let pod = g.plug.base_named("bouncer").unwrap();
        let h = g.create_object(
            pod,
            Some(FixedPoint::new(Fixed::from_long(-2), Fixed::ZERO)),
            Coord::new(THINKIVERSE_TOP_LEFT, UNIVERSAL_CENTER),
            0,
            crate::handle::AdmHandle::NONE,
            0,
            None,
        );
        let i = h.index().unwrap();
        g.objects[i].location.h = THINKIVERSE_TOP_LEFT - 5;
        let before = g.objects[i].velocity.h;
        bounce(&mut g, i);
        assert_eq!(g.objects[i].location.h, THINKIVERSE_TOP_LEFT);
        assert_eq!(g.objects[i].velocity.h, -before);
        assert_eq!(g.objects[i].active, Activity::InUse);
    }

    #[test]
    fn object_at_edge_minus_one_survives() {
        let mut g = testutil::bare_game();
        let drone = g.plug.base_named("drone").unwrap();
        let h = g.create_object(
            drone,
            None,
            Coord::new(THINKIVERSE_TOP_LEFT, UNIVERSAL_CENTER),
            0,
            crate::handle::AdmHandle::NONE,
            0,
            None,
        );
        let i = h.index().unwrap();
        bounce(&mut g, i);
        assert_eq!(g.objects[i].active, Activity::InUse);
    }

    #[test]
    fn motion_fraction_carries_between_ticks() {
        let mut g = testutil::bare_game();
        let drone = g.plug.base_named("drone").unwrap();
        let h = g.create_object(
            drone,
            Some(FixedPoint::new(Fixed::from_float(0.25), Fixed::ZERO)),
            testutil::center(),
            0,
            crate::handle::AdmHandle::NONE,
            0,
            None,
        );
        let i = h.index().unwrap();
        g.objects[i].thrust = Fixed::ZERO;
        let start = g.objects[i].location.h;
        for _ in 0..4 {
            move_one(&mut g, i);
        }
        // 4 ticks at 0.25/tick is one whole unit, subtracted.
        assert_eq!(g.objects[i].location.h, start.wrapping_sub(1));
    }
}
