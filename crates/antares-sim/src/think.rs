//! The per-object AI.
//!
//! Every thinking object gets one think slice per cycle. The slice runs
//! the presence state machine (normal, warp-in, warping, warp-out,
//! landing), which produces a synthetic keys-down word; the tail of the
//! slice turns those keys into turn velocity, thrust, weapon fire, and
//! warp transitions, exactly as a player's real keys would. Weapon
//! fire, damage resolution, and energy regeneration also live here.

use antares_data::object::{attr, runtime_flag, ENGAGE_RANGE, HIT_STATE_MAX};
use antares_data::usage;
use antares_math::{
    add_angle, angle_difference, angle_from_slope, evil_fixed_to_long, fix_ratio, lsqrt,
    rot_point, Coord, Fixed, Tag, Ticks,
};
use tracing::trace;

use crate::action::{exec, ActionRef, Hook};
use crate::admiral;
use crate::game::{Effect, Game};
use crate::handle::ObjHandle;
use crate::obj::{
    keys, Activity, Duty, Presence, SpaceObject, MAXIMUM_ANGLE_DISTANCE,
    MAXIMUM_RELEVANT_DISTANCE, MAXIMUM_RELEVANT_DISTANCE_SQUARED, NO_SHIP, TIME_TO_CHECK_HOME,
};

/// Heading error under which the AI will shoot.
const SHOOT_ANGLE: i32 = 15;
/// Offset used when fleeing.
const EVADE_ANGLE: i32 = 30;
/// A target looking at us within this error makes us paranoid.
const PARANOIA_ANGLE: i32 = 30;
/// Heading slop tolerated before re-aiming at a walk target.
const DIRECTION_ERROR: i32 = 5;
/// Distance (squared) beyond which the walk considers warping.
const WARP_IN_DISTANCE: u32 = 16_777_216;
/// Distance (squared) at which a landing object starts shrinking.
const LANDING_DISTANCE: u32 = 1000;
/// Distance hysteresis for the approach/back-off shuffle.
const MOTION_MARGIN: u32 = 5000;

/// Think slices between recharge steps.
const RECHARGE_SPEED: i32 = 12;
/// Energy per point of repaired health.
const HEALTH_RATIO: i32 = 5;
/// Energy per point of weapon recharge.
const WEAPON_RATIO: i32 = 2;
/// Battery drawn per recharge step.
const ENERGY_CHUNK: i32 = HEALTH_RATIO + WEAPON_RATIO * 3;
/// Warp-in charges energy >> this.
pub const WARP_IN_ENERGY_FACTOR: u32 = 3;

// ---------------------------------------------------------------------------
// The think pass
// ---------------------------------------------------------------------------

/// One think slice for every live object, in global-list order.
pub fn nonplayer_ship_think(g: &mut Game) {
    // Seed the running desync checksum from the global stream.
    g.sync = g.random.seed as u32;
    let sick_phase = (((g.time.since_epoch().count() / 9) & 3) + 1) as u8;

    for adm in &mut g.admirals {
        adm.ships_left = 0;
    }

    let mut h = g.root;
    while let Some(i) = h.index() {
        let next = g.objects[i].next_object;
        if !g.objects[i].is_active() {
            h = next;
            continue;
        }
        g.sync = g
            .sync
            .wrapping_add(g.objects[i].location.h)
            .wrapping_add(g.objects[i].location.v);

        // Strobe the radar dot of anything badly hurt.
        let max_health = g.objects[i].max_health(&g.plug);
        let hurt = g.objects[i].health > 0 && g.objects[i].health <= (max_health >> 2);
        let sprite_h = g.objects[i].sprite;
        if let Some(s) = g.sprites.get_mut(sprite_h) {
            s.tiny_dim = if hurt { sick_phase } else { 0 };
        }

        if g.objects[i].attributes & (attr::CAN_THINK | attr::REMOTE_OR_HUMAN) != 0 {
            think_one(g, i);
        }
        h = next;
    }
}

fn think_one(g: &mut Game, i: usize) {
    let plug = g.plug.clone();
    let this = ObjHandle(i as i32);

    {
        let o = &mut g.objects[i];
        o.target_angle = o.direction;
        o.direction_goal = o.direction;
        if let Some(a) = o.owner.index() {
            g.admirals[a].ships_left += 1;
        }
    }

    let mut keys_down = match g.objects[i].presence {
        Presence::Normal => think_normal(g, i),
        Presence::Warping(_) => think_warping(g, i),
        Presence::WarpIn { .. } => think_warp_in(g, i),
        Presence::WarpOut(_) => think_warp_out(g, i),
        Presence::Landing { .. } => think_landing(g, i),
    };

    let oa = g.objects[i].attributes;
    let computer_controls = oa & attr::REMOTE_OR_HUMAN == 0 || oa & attr::ON_AUTO_PILOT != 0;
    if computer_controls {
        if oa & attr::HAS_DIRECTION_GOAL != 0 {
            // Guided projectiles drop targets outside the tracking cone.
            if oa & attr::SHAPE_FROM_DIRECTION != 0
                && oa & attr::IS_GUIDED != 0
                && g.objects[i].target.is_some()
            {
                let o = &mut g.objects[i];
                let difference = o.target_angle - o.direction;
                if !(-60..=60).contains(&difference) {
                    o.target = ObjHandle::NONE;
                    o.target_id = NO_SHIP;
                    o.direction_goal = o.direction;
                }
            }

            let turn_rate = g.objects[i].turn_rate();
            let o = &g.objects[i];
            let offset_h = angle_difference(o.direction_goal, o.direction);
            let offset_v = evil_fixed_to_long(turn_rate << 1);
            if offset_h.abs() > offset_v {
                if offset_h < 0 {
                    keys_down |= keys::RIGHT;
                } else if offset_h > 0 {
                    keys_down |= keys::LEFT;
                }
            }
        }

        if g.objects[i].keys_down & keys::MANUAL_OVERRIDE == 0 {
            if g.objects[i].closest_distance < ENGAGE_RANGE {
                // Simulate battle inaccuracy: adopt new keys only
                // sometimes, so ships do not wiggle perfectly.
                let (skill_num, skill_den) = g.objects[i]
                    .base
                    .map(|b| {
                        let base = plug.base(b);
                        (i32::from(base.skill_num), i32::from(base.skill_den))
                    })
                    .unwrap_or((1, 1));
                let o = &mut g.objects[i];
                if o.rand(skill_den, Tag(*b"np99")) < skill_num {
                    o.keys_down &= !keys::MOTION_MASK;
                    o.keys_down |= keys_down & keys::MOTION_MASK;
                }
                if o.rand(3, Tag(*b"np13")) == 1 {
                    o.keys_down &= !keys::WEAPON_MASK;
                    o.keys_down |= keys_down & keys::WEAPON_MASK;
                }
                o.keys_down &= !keys::MISC_MASK;
                o.keys_down |= keys_down & keys::MISC_MASK;
            } else {
                let o = &mut g.objects[i];
                o.keys_down = (o.keys_down & keys::SPECIAL_MASK) | keys_down;
            }
        } else {
            g.objects[i].keys_down &= !keys::MANUAL_OVERRIDE;
        }
    }

    // Special keys.
    if g.objects[i].keys_down & keys::ADOPT_TARGET != 0 {
        admiral::set_object_destination(g, this);
    }
    if g.objects[i].keys_down & keys::AUTOPILOT != 0 {
        g.objects[i].attributes ^= attr::ON_AUTO_PILOT;
    }
    g.objects[i].keys_down &= !keys::SPECIAL_MASK;

    // Offline systems drop keys at random.
    if g.objects[i].offline_time > 0 {
        let o = &mut g.objects[i];
        let offline = o.offline_time;
        if o.rand(offline, Tag(*b"np14")) > 5 {
            o.keys_down = 0;
        }
        o.offline_time -= 1;
    }

    // A drifting body about to expire finds a new hull or concedes.
    let oa = g.objects[i].attributes;
    if oa & attr::REMOTE_OR_HUMAN != 0
        && oa & attr::CAN_THINK == 0
        && g.objects[i].expires
        && g.objects[i].expire_after < Ticks(120)
    {
        g.player_ship_body_expire(this);
    }

    // Keys to turn.
    let turn_rate = g.objects[i].turn_rate();
    {
        let o = &mut g.objects[i];
        if o.attributes & attr::HAS_DIRECTION_GOAL != 0 && o.offline_time <= 0 {
            if o.keys_down & keys::LEFT != 0 {
                o.turn_velocity = -turn_rate;
            } else if o.keys_down & keys::RIGHT != 0 {
                o.turn_velocity = turn_rate;
            } else {
                o.turn_velocity = Fixed::ZERO;
            }
        }
    }

    // Keys to thrust.
    let max_thrust = g.objects[i].max_thrust;
    {
        let o = &mut g.objects[i];
        let in_warp_presence = matches!(
            o.presence,
            Presence::WarpIn { .. } | Presence::Warping(_) | Presence::WarpOut(_)
        );
        if o.keys_down & keys::UP != 0 {
            if !in_warp_presence {
                o.thrust = max_thrust;
            }
        } else if o.keys_down & keys::DOWN != 0 {
            o.thrust = -max_thrust;
        } else {
            o.thrust = Fixed::ZERO;
        }
    }

    recharge(g, i);
    fire_from_keys(g, i);
    warp_from_keys(g, i);
}

/// Battery-to-energy, energy-to-health, and ammo restock, every
/// `RECHARGE_SPEED` think slices.
fn recharge(g: &mut Game, i: usize) {
    let plug = g.plug.clone();
    if g.objects[i].recharge_time < RECHARGE_SPEED {
        g.objects[i].recharge_time += 1;
        return;
    }
    g.objects[i].recharge_time = 0;

    if matches!(g.objects[i].presence, Presence::Warping(_)) {
        let o = &mut g.objects[i];
        o.energy -= 1;
        o.warp_energy_collected += 1;
        if o.energy <= 0 {
            o.energy = 0;
        }
    }

    if g.objects[i].presence != Presence::Normal {
        return;
    }

    let max_energy = g.objects[i].max_energy(&plug);
    let max_health = g.objects[i].max_health(&plug);
    {
        let o = &mut g.objects[i];
        if o.energy < max_energy - ENERGY_CHUNK && o.battery > ENERGY_CHUNK {
            o.battery -= ENERGY_CHUNK;
            o.energy += ENERGY_CHUNK;
        }
        if o.health < (max_health >> 1) && o.energy > HEALTH_RATIO {
            o.health += 1;
            o.energy -= HEALTH_RATIO;
        }
    }

    for which in 0..3 {
        let weapon = *weapon_state(&g.objects[i], which);
        let Some(wbase) = weapon.base else { continue };
        let device = &plug.base(wbase).device;
        if device.ammo <= 0 {
            continue;
        }
        let o = &mut g.objects[i];
        if weapon.ammo < (device.ammo >> 1) && o.energy >= WEAPON_RATIO {
            let w = weapon_state_mut(o, which);
            w.charge += 1;
            o.energy -= WEAPON_RATIO;
            let w = weapon_state_mut(o, which);
            if device.restock_cost >= 0 && w.charge >= device.restock_cost {
                w.charge -= device.restock_cost;
                w.ammo += 1;
            }
        }
    }
}

fn weapon_state(o: &SpaceObject, which: usize) -> &crate::obj::WeaponState {
    match which {
        0 => &o.pulse,
        1 => &o.beam,
        _ => &o.special,
    }
}

fn weapon_state_mut(o: &mut SpaceObject, which: usize) -> &mut crate::obj::WeaponState {
    match which {
        0 => &mut o.pulse,
        1 => &mut o.beam,
        _ => &mut o.special,
    }
}

/// Fire whichever weapons the keys ask for and cooldowns allow.
fn fire_from_keys(g: &mut Game, i: usize) {
    let target = g.objects[i].target;
    for (which, key) in [(0, keys::PULSE), (1, keys::BEAM), (2, keys::SPECIAL)] {
        let ready = {
            let o = &g.objects[i];
            let w = weapon_state(o, which);
            w.base.is_some() && w.time <= g.time && o.keys_down & key != 0
        };
        if ready {
            fire_weapon(g, ObjHandle(i as i32), target, which);
        }
    }
}

/// Fire one weapon slot: spend energy and ammo, advance the mount
/// cursor, and run the device's activate actions at the mount offset.
///
/// Cooldown is the caller's concern; scripted activations bypass it.
pub fn fire_weapon(g: &mut Game, subject: ObjHandle, target: ObjHandle, which: usize) {
    let plug = g.plug.clone();
    let Some(si) = subject.index() else { return };
    let Some(wbase) = weapon_state(&g.objects[si], which).base else {
        return;
    };
    let device = &plug.base(wbase).device;

    {
        let o = &g.objects[si];
        let w = weapon_state(o, which);
        if o.energy < device.energy_cost || (device.ammo > 0 && w.ammo <= 0) {
            return;
        }
    }

    // Firing a visible weapon breaks cloak; the special does not.
    if which != 2 && g.objects[si].cloak_state > 0 {
        g.set_cloak(subject, false);
    }

    let positions = g.objects[si]
        .base
        .and_then(|b| plug.base(b).weapon(which).map(|w| w.positions.clone()))
        .unwrap_or_default();

    let offset = {
        let o = &mut g.objects[si];
        o.energy -= device.energy_cost;
        let w = weapon_state_mut(o, which);
        w.position += 1;
        if w.position >= positions.len().max(1) {
            w.position = 0;
        }
        let cursor = w.position;
        w.time = g.time + device.fire_time;
        if device.ammo > 0 {
            w.ammo -= 1;
        }

        positions.get(cursor).map(|mount| {
            let mut angle = o.direction;
            add_angle(&mut angle, -90);
            let (mut fcos, mut fsin) = rot_point(angle);
            fcos = -fcos;
            fsin = -fsin;
            antares_math::Point::new(
                evil_fixed_to_long((mount.h * fcos) - (mount.v * fsin)),
                evil_fixed_to_long((mount.h * fsin) + (mount.v * fcos)),
            )
        })
    };

    trace!(subject = subject.0, weapon = which, "fire");
    exec(
        g,
        ActionRef::Base(wbase, Hook::Activate),
        0,
        subject,
        target,
        offset,
    );
}

/// Warp-key transitions shared by player and computer ships.
fn warp_from_keys(g: &mut Game, i: usize) {
    let plug = g.plug.clone();
    let Some(base_id) = g.objects[i].base else {
        return;
    };
    let base = plug.base(base_id);
    let o = &mut g.objects[i];
    let warp_capable = base.warp_speed > Fixed::ZERO;

    if o.keys_down & keys::WARP != 0 && warp_capable && o.energy > 0 {
        match o.presence {
            Presence::Warping(factor) | Presence::WarpOut(factor) => {
                o.thrust = o.max_thrust * factor;
            }
            Presence::Normal => {
                if o.energy > (base.energy >> WARP_IN_ENERGY_FACTOR) {
                    o.presence = Presence::WarpIn {
                        progress: 0,
                        flares: 0,
                    };
                }
            }
            _ => {}
        }
    } else {
        match o.presence {
            Presence::WarpIn { .. } => o.presence = Presence::Normal,
            Presence::Warping(speed) => o.presence = Presence::WarpOut(speed),
            Presence::WarpOut(factor) => {
                o.thrust = o.max_thrust * factor;
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Coordinate helpers
// ---------------------------------------------------------------------------

/// Squared distance to a point, clamped at the relevance limit.
fn coord_distance(o: &SpaceObject, dest: Coord) -> u32 {
    let dcalc = o.location.dh(dest).unsigned_abs();
    let dist = o.location.dv(dest).unsigned_abs();
    if dist == 0 && dcalc == 0 {
        return 0;
    }
    if dcalc > MAXIMUM_RELEVANT_DISTANCE || dist > MAXIMUM_RELEVANT_DISTANCE {
        MAXIMUM_RELEVANT_DISTANCE_SQUARED
    } else {
        dist * dist + dcalc * dcalc
    }
}

/// Squared distance and heading to a point.
///
/// Distances beyond the reduced-precision threshold drop the low four
/// bits before the slope lookup, exactly as the original's 16-bit path
/// did.
fn coord_vector(o: &SpaceObject, dest: Coord) -> (u32, i32) {
    let dcalc = o.location.dh(dest).unsigned_abs();
    let vdist = o.location.dv(dest).unsigned_abs();
    if vdist == 0 && dcalc == 0 {
        return (0, o.direction);
    }

    let mut angle;
    let distance;
    if dcalc > MAXIMUM_ANGLE_DISTANCE || vdist > MAXIMUM_ANGLE_DISTANCE {
        distance = if dcalc > MAXIMUM_RELEVANT_DISTANCE || vdist > MAXIMUM_RELEVANT_DISTANCE {
            MAXIMUM_RELEVANT_DISTANCE_SQUARED
        } else {
            vdist * vdist + dcalc * dcalc
        };
        let shortx = ((dest.dh(o.location)) >> 4) as i16;
        let shorty = ((dest.dv(o.location)) >> 4) as i16;
        angle = angle_from_slope(fix_ratio(shortx, shorty));
        if shortx > 0 {
            add_angle(&mut angle, 180);
        } else if shortx == 0 && shorty > 0 {
            angle = 0;
        }
    } else {
        distance = vdist * vdist + dcalc * dcalc;
        let dh = dest.dh(o.location) as i16;
        let dv = dest.dv(o.location) as i16;
        angle = angle_from_slope(fix_ratio(dh, dv));
        if dest.h < o.location.h {
            add_angle(&mut angle, 180);
        } else if o.location.h == dest.h && dest.v < o.location.v {
            angle = 0;
        }
    }
    (distance, angle)
}

// ---------------------------------------------------------------------------
// Target and destination resolution
// ---------------------------------------------------------------------------

struct ResolvedTarget {
    dest: Coord,
    distance: u32,
    target: ObjHandle,
}

/// Refresh the object's target: drop anything stale or unsuitable and
/// promote the closest object where possible.
fn resolve_target(g: &mut Game, i: usize) -> ResolvedTarget {
    let this_loc = g.objects[i].location;

    let cancel = |o: &mut SpaceObject| ResolvedTarget {
        dest: o.location,
        distance: o.engage_range,
        target: ObjHandle::NONE,
    };

    // With no target, try to adopt the closest object.
    if g.objects[i].target.is_none() {
        let closest = g.objects[i].closest_object;
        let suitable = g
            .obj(closest)
            .map(|c| c.attributes & attr::POTENTIAL_TARGET != 0)
            .unwrap_or(false);
        if suitable {
            let closest_id = g.obj(closest).map(|c| c.id).unwrap_or(NO_SHIP);
            let o = &mut g.objects[i];
            if o.attributes & attr::HAS_DIRECTION_GOAL != 0 {
                o.direction_goal = o.direction;
            }
            o.target = closest;
            o.target_id = closest_id;
        } else {
            let o = &mut g.objects[i];
            o.target = ObjHandle::NONE;
            o.target_id = NO_SHIP;
            return cancel(o);
        }
    }

    // Validate the target we now hold.
    let target = g.objects[i].target;
    let target_ok = match g.obj(target) {
        Some(t) => {
            t.active == Activity::InUse
                && t.id == g.objects[i].target_id
                && !(t.owner == g.objects[i].owner && t.attributes & attr::HATED != 0)
                && (t.attributes & attr::POTENTIAL_TARGET != 0
                    || t.attributes & attr::HATED != 0)
        }
        None => false,
    };

    let target = if target_ok {
        target
    } else {
        // Fall back to the closest object, or give up.
        let closest = g.objects[i].closest_object;
        match g.obj(closest) {
            Some(c) if c.attributes & attr::POTENTIAL_TARGET != 0 => {
                let id = c.id;
                let o = &mut g.objects[i];
                o.target = closest;
                o.target_id = id;
                closest
            }
            _ => {
                let o = &mut g.objects[i];
                o.target = ObjHandle::NONE;
                o.target_id = NO_SHIP;
                return cancel(o);
            }
        }
    };

    let mut dest = match g.obj(target) {
        Some(t) => t.location,
        None => {
            let o = &mut g.objects[i];
            o.target = ObjHandle::NONE;
            o.target_id = NO_SHIP;
            return cancel(o);
        }
    };

    // Prefer the closest object over a distant target unless guided.
    let closest = g.objects[i].closest_object;
    let closest_valid = g
        .obj(closest)
        .map(|c| c.attributes & attr::POTENTIAL_TARGET != 0)
        .unwrap_or(false);
    let oa = g.objects[i].attributes;
    if closest.is_some()
        && target != closest
        && oa & attr::IS_GUIDED == 0
        && closest_valid
    {
        let mut distance = coord_distance(&g.objects[i], dest);
        if (distance >> 1) > g.objects[i].closest_distance
            || oa & attr::CAN_ENGAGE == 0
            || oa & attr::REMOTE_OR_HUMAN != 0
        {
            let (cid, cloc, ccloak) = {
                let c = g.obj(closest).map(|c| (c.id, c.location, c.cloak_state));
                match c {
                    Some(v) => v,
                    None => (NO_SHIP, this_loc, 0),
                }
            };
            let o = &mut g.objects[i];
            o.target = closest;
            o.target_id = cid;
            dest = cloc;
            distance = o.closest_distance;
            if ccloak > 250 {
                dest.h = dest.h.wrapping_sub(200);
                dest.v = dest.v.wrapping_sub(200);
            }
            return ResolvedTarget {
                dest,
                distance,
                target: closest,
            };
        }
        ResolvedTarget {
            dest,
            distance,
            target,
        }
    } else {
        ResolvedTarget {
            dest,
            distance: g.objects[i].closest_distance,
            target,
        }
    }
}

/// Resolve the destination walk: refresh the cached coordinate, follow
/// the chain when the referent died, and clear everything when nothing
/// remains. Returns (dest, resolved target handle, press-down).
fn walk_destination(g: &mut Game, i: usize) -> (Coord, ObjHandle, bool) {
    let oa = g.objects[i].attributes;
    let this_loc = g.objects[i].location;

    if oa & attr::IS_DESTINATION != 0
        || (g.objects[i].dest_object.is_none() && g.objects[i].destination_location.h == 0)
    {
        if oa & attr::ON_AUTO_PILOT != 0 {
            g.objects[i].attributes ^= attr::ON_AUTO_PILOT;
        }
        g.objects[i].time_from_origin = Ticks::ZERO;
        return (this_loc, ObjHandle::NONE, true);
    }

    if g.objects[i].dest_object.is_some() {
        let dest_h = g.objects[i].dest_object;
        let dest_id = g.objects[i].dest_object_id;
        let valid = g.obj_checked(dest_h, dest_id).map(|t| {
            (
                t.seen_by_player_flags,
                t.location,
                t.dest_object,
                t.dest_object_id,
            )
        });
        match valid {
            Some((seen, loc, tdest, tdest_id)) => {
                let o = &mut g.objects[i];
                let dest = if seen & o.my_player_flag != 0 {
                    o.destination_location = loc;
                    loc
                } else {
                    o.destination_location
                };
                o.dest_object_dest = tdest;
                o.dest_object_dest_id = tdest_id;
                (dest, dest_h, false)
            }
            None => {
                // The referent is gone; promote its own destination or
                // give up.
                let o = &mut g.objects[i];
                o.duty = Duty::None;
                o.attributes &= !attr::STATIC_DESTINATION;
                let promoted = o.dest_object_dest;
                let promoted_id = o.dest_object_dest_id;
                if g.obj(dest_h).is_none() || promoted.is_none() {
                    let o = &mut g.objects[i];
                    o.dest_object = ObjHandle::NONE;
                    o.dest_object_id = NO_SHIP;
                    o.dest_object_dest = ObjHandle::NONE;
                    if oa & attr::ON_AUTO_PILOT != 0 {
                        g.objects[i].attributes ^= attr::ON_AUTO_PILOT;
                    }
                    (this_loc, ObjHandle::NONE, true)
                } else {
                    match g.obj_checked(promoted, promoted_id).map(|t| {
                        (t.id, t.location, t.dest_object, t.dest_object_id)
                    }) {
                        Some((tid, tloc, tdest, tdest_id)) => {
                            let o = &mut g.objects[i];
                            o.dest_object = promoted;
                            o.dest_object_id = tid;
                            o.dest_object_dest = tdest;
                            o.dest_object_dest_id = tdest_id;
                            (tloc, promoted, false)
                        }
                        None => {
                            let o = &mut g.objects[i];
                            o.duty = Duty::None;
                            o.dest_object = ObjHandle::NONE;
                            o.dest_object_id = NO_SHIP;
                            o.dest_object_dest = ObjHandle::NONE;
                            if oa & attr::ON_AUTO_PILOT != 0 {
                                g.objects[i].attributes ^= attr::ON_AUTO_PILOT;
                            }
                            (this_loc, ObjHandle::NONE, true)
                        }
                    }
                }
            }
        }
    } else {
        // Destination is a bare coordinate.
        if oa & attr::ON_AUTO_PILOT != 0 {
            g.objects[i].attributes ^= attr::ON_AUTO_PILOT;
        }
        (g.objects[i].destination_location, ObjHandle::NONE, false)
    }
}

// ---------------------------------------------------------------------------
// Engagement
// ---------------------------------------------------------------------------

/// Aim at and possibly shoot the target. Returns (keys, theta), where
/// theta measures how squarely the target is facing us.
fn engage_target(g: &mut Game, i: usize, target: ObjHandle, distance: u32) -> (u32, i32) {
    let plug = g.plug.clone();
    let mut keys_down = 0u32;

    let (tloc, tcloak, tattr, tdirection) = match g.obj(target) {
        Some(t) => (t.location, t.cloak_state, t.attributes, t.direction),
        None => return (0, 0),
    };

    let mut dest = tloc;
    if tcloak > 250 {
        let o = &mut g.objects[i];
        dest.h = dest.h.wrapping_sub(70);
        dest.h = dest
            .h
            .wrapping_add(o.rand(140, Tag(*b"nps0")) as u32);
        dest.v = dest.v.wrapping_sub(70);
        dest.v = dest
            .v
            .wrapping_add(o.rand(140, Tag(*b"nps1")) as u32);
    }

    // In weapon range of something hated: clock time away from home.
    if distance < g.objects[i].longest_weapon_range as u32
        && tattr & attr::CAN_BE_ENGAGED != 0
        && tattr & attr::HATED != 0
        && g.objects[i].attributes & attr::CAN_ACCEPT_DESTINATION != 0
    {
        g.objects[i].time_from_origin += antares_math::MAJOR_TICK;
    }

    // Heading to the (possibly jittered) target.
    let o = &g.objects[i];
    let dh = dest.dh(o.location);
    let dv = dest.dv(o.location);
    let mut angle = angle_from_slope(fix_ratio((-dh) as i16, (-dv) as i16));
    if dest.h < o.location.h {
        add_angle(&mut angle, 180);
    } else if o.location.h == dest.h && dest.v < o.location.v {
        angle = 0;
    }

    if tcloak > 250 {
        angle -= 45;
        let o = &mut g.objects[i];
        let jitter = o.rand(90, Tag(*b"nps2"));
        add_angle(&mut angle, jitter);
    }
    g.objects[i].target_angle = angle;

    let theta;
    {
        let o = &mut g.objects[i];
        if o.attributes & attr::HAS_DIRECTION_GOAL != 0 {
            let t = angle_difference(angle, o.direction_goal);
            if t.abs() > DIRECTION_ERROR || o.attributes & attr::IS_GUIDED == 0 {
                o.direction_goal = angle;
            }
            let mut beta = tdirection;
            add_angle(&mut beta, 180);
            theta = angle_difference(beta, angle);
        } else {
            o.direction = angle;
            theta = 0;
        }
    }

    // Shoot whatever bears.
    if distance < g.objects[i].longest_weapon_range as u32 && tattr & attr::HATED != 0 {
        let o = &g.objects[i];
        let beta = angle_difference(o.direction, angle);
        for (which, key) in [(0u32, keys::PULSE), (1, keys::BEAM), (2, keys::SPECIAL)] {
            let w = weapon_state(o, which as usize);
            if let Some(wb) = w.base {
                let wbase = plug.base(wb);
                let auto_target = wbase.attributes & attr::AUTO_TARGET != 0;
                if wbase.device.usage & usage::ATTACKING != 0
                    && (beta.abs() <= SHOOT_ANGLE || auto_target)
                    && distance < wbase.device.range as u32
                {
                    keys_down |= key;
                }
            }
        }
    }

    (keys_down, theta)
}

/// Pick the longest-ranged attacking weapon that reaches `distance`.
fn best_weapon_lead(g: &Game, i: usize, distance: u32) -> Option<Fixed> {
    let plug = &g.plug;
    let o = &g.objects[i];
    let mut best: Option<Fixed> = None;
    let mut difference = o.longest_weapon_range;
    for which in 0..3 {
        let w = weapon_state(o, which);
        if let Some(wb) = w.base {
            let device = &plug.base(wb).device;
            if device.usage & usage::ATTACKING != 0
                && device.range as u32 >= distance
                && device.range < difference
            {
                best = Some(device.inverse_speed);
                difference = device.range;
            }
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Presence states
// ---------------------------------------------------------------------------

fn think_normal(g: &mut Game, i: usize) -> u32 {
    let plug = g.plug.clone();
    let mut keys_down = g.objects[i].keys_down & keys::SPECIAL_MASK;
    let oa = g.objects[i].attributes;
    let computer = oa & attr::REMOTE_OR_HUMAN == 0 || oa & attr::ON_AUTO_PILOT != 0;

    let resolved = resolve_target(g, i);
    let distance = resolved.distance;
    let target = resolved.target;

    if !computer {
        // Human pilot: only compute the target angle, with weapon lead.
        // A target at exactly engage range still engages.
        if oa & attr::CAN_ENGAGE != 0
            && distance <= g.objects[i].engage_range
            && g.objects[i].target.is_some()
        {
            let (tattr, tvel) = match g.obj(target) {
                Some(t) => (t.attributes, t.velocity),
                None => return keys_down,
            };
            let mut dest = resolved.dest;
            if distance < g.objects[i].longest_weapon_range as u32
                && tattr & attr::HATED != 0
            {
                if let Some(inverse_speed) = best_weapon_lead(g, i, distance) {
                    let dcalc = lsqrt(distance);
                    let o = &g.objects[i];
                    let fdist = inverse_speed * Fixed::from_long(dcalc as i32);
                    let calcv = (tvel.h - o.velocity.h) * fdist;
                    dest.h = dest.h.wrapping_sub(evil_fixed_to_long(calcv) as u32);
                    let calcv = (tvel.v - o.velocity.v) * fdist;
                    dest.v = dest.v.wrapping_sub(evil_fixed_to_long(calcv) as u32);
                }
            }

            let o = &g.objects[i];
            let dh = dest.dh(o.location);
            let dv = dest.dv(o.location);
            let mut angle = angle_from_slope(fix_ratio((-dh) as i16, (-dv) as i16));
            if dest.h < o.location.h {
                add_angle(&mut angle, 180);
            } else if o.location.h == dest.h && dest.v < o.location.v {
                angle = 0;
            }
            let tcloak = g.obj(target).map(|t| t.cloak_state).unwrap_or(0);
            if tcloak > 250 {
                angle -= 45;
                let o = &mut g.objects[i];
                let jitter = o.rand(90, Tag(*b"np12"));
                add_angle(&mut angle, jitter);
            }
            g.objects[i].target_angle = angle;
        }
        return keys_down;
    }

    // A target at exactly engage range still engages.
    let engaging = g.objects[i].target.is_some()
        && (oa & attr::IS_GUIDED != 0
            || (oa & attr::CAN_ENGAGE != 0
                && oa & attr::REMOTE_OR_HUMAN == 0
                && distance <= g.objects[i].engage_range
                && g.objects[i].time_from_origin < TIME_TO_CHECK_HOME
                && g.obj(target)
                    .map(|t| t.attributes & attr::CAN_BE_ENGAGED != 0)
                    .unwrap_or(false)));

    if engaging {
        let (engage_keys, theta) = engage_target(g, i, target, distance);
        keys_down |= engage_keys;

        let (tattr, tlwr, tdirection, thealth) = match g.obj(target) {
            Some(t) => (
                t.attributes,
                t.longest_weapon_range as u32,
                t.direction,
                t.health,
            ),
            None => (0, 0, 0, 0),
        };

        let afraid = oa & attr::CAN_EVADE != 0
            && tattr & attr::CAN_BE_EVADED != 0
            && distance < tlwr
            && tattr & attr::HATED != 0
            && theta.abs() < PARANOIA_ANGLE
            && (tattr & attr::CAN_BE_ENGAGED == 0
                || g.objects[i].health <= thealth);

        if afraid {
            keys_down |= defense_weapon_keys(g, i);
            if oa & attr::HAS_DIRECTION_GOAL != 0 {
                let o = &mut g.objects[i];
                o.direction_goal = tdirection;
                let evade = if tattr & attr::IS_GUIDED != 0 { 90 } else { EVADE_ANGLE };
                if theta > 0 {
                    add_angle(&mut o.direction_goal, evade);
                } else if theta < 0 {
                    add_angle(&mut o.direction_goal, -evade);
                } else {
                    // Deterministic side pick from the position's low bit.
                    let beta = if o.location.h & 1 != 0 { -evade } else { evade };
                    add_angle(&mut o.direction_goal, beta);
                }
                keys_down |= keys::UP;
            } else {
                let o = &mut g.objects[i];
                let beta = if o.rand(2, Tag(*b"nps6")) != 0 {
                    -EVADE_ANGLE
                } else {
                    EVADE_ANGLE
                };
                add_angle(&mut o.direction, beta);
                keys_down |= keys::UP;
            }
        } else {
            // Not afraid: approach to the shortest weapon range, then
            // shuffle to hold distance.
            let o = &mut g.objects[i];
            if distance > o.shortest_weapon_range as u32 || oa & attr::IS_GUIDED != 0 {
                keys_down |= keys::UP;
            } else if distance < MOTION_MARGIN
                || distance + MOTION_MARGIN < o.last_target_distance
            {
                keys_down |= keys::DOWN;
                o.last_target_distance = distance;
            } else if distance - MOTION_MARGIN > o.last_target_distance {
                keys_down |= keys::UP;
                o.last_target_distance = distance;
            }
        }

        // Arrival at a destination that is also the target.
        if g.objects[i].target == g.objects[i].dest_object {
            maybe_arrive(g, i, distance);
        }
    } else if oa & attr::IS_GUIDED != 0 {
        keys_down |= keys::UP;
    } else {
        // No engageable target: evade stray fire, then walk to the
        // destination.
        if g.objects[i].target.is_some()
            && (oa & attr::REMOTE_OR_HUMAN == 0 && distance <= g.objects[i].engage_range)
        {
            let (engage_keys, theta) = engage_target(g, i, target, distance);
            keys_down |= engage_keys;

            let (tattr, tlwr) = match g.obj(target) {
                Some(t) => (t.attributes, t.longest_weapon_range as u32),
                None => (0, 0),
            };
            let can_fight = tattr & attr::CAN_BE_ENGAGED != 0
                && oa & attr::CAN_ENGAGE != 0
                && distance < g.objects[i].longest_weapon_range as u32
                && tattr & attr::HATED != 0;
            let must_flee = !can_fight
                && oa & attr::CAN_EVADE != 0
                && tattr & attr::HATED != 0
                && tattr & attr::CAN_BE_EVADED != 0
                && ((distance < tlwr && theta.abs() < PARANOIA_ANGLE)
                    || tattr & attr::IS_GUIDED != 0);
            if must_flee {
                if distance < g.objects[i].longest_weapon_range as u32 {
                    keys_down |= defense_weapon_keys(g, i);
                }
                let tdirection = g.obj(target).map(|t| t.direction).unwrap_or(0);
                if oa & attr::HAS_DIRECTION_GOAL != 0 {
                    let o = &mut g.objects[i];
                    o.direction_goal = tdirection;
                    if theta > 0 {
                        add_angle(&mut o.direction_goal, EVADE_ANGLE);
                    } else if theta < 0 {
                        add_angle(&mut o.direction_goal, -EVADE_ANGLE);
                    } else {
                        let beta = if o.location.h & 1 != 0 {
                            -EVADE_ANGLE
                        } else {
                            EVADE_ANGLE
                        };
                        add_angle(&mut o.direction_goal, beta);
                    }
                    keys_down |= keys::UP;
                } else {
                    let o = &mut g.objects[i];
                    let beta = if o.rand(2, Tag(*b"np11")) != 0 {
                        -EVADE_ANGLE
                    } else {
                        EVADE_ANGLE
                    };
                    add_angle(&mut o.direction, beta);
                    keys_down |= keys::UP;
                }
            }
        }

        // Walk to the destination.
        let (dest, walk_target, press_down) = walk_destination(g, i);
        if press_down {
            keys_down |= keys::DOWN;
            return keys_down;
        }

        let (walk_distance, angle) = coord_vector(&g.objects[i], dest);
        let theta = {
            let o = &mut g.objects[i];
            if o.attributes & attr::HAS_DIRECTION_GOAL != 0 {
                let t = angle_difference(angle, o.direction_goal);
                if t.abs() > DIRECTION_ERROR {
                    o.direction_goal = angle;
                }
                angle_difference(o.direction, o.direction_goal).abs()
            } else {
                o.direction = angle;
                0
            }
        };

        if walk_distance < ENGAGE_RANGE {
            g.objects[i].time_from_origin = Ticks::ZERO;
        }

        let arrive_distance = g.objects[i]
            .base
            .map(|b| plug.base(b).arrive_action_distance)
            .unwrap_or(0);

        if walk_distance > arrive_distance {
            if theta < EVADE_ANGLE {
                keys_down |= keys::UP;
            }
            g.objects[i].last_target_distance = walk_distance;

            // Long haul: transport special or warp.
            let o = &g.objects[i];
            if o.special.base.is_some()
                && walk_distance > WARP_IN_DISTANCE
                && theta <= DIRECTION_ERROR
            {
                if let Some(wb) = o.special.base {
                    if plug.base(wb).device.usage & usage::TRANSPORTATION != 0 {
                        keys_down |= keys::SPECIAL;
                    }
                }
            }
            let base = g.objects[i].base.map(|b| plug.base(b));
            if let Some(base) = base {
                let o = &g.objects[i];
                if base.warp_speed > Fixed::ZERO
                    && o.energy > (base.energy >> WARP_IN_ENERGY_FACTOR)
                    && walk_distance > WARP_IN_DISTANCE
                    && theta <= DIRECTION_ERROR
                {
                    keys_down |= keys::WARP;
                }
            }
        } else {
            // Near the destination: fall in with a friendly escortee.
            let escortee = g.obj(walk_target).map(|t| {
                (
                    t.owner,
                    t.attributes,
                    t.direction,
                    t.keys_down,
                )
            });
            if let Some((towner, tattr, tdirection, tkeys)) = escortee {
                let o = &g.objects[i];
                if towner == o.owner
                    && tattr & o.attributes & attr::HAS_DIRECTION_GOAL != 0
                {
                    g.objects[i].direction_goal = tdirection;
                    let base = g.objects[i].base.map(|b| plug.base(b));
                    if tkeys & keys::WARP != 0
                        && base.map(|b| b.warp_speed > Fixed::ZERO).unwrap_or(false)
                    {
                        let o = &g.objects[i];
                        let t = angle_difference(o.direction, tdirection);
                        if t.abs() < DIRECTION_ERROR {
                            keys_down |= keys::WARP;
                        }
                    }
                }
            }

            maybe_arrive(g, i, walk_distance);

            // Hold position by shuffling against the last distance.
            let o = &mut g.objects[i];
            if walk_distance + MOTION_MARGIN < o.last_target_distance {
                keys_down |= keys::DOWN;
                o.last_target_distance = walk_distance;
            } else if walk_distance > MOTION_MARGIN + o.last_target_distance {
                if theta < EVADE_ANGLE {
                    keys_down |= keys::UP;
                } else {
                    keys_down |= keys::DOWN;
                }
                o.last_target_distance = walk_distance;
            }
        }
    }

    keys_down
}

/// Press the key of every defense-usage weapon.
fn defense_weapon_keys(g: &Game, i: usize) -> u32 {
    let plug = &g.plug;
    let o = &g.objects[i];
    let mut keys_down = 0;
    for (which, key) in [(0usize, keys::PULSE), (1, keys::BEAM), (2, keys::SPECIAL)] {
        if let Some(wb) = weapon_state(o, which).base {
            if plug.base(wb).device.usage & usage::DEFENSE != 0 {
                keys_down |= key;
            }
        }
    }
    keys_down
}

/// Fire the arrive hook once when inside the template's arrival
/// distance.
fn maybe_arrive(g: &mut Game, i: usize, distance: u32) {
    let plug = g.plug.clone();
    let Some(base_id) = g.objects[i].base else { return };
    let base = plug.base(base_id);
    if distance >= base.arrive_action_distance || base.arrive.is_empty() {
        return;
    }
    if g.objects[i].runtime_flags & runtime_flag::HAS_ARRIVED != 0 {
        return;
    }
    let subject = ObjHandle(i as i32);
    let direct = g.objects[i].dest_object;
    exec(
        g,
        ActionRef::Base(base_id, Hook::Arrive),
        0,
        subject,
        direct,
        None,
    );
    g.objects[i].runtime_flags |= runtime_flag::HAS_ARRIVED;
}

fn think_warp_in(g: &mut Game, i: usize) -> u32 {
    let plug = g.plug.clone();
    let this = ObjHandle(i as i32);
    let oa = g.objects[i].attributes;
    let mut keys_down = g.objects[i].keys_down & keys::SPECIAL_MASK;
    if oa & attr::REMOTE_OR_HUMAN == 0 || oa & attr::ON_AUTO_PILOT != 0 {
        keys_down = keys::WARP;
    }

    let Presence::WarpIn { progress, flares } = g.objects[i].presence else {
        return keys_down;
    };
    let progress = progress + antares_math::DECIDE_EVERY_CYCLES as i32;
    let mut flares = flares;

    // Four escalating cues at 0/25/50/75.
    for (stage, threshold) in [(0u8, 0i32), (1, 25), (2, 50), (3, 75)] {
        if flares & (1 << stage) == 0 && progress > threshold {
            flares |= 1 << stage;
            g.effects.push(Effect::WarpSound { stage, at: this });
        }
    }
    g.objects[i].presence = Presence::WarpIn { progress, flares };

    if progress > 100 {
        let base = match g.objects[i].base {
            Some(b) => plug.base(b),
            None => return keys_down,
        };
        let charge = base.energy >> WARP_IN_ENERGY_FACTOR;
        let o = &mut g.objects[i];
        o.energy -= charge;
        o.warp_energy_collected += charge;
        if o.energy <= 0 {
            o.presence = Presence::Normal;
            o.energy = 0;
        } else {
            o.presence = Presence::Warping(base.warp_speed);
            o.attributes &= !attr::OCCUPIES_SPACE;
            let (location, direction) = (o.location, o.direction);
            let flare = plug.blessed.warp_in_flare;
            g.create_object(
                flare,
                None,
                location,
                direction,
                crate::handle::AdmHandle::NONE,
                0,
                None,
            );
        }
    }
    keys_down
}

fn think_warping(g: &mut Game, i: usize) -> u32 {
    let mut keys_down = g.objects[i].keys_down & keys::SPECIAL_MASK;

    if g.objects[i].energy <= 0 {
        let speed = match g.objects[i].presence {
            Presence::Warping(s) => s,
            _ => Fixed::ZERO,
        };
        g.objects[i].presence = Presence::WarpOut(speed);
    }

    let oa = g.objects[i].attributes;
    if oa & attr::REMOTE_OR_HUMAN != 0 && oa & attr::ON_AUTO_PILOT == 0 {
        return keys_down;
    }

    let (dest, walk_target, _press_down) = walk_destination(g, i);
    let (distance, angle) = coord_vector(&g.objects[i], dest);

    {
        let o = &mut g.objects[i];
        if o.attributes & attr::HAS_DIRECTION_GOAL != 0 {
            let t = angle_difference(angle, o.direction_goal);
            if t.abs() > DIRECTION_ERROR {
                o.direction_goal = angle;
            }
        } else {
            o.direction = angle;
        }
    }

    let warp_out_distance = g.objects[i]
        .base
        .map(|b| g.plug.base(b).warp_out_distance)
        .unwrap_or(0);
    if distance < warp_out_distance {
        // Close enough; only follow a target that is itself in warp.
        if let Some(t) = g.obj(walk_target) {
            if matches!(t.presence, Presence::WarpIn { .. } | Presence::Warping(_)) {
                keys_down |= keys::WARP;
            }
        }
    } else {
        keys_down |= keys::WARP;
    }
    keys_down
}

fn think_warp_out(g: &mut Game, i: usize) -> u32 {
    let plug = g.plug.clone();
    let keys_down = g.objects[i].keys_down & keys::SPECIAL_MASK;
    let this = ObjHandle(i as i32);

    let Presence::WarpOut(speed) = g.objects[i].presence else {
        return keys_down;
    };
    let speed = speed - Fixed::from_long(antares_data::WARP_ACCELERATION);
    g.objects[i].presence = Presence::WarpOut(speed);

    if speed < g.objects[i].max_velocity {
        g.refund_warp_energy(this);

        let base_attributes = g.objects[i]
            .base
            .map(|b| plug.base(b).attributes)
            .unwrap_or(0);
        let o = &mut g.objects[i];
        o.presence = Presence::Normal;
        o.attributes |= base_attributes & attr::OCCUPIES_SPACE;

        // Leave warp at full sublight along the current heading.
        let (fdist, calcv) = rot_point(o.direction);
        o.velocity.h = o.max_velocity * fdist;
        o.velocity.v = o.max_velocity * calcv;

        let (location, direction) = (o.location, o.direction);
        let flare = plug.blessed.warp_out_flare;
        g.create_object(
            flare,
            None,
            location,
            direction,
            crate::handle::AdmHandle::NONE,
            0,
            None,
        );
    }
    keys_down
}

fn think_landing(g: &mut Game, i: usize) -> u32 {
    let mut keys_down = 0u32;

    let (dest, _walk_target, press_down) = walk_destination(g, i);
    let (distance, theta) = if press_down {
        keys_down |= keys::DOWN;
        (0, 0)
    } else {
        let (distance, angle) = coord_vector(&g.objects[i], dest);
        let theta = {
            let o = &mut g.objects[i];
            if o.attributes & attr::HAS_DIRECTION_GOAL != 0 {
                let t = angle_difference(angle, o.direction_goal);
                if t.abs() > DIRECTION_ERROR {
                    o.direction_goal = angle;
                }
                angle_difference(o.direction, o.direction_goal).abs()
            } else {
                o.direction = angle;
                0
            }
        };
        (distance, theta)
    };

    if distance > LANDING_DISTANCE {
        if theta < EVADE_ANGLE {
            keys_down |= keys::UP;
        } else {
            keys_down |= keys::DOWN;
        }
        g.objects[i].last_target_distance = distance;
    } else {
        keys_down |= keys::DOWN;
        if let Presence::Landing { speed, scale } = g.objects[i].presence {
            g.objects[i].presence = Presence::Landing {
                speed,
                scale: scale - speed,
            };
        }
    }

    if let Presence::Landing { scale, .. } = g.objects[i].presence {
        if scale <= 0 {
            let this = ObjHandle(i as i32);
            let direct = g.objects[i].dest_object;
            if let Some(base_id) = g.objects[i].base {
                exec(
                    g,
                    ActionRef::Base(base_id, Hook::Expire),
                    0,
                    this,
                    direct,
                    None,
                );
            }
            g.objects[i].active = Activity::ToBeFreed;
        } else {
            let sprite_h = g.objects[i].sprite;
            if let Some(s) = g.sprites.get_mut(sprite_h) {
                s.scale = scale;
            }
        }
    }
    keys_down
}

// ---------------------------------------------------------------------------
// Damage
// ---------------------------------------------------------------------------

/// Apply one collision's damage from `by` to `hit`, with shield flash,
/// cloak break, kill credit, and the collider's collide actions.
pub fn hit_object(g: &mut Game, hit: ObjHandle, by: ObjHandle) {
    let plug = g.plug.clone();
    let Some(hi) = hit.index() else { return };
    if g.objects[hi].active != Activity::InUse {
        return;
    }
    let damage = g
        .obj(by)
        .and_then(|s| s.base)
        .map(|b| plug.base(b).damage)
        .unwrap_or(0);

    g.objects[hi].time_from_origin = Ticks::ZERO;

    // Eject the pilot before a killing blow lands.
    let dont_die = g.objects[hi]
        .base
        .map(|b| plug.base(b).destroy_dont_die)
        .unwrap_or(false);
    if g.objects[hi].health - damage < 0
        && g.objects[hi].attributes & (attr::IS_PLAYER_SHIP | attr::REMOTE_OR_HUMAN) != 0
        && !dont_die
    {
        g.create_floating_player_body(hit);
    }

    g.alter_health(hit, -damage);

    if g.objects[hi].is_active() {
        let max_health = g.objects[hi].max_health(&plug).max(1);
        let o = &mut g.objects[hi];
        if o.shield_color.is_some() {
            o.hit_state = (o.health * HIT_STATE_MAX) / max_health + 16;
        }
        if o.cloak_state > 0 {
            o.cloak_state = 1;
        }
    }

    let killed = g.objects[hi].health < 0;
    if killed {
        // Kill credit to the collider's owner.
        let (hit_owner, by_owner) = (
            g.objects[hi].owner,
            g.obj(by).map(|o| o.owner).unwrap_or_default(),
        );
        if by_owner.is_some() && by_owner != hit_owner {
            if let Some(a) = by_owner.index() {
                g.admirals[a].kills += 1;
            }
        }
        if hit_owner == g.admiral
            && g.objects[hi].attributes & attr::CAN_ACCEPT_DESTINATION != 0
        {
            let name = g.object_name(hit);
            let remaining =
                g.count_objects_of_base_type(g.objects[hi].base, hit_owner) - 1;
            g.effects.push(Effect::Message(format!(
                "{} destroyed. {} remaining.",
                name, remaining
            )));
        }
    }

    if g.obj(by).map(|s| s.active) == Some(Activity::InUse) {
        if let Some(b) = g.obj(by).and_then(|s| s.base) {
            exec(g, ActionRef::Base(b, Hook::Collide), 0, by, hit, None);
        }
    }

    let o = &g.objects[hi];
    if o.owner == g.admiral && o.attributes & attr::IS_HUMAN_CONTROLLED != 0 && damage > 0 {
        g.effects.push(Effect::Flash {
            length: 128,
            hue: 15,
            shade: 15,
        });
    }
}
