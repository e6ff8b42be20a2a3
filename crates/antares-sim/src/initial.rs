//! Scenario placement at runtime.
//!
//! Each placement record resolves to at most one live object, tracked
//! in the parallel `initials`/`initial_ids` arrays; stale resolutions
//! read as absent. Hidden placements stay unresolved until an action
//! reveals them.

use antares_data::object::attr;
use antares_math::{Fixed, FixedPoint};
use tracing::debug;

use crate::admiral::{self, make_new_destination};
use crate::game::Game;
use crate::handle::{AdmHandle, ObjHandle};
use crate::obj::{Activity, NO_SHIP};

/// Resolve an initial slot to its live object.
///
/// `-1` is "none"; `-2` is the local player's flagship, a convention a
/// few tutorial scripts rely on.
pub fn resolve_initial(g: &Game, number: i32) -> ObjHandle {
    if number >= 0 {
        let n = number as usize;
        let (Some(&handle), Some(&id)) = (g.initials.get(n), g.initial_ids.get(n)) else {
            return ObjHandle::NONE;
        };
        match g.obj(handle) {
            Some(o) if o.id == id && o.active == Activity::InUse => handle,
            _ => ObjHandle::NONE,
        }
    } else if number == -2 {
        match g.obj(g.ship) {
            Some(o) if o.attributes & attr::CAN_THINK != 0 => g.ship,
            _ => ObjHandle::NONE,
        }
    } else {
        ObjHandle::NONE
    }
}

/// Create one placement at level construction.
pub fn create_initial(g: &mut Game, index: usize) {
    let plug = g.plug.clone();
    let Some(level) = plug.levels.get(g.level) else {
        return;
    };
    let Some(initial) = level.initials.get(index) else {
        return;
    };
    if initial.hidden {
        g.initials[index] = ObjHandle::NONE;
        return;
    }

    spawn_initial(g, index, g.angle);
}

/// Reveal an initially-hidden placement.
pub fn unhide_initial(g: &mut Game, index: usize) {
    if resolve_initial(g, index as i32).is_some() {
        return; // already visible
    }
    spawn_initial(g, index, 0);
    set_initial_destination(g, index, true);
}

fn spawn_initial(g: &mut Game, index: usize, rotation: i32) {
    let plug = g.plug.clone();
    let Some(level) = plug.levels.get(g.level) else {
        return;
    };
    let Some(initial) = level.initials.get(index) else {
        return;
    };
    let Some(base_id) = initial.base_id else {
        return;
    };

    let coord = crate::level::translate_coord_rotated(initial.at.h, initial.at.v, rotation);
    let owner = match initial.owner {
        Some(o) if o >= 0 => AdmHandle(o),
        _ => AdmHandle::NONE,
    };

    let mut special_attributes = 0;
    if initial.flagship {
        let already_flagged = owner
            .index()
            .and_then(|a| g.admirals.get(a))
            .map(|a| a.flagship.is_some())
            .unwrap_or(true);
        if !already_flagged {
            special_attributes |= attr::IS_PLAYER_SHIP;
            if owner == g.admiral {
                special_attributes |= attr::IS_HUMAN_CONTROLLED;
            }
        }
    }

    let velocity = FixedPoint::ZERO;
    let handle = g.create_object(
        base_id,
        Some(velocity),
        coord,
        rotation,
        owner,
        special_attributes,
        initial.sprite_override.as_deref(),
    );
    g.initials[index] = handle;
    let Some(oi) = handle.index() else {
        g.initial_ids[index] = NO_SHIP;
        return;
    };
    g.initial_ids[index] = g.objects[oi].id;
    debug!(index, slot = oi, "initial created");

    if g.objects[oi].attributes & attr::IS_DESTINATION != 0 {
        let dest = make_new_destination(
            g,
            handle,
            initial.build.clone(),
            initial.earning.unwrap_or(Fixed::ZERO),
            initial.name_override.clone(),
        );
        g.objects[oi].as_destination = dest;

        if owner.is_some() && !initial.build.is_empty() {
            if let Some(a) = owner.index() {
                let id = g.objects[oi].id;
                let adm = &mut g.admirals[a];
                if adm.control.is_none() {
                    adm.control = handle;
                    adm.control_id = id;
                }
                if adm.build_at.is_none() {
                    adm.build_at = dest;
                }
                if adm.target.is_none() {
                    adm.target = handle;
                    adm.target_id = id;
                }
            }
        }
    }

    if initial.flagship && special_attributes & attr::IS_PLAYER_SHIP != 0 {
        if let Some(a) = owner.index() {
            g.admirals[a].flagship = handle;
            g.admirals[a].flagship_id = g.objects[oi].id;
        }
        if owner == g.admiral {
            g.ship = handle;
        }
    }
}

/// Wire a placement's scripted destination, after every placement
/// exists. With `preserve`, the owner's own target survives the detour.
pub fn set_initial_destination(g: &mut Game, index: usize, preserve: bool) {
    let plug = g.plug.clone();
    let Some(level) = plug.levels.get(g.level) else {
        return;
    };
    let Some(initial) = level.initials.get(index) else {
        return;
    };
    let object = g.initials[index];
    let (Some(target_index), Some(owner)) = (initial.target, initial.owner) else {
        return;
    };
    if object.is_none() || owner < 0 {
        return;
    }
    let owner = AdmHandle(owner);

    let target = *g.initials.get(target_index).unwrap_or(&ObjHandle::NONE);
    let Some(t) = g.obj(target) else { return };
    let target_id = t.id;

    let Some(a) = owner.index() else { return };
    let saved = (g.admirals[a].target, g.admirals[a].target_id);
    g.admirals[a].target = target;
    g.admirals[a].target_id = target_id;

    // Force the order through even onto pinned destinations.
    let Some(oi) = object.index() else { return };
    let save_attributes = g.objects[oi].attributes;
    g.objects[oi].attributes &= !attr::STATIC_DESTINATION;
    admiral::set_object_destination(g, object);
    g.objects[oi].attributes = save_attributes;
    if initial.target_lock {
        g.objects[oi].attributes |= attr::STATIC_DESTINATION;
    }

    if preserve {
        g.admirals[a].target = saved.0;
        g.admirals[a].target_id = saved.1;
    }
}
