//! Action execution and the delayed-action queue.
//!
//! Action lists live on templates (six lifecycle hooks) and on level
//! conditions; a list reference is (source, start index), never a
//! pointer. Execution applies each verb to the resolved subject and
//! focus with full side effects. A step with a delay re-queues the tail
//! of its list, captured subject/direct ids included; stale captures
//! drop silently when the delay elapses.

use antares_data::object::{attr, ENERGY_POD_AMOUNT};
use antares_data::{Action, Alter, BaseId, KillKind, MoveOrigin, OwnerFilter, PushKind, Verb};
use antares_math::{
    evil_fixed_to_long, ratio_to_angle, rot_point, Fixed, FixedPoint, Point, Ticks, FIXED_NONE,
    MAJOR_TICK,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::admiral;
use crate::game::{Effect, Game};
use crate::handle::{AdmHandle, ObjHandle};
use crate::obj::{Activity, Presence, NO_SHIP, TIME_TO_CHECK_HOME};
use crate::vector;

/// Capacity of the delayed-action queue.
pub const ACTION_QUEUE_LENGTH: usize = 120;

// ---------------------------------------------------------------------------
// Action list references
// ---------------------------------------------------------------------------

/// One of a template's six action hooks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hook {
    Destroy,
    Expire,
    Create,
    Collide,
    Activate,
    Arrive,
}

/// Identifies an immutable action list in the loaded plugin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionRef {
    /// A hook list on a template.
    Base(BaseId, Hook),
    /// A condition's action list in the running level.
    Condition(usize),
}

fn list_of<'a>(plug: &'a antares_data::Plugin, level: usize, source: ActionRef) -> &'a [Action] {
    match source {
        ActionRef::Base(id, hook) => {
            let base = plug.base(id);
            match hook {
                Hook::Destroy => &base.destroy,
                Hook::Expire => &base.expire,
                Hook::Create => &base.create,
                Hook::Collide => &base.collide,
                Hook::Activate => &base.activate,
                Hook::Arrive => &base.arrive,
            }
        }
        ActionRef::Condition(n) => plug
            .levels
            .get(level)
            .and_then(|l| l.conditions.get(n))
            .map(|c| c.action.as_slice())
            .unwrap_or(&[]),
    }
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// One pending tail of an action list.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct QueueEntry {
    pub occupied: bool,
    pub source: Option<ActionRef>,
    pub start: usize,
    pub scheduled_time: Ticks,
    pub subject: ObjHandle,
    pub subject_id: i32,
    pub direct: ObjHandle,
    pub direct_id: i32,
    pub offset: Point,
    /// Next entry in countdown order; -1 terminates.
    pub next: i32,
}

/// The fixed-capacity delayed-action queue, threaded in ascending
/// countdown order with insertion order breaking ties.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionQueue {
    entries: Vec<QueueEntry>,
    first: i32,
}

impl ActionQueue {
    pub fn new() -> ActionQueue {
        ActionQueue {
            entries: vec![QueueEntry::default(); ACTION_QUEUE_LENGTH],
            first: -1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first < 0
    }

    /// Pending entries, in execution order.
    pub fn len(&self) -> usize {
        let mut n = 0;
        let mut at = self.first;
        while at >= 0 {
            n += 1;
            at = self.entries[at as usize].next;
        }
        n
    }

    fn insert(&mut self, entry: QueueEntry) {
        let Some(slot) = self.entries.iter().position(|e| !e.occupied) else {
            // Queue exhaustion drops the tail, as the fixed ring always
            // has.
            warn!("action queue full; delayed actions dropped");
            return;
        };
        let delay = entry.scheduled_time;
        self.entries[slot] = entry;

        // Later arrivals with an equal countdown go after earlier ones.
        let mut previous: i32 = -1;
        let mut at = self.first;
        while at >= 0 && self.entries[at as usize].scheduled_time <= delay {
            previous = at;
            at = self.entries[at as usize].next;
        }
        self.entries[slot].next = at;
        if previous >= 0 {
            self.entries[previous as usize].next = slot as i32;
        } else {
            self.first = slot as i32;
        }
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        ActionQueue::new()
    }
}

/// Queue the tail of a list to run after `delay`.
#[allow(clippy::too_many_arguments)]
fn queue_action(
    g: &mut Game,
    source: ActionRef,
    start: usize,
    delay: Ticks,
    subject: ObjHandle,
    direct: ObjHandle,
    offset: Option<Point>,
) {
    let subject_id = g.obj(subject).map(|o| o.id).unwrap_or(NO_SHIP);
    let direct_id = g.obj(direct).map(|o| o.id).unwrap_or(NO_SHIP);
    g.queue.insert(QueueEntry {
        occupied: true,
        source: Some(source),
        start,
        scheduled_time: delay,
        subject,
        subject_id,
        direct,
        direct_id,
        offset: offset.unwrap_or_default(),
        next: -1,
    });
}

/// Count down all pending entries by one major tick, then run everything
/// due. Entries whose captured subject or direct has gone stale are
/// dropped without effect.
pub fn execute_queue(g: &mut Game) {
    for entry in &mut g.queue.entries {
        if entry.occupied {
            entry.scheduled_time -= MAJOR_TICK;
        }
    }

    while g.queue.first >= 0 {
        let head = g.queue.first as usize;
        if !g.queue.entries[head].occupied
            || g.queue.entries[head].scheduled_time > Ticks::ZERO
        {
            break;
        }
        let entry = g.queue.entries[head].clone();
        g.queue.entries[head] = QueueEntry::default();
        g.queue.first = entry.next;

        let subject_id = g
            .obj(entry.subject)
            .filter(|o| o.is_active())
            .map(|o| o.id)
            .unwrap_or(NO_SHIP);
        let direct_id = g
            .obj(entry.direct)
            .filter(|o| o.is_active())
            .map(|o| o.id)
            .unwrap_or(NO_SHIP);
        if subject_id == entry.subject_id && direct_id == entry.direct_id {
            if let Some(source) = entry.source {
                execute_actions(
                    g,
                    source,
                    entry.start,
                    entry.subject,
                    entry.direct,
                    Some(entry.offset),
                    false,
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// Run a whole action list with delays honored.
pub fn exec(
    g: &mut Game,
    source: ActionRef,
    start: usize,
    subject: ObjHandle,
    direct: ObjHandle,
    offset: Option<Point>,
) {
    execute_actions(g, source, start, subject, direct, offset, true);
}

fn execute_actions(
    g: &mut Game,
    source: ActionRef,
    start: usize,
    original_subject: ObjHandle,
    original_direct: ObjHandle,
    offset: Option<Point>,
    mut allow_delay: bool,
) {
    let plug = g.plug.clone();
    let list = list_of(&plug, g.level, source);
    let mut check_conditions = false;

    for idx in start..list.len() {
        let action = &list[idx];

        let mut subject = original_subject;
        if action.initial_subject_override >= 0 {
            subject = crate::initial::resolve_initial(g, action.initial_subject_override);
        }
        let mut direct = original_direct;
        if action.initial_direct_override >= 0 {
            direct = crate::initial::resolve_initial(g, action.initial_direct_override);
        }

        if action.delay > Ticks::ZERO && allow_delay {
            queue_action(g, source, idx, action.delay, subject, direct, offset);
            return;
        }
        allow_delay = true;

        let mut focus = direct;
        if action.reflexive || focus.is_none() {
            focus = subject;
        }

        // Owner filter between subject and direct.
        if direct.is_some() && subject.is_some() {
            let same = g.obj(direct).map(|o| o.owner) == g.obj(subject).map(|o| o.owner);
            match action.owner {
                OwnerFilter::Different if same => continue,
                OwnerFilter::Same if !same => continue,
                _ => {}
            }
        }

        // Attribute or key-tag filter, applied to the direct object.
        if action.inclusive_filter != 0 || !action.level_key_tag.is_empty() {
            let passes = match g.obj(direct) {
                Some(o) => {
                    if !action.level_key_tag.is_empty() {
                        action.level_key_tag == o.level_key_tag
                    } else {
                        o.attributes & action.inclusive_filter == action.inclusive_filter
                    }
                }
                None => false,
            };
            if !passes {
                continue;
            }
        }

        apply_verb(g, action, subject, focus, direct, offset);
        check_conditions = check_conditions || action.check_conditions();
    }

    if check_conditions {
        crate::condition::check_conditions(g);
    }
}

// ---------------------------------------------------------------------------
// Verbs
// ---------------------------------------------------------------------------

fn apply_verb(
    g: &mut Game,
    action: &Action,
    subject: ObjHandle,
    focus: ObjHandle,
    direct: ObjHandle,
    offset: Option<Point>,
) {
    let plug = g.plug.clone();
    match &action.verb {
        Verb::None => {}

        Verb::CreateObject {
            base_id,
            count_min,
            count_range,
            relative_velocity,
            relative_direction,
            distance,
            inherit,
            legacy_random,
            ..
        } => {
            let Some(base_id) = *base_id else {
                warn!("create-object with unresolved base; treated as no-action");
                return;
            };
            let Some(si) = subject.index() else { return };
            if !g.objects[si].is_active() {
                return;
            }

            let mut count = *count_min;
            if *count_range > 1 {
                count += g.objects[si].random.next(*count_range);
            } else if *legacy_random {
                // The range test used to be > 0; one shooter shipped
                // with a meaningless range of 1 and recordings still
                // expect its draw.
                g.objects[si].random.next(1);
            }

            for _ in 0..count {
                let vel = if *relative_velocity {
                    Some(g.objects[si].velocity)
                } else {
                    None
                };
                let direction = if plug.base(base_id).attributes & attr::AUTO_TARGET != 0 {
                    g.obj(focus).map(|f| f.target_angle).unwrap_or(0)
                } else if *relative_direction {
                    g.objects[si].direction
                } else {
                    0
                };
                let mut at = g.objects[si].location;
                if let Some(off) = offset {
                    at.h = at.h.wrapping_add(off.h as u32);
                    at.v = at.v.wrapping_add(off.v as u32);
                }
                if *distance > 0 {
                    let jh = g.objects[si].random.next(*distance * 2) - *distance;
                    let jv = g.objects[si].random.next(*distance * 2) - *distance;
                    at.h = at.h.wrapping_add(jh as u32);
                    at.v = at.v.wrapping_add(jv as u32);
                }

                let owner = g.objects[si].owner;
                let product = g.create_object(base_id, vel, at, direction, owner, 0, None);
                let Some(pi) = product.index() else { continue };

                if g.objects[pi].attributes & attr::CAN_ACCEPT_DESTINATION != 0 {
                    let save_attributes = g.objects[pi].attributes;
                    g.objects[pi].attributes &= !attr::STATIC_DESTINATION;
                    if g.objects[pi].owner.is_some() {
                        if action.reflexive {
                            if !*inherit {
                                admiral::override_object_destination(g, product, subject);
                            } else if g.objects[si].dest_object.is_some() {
                                let dest = g.objects[si].dest_object;
                                admiral::override_object_destination(g, product, dest);
                            }
                        }
                    } else if action.reflexive {
                        let (sdest, sdest_id, sid) = (
                            g.objects[si].dest_object,
                            g.objects[si].dest_object_id,
                            g.objects[si].id,
                        );
                        let p = &mut g.objects[pi];
                        p.time_from_origin = TIME_TO_CHECK_HOME;
                        p.runtime_flags &= !antares_data::runtime_flag::HAS_ARRIVED;
                        p.dest_object = subject;
                        p.dest_object_dest = sdest;
                        p.dest_object_id = sid;
                        p.dest_object_dest_id = sdest_id;
                    }
                    g.objects[pi].attributes = save_attributes;
                }

                let (starget, starget_id) =
                    (g.objects[si].target, g.objects[si].target_id);
                let p = &mut g.objects[pi];
                p.target = starget;
                p.target_id = starget_id;
                p.closest_object = p.target;

                // A new beam still needs its endpoints wired up.
                if g.objects[pi].attributes & attr::IS_VECTOR != 0 {
                    let is_bolt = g
                        .vectors
                        .get(g.objects[pi].vector)
                        .map(|v| !v.is_ray)
                        .unwrap_or(true);
                    if !is_bolt {
                        vector::set_attributes(g, product, subject);
                    }
                }
            }
        }

        Verb::PlaySound {
            priority,
            persistence,
            absolute,
            volume,
            id_min,
            id_range,
        } => {
            let mut pick = *id_min;
            if *id_range > 1 {
                if let Some(f) = focus.index() {
                    pick += g.objects[f].random.next(*id_range);
                }
            }
            g.effects.push(Effect::PlaySound {
                id: pick,
                volume: *volume,
                persistence: *persistence,
                priority: *priority,
                at: if *absolute { None } else { Some(focus) },
            });
        }

        Verb::Alter(alter) => apply_alter(g, action, alter, subject, focus, direct),

        Verb::MakeSparks {
            count,
            decay,
            velocity_range,
            hue,
        } => {
            let at = match g.obj(focus) {
                Some(f) => g.screen_position(f.location),
                None => return,
            };
            g.effects.push(Effect::Sparks {
                count: *count,
                decay: *decay,
                velocity: *velocity_range,
                hue: *hue,
                at,
            });
        }

        Verb::ReleaseEnergy { percent } => {
            let Some(fi) = focus.index() else { return };
            let energy = g.objects[fi].energy;
            let total = evil_fixed_to_long(*percent * Fixed::from_long(energy));
            let mut pods = total / ENERGY_POD_AMOUNT;
            let (velocity, location, direction) = (
                g.objects[fi].velocity,
                g.objects[fi].location,
                g.objects[fi].direction,
            );
            let blob = plug.blessed.energy_blob;
            while pods > 0 {
                g.create_object(
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

        Verb::LandAt { speed } => {
            // Always lands the subject, never the direct object.
            let Some(si) = subject.index() else { return };
            if g.objects[si].attributes & (attr::IS_PLAYER_SHIP | attr::REMOTE_OR_HUMAN) != 0 {
                g.create_floating_player_body(subject);
            }
            let scale = g.objects[si].natural_scale;
            g.objects[si].presence = Presence::Landing {
                speed: *speed,
                scale,
            };
        }

        Verb::EnterWarp => {
            let Some(si) = subject.index() else { return };
            g.objects[si].presence = Presence::WarpIn {
                progress: 0,
                flares: 0,
            };
            g.objects[si].attributes &= !attr::OCCUPIES_SPACE;
            let (location, direction) = (g.objects[si].location, g.objects[si].direction);
            let flare = plug.blessed.warp_in_flare;
            g.create_object(flare, None, location, direction, AdmHandle::NONE, 0, None);
        }

        Verb::DisplayMessage { id, page } => {
            g.current_message = (*id, *page);
            g.effects.push(Effect::StartMessage {
                id: *id,
                page: *page,
            });
        }

        Verb::ChangeScore {
            player,
            which,
            amount,
        } => {
            let adm = resolve_player(g, *player, focus);
            if adm.is_some() {
                admiral::alter_admiral_score(g, adm, *which, *amount);
            }
        }

        Verb::DeclareWinner {
            player,
            next_level,
            text,
        } => {
            let adm = resolve_player(g, *player, focus);
            crate::level::declare_winner(g, adm, next_level.map(|n| n as usize), text);
        }

        Verb::Die { kind } => {
            let (target, destroy) = match kind {
                KillKind::Expire => {
                    if subject.is_none() {
                        return;
                    }
                    (subject, false)
                }
                KillKind::Destroy => {
                    if subject.is_none() {
                        return;
                    }
                    (subject, true)
                }
                KillKind::None => (focus, false),
            };
            let Some(ti) = target.index() else { return };
            let dont_die = g.objects[ti]
                .base
                .map(|b| plug.base(b).destroy_dont_die)
                .unwrap_or(false);
            if g.objects[ti].attributes & (attr::IS_PLAYER_SHIP | attr::REMOTE_OR_HUMAN) != 0
                && !dont_die
            {
                g.create_floating_player_body(target);
            }
            if destroy {
                g.destroy_object(target);
            } else {
                g.objects[ti].active = Activity::ToBeFreed;
            }
        }

        Verb::SetDestination => {
            let Some(si) = subject.index() else { return };
            let save_attributes = g.objects[si].attributes;
            g.objects[si].attributes &= !attr::STATIC_DESTINATION;
            admiral::override_object_destination(g, subject, focus);
            g.objects[si].attributes = save_attributes;
        }

        Verb::ActivatePulse => crate::think::fire_weapon(g, subject, ObjHandle::NONE, 0),
        Verb::ActivateBeam => crate::think::fire_weapon(g, subject, ObjHandle::NONE, 1),
        Verb::ActivateSpecial => crate::think::fire_weapon(g, subject, ObjHandle::NONE, 2),

        Verb::ColorFlash {
            length,
            hue,
            shade,
        } => {
            g.effects.push(Effect::Flash {
                length: *length,
                hue: *hue,
                shade: *shade,
            });
        }

        Verb::NilTarget => {
            let Some(fi) = focus.index() else { return };
            let o = &mut g.objects[fi];
            o.target = ObjHandle::NONE;
            o.target_id = NO_SHIP;
            o.last_target = ObjHandle::NONE;
        }

        Verb::DisableKeys { mask } => {
            g.key_mask |= mask;
        }
        Verb::EnableKeys { mask } => {
            g.key_mask &= !mask;
        }

        Verb::SetZoom { level } => {
            if *level != g.zoom {
                g.zoom = *level;
                g.effects.push(Effect::ZoomSet(*level));
            }
        }

        Verb::ComputerSelect { screen, line } => {
            g.computer_screen = *screen;
            g.computer_line = *line;
            g.effects.push(Effect::ComputerSelect {
                screen: *screen,
                line: *line,
            });
        }

        Verb::AssumeInitialObject { which } => {
            // Tutorial handoff: slot selection shifts with player 1's
            // first score counter.
            let index = which + admiral::admiral_score(g, AdmHandle(0), 0);
            let Some(fi) = focus.index() else { return };
            let id = g.objects[fi].id;
            if index >= 0 && (index as usize) < g.initials.len() {
                g.initials[index as usize] = focus;
                g.initial_ids[index as usize] = id;
            }
        }
    }
}

fn resolve_player(g: &Game, player: Option<i32>, focus: ObjHandle) -> AdmHandle {
    match player {
        Some(p) => AdmHandle(p),
        None => g.obj(focus).map(|o| o.owner).unwrap_or(AdmHandle::NONE),
    }
}

// ---------------------------------------------------------------------------
// Alter sub-verbs
// ---------------------------------------------------------------------------

fn apply_alter(
    g: &mut Game,
    action: &Action,
    alter: &Alter,
    subject: ObjHandle,
    focus: ObjHandle,
    direct: ObjHandle,
) {
    let plug = g.plug.clone();
    match alter {
        Alter::Health { amount } => g.alter_health(focus, *amount),

        Alter::Energy { amount } => g.alter_energy(focus, *amount),

        Alter::Velocity { kind, value } => {
            apply_push(g, *kind, *value, subject, focus);
        }

        Alter::Thrust {
            relative,
            minimum,
            range,
        } => {
            let Some(fi) = focus.index() else { return };
            let o = &mut g.objects[fi];
            let f = *minimum + o.random.next_fixed(*range);
            if *relative {
                o.thrust += f;
            } else {
                o.thrust = f;
            }
        }

        Alter::MaxVelocity { value } => {
            let Some(fi) = focus.index() else { return };
            let reset = g.objects[fi]
                .base
                .map(|b| plug.base(b).max_velocity)
                .unwrap_or(Fixed::ZERO);
            g.objects[fi].max_velocity = value.unwrap_or(reset);
        }

        Alter::MaxThrust { value } => {
            if let Some(fi) = focus.index() {
                g.objects[fi].max_thrust = *value;
            }
        }

        Alter::MaxTurnRate { value } => {
            if let Some(fi) = focus.index() {
                g.objects[fi].max_turn_rate = *value;
            }
        }

        Alter::Scale { value } => {
            let Some(fi) = focus.index() else { return };
            g.objects[fi].natural_scale = *value;
            let sprite_h = g.objects[fi].sprite;
            if let Some(s) = g.sprites.get_mut(sprite_h) {
                s.scale = *value;
            }
        }

        Alter::Attributes { clear, bits } => {
            let Some(fi) = focus.index() else { return };
            if *clear {
                g.objects[fi].attributes &= !bits;
            } else {
                g.objects[fi].attributes |= bits;
            }
        }

        Alter::LevelKeyTag { tag } => {
            if let Some(fi) = focus.index() {
                g.objects[fi].level_key_tag = tag.clone();
            }
        }
        Alter::OrderKeyTag { tag } => {
            if let Some(fi) = focus.index() {
                g.objects[fi].order_key_tag = tag.clone();
            }
        }
        Alter::EngageKeyTag { tag } => {
            if let Some(fi) = focus.index() {
                g.objects[fi].engage_key_tag = tag.clone();
            }
        }

        Alter::Owner { player } => match player {
            Some(p) => g.set_owner(focus, AdmHandle(*p), false),
            None => {
                // Relative and reflexive together would be a no-op, so
                // the reflexive form takes the direct object's owner.
                let from = if action.reflexive && direct.is_some() {
                    direct
                } else {
                    subject
                };
                let owner = g.obj(from).map(|o| o.owner).unwrap_or(AdmHandle::NONE);
                g.set_owner(focus, owner, true);
            }
        },

        Alter::Location {
            origin,
            to,
            distance,
        } => {
            let Some(fi) = focus.index() else { return };
            let mut at = match origin {
                MoveOrigin::Level => crate::level::translate_coord(g, to.h, to.v),
                MoveOrigin::Subject => match g.obj(subject) {
                    Some(s) => s.location,
                    None => return,
                },
                MoveOrigin::Object => match g.obj(direct) {
                    Some(d) => d.location,
                    None => return,
                },
            };
            if *distance > 0 {
                let jh = g.objects[fi].random.next(*distance << 1) - *distance;
                let jv = g.objects[fi].random.next(*distance << 1) - *distance;
                at.h = at.h.wrapping_add(jh as u32);
                at.v = at.v.wrapping_add(jv as u32);
            }
            g.objects[fi].location = at;
        }

        Alter::EquipWeapon { which, base_id, .. } => {
            let Some(fi) = focus.index() else { return };
            let Some(weapon_id) = *base_id else {
                warn!("equip-weapon with unresolved base; treated as no-action");
                return;
            };
            let device = &plug.base(weapon_id).device;
            let slot = match which {
                antares_data::Weapon::Pulse => &mut g.objects[fi].pulse,
                antares_data::Weapon::Beam => &mut g.objects[fi].beam,
                antares_data::Weapon::Special => &mut g.objects[fi].special,
            };
            slot.base = Some(weapon_id);
            slot.ammo = device.ammo;
            slot.time = g.time;
            slot.position = 0;
            let o = &mut g.objects[fi];
            if device.range > o.longest_weapon_range {
                o.longest_weapon_range = device.range;
            }
            if device.range < o.shortest_weapon_range {
                o.shortest_weapon_range = device.range;
            }
        }

        Alter::Hidden { first, count } => {
            for index in *first..=(*first + *count) {
                crate::initial::unhide_initial(g, index);
            }
        }

        Alter::Cloak => g.set_cloak(focus, true),

        Alter::Offline { minimum, range } => {
            let Some(fi) = focus.index() else { return };
            let mass = g.objects[fi]
                .base
                .map(|b| plug.base(b).mass)
                .unwrap_or(Fixed::ZERO);
            let o = &mut g.objects[fi];
            let mut f = *minimum + o.random.next_fixed(*range);
            if mass == Fixed::ZERO {
                f = FIXED_NONE;
            } else {
                f = f / mass;
            }
            o.offline_time = evil_fixed_to_long(f);
        }

        Alter::Spin { minimum, range } => {
            let Some(fi) = focus.index() else { return };
            if g.objects[fi].attributes & attr::CAN_TURN == 0 {
                return;
            }
            let mass = g.objects[fi]
                .base
                .map(|b| plug.base(b).mass)
                .unwrap_or(Fixed::ZERO);
            let o = &mut g.objects[fi];
            let turn = o.turn_rate();
            let mut f = turn * (*minimum + o.random.next_fixed(*range));
            if mass == Fixed::ZERO {
                f = FIXED_NONE;
            } else {
                f = f / mass;
            }
            o.turn_velocity = f;
        }

        Alter::BaseType { base_id, keep_ammo, .. } => {
            let Some(new_base) = *base_id else {
                warn!("alter base-type with unresolved base; treated as no-action");
                return;
            };
            g.change_base_type(focus, new_base, None, *keep_ammo);
        }

        Alter::ConditionTrueYet {
            true_yet,
            first,
            count,
        } => {
            for index in *first..=(*first + *count) {
                if let Some(slot) = g.condition_enabled.get_mut(index) {
                    *slot = !*true_yet;
                }
            }
        }

        Alter::Occupation { amount } => {
            let owner = g.obj(subject).map(|o| o.owner).unwrap_or(AdmHandle::NONE);
            g.alter_object_occupation(focus, owner, *amount, true);
        }

        Alter::AbsoluteCash {
            relative,
            amount,
            player,
        } => {
            let adm = if *relative {
                g.obj(focus).map(|o| o.owner).unwrap_or(AdmHandle::NONE)
            } else {
                player.map(AdmHandle).unwrap_or(AdmHandle::NONE)
            };
            if let Some(a) = adm.index() {
                if let Some(admiral) = g.admirals.get_mut(a) {
                    admiral.pay_absolute(*amount);
                }
            }
        }

        Alter::Age {
            relative,
            minimum,
            range,
        } => {
            let Some(fi) = focus.index() else { return };
            let o = &mut g.objects[fi];
            let t = *minimum + Ticks(o.random.next(range.count() as i32) as i64);
            if *relative {
                o.expire_after += t;
                if !o.expires {
                    o.expires = o.expire_after >= Ticks::ZERO;
                }
            } else {
                o.expire_after = t;
                o.expires = o.expire_after >= Ticks::ZERO;
            }
        }

        Alter::AbsoluteLocation { relative, at } => {
            let Some(fi) = focus.index() else { return };
            if *relative {
                let o = &mut g.objects[fi];
                o.location.h = o.location.h.wrapping_add(at.h as u32);
                o.location.v = o.location.v.wrapping_add(at.v as u32);
            } else {
                g.objects[fi].location = crate::level::translate_coord(g, at.h, at.v);
            }
        }
    }
}

/// The velocity-altering family.
fn apply_push(g: &mut Game, kind: PushKind, value: Fixed, subject: ObjHandle, focus: ObjHandle) {
    if subject.is_none() {
        return;
    }
    let Some(fi) = focus.index() else { return };
    match kind {
        PushKind::Stop => {
            g.objects[fi].velocity = FixedPoint::ZERO;
        }
        PushKind::Boost => {
            let o = &mut g.objects[fi];
            let (fx, fy) = rot_point(o.direction);
            o.velocity.h += value * fx;
            o.velocity.v += value * fy;
        }
        PushKind::Cruise => {
            let o = &mut g.objects[fi];
            let (fx, fy) = rot_point(o.direction);
            o.velocity = FixedPoint::new(value * fx, value * fy);
        }
        PushKind::Set => {
            let direction = match g.obj(subject) {
                Some(s) => s.direction,
                None => return,
            };
            let (fx, fy) = rot_point(direction);
            g.objects[fi].velocity = FixedPoint::new(value * fx, value * fy);
        }
        PushKind::Collide => {
            let plug = g.plug.clone();
            let mass = g.objects[fi]
                .base
                .map(|b| plug.base(b).mass)
                .unwrap_or(Fixed::ZERO);
            if mass <= Fixed::ZERO || g.objects[fi].max_velocity <= Fixed::ZERO {
                return;
            }
            let svel = match g.obj(subject) {
                Some(s) => s.velocity,
                None => return,
            };
            let o = &mut g.objects[fi];
            o.velocity.h += ((svel.h - o.velocity.h) / mass.val()) << 6;
            o.velocity.v += ((svel.v - o.velocity.v) / mass.val()) << 6;
            cap_velocity(g, fi);
        }
        PushKind::Decelerate => {
            let plug = g.plug.clone();
            let mass = g.objects[fi]
                .base
                .map(|b| plug.base(b).mass)
                .unwrap_or(Fixed::ZERO);
            if mass <= Fixed::ZERO || g.objects[fi].max_velocity <= Fixed::ZERO {
                return;
            }
            let o = &mut g.objects[fi];
            o.velocity.h += o.velocity.h * -value;
            o.velocity.v += o.velocity.v * -value;
            cap_velocity(g, fi);
        }
    }
}

/// Clamp velocity to the object's top speed along its own heading.
fn cap_velocity(g: &mut Game, fi: usize) {
    let o = &mut g.objects[fi];
    let angle = ratio_to_angle(o.velocity.h, o.velocity.v);
    let (f, f2) = rot_point(angle);
    let f = o.max_velocity * f;
    let f2 = o.max_velocity * f2;

    if f < Fixed::ZERO {
        if o.velocity.h < f {
            o.velocity.h = f;
        }
    } else if o.velocity.h > f {
        o.velocity.h = f;
    }
    if f2 < Fixed::ZERO {
        if o.velocity.v < f2 {
            o.velocity.v = f2;
        }
    } else if o.velocity.v > f2 {
        o.velocity.v = f2;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn queue_orders_by_countdown_then_insertion() {
        let mut g = testutil::bare_game();
        let cruiser = g.plug.base_named("cruiser").unwrap();
        let s = g.create_object(
            cruiser,
            None,
            testutil::center(),
            0,
            AdmHandle(0),
            0,
            None,
        );

        // Three tails with delays 10, 20, 20 queued in that order.
        for delay in [10i64, 20, 20] {
            queue_action(
                &mut g,
                ActionRef::Base(cruiser, Hook::Destroy),
                0,
                Ticks(delay),
                s,
                ObjHandle::NONE,
                None,
            );
        }
        let mut at = g.queue.first;
        let mut order = Vec::new();
        while at >= 0 {
            order.push((at, g.queue.entries[at as usize].scheduled_time));
            at = g.queue.entries[at as usize].next;
        }
        assert_eq!(order.len(), 3);
        assert_eq!(order[0].1, Ticks(10));
        assert_eq!(order[1].1, Ticks(20));
        assert_eq!(order[2].1, Ticks(20));
        // Insertion order breaks the tie: slot 1 (first 20) before
        // slot 2.
        assert!(order[1].0 < order[2].0);
    }

    #[test]
    fn stale_capture_drops_silently() {
        let mut g = testutil::bare_game();
        let cruiser = g.plug.base_named("cruiser").unwrap();
        let s = g.create_object(
            cruiser,
            None,
            testutil::center(),
            0,
            AdmHandle(0),
            0,
            None,
        );
        queue_action(
            &mut g,
            ActionRef::Base(cruiser, Hook::Destroy),
            0,
            Ticks(3),
            s,
            ObjHandle::NONE,
            None,
        );
        g.free_object(s);
        execute_queue(&mut g);
        assert!(g.queue.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn queue_drains_in_time_then_insertion_order(
            delays in proptest::collection::vec(1i64..40, 1..40),
        ) {
            let mut g = testutil::bare_game();
            let cruiser = g.plug.base_named("cruiser").unwrap();
            let s = g.create_object(
                cruiser,
                None,
                testutil::center(),
                0,
                AdmHandle(0),
                0,
                None,
            );
            for &delay in &delays {
                queue_action(
                    &mut g,
                    ActionRef::Base(cruiser, Hook::Destroy),
                    0,
                    Ticks(delay),
                    s,
                    ObjHandle::NONE,
                    None,
                );
            }

            // The threaded order is nondecreasing in countdown, and
            // equal countdowns keep insertion (slot) order.
            let mut at = g.queue.first;
            let mut previous: Option<(Ticks, i32)> = None;
            while at >= 0 {
                let now = (g.queue.entries[at as usize].scheduled_time, at);
                if let Some(prev) = previous {
                    proptest::prop_assert!(prev.0 <= now.0);
                    if prev.0 == now.0 {
                        proptest::prop_assert!(prev.1 < now.1);
                    }
                }
                previous = Some(now);
                at = g.queue.entries[at as usize].next;
            }
        }
    }

    #[test]
    fn queue_full_drops_new_entries() {
        let mut g = testutil::bare_game();
        let cruiser = g.plug.base_named("cruiser").unwrap();
        let s = g.create_object(
            cruiser,
            None,
            testutil::center(),
            0,
            AdmHandle(0),
            0,
            None,
        );
        for _ in 0..(ACTION_QUEUE_LENGTH + 8) {
            queue_action(
                &mut g,
                ActionRef::Base(cruiser, Hook::Destroy),
                0,
                Ticks(30),
                s,
                ObjHandle::NONE,
                None,
            );
        }
        assert_eq!(g.queue.len(), ACTION_QUEUE_LENGTH);
    }
}
