//! Admirals, destinations, and the computer-player economy.
//!
//! An admiral is a player, human or computer. Destinations are the
//! passive bases ships are ordered to and built at; each carries a
//! build queue, occupation counts for neutral-death capture, and an
//! earning rate paid to its owner. The computer half of this module is
//! the build brain: sample the fleet, keep a hoped-for buildable, and
//! commit it when the cash is there.

use antares_data::object::attr;
use antares_data::{BaseId, PlayerType};
use antares_math::{Fixed, Random, Tag, Ticks, FIXED_NONE, MAJOR_TICK};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::{Effect, Game};
use crate::handle::{AdmHandle, DestHandle, ObjHandle};
use crate::obj::{Activity, Duty, NO_SHIP};

/// Most destinations tracked for building.
pub const MAX_DESTINATIONS: usize = 10;
/// Score counters per admiral.
pub const SCORE_COUNTERS: usize = 3;

/// Admiral attribute bits.
pub const ADM_HUMAN: u32 = 1 << 0;
pub const ADM_REMOTE: u32 = 1 << 1;
pub const ADM_COMPUTER: u32 = 1 << 2;

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

/// A base or other build-capable location entity.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Destination {
    pub active: bool,
    /// The space object this destination is bound to.
    pub which_object: ObjHandle,
    pub which_object_id: i32,
    pub name: String,
    /// Buildable names offered here.
    pub can_build: Vec<String>,
    /// Cash paid to the owner each major tick.
    pub earn: Fixed,
    /// Per-admiral occupation counts toward neutral-death capture.
    pub occupied: [i32; MAX_PLAYERS_ARRAY],
    /// Template under construction, if any.
    pub build_object: Option<BaseId>,
    pub build_time: Ticks,
    pub total_build_time: Ticks,
}

pub const MAX_PLAYERS_ARRAY: usize = antares_data::MAX_PLAYERS;

impl Destination {
    pub fn can_build_anything(&self) -> bool {
        !self.can_build.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Admiral
// ---------------------------------------------------------------------------

/// One buildable the admiral knows how to order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BuildEntry {
    pub name: String,
    pub base: Option<BaseId>,
    /// Upper edge of this entry's slice of the weighted-chance range.
    pub chance_range: Fixed,
}

/// Per-player aggregate.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Admiral {
    pub active: bool,
    pub attributes: u32,
    pub name: String,
    pub race: i32,
    pub hue: u8,

    pub cash: Fixed,
    pub save_goal: Fixed,
    pub earning_power: Fixed,

    pub kills: i32,
    pub losses: i32,
    pub ships_left: i32,
    pub score: [i32; SCORE_COUNTERS],
    /// Aggression countdown; when it runs out the admiral re-postures.
    pub blitzkrieg: i32,

    pub last_free_escort_strength: Fixed,
    pub this_free_escort_strength: Fixed,
    /// Sampled fleet facts; see `antares_data::build_flag`.
    pub build_flags: u32,

    pub flagship: ObjHandle,
    pub flagship_id: i32,
    pub control: ObjHandle,
    pub control_id: i32,
    pub target: ObjHandle,
    pub target_id: i32,

    pub has_destination: bool,
    pub destination_object: ObjHandle,
    pub destination_object_id: i32,

    pub consider_ship: ObjHandle,
    pub consider_ship_id: i32,
    pub consider_destination: i32,

    pub build_at: DestHandle,
    pub can_build: Vec<BuildEntry>,
    pub total_build_chance: Fixed,
    /// Index into `can_build`; -1 means nothing hoped for yet.
    pub hope_to_build: i32,

    pub cheats: u32,
}

impl Admiral {
    /// Configure a fresh admiral from a level player slot.
    pub fn make(player: &antares_data::Player) -> Admiral {
        let attributes = match player.player_type {
            PlayerType::Human => ADM_HUMAN,
            PlayerType::Cpu => ADM_COMPUTER,
        };
        let earning_power = if player.earning_power == Fixed::ZERO {
            Fixed::from_long(1)
        } else {
            player.earning_power
        };
        Admiral {
            active: true,
            attributes,
            name: player.name.clone(),
            race: player.race,
            hue: player.hue,
            earning_power,
            blitzkrieg: 1200,
            flagship: ObjHandle::NONE,
            flagship_id: NO_SHIP,
            control: ObjHandle::NONE,
            control_id: NO_SHIP,
            target: ObjHandle::NONE,
            target_id: NO_SHIP,
            destination_object: ObjHandle::NONE,
            destination_object_id: NO_SHIP,
            consider_ship: ObjHandle::NONE,
            consider_ship_id: NO_SHIP,
            consider_destination: -1,
            build_at: DestHandle::NONE,
            hope_to_build: -1,
            ..Admiral::default()
        }
    }

    /// Pay scaled by earning power.
    pub fn pay(&mut self, amount: Fixed) {
        self.pay_absolute(amount * self.earning_power);
    }

    /// Pay exactly.
    pub fn pay_absolute(&mut self, amount: Fixed) {
        self.cash += amount;
        if self.cash < Fixed::ZERO {
            self.cash = Fixed::ZERO;
        }
    }

    pub fn is_human(&self) -> bool {
        self.attributes & ADM_HUMAN != 0
    }

    pub fn is_computer(&self) -> bool {
        self.attributes & ADM_COMPUTER != 0
    }
}

// ---------------------------------------------------------------------------
// Destination bookkeeping
// ---------------------------------------------------------------------------

/// Bind a new destination entity to a live object. Returns the null
/// handle if the table is full.
pub fn make_new_destination(
    g: &mut Game,
    obj: ObjHandle,
    can_build: Vec<String>,
    earn: Fixed,
    name_override: Option<String>,
) -> DestHandle {
    let Some(o) = g.obj(obj) else {
        return DestHandle::NONE;
    };
    let object_id = o.id;
    let default_name = g.object_name(obj);
    for n in 0..g.destinations.len() {
        if g.destinations[n].active {
            continue;
        }
        g.destinations[n] = Destination {
            active: true,
            which_object: obj,
            which_object_id: object_id,
            name: name_override.unwrap_or(default_name),
            can_build,
            earn,
            build_object: None,
            ..Destination::default()
        };
        return DestHandle(n as i32);
    }
    DestHandle::NONE
}

/// Unbind a destination and scrub admirals' references to it.
pub fn remove_destination(g: &mut Game, dest: DestHandle) {
    let Some(n) = dest.index() else { return };
    if !g.destinations[n].active {
        return;
    }
    g.destinations[n] = Destination::default();
    for adm in &mut g.admirals {
        if adm.build_at == dest {
            adm.build_at = DestHandle::NONE;
        }
        if adm.consider_destination == dest.0 {
            adm.consider_destination = -1;
        }
    }
}

/// Cancel any build in progress at a destination, refunding nothing.
pub fn stop_building(g: &mut Game, dest: DestHandle) {
    if let Some(d) = dest.index().and_then(|n| g.destinations.get_mut(n)) {
        d.build_object = None;
        d.build_time = Ticks::ZERO;
        d.total_build_time = Ticks::ZERO;
    }
}

/// Adjust an admiral's occupation force at a destination; returns the
/// new count.
pub fn alter_occupation(
    g: &mut Game,
    dest: DestHandle,
    adm: AdmHandle,
    amount: i32,
) -> i32 {
    let Some(n) = dest.index() else { return 0 };
    let Some(a) = adm.index() else { return 0 };
    let d = &mut g.destinations[n];
    if !d.active || a >= d.occupied.len() {
        return 0;
    }
    d.occupied[a] += amount;
    d.occupied[a]
}

/// Zero every admiral's occupation at a destination except the new
/// owner's, which is set to the full amount.
pub fn clear_all_occupants(g: &mut Game, dest: DestHandle, owner: AdmHandle, full_amount: i32) {
    let Some(n) = dest.index() else { return };
    let d = &mut g.destinations[n];
    for (i, slot) in d.occupied.iter_mut().enumerate() {
        *slot = if AdmHandle(i as i32) == owner {
            full_amount
        } else {
            0
        };
    }
}

/// Rebuild every admiral's buildable list from the destinations they
/// own, and pick a build-at base for admirals that lost theirs.
pub fn recalc_all_admiral_build_data(g: &mut Game) {
    let plug = g.plug.clone();
    for a in 0..g.admirals.len() {
        if !g.admirals[a].active {
            continue;
        }
        let race = g.admirals[a].race;
        let mut entries: Vec<BuildEntry> = Vec::new();
        let mut build_at = DestHandle::NONE;

        for n in 0..g.destinations.len() {
            if !g.destinations[n].active {
                continue;
            }
            let obj = g.destinations[n].which_object;
            let owner_matches = g
                .obj(obj)
                .map(|o| o.owner == AdmHandle(a as i32))
                .unwrap_or(false);
            if !owner_matches {
                continue;
            }
            if build_at.is_none() && g.destinations[n].can_build_anything() {
                build_at = DestHandle(n as i32);
            }
            for name in g.destinations[n].can_build.clone() {
                if entries.iter().any(|e| e.name == name) {
                    continue;
                }
                let base = plug.buildable(race, &name);
                entries.push(BuildEntry {
                    name,
                    base,
                    chance_range: FIXED_NONE,
                });
            }
        }

        // Weight entries by their template build ratio; the running
        // total marks each entry's slice of the chance range.
        let mut total = Fixed::ZERO;
        for e in &mut entries {
            if let Some(id) = e.base {
                total += plug.base(id).build_ratio;
            } else {
                total += Fixed::from_long(1);
            }
            e.chance_range = total;
        }

        let adm = &mut g.admirals[a];
        adm.can_build = entries;
        adm.total_build_chance = total;
        if adm.build_at.is_none() {
            adm.build_at = build_at;
        }
    }
}

// ---------------------------------------------------------------------------
// Object destination orders
// ---------------------------------------------------------------------------

/// Force an object's destination to a specific target object.
pub fn override_object_destination(g: &mut Game, obj: ObjHandle, target: ObjHandle) {
    let Some(oi) = obj.index() else { return };
    if g.objects[oi].attributes & attr::STATIC_DESTINATION != 0 {
        return;
    }
    let Some(t) = g.obj(target) else {
        // Degrade to "no destination".
        let o = &mut g.objects[oi];
        o.dest_object = ObjHandle::NONE;
        o.dest_object_id = NO_SHIP;
        o.dest_object_dest = ObjHandle::NONE;
        o.dest_object_dest_id = NO_SHIP;
        o.destination_location.h = 0;
        return;
    };
    let (tid, tdest, tdest_id, tloc) =
        (t.id, t.dest_object, t.dest_object_id, t.location);
    let o = &mut g.objects[oi];
    o.dest_object = target;
    o.dest_object_id = tid;
    o.dest_object_dest = tdest;
    o.dest_object_dest_id = tdest_id;
    o.destination_location = tloc;
    o.runtime_flags &= !antares_data::runtime_flag::HAS_ARRIVED;
    o.time_from_origin = Ticks::ZERO;
    o.duty = if o.attributes & attr::IS_DESTINATION != 0 {
        Duty::Guard
    } else {
        Duty::Escort
    };
}

/// Give an object its admiral's current destination: the explicit
/// destination when one is held, the admiral's target otherwise.
pub fn set_object_destination(g: &mut Game, obj: ObjHandle) {
    let Some(oi) = obj.index() else { return };
    let owner = g.objects[oi].owner;
    let target = match owner.index().and_then(|a| g.admirals.get(a)) {
        Some(adm) if adm.has_destination => adm.destination_object,
        Some(adm) => adm.target,
        None => ObjHandle::NONE,
    };
    override_object_destination(g, obj, target);
}

/// Drop an object's destination bookkeeping when it dies or changes
/// sides.
pub fn remove_object_from_destination(g: &mut Game, obj: ObjHandle) {
    if let Some(oi) = obj.index() {
        let o = &mut g.objects[oi];
        o.dest_object = ObjHandle::NONE;
        o.dest_object_id = NO_SHIP;
        o.dest_object_dest = ObjHandle::NONE;
        o.dest_object_dest_id = NO_SHIP;
        o.destination_location.h = 0;
    }
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// Add to one of an admiral's score counters.
pub fn alter_admiral_score(g: &mut Game, adm: AdmHandle, which: usize, amount: i32) {
    if let Some(a) = adm.index().and_then(|a| g.admirals.get_mut(a)) {
        if which < SCORE_COUNTERS {
            a.score[which] += amount;
            g.effects.push(Effect::ScoreChanged {
                admiral: adm,
                which,
                value: a.score[which],
            });
        }
    }
}

/// Read a score counter.
pub fn admiral_score(g: &Game, adm: AdmHandle, which: usize) -> i32 {
    adm.index()
        .and_then(|a| g.admirals.get(a))
        .and_then(|a| a.score.get(which).copied())
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// The economy tick
// ---------------------------------------------------------------------------

/// Advance earnings, build timers, and computer build decisions.
pub fn admiral_think(g: &mut Game) {
    // Destinations: pay owners and advance builds.
    for n in 0..g.destinations.len() {
        if !g.destinations[n].active {
            continue;
        }
        let obj = g.destinations[n].which_object;
        let owner = match g.obj(obj) {
            Some(o) if o.id == g.destinations[n].which_object_id => o.owner,
            _ => AdmHandle::NONE,
        };
        if let Some(a) = owner.index() {
            let earn = g.destinations[n].earn;
            g.admirals[a].pay(earn);
        }

        if g.destinations[n].build_object.is_some() {
            g.destinations[n].build_time -= MAJOR_TICK;
            if g.destinations[n].build_time <= Ticks::ZERO {
                finish_build(g, DestHandle(n as i32), owner);
            }
        }
    }

    for a in 0..g.admirals.len() {
        if !g.admirals[a].active || !g.admirals[a].is_computer() {
            continue;
        }
        think_build(g, a);
    }
}

fn finish_build(g: &mut Game, dest: DestHandle, owner: AdmHandle) {
    let Some(n) = dest.index() else { return };
    let Some(base) = g.destinations[n].build_object.take() else {
        return;
    };
    g.destinations[n].build_time = Ticks::ZERO;
    g.destinations[n].total_build_time = Ticks::ZERO;

    let at = match g.obj(g.destinations[n].which_object) {
        Some(o) => o.location,
        None => return,
    };
    let built = g.create_object(base, None, at, 0, owner, 0, None);
    if built.is_some() {
        debug!(?owner, base = base.0, "build completed");
        set_object_destination(g, built);
    }
}

/// One computer admiral's economic slice: sample the fleet, refresh the
/// hoped-for buildable, and commit it when affordable.
fn think_build(g: &mut Game, a: usize) {
    sample_fleet(g, a);

    let adm = &mut g.admirals[a];
    if adm.blitzkrieg > 0 {
        adm.blitzkrieg -= 1;
        if adm.blitzkrieg == 0 {
            // Re-posture: the next hoped-for build is drawn fresh.
            adm.blitzkrieg = 1200;
            adm.hope_to_build = -1;
        }
    }

    if adm.can_build.is_empty() || adm.build_at.is_none() {
        return;
    }

    if adm.hope_to_build < 0 && adm.total_build_chance > Fixed::ZERO {
        let draw = Fixed::from_val(
            g.random
                .next_tagged(g.admirals[a].total_build_chance.val(), Tag(*b"adm0")),
        );
        let adm = &mut g.admirals[a];
        let pick = adm
            .can_build
            .iter()
            .position(|e| draw < e.chance_range)
            .unwrap_or(adm.can_build.len() - 1);
        adm.hope_to_build = pick as i32;
    }

    let adm = &g.admirals[a];
    let hope = adm.hope_to_build;
    if hope < 0 {
        return;
    }
    let entry = &adm.can_build[hope as usize];
    let Some(base_id) = entry.base else { return };
    let price = Fixed::from_long(g.plug.base(base_id).price);
    if adm.cash < price + adm.save_goal {
        return;
    }

    let build_at = adm.build_at;
    let Some(dn) = build_at.index() else { return };
    if g.destinations[dn].build_object.is_some() {
        return; // already building here
    }

    let build_time = g.plug.base(base_id).build_time;
    let d = &mut g.destinations[dn];
    d.build_object = Some(base_id);
    d.build_time = if build_time > Ticks::ZERO {
        build_time
    } else {
        antares_math::secs(10)
    };
    d.total_build_time = d.build_time;

    let adm = &mut g.admirals[a];
    adm.pay_absolute(-price);
    adm.hope_to_build = -1;
    debug!(admiral = a, base = base_id.0, "build committed");
}

/// Update the admiral's sampled build flags and escort-strength trend.
fn sample_fleet(g: &mut Game, a: usize) {
    use antares_data::build_flag;

    let me = AdmHandle(a as i32);
    let mut flags = 0u32;
    let mut free_escorts = Fixed::ZERO;

    let mut h = g.root;
    while let Some(i) = h.index() {
        let o = &g.objects[i];
        let next = o.next_object;
        if o.active == Activity::InUse {
            if o.attributes & attr::IS_DESTINATION != 0 {
                if o.owner.is_none() && o.as_destination.is_some() {
                    flags |= build_flag::UNCAPTURED_BASE_EXISTS;
                }
                if o.owner == me
                    && o.local_foe_strength > o.local_friend_strength
                {
                    flags |= build_flag::THIS_BASE_NEEDS_PROTECTION;
                }
            }
            if o.owner == me && o.attributes & attr::CAN_THINK != 0 {
                if o.duty == Duty::None || o.duty == Duty::Escort {
                    free_escorts += o.local_friend_strength;
                }
            }
            if o.owner.is_none() && !o.level_key_tag.is_empty() {
                flags |= build_flag::MATCHING_FOE_EXISTS;
            }
        }
        h = next;
    }

    let adm = &mut g.admirals[a];
    adm.last_free_escort_strength = adm.this_free_escort_strength;
    adm.this_free_escort_strength = free_escorts;
    if adm.this_free_escort_strength > adm.last_free_escort_strength {
        flags |= build_flag::FRIEND_UP_TREND;
    } else if adm.this_free_escort_strength < adm.last_free_escort_strength {
        flags |= build_flag::FRIEND_DOWN_TREND;
    }
    if adm.this_free_escort_strength >= adm.last_free_escort_strength {
        flags |= build_flag::SUFFICIENT_ESCORTS_EXIST;
    }
    adm.build_flags = flags;
}

// ---------------------------------------------------------------------------
// Seeding helper
// ---------------------------------------------------------------------------

/// Draw a fresh substream and object id from the global stream, in the
/// order every creation site uses.
pub fn draw_identity(random: &mut Random) -> (Random, i32) {
    let seed = Random::new(random.next(32766));
    let id = random.next(16384);
    (seed, id)
}
