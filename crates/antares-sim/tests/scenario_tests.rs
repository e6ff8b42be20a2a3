//! Concrete end-to-end scenarios.

mod common;

use antares_data::CLOAK_ON_STATE_MAX;
use antares_math::{Coord, Fixed, FixedPoint, UNIVERSAL_CENTER};
use antares_sim::prelude::*;
use antares_sim::{motion, think};

// -- Dual-spawn energy conservation ------------------------------------------

#[test]
fn released_energy_equals_initial_energy() {
    common::init_tracing();
    let plug = common::fixture_plugin();
    let mut game = start_level(plug.clone(), 0, 12345).expect("level starts");
    let pod_ship = plug.base_named("pod-ship").unwrap();
    let blob = plug.base_named("energy-blob").unwrap();

    let a = game.create_object(
        pod_ship,
        None,
        Coord::new(UNIVERSAL_CENTER - 30_000, UNIVERSAL_CENTER),
        0,
        AdmHandle(0),
        0,
        None,
    );
    let b = game.create_object(
        pod_ship,
        None,
        Coord::new(UNIVERSAL_CENTER + 30_000, UNIVERSAL_CENTER),
        180,
        AdmHandle(1),
        0,
        None,
    );
    let total_energy =
        game.obj(a).unwrap().energy + game.obj(b).unwrap().energy;

    game.destroy_object(a);
    game.destroy_object(b);
    for _ in 0..200 {
        game.tick(); // 600 minor ticks
    }

    let pod_energy: i32 = game
        .objects
        .iter()
        .filter(|o| o.is_active() && o.base == Some(blob))
        .map(|o| o.energy)
        .sum();
    assert_eq!(pod_energy, total_energy);
}

// -- Action delay ordering ---------------------------------------------------

#[test]
fn delayed_actions_run_in_time_then_insertion_order() {
    let plug = common::fixture_plugin();
    let mut game = start_level(plug.clone(), 0, 1).expect("level starts");

    // Creating each template queues its create-hook tail: delays 10,
    // 20, 20 in this order.
    for name in ["delayed-a", "delayed-b", "delayed-c"] {
        let base = plug.base_named(name).unwrap();
        game.create_object(base, None, common::center(), 0, AdmHandle(0), 0, None);
    }
    game.drain_effects();

    let mut order = Vec::new();
    for _ in 0..9 {
        game.tick(); // 27 minor ticks > 25
        for effect in game.drain_effects() {
            if let Effect::ScoreChanged { which, .. } = effect {
                order.push(which);
            }
        }
    }
    assert_eq!(order, vec![0, 1, 2], "delay 10 first, then the 20s in insertion order");
}

// -- Cloak -------------------------------------------------------------------

#[test]
fn hit_resets_cloak_to_ramp_start() {
    let plug = common::fixture_plugin();
    let mut game = start_level(plug.clone(), 0, 5).expect("level starts");
    let cruiser = plug.base_named("cruiser").unwrap();

    let victim = game.create_object(
        cruiser,
        None,
        common::center(),
        0,
        AdmHandle(0),
        0,
        None,
    );
    let shooter = game.create_object(
        cruiser,
        None,
        common::center(),
        180,
        AdmHandle(1),
        0,
        None,
    );

    for state in [17, 100, CLOAK_ON_STATE_MAX] {
        game.obj_mut(victim).unwrap().cloak_state = state;
        think::hit_object(&mut game, victim, shooter);
        assert_eq!(
            game.obj(victim).unwrap().cloak_state,
            1,
            "hit while cloaked at {state} restarts the ramp"
        );
    }
}

#[test]
fn cloak_ramp_up_and_down_restores_baseline() {
    let plug = common::fixture_plugin();
    let mut game = start_level(plug.clone(), 0, 5).expect("level starts");
    let cruiser = plug.base_named("cruiser").unwrap();
    let h = game.create_object(
        cruiser,
        None,
        common::center(),
        0,
        AdmHandle(0),
        0,
        None,
    );

    game.set_cloak(h, true);
    assert_eq!(game.obj(h).unwrap().cloak_state, 1);

    // Ramp fully on, then break it and ramp fully off.
    for _ in 0..80 {
        game.tick();
    }
    assert_eq!(game.obj(h).unwrap().cloak_state, CLOAK_ON_STATE_MAX);
    game.set_cloak(h, false);
    for _ in 0..80 {
        game.tick();
    }
    assert_eq!(game.obj(h).unwrap().cloak_state, 0);
}

// -- Warp energy accounting --------------------------------------------------

#[test]
fn warp_energy_refund_is_exact() {
    let plug = common::fixture_plugin();
    let mut game = start_level(plug.clone(), 0, 5).expect("level starts");
    let cruiser = plug.base_named("cruiser").unwrap();
    let h = game.create_object(
        cruiser,
        None,
        common::center(),
        0,
        AdmHandle(0),
        0,
        None,
    );

    let initial_energy = game.obj(h).unwrap().energy;
    let initial_battery = game.obj(h).unwrap().battery;

    // Siphon an arbitrary series of charges, then refund.
    for amount in [50, 17, 123] {
        game.collect_warp_energy(h, amount);
    }
    let after_energy = game.obj(h).unwrap().energy;
    game.refund_warp_energy(h);

    let o = game.obj(h).unwrap();
    assert_eq!(o.energy, after_energy);
    assert_eq!(
        o.battery,
        initial_battery + (initial_energy - after_energy),
        "battery gains exactly what energy lost"
    );
    assert_eq!(o.warp_energy_collected, 0);
}

#[test]
fn unlimited_ammo_never_decrements() {
    let plug = common::fixture_plugin();
    let mut game = start_level(plug.clone(), 0, 5).expect("level starts");
    let cruiser = plug.base_named("cruiser").unwrap();
    let h = game.create_object(
        cruiser,
        None,
        common::center(),
        0,
        AdmHandle(0),
        0,
        None,
    );
    assert_eq!(game.obj(h).unwrap().pulse.ammo, -1);
    for _ in 0..5 {
        think::fire_weapon(&mut game, h, ObjHandle::NONE, 0);
    }
    assert_eq!(game.obj(h).unwrap().pulse.ammo, -1);
}

// -- Elastic push ------------------------------------------------------------

#[test]
fn equal_mass_head_on_collision_reverses_velocities() {
    let plug = common::fixture_plugin();
    let mut game = start_level(plug.clone(), 0, 5).expect("level starts");
    let cruiser = plug.base_named("cruiser").unwrap();

    let v = Fixed::from_long(2);
    let a = game.create_object(
        cruiser,
        Some(FixedPoint::new(-v, Fixed::ZERO)),
        Coord::new(UNIVERSAL_CENTER - 8, UNIVERSAL_CENTER),
        90,
        AdmHandle(0),
        0,
        None,
    );
    let b = game.create_object(
        cruiser,
        Some(FixedPoint::new(v, Fixed::ZERO)),
        Coord::new(UNIVERSAL_CENTER + 8, UNIVERSAL_CENTER),
        270,
        AdmHandle(1),
        0,
        None,
    );
    // Remember: motion subtracts, so -v moves toward +h. The pair is
    // closing head-on.
    let va = game.obj(a).unwrap().velocity.h;
    let vb = game.obj(b).unwrap().velocity.h;
    assert!(va < Fixed::ZERO && vb > Fixed::ZERO);

    motion::collide_objects(&mut game);

    let (na, nb) = (
        game.obj(a).unwrap().velocity.h,
        game.obj(b).unwrap().velocity.h,
    );
    assert!(
        na > Fixed::ZERO && nb < Fixed::ZERO,
        "separation reversed: {na:?} {nb:?}"
    );
    let diff = (na.val() + nb.val()).abs();
    assert!(
        diff <= 260,
        "equal masses should share the impulse nearly evenly, diff {diff}"
    );
}

#[test]
fn overlapping_pair_takes_damage_exactly_once() {
    let plug = common::fixture_plugin();
    let mut game = start_level(plug.clone(), 0, 5).expect("level starts");
    let cruiser = plug.base_named("cruiser").unwrap();

    let a = game.create_object(
        cruiser,
        None,
        Coord::new(UNIVERSAL_CENTER - 8, UNIVERSAL_CENTER),
        0,
        AdmHandle(0),
        0,
        None,
    );
    let b = game.create_object(
        cruiser,
        None,
        Coord::new(UNIVERSAL_CENTER + 8, UNIVERSAL_CENTER),
        0,
        AdmHandle(1),
        0,
        None,
    );
    let before = game.obj(a).unwrap().health;

    motion::collide_objects(&mut game);

    // One pairing, one hit each: cruiser damage is 5.
    assert_eq!(game.obj(a).unwrap().health, before - 5);
    assert_eq!(game.obj(b).unwrap().health, before - 5);
}

// -- Paired conditions (AND semantics) ---------------------------------------

#[test]
fn condition_pairing_expresses_and() {
    let plug = common::fixture_plugin();
    let mut game = start_level(plug.clone(), 1, 99).expect("level starts");

    // Both drones exist close together; the distance condition bumps
    // the counter, the counter condition then declares the winner.
    let mut fired = false;
    for _ in 0..60 {
        game.tick();
        if game.winner().is_some() {
            fired = true;
            break;
        }
    }
    assert!(fired, "paired conditions never fired");
    assert_eq!(game.winner(), AdmHandle(0));
    assert_eq!(game.victory_text, "paired");

    // Both conditions were one-shot.
    assert!(game.condition_enabled.iter().all(|&e| !e));
}
