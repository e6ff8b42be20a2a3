//! Tick throughput benchmarks.

use std::sync::Arc;

use antares_data::object::attr;
use antares_data::{Info, Plugin};
use antares_math::{Coord, UNIVERSAL_CENTER};
use antares_sim::prelude::*;
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use serde_json::json;

fn bench_plugin() -> Arc<Plugin> {
    let info = Info {
        identifier: "0123456789abcdef0123456789abcdef01234567".to_owned(),
        format: 1,
        title: "bench".to_owned(),
        author: String::new(),
        version: String::new(),
        urls: vec![],
        warp_in_flare: "flare".to_owned(),
        warp_out_flare: "flare".to_owned(),
        player_body: "body".to_owned(),
        energy_blob: "blob".to_owned(),
    };
    let fighter_attrs = attr::CAN_TURN
        | attr::CAN_BE_ENGAGED
        | attr::HAS_DIRECTION_GOAL
        | attr::SHAPE_FROM_DIRECTION
        | attr::CAN_ENGAGE
        | attr::CAN_EVADE
        | attr::CAN_ACCEPT_DESTINATION
        | attr::CAN_COLLIDE
        | attr::CAN_BE_HIT
        | attr::HATED
        | attr::OCCUPIES_SPACE
        | attr::CAN_BE_EVADED
        | attr::APPEAR_ON_RADAR;
    let objects = json!([
        { "name": "flare", "attributes": attr::IS_SELF_ANIMATED, "initial_age": 30 },
        { "name": "body", "attributes": attr::IS_PLAYER_SHIP, "health": 1, "initial_age": 600 },
        { "name": "blob", "attributes": attr::CAN_COLLIDE, "health": 1, "energy": 500 },
        {
            "name": "fighter",
            "attributes": fighter_attrs,
            "health": 80,
            "energy": 200,
            "damage": 2,
            "mass": 128,
            "max_velocity": 2048,
            "max_thrust": 1024,
            "rotation": { "sprite": "fighter", "turn_rate": 768, "width": 16, "height": 16 }
        }
    ]);
    let levels = json!([
        {
            "name": "bench",
            "angle": 0,
            "start_time": 0,
            "players": [
                { "player_type": "human", "name": "Us", "race": 0 },
                { "player_type": "cpu", "name": "Them", "race": 0 }
            ]
        }
    ]);
    Arc::new(
        Plugin::from_parts(
            info,
            serde_json::from_value(objects).unwrap(),
            vec![],
            serde_json::from_value(levels).unwrap(),
        )
        .unwrap(),
    )
}

fn crowded_game(ships: usize) -> Game {
    let plug = bench_plugin();
    let mut game = start_level(plug.clone(), 0, 1).unwrap();
    let fighter = plug.base_named("fighter").unwrap();
    for n in 0..ships {
        let offset = (n as u32) * 700;
        game.create_object(
            fighter,
            None,
            Coord::new(
                UNIVERSAL_CENTER.wrapping_add(offset),
                UNIVERSAL_CENTER.wrapping_sub(offset / 2),
            ),
            (n as i32 * 37) % 360,
            AdmHandle((n % 2) as i32),
            0,
            None,
        );
    }
    game
}

fn tick_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for ships in [10usize, 50, 150] {
        group.bench_function(format!("{ships}_ships"), |b| {
            b.iter_batched(
                || crowded_game(ships),
                |mut game| {
                    for _ in 0..20 {
                        game.tick();
                    }
                    game
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn state_hash_cost(c: &mut Criterion) {
    let game = crowded_game(100);
    c.bench_function("state_hash_100_ships", |b| {
        b.iter(|| game.state_hash());
    });
}

criterion_group!(benches, tick_throughput, state_hash_cost);
criterion_main!(benches);
