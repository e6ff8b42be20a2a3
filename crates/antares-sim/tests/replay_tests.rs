//! Record-and-replay verification.

mod common;

use antares_sim::prelude::*;
use antares_sim::ReplayResult;

fn record_run(seed: i32, ticks: u64, interval: u64) -> antares_sim::ReplayLog {
    let plug = common::fixture_plugin();
    let mut game = start_level(plug, 0, seed).expect("level starts");
    let mut recorder = ReplayRecorder::new(0, seed, interval);

    for t in 0..ticks {
        let mut frame = InputFrame::default();
        // A little synthetic piloting to exercise the input path.
        if t % 7 == 0 {
            frame.keys.push((0, keys::UP));
        } else if t % 11 == 0 {
            frame.keys.push((0, keys::LEFT | keys::PULSE));
        }
        for &(player, mask) in &frame.keys {
            game.inject_input(player, mask);
        }
        recorder.record_tick(&game, frame);
        game.tick();
    }
    recorder.finish()
}

#[test]
fn clean_replay_matches_every_checkpoint() {
    common::init_tracing();
    let log = record_run(2026, 150, 10);
    let result: ReplayResult = replay(common::fixture_plugin(), &log).expect("replayable");
    assert!(result.completed);
    assert_eq!(result.ticks_replayed, 150);
    assert!(result.first_divergence.is_none());
}

#[test]
fn checkpoint_every_tick_also_matches() {
    let log = record_run(7, 60, 0);
    let result = replay(common::fixture_plugin(), &log).expect("replayable");
    assert!(result.completed);
    assert!(result.first_divergence.is_none());
}

#[test]
fn tampered_checkpoint_reports_first_divergence() {
    let mut log = record_run(2026, 90, 10);
    log.checkpoints
        .insert(40, "0".repeat(64));
    let result = replay(common::fixture_plugin(), &log).expect("replayable");
    assert!(!result.completed);
    let divergence = result.first_divergence.expect("divergence reported");
    assert_eq!(divergence.tick, 40);
    assert_eq!(result.ticks_replayed, 40);
}

#[test]
fn dropped_input_frame_diverges() {
    let mut log = record_run(2026, 90, 1);
    // Erase one real input; a later checkpoint must catch the drift.
    let victim = log
        .frames
        .iter()
        .position(|f| !f.is_empty())
        .expect("run has inputs");
    log.frames[victim] = InputFrame::default();
    let result = replay(common::fixture_plugin(), &log).expect("replayable");
    assert!(
        result.first_divergence.is_some(),
        "losing an input must desynchronize the run"
    );
}

#[test]
fn log_round_trips_through_json() {
    let log = record_run(11, 30, 5);
    let text = serde_json::to_string(&log).expect("serializes");
    let back: antares_sim::ReplayLog = serde_json::from_str(&text).expect("parses");
    assert_eq!(back.frames.len(), log.frames.len());
    assert_eq!(back.checkpoints, log.checkpoints);
    let result = replay(common::fixture_plugin(), &back).expect("replayable");
    assert!(result.completed && result.first_divergence.is_none());
}
