// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::BTreeMap;

use bytes::Bytes;
use common::{fixture, input, Fixture};
use keel_core::interner::Sym;
use keel_core::rollback::{RollbackConfig, RollbackController, ServerTickOutcome};

fn confirmed(client: Sym, dir: u8) -> BTreeMap<Sym, Bytes> {
    let mut map = BTreeMap::new();
    map.insert(client, input(dir));
    map
}

#[test]
fn twin_worlds_with_identical_inputs_agree_every_tick() {
    let mut a = fixture();
    let mut b = fixture();
    a.spawn_player("alice", 0.0);
    b.spawn_player("alice", 0.0);
    let sym_a = a.intern_client("alice");
    let sym_b = b.intern_client("alice");

    for frame in 0..120_u32 {
        let dir = match frame % 5 {
            0 | 1 => 1,
            2 => 2,
            _ => 0,
        };
        a.world.inputs.set(sym_a, input(dir));
        b.world.inputs.set(sym_b, input(dir));
        a.tick();
        b.tick();
        assert_eq!(
            a.world.state_hash(),
            b.world.state_hash(),
            "divergence at frame {frame}"
        );
    }
}

#[test]
fn save_advance_load_advance_replays_identically() {
    // Advance N frames, save, advance M more recording hashes, load, then
    // advance M again with the same inputs: the hash streams must agree.
    let mut fx = fixture();
    fx.spawn_player("alice", 0.0);
    let sym = fx.intern_client("alice");

    let script = |frame: u32| -> u8 {
        match frame % 3 {
            0 => 1,
            1 => 2,
            _ => 0,
        }
    };

    for _ in 0..10 {
        fx.world.inputs.set(sym, input(1));
        fx.tick();
    }
    let snapshot = fx.world.snapshot();
    let base_frame = fx.world.frame();

    let mut first_pass = Vec::new();
    for i in 0..15_u32 {
        fx.world.inputs.set(sym, input(script(base_frame + i)));
        fx.tick();
        first_pass.push(fx.world.state_hash());
    }

    fx.world.restore(&snapshot).unwrap();
    assert_eq!(fx.world.frame(), base_frame);

    for i in 0..15_u32 {
        fx.world.inputs.set(sym, input(script(base_frame + i)));
        fx.tick();
        assert_eq!(fx.world.state_hash(), first_pass[i as usize], "tick {i}");
    }
}

#[test]
fn confirmed_prediction_keeps_the_speculative_timeline() {
    let mut fx = fixture();
    fx.spawn_player("alice", 0.0);
    let sym = fx.intern_client("alice");
    let mut rollback = RollbackController::new(&RollbackConfig::default());

    // Predict "move right" for several frames.
    for _ in 0..5 {
        rollback.set_local_input(&mut fx.world, sym, input(1));
        rollback.advance(&mut fx.world, &mut fx.scheduler).unwrap();
    }
    let hash_before = fx.world.state_hash();
    let frame_before = fx.world.frame();

    // The authority confirms exactly what was predicted for frame 2.
    let outcome = rollback
        .on_server_tick(&mut fx.world, &mut fx.scheduler, 2, &confirmed(sym, 1))
        .unwrap();

    assert_eq!(outcome, ServerTickOutcome::Confirmed);
    assert_eq!(fx.world.frame(), frame_before, "frame preserved");
    assert_eq!(fx.world.state_hash(), hash_before, "timeline preserved");
}

#[test]
fn misprediction_rewinds_and_resimulates() {
    // Scenario: the client predicted "move right" at frame 2; the authority
    // says the input was "stop". After the rollback the world must equal a
    // reference run that used the confirmed input at frame 2 and the original
    // inputs everywhere else.
    let mut fx = fixture();
    fx.spawn_player("alice", 0.0);
    let sym = fx.intern_client("alice");
    let mut rollback = RollbackController::new(&RollbackConfig::default());

    for _ in 0..5 {
        rollback.set_local_input(&mut fx.world, sym, input(1));
        rollback.advance(&mut fx.world, &mut fx.scheduler).unwrap();
    }
    let frame_before = fx.world.frame();

    let outcome = rollback
        .on_server_tick(&mut fx.world, &mut fx.scheduler, 2, &confirmed(sym, 0))
        .unwrap();

    let ServerTickOutcome::Mispredicted { predicted, actual } = outcome else {
        panic!("expected a misprediction, got {outcome:?}");
    };
    assert_ne!(predicted, actual);
    assert_eq!(fx.world.frame(), frame_before, "frame preserved");

    // Reference world: same inputs, except frame 2 is the confirmed "stop".
    let mut reference = fixture();
    reference.spawn_player("alice", 0.0);
    let ref_sym = reference.intern_client("alice");
    for frame in 0..5_u32 {
        let dir = if frame == 2 { 0 } else { 1 };
        reference.world.inputs.set(ref_sym, input(dir));
        reference.tick();
    }

    assert_eq!(fx.world.state_hash(), reference.world.state_hash());
}

#[test]
fn follower_ticks_directly_on_confirmed_input() {
    let mut fx = fixture();
    fx.spawn_player("alice", 0.0);
    let sym = fx.intern_client("alice");
    let mut rollback = RollbackController::new(&RollbackConfig::default());

    for frame in 0..4_u32 {
        let outcome = rollback
            .on_server_tick(&mut fx.world, &mut fx.scheduler, frame, &confirmed(sym, 1))
            .unwrap();
        assert_eq!(outcome, ServerTickOutcome::Followed);
    }
    assert_eq!(fx.world.frame(), 4);

    // Identical to a plain run with those inputs.
    let mut reference = fixture();
    reference.spawn_player("alice", 0.0);
    let ref_sym = reference.intern_client("alice");
    for _ in 0..4 {
        reference.world.inputs.set(ref_sym, input(1));
        reference.tick();
    }
    assert_eq!(fx.world.state_hash(), reference.world.state_hash());
}

#[test]
fn late_joiner_catches_up_from_snapshot_plus_inputs() {
    // A world restored from the authority's snapshot at frame F that then
    // applies the authority's inputs for F+1..G must match a world that ran
    // from frame 0.
    let mut authority = fixture();
    authority.spawn_player("alice", 0.0);
    let sym = authority.intern_client("alice");

    let script = |frame: u32| -> u8 { (frame % 3) as u8 };

    for frame in 0..20_u32 {
        authority.world.inputs.set(sym, input(script(frame)));
        authority.tick();
    }
    let join_snapshot = authority.world.snapshot();
    let join_frame = authority.world.frame();

    for frame in join_frame..40 {
        authority.world.inputs.set(sym, input(script(frame)));
        authority.tick();
    }

    let mut joiner = fixture();
    joiner.world.restore(&join_snapshot).unwrap();
    assert_eq!(joiner.world.frame(), join_frame);
    let joiner_sym = joiner.intern_client("alice");
    assert_eq!(joiner_sym, sym, "interner state arrived with the snapshot");

    for frame in join_frame..40 {
        joiner.world.inputs.set(joiner_sym, input(script(frame)));
        joiner.tick();
    }

    assert_eq!(joiner.world.state_hash(), authority.world.state_hash());
}

#[test]
fn predictions_are_dropped_once_confirmed() {
    let mut fx = fixture();
    fx.spawn_player("alice", 0.0);
    let sym = fx.intern_client("alice");
    let mut rollback = RollbackController::new(&RollbackConfig::default());

    for _ in 0..3 {
        rollback.set_local_input(&mut fx.world, sym, input(1));
        rollback.advance(&mut fx.world, &mut fx.scheduler).unwrap();
    }
    assert_eq!(rollback.pending().count(), 3);

    rollback
        .on_server_tick(&mut fx.world, &mut fx.scheduler, 1, &confirmed(sym, 1))
        .unwrap();

    let frames: Vec<u32> = rollback.pending().map(|p| p.frame).collect();
    assert_eq!(frames, vec![2], "frames ≤ 1 dropped");
}

#[test]
fn history_serialisation_round_trips_through_load() {
    let mut fx = fixture();
    let sym = fx.intern_client("alice");
    let mut rollback = RollbackController::new(&RollbackConfig::default());

    rollback.set_local_input(&mut fx.world, sym, input(1));
    rollback.advance(&mut fx.world, &mut fx.scheduler).unwrap();
    rollback.history_mut().confirm_frame(1, confirmed(sym, 2));

    let serialised: Vec<(u32, BTreeMap<Sym, Bytes>, bool)> = rollback
        .history()
        .iter()
        .map(|(frame, inputs)| (frame, inputs.inputs().clone(), inputs.confirmed()))
        .collect();

    let mut other = RollbackController::new(&RollbackConfig::default());
    other.history_mut().load(serialised.clone());

    let replayed: Vec<(u32, BTreeMap<Sym, Bytes>, bool)> = other
        .history()
        .iter()
        .map(|(frame, inputs)| (frame, inputs.inputs().clone(), inputs.confirmed()))
        .collect();
    assert_eq!(serialised, replayed);
}

#[test]
fn missing_snapshot_is_an_error_not_a_divergence() {
    let mut fx: Fixture = fixture();
    fx.spawn_player("alice", 0.0);
    let sym = fx.intern_client("alice");
    // Tiny buffer: the pre-simulation snapshot for old frames is gone.
    let mut rollback = RollbackController::new(&RollbackConfig {
        history_frames: 4,
        buffer_frames: 2,
    });

    for _ in 0..10 {
        rollback.set_local_input(&mut fx.world, sym, input(1));
        rollback.advance(&mut fx.world, &mut fx.scheduler).unwrap();
    }

    let err = rollback
        .on_server_tick(&mut fx.world, &mut fx.scheduler, 2, &confirmed(sym, 0))
        .unwrap_err();
    assert!(matches!(
        err,
        keel_core::rollback::RollbackError::MissingSnapshot(2)
    ));
}
