use boidsong::core::geom::Vec2;
use boidsong::error::FlockError;
use boidsong::life::audio::{VoiceRack, VoiceShape, min_event_capacity, voice_channel};
use boidsong::life::boid::Boid;
use boidsong::life::flock::{Flock, FlockParams};
use boidsong::life::voice_ids::{ReusePolicy, VoiceId};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

fn fast_shape() -> VoiceShape {
    VoiceShape {
        sample_rate: 1_000.0,
        base_freq_hz: 110.0,
        attack_sec: 0.002,
        release_sec: 0.01,
        glide_sec: 0.0,
    }
}

fn still(points: &[(f32, f32)]) -> Vec<Boid> {
    points
        .iter()
        .map(|&(x, y)| Boid::new(Vec2::new(x, y), Vec2::ZERO))
        .collect()
}

#[test]
fn drained_ids_stay_quarantined_until_acknowledged() {
    let params = FlockParams {
        reuse: ReusePolicy::OnDrain,
        ..FlockParams::default()
    };
    let (outbox, feed) = voice_channel(64, 16);
    let mut rack: VoiceRack = VoiceRack::new(feed, fast_shape(), 8, 0.5);
    let mut flock =
        Flock::with_boids(params, outbox, still(&[(-0.5, 0.0), (0.5, 0.0)]), 3).unwrap();
    rack.pump();
    assert_eq!(rack.active_voices(), 2);

    // Merge: boid 1's group dies and id 1 goes into quarantine.
    flock.boids_mut()[1].pos = Vec2::new(-0.4, 0.0);
    let merged = flock.step(0.0).unwrap();
    assert_eq!(merged.destroyed, 1);
    rack.pump();
    assert_eq!(rack.held_ids().collect::<Vec<_>>(), vec![0]);
    assert!(flock.ids().is_draining(1));

    // Split before the voice has drained: id 1 is still taken.
    flock.boids_mut()[1].pos = Vec2::new(0.5, 0.0);
    flock.step(0.0).unwrap();
    assert_eq!(flock.tracker().group_of(1).unwrap().id(), 3);

    // Let the released voice finish; its ack frees id 1.
    let mut block = vec![0.0; 64];
    rack.pump();
    rack.render(&mut block);
    let report = flock.step(0.0).unwrap();
    assert_eq!(report.reclaimed, 1);
    assert!(!flock.ids().is_draining(1));

    // Merge and split again: the fresh group can take id 1 back.
    flock.boids_mut()[1].pos = Vec2::new(-0.4, 0.0);
    flock.step(0.0).unwrap();
    flock.boids_mut()[1].pos = Vec2::new(0.5, 0.0);
    flock.step(0.0).unwrap();
    assert_eq!(flock.tracker().group_of(1).unwrap().id(), 1);
    assert!(flock.ids().is_draining(3));
}

#[test]
fn audio_thread_tracks_live_groups() {
    let params = FlockParams {
        boid_count: 16,
        reuse: ReusePolicy::OnDrain,
        ..FlockParams::default()
    };
    let (outbox, feed) = voice_channel(4096, 64);
    let mut rack: VoiceRack = VoiceRack::new(feed, fast_shape(), 1024, 1.0 / 16.0);

    let done = Arc::new(AtomicBool::new(false));
    let last_frame = Arc::new(AtomicU64::new(0));
    let audio = {
        let done = done.clone();
        let last_frame = last_frame.clone();
        std::thread::spawn(move || {
            let mut block = vec![0.0f32; 32];
            loop {
                rack.pump();
                rack.render(&mut block);
                if done.load(Ordering::Acquire)
                    && rack.committed_frame() == last_frame.load(Ordering::Acquire)
                {
                    return rack;
                }
                std::thread::yield_now();
            }
        })
    };

    let mut flock = Flock::new(params, outbox, Some(17)).unwrap();
    for _ in 0..240 {
        flock.step(1.0 / 60.0).unwrap();
    }
    assert_eq!(flock.link().backlog(), 0);
    last_frame.store(flock.frame(), Ordering::Release);
    done.store(true, Ordering::Release);

    let rack = audio.join().expect("audio thread");
    let held: BTreeSet<VoiceId> = rack.held_ids().collect();
    let live: BTreeSet<VoiceId> = flock.tracker().groups().map(|g| g.id()).collect();
    assert_eq!(held, live);
    assert_eq!(rack.dropped_voices(), 0);
    for id in &live {
        assert!(!flock.ids().is_draining(*id));
    }
}

#[test]
fn flock_refuses_an_event_ring_too_small_for_one_frame() {
    let params = FlockParams::default();
    let needed = min_event_capacity(params.boid_count);
    let (outbox, _feed) = voice_channel(needed - 1, 8);
    let result = Flock::new(params, outbox, Some(1));
    assert!(matches!(
        result,
        Err(FlockError::EventRingTooSmall { capacity, boids: 16, needed: 68 }) if capacity == needed - 1
    ));

    let (outbox, _feed) = voice_channel(needed, 8);
    assert!(Flock::new(params, outbox, Some(1)).is_ok());
}
