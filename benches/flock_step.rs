//! Benchmarks for the per-frame simulation step and the voice rack.
//!
//! Run:
//! - cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use boidsong::life::audio::{
    FrameLink, GroupParams, VoiceBridge, VoiceEvent, VoiceRack, VoiceShape, voice_channel,
};
use boidsong::life::flock::{Flock, FlockParams};

const BOID_COUNTS: [usize; 3] = [16, 32, 64];
const BLOCK_LENS: [usize; 2] = [64, 735];

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("flock_step");
    group.sample_size(50);

    for &boid_count in &BOID_COUNTS {
        let params = FlockParams {
            boid_count,
            ..FlockParams::default()
        };
        let mut flock: Flock<Vec<VoiceEvent>> = Flock::new(params, Vec::new(), Some(42)).unwrap();
        let id = BenchmarkId::new("boids", boid_count);
        group.bench_function(id, |b| {
            b.iter(|| {
                flock.link_mut().clear();
                black_box(flock.step(black_box(1.0 / 60.0)).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_rack(c: &mut Criterion) {
    let mut group = c.benchmark_group("rack_render");
    group.sample_size(50);

    for &voices in &[4usize, 16] {
        for &block_len in &BLOCK_LENS {
            let (mut outbox, feed) = voice_channel(256, 64);
            let mut rack: VoiceRack =
                VoiceRack::new(feed, VoiceShape::default(), voices, 1.0 / voices as f32);
            for id in 0..voices as u64 {
                outbox.group_created(id, GroupParams::for_members(id as usize + 1));
            }
            outbox.commit(0);
            rack.pump();
            let mut out = vec![0.0; block_len];

            let id = BenchmarkId::new("case", format!("v{voices}_b{block_len}"));
            group.bench_function(id, |b| {
                b.iter(|| {
                    rack.pump();
                    rack.render(black_box(&mut out));
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_step, bench_rack);
criterion_main!(benches);
