// Entry point: headless flock run with an offline voice rack and optional WAV output.
use boidsong::audio::WavSink;
use boidsong::cli::Args;
use boidsong::config::AppConfig;
use boidsong::core::timebase::FrameClock;
use boidsong::error::FlockError;
use boidsong::life::audio::{VoiceRack, VoiceShape, voice_channel};
use boidsong::life::flock::{Flock, FlockParams, FrameReport};
use clap::Parser;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

fn apply_overrides(cfg: &mut AppConfig, args: &Args) {
    if let Some(frames) = args.frames {
        cfg.run.frames = frames;
    }
    if let Some(fps) = args.fps {
        cfg.run.fps = fps;
    }
    if let Some(boids) = args.boids {
        cfg.flock.boid_count = boids;
    }
    if let Some(seed) = args.seed {
        cfg.flock.seed = Some(seed);
    }
    if let Some(reuse) = args.reuse {
        cfg.voices.reuse = reuse.into();
    }
}

#[derive(Default)]
struct Totals {
    created: usize,
    destroyed: usize,
    splits: usize,
    bounces: usize,
    peak_groups: usize,
}

impl Totals {
    fn add(&mut self, r: &FrameReport) {
        self.created += r.created;
        self.destroyed += r.destroyed;
        self.splits += r.splits;
        self.bounces += r.bounces;
        self.peak_groups = self.peak_groups.max(r.groups);
    }
}

fn main() -> Result<(), FlockError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("boidsong=info")),
        )
        .init();

    let args = Args::parse();
    let mut cfg = AppConfig::load_or_default(&args.config);
    apply_overrides(&mut cfg, &args);
    cfg.validate()?;

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_for_ctrlc = stop_flag.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        stop_flag_for_ctrlc.store(true, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {err}");
    }

    let boid_count = cfg.flock.boid_count;
    // Releasing voices linger after their group dies, so leave headroom.
    let voice_capacity = boid_count * 4;
    let (outbox, feed) = voice_channel(cfg.audio.event_capacity, voice_capacity);
    let shape = VoiceShape {
        sample_rate: cfg.audio.sample_rate as f32,
        base_freq_hz: cfg.audio.base_freq_hz,
        attack_sec: cfg.audio.attack_sec,
        release_sec: cfg.audio.release_sec,
        glide_sec: cfg.audio.pitch_glide_sec,
    };
    let mut rack: VoiceRack = VoiceRack::new(feed, shape, voice_capacity, 1.0 / boid_count as f32);
    let mut flock = Flock::new(FlockParams::from(&cfg), outbox, cfg.flock.seed)?;
    let clock = FrameClock {
        sample_rate: cfg.audio.sample_rate,
        fps: cfg.run.fps,
    };

    let (mut wav_tx, wav_handle) = match &args.wav {
        Some(path) => {
            let (tx, rx) = crossbeam_channel::bounded::<Arc<[f32]>>(64);
            info!(path = %path.display(), "writing wav");
            (
                Some(tx),
                Some(WavSink::spawn(rx, path.clone(), cfg.audio.sample_rate)),
            )
        }
        None => (None, None),
    };

    let mut block: Vec<f32> = Vec::new();
    let mut totals = Totals::default();
    let mut frames_run = 0u64;
    for frame in 0..cfg.run.frames {
        if stop_flag.load(Ordering::SeqCst) {
            info!(frame, "interrupted");
            break;
        }

        rack.pump();
        block.resize(clock.samples_in_frame(frame), 0.0);
        rack.render(&mut block);
        if let Some(tx) = &wav_tx {
            if tx.send(Arc::from(block.as_slice())).is_err() {
                warn!("wav writer hung up; audio output stops here");
                wav_tx = None;
            }
        }

        let report = match args.reset_every {
            Some(every) if every > 0 && frame > 0 && frame % every == 0 => flock.reset()?,
            _ => flock.step(clock.frame_dt())?,
        };
        totals.add(&report);
        frames_run += 1;

        if frame % (cfg.run.fps.max(1.0) as u64) == 0 {
            debug!(
                frame,
                groups = report.groups,
                voices = rack.active_voices(),
                backlog = flock.link().backlog(),
                "tick"
            );
        }
    }

    drop(wav_tx);
    if let Some(handle) = wav_handle {
        let written = handle
            .join()
            .map_err(|_| FlockError::ThreadPanicked("wav writer"))??;
        info!(
            samples = written,
            seconds = clock.tick_to_sec(written),
            "wav finalized"
        );
    }

    info!(
        frames = frames_run,
        created = totals.created,
        destroyed = totals.destroyed,
        splits = totals.splits,
        bounces = totals.bounces,
        peak_groups = totals.peak_groups,
        dropped_voices = rack.dropped_voices(),
        "run complete"
    );
    Ok(())
}
