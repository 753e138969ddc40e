use crate::life::voice_ids::ReusePolicy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseArg {
    OnNotify,
    OnDrain,
}

impl From<ReuseArg> for ReusePolicy {
    fn from(arg: ReuseArg) -> Self {
        match arg {
            ReuseArg::OnNotify => ReusePolicy::OnNotify,
            ReuseArg::OnDrain => ReusePolicy::OnDrain,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Args {
    /// Path to config TOML
    #[arg(long, default_value = "boidsong.toml")]
    pub config: PathBuf,

    /// Number of frames to simulate (overrides config)
    #[arg(long)]
    pub frames: Option<u64>,

    /// Simulation frame rate (overrides config)
    #[arg(long)]
    pub fps: Option<f32>,

    /// Number of boids (overrides config)
    #[arg(long)]
    pub boids: Option<usize>,

    /// Random seed (overrides config)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write audio to wav file
    #[arg(long)]
    pub wav: Option<PathBuf>,

    /// When a voice id may be reused (overrides config)
    #[arg(long, value_enum)]
    pub reuse: Option<ReuseArg>,

    /// Scatter the flock again every N frames
    #[arg(long)]
    pub reset_every: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let args = Args::try_parse_from([
            "boidsong",
            "--frames",
            "120",
            "--seed",
            "4",
            "--reuse",
            "on-drain",
            "--wav",
            "out.wav",
        ])
        .unwrap();
        assert_eq!(args.frames, Some(120));
        assert_eq!(args.seed, Some(4));
        assert_eq!(args.reuse.map(ReusePolicy::from), Some(ReusePolicy::OnDrain));
        assert_eq!(args.wav, Some(PathBuf::from("out.wav")));
        assert_eq!(args.config, PathBuf::from("boidsong.toml"));
        assert!(args.reset_every.is_none());
    }
}
