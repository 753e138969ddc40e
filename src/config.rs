use crate::error::ConfigError;
pub use crate::life::audio::handoff::min_event_capacity;
use crate::life::voice_ids::ReusePolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlockConfig {
    #[serde(default = "FlockConfig::default_boid_count")]
    pub boid_count: usize,
    #[serde(default = "FlockConfig::default_neighbor_radius")]
    pub neighbor_radius: f32,
    #[serde(default = "FlockConfig::default_push_radius")]
    pub push_radius: f32,
    #[serde(default = "FlockConfig::default_push_strength")]
    pub push_strength: f32,
    #[serde(default = "FlockConfig::default_match_radius")]
    pub match_radius: f32,
    #[serde(default = "FlockConfig::default_hunt_urge_per_member")]
    pub hunt_urge_per_member: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl FlockConfig {
    fn default_boid_count() -> usize {
        16
    }
    fn default_neighbor_radius() -> f32 {
        0.25
    }
    fn default_push_radius() -> f32 {
        0.05
    }
    fn default_push_strength() -> f32 {
        1.0
    }
    fn default_match_radius() -> f32 {
        0.125
    }
    fn default_hunt_urge_per_member() -> f32 {
        0.1
    }
}

impl Default for FlockConfig {
    fn default() -> Self {
        Self {
            boid_count: Self::default_boid_count(),
            neighbor_radius: Self::default_neighbor_radius(),
            push_radius: Self::default_push_radius(),
            push_strength: Self::default_push_strength(),
            match_radius: Self::default_match_radius(),
            hunt_urge_per_member: Self::default_hunt_urge_per_member(),
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "AudioConfig::default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "AudioConfig::default_base_freq_hz")]
    pub base_freq_hz: f32,
    #[serde(default = "AudioConfig::default_attack_sec")]
    pub attack_sec: f32,
    #[serde(default = "AudioConfig::default_release_sec")]
    pub release_sec: f32,
    #[serde(default = "AudioConfig::default_pitch_glide_sec")]
    pub pitch_glide_sec: f32,
    #[serde(default = "AudioConfig::default_event_capacity")]
    pub event_capacity: usize,
}

impl AudioConfig {
    fn default_sample_rate() -> u32 {
        44_100
    }
    fn default_base_freq_hz() -> f32 {
        440.0
    }
    fn default_attack_sec() -> f32 {
        0.01
    }
    fn default_release_sec() -> f32 {
        0.25
    }
    fn default_pitch_glide_sec() -> f32 {
        0.02
    }
    fn default_event_capacity() -> usize {
        1024
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: Self::default_sample_rate(),
            base_freq_hz: Self::default_base_freq_hz(),
            attack_sec: Self::default_attack_sec(),
            release_sec: Self::default_release_sec(),
            pitch_glide_sec: Self::default_pitch_glide_sec(),
            event_capacity: Self::default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VoicesConfig {
    #[serde(default)]
    pub reuse: ReusePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "RunConfig::default_fps")]
    pub fps: f32,
    #[serde(default = "RunConfig::default_frames")]
    pub frames: u64,
}

impl RunConfig {
    fn default_fps() -> f32 {
        60.0
    }
    fn default_frames() -> u64 {
        600
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            fps: Self::default_fps(),
            frames: Self::default_frames(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub flock: FlockConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub voices: VoicesConfig,
    #[serde(default)]
    pub run: RunConfig,
}

impl AppConfig {
    fn format_f32_compact(x: f32) -> String {
        let mut s = format!("{:.6}", x);
        while s.contains('.') && s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
        if s.is_empty() { "0".to_string() } else { s }
    }

    /// Strict load: the file must exist and parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path` if it exists; otherwise write commented-out defaults there
    /// and return the defaults. Unreadable or malformed files fall back to
    /// defaults with a warning.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            return match Self::load(path) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("{err}. Using defaults.");
                    Self::default()
                }
            };
        }

        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                if let Err(err) = fs::write(path, Self::comment_out(&text)) {
                    warn!("Failed to write default config to {}: {err}", path.display());
                }
            }
            Err(err) => warn!("Failed to serialize default config: {err}"),
        }
        default_cfg
    }

    fn comment_out(text: &str) -> String {
        let mut commented = String::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                commented.push('\n');
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                commented.push_str(line);
                commented.push('\n');
                continue;
            }
            let mut out_line = line.to_string();
            if let Some((lhs, rhs)) = line.split_once('=') {
                let rhs_trim = rhs.trim();
                let has_decimal = rhs_trim.contains('.');
                if (has_decimal || rhs_trim.contains('e') || rhs_trim.contains('E'))
                    && !rhs_trim.contains('"')
                {
                    if let Ok(val) = rhs_trim.parse::<f32>() {
                        let mut formatted = Self::format_f32_compact(val);
                        if has_decimal && !formatted.contains('.') {
                            formatted.push_str(".0");
                        }
                        out_line = format!("{} = {}", lhs.trim(), formatted);
                    }
                }
            }
            commented.push_str("# ");
            commented.push_str(&out_line);
            commented.push('\n');
        }
        commented
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |name: &str, v: f32| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{name} must be positive, got {v}")))
            }
        };
        let non_negative = |name: &str, v: f32| {
            if v.is_finite() && v >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "{name} must be non-negative, got {v}"
                )))
            }
        };

        let f = &self.flock;
        if f.boid_count == 0 {
            return Err(ConfigError::Invalid("flock.boid_count must be at least 1".into()));
        }
        positive("flock.neighbor_radius", f.neighbor_radius)?;
        positive("flock.push_radius", f.push_radius)?;
        positive("flock.match_radius", f.match_radius)?;
        non_negative("flock.push_strength", f.push_strength)?;
        non_negative("flock.hunt_urge_per_member", f.hunt_urge_per_member)?;

        let a = &self.audio;
        if a.sample_rate == 0 {
            return Err(ConfigError::Invalid("audio.sample_rate must be positive".into()));
        }
        positive("audio.base_freq_hz", a.base_freq_hz)?;
        non_negative("audio.attack_sec", a.attack_sec)?;
        non_negative("audio.release_sec", a.release_sec)?;
        non_negative("audio.pitch_glide_sec", a.pitch_glide_sec)?;
        let needed = min_event_capacity(f.boid_count);
        if a.event_capacity < needed {
            return Err(ConfigError::Invalid(format!(
                "audio.event_capacity {} is below {needed} for {} boids",
                a.event_capacity, f.boid_count
            )));
        }

        positive("run.fps", self.run.fps)?;
        Ok(())
    }
}
