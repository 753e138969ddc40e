use super::events::GroupParams;
use std::f32::consts::TAU;

/// Static synthesis settings shared by every voice of a rack.
#[derive(Debug, Clone, Copy)]
pub struct VoiceShape {
    pub sample_rate: f32,
    pub base_freq_hz: f32,
    pub attack_sec: f32,
    pub release_sec: f32,
    /// Time constant for pitch glides between membership changes.
    pub glide_sec: f32,
}

impl Default for VoiceShape {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            base_freq_hz: 440.0,
            attack_sec: 0.01,
            release_sec: 0.25,
            glide_sec: 0.02,
        }
    }
}

/// Sample-rate rendering capability of one group's voice.
pub trait AudioVoice: Send {
    fn start(shape: &VoiceShape, params: GroupParams) -> Self
    where
        Self: Sized;
    fn set_params(&mut self, params: GroupParams);
    /// Enter the release phase; the voice keeps sounding until it decays.
    fn release(&mut self);
    fn is_releasing(&self) -> bool;
    fn is_finished(&self) -> bool;
    /// Add `gain`-scaled output to `out`.
    fn render_add(&mut self, out: &mut [f32], gain: f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Attack,
    Sustain,
    Release,
    Done,
}

/// Sine oscillator with a linear attack/release envelope.
#[derive(Debug, Clone)]
pub struct SineVoice {
    base_freq_hz: f32,
    sample_dt: f32,
    phase: f32,
    current_pitch_hz: f32,
    target_pitch_hz: f32,
    pitch_alpha: f32,
    level: f32,
    attack_step: f32,
    release_step: f32,
    stage: Stage,
}

impl SineVoice {
    pub fn pitch_hz(&self) -> f32 {
        self.current_pitch_hz
    }

    pub fn target_pitch_hz(&self) -> f32 {
        self.target_pitch_hz
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    fn advance_envelope(&mut self) -> f32 {
        match self.stage {
            Stage::Attack => {
                self.level += self.attack_step;
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => {}
            Stage::Release => {
                self.level -= self.release_step;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Done;
                }
            }
            Stage::Done => {}
        }
        self.level
    }
}

impl AudioVoice for SineVoice {
    fn start(shape: &VoiceShape, params: GroupParams) -> Self {
        let sample_dt = if shape.sample_rate.is_finite() && shape.sample_rate > 0.0 {
            1.0 / shape.sample_rate
        } else {
            0.0
        };
        let pitch = params.pitch_hz(shape.base_freq_hz);
        Self {
            base_freq_hz: shape.base_freq_hz,
            sample_dt,
            phase: 0.0,
            current_pitch_hz: pitch,
            target_pitch_hz: pitch,
            pitch_alpha: smoothing_alpha(sample_dt, shape.glide_sec),
            level: 0.0,
            attack_step: ramp_step(sample_dt, shape.attack_sec),
            release_step: ramp_step(sample_dt, shape.release_sec),
            stage: Stage::Attack,
        }
    }

    fn set_params(&mut self, params: GroupParams) {
        let pitch = params.pitch_hz(self.base_freq_hz);
        if pitch.is_finite() && pitch > 0.0 {
            self.target_pitch_hz = pitch;
            if self.pitch_alpha >= 1.0 {
                self.current_pitch_hz = pitch;
            }
        }
    }

    fn release(&mut self) {
        if self.stage != Stage::Done {
            self.stage = Stage::Release;
        }
    }

    fn is_releasing(&self) -> bool {
        matches!(self.stage, Stage::Release | Stage::Done)
    }

    fn is_finished(&self) -> bool {
        self.stage == Stage::Done
    }

    fn render_add(&mut self, out: &mut [f32], gain: f32) {
        for sample in out.iter_mut() {
            if self.stage == Stage::Done {
                break;
            }
            self.current_pitch_hz =
                smooth_step(self.current_pitch_hz, self.target_pitch_hz, self.pitch_alpha);
            let level = self.advance_envelope();
            *sample += self.phase.sin() * level * gain;
            self.phase = (self.phase + TAU * self.current_pitch_hz * self.sample_dt) % TAU;
        }
    }
}

fn ramp_step(dt: f32, sec: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 || !sec.is_finite() || sec <= 0.0 {
        return 1.0;
    }
    (dt / sec).min(1.0)
}

fn smooth_step(current: f32, target: f32, alpha: f32) -> f32 {
    if !current.is_finite() {
        return target;
    }
    if !target.is_finite() {
        return current;
    }
    current + alpha * (target - current)
}

fn smoothing_alpha(dt: f32, tau_sec: f32) -> f32 {
    if !dt.is_finite() || dt <= 0.0 {
        return 1.0;
    }
    if !tau_sec.is_finite() || tau_sec <= 0.0 {
        return 1.0;
    }
    let alpha = 1.0 - (-dt / tau_sec).exp();
    if alpha.is_finite() {
        alpha.clamp(0.0, 1.0)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> VoiceShape {
        VoiceShape {
            sample_rate: 1_000.0,
            base_freq_hz: 100.0,
            attack_sec: 0.01,
            release_sec: 0.05,
            glide_sec: 0.0,
        }
    }

    #[test]
    fn attack_ramps_to_full_level() {
        let mut voice = SineVoice::start(&shape(), GroupParams::for_members(5));
        let mut out = vec![0.0; 10];
        voice.render_add(&mut out, 1.0);
        assert!((voice.level() - 1.0).abs() < 1e-6);
        assert!(!voice.is_releasing());
    }

    #[test]
    fn release_decays_then_finishes() {
        let mut voice = SineVoice::start(&shape(), GroupParams::for_members(1));
        let mut out = vec![0.0; 20];
        voice.render_add(&mut out, 1.0);
        voice.release();
        assert!(voice.is_releasing());
        assert!(!voice.is_finished());
        let mut tail = vec![0.0; 49];
        voice.render_add(&mut tail, 1.0);
        assert!(!voice.is_finished(), "release takes 50 samples");
        let mut rest = vec![0.0; 10];
        voice.render_add(&mut rest, 1.0);
        assert!(voice.is_finished());
        assert!(rest[1..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn output_is_bounded_by_gain() {
        let mut voice = SineVoice::start(&shape(), GroupParams::for_members(2));
        let mut out = vec![0.0; 500];
        voice.render_add(&mut out, 0.25);
        assert!(out.iter().all(|s| s.abs() <= 0.25 + 1e-6));
        assert!(out.iter().any(|s| s.abs() > 0.1));
    }

    #[test]
    fn param_change_retunes() {
        let mut voice = SineVoice::start(&shape(), GroupParams::for_members(5));
        assert_eq!(voice.pitch_hz(), 100.0);
        voice.set_params(GroupParams::for_members(4));
        let expected = 100.0 * 2f32.powf(9.0 / 12.0);
        assert!((voice.target_pitch_hz() - expected).abs() < 1e-3);
        assert!((voice.pitch_hz() - expected).abs() < 1e-3);
    }
}
