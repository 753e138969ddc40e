pub type Tick = u64;

/// Frame clock shared by the simulation loop and the audio renderer.
///
/// The simulation advances once per frame; the audio side renders
/// `sample_rate / fps` samples per frame, carrying the fractional part so
/// that long runs do not drift.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    pub sample_rate: u32,
    pub fps: f32,
}

impl FrameClock {
    pub fn frame_dt(&self) -> f32 {
        if self.fps.is_finite() && self.fps > 0.0 {
            1.0 / self.fps
        } else {
            0.0
        }
    }

    pub fn frame_start_tick(&self, frame_idx: u64) -> Tick {
        if !self.fps.is_finite() || self.fps <= 0.0 {
            return 0;
        }
        (frame_idx as f64 * self.sample_rate as f64 / self.fps as f64).floor() as Tick
    }

    pub fn frame_end_tick(&self, frame_idx: u64) -> Tick {
        self.frame_start_tick(frame_idx.saturating_add(1))
    }

    pub fn samples_in_frame(&self, frame_idx: u64) -> usize {
        self.frame_end_tick(frame_idx)
            .saturating_sub(self.frame_start_tick(frame_idx)) as usize
    }

    pub fn tick_to_sec(&self, t: Tick) -> f32 {
        t as f32 / self.sample_rate.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::FrameClock;

    #[test]
    fn frame_bounds() {
        let clock = FrameClock {
            sample_rate: 44_100,
            fps: 60.0,
        };
        assert_eq!(clock.frame_start_tick(10), 7_350);
        assert_eq!(clock.frame_end_tick(10), 8_085);
        assert_eq!(clock.samples_in_frame(10), 735);
    }

    #[test]
    fn fractional_frames_do_not_drift() {
        let clock = FrameClock {
            sample_rate: 48_000,
            fps: 70.0,
        };
        let total: usize = (0..70).map(|f| clock.samples_in_frame(f)).sum();
        assert_eq!(total, 48_000);
        let lens: Vec<usize> = (0..70).map(|f| clock.samples_in_frame(f)).collect();
        assert!(lens.iter().all(|&n| n == 685 || n == 686), "{lens:?}");
    }

    #[test]
    fn degenerate_fps_is_silent() {
        let clock = FrameClock {
            sample_rate: 48_000,
            fps: 0.0,
        };
        assert_eq!(clock.frame_dt(), 0.0);
        assert_eq!(clock.samples_in_frame(3), 0);
    }
}
