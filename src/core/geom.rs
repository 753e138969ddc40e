//! 2D geometry helpers for the flock domain `[-1, 1] x [-1, 1]`.

use rand::Rng;

pub use glam::Vec2;

/// Uniform sample inside the closed unit disc (rejection sampling).
pub fn sample_disc<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    loop {
        let p = Vec2::new(rng.random_range(-1.0..=1.0), rng.random_range(-1.0..=1.0));
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}

/// `rng.disc()` for any random source.
pub trait DiscRng {
    fn disc(&mut self) -> Vec2;
}

impl<R: Rng + ?Sized> DiscRng for R {
    fn disc(&mut self) -> Vec2 {
        sample_disc(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn disc_samples_stay_inside_and_center() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let mut mean = Vec2::ZERO;
        let n = 4_000;
        for _ in 0..n {
            let p = rng.disc();
            assert!(p.length() <= 1.0 + 1e-6, "{p:?}");
            mean += p;
        }
        mean /= n as f32;
        assert!(mean.length() < 0.05, "mean drifted: {mean:?}");
    }

    #[test]
    fn disc_is_not_concentrated_on_the_rim() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let inner = (0..2_000)
            .filter(|_| rng.disc().length() < std::f32::consts::FRAC_1_SQRT_2)
            .count();
        // Half the disc area lies inside radius 1/sqrt(2).
        assert!((800..1_200).contains(&inner), "inner={inner}");
    }
}
