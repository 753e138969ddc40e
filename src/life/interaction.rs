//! Pairwise boid interaction: collision avoidance and velocity matching.
//!
//! Both use Gaussian falloffs instead of inverse-square weights, so coincident
//! boids never produce infinities. Every ordered pair `(i, j)`, `i != j`, is
//! visited in row-major order and updates are applied immediately: a velocity
//! read for a later pair already includes earlier updates of the same frame.

use super::boid::Boid;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionParams {
    pub push_radius: f32,
    pub push_strength: f32,
    pub match_radius: f32,
}

impl Default for InteractionParams {
    fn default() -> Self {
        Self {
            push_radius: 0.05,
            push_strength: 1.0,
            match_radius: 0.125,
        }
    }
}

fn gaussian(dist: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    let r = dist / radius;
    (-(r * r)).exp()
}

/// Apply avoidance and velocity matching to every ordered pair.
pub fn apply(boids: &mut [Boid], params: &InteractionParams) {
    let n = boids.len();
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let ds = boids[i].pos - boids[j].pos;
            let dist = ds.length();

            let push = gaussian(dist, params.push_radius) * params.push_strength;
            let push_vec = ds.normalize_or_zero() * push;
            boids[i].vel += push_vec;
            boids[j].vel -= push_vec;

            let nearness = gaussian(dist, params.match_radius);
            let vi = boids[i].vel;
            let vj = boids[j].vel;
            let pull = 0.5 * nearness;
            boids[i].vel = vi * (1.0 - pull) + vj * pull;
            boids[j].vel = vj * (1.0 - pull) + vi * pull;
        }
    }
}
