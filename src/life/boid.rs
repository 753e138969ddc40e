//! Boid kinematics: integration, hunting impulse and wall reflection.

use crate::core::geom::{DiscRng, Vec2};
use rand::Rng;

/// Half-width of the square simulation domain centred on the origin.
pub const DOMAIN_HALF_EXTENT: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boid {
    pub pos: Vec2,
    pub vel: Vec2,
    /// Set when the last integration step reflected off a wall.
    pub bounced: bool,
}

impl Boid {
    pub fn new(pos: Vec2, vel: Vec2) -> Self {
        Self {
            pos,
            vel,
            bounced: false,
        }
    }

    /// Advance one step.
    ///
    /// `hunt` is a raw unit-disc sample; its magnitude is cubed so small jumps
    /// dominate, then scaled by `hunt_urge`. Returns whether the boid bounced.
    pub fn integrate(&mut self, dt: f32, hunt: Vec2, hunt_urge: f32) -> bool {
        self.pos += self.vel * dt;
        self.vel += hunt * hunt.length_squared() * hunt_urge;

        self.bounced = false;
        if self.pos.x.abs() > DOMAIN_HALF_EXTENT {
            self.pos.x = DOMAIN_HALF_EXTENT.copysign(self.pos.x);
            self.vel.x = -self.vel.x;
            self.bounced = true;
        }
        if self.pos.y.abs() > DOMAIN_HALF_EXTENT {
            self.pos.y = DOMAIN_HALF_EXTENT.copysign(self.pos.y);
            self.vel.y = -self.vel.y;
            self.bounced = true;
        }
        self.bounced
    }
}

/// Fixed-size collection of boids; a boid's identity is its index.
#[derive(Debug, Clone)]
pub struct BoidStore {
    boids: Vec<Boid>,
}

impl BoidStore {
    pub fn new<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Self {
        let mut store = Self {
            boids: vec![Boid::new(Vec2::ZERO, Vec2::ZERO); count],
        };
        store.reset(rng);
        store
    }

    pub fn from_boids(boids: Vec<Boid>) -> Self {
        Self { boids }
    }

    /// Re-draw every position and velocity uniformly inside the unit disc.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for boid in &mut self.boids {
            let pos = rng.disc();
            let vel = rng.disc();
            *boid = Boid::new(pos, vel);
        }
    }

    /// Integrate every boid, drawing one hunting sample per boid.
    ///
    /// `hunt_urges[i]` is the urge for boid `i`; missing entries count as zero.
    /// Returns the number of boids that bounced.
    pub fn integrate<R: Rng + ?Sized>(&mut self, dt: f32, hunt_urges: &[f32], rng: &mut R) -> usize {
        let mut bounces = 0;
        for (idx, boid) in self.boids.iter_mut().enumerate() {
            let urge = hunt_urges.get(idx).copied().unwrap_or(0.0);
            let hunt = rng.disc();
            if boid.integrate(dt, hunt, urge) {
                bounces += 1;
            }
        }
        bounces
    }

    pub fn len(&self) -> usize {
        self.boids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boids.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Boid> {
        self.boids.get(idx)
    }

    pub fn boids(&self) -> &[Boid] {
        &self.boids
    }

    pub fn boids_mut(&mut self) -> &mut [Boid] {
        &mut self.boids
    }
}
