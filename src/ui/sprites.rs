//! Per-frame drawing capability, decoupled from the audio voices.

use crate::core::geom::Vec2;
use crate::life::boid::Boid;
use crate::life::group_tracker::Group;

/// Length of the tail drawn behind each boid, in domain units.
pub const TAIL_LEN: f32 = 0.07;

/// One boid as a head point plus a tail segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoidSprite {
    pub boid: usize,
    pub head: Vec2,
    pub tail: Vec2,
    /// Hue in `[0, 1]`, proportional to the size of the boid's group.
    pub hue: f32,
}

pub trait Renderable {
    fn draw(&self, out: &mut Vec<BoidSprite>);
}

/// A group together with the boids it refers to.
pub struct GroupView<'a> {
    pub group: &'a Group,
    pub boids: &'a [Boid],
}

impl Renderable for GroupView<'_> {
    fn draw(&self, out: &mut Vec<BoidSprite>) {
        let total = self.boids.len().max(1) as f32;
        let hue = self.group.len() as f32 / total;
        for &idx in self.group.members() {
            let Some(boid) = self.boids.get(idx) else {
                continue;
            };
            out.push(BoidSprite {
                boid: idx,
                head: boid.pos,
                tail: boid.pos - boid.vel.normalize_or_zero() * TAIL_LEN,
                hue,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::life::audio::events::VoiceEvent;
    use crate::life::group_tracker::GroupTracker;
    use crate::life::proximity::ProximityGraph;
    use crate::life::voice_ids::{ReusePolicy, VoiceIdAllocator};

    #[test]
    fn tail_trails_behind_velocity() {
        let boids = vec![
            Boid::new(Vec2::new(0.0, 0.0), Vec2::new(3.0, 0.0)),
            Boid::new(Vec2::new(0.1, 0.0), Vec2::new(0.0, -0.5)),
            Boid::new(Vec2::new(0.9, 0.9), Vec2::ZERO),
            Boid::new(Vec2::new(-0.9, 0.9), Vec2::ZERO),
        ];
        let mut graph = ProximityGraph::new(0.25, boids.len());
        graph.rebuild(&boids);
        let mut tracker = GroupTracker::new(boids.len());
        let mut ids = VoiceIdAllocator::new(boids.len(), ReusePolicy::OnNotify);
        let mut events: Vec<VoiceEvent> = Vec::new();
        tracker.reconcile(&graph, &mut ids, &mut events).unwrap();

        let mut sprites = Vec::new();
        GroupView {
            group: tracker.group_of(0).unwrap(),
            boids: &boids,
        }
        .draw(&mut sprites);
        assert_eq!(sprites.len(), 2);
        assert!((sprites[0].tail - Vec2::new(-TAIL_LEN, 0.0)).length() < 1e-6);
        assert!((sprites[1].tail - Vec2::new(0.1, TAIL_LEN)).length() < 1e-6);
        assert!(sprites.iter().all(|s| s.hue == 0.5));
    }
}
