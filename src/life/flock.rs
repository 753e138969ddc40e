//! The per-frame simulation driver.
//!
//! One `step` runs, in order: reclaim drained voice ids, integrate with
//! group-size-scaled hunting, rebuild the proximity graph, apply pairwise
//! interaction, reconcile groups, and commit the frame's voice events.

use super::audio::events::{FrameLink, GroupParams};
use super::audio::handoff::min_event_capacity;
use super::boid::{Boid, BoidStore};
use super::group_tracker::{GroupTracker, ReconcileStats};
use super::interaction::{self, InteractionParams};
use super::proximity::ProximityGraph;
use super::voice_ids::{ReusePolicy, VoiceId, VoiceIdAllocator};
use crate::config::AppConfig;
use crate::error::FlockError;
use crate::ui::sprites::{BoidSprite, GroupView, Renderable};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlockParams {
    pub boid_count: usize,
    pub neighbor_radius: f32,
    pub interaction: InteractionParams,
    /// Hunting urge contributed by each member of a boid's group.
    pub hunt_urge_per_member: f32,
    pub reuse: ReusePolicy,
}

impl Default for FlockParams {
    fn default() -> Self {
        Self {
            boid_count: 16,
            neighbor_radius: 0.25,
            interaction: InteractionParams::default(),
            hunt_urge_per_member: 0.1,
            reuse: ReusePolicy::OnNotify,
        }
    }
}

impl From<&AppConfig> for FlockParams {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            boid_count: cfg.flock.boid_count,
            neighbor_radius: cfg.flock.neighbor_radius,
            interaction: InteractionParams {
                push_radius: cfg.flock.push_radius,
                push_strength: cfg.flock.push_strength,
                match_radius: cfg.flock.match_radius,
            },
            hunt_urge_per_member: cfg.flock.hunt_urge_per_member,
            reuse: cfg.voices.reuse,
        }
    }
}

/// Summary of one committed frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub frame: u64,
    pub groups: usize,
    pub bounces: usize,
    pub created: usize,
    pub destroyed: usize,
    pub params_changed: usize,
    pub splits: usize,
    /// Ids returned by the audio side before this frame ran.
    pub reclaimed: usize,
}

impl FrameReport {
    fn new(frame: u64, groups: usize, stats: ReconcileStats) -> Self {
        Self {
            frame,
            groups,
            created: stats.created,
            destroyed: stats.destroyed,
            params_changed: stats.params_changed,
            splits: stats.splits,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSnapshot {
    pub id: VoiceId,
    pub params: GroupParams,
    pub members: Vec<usize>,
}

/// Read-only view of the flock for a renderer or a test.
#[derive(Debug, Clone, PartialEq)]
pub struct FlockSnapshot {
    pub frame: u64,
    pub groups: Vec<GroupSnapshot>,
    pub sprites: Vec<BoidSprite>,
}

pub struct Flock<L: FrameLink> {
    params: FlockParams,
    store: BoidStore,
    graph: ProximityGraph,
    tracker: GroupTracker,
    ids: VoiceIdAllocator,
    link: L,
    rng: StdRng,
    urges: Vec<f32>,
    frame: u64,
}

impl<L: FrameLink> Flock<L> {
    /// Scatter `params.boid_count` boids, group them and commit frame 0.
    /// Without a seed the generator is seeded from the OS. Fails if `link`
    /// cannot carry one frame's worst-case batch.
    pub fn new(params: FlockParams, link: L, seed: Option<u64>) -> Result<Self, FlockError> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let store = BoidStore::new(params.boid_count, &mut rng);
        Self::assemble(params, link, store, rng)
    }

    /// Start from explicit boids; `params.boid_count` is taken from `boids`.
    pub fn with_boids(
        mut params: FlockParams,
        link: L,
        boids: Vec<Boid>,
        seed: u64,
    ) -> Result<Self, FlockError> {
        params.boid_count = boids.len();
        Self::assemble(
            params,
            link,
            BoidStore::from_boids(boids),
            StdRng::seed_from_u64(seed),
        )
    }

    fn assemble(
        params: FlockParams,
        link: L,
        store: BoidStore,
        rng: StdRng,
    ) -> Result<Self, FlockError> {
        let n = store.len();
        let needed = min_event_capacity(n);
        if let Some(capacity) = link.batch_capacity() {
            if capacity < needed {
                return Err(FlockError::EventRingTooSmall {
                    capacity,
                    boids: n,
                    needed,
                });
            }
        }
        let mut flock = Self {
            params,
            graph: ProximityGraph::new(params.neighbor_radius, n),
            tracker: GroupTracker::new(n),
            ids: VoiceIdAllocator::new(n, params.reuse),
            store,
            link,
            rng,
            urges: vec![0.0; n],
            frame: 0,
        };
        let stats = flock.refresh_groups()?;
        flock.link.commit(flock.frame);
        info!(
            boids = n,
            groups = flock.tracker.group_count(),
            created = stats.created,
            "flock ready"
        );
        Ok(flock)
    }

    /// Advance the simulation by `dt` seconds and commit the frame.
    pub fn step(&mut self, dt: f32) -> Result<FrameReport, FlockError> {
        let reclaimed = self.drain_retired();

        for (boid, urge) in self.urges.iter_mut().enumerate() {
            *urge = self.params.hunt_urge_per_member * self.tracker.group_size(boid) as f32;
        }
        let bounces = self.store.integrate(dt, &self.urges, &mut self.rng);
        interaction::apply(self.store.boids_mut(), &self.params.interaction);
        let stats = self.refresh_groups()?;

        self.frame += 1;
        self.link.commit(self.frame);

        let report = FrameReport {
            bounces,
            reclaimed,
            ..FrameReport::new(self.frame, self.tracker.group_count(), stats)
        };
        if !stats.is_quiet() {
            debug!(?report, "frame");
        }
        Ok(report)
    }

    /// Destroy every group, scatter the boids afresh and regroup them,
    /// all inside one committed frame.
    pub fn reset(&mut self) -> Result<FrameReport, FlockError> {
        let reclaimed = self.drain_retired();
        let destroyed = self.tracker.clear(&mut self.ids, &mut self.link);
        self.store.reset(&mut self.rng);
        let mut stats = self.refresh_groups()?;
        stats.destroyed += destroyed;

        self.frame += 1;
        self.link.commit(self.frame);
        info!(
            frame = self.frame,
            destroyed = stats.destroyed,
            created = stats.created,
            "flock reset"
        );
        Ok(FrameReport {
            reclaimed,
            ..FrameReport::new(self.frame, self.tracker.group_count(), stats)
        })
    }

    /// Rebuild the graph from current positions and reconcile groups without
    /// moving anything or committing.
    pub fn refresh_groups(&mut self) -> Result<ReconcileStats, FlockError> {
        self.graph.rebuild(self.store.boids());
        let stats = self
            .tracker
            .reconcile(&self.graph, &mut self.ids, &mut self.link)?;
        Ok(stats)
    }

    /// Hand every id the audio side has finished with back to the allocator.
    pub fn drain_retired(&mut self) -> usize {
        let mut reclaimed = 0;
        while let Some(id) = self.link.poll_retired() {
            if self.ids.reclaim(id) {
                reclaimed += 1;
            }
        }
        reclaimed
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn params(&self) -> &FlockParams {
        &self.params
    }

    pub fn boids(&self) -> &[Boid] {
        self.store.boids()
    }

    /// Direct access for scripted scenarios; call [`Flock::refresh_groups`]
    /// afterwards to regroup.
    pub fn boids_mut(&mut self) -> &mut [Boid] {
        self.store.boids_mut()
    }

    pub fn tracker(&self) -> &GroupTracker {
        &self.tracker
    }

    pub fn graph(&self) -> &ProximityGraph {
        &self.graph
    }

    pub fn ids(&self) -> &VoiceIdAllocator {
        &self.ids
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn into_link(self) -> L {
        self.link
    }

    /// Head and tail sprites for every boid, coloured by group size.
    pub fn sketch(&self) -> Vec<BoidSprite> {
        let mut sprites = Vec::with_capacity(self.store.len());
        for group in self.tracker.groups() {
            GroupView {
                group,
                boids: self.store.boids(),
            }
            .draw(&mut sprites);
        }
        sprites
    }

    pub fn snapshot(&self) -> FlockSnapshot {
        FlockSnapshot {
            frame: self.frame,
            groups: self
                .tracker
                .groups()
                .map(|g| GroupSnapshot {
                    id: g.id(),
                    params: g.params(),
                    members: g.members().iter().copied().collect(),
                })
                .collect(),
            sprites: self.sketch(),
        }
    }
}
