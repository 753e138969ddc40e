//! Persistent group identity over the per-frame proximity graph.
//!
//! `reconcile` runs two passes over the boids in ascending index order:
//!
//! * merge: the component reached from each boid is absorbed into that boid's
//!   group (or a fresh group when it has none); groups left empty are destroyed
//!   and their ids released.
//! * split: when a boid reaches fewer boids than its group holds, the boid's
//!   piece keeps the group and its id, and the rest of the group moves to a
//!   fresh group. A remainder that is itself fractured splits again when its
//!   own lowest member comes up.
//!
//! The merge pass always completes before the split pass starts, so splits are
//! judged against the merged topology. Create and change notifications are
//! issued once per pass pair, after both passes, so an unchanged graph produces
//! no notifications at all.

use super::audio::events::{GroupParams, VoiceBridge};
use super::proximity::ProximityGraph;
use super::voice_ids::{AllocError, VoiceId, VoiceIdAllocator};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::debug;

/// Arena slot of a live group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(usize);

#[derive(Debug, Clone)]
pub struct Group {
    id: VoiceId,
    members: BTreeSet<usize>,
    params: GroupParams,
    /// Params last sent to the bridge; `None` until the group is announced.
    announced: Option<GroupParams>,
}

impl Group {
    fn new(id: VoiceId) -> Self {
        Self {
            id,
            members: BTreeSet::new(),
            params: GroupParams::for_members(0),
            announced: None,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn members(&self) -> &BTreeSet<usize> {
        &self.members
    }

    pub fn params(&self) -> GroupParams {
        self.params
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn lowest_member(&self) -> Option<usize> {
        self.members.first().copied()
    }
}

/// Tracker failures. Everything except `Alloc` is an invariant violation,
/// i.e. a bug in the tracker rather than a runtime condition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
    #[error(transparent)]
    Alloc(#[from] AllocError),
    #[error("boid {boid} has a stale group back-reference")]
    StaleBackReference { boid: usize },
    #[error(
        "group {id} holds {group_len} boids but the component of boid {boid} has {component_len}"
    )]
    PartitionViolation {
        id: VoiceId,
        boid: usize,
        group_len: usize,
        component_len: usize,
    },
    #[error("group {id} is alive with no members")]
    EmptyGroup { id: VoiceId },
    #[error("voice id {id} is held by more than one live group")]
    DuplicateVoiceId { id: VoiceId },
    #[error("graph covers {graph} boids but the tracker holds {boids}")]
    GraphSizeMismatch { graph: usize, boids: usize },
}

/// What one reconciliation changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub destroyed: usize,
    pub params_changed: usize,
    /// Boid moves between groups.
    pub moved: usize,
    pub splits: usize,
}

impl ReconcileStats {
    pub fn is_quiet(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct GroupTracker {
    slots: Vec<Option<Group>>,
    free_slots: Vec<usize>,
    /// boid -> owning group
    owner: Vec<Option<GroupKey>>,
}

impl GroupTracker {
    pub fn new(boid_count: usize) -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            owner: vec![None; boid_count],
        }
    }

    pub fn boid_count(&self) -> usize {
        self.owner.len()
    }

    pub fn group(&self, key: GroupKey) -> Option<&Group> {
        self.slots.get(key.0).and_then(Option::as_ref)
    }

    pub fn group_key_of(&self, boid: usize) -> Option<GroupKey> {
        self.owner.get(boid).copied().flatten()
    }

    pub fn group_of(&self, boid: usize) -> Option<&Group> {
        self.group_key_of(boid).and_then(|key| self.group(key))
    }

    /// Member count of the boid's group; zero when ungrouped.
    pub fn group_size(&self, boid: usize) -> usize {
        self.group_of(boid).map_or(0, Group::len)
    }

    /// Live groups in arena order.
    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.slots.iter().flatten()
    }

    pub fn group_count(&self) -> usize {
        self.groups().count()
    }

    pub fn find_by_id(&self, id: VoiceId) -> Option<&Group> {
        self.groups().find(|g| g.id == id)
    }

    /// Destroy every group, notifying the bridge and releasing ids.
    /// Returns the number of destroy notifications issued.
    pub fn clear<B: VoiceBridge + ?Sized>(
        &mut self,
        ids: &mut VoiceIdAllocator,
        bridge: &mut B,
    ) -> usize {
        let mut destroyed = 0;
        for group in self.slots.drain(..).flatten() {
            if group.announced.is_some() {
                bridge.group_destroyed(group.id);
                destroyed += 1;
            }
            ids.release(group.id);
        }
        self.free_slots.clear();
        self.owner.fill(None);
        debug!(destroyed, "cleared all groups");
        destroyed
    }

    /// Bring group membership in line with `graph`.
    pub fn reconcile<B: VoiceBridge + ?Sized>(
        &mut self,
        graph: &ProximityGraph,
        ids: &mut VoiceIdAllocator,
        bridge: &mut B,
    ) -> Result<ReconcileStats, TrackerError> {
        if graph.len() != self.owner.len() {
            return Err(TrackerError::GraphSizeMismatch {
                graph: graph.len(),
                boids: self.owner.len(),
            });
        }
        let mut stats = ReconcileStats::default();
        self.merge_pass(graph, ids, bridge, &mut stats)?;
        self.split_pass(graph, ids, &mut stats)?;
        self.announce(bridge, &mut stats);
        self.verify(graph)?;
        Ok(stats)
    }

    fn merge_pass<B: VoiceBridge + ?Sized>(
        &mut self,
        graph: &ProximityGraph,
        ids: &mut VoiceIdAllocator,
        bridge: &mut B,
        stats: &mut ReconcileStats,
    ) -> Result<(), TrackerError> {
        for b in 0..self.owner.len() {
            let reach = graph.component(b);
            let target = match self.owner[b] {
                Some(key) => key,
                None => {
                    let id = ids.acquire(b as VoiceId)?;
                    debug!(id, boid = b, "opening group");
                    self.insert_group(id)
                }
            };
            for &m in &reach {
                match self.owner[m] {
                    Some(key) if key == target => continue,
                    Some(old) => self.detach(m, old, ids, bridge, stats),
                    None => {}
                }
                self.attach(m, target);
                stats.moved += 1;
            }
            self.refresh_params(target);
        }
        Ok(())
    }

    fn split_pass(
        &mut self,
        graph: &ProximityGraph,
        ids: &mut VoiceIdAllocator,
        stats: &mut ReconcileStats,
    ) -> Result<(), TrackerError> {
        for b in 0..self.owner.len() {
            let Some(key) = self.owner[b] else {
                continue;
            };
            let Some(group) = self.group(key) else {
                continue;
            };
            let reach = graph.component(b);
            // After the merge pass every component sits inside a single group,
            // so a smaller reach means the group has fractured.
            if reach.len() >= group.len() {
                continue;
            }
            let original_id = group.id;
            let remainder: Vec<usize> = group
                .members
                .iter()
                .copied()
                .filter(|m| reach.binary_search(m).is_err())
                .collect();
            let Some(&lowest) = remainder.first() else {
                continue;
            };

            let id = ids.acquire(lowest as VoiceId)?;
            let split_key = self.insert_group(id);
            if let Some(original) = self.slots[key.0].as_mut() {
                for m in &remainder {
                    original.members.remove(m);
                }
            }
            for &m in &remainder {
                self.attach(m, split_key);
            }
            stats.moved += remainder.len();
            stats.splits += 1;
            self.refresh_params(key);
            self.refresh_params(split_key);
            debug!(
                original_id,
                id,
                kept = reach.len(),
                carved = remainder.len(),
                "group split"
            );
        }
        Ok(())
    }

    fn announce<B: VoiceBridge + ?Sized>(&mut self, bridge: &mut B, stats: &mut ReconcileStats) {
        for group in self.slots.iter_mut().flatten() {
            match group.announced {
                None => {
                    bridge.group_created(group.id, group.params);
                    stats.created += 1;
                }
                Some(prev) if prev != group.params => {
                    bridge.group_params_changed(group.id, group.params);
                    stats.params_changed += 1;
                }
                Some(_) => continue,
            }
            group.announced = Some(group.params);
        }
    }

    /// Check the partition invariant: every boid's back-reference is live
    /// and mutual, and every group is exactly one component of `graph`.
    pub fn verify(&self, graph: &ProximityGraph) -> Result<(), TrackerError> {
        for (boid, owner) in self.owner.iter().enumerate() {
            let holds = owner
                .and_then(|key| self.group(key))
                .is_some_and(|g| g.members.contains(&boid));
            if !holds {
                return Err(TrackerError::StaleBackReference { boid });
            }
        }

        let mut seen = HashSet::new();
        for (idx, slot) in self.slots.iter().enumerate() {
            let Some(group) = slot else {
                continue;
            };
            if !seen.insert(group.id) {
                return Err(TrackerError::DuplicateVoiceId { id: group.id });
            }
            for &m in &group.members {
                if self.group_key_of(m) != Some(GroupKey(idx)) {
                    return Err(TrackerError::StaleBackReference { boid: m });
                }
            }
            let Some(lowest) = group.lowest_member() else {
                return Err(TrackerError::EmptyGroup { id: group.id });
            };
            let component = graph.component(lowest);
            let same = component.len() == group.len()
                && component.iter().all(|m| group.members.contains(m));
            if !same {
                return Err(TrackerError::PartitionViolation {
                    id: group.id,
                    boid: lowest,
                    group_len: group.len(),
                    component_len: component.len(),
                });
            }
        }
        Ok(())
    }

    fn insert_group(&mut self, id: VoiceId) -> GroupKey {
        let group = Group::new(id);
        match self.free_slots.pop() {
            Some(idx) => {
                self.slots[idx] = Some(group);
                GroupKey(idx)
            }
            None => {
                self.slots.push(Some(group));
                GroupKey(self.slots.len() - 1)
            }
        }
    }

    fn attach(&mut self, boid: usize, key: GroupKey) {
        if let Some(group) = self.slots[key.0].as_mut() {
            group.members.insert(boid);
        }
        self.owner[boid] = Some(key);
    }

    /// Remove `boid` from its group, destroying the group if it empties.
    fn detach<B: VoiceBridge + ?Sized>(
        &mut self,
        boid: usize,
        key: GroupKey,
        ids: &mut VoiceIdAllocator,
        bridge: &mut B,
        stats: &mut ReconcileStats,
    ) {
        self.owner[boid] = None;
        let Some(group) = self.slots[key.0].as_mut() else {
            return;
        };
        group.members.remove(&boid);
        if !group.members.is_empty() {
            return;
        }
        let id = group.id;
        let announced = group.announced.is_some();
        self.slots[key.0] = None;
        self.free_slots.push(key.0);
        // The destroy notification goes out before the id becomes reusable.
        if announced {
            bridge.group_destroyed(id);
            stats.destroyed += 1;
        }
        ids.release(id);
        debug!(id, "group absorbed");
    }

    fn refresh_params(&mut self, key: GroupKey) {
        if let Some(group) = self.slots[key.0].as_mut() {
            group.params = GroupParams::for_members(group.members.len());
        }
    }
}
