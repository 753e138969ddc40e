//! Lock-free handoff between the frame-rate simulation and the audio callback.
//!
//! Two single-producer/single-consumer rings:
//! * events, sim -> audio: lifecycle notifications, each frame closed by
//!   [`VoiceEvent::Commit`];
//! * retired ids, audio -> sim: voices that finished their release.
//!
//! The sim side never blocks. Events that do not fit stay queued in order
//! and are retried on the next commit.

use super::events::{FrameLink, GroupParams, VoiceBridge, VoiceEvent};
use crate::life::voice_ids::VoiceId;
use ringbuf::traits::*;
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::collections::VecDeque;
use tracing::warn;

/// Smallest event ring that holds one frame's worst-case batch
/// (every group destroyed and recreated, plus the commit marker).
pub fn min_event_capacity(boid_count: usize) -> usize {
    boid_count.saturating_mul(4).saturating_add(4)
}

/// Create a connected outbox/feed pair.
pub fn voice_channel(event_capacity: usize, retire_capacity: usize) -> (EventOutbox, VoiceFeed) {
    let (event_prod, event_cons) = HeapRb::<VoiceEvent>::new(event_capacity.max(1)).split();
    let (retire_prod, retire_cons) = HeapRb::<VoiceId>::new(retire_capacity.max(1)).split();
    (
        EventOutbox {
            events: event_prod,
            retired: retire_cons,
            pending: VecDeque::new(),
            capacity: event_capacity.max(1),
        },
        VoiceFeed {
            events: event_cons,
            retired: retire_prod,
            capacity: event_capacity.max(1),
        },
    )
}

/// Simulation-side end of the handoff.
pub struct EventOutbox {
    events: HeapProd<VoiceEvent>,
    retired: HeapCons<VoiceId>,
    pending: VecDeque<VoiceEvent>,
    capacity: usize,
}

impl EventOutbox {
    /// Events emitted or committed but not yet pushed into the ring.
    pub fn backlog(&self) -> usize {
        self.pending.len()
    }

    fn flush(&mut self) {
        while let Some(&ev) = self.pending.front() {
            if self.events.try_push(ev).is_err() {
                break;
            }
            self.pending.pop_front();
        }
    }
}

impl VoiceBridge for EventOutbox {
    fn group_created(&mut self, id: VoiceId, params: GroupParams) {
        self.pending.push_back(VoiceEvent::Created { id, params });
    }

    fn group_params_changed(&mut self, id: VoiceId, params: GroupParams) {
        self.pending.push_back(VoiceEvent::ParamsChanged { id, params });
    }

    fn group_destroyed(&mut self, id: VoiceId) {
        self.pending.push_back(VoiceEvent::Destroyed { id });
    }
}

impl FrameLink for EventOutbox {
    fn commit(&mut self, frame: u64) {
        self.pending.push_back(VoiceEvent::Commit { frame });
        self.flush();
        if !self.pending.is_empty() {
            warn!(
                frame,
                backlog = self.pending.len(),
                "voice event ring full; deferring"
            );
        }
    }

    fn poll_retired(&mut self) -> Option<VoiceId> {
        self.retired.try_pop()
    }

    fn batch_capacity(&self) -> Option<usize> {
        Some(self.capacity)
    }
}

/// Audio-side end of the handoff. Never allocates or blocks.
pub struct VoiceFeed {
    events: HeapCons<VoiceEvent>,
    retired: HeapProd<VoiceId>,
    capacity: usize,
}

impl VoiceFeed {
    pub fn pop(&mut self) -> Option<VoiceEvent> {
        self.events.try_pop()
    }

    pub fn peek(&self) -> Option<&VoiceEvent> {
        self.events.try_peek()
    }

    /// Report that `id`'s voice has fully decayed. Returns false if the
    /// back channel is full; the caller should retry later.
    pub fn ack_retired(&mut self, id: VoiceId) -> bool {
        self.retired.try_push(id).is_ok()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
