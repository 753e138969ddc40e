//! Audio-callback side of the voice bridge.
//!
//! The rack owns every voice instance. `pump` drains the event ring and
//! applies a frame's events only once that frame's commit marker has arrived;
//! `render` mixes all voices and reports finished releases back to the
//! simulation. Both run without locks, blocking or allocation: voice slots,
//! the staging buffer and the pending-ack list are sized once at construction.
//!
//! A batch that cannot be staged whole is left in the ring; the rack stalls
//! on it rather than apply part of a frame.

use super::events::VoiceEvent;
use super::handoff::VoiceFeed;
use super::voice::{AudioVoice, SineVoice, VoiceShape};
use crate::life::voice_ids::VoiceId;

struct Slot<V> {
    id: VoiceId,
    voice: V,
}

pub struct VoiceRack<V: AudioVoice = SineVoice> {
    feed: VoiceFeed,
    shape: VoiceShape,
    gain: f32,
    slots: Vec<Option<Slot<V>>>,
    staged: Vec<VoiceEvent>,
    /// Retire acks the back channel had no room for, oldest first.
    pending_acks: Vec<VoiceId>,
    batch_capacity: usize,
    committed_frame: u64,
    dropped_voices: u64,
    stalled: bool,
}

impl<V: AudioVoice> VoiceRack<V> {
    /// `voice_capacity` bounds simultaneous voices, releasing ones included.
    /// Each voice is mixed at `gain`.
    pub fn new(feed: VoiceFeed, shape: VoiceShape, voice_capacity: usize, gain: f32) -> Self {
        let batch_capacity = feed.capacity();
        let mut slots = Vec::with_capacity(voice_capacity);
        slots.resize_with(voice_capacity, || None);
        Self {
            feed,
            shape,
            gain,
            slots,
            staged: Vec::with_capacity(batch_capacity),
            pending_acks: Vec::with_capacity(batch_capacity),
            batch_capacity,
            committed_frame: 0,
            dropped_voices: 0,
            stalled: false,
        }
    }

    /// Last frame whose batch has been applied.
    pub fn committed_frame(&self) -> u64 {
        self.committed_frame
    }

    /// Voices currently sounding, releasing ones included.
    pub fn active_voices(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Ids with a voice that has not entered its release phase.
    pub fn held_ids(&self) -> impl Iterator<Item = VoiceId> + '_ {
        self.slots
            .iter()
            .flatten()
            .filter(|s| !s.voice.is_releasing())
            .map(|s| s.id)
    }

    /// Creates that found no free slot.
    pub fn dropped_voices(&self) -> u64 {
        self.dropped_voices
    }

    /// Set while the head of the ring is a batch too large to stage whole.
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Retire acks still waiting for room in the back channel.
    pub fn pending_acks(&self) -> usize {
        self.pending_acks.len()
    }

    /// Drain the event ring, applying every fully committed batch.
    pub fn pump(&mut self) {
        self.flush_acks();
        loop {
            let Some(&ev) = self.feed.peek() else {
                break;
            };
            match ev {
                VoiceEvent::Commit { frame } => {
                    // Any staged destroy may need a pending-ack slot.
                    if self.pending_acks.len() + self.staged.len() > self.batch_capacity {
                        break;
                    }
                    self.feed.pop();
                    self.apply_staged();
                    self.committed_frame = frame;
                    self.stalled = false;
                }
                other => {
                    if self.staged.len() == self.batch_capacity {
                        self.stalled = true;
                        break;
                    }
                    self.feed.pop();
                    self.staged.push(other);
                }
            }
        }
    }

    /// Overwrite `out` with the mix of all voices.
    pub fn render(&mut self, out: &mut [f32]) {
        self.flush_acks();
        out.fill(0.0);
        for slot in self.slots.iter_mut() {
            let Some(s) = slot else {
                continue;
            };
            s.voice.render_add(out, self.gain);
            // A finished voice holds its slot until the ack gets through.
            if s.voice.is_finished() && self.feed.ack_retired(s.id) {
                *slot = None;
            }
        }
    }

    fn flush_acks(&mut self) {
        let mut sent = 0;
        for &id in &self.pending_acks {
            if !self.feed.ack_retired(id) {
                break;
            }
            sent += 1;
        }
        self.pending_acks.drain(..sent);
    }

    fn apply_staged(&mut self) {
        for idx in 0..self.staged.len() {
            let ev = self.staged[idx];
            self.apply(ev);
        }
        self.staged.clear();
    }

    fn apply(&mut self, ev: VoiceEvent) {
        match ev {
            VoiceEvent::Created { id, params } => {
                match self.slots.iter_mut().find(|s| s.is_none()) {
                    Some(free) => {
                        *free = Some(Slot {
                            id,
                            voice: V::start(&self.shape, params),
                        });
                    }
                    None => self.dropped_voices += 1,
                }
            }
            VoiceEvent::ParamsChanged { id, params } => {
                if let Some(s) = self.held_mut(id) {
                    s.voice.set_params(params);
                }
            }
            VoiceEvent::Destroyed { id } => match self.held_mut(id) {
                Some(s) => s.voice.release(),
                // No voice was ever started for this id; retire it at once.
                None => {
                    if !self.pending_acks.is_empty() || !self.feed.ack_retired(id) {
                        self.pending_acks.push(id);
                    }
                }
            },
            VoiceEvent::Commit { .. } => {}
        }
    }

    fn held_mut(&mut self, id: VoiceId) -> Option<&mut Slot<V>> {
        self.slots
            .iter_mut()
            .flatten()
            .find(|s| s.id == id && !s.voice.is_releasing())
    }
}
