//! Reusable voice ids bound to group lifetimes.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

pub type VoiceId = u64;

/// Practical ceiling for probing; reaching it means ids are leaking.
pub const MAX_VOICE_ID: VoiceId = (1 << 31) - 1;

/// When a released id may be handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReusePolicy {
    /// Free as soon as the destroy notification has been issued.
    #[default]
    OnNotify,
    /// Quarantined until the audio side reports the voice has drained.
    OnDrain,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    #[error("voice id space exhausted while probing from preferred id {preferred}")]
    IdSpaceExhausted { preferred: VoiceId },
}

#[derive(Debug, Clone)]
pub struct VoiceIdAllocator {
    stride: VoiceId,
    policy: ReusePolicy,
    in_use: HashSet<VoiceId>,
    draining: HashSet<VoiceId>,
}

impl VoiceIdAllocator {
    /// `stride` is the probe step, normally the boid count.
    pub fn new(stride: usize, policy: ReusePolicy) -> Self {
        Self {
            stride: stride.max(1) as VoiceId,
            policy,
            in_use: HashSet::new(),
            draining: HashSet::new(),
        }
    }

    pub fn policy(&self) -> ReusePolicy {
        self.policy
    }

    fn is_taken(&self, id: VoiceId) -> bool {
        self.in_use.contains(&id) || self.draining.contains(&id)
    }

    /// Claim `preferred` if free, otherwise probe `preferred + k * stride`.
    pub fn acquire(&mut self, preferred: VoiceId) -> Result<VoiceId, AllocError> {
        let exhausted = AllocError::IdSpaceExhausted { preferred };
        let mut candidate = preferred;
        while self.is_taken(candidate) {
            candidate = candidate
                .checked_add(self.stride)
                .ok_or(exhausted)?;
        }
        if candidate > MAX_VOICE_ID {
            return Err(exhausted);
        }
        self.in_use.insert(candidate);
        Ok(candidate)
    }

    /// Return an id whose group just became empty. Returns false for ids
    /// that were not in use.
    pub fn release(&mut self, id: VoiceId) -> bool {
        if !self.in_use.remove(&id) {
            return false;
        }
        if self.policy == ReusePolicy::OnDrain {
            self.draining.insert(id);
        }
        true
    }

    /// The audio side finished with `id`; make it available again.
    pub fn reclaim(&mut self, id: VoiceId) -> bool {
        self.draining.remove(&id)
    }

    pub fn is_in_use(&self, id: VoiceId) -> bool {
        self.in_use.contains(&id)
    }

    pub fn is_draining(&self, id: VoiceId) -> bool {
        self.draining.contains(&id)
    }

    pub fn in_use_count(&self) -> usize {
        self.in_use.len()
    }

    pub fn draining_count(&self) -> usize {
        self.draining.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_id_is_claimed_when_free() {
        let mut ids = VoiceIdAllocator::new(16, ReusePolicy::OnNotify);
        assert_eq!(ids.acquire(3), Ok(3));
        assert!(ids.is_in_use(3));
    }

    #[test]
    fn collisions_step_by_stride() {
        let mut ids = VoiceIdAllocator::new(16, ReusePolicy::OnNotify);
        assert_eq!(ids.acquire(5), Ok(5));
        assert_eq!(ids.acquire(5), Ok(21));
        assert_eq!(ids.acquire(5), Ok(37));
        assert_eq!(ids.in_use_count(), 3);
    }

    #[test]
    fn released_id_is_reused_on_notify() {
        let mut ids = VoiceIdAllocator::new(16, ReusePolicy::OnNotify);
        ids.acquire(2).unwrap();
        assert!(ids.release(2));
        assert!(!ids.release(2), "double release is rejected");
        assert_eq!(ids.acquire(2), Ok(2));
    }

    #[test]
    fn drain_policy_quarantines_until_reclaimed() {
        let mut ids = VoiceIdAllocator::new(8, ReusePolicy::OnDrain);
        ids.acquire(1).unwrap();
        ids.release(1);
        assert!(ids.is_draining(1));
        assert_eq!(ids.acquire(1), Ok(9));
        assert!(ids.reclaim(1));
        assert_eq!(ids.acquire(1), Ok(1));
    }

    #[test]
    fn probing_past_ceiling_fails_loudly() {
        let mut ids = VoiceIdAllocator::new(1, ReusePolicy::OnNotify);
        assert_eq!(ids.acquire(MAX_VOICE_ID), Ok(MAX_VOICE_ID));
        assert_eq!(
            ids.acquire(MAX_VOICE_ID),
            Err(AllocError::IdSpaceExhausted {
                preferred: MAX_VOICE_ID
            })
        );
    }
}
