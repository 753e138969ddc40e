use crate::life::voice_ids::VoiceId;

/// Pentatonic scale degrees in semitones above the base pitch.
pub const PENTATONIC: [u8; 5] = [0, 2, 4, 7, 9];

/// Audio parameters derived from a group's membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupParams {
    pub members: u32,
    /// Semitones above the base pitch.
    pub semitones: u8,
}

impl GroupParams {
    pub fn for_members(members: usize) -> Self {
        Self {
            members: members as u32,
            semitones: PENTATONIC[members % PENTATONIC.len()],
        }
    }

    pub fn pitch_hz(&self, base_freq_hz: f32) -> f32 {
        base_freq_hz * 2f32.powf(self.semitones as f32 / 12.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceEvent {
    Created { id: VoiceId, params: GroupParams },
    ParamsChanged { id: VoiceId, params: GroupParams },
    Destroyed { id: VoiceId },
    /// End of one frame's batch.
    Commit { frame: u64 },
}

impl VoiceEvent {
    pub fn id(&self) -> Option<VoiceId> {
        match *self {
            VoiceEvent::Created { id, .. }
            | VoiceEvent::ParamsChanged { id, .. }
            | VoiceEvent::Destroyed { id } => Some(id),
            VoiceEvent::Commit { .. } => None,
        }
    }
}

/// Group lifecycle notifications consumed by the audio subsystem.
pub trait VoiceBridge {
    fn group_created(&mut self, id: VoiceId, params: GroupParams);
    fn group_params_changed(&mut self, id: VoiceId, params: GroupParams);
    /// The group is gone; the voice should enter its release phase.
    fn group_destroyed(&mut self, id: VoiceId);
}

/// Frame-level plumbing around a [`VoiceBridge`].
pub trait FrameLink: VoiceBridge {
    /// Publish everything emitted since the previous commit as one batch.
    fn commit(&mut self, frame: u64);
    /// Next id whose voice finished draining on the audio side, if any.
    fn poll_retired(&mut self) -> Option<VoiceId>;
    /// Bound on the events one committed batch may hold, marker included.
    /// `None` for unbounded links.
    fn batch_capacity(&self) -> Option<usize> {
        None
    }
}

impl VoiceBridge for Vec<VoiceEvent> {
    fn group_created(&mut self, id: VoiceId, params: GroupParams) {
        self.push(VoiceEvent::Created { id, params });
    }

    fn group_params_changed(&mut self, id: VoiceId, params: GroupParams) {
        self.push(VoiceEvent::ParamsChanged { id, params });
    }

    fn group_destroyed(&mut self, id: VoiceId) {
        self.push(VoiceEvent::Destroyed { id });
    }
}

impl FrameLink for Vec<VoiceEvent> {
    fn commit(&mut self, frame: u64) {
        self.push(VoiceEvent::Commit { frame });
    }

    fn poll_retired(&mut self) -> Option<VoiceId> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_walks_the_pentatonic_scale() {
        let base = 440.0;
        assert_eq!(GroupParams::for_members(5).pitch_hz(base), 440.0);
        let third = GroupParams::for_members(3);
        assert_eq!(third.semitones, 7);
        assert!((third.pitch_hz(base) - 659.255).abs() < 0.01);
        assert_eq!(
            GroupParams::for_members(1).semitones,
            GroupParams::for_members(6).semitones
        );
        assert_ne!(GroupParams::for_members(1), GroupParams::for_members(6));
    }
}
