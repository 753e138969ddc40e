pub mod events;
pub mod handoff;
pub mod rack;
pub mod voice;

pub use events::{FrameLink, GroupParams, PENTATONIC, VoiceBridge, VoiceEvent};
pub use handoff::{EventOutbox, VoiceFeed, min_event_capacity, voice_channel};
pub use rack::VoiceRack;
pub use voice::{AudioVoice, SineVoice, VoiceShape};
