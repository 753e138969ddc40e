pub mod audio;
pub mod boid;
pub mod flock;
pub mod group_tracker;
pub mod interaction;
pub mod proximity;
pub mod voice_ids;
