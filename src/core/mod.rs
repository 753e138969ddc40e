pub mod geom;
pub mod timebase;
