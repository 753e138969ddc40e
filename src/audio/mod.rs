pub mod writer;

pub use writer::WavSink;
