use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Receiver;
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::debug;

use crate::error::FlockError;

/// Mono 16-bit WAV writer fed blocks of samples over a channel.
/// The file is finalized when every sender has been dropped.
pub struct WavSink;

impl WavSink {
    pub fn spawn(
        rx: Receiver<Arc<[f32]>>,
        path: PathBuf,
        sample_rate: u32,
    ) -> JoinHandle<Result<u64, FlockError>> {
        std::thread::spawn(move || -> Result<u64, FlockError> {
            let spec = WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            };
            let mut writer = WavWriter::create(&path, spec)?;
            let mut written = 0u64;

            while let Ok(samples) = rx.recv() {
                for &s in samples.iter() {
                    let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                    writer.write_sample(v)?;
                }
                written += samples.len() as u64;
            }

            writer.finalize()?;
            debug!(path = %path.display(), written, "wav finalized");
            Ok(written)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_and_finalizes_on_disconnect() {
        let mut path = std::env::temp_dir();
        path.push(format!("boidsong_writer_test_{}.wav", std::process::id()));
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = WavSink::spawn(rx, path.clone(), 8_000);
        tx.send(Arc::from(vec![0.0f32, 0.5, -0.5, 2.0])).unwrap();
        tx.send(Arc::from(vec![0.25f32; 4])).unwrap();
        drop(tx);
        let written = handle.join().unwrap().unwrap();
        assert_eq!(written, 8);

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8_000);
        let samples: Vec<i16> = reader.into_samples().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 8);
        assert_eq!(samples[3], i16::MAX, "clipped to full scale");
        let _ = std::fs::remove_file(&path);
    }
}
