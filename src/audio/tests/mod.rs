//! Test doubles shared by the pipeline and controller tests


use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    Codec, EncodedFrame, EncoderFactory, EncoderSettings, FrameEncoder, FrameSpec, PcmStream,
    SourceProvider,
};
use crate::error::StreamError;
use crate::models::SourceRef;

/// References starting with this stream the following byte forever
pub const ENDLESS_PREFIX: &str = "endless:";

/// In-memory PCM library keyed by source reference
#[derive(Default)]
pub struct MemorySource {
    tracks: Mutex<HashMap<String, Vec<u8>>>,
    opened: AtomicUsize,
    open_delay: Option<Duration>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_track(self, reference: &str, pcm: Vec<u8>) -> Self {
        self.tracks.lock().unwrap().insert(reference.to_string(), pcm);
        self
    }

    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Number of open calls so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProvider for MemorySource {
    async fn open(&self, source: &SourceRef) -> Result<PcmStream, StreamError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(byte) = source.as_str().strip_prefix(ENDLESS_PREFIX) {
            let byte: u8 = byte.parse().map_err(|_| StreamError::SourceUnavailable {
                source_ref: source.to_string(),
                reason: "bad endless byte".to_string(),
            })?;
            return Ok(Box::new(tokio::io::repeat(byte)));
        }

        let pcm = self
            .tracks
            .lock()
            .unwrap()
            .get(source.as_str())
            .cloned()
            .ok_or_else(|| StreamError::SourceUnavailable {
                source_ref: source.to_string(),
                reason: "no such track".to_string(),
            })?;
        Ok(Box::new(Cursor::new(pcm)))
    }
}

/// Encoder factory whose encoders always produce empty output
pub struct EmptyOutputEncoder;

impl FrameEncoder for EmptyOutputEncoder {
    fn encode(&mut self, _pcm: &[i16], _out: &mut [u8]) -> Result<usize, StreamError> {
        Ok(0)
    }

    fn reset(&mut self) -> Result<(), StreamError> {
        Ok(())
    }
}

impl EncoderFactory for EmptyOutputEncoder {
    fn create(&self) -> Result<Box<dyn FrameEncoder>, StreamError> {
        Ok(Box::new(EmptyOutputEncoder))
    }

    fn frame(&self) -> FrameSpec {
        FrameSpec::default()
    }

    fn max_frame_bytes(&self) -> usize {
        64
    }
}

/// PCM passthrough encoder with 20 ms frames
pub fn pcm_encoder() -> Arc<dyn EncoderFactory> {
    Arc::new(EncoderSettings {
        codec: Codec::Pcm,
        bitrate_bps: 64_000,
        frame: FrameSpec::default(),
    })
}

/// `frames` full 20 ms frames of a constant sample, plus `trailing` stray bytes
pub fn pcm_bytes(frames: usize, sample: i16, trailing: usize) -> Vec<u8> {
    let samples = FrameSpec::default().samples() * frames;
    let mut bytes = Vec::with_capacity(samples * 2 + trailing);
    for _ in 0..samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes.resize(bytes.len() + trailing, 0);
    bytes
}

/// Samples carried by a PCM passthrough frame
pub fn frame_samples(frame: &EncodedFrame) -> Vec<i16> {
    frame
        .as_bytes()
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
