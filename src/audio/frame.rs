use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use super::{CHANNELS, SAMPLE_RATE};

/// Frame geometry derived from the frame duration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpec {
    pub frame_duration_ms: u32,
}

impl FrameSpec {
    pub fn new(frame_duration_ms: u32) -> Self {
        Self { frame_duration_ms }
    }

    /// Samples per channel in one frame (960 at 20 ms)
    pub fn samples_per_channel(&self) -> usize {
        (self.frame_duration_ms * SAMPLE_RATE / 1000) as usize
    }

    /// Interleaved sample count in one frame (1920 at 20 ms)
    pub fn samples(&self) -> usize {
        self.samples_per_channel() * CHANNELS
    }

    pub fn bytes(&self) -> usize {
        self.samples() * 2
    }

    pub fn duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.frame_duration_ms as u64)
    }
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self::new(20)
    }
}

/// Result of one frame read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRead {
    Full,
    /// Source ended with this many bytes of a partial frame
    Short(usize),
}

/// Reads fixed-size little-endian PCM frames from a byte stream
pub struct FrameReader<R> {
    reader: R,
    spec: FrameSpec,
    bytes: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R, spec: FrameSpec) -> Self {
        Self {
            reader,
            spec,
            bytes: vec![0; spec.bytes()],
        }
    }

    pub fn spec(&self) -> FrameSpec {
        self.spec
    }

    /// Fill `samples` with the next frame. A partial frame leaves `samples` untouched.
    pub async fn read_frame(&mut self, samples: &mut [i16]) -> io::Result<FrameRead> {
        debug_assert_eq!(samples.len(), self.spec.samples());

        let mut filled = 0;
        while filled < self.bytes.len() {
            let n = self.reader.read(&mut self.bytes[filled..]).await?;
            if n == 0 {
                return Ok(FrameRead::Short(filled));
            }
            filled += n;
        }

        for (sample, chunk) in samples.iter_mut().zip(self.bytes.chunks_exact(2)) {
            *sample = i16::from_le_bytes([chunk[0], chunk[1]]);
        }
        Ok(FrameRead::Full)
    }
}
