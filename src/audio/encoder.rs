use serde::{Deserialize, Serialize};

use super::frame::FrameSpec;
use super::{EncoderFactory, FrameEncoder};
#[cfg(feature = "opus")]
use super::{CHANNELS, SAMPLE_RATE};
use crate::error::StreamError;

/// Largest packet libopus recommends buffering for
pub const MAX_OPUS_PACKET: usize = 4000;

/// Output codec
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Opus,
    Pcm,
}

impl Codec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Opus => "opus",
            Codec::Pcm => "pcm",
        }
    }

    /// Whether this build can encode the codec
    pub fn is_available(&self) -> bool {
        match self {
            Codec::Opus => cfg!(feature = "opus"),
            Codec::Pcm => true,
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        if cfg!(feature = "opus") {
            Codec::Opus
        } else {
            Codec::Pcm
        }
    }
}

/// Codec parameters shared by every attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub codec: Codec,
    pub bitrate_bps: u32,
    pub frame: FrameSpec,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            codec: Codec::default(),
            bitrate_bps: 64_000,
            frame: FrameSpec::default(),
        }
    }
}

impl EncoderFactory for EncoderSettings {
    fn create(&self) -> Result<Box<dyn FrameEncoder>, StreamError> {
        match self.codec {
            Codec::Pcm => Ok(Box::new(PcmFrameEncoder::new(self.frame))),
            #[cfg(feature = "opus")]
            Codec::Opus => Ok(Box::new(OpusFrameEncoder::new(self.bitrate_bps, self.frame)?)),
            #[cfg(not(feature = "opus"))]
            Codec::Opus => Err(StreamError::EncodeFailure(
                "this build has no opus support".to_string(),
            )),
        }
    }

    fn frame(&self) -> FrameSpec {
        self.frame
    }

    fn max_frame_bytes(&self) -> usize {
        match self.codec {
            Codec::Pcm => self.frame.bytes(),
            Codec::Opus => MAX_OPUS_PACKET,
        }
    }
}

/// Uncompressed passthrough: writes the frame as little-endian bytes
#[derive(Debug)]
pub struct PcmFrameEncoder {
    frame: FrameSpec,
}

impl PcmFrameEncoder {
    pub fn new(frame: FrameSpec) -> Self {
        Self { frame }
    }
}

impl FrameEncoder for PcmFrameEncoder {
    fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize, StreamError> {
        if pcm.len() != self.frame.samples() {
            return Err(StreamError::EncodeFailure(format!(
                "expected {} samples, got {}",
                self.frame.samples(),
                pcm.len()
            )));
        }
        let needed = pcm.len() * 2;
        if out.len() < needed {
            return Err(StreamError::EncodeFailure(format!(
                "output buffer of {} bytes is smaller than {}",
                out.len(),
                needed
            )));
        }

        for (chunk, sample) in out.chunks_exact_mut(2).zip(pcm) {
            chunk.copy_from_slice(&sample.to_le_bytes());
        }
        Ok(needed)
    }

    fn reset(&mut self) -> Result<(), StreamError> {
        Ok(())
    }
}

/// libopus encoder configured for music at a fixed bitrate
#[cfg(feature = "opus")]
pub struct OpusFrameEncoder {
    inner: opus::Encoder,
    frame: FrameSpec,
}

#[cfg(feature = "opus")]
impl OpusFrameEncoder {
    pub fn new(bitrate_bps: u32, frame: FrameSpec) -> Result<Self, StreamError> {
        let channels = if CHANNELS == 2 {
            opus::Channels::Stereo
        } else {
            opus::Channels::Mono
        };
        let mut inner = opus::Encoder::new(SAMPLE_RATE, channels, opus::Application::Audio)
            .map_err(|e| StreamError::EncodeFailure(format!("encoder init failed: {}", e)))?;
        inner
            .set_bitrate(opus::Bitrate::Bits(bitrate_bps as i32))
            .map_err(|e| StreamError::EncodeFailure(format!("bitrate rejected: {}", e)))?;

        Ok(Self { inner, frame })
    }
}

#[cfg(feature = "opus")]
impl FrameEncoder for OpusFrameEncoder {
    fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize, StreamError> {
        if pcm.len() != self.frame.samples() {
            return Err(StreamError::EncodeFailure(format!(
                "expected {} samples, got {}",
                self.frame.samples(),
                pcm.len()
            )));
        }
        self.inner
            .encode(pcm, out)
            .map_err(|e| StreamError::EncodeFailure(e.to_string()))
    }

    fn reset(&mut self) -> Result<(), StreamError> {
        self.inner
            .reset_state()
            .map_err(|e| StreamError::EncodeFailure(e.to_string()))
    }
}
