pub mod encoder;
pub mod frame;
pub mod gain;
pub mod pipeline;
pub mod sink;
pub mod sources;

#[cfg(test)]
pub mod tests;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::StreamError;
use crate::models::SourceRef;

/// Fixed output sample rate
pub const SAMPLE_RATE: u32 = 48_000;

/// Fixed interleaved channel count
pub const CHANNELS: usize = 2;

/// Readable PCM stream: interleaved s16le, 48 kHz, stereo
pub type PcmStream = Box<dyn AsyncRead + Send + Unpin>;

// Re-export pipeline stages
pub use encoder::{Codec, EncoderSettings, PcmFrameEncoder};
#[cfg(feature = "opus")]
pub use encoder::OpusFrameEncoder;
pub use frame::{FrameRead, FrameReader, FrameSpec};
pub use gain::{apply_gain, VolumeControl};
pub use pipeline::{AudioPipeline, PipelineContext, PipelineOutcome};
pub use sink::{spawn_frame_writer, ChannelSink, FrameReceiver};
pub use sources::{FfmpegSource, RawPcmSource, SourceKind};

/// One compressed audio frame ready for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame(pub Vec<u8>);

impl EncodedFrame {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Resolves a track's source reference into a PCM byte stream
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Open a stream. Dropping the returned stream must release the source.
    async fn open(&self, source: &SourceRef) -> Result<PcmStream, StreamError>;
}

/// Voice transport accepting one encoded frame at a time
#[async_trait]
pub trait TransportSink: Send + Sync {
    /// Deliver a frame, waiting while the transport applies backpressure.
    /// Fails with `SinkUnavailable` once the session is gone.
    async fn send_frame(&self, frame: EncodedFrame) -> Result<(), StreamError>;

    /// Toggle the speaking indicator
    async fn set_speaking(&self, speaking: bool) -> Result<(), StreamError>;
}

/// Stateful frame compressor used for one pipeline attempt
pub trait FrameEncoder: Send {
    /// Encode one frame of interleaved samples into `out`, returning bytes written
    fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize, StreamError>;

    /// Forget inter-frame state
    fn reset(&mut self) -> Result<(), StreamError>;
}

/// Produces a fresh encoder for each pipeline attempt
pub trait EncoderFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn FrameEncoder>, StreamError>;

    /// Frame geometry the encoder expects
    fn frame(&self) -> FrameSpec;

    /// Upper bound on an encoded frame's size
    fn max_frame_bytes(&self) -> usize;
}
