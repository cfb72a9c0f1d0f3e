use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::watch;

use super::frame::{FrameRead, FrameReader};
use super::gain::{apply_gain, VolumeControl};
use super::{EncodedFrame, EncoderFactory, FrameEncoder, PcmStream, SourceProvider, TransportSink};
use crate::error::StreamError;
use crate::logging::{OperationTimer, PlaybackLogger, SLOW_ACQUIRE_THRESHOLD};
use crate::models::SourceRef;
use crate::signal::Subscription;

/// How a pipeline attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Source drained, or the attempt gave up on a source/encode failure
    Completed,
    /// The position changed underneath the attempt
    Cancelled,
    /// The transport went away
    SinkUnavailable,
}

impl PipelineOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineOutcome::Completed => "completed",
            PipelineOutcome::Cancelled => "cancelled",
            PipelineOutcome::SinkUnavailable => "sink unavailable",
        }
    }
}

/// Collaborators shared by every attempt of a session
#[derive(Clone)]
pub struct PipelineContext {
    pub provider: Arc<dyn SourceProvider>,
    pub encoder: Arc<dyn EncoderFactory>,
    pub volume: VolumeControl,
    pub paused: watch::Receiver<bool>,
    pub logger: PlaybackLogger,
}

/// One streaming attempt for one track: acquire, frame, gain, encode, deliver.
///
/// Consumed by [`AudioPipeline::run`]; a new instance is built per attempt.
pub struct AudioPipeline {
    source: SourceRef,
    provider: Arc<dyn SourceProvider>,
    encoder: Arc<dyn EncoderFactory>,
    sink: Arc<dyn TransportSink>,
    volume: VolumeControl,
    paused: watch::Receiver<bool>,
    cancel: Subscription,
    logger: PlaybackLogger,
}

impl AudioPipeline {
    pub fn new(
        context: &PipelineContext,
        sink: Arc<dyn TransportSink>,
        source: SourceRef,
        cancel: Subscription,
    ) -> Self {
        Self {
            source,
            provider: Arc::clone(&context.provider),
            encoder: Arc::clone(&context.encoder),
            sink,
            volume: context.volume.clone(),
            paused: context.paused.clone(),
            cancel,
            logger: context.logger.clone(),
        }
    }

    pub async fn run(mut self) -> PipelineOutcome {
        if self.cancel.is_cancelled() {
            return PipelineOutcome::Cancelled;
        }

        let stream = match self.acquire().await {
            Some(Ok(stream)) => stream,
            Some(Err(e)) => {
                self.log_stream_failure(&e);
                return PipelineOutcome::Completed;
            }
            None => return PipelineOutcome::Cancelled,
        };

        let encoder = match self.encoder.create() {
            Ok(encoder) => encoder,
            Err(e) => {
                self.log_stream_failure(&e);
                return PipelineOutcome::Completed;
            }
        };

        if let Err(e) = self.sink.set_speaking(true).await {
            self.log_stream_failure(&e);
            return PipelineOutcome::SinkUnavailable;
        }

        let outcome = self.stream_frames(stream, encoder).await;

        if let Err(e) = self.sink.set_speaking(false).await {
            debug!("Could not clear speaking flag: {}", e);
        }
        outcome
    }

    /// Open the source unless cancelled first
    async fn acquire(&mut self) -> Option<Result<PcmStream, StreamError>> {
        let timer = OperationTimer::new(format!("acquire '{}'", self.source));
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            opened = self.provider.open(&self.source) => Some(opened),
        };
        timer.finish_with_threshold(&self.logger, SLOW_ACQUIRE_THRESHOLD);
        result
    }

    async fn stream_frames(
        &mut self,
        stream: PcmStream,
        mut encoder: Box<dyn FrameEncoder>,
    ) -> PipelineOutcome {
        let frame = self.encoder.frame();
        let mut reader = FrameReader::new(stream, frame);
        let mut pcm = vec![0i16; frame.samples()];
        let mut packet = vec![0u8; self.encoder.max_frame_bytes()];
        let mut delivered = 0u64;

        loop {
            let was_paused = *self.paused.borrow();
            if self.cancel.is_cancelled() || self.wait_while_paused().await {
                debug!("'{}' cancelled after {} frames", self.source, delivered);
                return PipelineOutcome::Cancelled;
            }
            // Inter-frame state is stale after a pause
            if was_paused {
                if let Err(e) = encoder.reset() {
                    debug!("Encoder reset after pause failed: {}", e);
                }
            }

            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return PipelineOutcome::Cancelled,
                read = reader.read_frame(&mut pcm) => read,
            };
            match read {
                Ok(FrameRead::Full) => {}
                Ok(FrameRead::Short(leftover)) => {
                    debug!(
                        "'{}' drained after {} frames ({} trailing bytes dropped)",
                        self.source, delivered, leftover
                    );
                    return PipelineOutcome::Completed;
                }
                Err(e) => {
                    warn!("Read from '{}' failed after {} frames: {}", self.source, delivered, e);
                    return PipelineOutcome::Completed;
                }
            }

            apply_gain(&mut pcm, self.volume.get());

            let written = match encoder.encode(&pcm, &mut packet) {
                Ok(0) => {
                    self.log_stream_failure(&StreamError::EncodeFailure(
                        "encoder produced an empty frame".to_string(),
                    ));
                    return PipelineOutcome::Completed;
                }
                Ok(written) => written,
                Err(e) => {
                    self.log_stream_failure(&e);
                    return PipelineOutcome::Completed;
                }
            };

            let encoded = EncodedFrame(packet[..written].to_vec());
            let sent = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return PipelineOutcome::Cancelled,
                sent = self.sink.send_frame(encoded) => sent,
            };
            if let Err(e) = sent {
                self.log_stream_failure(&e);
                return PipelineOutcome::SinkUnavailable;
            }
            delivered += 1;
        }
    }

    /// Block while paused. Returns true if cancelled meanwhile.
    async fn wait_while_paused(&mut self) -> bool {
        loop {
            let paused = *self.paused.borrow_and_update();
            if !paused {
                return false;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return true,
                changed = self.paused.changed() => {
                    if changed.is_err() {
                        return true;
                    }
                }
            }
        }
    }

    fn log_stream_failure(&self, error: &StreamError) {
        match error {
            StreamError::SourceUnavailable { source_ref, reason } => {
                self.logger.log_source_unavailable(source_ref, reason)
            }
            StreamError::EncodeFailure(reason) => {
                self.logger.log_encode_failure(self.source.as_str(), reason)
            }
            StreamError::SinkUnavailable(reason) => self.logger.log_sink_unavailable(reason),
        }
    }
}
