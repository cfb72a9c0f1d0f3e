use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{EncodedFrame, TransportSink};
use crate::error::StreamError;

/// Transport backed by a bounded channel. A full channel is backpressure;
/// a dropped receiver means the session is gone.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<EncodedFrame>,
    speaking: Arc<AtomicBool>,
}

/// Receiving half of a [`ChannelSink`]
#[derive(Debug)]
pub struct FrameReceiver {
    rx: mpsc::Receiver<EncodedFrame>,
    speaking: Arc<AtomicBool>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, FrameReceiver) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let speaking = Arc::new(AtomicBool::new(false));
        (
            Self {
                tx,
                speaking: Arc::clone(&speaking),
            },
            FrameReceiver { rx, speaking },
        )
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl TransportSink for ChannelSink {
    async fn send_frame(&self, frame: EncodedFrame) -> Result<(), StreamError> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| StreamError::SinkUnavailable("voice session closed".to_string()))
    }

    async fn set_speaking(&self, speaking: bool) -> Result<(), StreamError> {
        self.speaking.store(speaking, Ordering::Relaxed);
        if self.tx.is_closed() {
            return Err(StreamError::SinkUnavailable("voice session closed".to_string()));
        }
        Ok(())
    }
}

impl FrameReceiver {
    pub async fn recv(&mut self) -> Option<EncodedFrame> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<EncodedFrame> {
        self.rx.try_recv().ok()
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::Relaxed)
    }
}

/// Drain frames into `writer` using DCA framing: a little-endian `u16` length
/// followed by the packet. With `pace`, at most one frame is written per period.
///
/// Resolves to the number of frames written once every sender is gone.
pub fn spawn_frame_writer<W>(
    mut receiver: FrameReceiver,
    mut writer: W,
    pace: Option<Duration>,
) -> JoinHandle<io::Result<u64>>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = pace.map(|period| {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut written = 0u64;

        while let Some(frame) = receiver.recv().await {
            if let Some(ticker) = ticker.as_mut() {
                ticker.tick().await;
            }

            let len = u16::try_from(frame.len()).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "frame larger than 65535 bytes")
            })?;

            if let Err(e) = write_frame(&mut writer, len, frame.as_bytes()).await {
                warn!("Frame writer stopped: {}", e);
                return Err(e);
            }
            written += 1;
        }

        writer.flush().await?;
        debug!("Frame writer finished after {} frames", written);
        Ok(written)
    })
}

async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, len: u16, bytes: &[u8]) -> io::Result<()> {
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(bytes).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut receiver) = ChannelSink::new(4);
        sink.send_frame(EncodedFrame(vec![1])).await.unwrap();
        sink.send_frame(EncodedFrame(vec![2, 2])).await.unwrap();

        assert_eq!(receiver.recv().await, Some(EncodedFrame(vec![1])));
        assert_eq!(receiver.recv().await, Some(EncodedFrame(vec![2, 2])));
    }

    #[tokio::test]
    async fn test_speaking_flag_visible_to_receiver() {
        let (sink, receiver) = ChannelSink::new(1);
        assert!(!receiver.is_speaking());
        sink.set_speaking(true).await.unwrap();
        assert!(receiver.is_speaking());
        sink.set_speaking(false).await.unwrap();
        assert!(!receiver.is_speaking());
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_sink_unavailable() {
        let (sink, receiver) = ChannelSink::new(1);
        drop(receiver);

        assert!(sink.is_closed());
        assert!(matches!(
            sink.send_frame(EncodedFrame(vec![0])).await,
            Err(StreamError::SinkUnavailable(_))
        ));
        assert!(sink.set_speaking(true).await.is_err());
    }

    #[tokio::test]
    async fn test_full_channel_applies_backpressure() {
        let (sink, mut receiver) = ChannelSink::new(1);
        sink.send_frame(EncodedFrame(vec![1])).await.unwrap();

        let blocked = tokio::time::timeout(
            Duration::from_millis(20),
            sink.send_frame(EncodedFrame(vec![2])),
        )
        .await;
        assert!(blocked.is_err());

        receiver.recv().await;
        sink.send_frame(EncodedFrame(vec![3])).await.unwrap();
    }

    #[tokio::test]
    async fn test_frame_writer_uses_length_prefix() {
        let (sink, receiver) = ChannelSink::new(4);
        let (client, mut server) = tokio::io::duplex(1024);
        let handle = spawn_frame_writer(receiver, client, None);

        sink.send_frame(EncodedFrame(vec![0xAA, 0xBB, 0xCC])).await.unwrap();
        sink.send_frame(EncodedFrame(vec![0x01])).await.unwrap();
        drop(sink);

        assert_eq!(handle.await.unwrap().unwrap(), 2);

        let mut bytes = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut server, &mut bytes).await.unwrap();
        assert_eq!(bytes, vec![3, 0, 0xAA, 0xBB, 0xCC, 1, 0, 0x01]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_writer_paces_output() {
        let (sink, receiver) = ChannelSink::new(8);
        let handle = spawn_frame_writer(receiver, tokio::io::sink(), Some(Duration::from_millis(20)));

        let start = tokio::time::Instant::now();
        for _ in 0..4 {
            sink.send_frame(EncodedFrame(vec![0; 10])).await.unwrap();
        }
        drop(sink);

        assert_eq!(handle.await.unwrap().unwrap(), 4);
        assert!(start.elapsed() >= Duration::from_millis(60));
    }
}
