use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, BufReader, ReadBuf};
use tokio::process::{Child, ChildStdout, Command};

use super::{PcmStream, SourceProvider, CHANNELS, SAMPLE_RATE};
use crate::error::StreamError;
use crate::models::SourceRef;

/// How track references are turned into PCM
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Transcode anything ffmpeg can open
    #[default]
    Ffmpeg,
    /// Read local files that already hold s16le/48k/stereo
    Raw,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Ffmpeg => "ffmpeg",
            SourceKind::Raw => "raw",
        }
    }
}

/// Transcodes a file or URL to raw PCM with an ffmpeg child process
#[derive(Debug, Clone)]
pub struct FfmpegSource {
    program: PathBuf,
    buffer_bytes: usize,
}

impl FfmpegSource {
    pub fn new(program: impl Into<PathBuf>, buffer_bytes: usize) -> Self {
        Self {
            program: program.into(),
            buffer_bytes,
        }
    }

    fn command(&self, source: &SourceRef) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(source.as_str())
            .args(["-f", "s16le", "-ar"])
            .arg(SAMPLE_RATE.to_string())
            .arg("-ac")
            .arg(CHANNELS.to_string())
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl SourceProvider for FfmpegSource {
    async fn open(&self, source: &SourceRef) -> Result<PcmStream, StreamError> {
        let unavailable = |reason: String| StreamError::SourceUnavailable {
            source_ref: source.to_string(),
            reason,
        };

        let mut child = self
            .command(source)
            .spawn()
            .map_err(|e| unavailable(format!("cannot start {}: {}", self.program.display(), e)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| unavailable("transcoder has no stdout".to_string()))?;

        info!("Transcoding '{}' (pid {:?})", source, child.id());
        Ok(Box::new(TranscodeStream {
            _child: child,
            stdout: BufReader::with_capacity(self.buffer_bytes, stdout),
        }))
    }
}

/// Stdout of a transcoder. Dropping it kills the process.
struct TranscodeStream {
    _child: Child,
    stdout: BufReader<ChildStdout>,
}

impl AsyncRead for TranscodeStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

/// Opens local files of raw interleaved s16le PCM
#[derive(Debug, Clone)]
pub struct RawPcmSource {
    buffer_bytes: usize,
}

impl RawPcmSource {
    pub fn new(buffer_bytes: usize) -> Self {
        Self { buffer_bytes }
    }
}

#[async_trait]
impl SourceProvider for RawPcmSource {
    async fn open(&self, source: &SourceRef) -> Result<PcmStream, StreamError> {
        let file = tokio::fs::File::open(source.as_str())
            .await
            .map_err(|e| StreamError::SourceUnavailable {
                source_ref: source.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Opened raw PCM file '{}'", source);
        Ok(Box::new(BufReader::with_capacity(self.buffer_bytes, file)))
    }
}
