use log::{debug, error, info, trace, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};

/// Environment variable selecting the log level
pub const LOG_LEVEL_ENV: &str = "JUKEBOX_LOG_LEVEL";

/// Source acquisitions slower than this are reported
pub const SLOW_ACQUIRE_THRESHOLD: Duration = Duration::from_millis(500);

/// Playback event for logging and debugging
#[derive(Debug, Clone)]
pub struct PlaybackEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: PlaybackEventType,
    pub duration: Option<Duration>,
    pub details: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEventType {
    TrackStarted,
    TrackCompleted,
    TrackCancelled,
    PositionChanged,
    Paused,
    Resumed,
    SourceUnavailable,
    EncodeFailure,
    SinkUnavailable,
    SlowOperation,
}

impl PlaybackEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackEventType::TrackStarted => "TRACK_STARTED",
            PlaybackEventType::TrackCompleted => "TRACK_COMPLETED",
            PlaybackEventType::TrackCancelled => "TRACK_CANCELLED",
            PlaybackEventType::PositionChanged => "POSITION_CHANGED",
            PlaybackEventType::Paused => "PAUSED",
            PlaybackEventType::Resumed => "RESUMED",
            PlaybackEventType::SourceUnavailable => "SOURCE_UNAVAILABLE",
            PlaybackEventType::EncodeFailure => "ENCODE_FAILURE",
            PlaybackEventType::SinkUnavailable => "SINK_UNAVAILABLE",
            PlaybackEventType::SlowOperation => "SLOW_OPERATION",
        }
    }
}

/// Logger for playback lifecycle and stream failures.
///
/// Clones share one bounded history.
#[derive(Clone)]
pub struct PlaybackLogger {
    events: Arc<Mutex<VecDeque<PlaybackEvent>>>,
    max_events: usize,
}

impl PlaybackLogger {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            max_events: 1000, // Keep last 1000 events
        }
    }

    /// Initialize logging from `JUKEBOX_LOG_LEVEL`, defaulting to info
    pub fn init() -> Result<(), Box<dyn std::error::Error>> {
        let log_level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());
        Self::init_with_level(&log_level)
    }

    /// Initialize logging with an explicit level name
    pub fn init_with_level(log_level: &str) -> Result<(), Box<dyn std::error::Error>> {
        let mut builder = env_logger::Builder::new();

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] [{}:{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });

        builder.filter_level(parse_level(log_level));
        builder.try_init()?;

        info!("Jukebox logging initialized with level: {}", log_level);
        Ok(())
    }

    /// Record an event and forward it to the log facade
    pub fn log_event(&self, event_type: PlaybackEventType, details: String, duration: Option<Duration>) {
        let event = PlaybackEvent {
            timestamp: Utc::now(),
            event_type,
            duration,
            details: details.clone(),
        };

        {
            let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
            events.push_back(event);
            while events.len() > self.max_events {
                events.pop_front();
            }
        }

        match event_type {
            PlaybackEventType::TrackStarted
            | PlaybackEventType::TrackCompleted
            | PlaybackEventType::Paused
            | PlaybackEventType::Resumed => {
                info!("[{}] {}", event_type.as_str(), details);
            }
            PlaybackEventType::TrackCancelled | PlaybackEventType::PositionChanged => {
                debug!("[{}] {}", event_type.as_str(), details);
            }
            PlaybackEventType::SourceUnavailable | PlaybackEventType::EncodeFailure => {
                warn!("[{}] {}", event_type.as_str(), details);
            }
            PlaybackEventType::SinkUnavailable => {
                error!("[{}] {}", event_type.as_str(), details);
            }
            PlaybackEventType::SlowOperation => {
                warn!("[{}] {} (duration: {:?})", event_type.as_str(), details, duration);
            }
        }
    }

    pub fn log_track_started(&self, position: isize, title: &str) {
        self.log_event(
            PlaybackEventType::TrackStarted,
            format!("Now playing #{}: {}", position + 1, title),
            None,
        );
    }

    /// Log the end of an attempt that drained its source
    pub fn log_track_completed(&self, position: isize, title: &str, elapsed: Duration) {
        self.log_event(
            PlaybackEventType::TrackCompleted,
            format!("Finished #{}: {}", position + 1, title),
            Some(elapsed),
        );
    }

    pub fn log_track_cancelled(&self, position: isize, title: &str) {
        self.log_event(
            PlaybackEventType::TrackCancelled,
            format!("Interrupted #{}: {}", position + 1, title),
            None,
        );
    }

    pub fn log_position_changed(&self, from: isize, to: isize) {
        self.log_event(
            PlaybackEventType::PositionChanged,
            format!("Position {} -> {}", from, to),
            None,
        );
    }

    pub fn log_paused(&self) {
        self.log_event(PlaybackEventType::Paused, "Playback paused".to_string(), None);
    }

    pub fn log_resumed(&self) {
        self.log_event(PlaybackEventType::Resumed, "Playback resumed".to_string(), None);
    }

    pub fn log_source_unavailable(&self, source: &str, reason: &str) {
        self.log_event(
            PlaybackEventType::SourceUnavailable,
            format!("Cannot open '{}': {}", source, reason),
            None,
        );
    }

    pub fn log_encode_failure(&self, source: &str, reason: &str) {
        self.log_event(
            PlaybackEventType::EncodeFailure,
            format!("Encoder stopped '{}': {}", source, reason),
            None,
        );
    }

    pub fn log_sink_unavailable(&self, reason: &str) {
        self.log_event(
            PlaybackEventType::SinkUnavailable,
            format!("Transport lost: {}", reason),
            None,
        );
    }

    pub fn log_slow_operation(&self, operation: &str, duration: Duration, threshold: Duration) {
        self.log_event(
            PlaybackEventType::SlowOperation,
            format!(
                "{} took {}ms (threshold: {}ms)",
                operation,
                duration.as_millis(),
                threshold.as_millis()
            ),
            Some(duration),
        );
    }

    /// Get recent events for debugging, oldest first
    pub fn get_recent_events(&self, count: usize) -> Vec<PlaybackEvent> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = events.len().saturating_sub(count);
        events.iter().skip(skip).cloned().collect()
    }

    pub fn clear_events(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Get event statistics
    pub fn get_event_statistics(&self) -> EventStatistics {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stats = EventStatistics::default();

        for event in events.iter() {
            match event.event_type {
                PlaybackEventType::TrackStarted => stats.tracks_started += 1,
                PlaybackEventType::TrackCompleted => stats.tracks_completed += 1,
                PlaybackEventType::TrackCancelled => stats.tracks_cancelled += 1,
                PlaybackEventType::SourceUnavailable => stats.source_failures += 1,
                PlaybackEventType::EncodeFailure => stats.encode_failures += 1,
                PlaybackEventType::SinkUnavailable => stats.sink_failures += 1,
                _ => {}
            }
        }

        stats.total_events = events.len();
        stats
    }
}

impl Default for PlaybackLogger {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

/// Counts of logged events by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventStatistics {
    pub total_events: usize,
    pub tracks_started: usize,
    pub tracks_completed: usize,
    pub tracks_cancelled: usize,
    pub source_failures: usize,
    pub encode_failures: usize,
    pub sink_failures: usize,
}

/// Timer utility for measuring operation durations
pub struct OperationTimer {
    start_time: Instant,
    operation_name: String,
}

impl OperationTimer {
    pub fn new(operation_name: String) -> Self {
        trace!("Starting operation: {}", operation_name);
        Self {
            start_time: Instant::now(),
            operation_name,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn finish(self) -> Duration {
        let duration = self.elapsed();
        trace!("Completed operation '{}' in {}ms", self.operation_name, duration.as_millis());
        duration
    }

    /// Finish and record a slow-operation event when over `threshold`
    pub fn finish_with_threshold(self, logger: &PlaybackLogger, threshold: Duration) -> Duration {
        let duration = self.elapsed();
        if duration > threshold {
            logger.log_slow_operation(&self.operation_name, duration, threshold);
        } else {
            debug!("Completed operation '{}' in {}ms", self.operation_name, duration.as_millis());
        }
        duration
    }
}
