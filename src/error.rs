use thiserror::Error;

/// Main player error type
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("CLI parse error: {0}")]
    Parse(#[from] crate::cli::ParseError),
}

impl PlayerError {
    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PlayerError::Stream(err) => err.user_message(),
            PlayerError::Queue(err) => err.user_message(),
            PlayerError::Command(err) => err.user_message(),
            PlayerError::Config(err) => err.user_message(),
            PlayerError::File(err) => Self::format_file_error(err),
            PlayerError::Parse(err) => format!("Command error: {}", err),
        }
    }

    /// Get suggested follow-up actions for the error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PlayerError::Stream(err) => err.recovery_suggestions(),
            PlayerError::Queue(err) => err.recovery_suggestions(),
            PlayerError::Command(err) => err.recovery_suggestions(),
            PlayerError::Config(err) => err.recovery_suggestions(),
            PlayerError::File(err) => Self::file_error_suggestions(err),
            PlayerError::Parse(_) => vec!["Type 'help' to see available commands".to_string()],
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlayerError::Stream(StreamError::SinkUnavailable(_)) => ErrorSeverity::Error,
            PlayerError::Stream(_) => ErrorSeverity::Warning,
            PlayerError::Queue(QueueError::EmptyQueue) => ErrorSeverity::Info,
            PlayerError::Queue(_) => ErrorSeverity::Warning,
            PlayerError::Command(_) => ErrorSeverity::Info,
            PlayerError::Config(_) => ErrorSeverity::Warning,
            PlayerError::File(_) => ErrorSeverity::Error,
            PlayerError::Parse(_) => ErrorSeverity::Info,
        }
    }

    fn format_file_error(err: &std::io::Error) -> String {
        match err.kind() {
            std::io::ErrorKind::NotFound => "File or directory not found".to_string(),
            std::io::ErrorKind::PermissionDenied => "Permission denied - cannot access file".to_string(),
            std::io::ErrorKind::BrokenPipe => "Output was closed while writing".to_string(),
            _ => format!("File system error: {}", err),
        }
    }

    fn file_error_suggestions(err: &std::io::Error) -> Vec<String> {
        match err.kind() {
            std::io::ErrorKind::NotFound => vec![
                "Check that the file path is correct".to_string(),
                "Try using absolute path instead of relative path".to_string(),
            ],
            std::io::ErrorKind::PermissionDenied => vec![
                "Check file permissions".to_string(),
                "Ensure the file is not locked by another application".to_string(),
            ],
            _ => vec!["Try the operation again".to_string()],
        }
    }
}

/// Error severity levels for logging and user feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
        }
    }

    pub fn log_level(&self) -> log::Level {
        match self {
            ErrorSeverity::Info => log::Level::Info,
            ErrorSeverity::Warning => log::Level::Warn,
            ErrorSeverity::Error => log::Level::Error,
        }
    }
}

/// Failures that end a single pipeline attempt
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Source unavailable: {source_ref}: {reason}")]
    SourceUnavailable { source_ref: String, reason: String },

    #[error("Encode failure: {0}")]
    EncodeFailure(String),

    #[error("Sink unavailable: {0}")]
    SinkUnavailable(String),
}

impl StreamError {
    pub fn user_message(&self) -> String {
        match self {
            StreamError::SourceUnavailable { source_ref, .. } => {
                format!("Could not open '{}' - skipping to the next track", source_ref)
            }
            StreamError::EncodeFailure(msg) => {
                format!("Audio encoder stopped the current track: {}", msg)
            }
            StreamError::SinkUnavailable(_) => {
                "Voice connection is gone - playback halted".to_string()
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            StreamError::SourceUnavailable { .. } => vec![
                "Check that ffmpeg is installed and on PATH".to_string(),
                "Verify the source path or URL is reachable".to_string(),
            ],
            StreamError::EncodeFailure(_) => vec![
                "Try a different bitrate or frame duration in the configuration".to_string(),
            ],
            StreamError::SinkUnavailable(_) => vec![
                "Use 'join <path>' to attach a new output".to_string(),
            ],
        }
    }
}

/// Queue and position errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Position {requested} out of range for queue of length {len}")]
    OutOfRange { requested: isize, len: usize },

    #[error("Queue is empty")]
    EmptyQueue,
}

impl QueueError {
    pub fn user_message(&self) -> String {
        match self {
            QueueError::OutOfRange { requested, len } => {
                format!("Track number {} is not valid for a queue of {} tracks", requested + 1, len)
            }
            QueueError::EmptyQueue => "No tracks in queue - add some first".to_string(),
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            QueueError::OutOfRange { .. } => vec![
                "Use 'queue' to see available tracks".to_string(),
                "Track numbers start from 1".to_string(),
            ],
            QueueError::EmptyQueue => vec![
                "Use 'play <source>' to add a track".to_string(),
            ],
        }
    }
}

/// Errors from command arguments
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Invalid {setting} argument '{value}': expected {expected}")]
    InvalidModeArgument {
        setting: String,
        value: String,
        expected: String,
    },
}

impl CommandError {
    pub fn invalid(setting: &str, value: impl Into<String>, expected: &str) -> Self {
        CommandError::InvalidModeArgument {
            setting: setting.to_string(),
            value: value.into(),
            expected: expected.to_string(),
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            CommandError::InvalidModeArgument { setting, value, expected } => {
                format!("'{}' is not a valid {} setting (use {})", value, setting, expected)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            CommandError::InvalidModeArgument { setting, .. } => vec![
                format!("Type 'help' to see the accepted {} values", setting),
            ],
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::ConfigDirNotFound => {
                "Cannot find or create configuration directory".to_string()
            }
            ConfigError::IoError(err) => {
                format!("Cannot access configuration file: {}", err)
            }
            ConfigError::SerializationError(_) => {
                "Failed to save configuration settings".to_string()
            }
            ConfigError::DeserializationError(_) => {
                "Configuration file is corrupted or has invalid format".to_string()
            }
            ConfigError::InvalidValue { field, reason } => {
                format!("Configuration field '{}' is invalid: {}", field, reason)
            }
        }
    }

    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ConfigError::ConfigDirNotFound => vec![
                "Check that you have write permissions to your config directory".to_string(),
                "Pass an explicit file with --config <path>".to_string(),
            ],
            ConfigError::IoError(_) => vec![
                "Check file permissions for the configuration directory".to_string(),
                "Ensure the disk is not full".to_string(),
            ],
            ConfigError::SerializationError(_) => vec![
                "Try resetting configuration to defaults".to_string(),
            ],
            ConfigError::DeserializationError(_) => vec![
                "Delete the configuration file to reset to defaults".to_string(),
                "Check the configuration file format manually".to_string(),
            ],
            ConfigError::InvalidValue { .. } => vec![
                "Edit the configuration file and correct the value".to_string(),
            ],
        }
    }
}
