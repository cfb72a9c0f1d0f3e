use crate::error::{CommandError, PlayerError};
use crate::models::{LoopMode, PlayerStatus};
use clap::Parser;
use std::path::PathBuf;

pub mod status;
pub use status::StatusDisplay;

/// Queue-driven audio streaming jukebox
#[derive(Debug, Parser)]
#[command(name = "jukebox")]
#[command(about = "Stream a queue of tracks as encoded voice frames")]
#[command(version = "0.1.0")]
pub struct CliApp {
    /// Configuration file (defaults to the user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write DCA-framed audio to this file at startup
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Name shown as the requester of queued tracks
    #[arg(short, long)]
    pub requester: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Play the startup queue once through the output, then exit
    #[arg(long, requires = "output")]
    pub until_finished: bool,

    /// Tracks to enqueue at startup
    pub sources: Vec<String>,
}

/// Interactive commands
#[derive(Debug, Clone, PartialEq)]
pub enum Commands {
    /// Enqueue a source, or resume / start when none is given
    Play { source: Option<String> },
    /// Show the queue window
    Queue,
    /// Advance to the next track
    Skip,
    /// Set or cycle the loop mode
    Loop { mode: Option<LoopMode> },
    /// Set or show the volume as a percentage
    Volume { percent: Option<u8> },
    Pause,
    Resume,
    /// Set or toggle shuffle
    Shuffle { enabled: Option<bool> },
    /// Empty the queue
    Clear,
    /// Jump to a 1-based track number
    Jump { track: usize },
    /// Stop playback, keeping the queue
    Stop,
    /// Attach a frame writer on the given file
    Join { path: PathBuf },
    /// Stop and detach the output
    Leave,
    Status,
}

impl CliApp {
    /// Parse command line arguments
    pub fn parse() -> Self {
        <Self as clap::Parser>::parse()
    }

    /// Expand tilde (~) in path to home directory
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home_dir) = dirs::home_dir() {
                return home_dir.join(rest);
            }
        } else if path == "~" {
            if let Some(home_dir) = dirs::home_dir() {
                return home_dir;
            }
        }
        PathBuf::from(path)
    }

    /// Parse command from string (for interactive mode)
    pub fn parse_command(input: &str) -> Result<Commands, ParseError> {
        let args: Vec<&str> = input.split_whitespace().collect();
        if args.is_empty() {
            return Err(ParseError::EmptyCommand);
        }
        let rest = || args[1..].join(" ");

        match args[0].to_lowercase().as_str() {
            "play" | "pl" | "p" => {
                if args.len() > 1 {
                    let source = rest();
                    let source = if source.starts_with('~') {
                        Self::expand_path(&source).to_string_lossy().into_owned()
                    } else {
                        source
                    };
                    Ok(Commands::Play { source: Some(source) })
                } else {
                    Ok(Commands::Play { source: None })
                }
            }
            "queue" | "q" => Ok(Commands::Queue),
            "skip" | "sk" | "next" => Ok(Commands::Skip),
            "loop" | "l" => match args.get(1) {
                Some(arg) => Ok(Commands::Loop { mode: Some(LoopMode::parse(arg)?) }),
                None => Ok(Commands::Loop { mode: None }),
            },
            "volume" | "vol" | "v" => match args.get(1) {
                Some(arg) => Ok(Commands::Volume { percent: Some(parse_volume_percent(arg)?) }),
                None => Ok(Commands::Volume { percent: None }),
            },
            "pause" | "pa" => Ok(Commands::Pause),
            "resume" | "re" => Ok(Commands::Resume),
            "shuffle" | "sh" => match args.get(1) {
                Some(arg) => Ok(Commands::Shuffle { enabled: Some(parse_toggle(arg)?) }),
                None => Ok(Commands::Shuffle { enabled: None }),
            },
            "clear" | "c" => Ok(Commands::Clear),
            "jump" | "goto" => match args.get(1) {
                Some(arg) => arg
                    .parse::<usize>()
                    .map(|track| Commands::Jump { track })
                    .map_err(|_| ParseError::InvalidArgument {
                        argument: "track number".to_string(),
                        value: arg.to_string(),
                        expected: "a positive whole number".to_string(),
                    }),
                None => Err(ParseError::MissingArgument {
                    command: "jump".to_string(),
                    argument: "track number".to_string(),
                }),
            },
            "stop" => Ok(Commands::Stop),
            "join" | "j" => {
                if args.len() > 1 {
                    Ok(Commands::Join { path: Self::expand_path(&rest()) })
                } else {
                    Err(ParseError::MissingArgument {
                        command: "join".to_string(),
                        argument: "output path".to_string(),
                    })
                }
            }
            "leave" => Ok(Commands::Leave),
            "status" | "s" => Ok(Commands::Status),
            "help" | "h" => Err(ParseError::HelpRequested),
            _ => Err(ParseError::UnknownCommand {
                command: args[0].to_string(),
            }),
        }
    }

    /// Display player status in a formatted way
    pub fn display_status(status: &PlayerStatus) {
        StatusDisplay::display_full_status(status);
    }

    /// Display error message with formatting
    pub fn display_error(error: &PlayerError) {
        StatusDisplay::display_error(error);
    }

    /// Display help information
    pub fn display_help() {
        println!("Jukebox - Available Commands:");
        println!();
        println!("Playback Control:");
        println!("  play [source]         - Queue a file or URL; resume or start when empty (pl)");
        println!("  pause                 - Pause playback (pa)");
        println!("  resume                - Resume playback (re)");
        println!("  skip                  - Skip to the next track (sk)");
        println!("  jump <n>              - Play track number n");
        println!("  stop                  - Stop playback, keep the queue");
        println!();
        println!("Modes:");
        println!("  loop [off|song|queue] - Set loop mode, or cycle it (l)");
        println!("  shuffle [on|off]      - Set shuffle, or toggle it (sh)");
        println!("  volume [0-100]        - Set or show volume (vol, v)");
        println!();
        println!("Queue:");
        println!("  queue                 - Show the queue (q)");
        println!("  clear                 - Empty the queue (c)");
        println!();
        println!("Output:");
        println!("  join <path>           - Write encoded frames to a file (j)");
        println!("  leave                 - Stop and detach the output");
        println!();
        println!("General:");
        println!("  status                - Show current player status");
        println!("  help                  - Show this help message (h)");
        println!("  exit, quit            - Exit the player");
    }
}

/// Parse a volume percentage in 0..=100
pub fn parse_volume_percent(arg: &str) -> Result<u8, CommandError> {
    match arg.trim().trim_end_matches('%').parse::<u8>() {
        Ok(level) if level <= 100 => Ok(level),
        _ => Err(CommandError::invalid("volume", arg, "a whole number from 0 to 100")),
    }
}

/// Parse an on/off style argument
pub fn parse_toggle(arg: &str) -> Result<bool, CommandError> {
    match arg.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(CommandError::invalid("shuffle", arg, "on or off")),
    }
}

/// Command parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unknown command: {command}")]
    UnknownCommand { command: String },

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid argument {argument}: got '{value}', expected {expected}")]
    InvalidArgument {
        argument: String,
        value: String,
        expected: String,
    },

    #[error(transparent)]
    InvalidMode(#[from] CommandError),

    #[error("Help requested")]
    HelpRequested,
}

#[cfg(test)]
mod tests;
