use crate::error::{ErrorSeverity, PlayerError, QueueError, StreamError};
use crate::models::{PlayerStatus, QueueListing, Track, QUEUE_WINDOW_SIZE};

/// Status display formatter for the CLI
pub struct StatusDisplay;

impl StatusDisplay {
    /// Display the full session status: track, modes and output
    pub fn display_full_status(status: &PlayerStatus) {
        println!("┌─ Player Status ─────────────────────────────────────────┐");

        match &status.current_track {
            Some(track) => {
                println!("│ Track {} of {}", status.position + 1, status.queue_len);
                Self::display_track_info(track);
            }
            None => {
                println!("│ No track selected ({} queued)", status.queue_len);
            }
        }

        println!("│");
        println!("│ Status: {}", status.state.as_str());
        println!("│ Loop: {}", status.loop_mode.as_str());
        println!("│ Shuffle: {}", if status.shuffle { "on" } else { "off" });
        println!("│ Volume: {}%", status.volume_percent());
        println!(
            "│ Output: {}",
            if status.sink_attached { "attached" } else { "none" }
        );
        println!("└─────────────────────────────────────────────────────────┘");
    }

    fn display_track_info(track: &Track) {
        println!("│ Title: {}", Self::truncate(&track.title, 50));
        println!("│ Author: {}", Self::truncate(&track.author, 49));
        println!("│ Duration: {}", track.duration_formatted());
        println!("│ Requested by: {}", Self::truncate(&track.requester, 43));
        println!("│ Source: {}", Self::truncate(track.source.as_str(), 49));
    }

    /// Announce a track that just started streaming
    pub fn display_now_playing(position: isize, track: &Track) {
        println!(
            "Now playing: {:02}. {} - {} [{}]",
            position + 1,
            track.author,
            track.title,
            track.duration_formatted()
        );
    }

    /// Display the visible window of the queue
    pub fn display_queue(listing: &QueueListing) {
        if listing.is_empty() {
            println!("{}", listing.render());
            return;
        }

        println!("┌─ Queue ({} tracks) ─────────────────────────────────────┐", listing.len());
        for entry in listing.window(QUEUE_WINDOW_SIZE) {
            let marker = if entry.index as isize == listing.position { ">" } else { " " };
            println!("│{} {}", marker, Self::truncate(&entry.render(), 54));
        }
        let hidden = listing.len().saturating_sub(QUEUE_WINDOW_SIZE);
        if hidden > 0 {
            println!("│  ... {} more", hidden);
        }
        println!("└─────────────────────────────────────────────────────────┘");
    }

    /// Display error message with formatting and recovery suggestions
    pub fn display_error(error: &PlayerError) {
        let severity = error.severity();
        let severity_icon = match severity {
            ErrorSeverity::Info => "ℹ",
            ErrorSeverity::Warning => "⚠",
            ErrorSeverity::Error => "✗",
        };

        eprintln!(
            "┌─ {} {} ─────────────────────────────────────────────────┐",
            severity_icon,
            severity.as_str()
        );

        for line in Self::wrap_text(&error.user_message(), 55) {
            eprintln!("│ {}", line);
        }

        let suggestions = error.recovery_suggestions();
        if !suggestions.is_empty() {
            eprintln!("│");
            eprintln!("│ Suggestions:");
            for suggestion in suggestions.iter().take(3) {
                for line in Self::wrap_text(&format!("• {}", suggestion), 53) {
                    eprintln!("│   {}", line);
                }
            }
        }

        Self::display_error_context(error);

        eprintln!("└─────────────────────────────────────────────────────────┘");
    }

    /// Display additional context for specific error types
    fn display_error_context(error: &PlayerError) {
        match error {
            PlayerError::Stream(StreamError::SourceUnavailable { .. }) => {
                eprintln!("│");
                eprintln!("│ The queue moves on to the next track");
            }
            PlayerError::Stream(StreamError::SinkUnavailable(_)) => {
                eprintln!("│");
                eprintln!("│ Reattach an output with 'join <path>'");
            }
            PlayerError::Queue(QueueError::EmptyQueue) => {
                eprintln!("│");
                eprintln!("│ Add tracks: 'play <path or url>'");
            }
            PlayerError::Config(_) => {
                eprintln!("│");
                eprintln!("│ Configuration will use default values");
            }
            _ => {}
        }
    }

    /// Wrap text to fit within specified width
    fn wrap_text(text: &str, width: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.len() + word.len() < width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(current_line);
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            lines.push(current_line);
        }

        lines
            .into_iter()
            .map(|line| format!("{:<width$}", line, width = width))
            .collect()
    }

    /// Display a simple error message for non-interactive contexts
    pub fn display_simple_error(error: &PlayerError) {
        eprintln!("[{}] {}", error.severity().as_str(), error.user_message());

        if let Some(suggestion) = error.recovery_suggestions().first() {
            eprintln!("Suggestion: {}", suggestion);
        }
    }

    /// Shorten text to at most `max_chars` characters, marking the cut with "..."
    pub fn truncate(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }
        let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
