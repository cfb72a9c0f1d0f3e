use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, log, warn};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use voice_jukebox::audio::{spawn_frame_writer, ChannelSink, EncoderFactory};
use voice_jukebox::cli::{CliApp, Commands, ParseError, StatusDisplay};
use voice_jukebox::config::ConfigManager;
use voice_jukebox::error::{PlayerError, QueueError, StreamError};
use voice_jukebox::logging::{PlaybackLogger, LOG_LEVEL_ENV};
use voice_jukebox::models::Track;
use voice_jukebox::player::{PlayAction, PlaybackController, PlayerEvent};

/// How long `leave` waits for the frame writer to drain
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Main application controller that wires the CLI to a playback session
pub struct AppController {
    controller: PlaybackController,
    config_manager: ConfigManager,
    requester: String,
    writer: Option<JoinHandle<std::io::Result<u64>>>,
    events: broadcast::Receiver<PlayerEvent>,
}

impl AppController {
    /// Load configuration, initialize logging and start the playback session
    pub fn new(cli: &CliApp) -> Result<Self, PlayerError> {
        let config_manager = match &cli.config {
            Some(path) => ConfigManager::with_path(path.clone())?,
            None => ConfigManager::new()?,
        };
        let config = config_manager.get_config().clone();

        // Command line beats the environment, which beats the config file
        let log_level = cli
            .log_level
            .clone()
            .or_else(|| std::env::var(LOG_LEVEL_ENV).ok())
            .unwrap_or_else(|| config.log_level.clone());
        if let Err(e) = PlaybackLogger::init_with_level(&log_level) {
            eprintln!("Warning: Failed to initialize logging: {}", e);
        }

        let encoder: Arc<dyn EncoderFactory> = Arc::new(config.encoder_settings());
        let controller =
            PlaybackController::new(config.source_provider(), encoder, config.default_volume);
        let events = controller.subscribe_events();
        let requester = cli
            .requester
            .clone()
            .unwrap_or_else(|| config.default_requester.clone());

        info!(
            "Session ready: codec {}, {} ms frames, source {}",
            config.codec.as_str(),
            config.frame_duration_ms,
            config.source_kind.as_str()
        );

        Ok(Self {
            controller,
            config_manager,
            requester,
            writer: None,
            events,
        })
    }

    /// Queue the startup sources and attach the startup output
    pub async fn initialize(&mut self, cli: &CliApp) -> Result<(), PlayerError> {
        for source in &cli.sources {
            self.enqueue(source);
        }
        if let Some(path) = &cli.output {
            self.join(&CliApp::expand_path(&path.to_string_lossy())).await?;
        }
        Ok(())
    }

    /// Execute a single command
    pub async fn execute_command(&mut self, command: Commands) -> Result<(), PlayerError> {
        match command {
            Commands::Play { source: Some(source) } => {
                self.enqueue(&source);
                if !self.controller.status().sink_attached {
                    println!("No output attached. Use 'join <path>' to start streaming.");
                }
            }
            Commands::Play { source: None } => match self.controller.play() {
                PlayAction::Resumed => println!("OK: Resumed"),
                PlayAction::Started => println!("OK: Playing from the top"),
                PlayAction::Nothing => {
                    if self.controller.listing().is_empty() {
                        return Err(QueueError::EmptyQueue.into());
                    }
                    println!("Already playing");
                }
            },
            Commands::Queue => {
                StatusDisplay::display_queue(&self.controller.listing());
            }
            Commands::Skip => match self.controller.skip() {
                Some(position) if position >= 0 => {
                    println!("OK: Skipped to track {}", position + 1)
                }
                Some(_) => println!("OK: Skipped past the end of the queue"),
                None => println!("Nothing is playing"),
            },
            Commands::Loop { mode } => {
                let mode = match mode {
                    Some(mode) => self.controller.set_loop_mode(mode),
                    None => self.controller.cycle_loop_mode(),
                };
                println!("OK: Loop mode {}", mode);
            }
            Commands::Volume { percent: Some(percent) } => {
                self.controller.set_volume(f32::from(percent) / 100.0)?;
                println!("OK: Volume set to {}%", percent);
            }
            Commands::Volume { percent: None } => {
                println!("Volume: {}%", self.controller.status().volume_percent());
            }
            Commands::Pause => {
                if self.controller.pause() {
                    println!("OK: Paused");
                } else {
                    println!("Nothing is playing");
                }
            }
            Commands::Resume => {
                if self.controller.resume() {
                    println!("OK: Resumed");
                } else {
                    println!("Nothing is paused");
                }
            }
            Commands::Shuffle { enabled } => {
                let shuffle = match enabled {
                    Some(enabled) => self.controller.set_shuffle(enabled),
                    None => self.controller.toggle_shuffle(),
                };
                println!("OK: Shuffle {}", if shuffle { "on" } else { "off" });
            }
            Commands::Clear => {
                self.controller.clear();
                println!("OK: Queue cleared");
            }
            Commands::Jump { track } => {
                self.controller.jump(track)?;
                println!("OK: Jumped to track {}", track);
            }
            Commands::Stop => {
                self.controller.stop();
                println!("OK: Stopped");
            }
            Commands::Join { path } => {
                self.join(&path).await?;
            }
            Commands::Leave => {
                self.leave().await;
                println!("OK: Left");
            }
            Commands::Status => {
                CliApp::display_status(&self.controller.status());
            }
        }
        Ok(())
    }

    fn enqueue(&self, source: &str) {
        let track = Track::from_reference(source, &self.requester);
        let title = track.title.clone();
        let index = self.controller.enqueue(track);
        println!("OK: Queued {:02}. {}", index + 1, title);
    }

    /// Attach a paced DCA frame writer on `path`
    async fn join(&mut self, path: &Path) -> Result<(), PlayerError> {
        if self.controller.status().sink_attached {
            println!("Output already attached. Use 'leave' first.");
            return Ok(());
        }

        let file = tokio::fs::File::create(path).await?;
        let config = self.config_manager.get_config();
        let (sink, receiver) = ChannelSink::new(config.sink_queue_frames);
        let pace = config.pace_output.then(|| config.frame_spec().duration());

        self.reap_writer().await;
        self.writer = Some(spawn_frame_writer(receiver, file, pace));
        self.controller.attach_sink(Arc::new(sink));

        info!("Streaming to {}", path.display());
        println!("OK: Streaming to {}", path.display());
        Ok(())
    }

    async fn leave(&mut self) {
        self.controller.leave();
        self.reap_writer().await;
    }

    /// Wait for the frame writer to finish once its sink is gone
    async fn reap_writer(&mut self) {
        let Some(handle) = self.writer.take() else {
            return;
        };

        match tokio::time::timeout(WRITER_DRAIN_TIMEOUT, handle).await {
            Ok(Ok(Ok(frames))) => info!("Output closed after {} frames", frames),
            Ok(Ok(Err(e))) => warn!("Output failed: {}", e),
            Ok(Err(e)) => warn!("Frame writer task ended abnormally: {}", e),
            Err(_) => warn!("Frame writer did not finish within {:?}", WRITER_DRAIN_TIMEOUT),
        }
    }

    /// Print an event for the user. Returns true if anything was printed.
    async fn handle_event(&mut self, event: Result<PlayerEvent, RecvError>) -> bool {
        match event {
            Ok(PlayerEvent::TrackStarted { position, track }) => {
                println!();
                StatusDisplay::display_now_playing(position, &track);
                true
            }
            Ok(PlayerEvent::QueueFinished) => {
                println!();
                println!("Queue finished");
                true
            }
            Ok(PlayerEvent::SinkLost) => {
                self.reap_writer().await;
                let error = PlayerError::Stream(StreamError::SinkUnavailable(
                    "the output stopped accepting frames".to_string(),
                ));
                println!();
                StatusDisplay::display_error(&error);
                true
            }
            Ok(event) => {
                debug!("Player event: {:?}", event);
                false
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!("Missed {} player events", skipped);
                false
            }
            Err(RecvError::Closed) => false,
        }
    }

    /// Run interactive mode
    pub async fn run_interactive_mode(&mut self) -> Result<(), PlayerError> {
        println!("Jukebox v0.1.0");
        println!("Type 'help' for available commands, 'exit' or 'quit' to quit.");
        println!();

        let shutdown_flag = install_interrupt_handler();

        // Shutdown poll; stdin is read on a dedicated thread
        let mut interval = tokio::time::interval(Duration::from_millis(100));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if tx.send(line.trim().to_string()).is_err() {
                            break;
                        }
                    }
                }
            }
        });
        let mut awaiting_input = false;

        loop {
            if shutdown_flag.load(Ordering::Relaxed) {
                break;
            }

            if !awaiting_input {
                print!("> ");
                let _ = std::io::Write::flush(&mut std::io::stdout());
                awaiting_input = true;
            }

            tokio::select! {
                biased;

                line = rx.recv() => {
                    awaiting_input = false;
                    let Some(line) = line else {
                        // EOF
                        println!();
                        break;
                    };
                    if line.is_empty() {
                        continue;
                    }
                    if line == "exit" || line == "quit" {
                        println!("Goodbye!");
                        break;
                    }
                    match CliApp::parse_command(&line) {
                        Ok(command) => {
                            if let Err(e) = self.execute_command(command).await {
                                self.handle_error(&e);
                            }
                        }
                        Err(ParseError::HelpRequested) => CliApp::display_help(),
                        Err(e) => self.handle_error(&PlayerError::Parse(e)),
                    }
                }

                event = self.events.recv() => {
                    if self.handle_event(event).await {
                        awaiting_input = false;
                    }
                }

                _ = interval.tick() => {}
            }
        }

        self.shutdown().await
    }

    /// Stream the queue once and exit on completion, output loss or interrupt
    pub async fn run_until_finished(&mut self) -> Result<(), PlayerError> {
        if self.controller.listing().is_empty() {
            self.shutdown().await?;
            return Err(QueueError::EmptyQueue.into());
        }

        let shutdown_flag = install_interrupt_handler();
        let mut interval = tokio::time::interval(Duration::from_millis(100));

        while !shutdown_flag.load(Ordering::Relaxed) {
            tokio::select! {
                event = self.events.recv() => {
                    let done = matches!(
                        event,
                        Ok(PlayerEvent::QueueFinished | PlayerEvent::SinkLost) | Err(RecvError::Closed)
                    );
                    self.handle_event(event).await;
                    if done {
                        break;
                    }
                }
                _ = interval.tick() => {}
            }
        }

        self.shutdown().await
    }

    /// Stop the session, drain the output and save settings
    pub async fn shutdown(&mut self) -> Result<(), PlayerError> {
        println!("Shutting down...");

        self.controller.shutdown().await;
        self.controller.detach_sink();
        self.reap_writer().await;

        if let Err(e) = self.config_manager.set_volume(self.controller.volume()) {
            eprintln!("Warning: Error saving configuration: {}", e);
        }

        println!("Shutdown complete.");
        Ok(())
    }

    /// Log an error at its severity and show it to the user
    fn handle_error(&self, error: &PlayerError) {
        log!(error.severity().log_level(), "{}", error);
        StatusDisplay::display_error(error);
    }
}

/// Set a flag on Ctrl-C instead of terminating the process
fn install_interrupt_handler() -> Arc<AtomicBool> {
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = Arc::clone(&shutdown_flag);

    if let Err(e) = ctrlc::set_handler(move || {
        println!("\nReceived interrupt signal. Shutting down gracefully...");
        shutdown_flag_clone.store(true, Ordering::Relaxed);
    }) {
        warn!("Could not install Ctrl-C handler: {}", e);
    }
    shutdown_flag
}

#[tokio::main]
async fn main() -> Result<(), PlayerError> {
    let cli = CliApp::parse();

    let mut app = match AppController::new(&cli) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Failed to initialize application: {}", e);
            StatusDisplay::display_simple_error(&e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.initialize(&cli).await {
        app.handle_error(&e);
        app.shutdown().await?;
        std::process::exit(1);
    }

    let result = if cli.until_finished {
        app.run_until_finished().await
    } else {
        app.run_interactive_mode().await
    };
    if let Err(e) = result {
        app.handle_error(&e);
        std::process::exit(1);
    }

    info!("Application shutdown complete");
    Ok(())
}
