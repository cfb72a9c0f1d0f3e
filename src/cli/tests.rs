use crate::cli::{parse_toggle, parse_volume_percent, CliApp, Commands, ParseError};
use crate::error::CommandError;
use crate::models::LoopMode;
use std::path::PathBuf;

#[test]
fn test_parse_command_play() {
    // Bare play resumes or starts
    let result = CliApp::parse_command("play");
    assert!(matches!(result, Ok(Commands::Play { source: None })));

    let result = CliApp::parse_command("play /music/song.flac");
    assert_eq!(
        result.unwrap(),
        Commands::Play {
            source: Some("/music/song.flac".to_string())
        }
    );

    // Sources with spaces are kept whole
    let result = CliApp::parse_command("pl /music/my song.mp3");
    assert_eq!(
        result.unwrap(),
        Commands::Play {
            source: Some("/music/my song.mp3".to_string())
        }
    );

    let result = CliApp::parse_command("p https://example.com/stream.ogg");
    assert_eq!(
        result.unwrap(),
        Commands::Play {
            source: Some("https://example.com/stream.ogg".to_string())
        }
    );
}

#[test]
fn test_parse_command_basic_controls() {
    assert!(matches!(CliApp::parse_command("pause"), Ok(Commands::Pause)));
    assert!(matches!(CliApp::parse_command("pa"), Ok(Commands::Pause)));
    assert!(matches!(CliApp::parse_command("resume"), Ok(Commands::Resume)));
    assert!(matches!(CliApp::parse_command("re"), Ok(Commands::Resume)));
    assert!(matches!(CliApp::parse_command("skip"), Ok(Commands::Skip)));
    assert!(matches!(CliApp::parse_command("sk"), Ok(Commands::Skip)));
    assert!(matches!(CliApp::parse_command("next"), Ok(Commands::Skip)));
    assert!(matches!(CliApp::parse_command("stop"), Ok(Commands::Stop)));
    assert!(matches!(CliApp::parse_command("queue"), Ok(Commands::Queue)));
    assert!(matches!(CliApp::parse_command("q"), Ok(Commands::Queue)));
    assert!(matches!(CliApp::parse_command("clear"), Ok(Commands::Clear)));
    assert!(matches!(CliApp::parse_command("c"), Ok(Commands::Clear)));
    assert!(matches!(CliApp::parse_command("leave"), Ok(Commands::Leave)));
    assert!(matches!(CliApp::parse_command("status"), Ok(Commands::Status)));
}

#[test]
fn test_parse_command_case_insensitive() {
    assert!(matches!(CliApp::parse_command("PAUSE"), Ok(Commands::Pause)));
    assert!(matches!(CliApp::parse_command("  Skip  "), Ok(Commands::Skip)));
}

#[test]
fn test_parse_command_loop() {
    assert_eq!(
        CliApp::parse_command("loop").unwrap(),
        Commands::Loop { mode: None }
    );
    assert_eq!(
        CliApp::parse_command("loop song").unwrap(),
        Commands::Loop {
            mode: Some(LoopMode::Song)
        }
    );
    assert_eq!(
        CliApp::parse_command("l queue").unwrap(),
        Commands::Loop {
            mode: Some(LoopMode::Queue)
        }
    );
    assert_eq!(
        CliApp::parse_command("loop off").unwrap(),
        Commands::Loop {
            mode: Some(LoopMode::Off)
        }
    );

    let result = CliApp::parse_command("loop forever");
    assert!(matches!(
        result,
        Err(ParseError::InvalidMode(CommandError::InvalidModeArgument { .. }))
    ));
}

#[test]
fn test_parse_command_volume() {
    assert_eq!(
        CliApp::parse_command("volume").unwrap(),
        Commands::Volume { percent: None }
    );
    assert_eq!(
        CliApp::parse_command("vol 50").unwrap(),
        Commands::Volume { percent: Some(50) }
    );
    assert_eq!(
        CliApp::parse_command("v 0").unwrap(),
        Commands::Volume { percent: Some(0) }
    );
    assert!(matches!(
        CliApp::parse_command("volume 101"),
        Err(ParseError::InvalidMode(_))
    ));
    assert!(matches!(
        CliApp::parse_command("volume loud"),
        Err(ParseError::InvalidMode(_))
    ));
}

#[test]
fn test_parse_command_shuffle() {
    assert_eq!(
        CliApp::parse_command("shuffle").unwrap(),
        Commands::Shuffle { enabled: None }
    );
    assert_eq!(
        CliApp::parse_command("sh on").unwrap(),
        Commands::Shuffle {
            enabled: Some(true)
        }
    );
    assert_eq!(
        CliApp::parse_command("shuffle off").unwrap(),
        Commands::Shuffle {
            enabled: Some(false)
        }
    );
    assert!(CliApp::parse_command("shuffle maybe").is_err());
}

#[test]
fn test_parse_command_jump() {
    assert_eq!(
        CliApp::parse_command("jump 3").unwrap(),
        Commands::Jump { track: 3 }
    );

    match CliApp::parse_command("jump") {
        Err(ParseError::MissingArgument { command, .. }) => assert_eq!(command, "jump"),
        other => panic!("Expected MissingArgument, got {:?}", other),
    }

    match CliApp::parse_command("jump -1") {
        Err(ParseError::InvalidArgument { value, .. }) => assert_eq!(value, "-1"),
        other => panic!("Expected InvalidArgument, got {:?}", other),
    }
}

#[test]
fn test_parse_command_join() {
    assert_eq!(
        CliApp::parse_command("join /tmp/out.dca").unwrap(),
        Commands::Join {
            path: PathBuf::from("/tmp/out.dca")
        }
    );
    assert_eq!(
        CliApp::parse_command("j /tmp/my out.dca").unwrap(),
        Commands::Join {
            path: PathBuf::from("/tmp/my out.dca")
        }
    );
    assert!(matches!(
        CliApp::parse_command("join"),
        Err(ParseError::MissingArgument { .. })
    ));
}

#[test]
fn test_parse_command_errors() {
    assert!(matches!(
        CliApp::parse_command(""),
        Err(ParseError::EmptyCommand)
    ));
    assert!(matches!(
        CliApp::parse_command("   "),
        Err(ParseError::EmptyCommand)
    ));
    assert!(matches!(
        CliApp::parse_command("help"),
        Err(ParseError::HelpRequested)
    ));
    assert!(matches!(
        CliApp::parse_command("h"),
        Err(ParseError::HelpRequested)
    ));

    match CliApp::parse_command("rewind") {
        Err(ParseError::UnknownCommand { command }) => assert_eq!(command, "rewind"),
        other => panic!("Expected UnknownCommand, got {:?}", other),
    }
}

#[test]
fn test_parse_volume_percent() {
    assert_eq!(parse_volume_percent("100").unwrap(), 100);
    assert_eq!(parse_volume_percent("75%").unwrap(), 75);
    assert!(parse_volume_percent("-5").is_err());
    assert!(parse_volume_percent("300").is_err());
    assert!(parse_volume_percent("").is_err());
}

#[test]
fn test_parse_toggle() {
    assert!(parse_toggle("on").unwrap());
    assert!(parse_toggle("TRUE").unwrap());
    assert!(!parse_toggle("off").unwrap());
    assert!(!parse_toggle("0").unwrap());
    assert!(parse_toggle("sideways").is_err());
}

#[test]
fn test_parse_error_display() {
    let error = ParseError::MissingArgument {
        command: "join".to_string(),
        argument: "output path".to_string(),
    };
    assert_eq!(error.to_string(), "Missing argument for join: output path");

    let error = ParseError::from(CommandError::invalid("loop", "sideways", "off, song or queue"));
    assert!(error.to_string().contains("sideways"));
}

mod path_tests {
    use super::*;

    #[test]
    fn test_expand_path_without_tilde() {
        assert_eq!(CliApp::expand_path("/abs/path"), PathBuf::from("/abs/path"));
        assert_eq!(CliApp::expand_path("relative/x"), PathBuf::from("relative/x"));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(CliApp::expand_path("~"), home);
            assert_eq!(CliApp::expand_path("~/music/a.flac"), home.join("music/a.flac"));
        }
    }

    #[test]
    fn test_tilde_inside_path_untouched() {
        assert_eq!(CliApp::expand_path("/a/~/b"), PathBuf::from("/a/~/b"));
    }
}

#[test]
fn test_cli_args_parse() {
    use clap::Parser;

    let app = CliApp::try_parse_from([
        "jukebox",
        "--output",
        "/tmp/out.dca",
        "--requester",
        "dj",
        "--log-level",
        "debug",
        "a.mp3",
        "b.mp3",
    ])
    .unwrap();
    assert_eq!(app.output, Some(PathBuf::from("/tmp/out.dca")));
    assert_eq!(app.requester.as_deref(), Some("dj"));
    assert_eq!(app.log_level.as_deref(), Some("debug"));
    assert_eq!(app.sources, vec!["a.mp3".to_string(), "b.mp3".to_string()]);
    assert!(app.config.is_none());
}

#[test]
fn test_until_finished_requires_output() {
    use clap::Parser;

    assert!(CliApp::try_parse_from(["jukebox", "--until-finished", "a.mp3"]).is_err());

    let app =
        CliApp::try_parse_from(["jukebox", "--until-finished", "-o", "out.dca", "a.mp3"]).unwrap();
    assert!(app.until_finished);
}
