//! Command-line argument parsing.

use clap::Parser;
use log::warn;
use std::path::PathBuf;

use crate::audio::sources::SourceKind;
use crate::params::{Settings, VisualizerMode};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Cosmos")]
#[command(about = "Audio-reactive cosmic node field visualizer", long_about = None)]
pub struct Args {
    /// Play a WAV file instead of the built-in demo composition
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Visualize the default input device instead of playing audio
    #[arg(long, conflicts_with = "file")]
    pub mic: bool,

    /// Layout mode: classic, bpm, journey
    #[arg(long, value_name = "MODE", default_value = "classic")]
    pub mode: String,

    /// Spawn credit accrued per frame
    #[arg(long, value_name = "RATE", default_value = "1.0")]
    pub spawn_rate: f32,

    /// Placement radius scale (world units)
    #[arg(long, value_name = "UNITS", default_value = "50")]
    pub spread: f32,

    /// Visual node scale
    #[arg(long, value_name = "SCALE", default_value = "1.0")]
    pub node_size: f32,

    /// Node lifetime in seconds (0.5 - 5.0)
    #[arg(long, value_name = "SECONDS", default_value = "2.0")]
    pub lifetime: f32,

    /// Orbit auto-rotation speed for classic/bpm modes
    #[arg(long, value_name = "SPEED", default_value = "0.0")]
    pub camera_speed: f32,
}

impl Args {
    /// Parse the layout mode, falling back to classic on unknown values
    pub fn parse_mode(&self) -> VisualizerMode {
        match self.mode.to_lowercase().as_str() {
            "classic" => VisualizerMode::Classic,
            "bpm" => VisualizerMode::Bpm,
            "journey" => VisualizerMode::Journey,
            other => {
                warn!("Unknown mode '{}', using classic", other);
                VisualizerMode::Classic
            }
        }
    }

    /// Build the initial settings from the command line
    pub fn settings(&self) -> Settings {
        let mut settings = Settings {
            node_size: self.node_size,
            spawn_rate: self.spawn_rate.max(0.0),
            spread: self.spread,
            camera_speed: self.camera_speed,
            mode: self.parse_mode(),
            ..Default::default()
        };
        settings.set_lifetime(self.lifetime);
        settings
    }

    /// Which audio source to drive the session with
    pub fn source(&self) -> SourceKind {
        if let Some(path) = &self.file {
            SourceKind::File(path.clone())
        } else if self.mic {
            SourceKind::Microphone
        } else {
            SourceKind::Demo
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing_with_fallback() {
        let mut args = Args::try_parse_from(["cosmos"]).unwrap();

        args.mode = "Journey".to_string();
        assert_eq!(args.parse_mode(), VisualizerMode::Journey);

        args.mode = "warp".to_string();
        assert_eq!(args.parse_mode(), VisualizerMode::Classic);
    }

    #[test]
    fn test_settings_clamp_lifetime() {
        let args = Args::try_parse_from(["cosmos", "--lifetime", "9.0"]).unwrap();
        assert_eq!(args.settings().lifetime_s, 5.0);
    }

    #[test]
    fn test_source_selection() {
        let args = Args::try_parse_from(["cosmos", "--file", "track.wav"]).unwrap();
        assert!(matches!(args.source(), SourceKind::File(_)));

        let args = Args::try_parse_from(["cosmos", "--mic"]).unwrap();
        assert!(matches!(args.source(), SourceKind::Microphone));

        let args = Args::try_parse_from(["cosmos"]).unwrap();
        assert!(matches!(args.source(), SourceKind::Demo));
    }
}
