//! Application settings and command-line options.
//!
//! Settings come from an optional JSON file; command-line flags override
//! whatever the file says. Every field has a default, so an empty `{}` (or
//! no file at all) is a valid configuration.

use crate::capture::AnalyzerSettings;
use crate::render::{SURFACE_HEIGHT, SURFACE_WIDTH};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SoundFont used for MIDI playback.
    pub soundfont: Option<PathBuf>,
    /// Directory exports are written to.
    pub output_dir: PathBuf,
    /// Samples per pitch analysis window.
    pub analysis_window: usize,
    /// Minimum window power for pitch detection.
    pub power_threshold: f64,
    /// Minimum clarity for pitch detection.
    pub clarity_threshold: f64,
    pub surface_width: u32,
    pub surface_height: u32,
    /// MIDI file loaded at startup and by the load key.
    pub midi_file: Option<PathBuf>,
    /// WAV file used instead of the microphone.
    pub wav_input: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        let analyzer = AnalyzerSettings::default();
        Self {
            soundfont: None,
            output_dir: PathBuf::from("output"),
            analysis_window: 2048,
            power_threshold: analyzer.power_threshold,
            clarity_threshold: analyzer.clarity_threshold,
            surface_width: SURFACE_WIDTH,
            surface_height: SURFACE_HEIGHT,
            midi_file: None,
            wav_input: None,
        }
    }
}

impl Settings {
    /// Reads settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Builds the effective settings: the config file named on the command
    /// line (if any) with the command-line overrides applied.
    pub fn from_cli(cli: &CliOptions) -> Result<Self> {
        let mut settings = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        settings.apply_cli(cli);
        Ok(settings)
    }

    /// Overrides fields with the values given on the command line.
    pub fn apply_cli(&mut self, cli: &CliOptions) {
        if let Some(path) = &cli.soundfont {
            self.soundfont = Some(path.clone());
        }
        if let Some(path) = &cli.midi {
            self.midi_file = Some(path.clone());
        }
        if let Some(path) = &cli.wav {
            self.wav_input = Some(path.clone());
        }
        if let Some(dir) = &cli.output {
            self.output_dir = dir.clone();
        }
    }

    pub fn analyzer_settings(&self) -> AnalyzerSettings {
        AnalyzerSettings {
            power_threshold: self.power_threshold,
            clarity_threshold: self.clarity_threshold,
        }
    }
}

/// Command-line options for the application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOptions {
    /// JSON settings file.
    pub config: Option<PathBuf>,
    /// Path to a SoundFont file.
    pub soundfont: Option<PathBuf>,
    /// MIDI file to load on startup.
    pub midi: Option<PathBuf>,
    /// WAV file to analyse instead of the microphone.
    pub wav: Option<PathBuf>,
    /// Export directory.
    pub output: Option<PathBuf>,
    /// `--help` was given.
    pub help: bool,
}

pub const USAGE: &str = "\
pentagrama - see what you sing on a staff

Usage: pentagrama [OPTIONS] [FILE.mid|FILE.sf2]

Options:
  -c, --config PATH      Load settings from a JSON file
  -sf, --soundfont PATH  SoundFont (.sf2) used for MIDI playback
  -m, --midi PATH        Load a MIDI file on startup
  -w, --wav PATH         Analyse a WAV file instead of the microphone
  -o, --output DIR       Directory for exported files (default: output)
  -h, --help             Print this help message

Set RUST_LOG (e.g. RUST_LOG=debug) to log to stderr.";

impl CliOptions {
    /// Parses the process arguments.
    pub fn parse() -> Result<Self> {
        Self::parse_from(std::env::args().skip(1))
    }

    /// Parses arguments (without the program name).
    ///
    /// Supports `--config`, `--soundfont`, `--midi`, `--wav`, `--output`
    /// and `--help`, plus bare `.mid`/`.midi` and `.sf2` paths.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown options or a flag missing its value.
    pub fn parse_from<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| -> Result<PathBuf> {
                match args.next() {
                    Some(v) => Ok(PathBuf::from(v)),
                    None => bail!("{} requires a path argument", flag),
                }
            };
            match arg.as_str() {
                "--config" | "-c" => options.config = Some(value("--config")?),
                "--soundfont" | "-sf" => options.soundfont = Some(value("--soundfont")?),
                "--midi" | "-m" => options.midi = Some(value("--midi")?),
                "--wav" | "-w" => options.wav = Some(value("--wav")?),
                "--output" | "-o" => options.output = Some(value("--output")?),
                "--help" | "-h" => options.help = true,
                other if other.ends_with(".sf2") => options.soundfont = Some(PathBuf::from(other)),
                other if other.ends_with(".mid") || other.ends_with(".midi") => {
                    options.midi = Some(PathBuf::from(other))
                }
                other => bail!("Unknown option: {}\nUse --help for usage information", other),
            }
        }

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.output_dir, PathBuf::from("output"));
        assert_eq!(settings.analysis_window, 2048);
        assert_eq!((settings.surface_width, settings.surface_height), (800, 300));
        assert!(settings.soundfont.is_none());
    }

    #[test]
    fn test_parse_flags() {
        let cli = CliOptions::parse_from(args(&[
            "--soundfont",
            "piano.sf2",
            "-m",
            "song.mid",
            "--output",
            "exports",
        ]))
        .unwrap();
        assert_eq!(cli.soundfont, Some(PathBuf::from("piano.sf2")));
        assert_eq!(cli.midi, Some(PathBuf::from("song.mid")));
        assert_eq!(cli.output, Some(PathBuf::from("exports")));
        assert!(!cli.help);
    }

    #[test]
    fn test_positional_files() {
        let cli = CliOptions::parse_from(args(&["font.sf2", "tune.midi"])).unwrap();
        assert_eq!(cli.soundfont, Some(PathBuf::from("font.sf2")));
        assert_eq!(cli.midi, Some(PathBuf::from("tune.midi")));
    }

    #[test]
    fn test_parse_errors() {
        assert!(CliOptions::parse_from(args(&["--wav"])).is_err());
        assert!(CliOptions::parse_from(args(&["--bogus"])).is_err());
        assert!(CliOptions::parse_from(args(&["-h"])).unwrap().help);
    }

    #[test]
    fn test_file_then_cli_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{ "analysis_window": 4096, "output_dir": "from-file", "soundfont": "a.sf2" }"#,
        )
        .unwrap();

        let cli = CliOptions {
            config: Some(path),
            soundfont: Some(PathBuf::from("b.sf2")),
            ..CliOptions::default()
        };
        let settings = Settings::from_cli(&cli).unwrap();

        assert_eq!(settings.analysis_window, 4096);
        assert_eq!(settings.output_dir, PathBuf::from("from-file"));
        assert_eq!(settings.soundfont, Some(PathBuf::from("b.sf2")));
        assert_eq!(settings.surface_width, 800);
    }

    #[test]
    fn test_invalid_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Settings::load(&path).is_err());
    }
}
