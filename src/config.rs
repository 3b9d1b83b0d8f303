use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::logging::LogLevel;
use crate::resource::PropertyFile;
use crate::sound::ChannelId;

/// Settings gathered from the config file and the command line.
/// Unset fields fall back to [`EngineConfig::default`] in [`Options::resolve`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    // Commandline-only options
    pub config_file: Option<String>,
    pub ticks: Option<u32>,
    pub script: Vec<String>,

    // Commandline and config file options
    pub content_dir: Option<String>,
    pub line_table: Option<String>,
    pub log_level: Option<LogLevel>,
    pub sound_driver: Option<SoundDriver>,
    pub volume: Option<f32>,
    pub fps: Option<u32>,
    pub max_channels: Option<usize>,
    pub talkie_channel: Option<ChannelId>,
    pub music_channel: Option<ChannelId>,
    pub ambient_channel: Option<ChannelId>,
    pub max_frame_delta_ms: Option<u64>,
    pub resume_skip_frames: Option<u32>,
    pub subtitles: Option<bool>,
    pub blink_before_flap: Option<bool>,
    pub audio_cache_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundDriver {
    Rodio,
    Null,
}

impl SoundDriver {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rodio" | "default" => Ok(SoundDriver::Rodio),
            "null" | "none" => Ok(SoundDriver::Null),
            other => anyhow::bail!("Unknown sound driver '{}' (expected rodio or null)", other),
        }
    }
}

/// Resolved settings the engine runs with
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub fps: u32,
    pub max_channels: usize,
    pub talkie_channel: ChannelId,
    pub music_channel: ChannelId,
    pub ambient_channel: ChannelId,
    pub max_frame_delta: Duration,
    /// Zero-length frames after a modal pause ends
    pub resume_skip_frames: u32,
    pub subtitles: bool,
    pub blink_before_flap: bool,
    /// Sound buffers kept in memory; 0 keeps everything
    pub audio_cache_size: usize,
    pub content_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            max_channels: 20,
            talkie_channel: 0,
            music_channel: 1,
            ambient_channel: 2,
            max_frame_delta: Duration::from_millis(100),
            resume_skip_frames: 2,
            subtitles: true,
            blink_before_flap: true,
            audio_cache_size: 0,
            content_dir: PathBuf::from("assets"),
        }
    }
}

impl EngineConfig {
    /// Nominal duration of one tick
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

impl Options {
    /// Apply every key of a property file; unknown keys are ignored with a warning
    pub fn apply_properties(&mut self, props: &PropertyFile) -> Result<()> {
        for (key, value) in props.iter() {
            match key {
                "content_dir" => self.content_dir = Some(value.to_string()),
                "line_table" => self.line_table = Some(value.to_string()),
                "log_level" => {
                    self.log_level = Some(
                        LogLevel::parse(value)
                            .with_context(|| format!("Invalid log_level '{}'", value))?,
                    )
                }
                "sound" => self.sound_driver = Some(SoundDriver::parse(value)?),
                "volume" => {
                    let vol: i32 = value.parse().context("Invalid volume value")?;
                    self.volume = Some(parse_volume(vol));
                }
                "fps" => self.fps = Some(value.parse().context("Invalid fps value")?),
                "max_channels" => {
                    self.max_channels = Some(value.parse().context("Invalid max_channels value")?)
                }
                "talkie_channel" => self.talkie_channel = Some(parse_channel(value)?),
                "music_channel" => self.music_channel = Some(parse_channel(value)?),
                "ambient_channel" => self.ambient_channel = Some(parse_channel(value)?),
                "max_frame_delta_ms" => {
                    self.max_frame_delta_ms =
                        Some(value.parse().context("Invalid max_frame_delta_ms value")?)
                }
                "resume_skip_frames" => {
                    self.resume_skip_frames =
                        Some(value.parse().context("Invalid resume_skip_frames value")?)
                }
                "subtitles" => self.subtitles = Some(parse_bool(value)?),
                "blink_before_flap" => self.blink_before_flap = Some(parse_bool(value)?),
                "audio_cache_size" => {
                    self.audio_cache_size =
                        Some(value.parse().context("Invalid audio_cache_size value")?)
                }
                other => log::warn!("config: unknown key '{}'", other),
            }
        }
        Ok(())
    }

    pub fn resolve(&self) -> Result<EngineConfig> {
        let defaults = EngineConfig::default();
        let config = EngineConfig {
            fps: self.fps.unwrap_or(defaults.fps),
            max_channels: self.max_channels.unwrap_or(defaults.max_channels),
            talkie_channel: self.talkie_channel.unwrap_or(defaults.talkie_channel),
            music_channel: self.music_channel.unwrap_or(defaults.music_channel),
            ambient_channel: self.ambient_channel.unwrap_or(defaults.ambient_channel),
            max_frame_delta: self
                .max_frame_delta_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_frame_delta),
            resume_skip_frames: self.resume_skip_frames.unwrap_or(defaults.resume_skip_frames),
            subtitles: self.subtitles.unwrap_or(defaults.subtitles),
            blink_before_flap: self.blink_before_flap.unwrap_or(defaults.blink_before_flap),
            audio_cache_size: self.audio_cache_size.unwrap_or(defaults.audio_cache_size),
            content_dir: self
                .content_dir
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or(defaults.content_dir),
        };

        if config.fps == 0 {
            anyhow::bail!("fps must be positive");
        }
        if config.max_channels == 0 {
            anyhow::bail!("max_channels must be positive");
        }
        for (name, channel) in [
            ("talkie_channel", config.talkie_channel),
            ("music_channel", config.music_channel),
            ("ambient_channel", config.ambient_channel),
        ] {
            if channel >= config.max_channels {
                anyhow::bail!(
                    "{} {} out of range ({} channels)",
                    name,
                    channel,
                    config.max_channels
                );
            }
        }
        Ok(config)
    }
}

/// Load options from a property file; no file means defaults
pub fn load_config(path: Option<&Path>) -> Result<Options> {
    let mut options = Options::default();
    if let Some(path) = path {
        let props = PropertyFile::load(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        options.apply_properties(&props)?;
    }
    Ok(options)
}

/// Parse a volume value (0-100) to a float (0.0-1.0)
pub fn parse_volume(vol: i32) -> f32 {
    if vol < 0 {
        return 0.0;
    }
    if vol > 100 {
        return 1.0;
    }
    vol as f32 / 100.0
}

pub fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("Invalid boolean value '{}'", other),
    }
}

pub fn parse_channel(s: &str) -> Result<ChannelId> {
    let channel: i64 = s.trim().parse().context("Invalid channel value")?;
    if !(0..=255).contains(&channel) {
        anyhow::bail!("Channel must be between 0 and 255");
    }
    Ok(channel as ChannelId)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_parse_volume() {
        assert_eq!(parse_volume(0), 0.0);
        assert_eq!(parse_volume(50), 0.5);
        assert_eq!(parse_volume(100), 1.0);
        assert_eq!(parse_volume(-10), 0.0);
        assert_eq!(parse_volume(150), 1.0);
    }

    #[rstest]
    #[case("true", true)]
    #[case("On", true)]
    #[case("1", true)]
    #[case("no", false)]
    #[case("0", false)]
    fn test_parse_bool(#[case] input: &str, #[case] expected: bool) {
        assert_eq!(parse_bool(input).unwrap(), expected);
    }

    #[test]
    fn test_parse_bool_invalid() {
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_parse_channel() {
        assert_eq!(parse_channel("3").unwrap(), 3);
        assert!(parse_channel("-1").is_err());
        assert!(parse_channel("256").is_err());
        assert!(parse_channel("abc").is_err());
    }

    #[test]
    fn test_engine_config_default() {
        let config = Options::default().resolve().unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.fps, 60);
        assert_eq!(config.max_channels, 20);
        assert_eq!(config.music_channel, 1);
        assert_eq!(config.max_frame_delta, Duration::from_millis(100));
        assert_eq!(config.content_dir, PathBuf::from("assets"));
    }

    #[test]
    fn test_resolve_rejects_channel_outside_pool() {
        let options = Options {
            max_channels: Some(2),
            ambient_channel: Some(2),
            ..Default::default()
        };
        assert!(options.resolve().is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# engine settings").unwrap();
        writeln!(file, "fps = 30").unwrap();
        writeln!(file, "subtitles = off").unwrap();
        writeln!(file, "music_channel = 4").unwrap();
        writeln!(file, "sound = null").unwrap();
        writeln!(file, "volume = 50").unwrap();

        let options = load_config(Some(file.path())).unwrap();
        assert_eq!(options.fps, Some(30));
        assert_eq!(options.subtitles, Some(false));
        assert_eq!(options.sound_driver, Some(SoundDriver::Null));
        assert_eq!(options.volume, Some(0.5));

        let config = options.resolve().unwrap();
        assert_eq!(config.music_channel, 4);
        assert!(!config.subtitles);
    }

    #[test]
    fn test_load_config_bad_value() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fps = fast").unwrap();
        assert!(load_config(Some(file.path())).is_err());
    }

    #[test]
    fn test_load_config_without_file() {
        assert_eq!(load_config(None).unwrap(), Options::default());
    }
}
