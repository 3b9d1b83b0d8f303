use crate::config::{parse_channel, parse_volume, Options, SoundDriver};
use crate::logging::LogLevel;
use anyhow::{Context, Result};
use clap::Parser;

/// scummy - adventure engine runtime
#[derive(Parser, Debug, Default)]
#[command(name = "scummy")]
#[command(version = "0.3.0")]
#[command(about = "Point-and-click adventure engine runtime (headless dialogue runner)", long_about = None)]
pub struct Cli {
    /// Game content directory
    #[arg(short = 'C', long, value_name = "DIR")]
    pub contentdir: Option<String>,

    /// Configuration file (key = value)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Line table file, relative to the content directory
    #[arg(long, value_name = "FILE")]
    pub lines: Option<String>,

    /// Log level (nothing, user, error, warning, info, debug, all or 0-6)
    #[arg(short, long, value_name = "LEVEL")]
    pub loglevel: Option<String>,

    /// Frames per second for the tick loop
    #[arg(long, value_name = "N")]
    pub fps: Option<u32>,

    /// Number of audio channels
    #[arg(long, value_name = "N")]
    pub channels: Option<usize>,

    /// Channel used for dialogue lines
    #[arg(long = "talkiechannel", value_name = "N")]
    pub talkie_channel: Option<String>,

    /// Master volume (0-100)
    #[arg(long, value_name = "VOLUME")]
    pub volume: Option<String>,

    /// Sound driver (rodio, null)
    #[arg(short, long, value_name = "DRIVER")]
    pub sound: Option<String>,

    /// Disable subtitles
    #[arg(long)]
    pub nosubtitles: bool,

    /// Start lines without blinking first
    #[arg(long)]
    pub noblink: bool,

    /// Stop after this many ticks
    #[arg(short, long, value_name = "N")]
    pub ticks: Option<u32>,

    /// Line keys to say in order
    #[arg(value_name = "LINE")]
    pub script: Vec<String>,
}

impl Cli {
    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        // Override with command line arguments
        if let Some(ref config) = self.config {
            opts.config_file = Some(config.clone());
        }

        if let Some(ref content_dir) = self.contentdir {
            opts.content_dir = Some(content_dir.clone());
        }

        if let Some(ref lines) = self.lines {
            opts.line_table = Some(lines.clone());
        }

        if let Some(ref level) = self.loglevel {
            opts.log_level = Some(Self::parse_log_level(level)?);
        }

        if let Some(fps) = self.fps {
            opts.fps = Some(fps);
        }

        if let Some(channels) = self.channels {
            opts.max_channels = Some(channels);
        }

        if let Some(ref channel) = self.talkie_channel {
            opts.talkie_channel = Some(parse_channel(channel).context("Invalid talkie channel")?);
        }

        if let Some(ref vol) = self.volume {
            let int_vol: i32 = vol.parse().context("Invalid volume")?;
            opts.volume = Some(parse_volume(int_vol));
        }

        if let Some(ref sound) = self.sound {
            opts.sound_driver = Some(SoundDriver::parse(sound)?);
        }

        if self.nosubtitles {
            opts.subtitles = Some(false);
        }

        if self.noblink {
            opts.blink_before_flap = Some(false);
        }

        if let Some(ticks) = self.ticks {
            opts.ticks = Some(ticks);
        }

        if !self.script.is_empty() {
            opts.script = self.script.clone();
        }

        Ok(opts)
    }

    fn parse_log_level(s: &str) -> Result<LogLevel> {
        match LogLevel::parse(s) {
            Some(level) => Ok(level),
            None => anyhow::bail!(
                "Invalid log level: {}. Valid options: nothing, user, error, warning, info, debug, all",
                s
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!(Cli::parse_log_level("debug").unwrap(), LogLevel::Debug);
        assert_eq!(Cli::parse_log_level("3").unwrap(), LogLevel::Warning);
        assert!(Cli::parse_log_level("loud").is_err());
    }

    #[test]
    fn test_merge_basic_options() {
        let cli = Cli {
            fps: Some(30),
            nosubtitles: true,
            sound: Some("null".to_string()),
            script: vec!["hello".to_string()],
            ..Default::default()
        };

        let opts = cli.merge_into_options(Options::default()).unwrap();
        assert_eq!(opts.fps, Some(30));
        assert_eq!(opts.subtitles, Some(false));
        assert_eq!(opts.sound_driver, Some(SoundDriver::Null));
        assert_eq!(opts.script, vec!["hello".to_string()]);
        assert_eq!(opts.blink_before_flap, None);
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let file_opts = Options {
            fps: Some(24),
            content_dir: Some("data".to_string()),
            ..Default::default()
        };
        let cli = Cli {
            fps: Some(50),
            ..Default::default()
        };
        let opts = cli.merge_into_options(file_opts).unwrap();
        assert_eq!(opts.fps, Some(50));
        assert_eq!(opts.content_dir, Some("data".to_string()));
    }

    #[test]
    fn test_invalid_channel() {
        let cli = Cli {
            talkie_channel: Some("-2".to_string()),
            ..Default::default()
        };
        assert!(cli.merge_into_options(Options::default()).is_err());
    }

    #[test]
    fn test_parse_from_args() {
        let cli = Cli::try_parse_from(["scummy", "--noblink", "-t", "12", "intro", "outro"]).unwrap();
        assert!(cli.noblink);
        assert_eq!(cli.ticks, Some(12));
        assert_eq!(cli.script, vec!["intro".to_string(), "outro".to_string()]);
    }
}
