use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use scummy::comm::{LineRequest, ScriptItem};
use scummy::config::{self, SoundDriver};
use scummy::engine::Engine;
use scummy::logging::{self, LogLevel};
use scummy::resource::{FsLoader, LineTable};
use scummy::sound::{AudioBackend, NullBackend, RodioBackend};
use scummy::time::{Clock, SystemClock};
use scummy::{log_debug, log_error, log_info, log_warning, Cli};

/// How long a sound lasts when there is no audio device to run it out
const SILENT_PLAY_LENGTH: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Config file first, command line on top
    let options = config::load_config(cli.config.as_deref().map(Path::new))?;
    let options = cli.merge_into_options(options)?;

    logging::init(options.log_level.unwrap_or(LogLevel::Info));
    log_info!("scummy {} starting", env!("CARGO_PKG_VERSION"));

    let config = options.resolve()?;
    log_info!("Configuration:");
    log_info!("  Content dir: {}", config.content_dir.display());
    log_info!("  Channels: {} (talkie {}, music {})", config.max_channels, config.talkie_channel, config.music_channel);
    log_info!("  FPS: {}", config.fps);

    let lines = match &options.line_table {
        Some(path) => {
            let path = config.content_dir.join(path);
            LineTable::load(&path)
                .with_context(|| format!("Failed to load line table {}", path.display()))?
        }
        None => LineTable::new(),
    };
    log_debug!("{} line(s) in table", lines.len());

    let driver = options.sound_driver.unwrap_or(SoundDriver::Rodio);
    let clock: Rc<dyn Clock> = Rc::new(SystemClock::new());
    let backend = open_backend(driver, config.max_channels, options.volume, &clock);
    let loader = FsLoader::new(&config.content_dir);
    let mut engine = Engine::new(config.clone(), backend, clock, Rc::new(loader));
    engine.set_line_table(lines);

    if options.script.is_empty() {
        log_warning!("No lines given; nothing to say");
        return Ok(());
    }

    let finished = Rc::new(Cell::new(false));
    let flag = Rc::clone(&finished);
    let request = LineRequest::sequence(options.script.iter().map(|key| ScriptItem::from(key.as_str())))
        .on_done(move |_| {
            flag.set(true);
            Ok(())
        });
    if let Err(e) = engine.say_line(request) {
        log_error!("Could not start dialogue: {}", e);
        return Err(e.into());
    }

    let frame = config.frame_duration();
    let max_ticks = options.ticks.unwrap_or(config.fps * 60);
    let mut shown: Option<String> = None;
    let mut last = Instant::now();
    for _ in 0..max_ticks {
        if finished.get() {
            break;
        }
        std::thread::sleep(frame);
        let now = Instant::now();
        engine.tick(now - last);
        last = now;

        let text = engine.subtitles().text().map(str::to_string);
        if text != shown {
            if let Some(ref line) = text {
                println!("{}", line);
            }
            shown = text;
        }
    }

    if finished.get() {
        log_info!("Dialogue finished");
    } else {
        log_warning!("Stopped after {} ticks with dialogue still running", max_ticks);
    }
    Ok(())
}

fn open_backend(
    driver: SoundDriver,
    channels: usize,
    volume: Option<f32>,
    clock: &Rc<dyn Clock>,
) -> Box<dyn AudioBackend> {
    let silent = || -> Box<dyn AudioBackend> {
        Box::new(NullBackend::new(channels).with_play_length(Rc::clone(clock), SILENT_PLAY_LENGTH))
    };
    match driver {
        SoundDriver::Null => silent(),
        SoundDriver::Rodio => match RodioBackend::open(channels) {
            Ok(mut backend) => {
                if let Some(volume) = volume {
                    backend.set_volume(volume);
                }
                Box::new(backend)
            }
            Err(e) => {
                log_warning!("Audio device unavailable ({}); running silent", e);
                silent()
            }
        },
    }
}
