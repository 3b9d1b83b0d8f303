//! Shared fixtures for the integration tests: a silent engine driven by a
//! hand-advanced clock, with a few talkie lines and songs in memory.

#![allow(dead_code)]

use std::rc::Rc;
use std::time::Duration;

use scummy::actor::{DEFAULT_BLINK_ANIMATION, HEAD_LAYER, LIDS_LAYER};
use scummy::costume::{AnimationDef, Costume, LayerSheet, NextAnimation, SheetFrame};
use scummy::engine::{Engine, MUSIC_DIR, SFX_DIR, TALKIE_DIR};
use scummy::graphics::Point;
use scummy::resource::MemoryLoader;
use scummy::sound::NullBackend;
use scummy::time::ManualClock;
use scummy::EngineConfig;

/// One tick at the fixture's 4 fps
pub const FRAME: Duration = Duration::from_millis(250);

pub struct Fixture {
    pub engine: Engine,
    pub backend: NullBackend,
    pub clock: ManualClock,
}

pub fn config() -> EngineConfig {
    EngineConfig {
        fps: 4,
        max_channels: 4,
        max_frame_delta: FRAME,
        resume_skip_frames: 1,
        ..Default::default()
    }
}

pub fn fixture() -> Fixture {
    let config = config();
    let backend = NullBackend::new(config.max_channels);
    let clock = ManualClock::new();
    let mut loader = MemoryLoader::new();
    for name in ["hello.wav", "bye.wav", "huh.wav"] {
        loader.insert_audio(format!("{}/{}", TALKIE_DIR, name), vec![0; 8]);
    }
    for name in ["town.ogg", "woods.ogg"] {
        loader.insert_audio(format!("{}/{}", MUSIC_DIR, name), vec![0; 8]);
    }
    loader.insert_audio(format!("{}/bell.wav", SFX_DIR), vec![0; 8]);

    let mut engine = Engine::new(
        config,
        Box::new(backend.clone()),
        Rc::new(clock.clone()),
        Rc::new(loader),
    );
    engine.set_rng_seed(11);

    let lines = engine.lines_mut();
    lines.insert("hello", "hello.wav", Some("Hello there."));
    lines.insert("bye", "bye.wav", Some("Goodbye."));
    lines.insert("huh", "huh.wav", None);

    Fixture {
        engine,
        backend,
        clock,
    }
}

fn sheet(frames: usize) -> LayerSheet {
    LayerSheet::new(
        (0..frames)
            .map(|_| SheetFrame::blank(8, 12, Point::new(4, 12)))
            .collect(),
    )
}

/// Layered costume with a head, two gazes and blinking lids
pub fn talker() -> Costume {
    Costume::layered("talker", 4.0)
        .with_layer("body", sheet(1), false)
        .with_layer(HEAD_LAYER, sheet(3), false)
        .with_layer("eyes-normal", sheet(1), false)
        .with_layer("eyes-left", sheet(1), true)
        .with_layer(
            LIDS_LAYER,
            sheet(3).with_animation(
                DEFAULT_BLINK_ANIMATION,
                AnimationDef::new(vec![0, 1, 2]).with_next(NextAnimation::Freeze),
            ),
            true,
        )
}

/// Tick `n` frames, advancing the clock alongside
pub fn run_frames(fixture: &mut Fixture, n: usize) {
    for _ in 0..n {
        fixture.clock.advance(FRAME);
        fixture.engine.tick(FRAME);
    }
}
