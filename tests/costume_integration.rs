//! Costumes loaded from a content directory, then animated and composed.

mod common;

use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

use common::{config, FRAME};
use scummy::costume::{Costume, CostumeError, EndKind};
use scummy::engine::{Engine, EngineError};
use scummy::resource::{FsLoader, LoaderError, ResourceLoader};
use scummy::sound::NullBackend;
use scummy::time::ManualClock;

const GUARD: &str = r#"{
    "base_url": "guard/",
    "framerate": 4,
    "layers": {
        "body": {
            "images": ["body.png"],
            "frames": [[0, 0, 4, 8, 0, 2, 8]]
        },
        "lids": {
            "images": ["lids.png"],
            "frames": [[0, 0, 4, 2, 0, 2, 8], [4, 0, 4, 2, 0, 2, 8], [8, 0, 4, 2, 0, 2, 8]],
            "animations": {
                "blink": { "frames": [0, 1, 2], "next": false },
                "wink": { "frames": [0, 1], "next": "blink" }
            },
            "isHidden": true
        },
        "hat": { "src": "hats.json" }
    }
}"#;

const DOOR: &str = r#"{
    "framerate": 4,
    "frames": [[0, 0, 4, 4, 0, 0, 4], [4, 0, 4, 4, 0, 0, 4]],
    "animations": { "open": { "frames": [0, 1], "next": false } }
}"#;

fn write_image(path: &Path, width: u32, height: u32, color: [u8; 4]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(width, height, Rgba(color)).save(path).unwrap();
}

fn content() -> TempDir {
    let dir = TempDir::new().unwrap();
    let costumes = dir.path().join("costumes");
    fs::create_dir_all(&costumes).unwrap();
    fs::write(costumes.join("guard.json"), GUARD).unwrap();
    fs::write(costumes.join("door.json"), DOOR).unwrap();
    write_image(&costumes.join("guard/body.png"), 4, 8, [200, 0, 0, 255]);
    write_image(&costumes.join("guard/lids.png"), 12, 2, [0, 0, 200, 255]);
    write_image(&costumes.join("door.png"), 8, 4, [0, 120, 0, 255]);
    dir
}

fn engine_over(dir: &Path) -> Engine {
    let config = config();
    Engine::new(
        config.clone(),
        Box::new(NullBackend::new(config.max_channels)),
        Rc::new(ManualClock::new()),
        Rc::new(FsLoader::new(dir)),
    )
}

#[test]
fn layered_costume_loads_and_composes_visible_layers() {
    let dir = content();
    let engine = engine_over(dir.path());
    let costume = engine.load_costume("costumes/guard.json").unwrap();

    assert!(costume.is_layered());
    assert_eq!(costume.name(), "guard");
    // layers that point at other costumes are skipped
    assert_eq!(costume.layer_names().collect::<Vec<_>>(), vec!["body", "lids"]);
    assert_eq!(costume.is_layer_hidden("lids"), Some(true));

    let composed = costume.compose();
    assert_eq!(composed.image.dimensions(), (4, 8));
    assert_eq!(composed.image.get_pixel(1, 1), &Rgba([200, 0, 0, 255]));
}

#[test]
fn chained_animation_ends_then_freezes() {
    let dir = content();
    let engine = engine_over(dir.path());
    let mut costume = engine.load_costume("costumes/guard.json").unwrap();
    costume.set_layer_hidden("lids", false);
    assert!(costume.play_layer("lids", "wink").unwrap());

    let mut ends = Vec::new();
    for _ in 0..6 {
        ends.extend(costume.update(FRAME));
    }

    let names: Vec<_> = ends.iter().filter_map(|e| e.animation.clone()).collect();
    assert_eq!(names, vec!["wink".to_string(), "blink".to_string()]);
    assert!(ends.iter().all(|e| e.kind == EndKind::Animation && e.is_layer("lids")));
    assert_eq!(costume.layer_animation("lids"), Some("blink"));
    assert_eq!(costume.is_layer_paused("lids"), Some(true));
    assert_eq!(costume.layer_frame("lids"), Some(2));

    // lids sit on top of the body
    let composed = costume.compose();
    assert_eq!(composed.image.get_pixel(1, 0), &Rgba([0, 0, 200, 255]));
}

#[test]
fn single_sheet_defaults_its_image_to_the_descriptor_name() {
    let dir = content();
    let loader = FsLoader::new(dir.path());
    let asset = loader.load_costume("costumes/door.json").unwrap();
    assert!(asset.images.contains_key("door.png"));

    let mut door = Costume::from_asset(&asset).unwrap();
    assert!(!door.is_layered());
    door.play("open").unwrap();
    let ends = door.update(FRAME * 3);
    assert_eq!(ends.len(), 1);
    assert_eq!(ends[0].end_frame, 1);
    assert_eq!(door.current_frame(), Some(1));
    assert!(door.update(Duration::from_secs(1)).is_empty());
}

#[test]
fn loader_refuses_missing_files_and_traversal() {
    let dir = content();
    let engine = engine_over(dir.path());
    assert!(matches!(
        engine.load_costume("costumes/ghost.json"),
        Err(EngineError::Loader(LoaderError::NotFound(_)))
    ));
    assert!(matches!(
        engine.load_costume("../costumes/guard.json"),
        Err(EngineError::Loader(LoaderError::InvalidPath(_)))
    ));
}

#[test]
fn missing_sheet_images_drop_layers_or_fail_single_sheets() {
    let dir = content();
    let engine = engine_over(dir.path());

    fs::remove_file(dir.path().join("costumes/guard/lids.png")).unwrap();
    let guard = engine.load_costume("costumes/guard.json").unwrap();
    assert_eq!(guard.layer_names().collect::<Vec<_>>(), vec!["body"]);

    fs::remove_file(dir.path().join("costumes/door.png")).unwrap();
    assert!(matches!(
        engine.load_costume("costumes/door.json"),
        Err(EngineError::Costume(CostumeError::MissingImage(_)))
    ));
}
