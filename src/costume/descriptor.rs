//! JSON costume descriptors
//!
//! Two shapes are accepted. Single-sheet:
//!
//! ```json
//! { "framerate": 12, "image": "guard.png",
//!   "frames": [[x, y, w, h, image, regX, regY], ...],
//!   "animations": { "walk": { "frames": [0, 1], "speed": 1.0, "next": null } } }
//! ```
//!
//! Layered (recognised by `base_url` or `layers`):
//!
//! ```json
//! { "base_url": "guybrush/", "framerate": 24,
//!   "layers": { "body": { "images": ["body.png"], "frames": [...],
//!                         "animations": {...}, "isHidden": false } } }
//! ```
//!
//! A layered frame may carry an eighth element, `{"relativeOffsets": [x, y]}`.
//! Layer order follows the document; layers with a `src` reference are skipped.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::sheet::{AnimationDef, FrameMeta, NextAnimation};
use super::CostumeError;
use crate::graphics::Point;

pub const DEFAULT_FRAMERATE: f64 = 24.0;

fn default_framerate() -> f64 {
    DEFAULT_FRAMERATE
}

fn default_speed() -> f64 {
    1.0
}

/// `[x, y, w, h, image, regX, regY, meta?]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<Value>")]
pub struct FrameRecord {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub image_index: usize,
    pub reg: Point,
    pub meta: FrameMeta,
}

impl TryFrom<Vec<Value>> for FrameRecord {
    type Error = String;

    fn try_from(fields: Vec<Value>) -> Result<Self, Self::Error> {
        if fields.len() < 7 {
            return Err(format!("frame needs 7 fields, got {}", fields.len()));
        }
        let int = |i: usize| -> Result<i64, String> {
            fields[i]
                .as_f64()
                .map(|v| v as i64)
                .ok_or_else(|| format!("frame field {} is not a number: {}", i, fields[i]))
        };
        let unsigned = |i: usize| -> Result<u32, String> {
            let v = int(i)?;
            u32::try_from(v).map_err(|_| format!("frame field {} is negative: {}", i, v))
        };

        let meta = match fields.get(7) {
            Some(Value::Object(map)) => FrameMeta {
                relative_offset: map
                    .get("relativeOffsets")
                    .and_then(Value::as_array)
                    .filter(|pair| pair.len() >= 2)
                    .and_then(|pair| {
                        let x = pair[0].as_f64()?;
                        let y = pair[1].as_f64()?;
                        Some(Point::new(x as i32, y as i32))
                    }),
            },
            _ => FrameMeta::default(),
        };

        Ok(FrameRecord {
            x: unsigned(0)?,
            y: unsigned(1)?,
            width: unsigned(2)?,
            height: unsigned(3)?,
            image_index: unsigned(4)? as usize,
            reg: Point::new(int(5)? as i32, int(6)? as i32),
            meta,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnimationRecord {
    #[serde(default)]
    pub frames: Vec<usize>,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default, deserialize_with = "next_directive")]
    pub next: NextAnimation,
}

impl From<AnimationRecord> for AnimationDef {
    fn from(record: AnimationRecord) -> Self {
        AnimationDef::new(record.frames)
            .with_speed(record.speed)
            .with_next(record.next)
    }
}

/// `null`/absent loops, `false` freezes, a string chains; anything else loops
fn next_directive<'de, D>(deserializer: D) -> Result<NextAnimation, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(false) => NextAnimation::Freeze,
        Value::String(name) => NextAnimation::Chain(name),
        _ => NextAnimation::Loop,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetDescriptor {
    #[serde(default = "default_framerate")]
    pub framerate: f64,
    /// Sheet image; loaders fall back to the descriptor's own stem + `.png`
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub frames: Vec<FrameRecord>,
    #[serde(default)]
    pub animations: HashMap<String, AnimationRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LayerDescriptor {
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub frames: Vec<FrameRecord>,
    #[serde(default)]
    pub animations: HashMap<String, AnimationRecord>,
    #[serde(default, rename = "isHidden")]
    pub is_hidden: bool,
    #[serde(default)]
    pub src: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LayeredDescriptor {
    pub base_url: String,
    pub framerate: f64,
    /// Document order
    pub layers: Vec<(String, LayerDescriptor)>,
}

#[derive(Debug, Clone)]
pub enum CostumeDescriptor {
    Single(SheetDescriptor),
    Layered(LayeredDescriptor),
}

impl CostumeDescriptor {
    pub fn parse(json: &str) -> Result<Self, CostumeError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, CostumeError> {
        let Value::Object(mut root) = value else {
            return Err(CostumeError::Malformed("descriptor is not an object".into()));
        };

        if !root.contains_key("base_url") && !root.contains_key("layers") {
            let sheet: SheetDescriptor = serde_json::from_value(Value::Object(root))?;
            return Ok(CostumeDescriptor::Single(sheet));
        }

        let base_url = match root.remove("base_url") {
            Some(Value::String(url)) => url,
            Some(Value::Null) | None => String::new(),
            Some(other) => {
                return Err(CostumeError::Malformed(format!(
                    "base_url must be a string, got {}",
                    other
                )))
            }
        };
        let framerate = match root.get("framerate") {
            Some(v) => v
                .as_f64()
                .ok_or_else(|| CostumeError::Malformed(format!("bad framerate: {}", v)))?,
            None => DEFAULT_FRAMERATE,
        };

        let mut layers = Vec::new();
        if let Some(Value::Object(map)) = root.remove("layers") {
            for (name, layer) in map {
                if !layer.is_object() {
                    log::warn!("costume layer '{}' is not an object; skipped", name);
                    continue;
                }
                let layer: LayerDescriptor = serde_json::from_value(layer)?;
                if layer.src.is_some() {
                    log::debug!("costume layer '{}' references another costume; skipped", name);
                    continue;
                }
                layers.push((name, layer));
            }
        }

        Ok(CostumeDescriptor::Layered(LayeredDescriptor {
            base_url,
            framerate,
            layers,
        }))
    }

    pub fn framerate(&self) -> f64 {
        match self {
            CostumeDescriptor::Single(sheet) => sheet.framerate,
            CostumeDescriptor::Layered(layered) => layered.framerate,
        }
    }

    /// Image names the loader has to provide, relative to the descriptor
    pub fn image_names(&self) -> Vec<String> {
        match self {
            CostumeDescriptor::Single(sheet) => sheet.image.iter().cloned().collect(),
            CostumeDescriptor::Layered(layered) => layered
                .layers
                .iter()
                .flat_map(|(_, layer)| layer.images.iter())
                .map(|image| format!("{}{}", layered.base_url, image))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYERED: &str = r#"{
        "base_url": "guy/",
        "framerate": 8,
        "layers": {
            "shadow": { "src": "shadow.json" },
            "body": {
                "images": ["body.png"],
                "frames": [[0, 0, 10, 20, 0, 5, 20, {"relativeOffsets": [2, -1]}],
                           [10, 0, 10, 20, 0, 5, 20]],
                "animations": { "idle": { "frames": [0, 1] } }
            },
            "lids": {
                "images": ["lids.png"],
                "frames": [[0, 0, 4, 2, 0, 2, 1]],
                "animations": {
                    "blink": { "frames": [0, 0], "speed": 2, "next": false },
                    "wink": { "frames": [0], "next": "blink" },
                    "odd": { "frames": [0], "next": 7 }
                },
                "isHidden": true
            }
        }
    }"#;

    #[test]
    fn test_layered_parse_keeps_document_order() {
        let CostumeDescriptor::Layered(desc) = CostumeDescriptor::parse(LAYERED).unwrap() else {
            panic!("expected layered descriptor");
        };
        assert_eq!(desc.base_url, "guy/");
        assert_eq!(desc.framerate, 8.0);
        let names: Vec<_> = desc.layers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["body", "lids"]);
        assert!(desc.layers[1].1.is_hidden);
    }

    #[test]
    fn test_frame_meta_and_next_directives() {
        let CostumeDescriptor::Layered(desc) = CostumeDescriptor::parse(LAYERED).unwrap() else {
            panic!("expected layered descriptor");
        };
        let body = &desc.layers[0].1;
        assert_eq!(body.frames[0].meta.relative_offset, Some(Point::new(2, -1)));
        assert_eq!(body.frames[1].meta.relative_offset, None);
        assert_eq!(body.frames[0].reg, Point::new(5, 20));

        let lids = &desc.layers[1].1;
        assert_eq!(lids.animations["blink"].next, NextAnimation::Freeze);
        assert_eq!(lids.animations["blink"].speed, 2.0);
        assert_eq!(lids.animations["wink"].next, NextAnimation::Chain("blink".into()));
        assert_eq!(lids.animations["odd"].next, NextAnimation::Loop);
        assert_eq!(body.animations["idle"].next, NextAnimation::Loop);
    }

    #[test]
    fn test_single_sheet_defaults() {
        let json = r#"{ "frames": [[0, 0, 8, 8, 0, 4, 8]], "animations": {} }"#;
        let CostumeDescriptor::Single(sheet) = CostumeDescriptor::parse(json).unwrap() else {
            panic!("expected single descriptor");
        };
        assert_eq!(sheet.framerate, DEFAULT_FRAMERATE);
        assert_eq!(sheet.frames.len(), 1);
        assert!(sheet.image.is_none());
    }

    #[test]
    fn test_image_names_are_prefixed() {
        let desc = CostumeDescriptor::parse(LAYERED).unwrap();
        assert_eq!(desc.image_names(), vec!["guy/body.png", "guy/lids.png"]);
    }

    #[test]
    fn test_short_frame_is_rejected() {
        let json = r#"{ "frames": [[0, 0, 8, 8]] }"#;
        assert!(matches!(
            CostumeDescriptor::parse(json),
            Err(CostumeError::Json(_))
        ));
    }

    #[test]
    fn test_non_object_is_malformed() {
        assert!(matches!(
            CostumeDescriptor::parse("[1, 2]"),
            Err(CostumeError::Malformed(_))
        ));
    }
}
