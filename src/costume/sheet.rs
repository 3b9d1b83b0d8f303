//! Layer sheets: immutable frame atlases plus their named animations

use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;

use crate::graphics::{Extent, Point, RegPoint};

/// Per-frame metadata carried by layered descriptors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameMeta {
    /// Shift applied to every non-base layer while this base frame shows
    pub relative_offset: Option<Point>,
}

/// One cut-out frame of a sheet
#[derive(Debug, Clone)]
pub struct SheetFrame {
    pub image: Arc<RgbaImage>,
    pub reg: RegPoint,
    pub meta: FrameMeta,
}

impl SheetFrame {
    pub fn new(image: RgbaImage, reg: RegPoint) -> Self {
        Self {
            image: Arc::new(image),
            reg,
            meta: FrameMeta::default(),
        }
    }

    /// Transparent frame of the given size
    pub fn blank(width: u32, height: u32, reg: RegPoint) -> Self {
        Self::new(RgbaImage::new(width, height), reg)
    }

    pub fn with_offset(mut self, offset: Point) -> Self {
        self.meta.relative_offset = Some(offset);
        self
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.image.width(), self.image.height())
    }
}

/// What an animation does after its last frame
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NextAnimation {
    /// Restart from the first frame
    #[default]
    Loop,
    /// Hold the last frame and pause
    Freeze,
    /// Switch to another animation of the same sheet
    Chain(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationDef {
    /// Indices into the sheet's frame list
    pub frames: Vec<usize>,
    /// Multiplier on the costume frame rate
    pub speed: f64,
    pub next: NextAnimation,
}

impl AnimationDef {
    pub fn new(frames: Vec<usize>) -> Self {
        Self {
            frames,
            speed: 1.0,
            next: NextAnimation::Loop,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_next(mut self, next: NextAnimation) -> Self {
        self.next = next;
        self
    }

    pub fn last_index(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayerSheet {
    frames: Vec<SheetFrame>,
    animations: HashMap<String, AnimationDef>,
}

impl LayerSheet {
    pub fn new(frames: Vec<SheetFrame>) -> Self {
        Self {
            frames,
            animations: HashMap::new(),
        }
    }

    pub fn with_animation(mut self, name: impl Into<String>, def: AnimationDef) -> Self {
        self.animations.insert(name.into(), def);
        self
    }

    pub fn add_animation(&mut self, name: impl Into<String>, def: AnimationDef) {
        self.animations.insert(name.into(), def);
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frame at `index`, clamped into the sheet. `None` only for empty sheets.
    pub fn frame(&self, index: usize) -> Option<&SheetFrame> {
        self.frames.get(self.clamp(index))
    }

    pub fn clamp(&self, index: usize) -> usize {
        index.min(self.frames.len().saturating_sub(1))
    }

    pub fn animation(&self, name: &str) -> Option<&AnimationDef> {
        self.animations.get(name)
    }

    pub fn has_animation(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    pub fn animation_names(&self) -> impl Iterator<Item = &str> {
        self.animations.keys().map(String::as_str)
    }
}
