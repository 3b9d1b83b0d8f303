//! Actor costumes
//!
//! A costume is either a legacy single sheet driven by one timeline, or a
//! stack of named layers (body, head, eyes, lids, ...) each with its own
//! sheet and timeline. Layered costumes compose their visible layers into
//! one image every frame.
//!
//! # Architecture
//!
//! - [`sheet`]: frame atlases and animation definitions
//! - [`timeline`]: per-layer playback state machine
//! - [`compose`]: bounding box and blitting
//! - [`descriptor`]: JSON descriptors and how they are cut into sheets

pub mod compose;
pub mod descriptor;
pub mod sheet;
pub mod timeline;

pub use compose::{Composition, Placement};
pub use descriptor::CostumeDescriptor;
pub use sheet::{AnimationDef, FrameMeta, LayerSheet, NextAnimation, SheetFrame};
pub use timeline::{AnimationEnd, EndKind, PlayTarget, Timeline, TimelineMode};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use image::{imageops, RgbaImage};
use thiserror::Error;

use crate::actor::ActorId;
use crate::graphics::{Point, Rect, RegPoint};
use descriptor::{AnimationRecord, FrameRecord};

/// Layer used as the positional reference when present
pub const BASE_LAYER: &str = "body";

#[derive(Debug, Error)]
pub enum CostumeError {
    #[error("unknown animation '{name}' for {scope}")]
    UnknownAnimation { scope: String, name: String },
    #[error("malformed costume descriptor: {0}")]
    Malformed(String),
    #[error("costume descriptor is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("costume image '{0}' was not provided")]
    MissingImage(String),
}

pub type CostumeResult<T> = Result<T, CostumeError>;

/// A parsed descriptor together with the sheet images it references
#[derive(Debug, Clone)]
pub struct CostumeAsset {
    pub name: String,
    pub descriptor: CostumeDescriptor,
    /// Keyed by the names reported by [`CostumeDescriptor::image_names`]
    pub images: HashMap<String, RgbaImage>,
}

#[derive(Debug, Clone)]
struct Layer {
    name: String,
    sheet: Arc<LayerSheet>,
    timeline: Timeline,
    hidden: bool,
}

#[derive(Debug, Clone)]
enum Body {
    Single {
        sheet: Arc<LayerSheet>,
        timeline: Timeline,
    },
    Layered {
        layers: Vec<Layer>,
        base: Option<usize>,
    },
}

#[derive(Debug, Clone)]
pub struct Costume {
    name: String,
    framerate: f64,
    body: Body,
    paused: bool,
    actor: Option<ActorId>,
}

impl Costume {
    /// Legacy single-sheet costume; its raw timeline does not wrap.
    pub fn single(name: impl Into<String>, framerate: f64, sheet: LayerSheet) -> Self {
        Self {
            name: name.into(),
            framerate,
            body: Body::Single {
                sheet: Arc::new(sheet),
                timeline: Timeline::new(false),
            },
            paused: false,
            actor: None,
        }
    }

    /// Empty layered costume; add layers with [`with_layer`](Self::with_layer)
    pub fn layered(name: impl Into<String>, framerate: f64) -> Self {
        Self {
            name: name.into(),
            framerate,
            body: Body::Layered {
                layers: Vec::new(),
                base: None,
            },
            paused: false,
            actor: None,
        }
    }

    pub fn with_layer(mut self, name: impl Into<String>, sheet: LayerSheet, hidden: bool) -> Self {
        if let Body::Layered { layers, base } = &mut self.body {
            layers.push(Layer {
                name: name.into(),
                sheet: Arc::new(sheet),
                timeline: Timeline::new(true),
                hidden,
            });
            *base = layers
                .iter()
                .position(|l| l.name == BASE_LAYER)
                .or(if layers.is_empty() { None } else { Some(0) });
        }
        self
    }

    /// Cut a loaded descriptor into sheets
    pub fn from_asset(asset: &CostumeAsset) -> CostumeResult<Self> {
        match &asset.descriptor {
            CostumeDescriptor::Single(desc) => {
                let image = match &desc.image {
                    Some(name) => asset.images.get(name),
                    None => asset.images.values().next(),
                }
                .ok_or_else(|| {
                    CostumeError::MissingImage(desc.image.clone().unwrap_or_else(|| asset.name.clone()))
                })?;
                let sheet = build_sheet(&desc.frames, &desc.animations, |_| Some(image))?;
                Ok(Costume::single(&asset.name, desc.framerate, sheet))
            }
            CostumeDescriptor::Layered(desc) => {
                let mut costume = Costume::layered(&asset.name, desc.framerate);
                for (layer_name, layer) in &desc.layers {
                    let lookup = |i: usize| {
                        layer
                            .images
                            .get(i)
                            .or(layer.images.first())
                            .and_then(|img| asset.images.get(&format!("{}{}", desc.base_url, img)))
                    };
                    if lookup(0).is_none() {
                        log::warn!(
                            "costume '{}': layer '{}' has no usable image; skipped",
                            asset.name,
                            layer_name
                        );
                        continue;
                    }
                    let sheet = build_sheet(&layer.frames, &layer.animations, lookup)?;
                    costume = costume.with_layer(layer_name, sheet, layer.is_hidden);
                }
                Ok(costume)
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn framerate(&self) -> f64 {
        self.framerate
    }

    pub fn is_layered(&self) -> bool {
        matches!(self.body, Body::Layered { .. })
    }

    /// Actor currently wearing this costume
    pub fn actor(&self) -> Option<ActorId> {
        self.actor
    }

    pub(crate) fn attach(&mut self, actor: ActorId) {
        self.actor = Some(actor);
    }

    pub(crate) fn detach(&mut self) {
        self.actor = None;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Single sheet: start `target`. Layered: unpause the whole costume.
    pub fn play(&mut self, target: impl Into<PlayTarget>) -> CostumeResult<()> {
        self.paused = false;
        if let Body::Single { sheet, timeline } = &mut self.body {
            timeline
                .play(target.into(), sheet)
                .map_err(|e| CostumeError::UnknownAnimation {
                    scope: format!("costume '{}'", self.name),
                    name: e.0,
                })?;
        }
        Ok(())
    }

    /// Pause the costume; a single sheet may also jump to a raw frame
    pub fn stop(&mut self, frame: Option<usize>) {
        self.paused = true;
        if let Body::Single { sheet, timeline } = &mut self.body {
            timeline.stop(frame, sheet);
        }
    }

    /// Play a layer. Returns `Ok(false)` if the costume has no such layer.
    pub fn play_layer(&mut self, layer: &str, target: impl Into<PlayTarget>) -> CostumeResult<bool> {
        let Some(l) = self.layer_mut(layer) else {
            log::debug!("play_layer: no layer '{}'", layer);
            return Ok(false);
        };
        l.timeline
            .play(target.into(), &l.sheet)
            .map_err(|e| CostumeError::UnknownAnimation {
                scope: format!("layer '{}'", layer),
                name: e.0,
            })?;
        Ok(true)
    }

    pub fn stop_layer(&mut self, layer: &str, frame: Option<usize>) -> bool {
        match self.layer_mut(layer) {
            Some(l) => {
                l.timeline.stop(frame, &l.sheet);
                true
            }
            None => false,
        }
    }

    pub fn stop_layers(&mut self, layers: &[&str], frame: Option<usize>) {
        for layer in layers {
            self.stop_layer(layer, frame);
        }
    }

    pub fn play_all_layers(&mut self, target: impl Into<PlayTarget>) -> CostumeResult<()> {
        let target = target.into();
        let names: Vec<String> = self.layer_names().map(str::to_string).collect();
        for name in names {
            self.play_layer(&name, target.clone())?;
        }
        Ok(())
    }

    pub fn set_layer_hidden(&mut self, layer: &str, hidden: bool) -> bool {
        match self.layer_mut(layer) {
            Some(l) => {
                l.hidden = hidden;
                true
            }
            None => false,
        }
    }

    pub fn is_layer_hidden(&self, layer: &str) -> Option<bool> {
        self.layer(layer).map(|l| l.hidden)
    }

    pub fn is_layer_paused(&self, layer: &str) -> Option<bool> {
        self.layer(layer).map(|l| l.timeline.is_paused())
    }

    pub fn has_layer(&self, layer: &str) -> bool {
        self.layer(layer).is_some()
    }

    pub fn layer_has_animation(&self, layer: &str, animation: &str) -> bool {
        self.layer(layer)
            .is_some_and(|l| l.sheet.has_animation(animation))
    }

    /// Declared layer order; empty for single-sheet costumes
    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        let layers: &[Layer] = match &self.body {
            Body::Layered { layers, .. } => layers,
            Body::Single { .. } => &[],
        };
        layers.iter().map(|l| l.name.as_str())
    }

    pub fn base_layer(&self) -> Option<&str> {
        match &self.body {
            Body::Layered { layers, base } => base.map(|i| layers[i].name.as_str()),
            Body::Single { .. } => None,
        }
    }

    pub fn layer_animation(&self, layer: &str) -> Option<&str> {
        self.layer(layer).and_then(|l| l.timeline.animation())
    }

    /// Sheet frame index a layer currently shows
    pub fn layer_frame(&self, layer: &str) -> Option<usize> {
        self.layer(layer).and_then(|l| l.timeline.current_frame(&l.sheet))
    }

    /// Single-sheet animation currently playing
    pub fn current_animation(&self) -> Option<&str> {
        match &self.body {
            Body::Single { timeline, .. } => timeline.animation(),
            Body::Layered { .. } => None,
        }
    }

    /// Single-sheet frame currently shown
    pub fn current_frame(&self) -> Option<usize> {
        match &self.body {
            Body::Single { sheet, timeline } => timeline.current_frame(sheet),
            Body::Layered { .. } => None,
        }
    }

    /// Step every timeline; hidden layers advance too.
    pub fn update(&mut self, dt: Duration) -> Vec<AnimationEnd> {
        if self.paused {
            return Vec::new();
        }
        let framerate = self.framerate;
        match &mut self.body {
            Body::Single { sheet, timeline } => timeline.advance(dt, framerate, sheet, None),
            Body::Layered { layers, .. } => layers
                .iter_mut()
                .flat_map(|l| l.timeline.advance(dt, framerate, &l.sheet, Some(l.name.as_str())))
                .collect(),
        }
    }

    pub fn placements(&self) -> Vec<Placement<'_>> {
        match &self.body {
            Body::Single { sheet, timeline } => timeline
                .current_frame(sheet)
                .and_then(|i| sheet.frame(i))
                .map(|frame| Placement {
                    frame,
                    shift: Point::ORIGIN,
                })
                .into_iter()
                .collect(),
            Body::Layered { layers, base } => {
                let offset = base
                    .map(|i| &layers[i])
                    .and_then(|l| l.timeline.current_frame(&l.sheet).and_then(|f| l.sheet.frame(f)))
                    .and_then(|frame| frame.meta.relative_offset)
                    .unwrap_or(Point::ORIGIN);

                layers
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| !l.hidden)
                    .filter_map(|(i, l)| {
                        let frame = l.timeline.current_frame(&l.sheet).and_then(|f| l.sheet.frame(f))?;
                        let shift = if Some(i) == *base { Point::ORIGIN } else { offset };
                        Some(Placement { frame, shift })
                    })
                    .collect()
            }
        }
    }

    pub fn compose(&self) -> Composition {
        compose::compose(&self.placements())
    }

    /// Composed bounds relative to the registration point, without blitting
    pub fn bounds(&self) -> Option<Rect> {
        compose::bounds(&self.placements())
    }

    pub fn reg_point(&self) -> RegPoint {
        self.bounds().map(|r| -r.corner).unwrap_or(Point::ORIGIN)
    }

    fn layer(&self, name: &str) -> Option<&Layer> {
        match &self.body {
            Body::Layered { layers, .. } => layers.iter().find(|l| l.name == name),
            Body::Single { .. } => None,
        }
    }

    fn layer_mut(&mut self, name: &str) -> Option<&mut Layer> {
        match &mut self.body {
            Body::Layered { layers, .. } => layers.iter_mut().find(|l| l.name == name),
            Body::Single { .. } => None,
        }
    }
}

fn build_sheet<'a>(
    frames: &[FrameRecord],
    animations: &HashMap<String, AnimationRecord>,
    image_for: impl Fn(usize) -> Option<&'a RgbaImage>,
) -> CostumeResult<LayerSheet> {
    let mut cut = Vec::with_capacity(frames.len());
    for record in frames {
        let source = image_for(record.image_index).ok_or_else(|| {
            CostumeError::MissingImage(format!("image #{}", record.image_index))
        })?;
        let image =
            imageops::crop_imm(source, record.x, record.y, record.width, record.height).to_image();
        let mut frame = SheetFrame::new(image, record.reg);
        frame.meta = record.meta.clone();
        cut.push(frame);
    }

    let mut sheet = LayerSheet::new(cut);
    for (name, record) in animations {
        sheet.add_animation(name.clone(), AnimationDef::from(record.clone()));
    }
    Ok(sheet)
}
