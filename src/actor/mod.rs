//! Actors
//!
//! An actor wears one costume, stands at a position and keeps an event
//! registry for its animation notifications. The gesture layer (blink,
//! gaze, mouth flap) is built on named costume layers:
//!
//! - `head`: raw frames cycled while talking
//! - `eyes-<gaze>`: one layer per gaze, only the active one visible
//! - `lids`: hidden except while its blink animation plays
//!
//! Engine-level gestures that need audio or callbacks live in [`bridge`].

pub mod bridge;
pub mod events;

pub use events::{ActorEvent, ActorEventKind, EventContext, EventRegistry, Handler, SubscriptionId};

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::costume::{AnimationEnd, Costume, CostumeResult};
use crate::engine::Engine;
use crate::graphics::{Extent, Point, Rect};
use crate::sound::HandleId;

pub const HEAD_LAYER: &str = "head";
pub const LIDS_LAYER: &str = "lids";
pub const EYES_PREFIX: &str = "eyes-";
pub const DEFAULT_BLINK_ANIMATION: &str = "blink";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u32);

impl ActorId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor {}", self.0)
    }
}

/// Where an actor is looking; selects the `eyes-<gaze>` layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gaze(String);

impl Gaze {
    pub const NEUTRAL: &'static str = "normal";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn neutral() -> Self {
        Self(Self::NEUTRAL.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_neutral(&self) -> bool {
        self.0 == Self::NEUTRAL
    }

    pub fn eyes_layer(&self) -> String {
        format!("{}{}", EYES_PREFIX, self.0)
    }
}

impl Default for Gaze {
    fn default() -> Self {
        Self::neutral()
    }
}

impl From<&str> for Gaze {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Gaze {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct Actor {
    id: ActorId,
    name: String,
    costume: Costume,
    position: Point,
    rect: Rect,
    pub(crate) events: EventRegistry<Engine>,
    gaze: Gaze,
    /// Handle the mouth is flapping for
    flap_handle: Option<HandleId>,
    blink_animation: String,
}

impl Actor {
    pub fn new(id: ActorId, name: impl Into<String>, mut costume: Costume, position: Point) -> Self {
        costume.attach(id);
        let mut actor = Self {
            id,
            name: name.into(),
            costume,
            position,
            rect: Rect::new(position, Extent::new(1, 1)),
            events: EventRegistry::new(),
            gaze: Gaze::neutral(),
            flap_handle: None,
            blink_animation: DEFAULT_BLINK_ANIMATION.to_string(),
        };
        actor.refresh_rect();
        actor
    }

    pub fn id(&self) -> ActorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn costume(&self) -> &Costume {
        &self.costume
    }

    pub fn costume_mut(&mut self) -> &mut Costume {
        &mut self.costume
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, position: Point) {
        self.position = position;
        self.refresh_rect();
    }

    /// Screen rectangle: the composed image placed so its registration
    /// point sits on the actor's position
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn gaze(&self) -> &Gaze {
        &self.gaze
    }

    pub fn is_flapping(&self) -> bool {
        self.flap_handle.is_some()
    }

    pub fn flap_handle(&self) -> Option<HandleId> {
        self.flap_handle
    }

    pub fn blink_animation(&self) -> &str {
        &self.blink_animation
    }

    pub fn set_blink_animation(&mut self, name: impl Into<String>) {
        self.blink_animation = name.into();
    }

    pub fn can_blink(&self) -> bool {
        self.costume.has_layer(LIDS_LAYER)
    }

    pub fn events(&self) -> &EventRegistry<Engine> {
        &self.events
    }

    /// Set the gaze and show only its eye layer, held on its current frame.
    /// Returns false when the costume has no layer for that gaze.
    pub fn look_at(&mut self, gaze: &Gaze) -> bool {
        self.gaze = gaze.clone();
        let target = gaze.eyes_layer();
        if !self.costume.has_layer(&target) {
            log::debug!("{}: no eye layer for gaze '{}'", self.id, gaze);
            return false;
        }
        let others: Vec<String> = self
            .costume
            .layer_names()
            .filter(|name| name.starts_with(EYES_PREFIX) && *name != target)
            .map(str::to_string)
            .collect();
        for layer in &others {
            self.costume.set_layer_hidden(layer, true);
        }
        self.costume.set_layer_hidden(&target, false);
        self.costume.stop_layer(&target, None);
        true
    }

    pub(crate) fn start_flap(&mut self, handle: HandleId) -> CostumeResult<()> {
        self.costume.play_layer(HEAD_LAYER, 0usize)?;
        self.costume.play_layer(&self.gaze.eyes_layer(), 0usize)?;
        self.flap_handle = Some(handle);
        Ok(())
    }

    /// Put head and eyes back on their idle frame. Returns whether a flap was running.
    pub(crate) fn stop_flap_layers(&mut self) -> bool {
        self.costume.stop_layer(HEAD_LAYER, Some(0));
        self.costume.stop_layer(&self.gaze.eyes_layer(), Some(0));
        self.flap_handle.take().is_some()
    }

    pub fn update(&mut self, dt: Duration) -> Vec<AnimationEnd> {
        let ended = self.costume.update(dt);
        self.refresh_rect();
        ended
    }

    /// Swap costumes. Registered handlers are dropped since they were
    /// waiting on animations of the old costume.
    pub(crate) fn swap_costume(&mut self, mut costume: Costume) -> Costume {
        self.events.clear();
        self.flap_handle = None;
        costume.attach(self.id);
        let mut old = std::mem::replace(&mut self.costume, costume);
        old.detach();
        self.refresh_rect();
        old
    }

    pub fn destroy(&mut self) {
        self.events.clear();
        self.flap_handle = None;
        self.costume.detach();
    }

    fn refresh_rect(&mut self) {
        self.rect = match self.costume.bounds() {
            Some(bounds) => Rect::new(self.position + bounds.corner, bounds.extent),
            None => Rect::new(self.position, Extent::new(1, 1)),
        };
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("costume", &self.costume.name())
            .field("position", &self.position)
            .field("gaze", &self.gaze)
            .field("flap_handle", &self.flap_handle)
            .finish()
    }
}

/// Actor table, keyed by id
#[derive(Debug, Default)]
pub struct ActorRegistry {
    actors: BTreeMap<ActorId, Actor>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, destroying any actor previously under the same id
    pub fn add(&mut self, actor: Actor) {
        if let Some(mut old) = self.actors.insert(actor.id(), actor) {
            old.destroy();
        }
    }

    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actors.contains_key(&id)
    }

    pub fn remove(&mut self, id: ActorId) -> Option<Actor> {
        let mut actor = self.actors.remove(&id)?;
        actor.destroy();
        Some(actor)
    }

    pub fn clear(&mut self) {
        for actor in self.actors.values_mut() {
            actor.destroy();
        }
        self.actors.clear();
    }

    pub fn ids(&self) -> Vec<ActorId> {
        self.actors.keys().copied().collect()
    }

    /// Lowest id above every id in use
    pub fn next_id(&self) -> ActorId {
        ActorId::new(self.actors.keys().next_back().map_or(1, |id| id.get() + 1))
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.actors.values()
    }
}
