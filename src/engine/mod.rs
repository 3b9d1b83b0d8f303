//! Engine context
//!
//! [`Engine`] owns every runtime table: the audio channel pool, actors,
//! per-channel dialogue state, subtitles, music and rooms. Callbacks get the
//! engine by `&mut`, so nothing is global. One [`Engine::tick`] runs, in
//! order:
//!
//! 1. due audio events of every handle scheduler
//! 2. the idle sweep, running end-of-playback callbacks
//! 3. actor animation, firing animation-end events
//! 4. subtitle expiry
//!
//! Composition is left to the host, which reads actor costumes after the
//! tick.

pub mod music;
pub mod room;

pub use room::{RoomEntry, RoomRegistry, RoomScript};

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::actor::events::{self, ActorEvent, ActorEventKind, EventRegistry, Handler, SubscriptionId};
use crate::actor::{Actor, ActorId, ActorRegistry};
use crate::comm::sequencer::ChannelDialogue;
use crate::comm::SubtitleDisplay;
use crate::config::EngineConfig;
use crate::costume::{AnimationEnd, Costume, CostumeError};
use crate::resource::{LineTable, LoaderError, ResourceLoader};
use crate::sound::{
    AudioBackend, AudioError, AudioManager, ChannelId, ChannelRequest, HandleId, MusicState,
    SoundBuffer,
};
use crate::time::{Clock, FrameClock};

use room::ActiveRoom;

pub const TALKIE_DIR: &str = "audio/talkies";
pub const SFX_DIR: &str = "audio/sfx";
pub const MUSIC_DIR: &str = "audio/music";

/// Deferred work run against the engine: audio end callbacks, scheduled
/// audio events, blink continuations, dialogue completions
pub type Callback = Box<dyn FnOnce(&mut Engine) -> anyhow::Result<()>>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown {0}")]
    UnknownActor(ActorId),
    #[error("invalid room id {0}")]
    InvalidRoom(i32),
    #[error("no room registered under id {0}")]
    UnknownRoom(i32),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Costume(#[from] CostumeError),
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Callback(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) audio: AudioManager<Callback>,
    pub(crate) actors: ActorRegistry,
    pub(crate) dialogue: HashMap<ChannelId, ChannelDialogue>,
    pub(crate) subtitles: SubtitleDisplay,
    pub(crate) lines: LineTable,
    pub(crate) music: MusicState,
    pub(crate) rooms: RoomRegistry,
    pub(crate) room: Option<ActiveRoom>,
    /// Previously visited rooms, newest first
    pub(crate) room_history: Vec<i32>,
    listeners: EventRegistry<Engine>,
    animation_events: Vec<(ActorId, AnimationEnd)>,
    loader: Rc<dyn ResourceLoader>,
    frame_clock: FrameClock,
    pub(crate) rng: StdRng,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        backend: Box<dyn AudioBackend>,
        clock: Rc<dyn Clock>,
        loader: Rc<dyn ResourceLoader>,
    ) -> Self {
        if backend.channel_count() != config.max_channels {
            log::warn!(
                "backend has {} channels, configuration asks for {}",
                backend.channel_count(),
                config.max_channels
            );
        }
        let audio = AudioManager::new(backend, clock, config.audio_cache_size);
        let frame_clock = FrameClock::new(config.max_frame_delta, config.resume_skip_frames);
        let subtitles = SubtitleDisplay::new(config.subtitles);
        Self {
            config,
            audio,
            actors: ActorRegistry::new(),
            dialogue: HashMap::new(),
            subtitles,
            lines: LineTable::new(),
            music: MusicState::default(),
            rooms: RoomRegistry::new(),
            room: None,
            room_history: Vec::new(),
            listeners: EventRegistry::new(),
            animation_events: Vec::new(),
            loader,
            frame_clock,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Audio clock reading
    pub fn now(&self) -> Duration {
        self.audio.now()
    }

    /// Advance the engine by one frame. Returns the elapsed time actually
    /// applied to animations after clamping and the post-pause skip.
    pub fn tick(&mut self, raw: Duration) -> Duration {
        let dt = self.frame_clock.filter(raw);
        self.animation_events.clear();

        for (handle, callback) in self.audio.take_due_events() {
            self.run_callback(handle, "audio event", callback);
        }

        if self.audio.poll_idle() {
            for (handle, callback) in self.audio.on_playback_ended() {
                self.run_callback(handle, "end callback", callback);
            }
        }

        self.update_actors(dt);

        let now = self.audio.now();
        self.subtitles.expire(now);
        dt
    }

    /// Block animation time, as during a modal pause
    pub fn suspend(&mut self) {
        self.frame_clock.suspend();
    }

    /// Leave a modal pause; the next few ticks apply no elapsed time
    pub fn resume(&mut self) {
        self.frame_clock.resume();
    }

    pub fn is_suspended(&self) -> bool {
        self.frame_clock.is_suspended()
    }

    pub fn set_rng_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    fn run_callback(&mut self, handle: HandleId, what: &str, callback: Callback) {
        if let Err(e) = callback(self) {
            log::warn!("{} for handle {} failed: {:#}", what, handle, e);
        }
    }

    fn update_actors(&mut self, dt: Duration) {
        for id in self.actors.ids() {
            let ended = match self.actors.get_mut(id) {
                Some(actor) => actor.update(dt),
                None => continue,
            };
            for end in ended {
                self.animation_events.push((id, end.clone()));
                self.fire_actor_event(id, &ActorEvent::animation_end(end));
            }
        }
    }

    // -- actors ---------------------------------------------------------

    pub fn add_actor(&mut self, actor: Actor) -> ActorId {
        let id = actor.id();
        log::debug!("adding {} '{}'", id, actor.name());
        self.actors.add(actor);
        id
    }

    /// Create an actor under the next free id
    pub fn spawn_actor(
        &mut self,
        name: impl Into<String>,
        costume: Costume,
        position: crate::graphics::Point,
    ) -> ActorId {
        let id = self.actors.next_id();
        self.add_actor(Actor::new(id, name, costume, position))
    }

    pub fn remove_actor(&mut self, id: ActorId) -> Option<Actor> {
        self.actors.remove(id)
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id)
    }

    pub fn actors(&self) -> &ActorRegistry {
        &self.actors
    }

    /// Load a costume through the resource loader
    pub fn load_costume(&self, path: &str) -> EngineResult<Costume> {
        let asset = self.loader.load_costume(path)?;
        Ok(Costume::from_asset(&asset)?)
    }

    // -- events ---------------------------------------------------------

    /// Subscribe to one kind of event on one actor
    pub fn add_event(
        &mut self,
        actor: ActorId,
        kind: ActorEventKind,
        handler: Handler<Engine>,
    ) -> EngineResult<SubscriptionId> {
        let actor = self
            .actors
            .get_mut(actor)
            .ok_or(EngineError::UnknownActor(actor))?;
        Ok(actor.events.add(kind, handler))
    }

    pub fn remove_event(&mut self, actor: ActorId, kind: &ActorEventKind, id: SubscriptionId) -> bool {
        self.actors
            .get_mut(actor)
            .is_some_and(|a| a.events.remove(kind, id))
    }

    /// Subscribe to one kind of event on every actor
    pub fn add_listener(&mut self, kind: ActorEventKind, handler: Handler<Engine>) -> SubscriptionId {
        self.listeners.add(kind, handler)
    }

    pub fn remove_listener(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Deliver an event to the actor's handlers, then to global listeners
    pub fn fire_actor_event(&mut self, id: ActorId, event: &ActorEvent) {
        if let Some(actor) = self.actors.get(id) {
            let snapshot = actor.events.snapshot(&event.kind);
            events::dispatch(self, id, snapshot, event);
        }
        let snapshot = self.listeners.snapshot(&event.kind);
        events::dispatch(self, id, snapshot, event);
    }

    /// Animation ends fired during the current tick, in firing order. The
    /// buffer is emptied at the start of every tick, so drain it from a
    /// listener or right after `tick` returns.
    pub fn drain_animation_events(&mut self) -> Vec<(ActorId, AnimationEnd)> {
        std::mem::take(&mut self.animation_events)
    }

    // -- audio ----------------------------------------------------------

    pub fn audio(&self) -> &AudioManager<Callback> {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioManager<Callback> {
        &mut self.audio
    }

    pub(crate) fn load_sound(&mut self, dir: &str, name: &str) -> EngineResult<SoundBuffer> {
        let path = format!("{}/{}", dir, name);
        Ok(self.audio.load(&path, self.loader.as_ref())?)
    }

    /// Play a sound effect from the sfx directory
    pub fn play_sound(
        &mut self,
        name: &str,
        channel: impl Into<ChannelRequest>,
        looping: bool,
    ) -> EngineResult<HandleId> {
        let buffer = self.load_sound(SFX_DIR, name)?;
        Ok(self.audio.play(&buffer, name, channel, looping)?)
    }

    /// Loop a background sound on the ambient channel
    pub fn play_ambient(&mut self, name: &str) -> EngineResult<HandleId> {
        let channel = self.config.ambient_channel;
        self.play_sound(name, channel, true)
    }

    /// Play a voice line file from the talkie directory, without dialogue
    /// bookkeeping
    pub fn play_talkie(&mut self, file: &str, channel: impl Into<ChannelRequest>) -> EngineResult<HandleId> {
        let buffer = self.load_sound(TALKIE_DIR, file)?;
        Ok(self.audio.play(&buffer, file, channel, false)?)
    }

    pub fn set_on_end(
        &mut self,
        handle: HandleId,
        callback: impl FnOnce(&mut Engine) -> anyhow::Result<()> + 'static,
    ) -> EngineResult<()> {
        Ok(self.audio.set_on_end(handle, Box::new(callback))?)
    }

    /// Run `callback` once the handle has played `threshold` of audio
    pub fn add_audio_event(
        &mut self,
        handle: HandleId,
        threshold: Duration,
        callback: impl FnOnce(&mut Engine) -> anyhow::Result<()> + 'static,
    ) -> EngineResult<()> {
        Ok(self.audio.add_event(handle, threshold, Box::new(callback))?)
    }

    // -- lines and subtitles --------------------------------------------

    pub fn lines(&self) -> &LineTable {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut LineTable {
        &mut self.lines
    }

    pub fn set_line_table(&mut self, lines: LineTable) {
        self.lines = lines;
    }

    pub fn subtitles(&self) -> &SubtitleDisplay {
        &self.subtitles
    }

    pub fn subtitles_mut(&mut self) -> &mut SubtitleDisplay {
        &mut self.subtitles
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("actors", &self.actors.len())
            .field("handles", &self.audio.live_handles())
            .field("room", &self.room.as_ref().map(ActiveRoom::id))
            .finish()
    }
}
