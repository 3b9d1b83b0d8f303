//! Rooms
//!
//! A room is a script object built fresh on every entry from a factory in
//! the [`RoomRegistry`]. Changing rooms tears down the old script, silences
//! everything but the music channel and hands the music system the new
//! room's song pool.

use std::collections::BTreeMap;
use std::fmt;

use crate::sound::SongPool;

use super::{Engine, EngineError, EngineResult};

/// Rooms remembered for "go back" style scripting
const HISTORY_LEN: usize = 3;

pub trait RoomScript {
    fn on_enter(&mut self, engine: &mut Engine) -> anyhow::Result<()>;

    fn on_destroy(&mut self, _engine: &mut Engine) -> anyhow::Result<()> {
        Ok(())
    }
}

pub type RoomFactory = Box<dyn Fn() -> Box<dyn RoomScript>>;

pub struct RoomEntry {
    pub name: String,
    pub songs: Option<SongPool>,
    factory: RoomFactory,
}

impl fmt::Debug for RoomEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoomEntry")
            .field("name", &self.name)
            .field("songs", &self.songs)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: BTreeMap<i32, RoomEntry>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a room, replacing any previous one under the same id
    pub fn register(
        &mut self,
        id: i32,
        name: impl Into<String>,
        songs: Option<SongPool>,
        factory: impl Fn() -> Box<dyn RoomScript> + 'static,
    ) {
        self.rooms.insert(
            id,
            RoomEntry {
                name: name.into(),
                songs,
                factory: Box::new(factory),
            },
        );
    }

    pub fn get(&self, id: i32) -> Option<&RoomEntry> {
        self.rooms.get(&id)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.rooms.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.rooms.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

pub(crate) struct ActiveRoom {
    id: i32,
    script: Box<dyn RoomScript>,
}

impl ActiveRoom {
    pub(crate) fn id(&self) -> i32 {
        self.id
    }
}

impl Engine {
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn register_room(
        &mut self,
        id: i32,
        name: impl Into<String>,
        songs: Option<SongPool>,
        factory: impl Fn() -> Box<dyn RoomScript> + 'static,
    ) {
        self.rooms.register(id, name, songs, factory);
    }

    pub fn current_room(&self) -> Option<i32> {
        self.room.as_ref().map(ActiveRoom::id)
    }

    /// Rooms visited before the current one, newest first
    pub fn previous_rooms(&self) -> &[i32] {
        &self.room_history
    }

    pub fn last_room(&self) -> Option<i32> {
        self.room_history.first().copied()
    }

    pub fn change_room(&mut self, id: i32) -> EngineResult<()> {
        if id <= 0 {
            return Err(EngineError::InvalidRoom(id));
        }
        let Some(entry) = self.rooms.get(id) else {
            return Err(EngineError::UnknownRoom(id));
        };
        let mut script = (entry.factory)();
        let songs = entry.songs.clone();
        log::info!("entering room {} '{}'", id, entry.name);

        if let Some(mut old) = self.room.take() {
            self.room_history.insert(0, old.id);
            self.room_history.truncate(HISTORY_LEN);
            if let Err(e) = old.script.on_destroy(self) {
                log::warn!("room {}: on_destroy failed: {:#}", old.id, e);
            }
        }

        for channel in self.active_dialogue_channels() {
            if let Err(e) = self.stop_line(channel) {
                log::warn!("room change: could not stop dialogue on channel {}: {}", channel, e);
            }
        }
        let music_channel = self.config.music_channel;
        self.audio.stop_all_except(music_channel);
        self.subtitles.clear();

        script.on_enter(self)?;
        self.room = Some(ActiveRoom { id, script });

        if let Some(pool) = songs {
            self.apply_song_pool(&pool)?;
        }
        Ok(())
    }

    fn apply_song_pool(&mut self, pool: &SongPool) -> EngineResult<()> {
        let ids = self.music.apply_pool(pool, &mut self.rng).to_vec();
        match self.music.current_song() {
            None => self.start_next_song_now(),
            Some(current) if pool.immediate_playback && !ids.contains(&current) => {
                self.start_next_song_now()
            }
            Some(_) => Ok(()),
        }
    }
}
