//! Background music bookkeeping
//!
//! Songs are picked from a pool: the standard pool (every known song) or a
//! preferred pool installed by the current room. The engine plays the pick
//! on the music channel and chains the next pick from the handle's end
//! callback; this module only decides what comes next.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

use super::types::HandleId;

pub type SongId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub id: SongId,
    pub filename: String,
}

impl Song {
    pub fn new(id: SongId, filename: impl Into<String>) -> Self {
        Self {
            id,
            filename: filename.into(),
        }
    }
}

/// Music a room asks for on entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongPool {
    pub song_ids: Vec<SongId>,
    /// A one-song pool replays its song instead of going quiet
    pub single_song_loop: bool,
    /// Switch now if the current song is not in the pool
    pub immediate_playback: bool,
    pub shuffle_pool: bool,
}

impl SongPool {
    pub fn new(song_ids: impl Into<Vec<SongId>>) -> Self {
        Self {
            song_ids: song_ids.into(),
            ..Default::default()
        }
    }
}

/// What `start_song` should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongCue {
    Stop,
    NextNow,
    Song(SongId),
}

impl SongCue {
    /// Script codes: 0 stops, negative starts the next pooled song,
    /// positive plays that song.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => SongCue::Stop,
            c if c < 0 => SongCue::NextNow,
            c => SongCue::Song(c.unsigned_abs()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MusicState {
    songs: BTreeMap<SongId, Song>,
    standard_pool: Vec<SongId>,
    preferred_pool: Option<Vec<SongId>>,
    saved_pool: Option<Vec<SongId>>,
    current_pool: Vec<SongId>,
    current_index: Option<usize>,
    current_song: Option<SongId>,
    last_song: Option<SongId>,
    handle: Option<HandleId>,
    single_song_loop: bool,
    muted: bool,
}

impl MusicState {
    pub fn new(songs: impl IntoIterator<Item = Song>) -> Self {
        let songs: BTreeMap<SongId, Song> = songs.into_iter().map(|s| (s.id, s)).collect();
        let standard_pool: Vec<SongId> = songs.keys().copied().collect();
        Self {
            current_pool: standard_pool.clone(),
            standard_pool,
            songs,
            ..Default::default()
        }
    }

    pub fn song(&self, id: SongId) -> Option<&Song> {
        self.songs.get(&id)
    }

    pub fn current_song(&self) -> Option<SongId> {
        self.current_song
    }

    pub fn last_song(&self) -> Option<SongId> {
        self.last_song
    }

    pub fn handle(&self) -> Option<HandleId> {
        self.handle
    }

    pub fn pool(&self) -> &[SongId] {
        &self.current_pool
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub(crate) fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn use_standard_pool(&mut self) {
        self.current_pool = self.standard_pool.clone();
        self.current_index = None;
        self.single_song_loop = false;
    }

    pub fn set_preferred_pool(&mut self, songs: Vec<SongId>) {
        self.preferred_pool = Some(songs.clone());
        self.current_pool = songs;
        self.current_index = None;
    }

    /// Apply a room's pool; returns the (possibly shuffled) ids in use
    pub fn apply_pool<R: Rng + ?Sized>(&mut self, pool: &SongPool, rng: &mut R) -> &[SongId] {
        let mut ids = pool.song_ids.clone();
        if pool.shuffle_pool {
            ids.shuffle(rng);
        }
        self.set_preferred_pool(ids);
        self.single_song_loop = pool.single_song_loop;
        &self.current_pool
    }

    /// Park the preferred pool and fall back to the standard one
    pub fn save_preferred_pool(&mut self) {
        self.saved_pool = self.preferred_pool.take();
        self.use_standard_pool();
    }

    pub fn restore_preferred_pool(&mut self) {
        if let Some(saved) = self.saved_pool.take() {
            self.set_preferred_pool(saved);
        }
    }

    pub(crate) fn reset_index(&mut self) {
        self.current_index = None;
    }

    /// Next song from the current pool, never the current song unless the
    /// pool holds a single looping song. `None` means go quiet.
    pub fn pick_next(&mut self) -> Option<SongId> {
        let len = self.current_pool.len();
        if len == 0 {
            return None;
        }
        if len == 1 {
            let only = self.current_pool[0];
            if self.current_song == Some(only) && !self.single_song_loop {
                return None;
            }
            self.current_index = Some(0);
            return Some(only);
        }

        let mut index = self.current_index;
        for _ in 0..len {
            let next = index.map_or(0, |i| (i + 1) % len);
            index = Some(next);
            if Some(self.current_pool[next]) != self.current_song {
                self.current_index = index;
                return Some(self.current_pool[next]);
            }
        }
        // every entry is the current song
        self.current_index = index;
        Some(self.current_pool[0])
    }

    pub(crate) fn record_play(&mut self, song: SongId, handle: HandleId) {
        self.last_song = self.current_song;
        self.current_song = Some(song);
        self.handle = Some(handle);
    }

    /// Forget the current song after a hard stop
    pub(crate) fn record_stop(&mut self) {
        if self.current_song.is_some() {
            self.last_song = self.current_song;
        }
        self.current_song = None;
        self.handle = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rstest::rstest;

    fn state() -> MusicState {
        MusicState::new([
            Song::new(1, "street.ogg"),
            Song::new(2, "meadow.ogg"),
            Song::new(3, "barn.ogg"),
        ])
    }

    #[rstest]
    #[case(0, SongCue::Stop)]
    #[case(-1, SongCue::NextNow)]
    #[case(7, SongCue::Song(7))]
    fn test_song_cue_codes(#[case] code: i32, #[case] cue: SongCue) {
        assert_eq!(SongCue::from_code(code), cue);
    }

    #[test]
    fn test_standard_pool_is_every_song() {
        assert_eq!(state().pool(), &[1, 2, 3]);
    }

    #[test]
    fn test_pick_next_cycles_and_skips_current() {
        let mut music = state();
        assert_eq!(music.pick_next(), Some(1));
        music.record_play(1, HandleId(1));
        assert_eq!(music.pick_next(), Some(2));
        music.record_play(2, HandleId(2));
        assert_eq!(music.pick_next(), Some(3));
        music.record_play(3, HandleId(3));
        assert_eq!(music.pick_next(), Some(1));
        assert_eq!(music.last_song(), Some(2));
    }

    #[test]
    fn test_preferred_pool_avoids_current_song() {
        let mut music = state();
        music.record_play(2, HandleId(1));
        music.set_preferred_pool(vec![2, 3]);
        assert_eq!(music.pick_next(), Some(3));
    }

    #[test]
    fn test_single_song_pool_replays_only_when_looping() {
        let mut music = state();
        music.set_preferred_pool(vec![2]);
        assert_eq!(music.pick_next(), Some(2));
        music.record_play(2, HandleId(1));
        assert_eq!(music.pick_next(), None);

        let mut rng = StdRng::seed_from_u64(1);
        music.apply_pool(
            &SongPool {
                song_ids: vec![2],
                single_song_loop: true,
                ..Default::default()
            },
            &mut rng,
        );
        assert_eq!(music.pick_next(), Some(2));
    }

    #[test]
    fn test_empty_pool_goes_quiet() {
        let mut music = state();
        music.set_preferred_pool(Vec::new());
        assert_eq!(music.pick_next(), None);
    }

    #[test]
    fn test_save_and_restore_preferred_pool() {
        let mut music = state();
        music.set_preferred_pool(vec![3]);
        music.save_preferred_pool();
        assert_eq!(music.pool(), &[1, 2, 3]);
        music.restore_preferred_pool();
        assert_eq!(music.pool(), &[3]);
        music.restore_preferred_pool();
        assert_eq!(music.pool(), &[3]);
    }

    #[test]
    fn test_shuffled_pool_keeps_members() {
        let mut music = state();
        let mut rng = StdRng::seed_from_u64(42);
        let pool = SongPool {
            song_ids: vec![1, 2, 3],
            shuffle_pool: true,
            ..Default::default()
        };
        let mut ids = music.apply_pool(&pool, &mut rng).to_vec();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_record_stop_keeps_last_song() {
        let mut music = state();
        music.record_play(3, HandleId(4));
        music.record_stop();
        assert_eq!(music.current_song(), None);
        assert_eq!(music.last_song(), Some(3));
        assert_eq!(music.handle(), None);
    }
}
