//! Background music on the music channel
//!
//! Each song's end callback starts the next pick from the current pool, so
//! music keeps going without polling. A hard kill removes that callback; a
//! soft kill only stops the audio and lets the chain carry on.

use crate::sound::{MusicState, Song, SongCue, SongId};

use super::{Engine, EngineResult, MUSIC_DIR};

impl Engine {
    pub fn music(&self) -> &MusicState {
        &self.music
    }

    pub fn music_mut(&mut self) -> &mut MusicState {
        &mut self.music
    }

    /// Replace the song table; the standard pool becomes every song
    pub fn set_songs(&mut self, songs: impl IntoIterator<Item = Song>) {
        self.kill_music(false);
        let muted = self.music.is_muted();
        self.music = MusicState::new(songs);
        self.music.set_muted(muted);
    }

    pub fn start_song(&mut self, cue: SongCue, looping: bool) -> EngineResult<()> {
        if self.music.is_muted() && cue != SongCue::Stop {
            log::debug!("music muted; ignoring {:?}", cue);
            return Ok(());
        }
        match cue {
            SongCue::Stop => {
                self.kill_music(false);
                self.music.reset_index();
                Ok(())
            }
            SongCue::NextNow => match self.music.pick_next() {
                Some(id) => self.play_song(id, looping),
                None => {
                    log::debug!("music pool exhausted");
                    self.kill_music(false);
                    Ok(())
                }
            },
            SongCue::Song(id) => self.play_song(id, looping),
        }
    }

    pub fn start_next_song_now(&mut self) -> EngineResult<()> {
        self.start_song(SongCue::NextNow, false)
    }

    /// Stop the current song. A soft kill keeps its end callback, which
    /// moves on to the next song.
    pub fn kill_music(&mut self, soft: bool) {
        let Some(handle) = self.music.handle() else {
            return;
        };
        if !soft {
            self.audio.clear_on_end(handle);
            self.music.record_stop();
        }
        self.audio.stop(handle);
    }

    pub fn set_music_muted(&mut self, muted: bool) -> EngineResult<()> {
        if muted == self.music.is_muted() {
            return Ok(());
        }
        if muted {
            self.kill_music(false);
            self.music.set_muted(true);
            Ok(())
        } else {
            self.music.set_muted(false);
            self.start_next_song_now()
        }
    }

    fn play_song(&mut self, id: SongId, looping: bool) -> EngineResult<()> {
        let Some(song) = self.music.song(id) else {
            log::warn!("no song with id {}; stopping music", id);
            self.kill_music(false);
            return Ok(());
        };
        let filename = song.filename.clone();

        if let Some(old) = self.music.handle() {
            self.audio.clear_on_end(old);
            self.audio.stop(old);
        }

        let buffer = self.load_sound(MUSIC_DIR, &filename)?;
        let channel = self.config.music_channel;
        let handle = self.audio.play(&buffer, filename.as_str(), channel, looping)?;
        self.music.record_play(id, handle);
        log::info!("music: song {} '{}'", id, filename);

        self.audio.set_on_end(
            handle,
            Box::new(|engine: &mut Engine| {
                engine.start_next_song_now()?;
                Ok(())
            }),
        )?;
        Ok(())
    }
}
