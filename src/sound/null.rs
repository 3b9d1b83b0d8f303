//! Null (silent) backend
//!
//! Produces no sound. Channels stay busy until [`NullBackend::finish`] is
//! called or the channel is stopped, which makes playback timing fully
//! scriptable. With [`NullBackend::with_play_length`] every non-looping
//! sound also runs out after a fixed time on the given clock. Every call is appended to a journal shared by all clones,
//! so a test can keep one clone while the engine owns another.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use super::backend::AudioBackend;
use super::buffer::SoundBuffer;
use super::types::{AudioResult, ChannelId};
use crate::time::Clock;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Play {
        channel: ChannelId,
        path: String,
        looping: bool,
    },
    Stop(ChannelId),
    Pause(ChannelId),
    Resume(ChannelId),
}

#[derive(Debug, Clone, Default)]
struct Slot {
    path: Option<String>,
    paused: bool,
    looping: bool,
    /// Unpaused play time before the current run
    played: Duration,
    /// Clock reading when the current run began
    since: Duration,
}

struct PlayLength {
    clock: Rc<dyn Clock>,
    length: Duration,
}

impl fmt::Debug for PlayLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlayLength").field("length", &self.length).finish()
    }
}

#[derive(Debug, Default)]
struct NullState {
    slots: Vec<Slot>,
    finished: Vec<ChannelId>,
    journal: Vec<BackendCall>,
    play_length: Option<PlayLength>,
}

impl NullState {
    fn now(&self) -> Duration {
        self.play_length
            .as_ref()
            .map_or(Duration::ZERO, |p| p.clock.now())
    }

    /// End every non-looping sound that has played for the simulated length
    fn expire(&mut self) {
        let Some(play_length) = &self.play_length else {
            return;
        };
        let now = play_length.clock.now();
        let length = play_length.length;
        for (channel, slot) in self.slots.iter_mut().enumerate() {
            if slot.path.is_none() || slot.paused || slot.looping {
                continue;
            }
            if slot.played + now.saturating_sub(slot.since) >= length {
                slot.path = None;
                self.finished.push(channel);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct NullBackend {
    state: Rc<RefCell<NullState>>,
}

impl NullBackend {
    pub fn new(channels: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(NullState {
                slots: vec![Slot::default(); channels],
                ..Default::default()
            })),
        }
    }

    /// Let non-looping sounds run out after `length` of unpaused time on `clock`
    pub fn with_play_length(self, clock: Rc<dyn Clock>, length: Duration) -> Self {
        self.state.borrow_mut().play_length = Some(PlayLength { clock, length });
        self
    }

    /// Simulate a sound running out on `channel`
    pub fn finish(&self, channel: ChannelId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if let Some(slot) = state.slots.get_mut(channel) {
            if slot.path.take().is_some() {
                slot.paused = false;
                state.finished.push(channel);
            }
        }
    }

    /// Path playing (or paused) on `channel`
    pub fn playing(&self, channel: ChannelId) -> Option<String> {
        self.state
            .borrow()
            .slots
            .get(channel)
            .and_then(|slot| slot.path.clone())
    }

    pub fn is_paused(&self, channel: ChannelId) -> bool {
        self.state
            .borrow()
            .slots
            .get(channel)
            .is_some_and(|slot| slot.paused)
    }

    pub fn journal(&self) -> Vec<BackendCall> {
        self.state.borrow().journal.clone()
    }

    /// Paths started so far, in order
    pub fn played_paths(&self) -> Vec<String> {
        self.state
            .borrow()
            .journal
            .iter()
            .filter_map(|call| match call {
                BackendCall::Play { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_journal(&self) {
        self.state.borrow_mut().journal.clear();
    }
}

impl AudioBackend for NullBackend {
    fn channel_count(&self) -> usize {
        self.state.borrow().slots.len()
    }

    fn play(&mut self, channel: ChannelId, buffer: &SoundBuffer, looping: bool) -> AudioResult<()> {
        let mut state = self.state.borrow_mut();
        let now = state.now();
        if let Some(slot) = state.slots.get_mut(channel) {
            *slot = Slot {
                path: Some(buffer.path().to_string()),
                paused: false,
                looping,
                played: Duration::ZERO,
                since: now,
            };
        }
        state.journal.push(BackendCall::Play {
            channel,
            path: buffer.path().to_string(),
            looping,
        });
        Ok(())
    }

    fn stop(&mut self, channel: ChannelId) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        state.journal.push(BackendCall::Stop(channel));
        if let Some(slot) = state.slots.get_mut(channel) {
            if slot.path.take().is_some() {
                slot.paused = false;
                state.finished.push(channel);
            }
        }
    }

    fn pause(&mut self, channel: ChannelId) {
        let mut state = self.state.borrow_mut();
        state.expire();
        state.journal.push(BackendCall::Pause(channel));
        let now = state.now();
        if let Some(slot) = state.slots.get_mut(channel) {
            if slot.path.is_some() && !slot.paused {
                slot.paused = true;
                slot.played += now.saturating_sub(slot.since);
            }
        }
    }

    fn resume(&mut self, channel: ChannelId) {
        let mut state = self.state.borrow_mut();
        state.journal.push(BackendCall::Resume(channel));
        let now = state.now();
        if let Some(slot) = state.slots.get_mut(channel) {
            if slot.paused {
                slot.paused = false;
                slot.since = now;
            }
        }
    }

    fn is_busy(&self, channel: ChannelId) -> bool {
        let mut state = self.state.borrow_mut();
        state.expire();
        state.slots.get(channel).is_some_and(|slot| slot.path.is_some())
    }

    fn poll_finished(&mut self) -> Vec<ChannelId> {
        let mut state = self.state.borrow_mut();
        state.expire();
        std::mem::take(&mut state.finished)
    }
}
