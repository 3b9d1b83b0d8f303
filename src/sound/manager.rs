//! Audio channel model
//!
//! Owns the backend, the buffer cache and every live handle. A channel has
//! at most one authoritative handle: starting or cueing a sound on a
//! channel silently discards whatever handle held it before (its end
//! callback and scheduler are dropped, never run).
//!
//! The manager is generic over the callback type `T` so it never has to
//! call back into its owner. End callbacks and due scheduler events are
//! returned from [`AudioManager::on_playback_ended`] and
//! [`AudioManager::take_due_events`] for the owner to run.

use std::rc::Rc;
use std::time::Duration;

use super::backend::AudioBackend;
use super::buffer::{SoundBuffer, SoundCache};
use super::scheduler::AudioEventScheduler;
use super::types::{AudioError, AudioResult, ChannelId, ChannelRequest, HandleId, HandleStatus};
use crate::resource::ResourceLoader;
use crate::time::Clock;

struct HandleRecord<T> {
    id: HandleId,
    channel: ChannelId,
    buffer: SoundBuffer,
    identity: String,
    looping: bool,
    status: HandleStatus,
    /// Clock reading at start, pushed forward by paused intervals
    started_at: Duration,
    paused_at: Duration,
    on_end: Option<T>,
    scheduler: Option<AudioEventScheduler<T>>,
}

impl<T> HandleRecord<T> {
    fn position(&self, busy: bool, now: Duration) -> Option<Duration> {
        match self.status {
            HandleStatus::Cued => Some(Duration::ZERO),
            HandleStatus::Playing if busy => Some(now.saturating_sub(self.started_at)),
            HandleStatus::Playing | HandleStatus::Stopped => None,
            HandleStatus::Paused => Some(self.paused_at.saturating_sub(self.started_at)),
        }
    }
}

pub struct AudioManager<T> {
    backend: Box<dyn AudioBackend>,
    clock: Rc<dyn Clock>,
    cache: SoundCache,
    /// Creation order
    handles: Vec<HandleRecord<T>>,
    next_handle: u64,
    sweep_pending: bool,
}

impl<T> AudioManager<T> {
    pub fn new(backend: Box<dyn AudioBackend>, clock: Rc<dyn Clock>, cache_capacity: usize) -> Self {
        Self {
            backend,
            clock,
            cache: SoundCache::new(cache_capacity),
            handles: Vec::new(),
            next_handle: 1,
            sweep_pending: false,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.backend.channel_count()
    }

    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn cache(&self) -> &SoundCache {
        &self.cache
    }

    pub fn load(&mut self, path: &str, loader: &dyn ResourceLoader) -> AudioResult<SoundBuffer> {
        self.cache.load(path, loader).map_err(|source| AudioError::Load {
            path: path.to_string(),
            source,
        })
    }

    /// Start `buffer` now
    pub fn play(
        &mut self,
        buffer: &SoundBuffer,
        identity: impl Into<String>,
        channel: impl Into<ChannelRequest>,
        looping: bool,
    ) -> AudioResult<HandleId> {
        let channel = self.resolve_channel(channel.into())?;
        self.evict(channel);
        self.backend.play(channel, buffer, looping)?;
        Ok(self.track(channel, buffer, identity.into(), looping, HandleStatus::Playing))
    }

    /// Reserve a channel for `buffer` without starting it; [`resume`](Self::resume)
    /// starts playback.
    pub fn cue(
        &mut self,
        buffer: &SoundBuffer,
        identity: impl Into<String>,
        channel: impl Into<ChannelRequest>,
        looping: bool,
    ) -> AudioResult<HandleId> {
        let channel = self.resolve_channel(channel.into())?;
        self.evict(channel);
        if self.backend.is_busy(channel) {
            self.backend.stop(channel);
        }
        Ok(self.track(channel, buffer, identity.into(), looping, HandleStatus::Cued))
    }

    fn track(
        &mut self,
        channel: ChannelId,
        buffer: &SoundBuffer,
        identity: String,
        looping: bool,
        status: HandleStatus,
    ) -> HandleId {
        let id = HandleId(self.next_handle);
        self.next_handle += 1;
        let now = self.clock.now();
        log::debug!("handle {} '{}' on channel {} ({:?})", id, identity, channel, status);
        self.handles.push(HandleRecord {
            id,
            channel,
            buffer: buffer.clone(),
            identity,
            looping,
            status,
            started_at: now,
            paused_at: now,
            on_end: None,
            scheduler: None,
        });
        id
    }

    /// Explicit channels must exist; `Auto` takes the first free channel
    /// and falls back to the last one.
    pub fn resolve_channel(&self, request: ChannelRequest) -> AudioResult<ChannelId> {
        let count = self.backend.channel_count();
        match request {
            ChannelRequest::Exact(channel) if channel < count => Ok(channel),
            ChannelRequest::Exact(channel) => Err(AudioError::ChannelOutOfRange { channel, count }),
            ChannelRequest::Auto => {
                if count == 0 {
                    return Err(AudioError::ChannelOutOfRange { channel: 0, count });
                }
                Ok((0..count)
                    .find(|&c| !self.backend.is_busy(c) && !self.is_reserved(c))
                    .unwrap_or(count - 1))
            }
        }
    }

    fn is_reserved(&self, channel: ChannelId) -> bool {
        self.handles.iter().any(|h| {
            h.channel == channel && matches!(h.status, HandleStatus::Cued | HandleStatus::Paused)
        })
    }

    /// Drop any handle holding `channel`, without running its callbacks
    fn evict(&mut self, channel: ChannelId) {
        self.handles.retain(|h| {
            if h.channel != channel {
                return true;
            }
            log::debug!("handle {} superseded on channel {}", h.id, channel);
            false
        });
    }

    fn record(&self, handle: HandleId) -> Option<&HandleRecord<T>> {
        self.handles.iter().find(|h| h.id == handle)
    }

    fn record_mut(&mut self, handle: HandleId) -> AudioResult<&mut HandleRecord<T>> {
        self.handles
            .iter_mut()
            .find(|h| h.id == handle)
            .ok_or(AudioError::UnknownHandle(handle))
    }

    /// Stop a handle. Its end callback runs on the next sweep.
    pub fn stop(&mut self, handle: HandleId) -> bool {
        let Some(rec) = self.handles.iter_mut().find(|h| h.id == handle) else {
            return false;
        };
        match rec.status {
            HandleStatus::Stopped => return false,
            HandleStatus::Playing | HandleStatus::Paused => self.backend.stop(rec.channel),
            HandleStatus::Cued => {}
        }
        rec.status = HandleStatus::Stopped;
        self.sweep_pending = true;
        true
    }

    pub fn stop_channel(&mut self, channel: ChannelId) -> AudioResult<()> {
        let channel = self.resolve_channel(ChannelRequest::Exact(channel))?;
        match self.find_by_channel(channel) {
            Some(handle) => {
                self.stop(handle);
            }
            None => self.backend.stop(channel),
        }
        Ok(())
    }

    pub fn stop_all(&mut self) {
        for channel in 0..self.channel_count() {
            let _ = self.stop_channel(channel);
        }
    }

    pub fn stop_all_except(&mut self, keep: ChannelId) {
        for channel in (0..self.channel_count()).filter(|&c| c != keep) {
            let _ = self.stop_channel(channel);
        }
    }

    pub fn pause(&mut self, handle: HandleId) -> AudioResult<()> {
        let now = self.clock.now();
        let rec = self
            .handles
            .iter_mut()
            .find(|h| h.id == handle)
            .ok_or(AudioError::UnknownHandle(handle))?;
        if rec.status == HandleStatus::Playing {
            self.backend.pause(rec.channel);
            rec.status = HandleStatus::Paused;
            rec.paused_at = now;
        }
        Ok(())
    }

    /// Resume a paused handle, or start a cued one
    pub fn resume(&mut self, handle: HandleId) -> AudioResult<()> {
        let now = self.clock.now();
        let rec = self
            .handles
            .iter_mut()
            .find(|h| h.id == handle)
            .ok_or(AudioError::UnknownHandle(handle))?;
        match rec.status {
            HandleStatus::Paused => {
                self.backend.resume(rec.channel);
                rec.started_at += now.saturating_sub(rec.paused_at);
                rec.status = HandleStatus::Playing;
            }
            HandleStatus::Cued => {
                self.backend.play(rec.channel, &rec.buffer, rec.looping)?;
                rec.started_at = now;
                rec.status = HandleStatus::Playing;
            }
            HandleStatus::Playing | HandleStatus::Stopped => {}
        }
        Ok(())
    }

    pub fn status(&self, handle: HandleId) -> Option<HandleStatus> {
        self.record(handle).map(|h| h.status)
    }

    /// True while the handle is the channel's live, audible sound
    pub fn is_playing(&self, handle: HandleId) -> bool {
        self.record(handle).is_some_and(|h| {
            h.status == HandleStatus::Playing && self.backend.is_busy(h.channel)
        })
    }

    /// Logical position: wall time since start minus paused time. `None`
    /// once the handle stopped, finished or was superseded.
    pub fn position(&self, handle: HandleId) -> Option<Duration> {
        let rec = self.record(handle)?;
        rec.position(self.backend.is_busy(rec.channel), self.clock.now())
    }

    pub fn identity(&self, handle: HandleId) -> Option<&str> {
        self.record(handle).map(|h| h.identity.as_str())
    }

    pub fn channel_of(&self, handle: HandleId) -> Option<ChannelId> {
        self.record(handle).map(|h| h.channel)
    }

    /// Most recent live handle started under `identity`
    pub fn find_by_identity(&self, identity: &str) -> Option<HandleId> {
        self.handles
            .iter()
            .rev()
            .find(|h| h.identity == identity && h.status != HandleStatus::Stopped)
            .map(|h| h.id)
    }

    pub fn find_by_channel(&self, channel: ChannelId) -> Option<HandleId> {
        self.handles
            .iter()
            .rev()
            .find(|h| h.channel == channel && h.status != HandleStatus::Stopped)
            .map(|h| h.id)
    }

    /// Replace the handle's end callback
    pub fn set_on_end(&mut self, handle: HandleId, callback: T) -> AudioResult<()> {
        self.record_mut(handle)?.on_end = Some(callback);
        Ok(())
    }

    pub fn clear_on_end(&mut self, handle: HandleId) -> Option<T> {
        self.record_mut(handle).ok().and_then(|h| h.on_end.take())
    }

    /// Fire `callback` once the handle's position reaches `threshold`
    pub fn add_event(&mut self, handle: HandleId, threshold: Duration, callback: T) -> AudioResult<()> {
        self.record_mut(handle)?
            .scheduler
            .get_or_insert_with(AudioEventScheduler::new)
            .add_event(threshold, callback);
        Ok(())
    }

    pub fn active_schedulers(&self) -> usize {
        self.handles.iter().filter(|h| h.scheduler.is_some()).count()
    }

    /// Update every scheduler, prune finished ones and return due callbacks
    pub fn take_due_events(&mut self) -> Vec<(HandleId, T)> {
        let now = self.clock.now();
        let mut due = Vec::new();
        for rec in self.handles.iter_mut() {
            if rec.status == HandleStatus::Cued {
                continue;
            }
            let position = rec.position(self.backend.is_busy(rec.channel), now);
            let Some(scheduler) = rec.scheduler.as_mut() else {
                continue;
            };
            due.extend(scheduler.update(position).into_iter().map(|cb| (rec.id, cb)));
            if scheduler.is_finished() {
                rec.scheduler = None;
            }
        }
        due
    }

    /// Drain backend idle notifications; true if a sweep is needed
    pub fn poll_idle(&mut self) -> bool {
        let finished = self.backend.poll_finished();
        let pending = std::mem::take(&mut self.sweep_pending);
        !finished.is_empty() || pending
    }

    /// Sweep after an idle notification: handles still playing (or cued,
    /// or paused) survive; every other handle is discarded and its end
    /// callback returned, once.
    pub fn on_playback_ended(&mut self) -> Vec<(HandleId, T)> {
        let mut survivors = Vec::with_capacity(self.handles.len());
        let mut ended = Vec::new();
        for rec in self.handles.drain(..) {
            let alive = match rec.status {
                HandleStatus::Cued | HandleStatus::Paused => true,
                HandleStatus::Playing => self.backend.is_busy(rec.channel),
                HandleStatus::Stopped => false,
            };
            if alive {
                survivors.push(rec);
                continue;
            }
            log::debug!("handle {} '{}' ended", rec.id, rec.identity);
            if let Some(callback) = rec.on_end {
                ended.push((rec.id, callback));
            }
        }
        self.handles = survivors;
        ended
    }

    pub fn live_handles(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::MemoryLoader;
    use crate::sound::null::{BackendCall, NullBackend};
    use crate::time::ManualClock;

    struct Rig {
        audio: AudioManager<&'static str>,
        backend: NullBackend,
        clock: ManualClock,
        loader: MemoryLoader,
    }

    fn rig(channels: usize) -> Rig {
        let backend = NullBackend::new(channels);
        let clock = ManualClock::new();
        let mut loader = MemoryLoader::new();
        for name in ["a.wav", "b.wav", "c.wav"] {
            loader.insert_audio(name, vec![0; 4]);
        }
        Rig {
            audio: AudioManager::new(Box::new(backend.clone()), Rc::new(clock.clone()), 0),
            backend,
            clock,
            loader,
        }
    }

    impl Rig {
        fn buffer(&mut self, path: &str) -> SoundBuffer {
            self.audio.load(path, &self.loader).unwrap()
        }
    }

    #[test]
    fn test_second_play_supersedes_first() {
        let mut rig = rig(4);
        let a = rig.buffer("a.wav");
        let first = rig.audio.play(&a, "a", 0, false).unwrap();
        rig.audio.set_on_end(first, "first ended").unwrap();
        let second = rig.audio.play(&a, "a", 0, false).unwrap();

        assert!(!rig.audio.is_playing(first));
        assert_eq!(rig.audio.position(first), None);
        assert!(rig.audio.is_playing(second));

        rig.backend.finish(0);
        assert!(rig.audio.poll_idle());
        assert!(rig.audio.on_playback_ended().is_empty());
    }

    #[test]
    fn test_auto_channel_prefers_free_then_last() {
        let mut rig = rig(2);
        let a = rig.buffer("a.wav");
        let h0 = rig.audio.play(&a, "a", ChannelRequest::Auto, false).unwrap();
        let h1 = rig.audio.play(&a, "a", ChannelRequest::Auto, false).unwrap();
        assert_eq!(rig.audio.channel_of(h0), Some(0));
        assert_eq!(rig.audio.channel_of(h1), Some(1));

        let h2 = rig.audio.play(&a, "a", ChannelRequest::Auto, false).unwrap();
        assert_eq!(rig.audio.channel_of(h2), Some(1));
        assert!(!rig.audio.is_playing(h1));
    }

    #[test]
    fn test_explicit_channel_out_of_range() {
        let mut rig = rig(2);
        let a = rig.buffer("a.wav");
        let err = rig.audio.play(&a, "a", 5, false).unwrap_err();
        assert!(matches!(err, AudioError::ChannelOutOfRange { channel: 5, count: 2 }));
        assert!(rig.audio.stop_channel(9).is_err());
    }

    #[test]
    fn test_missing_sound_is_load_error() {
        let mut rig = rig(1);
        let err = rig.audio.load("ghost.wav", &rig.loader).unwrap_err();
        assert!(matches!(err, AudioError::Load { ref path, .. } if path == "ghost.wav"));
    }

    #[test]
    fn test_position_excludes_paused_time() {
        let mut rig = rig(1);
        let a = rig.buffer("a.wav");
        let h = rig.audio.play(&a, "a", 0, false).unwrap();
        rig.clock.advance_ms(300);
        rig.audio.pause(h).unwrap();
        rig.clock.advance_ms(1_000);
        assert_eq!(rig.audio.position(h), Some(Duration::from_millis(300)));
        assert!(!rig.audio.is_playing(h));
        assert!(rig.backend.is_paused(0));

        rig.audio.resume(h).unwrap();
        rig.clock.advance_ms(200);
        assert_eq!(rig.audio.position(h), Some(Duration::from_millis(500)));
        assert!(rig.audio.is_playing(h));
    }

    #[test]
    fn test_sweep_runs_each_end_callback_once() {
        let mut rig = rig(3);
        let a = rig.buffer("a.wav");
        let b = rig.buffer("b.wav");
        let ha = rig.audio.play(&a, "a", 0, false).unwrap();
        let hb = rig.audio.play(&b, "b", 1, false).unwrap();
        rig.audio.set_on_end(ha, "a done").unwrap();
        rig.audio.set_on_end(hb, "b done").unwrap();

        rig.backend.finish(0);
        assert!(rig.audio.poll_idle());
        let ended: Vec<_> = rig.audio.on_playback_ended().into_iter().map(|(_, cb)| cb).collect();
        assert_eq!(ended, vec!["a done"]);
        assert_eq!(rig.audio.live_handles(), 1);

        assert!(!rig.audio.poll_idle());
        assert!(rig.audio.on_playback_ended().is_empty());
    }

    #[test]
    fn test_stopped_handle_ends_on_next_sweep() {
        let mut rig = rig(2);
        let a = rig.buffer("a.wav");
        let h = rig.audio.play(&a, "a", 1, false).unwrap();
        rig.audio.set_on_end(h, "stopped").unwrap();
        rig.audio.stop_channel(1).unwrap();
        assert_eq!(rig.audio.status(h), Some(HandleStatus::Stopped));
        assert!(rig.audio.poll_idle());
        assert_eq!(rig.audio.on_playback_ended().len(), 1);
        assert_eq!(rig.audio.status(h), None);
    }

    #[test]
    fn test_on_end_is_overwritable_and_clearable() {
        let mut rig = rig(1);
        let a = rig.buffer("a.wav");
        let h = rig.audio.play(&a, "a", 0, false).unwrap();
        rig.audio.set_on_end(h, "one").unwrap();
        rig.audio.set_on_end(h, "two").unwrap();
        assert_eq!(rig.audio.clear_on_end(h), Some("two"));
        rig.backend.finish(0);
        rig.audio.poll_idle();
        assert!(rig.audio.on_playback_ended().is_empty());
    }

    #[test]
    fn test_cued_handle_reserves_channel_until_resumed() {
        let mut rig = rig(2);
        let a = rig.buffer("a.wav");
        let cued = rig.audio.cue(&a, "a", 0, false).unwrap();
        assert_eq!(rig.audio.status(cued), Some(HandleStatus::Cued));
        assert!(rig.backend.played_paths().is_empty());

        let other = rig.audio.play(&a, "a", ChannelRequest::Auto, false).unwrap();
        assert_eq!(rig.audio.channel_of(other), Some(1));

        rig.backend.finish(1);
        rig.audio.poll_idle();
        rig.audio.on_playback_ended();
        assert_eq!(rig.audio.status(cued), Some(HandleStatus::Cued));

        rig.clock.advance_ms(400);
        rig.audio.resume(cued).unwrap();
        assert!(rig.audio.is_playing(cued));
        assert_eq!(rig.audio.position(cued), Some(Duration::ZERO));
    }

    #[test]
    fn test_stopping_cued_handle_requests_sweep() {
        let mut rig = rig(1);
        let a = rig.buffer("a.wav");
        let cued = rig.audio.cue(&a, "a", 0, false).unwrap();
        rig.audio.set_on_end(cued, "never started").unwrap();
        assert!(rig.audio.stop(cued));
        assert!(!rig.audio.stop(cued));
        assert!(rig.audio.poll_idle());
        assert_eq!(rig.audio.on_playback_ended().len(), 1);
    }

    #[test]
    fn test_stop_all_except_keeps_music() {
        let mut rig = rig(3);
        let a = rig.buffer("a.wav");
        let b = rig.buffer("b.wav");
        let music = rig.audio.play(&a, "theme", 1, true).unwrap();
        let sfx = rig.audio.play(&b, "door", 2, false).unwrap();
        rig.audio.stop_all_except(1);
        assert!(rig.audio.is_playing(music));
        assert!(!rig.audio.is_playing(sfx));
        assert!(rig.backend.journal().contains(&BackendCall::Stop(2)));

        rig.audio.stop_all();
        assert!(!rig.audio.is_playing(music));
    }

    #[test]
    fn test_find_by_identity_and_channel() {
        let mut rig = rig(3);
        let a = rig.buffer("a.wav");
        let h = rig.audio.play(&a, "putt_0001", 2, false).unwrap();
        assert_eq!(rig.audio.find_by_identity("putt_0001"), Some(h));
        assert_eq!(rig.audio.find_by_channel(2), Some(h));
        assert_eq!(rig.audio.identity(h), Some("putt_0001"));
        assert_eq!(rig.audio.find_by_channel(0), None);
        rig.audio.stop(h);
        assert_eq!(rig.audio.find_by_identity("putt_0001"), None);
    }

    #[test]
    fn test_scheduler_fires_and_prunes() {
        let mut rig = rig(1);
        let a = rig.buffer("a.wav");
        let h = rig.audio.play(&a, "a", 0, false).unwrap();
        rig.audio.add_event(h, Duration::from_millis(100), "tick").unwrap();
        rig.audio.add_event(h, Duration::from_millis(300), "tock").unwrap();

        rig.clock.advance_ms(150);
        let due: Vec<_> = rig.audio.take_due_events().into_iter().map(|(_, cb)| cb).collect();
        assert_eq!(due, vec!["tick"]);
        assert_eq!(rig.audio.active_schedulers(), 1);

        rig.clock.advance_ms(150);
        let due: Vec<_> = rig.audio.take_due_events().into_iter().map(|(_, cb)| cb).collect();
        assert_eq!(due, vec!["tock"]);
        assert_eq!(rig.audio.active_schedulers(), 0);
    }

    #[test]
    fn test_scheduler_cleared_when_handle_stops() {
        let mut rig = rig(1);
        let a = rig.buffer("a.wav");
        let h = rig.audio.play(&a, "a", 0, false).unwrap();
        rig.audio.add_event(h, Duration::from_millis(100), "late").unwrap();
        rig.audio.stop(h);
        rig.clock.advance_ms(500);
        assert!(rig.audio.take_due_events().is_empty());
        assert_eq!(rig.audio.active_schedulers(), 0);
    }

    #[test]
    fn test_unknown_handle_errors() {
        let mut rig = rig(1);
        let ghost = HandleId(99);
        assert!(matches!(rig.audio.pause(ghost), Err(AudioError::UnknownHandle(_))));
        assert!(rig.audio.set_on_end(ghost, "x").is_err());
        assert!(rig.audio.add_event(ghost, Duration::ZERO, "x").is_err());
        assert!(!rig.audio.stop(ghost));
    }
}
