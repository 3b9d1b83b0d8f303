//! Audio output backends
//!
//! The channel model talks to a device through [`AudioBackend`]: a fixed
//! set of channels, each playing at most one buffer. Backends report
//! channels that went idle on their own (or were stopped) through
//! [`AudioBackend::poll_finished`]; the engine turns that into one
//! idle-notification sweep per tick.

use super::buffer::SoundBuffer;
use super::types::{AudioResult, ChannelId};

pub trait AudioBackend {
    fn channel_count(&self) -> usize;

    /// Replace whatever the channel is playing
    fn play(&mut self, channel: ChannelId, buffer: &SoundBuffer, looping: bool) -> AudioResult<()>;

    fn stop(&mut self, channel: ChannelId);

    fn pause(&mut self, channel: ChannelId);

    fn resume(&mut self, channel: ChannelId);

    /// True while the channel has a sound loaded, paused or not
    fn is_busy(&self, channel: ChannelId) -> bool;

    /// Channels that became idle since the last poll
    fn poll_finished(&mut self) -> Vec<ChannelId>;
}
