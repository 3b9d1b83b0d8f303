//! Shared audio types and errors

use std::fmt;

use thiserror::Error;

use crate::resource::LoaderError;

/// Index of a playback channel, `0..channel_count`
pub type ChannelId = usize;

/// Identity of one playback instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub(crate) u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a loaded sound buffer; stable for as long as it stays cached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub(crate) u64);

/// Where a new sound should play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelRequest {
    /// First free channel, else the last channel
    #[default]
    Auto,
    Exact(ChannelId),
}

impl From<ChannelId> for ChannelRequest {
    fn from(channel: ChannelId) -> Self {
        ChannelRequest::Exact(channel)
    }
}

/// Lifecycle of a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
    /// Channel reserved, playback not started
    Cued,
    Playing,
    Paused,
    /// Stopped explicitly; swept on the next idle notification
    Stopped,
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("channel {channel} out of range ({count} channels)")]
    ChannelOutOfRange { channel: ChannelId, count: usize },
    #[error("unknown sound handle {0}")]
    UnknownHandle(HandleId),
    #[error("failed to load sound '{path}': {source}")]
    Load {
        path: String,
        #[source]
        source: LoaderError,
    },
    #[error("audio device error: {0}")]
    Device(String),
}

pub type AudioResult<T> = Result<T, AudioError>;
