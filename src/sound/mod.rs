//! Sound playback
//!
//! # Architecture
//!
//! - [`AudioManager`]: channel pool, handles, logical positions and the
//!   end-of-playback sweep
//! - [`AudioEventScheduler`]: time-keyed callbacks on one handle
//! - [`AudioBackend`]: the device; [`RodioBackend`] for real output,
//!   [`NullBackend`] for headless runs and tests
//! - [`SoundCache`]: buffers keyed by path
//! - [`music`]: song pools on the music channel

pub mod backend;
pub mod buffer;
pub mod manager;
pub mod music;
pub mod null;
pub mod rodio_backend;
pub mod scheduler;
pub mod types;

pub use backend::AudioBackend;
pub use buffer::{SoundBuffer, SoundCache};
pub use manager::AudioManager;
pub use music::{MusicState, Song, SongCue, SongId, SongPool};
pub use null::{BackendCall, NullBackend};
pub use rodio_backend::RodioBackend;
pub use scheduler::AudioEventScheduler;
pub use types::{AudioError, AudioResult, BufferId, ChannelId, ChannelRequest, HandleId, HandleStatus};
