//! Dialogue
//!
//! # Architecture
//!
//! - [`script`]: what to say, as a [`LineRequest`]
//! - [`sequencer`]: per-channel queues advanced by end-of-audio callbacks,
//!   with a token per channel that cancels stale completions
//! - [`subtitle`]: the on-screen line

pub mod script;
pub mod sequencer;
pub mod subtitle;

pub use script::{LineRequest, ScriptItem};
pub use sequencer::ChannelDialogue;
pub use subtitle::{default_duration, Color, Subtitle, SubtitleDisplay, DEFAULT_SUBTITLE_COLOR};

use thiserror::Error;

use crate::engine::EngineError;
use crate::sound::AudioError;

#[derive(Debug, Error)]
pub enum CommError {
    #[error("dialogue audio: {0}")]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("dialogue callback failed: {0:#}")]
    Callback(#[from] anyhow::Error),
}

pub type CommResult<T> = Result<T, CommError>;
