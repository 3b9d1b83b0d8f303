//! Subtitle display
//!
//! One line of text at a time. A line is replaced by the next one, cleared
//! by the dialogue step that showed it, or dropped once its display time
//! runs out.

use std::time::Duration;

pub type Color = [u8; 3];

pub const DEFAULT_SUBTITLE_COLOR: Color = [255, 165, 255];

const MIN_DURATION: Duration = Duration::from_millis(1200);
const PER_WORD: Duration = Duration::from_millis(300);

/// Display time for `text` when the caller gives none
pub fn default_duration(text: &str) -> Duration {
    let words = text.split_whitespace().count() as u32;
    (PER_WORD * words).max(MIN_DURATION)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subtitle {
    pub text: String,
    pub color: Color,
    pub shown_at: Duration,
    pub expires_at: Duration,
}

#[derive(Debug, Clone)]
pub struct SubtitleDisplay {
    current: Option<Subtitle>,
    enabled: bool,
}

impl SubtitleDisplay {
    pub fn new(enabled: bool) -> Self {
        Self {
            current: None,
            enabled,
        }
    }

    /// Show `text` from `now`. Returns false when subtitles are disabled or
    /// the text is empty.
    pub fn show(&mut self, text: &str, color: Color, duration: Option<Duration>, now: Duration) -> bool {
        if !self.enabled || text.trim().is_empty() {
            return false;
        }
        let duration = duration.unwrap_or_else(|| default_duration(text));
        self.current = Some(Subtitle {
            text: text.to_string(),
            color,
            shown_at: now,
            expires_at: now + duration,
        });
        true
    }

    /// Returns whether a subtitle was on screen
    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn expire(&mut self, now: Duration) {
        if self.current.as_ref().is_some_and(|s| now >= s.expires_at) {
            log::debug!("subtitle expired");
            self.current = None;
        }
    }

    pub fn current(&self) -> Option<&Subtitle> {
        self.current.as_ref()
    }

    pub fn text(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.text.as_str())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.current = None;
        }
    }

    /// Flip the enable flag; returns the new state
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }
}

impl Default for SubtitleDisplay {
    fn default() -> Self {
        Self::new(true)
    }
}
