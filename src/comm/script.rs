//! Dialogue requests
//!
//! A [`LineRequest`] names one line key or a sequence of items. Sequence
//! items either speak a line or change the speaker or gaze carried into the
//! lines after them.

use crate::actor::{ActorId, Gaze};
use crate::engine::{Callback, Engine};
use crate::sound::ChannelId;

use super::subtitle::{Color, DEFAULT_SUBTITLE_COLOR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptItem {
    /// Speak a line-table key
    Line(String),
    /// Following lines are spoken by this actor, or by nobody
    ChangeSpeaker(Option<ActorId>),
    ChangeGaze(Gaze),
}

impl From<&str> for ScriptItem {
    fn from(key: &str) -> Self {
        ScriptItem::Line(key.to_string())
    }
}

impl From<String> for ScriptItem {
    fn from(key: String) -> Self {
        ScriptItem::Line(key)
    }
}

pub struct LineRequest {
    pub items: Vec<ScriptItem>,
    pub actor: Option<ActorId>,
    /// Gaze held while speaking; `None` keeps the actor's current gaze
    pub gaze: Option<Gaze>,
    /// Defaults to the talkie channel
    pub channel: Option<ChannelId>,
    pub show_subtitles: bool,
    pub color: Color,
    pub on_done: Option<Callback>,
}

impl LineRequest {
    pub fn line(key: impl Into<String>) -> Self {
        Self::sequence(vec![ScriptItem::Line(key.into())])
    }

    pub fn sequence(items: impl IntoIterator<Item = ScriptItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
            actor: None,
            gaze: None,
            channel: None,
            show_subtitles: true,
            color: DEFAULT_SUBTITLE_COLOR,
            on_done: None,
        }
    }

    pub fn actor(mut self, actor: ActorId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn look_at(mut self, gaze: impl Into<Gaze>) -> Self {
        self.gaze = Some(gaze.into());
        self
    }

    pub fn channel(mut self, channel: ChannelId) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn subtitles(mut self, show: bool) -> Self {
        self.show_subtitles = show;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Run once the whole request finishes; skipped if it is cancelled
    pub fn on_done(mut self, callback: impl FnOnce(&mut Engine) -> anyhow::Result<()> + 'static) -> Self {
        self.on_done = Some(Box::new(callback));
        self
    }
}

impl std::fmt::Debug for LineRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineRequest")
            .field("items", &self.items)
            .field("actor", &self.actor)
            .field("gaze", &self.gaze)
            .field("channel", &self.channel)
            .field("show_subtitles", &self.show_subtitles)
            .field("on_done", &self.on_done.is_some())
            .finish()
    }
}
