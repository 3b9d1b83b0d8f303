//! Per-channel dialogue sequencing
//!
//! Each audio channel carries a queue of [`ScriptItem`]s and a token.
//! Every say, skip or stop mints a new token; deferred work (audio end
//! callbacks, blink continuations) captures the token it was created under
//! and does nothing once the channel has moved on. The queue is advanced by
//! [`Engine::advance_dialogue`] only: commands apply immediately, the first
//! line found starts playing and the drain stops until its audio ends.
//!
//! A line spoken by an actor holds its audio cued while the actor blinks to
//! the requested gaze, then starts the mouth flap and the audio together.

use std::collections::VecDeque;
use std::fmt;

use crate::actor::{ActorId, Gaze};
use crate::engine::{Callback, Engine, TALKIE_DIR};
use crate::sound::{AudioError, ChannelId, HandleId, HandleStatus};

use super::script::{LineRequest, ScriptItem};
use super::subtitle::{Color, DEFAULT_SUBTITLE_COLOR};
use super::CommResult;

pub struct ChannelDialogue {
    token: u64,
    queue: VecDeque<ScriptItem>,
    active: bool,
    on_done: Option<Callback>,
    speaker: Option<ActorId>,
    gaze: Option<Gaze>,
    show_subtitles: bool,
    color: Color,
    /// Actor and handle of the line on air
    speaking: Option<(Option<ActorId>, HandleId)>,
}

impl ChannelDialogue {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Items not yet consumed
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn speaking(&self) -> Option<HandleId> {
        self.speaking.map(|(_, handle)| handle)
    }
}

impl Default for ChannelDialogue {
    fn default() -> Self {
        Self {
            token: 0,
            queue: VecDeque::new(),
            active: false,
            on_done: None,
            speaker: None,
            gaze: None,
            show_subtitles: true,
            color: DEFAULT_SUBTITLE_COLOR,
            speaking: None,
        }
    }
}

impl fmt::Debug for ChannelDialogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelDialogue")
            .field("token", &self.token)
            .field("queue", &self.queue)
            .field("active", &self.active)
            .field("speaker", &self.speaker)
            .field("speaking", &self.speaking)
            .finish()
    }
}

/// One line about to be played
struct Step {
    channel: ChannelId,
    token: u64,
    key: String,
    actor: Option<ActorId>,
    gaze: Option<Gaze>,
    show_subtitles: bool,
    color: Color,
}

/// A cued line waiting for its actor to finish blinking
struct Talk {
    channel: ChannelId,
    token: u64,
    actor: ActorId,
    gaze: Gaze,
    handle: HandleId,
    subtitle: Option<String>,
    color: Color,
}

impl Engine {
    /// Start a line or sequence on its channel, cancelling whatever the
    /// channel was saying. Returns the channel's new token.
    pub fn say_line(&mut self, request: LineRequest) -> CommResult<u64> {
        let channel = request.channel.unwrap_or(self.config().talkie_channel);
        let channel = self.validate_dialogue_channel(channel)?;

        self.subtitles.clear();
        let token = self.mint_token(channel);
        log::debug!(
            "channel {}: say {} item(s), token {}",
            channel,
            request.items.len(),
            token
        );

        let entry = self.dialogue.entry(channel).or_default();
        entry.queue = request.items.into();
        entry.active = true;
        entry.on_done = request.on_done;
        entry.speaker = request.actor;
        entry.gaze = request.gaze;
        entry.show_subtitles = request.show_subtitles;
        entry.color = request.color;

        self.advance_dialogue(channel, token)?;
        Ok(token)
    }

    /// Cut the current line. An active sequence continues at once with its
    /// next line, within this call.
    pub fn skip_line(&mut self, channel: ChannelId) -> CommResult<()> {
        let channel = self.validate_dialogue_channel(channel)?;
        let was_active = self.dialogue.get(&channel).is_some_and(|d| d.active);
        let token = self.mint_token(channel);
        self.audio.stop_channel(channel)?;
        self.subtitles.clear();
        if was_active {
            self.advance_dialogue(channel, token)?;
        }
        Ok(())
    }

    /// Silence the channel without moving to the next queued item
    pub fn stop_line(&mut self, channel: ChannelId) -> CommResult<()> {
        let channel = self.validate_dialogue_channel(channel)?;
        self.mint_token(channel);
        self.audio.stop_channel(channel)?;
        self.subtitles.clear();
        Ok(())
    }

    pub fn dialogue_token(&self, channel: ChannelId) -> u64 {
        self.dialogue.get(&channel).map_or(0, ChannelDialogue::token)
    }

    pub fn is_dialogue_active(&self, channel: ChannelId) -> bool {
        self.dialogue.get(&channel).is_some_and(ChannelDialogue::is_active)
    }

    pub fn dialogue(&self, channel: ChannelId) -> Option<&ChannelDialogue> {
        self.dialogue.get(&channel)
    }

    /// Channels that currently run a sequence
    pub fn active_dialogue_channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self
            .dialogue
            .iter()
            .filter(|(_, d)| d.active)
            .map(|(ch, _)| *ch)
            .collect();
        channels.sort_unstable();
        channels
    }

    fn is_current(&self, channel: ChannelId, token: u64) -> bool {
        self.dialogue.get(&channel).is_some_and(|d| d.token == token)
    }

    fn validate_dialogue_channel(&self, channel: ChannelId) -> CommResult<ChannelId> {
        let count = self.audio.channel_count();
        if channel >= count {
            return Err(AudioError::ChannelOutOfRange { channel, count }.into());
        }
        Ok(channel)
    }

    /// Invalidate every callback captured under the old token. A mouth still
    /// flapping for this channel's line is stopped without a re-blink.
    fn mint_token(&mut self, channel: ChannelId) -> u64 {
        let entry = self.dialogue.entry(channel).or_default();
        entry.token += 1;
        let token = entry.token;
        if let Some((Some(actor), handle)) = entry.speaking.take() {
            let flapping = self
                .actors
                .get(actor)
                .is_some_and(|a| a.flap_handle() == Some(handle));
            if flapping {
                if let Err(e) = self.stop_flap(actor, false) {
                    log::warn!("channel {}: could not stop flap of {}: {}", channel, actor, e);
                }
            }
        }
        token
    }

    /// Drain the channel's queue under `token` until a line starts or the
    /// queue runs dry
    pub(crate) fn advance_dialogue(&mut self, channel: ChannelId, token: u64) -> CommResult<()> {
        loop {
            let Some(entry) = self.dialogue.get_mut(&channel) else {
                return Ok(());
            };
            if entry.token != token {
                return Ok(());
            }
            match entry.queue.pop_front() {
                Some(ScriptItem::ChangeSpeaker(actor)) => entry.speaker = actor,
                Some(ScriptItem::ChangeGaze(gaze)) => entry.gaze = Some(gaze),
                Some(ScriptItem::Line(key)) => {
                    let step = Step {
                        channel,
                        token,
                        key,
                        actor: entry.speaker,
                        gaze: entry.gaze.clone(),
                        show_subtitles: entry.show_subtitles,
                        color: entry.color,
                    };
                    if let Err(e) = self.start_step(step) {
                        if let Some(entry) = self.dialogue.get_mut(&channel) {
                            if entry.token == token {
                                entry.queue.clear();
                                entry.active = false;
                                entry.on_done = None;
                            }
                        }
                        return Err(e);
                    }
                    return Ok(());
                }
                None => {
                    entry.active = false;
                    let done = entry.on_done.take();
                    log::debug!("channel {}: dialogue finished", channel);
                    if let Some(done) = done {
                        done(self)?;
                    }
                    return Ok(());
                }
            }
        }
    }

    fn start_step(&mut self, step: Step) -> CommResult<()> {
        let line = self.lines.resolve(&step.key);
        let buffer = self.load_sound(TALKIE_DIR, &line.file)?;
        let subtitle = if step.show_subtitles { line.subtitle } else { None };
        let channel = step.channel;

        let speaker = match step.actor {
            Some(id) if self.actors.contains(id) => Some(id),
            Some(id) => {
                log::warn!("channel {}: speaker {} is gone; line '{}' plays unattended", channel, id, step.key);
                None
            }
            None => None,
        };

        let Some(actor_id) = speaker else {
            let handle = self.audio.play(&buffer, step.key.as_str(), channel, false)?;
            self.set_speaking(channel, None, handle);
            if let Some(text) = &subtitle {
                let now = self.audio.now();
                self.subtitles.show(text, step.color, None, now);
            }
            self.audio
                .set_on_end(handle, step_completion(channel, step.token))?;
            return Ok(());
        };

        let (current_gaze, flapping, can_blink) = match self.actors.get(actor_id) {
            Some(actor) => (actor.gaze().clone(), actor.is_flapping(), actor.can_blink()),
            None => return Ok(()),
        };
        let target = step.gaze.unwrap_or_else(|| current_gaze.clone());
        let gaze_changes = target != current_gaze;
        if flapping && gaze_changes {
            self.stop_flap(actor_id, false)?;
        }

        let handle = self.audio.cue(&buffer, step.key.as_str(), channel, false)?;
        self.set_speaking(channel, Some(actor_id), handle);
        let talk = Talk {
            channel,
            token: step.token,
            actor: actor_id,
            gaze: target.clone(),
            handle,
            subtitle,
            color: step.color,
        };

        if self.config().blink_before_flap && gaze_changes && can_blink {
            log::debug!("channel {}: {} blinks to '{}' before speaking", channel, actor_id, target);
            let after: Callback = Box::new(move |engine: &mut Engine| {
                engine.begin_talking(talk)?;
                Ok(())
            });
            self.blink(actor_id, &target, Some(after))?;
        } else {
            if gaze_changes {
                self.look_at(actor_id, &target)?;
            }
            self.begin_talking(talk)?;
        }
        Ok(())
    }

    fn begin_talking(&mut self, talk: Talk) -> CommResult<()> {
        if !self.is_current(talk.channel, talk.token) {
            if let Some(actor) = self.actors.get_mut(talk.actor) {
                if !actor.is_flapping() {
                    actor.look_at(&Gaze::neutral());
                }
            }
            if self.audio.status(talk.handle) == Some(HandleStatus::Cued) {
                self.audio.stop(talk.handle);
            }
            return Ok(());
        }

        // another sound took the channel while the actor was blinking
        if !matches!(
            self.audio.status(talk.handle),
            Some(HandleStatus::Cued | HandleStatus::Paused)
        ) {
            log::debug!(
                "channel {}: audio for {} was dropped before it started",
                talk.channel,
                talk.actor
            );
            if let Some(actor) = self.actors.get_mut(talk.actor) {
                if !actor.is_flapping() {
                    actor.look_at(&Gaze::neutral());
                }
            }
            step_completion(talk.channel, talk.token)(self)?;
            return Ok(());
        }

        if let Some(actor) = self.actors.get_mut(talk.actor) {
            if actor.gaze() != &talk.gaze {
                actor.look_at(&talk.gaze);
            }
        }
        if let Some(text) = &talk.subtitle {
            let now = self.audio.now();
            self.subtitles.show(text, talk.color, None, now);
        }
        self.flap_mouth(
            talk.actor,
            talk.handle,
            Some(step_completion(talk.channel, talk.token)),
        )?;
        self.audio.resume(talk.handle)?;
        Ok(())
    }

    fn set_speaking(&mut self, channel: ChannelId, actor: Option<ActorId>, handle: HandleId) {
        if let Some(entry) = self.dialogue.get_mut(&channel) {
            entry.speaking = Some((actor, handle));
        }
    }
}

/// End-of-audio continuation for one line
fn step_completion(channel: ChannelId, token: u64) -> Callback {
    Box::new(move |engine: &mut Engine| {
        if !engine.is_current(channel, token) {
            return Ok(());
        }
        engine.subtitles.clear();
        if let Some(entry) = engine.dialogue.get_mut(&channel) {
            entry.speaking = None;
        }
        engine.advance_dialogue(channel, token)?;
        Ok(())
    })
}
