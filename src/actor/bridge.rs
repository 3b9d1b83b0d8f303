//! Gestures that tie actor animation to engine state
//!
//! Blinking waits on the lids layer's end event; mouth flap follows an
//! audio handle and is stopped from that handle's end callback.

use std::cell::Cell;
use std::rc::Rc;

use super::events::{ActorEvent, ActorEventKind, EventContext, Handler};
use super::{ActorId, Gaze, LIDS_LAYER};
use crate::costume::Costume;
use crate::engine::{Callback, Engine, EngineError, EngineResult};
use crate::sound::HandleId;

impl Engine {
    /// Blink while turning to `gaze`, then run `after`.
    ///
    /// Returns false when the costume has no lids: the gaze changes at once
    /// and `after` is dropped.
    pub fn blink(&mut self, id: ActorId, gaze: &Gaze, after: Option<Callback>) -> EngineResult<bool> {
        let actor = self.actors.get_mut(id).ok_or(EngineError::UnknownActor(id))?;
        if !actor.can_blink() {
            actor.look_at(gaze);
            if after.is_some() {
                log::debug!("{} has no lids; blink continuation dropped", id);
            }
            return Ok(false);
        }

        let animation = actor.blink_animation().to_string();
        let costume = actor.costume_mut();
        costume.set_layer_hidden(LIDS_LAYER, false);
        costume.play_layer(LIDS_LAYER, animation.as_str())?;
        actor.look_at(gaze);

        let pending = Cell::new(after);
        let handler: Handler<Engine> = Rc::new(
            move |engine: &mut Engine, ctx: &EventContext, event: &ActorEvent| -> anyhow::Result<()> {
                if !event.is_layer(LIDS_LAYER) {
                    return Ok(());
                }
                if let Some(actor) = engine.actors.get_mut(ctx.actor) {
                    actor.costume_mut().set_layer_hidden(LIDS_LAYER, true);
                    actor.events.unsubscribe(ctx.subscription);
                }
                match pending.take() {
                    Some(after) => after(engine),
                    None => Ok(()),
                }
            },
        );
        actor.events.add(ActorEventKind::AnimationEnd, handler);
        Ok(true)
    }

    /// Flap head and eyes for as long as `handle` plays. When the audio ends
    /// the flap stops, the actor blinks back to a neutral gaze and
    /// `on_audio_end` runs.
    pub fn flap_mouth(
        &mut self,
        id: ActorId,
        handle: HandleId,
        on_audio_end: Option<Callback>,
    ) -> EngineResult<()> {
        if !self.actors.contains(id) {
            return Err(EngineError::UnknownActor(id));
        }
        let wrapped: Callback = Box::new(move |engine: &mut Engine| {
            let still_flapping = engine
                .actors
                .get(id)
                .is_some_and(|a| a.flap_handle() == Some(handle));
            if still_flapping {
                engine.stop_flap(id, true)?;
            }
            match on_audio_end {
                Some(callback) => callback(engine),
                None => Ok(()),
            }
        });
        // fails on a dropped handle before the mouth moves
        self.audio.set_on_end(handle, wrapped)?;

        let actor = self.actors.get_mut(id).ok_or(EngineError::UnknownActor(id))?;
        actor.start_flap(handle)?;
        self.fire_actor_event(id, &ActorEvent::new(ActorEventKind::FlapStarted));
        Ok(())
    }

    /// Put head and eyes back to idle. With `reblink`, an actor left looking
    /// away blinks back to neutral. Returns whether a flap was running.
    pub fn stop_flap(&mut self, id: ActorId, reblink: bool) -> EngineResult<bool> {
        let actor = self.actors.get_mut(id).ok_or(EngineError::UnknownActor(id))?;
        let was_flapping = actor.stop_flap_layers();
        let neutral = actor.gaze().is_neutral();
        if !was_flapping {
            return Ok(false);
        }
        self.fire_actor_event(id, &ActorEvent::new(ActorEventKind::FlapStopped));
        if reblink && !neutral {
            self.blink(id, &Gaze::neutral(), None)?;
        }
        Ok(true)
    }

    pub fn look_at(&mut self, id: ActorId, gaze: &Gaze) -> EngineResult<bool> {
        let actor = self.actors.get_mut(id).ok_or(EngineError::UnknownActor(id))?;
        Ok(actor.look_at(gaze))
    }

    /// Swap an actor's costume, returning the old one. Handlers registered
    /// on the actor are dropped.
    pub fn change_costume(&mut self, id: ActorId, costume: Costume) -> EngineResult<Costume> {
        let actor = self.actors.get_mut(id).ok_or(EngineError::UnknownActor(id))?;
        log::debug!("{}: costume '{}' -> '{}'", id, actor.costume().name(), costume.name());
        Ok(actor.swap_costume(costume))
    }
}
