//! Actor event registry
//!
//! Handlers are keyed by event kind and identified by the
//! [`SubscriptionId`] returned on registration; removal goes through that
//! id. Firing always runs a snapshot of the handler list, so a handler may
//! unsubscribe itself (or others) while the event is being delivered.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use super::ActorId;
use crate::costume::AnimationEnd;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActorEventKind {
    AnimationEnd,
    FlapStarted,
    FlapStopped,
    Custom(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActorEvent {
    pub kind: ActorEventKind,
    /// Set for [`ActorEventKind::AnimationEnd`]
    pub end: Option<AnimationEnd>,
}

impl ActorEvent {
    pub fn new(kind: ActorEventKind) -> Self {
        Self { kind, end: None }
    }

    pub fn animation_end(end: AnimationEnd) -> Self {
        Self {
            kind: ActorEventKind::AnimationEnd,
            end: Some(end),
        }
    }

    pub fn layer(&self) -> Option<&str> {
        self.end.as_ref().and_then(|e| e.layer.as_deref())
    }

    pub fn animation(&self) -> Option<&str> {
        self.end.as_ref().and_then(|e| e.animation.as_deref())
    }

    pub fn is_layer(&self, name: &str) -> bool {
        self.layer() == Some(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub{}", self.0)
    }
}

/// Passed to every handler alongside the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventContext {
    pub actor: ActorId,
    pub subscription: SubscriptionId,
}

pub type Handler<C> = Rc<dyn Fn(&mut C, &EventContext, &ActorEvent) -> anyhow::Result<()>>;

pub struct EventRegistry<C> {
    handlers: HashMap<ActorEventKind, Vec<(SubscriptionId, Handler<C>)>>,
    next_id: u64,
}

impl<C> EventRegistry<C> {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn add(&mut self, kind: ActorEventKind, handler: Handler<C>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.entry(kind).or_default().push((id, handler));
        id
    }

    /// Remove one subscription of `kind`
    pub fn remove(&mut self, kind: &ActorEventKind, id: SubscriptionId) -> bool {
        let Some(list) = self.handlers.get_mut(kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub, _)| *sub != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.handlers.remove(kind);
        }
        removed
    }

    /// Remove a subscription whatever its kind
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let kind = self
            .handlers
            .iter()
            .find(|(_, list)| list.iter().any(|(sub, _)| *sub == id))
            .map(|(kind, _)| kind.clone());
        match kind {
            Some(kind) => self.remove(&kind, id),
            None => false,
        }
    }

    pub fn snapshot(&self, kind: &ActorEventKind) -> Vec<(SubscriptionId, Handler<C>)> {
        self.handlers.get(kind).cloned().unwrap_or_default()
    }

    pub fn count(&self, kind: &ActorEventKind) -> usize {
        self.handlers.get(kind).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

impl<C> Default for EventRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for EventRegistry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&ActorEventKind, usize> =
            self.handlers.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("EventRegistry").field("handlers", &counts).finish()
    }
}

/// Run a snapshot in order. A failing handler is logged and the rest still run.
pub fn dispatch<C>(
    target: &mut C,
    actor: ActorId,
    snapshot: Vec<(SubscriptionId, Handler<C>)>,
    event: &ActorEvent,
) {
    for (subscription, handler) in snapshot {
        let ctx = EventContext { actor, subscription };
        if let Err(e) = handler(target, &ctx, event) {
            log::warn!("{} handler {} for {:?} failed: {:#}", actor, subscription, event.kind, e);
        }
    }
}
