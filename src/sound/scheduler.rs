// Time-keyed events on one audio handle.
//
// The scheduler never reads time itself: the channel model passes in the
// handle's logical position, or `None` once the handle stopped or was
// superseded. Callbacks are handed back to the caller instead of being run
// here, so they can borrow whatever owns the scheduler.

use std::time::Duration;

#[derive(Debug)]
struct ScheduledEvent<T> {
    threshold: Duration,
    /// Taken when fired
    callback: Option<T>,
}

#[derive(Debug)]
pub struct AudioEventScheduler<T> {
    events: Vec<ScheduledEvent<T>>,
    finished: bool,
}

impl<T> AudioEventScheduler<T> {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            finished: false,
        }
    }

    pub fn add_event(&mut self, threshold: Duration, callback: T) {
        self.events.push(ScheduledEvent {
            threshold,
            callback: Some(callback),
        });
        self.finished = false;
    }

    /// Collect every due callback, in insertion order. Once nothing is left
    /// unfired, or the position is gone, the scheduler is finished.
    pub fn update(&mut self, position: Option<Duration>) -> Vec<T> {
        let Some(position) = position else {
            self.clear();
            return Vec::new();
        };

        let due: Vec<T> = self
            .events
            .iter_mut()
            .filter(|event| event.callback.is_some() && event.threshold <= position)
            .filter_map(|event| event.callback.take())
            .collect();

        self.events.retain(|event| event.callback.is_some());
        if self.events.is_empty() {
            self.finished = true;
        }
        due
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Events not yet fired
    pub fn pending(&self) -> usize {
        self.events.len()
    }
}

impl<T> Default for AudioEventScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
