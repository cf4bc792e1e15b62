// ─────────────────────────────────────────────────────────────────────
// GraphStable — Advance Observers
// ─────────────────────────────────────────────────────────────────────
//! Synchronous subscribers notified after every committed advance.
//!
//! Callbacks run on the computing thread before the stopping rule is
//! tested. A panicking callback is logged and skipped; it never aborts
//! the run.

use std::sync::mpsc::{self, Receiver, Sender};

use graphstable_core::StateVector;
use graphstable_types::Track;
use serde::{Deserialize, Serialize};

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

/// Event passed to callbacks. Borrows the engine's current vector.
#[derive(Debug, Clone, Copy)]
pub struct VectorAdvanced<'a> {
    pub track: Track,
    pub iteration: usize,
    vector: &'a StateVector,
}

impl<'a> VectorAdvanced<'a> {
    pub fn new(track: Track, iteration: usize, vector: &'a StateVector) -> Self {
        Self {
            track,
            iteration,
            vector,
        }
    }

    pub fn current(&self) -> &'a StateVector {
        self.vector
    }
}

/// Owned notice delivered over a channel subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceNotice {
    pub track: Track,
    pub iteration: usize,
    pub vector: StateVector,
}

pub type AdvanceCallback = Box<dyn FnMut(&VectorAdvanced<'_>) + Send + Sync>;

enum Sink {
    Callback(AdvanceCallback),
    Channel(Sender<AdvanceNotice>),
}

/// Ordered subscriber list. Notification order is subscription order.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    subscribers: Vec<(SubscriptionId, Sink)>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, callback: AdvanceCallback) -> SubscriptionId {
        self.push(Sink::Callback(callback))
    }

    /// Subscribe with a channel; each advance sends an owned copy of the
    /// vector. A dropped receiver is unsubscribed on the next notify.
    pub fn subscribe_channel(&mut self) -> (SubscriptionId, Receiver<AdvanceNotice>) {
        let (tx, rx) = mpsc::channel();
        (self.push(Sink::Channel(tx)), rx)
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn notify(&mut self, event: &VectorAdvanced<'_>) {
        let mut disconnected = Vec::new();
        for (id, sink) in self.subscribers.iter_mut() {
            match sink {
                Sink::Callback(cb) => {
                    let outcome =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(event)));
                    if outcome.is_err() {
                        log::error!(
                            "observer {} panicked at {} iteration {}; ignored",
                            id.0,
                            event.track,
                            event.iteration
                        );
                    }
                }
                Sink::Channel(tx) => {
                    let notice = AdvanceNotice {
                        track: event.track,
                        iteration: event.iteration,
                        vector: event.current().clone(),
                    };
                    if tx.send(notice).is_err() {
                        disconnected.push(*id);
                    }
                }
            }
        }
        for id in disconnected {
            log::debug!("observer {} receiver dropped; unsubscribing", id.0);
            self.unsubscribe(id);
        }
    }

    fn push(&mut self, sink: Sink) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, sink));
        id
    }
}
