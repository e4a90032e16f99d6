//! The dispatch table: where the single reader task sends each inbound
//! envelope.
//!
//! Callers waiting on a request register a one-shot waiter keyed by the
//! request's id and route. Passive listeners register a subscription keyed
//! by route alone. The reader hands every decoded envelope to
//! [`DispatchTable::dispatch`], which delivers it to exactly one of:
//!
//! ```text
//!   (a) waiter with same id AND same route   → delivered, waiter removed
//!   (b) no waiter for this id, route matches → every live subscriber, kept
//!   (c) anything else                        → dropped (caller logs it)
//! ```
//!
//! A waiter whose id matches but whose route differs is case (c): replies
//! are double-keyed so unrelated request families can't answer each other.

use std::collections::HashMap;

use questlink_protocol::{Envelope, RouteKey, Uuid};
use tokio::sync::{mpsc, oneshot};

struct Pending {
    route: RouteKey,
    waiter: oneshot::Sender<Envelope>,
}

/// What [`DispatchTable::dispatch`] did with an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatched {
    /// Handed to the waiting request.
    Reply,
    /// Handed to this many subscribers.
    Notified(usize),
    /// A waiter holds this id under another route.
    RouteMismatch,
    /// Nobody wanted it.
    Unmatched,
}

#[derive(Default)]
pub(crate) struct DispatchTable {
    pending: HashMap<Uuid, Pending>,
    subscriptions: HashMap<RouteKey, Vec<mpsc::UnboundedSender<Envelope>>>,
    closed: bool,
}

impl DispatchTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter for the reply to request `id` on `route`.
    ///
    /// Returns `None` once the table is closed.
    pub(crate) fn register(
        &mut self,
        id: Uuid,
        route: RouteKey,
    ) -> Option<oneshot::Receiver<Envelope>> {
        if self.closed {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, Pending { route, waiter: tx });
        Some(rx)
    }

    /// Forgets the waiter for `id`, if still there.
    pub(crate) fn cancel(&mut self, id: Uuid) {
        self.pending.remove(&id);
    }

    /// Adds a passive subscription for `route`.
    ///
    /// Returns `None` once the table is closed.
    pub(crate) fn subscribe(
        &mut self,
        route: RouteKey,
    ) -> Option<mpsc::UnboundedReceiver<Envelope>> {
        if self.closed {
            return None;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscriptions.entry(route).or_default().push(tx);
        Some(rx)
    }

    pub(crate) fn dispatch(&mut self, envelope: Envelope) -> Dispatched {
        let id = envelope.id();
        let route = envelope.route();

        if let Some(pending) = self.pending.get(&id) {
            if pending.route != route {
                return Dispatched::RouteMismatch;
            }
            if let Some(pending) = self.pending.remove(&id) {
                // The caller may have given up in the meantime; that's fine.
                let _ = pending.waiter.send(envelope);
            }
            return Dispatched::Reply;
        }

        let Some(subscribers) = self.subscriptions.get_mut(&route) else {
            return Dispatched::Unmatched;
        };
        subscribers.retain(|tx| tx.send(envelope.clone()).is_ok());
        let delivered = subscribers.len();
        if delivered == 0 {
            self.subscriptions.remove(&route);
            return Dispatched::Unmatched;
        }
        Dispatched::Notified(delivered)
    }

    /// Closes the table: every pending waiter and subscription is dropped,
    /// which their receivers observe as a closed channel.
    pub(crate) fn close(&mut self) {
        self.closed = true;
        self.pending.clear();
        self.subscriptions.clear();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
