use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::interval::UpdateInterval;

/// Callback notified once per location update cycle. Listeners take no
/// arguments; they are expected to read whatever they need back off the hub.
/// Invocation happens on whatever task drives the update, so listeners must
/// not block and must not assume any particular thread.
pub trait UpdateListener: Send + Sync {
    fn location_updated(&self);
}

impl<F: Fn() + Send + Sync> UpdateListener for F {
    fn location_updated(&self) {
        self()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GuardKind {
    Listener,
    Interval,
}

/// Sent by a guard when it is dropped. The generation lets the hub ignore
/// revocations from guards whose entry has since been replaced.
#[derive(Debug)]
pub(crate) struct Revocation {
    pub kind: GuardKind,
    pub id: String,
    pub generation: u64,
}

pub(crate) type RevocationTx = mpsc::UnboundedSender<Revocation>;
pub(crate) type RevocationRx = mpsc::UnboundedReceiver<Revocation>;

struct Guard {
    kind: GuardKind,
    id: String,
    generation: u64,
    revoke: Option<RevocationTx>,
}

impl Drop for Guard {
    fn drop(&mut self) {
        if let Some(revoke) = self.revoke.take() {
            revoke
                .send(Revocation {
                    kind: self.kind,
                    id: std::mem::take(&mut self.id),
                    generation: self.generation,
                })
                .ok();
        }
    }
}

/// Handle for a notification registration. Dropping it removes the callback,
/// unless the identifier has been re-registered since.
#[must_use = "dropping the guard unregisters the listener; call detach() for caller-managed lifetime"]
pub struct ListenerGuard(Guard);

impl ListenerGuard {
    pub(crate) fn new(id: String, generation: u64, revoke: RevocationTx) -> Self {
        Self(Guard {
            kind: GuardKind::Listener,
            id,
            generation,
            revoke: Some(revoke),
        })
    }

    /// The identifier this guard was registered under
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Leave the registration alive until it is explicitly unregistered
    pub fn detach(mut self) {
        self.0.revoke = None;
    }
}

/// Handle for an update-interval request. Dropping it withdraws the request,
/// unless the requester has set a new interval since.
#[must_use = "dropping the guard withdraws the interval request; call detach() for caller-managed lifetime"]
pub struct IntervalGuard(Guard);

impl IntervalGuard {
    pub(crate) fn new(id: String, generation: u64, revoke: RevocationTx) -> Self {
        Self(Guard {
            kind: GuardKind::Interval,
            id,
            generation,
            revoke: Some(revoke),
        })
    }

    /// The requester identifier this guard was registered under
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Leave the request alive until it is explicitly removed
    pub fn detach(mut self) {
        self.0.revoke = None;
    }
}

struct ListenerEntry {
    listener: Box<dyn UpdateListener>,
    generation: u64,
}

/// Identifier to callback mapping. Re-inserting an identifier replaces the
/// previous callback and bumps the generation so stale guards become inert.
pub(crate) struct ListenerTable {
    entries: HashMap<String, ListenerEntry>,
    next_generation: u64,
}

impl ListenerTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Insert or replace, returning the generation of the new entry
    pub fn insert(&mut self, id: &str, listener: Box<dyn UpdateListener>) -> u64 {
        let generation = self.bump();
        self.entries
            .insert(id.to_owned(), ListenerEntry { listener, generation });
        generation
    }

    /// Remove whatever is registered under `id`. Unknown ids are a no-op
    pub fn remove(&mut self, id: &str) {
        self.entries.remove(id);
    }

    /// Remove only if the entry still belongs to the given generation
    pub fn remove_generation(&mut self, id: &str, generation: u64) {
        if self
            .entries
            .get(id)
            .is_some_and(|entry| entry.generation == generation)
        {
            self.entries.remove(id);
        }
    }

    /// Invoke every registered listener exactly once, in no particular order
    pub fn notify_all(&self) {
        for entry in self.entries.values() {
            entry.listener.location_updated();
        }
    }

    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }
}

#[derive(Clone, Copy)]
struct IntervalEntry {
    interval: UpdateInterval,
    generation: u64,
}

/// Requester to desired-interval mapping used for arbitration
pub(crate) struct IntervalTable {
    entries: HashMap<String, IntervalEntry>,
    next_generation: u64,
}

impl IntervalTable {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Insert or replace a requester's desired interval, returning the
    /// generation of the new entry
    pub fn set(&mut self, id: &str, interval: UpdateInterval) -> u64 {
        let generation = self.bump();
        self.entries
            .insert(id.to_owned(), IntervalEntry { interval, generation });
        generation
    }

    /// Remove a requester's entry. Unknown requesters are a no-op
    pub fn remove(&mut self, id: &str) {
        self.entries.remove(id);
    }

    /// Remove only if the entry still belongs to the given generation
    pub fn remove_generation(&mut self, id: &str, generation: u64) {
        if self
            .entries
            .get(id)
            .is_some_and(|entry| entry.generation == generation)
        {
            self.entries.remove(id);
        }
    }

    /// The most precise interval among all requests. Manual when nobody is
    /// asking for automatic updates, including the empty table.
    pub fn effective(&self) -> UpdateInterval {
        self.entries
            .values()
            .map(|entry| entry.interval)
            .min()
            .unwrap_or(UpdateInterval::Manual)
    }

    fn bump(&mut self) -> u64 {
        let generation = self.next_generation;
        self.next_generation += 1;
        generation
    }
}
