//! In-flight load registry.
//!
//! At most one load runs per key. Late joiners clone the leader's shared
//! future instead of polling for a result, and the slot is removed exactly
//! once when the leader's load settles.

use std::{
    collections::HashMap,
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use super::key::CacheKey;
use crate::{codec::ImageRecord, error::Result};

pub(crate) type SharedLoad = Shared<BoxFuture<'static, Result<ImageRecord>>>;

/// Identifies one registration so a settle can never remove a newer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    /// Started the load.
    Leader,
    /// Attached to a load already in flight.
    Follower,
}

struct Slot {
    ticket: Ticket,
    load: SharedLoad,
}

#[derive(Default)]
pub(crate) struct PendingRegistry {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    next_ticket: AtomicU64,
}

impl fmt::Debug for PendingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRegistry")
            .field("in_flight", &self.len())
            .finish()
    }
}

impl PendingRegistry {
    /// Attach to the in-flight load for `key`, or register one built by
    /// `start`.
    ///
    /// `start` runs while the registry lock is held, so the load it spawns
    /// cannot settle before its slot is visible.
    pub(crate) fn join_or_start<F>(
        &self,
        key: &CacheKey,
        start: F,
    ) -> (SharedLoad, Role)
    where
        F: FnOnce(Ticket) -> BoxFuture<'static, Result<ImageRecord>>,
    {
        let mut slots = self.slots.lock();

        if let Some(slot) = slots.get(key) {
            return (slot.load.clone(), Role::Follower);
        }

        let ticket = Ticket(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        let load = start(ticket).shared();
        slots.insert(
            key.clone(),
            Slot {
                ticket,
                load: load.clone(),
            },
        );
        (load, Role::Leader)
    }

    /// Remove the slot registered under `ticket`. Later registrations for
    /// the same key are left alone.
    pub(crate) fn settle(&self, key: &CacheKey, ticket: Ticket) -> bool {
        let mut slots = self.slots.lock();
        match slots.get(key) {
            Some(slot) if slot.ticket == ticket => {
                slots.remove(key);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }
}
