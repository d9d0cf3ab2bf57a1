//! Optimistic reordering of an ordered collection against the server.
//!
//! State is a `committed` snapshot (last order the server is known to hold)
//! plus an optional `pending` working copy. The UI always shows `pending`
//! when present. Rolling back is dropping `pending` and reloading
//! `committed` from the server.

use std::{fmt::Debug, hash::Hash};

use async_trait::async_trait;
use shared::{
    domain::{MediaId, MediaItem, Project, ProjectId},
    protocol::OrderEntry,
};
use tracing::{info, warn};

use crate::error::{ClientError, ClientResult};

/// An entity with a dense, zero-based `order` inside its collection.
pub trait Ordered: Clone + Send + Sync + 'static {
    type Id: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;
    fn order(&self) -> i64;
    fn set_order(&mut self, order: i64);
}

impl Ordered for MediaItem {
    type Id = MediaId;

    fn id(&self) -> MediaId {
        self.id
    }

    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Ordered for Project {
    type Id = ProjectId;

    fn id(&self) -> ProjectId {
        self.id
    }

    fn order(&self) -> i64 {
        self.order
    }

    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

/// Where a collection's order is persisted and reloaded from.
#[async_trait]
pub trait OrderStore<T: Ordered>: Send + Sync {
    async fn submit(&self, entries: &[OrderEntry<T::Id>]) -> ClientResult<()>;
    async fn reload(&self) -> ClientResult<Vec<T>>;
}

/// Array move (remove at `from`, insert at `to`) followed by dense
/// renumbering. `None` when either index is out of range.
pub fn move_item<T: Ordered>(items: &[T], from: usize, to: usize) -> Option<Vec<T>> {
    if from >= items.len() || to >= items.len() {
        return None;
    }
    let mut moved = items.to_vec();
    let item = moved.remove(from);
    moved.insert(to, item);
    renumber(&mut moved);
    Some(moved)
}

pub fn renumber<T: Ordered>(items: &mut [T]) {
    for (position, item) in items.iter_mut().enumerate() {
        item.set_order(position as i64);
    }
}

pub fn order_entries<T: Ordered>(items: &[T]) -> Vec<OrderEntry<T::Id>> {
    items
        .iter()
        .map(|item| OrderEntry {
            id: item.id(),
            order: item.order(),
        })
        .collect()
}

/// A submitted reorder, returned by [`ReorderSync::begin`].
#[derive(Debug, Clone)]
pub struct ReorderTicket<T: Ordered> {
    generation: u64,
    snapshot: Vec<T>,
    entries: Vec<OrderEntry<T::Id>>,
}

impl<T: Ordered> ReorderTicket<T> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn entries(&self) -> &[OrderEntry<T::Id>] {
        &self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// The server accepted the order currently on screen.
    Saved,
    /// The server accepted an order that a later reorder or reload has
    /// already replaced on screen.
    Superseded,
    /// The server refused; the screen shows the server's order again, or the
    /// last known one when the reload failed too.
    RolledBack { reason: String, reloaded: bool },
}

impl ReorderOutcome {
    pub fn notice(&self) -> Notice {
        match self {
            ReorderOutcome::Saved | ReorderOutcome::Superseded => {
                Notice::Success("Order updated".into())
            }
            ReorderOutcome::RolledBack { reason, .. } => {
                Notice::Failure(format!("Failed to update order: {reason}"))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReorderSync<T: Ordered> {
    committed: Vec<T>,
    pending: Option<Vec<T>>,
    generation: u64,
}

impl<T: Ordered> Default for ReorderSync<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Ordered> ReorderSync<T> {
    pub fn new(committed: Vec<T>) -> Self {
        Self {
            committed,
            pending: None,
            generation: 0,
        }
    }

    /// What the UI renders.
    pub fn visible(&self) -> &[T] {
        self.pending.as_deref().unwrap_or(&self.committed)
    }

    pub fn committed(&self) -> &[T] {
        &self.committed
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Adopts a fresh server snapshot, discarding any optimistic state.
    pub fn replace_committed(&mut self, mut items: Vec<T>) {
        items.sort_by_key(T::order);
        self.committed = items;
        self.pending = None;
        self.generation += 1;
    }

    /// Applies a local edit (delete, flag flip, append) to both the
    /// committed and the pending copy.
    pub fn apply_local(&mut self, mut edit: impl FnMut(&mut Vec<T>)) {
        edit(&mut self.committed);
        if let Some(pending) = self.pending.as_mut() {
            edit(pending);
        }
    }

    /// Optimistically applies the move. Out-of-range indices are rejected
    /// without touching state.
    pub fn begin(&mut self, from: usize, to: usize) -> ClientResult<ReorderTicket<T>> {
        let moved = move_item(self.visible(), from, to).ok_or_else(|| {
            ClientError::precondition(format!(
                "cannot move item {from} to {to} in a collection of {}",
                self.visible().len()
            ))
        })?;
        self.generation += 1;
        let ticket = ReorderTicket {
            generation: self.generation,
            entries: order_entries(&moved),
            snapshot: moved.clone(),
        };
        self.pending = Some(moved);
        Ok(ticket)
    }

    /// Settles a ticket with the server's answer. A success for the latest
    /// ticket commits what is on screen, including any `apply_local` edits
    /// made since `begin`. A failure rolls back and reloads from `store`.
    pub async fn complete<S>(
        &mut self,
        ticket: ReorderTicket<T>,
        result: ClientResult<()>,
        store: &S,
    ) -> ReorderOutcome
    where
        S: OrderStore<T> + ?Sized,
    {
        match result {
            Ok(()) if ticket.generation == self.generation => {
                // `pending` carries local edits made while the request was in flight.
                self.committed = self.pending.take().unwrap_or(ticket.snapshot);
                info!(generation = ticket.generation, "reorder saved");
                ReorderOutcome::Saved
            }
            Ok(()) => {
                // The newer pending order settles or rolls back on its own ticket.
                info!(
                    generation = ticket.generation,
                    latest = self.generation,
                    "stale reorder acknowledged"
                );
                ReorderOutcome::Superseded
            }
            Err(error) => {
                warn!(generation = ticket.generation, %error, "reorder rejected; rolling back");
                let reason = error.to_string();
                self.pending = None;
                let reloaded = match store.reload().await {
                    Ok(items) => {
                        self.replace_committed(items);
                        true
                    }
                    Err(error) => {
                        warn!(%error, "reload after failed reorder also failed");
                        false
                    }
                };
                ReorderOutcome::RolledBack { reason, reloaded }
            }
        }
    }

    /// `begin`, submit, `complete`.
    pub async fn reorder<S>(&mut self, from: usize, to: usize, store: &S) -> ClientResult<ReorderOutcome>
    where
        S: OrderStore<T> + ?Sized,
    {
        let ticket = self.begin(from, to)?;
        let result = store.submit(ticket.entries()).await;
        Ok(self.complete(ticket, result, store).await)
    }
}

#[cfg(test)]
#[path = "tests/reorder_tests.rs"]
mod tests;
