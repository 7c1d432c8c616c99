//! In-memory modal layer with change notifications.
//!
//! Mutation = notification: `open` and `close` broadcast the new snapshot,
//! so nothing can change the layer without subscribers seeing it.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use relay_core::ModalConfig;

use super::{ModalStackManager, ModalSurface, StackCorrection};

/// Global counter for unique modal IDs.
static MODAL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an open modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModalId(u64);

impl ModalId {
    fn next() -> Self {
        Self(MODAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Addressable part of a modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModalPart {
    Modal(ModalId),
    Backdrop(ModalId),
}

/// An open modal and its backdrop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModalEntry {
    pub id: ModalId,
    pub title: String,
    pub z_index: i32,
    pub backdrop_z_index: i32,
}

/// Open modals in open order, oldest first.
pub struct ModalLayer {
    inner: RwLock<Vec<ModalEntry>>,
    config: ModalConfig,
    manager: ModalStackManager,
    tx: watch::Sender<Vec<ModalEntry>>,
    rx: watch::Receiver<Vec<ModalEntry>>,
}

impl ModalLayer {
    pub fn new(config: ModalConfig) -> Self {
        let (tx, rx) = watch::channel(Vec::new());
        Self {
            inner: RwLock::new(Vec::new()),
            config,
            manager: ModalStackManager::new(),
            tx,
            rx,
        }
    }

    /// Open a modal on top of the layer and fix up its stacking.
    ///
    /// The insert, the correction and the broadcast happen under one write
    /// lock, so concurrent opens each stack above the other.
    pub fn open(&self, title: impl Into<String>) -> (ModalId, StackCorrection) {
        let id = ModalId::next();
        let mut inner = self.inner.write();
        inner.push(ModalEntry {
            id,
            title: title.into(),
            z_index: self.config.modal_z_index,
            backdrop_z_index: self.config.backdrop_z_index,
        });
        tracing::debug!("Opened modal {:?}, depth: {}", id, inner.len());

        let correction = self
            .manager
            .on_modal_opened(&mut LockedEntries(&mut *inner));
        self.broadcast(&inner);
        (id, correction)
    }

    /// Close a modal, wherever it is in the layer.
    ///
    /// Returns `None` if no such modal is open. Broadcasts only if something
    /// was removed.
    pub fn close(&self, id: ModalId) -> Option<ModalEntry> {
        let mut inner = self.inner.write();
        let pos = inner.iter().position(|m| m.id == id)?;
        let removed = inner.remove(pos);
        tracing::debug!("Closed modal {:?}, depth: {}", id, inner.len());
        self.broadcast(&inner);
        Some(removed)
    }

    /// Close every modal.
    pub fn clear(&self) -> Vec<ModalEntry> {
        let mut inner = self.inner.write();
        let old = std::mem::take(&mut *inner);
        self.broadcast(&inner);
        old
    }

    /// Get a copy of an open modal.
    pub fn get(&self, id: ModalId) -> Option<ModalEntry> {
        self.inner.read().iter().find(|m| m.id == id).cloned()
    }

    /// Get the topmost modal.
    pub fn top(&self) -> Option<ModalEntry> {
        self.inner.read().last().cloned()
    }

    /// Get a snapshot of the layer.
    pub fn snapshot(&self) -> Vec<ModalEntry> {
        self.inner.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Subscribe to layer changes.
    ///
    /// Broadcasts are sent under the layer lock; do not hold a `borrow()` of
    /// the receiver while calling back into the layer.
    pub fn subscribe(&self) -> watch::Receiver<Vec<ModalEntry>> {
        self.rx.clone()
    }

    fn broadcast(&self, entries: &[ModalEntry]) {
        let _ = self.tx.send(entries.to_vec());
    }
}

impl Default for ModalLayer {
    fn default() -> Self {
        Self::new(ModalConfig::default())
    }
}

/// The layer's entries, borrowed under its write lock.
struct LockedEntries<'a>(&'a mut Vec<ModalEntry>);

impl LockedEntries<'_> {
    fn find_mut(&mut self, id: ModalId) -> Option<&mut ModalEntry> {
        self.0.iter_mut().find(|m| m.id == id)
    }
}

impl ModalSurface for LockedEntries<'_> {
    type Element = ModalPart;

    fn visible_modals(&self) -> Vec<ModalPart> {
        self.0.iter().map(|m| ModalPart::Modal(m.id)).collect()
    }

    fn visible_backdrops(&self) -> Vec<ModalPart> {
        self.0.iter().map(|m| ModalPart::Backdrop(m.id)).collect()
    }

    fn z_index(&self, element: &ModalPart) -> Option<i32> {
        match *element {
            ModalPart::Modal(id) => self.0.iter().find(|m| m.id == id).map(|m| m.z_index),
            ModalPart::Backdrop(id) => self
                .0
                .iter()
                .find(|m| m.id == id)
                .map(|m| m.backdrop_z_index),
        }
    }

    fn set_z_index(&mut self, element: &ModalPart, z_index: i32) {
        match *element {
            ModalPart::Modal(id) => {
                if let Some(m) = self.find_mut(id) {
                    m.z_index = z_index;
                }
            }
            ModalPart::Backdrop(id) => {
                if let Some(m) = self.find_mut(id) {
                    m.backdrop_z_index = z_index;
                }
            }
        }
    }
}
