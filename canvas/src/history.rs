//! Undo/redo command log.
//!
//! Two stacks of [`HistoryEntry`]: `undo` holds committed local edits,
//! `redo` holds undone ones. Any new commit clears `redo`. Remote edits never
//! enter the log.
//!
//! Replays only touch the local document. The caller decides what to
//! publish: an undone `Add` stays local, everything else goes out as an
//! ordinary upsert of the resulting element.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use crate::doc::{DocStore, Element, ElementId, ElementPatch};

/// One committed local mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    Add { element: Element },
    Update { id: ElementId, old: ElementPatch, new: ElementPatch },
}

/// What an undo or redo did to the document.
#[derive(Debug, Clone, PartialEq)]
pub enum Replay {
    /// The element was taken out of the document.
    Removed(ElementId),
    /// The element now has this content.
    Restored(Element),
    /// The target no longer exists locally (e.g. a peer cleared the room).
    Missing(ElementId),
}

/// An undone entry. An undone `Add` remembers the z-position it was taken
/// from so redo puts it back underneath anything that arrived since.
#[derive(Debug, Clone, PartialEq)]
struct Undone {
    entry: HistoryEntry,
    position: Option<usize>,
}

#[derive(Debug, Default)]
pub struct History {
    undo: Vec<HistoryEntry>,
    redo: Vec<Undone>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local mutation that has already been applied.
    pub fn commit(&mut self, entry: HistoryEntry) {
        self.undo.push(entry);
        self.redo.clear();
    }

    /// Revert the most recent entry. `None` when there is nothing to undo.
    pub fn undo(&mut self, doc: &mut DocStore) -> Option<Replay> {
        let entry = self.undo.pop()?;
        let mut position = None;
        let replay = match &entry {
            HistoryEntry::Add { element } => {
                position = doc.position(&element.id);
                match doc.remove(&element.id) {
                    Some(_) => Replay::Removed(element.id.clone()),
                    None => Replay::Missing(element.id.clone()),
                }
            }
            HistoryEntry::Update { id, old, .. } => patch(doc, id, old),
        };
        self.redo.push(Undone { entry, position });
        Some(replay)
    }

    /// Re-apply the most recently undone entry. `None` when there is nothing to redo.
    pub fn redo(&mut self, doc: &mut DocStore) -> Option<Replay> {
        let Undone { entry, position } = self.redo.pop()?;
        let replay = match &entry {
            HistoryEntry::Add { element } => {
                match position {
                    Some(index) => doc.insert_at(index, element.clone()),
                    None => doc.upsert(element.clone()),
                }
                Replay::Restored(element.clone())
            }
            HistoryEntry::Update { id, new, .. } => patch(doc, id, new),
        };
        self.undo.push(entry);
        Some(replay)
    }

    /// Drop the most recent entry if it is the `Add` of `id`. Used when a
    /// freshly created element is abandoned before it was ever shown to peers.
    pub fn discard_add(&mut self, id: &str) -> bool {
        let is_add = matches!(self.undo.last(), Some(HistoryEntry::Add { element }) if element.id == id);
        if is_add {
            self.undo.pop();
        }
        is_add
    }

    /// Forget everything. Used when the room is cleared locally.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

fn patch(doc: &mut DocStore, id: &str, fields: &ElementPatch) -> Replay {
    if !doc.update(id, fields) {
        return Replay::Missing(id.to_owned());
    }
    match doc.get(id) {
        Some(element) => Replay::Restored(element.clone()),
        None => Replay::Missing(id.to_owned()),
    }
}
