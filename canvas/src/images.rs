//! Per-element decoded image cache.
//!
//! Decoding is asynchronous and owned by the host. The renderer asks the
//! cache for each image element; an unknown id becomes a decode request and
//! is marked pending so it is requested only once. A failed id stays failed
//! for the life of the cache and renders blank.
//!
//! The cache is client-local and never serialized.

#[cfg(test)]
#[path = "images_test.rs"]
mod images_test;

use std::collections::{HashMap, HashSet};

use crate::doc::ElementId;

/// What the cache knows about an image element.
#[derive(Debug, PartialEq)]
pub enum ImageSlot<'a, I> {
    Ready(&'a I),
    Pending,
    Failed,
    Unknown,
}

#[derive(Debug)]
pub struct ImageCache<I> {
    ready: HashMap<ElementId, I>,
    pending: HashSet<ElementId>,
    failed: HashSet<ElementId>,
}

impl<I> Default for ImageCache<I> {
    fn default() -> Self {
        Self { ready: HashMap::new(), pending: HashSet::new(), failed: HashSet::new() }
    }
}

impl<I> ImageCache<I> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn lookup(&self, id: &str) -> ImageSlot<'_, I> {
        if let Some(image) = self.ready.get(id) {
            ImageSlot::Ready(image)
        } else if self.failed.contains(id) {
            ImageSlot::Failed
        } else if self.pending.contains(id) {
            ImageSlot::Pending
        } else {
            ImageSlot::Unknown
        }
    }

    /// Mark an id as being decoded. Returns `false` if it was already known.
    pub fn mark_pending(&mut self, id: &str) -> bool {
        if self.ready.contains_key(id) || self.failed.contains(id) {
            return false;
        }
        self.pending.insert(id.to_owned())
    }

    /// Store a decoded image. Returns `false` if the id had already failed.
    pub fn insert(&mut self, id: &str, image: I) -> bool {
        self.pending.remove(id);
        if self.failed.contains(id) {
            return false;
        }
        self.ready.insert(id.to_owned(), image);
        true
    }

    /// Record a decode failure. The id is never requested again.
    pub fn mark_failed(&mut self, id: &str) {
        self.pending.remove(id);
        self.failed.insert(id.to_owned());
    }

    #[must_use]
    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }
}
