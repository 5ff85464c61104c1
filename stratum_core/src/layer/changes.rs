// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change sets drained from the layer tree.

use alloc::vec::Vec;

use super::id::LayerId;

/// Everything that changed in a [`LayerTree`](super::LayerTree) since the
/// last drain.
///
/// Produced by [`LayerTree::drain_changes`](super::LayerTree::drain_changes).
/// Slot indices are listed in deterministic order.
#[derive(Clone, Debug, Default)]
pub struct TreeChanges {
    /// Layers whose style flags or animations changed.
    pub style: Vec<u32>,
    /// Layers whose absolute geometry changed (including descendants of a
    /// moved layer).
    pub geometry: Vec<u32>,
    /// Layers whose z-order lists changed, plus created and destroyed slots.
    pub topology: Vec<u32>,
    /// The frame scroll offset changed.
    pub scrolled: bool,
    /// Layers destroyed since the last drain, with the handle they had while
    /// alive.
    pub removed: Vec<LayerId>,
}

impl TreeChanges {
    /// Clears all fields, retaining allocated capacity.
    pub fn clear(&mut self) {
        self.style.clear();
        self.geometry.clear();
        self.topology.clear();
        self.scrolled = false;
        self.removed.clear();
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.style.is_empty()
            && self.geometry.is_empty()
            && self.topology.is_empty()
            && !self.scrolled
            && self.removed.is_empty()
    }
}
