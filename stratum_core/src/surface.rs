// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Surface allocation contract.
//!
//! The compositor decides *which* layers get a composited surface and how
//! those surfaces nest. It never talks to a GPU itself. A host provides a
//! [`SurfaceFactory`] that:
//!
//! - **Allocates** a surface when a layer is promoted
//!   ([`create_surface`](SurfaceFactory::create_surface)) and the root content
//!   surface when the document enters compositing mode
//!   ([`create_root_surface`](SurfaceFactory::create_root_surface)).
//!
//! - **Releases** a surface when its layer is demoted or the document leaves
//!   compositing mode ([`destroy_surface`](SurfaceFactory::destroy_surface)).
//!   Every successful allocation is paired with exactly one release.
//!
//! - **Mirrors** the composited tree: children, geometry and sublayer
//!   configuration are pushed as the rebuild and geometry passes compute
//!   them. These methods default to no-ops for hosts that would rather read
//!   the [`CompositedTree`](crate::compositor::CompositedTree) snapshot after
//!   each update.
//!
//! Allocation may fail. The failing layer stays non-composited for the rest
//! of the update and is retried on the next full update.
//!
//! # Update loop pseudocode
//!
//! ```rust,ignore
//! fn on_layout_done(tree: &mut LayerTree) {
//!     // Decide and maintain: drain dirty channels, pick an update type,
//!     // promote or demote layers and rebuild the composited tree.
//!     let changes = compositor.update_for_changes(tree, &mut factory)?;
//!
//!     // Repaint what moved between surfaces.
//!     for repaint in &changes.repaints {
//!         painter.invalidate(repaint.container, repaint.rect);
//!     }
//!
//!     // Re-attach the root if it changed identity.
//!     if let Some(attachment) = changes.attachment {
//!         host.attach_root(compositor.root_surface(), attachment);
//!     }
//! }
//! ```

use kurbo::Rect;

use crate::compositor::{CompositedChild, SublayerConfig};
use crate::error::SurfaceError;
use crate::layer::{LayerId, SurfaceId};
use crate::transform::Transform3d;

/// Placement of a composited surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceGeometry {
    /// Composited bounds in the owning layer's coordinates: its own painted
    /// extent plus everything non-composited that paints into it.
    pub bounds: Rect,
    /// Transform from the owning layer's coordinates into document
    /// coordinates.
    pub to_absolute: Transform3d,
}

/// Allocates and releases composited surfaces, and mirrors the composited
/// tree into a platform-native one.
pub trait SurfaceFactory {
    /// Allocates a surface for `layer`.
    fn create_surface(&mut self, layer: LayerId) -> Result<SurfaceId, SurfaceError>;

    /// Allocates the root content surface that hosts the top of the
    /// composited tree.
    fn create_root_surface(&mut self) -> Result<SurfaceId, SurfaceError>;

    /// Releases a surface returned by one of the `create_*` methods.
    fn destroy_surface(&mut self, surface: SurfaceId);

    /// Replaces the ordered children of `parent`.
    fn set_children(&mut self, parent: SurfaceId, children: &[CompositedChild]) {
        _ = (parent, children);
    }

    /// Repositions a surface.
    fn set_geometry(&mut self, surface: SurfaceId, geometry: &SurfaceGeometry) {
        _ = (surface, geometry);
    }

    /// Reconfigures which auxiliary sublayers a surface hosts.
    fn set_sublayers(&mut self, surface: SurfaceId, config: SublayerConfig) {
        _ = (surface, config);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use alloc::collections::{BTreeMap, BTreeSet};
    use alloc::vec::Vec;

    use super::*;

    /// A factory that hands out sequential ids and records every call.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingFactory {
        next: u32,
        pub(crate) created: Vec<(Option<LayerId>, SurfaceId)>,
        pub(crate) destroyed: Vec<SurfaceId>,
        pub(crate) fail: BTreeSet<LayerId>,
        pub(crate) children: BTreeMap<SurfaceId, Vec<CompositedChild>>,
        pub(crate) geometry: BTreeMap<SurfaceId, SurfaceGeometry>,
        pub(crate) sublayers: BTreeMap<SurfaceId, SublayerConfig>,
    }

    impl RecordingFactory {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Number of layer surfaces created so far (excluding root surfaces).
        pub(crate) fn layer_creates(&self) -> usize {
            self.created.iter().filter(|(l, _)| l.is_some()).count()
        }

        /// Surfaces created and not yet destroyed.
        pub(crate) fn live(&self) -> usize {
            self.created.len() - self.destroyed.len()
        }

        pub(crate) fn surface_of(&self, layer: LayerId) -> Option<SurfaceId> {
            self.created
                .iter()
                .rev()
                .find(|(l, _)| *l == Some(layer))
                .map(|(_, s)| *s)
        }

        pub(crate) fn clear_log(&mut self) {
            self.created.retain(|(_, s)| !self.destroyed.contains(s));
            self.destroyed.clear();
        }
    }

    impl SurfaceFactory for RecordingFactory {
        fn create_surface(&mut self, layer: LayerId) -> Result<SurfaceId, SurfaceError> {
            if self.fail.contains(&layer) {
                return Err(SurfaceError::OutOfMemory(layer));
            }
            let id = SurfaceId(self.next);
            self.next += 1;
            self.created.push((Some(layer), id));
            Ok(id)
        }

        fn create_root_surface(&mut self) -> Result<SurfaceId, SurfaceError> {
            let id = SurfaceId(self.next);
            self.next += 1;
            self.created.push((None, id));
            Ok(id)
        }

        fn destroy_surface(&mut self, surface: SurfaceId) {
            assert!(
                self.created.iter().any(|(_, s)| *s == surface),
                "destroying a surface that was never created"
            );
            assert!(
                !self.destroyed.contains(&surface),
                "surface destroyed twice"
            );
            self.destroyed.push(surface);
            self.children.remove(&surface);
            self.geometry.remove(&surface);
            self.sublayers.remove(&surface);
        }

        fn set_children(&mut self, parent: SurfaceId, children: &[CompositedChild]) {
            self.children.insert(parent, children.to_vec());
        }

        fn set_geometry(&mut self, surface: SurfaceId, geometry: &SurfaceGeometry) {
            self.geometry.insert(surface, *geometry);
        }

        fn set_sublayers(&mut self, surface: SurfaceId, config: SublayerConfig) {
            self.sublayers.insert(surface, config);
        }
    }
}
