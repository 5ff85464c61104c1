// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backings and their lifecycle.
//!
//! A [`Backing`] is what a composited layer owns: one surface from the
//! [`SurfaceFactory`](crate::surface::SurfaceFactory), plus the cached
//! geometry and sublayer configuration the rebuild and geometry passes
//! compute for it. Backings live in a slot-indexed [`BackingStore`], so "does
//! this layer have a backing" is an index lookup.
//!
//! [`Compositor::update_backing`] is the only place a backing is created, and
//! [`Compositor::release_backing`] the only place one is destroyed.

use alloc::vec::Vec;

use bitflags::bitflags;
use kurbo::Rect;

use crate::layer::{LayerId, LayerTree, Position, SurfaceId};
use crate::reasons::{
    CompositingReasons, ViewportConstrainedNotCompositedReason, requires_compositing_for_position,
};
use crate::trace::BackingChangeKind;
use crate::transform::Transform3d;

use super::rebuild::CompositedChild;
use super::{Compositor, Pass, Repaint, RepaintContainer};

bitflags! {
    /// Auxiliary sublayers a backing hosts around its main surface.
    #[derive(Clone, Copy, Default, Debug, Eq, PartialEq, Hash)]
    pub struct SublayerConfig: u8 {
        /// Clips the layer to an ancestor's clip that lies between it and its
        /// composited ancestor.
        const ANCESTOR_CLIPPING = 1 << 0;
        /// Clips composited descendants to the layer's own clip.
        const CLIPPING = 1 << 1;
        /// Paints the layer's foreground above composited negative z-order
        /// children.
        const FOREGROUND = 1 << 2;
        /// Scrolls the layer's contents on the compositor.
        const SCROLLING = 1 << 3;
        /// Hosts the horizontal scrollbar.
        const HORIZONTAL_SCROLLBAR = 1 << 4;
        /// Hosts the vertical scrollbar.
        const VERTICAL_SCROLLBAR = 1 << 5;
        /// Hosts the scroll corner.
        const SCROLL_CORNER = 1 << 6;
    }
}

impl SublayerConfig {
    /// Sublayers that parent the scrollbars when present.
    pub const SCROLLBAR_HOSTS: Self = Self::CLIPPING.union(Self::SCROLLING);

    /// The scrollbar and scroll-corner sublayers.
    pub const SCROLLBARS: Self = Self::HORIZONTAL_SCROLLBAR
        .union(Self::VERTICAL_SCROLLBAR)
        .union(Self::SCROLL_CORNER);
}

/// The composited surface of one layer.
#[derive(Clone, Debug)]
pub struct Backing {
    pub(crate) layer: LayerId,
    pub(crate) surface: SurfaceId,
    pub(crate) composited_bounds: Rect,
    pub(crate) to_absolute: Transform3d,
    pub(crate) sublayers: SublayerConfig,
    pub(crate) paints_into_composited_ancestor: bool,
    pub(crate) draws_content: bool,
    pub(crate) replica: Option<LayerId>,
    pub(crate) children: Vec<CompositedChild>,
}

impl Backing {
    fn new(layer: LayerId, surface: SurfaceId) -> Self {
        Self {
            layer,
            surface,
            composited_bounds: Rect::ZERO,
            to_absolute: Transform3d::IDENTITY,
            sublayers: SublayerConfig::empty(),
            paints_into_composited_ancestor: false,
            draws_content: true,
            replica: None,
            children: Vec::new(),
        }
    }

    /// The layer owning this backing.
    #[must_use]
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// The surface allocated for this backing.
    #[must_use]
    pub fn surface(&self) -> SurfaceId {
        self.surface
    }

    /// Own painted extent united with every non-composited descendant that
    /// paints into this backing, in the layer's coordinates.
    #[must_use]
    pub fn composited_bounds(&self) -> Rect {
        self.composited_bounds
    }

    /// Transform from the layer's coordinates into document coordinates, as
    /// of the last rebuild or geometry update.
    #[must_use]
    pub fn to_absolute(&self) -> Transform3d {
        self.to_absolute
    }

    /// Auxiliary sublayers hosted by this backing.
    #[must_use]
    pub fn sublayers(&self) -> SublayerConfig {
        self.sublayers
    }

    /// The layer is composited but has no reason to own a backing store, so
    /// its content paints into its composited ancestor.
    #[must_use]
    pub fn paints_into_composited_ancestor(&self) -> bool {
        self.paints_into_composited_ancestor
    }

    /// The backing store has painted content.
    #[must_use]
    pub fn draws_content(&self) -> bool {
        self.draws_content
    }

    /// The reflection layer whose backing replicates this one.
    #[must_use]
    pub fn replica(&self) -> Option<LayerId> {
        self.replica
    }

    /// Ordered composited children, as of the last rebuild.
    #[must_use]
    pub fn children(&self) -> &[CompositedChild] {
        &self.children
    }
}

/// Slot-indexed backings, at most one per layer.
#[derive(Debug, Default)]
pub(crate) struct BackingStore {
    slots: Vec<Option<Backing>>,
    len: usize,
}

impl BackingStore {
    pub(crate) fn get(&self, id: LayerId) -> Option<&Backing> {
        self.slots
            .get(id.index() as usize)
            .and_then(Option::as_ref)
            .filter(|b| b.layer == id)
    }

    pub(crate) fn get_mut(&mut self, id: LayerId) -> Option<&mut Backing> {
        self.slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
            .filter(|b| b.layer == id)
    }

    pub(crate) fn contains(&self, id: LayerId) -> bool {
        self.get(id).is_some()
    }

    /// # Panics
    ///
    /// Panics if the slot already holds a backing.
    fn insert(&mut self, backing: Backing) {
        let i = backing.layer.index() as usize;
        if self.slots.len() <= i {
            self.slots.resize_with(i + 1, || None);
        }
        assert!(
            self.slots[i].is_none(),
            "layer {} already has a backing",
            backing.layer
        );
        self.slots[i] = Some(backing);
        self.len += 1;
    }

    fn remove(&mut self, id: LayerId) -> Option<Backing> {
        let slot = self.slots.get_mut(id.index() as usize)?;
        if slot.as_ref().is_some_and(|b| b.layer == id) {
            self.len -= 1;
            slot.take()
        } else {
            None
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Backing> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    pub(crate) fn layers(&self) -> Vec<LayerId> {
        self.iter().map(|b| b.layer).collect()
    }
}

impl Compositor {
    /// Brings the layer's backing in line with
    /// [`needs_to_be_composited`](Self::needs_to_be_composited).
    ///
    /// Returns `true` if a backing was created or destroyed, or if the
    /// not-composited reason of a fixed-position layer changed. Calling it
    /// twice without an intervening change is a no-op the second time.
    pub(super) fn update_backing(&mut self, pass: &mut Pass<'_, '_>, layer: LayerId) -> bool {
        let tree = pass.tree;
        let has_backing = self.backings.contains(layer);
        let position = requires_compositing_for_position(&self.reason_context(tree), layer, has_backing);
        let mut changed = false;

        if self.needs_to_be_composited_in(tree, layer) {
            self.enable_compositing_mode(pass, true);
            if !has_backing {
                // Clear the old rendering from whatever surface it shared.
                self.repaint_on_compositing_change(pass, layer);
                let reasons = self.records.get(layer).reasons;
                match pass.factory.create_surface(layer) {
                    Ok(surface) => {
                        self.backings.insert(Backing::new(layer, surface));
                        log::debug!("promoted layer {layer} ({reasons})");
                        pass.backing_changed(layer, BackingChangeKind::Promoted, reasons);
                        pass.changes.promoted.push(layer);
                        if tree.is_root(layer) && !self.settings.is_main_frame {
                            pass.changes.root_changed = true;
                        }
                        changed = true;
                    }
                    Err(err) => {
                        log::warn!("layer {layer} stays non-composited: {err}");
                        self.records.get_mut(layer).allocation_failed = true;
                        pass.backing_changed(layer, BackingChangeKind::AllocationFailed, reasons);
                        pass.changes.allocation_failures.push((layer, err));
                    }
                }
            }
        } else if has_backing {
            self.release_backing(pass, layer);
            if tree.is_root(layer) && !self.settings.is_main_frame {
                pass.changes.root_changed = true;
            }
            changed = true;
            // The repaint container changed now that the backing is gone.
            self.repaint_on_compositing_change(pass, layer);
        }

        if changed {
            pass.changes.repaint_rects_recomputed.push(layer);
            pass.changes.clip_rects_invalidated.push(layer);
        }

        let record = self.records.get_mut(layer);
        if tree.style(layer).position == Position::Fixed {
            if record.not_composited != position.not_composited {
                record.not_composited = position.not_composited;
                changed = true;
            }
            if changed {
                pass.changes.fixed_objects_changed = true;
            }
        } else {
            record.not_composited = ViewportConstrainedNotCompositedReason::None;
        }

        changed
    }

    /// Destroys the backing of a live layer, if it has one.
    ///
    /// Detaches the replica link from the reflection source and drops the
    /// layer from the viewport-constrained registry first.
    pub(super) fn release_backing(&mut self, pass: &mut Pass<'_, '_>, layer: LayerId) {
        if !self.backings.contains(layer) {
            return;
        }
        let tree = pass.tree;
        if let Some(source) = tree.reflection_source(layer) {
            if let Some(b) = self.backings.get_mut(source) {
                b.replica = None;
            }
        }
        self.viewport.remove(layer);
        if let Some(backing) = self.backings.remove(layer) {
            pass.factory.destroy_surface(backing.surface);
            let reasons = self.records.get(layer).reasons;
            log::debug!("demoted layer {layer}");
            pass.backing_changed(layer, BackingChangeKind::Demoted, reasons);
            pass.changes.demoted.push(layer);
        }
    }

    /// Releases backings whose layers were destroyed without notification.
    pub(super) fn release_orphans(&mut self, pass: &mut Pass<'_, '_>) {
        let tree = pass.tree;
        for layer in self.backings.layers() {
            if tree.is_alive(layer) {
                continue;
            }
            log::warn!("releasing backing of destroyed layer {layer}");
            self.viewport.remove(layer);
            if let Some(backing) = self.backings.remove(layer) {
                pass.factory.destroy_surface(backing.surface);
                pass.backing_changed(layer, BackingChangeKind::Demoted, CompositingReasons::empty());
                pass.changes.demoted.push(layer);
            }
            pass.layers_changed = true;
        }
        let backings = &mut self.backings;
        for slot in backings.slots.iter_mut().flatten() {
            if slot.replica.is_some_and(|r| !tree.is_alive(r)) {
                slot.replica = None;
            }
        }
    }

    /// Records a repaint of the layer and its non-composited descendants
    /// through its current repaint container.
    pub(super) fn repaint_on_compositing_change(&self, pass: &mut Pass<'_, '_>, layer: LayerId) {
        let tree = pass.tree;
        // Detached layers have nothing on screen.
        if !tree.is_root(layer)
            && tree.parent(layer).is_none()
            && tree.reflection_source(layer).is_none()
        {
            return;
        }
        let container = self.repaint_container(tree, layer);
        let rect = tree
            .absolute_transform(layer)
            .map_rect(self.composited_bounds(tree, layer));
        pass.changes.repaints.push(Repaint {
            layer,
            container,
            rect,
        });
    }

    /// Returns the surface the layer's content currently paints into.
    ///
    /// This is the nearest ancestor-or-self with a backing store of its own,
    /// or the document when that is the root or there is none.
    #[must_use]
    pub fn repaint_container(&self, tree: &LayerTree, layer: LayerId) -> RepaintContainer {
        let mut cur = Some(layer);
        while let Some(id) = cur {
            if let Some(b) = self.backings.get(id) {
                if !b.paints_into_composited_ancestor {
                    return if tree.is_root(id) {
                        RepaintContainer::Document
                    } else {
                        RepaintContainer::Layer(id)
                    };
                }
            }
            cur = tree.parent(id).or_else(|| tree.reflection_source(id));
        }
        RepaintContainer::Document
    }

    /// Whether a composited layer needs a backing store of its own rather
    /// than painting into `compositing_ancestor`.
    pub(super) fn requires_own_backing_store(
        &self,
        tree: &LayerTree,
        layer: LayerId,
        compositing_ancestor: Option<LayerId>,
    ) -> bool {
        if let Some(ancestor) = compositing_ancestor.and_then(|a| self.backings.get(a)) {
            if !(ancestor.draws_content || ancestor.paints_into_composited_ancestor) {
                return true;
            }
        }

        let style = tree.style(layer);
        let reasons = self.records.get(layer).reasons;
        if tree.is_root(layer)
            || style.transform.is_some()
            || reasons.intersects(CompositingReasons::DIRECT)
            || style.is_transparent()
            || style.has_mask
            || style.has_filter
            || tree.reflection(layer).is_some()
        {
            return true;
        }

        reasons.intersects(CompositingReasons::INDIRECT_NEEDING_BACKING)
    }

    /// Returns `true` if a composited layer has composited descendants it
    /// must clip.
    #[must_use]
    pub fn clips_compositing_descendants(&self, tree: &LayerTree, layer: LayerId) -> bool {
        self.records.get(layer).has_compositing_descendant && tree.style(layer).clips_descendants
    }

    /// Returns `true` if some ancestor between a composited layer and its
    /// composited ancestor clips it.
    ///
    /// Composited layers are parented by z-order, but clipping follows the
    /// containing-block chain, so such a clip would otherwise be lost. The
    /// composited ancestor's own clip is covered by
    /// [`clips_compositing_descendants`](Self::clips_compositing_descendants).
    #[must_use]
    pub fn clipped_by_ancestor(&self, tree: &LayerTree, layer: LayerId) -> bool {
        if !self.backings.contains(layer) || tree.parent(layer).is_none() {
            return false;
        }
        let Some(compositing_ancestor) = self.composited_ancestor(tree, layer) else {
            return false;
        };

        // The child of the composited ancestor that contains `layer`.
        let mut clip_root = None;
        let mut cur = layer;
        while let Some(next) = tree.parent(cur) {
            if next == compositing_ancestor {
                clip_root = Some(cur);
                break;
            }
            cur = next;
        }
        let Some(clip_root) = clip_root else {
            return false;
        };
        if clip_root == layer {
            return false;
        }

        let mut cur = tree.parent(layer);
        while let Some(id) = cur {
            if tree.style(id).clips_descendants {
                return true;
            }
            if id == clip_root {
                break;
            }
            cur = tree.parent(id);
        }
        false
    }

    /// Nearest strict ancestor with a backing.
    pub(super) fn composited_ancestor(&self, tree: &LayerTree, layer: LayerId) -> Option<LayerId> {
        let mut cur = tree.parent(layer);
        while let Some(id) = cur {
            if self.backings.contains(id) {
                return Some(id);
            }
            cur = tree.parent(id);
        }
        None
    }

    /// Computes which auxiliary sublayers a composited layer needs.
    pub(super) fn sublayer_config(&self, tree: &LayerTree, layer: LayerId) -> SublayerConfig {
        use crate::layer::{OverflowControls, ZOrderList};

        let style = tree.style(layer);
        let mut config = SublayerConfig::empty();
        if self.clipped_by_ancestor(tree, layer) {
            config |= SublayerConfig::ANCESTOR_CLIPPING;
        }
        if self.clips_compositing_descendants(tree, layer) {
            config |= SublayerConfig::CLIPPING;
        }
        if tree.z_order_list(layer, ZOrderList::Negative).len() > 0 {
            config |= SublayerConfig::FOREGROUND;
        }
        if style.touch_scrolling && style.scrollable {
            config |= SublayerConfig::SCROLLING;
        }
        if style.scrollable {
            let controls = style.overflow_controls;
            if controls.contains(OverflowControls::HORIZONTAL_SCROLLBAR) {
                config |= SublayerConfig::HORIZONTAL_SCROLLBAR;
            }
            if controls.contains(OverflowControls::VERTICAL_SCROLLBAR) {
                config |= SublayerConfig::VERTICAL_SCROLLBAR;
            }
            if controls.contains(OverflowControls::SCROLL_CORNER) {
                config |= SublayerConfig::SCROLL_CORNER;
            }
        }
        config
    }
}
