// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays paint-order tree with allocation, z-order lists, and
//! style/geometry storage.

use alloc::vec::Vec;

use kurbo::{Insets, Rect, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use crate::dirty;
use crate::transform::Transform3d;

use super::changes::TreeChanges;
use super::frame::FrameView;
use super::id::{INVALID, LayerId};
use super::style::{AnimatedProperties, FixedContainer, LayerStyle, Position};
use super::traverse::{PaintOrder, ZOrderIter, ZOrderList};

/// Struct-of-arrays storage for the paint-order tree of one document.
///
/// Layers are addressed by [`LayerId`] handles. Destroyed layers are recycled
/// via a free list, and generation counters prevent stale handle access.
///
/// The tree always has a root layer (see [`root`](Self::root)). The root is a
/// stacking container and cannot be destroyed.
#[derive(Debug)]
pub struct LayerTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) z_lists: Vec<[Vec<u32>; 3]>,
    pub(crate) in_list: Vec<Option<ZOrderList>>,
    pub(crate) reflection: Vec<u32>,
    pub(crate) reflection_source: Vec<u32>,

    // -- Geometry (set by layout) --
    pub(crate) position: Vec<Vec2>,
    pub(crate) bounds: Vec<Rect>,
    pub(crate) overlap_outsets: Vec<Insets>,

    // -- Style --
    pub(crate) style: Vec<LayerStyle>,
    pub(crate) animations: Vec<AnimatedProperties>,
    pub(crate) transitions: Vec<AnimatedProperties>,

    // -- Frame --
    pub(crate) frame: FrameView,
    pub(crate) root: u32,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Lifecycle tracking --
    pub(crate) pending_removed: Vec<LayerId>,
}

impl Default for LayerTree {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerTree {
    /// Creates a tree holding only its root layer.
    #[must_use]
    pub fn new() -> Self {
        let mut tree = Self {
            parent: Vec::new(),
            z_lists: Vec::new(),
            in_list: Vec::new(),
            reflection: Vec::new(),
            reflection_source: Vec::new(),
            position: Vec::new(),
            bounds: Vec::new(),
            overlap_outsets: Vec::new(),
            style: Vec::new(),
            animations: Vec::new(),
            transitions: Vec::new(),
            frame: FrameView::default(),
            root: INVALID,
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_removed: Vec::new(),
        };
        let root = tree.create_layer();
        tree.root = root.idx;
        tree.style[root.idx as usize].stacking_container = true;
        let size = tree.frame.viewport_size;
        tree.bounds[root.idx as usize] = Rect::from_origin_size(kurbo::Point::ZERO, size);
        tree
    }

    /// Returns the root layer.
    #[must_use]
    pub fn root(&self) -> LayerId {
        self.id_at(self.root)
    }

    /// Returns `true` if `id` is the root layer.
    #[inline]
    #[must_use]
    pub fn is_root(&self, id: LayerId) -> bool {
        id.idx == self.root
    }

    // -- Allocation API --

    /// Creates a new, detached layer and returns its handle.
    ///
    /// The layer starts with default style, zero geometry, and no parent.
    pub fn create_layer(&mut self) -> LayerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.z_lists[i] = [Vec::new(), Vec::new(), Vec::new()];
            self.in_list[i] = None;
            self.reflection[i] = INVALID;
            self.reflection_source[i] = INVALID;
            self.position[i] = Vec2::ZERO;
            self.bounds[i] = Rect::ZERO;
            self.overlap_outsets[i] = Insets::ZERO;
            self.style[i] = LayerStyle::default();
            self.animations[i] = AnimatedProperties::empty();
            self.transitions[i] = AnimatedProperties::empty();
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.z_lists.push([Vec::new(), Vec::new(), Vec::new()]);
            self.in_list.push(None);
            self.reflection.push(INVALID);
            self.reflection_source.push(INVALID);
            self.position.push(Vec2::ZERO);
            self.bounds.push(Rect::ZERO);
            self.overlap_outsets.push(Insets::ZERO);
            self.style.push(LayerStyle::default());
            self.animations.push(AnimatedProperties::empty());
            self.transitions.push(AnimatedProperties::empty());
            self.generation.push(0);
            idx
        };

        self.dirty.mark(idx, dirty::TOPOLOGY);
        self.dirty.mark(idx, dirty::STYLE);

        self.id_at(idx)
    }

    /// Destroys a layer, freeing its slot for reuse.
    ///
    /// A reflection link in either direction is dropped with it.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, if the layer is the root, or if any of
    /// its z-order lists is non-empty (remove the children first).
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        let idx = id.idx;
        assert!(idx != self.root, "cannot destroy the root layer");
        assert!(
            self.z_lists[idx as usize].iter().all(Vec::is_empty),
            "cannot destroy layer with children"
        );

        if self.parent[idx as usize] != INVALID {
            let p = self.parent[idx as usize];
            self.unlink_from_parent(idx);
            self.dirty.mark(p, dirty::TOPOLOGY);
        }
        let reflection = self.reflection[idx as usize];
        if reflection != INVALID {
            self.reflection_source[reflection as usize] = INVALID;
            self.reflection[idx as usize] = INVALID;
        }
        let source = self.reflection_source[idx as usize];
        if source != INVALID {
            self.reflection[source as usize] = INVALID;
            self.reflection_source[idx as usize] = INVALID;
            self.dirty.mark(source, dirty::STYLE);
        }

        self.dirty.remove_key(idx);

        self.pending_removed.push(id);
        self.generation[idx as usize] += 1;
        self.free_list.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
    }

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Topology API --

    /// Appends `child` to the end of `parent`'s `list`.
    ///
    /// Negative and positive z-order lists only exist on stacking
    /// containers.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent or
    /// is the root, if the link would create a cycle, or if `list` is a
    /// z-order list and `parent` is not a stacking container.
    pub fn append_child(&mut self, parent: LayerId, child: LayerId, list: ZOrderList) {
        self.check_attach(parent, child, list);
        self.z_lists[parent.idx as usize][list.slot()].push(child.idx);
        self.link(parent.idx, child.idx, list);
    }

    /// Inserts `child` into `sibling`'s list, directly before `sibling`.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or
    /// `sibling` has no parent.
    pub fn insert_before(&mut self, child: LayerId, sibling: LayerId) {
        self.validate(sibling);
        let s = sibling.idx;
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");
        let list = self.in_list[s as usize].unwrap_or(ZOrderList::NormalFlow);
        let parent = self.id_at(p);
        self.check_attach(parent, child, list);

        let siblings = &mut self.z_lists[p as usize][list.slot()];
        let at = siblings.iter().position(|&i| i == s).unwrap_or(siblings.len());
        siblings.insert(at, child.idx);
        self.link(p, child.idx, list);
    }

    /// Detaches `child` from its parent's z-order list.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        self.validate(child);
        let c = child.idx;
        let p = self.parent[c as usize];
        assert!(p != INVALID, "layer has no parent");

        self.unlink_from_parent(c);
        self.dirty.remove_dependency(c, p, dirty::GEOMETRY);
        self.dirty.mark_with(c, dirty::GEOMETRY, &EagerPolicy);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Returns the parent of a layer, if any.
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns which of its parent's lists a layer is in.
    #[must_use]
    pub fn list_of(&self, id: LayerId) -> Option<ZOrderList> {
        self.validate(id);
        self.in_list[id.idx as usize]
    }

    /// Returns an iterator over one z-order list of a layer.
    #[must_use]
    pub fn z_order_list(&self, id: LayerId, list: ZOrderList) -> ZOrderIter<'_> {
        self.validate(id);
        ZOrderIter::new(self, &self.z_lists[id.idx as usize][list.slot()])
    }

    /// Returns `true` if the layer has any child in any list.
    #[must_use]
    pub fn has_children(&self, id: LayerId) -> bool {
        self.validate(id);
        self.z_lists[id.idx as usize].iter().any(|l| !l.is_empty())
    }

    /// Returns all children of a layer in paint order.
    #[must_use]
    pub fn paint_order_children(&self, id: LayerId) -> PaintOrder<'_> {
        self.validate(id);
        let [neg, normal, pos] = &self.z_lists[id.idx as usize];
        PaintOrder::new(
            ZOrderIter::new(self, neg),
            ZOrderIter::new(self, normal),
            ZOrderIter::new(self, pos),
        )
    }

    /// Returns the nearest strict ancestor that is a stacking container.
    #[must_use]
    pub fn stacking_container_ancestor(&self, id: LayerId) -> Option<LayerId> {
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            if self.style[p.idx as usize].stacking_container {
                return Some(p);
            }
            cur = self.parent(p);
        }
        None
    }

    /// Returns `true` if `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: LayerId, id: LayerId) -> bool {
        self.validate(ancestor);
        self.validate(id);
        let mut cur = id.idx;
        while cur != INVALID {
            if cur == ancestor.idx {
                return true;
            }
            cur = self.parent[cur as usize];
        }
        false
    }

    // -- Reflections --

    /// Links `reflection` as the reflection of `source`, or clears the link
    /// when `reflection` is `None`.
    ///
    /// Reflection layers are not part of any z-order list; they are painted
    /// and composited alongside their source.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale or `reflection` has a parent.
    pub fn set_reflection(&mut self, source: LayerId, reflection: Option<LayerId>) {
        self.validate(source);
        let old = self.reflection[source.idx as usize];
        if old != INVALID {
            self.reflection_source[old as usize] = INVALID;
        }
        match reflection {
            Some(r) => {
                self.validate(r);
                assert!(
                    self.parent[r.idx as usize] == INVALID,
                    "reflection layer must not be in a z-order list"
                );
                self.reflection[source.idx as usize] = r.idx;
                self.reflection_source[r.idx as usize] = source.idx;
                self.dirty.mark(r.idx, dirty::STYLE);
            }
            None => self.reflection[source.idx as usize] = INVALID,
        }
        self.dirty.mark(source.idx, dirty::STYLE);
    }

    /// Returns the reflection layer of `id`, if any.
    #[must_use]
    pub fn reflection(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        let r = self.reflection[id.idx as usize];
        (r != INVALID).then(|| self.id_at(r))
    }

    /// Returns the layer `id` is a reflection of, if any.
    #[must_use]
    pub fn reflection_source(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        let s = self.reflection_source[id.idx as usize];
        (s != INVALID).then(|| self.id_at(s))
    }

    // -- Geometry --

    /// Returns the layer's offset from its parent's origin.
    ///
    /// For a fixed-position layer contained by the viewport this is the
    /// offset from the viewport origin instead.
    #[must_use]
    pub fn position(&self, id: LayerId) -> Vec2 {
        self.validate(id);
        self.position[id.idx as usize]
    }

    /// Returns the layer's painted extent in its own coordinates.
    #[must_use]
    pub fn bounds(&self, id: LayerId) -> Rect {
        self.validate(id);
        self.bounds[id.idx as usize]
    }

    /// Returns the bounds used for overlap testing, which may exceed the
    /// painted extent (e.g. for filter outsets).
    #[must_use]
    pub fn overlap_bounds(&self, id: LayerId) -> Rect {
        self.validate(id);
        let i = id.idx as usize;
        self.bounds[i] + self.overlap_outsets[i]
    }

    /// Sets the layer's offset from its parent.
    pub fn set_position(&mut self, id: LayerId, position: Vec2) {
        self.validate(id);
        self.position[id.idx as usize] = position;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the layer's painted extent.
    pub fn set_bounds(&mut self, id: LayerId, bounds: Rect) {
        self.validate(id);
        self.bounds[id.idx as usize] = bounds;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets how far overlap bounds extend beyond the painted extent.
    pub fn set_overlap_outsets(&mut self, id: LayerId, outsets: Insets) {
        self.validate(id);
        self.overlap_outsets[id.idx as usize] = outsets;
        self.dirty.mark(id.idx, dirty::GEOMETRY);
    }

    /// Returns the transform from the layer's coordinates into its parent's.
    ///
    /// `parent_to_absolute` is the absolute transform of the parent. A
    /// fixed-position layer contained by the viewport ignores it and is
    /// placed relative to the scrolled viewport instead.
    #[must_use]
    pub fn to_absolute(&self, id: LayerId, parent_to_absolute: Transform3d) -> Transform3d {
        self.validate(id);
        let i = id.idx as usize;
        let style = &self.style[i];
        let pos = self.position[i];
        let base = if style.position == Position::Fixed
            && style.fixed_container == FixedContainer::Viewport
        {
            let at = pos + self.frame.scroll_offset;
            Transform3d::from_translation(at.x, at.y, 0.0)
        } else {
            parent_to_absolute * Transform3d::from_translation(pos.x, pos.y, 0.0)
        };
        match style.transform {
            Some(t) => base * t,
            None => base,
        }
    }

    /// Returns the transform from the layer's coordinates into document
    /// coordinates.
    #[must_use]
    pub fn absolute_transform(&self, id: LayerId) -> Transform3d {
        let parent = match self.parent(id) {
            Some(p) => self.absolute_transform(p),
            None => Transform3d::IDENTITY,
        };
        self.to_absolute(id, parent)
    }

    // -- Style --

    /// Returns the style snapshot of a layer.
    #[must_use]
    pub fn style(&self, id: LayerId) -> &LayerStyle {
        self.validate(id);
        &self.style[id.idx as usize]
    }

    /// Replaces the style snapshot of a layer.
    ///
    /// A transform or position-type change also marks geometry for the
    /// subtree.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, or if the layer stops being a stacking
    /// container while it still has negative or positive z-order children.
    pub fn set_style(&mut self, id: LayerId, style: LayerStyle) {
        self.validate(id);
        let i = id.idx as usize;
        if !style.stacking_container {
            let [neg, _, pos] = &self.z_lists[i];
            assert!(
                neg.is_empty() && pos.is_empty(),
                "layer with z-order children must stay a stacking container"
            );
        }
        let old = &self.style[i];
        let moved = old.transform != style.transform
            || old.position != style.position
            || old.fixed_container != style.fixed_container;
        self.style[i] = style;
        self.dirty.mark(id.idx, dirty::STYLE);
        if moved {
            self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
        }
    }

    /// Returns the properties currently running accelerated animations.
    #[must_use]
    pub fn animations(&self, id: LayerId) -> AnimatedProperties {
        self.validate(id);
        self.animations[id.idx as usize]
    }

    /// Sets the properties currently running accelerated animations.
    pub fn set_animations(&mut self, id: LayerId, props: AnimatedProperties) {
        self.validate(id);
        self.animations[id.idx as usize] = props;
        self.dirty.mark(id.idx, dirty::STYLE);
    }

    /// Returns the properties currently running transitions.
    #[must_use]
    pub fn transitions(&self, id: LayerId) -> AnimatedProperties {
        self.validate(id);
        self.transitions[id.idx as usize]
    }

    /// Sets the properties currently running transitions.
    pub fn set_transitions(&mut self, id: LayerId, props: AnimatedProperties) {
        self.validate(id);
        self.transitions[id.idx as usize] = props;
        self.dirty.mark(id.idx, dirty::STYLE);
    }

    // -- Frame --

    /// Returns the frame view.
    #[must_use]
    pub fn frame(&self) -> &FrameView {
        &self.frame
    }

    /// Scrolls the frame.
    pub fn set_scroll_offset(&mut self, offset: Vec2) {
        self.frame.scroll_offset = offset;
        self.dirty.mark(self.root, dirty::SCROLL);
    }

    /// Resizes the viewport. The root layer's bounds follow the viewport.
    pub fn set_viewport_size(&mut self, size: kurbo::Size) {
        self.frame.viewport_size = size;
        self.bounds[self.root as usize] = Rect::from_origin_size(kurbo::Point::ZERO, size);
        self.dirty.mark_with(self.root, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets whether the frame can scroll.
    pub fn set_frame_scrollable(&mut self, scrollable: bool) {
        self.frame.scrollable = scrollable;
        self.dirty.mark(self.root, dirty::STYLE);
    }

    /// Marks whether layout is pending for the whole frame.
    pub fn set_needs_layout(&mut self, needs_layout: bool) {
        self.frame.needs_layout = needs_layout;
    }

    // -- Change draining --

    /// Drains every dirty channel and the removal log.
    #[must_use]
    pub fn drain_changes(&mut self) -> TreeChanges {
        let mut changes = TreeChanges::default();
        self.drain_changes_into(&mut changes);
        changes
    }

    /// Like [`drain_changes`](Self::drain_changes), but reuses `out`.
    pub fn drain_changes_into(&mut self, out: &mut TreeChanges) {
        out.clear();
        out.style
            .extend(self.dirty.drain(dirty::STYLE).deterministic().run());
        out.geometry.extend(
            self.dirty
                .drain(dirty::GEOMETRY)
                .affected()
                .deterministic()
                .run(),
        );
        out.topology
            .extend(self.dirty.drain(dirty::TOPOLOGY).deterministic().run());
        out.scrolled = self.dirty.drain(dirty::SCROLL).deterministic().run().count() > 0;
        out.removed.append(&mut self.pending_removed);
    }

    // -- Internal helpers --

    /// Builds a handle for a live slot.
    pub(crate) fn id_at(&self, idx: u32) -> LayerId {
        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: LayerId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale LayerId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn check_attach(&self, parent: LayerId, child: LayerId, list: ZOrderList) {
        self.validate(parent);
        self.validate(child);
        assert!(child.idx != self.root, "the root layer cannot have a parent");
        assert!(
            self.parent[child.idx as usize] == INVALID,
            "child already has a parent"
        );
        assert!(
            self.reflection_source[child.idx as usize] == INVALID,
            "reflection layer must not be in a z-order list"
        );
        assert!(
            !self.is_ancestor_or_self(child, parent),
            "appending {child:?} under {parent:?} would create a cycle"
        );
        if list != ZOrderList::NormalFlow {
            assert!(
                self.style[parent.idx as usize].stacking_container,
                "z-order list on a non-stacking container"
            );
        }
    }

    fn link(&mut self, p: u32, c: u32, list: ZOrderList) {
        self.parent[c as usize] = p;
        self.in_list[c as usize] = Some(list);
        let _ = self.dirty.add_dependency(c, p, dirty::GEOMETRY);
        self.dirty.mark_with(c, dirty::GEOMETRY, &EagerPolicy);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Removes `idx` from its parent's list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        if let Some(list) = self.in_list[idx as usize] {
            self.z_lists[p as usize][list.slot()].retain(|&i| i != idx);
        }
        self.parent[idx as usize] = INVALID;
        self.in_list[idx as usize] = None;
    }
}
