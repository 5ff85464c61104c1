// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Overlap bookkeeping for the requirements pass.
//!
//! [`OverlapMap`] keeps a stack of [`OverlapMapContainer`]s, one per
//! compositing container on the current traversal path. A layer that ends up
//! composited records its absolute bounds into the container of its
//! *parent* scope, so only content painted after it sees the contribution.
//! Popping a container folds its rectangles into the new top.
//!
//! [`GeometryMap`] maps layer-local rectangles into absolute coordinates. It
//! is pushed and popped in lock-step with the traversal so that each layer
//! costs a single matrix product.

use alloc::collections::BTreeSet;
use alloc::vec::Vec;

use kurbo::{Rect, Size};

use crate::layer::{LayerId, LayerTree};
use crate::transform::Transform3d;

/// Returns `true` if the two rectangles share interior area.
///
/// Rectangles with no area never intersect anything, and touching edges do
/// not count.
#[must_use]
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    let a = a.abs();
    let b = b.abs();
    a.x0 < a.x1
        && a.y0 < a.y1
        && b.x0 < b.x1
        && b.y0 < b.y1
        && a.x0 < b.x1
        && b.x0 < a.x1
        && a.y0 < b.y1
        && b.y0 < a.y1
}

/// Occupied rectangles of one compositing scope.
#[derive(Clone, Debug, Default)]
pub struct OverlapMapContainer {
    rects: Vec<Rect>,
    bounding_box: Option<Rect>,
}

impl OverlapMapContainer {
    /// Records an occupied rectangle.
    pub fn add(&mut self, bounds: Rect) {
        self.rects.push(bounds);
        self.bounding_box = Some(match self.bounding_box {
            Some(bb) => bb.union(bounds),
            None => bounds,
        });
    }

    /// Returns `true` if `bounds` intersects any recorded rectangle.
    #[must_use]
    pub fn overlaps(&self, bounds: Rect) -> bool {
        let Some(bb) = self.bounding_box else {
            return false;
        };
        if !rects_intersect(bb, bounds) {
            return false;
        }
        self.rects.iter().any(|r| rects_intersect(*r, bounds))
    }

    /// Folds every rectangle of `other` into `self`.
    pub fn unite(&mut self, other: &Self) {
        self.rects.extend_from_slice(&other.rects);
        if let Some(obb) = other.bounding_box {
            self.bounding_box = Some(match self.bounding_box {
                Some(bb) => bb.union(obb),
                None => obb,
            });
        }
    }

    /// Returns the recorded rectangles.
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }
}

/// Stack of overlap scopes plus the set of layers already recorded.
///
/// The bottom container always exists and can never be popped.
#[derive(Clone, Debug)]
pub struct OverlapMap {
    stack: Vec<OverlapMapContainer>,
    layers: BTreeSet<LayerId>,
    geometry: GeometryMap,
}

impl Default for OverlapMap {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlapMap {
    /// Creates a map holding only the bottom container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: alloc::vec![OverlapMapContainer::default()],
            layers: BTreeSet::new(),
            geometry: GeometryMap::default(),
        }
    }

    /// Opens a new scope for the descendants of a compositing container.
    pub fn push_compositing_container(&mut self) {
        self.stack.push(OverlapMapContainer::default());
    }

    /// Closes the current scope, folding its rectangles into the parent
    /// scope.
    ///
    /// # Panics
    ///
    /// Panics if only the bottom container is left.
    pub fn pop_compositing_container(&mut self) {
        assert!(
            self.stack.len() > 1,
            "cannot pop the root overlap container"
        );
        if let Some(top) = self.stack.pop() {
            let last = self.stack.len() - 1;
            self.stack[last].unite(&top);
        }
    }

    /// Records `bounds` for `layer` into the scope below the current top.
    ///
    /// # Panics
    ///
    /// Panics if no container has been pushed above the bottom one.
    pub fn add(&mut self, layer: LayerId, bounds: Rect) {
        assert!(
            self.stack.len() > 1,
            "overlap add needs a pushed compositing container"
        );
        let at = self.stack.len() - 2;
        self.stack[at].add(bounds);
        self.layers.insert(layer);
    }

    /// Returns `true` if `bounds` intersects anything recorded in the current
    /// scope.
    #[must_use]
    pub fn overlaps_layers(&self, bounds: Rect) -> bool {
        self.stack.last().is_some_and(|top| top.overlaps(bounds))
    }

    /// Returns `true` if `layer` was already recorded.
    #[must_use]
    pub fn contains(&self, layer: LayerId) -> bool {
        self.layers.contains(&layer)
    }

    /// Returns `true` if no layer has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the number of open scopes, including the bottom one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Returns the geometry map that travels with this overlap map.
    #[must_use]
    pub fn geometry_map(&self) -> &GeometryMap {
        &self.geometry
    }

    /// Mutable access to the geometry map.
    pub fn geometry_map_mut(&mut self) -> &mut GeometryMap {
        &mut self.geometry
    }
}

#[derive(Clone, Copy, Debug)]
struct GeometryEntry {
    layer: LayerId,
    to_absolute: Transform3d,
    /// Clip applying to this layer, from its ancestors.
    clip: Option<Rect>,
    /// Clip applying to this layer's descendants.
    child_clip: Option<Rect>,
}

/// Maps layer-local geometry into absolute coordinates along the current
/// traversal path.
#[derive(Clone, Debug, Default)]
pub struct GeometryMap {
    stack: Vec<GeometryEntry>,
}

impl GeometryMap {
    /// Pushes the mapping for `layer`, whose parent must be the current top
    /// (or nothing, for a root).
    pub fn push(&mut self, tree: &LayerTree, layer: LayerId) {
        let (parent_abs, clip) = match self.stack.last() {
            Some(top) => (top.to_absolute, top.child_clip),
            None => (Transform3d::IDENTITY, None),
        };
        let to_absolute = tree.to_absolute(layer, parent_abs);
        let child_clip = if tree.style(layer).clips_descendants {
            let own = to_absolute.map_rect(tree.bounds(layer));
            Some(match clip {
                Some(c) => c.intersect(own),
                None => own,
            })
        } else {
            clip
        };
        self.stack.push(GeometryEntry {
            layer,
            to_absolute,
            clip,
            child_clip,
        });
    }

    /// Pops the mapping pushed for `layer`.
    ///
    /// # Panics
    ///
    /// Panics if `layer` is not the current top.
    pub fn pop(&mut self, layer: LayerId) {
        let top = self.stack.pop().map(|e| e.layer);
        assert_eq!(top, Some(layer), "geometry map popped out of order");
    }

    /// Returns the number of pushed layers.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Maps a rectangle in the current layer's coordinates into absolute
    /// coordinates.
    #[must_use]
    pub fn absolute_rect(&self, rect: Rect) -> Rect {
        match self.stack.last() {
            Some(top) => top.to_absolute.map_rect(rect),
            None => rect,
        }
    }

    /// Returns the ancestor clip of the current layer, in absolute
    /// coordinates.
    #[must_use]
    pub fn clip(&self) -> Option<Rect> {
        self.stack.last().and_then(|top| top.clip)
    }

    /// Returns the absolute overlap bounds of the current layer, clipped by
    /// its ancestors.
    ///
    /// Empty results are widened to 1×1 so the layer still registers.
    #[must_use]
    pub fn overlap_rect(&self, tree: &LayerTree, layer: LayerId) -> Rect {
        let mut abs = self.absolute_rect(tree.overlap_bounds(layer));
        if let Some(clip) = self.clip() {
            abs = abs.intersect(clip);
        }
        if abs.width() <= 0.0 || abs.height() <= 0.0 {
            abs = Rect::from_origin_size(abs.origin(), Size::new(1.0, 1.0));
        }
        abs
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Vec2;

    use super::*;
    use crate::layer::{LayerStyle, ZOrderList};

    fn id(tree: &mut LayerTree) -> LayerId {
        tree.create_layer()
    }

    #[test]
    fn intersection_is_strict() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rects_intersect(a, Rect::new(5.0, 5.0, 15.0, 15.0)));
        assert!(
            !rects_intersect(a, Rect::new(10.0, 0.0, 20.0, 10.0)),
            "touching edges do not overlap"
        );
        assert!(
            !rects_intersect(a, Rect::new(5.0, 5.0, 5.0, 5.0)),
            "empty rects never overlap"
        );
    }

    #[test]
    fn add_targets_parent_scope() {
        let mut tree = LayerTree::new();
        let l = id(&mut tree);
        let mut map = OverlapMap::new();
        map.push_compositing_container();
        map.add(l, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(
            !map.overlaps_layers(Rect::new(0.0, 0.0, 5.0, 5.0)),
            "the layer's own scope does not see it"
        );
        assert!(map.contains(l));
        map.pop_compositing_container();
        assert!(map.overlaps_layers(Rect::new(0.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn pop_merges_into_new_top() {
        let mut tree = LayerTree::new();
        let a = id(&mut tree);
        let b = id(&mut tree);
        let mut map = OverlapMap::new();
        map.push_compositing_container();
        map.push_compositing_container();
        map.add(a, Rect::new(0.0, 0.0, 10.0, 10.0));
        map.pop_compositing_container();
        map.add(b, Rect::new(100.0, 100.0, 110.0, 110.0));
        assert!(map.overlaps_layers(Rect::new(1.0, 1.0, 2.0, 2.0)));
        map.pop_compositing_container();
        assert!(map.overlaps_layers(Rect::new(1.0, 1.0, 2.0, 2.0)));
        assert!(map.overlaps_layers(Rect::new(105.0, 105.0, 106.0, 106.0)));
        assert!(!map.overlaps_layers(Rect::new(50.0, 50.0, 60.0, 60.0)));
        assert_eq!(map.depth(), 1);
    }

    #[test]
    fn bounding_box_rejects_early() {
        let mut c = OverlapMapContainer::default();
        assert!(!c.overlaps(Rect::new(0.0, 0.0, 1.0, 1.0)));
        c.add(Rect::new(0.0, 0.0, 10.0, 10.0));
        c.add(Rect::new(20.0, 20.0, 30.0, 30.0));
        assert!(
            !c.overlaps(Rect::new(12.0, 12.0, 18.0, 18.0)),
            "inside the bounding box but between rects"
        );
        assert_eq!(c.rects().len(), 2);
    }

    #[test]
    #[should_panic(expected = "cannot pop the root overlap container")]
    fn popping_root_container_panics() {
        let mut map = OverlapMap::new();
        map.pop_compositing_container();
    }

    #[test]
    fn geometry_map_accumulates_offsets_and_clips() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let clip = tree.create_layer();
        let leaf = tree.create_layer();
        tree.append_child(root, clip, ZOrderList::NormalFlow);
        tree.append_child(clip, leaf, ZOrderList::NormalFlow);
        tree.set_position(clip, Vec2::new(10.0, 10.0));
        tree.set_bounds(clip, Rect::new(0.0, 0.0, 20.0, 20.0));
        tree.set_style(
            clip,
            LayerStyle {
                clips_descendants: true,
                ..LayerStyle::default()
            },
        );
        tree.set_position(leaf, Vec2::new(15.0, 15.0));
        tree.set_bounds(leaf, Rect::new(0.0, 0.0, 50.0, 50.0));

        let mut map = GeometryMap::default();
        map.push(&tree, root);
        map.push(&tree, clip);
        assert_eq!(map.clip(), None, "a layer's own clip does not apply to it");
        map.push(&tree, leaf);
        assert_eq!(map.clip(), Some(Rect::new(10.0, 10.0, 30.0, 30.0)));
        assert_eq!(
            map.overlap_rect(&tree, leaf),
            Rect::new(25.0, 25.0, 30.0, 30.0)
        );
        map.pop(leaf);
        map.pop(clip);
        map.pop(root);
        assert_eq!(map.depth(), 0);
    }

    #[test]
    fn empty_overlap_rect_becomes_one_pixel() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let l = tree.create_layer();
        tree.append_child(root, l, ZOrderList::NormalFlow);
        tree.set_position(l, Vec2::new(5.0, 6.0));
        let mut map = GeometryMap::default();
        map.push(&tree, root);
        map.push(&tree, l);
        assert_eq!(map.overlap_rect(&tree, l), Rect::new(5.0, 6.0, 6.0, 7.0));
    }
}
