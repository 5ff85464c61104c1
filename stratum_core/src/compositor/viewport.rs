// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Viewport-constrained layers.
//!
//! A composited fixed or sticky layer moves relative to the document when
//! the frame scrolls. The scroll coordinator repositions such layers itself,
//! so it needs to know which ones are *root-most*: nested fixed layers move
//! together with their fixed ancestor and need no tracking of their own.

use alloc::collections::BTreeSet;

use kurbo::{Point, Rect, Vec2};

use crate::layer::{Edges, LayerId, LayerTree, Position};

use super::backing::BackingStore;

/// The set of composited layers whose position the scroll coordinator must
/// track.
#[derive(Clone, Debug, Default)]
pub struct ViewportConstrainedRegistry {
    layers: BTreeSet<LayerId>,
}

impl ViewportConstrainedRegistry {
    /// Adds or removes `layer` depending on whether it is the root-most
    /// fixed or sticky layer on its ancestor chain.
    pub(crate) fn update_status(
        &mut self,
        tree: &LayerTree,
        backings: &BackingStore,
        layer: LayerId,
    ) {
        if is_rootmost_fixed_or_sticky(tree, backings, layer) {
            self.layers.insert(layer);
        } else {
            self.layers.remove(&layer);
        }
    }

    pub(crate) fn remove(&mut self, layer: LayerId) {
        self.layers.remove(&layer);
    }

    pub(crate) fn clear(&mut self) {
        self.layers.clear();
    }

    /// Returns `true` if the layer is tracked.
    #[must_use]
    pub fn contains(&self, layer: LayerId) -> bool {
        self.layers.contains(&layer)
    }

    /// Number of tracked layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Tracked layers, in handle order.
    pub fn iter(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.layers.iter().copied()
    }
}

/// Sticky layers always qualify. A fixed layer qualifies unless some
/// stacking-container ancestor is itself a composited fixed layer.
fn is_rootmost_fixed_or_sticky(tree: &LayerTree, backings: &BackingStore, layer: LayerId) -> bool {
    match tree.style(layer).position {
        Position::Sticky => true,
        Position::Fixed => {
            let mut cur = tree.stacking_container_ancestor(layer);
            while let Some(sc) = cur {
                if backings.contains(sc) && tree.style(sc).position == Position::Fixed {
                    return false;
                }
                cur = tree.stacking_container_ancestor(sc);
            }
            true
        }
        _ => false,
    }
}

/// How a composited fixed-position layer is anchored to the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedPositionViewportConstraints {
    /// Edges the layer keeps its distance to.
    pub anchor_edges: Edges,
    /// Visible viewport rectangle when the constraints were computed.
    pub viewport_rect_at_last_layout: Rect,
    /// Layer position relative to its composited parent when the constraints
    /// were computed.
    pub layer_position_at_last_layout: Point,
}

impl FixedPositionViewportConstraints {
    pub(crate) fn compute(tree: &LayerTree, layer: LayerId) -> Self {
        let insets = tree.style(layer).specified_insets;
        let mut anchor_edges = insets;
        if !insets.intersects(Edges::LEFT | Edges::RIGHT) {
            anchor_edges |= Edges::LEFT;
        }
        if !insets.intersects(Edges::TOP | Edges::BOTTOM) {
            anchor_edges |= Edges::TOP;
        }
        Self {
            anchor_edges,
            viewport_rect_at_last_layout: tree.frame().visible_content_rect(),
            layer_position_at_last_layout: Point::ZERO + tree.position(layer),
        }
    }
}

/// How a composited sticky layer is anchored to the viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StickyPositionViewportConstraints {
    /// Edges the layer sticks to.
    pub anchor_edges: Edges,
    /// Visible viewport rectangle when the constraints were computed.
    pub viewport_rect_at_last_layout: Rect,
    /// Sticky offset applied by the last layout.
    pub sticky_offset_at_last_layout: Vec2,
    /// Layer position relative to its composited parent when the constraints
    /// were computed.
    pub layer_position_at_last_layout: Point,
}

impl StickyPositionViewportConstraints {
    pub(crate) fn compute(tree: &LayerTree, layer: LayerId) -> Self {
        let style = tree.style(layer);
        Self {
            anchor_edges: style.specified_insets,
            viewport_rect_at_last_layout: tree.frame().visible_content_rect(),
            sticky_offset_at_last_layout: style.sticky_offset,
            layer_position_at_last_layout: Point::ZERO + tree.position(layer),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::compositor::tests::{child, fixed};
    use crate::compositor::{Compositor, UpdateType};
    use crate::layer::LayerStyle;
    use crate::settings::CompositorSettings;
    use crate::surface::testing::RecordingFactory;

    fn scrollable_tree() -> LayerTree {
        let mut tree = LayerTree::new();
        tree.set_frame_scrollable(true);
        tree
    }

    #[test]
    fn anchors_default_to_left_and_top() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let f = child(&mut tree, root, fixed());
        tree.set_position(f, Vec2::new(4.0, 8.0));
        let c = FixedPositionViewportConstraints::compute(&tree, f);
        assert_eq!(c.anchor_edges, Edges::LEFT | Edges::TOP);
        assert_eq!(c.layer_position_at_last_layout, Point::new(4.0, 8.0));
        assert_eq!(
            c.viewport_rect_at_last_layout,
            tree.frame().visible_content_rect()
        );

        let mut style = tree.style(f).clone();
        style.specified_insets = Edges::RIGHT | Edges::BOTTOM;
        tree.set_style(f, style);
        let c = FixedPositionViewportConstraints::compute(&tree, f);
        assert_eq!(
            c.anchor_edges,
            Edges::RIGHT | Edges::BOTTOM,
            "specified insets replace the defaults"
        );
    }

    #[test]
    fn sticky_constraints_keep_offset() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let s = child(&mut tree, root, LayerStyle {
            position: Position::Sticky,
            specified_insets: Edges::TOP,
            sticky_offset: Vec2::new(0.0, 12.0),
            ..LayerStyle::default()
        });
        let c = StickyPositionViewportConstraints::compute(&tree, s);
        assert_eq!(c.anchor_edges, Edges::TOP, "no default edges for sticky");
        assert_eq!(c.sticky_offset_at_last_layout, Vec2::new(0.0, 12.0));
    }

    #[test]
    fn only_the_rootmost_fixed_layer_is_tracked() {
        let mut tree = scrollable_tree();
        let root = tree.root();
        let outer = child(&mut tree, root, fixed());
        let inner = child(&mut tree, outer, fixed());
        tree.set_bounds(inner, Rect::new(0.0, 0.0, 10.0, 10.0));

        let mut compositor = Compositor::new(CompositorSettings::default());
        let mut factory = RecordingFactory::new();
        compositor
            .update(&tree, UpdateType::AfterLayout, &mut factory)
            .unwrap();

        assert!(compositor.has_backing(outer));
        assert!(compositor.has_backing(inner));
        let tracked: Vec<_> = compositor.viewport_constrained_layers().iter().collect();
        assert_eq!(tracked, [outer], "nested fixed layers move with their ancestor");
        assert!(compositor.fixed_viewport_constraints(&tree, outer).is_some());
        assert!(
            compositor.sticky_viewport_constraints(&tree, outer).is_none(),
            "wrong position type"
        );
    }

    #[test]
    fn demotion_unregisters() {
        let mut tree = scrollable_tree();
        let root = tree.root();
        let f = child(&mut tree, root, fixed());

        let mut compositor = Compositor::new(CompositorSettings::default());
        let mut factory = RecordingFactory::new();
        compositor
            .update(&tree, UpdateType::AfterLayout, &mut factory)
            .unwrap();
        assert!(compositor.viewport_constrained_layers().contains(f));

        tree.set_position(f, Vec2::new(5000.0, 5000.0));
        let changes = compositor
            .update(&tree, UpdateType::AfterLayout, &mut factory)
            .unwrap();
        assert!(!compositor.has_backing(f), "scrolled out of view");
        assert!(changes.fixed_objects_changed);
        assert!(compositor.viewport_constrained_layers().is_empty());
    }
}
