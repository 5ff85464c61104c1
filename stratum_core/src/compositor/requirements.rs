// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Requirements traversal.
//!
//! Decides, for every visited layer, the final set of compositing reasons,
//! and brings its backing in line with that decision. Layers are visited in
//! paint order: negative z-order list, normal flow, positive z-order list.
//! Whether a layer overlaps composited content depends only on what painted
//! before it, so a layer never reads anything a later sibling computes.
//!
//! Each visit receives a [`CompositingState`] by value and returns a
//! [`Visit`] aggregate. The parent folds the aggregate into the state it
//! hands to later children; nothing else flows between siblings.

use crate::layer::{LayerId, LayerTree, ZOrderList};
use crate::overlap::OverlapMap;
use crate::reasons::{
    CompositingReasons, direct_reasons, is_running_accelerated_transform_animation,
    subtree_reasons,
};

use super::{Compositor, Pass};

/// Traversal state handed from a layer to its children.
#[derive(Clone, Copy, Debug)]
struct CompositingState {
    /// Nearest ancestor that will be composited.
    compositing_ancestor: Option<LayerId>,
    /// Something visited earlier in this scope is composited.
    subtree_is_compositing: bool,
    /// Overlap tests are meaningful in this scope.
    testing_overlap: bool,
}

/// What a visited subtree reports back to its parent.
#[derive(Clone, Copy, Debug)]
struct Visit {
    subtree_is_compositing: bool,
    /// `false` when later siblings must stop testing overlap.
    testing_overlap: bool,
    has_3d_transform: bool,
}

impl Compositor {
    /// Runs the requirements traversal from the root.
    pub(super) fn compute_requirements(&mut self, pass: &mut Pass<'_, '_>) {
        let tree = pass.tree;
        self.records.clear_allocation_failures();

        let was_compositing = self.compositing;
        self.traverse_from_root(pass, tree);
        // Layers visited before compositing mode was entered were judged
        // against the old mode (opacity animations, the root reason). One
        // more traversal settles them so the next update changes nothing.
        if !was_compositing && self.compositing {
            log::debug!("compositing mode entered mid-pass; recomputing requirements");
            self.traverse_from_root(pass, tree);
        }
    }

    fn traverse_from_root(&mut self, pass: &mut Pass<'_, '_>, tree: &LayerTree) {
        let root = tree.root();
        let mut overlap = OverlapMap::new();
        let state = CompositingState {
            compositing_ancestor: Some(root),
            subtree_is_compositing: false,
            testing_overlap: true,
        };
        _ = self.visit(pass, &mut overlap, root, state);

        // Late promotions happened after their descendants were visited, so
        // re-check that their backing matches the final decision.
        let late = core::mem::take(&mut pass.late_promoted);
        for layer in late {
            if self.update_backing(pass, layer) {
                pass.layers_changed = true;
            }
        }
    }

    fn visit(
        &mut self,
        pass: &mut Pass<'_, '_>,
        overlap: &mut OverlapMap,
        layer: LayerId,
        state: CompositingState,
    ) -> Visit {
        let tree = pass.tree;
        let is_root = tree.is_root(layer);
        overlap.geometry_map_mut().push(tree, layer);

        self.records.get_mut(layer).has_compositing_descendant = false;
        let was_composited = self.backings.contains(layer);
        let direct = direct_reasons(&self.reason_context(tree), layer, was_composited);
        if direct.reevaluate_after_layout {
            self.reevaluate_after_layout = true;
        }
        let can_be_composited = self.can_be_composited(tree, layer);

        let mut reasons = CompositingReasons::empty();
        if can_be_composited {
            reasons |= direct.reasons;
            if is_root && self.compositing {
                reasons |= CompositingReasons::ROOT;
            }
        }

        // Anything composited earlier in this scope may overlap us unless a
        // geometric test says otherwise.
        let mut overlap_reason = if state.subtree_is_compositing {
            CompositingReasons::ASSUMED_OVERLAP
        } else {
            CompositingReasons::empty()
        };
        let mut overlap_bounds = None;
        if !overlap.is_empty() && state.testing_overlap && direct.reasons.is_empty() {
            let bounds = overlap.geometry_map().overlap_rect(tree, layer);
            overlap_bounds = Some(bounds);
            overlap_reason = if overlap.overlaps_layers(bounds) {
                CompositingReasons::OVERLAP
            } else {
                CompositingReasons::empty()
            };
        }
        // Nothing may paint over a video surface in its own backing.
        if state
            .compositing_ancestor
            .is_some_and(|a| tree.style(a).element.is_video())
        {
            overlap_reason = CompositingReasons::OVERLAP;
        }
        reasons |= overlap_reason;

        let mut child_state = CompositingState {
            subtree_is_compositing: false,
            ..state
        };
        let mut will_be_composited = can_be_composited && !reasons.is_empty();
        let mut late_promotion = false;
        if will_be_composited {
            child_state.compositing_ancestor = Some(layer);
            child_state.testing_overlap = true;
            overlap.push_compositing_container();
        }

        let mut any_3d = false;
        for list in ZOrderList::PAINT_ORDER {
            for child in tree.z_order_list(layer, list) {
                if tree.style(child).hidden {
                    continue;
                }
                let visit = self.visit(pass, overlap, child, child_state);
                child_state.subtree_is_compositing |= visit.subtree_is_compositing;
                child_state.testing_overlap &= visit.testing_overlap;
                any_3d |= visit.has_3d_transform;
            }

            // A composited negative z-order child paints below this layer's
            // content, so the content needs a surface of its own.
            if list == ZOrderList::Negative && child_state.subtree_is_compositing {
                reasons |= CompositingReasons::NEGATIVE_Z_INDEX_CHILDREN;
                if !will_be_composited && can_be_composited {
                    child_state.compositing_ancestor = Some(layer);
                    child_state.testing_overlap = true;
                    overlap.push_compositing_container();
                    will_be_composited = true;
                    late_promotion = true;
                }
            }
        }

        if is_root && self.compositing && self.flags.accelerated {
            will_be_composited = true;
        }

        if child_state
            .compositing_ancestor
            .is_some_and(|a| !tree.is_root(a))
        {
            Self::add_to_overlap_map(tree, overlap, layer, &mut overlap_bounds);
        }

        let subtree = subtree_reasons(tree, layer, child_state.subtree_is_compositing, any_3d);
        reasons |= subtree;
        if !will_be_composited && can_be_composited && !subtree.is_empty() {
            child_state.compositing_ancestor = Some(layer);
            overlap.push_compositing_container();
            self.add_to_overlap_map_recursive(tree, overlap, layer, true);
            will_be_composited = true;
            late_promotion = true;
        }

        self.records.get_mut(layer).has_compositing_descendant = child_state.subtree_is_compositing;

        // Clipping contains whatever overlap the descendants produce, and a
        // transform animation makes future bounds unknowable.
        let clips_composited = can_be_composited
            && reasons.contains(CompositingReasons::CLIPS_COMPOSITING_DESCENDANTS);
        let mut testing_overlap = state.testing_overlap;
        if (!child_state.testing_overlap && !clips_composited)
            || is_running_accelerated_transform_animation(tree, &self.settings, layer)
        {
            testing_overlap = false;
        }

        if child_state.compositing_ancestor == Some(layer) && !is_root {
            overlap.pop_compositing_container();
        }

        if is_root
            && !child_state.subtree_is_compositing
            && direct.reasons.is_empty()
            && !self.flags.force_compositing_mode
            && !self.has_any_additional_composited_layers(tree)
        {
            self.enable_compositing_mode(pass, false);
            reasons = CompositingReasons::empty();
        }

        self.records.get_mut(layer).reasons = reasons;
        if self.update_backing(pass, layer) {
            pass.layers_changed = true;
        }
        // The source's backing, not the decision, decides: a failed
        // allocation leaves both flat.
        if let Some(reflection) = tree.reflection(layer) {
            self.records.get_mut(reflection).reasons = if self.backings.contains(layer) {
                CompositingReasons::REFLECTION_OF_COMPOSITED_PARENT
            } else {
                CompositingReasons::empty()
            };
            if self.update_backing(pass, reflection) {
                pass.layers_changed = true;
            }
        }
        if late_promotion {
            pass.late_promoted.push(layer);
        }

        let composited = self.backings.contains(layer);
        log::trace!("layer {layer}: composited={composited} reasons={reasons}");
        #[cfg(feature = "trace-rich")]
        pass.tracer.reasons(&crate::trace::ReasonsEvent {
            update_index: pass.update_index,
            layer,
            reasons,
            composited,
        });

        overlap.geometry_map_mut().pop(layer);

        Visit {
            subtree_is_compositing: composited || child_state.subtree_is_compositing,
            testing_overlap,
            has_3d_transform: any_3d || tree.style(layer).has_3d_transform(),
        }
    }

    /// Records the layer's clipped bounds into the enclosing overlap scope.
    fn add_to_overlap_map(
        tree: &LayerTree,
        overlap: &mut OverlapMap,
        layer: LayerId,
        bounds: &mut Option<kurbo::Rect>,
    ) {
        if tree.is_root(layer) {
            return;
        }
        let rect = *bounds.get_or_insert_with(|| overlap.geometry_map().overlap_rect(tree, layer));
        overlap.add(layer, rect);
    }

    /// Records the layer and every non-composited descendant that paints
    /// into it. Layers already recorded are skipped.
    ///
    /// `pushed` is `true` when the geometry map already holds `layer`.
    fn add_to_overlap_map_recursive(
        &self,
        tree: &LayerTree,
        overlap: &mut OverlapMap,
        layer: LayerId,
        pushed: bool,
    ) {
        if !self.can_be_composited(tree, layer) || overlap.contains(layer) {
            return;
        }
        if !pushed {
            overlap.geometry_map_mut().push(tree, layer);
        }
        let mut bounds = None;
        Self::add_to_overlap_map(tree, overlap, layer, &mut bounds);
        for child in tree.paint_order_children(layer) {
            if !tree.style(child).hidden {
                self.add_to_overlap_map_recursive(tree, overlap, child, false);
            }
        }
        if !pushed {
            overlap.geometry_map_mut().pop(layer);
        }
    }

    /// Whether the layer may be composited at all.
    pub(super) fn can_be_composited(&self, tree: &LayerTree, layer: LayerId) -> bool {
        self.flags.accelerated
            && tree.style(layer).self_painting
            && !self.records.get(layer).allocation_failed
    }

    /// Whether the layer must have a backing: fresh direct reasons, or
    /// indirect reasons recorded by the last requirements pass.
    ///
    /// Recorded direct reasons are ignored, as the style may have changed
    /// since they were computed.
    pub(super) fn needs_to_be_composited_in(&self, tree: &LayerTree, layer: LayerId) -> bool {
        if !self.can_be_composited(tree, layer) {
            return false;
        }
        let direct = direct_reasons(
            &self.reason_context(tree),
            layer,
            self.backings.contains(layer),
        );
        let indirect = self
            .records
            .get(layer)
            .reasons
            .difference(CompositingReasons::DIRECT);
        !direct.reasons.is_empty()
            || !indirect.is_empty()
            || (self.compositing && tree.is_root(layer))
    }

    /// Whether the subtree contains 3D content: a 3D transform,
    /// `preserve-3d` or a perspective.
    pub(super) fn layer_has_3d_content(&self, tree: &LayerTree, layer: LayerId) -> bool {
        if !self.can_be_composited(tree, layer) {
            return false;
        }
        let style = tree.style(layer);
        if style.preserve_3d || style.has_perspective || style.has_3d_transform() {
            return true;
        }
        tree.paint_order_children(layer)
            .any(|child| self.layer_has_3d_content(tree, child))
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::{Rect, Vec2};

    use super::*;
    use crate::compositor::tests::{child, three_d};
    use crate::compositor::{Compositor, UpdateType};
    use crate::layer::{AnimatedProperties, ElementKind, LayerStyle};
    use crate::settings::CompositorSettings;
    use crate::surface::testing::RecordingFactory;
    use crate::transform::Transform3d;

    fn run(tree: &LayerTree) -> (Compositor, RecordingFactory) {
        let mut compositor = Compositor::new(CompositorSettings::default());
        let mut factory = RecordingFactory::new();
        compositor
            .update(tree, UpdateType::AfterLayout, &mut factory)
            .unwrap();
        (compositor, factory)
    }

    fn at(tree: &mut LayerTree, id: LayerId, rect: Rect) {
        tree.set_position(id, rect.origin().to_vec2());
        tree.set_bounds(id, Rect::from_origin_size((0.0, 0.0), rect.size()));
    }

    #[test]
    fn overlap_only_affects_later_siblings() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let before = child(&mut tree, root, LayerStyle::default());
        let composited = child(&mut tree, root, three_d());
        let after = child(&mut tree, root, LayerStyle::default());
        for id in [before, composited, after] {
            at(&mut tree, id, Rect::new(0.0, 0.0, 40.0, 40.0));
        }

        let (compositor, _) = run(&tree);
        assert!(
            !compositor.has_backing(before),
            "earlier siblings never see later composited layers"
        );
        assert!(compositor.has_backing(composited));
        assert!(compositor.has_backing(after));
        assert_eq!(compositor.reasons(after), CompositingReasons::OVERLAP);
    }

    #[test]
    fn swapping_paint_order_swaps_the_outcome() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let plain = child(&mut tree, root, LayerStyle::default());
        let composited = child(&mut tree, root, three_d());
        at(&mut tree, plain, Rect::new(0.0, 0.0, 40.0, 40.0));
        at(&mut tree, composited, Rect::new(10.0, 10.0, 50.0, 50.0));
        let (compositor, _) = run(&tree);
        assert!(!compositor.has_backing(plain));

        tree.remove_from_parent(plain);
        tree.append_child(root, plain, ZOrderList::NormalFlow);
        let (compositor, _) = run(&tree);
        assert!(
            compositor.has_backing(plain),
            "painting after the composited layer forces overlap"
        );
    }

    /// Later siblings composited only because of what painted before them.
    fn composited_for_overlap(compositor: &Compositor, layers: &[LayerId]) -> Vec<LayerId> {
        layers
            .iter()
            .copied()
            .filter(|&l| {
                compositor.has_backing(l)
                    && compositor.reasons(l).intersects(
                        CompositingReasons::OVERLAP | CompositingReasons::ASSUMED_OVERLAP,
                    )
            })
            .collect()
    }

    #[test]
    fn flattening_an_upstream_layer_never_adds_overlap() {
        for animated in [false, true] {
            let mut tree = LayerTree::new();
            let root = tree.root();
            let upstream = child(&mut tree, root, LayerStyle::default());
            at(&mut tree, upstream, Rect::new(0.0, 0.0, 40.0, 40.0));
            let near = child(&mut tree, root, LayerStyle::default());
            at(&mut tree, near, Rect::new(20.0, 20.0, 60.0, 60.0));
            let far = child(&mut tree, root, LayerStyle::default());
            at(&mut tree, far, Rect::new(300.0, 300.0, 340.0, 340.0));
            let later = [near, far];

            if animated {
                tree.set_animations(upstream, AnimatedProperties::TRANSFORM);
            } else {
                tree.set_style(upstream, three_d());
            }
            let (compositor, _) = run(&tree);
            assert!(compositor.has_backing(upstream));
            let with = composited_for_overlap(&compositor, &later);
            assert!(with.contains(&near), "animated={animated}: got {with:?}");
            assert_eq!(
                with.contains(&far),
                animated,
                "only an animated transform makes distant layers assume overlap"
            );

            tree.set_animations(upstream, AnimatedProperties::empty());
            tree.set_style(upstream, LayerStyle::default());
            let (compositor, _) = run(&tree);
            let flattened = composited_for_overlap(&compositor, &later);
            assert!(
                flattened.iter().all(|l| with.contains(l)),
                "animated={animated}: {flattened:?} is not within {with:?}"
            );

            tree.remove_from_parent(upstream);
            let (compositor, _) = run(&tree);
            let removed = composited_for_overlap(&compositor, &later);
            assert!(
                removed.iter().all(|l| with.contains(l)),
                "animated={animated}: {removed:?} is not within {with:?}"
            );
            assert!(removed.is_empty(), "nothing upstream is composited");
        }
    }

    #[test]
    fn geometric_miss_clears_assumed_overlap() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let group = child(&mut tree, root, LayerStyle {
            stacking_container: true,
            transform: Some(Transform3d::from_translate_z(1.0)),
            ..LayerStyle::default()
        });
        at(&mut tree, group, Rect::new(0.0, 0.0, 10.0, 10.0));
        let inner = child(&mut tree, group, LayerStyle::default());
        at(&mut tree, inner, Rect::new(0.0, 0.0, 5.0, 5.0));
        let inner_after = child(&mut tree, group, three_d());
        at(&mut tree, inner_after, Rect::new(0.0, 0.0, 5.0, 5.0));
        let third = child(&mut tree, group, LayerStyle::default());
        at(&mut tree, third, Rect::new(200.0, 200.0, 210.0, 210.0));

        let (compositor, _) = run(&tree);
        assert!(compositor.has_backing(inner_after));
        assert!(
            !compositor.has_backing(third),
            "a geometric miss clears assumed overlap"
        );
    }

    #[test]
    fn transform_animation_stops_overlap_testing() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let animated = child(&mut tree, root, LayerStyle::default());
        tree.set_animations(animated, AnimatedProperties::TRANSFORM);
        at(&mut tree, animated, Rect::new(0.0, 0.0, 10.0, 10.0));
        let far = child(&mut tree, root, LayerStyle::default());
        at(&mut tree, far, Rect::new(500.0, 500.0, 510.0, 510.0));

        let (compositor, _) = run(&tree);
        assert!(compositor.has_backing(animated), "animation is a direct reason");
        assert_eq!(
            compositor.reasons(far),
            CompositingReasons::ASSUMED_OVERLAP,
            "future bounds are unknown, so overlap is assumed"
        );
    }

    #[test]
    fn negative_z_child_promotes_its_container_late() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let container = child(&mut tree, root, LayerStyle {
            stacking_container: true,
            ..LayerStyle::default()
        });
        let neg = tree.create_layer();
        tree.append_child(container, neg, ZOrderList::Negative);
        tree.set_style(neg, three_d());

        let (compositor, factory) = run(&tree);
        assert!(compositor.has_backing(neg));
        assert!(compositor.has_backing(container));
        assert!(
            compositor
                .reasons(container)
                .contains(CompositingReasons::NEGATIVE_Z_INDEX_CHILDREN)
        );
        assert_eq!(
            factory.layer_creates(),
            3,
            "root, container and child; the re-check creates nothing"
        );
    }

    #[test]
    fn subtree_reasons_need_composited_descendants() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let faded = child(&mut tree, root, LayerStyle {
            opacity: 0.5,
            has_filter: false,
            has_mask: true,
            clips_descendants: true,
            ..LayerStyle::default()
        });
        let _plain = child(&mut tree, faded, LayerStyle::default());
        let (compositor, factory) = run(&tree);
        assert_eq!(compositor.reasons(faded), CompositingReasons::empty());
        assert_eq!(factory.live(), 0, "nothing composited at all");

        let _three_d = child(&mut tree, faded, three_d());
        let (compositor, _) = run(&tree);
        assert_eq!(
            compositor.reasons(faded),
            CompositingReasons::OPACITY_WITH_COMPOSITED_DESCENDANTS
                | CompositingReasons::MASK_WITH_COMPOSITED_DESCENDANTS
                | CompositingReasons::CLIPS_COMPOSITING_DESCENDANTS
        );
        assert!(compositor.has_backing(faded));
    }

    #[test]
    fn preserve_3d_needs_3d_descendants_only() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let scene = child(&mut tree, root, LayerStyle {
            preserve_3d: true,
            has_perspective: true,
            ..LayerStyle::default()
        });
        let _flat = child(&mut tree, scene, LayerStyle::default());
        let (compositor, _) = run(&tree);
        assert!(!compositor.has_backing(scene));

        let _deep = child(&mut tree, scene, three_d());
        let (compositor, _) = run(&tree);
        assert!(
            compositor
                .reasons(scene)
                .contains(CompositingReasons::PRESERVE_3D | CompositingReasons::PERSPECTIVE)
        );
    }

    #[test]
    fn video_ancestor_forces_overlap() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let video = child(&mut tree, root, LayerStyle {
            element: ElementKind::Video { accelerated: true },
            ..LayerStyle::default()
        });
        let caption = child(&mut tree, video, LayerStyle::default());
        at(&mut tree, caption, Rect::new(500.0, 500.0, 510.0, 510.0));

        let (compositor, _) = run(&tree);
        assert!(compositor.has_backing(video));
        assert_eq!(compositor.reasons(caption), CompositingReasons::OVERLAP);
    }

    #[test]
    fn layers_that_cannot_composite_stay_flat() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let grouping = child(&mut tree, root, LayerStyle {
            self_painting: false,
            ..three_d()
        });
        let (compositor, factory) = run(&tree);
        assert!(!compositor.has_backing(grouping));
        assert!(!compositor.in_compositing_mode());
        assert_eq!(factory.live(), 0);
    }

    #[test]
    fn allocation_failure_is_retried_next_update() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let a = child(&mut tree, root, three_d());
        let mut compositor = Compositor::new(CompositorSettings::default());
        let mut factory = RecordingFactory::new();
        factory.fail.insert(a);

        let changes = compositor
            .update(&tree, UpdateType::AfterLayout, &mut factory)
            .unwrap();
        assert!(!compositor.has_backing(a));
        assert_eq!(changes.allocation_failures.len(), 1);
        assert!(
            !compositor.needs_to_be_composited(&tree, a),
            "treated as non-compositable until retried"
        );

        factory.fail.clear();
        let changes = compositor
            .update(&tree, UpdateType::AfterLayout, &mut factory)
            .unwrap();
        assert!(compositor.has_backing(a), "retried on the next full update");
        assert!(changes.promoted.contains(&a));
    }

    #[test]
    fn hidden_subtrees_keep_their_backings_and_compositing_mode() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let a = child(&mut tree, root, three_d());
        let mut compositor = Compositor::new(CompositorSettings::default());
        let mut factory = RecordingFactory::new();
        compositor
            .update(&tree, UpdateType::AfterLayout, &mut factory)
            .unwrap();
        assert!(compositor.has_backing(a));

        let mut style = tree.style(a).clone();
        style.hidden = true;
        tree.set_style(a, style);
        compositor
            .update(&tree, UpdateType::AfterStyleChange, &mut factory)
            .unwrap();
        assert!(compositor.has_backing(a), "unvisited layers keep their backing");
        assert!(
            compositor.in_compositing_mode(),
            "an additional composited layer keeps compositing mode on"
        );
    }

    #[test]
    fn has_3d_content_searches_the_tree() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let a = child(&mut tree, root, LayerStyle::default());
        let compositor = Compositor::new(CompositorSettings::default());
        assert!(!compositor.has_3d_content(&tree));

        let b = child(&mut tree, a, LayerStyle::default());
        tree.set_position(b, Vec2::new(1.0, 1.0));
        tree.set_style(b, LayerStyle {
            has_perspective: true,
            ..LayerStyle::default()
        });
        assert!(compositor.has_3d_content(&tree));
    }
}
