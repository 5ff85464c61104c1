// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Why a layer needs its own composited surface.
//!
//! Reasons come in two families:
//!
//! - **Direct** reasons depend only on the layer's own style and content
//!   ([`direct_reasons`]).
//! - **Subtree** reasons only apply once the layer is known to have composited
//!   or 3D-transformed descendants ([`subtree_reasons`]). An effect such as
//!   opacity or a clip must then be applied by a surface so that it also
//!   covers the composited descendants.
//!
//! Overlap reasons ([`CompositingReasons::OVERLAP`] and
//! [`CompositingReasons::ASSUMED_OVERLAP`]) and the root reason are added by
//! the requirements pass itself.

use core::fmt;

use bitflags::bitflags;
use kurbo::Rect;

use crate::layer::{
    AnimatedProperties, ElementKind, FixedContainer, LayerId, LayerTree, Position,
};
use crate::overlap::rects_intersect;
use crate::settings::{CompositingTriggers, CompositorSettings};
use crate::transform::Transform3d;

bitflags! {
    /// The set of reasons a layer is (or would be) composited.
    #[derive(Clone, Copy, Default, Debug, Eq, PartialEq, Hash)]
    pub struct CompositingReasons: u32 {
        /// The layer has a 3D transform.
        const THREE_D_TRANSFORM = 1 << 0;
        /// The layer hosts accelerated video.
        const VIDEO = 1 << 1;
        /// The layer hosts an accelerated canvas.
        const CANVAS = 1 << 2;
        /// The layer hosts an accelerated plugin.
        const PLUGIN = 1 << 3;
        /// The layer hosts a composited inner frame.
        const IFRAME = 1 << 4;
        /// `backface-visibility: hidden`.
        const BACKFACE_VISIBILITY_HIDDEN = 1 << 5;
        /// The layer clips composited descendants.
        const CLIPS_COMPOSITING_DESCENDANTS = 1 << 6;
        /// A running accelerated animation or transition.
        const ANIMATION = 1 << 7;
        /// A CSS filter.
        const FILTERS = 1 << 8;
        /// `position: fixed`, anchored to the viewport.
        const POSITION_FIXED = 1 << 9;
        /// `position: sticky`.
        const POSITION_STICKY = 1 << 10;
        /// Touch-driven overflow scrolling.
        const OVERFLOW_SCROLLING_TOUCH = 1 << 11;
        /// Something composited precedes the layer in paint order and overlap
        /// could not be tested.
        const ASSUMED_OVERLAP = 1 << 12;
        /// The layer overlaps composited content that paints before it.
        const OVERLAP = 1 << 13;
        /// A negative z-order child is composited.
        const NEGATIVE_Z_INDEX_CHILDREN = 1 << 14;
        /// A transform that must also apply to composited descendants.
        const TRANSFORM_WITH_COMPOSITED_DESCENDANTS = 1 << 15;
        /// Opacity that must also apply to composited descendants.
        const OPACITY_WITH_COMPOSITED_DESCENDANTS = 1 << 16;
        /// A mask that must also apply to composited descendants.
        const MASK_WITH_COMPOSITED_DESCENDANTS = 1 << 17;
        /// A reflection that must also show composited descendants.
        const REFLECTION_WITH_COMPOSITED_DESCENDANTS = 1 << 18;
        /// A filter that must also apply to composited descendants.
        const FILTER_WITH_COMPOSITED_DESCENDANTS = 1 << 19;
        /// A blend mode that must also apply to composited descendants.
        const BLENDING_WITH_COMPOSITED_DESCENDANTS = 1 << 20;
        /// A perspective affecting 3D-transformed descendants.
        const PERSPECTIVE = 1 << 21;
        /// `preserve-3d` with 3D-transformed descendants.
        const PRESERVE_3D = 1 << 22;
        /// The reflection of a composited layer.
        const REFLECTION_OF_COMPOSITED_PARENT = 1 << 23;
        /// The root layer of a document in compositing mode.
        const ROOT = 1 << 24;
        /// A non-normal `mix-blend-mode`.
        const BLENDING = 1 << 25;
    }
}

impl CompositingReasons {
    /// Reasons computed by [`direct_reasons`].
    pub const DIRECT: Self = Self::THREE_D_TRANSFORM
        .union(Self::VIDEO)
        .union(Self::CANVAS)
        .union(Self::PLUGIN)
        .union(Self::IFRAME)
        .union(Self::BACKFACE_VISIBILITY_HIDDEN)
        .union(Self::ANIMATION)
        .union(Self::FILTERS)
        .union(Self::POSITION_FIXED)
        .union(Self::POSITION_STICKY)
        .union(Self::OVERFLOW_SCROLLING_TOUCH)
        .union(Self::BLENDING);

    /// Reasons computed by [`subtree_reasons`].
    pub const SUBTREE: Self = Self::TRANSFORM_WITH_COMPOSITED_DESCENDANTS
        .union(Self::OPACITY_WITH_COMPOSITED_DESCENDANTS)
        .union(Self::MASK_WITH_COMPOSITED_DESCENDANTS)
        .union(Self::REFLECTION_WITH_COMPOSITED_DESCENDANTS)
        .union(Self::FILTER_WITH_COMPOSITED_DESCENDANTS)
        .union(Self::BLENDING_WITH_COMPOSITED_DESCENDANTS)
        .union(Self::CLIPS_COMPOSITING_DESCENDANTS)
        .union(Self::PERSPECTIVE)
        .union(Self::PRESERVE_3D);

    /// Indirect reasons under which the layer still paints into its own
    /// backing store rather than into its composited ancestor.
    pub const INDIRECT_NEEDING_BACKING: Self = Self::OVERLAP
        .union(Self::ASSUMED_OVERLAP)
        .union(Self::NEGATIVE_Z_INDEX_CHILDREN)
        .union(Self::TRANSFORM_WITH_COMPOSITED_DESCENDANTS)
        .union(Self::OPACITY_WITH_COMPOSITED_DESCENDANTS)
        .union(Self::MASK_WITH_COMPOSITED_DESCENDANTS)
        .union(Self::FILTER_WITH_COMPOSITED_DESCENDANTS)
        .union(Self::BLENDING_WITH_COMPOSITED_DESCENDANTS)
        .union(Self::PRESERVE_3D);

    const NAMES: [(Self, &'static str); 26] = [
        (Self::THREE_D_TRANSFORM, "3D transform"),
        (Self::VIDEO, "video"),
        (Self::CANVAS, "canvas"),
        (Self::PLUGIN, "plugin"),
        (Self::IFRAME, "iframe"),
        (Self::BACKFACE_VISIBILITY_HIDDEN, "backface-visibility: hidden"),
        (
            Self::CLIPS_COMPOSITING_DESCENDANTS,
            "clips compositing descendants",
        ),
        (Self::ANIMATION, "animation"),
        (Self::FILTERS, "filters"),
        (Self::POSITION_FIXED, "position: fixed"),
        (Self::POSITION_STICKY, "position: sticky"),
        (
            Self::OVERFLOW_SCROLLING_TOUCH,
            "-webkit-overflow-scrolling: touch",
        ),
        (Self::ASSUMED_OVERLAP, "stacking"),
        (Self::OVERLAP, "overlap"),
        (Self::NEGATIVE_Z_INDEX_CHILDREN, "negative z-index children"),
        (
            Self::TRANSFORM_WITH_COMPOSITED_DESCENDANTS,
            "transform with composited descendants",
        ),
        (
            Self::OPACITY_WITH_COMPOSITED_DESCENDANTS,
            "opacity with composited descendants",
        ),
        (
            Self::MASK_WITH_COMPOSITED_DESCENDANTS,
            "mask with composited descendants",
        ),
        (
            Self::REFLECTION_WITH_COMPOSITED_DESCENDANTS,
            "reflection with composited descendants",
        ),
        (
            Self::FILTER_WITH_COMPOSITED_DESCENDANTS,
            "filter with composited descendants",
        ),
        (
            Self::BLENDING_WITH_COMPOSITED_DESCENDANTS,
            "blending with composited descendants",
        ),
        (Self::PERSPECTIVE, "perspective"),
        (Self::PRESERVE_3D, "preserve-3d"),
        (
            Self::REFLECTION_OF_COMPOSITED_PARENT,
            "reflection of composited parent",
        ),
        (Self::ROOT, "root"),
        (Self::BLENDING, "blending"),
    ];

    /// Returns human-readable names of the contained reasons, in a fixed
    /// order.
    pub fn describe(self) -> impl Iterator<Item = &'static str> {
        Self::NAMES
            .into_iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| name)
    }
}

impl fmt::Display for CompositingReasons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for name in self.describe() {
            if !first {
                f.write_str(" | ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        if first {
            f.write_str("none")?;
        }
        Ok(())
    }
}

/// Why a viewport-constrained layer was *not* composited.
///
/// Diagnostic only; a change is reported to the scroll coordinator because
/// it affects fast-path scrolling eligibility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ViewportConstrainedNotCompositedReason {
    /// Composited, or not a fixed-position layer.
    #[default]
    None,
    /// The containing block is not the viewport.
    NonViewContainer,
    /// Nothing between the layer and the viewport can scroll.
    UnscrollableAncestors,
    /// The layer paints nothing visible.
    NoVisibleContent,
    /// The layer lies entirely outside the visible viewport.
    BoundsOutOfView,
}

/// Inputs shared by the reason computations of one evaluation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ReasonContext<'a> {
    pub(crate) tree: &'a LayerTree,
    pub(crate) settings: &'a CompositorSettings,
    pub(crate) compositing_mode: bool,
    pub(crate) in_post_layout_update: bool,
}

/// Result of [`direct_reasons`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct DirectReasons {
    pub(crate) reasons: CompositingReasons,
    /// Some decision depends on layout that has not run yet.
    pub(crate) reevaluate_after_layout: bool,
    pub(crate) not_composited: ViewportConstrainedNotCompositedReason,
}

/// Result of [`requires_compositing_for_position`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct PositionDecision {
    pub(crate) composite: bool,
    pub(crate) reevaluate_after_layout: bool,
    pub(crate) not_composited: ViewportConstrainedNotCompositedReason,
}

/// Computes the reasons that follow from the layer's own properties.
///
/// `was_composited` is the layer's current status. Decisions that depend on
/// pending layout keep it and request re-evaluation instead of guessing.
pub(crate) fn direct_reasons(
    cx: &ReasonContext<'_>,
    id: LayerId,
    was_composited: bool,
) -> DirectReasons {
    let tree = cx.tree;
    let style = tree.style(id);
    let triggers = cx.settings.triggers;
    let mut out = DirectReasons::default();

    if triggers.contains(CompositingTriggers::THREE_D_TRANSFORM) && style.has_3d_transform() {
        out.reasons |= CompositingReasons::THREE_D_TRANSFORM;
    }

    // At most one element-kind reason applies.
    let area = tree.bounds(id).area();
    match style.element {
        ElementKind::Video { accelerated } => {
            if accelerated && triggers.contains(CompositingTriggers::VIDEO) {
                out.reasons |= CompositingReasons::VIDEO;
            }
        }
        ElementKind::Canvas { accelerated } => {
            if accelerated && triggers.contains(CompositingTriggers::CANVAS) {
                out.reasons |= CompositingReasons::CANVAS;
            }
        }
        ElementKind::Plugin { accelerated } => {
            if accelerated && triggers.contains(CompositingTriggers::PLUGIN) {
                out.reevaluate_after_layout = true;
                let composite = if style.needs_layout {
                    was_composited
                } else {
                    area > 1.0
                };
                if composite {
                    out.reasons |= CompositingReasons::PLUGIN;
                }
            }
        }
        ElementKind::Frame { accelerated } => {
            if accelerated {
                out.reevaluate_after_layout = true;
                let composite = if style.needs_layout {
                    was_composited
                } else {
                    area > 0.0
                };
                if composite {
                    out.reasons |= CompositingReasons::IFRAME;
                }
            }
        }
        ElementKind::Generic => {}
    }

    if cx.settings.render_3d && style.backface_hidden {
        out.reasons |= CompositingReasons::BACKFACE_VISIBILITY_HIDDEN;
    }

    if triggers.contains(CompositingTriggers::ANIMATION) {
        let running = tree.animations(id);
        if (running.contains(AnimatedProperties::OPACITY) && cx.compositing_mode)
            || running.intersects(AnimatedProperties::FILTER | AnimatedProperties::TRANSFORM)
        {
            out.reasons |= CompositingReasons::ANIMATION;
        }
        if cx.settings.transition_compositing && !tree.transitions(id).is_empty() {
            out.reasons |= CompositingReasons::ANIMATION;
        }
    }

    if triggers.contains(CompositingTriggers::FILTER) && style.has_filter {
        out.reasons |= CompositingReasons::FILTERS;
    }

    let position = requires_compositing_for_position(cx, id, was_composited);
    out.reevaluate_after_layout |= position.reevaluate_after_layout;
    out.not_composited = position.not_composited;
    if position.composite {
        out.reasons |= if style.position == Position::Fixed {
            CompositingReasons::POSITION_FIXED
        } else {
            CompositingReasons::POSITION_STICKY
        };
    }

    if style.touch_scrolling {
        out.reasons |= CompositingReasons::OVERFLOW_SCROLLING_TOUCH;
    }

    if style.has_blend_mode {
        out.reasons |= CompositingReasons::BLENDING;
    }

    out
}

/// Decides whether a fixed or sticky layer composites for its position.
///
/// A fixed layer must be a stacking container contained by the viewport, have
/// something scrollable between it and the viewport, paint visible content,
/// and intersect the visible viewport. Sticky layers only need the setting.
pub(crate) fn requires_compositing_for_position(
    cx: &ReasonContext<'_>,
    id: LayerId,
    was_composited: bool,
) -> PositionDecision {
    use ViewportConstrainedNotCompositedReason as NotComposited;

    let tree = cx.tree;
    let style = tree.style(id);
    let mut out = PositionDecision::default();

    let is_fixed = style.position == Position::Fixed && style.stacking_container;
    let is_sticky = style.position == Position::Sticky;
    if !is_fixed && !is_sticky {
        return out;
    }
    if !cx.settings.fixed_position_compositing {
        return out;
    }
    if is_sticky {
        out.composite = true;
        return out;
    }

    match style.fixed_container {
        FixedContainer::Viewport => {}
        FixedContainer::Pending => {
            out.reevaluate_after_layout = true;
            out.composite = was_composited;
            return out;
        }
        FixedContainer::Other => {
            out.not_composited = NotComposited::NonViewContainer;
            return out;
        }
    }

    let mut has_scrollable_ancestor = tree.frame().scrollable;
    let mut cur = tree.parent(id);
    while let Some(p) = cur {
        if has_scrollable_ancestor {
            break;
        }
        has_scrollable_ancestor = tree.style(p).scrollable;
        cur = tree.parent(p);
    }
    if !has_scrollable_ancestor {
        out.not_composited = NotComposited::UnscrollableAncestors;
        return out;
    }

    // Geometry is only trustworthy once layout has run.
    if !cx.in_post_layout_update {
        out.reevaluate_after_layout = true;
        out.composite = was_composited;
        return out;
    }

    if !style.has_visible_content {
        out.not_composited = NotComposited::NoVisibleContent;
        return out;
    }

    if !rects_intersect(
        bounds_with_descendants(tree, id),
        tree.frame().visible_content_rect(),
    ) {
        out.not_composited = NotComposited::BoundsOutOfView;
        return out;
    }

    out.composite = true;
    out
}

/// Absolute bounds of the layer united with its visible descendants,
/// composited or not. Clipping layers contain their descendants.
fn bounds_with_descendants(tree: &LayerTree, id: LayerId) -> Rect {
    fn unite(tree: &LayerTree, layer: LayerId, to_absolute: Transform3d, acc: &mut Rect) {
        for child in tree.paint_order_children(layer) {
            let style = tree.style(child);
            if style.hidden {
                continue;
            }
            let child_to_absolute = tree.to_absolute(child, to_absolute);
            *acc = acc.union(child_to_absolute.map_rect(tree.bounds(child)));
            if !style.clips_descendants {
                unite(tree, child, child_to_absolute, acc);
            }
        }
    }

    let to_absolute = tree.absolute_transform(id);
    let mut bounds = to_absolute.map_rect(tree.bounds(id));
    if !tree.style(id).clips_descendants {
        unite(tree, id, to_absolute, &mut bounds);
    }
    bounds
}

/// Computes the reasons that only apply because of what the descendants
/// turned out to need.
///
/// Returns nothing when there are neither composited nor 3D-transformed
/// descendants.
pub(crate) fn subtree_reasons(
    tree: &LayerTree,
    id: LayerId,
    has_composited_descendants: bool,
    has_3d_transformed_descendants: bool,
) -> CompositingReasons {
    let style = tree.style(id);
    let mut reasons = CompositingReasons::empty();

    if has_composited_descendants {
        if style.transform.is_some() {
            reasons |= CompositingReasons::TRANSFORM_WITH_COMPOSITED_DESCENDANTS;
        }
        if style.is_transparent() {
            reasons |= CompositingReasons::OPACITY_WITH_COMPOSITED_DESCENDANTS;
        }
        if style.has_mask {
            reasons |= CompositingReasons::MASK_WITH_COMPOSITED_DESCENDANTS;
        }
        if style.has_filter {
            reasons |= CompositingReasons::FILTER_WITH_COMPOSITED_DESCENDANTS;
        }
        if style.has_blend_mode {
            reasons |= CompositingReasons::BLENDING_WITH_COMPOSITED_DESCENDANTS;
        }
        if tree.reflection(id).is_some() {
            reasons |= CompositingReasons::REFLECTION_WITH_COMPOSITED_DESCENDANTS;
        }
        if style.clips_descendants {
            reasons |= CompositingReasons::CLIPS_COMPOSITING_DESCENDANTS;
        }
    }

    if has_3d_transformed_descendants {
        if style.preserve_3d {
            reasons |= CompositingReasons::PRESERVE_3D;
        }
        if style.has_perspective {
            reasons |= CompositingReasons::PERSPECTIVE;
        }
    }

    reasons
}

/// Returns `true` if the layer runs an accelerated transform animation,
/// whose future bounds cannot be predicted for overlap testing.
pub(crate) fn is_running_accelerated_transform_animation(
    tree: &LayerTree,
    settings: &CompositorSettings,
    id: LayerId,
) -> bool {
    settings.triggers.contains(CompositingTriggers::ANIMATION)
        && tree.animations(id).contains(AnimatedProperties::TRANSFORM)
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;
    use alloc::vec::Vec;

    use kurbo::{Rect, Vec2};

    use super::*;
    use crate::layer::{LayerStyle, ZOrderList};
    use crate::transform::Transform3d;

    fn cx<'a>(tree: &'a LayerTree, settings: &'a CompositorSettings) -> ReasonContext<'a> {
        ReasonContext {
            tree,
            settings,
            compositing_mode: false,
            in_post_layout_update: true,
        }
    }

    fn child_with(tree: &mut LayerTree, style: LayerStyle) -> LayerId {
        let root = tree.root();
        let id = tree.create_layer();
        tree.append_child(root, id, ZOrderList::NormalFlow);
        tree.set_bounds(id, Rect::new(0.0, 0.0, 100.0, 100.0));
        tree.set_style(id, style);
        id
    }

    fn fixed() -> LayerStyle {
        LayerStyle {
            position: Position::Fixed,
            stacking_container: true,
            ..LayerStyle::default()
        }
    }

    #[test]
    fn display_joins_names() {
        let r = CompositingReasons::THREE_D_TRANSFORM | CompositingReasons::OVERLAP;
        assert_eq!(r.to_string(), "3D transform | overlap");
        assert_eq!(CompositingReasons::empty().to_string(), "none");
        assert_eq!(
            CompositingReasons::ASSUMED_OVERLAP.describe().collect::<Vec<_>>(),
            ["stacking"]
        );
    }

    #[test]
    fn names_cover_every_flag() {
        let named = CompositingReasons::NAMES
            .iter()
            .fold(CompositingReasons::empty(), |acc, (f, _)| acc | *f);
        assert_eq!(named, CompositingReasons::all());
    }

    #[test]
    fn three_d_transform_is_direct() {
        let mut tree = LayerTree::new();
        let settings = CompositorSettings::default();
        let id = child_with(
            &mut tree,
            LayerStyle {
                transform: Some(Transform3d::from_translate_z(1.0)),
                ..LayerStyle::default()
            },
        );
        let r = direct_reasons(&cx(&tree, &settings), id, false);
        assert_eq!(r.reasons, CompositingReasons::THREE_D_TRANSFORM);
    }

    #[test]
    fn triggers_gate_direct_reasons() {
        let mut tree = LayerTree::new();
        let settings = CompositorSettings {
            triggers: CompositingTriggers::all() - CompositingTriggers::THREE_D_TRANSFORM,
            ..CompositorSettings::default()
        };
        let id = child_with(
            &mut tree,
            LayerStyle {
                transform: Some(Transform3d::from_translate_z(1.0)),
                has_filter: true,
                ..LayerStyle::default()
            },
        );
        let r = direct_reasons(&cx(&tree, &settings), id, false);
        assert_eq!(r.reasons, CompositingReasons::FILTERS);
    }

    #[test]
    fn element_kinds_are_mutually_exclusive() {
        let mut tree = LayerTree::new();
        let settings = CompositorSettings::default();
        let video = child_with(
            &mut tree,
            LayerStyle {
                element: ElementKind::Video { accelerated: true },
                ..LayerStyle::default()
            },
        );
        let r = direct_reasons(&cx(&tree, &settings), video, false);
        assert_eq!(r.reasons, CompositingReasons::VIDEO);
        assert!(!r.reevaluate_after_layout);
    }

    #[test]
    fn plugin_keeps_prior_status_while_layout_pending() {
        let mut tree = LayerTree::new();
        let settings = CompositorSettings::default();
        let plugin = child_with(
            &mut tree,
            LayerStyle {
                element: ElementKind::Plugin { accelerated: true },
                needs_layout: true,
                ..LayerStyle::default()
            },
        );
        let c = cx(&tree, &settings);
        let r = direct_reasons(&c, plugin, false);
        assert!(r.reevaluate_after_layout);
        assert!(r.reasons.is_empty(), "not composited before, stays so");
        let r = direct_reasons(&c, plugin, true);
        assert_eq!(r.reasons, CompositingReasons::PLUGIN, "composited before, stays so");
    }

    #[test]
    fn tiny_plugin_does_not_composite() {
        let mut tree = LayerTree::new();
        let settings = CompositorSettings::default();
        let plugin = child_with(
            &mut tree,
            LayerStyle {
                element: ElementKind::Plugin { accelerated: true },
                ..LayerStyle::default()
            },
        );
        tree.set_bounds(plugin, Rect::new(0.0, 0.0, 1.0, 1.0));
        let r = direct_reasons(&cx(&tree, &settings), plugin, false);
        assert!(r.reasons.is_empty(), "a 1x1 plugin is not worth a surface");
        assert!(r.reevaluate_after_layout);
    }

    #[test]
    fn opacity_animation_needs_compositing_mode() {
        let mut tree = LayerTree::new();
        let settings = CompositorSettings::default();
        let id = child_with(&mut tree, LayerStyle::default());
        tree.set_animations(id, AnimatedProperties::OPACITY);
        let mut c = cx(&tree, &settings);
        assert!(direct_reasons(&c, id, false).reasons.is_empty());
        c.compositing_mode = true;
        assert_eq!(
            direct_reasons(&c, id, false).reasons,
            CompositingReasons::ANIMATION
        );
    }

    #[test]
    fn transitions_respect_setting() {
        let mut tree = LayerTree::new();
        let id = child_with(&mut tree, LayerStyle::default());
        tree.set_transitions(id, AnimatedProperties::OPACITY);
        let on = CompositorSettings::default();
        let off = CompositorSettings {
            transition_compositing: false,
            ..CompositorSettings::default()
        };
        assert_eq!(
            direct_reasons(&cx(&tree, &on), id, false).reasons,
            CompositingReasons::ANIMATION
        );
        assert!(direct_reasons(&cx(&tree, &off), id, false).reasons.is_empty());
    }

    #[test]
    fn backface_needs_3d_rendering() {
        let mut tree = LayerTree::new();
        let id = child_with(
            &mut tree,
            LayerStyle {
                backface_hidden: true,
                ..LayerStyle::default()
            },
        );
        let flat = CompositorSettings {
            render_3d: false,
            ..CompositorSettings::default()
        };
        assert!(direct_reasons(&cx(&tree, &flat), id, false).reasons.is_empty());
        let full = CompositorSettings::default();
        assert_eq!(
            direct_reasons(&cx(&tree, &full), id, false).reasons,
            CompositingReasons::BACKFACE_VISIBILITY_HIDDEN
        );
    }

    #[test]
    fn fixed_without_scrollable_ancestor_is_not_composited() {
        let mut tree = LayerTree::new();
        let settings = CompositorSettings::default();
        let f = child_with(&mut tree, fixed());
        let r = direct_reasons(&cx(&tree, &settings), f, false);
        assert!(r.reasons.is_empty());
        assert_eq!(
            r.not_composited,
            ViewportConstrainedNotCompositedReason::UnscrollableAncestors
        );
    }

    #[test]
    fn fixed_in_scrollable_frame_composites() {
        let mut tree = LayerTree::new();
        tree.set_frame_scrollable(true);
        let settings = CompositorSettings::default();
        let f = child_with(&mut tree, fixed());
        let r = direct_reasons(&cx(&tree, &settings), f, false);
        assert_eq!(r.reasons, CompositingReasons::POSITION_FIXED);
        assert_eq!(r.not_composited, ViewportConstrainedNotCompositedReason::None);
    }

    #[test]
    fn fixed_under_scrollable_layer_composites() {
        let mut tree = LayerTree::new();
        let settings = CompositorSettings::default();
        let scroller = child_with(
            &mut tree,
            LayerStyle {
                scrollable: true,
                ..LayerStyle::default()
            },
        );
        let f = tree.create_layer();
        tree.append_child(scroller, f, ZOrderList::NormalFlow);
        tree.set_bounds(f, Rect::new(0.0, 0.0, 10.0, 10.0));
        tree.set_style(f, fixed());
        let r = direct_reasons(&cx(&tree, &settings), f, false);
        assert_eq!(r.reasons, CompositingReasons::POSITION_FIXED);
    }

    #[test]
    fn fixed_requires_stacking_container() {
        let mut tree = LayerTree::new();
        tree.set_frame_scrollable(true);
        let settings = CompositorSettings::default();
        let f = child_with(
            &mut tree,
            LayerStyle {
                stacking_container: false,
                ..fixed()
            },
        );
        let r = direct_reasons(&cx(&tree, &settings), f, false);
        assert!(r.reasons.is_empty());
    }

    #[test]
    fn fixed_out_of_view_and_invisible() {
        let mut tree = LayerTree::new();
        tree.set_frame_scrollable(true);
        let settings = CompositorSettings::default();
        let f = child_with(&mut tree, fixed());
        tree.set_position(f, Vec2::new(5000.0, 0.0));
        let r = requires_compositing_for_position(&cx(&tree, &settings), f, false);
        assert!(!r.composite);
        assert_eq!(
            r.not_composited,
            ViewportConstrainedNotCompositedReason::BoundsOutOfView
        );

        tree.set_position(f, Vec2::ZERO);
        tree.set_style(
            f,
            LayerStyle {
                has_visible_content: false,
                ..fixed()
            },
        );
        let r = requires_compositing_for_position(&cx(&tree, &settings), f, false);
        assert_eq!(
            r.not_composited,
            ViewportConstrainedNotCompositedReason::NoVisibleContent
        );
    }

    #[test]
    fn fixed_bounds_include_descendants() {
        let mut tree = LayerTree::new();
        tree.set_frame_scrollable(true);
        let settings = CompositorSettings::default();
        let f = child_with(&mut tree, fixed());
        tree.set_position(f, Vec2::new(-500.0, 0.0));
        tree.set_bounds(f, Rect::ZERO);
        let r = requires_compositing_for_position(&cx(&tree, &settings), f, false);
        assert_eq!(
            r.not_composited,
            ViewportConstrainedNotCompositedReason::BoundsOutOfView,
            "an empty container alone is out of view"
        );

        let inner = tree.create_layer();
        tree.append_child(f, inner, ZOrderList::NormalFlow);
        tree.set_position(inner, Vec2::new(510.0, 10.0));
        tree.set_bounds(inner, Rect::new(0.0, 0.0, 20.0, 20.0));
        let r = requires_compositing_for_position(&cx(&tree, &settings), f, false);
        assert!(r.composite, "a visible descendant keeps the container in view");
        assert_eq!(r.not_composited, ViewportConstrainedNotCompositedReason::None);

        let mut style = tree.style(f).clone();
        style.clips_descendants = true;
        tree.set_style(f, style);
        let r = requires_compositing_for_position(&cx(&tree, &settings), f, false);
        assert!(!r.composite, "a clipping container hides its descendants");
    }

    #[test]
    fn fixed_defers_outside_post_layout() {
        let mut tree = LayerTree::new();
        tree.set_frame_scrollable(true);
        let settings = CompositorSettings::default();
        let f = child_with(&mut tree, fixed());
        let mut c = cx(&tree, &settings);
        c.in_post_layout_update = false;
        let r = requires_compositing_for_position(&c, f, true);
        assert!(r.composite, "keeps prior composited status");
        assert!(r.reevaluate_after_layout);
    }

    #[test]
    fn fixed_with_other_container() {
        let mut tree = LayerTree::new();
        tree.set_frame_scrollable(true);
        let settings = CompositorSettings::default();
        let f = child_with(
            &mut tree,
            LayerStyle {
                fixed_container: FixedContainer::Other,
                ..fixed()
            },
        );
        let r = requires_compositing_for_position(&cx(&tree, &settings), f, false);
        assert_eq!(
            r.not_composited,
            ViewportConstrainedNotCompositedReason::NonViewContainer
        );
    }

    #[test]
    fn sticky_skips_scroll_and_bounds_checks() {
        let mut tree = LayerTree::new();
        let settings = CompositorSettings::default();
        let s = child_with(
            &mut tree,
            LayerStyle {
                position: Position::Sticky,
                ..LayerStyle::default()
            },
        );
        tree.set_position(s, Vec2::new(9000.0, 9000.0));
        let r = direct_reasons(&cx(&tree, &settings), s, false);
        assert_eq!(r.reasons, CompositingReasons::POSITION_STICKY);

        let off = CompositorSettings {
            fixed_position_compositing: false,
            ..CompositorSettings::default()
        };
        assert!(direct_reasons(&cx(&tree, &off), s, false).reasons.is_empty());
    }

    #[test]
    fn subtree_reasons_need_descendants() {
        let mut tree = LayerTree::new();
        let id = child_with(
            &mut tree,
            LayerStyle {
                opacity: 0.5,
                has_filter: true,
                has_mask: true,
                clips_descendants: true,
                preserve_3d: true,
                has_perspective: true,
                transform: Some(Transform3d::from_rotation_z(0.1)),
                ..LayerStyle::default()
            },
        );
        assert!(
            subtree_reasons(&tree, id, false, false).is_empty(),
            "no composited or 3D descendants means no subtree reasons"
        );

        let with_composited = subtree_reasons(&tree, id, true, false);
        assert!(with_composited.contains(
            CompositingReasons::OPACITY_WITH_COMPOSITED_DESCENDANTS
                | CompositingReasons::FILTER_WITH_COMPOSITED_DESCENDANTS
                | CompositingReasons::MASK_WITH_COMPOSITED_DESCENDANTS
                | CompositingReasons::CLIPS_COMPOSITING_DESCENDANTS
                | CompositingReasons::TRANSFORM_WITH_COMPOSITED_DESCENDANTS
        ));
        assert!(!with_composited.intersects(
            CompositingReasons::PRESERVE_3D | CompositingReasons::PERSPECTIVE
        ));

        let with_3d = subtree_reasons(&tree, id, false, true);
        assert_eq!(
            with_3d,
            CompositingReasons::PRESERVE_3D | CompositingReasons::PERSPECTIVE
        );
    }
}
