// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer style snapshot consumed by the compositor.
//!
//! Style resolution happens elsewhere. The compositor only reads the flags
//! below, so a [`LayerStyle`] is a flat value the caller overwrites whenever
//! resolved style changes.

use bitflags::bitflags;
use kurbo::Vec2;

use crate::transform::Transform3d;

/// CSS `position` value of a layer's renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Position {
    /// `position: static`.
    #[default]
    Static,
    /// `position: relative`.
    Relative,
    /// `position: absolute`.
    Absolute,
    /// `position: fixed`.
    Fixed,
    /// `position: sticky`.
    Sticky,
}

impl Position {
    /// Returns `true` for anything other than `static`.
    #[inline]
    #[must_use]
    pub const fn is_positioned(self) -> bool {
        !matches!(self, Self::Static)
    }
}

/// What kind of replaced content a layer hosts.
///
/// The `accelerated` flag says whether the content can be rendered by the
/// GPU path at all (e.g. a canvas with an accelerated rendering context, or a
/// plugin that allows accelerated compositing).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Ordinary content.
    #[default]
    Generic,
    /// A video element.
    Video {
        /// Whether the video can use an accelerated rendering path.
        accelerated: bool,
    },
    /// A canvas element.
    Canvas {
        /// Whether the canvas has an accelerated rendering context.
        accelerated: bool,
    },
    /// An embedded plugin.
    Plugin {
        /// Whether the plugin allows accelerated compositing.
        accelerated: bool,
    },
    /// An inner frame (iframe) whose document is itself composited.
    Frame {
        /// Whether the inner document requires accelerated compositing.
        accelerated: bool,
    },
}

impl ElementKind {
    /// Returns `true` for [`ElementKind::Video`].
    #[inline]
    #[must_use]
    pub const fn is_video(self) -> bool {
        matches!(self, Self::Video { .. })
    }
}

/// State of the containing block of a `position: fixed` layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FixedContainer {
    /// The fixed element is contained by the viewport.
    #[default]
    Viewport,
    /// Some other box (e.g. a transformed ancestor) contains it.
    Other,
    /// Not known until layout runs.
    Pending,
}

bitflags! {
    /// A set of box edges.
    ///
    /// Used both for which insets (`left`, `right`, `top`, `bottom`) are
    /// specified (non-`auto`) and for the anchor edges of a viewport
    /// constraint.
    #[derive(Clone, Copy, Default, Debug, Eq, PartialEq, Hash)]
    pub struct Edges: u8 {
        /// Left edge.
        const LEFT = 1 << 0;
        /// Right edge.
        const RIGHT = 1 << 1;
        /// Top edge.
        const TOP = 1 << 2;
        /// Bottom edge.
        const BOTTOM = 1 << 3;
    }
}

bitflags! {
    /// Properties that can run on the compositor as accelerated animations.
    #[derive(Clone, Copy, Default, Debug, Eq, PartialEq, Hash)]
    pub struct AnimatedProperties: u8 {
        /// `transform`.
        const TRANSFORM = 1 << 0;
        /// `opacity`.
        const OPACITY = 1 << 1;
        /// `filter`.
        const FILTER = 1 << 2;
    }
}

bitflags! {
    /// Overflow controls a scrollable layer paints.
    #[derive(Clone, Copy, Default, Debug, Eq, PartialEq, Hash)]
    pub struct OverflowControls: u8 {
        /// A horizontal scrollbar.
        const HORIZONTAL_SCROLLBAR = 1 << 0;
        /// A vertical scrollbar.
        const VERTICAL_SCROLLBAR = 1 << 1;
        /// The corner between the two scrollbars, or a resizer.
        const SCROLL_CORNER = 1 << 2;
    }
}

/// Resolved style flags of one layer.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerStyle {
    /// Position type.
    pub position: Position,
    /// Whether this layer establishes its own z-order context.
    pub stacking_container: bool,
    /// Own transform, applied about the layer origin.
    pub transform: Option<Transform3d>,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// A CSS filter is present.
    pub has_filter: bool,
    /// A non-normal `mix-blend-mode` is present.
    pub has_blend_mode: bool,
    /// A mask is present.
    pub has_mask: bool,
    /// The layer clips its descendants (`overflow` other than visible, or `clip`).
    pub clips_descendants: bool,
    /// `backface-visibility: hidden`.
    pub backface_hidden: bool,
    /// `transform-style: preserve-3d`.
    pub preserve_3d: bool,
    /// A `perspective` is set.
    pub has_perspective: bool,
    /// `-webkit-overflow-scrolling: touch` and actually scrollable.
    pub touch_scrolling: bool,
    /// Overflow controls painted by this layer.
    pub overflow_controls: OverflowControls,
    /// Replaced content kind.
    pub element: ElementKind,
    /// The layer paints its own content (as opposed to being a pure grouping
    /// layer painted by an ancestor).
    pub self_painting: bool,
    /// The layer, or some descendant, paints something visible.
    pub has_visible_content: bool,
    /// Which of `left`/`right`/`top`/`bottom` are not `auto`.
    pub specified_insets: Edges,
    /// Sticky offset computed by the last layout.
    pub sticky_offset: Vec2,
    /// Containing block of a fixed-position layer.
    pub fixed_container: FixedContainer,
    /// The layer is a scrollable area.
    pub scrollable: bool,
    /// `visibility: hidden` on the whole subtree. Hidden subtrees are not
    /// visited by the compositing passes.
    pub hidden: bool,
    /// Layout for this layer's renderer has not run since its last change.
    pub needs_layout: bool,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            position: Position::Static,
            stacking_container: false,
            transform: None,
            opacity: 1.0,
            has_filter: false,
            has_blend_mode: false,
            has_mask: false,
            clips_descendants: false,
            backface_hidden: false,
            preserve_3d: false,
            has_perspective: false,
            touch_scrolling: false,
            overflow_controls: OverflowControls::empty(),
            element: ElementKind::Generic,
            self_painting: true,
            has_visible_content: true,
            specified_insets: Edges::empty(),
            sticky_offset: Vec2::ZERO,
            fixed_container: FixedContainer::Viewport,
            scrollable: false,
            hidden: false,
            needs_layout: false,
        }
    }
}

impl LayerStyle {
    /// Returns `true` if the layer has a transform with any 3D component.
    #[inline]
    #[must_use]
    pub fn has_3d_transform(&self) -> bool {
        self.transform.is_some_and(|t| t.has_3d())
    }

    /// Returns `true` if opacity is below 1.
    #[inline]
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_is_opaque_self_painting_static() {
        let style = LayerStyle::default();
        assert_eq!(style.position, Position::Static);
        assert!(!style.is_transparent());
        assert!(style.self_painting);
        assert!(!style.has_3d_transform());
    }

    #[test]
    fn three_d_transform_detection() {
        let style = LayerStyle {
            transform: Some(Transform3d::from_translation(4.0, 0.0, 0.0)),
            ..LayerStyle::default()
        };
        assert!(!style.has_3d_transform(), "2D translation is not 3D");

        let style = LayerStyle {
            transform: Some(Transform3d::from_translate_z(1.0)),
            ..LayerStyle::default()
        };
        assert!(style.has_3d_transform());
    }

    #[test]
    fn positioned_excludes_static_only() {
        assert!(!Position::Static.is_positioned());
        assert!(Position::Relative.is_positioned());
        assert!(Position::Sticky.is_positioned());
    }
}
