// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-level state shared by every layer of one document.

use kurbo::{Point, Rect, Size, Vec2};

/// The frame (document view) hosting a [`LayerTree`](super::LayerTree).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameView {
    /// Size of the visible viewport.
    pub viewport_size: Size,
    /// Current scroll offset of the document.
    pub scroll_offset: Vec2,
    /// Whether the frame itself can scroll (document larger than viewport
    /// and scrolling not disabled).
    pub scrollable: bool,
    /// Layout has been invalidated and not yet run.
    pub needs_layout: bool,
}

impl Default for FrameView {
    fn default() -> Self {
        Self {
            viewport_size: Size::new(800.0, 600.0),
            scroll_offset: Vec2::ZERO,
            scrollable: false,
            needs_layout: false,
        }
    }
}

impl FrameView {
    /// The visible part of the document, in document coordinates.
    ///
    /// This is the rectangle viewport-constrained layers are tested against.
    #[must_use]
    pub fn visible_content_rect(&self) -> Rect {
        Rect::from_origin_size(Point::ZERO + self.scroll_offset, self.viewport_size)
    }
}
