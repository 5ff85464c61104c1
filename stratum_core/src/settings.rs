// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositor configuration.

use bitflags::bitflags;

use crate::layer::FrameView;

bitflags! {
    /// Which kinds of content the host allows to trigger compositing.
    ///
    /// An empty set disables accelerated compositing altogether.
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
    pub struct CompositingTriggers: u8 {
        /// 3D transforms.
        const THREE_D_TRANSFORM = 1 << 0;
        /// Accelerated video.
        const VIDEO = 1 << 1;
        /// Accelerated plugins.
        const PLUGIN = 1 << 2;
        /// Accelerated canvases.
        const CANVAS = 1 << 3;
        /// Accelerated animations and transitions.
        const ANIMATION = 1 << 4;
        /// CSS filters.
        const FILTER = 1 << 5;
        /// Scrollable inner frames in forced compositing mode.
        const SCROLLABLE_INNER_FRAME = 1 << 6;
    }
}

impl Default for CompositingTriggers {
    fn default() -> Self {
        Self::all()
    }
}

/// Settings read by the [`Compositor`](crate::compositor::Compositor).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositorSettings {
    /// Master switch for accelerated compositing.
    pub accelerated_compositing: bool,
    /// Allowed compositing triggers.
    pub triggers: CompositingTriggers,
    /// Keep the document in compositing mode even when nothing requires it.
    pub force_compositing_mode: bool,
    /// Allow `position: fixed` and `position: sticky` layers to composite.
    pub fixed_position_compositing: bool,
    /// Allow running transitions to composite.
    pub transition_compositing: bool,
    /// The host can render 3D transforms.
    pub render_3d: bool,
    /// This document is the main frame (not an iframe).
    pub is_main_frame: bool,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            accelerated_compositing: true,
            triggers: CompositingTriggers::all(),
            force_compositing_mode: false,
            fixed_position_compositing: true,
            transition_compositing: true,
            render_3d: true,
            is_main_frame: true,
        }
    }
}

/// Flags derived from [`CompositorSettings`] and the frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct EffectiveFlags {
    pub(crate) accelerated: bool,
    pub(crate) force_compositing_mode: bool,
}

impl CompositorSettings {
    /// Resolves the flags the compositor actually acts on.
    ///
    /// Accelerated compositing requires at least one trigger. Forced
    /// compositing mode in an inner frame only applies when that frame is
    /// scrollable and scrollable inner frames are an allowed trigger.
    pub(crate) fn effective(&self, frame: &FrameView) -> EffectiveFlags {
        let accelerated = self.accelerated_compositing && !self.triggers.is_empty();
        let mut force = self.force_compositing_mode && accelerated;
        if force && !self.is_main_frame {
            force = self
                .triggers
                .contains(CompositingTriggers::SCROLLABLE_INNER_FRAME)
                && frame.scrollable;
        }
        EffectiveFlags {
            accelerated,
            force_compositing_mode: force,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_everything_but_forcing() {
        let s = CompositorSettings::default();
        let flags = s.effective(&FrameView::default());
        assert!(flags.accelerated);
        assert!(!flags.force_compositing_mode);
    }

    #[test]
    fn empty_triggers_disable_acceleration() {
        let s = CompositorSettings {
            triggers: CompositingTriggers::empty(),
            force_compositing_mode: true,
            ..CompositorSettings::default()
        };
        let flags = s.effective(&FrameView::default());
        assert!(!flags.accelerated, "no trigger means no acceleration");
        assert!(!flags.force_compositing_mode);
    }

    #[test]
    fn forced_mode_in_inner_frame_needs_scrolling() {
        let s = CompositorSettings {
            force_compositing_mode: true,
            is_main_frame: false,
            ..CompositorSettings::default()
        };
        let still = FrameView::default();
        assert!(!s.effective(&still).force_compositing_mode);

        let scrolling = FrameView {
            scrollable: true,
            ..FrameView::default()
        };
        assert!(s.effective(&scrolling).force_compositing_mode);
    }
}
