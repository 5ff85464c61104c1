// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for compositing updates.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the [`Compositor`](crate::compositor::Compositor) calls at each stage of an
//! update. All method bodies default to no-ops, so implementing only the
//! events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`UpdateSummaryBuilder`] collects the phases and backing changes of one
//! update and produces an [`UpdateSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) gates [`ReasonsEvent`] and the
//!   corresponding `TraceSink` method.

use crate::compositor::UpdateType;
use crate::layer::LayerId;
use crate::reasons::CompositingReasons;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of an update is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Requirements traversal (reasons, overlap, backing lifecycle).
    Requirements,
    /// Composited-tree rebuild.
    Rebuild,
    /// Geometry-only repositioning of existing backings.
    Geometry,
}

/// What happened to a layer's backing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackingChangeKind {
    /// A backing was created.
    Promoted,
    /// A backing was destroyed.
    Demoted,
    /// Creating a backing failed; the layer stays non-composited.
    AllocationFailed,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when an update starts doing work.
#[derive(Clone, Copy, Debug)]
pub struct UpdateBeginEvent {
    /// Monotonic update counter.
    pub update_index: u64,
    /// Why the update runs.
    pub update_type: UpdateType,
    /// Whether the document was in compositing mode at the start.
    pub in_compositing_mode: bool,
}

/// Marks the beginning of an update phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Update counter.
    pub update_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of an update phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Update counter.
    pub update_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
}

/// Emitted when a backing is created, destroyed or fails to allocate.
#[derive(Clone, Copy, Debug)]
pub struct BackingChangeEvent {
    /// Update counter.
    pub update_index: u64,
    /// Affected layer.
    pub layer: LayerId,
    /// What happened.
    pub kind: BackingChangeKind,
    /// The layer's reasons at the time of the change.
    pub reasons: CompositingReasons,
}

/// Emitted when the document enters or leaves compositing mode.
#[derive(Clone, Copy, Debug)]
pub struct CompositingModeEvent {
    /// Update counter.
    pub update_index: u64,
    /// `true` when entering compositing mode.
    pub enabled: bool,
}

/// Per-update summary produced by [`UpdateSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct UpdateSummary {
    /// Update counter.
    pub update_index: u64,
    /// Why the update ran.
    pub update_type: UpdateType,
    /// The requirements traversal ran.
    pub requirements: bool,
    /// The composited tree was rebuilt.
    pub rebuild: bool,
    /// Only geometry was updated.
    pub geometry: bool,
    /// Backings created.
    pub promoted: u32,
    /// Backings destroyed.
    pub demoted: u32,
    /// Failed allocations.
    pub allocation_failures: u32,
    /// Composited layers after the update.
    pub composited_layers: u32,
    /// Compositing mode after the update.
    pub in_compositing_mode: bool,
}

/// Final reasons of one visited layer.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct ReasonsEvent {
    /// Update counter.
    pub update_index: u64,
    /// Visited layer.
    pub layer: LayerId,
    /// Reasons recorded for the layer.
    pub reasons: CompositingReasons,
    /// Whether the layer ended up with a backing.
    pub composited: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from compositing updates.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an update starts doing work.
    fn on_update_begin(&mut self, e: &UpdateBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of an update phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of an update phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a backing is created, destroyed or fails to allocate.
    fn on_backing_change(&mut self, e: &BackingChangeEvent) {
        _ = e;
    }

    /// Called when compositing mode toggles.
    fn on_compositing_mode(&mut self, e: &CompositingModeEvent) {
        _ = e;
    }

    /// Called with a per-update summary.
    fn on_update_summary(&mut self, s: &UpdateSummary) {
        _ = s;
    }

    /// Called with the final reasons of a visited layer (requires
    /// `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_reasons(&mut self, e: &ReasonsEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits an [`UpdateBeginEvent`].
    #[inline]
    pub fn update_begin(&mut self, e: &UpdateBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_update_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`BackingChangeEvent`].
    #[inline]
    pub fn backing_change(&mut self, e: &BackingChangeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_backing_change(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CompositingModeEvent`].
    #[inline]
    pub fn compositing_mode(&mut self, e: &CompositingModeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_compositing_mode(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`UpdateSummary`].
    #[inline]
    pub fn update_summary(&mut self, s: &UpdateSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_update_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits a [`ReasonsEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn reasons(&mut self, e: &ReasonsEvent) {
        if let Some(s) = &mut self.sink {
            s.on_reasons(e);
        }
    }
}

// ---------------------------------------------------------------------------
// UpdateSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects the phases and backing changes of one update and produces an
/// [`UpdateSummary`].
#[derive(Debug)]
pub struct UpdateSummaryBuilder {
    begin: UpdateBeginEvent,
    phases: [bool; 3],
    promoted: u32,
    demoted: u32,
    allocation_failures: u32,
}

impl UpdateSummaryBuilder {
    /// Starts building a summary for the given update.
    #[must_use]
    pub fn new(begin: &UpdateBeginEvent) -> Self {
        Self {
            begin: *begin,
            phases: [false; 3],
            promoted: 0,
            demoted: 0,
            allocation_failures: 0,
        }
    }

    /// Records that a phase ran.
    pub fn phase(&mut self, phase: PhaseKind) {
        self.phases[phase_index(phase)] = true;
    }

    /// Records a backing change.
    pub fn backing_change(&mut self, kind: BackingChangeKind) {
        match kind {
            BackingChangeKind::Promoted => self.promoted += 1,
            BackingChangeKind::Demoted => self.demoted += 1,
            BackingChangeKind::AllocationFailed => self.allocation_failures += 1,
        }
    }

    /// Consumes the builder and produces the final [`UpdateSummary`].
    #[must_use]
    pub fn finish(self, composited_layers: u32, in_compositing_mode: bool) -> UpdateSummary {
        UpdateSummary {
            update_index: self.begin.update_index,
            update_type: self.begin.update_type,
            requirements: self.phases[phase_index(PhaseKind::Requirements)],
            rebuild: self.phases[phase_index(PhaseKind::Rebuild)],
            geometry: self.phases[phase_index(PhaseKind::Geometry)],
            promoted: self.promoted,
            demoted: self.demoted,
            allocation_failures: self.allocation_failures,
            composited_layers,
            in_compositing_mode,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Requirements => 0,
        PhaseKind::Rebuild => 1,
        PhaseKind::Geometry => 2,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> UpdateBeginEvent {
        UpdateBeginEvent {
            update_index: 3,
            update_type: UpdateType::AfterLayout,
            in_compositing_mode: false,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_update_begin(&sample_begin());
        sink.on_phase_begin(&PhaseBeginEvent {
            update_index: 3,
            phase: PhaseKind::Rebuild,
        });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.update_begin(&sample_begin());
        tracer.compositing_mode(&CompositingModeEvent {
            update_index: 3,
            enabled: true,
        });
    }

    #[test]
    fn summary_builder_counts_changes() {
        let mut builder = UpdateSummaryBuilder::new(&sample_begin());
        builder.phase(PhaseKind::Requirements);
        builder.phase(PhaseKind::Rebuild);
        builder.backing_change(BackingChangeKind::Promoted);
        builder.backing_change(BackingChangeKind::Promoted);
        builder.backing_change(BackingChangeKind::Demoted);

        let summary = builder.finish(2, true);
        assert!(summary.requirements);
        assert!(summary.rebuild);
        assert!(!summary.geometry, "geometry phase never ran");
        assert_eq!(summary.promoted, 2);
        assert_eq!(summary.demoted, 1);
        assert_eq!(summary.allocation_failures, 0);
        assert_eq!(summary.update_index, 3);
        assert_eq!(summary.update_type, UpdateType::AfterLayout);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            updates: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_update_begin(&mut self, e: &UpdateBeginEvent) {
                self.updates.push(e.update_index);
            }
        }

        let mut sink = RecordingSink {
            updates: Vec::new(),
        };
        let mut tracer = Tracer::new(&mut sink);
        tracer.update_begin(&sample_begin());
        drop(tracer);
        assert_eq!(sink.updates, &[3]);
    }
}
