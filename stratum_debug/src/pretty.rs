// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use stratum_core::trace::{
    BackingChangeEvent, BackingChangeKind, CompositingModeEvent, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, ReasonsEvent, TraceSink, UpdateBeginEvent, UpdateSummary,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    reasons: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("reasons", &self.reasons)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            reasons: false,
        }
    }

    /// Also print the final reasons of every visited layer.
    #[must_use]
    pub fn with_reasons(mut self, reasons: bool) -> Self {
        self.reasons = reasons;
        self
    }

    /// Returns the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Requirements => "requirements",
        PhaseKind::Rebuild => "rebuild",
        PhaseKind::Geometry => "geometry",
    }
}

fn change_name(kind: BackingChangeKind) -> &'static str {
    match kind {
        BackingChangeKind::Promoted => "promoted",
        BackingChangeKind::Demoted => "demoted",
        BackingChangeKind::AllocationFailed => "ALLOCATION-FAILED",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_update_begin(&mut self, e: &UpdateBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[update] #{} type={} compositing={}",
            e.update_index, e.update_type, e.in_compositing_mode,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] #{} {}",
            e.update_index,
            phase_name(e.phase),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] #{} {}",
            e.update_index,
            phase_name(e.phase),
        );
    }

    fn on_backing_change(&mut self, e: &BackingChangeEvent) {
        let _ = writeln!(
            self.writer,
            "[backing] #{} layer={} {} reasons={}",
            e.update_index,
            e.layer,
            change_name(e.kind),
            e.reasons,
        );
    }

    fn on_compositing_mode(&mut self, e: &CompositingModeEvent) {
        let state = if e.enabled { "enter" } else { "leave" };
        let _ = writeln!(self.writer, "[mode] #{} {state}", e.update_index);
    }

    fn on_update_summary(&mut self, s: &UpdateSummary) {
        let mut phases = Vec::new();
        if s.requirements {
            phases.push("requirements");
        }
        if s.rebuild {
            phases.push("rebuild");
        }
        if s.geometry {
            phases.push("geometry");
        }
        let _ = writeln!(
            self.writer,
            "[summary] #{} type={} phases={} promoted={} demoted={} failed={} \
             composited={} compositing={}",
            s.update_index,
            s.update_type,
            phases.join("+"),
            s.promoted,
            s.demoted,
            s.allocation_failures,
            s.composited_layers,
            s.in_compositing_mode,
        );
    }

    fn on_reasons(&mut self, e: &ReasonsEvent) {
        if !self.reasons {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[reasons] #{} layer={} composited={} {}",
            e.update_index, e.layer, e.composited, e.reasons,
        );
    }
}
