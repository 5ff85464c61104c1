// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`ChromeTraceSink`] collects trace events and writes them as
//! [Chrome Trace Event Format][format] JSON.
//!
//! Updates carry no clock, so `ts` is the ordinal of the event within the
//! recording. Phase spans still nest and order correctly in the viewer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use stratum_core::trace::{
    BackingChangeEvent, CompositingModeEvent, PhaseBeginEvent, PhaseEndEvent, ReasonsEvent,
    TraceSink, UpdateBeginEvent, UpdateSummary,
};

/// Collects events for export as Chrome Trace Event Format JSON.
#[derive(Debug, Default)]
pub struct ChromeTraceSink {
    events: Vec<Value>,
    next_ts: u64,
}

impl ChromeTraceSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Writes the collected events as a JSON array, suitable for loading
    /// into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
    pub fn export(&self, writer: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, &self.events)?;
        writeln!(writer)
    }

    fn tick(&mut self) -> u64 {
        let ts = self.next_ts;
        self.next_ts += 1;
        ts
    }

    fn instant(&mut self, name: &str, cat: &str, args: Value) {
        let ts = self.tick();
        self.events.push(json!({
            "ph": "i",
            "name": name,
            "cat": cat,
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "s": "g",
            "args": args,
        }));
    }
}

impl TraceSink for ChromeTraceSink {
    fn on_update_begin(&mut self, e: &UpdateBeginEvent) {
        self.instant(
            "UpdateBegin",
            "Update",
            json!({
                "update_index": e.update_index,
                "update_type": e.update_type.name(),
                "in_compositing_mode": e.in_compositing_mode,
            }),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let ts = self.tick();
        self.events.push(json!({
            "ph": "B",
            "name": format!("{:?}", e.phase),
            "cat": "Update",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": { "update_index": e.update_index },
        }));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let ts = self.tick();
        self.events.push(json!({
            "ph": "E",
            "name": format!("{:?}", e.phase),
            "cat": "Update",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": { "update_index": e.update_index },
        }));
    }

    fn on_backing_change(&mut self, e: &BackingChangeEvent) {
        self.instant(
            &format!("{:?}", e.kind),
            "Backing",
            json!({
                "update_index": e.update_index,
                "layer": e.layer.to_string(),
                "reasons": e.reasons.describe().collect::<Vec<_>>(),
            }),
        );
    }

    fn on_compositing_mode(&mut self, e: &CompositingModeEvent) {
        self.instant(
            "CompositingMode",
            "Update",
            json!({ "update_index": e.update_index, "enabled": e.enabled }),
        );
    }

    fn on_update_summary(&mut self, s: &UpdateSummary) {
        self.instant(
            "UpdateSummary",
            "Update",
            json!({
                "update_index": s.update_index,
                "update_type": s.update_type.name(),
                "promoted": s.promoted,
                "demoted": s.demoted,
                "allocation_failures": s.allocation_failures,
                "composited_layers": s.composited_layers,
                "in_compositing_mode": s.in_compositing_mode,
            }),
        );
    }

    fn on_reasons(&mut self, e: &ReasonsEvent) {
        self.instant(
            "Reasons",
            "Layer",
            json!({
                "update_index": e.update_index,
                "layer": e.layer.to_string(),
                "composited": e.composited,
                "reasons": e.reasons.describe().collect::<Vec<_>>(),
            }),
        );
    }
}
