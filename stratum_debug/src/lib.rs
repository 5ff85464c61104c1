// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing, Chrome trace export and JSON snapshots for stratum
//! compositing diagnostics.
//!
//! This crate provides [`TraceSink`](stratum_core::trace::TraceSink)
//! implementations and dump helpers for development and post-mortem
//! analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`chrome::ChromeTraceSink`]: collects events and writes Chrome Trace
//!   Event Format JSON.
//! - [`snapshot::dump`]: JSON snapshot of the composited tree and the
//!   per-layer compositing decisions.

pub mod chrome;
pub mod pretty;
pub mod snapshot;
