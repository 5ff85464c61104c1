// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositing-layer decisions and composited-surface tree maintenance.
//!
//! `stratum_core` decides which layers of a paint-order layer tree get their
//! own GPU-backed surface, allocates and releases those surfaces through a
//! host-provided factory, and keeps the tree of composited surfaces in sync
//! with the layer tree. It is `no_std` compatible (with `alloc`).
//!
//! # Architecture
//!
//! ```text
//!   LayerTree mutations ──► dirty channels ──► UpdateType
//!                                                  │
//!                 ┌────────────────────────────────┘
//!                 ▼
//!   Compositor::update()
//!       ├─ requirements: reasons + overlap ──► promote / demote backings
//!       ├─ rebuild: composited child lists ──► SurfaceFactory::set_children
//!       └─ geometry: bounds + transforms   ──► SurfaceFactory::set_geometry
//!                 │
//!                 ▼
//!   CompositingChanges (repaints, invalidations, mode changes)
//! ```
//!
//! **[`layer`]**: Slot-indexed layer tree with generational handles, z-order
//! child lists, layout geometry, style snapshots and the frame view.
//!
//! **[`dirty`]**: Dirty channels via `understory_dirty`. Mutations mark the
//! channel the compositor needs to pick an update type.
//!
//! **[`reasons`]**: [`CompositingReasons`](reasons::CompositingReasons) and
//! the per-layer predicates that produce them.
//!
//! **[`overlap`]**: Scoped overlap map and the geometry map that tracks
//! absolute transforms and clips during traversal.
//!
//! **[`compositor`]**: The [`Compositor`](compositor::Compositor): update
//! passes, backing lifecycle and the viewport-constrained registry.
//!
//! **[`surface`]**: The [`SurfaceFactory`](surface::SurfaceFactory) trait the
//! host implements to allocate and arrange platform surfaces.
//!
//! **[`settings`]**: Host configuration and compositing triggers.
//!
//! **[`transform`]**: 3D affine transform type for layer positioning.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! update instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-layer
//!   reason events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod compositor;
pub mod dirty;
pub mod error;
pub mod layer;
pub mod overlap;
pub mod reasons;
pub mod settings;
pub mod surface;
pub mod trace;
pub mod transform;
