// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The [`LayerTree`](crate::layer::LayerTree) uses multi-channel dirty
//! tracking (via [`understory_dirty`]) to record what changed since the
//! compositor last looked. Each channel maps to the cheapest compositor
//! update that can absorb it.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`GEOMETRY`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) with dependency edges from
//!   child to parent. Moving or resizing a layer moves every descendant in
//!   absolute coordinates, so the whole subtree is marked.
//!
//! - **Local-only**: [`STYLE`] marks only the changed layer. Compositing
//!   reasons are recomputed for the whole tree by a full pass anyway; the
//!   channel exists to decide *whether* that pass must run.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on z-order list mutations and on
//!   layer creation/destruction.
//!
//! - **Frame**: [`SCROLL`] is marked on the root when the frame scroll offset
//!   changes.
//!
//! # Consumption
//!
//! [`LayerTree::drain_changes`](crate::layer::LayerTree::drain_changes)
//! drains all channels into [`TreeChanges`](crate::layer::TreeChanges), and
//! [`UpdateType::for_changes`](crate::compositor::UpdateType::for_changes)
//! maps those to an update strategy.

use understory_dirty::Channel;

/// Style flags changed; compositing reasons must be recomputed.
pub const STYLE: Channel = Channel::new(0);

/// Position, bounds or transform changed for a layer and its descendants.
pub const GEOMETRY: Channel = Channel::new(1);

/// Z-order lists changed, or a layer was created or destroyed.
pub const TOPOLOGY: Channel = Channel::new(2);

/// The frame scrolled.
pub const SCROLL: Channel = Channel::new(3);
