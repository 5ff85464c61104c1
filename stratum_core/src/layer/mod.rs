// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint-order layer tree.
//!
//! A *layer* is a node of the paint-order tree the compositor reads. Each
//! layer has:
//!
//! - An identity ([`LayerId`]), a generational handle that becomes stale when
//!   the layer is destroyed.
//! - Topology: a parent and, on stacking containers, three ordered child
//!   lists ([`ZOrderList`]). Paint order is negative list, normal flow,
//!   positive list, recursively.
//! - Geometry set by layout: offset from the parent, painted bounds and
//!   overlap outsets.
//! - A [`LayerStyle`] snapshot plus running animations and transitions.
//!
//! The tree also carries the [`FrameView`] of the document it belongs to.
//!
//! # Dirty tracking
//!
//! Mutations mark [`dirty`](crate::dirty) channels. The compositor drains
//! them with [`LayerTree::drain_changes`] to decide which kind of update to
//! run.

mod changes;
mod frame;
mod id;
mod store;
mod style;
mod traverse;

pub use changes::TreeChanges;
pub use frame::FrameView;
pub use id::{INVALID, LayerId, SurfaceId};
pub use store::LayerTree;
pub use style::{
    AnimatedProperties, Edges, ElementKind, FixedContainer, LayerStyle, OverflowControls,
    Position,
};
pub use traverse::{PaintOrder, ZOrderIter, ZOrderList};
