// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recoverable errors.
//!
//! Consistency violations (stale handles, popping the bottom overlap scope,
//! malformed z-order lists) are programming errors and panic instead.

use thiserror::Error;

use crate::layer::LayerId;

/// Errors returned by [`Compositor`](crate::compositor::Compositor) updates.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum CompositingError {
    /// A previous update did not run to completion, so traversal state may
    /// be inconsistent. Call
    /// [`clear_backing_for_all_layers`](crate::compositor::Compositor::clear_backing_for_all_layers)
    /// to recover.
    #[error("a compositing update is already in progress")]
    UpdateInProgress,
}

/// A surface allocation failure reported by a
/// [`SurfaceFactory`](crate::surface::SurfaceFactory).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SurfaceError {
    /// The platform ran out of surface memory.
    #[error("out of surface memory allocating for layer {0}")]
    OutOfMemory(LayerId),
    /// The requested size exceeds what the platform can allocate.
    #[error("surface for layer {0} exceeds the maximum size")]
    TooLarge(LayerId),
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;
    use crate::layer::LayerTree;

    #[test]
    fn messages_name_the_layer() {
        let tree = LayerTree::new();
        let root = tree.root();
        let msg = SurfaceError::OutOfMemory(root).to_string();
        assert!(msg.contains("#0"), "got: {msg}");
        assert_eq!(
            CompositingError::UpdateInProgress.to_string(),
            "a compositing update is already in progress"
        );
    }
}
