// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry-only update.
//!
//! Repositions existing backings after layout or scrolling without creating,
//! destroying or re-parenting any of them.

use crate::layer::LayerId;
use crate::transform::Transform3d;

use super::{Compositor, Pass};

impl Compositor {
    /// Updates the geometry of every backing reachable from the root.
    ///
    /// Returns `true` if some backing's sublayer configuration changed, in
    /// which case the composited tree must be rebuilt.
    pub(super) fn update_layer_tree_geometry(&mut self, pass: &mut Pass<'_, '_>) -> bool {
        let root = pass.tree.root();
        self.update_geometry_for(pass, root, None, Transform3d::IDENTITY)
    }

    fn update_geometry_for(
        &mut self,
        pass: &mut Pass<'_, '_>,
        layer: LayerId,
        compositing_ancestor: Option<LayerId>,
        parent_to_absolute: Transform3d,
    ) -> bool {
        let tree = pass.tree;
        let to_absolute = tree.to_absolute(layer, parent_to_absolute);
        let has_backing = self.backings.contains(layer);
        let mut config_changed = false;
        if has_backing {
            config_changed |=
                self.update_backing_geometry(pass, layer, compositing_ancestor, to_absolute);
        }

        let ancestor = if has_backing {
            Some(layer)
        } else {
            compositing_ancestor
        };
        for child in tree.paint_order_children(layer) {
            if !tree.style(child).hidden {
                config_changed |= self.update_geometry_for(pass, child, ancestor, to_absolute);
            }
        }
        config_changed
    }
}
