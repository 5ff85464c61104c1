// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Composited-tree rebuild.
//!
//! Walks the paint-order tree in the same order as the requirements pass and
//! collects, for every composited layer, the ordered list of composited
//! children it hosts. A non-composited layer contributes its composited
//! descendants to the list of its nearest composited ancestor.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::layer::{LayerId, LayerTree, SurfaceId, ZOrderList};
use crate::surface::SurfaceGeometry;
use crate::transform::Transform3d;

use super::backing::SublayerConfig;
use super::{Compositor, Pass};

/// An auxiliary sublayer placed among a backing's composited children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SublayerKind {
    /// The layer's own foreground, above its negative z-order children.
    Foreground,
    /// Horizontal scrollbar.
    HorizontalScrollbar,
    /// Vertical scrollbar.
    VerticalScrollbar,
    /// Scroll corner.
    ScrollCorner,
}

impl SublayerKind {
    /// Short name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Foreground => "foreground",
            Self::HorizontalScrollbar => "horizontal-scrollbar",
            Self::VerticalScrollbar => "vertical-scrollbar",
            Self::ScrollCorner => "scroll-corner",
        }
    }
}

/// One entry of a composited child list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositedChild {
    /// The backing of a composited layer.
    Layer {
        /// Composited layer.
        layer: LayerId,
        /// Its surface.
        surface: SurfaceId,
    },
    /// A sublayer of the backing owning the list.
    Sublayer {
        /// Layer whose backing hosts the sublayer.
        owner: LayerId,
        /// Which sublayer.
        kind: SublayerKind,
    },
}

/// The top of the composited tree as of the last rebuild.
///
/// Children of each composited layer are available from
/// [`Backing::children`](super::Backing::children).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompositedTree {
    pub(crate) root_surface: Option<SurfaceId>,
    pub(crate) children: Vec<CompositedChild>,
}

impl CompositedTree {
    /// The root content surface, present while in compositing mode.
    #[must_use]
    pub fn root_surface(&self) -> Option<SurfaceId> {
        self.root_surface
    }

    /// Top-level composited children, hosted by the root content surface.
    #[must_use]
    pub fn children(&self) -> &[CompositedChild] {
        &self.children
    }

    /// Returns `true` if nothing is composited.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

const SCROLLBAR_SUBLAYERS: [(SublayerConfig, SublayerKind); 3] = [
    (
        SublayerConfig::HORIZONTAL_SCROLLBAR,
        SublayerKind::HorizontalScrollbar,
    ),
    (
        SublayerConfig::VERTICAL_SCROLLBAR,
        SublayerKind::VerticalScrollbar,
    ),
    (SublayerConfig::SCROLL_CORNER, SublayerKind::ScrollCorner),
];

impl Compositor {
    /// Rebuilds the composited tree from the root and attaches it to the
    /// root content surface, or leaves compositing mode if nothing is
    /// composited.
    pub(super) fn rebuild_tree(&mut self, pass: &mut Pass<'_, '_>) {
        let root = pass.tree.root();
        let mut children = Vec::new();
        self.rebuild_layer(pass, root, None, Transform3d::IDENTITY, &mut children);

        if children.is_empty() && !self.has_any_additional_composited_layers(pass.tree) {
            self.enable_compositing_mode(pass, false);
        } else if let Some(surface) = self.root_surface {
            pass.factory.set_children(surface, &children);
        }
        self.composited_tree = CompositedTree {
            root_surface: self.root_surface,
            children,
        };
    }

    fn rebuild_layer(
        &mut self,
        pass: &mut Pass<'_, '_>,
        layer: LayerId,
        compositing_ancestor: Option<LayerId>,
        parent_to_absolute: Transform3d,
        child_list: &mut Vec<CompositedChild>,
    ) {
        let tree = pass.tree;
        let to_absolute = tree.to_absolute(layer, parent_to_absolute);
        let has_backing = self.backings.contains(layer);
        let mut config = SublayerConfig::empty();
        if has_backing {
            _ = self.update_backing_geometry(pass, layer, compositing_ancestor, to_absolute);
            config = self
                .backings
                .get(layer)
                .map_or(SublayerConfig::empty(), |b| b.sublayers);
        }

        let child_ancestor = if has_backing {
            Some(layer)
        } else {
            compositing_ancestor
        };
        let mut own = Vec::new();
        {
            let list = if has_backing {
                &mut own
            } else {
                &mut *child_list
            };
            for child in tree.z_order_list(layer, ZOrderList::Negative) {
                if !tree.style(child).hidden {
                    self.rebuild_layer(pass, child, child_ancestor, to_absolute, list);
                }
            }
            if config.contains(SublayerConfig::FOREGROUND) {
                list.push(CompositedChild::Sublayer {
                    owner: layer,
                    kind: SublayerKind::Foreground,
                });
            }
            for z in [ZOrderList::NormalFlow, ZOrderList::Positive] {
                for child in tree.z_order_list(layer, z) {
                    if !tree.style(child).hidden {
                        self.rebuild_layer(pass, child, child_ancestor, to_absolute, list);
                    }
                }
            }
        }

        if !has_backing {
            return;
        }
        // Scrollbars go into the clipping or scrolling sublayer when there
        // is one, otherwise they sit on top of the backing's children.
        if !config.intersects(SublayerConfig::SCROLLBAR_HOSTS) {
            for (flag, kind) in SCROLLBAR_SUBLAYERS {
                if config.contains(flag) {
                    own.push(CompositedChild::Sublayer { owner: layer, kind });
                }
            }
        }
        if let Some(backing) = self.backings.get_mut(layer) {
            pass.factory.set_children(backing.surface, &own);
            child_list.push(CompositedChild::Layer {
                layer,
                surface: backing.surface,
            });
            backing.children = own;
        }
    }

    /// Recomputes everything cached on a backing that depends on geometry,
    /// and pushes it to the surface.
    ///
    /// Shared by the rebuild and geometry passes. Returns `true` if the
    /// sublayer configuration changed, which changes the backing's child
    /// list.
    pub(super) fn update_backing_geometry(
        &mut self,
        pass: &mut Pass<'_, '_>,
        layer: LayerId,
        compositing_ancestor: Option<LayerId>,
        to_absolute: Transform3d,
    ) -> bool {
        let tree = pass.tree;
        let bounds = self.composited_bounds(tree, layer);
        let config = self.sublayer_config(tree, layer);
        let paints_into_composited_ancestor =
            !self.requires_own_backing_store(tree, layer, compositing_ancestor);
        let draws_content = !paints_into_composited_ancestor && tree.style(layer).has_visible_content;
        let replica = tree.reflection(layer).filter(|r| self.backings.contains(*r));

        let Some(backing) = self.backings.get_mut(layer) else {
            return false;
        };
        let config_changed = backing.sublayers != config;
        backing.composited_bounds = bounds;
        backing.to_absolute = to_absolute;
        backing.sublayers = config;
        backing.paints_into_composited_ancestor = paints_into_composited_ancestor;
        backing.draws_content = draws_content;
        backing.replica = replica;
        let surface = backing.surface;

        if config_changed {
            pass.factory.set_sublayers(surface, config);
        }
        pass.factory.set_geometry(
            surface,
            &SurfaceGeometry {
                bounds,
                to_absolute,
            },
        );

        // A replica mirrors its source's content, offset by its own position.
        if let Some(reflection) = replica {
            let reflection_to_absolute = tree.to_absolute(reflection, to_absolute);
            if let Some(rb) = self.backings.get_mut(reflection) {
                rb.composited_bounds = bounds;
                rb.to_absolute = reflection_to_absolute;
                pass.factory.set_geometry(
                    rb.surface,
                    &SurfaceGeometry {
                        bounds,
                        to_absolute: reflection_to_absolute,
                    },
                );
            }
        }

        self.viewport.update_status(tree, &self.backings, layer);
        config_changed
    }

    /// Own bounds united with every non-composited descendant that paints
    /// into this layer, in the layer's coordinates.
    ///
    /// A clipping layer's descendants cannot extend past its own bounds.
    pub(super) fn composited_bounds(&self, tree: &LayerTree, layer: LayerId) -> Rect {
        let mut bounds = tree.bounds(layer);
        if !tree.style(layer).clips_descendants {
            self.unite_descendant_bounds(tree, layer, Transform3d::IDENTITY, &mut bounds);
        }
        bounds
    }

    fn unite_descendant_bounds(
        &self,
        tree: &LayerTree,
        layer: LayerId,
        to_layer: Transform3d,
        acc: &mut Rect,
    ) {
        for child in tree.paint_order_children(layer) {
            let style = tree.style(child);
            if style.hidden || self.backings.contains(child) {
                continue;
            }
            let child_to_layer = tree.to_absolute(child, to_layer);
            *acc = acc.union(child_to_layer.map_rect(tree.bounds(child)));
            if !style.clips_descendants {
                self.unite_descendant_bounds(tree, child, child_to_layer, acc);
            }
        }
    }
}
