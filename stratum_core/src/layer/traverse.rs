// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Z-order list iteration.

use core::iter::Chain;
use core::slice;

use super::id::LayerId;
use super::store::LayerTree;

/// Which of a stacking container's three child lists a layer lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ZOrderList {
    /// Positioned descendants with negative `z-index`, painted below the
    /// container's own content.
    Negative,
    /// In-flow descendants, painted in tree order.
    NormalFlow,
    /// Positioned descendants with `z-index >= 0`, painted above.
    Positive,
}

impl ZOrderList {
    /// All lists in paint order.
    pub const PAINT_ORDER: [Self; 3] = [Self::Negative, Self::NormalFlow, Self::Positive];

    pub(crate) const fn slot(self) -> usize {
        match self {
            Self::Negative => 0,
            Self::NormalFlow => 1,
            Self::Positive => 2,
        }
    }
}

/// An iterator over one z-order list of a layer.
///
/// Created by [`LayerTree::z_order_list`].
#[derive(Debug)]
pub struct ZOrderIter<'a> {
    tree: &'a LayerTree,
    inner: slice::Iter<'a, u32>,
}

impl<'a> ZOrderIter<'a> {
    pub(crate) fn new(tree: &'a LayerTree, list: &'a [u32]) -> Self {
        Self {
            tree,
            inner: list.iter(),
        }
    }
}

impl Iterator for ZOrderIter<'_> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        self.inner.next().map(|&idx| self.tree.id_at(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ZOrderIter<'_> {}

/// An iterator over all children of a layer in paint order: negative z-order
/// list, then normal flow, then positive z-order list.
///
/// Created by [`LayerTree::paint_order_children`].
#[derive(Debug)]
pub struct PaintOrder<'a> {
    inner: Chain<Chain<ZOrderIter<'a>, ZOrderIter<'a>>, ZOrderIter<'a>>,
}

impl<'a> PaintOrder<'a> {
    pub(crate) fn new(neg: ZOrderIter<'a>, normal: ZOrderIter<'a>, pos: ZOrderIter<'a>) -> Self {
        Self {
            inner: neg.chain(normal).chain(pos),
        }
    }
}

impl Iterator for PaintOrder<'_> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        self.inner.next()
    }
}
