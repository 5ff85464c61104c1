// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compositing decisions and composited-tree maintenance.
//!
//! A [`Compositor`] owns everything that outlives one update: whether the
//! document is in compositing mode, one [`Backing`] per composited layer, the
//! root content surface, and the registry of viewport-constrained layers.
//! Each [`update`](Compositor::update) runs up to three passes over a
//! [`LayerTree`]:
//!
//! 1. **Requirements** (`requirements.rs`): visits layers in paint order,
//!    computes [`CompositingReasons`] with overlap testing, and creates or
//!    destroys backings bottom-up.
//! 2. **Rebuild** (`rebuild.rs`): collects the composited children of every
//!    backing, mirroring paint order but skipping non-composited layers.
//! 3. **Geometry** (`geometry_update.rs`): repositions existing backings
//!    without touching membership or topology.
//!
//! Which passes run depends on the [`UpdateType`]. A style change checks and
//! rebuilds the hierarchy, layout checks it and rebuilds only if a backing
//! changed, and a composited scroll only updates geometry.
//!
//! Everything the host must react to is reported in [`CompositingChanges`].

mod backing;
mod geometry_update;
mod rebuild;
mod requirements;
mod viewport;

use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use crate::error::{CompositingError, SurfaceError};
use crate::layer::{LayerId, LayerTree, Position, SurfaceId, TreeChanges};
use crate::reasons::{CompositingReasons, ReasonContext, ViewportConstrainedNotCompositedReason};
use crate::settings::{CompositorSettings, EffectiveFlags};
use crate::surface::SurfaceFactory;
use crate::trace::{
    BackingChangeEvent, BackingChangeKind, CompositingModeEvent, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, Tracer, UpdateBeginEvent, UpdateSummaryBuilder,
};

pub use backing::{Backing, SublayerConfig};
pub use rebuild::{CompositedChild, CompositedTree, SublayerKind};
pub use viewport::{
    FixedPositionViewportConstraints, StickyPositionViewportConstraints,
    ViewportConstrainedRegistry,
};

use backing::BackingStore;

/// Why an update runs, which decides the passes it performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateType {
    /// Style changed: recompute requirements and rebuild the tree.
    AfterStyleChange,
    /// Layout finished: recompute requirements, rebuild if any backing
    /// changed, otherwise update geometry.
    AfterLayout,
    /// The frame scrolled on the main thread. Overlap can change with
    /// scrolling, so requirements are recomputed too.
    OnScroll,
    /// A scroll handled by the compositor: geometry only.
    OnCompositedScroll,
}

impl UpdateType {
    /// Picks the cheapest update that absorbs the drained changes, or `None`
    /// if nothing changed.
    #[must_use]
    pub fn for_changes(changes: &TreeChanges) -> Option<Self> {
        if !changes.style.is_empty() || !changes.topology.is_empty() || !changes.removed.is_empty()
        {
            Some(Self::AfterStyleChange)
        } else if !changes.geometry.is_empty() {
            Some(Self::AfterLayout)
        } else if changes.scrolled {
            Some(Self::OnScroll)
        } else {
            None
        }
    }

    /// Short name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AfterStyleChange => "after-style-change",
            Self::AfterLayout => "after-layout",
            Self::OnScroll => "on-scroll",
            Self::OnCompositedScroll => "on-composited-scroll",
        }
    }

    const fn checks_hierarchy(self) -> bool {
        !matches!(self, Self::OnCompositedScroll)
    }

    const fn needs_geometry(self) -> bool {
        matches!(self, Self::OnScroll | Self::OnCompositedScroll)
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the root content surface is attached to its host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RootLayerAttachment {
    /// Not in compositing mode.
    #[default]
    Unattached,
    /// Attached directly by the host (main frame).
    AttachedViaHost,
    /// Attached into the enclosing frame's composited tree (inner frame).
    AttachedViaEnclosingFrame,
}

/// The surface a repaint must be issued against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RepaintContainer {
    /// The document's own painting surface.
    Document,
    /// The backing of a composited layer.
    Layer(LayerId),
}

/// A region to repaint because a layer moved between surfaces.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Repaint {
    /// The layer whose compositing status changed.
    pub layer: LayerId,
    /// Where its content now paints, or painted before promotion.
    pub container: RepaintContainer,
    /// The layer and its non-composited descendants, in document
    /// coordinates.
    pub rect: Rect,
}

/// Everything an update (or a single-layer operation) changed.
///
/// Layers are listed in the order they were processed. Compositing mode may
/// be entered and left within one update, in which case both flags are set.
#[derive(Clone, Debug, Default)]
pub struct CompositingChanges {
    /// Layers that got a backing.
    pub promoted: Vec<LayerId>,
    /// Layers that lost their backing.
    pub demoted: Vec<LayerId>,
    /// Regions to repaint because content moved between surfaces.
    pub repaints: Vec<Repaint>,
    /// Layers whose cached repaint rects (and their descendants') must be
    /// recomputed.
    pub repaint_rects_recomputed: Vec<LayerId>,
    /// Layers whose cached clip rects (and their descendants') are stale.
    pub clip_rects_invalidated: Vec<LayerId>,
    /// A fixed-position layer changed status; fast-path scrolling
    /// eligibility must be re-evaluated.
    pub fixed_objects_changed: bool,
    /// The root layer's backing changed identity in an inner frame.
    pub root_changed: bool,
    /// The document entered compositing mode.
    pub entered_compositing_mode: bool,
    /// The document left compositing mode.
    pub exited_compositing_mode: bool,
    /// The root content surface attachment changed to this value.
    pub attachment: Option<RootLayerAttachment>,
    /// Surfaces that could not be allocated.
    pub allocation_failures: Vec<(LayerId, SurfaceError)>,
    /// The update did nothing because layout is pending.
    pub skipped_for_layout: bool,
    /// The composited tree was rebuilt.
    pub rebuilt: bool,
    /// Only geometry was updated.
    pub geometry_updated: bool,
}

impl CompositingChanges {
    /// Clears all fields, retaining allocated capacity.
    pub fn clear(&mut self) {
        self.promoted.clear();
        self.demoted.clear();
        self.repaints.clear();
        self.repaint_rects_recomputed.clear();
        self.clip_rects_invalidated.clear();
        self.fixed_objects_changed = false;
        self.root_changed = false;
        self.entered_compositing_mode = false;
        self.exited_compositing_mode = false;
        self.attachment = None;
        self.allocation_failures.clear();
        self.skipped_for_layout = false;
        self.rebuilt = false;
        self.geometry_updated = false;
    }
}

/// Per-layer decisions of the last requirements pass.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct LayerRecord {
    owner: Option<LayerId>,
    pub(crate) reasons: CompositingReasons,
    pub(crate) has_compositing_descendant: bool,
    pub(crate) not_composited: ViewportConstrainedNotCompositedReason,
    pub(crate) allocation_failed: bool,
}

/// Slot-indexed [`LayerRecord`]s. A record whose owner does not match the
/// queried handle reads as default.
#[derive(Debug, Default)]
pub(crate) struct Records {
    slots: Vec<LayerRecord>,
}

impl Records {
    pub(crate) fn get(&self, id: LayerId) -> LayerRecord {
        match self.slots.get(id.index() as usize) {
            Some(r) if r.owner == Some(id) => *r,
            _ => LayerRecord::default(),
        }
    }

    pub(crate) fn get_mut(&mut self, id: LayerId) -> &mut LayerRecord {
        let i = id.index() as usize;
        if self.slots.len() <= i {
            self.slots.resize_with(i + 1, LayerRecord::default);
        }
        let record = &mut self.slots[i];
        if record.owner != Some(id) {
            *record = LayerRecord {
                owner: Some(id),
                ..LayerRecord::default()
            };
        }
        record
    }

    fn clear_allocation_failures(&mut self) {
        for r in &mut self.slots {
            r.allocation_failed = false;
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Borrowed inputs and outputs of one update or single-layer operation.
pub(crate) struct Pass<'p, 't> {
    pub(crate) tree: &'p LayerTree,
    pub(crate) factory: &'p mut dyn SurfaceFactory,
    pub(crate) changes: &'p mut CompositingChanges,
    pub(crate) tracer: &'p mut Tracer<'t>,
    pub(crate) update_index: u64,
    summary: Option<UpdateSummaryBuilder>,
    /// Layers promoted after their descendants were visited.
    pub(crate) late_promoted: Vec<LayerId>,
    /// A backing was created or destroyed.
    pub(crate) layers_changed: bool,
}

impl fmt::Debug for Pass<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pass")
            .field("update_index", &self.update_index)
            .field("layers_changed", &self.layers_changed)
            .finish_non_exhaustive()
    }
}

impl Pass<'_, '_> {
    pub(crate) fn backing_changed(
        &mut self,
        layer: LayerId,
        kind: BackingChangeKind,
        reasons: CompositingReasons,
    ) {
        self.tracer.backing_change(&BackingChangeEvent {
            update_index: self.update_index,
            layer,
            kind,
            reasons,
        });
        if let Some(summary) = &mut self.summary {
            summary.backing_change(kind);
        }
    }

    fn phase_begin(&mut self, phase: PhaseKind) {
        self.tracer.phase_begin(&PhaseBeginEvent {
            update_index: self.update_index,
            phase,
        });
        if let Some(summary) = &mut self.summary {
            summary.phase(phase);
        }
    }

    fn phase_end(&mut self, phase: PhaseKind) {
        self.tracer.phase_end(&PhaseEndEvent {
            update_index: self.update_index,
            phase,
        });
    }
}

/// Decides which layers are composited and maintains their backings and the
/// composited tree.
///
/// A compositor serves one [`LayerTree`]. Updates are synchronous and not
/// re-entrant.
#[derive(Debug)]
pub struct Compositor {
    settings: CompositorSettings,
    flags: EffectiveFlags,
    compositing: bool,
    needs_rebuild: bool,
    reevaluate_after_layout: bool,
    in_post_layout_update: bool,
    in_update: bool,
    update_index: u64,
    pub(crate) records: Records,
    pub(crate) backings: BackingStore,
    viewport: ViewportConstrainedRegistry,
    root_surface: Option<SurfaceId>,
    attachment: RootLayerAttachment,
    composited_tree: CompositedTree,
}

impl Compositor {
    /// Creates a compositor that is not in compositing mode.
    #[must_use]
    pub fn new(settings: CompositorSettings) -> Self {
        Self {
            settings,
            flags: settings.effective(&crate::layer::FrameView::default()),
            compositing: false,
            needs_rebuild: false,
            reevaluate_after_layout: false,
            in_post_layout_update: false,
            in_update: false,
            update_index: 0,
            records: Records::default(),
            backings: BackingStore::default(),
            viewport: ViewportConstrainedRegistry::default(),
            root_surface: None,
            attachment: RootLayerAttachment::Unattached,
            composited_tree: CompositedTree::default(),
        }
    }

    /// Returns the current settings.
    #[must_use]
    pub fn settings(&self) -> &CompositorSettings {
        &self.settings
    }

    /// Replaces the settings. Takes effect on the next update, which rebuilds
    /// the hierarchy if the effective flags changed.
    pub fn set_settings(&mut self, settings: CompositorSettings) {
        self.settings = settings;
    }

    // -- Updates --

    /// Runs an update of the given type.
    ///
    /// Returns [`CompositingError::UpdateInProgress`] if a previous update
    /// did not run to completion. While the frame needs layout the update
    /// does nothing and reports
    /// [`skipped_for_layout`](CompositingChanges::skipped_for_layout).
    pub fn update(
        &mut self,
        tree: &LayerTree,
        update_type: UpdateType,
        factory: &mut dyn SurfaceFactory,
    ) -> Result<CompositingChanges, CompositingError> {
        self.update_traced(tree, update_type, factory, &mut Tracer::none())
    }

    /// Like [`update`](Self::update), emitting trace events to `tracer`.
    pub fn update_traced(
        &mut self,
        tree: &LayerTree,
        update_type: UpdateType,
        factory: &mut dyn SurfaceFactory,
        tracer: &mut Tracer<'_>,
    ) -> Result<CompositingChanges, CompositingError> {
        if self.in_update {
            return Err(CompositingError::UpdateInProgress);
        }
        let mut changes = CompositingChanges::default();
        if tree.frame().needs_layout {
            log::debug!("skipping {update_type} update: layout pending");
            changes.skipped_for_layout = true;
            return Ok(changes);
        }

        self.in_update = true;
        self.update_index += 1;
        self.cache_flags(tree);

        let begin = UpdateBeginEvent {
            update_index: self.update_index,
            update_type,
            in_compositing_mode: self.compositing,
        };
        tracer.update_begin(&begin);
        let mut pass = Pass {
            tree,
            factory,
            changes: &mut changes,
            tracer,
            update_index: self.update_index,
            summary: Some(UpdateSummaryBuilder::new(&begin)),
            late_promoted: Vec::new(),
            layers_changed: false,
        };

        self.release_orphans(&mut pass);

        if self.flags.force_compositing_mode && !self.compositing {
            self.enable_compositing_mode(&mut pass, true);
        }

        let check_hierarchy = update_type.checks_hierarchy() || self.reevaluate_after_layout;
        let mut needs_hierarchy = self.needs_rebuild
            || pass.layers_changed
            || update_type == UpdateType::AfterStyleChange;
        self.needs_rebuild = false;
        if update_type == UpdateType::AfterLayout {
            self.reevaluate_after_layout = false;
        }
        // Updates only run with layout up to date.
        self.in_post_layout_update = true;
        log::debug!(
            "update #{} ({update_type}): hierarchy check={check_hierarchy}",
            self.update_index
        );

        if check_hierarchy {
            pass.phase_begin(PhaseKind::Requirements);
            self.compute_requirements(&mut pass);
            pass.phase_end(PhaseKind::Requirements);
            needs_hierarchy |= pass.layers_changed;
        }

        if !self.flags.accelerated {
            self.release_all_backings(&mut pass);
            self.enable_compositing_mode(&mut pass, false);
        } else if needs_hierarchy {
            self.run_rebuild(&mut pass);
        } else if self.compositing && (update_type.needs_geometry() || check_hierarchy) {
            pass.phase_begin(PhaseKind::Geometry);
            let config_changed = self.update_layer_tree_geometry(&mut pass);
            pass.phase_end(PhaseKind::Geometry);
            pass.changes.geometry_updated = true;
            if config_changed {
                self.run_rebuild(&mut pass);
            }
        }

        self.in_post_layout_update = false;
        if let Some(builder) = pass.summary.take() {
            let composited = u32::try_from(self.backings.len()).unwrap_or(u32::MAX);
            let summary = builder.finish(composited, self.compositing);
            pass.tracer.update_summary(&summary);
        }
        self.in_update = false;
        Ok(changes)
    }

    /// Drains the tree's dirty channels and runs the update they call for.
    ///
    /// Nothing is drained while the frame needs layout, so no change is
    /// lost.
    pub fn update_for_changes(
        &mut self,
        tree: &mut LayerTree,
        factory: &mut dyn SurfaceFactory,
    ) -> Result<CompositingChanges, CompositingError> {
        if self.in_update {
            return Err(CompositingError::UpdateInProgress);
        }
        if tree.frame().needs_layout {
            return Ok(CompositingChanges {
                skipped_for_layout: true,
                ..CompositingChanges::default()
            });
        }
        let drained = tree.drain_changes();
        if !drained.topology.is_empty() || !drained.removed.is_empty() {
            self.needs_rebuild = true;
        }
        match UpdateType::for_changes(&drained) {
            Some(update_type) => self.update(tree, update_type, factory),
            None => Ok(CompositingChanges::default()),
        }
    }

    fn run_rebuild(&mut self, pass: &mut Pass<'_, '_>) {
        pass.phase_begin(PhaseKind::Rebuild);
        self.rebuild_tree(pass);
        pass.phase_end(PhaseKind::Rebuild);
        pass.changes.rebuilt = true;
    }

    fn cache_flags(&mut self, tree: &LayerTree) {
        let flags = self.settings.effective(tree.frame());
        if flags != self.flags {
            log::debug!(
                "compositing flags changed: accelerated={} forced={}",
                flags.accelerated,
                flags.force_compositing_mode
            );
            self.flags = flags;
            self.needs_rebuild = true;
        }
    }

    // -- Single-layer operations --

    /// Re-evaluates one layer's backing after its style changed, outside a
    /// full update, and schedules a rebuild.
    ///
    /// Decisions that depend on layout keep the layer's current status.
    pub fn layer_style_changed(
        &mut self,
        tree: &LayerTree,
        layer: LayerId,
        factory: &mut dyn SurfaceFactory,
    ) -> Result<CompositingChanges, CompositingError> {
        if self.in_update {
            return Err(CompositingError::UpdateInProgress);
        }
        let mut changes = CompositingChanges::default();
        self.with_pass(tree, factory, &mut changes, |this, pass| {
            if this.update_backing(pass, layer) {
                this.needs_rebuild = true;
            }
            if let Some(reflection) = tree.reflection(layer) {
                this.records.get_mut(reflection).reasons = if this.backings.contains(layer) {
                    CompositingReasons::REFLECTION_OF_COMPOSITED_PARENT
                } else {
                    CompositingReasons::empty()
                };
                _ = this.update_backing(pass, reflection);
            }
            if this.backings.contains(layer) {
                this.viewport.update_status(tree, &this.backings, layer);
            }
            this.needs_rebuild = true;
        });
        Ok(changes)
    }

    /// Detaches a layer that is about to leave the tree.
    ///
    /// Repaints its area through its composited ancestor, releases the
    /// backings of the layer, its reflection and its descendants, and
    /// schedules a rebuild. Does nothing for a non-composited layer.
    pub fn layer_will_be_removed(
        &mut self,
        tree: &LayerTree,
        layer: LayerId,
        factory: &mut dyn SurfaceFactory,
    ) -> Result<CompositingChanges, CompositingError> {
        if self.in_update {
            return Err(CompositingError::UpdateInProgress);
        }
        let mut changes = CompositingChanges::default();
        if !self.backings.contains(layer) {
            return Ok(changes);
        }
        self.with_pass(tree, factory, &mut changes, |this, pass| {
            this.viewport.remove(layer);
            let container = tree
                .parent(layer)
                .map_or(RepaintContainer::Document, |p| this.repaint_container(tree, p));
            let rect = tree
                .absolute_transform(layer)
                .map_rect(this.composited_bounds(tree, layer));
            pass.changes.repaints.push(Repaint {
                layer,
                container,
                rect,
            });
            this.clear_backing_including_descendants(pass, layer);
            this.needs_rebuild = true;
        });
        Ok(changes)
    }

    /// Releases every backing. Compositing mode and the root content surface
    /// are kept; the next update decides again.
    ///
    /// Also recovers from an update that did not run to completion.
    pub fn clear_backing_for_all_layers(
        &mut self,
        tree: &LayerTree,
        factory: &mut dyn SurfaceFactory,
    ) -> CompositingChanges {
        self.in_update = false;
        let mut changes = CompositingChanges::default();
        self.with_pass(tree, factory, &mut changes, |this, pass| {
            this.release_all_backings(pass);
            this.needs_rebuild = true;
        });
        changes
    }

    /// Tears everything down: all backings, the root content surface and
    /// per-layer state. The compositor can be reused afterwards.
    pub fn detach(
        &mut self,
        tree: &LayerTree,
        factory: &mut dyn SurfaceFactory,
    ) -> CompositingChanges {
        self.in_update = false;
        let mut changes = CompositingChanges::default();
        self.with_pass(tree, factory, &mut changes, |this, pass| {
            this.release_all_backings(pass);
            this.enable_compositing_mode(pass, false);
            this.viewport.clear();
            this.records.clear();
            this.reevaluate_after_layout = false;
            this.needs_rebuild = false;
        });
        changes
    }

    fn with_pass(
        &mut self,
        tree: &LayerTree,
        factory: &mut dyn SurfaceFactory,
        changes: &mut CompositingChanges,
        f: impl FnOnce(&mut Self, &mut Pass<'_, '_>),
    ) {
        self.in_update = true;
        let mut tracer = Tracer::none();
        let mut pass = Pass {
            tree,
            factory,
            changes,
            tracer: &mut tracer,
            update_index: self.update_index,
            summary: None,
            late_promoted: Vec::new(),
            layers_changed: false,
        };
        f(self, &mut pass);
        self.in_update = false;
    }

    fn clear_backing_including_descendants(&mut self, pass: &mut Pass<'_, '_>, layer: LayerId) {
        let tree = pass.tree;
        self.release_backing(pass, layer);
        if let Some(reflection) = tree.reflection(layer) {
            self.release_backing(pass, reflection);
        }
        for child in tree.paint_order_children(layer) {
            self.clear_backing_including_descendants(pass, child);
        }
    }

    fn release_all_backings(&mut self, pass: &mut Pass<'_, '_>) {
        self.release_orphans(pass);
        for layer in self.backings.layers() {
            self.release_backing(pass, layer);
        }
        self.composited_tree.children.clear();
    }

    // -- Compositing mode --

    pub(crate) fn enable_compositing_mode(&mut self, pass: &mut Pass<'_, '_>, enable: bool) {
        if enable == self.compositing {
            return;
        }
        self.compositing = enable;
        log::debug!(
            "{} compositing mode",
            if enable { "entering" } else { "leaving" }
        );
        if enable {
            self.ensure_root_layer(pass);
            pass.changes.entered_compositing_mode = true;
        } else {
            self.destroy_root_layer(pass);
            pass.changes.exited_compositing_mode = true;
        }
        pass.tracer.compositing_mode(&CompositingModeEvent {
            update_index: pass.update_index,
            enabled: enable,
        });
    }

    fn ensure_root_layer(&mut self, pass: &mut Pass<'_, '_>) {
        let expected = if self.settings.is_main_frame {
            RootLayerAttachment::AttachedViaHost
        } else {
            RootLayerAttachment::AttachedViaEnclosingFrame
        };
        if self.root_surface.is_none() {
            match pass.factory.create_root_surface() {
                Ok(surface) => self.root_surface = Some(surface),
                Err(err) => {
                    log::warn!("root content surface unavailable: {err}");
                    return;
                }
            }
        }
        if self.attachment != expected {
            log::debug!("attaching root content surface ({expected:?})");
            self.attachment = expected;
            pass.changes.attachment = Some(expected);
        }
    }

    fn destroy_root_layer(&mut self, pass: &mut Pass<'_, '_>) {
        if let Some(surface) = self.root_surface.take() {
            pass.factory.destroy_surface(surface);
        }
        if self.attachment != RootLayerAttachment::Unattached {
            log::debug!("detaching root content surface");
            self.attachment = RootLayerAttachment::Unattached;
            pass.changes.attachment = Some(RootLayerAttachment::Unattached);
        }
        self.composited_tree = CompositedTree::default();
    }

    /// Backings not reached by the traversal (e.g. in hidden subtrees) keep
    /// the document in compositing mode.
    pub(crate) fn has_any_additional_composited_layers(&self, tree: &LayerTree) -> bool {
        self.backings.len() > usize::from(self.backings.contains(tree.root()))
    }

    pub(crate) fn reason_context<'a>(&'a self, tree: &'a LayerTree) -> ReasonContext<'a> {
        ReasonContext {
            tree,
            settings: &self.settings,
            compositing_mode: self.compositing,
            in_post_layout_update: self.in_post_layout_update,
        }
    }

    // -- Queries --

    /// Returns `true` while the document is in compositing mode.
    #[must_use]
    pub fn in_compositing_mode(&self) -> bool {
        self.compositing
    }

    /// How the root content surface is attached.
    #[must_use]
    pub fn root_layer_attachment(&self) -> RootLayerAttachment {
        self.attachment
    }

    /// The root content surface, present while in compositing mode.
    #[must_use]
    pub fn root_surface(&self) -> Option<SurfaceId> {
        self.root_surface
    }

    /// The composited tree as of the last rebuild.
    #[must_use]
    pub fn composited_tree(&self) -> &CompositedTree {
        &self.composited_tree
    }

    /// Returns `true` if the layer has a backing.
    #[must_use]
    pub fn has_backing(&self, layer: LayerId) -> bool {
        self.backings.contains(layer)
    }

    /// Returns the layer's backing, if it is composited.
    #[must_use]
    pub fn backing(&self, layer: LayerId) -> Option<&Backing> {
        self.backings.get(layer)
    }

    /// All backings, in slot order.
    pub fn backings(&self) -> impl Iterator<Item = &Backing> {
        self.backings.iter()
    }

    /// Number of composited layers.
    #[must_use]
    pub fn composited_layer_count(&self) -> usize {
        self.backings.len()
    }

    /// Reasons recorded for the layer by the last requirements pass.
    #[must_use]
    pub fn reasons(&self, layer: LayerId) -> CompositingReasons {
        self.records.get(layer).reasons
    }

    /// Whether the last requirements pass found composited descendants.
    #[must_use]
    pub fn has_compositing_descendant(&self, layer: LayerId) -> bool {
        self.records.get(layer).has_compositing_descendant
    }

    /// Why a fixed-position layer was last left non-composited.
    #[must_use]
    pub fn viewport_constrained_not_composited_reason(
        &self,
        layer: LayerId,
    ) -> ViewportConstrainedNotCompositedReason {
        self.records.get(layer).not_composited
    }

    /// Some decision was deferred until layout completes.
    #[must_use]
    pub fn needs_reevaluation_after_layout(&self) -> bool {
        self.reevaluate_after_layout
    }

    /// Whether the layer must be composited, from its current direct reasons
    /// and the indirect reasons recorded by the last requirements pass.
    #[must_use]
    pub fn needs_to_be_composited(&self, tree: &LayerTree, layer: LayerId) -> bool {
        self.needs_to_be_composited_in(tree, layer)
    }

    /// Whether any layer has 3D content.
    #[must_use]
    pub fn has_3d_content(&self, tree: &LayerTree) -> bool {
        self.layer_has_3d_content(tree, tree.root())
    }

    /// Root-most composited fixed and sticky layers.
    #[must_use]
    pub fn viewport_constrained_layers(&self) -> &ViewportConstrainedRegistry {
        &self.viewport
    }

    /// Viewport constraints of a composited fixed-position layer.
    #[must_use]
    pub fn fixed_viewport_constraints(
        &self,
        tree: &LayerTree,
        layer: LayerId,
    ) -> Option<FixedPositionViewportConstraints> {
        (self.backings.contains(layer) && tree.style(layer).position == Position::Fixed)
            .then(|| FixedPositionViewportConstraints::compute(tree, layer))
    }

    /// Viewport constraints of a composited sticky layer.
    #[must_use]
    pub fn sticky_viewport_constraints(
        &self,
        tree: &LayerTree,
        layer: LayerId,
    ) -> Option<StickyPositionViewportConstraints> {
        (self.backings.contains(layer) && tree.style(layer).position == Position::Sticky)
            .then(|| StickyPositionViewportConstraints::compute(tree, layer))
    }
}
