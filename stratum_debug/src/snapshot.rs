// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON snapshot of compositing state.
//!
//! [`snapshot`] captures, for every layer reachable in paint order, the
//! reasons recorded by the last update and the state of its backing, plus
//! the top of the composited tree. [`dump`] writes the same value as
//! pretty-printed JSON.

use std::io::{self, Write};

use kurbo::Rect;
use serde_json::{Value, json};

use stratum_core::compositor::{CompositedChild, Compositor};
use stratum_core::layer::{LayerId, LayerTree};

/// Captures the compositing state of `tree` as a JSON value.
#[must_use]
pub fn snapshot(compositor: &Compositor, tree: &LayerTree) -> Value {
    let mut layers = Vec::new();
    collect(compositor, tree, tree.root(), &mut layers);
    let composited = compositor.composited_tree();
    json!({
        "compositing": compositor.in_compositing_mode(),
        "attachment": format!("{:?}", compositor.root_layer_attachment()),
        "root_surface": composited.root_surface().map(|s| s.0),
        "children": composited.children().iter().map(child).collect::<Vec<_>>(),
        "viewport_constrained": compositor
            .viewport_constrained_layers()
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>(),
        "layers": layers,
    })
}

/// Writes [`snapshot`] as pretty-printed JSON.
pub fn dump(compositor: &Compositor, tree: &LayerTree, writer: &mut dyn Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, &snapshot(compositor, tree))?;
    writeln!(writer)
}

fn collect(compositor: &Compositor, tree: &LayerTree, layer: LayerId, out: &mut Vec<Value>) {
    let mut entry = json!({
        "layer": layer.to_string(),
        "reasons": compositor.reasons(layer).describe().collect::<Vec<_>>(),
        "has_compositing_descendant": compositor.has_compositing_descendant(layer),
        "backing": Value::Null,
    });
    if let Some(b) = compositor.backing(layer) {
        entry["backing"] = json!({
            "surface": b.surface().0,
            "bounds": rect(b.composited_bounds()),
            "sublayers": b.sublayers().iter_names().map(|(n, _)| n).collect::<Vec<_>>(),
            "paints_into_composited_ancestor": b.paints_into_composited_ancestor(),
            "draws_content": b.draws_content(),
            "replica": b.replica().map(|r| r.to_string()),
            "children": b.children().iter().map(child).collect::<Vec<_>>(),
        });
    }
    out.push(entry);
    if let Some(reflection) = tree.reflection(layer) {
        collect(compositor, tree, reflection, out);
    }
    for c in tree.paint_order_children(layer) {
        collect(compositor, tree, c, out);
    }
}

fn child(c: &CompositedChild) -> Value {
    match *c {
        CompositedChild::Layer { layer, surface } => json!({
            "layer": layer.to_string(),
            "surface": surface.0,
        }),
        CompositedChild::Sublayer { owner, kind } => json!({
            "sublayer": kind.name(),
            "owner": owner.to_string(),
        }),
    }
}

fn rect(r: Rect) -> [f64; 4] {
    [r.x0, r.y0, r.x1, r.y1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::compositor::UpdateType;
    use stratum_core::error::SurfaceError;
    use stratum_core::layer::{LayerStyle, SurfaceId, ZOrderList};
    use stratum_core::settings::CompositorSettings;
    use stratum_core::surface::SurfaceFactory;
    use stratum_core::transform::Transform3d;

    #[derive(Default)]
    struct Counter(u32);

    impl SurfaceFactory for Counter {
        fn create_surface(&mut self, _layer: LayerId) -> Result<SurfaceId, SurfaceError> {
            self.0 += 1;
            Ok(SurfaceId(self.0))
        }

        fn create_root_surface(&mut self) -> Result<SurfaceId, SurfaceError> {
            self.0 += 1;
            Ok(SurfaceId(self.0))
        }

        fn destroy_surface(&mut self, _surface: SurfaceId) {}
    }

    #[test]
    fn snapshot_reports_backings_and_reasons() {
        let mut tree = LayerTree::new();
        let root = tree.root();
        let layer = tree.create_layer();
        tree.append_child(root, layer, ZOrderList::NormalFlow);
        tree.set_bounds(layer, Rect::new(0.0, 0.0, 20.0, 10.0));
        tree.set_style(layer, LayerStyle {
            transform: Some(Transform3d::from_translate_z(1.0)),
            ..LayerStyle::default()
        });
        let mut compositor = Compositor::new(CompositorSettings::default());
        compositor
            .update(&tree, UpdateType::AfterStyleChange, &mut Counter::default())
            .unwrap();

        let value = snapshot(&compositor, &tree);
        assert_eq!(value["compositing"], true);
        let layers = value["layers"].as_array().expect("layer list");
        assert_eq!(layers.len(), 2, "root and one child");
        let entry = &layers[1];
        assert_eq!(entry["layer"], layer.to_string());
        assert!(
            entry["reasons"]
                .as_array()
                .is_some_and(|r| !r.is_empty()),
            "got: {entry}"
        );
        assert_eq!(entry["backing"]["bounds"], json!([0.0, 0.0, 20.0, 10.0]));

        let mut out = Vec::new();
        dump(&compositor, &tree, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"attachment\": \"AttachedViaHost\""), "got: {text}");
    }
}
