//! A [`Layer`] paired with a validated [`Mask`] (§4.5). `check_mask`
//! resolves a `Grid` mask into an equivalent `Box` mask sized from the
//! layer's own cell pitch, and rejects masks that are wider than the
//! layer's extent on any periodic axis (an oversized mask would make the
//! ghost-copy traversal in [`crate::ntree`] double-count candidates) unless
//! `allow_oversized` is set.

use crate::error::{ConnectError, ConnectResult};
use crate::geometry::{Periodicity, Position};
use crate::layer::Layer;
use crate::mask::Mask;
use crate::sink::NodeId;

pub struct MaskedLayer<'a> {
    layer: &'a Layer,
    mask: Mask,
    /// The extent/periodicity used to interpret the mask's reach. Equal to
    /// `layer`'s own extent/periodicity in direct mode; substituted with
    /// the *other* layer's in converse mode (§4.5).
    metric_extent: Position,
    metric_periodic: Periodicity,
}

impl<'a> MaskedLayer<'a> {
    /// Direct attachment: `mask` is defined in `layer`'s own frame.
    pub fn new(layer: &'a Layer, mask: Mask, allow_oversized: bool) -> ConnectResult<Self> {
        let mask = check_mask(layer, mask, &layer.extent, layer.periodic, allow_oversized)?;
        Ok(Self { layer, mask, metric_extent: layer.extent, metric_periodic: layer.periodic })
    }

    /// Converse attachment (§4.7.2's source-driven strategy): `mask` is
    /// defined in `frame_layer`'s frame (typically the target layer) but
    /// queried against `layer`'s (typically the source layer's) position
    /// store. The mask is mirrored through the origin and `frame_layer`'s
    /// periodicity/extent govern wraparound instead of `layer`'s own.
    pub fn new_converse(layer: &'a Layer, frame_layer: &Layer, mask: Mask, allow_oversized: bool) -> ConnectResult<Self> {
        if layer.dim() != frame_layer.dim() {
            return Err(ConnectError::DimensionMismatch { context: "MaskedLayer::new_converse".into(), expected: layer.dim(), found: frame_layer.dim() });
        }
        let mask = check_mask(frame_layer, mask, &frame_layer.extent, frame_layer.periodic, allow_oversized)?;
        Ok(Self {
            layer,
            mask: Mask::converse(mask),
            metric_extent: frame_layer.extent,
            metric_periodic: frame_layer.periodic,
        })
    }

    pub fn layer(&self) -> &Layer {
        self.layer
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    /// Candidate `(position, gid)` pairs reachable from `anchor`, i.e. every
    /// stored position inside `mask` anchored at `anchor`.
    pub fn neighbors_of(&self, anchor: &Position) -> ConnectResult<Vec<(Position, NodeId)>> {
        let anchored = Mask::anchored(self.mask.clone(), *anchor);
        self.layer.masked_iterator_with(&anchored, &self.metric_extent, self.metric_periodic)
    }
}

fn check_mask(layer: &Layer, mask: Mask, extent: &Position, periodic: Periodicity, allow_oversized: bool) -> ConnectResult<Mask> {
    let resolved = match &mask {
        Mask::Grid { shape, anchor } => resolve_grid_mask(layer, shape, anchor)?,
        _ => mask,
    };

    let dim = layer.dim();
    // `Mask::All` is the no-mask substitution (§4.7.1/§4.7.4's "iterate the
    // full position vector"); its bbox is unbounded by construction, so the
    // oversized-on-a-periodic-axis guard below would always spuriously fire.
    if !matches!(resolved, Mask::All { .. }) {
        if let Ok(bbox) = resolved.get_bbox() {
            if bbox.dim() != dim {
                return Err(ConnectError::DimensionMismatch { context: "MaskedLayer::new".into(), expected: dim, found: bbox.dim() });
            }
            if !allow_oversized && periodic.any() {
                for i in 0..dim {
                    if periodic.axis(i) && bbox.side(i) > extent.get(i) {
                        return Err(ConnectError::BadProperty(format!(
                            "mask extent on axis {i} ({:.6}) exceeds the periodic layer's extent ({:.6})",
                            bbox.side(i),
                            extent.get(i)
                        )));
                    }
                }
            }
        }
    }

    Ok(resolved)
}

/// Translate a `Grid` mask (a rectangle of cells, `shape = [rows, cols]`,
/// `anchor = [row, col]` relative to the center cell) into the equivalent
/// `Box` mask in the layer's own coordinate system. Only defined against a
/// `Grid`-kind layer of dimension 2 since cell pitch is otherwise undefined.
fn resolve_grid_mask(layer: &Layer, shape: &[usize], anchor: &[i64]) -> ConnectResult<Mask> {
    let (rows, columns) = match &layer.kind {
        crate::layer::LayerKind::Grid { rows, columns } => (*rows, *columns),
        crate::layer::LayerKind::Free => {
            return Err(ConnectError::BadProperty("a Grid mask can only be used against a Grid-kind layer".into()));
        }
    };
    if layer.dim() != 2 {
        return Err(ConnectError::BadProperty("a Grid mask is only defined for 2D grid layers".into()));
    }
    if shape.len() != 2 || anchor.len() != 2 {
        return Err(ConnectError::BadProperty("a Grid mask requires shape and anchor of length 2".into()));
    }

    let dx = layer.extent.get(0) / columns as f64;
    let dy = layer.extent.get(1) / rows as f64;
    let width = shape[1] as f64 * dx;
    let height = shape[0] as f64 * dy;

    // Matrix convention: grid row increases downward, but the spatial y axis
    // increases upward, so the row component of the anchor flips sign.
    let center_x = anchor[1] as f64 * dx;
    let center_y = -(anchor[0] as f64) * dy;

    Ok(Mask::Box {
        lower_left: Position::D2([center_x - width / 2.0, center_y - height / 2.0]),
        upper_right: Position::D2([center_x + width / 2.0, center_y + height / 2.0]),
        azimuth: 0.0,
        polar: 0.0,
    })
}
