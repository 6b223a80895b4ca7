//! Layers (§4.6): a spatially placed node population, either a regular
//! `Grid` or an arbitrarily placed `Free` population, plus the lazily
//! converted position cache shared by both.

use crate::error::{ConnectError, ConnectResult};
use crate::geometry::{Bounds, Periodicity, Position};
use crate::mask::Mask;
use crate::ntree::Ntree;
use crate::sink::NodeId;
use parking_lot::RwLock;

/// Which layout produced a layer's positions.
#[derive(Debug, Clone)]
pub enum LayerKind {
    /// A regular `rows x columns` grid. Row 0 is the top row: grid index
    /// `(r, c)` maps to `y = upper_right.y - (r + 0.5) * dy`, the matrix
    /// convention used throughout the grid-mask translation in
    /// [`crate::masked_layer`].
    Grid { rows: usize, columns: usize },
    /// Positions supplied directly, one per node.
    Free,
}

/// Filters `local_nodes_of_layer` by model id and/or per-node depth index
/// (when a layer stacks several nodes at the same spatial position, §4.6).
#[derive(Debug, Clone, Default)]
pub struct Selector {
    pub model_id: Option<u32>,
    pub depth: Option<u32>,
}

enum CacheState {
    Vector(Vec<(Position, NodeId)>),
    Tree(Ntree<NodeId>),
}

/// The position store backing a layer: positions are kept as a flat vector
/// until a masked query is issued, at which point they're folded into an
/// [`Ntree`] once and the tree is reused for subsequent queries.
pub struct PositionCache {
    bounds: Bounds,
    state: RwLock<CacheState>,
}

impl PositionCache {
    fn new(bounds: Bounds, positions: Vec<(Position, NodeId)>) -> Self {
        Self { bounds, state: RwLock::new(CacheState::Vector(positions)) }
    }

    fn ensure_tree(&self) {
        if matches!(&*self.state.read(), CacheState::Tree(_)) {
            return;
        }
        let mut guard = self.state.write();
        if let CacheState::Vector(positions) = &*guard {
            let mut tree = Ntree::new(self.bounds);
            for (p, id) in positions.iter().copied() {
                tree.insert(p, id);
            }
            *guard = CacheState::Tree(tree);
        }
    }

    pub fn masked_iterator(&self, mask: &Mask, extent: &Position, periodic: Periodicity) -> ConnectResult<Vec<(Position, NodeId)>> {
        self.ensure_tree();
        let guard = self.state.read();
        match &*guard {
            CacheState::Tree(tree) => Ok(tree.masked_iterator(mask, extent, periodic)?.into_iter().map(|(p, id)| (p, *id)).collect()),
            CacheState::Vector(_) => unreachable!("ensure_tree just built it"),
        }
    }

    pub fn all_positions(&self) -> Vec<(Position, NodeId)> {
        match &*self.state.read() {
            CacheState::Vector(v) => v.clone(),
            CacheState::Tree(t) => t.all().into_iter().map(|(p, id)| (p, *id)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        match &*self.state.read() {
            CacheState::Vector(v) => v.len(),
            CacheState::Tree(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A spatially placed node population. `depth` lets several nodes share the
/// same spatial position, stacked as `depth` repetitions of the same
/// row/column shape (Grid) or declared explicitly (Free); `Selector::depth`
/// filters by the resulting stack index.
pub struct Layer {
    pub kind: LayerKind,
    pub lower_left: Position,
    pub extent: Position,
    pub periodic: Periodicity,
    pub depth: u32,
    gids: Vec<NodeId>,
    positions: Vec<Position>,
    depths: Vec<u32>,
    cache: PositionCache,
}

impl Layer {
    /// A regular grid layer stacked `depth` times. `gids` is laid out with
    /// depth as the outermost index: `gids[d * rows * columns + r * columns
    /// + c]` sits at grid index `(r, c)` of stack layer `d`.
    pub fn new_grid(
        rows: usize,
        columns: usize,
        depth: u32,
        lower_left: Position,
        extent: Position,
        periodic: Periodicity,
        gids: Vec<NodeId>,
    ) -> ConnectResult<Self> {
        if rows == 0 || columns == 0 || depth == 0 {
            return Err(ConnectError::BadProperty("grid layer requires rows > 0, columns > 0 and depth > 0".into()));
        }
        let expected = rows * columns * depth as usize;
        if gids.len() != expected {
            return Err(ConnectError::BadProperty(format!(
                "grid layer expects {expected} gids (rows*columns*depth), got {}",
                gids.len()
            )));
        }
        let dim = lower_left.dim();
        if dim != extent.dim() {
            return Err(ConnectError::DimensionMismatch { context: "Layer::new_grid".into(), expected: dim, found: extent.dim() });
        }
        let dx = extent.get(0) / columns as f64;
        let dy = extent.get(1) / rows as f64;
        let mut positions = Vec::with_capacity(gids.len());
        let mut depths = Vec::with_capacity(gids.len());
        for d in 0..depth {
            for r in 0..rows {
                for c in 0..columns {
                    let x = lower_left.get(0) + (c as f64 + 0.5) * dx;
                    let y = lower_left.get(1) + extent.get(1) - (r as f64 + 0.5) * dy;
                    let p = match dim {
                        2 => Position::D2([x, y]),
                        3 => Position::D3([x, y, lower_left.get(2)]),
                        _ => unreachable!("Position only has 2 or 3 dim variants"),
                    };
                    positions.push(p);
                    depths.push(d);
                }
            }
        }
        Self::finish(LayerKind::Grid { rows, columns }, depth, lower_left, extent, periodic, gids, positions, depths)
    }

    /// A free (irregularly placed) layer; `positions.len()` must equal
    /// `gids.len()`. Every position must lie inside `[lower_left,
    /// lower_left + extent]`, and not exactly on the perimeter of a
    /// periodic axis.
    pub fn new_free(
        positions: Vec<Position>,
        lower_left: Position,
        extent: Position,
        periodic: Periodicity,
        gids: Vec<NodeId>,
    ) -> ConnectResult<Self> {
        if positions.len() != gids.len() {
            return Err(ConnectError::BadProperty(format!(
                "free layer expects one position per gid: {} positions, {} gids",
                positions.len(),
                gids.len()
            )));
        }
        let bounds = Bounds::new(lower_left, lower_left.add(&extent)?)?;
        for p in &positions {
            if !bounds.contains_point(p)? {
                return Err(ConnectError::BadProperty(format!("free layer position {p:?} lies outside the layer's extent")));
            }
            for i in 0..extent.dim() {
                if periodic.axis(i) && (p.get(i) - lower_left.get(i) < f64::EPSILON || (lower_left.get(i) + extent.get(i)) - p.get(i) < f64::EPSILON) {
                    return Err(ConnectError::BadProperty(format!(
                        "free layer position {p:?} lies on the perimeter of periodic axis {i}"
                    )));
                }
            }
        }
        let depths = vec![0u32; gids.len()];
        Self::finish(LayerKind::Free, 1, lower_left, extent, periodic, gids, positions, depths)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        kind: LayerKind,
        depth: u32,
        lower_left: Position,
        extent: Position,
        periodic: Periodicity,
        gids: Vec<NodeId>,
        positions: Vec<Position>,
        depths: Vec<u32>,
    ) -> ConnectResult<Self> {
        let bounds = Bounds::new(lower_left, lower_left.add(&extent)?)?;
        let pairs: Vec<(Position, NodeId)> = positions.iter().copied().zip(gids.iter().copied()).collect();
        Ok(Self {
            kind,
            lower_left,
            extent,
            periodic,
            depth,
            gids,
            positions,
            depths,
            cache: PositionCache::new(bounds, pairs),
        })
    }

    pub fn dim(&self) -> usize {
        self.lower_left.dim()
    }

    pub fn len(&self) -> usize {
        self.gids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gids.is_empty()
    }

    pub fn gids(&self) -> &[NodeId] {
        &self.gids
    }

    pub fn bounds(&self) -> ConnectResult<Bounds> {
        Bounds::new(self.lower_left, self.lower_left.add(&self.extent)?)
    }

    pub fn position_of(&self, node: NodeId) -> Option<Position> {
        self.gids.iter().position(|&g| g == node).map(|i| self.positions[i])
    }

    pub fn depth_of(&self, node: NodeId) -> Option<u32> {
        self.gids.iter().position(|&g| g == node).map(|i| self.depths[i])
    }

    /// All `(position, gid)` pairs inside `mask`, accounting for this
    /// layer's own periodicity.
    pub fn masked_iterator(&self, mask: &Mask) -> ConnectResult<Vec<(Position, NodeId)>> {
        self.cache.masked_iterator(mask, &self.extent, self.periodic)
    }

    /// As [`Layer::masked_iterator`], but with an externally supplied
    /// extent/periodicity instead of this layer's own — used by
    /// [`crate::masked_layer::MaskedLayer::new_converse`] to search a
    /// source layer's positions using the target layer's metric.
    pub fn masked_iterator_with(&self, mask: &Mask, extent: &Position, periodic: Periodicity) -> ConnectResult<Vec<(Position, NodeId)>> {
        self.cache.masked_iterator(mask, extent, periodic)
    }

    pub fn all_positions(&self) -> Vec<(Position, NodeId)> {
        self.cache.all_positions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::NodeId;

    #[test]
    fn grid_layer_places_row_zero_at_the_top() {
        let gids: Vec<NodeId> = (0..4).map(NodeId).collect();
        let layer = Layer::new_grid(
            2,
            2,
            1,
            Position::D2([0.0, 0.0]),
            Position::D2([2.0, 2.0]),
            Periodicity::NONE,
            gids.clone(),
        )
        .unwrap();
        let top_left = layer.position_of(NodeId(0)).unwrap();
        let bottom_left = layer.position_of(NodeId(2)).unwrap();
        assert!(top_left.get(1) > bottom_left.get(1));
    }

    #[test]
    fn grid_layer_rejects_mismatched_gid_count() {
        let gids: Vec<NodeId> = (0..3).map(NodeId).collect();
        let err = Layer::new_grid(2, 2, 1, Position::D2([0.0, 0.0]), Position::D2([1.0, 1.0]), Periodicity::NONE, gids).unwrap_err();
        assert!(matches!(err, ConnectError::BadProperty(_)));
    }

    #[test]
    fn free_layer_masked_iterator_matches_positions() {
        let gids: Vec<NodeId> = (0..3).map(NodeId).collect();
        let positions = vec![Position::D2([0.0, 0.0]), Position::D2([5.0, 5.0]), Position::D2([0.1, 0.1])];
        let layer = Layer::new_free(positions, Position::D2([0.0, 0.0]), Position::D2([10.0, 10.0]), Periodicity::NONE, gids).unwrap();
        let mask = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 1.0 };
        let found = layer.masked_iterator(&mask).unwrap();
        assert_eq!(found.len(), 2);
    }
}
