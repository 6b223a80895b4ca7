//! N-dimensional tree over node positions (§4.4): a 2^D-way spatial index
//! supporting a masked range query that accounts for periodic (toroidal)
//! layers by visiting translated ghost copies of the query mask rather than
//! duplicating data.

use crate::error::ConnectResult;
use crate::geometry::{Bounds, Periodicity, Position};
use crate::mask::Mask;

const DEFAULT_LEAF_CAPACITY: usize = 100;
const MAX_DEPTH: u32 = 32;

enum Node<V> {
    Leaf(Vec<(Position, V)>),
    Internal(Vec<(Bounds, Box<Node<V>>)>),
}

/// A spatial index over `(Position, V)` pairs confined to a known bounding
/// box. Subdivides into `2^D` children once a leaf exceeds `leaf_capacity`.
pub struct Ntree<V> {
    bounds: Bounds,
    leaf_capacity: usize,
    root: Node<V>,
    len: usize,
}

impl<V> Ntree<V> {
    pub fn new(bounds: Bounds) -> Self {
        Self::with_leaf_capacity(bounds, DEFAULT_LEAF_CAPACITY)
    }

    pub fn with_leaf_capacity(bounds: Bounds, leaf_capacity: usize) -> Self {
        Self { bounds, leaf_capacity: leaf_capacity.max(1), root: Node::Leaf(Vec::new()), len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, position: Position, value: V) {
        self.len += 1;
        insert_into(&mut self.root, self.bounds, self.leaf_capacity, 0, position, value);
    }

    /// All `(Position, &V)` pairs whose position lies inside `mask`,
    /// including periodic ghost copies of `mask` translated by multiples of
    /// `extent` along every axis in `periodic`.
    pub fn masked_iterator(&self, mask: &Mask, extent: &Position, periodic: Periodicity) -> ConnectResult<Vec<(Position, &V)>> {
        let mut out = Vec::new();
        for shift in periodic_shifts(extent, periodic)? {
            let shifted = Mask::anchored(mask.clone(), shift);
            let bbox = shifted.get_bbox()?;
            collect(&self.root, self.bounds, &shifted, &bbox, &mut out)?;
        }
        Ok(out)
    }

    /// Every stored pair, ignoring the mask. Used when the caller already
    /// knows the candidate set is small (e.g. the fixed-out-degree
    /// strategy sampling over an entire population).
    pub fn all(&self) -> Vec<(Position, &V)> {
        let mut out = Vec::new();
        collect_all(&self.root, &mut out);
        out
    }
}

fn periodic_shifts(extent: &Position, periodic: Periodicity) -> ConnectResult<Vec<Position>> {
    let dim = extent.dim();
    let mut axes_offsets: Vec<Vec<f64>> = Vec::with_capacity(dim);
    for i in 0..dim {
        if periodic.axis(i) {
            let e = extent.get(i);
            axes_offsets.push(vec![-e, 0.0, e]);
        } else {
            axes_offsets.push(vec![0.0]);
        }
    }
    let mut combos = vec![Vec::new()];
    for offsets in axes_offsets {
        let mut next = Vec::with_capacity(combos.len() * offsets.len());
        for combo in &combos {
            for o in &offsets {
                let mut c = combo.clone();
                c.push(*o);
                next.push(c);
            }
        }
        combos = next;
    }
    combos.into_iter().map(|c| Position::from_slice(&c)).collect()
}

fn insert_into<V>(node: &mut Node<V>, bounds: Bounds, leaf_capacity: usize, depth: u32, position: Position, value: V) {
    match node {
        Node::Leaf(items) => {
            if items.len() < leaf_capacity || depth >= MAX_DEPTH {
                items.push((position, value));
                return;
            }
            let mut drained: Vec<(Position, V)> = std::mem::take(items).into_iter().collect();
            drained.push((position, value));
            *node = Node::Internal(subdivide(bounds));
            if let Node::Internal(children) = node {
                for (p, v) in drained {
                    let idx = child_index(&children.iter().map(|(b, _)| *b).collect::<Vec<_>>(), &p);
                    insert_into(&mut children[idx].1, children[idx].0, leaf_capacity, depth + 1, p, v);
                }
            }
        }
        Node::Internal(children) => {
            let idx = child_index(&children.iter().map(|(b, _)| *b).collect::<Vec<_>>(), &position);
            insert_into(&mut children[idx].1, children[idx].0, leaf_capacity, depth + 1, position, value);
        }
    }
}

/// Split `bounds` into `2^D` equal orthants around its midpoint.
fn subdivide<V>(bounds: Bounds) -> Vec<(Bounds, Box<Node<V>>)> {
    let dim = bounds.dim();
    let ll = bounds.lower_left.as_slice().to_vec();
    let ur = bounds.upper_right.as_slice().to_vec();
    let mid: Vec<f64> = ll.iter().zip(&ur).map(|(a, b)| 0.5 * (a + b)).collect();

    let mut out = Vec::with_capacity(1 << dim);
    for mask in 0..(1usize << dim) {
        let mut child_ll = vec![0.0; dim];
        let mut child_ur = vec![0.0; dim];
        for i in 0..dim {
            if mask & (1 << i) != 0 {
                child_ll[i] = mid[i];
                child_ur[i] = ur[i];
            } else {
                child_ll[i] = ll[i];
                child_ur[i] = mid[i];
            }
        }
        let child_bounds = Bounds::new(
            Position::from_slice(&child_ll).expect("dim preserved"),
            Position::from_slice(&child_ur).expect("dim preserved"),
        )
        .expect("midpoint split preserves lower <= upper");
        out.push((child_bounds, Box::new(Node::Leaf(Vec::new()))));
    }
    out
}

fn child_index(children: &[Bounds], p: &Position) -> usize {
    for (i, b) in children.iter().enumerate() {
        if b.contains_point(p).unwrap_or(false) {
            return i;
        }
    }
    // Boundary point rounded outside every child due to floating point;
    // fall back to the last child rather than panic.
    children.len() - 1
}

fn collect<'a, V>(node: &'a Node<V>, bounds: Bounds, mask: &Mask, mask_bbox: &Bounds, out: &mut Vec<(Position, &'a V)>) -> ConnectResult<()> {
    if mask.outside(&bounds)? {
        return Ok(());
    }
    if mask_bbox.disjoint_from(&bounds)? {
        return Ok(());
    }
    match node {
        Node::Leaf(items) => {
            for (p, v) in items {
                if mask.inside(p)? {
                    out.push((*p, v));
                }
            }
        }
        Node::Internal(children) => {
            for (child_bounds, child) in children {
                collect(child, *child_bounds, mask, mask_bbox, out)?;
            }
        }
    }
    Ok(())
}

fn collect_all<'a, V>(node: &'a Node<V>, out: &mut Vec<(Position, &'a V)>) {
    match node {
        Node::Leaf(items) => out.extend(items.iter().map(|(p, v)| (*p, v))),
        Node::Internal(children) => {
            for (_, child) in children {
                collect_all(child, out);
            }
        }
    }
}
