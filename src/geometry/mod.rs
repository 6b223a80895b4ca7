//! Position, bounds and displacement (§4.1). A layer is either 2- or
//! 3-dimensional; mixing dimensions inside one call is a runtime
//! [`crate::error::ConnectError::DimensionMismatch`], not a type error —
//! the dimension is only known once a concrete [`crate::layer::Layer`] is
//! constructed from configuration. `Position` is therefore a small tagged
//! union over the two concrete arities, in the same spirit as the teacher's
//! `Storage` enum (`Cpu(ArrayD<f32>)` / `Cuda(CudaSlice<f32>)`) dispatching
//! per-variant arithmetic rather than carrying a const-generic dimension.

pub mod rotation;

use crate::error::{ConnectError, ConnectResult};
use serde::{Deserialize, Serialize};

/// A point (or displacement vector) in 2- or 3-dimensional Euclidean space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Position {
    D2([f64; 2]),
    D3([f64; 3]),
}

impl Position {
    pub fn zero(dim: usize) -> ConnectResult<Self> {
        match dim {
            2 => Ok(Position::D2([0.0; 2])),
            3 => Ok(Position::D3([0.0; 3])),
            d => Err(ConnectError::BadProperty(format!("position dimension must be 2 or 3, got {d}"))),
        }
    }

    pub fn from_slice(values: &[f64]) -> ConnectResult<Self> {
        match values.len() {
            2 => Ok(Position::D2([values[0], values[1]])),
            3 => Ok(Position::D3([values[0], values[1], values[2]])),
            d => Err(ConnectError::BadProperty(format!("position dimension must be 2 or 3, got {d}"))),
        }
    }

    pub fn dim(&self) -> usize {
        match self {
            Position::D2(_) => 2,
            Position::D3(_) => 3,
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            Position::D2(v) => v.as_slice(),
            Position::D3(v) => v.as_slice(),
        }
    }

    pub fn get(&self, axis: usize) -> f64 {
        self.as_slice()[axis]
    }

    fn same_dim(&self, other: &Position, context: &str) -> ConnectResult<()> {
        if self.dim() != other.dim() {
            return Err(ConnectError::DimensionMismatch {
                context: context.to_string(),
                expected: self.dim(),
                found: other.dim(),
            });
        }
        Ok(())
    }

    /// Componentwise sum; dimensions must match.
    pub fn add(&self, other: &Position) -> ConnectResult<Position> {
        self.same_dim(other, "Position::add")?;
        Ok(Self::from_slice(
            &self
                .as_slice()
                .iter()
                .zip(other.as_slice())
                .map(|(a, b)| a + b)
                .collect::<Vec<_>>(),
        )
        .expect("dims checked above"))
    }

    /// Componentwise difference `self - other`.
    pub fn sub(&self, other: &Position) -> ConnectResult<Position> {
        self.same_dim(other, "Position::sub")?;
        Ok(Self::from_slice(
            &self
                .as_slice()
                .iter()
                .zip(other.as_slice())
                .map(|(a, b)| a - b)
                .collect::<Vec<_>>(),
        )
        .expect("dims checked above"))
    }

    /// Componentwise negation.
    pub fn neg(&self) -> Position {
        Self::from_slice(&self.as_slice().iter().map(|a| -a).collect::<Vec<_>>()).expect("same dim")
    }

    pub fn scale(&self, s: f64) -> Position {
        Self::from_slice(&self.as_slice().iter().map(|a| a * s).collect::<Vec<_>>()).expect("same dim")
    }

    /// Componentwise product, used by per-axis operations such as the grid
    /// matrix-convention mapping (§4.5).
    pub fn mul_elementwise(&self, other: &Position) -> ConnectResult<Position> {
        self.same_dim(other, "Position::mul_elementwise")?;
        Ok(Self::from_slice(
            &self
                .as_slice()
                .iter()
                .zip(other.as_slice())
                .map(|(a, b)| a * b)
                .collect::<Vec<_>>(),
        )
        .expect("dims checked above"))
    }

    pub fn div_elementwise(&self, other: &Position) -> ConnectResult<Position> {
        self.same_dim(other, "Position::div_elementwise")?;
        Ok(Self::from_slice(
            &self
                .as_slice()
                .iter()
                .zip(other.as_slice())
                .map(|(a, b)| a / b)
                .collect::<Vec<_>>(),
        )
        .expect("dims checked above"))
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        self.as_slice().iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Partial order: `self <= other` iff every component is `<=`.
    /// Note: `!(a <= b)` does NOT imply `a > b` (axis-aligned comparison is
    /// only a partial order — §3).
    pub fn le(&self, other: &Position) -> ConnectResult<bool> {
        self.same_dim(other, "Position::le")?;
        Ok(self.as_slice().iter().zip(other.as_slice()).all(|(a, b)| a <= b))
    }

    pub fn componentwise_min(&self, other: &Position) -> ConnectResult<Position> {
        self.same_dim(other, "Position::componentwise_min")?;
        Ok(Self::from_slice(
            &self
                .as_slice()
                .iter()
                .zip(other.as_slice())
                .map(|(a, b)| a.min(*b))
                .collect::<Vec<_>>(),
        )
        .expect("dims checked above"))
    }

    pub fn componentwise_max(&self, other: &Position) -> ConnectResult<Position> {
        self.same_dim(other, "Position::componentwise_max")?;
        Ok(Self::from_slice(
            &self
                .as_slice()
                .iter()
                .zip(other.as_slice())
                .map(|(a, b)| a.max(*b))
                .collect::<Vec<_>>(),
        )
        .expect("dims checked above"))
    }
}

bitflags::bitflags! {
    /// Which axes of a layer are periodic (§3 Layer, §4.1 displacement
    /// folding). At most 3 bits are meaningful (D is 2 or 3); higher bits
    /// are simply never tested.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Periodicity: u8 {
        const X = 0b0000_0001;
        const Y = 0b0000_0010;
        const Z = 0b0000_0100;
    }
}

impl Periodicity {
    pub const NONE: Periodicity = Periodicity::empty();

    pub fn axis(&self, i: usize) -> bool {
        match i {
            0 => self.contains(Periodicity::X),
            1 => self.contains(Periodicity::Y),
            2 => self.contains(Periodicity::Z),
            _ => false,
        }
    }

    pub fn any(&self) -> bool {
        !self.is_empty()
    }
}

/// Axis-aligned bounding box: a closed region `[lower_left, upper_right]`
/// with `lower_left <= upper_right` componentwise. Named `Bounds` rather
/// than `Box` to avoid colliding with `std::boxed::Box`; this is exactly
/// the spec's `Box<D>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower_left: Position,
    pub upper_right: Position,
}

impl Bounds {
    pub fn new(lower_left: Position, upper_right: Position) -> ConnectResult<Self> {
        if !lower_left.le(&upper_right)? {
            return Err(ConnectError::BadProperty(
                "Bounds requires lower_left <= upper_right componentwise".to_string(),
            ));
        }
        Ok(Self { lower_left, upper_right })
    }

    pub fn dim(&self) -> usize {
        self.lower_left.dim()
    }

    pub fn extent(&self) -> Position {
        self.upper_right.sub(&self.lower_left).expect("same dim by construction")
    }

    pub fn contains_point(&self, p: &Position) -> ConnectResult<bool> {
        Ok(self.lower_left.le(p)? && p.le(&self.upper_right)?)
    }

    /// True iff `other` is entirely contained in `self`.
    pub fn contains_box(&self, other: &Bounds) -> ConnectResult<bool> {
        Ok(self.contains_point(&other.lower_left)? && self.contains_point(&other.upper_right)?)
    }

    /// Conservative disjointness test: true only when every axis is
    /// provably separated.
    pub fn disjoint_from(&self, other: &Bounds) -> ConnectResult<bool> {
        if self.dim() != other.dim() {
            return Err(ConnectError::DimensionMismatch {
                context: "Bounds::disjoint_from".to_string(),
                expected: self.dim(),
                found: other.dim(),
            });
        }
        for i in 0..self.dim() {
            if self.upper_right.get(i) < other.lower_left.get(i) || other.upper_right.get(i) < self.lower_left.get(i) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn union(&self, other: &Bounds) -> ConnectResult<Bounds> {
        Bounds::new(
            self.lower_left.componentwise_min(&other.lower_left)?,
            self.upper_right.componentwise_max(&other.upper_right)?,
        )
    }

    /// Intersection bbox; may end up with `lower_left > upper_right` on some
    /// axis if the boxes don't actually overlap, so this returns the raw
    /// hull rather than failing — callers combine it with `disjoint_from`.
    pub fn intersection_hull(&self, other: &Bounds) -> ConnectResult<(Position, Position)> {
        Ok((
            self.lower_left.componentwise_max(&other.lower_left)?,
            self.upper_right.componentwise_min(&other.upper_right)?,
        ))
    }

    pub fn translated(&self, offset: &Position) -> ConnectResult<Bounds> {
        Bounds::new(self.lower_left.add(offset)?, self.upper_right.add(offset)?)
    }

    /// Side length of the bbox on `axis`.
    pub fn side(&self, axis: usize) -> f64 {
        self.upper_right.get(axis) - self.lower_left.get(axis)
    }
}

/// Pre-synaptic → post-synaptic displacement (§4.1), folded into the
/// half-extent interval on every periodic axis:
/// `d[i] <- d[i] - extent[i] * round(d[i] / extent[i])`.
///
/// This guarantees the minimum-image vector on a torus: every folded
/// component lies in `(-extent[i]/2, +extent[i]/2]`.
pub fn compute_displacement(from: &Position, to: &Position, extent: &Position, periodic: Periodicity) -> ConnectResult<Position> {
    if from.dim() != to.dim() || from.dim() != extent.dim() {
        return Err(ConnectError::DimensionMismatch {
            context: "compute_displacement".to_string(),
            expected: from.dim(),
            found: to.dim(),
        });
    }
    let raw = to.sub(from)?;
    let mut folded = raw.as_slice().to_vec();
    for i in 0..raw.dim() {
        if periodic.axis(i) {
            let e = extent.get(i);
            if e > 0.0 {
                folded[i] -= e * (folded[i] / e).round();
            }
        }
    }
    Position::from_slice(&folded)
}

pub fn compute_distance(from: &Position, to: &Position, extent: &Position, periodic: Periodicity) -> ConnectResult<f64> {
    Ok(compute_displacement(from, to, extent, periodic)?.length())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacement_non_periodic_is_plain_difference() {
        let a = Position::D2([0.0, 0.0]);
        let b = Position::D2([3.0, -2.0]);
        let extent = Position::D2([10.0, 10.0]);
        let d = compute_displacement(&a, &b, &extent, Periodicity::NONE).unwrap();
        assert_eq!(d.as_slice(), &[3.0, -2.0]);
    }

    #[test]
    fn displacement_folds_into_half_extent_on_periodic_axis() {
        let a = Position::D2([0.0, 0.0]);
        let b = Position::D2([9.0, 0.0]);
        let extent = Position::D2([10.0, 10.0]);
        let d = compute_displacement(&a, &b, &extent, Periodicity::X).unwrap();
        // raw displacement is 9, folds to -1 (shorter way around the torus)
        assert!((d.get(0) - (-1.0)).abs() < 1e-9);
    }

    #[test]
    fn displacement_is_antisymmetric_up_to_half_extent_endpoint() {
        let a = Position::D2([1.0, 1.0]);
        let b = Position::D2([8.0, 2.0]);
        let extent = Position::D2([10.0, 10.0]);
        let d_ab = compute_displacement(&a, &b, &extent, Periodicity::X | Periodicity::Y).unwrap();
        let d_ba = compute_displacement(&b, &a, &extent, Periodicity::X | Periodicity::Y).unwrap();
        for i in 0..2 {
            assert!((d_ab.get(i) + d_ba.get(i)).abs() < 1e-9, "axis {i}: {d_ab:?} vs {d_ba:?}");
        }
    }

    #[test]
    fn bounds_disjoint_and_contains() {
        let a = Bounds::new(Position::D2([0.0, 0.0]), Position::D2([2.0, 2.0])).unwrap();
        let b = Bounds::new(Position::D2([3.0, 3.0]), Position::D2([4.0, 4.0])).unwrap();
        assert!(a.disjoint_from(&b).unwrap());
        let c = Bounds::new(Position::D2([0.5, 0.5]), Position::D2([1.0, 1.0])).unwrap();
        assert!(a.contains_box(&c).unwrap());
    }

    #[test]
    fn mismatched_dims_are_dimension_mismatch_errors() {
        let a = Position::D2([0.0, 0.0]);
        let b = Position::D3([0.0, 0.0, 0.0]);
        match a.add(&b) {
            Err(ConnectError::DimensionMismatch { .. }) => {}
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }
}
