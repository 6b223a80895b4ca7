//! The Mask algebra (§4.2): a closed tagged union of point/box predicates
//! with Boolean composition, anchoring and the converse (mirror) operation.
//! Kept as a single recursive `enum` rather than a dynamic-dispatch
//! hierarchy with `clone`/virtual-destructor discipline — the §9 redesign
//! flag this spec calls for — with sub-masks held behind `Arc` so
//! composition (`Intersection`, `Union`, ...) shares structure instead of
//! deep-copying, the same way the teacher shares immutable `Tensor`/`Node`
//! data rather than duplicating it.

use crate::error::{ConnectError, ConnectResult};
use crate::geometry::{rotation, Bounds, Position};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A spatial acceptance region. Every variant can report a bounding box in
/// O(1) and test points/boxes against itself; see the trait-like contract
/// in `inside`/`outside`/`get_bbox` below (§4.2's "Public contract").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Mask {
    Ball {
        center: Position,
        radius: f64,
    },
    Box {
        lower_left: Position,
        upper_right: Position,
        azimuth: f64,
        polar: f64,
    },
    Ellipse {
        center: Position,
        axes: Position,
        azimuth: f64,
        polar: f64,
    },
    /// Only valid against a Grid layer; `check_mask` (§4.5) rewrites this
    /// into a `Box` before it is ever evaluated, so `inside`/`outside` on a
    /// raw `Grid` mask against real positions is always an error.
    Grid {
        shape: Vec<usize>,
        anchor: Vec<i64>,
    },
    Intersection(Arc<Mask>, Arc<Mask>),
    Union(Arc<Mask>, Arc<Mask>),
    Difference(Arc<Mask>, Arc<Mask>),
    Converse(Arc<Mask>),
    Anchored(Arc<Mask>, Position),
    All {
        dim: usize,
    },
}

impl Mask {
    pub fn intersection(a: Mask, b: Mask) -> Mask {
        Mask::Intersection(Arc::new(a), Arc::new(b))
    }

    pub fn union(a: Mask, b: Mask) -> Mask {
        Mask::Union(Arc::new(a), Arc::new(b))
    }

    pub fn difference(a: Mask, b: Mask) -> Mask {
        Mask::Difference(Arc::new(a), Arc::new(b))
    }

    pub fn converse(a: Mask) -> Mask {
        Mask::Converse(Arc::new(a))
    }

    pub fn anchored(a: Mask, offset: Position) -> Mask {
        Mask::Anchored(Arc::new(a), offset)
    }

    fn dim(&self) -> ConnectResult<usize> {
        Ok(match self {
            Mask::Ball { center, .. } => center.dim(),
            Mask::Box { lower_left, .. } => lower_left.dim(),
            Mask::Ellipse { center, .. } => center.dim(),
            Mask::Grid { .. } => return Err(ConnectError::BadProperty("Grid mask has no Euclidean dimension until converted to Box".into())),
            Mask::Intersection(a, b) | Mask::Union(a, b) | Mask::Difference(a, b) => {
                let (da, db) = (a.dim()?, b.dim()?);
                if da != db {
                    return Err(ConnectError::DimensionMismatch { context: "Mask composition".into(), expected: da, found: db });
                }
                da
            }
            Mask::Converse(a) => a.dim()?,
            Mask::Anchored(a, offset) => {
                let d = a.dim()?;
                if d != offset.dim() {
                    return Err(ConnectError::DimensionMismatch { context: "Mask::Anchored".into(), expected: d, found: offset.dim() });
                }
                d
            }
            Mask::All { dim } => *dim,
        })
    }

    /// True when `p` lies in the mask region.
    pub fn inside(&self, p: &Position) -> ConnectResult<bool> {
        match self {
            Mask::Ball { center, radius } => Ok(p.sub(center)?.length() <= *radius),
            Mask::Box { lower_left, upper_right, azimuth, polar } => {
                let local = if *azimuth == 0.0 && *polar == 0.0 {
                    *p
                } else {
                    rotation::rotate_into_box_frame(p, *azimuth, *polar)
                };
                let side = Bounds::new(*lower_left, *upper_right)?.side(0).max(
                    Bounds::new(*lower_left, *upper_right)?.side(1),
                );
                let eps = 0.01 * side.max(f64::MIN_POSITIVE);
                let ll = lower_left.as_slice();
                let ur = upper_right.as_slice();
                Ok((0..p.dim())
                    .all(|i| local.get(i) >= ll[i] - eps && local.get(i) <= ur[i] + eps))
            }
            Mask::Ellipse { center, axes, azimuth, polar } => {
                let d = p.sub(center)?;
                let local = if *azimuth == 0.0 && *polar == 0.0 {
                    d
                } else {
                    rotation::rotate_into_ellipse_frame(&d, *azimuth, *polar)
                };
                let a = axes.as_slice();
                let mut sum = 0.0;
                for i in 0..p.dim() {
                    sum += (local.get(i) * local.get(i)) / (a[i] * a[i]);
                }
                Ok(sum <= 1.0)
            }
            Mask::Grid { .. } => Err(ConnectError::BadProperty(
                "Grid mask cannot test a real-valued point directly; it must be resolved to a Box mask first".into(),
            )),
            Mask::Intersection(a, b) => Ok(a.inside(p)? && b.inside(p)?),
            Mask::Union(a, b) => Ok(a.inside(p)? || b.inside(p)?),
            Mask::Difference(a, b) => Ok(a.inside(p)? && !b.inside(p)?),
            Mask::Converse(a) => a.inside(&p.neg()),
            Mask::Anchored(a, offset) => a.inside(&p.sub(offset)?),
            Mask::All { dim } => {
                if *dim != p.dim() {
                    return Err(ConnectError::DimensionMismatch { context: "Mask::All".into(), expected: *dim, found: p.dim() });
                }
                Ok(true)
            }
        }
    }

    /// True when every point of `b` is inside the mask. Conservative:
    /// non-convex masks may return `false` for boxes that are in fact fully
    /// contained, but must never return `true` incorrectly.
    pub fn inside_box(&self, b: &Bounds) -> ConnectResult<bool> {
        match self {
            Mask::Ball { center, radius } => {
                // Conservative but exact for a ball: every corner must be inside.
                Ok(corners(b)?.iter().all(|c| matches!(c.sub(center), Ok(d) if d.length() <= *radius)))
            }
            Mask::Box { .. } => Ok(corners(b)?.iter().all(|c| self.inside(c).unwrap_or(false))),
            Mask::Ellipse { .. } => Ok(corners(b)?.iter().all(|c| self.inside(c).unwrap_or(false))),
            Mask::Grid { .. } => Err(ConnectError::BadProperty("Grid mask cannot test a box directly".into())),
            Mask::Intersection(a, b2) => Ok(a.inside_box(b)? && b2.inside_box(b)?),
            Mask::Union(a, b2) => {
                // Conservative: only claim full containment when one side alone covers it,
                // since a point could lie in `a`'s remainder and outside `b2` or vice versa.
                Ok(a.inside_box(b)? || b2.inside_box(b)?)
            }
            Mask::Difference(a, b2) => Ok(a.inside_box(b)? && b2.outside(b)?),
            Mask::Converse(a) => a.inside_box(&mirror_box(b)?),
            Mask::Anchored(a, offset) => a.inside_box(&b.translated(&offset.neg())?),
            Mask::All { dim } => {
                if *dim != b.dim() {
                    return Err(ConnectError::DimensionMismatch { context: "Mask::All".into(), expected: *dim, found: b.dim() });
                }
                Ok(true)
            }
        }
    }

    /// True when `b` is disjoint from the mask region. Conservative in the
    /// same sense as `inside_box`: may return `false` more often than
    /// necessary, never `true` incorrectly.
    pub fn outside(&self, b: &Bounds) -> ConnectResult<bool> {
        match self {
            Mask::Ball { .. } | Mask::Box { .. } | Mask::Ellipse { .. } => Ok(self.get_bbox()?.disjoint_from(b)?),
            Mask::Grid { .. } => Err(ConnectError::BadProperty("Grid mask cannot test a box directly".into())),
            Mask::Intersection(a, b2) => Ok(a.outside(b)? || b2.outside(b)?),
            Mask::Union(a, b2) => Ok(a.outside(b)? && b2.outside(b)?),
            Mask::Difference(a, b2) => Ok(a.outside(b)? || b2.inside_box(b)?),
            Mask::Converse(a) => a.outside(&mirror_box(b)?),
            Mask::Anchored(a, offset) => a.outside(&b.translated(&offset.neg())?),
            Mask::All { dim } => {
                if *dim != b.dim() {
                    return Err(ConnectError::DimensionMismatch { context: "Mask::All".into(), expected: *dim, found: b.dim() });
                }
                Ok(false)
            }
        }
    }

    /// Axis-aligned bounding box containing every point for which `inside`
    /// could return true. Reachable in O(1) for every variant.
    pub fn get_bbox(&self) -> ConnectResult<Bounds> {
        match self {
            Mask::Ball { center, radius } => {
                let r = Position::from_slice(&vec![*radius; center.dim()])?;
                Bounds::new(center.sub(&r)?, center.add(&r)?)
            }
            Mask::Box { lower_left, upper_right, azimuth, polar } => {
                if *azimuth == 0.0 && *polar == 0.0 {
                    Bounds::new(*lower_left, *upper_right)
                } else {
                    let mut lo = None::<Position>;
                    let mut hi = None::<Position>;
                    for corner in corners(&Bounds::new(*lower_left, *upper_right)?)? {
                        // corners() produced in the box's own (unrotated) frame; the
                        // hull we want is of their images under the *forward*
                        // rotation (inverse of rotate_into_box_frame, i.e. R_z(azimuth)).
                        let world = rotation::rotate_into_box_frame(&corner, -*azimuth, -*polar);
                        lo = Some(match lo {
                            Some(l) => l.componentwise_min(&world)?,
                            None => world,
                        });
                        hi = Some(match hi {
                            Some(h) => h.componentwise_max(&world)?,
                            None => world,
                        });
                    }
                    Bounds::new(lo.expect("non-empty corners"), hi.expect("non-empty corners"))
                }
            }
            Mask::Ellipse { center, axes, azimuth, polar } => {
                if *azimuth == 0.0 && *polar == 0.0 {
                    Bounds::new(center.sub(axes)?, center.add(axes)?)
                } else {
                    // Conservative: cube of side = max axis, per the open question in §9.
                    let max_axis = axes.as_slice().iter().cloned().fold(0.0_f64, f64::max);
                    let r = Position::from_slice(&vec![max_axis; center.dim()])?;
                    Bounds::new(center.sub(&r)?, center.add(&r)?)
                }
            }
            Mask::Grid { .. } => Err(ConnectError::BadProperty("Grid mask has no bbox before conversion to Box (§4.5)".into())),
            Mask::Intersection(a, b) => {
                let (ba, bb) = (a.get_bbox()?, b.get_bbox()?);
                let (lo, hi) = ba.intersection_hull(&bb)?;
                // If the hull is inverted on some axis the masks' bboxes don't
                // overlap; still return a well-formed (possibly empty) bbox by
                // clamping hi to lo rather than erroring.
                let hi = hi.componentwise_max(&lo)?;
                Bounds::new(lo, hi)
            }
            Mask::Union(a, b) => a.get_bbox()?.union(&b.get_bbox()?),
            Mask::Difference(a, _b) => a.get_bbox(),
            Mask::Converse(a) => mirror_box(&a.get_bbox()?),
            Mask::Anchored(a, offset) => a.get_bbox()?.translated(offset),
            Mask::All { dim } => {
                let inf = Position::from_slice(&vec![f64::NEG_INFINITY; *dim])?;
                let sup = Position::from_slice(&vec![f64::INFINITY; *dim])?;
                Bounds::new(inf, sup)
            }
        }
    }
}

fn corners(b: &Bounds) -> ConnectResult<Vec<Position>> {
    let d = b.dim();
    let ll = b.lower_left.as_slice();
    let ur = b.upper_right.as_slice();
    let mut out = Vec::with_capacity(1 << d);
    for mask in 0..(1u32 << d) {
        let mut coords = vec![0.0; d];
        for (i, c) in coords.iter_mut().enumerate() {
            *c = if mask & (1 << i) != 0 { ur[i] } else { ll[i] };
        }
        out.push(Position::from_slice(&coords)?);
    }
    Ok(out)
}

/// Mirror a bounding box through the origin: `Converse(m).inside(p) =
/// m.inside(-p)`, so a box query against the converse needs its corners
/// negated and swapped (negating `lower_left` turns it into the new upper
/// bound and vice versa).
fn mirror_box(b: &Bounds) -> ConnectResult<Bounds> {
    Bounds::new(b.upper_right.neg(), b.lower_left.neg())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchored_matches_shifted_inside() {
        let m = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 1.0 };
        let anchored = Mask::anchored(m.clone(), Position::D2([5.0, 0.0]));
        let p = Position::D2([5.5, 0.0]);
        assert_eq!(anchored.inside(&p).unwrap(), m.inside(&p.sub(&Position::D2([5.0, 0.0])).unwrap()).unwrap());
    }

    #[test]
    fn converse_mirrors_through_origin() {
        let m = Mask::Ball { center: Position::D2([1.0, 0.0]), radius: 0.5 };
        let c = Mask::converse(m.clone());
        let p = Position::D2([-1.0, 0.0]);
        assert_eq!(c.inside(&p).unwrap(), m.inside(&p.neg()).unwrap());
    }

    #[test]
    fn difference_of_balls() {
        let outer = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 2.0 };
        let inner = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 1.0 };
        let ring = Mask::difference(outer, inner);
        assert!(ring.inside(&Position::D2([1.5, 0.0])).unwrap());
        assert!(!ring.inside(&Position::D2([0.5, 0.0])).unwrap());
        assert!(!ring.inside(&Position::D2([2.5, 0.0])).unwrap());
    }

    #[test]
    fn intersection_bbox_contained_in_box_operand() {
        let b = Mask::Box {
            lower_left: Position::D2([0.0, 0.0]),
            upper_right: Position::D2([2.0, 2.0]),
            azimuth: 0.0,
            polar: 0.0,
        };
        let c = Mask::Ball { center: Position::D2([1.0, 1.0]), radius: 1.0 };
        let inter = Mask::intersection(b.clone(), c);
        assert!(b.get_bbox().unwrap().contains_box(&inter.get_bbox().unwrap()).unwrap());
    }

    #[test]
    fn box_mask_inside_matches_componentwise_when_unrotated() {
        let m = Mask::Box {
            lower_left: Position::D2([-1.0, -1.0]),
            upper_right: Position::D2([1.0, 1.0]),
            azimuth: 0.0,
            polar: 0.0,
        };
        assert!(m.inside(&Position::D2([0.0, 0.0])).unwrap());
        assert!(!m.inside(&Position::D2([2.0, 0.0])).unwrap());
    }

    #[test]
    fn inside_box_implies_every_corner_inside() {
        let m = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 5.0 };
        let b = Bounds::new(Position::D2([-1.0, -1.0]), Position::D2([1.0, 1.0])).unwrap();
        if m.inside_box(&b).unwrap() {
            for c in corners(&b).unwrap() {
                assert!(m.inside(&c).unwrap());
            }
        }
    }

    #[test]
    fn outside_box_implies_no_point_inside() {
        let m = Mask::Ball { center: Position::D2([0.0, 0.0]), radius: 1.0 };
        let b = Bounds::new(Position::D2([10.0, 10.0]), Position::D2([11.0, 11.0])).unwrap();
        assert!(m.outside(&b).unwrap());
    }
}
