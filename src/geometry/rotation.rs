//! Rotation conventions for oriented masks (§4.2, §9 "Rotation
//! conventions"). Box and Ellipse masks pin down *distinct* rotation
//! matrices: a Box rotates a query point into its own frame with
//! `R_z(-azimuth)` (and, in 3D, `R_y(-polar)` composed after it), while an
//! Ellipse uses `R_z(azimuth)` with the off-diagonal sign flipped. These are
//! two different but both-correct ways of expressing "rotate into local
//! frame then test axis-aligned"; the spec requires pinning the exact
//! formula rather than unifying them, so both live here side by side.

use super::Position;

/// Rotate `p` into a Box mask's local frame using `R_z(-azimuth)` composed
/// with `R_y(-polar)` in 3D (applied in that order: yaw undone first, then
/// pitch). For 2D positions `polar` is ignored.
pub fn rotate_into_box_frame(p: &Position, azimuth: f64, polar: f64) -> Position {
    match p {
        Position::D2(v) => {
            let (sin_a, cos_a) = (-azimuth).sin_cos();
            let x = cos_a * v[0] - sin_a * v[1];
            let y = sin_a * v[0] + cos_a * v[1];
            Position::D2([x, y])
        }
        Position::D3(v) => {
            let (sin_a, cos_a) = (-azimuth).sin_cos();
            let x1 = cos_a * v[0] - sin_a * v[1];
            let y1 = sin_a * v[0] + cos_a * v[1];
            let z1 = v[2];

            let (sin_p, cos_p) = (-polar).sin_cos();
            let x2 = cos_p * x1 + sin_p * z1;
            let y2 = y1;
            let z2 = -sin_p * x1 + cos_p * z1;
            Position::D3([x2, y2, z2])
        }
    }
}

/// Rotate `p` into an Ellipse mask's local frame using `R_z(azimuth)` with
/// the off-diagonal sign flipped relative to the Box convention above,
/// composed with `R_y(polar)` in 3D.
pub fn rotate_into_ellipse_frame(p: &Position, azimuth: f64, polar: f64) -> Position {
    match p {
        Position::D2(v) => {
            let (sin_a, cos_a) = azimuth.sin_cos();
            let x = cos_a * v[0] + sin_a * v[1];
            let y = -sin_a * v[0] + cos_a * v[1];
            Position::D2([x, y])
        }
        Position::D3(v) => {
            let (sin_a, cos_a) = azimuth.sin_cos();
            let x1 = cos_a * v[0] + sin_a * v[1];
            let y1 = -sin_a * v[0] + cos_a * v[1];
            let z1 = v[2];

            let (sin_p, cos_p) = polar.sin_cos();
            let x2 = cos_p * x1 - sin_p * z1;
            let y2 = y1;
            let z2 = sin_p * x1 + cos_p * z1;
            Position::D3([x2, y2, z2])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_rotation_is_identity() {
        let p = Position::D2([3.0, -4.0]);
        let r = rotate_into_box_frame(&p, 0.0, 0.0);
        assert!((r.get(0) - 3.0).abs() < 1e-12);
        assert!((r.get(1) + 4.0).abs() < 1e-12);
    }

    #[test]
    fn quarter_turn_box_frame_swaps_axes() {
        // R_z(-pi/2) applied to (1, 0) lands on (0, -1).
        let p = Position::D2([1.0, 0.0]);
        let r = rotate_into_box_frame(&p, std::f64::consts::FRAC_PI_2, 0.0);
        assert!(r.get(0).abs() < 1e-9);
        assert!((r.get(1) + 1.0).abs() < 1e-9);
    }
}
