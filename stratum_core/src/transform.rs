// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 4×4 transform.
//!
//! Layers carry an optional [`Transform3d`] applied about their own origin.
//! The compositor only needs to know whether a transform is 3D (a direct
//! compositing reason) and to map layer-local rectangles into absolute
//! coordinates for overlap testing, so this type covers exactly that.

use core::ops::Mul;

use kurbo::{Point, Rect};
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians). This is a 2D rotation.
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the X axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_x(radians: f64) -> Self {
        let (s, c) = (radians.sin(), radians.cos());
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a translation along Z only. Any non-zero depth makes the
    /// transform 3D even though it does not move anything on screen.
    #[inline]
    #[must_use]
    pub const fn from_translate_z(z: f64) -> Self {
        Self::from_translation(0.0, 0.0, z)
    }

    /// Returns `true` if this transform can be expressed as a 2D affine
    /// transform (no Z terms, no projective row).
    #[must_use]
    pub fn is_2d(&self) -> bool {
        let c = &self.cols;
        c[0][2] == 0.0
            && c[0][3] == 0.0
            && c[1][2] == 0.0
            && c[1][3] == 0.0
            && c[2] == [0.0, 0.0, 1.0, 0.0]
            && c[3][2] == 0.0
            && c[3][3] == 1.0
    }

    /// Returns `true` if the transform has any 3D component.
    #[inline]
    #[must_use]
    pub fn has_3d(&self) -> bool {
        !self.is_2d()
    }

    /// Returns `true` if every element is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Maps a point in the z = 0 plane, dividing by `w`.
    ///
    /// Returns `None` when the point projects behind the viewer (`w <= 0`).
    #[must_use]
    pub fn map_point(&self, p: Point) -> Option<Point> {
        let c = &self.cols;
        let x = c[0][0] * p.x + c[1][0] * p.y + c[3][0];
        let y = c[0][1] * p.x + c[1][1] * p.y + c[3][1];
        let w = c[0][3] * p.x + c[1][3] * p.y + c[3][3];
        if w <= 0.0 {
            return None;
        }
        Some(Point::new(x / w, y / w))
    }

    /// Maps `rect` and returns the axis-aligned bounding box of its four
    /// projected corners.
    ///
    /// When a corner projects behind the viewer the result is unbounded in
    /// the conservative sense: an infinite rectangle, so overlap tests always
    /// hit.
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Rect {
        if self.is_2d() && self.cols[0][1] == 0.0 && self.cols[1][0] == 0.0 {
            // Scale + translate only: map the two corners directly.
            let c = &self.cols;
            let a = Point::new(c[0][0] * rect.x0 + c[3][0], c[1][1] * rect.y0 + c[3][1]);
            let b = Point::new(c[0][0] * rect.x1 + c[3][0], c[1][1] * rect.y1 + c[3][1]);
            return Rect::from_points(a, b);
        }
        let corners = [
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        ];
        let mut out: Option<Rect> = None;
        for corner in corners {
            let Some(p) = self.map_point(corner) else {
                return Rect::new(
                    f64::NEG_INFINITY,
                    f64::NEG_INFINITY,
                    f64::INFINITY,
                    f64::INFINITY,
                );
            };
            out = Some(match out {
                Some(r) => r.union_pt(p),
                None => Rect::from_points(p, p),
            });
        }
        out.unwrap_or(Rect::ZERO)
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        for (j, col) in out.iter_mut().enumerate() {
            for (i, v) in col.iter_mut().enumerate() {
                *v = a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
            }
        }
        Self { cols: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform3d::default(), Transform3d::IDENTITY);
    }

    #[test]
    fn identity_multiply() {
        let t = Transform3d::from_translation(1.0, 2.0, 0.0);
        assert_eq!(Transform3d::IDENTITY * t, t);
        assert_eq!(t * Transform3d::IDENTITY, t);
    }

    #[test]
    fn two_d_classification() {
        assert!(Transform3d::IDENTITY.is_2d());
        assert!(Transform3d::from_translation(5.0, 6.0, 0.0).is_2d());
        assert!(Transform3d::from_rotation_z(0.5).is_2d());
        assert!(Transform3d::from_scale(2.0, 3.0, 1.0).is_2d());
        assert!(Transform3d::from_translate_z(1.0).has_3d());
        assert!(Transform3d::from_rotation_x(0.3).has_3d());
        assert!(
            Transform3d::from_scale(1.0, 1.0, 2.0).has_3d(),
            "a Z scale is a 3D operation"
        );
    }

    #[test]
    fn map_rect_translate_and_scale() {
        let t = Transform3d::from_translation(10.0, 20.0, 0.0)
            * Transform3d::from_scale(2.0, 2.0, 1.0);
        let r = t.map_rect(Rect::new(0.0, 0.0, 5.0, 5.0));
        assert_eq!(r, Rect::new(10.0, 20.0, 20.0, 30.0));
    }

    #[test]
    fn map_rect_rotation_bounds() {
        let t = Transform3d::from_rotation_z(core::f64::consts::FRAC_PI_2);
        let r = t.map_rect(Rect::new(0.0, 0.0, 10.0, 5.0));
        assert!((r.x0 + 5.0).abs() < 1e-9, "x0 = {}", r.x0);
        assert!((r.y1 - 10.0).abs() < 1e-9, "y1 = {}", r.y1);
    }

    #[test]
    fn map_rect_z_translation_is_planar_noop() {
        let t = Transform3d::from_translate_z(50.0);
        let r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(t.map_rect(r), r);
    }

    #[test]
    fn finite_check() {
        assert!(Transform3d::IDENTITY.is_finite());
        let mut t = Transform3d::IDENTITY;
        t.cols[3][0] = f64::NAN;
        assert!(!t.is_finite());
    }
}
