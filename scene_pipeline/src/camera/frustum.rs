//! Six-plane view frustum.
//!
//! Each plane is a Vec4 (A, B, C, D) with an inward unit normal (A, B, C);
//! a point P is inside when `A*x + B*y + C*z + D >= 0` for all six planes.
//! Works for perspective and orthographic projections alike.

use glam::{Mat4, Vec3, Vec4};
use crate::math::AABB;

/// Result of a 3-way frustum/AABB classification.
///
/// - `Outside` → skip the entire subtree
/// - `Inside` → collect every object below without further testing
/// - `Partial` → test individual objects and recurse into sons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumTest {
    Outside,
    Inside,
    Partial,
}

/// Six frustum planes: left, right, bottom, top, near, far
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub planes: [Vec4; 6],
}

impl Frustum {
    /// Extract the planes of a view-projection matrix (Gribb & Hartmann).
    ///
    /// Near plane follows the [0, 1] depth convention used by glam's `*_rh`
    /// projections; a [-1, 1] projection only yields a looser near plane.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let (r0, r1, r2, r3) = (vp.row(0), vp.row(1), vp.row(2), vp.row(3));
        let mut planes = [r3 + r0, r3 - r0, r3 + r1, r3 - r1, r2, r3 - r2];

        for plane in &mut planes {
            let normal_len = plane.truncate().length();
            if normal_len > 0.0 {
                *plane /= normal_len;
            }
        }

        Self { planes }
    }

    /// Frustum of a camera given its projection and view matrices
    pub fn from_camera(projection: &Mat4, view: &Mat4) -> Self {
        Self::from_view_projection(&(*projection * *view))
    }

    /// Conservative AABB test: never rejects a box that touches the volume,
    /// may accept boxes near frustum corners.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.planes
            .iter()
            .all(|plane| signed_distance(plane, positive_vertex(plane, aabb)) >= 0.0)
    }

    /// Classify an AABB as outside, fully inside or straddling the frustum.
    pub fn classify_aabb(&self, aabb: &AABB) -> FrustumTest {
        let mut all_inside = true;

        for plane in &self.planes {
            if signed_distance(plane, positive_vertex(plane, aabb)) < 0.0 {
                return FrustumTest::Outside;
            }
            if signed_distance(plane, negative_vertex(plane, aabb)) < 0.0 {
                all_inside = false;
            }
        }

        if all_inside { FrustumTest::Inside } else { FrustumTest::Partial }
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| signed_distance(plane, point) >= 0.0)
    }
}

fn signed_distance(plane: &Vec4, point: Vec3) -> f32 {
    plane.truncate().dot(point) + plane.w
}

/// Corner of the box furthest along the plane normal
fn positive_vertex(plane: &Vec4, aabb: &AABB) -> Vec3 {
    Vec3::select(plane.truncate().cmpge(Vec3::ZERO), aabb.max, aabb.min)
}

/// Corner of the box furthest against the plane normal
fn negative_vertex(plane: &Vec4, aabb: &AABB) -> Vec3 {
    Vec3::select(plane.truncate().cmpge(Vec3::ZERO), aabb.min, aabb.max)
}

#[cfg(test)]
#[path = "frustum_tests.rs"]
mod tests;
