//! Bounding volumes and transform helpers

mod aabb;
mod transform;

pub use aabb::AABB;
pub use transform::{compose_transform, view_matrix};
