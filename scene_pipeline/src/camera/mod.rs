//! Camera-side culling primitives

mod frustum;

pub use frustum::{Frustum, FrustumTest};
