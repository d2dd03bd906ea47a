use glam::{Mat4, Quat, Vec3};

/// World matrix from position, orientation and scale (T * R * S)
pub fn compose_transform(position: Vec3, orientation: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, orientation, position)
}

/// View matrix of a camera placed with the given transform.
///
/// Returns identity when the transform is not invertible (zero scale).
pub fn view_matrix(position: Vec3, orientation: Quat, scale: Vec3) -> Mat4 {
    let world = compose_transform(position, orientation, scale);
    if world.determinant().abs() <= f32::EPSILON {
        return Mat4::IDENTITY;
    }
    world.inverse()
}
