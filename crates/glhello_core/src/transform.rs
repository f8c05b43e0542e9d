//! Rotation about Z combined with uniform scale.
//!
//! Matrices are 4x4, column-major, applied to column vectors (`p' = M * p`).
//! This is the layout of Metal's `float4x4` and of `glam::Mat4`, so the array
//! can be handed to either without reordering.

use glam::Mat4;

/// Write `scale * rotation_z(angle)` into `m`.
///
/// Scale is applied first, then rotation; for a uniform scale the two commute.
/// Zero or negative scale is accepted and yields a collapsed or point-mirrored
/// transform. Translation stays at zero.
pub fn build_rotate_scale_z(m: &mut [f32; 16], angle: f32, scale: f32) {
    let (sin, cos) = angle.sin_cos();
    let c = cos * scale;
    let s = sin * scale;

    *m = [
        c, s, 0.0, 0.0, // column 0
        -s, c, 0.0, 0.0, // column 1
        0.0, 0.0, 1.0, 0.0, // column 2
        0.0, 0.0, 0.0, 1.0, // column 3
    ];
}

/// Same matrix as [`build_rotate_scale_z`], returned by value.
pub fn rotate_scale_z(angle: f32, scale: f32) -> Mat4 {
    let mut m = [0.0; 16];
    build_rotate_scale_z(&mut m, angle, scale);
    Mat4::from_cols_array(&m)
}
