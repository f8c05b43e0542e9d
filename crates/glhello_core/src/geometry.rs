//! Pixel units for drawable surfaces.

/// Device pixels - physical pixel coordinate space.
pub struct DevicePixels;

impl glamour::Unit for DevicePixels {
    type Scalar = f32;
}

/// Drawable size in device pixels.
pub type DeviceSize = glamour::Size2<DevicePixels>;

/// Width over height, or 1.0 for a degenerate size.
pub fn aspect_ratio(size: DeviceSize) -> f32 {
    if size.width <= 0.0 || size.height <= 0.0 {
        1.0
    } else {
        size.width / size.height
    }
}
