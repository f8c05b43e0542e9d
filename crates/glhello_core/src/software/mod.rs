//! CPU rasterizing backend for targets without Metal.
//!
//! Renders into a caller-owned [`PixelSurface`]. Each pixel inside the quad's
//! screen bounds is mapped back through the inverse transform and samples the
//! texture with nearest filtering.

use crate::{
    aspect_ratio, build_rotate_scale_z, texture, Backend, BackendError, DeviceSize, RenderConfig,
    Texture,
};
use glam::{Mat2, Vec2};
use image::{ImageResult, RgbaImage};
use palette::Srgba;
use std::cell::RefCell;
use std::path::Path;

/// Half the edge length of the untransformed quad, in normalized units.
const QUAD_HALF_EXTENT: f32 = 0.5;

/// An RGBA framebuffer owned by the caller.
///
/// Backends borrow the surface; it must outlive every backend created on it.
pub struct PixelSurface {
    pixels: RefCell<RgbaImage>,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RefCell::new(RgbaImage::new(width, height)),
        }
    }

    pub fn size(&self) -> DeviceSize {
        let pixels = self.pixels.borrow();
        DeviceSize::new(pixels.width() as f32, pixels.height() as f32)
    }

    /// Reallocate the framebuffer. Contents are cleared.
    pub fn resize(&self, width: u32, height: u32) {
        *self.pixels.borrow_mut() = RgbaImage::new(width, height);
    }

    /// RGBA value of one pixel, or `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.pixels.borrow().get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Copy of the current framebuffer contents.
    pub fn snapshot(&self) -> RgbaImage {
        self.pixels.borrow().clone()
    }

    /// Write the framebuffer to a PNG file.
    pub fn save_png(&self, path: impl AsRef<Path>) -> ImageResult<()> {
        self.pixels.borrow().save(path)
    }
}

pub struct SoftwareBackend<'s> {
    surface: &'s PixelSurface,
    texture: &'static Texture,
    clear_color: [u8; 4],
    transform: [f32; 16],
    frames: u64,
}

impl<'s> Backend<'s> for SoftwareBackend<'s> {
    type Surface = PixelSurface;

    fn create_with(surface: &'s PixelSurface, config: &RenderConfig) -> Result<Self, BackendError> {
        let size = surface.size();
        if size.width < 1.0 || size.height < 1.0 {
            return Err(BackendError::InvalidSurface(format!(
                "surface has no pixels ({}x{})",
                size.width, size.height
            )));
        }

        log::debug!("software backend on {}x{} surface", size.width, size.height);

        Ok(Self {
            surface,
            texture: texture(),
            clear_color: to_rgba8(config.clear_color),
            transform: [0.0; 16],
            frames: 0,
        })
    }

    fn draw(&mut self, angle: f32, scale: f32) {
        build_rotate_scale_z(&mut self.transform, angle, scale);

        let mut target = self.surface.pixels.borrow_mut();
        for pixel in target.pixels_mut() {
            pixel.0 = self.clear_color;
        }
        rasterize_quad(&mut target, self.texture, &self.transform);

        self.frames += 1;
    }

    fn resize(&mut self, size: DeviceSize) {
        log::debug!("resizing software surface to {}x{}", size.width, size.height);
        self.surface
            .resize(size.width.max(0.0) as u32, size.height.max(0.0) as u32);
    }

    fn frame_count(&self) -> u64 {
        self.frames
    }
}

fn to_rgba8(color: Srgba) -> [u8; 4] {
    let c: Srgba<u8> = color.into_format();
    [c.red, c.green, c.blue, c.alpha]
}

/// Scale from quad space to normalized device coordinates that keeps the
/// quad square on non-square targets.
fn aspect_fit(size: DeviceSize) -> Vec2 {
    let aspect = aspect_ratio(size);
    Vec2::new((1.0 / aspect).min(1.0), aspect.min(1.0))
}

fn rasterize_quad(target: &mut RgbaImage, tex: &Texture, transform: &[f32; 16]) {
    let (width, height) = target.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    // Rotation and scale live in the upper-left 2x2 block.
    let linear = Mat2::from_cols_array(&[transform[0], transform[1], transform[4], transform[5]]);
    if linear.determinant().abs() <= f32::EPSILON {
        // Collapsed quad covers no pixels.
        return;
    }
    let inverse = linear.inverse();

    let size = DeviceSize::new(width as f32, height as f32);
    let fit = aspect_fit(size);
    let half = Vec2::new(size.width, size.height) * 0.5;

    let to_screen = |quad: Vec2| {
        let ndc = linear * quad * fit;
        Vec2::new((ndc.x + 1.0) * half.x, (1.0 - ndc.y) * half.y)
    };

    let corners = [
        Vec2::new(-QUAD_HALF_EXTENT, -QUAD_HALF_EXTENT),
        Vec2::new(QUAD_HALF_EXTENT, -QUAD_HALF_EXTENT),
        Vec2::new(-QUAD_HALF_EXTENT, QUAD_HALF_EXTENT),
        Vec2::new(QUAD_HALF_EXTENT, QUAD_HALF_EXTENT),
    ]
    .map(to_screen);

    let min = corners.iter().fold(Vec2::splat(f32::INFINITY), |a, &c| a.min(c));
    let max = corners.iter().fold(Vec2::splat(f32::NEG_INFINITY), |a, &c| a.max(c));

    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = (max.x.ceil().max(0.0) as u32).min(width);
    let y1 = (max.y.ceil().max(0.0) as u32).min(height);

    let tex_size = Vec2::new(tex.width() as f32, tex.height() as f32);

    for y in y0..y1 {
        for x in x0..x1 {
            let ndc = Vec2::new(
                (x as f32 + 0.5) / half.x - 1.0,
                1.0 - (y as f32 + 0.5) / half.y,
            );
            let local = inverse * (ndc / fit);
            if local.x.abs() > QUAD_HALF_EXTENT || local.y.abs() > QUAD_HALF_EXTENT {
                continue;
            }

            // Texture row 0 is the top edge of the quad.
            let uv = Vec2::new(local.x + QUAD_HALF_EXTENT, QUAD_HALF_EXTENT - local.y);
            let texel = uv * tex_size;
            target.get_pixel_mut(x, y).0 = tex.texel(texel.x as u32, texel.y as u32);
        }
    }
}
