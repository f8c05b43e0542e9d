//! Procedurally generated demo texture.
//!
//! The texture is generated once, on first request, and shared read-only for
//! the rest of the process. Backends borrow the pixels directly; nothing is
//! copied on the way to the GPU upload.

use crate::TextureError;
use std::sync::OnceLock;

pub const TEXTURE_SIZE: u32 = 256;
const CHECKER_CELLS: u32 = 8;
const DARK_TEXEL: [u8; 4] = [0x20, 0x24, 0x60, 0xff];
const BORDER_TEXEL: [u8; 4] = [0xff, 0xff, 0xff, 0xff];

/// Pixel layout of a texture buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One byte of luminance per pixel.
    Gray8,
    /// r, g, b, a bytes per pixel.
    Rgba8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Rgba8 => 4,
        }
    }
}

/// An immutable image: pixel buffer plus its dimensions and format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl Texture {
    /// Wrap a pixel buffer, checking that it is non-empty and that its length
    /// matches the dimensions.
    pub fn new(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if pixels.len() != expected {
            return Err(TextureError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            pixels,
            width,
            height,
            format,
        })
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Bytes per row of pixels.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Read the texel at (x, y) expanded to RGBA. Coordinates are clamped to
    /// the texture bounds.
    pub fn texel(&self, x: u32, y: u32) -> [u8; 4] {
        let x = x.min(self.width.saturating_sub(1)) as usize;
        let y = y.min(self.height.saturating_sub(1)) as usize;
        let bpp = self.format.bytes_per_pixel();
        let offset = y * self.stride() + x * bpp;
        match self.format {
            PixelFormat::Gray8 => {
                let l = self.pixels[offset];
                [l, l, l, 0xff]
            }
            PixelFormat::Rgba8 => {
                let p = &self.pixels[offset..offset + 4];
                [p[0], p[1], p[2], p[3]]
            }
        }
    }
}

static DEMO_TEXTURE: OnceLock<Texture> = OnceLock::new();

/// The shared demo texture.
///
/// Every call returns the same descriptor; the pixels live until process exit.
pub fn texture() -> &'static Texture {
    DEMO_TEXTURE.get_or_init(|| {
        log::debug!("generating {TEXTURE_SIZE}x{TEXTURE_SIZE} demo texture");
        generate_checkerboard(TEXTURE_SIZE)
    })
}

/// Checkerboard with gradient light cells, dark blue cells and a white border.
fn generate_checkerboard(size: u32) -> Texture {
    let cell = (size / CHECKER_CELLS).max(1);
    let mut pixels = Vec::with_capacity(size as usize * size as usize * 4);

    for y in 0..size {
        for x in 0..size {
            let on_border = x == 0 || y == 0 || x == size - 1 || y == size - 1;
            let texel = if on_border {
                BORDER_TEXEL
            } else if ((x / cell) + (y / cell)) % 2 == 0 {
                [
                    (x * 255 / (size - 1)) as u8,
                    (y * 255 / (size - 1)) as u8,
                    0x80,
                    0xff,
                ]
            } else {
                DARK_TEXEL
            };
            pixels.extend_from_slice(&texel);
        }
    }

    // Length is size * size * 4 by construction.
    Texture {
        pixels,
        width: size,
        height: size,
        format: PixelFormat::Rgba8,
    }
}
