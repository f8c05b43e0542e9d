//! Texture, transform and rendering backend lifecycle for the glhello demo.
//!
//! Exactly one backend is compiled per target: [`metal::MetalBackend`] on
//! macOS, [`software::SoftwareBackend`] everywhere else. [`PlatformBackend`]
//! names whichever one is present.

pub mod backend;
pub mod error;
pub mod geometry;
pub mod texture;
pub mod transform;

#[cfg(target_os = "macos")]
pub mod metal;

#[cfg(not(target_os = "macos"))]
pub mod software;

pub use backend::*;
pub use error::*;
pub use geometry::*;
pub use texture::*;
pub use transform::*;

// Re-export commonly used palette types
pub use palette::Srgba;

#[cfg(target_os = "macos")]
pub type PlatformBackend<'s> = metal::MetalBackend<'s>;

#[cfg(not(target_os = "macos"))]
pub type PlatformBackend<'s> = software::SoftwareBackend<'s>;
