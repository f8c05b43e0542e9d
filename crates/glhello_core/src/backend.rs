//! Backend trait and handle lifecycle.
//!
//! A backend owns all rendering state bound to one displayable surface. The
//! caller holds it as `Option<B>`: `Some` between a successful [`create`] and
//! [`destroy`], `None` otherwise. Dropping a backend releases its resources,
//! so early returns and panics clean up as well.

use crate::{BackendError, DeviceSize};
use palette::Srgba;

/// Per-backend settings fixed at creation.
#[derive(Clone, Debug)]
pub struct RenderConfig {
    /// Colour the surface is cleared to before the quad is drawn.
    pub clear_color: Srgba,
    /// Wait for display sync when presenting.
    pub vsync: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: Srgba::new(0.05, 0.05, 0.08, 1.0),
            vsync: true,
        }
    }
}

/// Platform rendering backend: draws the demo texture on a single quad.
///
/// `'s` is the lifetime of the surface the backend renders into.
pub trait Backend<'s>: Sized {
    /// Displayable surface type supplied by the windowing layer.
    type Surface: ?Sized;

    /// Bind a new backend to `surface`.
    fn create_with(surface: &'s Self::Surface, config: &RenderConfig) -> Result<Self, BackendError>;

    /// Bind a new backend to `surface` with the default config.
    fn create(surface: &'s Self::Surface) -> Result<Self, BackendError> {
        Self::create_with(surface, &RenderConfig::default())
    }

    /// Render one frame: the texture rotated by `angle` radians about Z and
    /// scaled uniformly by `scale`.
    fn draw(&mut self, angle: f32, scale: f32);

    /// The surface's drawable size changed.
    fn resize(&mut self, size: DeviceSize);

    /// Number of frames drawn since creation.
    fn frame_count(&self) -> u64;
}

/// Create a backend on `surface`, logging the outcome.
pub fn create<'s, B: Backend<'s>>(surface: &'s B::Surface) -> Result<B, BackendError> {
    create_with(surface, &RenderConfig::default())
}

/// [`create`] with an explicit config.
pub fn create_with<'s, B: Backend<'s>>(
    surface: &'s B::Surface,
    config: &RenderConfig,
) -> Result<B, BackendError> {
    match B::create_with(surface, config) {
        Ok(backend) => {
            log::info!("created {} backend", std::any::type_name::<B>());
            Ok(backend)
        }
        Err(err) => {
            log::error!("backend creation failed (code {}): {err}", err.code());
            Err(err)
        }
    }
}

/// Release the backend in `handle` and leave `None` behind.
///
/// Calling this again on the emptied handle does nothing.
pub fn destroy<'s, B: Backend<'s>>(handle: &mut Option<B>) {
    if let Some(backend) = handle.take() {
        log::debug!("destroying backend after {} frames", backend.frame_count());
        drop(backend);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Test surface: records how many backends are alive on it.
    #[derive(Default)]
    struct FakeSurface {
        valid: bool,
        live_backends: Cell<usize>,
    }

    /// Backend that records draws without touching a GPU.
    struct RecordingBackend<'s> {
        surface: &'s FakeSurface,
        frames: u64,
        last: Option<(f32, f32)>,
        size: Option<DeviceSize>,
    }

    impl<'s> Backend<'s> for RecordingBackend<'s> {
        type Surface = FakeSurface;

        fn create_with(
            surface: &'s FakeSurface,
            _config: &RenderConfig,
        ) -> Result<Self, BackendError> {
            if !surface.valid {
                return Err(BackendError::InvalidSurface("fake surface is invalid".into()));
            }
            surface.live_backends.set(surface.live_backends.get() + 1);
            Ok(Self {
                surface,
                frames: 0,
                last: None,
                size: None,
            })
        }

        fn draw(&mut self, angle: f32, scale: f32) {
            self.frames += 1;
            self.last = Some((angle, scale));
        }

        fn resize(&mut self, size: DeviceSize) {
            self.size = Some(size);
        }

        fn frame_count(&self) -> u64 {
            self.frames
        }
    }

    impl Drop for RecordingBackend<'_> {
        fn drop(&mut self) {
            let live = self.surface.live_backends.get();
            self.surface.live_backends.set(live - 1);
        }
    }

    fn valid_surface() -> FakeSurface {
        FakeSurface {
            valid: true,
            ..Default::default()
        }
    }

    #[test]
    fn create_on_valid_surface_returns_handle() {
        let surface = valid_surface();
        let backend: RecordingBackend = create(&surface).unwrap();
        assert_eq!(backend.frame_count(), 0);
        assert_eq!(surface.live_backends.get(), 1);
    }

    #[test]
    fn create_on_invalid_surface_returns_nonzero_code() {
        let surface = FakeSurface::default();
        let err = create::<RecordingBackend>(&surface).err().unwrap();
        assert_ne!(err.code(), 0);
        assert_eq!(surface.live_backends.get(), 0);
    }

    #[test]
    fn create_draw_destroy_sequence() {
        let surface = valid_surface();
        let mut handle: Option<RecordingBackend> = Some(create(&surface).unwrap());

        for i in 0..10 {
            let backend = handle.as_mut().unwrap();
            backend.draw(i as f32, 1.0 + i as f32);
        }
        assert_eq!(handle.as_ref().unwrap().frame_count(), 10);
        assert_eq!(handle.as_ref().unwrap().last, Some((9.0, 10.0)));

        destroy(&mut handle);
        assert!(handle.is_none());
        assert_eq!(surface.live_backends.get(), 0);

        // Second destroy on the emptied handle is a no-op.
        destroy(&mut handle);
        assert!(handle.is_none());
        assert_eq!(surface.live_backends.get(), 0);
    }

    #[test]
    fn dropping_handle_releases_backend() {
        let surface = valid_surface();
        {
            let _backend: RecordingBackend = create(&surface).unwrap();
            assert_eq!(surface.live_backends.get(), 1);
        }
        assert_eq!(surface.live_backends.get(), 0);
    }

    #[test]
    fn resize_is_forwarded() {
        let surface = valid_surface();
        let mut backend: RecordingBackend = create(&surface).unwrap();
        backend.resize(DeviceSize::new(640.0, 480.0));
        assert_eq!(backend.size, Some(DeviceSize::new(640.0, 480.0)));
    }

    #[test]
    fn default_config_clears_to_opaque() {
        let config = RenderConfig::default();
        assert_eq!(config.clear_color.alpha, 1.0);
        assert!(config.vsync);
    }
}
