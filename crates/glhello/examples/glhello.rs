//! Spins and pulses the demo texture.
//!
//! On macOS this opens a window and renders with Metal. Elsewhere it renders
//! headless with the software backend and writes one PNG per frame.
//!
//! Usage: cargo run --example glhello
//!        GLHELLO_FRAMES=120 GLHELLO_OUT_DIR=/tmp/frames cargo run --example glhello

use glhello::{init_logging, DemoConfig};

fn main() -> anyhow::Result<()> {
    init_logging("info");
    let config = DemoConfig::from_env();
    platform::run(config)
}

#[cfg(target_os = "macos")]
mod platform {
    use anyhow::anyhow;
    use glhello::{Animation, DemoConfig};
    use glhello_core::{create_with, destroy, metal::MetalBackend, Backend, BackendError, DeviceSize};
    use std::time::Instant;
    use winit::{
        application::ApplicationHandler,
        event::WindowEvent,
        event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
        raw_window_handle::HasWindowHandle,
        window::{Window, WindowId},
    };

    struct App {
        config: DemoConfig,
        animation: Animation,
        // Borrows the window, which stays alive for the rest of the process.
        backend: Option<MetalBackend<'static>>,
        window: Option<&'static Window>,
        last_frame: Option<Instant>,
        error: Option<BackendError>,
    }

    impl App {
        fn new(config: DemoConfig) -> Self {
            Self {
                animation: Animation::new(&config),
                config,
                backend: None,
                window: None,
                last_frame: None,
                error: None,
            }
        }
    }

    impl ApplicationHandler for App {
        fn resumed(&mut self, event_loop: &ActiveEventLoop) {
            if self.window.is_some() {
                return;
            }

            let attrs = Window::default_attributes()
                .with_title(self.config.title.clone())
                .with_inner_size(winit::dpi::LogicalSize::new(
                    self.config.width as f64,
                    self.config.height as f64,
                ));
            let window = match event_loop.create_window(attrs) {
                Ok(window) => window,
                Err(err) => {
                    self.error = Some(BackendError::InvalidSurface(err.to_string()));
                    event_loop.exit();
                    return;
                }
            };

            let window: &'static Window = Box::leak(Box::new(window));
            let surface: &'static dyn HasWindowHandle = window;
            match create_with::<MetalBackend>(surface, &self.config.render) {
                Ok(backend) => {
                    window.request_redraw();
                    self.backend = Some(backend);
                    self.window = Some(window);
                }
                Err(err) => {
                    // Decline to render without a backend.
                    self.error = Some(err);
                    event_loop.exit();
                }
            }
        }

        fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
            match event {
                WindowEvent::CloseRequested => {
                    destroy(&mut self.backend);
                    event_loop.exit();
                }
                WindowEvent::Resized(size) => {
                    // Note: size is already in physical pixels
                    if let Some(backend) = &mut self.backend {
                        backend.resize(DeviceSize::new(size.width as f32, size.height as f32));
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let dt = self
                        .last_frame
                        .map_or(0.0, |last| now.duration_since(last).as_secs_f32());
                    self.last_frame = Some(now);
                    self.animation.advance(dt);

                    if let Some(backend) = &mut self.backend {
                        let (angle, scale) = self.animation.frame();
                        backend.draw(angle, scale);
                    }
                    if let Some(window) = self.window {
                        window.request_redraw();
                    }
                }
                _ => {}
            }
        }
    }

    pub fn run(config: DemoConfig) -> anyhow::Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut app = App::new(config);
        event_loop.run_app(&mut app)?;
        destroy(&mut app.backend);

        match app.error {
            Some(err) => Err(anyhow!(err).context("cannot render the demo")),
            None => Ok(()),
        }
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use anyhow::Context;
    use glhello::{render_frames, Animation, DemoConfig};
    use glhello_core::{
        create_with, destroy,
        software::{PixelSurface, SoftwareBackend},
    };
    use std::fs;

    pub fn run(config: DemoConfig) -> anyhow::Result<()> {
        let surface = PixelSurface::new(config.width, config.height);
        let mut backend: Option<SoftwareBackend> = Some(
            create_with(&surface, &config.render).context("cannot render the demo")?,
        );

        fs::create_dir_all(&config.out_dir)
            .with_context(|| format!("creating {}", config.out_dir.display()))?;

        let mut animation = Animation::new(&config);
        for frame in 0..config.frames {
            if let Some(backend) = backend.as_mut() {
                render_frames(backend, &mut animation, 1, config.frame_time());
            }
            let path = config.out_dir.join(format!("frame_{frame:04}.png"));
            surface
                .save_png(&path)
                .with_context(|| format!("writing {}", path.display()))?;
        }

        log::info!(
            "wrote {} frames to {}",
            config.frames,
            config.out_dir.display()
        );
        destroy(&mut backend);
        Ok(())
    }
}
