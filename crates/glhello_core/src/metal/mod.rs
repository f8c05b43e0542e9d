//! Metal backend implementation (macOS only).

/// Metal shader source, compiled at runtime.
const SHADER_SOURCE: &str = include_str!("shaders.metal");

use crate::{
    aspect_ratio, build_rotate_scale_z, texture, Backend, BackendError, DeviceSize, PixelFormat,
    RenderConfig, Texture,
};
use core_graphics_types::geometry::CGSize;
use foreign_types::ForeignType;
use metal::{
    Buffer, CommandQueue, CompileOptions, Device, MTLClearColor, MTLLoadAction, MTLPixelFormat,
    MTLPrimitiveType, MTLResourceOptions, MTLSamplerAddressMode, MTLSamplerMinMagFilter,
    MTLStoreAction, MTLTextureUsage, MetalLayer, RenderPassDescriptor, RenderPipelineDescriptor,
    RenderPipelineState, SamplerDescriptor, SamplerState, TextureDescriptor,
};
use objc2::msg_send;
use objc2::runtime::AnyObject;
use objc2_app_kit::NSView;
use std::borrow::Cow;
use std::marker::PhantomData;
use std::mem;
use std::ptr::{self, NonNull};
use winit::raw_window_handle::{HasWindowHandle, RawWindowHandle};

const DRAWABLE_FORMAT: MTLPixelFormat = MTLPixelFormat::BGRA8Unorm;

/// Quad vertex: position in quad space, texture coordinate.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Triangle strip covering the quad. Texture row 0 maps to the top edge.
const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex {
        position: [-0.5, -0.5],
        uv: [0.0, 1.0],
    },
    QuadVertex {
        position: [0.5, -0.5],
        uv: [1.0, 1.0],
    },
    QuadVertex {
        position: [-0.5, 0.5],
        uv: [0.0, 0.0],
    },
    QuadVertex {
        position: [0.5, 0.5],
        uv: [1.0, 0.0],
    },
];

/// Per-frame vertex uniforms, laid out to match `Uniforms` in the shader.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Uniforms {
    /// Column-major rotate/scale matrix.
    pub transform: [f32; 16],
    /// Quad-space to clip-space scale that keeps the quad square.
    pub fit: [f32; 2],
    /// Padding to the 16-byte struct alignment of `float4x4`.
    pub _padding: [f32; 2],
}

impl Uniforms {
    fn new(size: DeviceSize) -> Self {
        let mut uniforms = Self {
            transform: [0.0; 16],
            fit: [1.0, 1.0],
            _padding: [0.0; 2],
        };
        uniforms.set_size(size);
        uniforms
    }

    fn set_size(&mut self, size: DeviceSize) {
        let aspect = aspect_ratio(size);
        self.fit = [(1.0 / aspect).min(1.0), aspect.min(1.0)];
    }
}

/// The CAMetalLayer attached to a window's view.
///
/// Dropping the surface takes the layer back off the view and restores the
/// view's previous `wantsLayer` setting.
struct MetalSurface<'s> {
    view: NonNull<NSView>,
    layer: MetalLayer,
    drawable_size: DeviceSize,
    view_wanted_layer: bool,
    // The view belongs to the window borrowed for 's.
    _window: PhantomData<&'s ()>,
}

impl<'s> MetalSurface<'s> {
    /// Attach a new Metal layer to the AppKit view behind `window`.
    fn attach(
        window: &'s (dyn HasWindowHandle + 's),
        device: &Device,
        config: &RenderConfig,
    ) -> Result<Self, BackendError> {
        let handle = window
            .window_handle()
            .map_err(|e| BackendError::InvalidSurface(e.to_string()))?;
        let RawWindowHandle::AppKit(handle) = handle.as_raw() else {
            return Err(BackendError::InvalidSurface(
                "expected an AppKit window handle".into(),
            ));
        };

        let view = handle.ns_view.cast::<NSView>();
        // The handle guarantees a non-null NSView pointer that lives as long
        // as the window.
        let ns_view: &NSView = unsafe { view.as_ref() };

        let layer = MetalLayer::new();
        layer.set_device(device);
        layer.set_pixel_format(DRAWABLE_FORMAT);
        layer.set_presents_with_transaction(false);
        layer.set_display_sync_enabled(config.vsync);

        let layer_ptr = layer.as_ptr() as *mut AnyObject;
        let (view_wanted_layer, width, height) = unsafe {
            let wanted = ns_view.wantsLayer();
            ns_view.setWantsLayer(true);
            let _: () = msg_send![ns_view, setLayer: layer_ptr];

            let bounds = ns_view.bounds();
            let scale = ns_view.window().map_or(1.0, |w| w.backingScaleFactor());
            (wanted, bounds.size.width * scale, bounds.size.height * scale)
        };

        let mut surface = Self {
            view,
            layer,
            drawable_size: DeviceSize::new(0.0, 0.0),
            view_wanted_layer,
            _window: PhantomData,
        };
        surface.resize(DeviceSize::new(width as f32, height as f32));
        Ok(surface)
    }

    fn resize(&mut self, size: DeviceSize) {
        self.drawable_size = size;
        self.layer
            .set_drawable_size(CGSize::new(size.width as f64, size.height as f64));
    }
}

impl Drop for MetalSurface<'_> {
    fn drop(&mut self) {
        // Still valid: the window is borrowed for 's.
        let ns_view: &NSView = unsafe { self.view.as_ref() };
        unsafe {
            let _: () = msg_send![ns_view, setLayer: ptr::null_mut::<AnyObject>()];
            if !self.view_wanted_layer {
                ns_view.setWantsLayer(false);
            }
        }
        log::debug!("detached Metal layer from view");
    }
}

/// Renders the demo texture on a transformed quad into a window's view.
pub struct MetalBackend<'s> {
    command_queue: CommandQueue,
    pipeline: RenderPipelineState,
    vertex_buffer: Buffer,
    texture: metal::Texture,
    sampler: SamplerState,
    surface: MetalSurface<'s>,
    uniforms: Uniforms,
    clear_color: MTLClearColor,
    frames: u64,
    // Declared last: every resource above is released before the device.
    device: Device,
}

impl MetalBackend<'_> {
    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn drawable_size(&self) -> DeviceSize {
        self.surface.drawable_size
    }

    fn build_pipeline(device: &Device) -> Result<RenderPipelineState, BackendError> {
        let library = device
            .new_library_with_source(SHADER_SOURCE, &CompileOptions::new())
            .map_err(BackendError::Shader)?;
        let vertex_fn = library
            .get_function("vertex_main", None)
            .map_err(BackendError::Shader)?;
        let fragment_fn = library
            .get_function("fragment_main", None)
            .map_err(BackendError::Shader)?;

        let pipeline_desc = RenderPipelineDescriptor::new();
        pipeline_desc.set_vertex_function(Some(&vertex_fn));
        pipeline_desc.set_fragment_function(Some(&fragment_fn));
        let color_attachment = pipeline_desc
            .color_attachments()
            .object_at(0)
            .ok_or_else(|| BackendError::Pipeline("missing color attachment 0".into()))?;
        color_attachment.set_pixel_format(DRAWABLE_FORMAT);

        device
            .new_render_pipeline_state(&pipeline_desc)
            .map_err(BackendError::Pipeline)
    }

    fn upload_texture(device: &Device, tex: &Texture) -> metal::Texture {
        // Gray textures are expanded so the shader always samples RGBA.
        let pixels: Cow<'_, [u8]> = match tex.format() {
            PixelFormat::Rgba8 => Cow::Borrowed(tex.pixels()),
            PixelFormat::Gray8 => Cow::Owned(
                tex.pixels()
                    .iter()
                    .flat_map(|&l| [l, l, l, 0xff])
                    .collect(),
            ),
        };

        let descriptor = TextureDescriptor::new();
        descriptor.set_width(tex.width() as u64);
        descriptor.set_height(tex.height() as u64);
        descriptor.set_pixel_format(MTLPixelFormat::RGBA8Unorm);
        descriptor.set_usage(MTLTextureUsage::ShaderRead);

        let gpu_texture = device.new_texture(&descriptor);
        let region = metal::MTLRegion {
            origin: metal::MTLOrigin { x: 0, y: 0, z: 0 },
            size: metal::MTLSize {
                width: tex.width() as u64,
                height: tex.height() as u64,
                depth: 1,
            },
        };
        gpu_texture.replace_region(
            region,
            0,
            pixels.as_ptr() as *const _,
            tex.width() as u64 * 4, // bytes per row
        );
        gpu_texture
    }

    fn build_sampler(device: &Device) -> SamplerState {
        let descriptor = SamplerDescriptor::new();
        descriptor.set_min_filter(MTLSamplerMinMagFilter::Linear);
        descriptor.set_mag_filter(MTLSamplerMinMagFilter::Linear);
        descriptor.set_address_mode_s(MTLSamplerAddressMode::ClampToEdge);
        descriptor.set_address_mode_t(MTLSamplerAddressMode::ClampToEdge);
        device.new_sampler(&descriptor)
    }
}

impl<'s> Backend<'s> for MetalBackend<'s> {
    type Surface = dyn HasWindowHandle + 's;

    fn create_with(
        window: &'s (dyn HasWindowHandle + 's),
        config: &RenderConfig,
    ) -> Result<Self, BackendError> {
        let device = Device::system_default().ok_or(BackendError::NoDevice)?;
        log::debug!("using Metal device {}", device.name());

        let surface = MetalSurface::attach(window, &device, config)?;
        let pipeline = Self::build_pipeline(&device)?;
        let command_queue = device.new_command_queue();

        let vertex_buffer = device.new_buffer_with_data(
            QUAD_VERTICES.as_ptr() as *const _,
            (QUAD_VERTICES.len() * mem::size_of::<QuadVertex>()) as u64,
            MTLResourceOptions::StorageModeShared,
        );
        let gpu_texture = Self::upload_texture(&device, texture());
        let sampler = Self::build_sampler(&device);

        let c = config.clear_color;
        let clear_color = MTLClearColor::new(
            c.red as f64,
            c.green as f64,
            c.blue as f64,
            c.alpha as f64,
        );

        Ok(Self {
            command_queue,
            pipeline,
            vertex_buffer,
            texture: gpu_texture,
            sampler,
            uniforms: Uniforms::new(surface.drawable_size),
            surface,
            clear_color,
            frames: 0,
            device,
        })
    }

    fn draw(&mut self, angle: f32, scale: f32) {
        build_rotate_scale_z(&mut self.uniforms.transform, angle, scale);

        let Some(drawable) = self.surface.layer.next_drawable() else {
            log::trace!("no drawable available, skipping frame");
            return;
        };

        let command_buffer = self.command_queue.new_command_buffer();

        let render_pass_desc = RenderPassDescriptor::new();
        let Some(color_attachment) = render_pass_desc.color_attachments().object_at(0) else {
            return;
        };
        color_attachment.set_texture(Some(drawable.texture()));
        color_attachment.set_load_action(MTLLoadAction::Clear);
        color_attachment.set_clear_color(self.clear_color);
        color_attachment.set_store_action(MTLStoreAction::Store);

        let encoder = command_buffer.new_render_command_encoder(render_pass_desc);
        encoder.set_render_pipeline_state(&self.pipeline);
        encoder.set_vertex_buffer(0, Some(&self.vertex_buffer), 0);
        encoder.set_vertex_bytes(
            1,
            mem::size_of::<Uniforms>() as u64,
            &self.uniforms as *const Uniforms as *const _,
        );
        encoder.set_fragment_texture(0, Some(&self.texture));
        encoder.set_fragment_sampler_state(0, Some(&self.sampler));
        encoder.draw_primitives(MTLPrimitiveType::TriangleStrip, 0, 4);
        encoder.end_encoding();

        command_buffer.present_drawable(drawable);
        command_buffer.commit();

        self.frames += 1;
    }

    fn resize(&mut self, size: DeviceSize) {
        log::debug!("resizing Metal drawable to {}x{}", size.width, size.height);
        self.surface.resize(size);
        self.uniforms.set_size(size);
    }

    fn frame_count(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create, destroy};
    use objc2::rc::Retained;
    use objc2::{class, msg_send_id};
    use std::ffi::c_void;
    use winit::raw_window_handle::{AppKitWindowHandle, HandleError, WindowHandle};

    /// A window that has no native handle to offer.
    struct DetachedWindow;

    impl HasWindowHandle for DetachedWindow {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    /// A bare AppKit view standing in for a window.
    struct ViewWindow {
        view: Retained<AnyObject>,
    }

    impl ViewWindow {
        fn new() -> Self {
            let view: Retained<AnyObject> = unsafe { msg_send_id![class!(NSView), new] };
            Self { view }
        }

        fn layer(&self) -> *mut AnyObject {
            unsafe { msg_send![&*self.view, layer] }
        }

        fn wants_layer(&self) -> bool {
            unsafe { msg_send![&*self.view, wantsLayer] }
        }
    }

    impl HasWindowHandle for ViewWindow {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            let view = NonNull::from(&*self.view).cast::<c_void>();
            let raw = RawWindowHandle::AppKit(AppKitWindowHandle::new(view));
            // The view outlives the returned handle.
            Ok(unsafe { WindowHandle::borrow_raw(raw) })
        }
    }

    #[test]
    fn uniforms_match_shader_layout() {
        // float4x4 (64) + float2 (8), padded to 16-byte alignment.
        assert_eq!(mem::size_of::<Uniforms>(), 80);
        assert_eq!(mem::size_of::<QuadVertex>(), 16);
    }

    #[test]
    fn uniforms_fit_keeps_quad_square() {
        let wide = Uniforms::new(DeviceSize::new(800.0, 400.0));
        assert_eq!(wide.fit, [0.5, 1.0]);

        let tall = Uniforms::new(DeviceSize::new(300.0, 600.0));
        assert_eq!(tall.fit, [1.0, 0.5]);
    }

    #[test]
    fn quad_vertices_cover_unit_square() {
        for v in QUAD_VERTICES {
            assert_eq!(v.position[0].abs(), 0.5);
            assert_eq!(v.position[1].abs(), 0.5);
            // Top edge samples texture row 0.
            assert_eq!(v.uv[1], 0.5 - v.position[1]);
        }
    }

    #[test]
    fn create_without_window_handle_fails() {
        let window: &dyn HasWindowHandle = &DetachedWindow;
        match create::<MetalBackend>(window) {
            Err(err) => {
                // No Metal device is also a creation failure on headless CI.
                assert!(matches!(
                    err,
                    BackendError::InvalidSurface(_) | BackendError::NoDevice
                ));
                assert_ne!(err.code(), 0);
            }
            Ok(_) => panic!("backend created on a detached window"),
        }
    }

    #[test]
    fn destroy_detaches_layer_from_view() {
        let window = ViewWindow::new();
        assert!(window.layer().is_null());
        assert!(!window.wants_layer());

        let surface: &dyn HasWindowHandle = &window;
        let mut handle = match create::<MetalBackend>(surface) {
            Ok(backend) => Some(backend),
            // Nothing to attach without a GPU.
            Err(BackendError::NoDevice) => return,
            Err(err) => panic!("backend creation failed: {err}"),
        };

        let attached = handle.as_ref().map(|b| b.surface.layer.as_ptr() as *mut AnyObject);
        assert_eq!(Some(window.layer()), attached);
        assert!(window.wants_layer());

        destroy(&mut handle);
        assert!(handle.is_none());
        assert!(window.layer().is_null());
        assert!(!window.wants_layer());
    }
}
