//! The on-screen overlay: a winit window presenting frames through wgpu.
//!
//! Frames are copied straight into the swapchain texture with
//! `Queue::write_texture`, so no render pipeline is needed. The surface is
//! configured with `COPY_DST` usage for that; adapters that cannot present
//! from a copy are rejected at styling time.

use std::sync::Arc;

use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowAttributes, WindowLevel};

use custom_splasher_core::logging::targets;
use custom_splasher_media::Frame;

use crate::error::SurfaceError;
use crate::geometry::OverlayGeometry;
use crate::surface::Surface;

/// Byte order of the swapchain texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelOrder {
    Rgba,
    Bgra,
}

impl PixelOrder {
    fn of(format: wgpu::TextureFormat) -> Option<Self> {
        match format {
            wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => Some(Self::Rgba),
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => Some(Self::Bgra),
            _ => None,
        }
    }

    fn expand(self, frame: &Frame) -> Vec<u8> {
        match self {
            Self::Rgba => frame.to_rgba(),
            Self::Bgra => frame.to_bgra(),
        }
    }
}

/// GPU state for presenting into one window.
struct Presenter {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    order: PixelOrder,
}

impl Presenter {
    fn new(window: Arc<Window>, width: u32, height: u32) -> Result<Self, SurfaceError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .ok_or(SurfaceError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        tracing::info!(
            target: targets::OVERLAY,
            name = adapter_info.name,
            backend = ?adapter_info.backend,
            "selected graphics adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("custom-splasher-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::MemoryUsage,
            },
            None,
        ))?;

        let capabilities = surface.get_capabilities(&adapter);
        if !capabilities.usages.contains(wgpu::TextureUsages::COPY_DST) {
            return Err(SurfaceError::Unsupported(
                "surface textures cannot be copy destinations".to_string(),
            ));
        }

        let (format, order) = capabilities
            .formats
            .iter()
            .find_map(|&f| PixelOrder::of(f).map(|order| (f, order)))
            .ok_or_else(|| {
                SurfaceError::Unsupported(format!(
                    "no 8-bit RGBA/BGRA surface format in {:?}",
                    capabilities.formats
                ))
            })?;

        let alpha_mode = capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::COPY_DST,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        tracing::info!(
            target: targets::OVERLAY,
            format = ?format,
            width = config.width,
            height = config.height,
            "overlay surface configured"
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            order,
        })
    }

    fn acquire(&mut self) -> Result<wgpu::SurfaceTexture, SurfaceError> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(texture),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!(target: targets::OVERLAY, "surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                Ok(self.surface.get_current_texture()?)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn present(&mut self, window: &Window, frame: &Frame) -> Result<(), SurfaceError> {
        let output = self.acquire()?;
        let data = self.order.expand(frame);

        // The frame is styled to the overlay size; copy whatever overlaps.
        let width = frame.width().min(self.config.width);
        let height = frame.height().min(self.config.height);

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &output.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * frame.width()),
                rows_per_image: Some(frame.height()),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::empty());

        window.pre_present_notify();
        output.present();
        Ok(())
    }
}

/// The splash overlay window.
pub struct OverlayWindow {
    window: Arc<Window>,
    presenter: Option<Presenter>,
    /// Shown again on redraw requests.
    last_frame: Option<Frame>,
    closed: bool,
}

impl OverlayWindow {
    /// Create the overlay window, hidden until it is styled.
    pub fn create(event_loop: &ActiveEventLoop) -> Result<Self, SurfaceError> {
        let attributes = WindowAttributes::default()
            .with_title("Custom Splasher")
            .with_visible(false)
            .with_decorations(false)
            .with_resizable(false)
            .with_window_level(WindowLevel::AlwaysOnTop);

        let window = Arc::new(event_loop.create_window(attributes)?);
        tracing::debug!(target: targets::OVERLAY, id = ?window.id(), "overlay window created");

        Ok(Self {
            window,
            presenter: None,
            last_frame: None,
            closed: false,
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    /// Present the last frame again, e.g. after the window was exposed.
    pub fn redraw(&mut self) -> Result<(), SurfaceError> {
        match self.last_frame.take() {
            Some(frame) => {
                let result = self.present(&frame);
                self.last_frame = Some(frame);
                result
            }
            None => Ok(()),
        }
    }
}

impl Surface for OverlayWindow {
    fn screen_size(&self) -> Option<(u32, u32)> {
        self.window
            .current_monitor()
            .or_else(|| self.window.primary_monitor())
            .map(|monitor| {
                let size = monitor.size();
                (size.width, size.height)
            })
    }

    fn apply_style(&mut self, geometry: &OverlayGeometry, title: &str) -> Result<(), SurfaceError> {
        if self.closed {
            return Err(SurfaceError::Closed);
        }

        self.window.set_title(title);
        self.window.set_decorations(false);
        self.window.set_window_level(WindowLevel::AlwaysOnTop);
        self.window
            .set_outer_position(PhysicalPosition::new(geometry.x, geometry.y));
        let _ = self
            .window
            .request_inner_size(PhysicalSize::new(geometry.width, geometry.height));

        self.presenter = Some(Presenter::new(
            Arc::clone(&self.window),
            geometry.width,
            geometry.height,
        )?);
        self.window.set_visible(true);
        Ok(())
    }

    fn present(&mut self, frame: &Frame) -> Result<(), SurfaceError> {
        let presenter = self.presenter.as_mut().ok_or(SurfaceError::Closed)?;
        presenter.present(&self.window, frame)?;
        self.last_frame = Some(frame.clone());
        Ok(())
    }

    fn request_foreground(&mut self) -> Result<(), SurfaceError> {
        if self.closed {
            return Err(SurfaceError::Closed);
        }
        if !self.window.has_focus() {
            self.window.focus_window();
            tracing::trace!(target: targets::OVERLAY, "requested foreground");
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        // The wgpu surface must go before the window it points into.
        self.presenter = None;
        self.last_frame = None;
        self.window.set_visible(false);
        tracing::debug!(target: targets::OVERLAY, "overlay closed");
    }
}

impl std::fmt::Debug for OverlayWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayWindow")
            .field("window", &self.window.id())
            .field("has_presenter", &self.presenter.is_some())
            .field("closed", &self.closed)
            .finish()
    }
}
