//! GPU, window and page state shared by every flow.
//!
//! [`Context`] owns the surface, device, queue, the shared pipelines and
//! layouts, the single directional light, the text renderer, the pointer
//! state and the [`Page`] whose scroll position every section follows. Flow constructors
//! only get the cloneable part of it, the [`InitContext`].

use std::sync::Arc;

use anyhow::Context as _;
use instant::{Duration, Instant};
use winit::{dpi::PhysicalPosition, window::Window};

use crate::{
    data_structures::texture,
    page::{Page, PageLayout, Rect},
    pipelines::{
        Layouts, Pipelines,
        light::{LightResources, LightUniform},
    },
};

/// Font bundled with the assets; the only one available in the browser.
#[cfg(feature = "ui")]
const FONT_FILE: &str = "fonts/page.ttf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButtonState {
    Left,
    Right,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MouseState {
    /// Last cursor position in physical pixels.
    pub coords: PhysicalPosition<f64>,
    pub pressed: MouseButtonState,
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub clear_colour: wgpu::Color,
    pub pipelines: Pipelines,
    pub layouts: Layouts,
    pub light: LightResources,
    #[cfg(feature = "ui")]
    pub text: crate::text::TextSystem,
    pub mouse: MouseState,
    pub page: Page,
    started: Instant,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let size = window.inner_size();

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Cannot create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable graphics adapter")?;

        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await
            .context("Cannot open the graphics device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders output linear colour, so prefer an sRGB surface.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("The surface supports no texture format")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let layouts = Layouts::new(&device);
        let pipelines = Pipelines::new(&device, config.format, &layouts);

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let light = LightResources::new(&device, &layouts.light, LightUniform::default());

        #[cfg(feature = "ui")]
        let text = {
            let fonts = match crate::resources::texture::load_binary(FONT_FILE).await {
                Ok(font) => vec![font],
                Err(e) => {
                    log::warn!("Falling back to system fonts: {:#}", e);
                    Vec::new()
                }
            };
            crate::text::TextSystem::new(&device, &queue, config.format, fonts)
        };

        let logical = size.to_logical::<f32>(window.scale_factor());
        let page = Page::new(PageLayout::default(), [logical.width, logical.height]);

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            clear_colour: wgpu::Color::WHITE,
            pipelines,
            layouts,
            light,
            #[cfg(feature = "ui")]
            text,
            mouse: MouseState::default(),
            page,
            started: Instant::now(),
        })
    }

    /// Time since the context was created; the clock for timers and scroll
    /// animations.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn scale_factor(&self) -> f32 {
        self.window.scale_factor() as f32
    }

    /// Cursor position in logical pixels.
    pub fn cursor(&self) -> [f32; 2] {
        let scale = self.scale_factor();
        [
            self.mouse.coords.x as f32 / scale,
            self.mouse.coords.y as f32 / scale,
        ]
    }

    /// Converts a logical rectangle into a physical viewport clipped to the
    /// surface. `None` if nothing of it is on screen.
    pub fn to_viewport(&self, rect: &Rect) -> Option<[u32; 4]> {
        rect.scaled(self.scale_factor())
            .to_pixels(self.config.width, self.config.height)
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }
}

/// The part of the [`Context`] that flow constructors can use to create GPU
/// resources before the first frame.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub format: wgpu::TextureFormat,
    pub layouts: Layouts,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            // wgpu handles are reference counted, so these clones are shallow
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            format: ctx.config.format,
            layouts: ctx.layouts.clone(),
        }
    }
}
