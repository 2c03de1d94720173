//! Flow control and application event loop.
//!
//! A "flow" is one self-contained part of the page (the navbar, the hero
//! banner, a section) that handles input, updates its state and says what to
//! draw each frame. The loop owns the flows in a fixed order and coordinates
//! rendering, picking, scrolling and event distribution.
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S>`] is the trait for the parts of the page
//! - [`Out`] lets a hook reconfigure the [`Context`] after it returns
//!
//! # Lifecycle Flow
//!
//! The event loop follows this pattern each frame:
//! 1. Forward window events to every flow (`on_window_events`)
//! 2. Apply wheel input to the shared page scroll and advance smooth scrolling
//! 3. Broadcast a changed scroll position (`on_scroll`)
//! 4. Update flow state (`on_update`)
//! 5. Collect every flow's [`Render`] and draw viewports, then panels, then text
//! 6. On a left click, render the pick buffer and call `on_click` on the owners
//! 7. On exit, tear every flow down (`on_teardown`)

use std::{collections::HashSet, fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::{MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    context::{Context, InitContext, MouseButtonState},
    data_structures::{model::DrawModel, texture::Texture},
    page::LINE_HEIGHT,
    pick::draw_to_pick_buffer,
    render::{Flat, Render, Viewport},
    text::Label,
};

/// Output of every lifecycle hook.
///
/// `Out::Configure` modifies the Context after the hook returned, for
/// instance to start a smooth scroll or change the clear colour.
///
/// `Empty` is the default output when nothing needs to change.
pub enum Out {
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

impl Default for Out {
    fn default() -> Self {
        Self::Empty
    }
}

#[cfg(feature = "integration-tests")]
pub enum ImageTestResult {
    Passed,
    Waiting,
    Failed,
}

/// Trait for implementing one part of the page.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after every flow was constructed; configure the context here
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_scroll()` is called whenever the shared page scroll position changed
/// 4. `on_update()` is called every frame
/// 5. `on_click()` is called when an object with one of this flow's pick ids is clicked
/// 6. `on_render()` is called each frame and specifies how to render `self`
/// 7. `on_teardown()` is called once when the application exits
pub trait GraphicsFlow<S> {
    /// Initialize the flow and configure the context.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out;

    /// Handle a click on an object rendered by this flow.
    ///
    /// `id` is the pick id of the clicked geometry as set in `on_render`.
    /// Id 0 is never reported.
    fn on_click(&mut self, ctx: &Context, state: &mut S, id: u32) -> Out;

    /// React to the page scroll position, in logical pixels from the top.
    fn on_scroll(&mut self, ctx: &Context, state: &mut S, position: f32) -> Out;

    /// Update state every frame. `dt` is the time since the previous frame.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out;

    /// Handle window events (keyboard, mouse, window resizing, etc.).
    fn on_window_events(&mut self, ctx: &Context, state: &mut S, event: &WindowEvent) -> Out;

    /// Release timers and other pending work before the application exits.
    fn on_teardown(&mut self, _state: &mut S) {}

    /// Return renderable objects for this flow.
    fn on_render(&self) -> Render<'_>;

    /// Check a rendered frame in an image test. Flows without checks pass.
    #[cfg(feature = "integration-tests")]
    fn render_to_texture(
        &self,
        _ctx: &Context,
        _state: &mut S,
        _texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error> {
        Ok(ImageTestResult::Passed)
    }
}

impl<S> Debug for dyn GraphicsFlow<S> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Type alias for a flow constructor (factory function).
///
/// A flow constructor takes an `InitContext` and asynchronously returns a
/// boxed `GraphicsFlow`, so flows can load their assets before the first frame.
pub type FlowConsturctor<S> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S>>>>>>;

/// Title and initial logical size of the window.
#[derive(Debug, Clone)]
pub struct WindowSettings {
    pub title: String,
    pub size: [u32; 2],
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: String::from("AI Labs"),
            size: [1280, 800],
        }
    }
}

/// Application state bundle: GPU context, app state, and surface status.
#[derive(Debug)]
pub struct AppState<S: 'static> {
    pub(crate) ctx: Context,
    state: S,
    is_surface_configured: bool,
}

impl<S: Default> AppState<S> {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        Ok(Self {
            ctx,
            state: S::default(),
            is_surface_configured: false,
        })
    }
}

impl<S> AppState<S> {
    /// Reconfigures the surface for a physical size and resizes the page to
    /// the matching logical size. Returns whether the scroll position moved.
    fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.ctx.config.width = width;
        self.ctx.config.height = height;
        self.is_surface_configured = true;
        self.ctx
            .surface
            .configure(&self.ctx.device, &self.ctx.config);
        self.ctx.depth_texture = Texture::create_depth_texture(
            &self.ctx.device,
            [self.ctx.config.width, self.ctx.config.height],
            "depth_texture",
        );
        let scale = self.ctx.scale_factor();
        self.ctx
            .page
            .resize(width as f32 / scale, height as f32 / scale)
    }

    #[cfg(feature = "integration-tests")]
    fn get_test_3d_extent(&self) -> wgpu::Extent3d {
        // Whole rows of 64 texels need no copy padding.
        wgpu::Extent3d {
            width: self.ctx.config.width.next_multiple_of(64),
            height: self.ctx.config.height,
            depth_or_array_layers: 1,
        }
    }

    #[cfg(feature = "integration-tests")]
    fn get_test_texture(&self, extent3d: wgpu::Extent3d) -> wgpu::Texture {
        self.ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Golden Image Test Output Texture"),
            size: extent3d,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.ctx.config.format,
            usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    }

    fn render(
        &mut self,
        graphics_flows: &[Box<dyn GraphicsFlow<S>>],
        #[cfg(feature = "integration-tests")] async_runtime: &tokio::runtime::Runtime,
        #[cfg(feature = "integration-tests")] proxy: &winit::event_loop::EventLoopProxy<
            FlowEvent<S>,
        >,
    ) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;

        #[cfg(not(feature = "integration-tests"))]
        let (view, depth_view, target) = (
            output
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default()),
            self.ctx.depth_texture.view.clone(),
            [self.ctx.config.width, self.ctx.config.height],
        );

        #[cfg(feature = "integration-tests")]
        let (tex, view, depth_view, target) = {
            let extent3d = self.get_test_3d_extent();
            let tex = self.get_test_texture(extent3d);
            let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
            let depth = Texture::create_depth_texture(
                &self.ctx.device,
                [extent3d.width, extent3d.height],
                "Golden Image Test Depth Texture",
            );
            (tex, view, depth.view, [extent3d.width, extent3d.height])
        };

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &depth_view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    ..Default::default()
                });

            let mut viewports: Vec<Viewport> = Vec::new();
            let mut guis: Vec<Flat> = Vec::new();
            let mut texts: Vec<&Label> = Vec::new();
            graphics_flows.iter().for_each(|flow| {
                flow.on_render().set_pipelines(&mut viewports, &mut guis, &mut texts);
            });

            render_pass.set_pipeline(&self.ctx.pipelines.model);
            for viewport in &viewports {
                let [x, y, w, h] = viewport.rect;
                render_pass.set_viewport(x as f32, y as f32, w as f32, h as f32, 0.0, 1.0);
                render_pass.set_scissor_rect(x, y, w, h);
                for instanced in &viewport.models {
                    if instanced.amount == 0 || instanced.instance.size() == 0 {
                        log::warn!("you attempted to render something with zero instances");
                        continue;
                    }
                    render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                    render_pass.draw_model_instanced(
                        instanced.model,
                        0..instanced.amount as u32,
                        viewport.camera,
                        &self.ctx.light.bind_group,
                        instanced.skin,
                    );
                }
            }
            render_pass.set_viewport(0.0, 0.0, target[0] as f32, target[1] as f32, 0.0, 1.0);
            render_pass.set_scissor_rect(0, 0, target[0], target[1]);

            render_pass.set_pipeline(&self.ctx.pipelines.gui);
            for panel in guis {
                render_pass.set_bind_group(0, panel.group, &[]);
                render_pass.set_vertex_buffer(0, panel.vertex.slice(..));
                render_pass.set_index_buffer(panel.index.slice(..), wgpu::IndexFormat::Uint16);
                render_pass.draw_indexed(0..panel.amount as u32, 0, 0..1);
            }

            #[cfg(feature = "ui")]
            {
                let scale = self.ctx.scale_factor();
                let drawn = self
                    .ctx
                    .text
                    .prepare(&self.ctx.device, &self.ctx.queue, &texts, target, scale)
                    .and_then(|()| self.ctx.text.render(&mut render_pass));
                if let Err(e) = drawn {
                    log::error!("Cannot draw text: {:#}", e);
                }
            }
        }
        #[cfg(feature = "ui")]
        self.ctx.text.trim();

        #[cfg(feature = "integration-tests")]
        let output_buffer = {
            let extent3d = self.get_test_3d_extent();
            let bytes_per_row = extent3d.width * 4;
            let output_buffer = self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
                size: (bytes_per_row * extent3d.height) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                label: Some("Golden Image Test Output Buffer"),
                mapped_at_creation: false,
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    aspect: wgpu::TextureAspect::All,
                    texture: &tex,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &output_buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(bytes_per_row),
                        rows_per_image: Some(extent3d.height),
                    },
                },
                extent3d,
            );
            output_buffer
        };

        self.ctx.queue.submit(iter::once(encoder.finish()));

        #[cfg(feature = "integration-tests")]
        {
            use std::convert::identity;

            let extent3d = self.get_test_3d_extent();
            let buffer_slice = output_buffer.slice(..);
            let fut_img = async {
                let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
                buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
                    let _ = tx.send(result);
                });
                self.ctx
                    .device
                    .poll(wgpu::PollType::Wait {
                        submission_index: None,
                        timeout: Some(Duration::from_secs(3)),
                    })
                    .expect("device poll timed out");
                rx.receive()
                    .await
                    .expect("read-back cancelled")
                    .expect("read-back failed");
                image::ImageBuffer::<image::Rgba<u8>, _>::from_raw(
                    extent3d.width,
                    extent3d.height,
                    buffer_slice.get_mapped_range(),
                )
                .expect("read-back buffer matches the test texture")
            };
            let mut img: image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView> =
                async_runtime.block_on(fut_img);
            let state = &mut self.state;
            let all_passed = graphics_flows
                .iter()
                .map(|flow| flow.render_to_texture(&self.ctx, state, &mut img))
                .map(|res| match res {
                    Err(e) => panic!("{}", e),
                    Ok(ImageTestResult::Passed) => true,
                    Ok(ImageTestResult::Failed) => panic!("Assertion failed"),
                    Ok(ImageTestResult::Waiting) => false,
                })
                .all(identity);
            if all_passed {
                proxy
                    .send_event(FlowEvent::Exit)
                    .expect("All assertions passed but the winit event-loop could not safely exit")
            }
        }

        output.present();
        Ok(())
    }
}

pub(crate) enum FlowEvent<S: 'static> {
    #[allow(dead_code)]
    Initialized {
        state: AppState<S>,
        flows: Vec<Box<dyn GraphicsFlow<S>>>,
    },
    #[allow(dead_code)]
    Id((u32, HashSet<usize>)),
    #[allow(dead_code)]
    Exit,
}

impl<S> Debug for FlowEvent<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Id(arg0) => f.debug_tuple("Id").field(arg0).finish(),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

pub struct App<S: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<S>>,
    settings: WindowSettings,
    state: Option<AppState<S>>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow<S>>>,
    // Taken on the first `resumed`.
    constructors: Option<Vec<FlowConsturctor<S>>>,
    last_time: Instant,
}

impl<S: 'static + Default> App<S> {
    fn new(
        event_loop: &EventLoop<FlowEvent<S>>,
        constructors: Vec<FlowConsturctor<S>>,
        settings: WindowSettings,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime: tokio::runtime::Runtime::new()?,
            proxy: event_loop.create_proxy(),
            settings,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
        })
    }

    /// Runs `on_init` for every flow and sizes the surface and page.
    fn initialize(&mut self, mut app_state: AppState<S>, flows: Vec<Box<dyn GraphicsFlow<S>>>) {
        self.graphics_flows = flows;
        for flow in self.graphics_flows.iter_mut() {
            let out = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            handle_flow_output(&mut app_state.ctx, out);
        }
        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);
        let position = app_state.ctx.page.position();
        dispatch(&mut self.graphics_flows, &mut app_state, |flow, ctx, state| {
            flow.on_scroll(ctx, state, position)
        });
        app_state.ctx.window.request_redraw();
        self.last_time = Instant::now();
        self.state = Some(app_state);
    }

    fn click(&mut self, pick_id: u32, flow_ids: HashSet<usize>) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };
        if flow_ids.len() > 1 {
            log::warn!(
                "Multiple flows (indices {:?}) want to react to the render ID {}.",
                flow_ids,
                pick_id
            );
        }
        let mut flow_ids: Vec<usize> = flow_ids.into_iter().collect();
        flow_ids.sort_unstable();
        for flow_id in flow_ids {
            if let Some(flow) = self.graphics_flows.get_mut(flow_id) {
                let out = flow.on_click(&app_state.ctx, &mut app_state.state, pick_id);
                handle_flow_output(&mut app_state.ctx, out);
            }
        }
    }
}

/// Calls `hook` on every flow in order and applies each output right away.
fn dispatch<S>(
    flows: &mut [Box<dyn GraphicsFlow<S>>],
    app_state: &mut AppState<S>,
    mut hook: impl FnMut(&mut Box<dyn GraphicsFlow<S>>, &Context, &mut S) -> Out,
) {
    for flow in flows.iter_mut() {
        let out = hook(flow, &app_state.ctx, &mut app_state.state);
        handle_flow_output(&mut app_state.ctx, out);
    }
}

fn broadcast_scroll<S>(flows: &mut [Box<dyn GraphicsFlow<S>>], app_state: &mut AppState<S>) {
    let position = app_state.ctx.page.position();
    log::trace!("page scrolled to {}", position);
    dispatch(flows, app_state, |flow, ctx, state| {
        flow.on_scroll(ctx, state, position)
    });
}

impl<S: 'static + Default> ApplicationHandler<FlowEvent<S>> for App<S> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Resumed can fire more than once; the flows are only built once.
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(&self.settings.title);

        #[cfg(not(target_arch = "wasm32"))]
        {
            let [width, height] = self.settings.size;
            window_attributes = window_attributes.with_inner_size(winit::dpi::LogicalSize::new(width, height));
        }

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()))
                }
                None => log::warn!("no #{} element, winit creates its own canvas", CANVAS_ID),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create the window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let init_future = async move {
            let app_state = AppState::<S>::new(window).await?;
            let flow_futures: Vec<_> = constructors
                .into_iter()
                // InitContext only clones reference counted wgpu handles
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((app_state, flows)) => self.initialize(app_state, flows),
                Err(e) => {
                    log::error!("App initialization failed: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok((state, flows)) => {
                        if proxy
                            .send_event(FlowEvent::Initialized { state, flows })
                            .is_err()
                        {
                            log::error!("event loop closed during initialization");
                        }
                    }
                    Err(e) => log::error!("App initialization failed: {:#}", e),
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<S>) {
        match event {
            FlowEvent::Initialized { state, flows } => self.initialize(state, flows),
            FlowEvent::Id((pick_id, flow_ids)) => self.click(pick_id, flow_ids),
            FlowEvent::Exit => event_loop.exit(),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };

        // Pointer state is current before any flow sees the event.
        match &event {
            WindowEvent::CursorMoved { position, .. } => app_state.ctx.mouse.coords = *position,
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => match (button, button_state.is_pressed()) {
                (MouseButton::Left, true) => app_state.ctx.mouse.pressed = MouseButtonState::Left,
                (MouseButton::Right, true) => {
                    app_state.ctx.mouse.pressed = MouseButtonState::Right
                }
                (_, false) => app_state.ctx.mouse.pressed = MouseButtonState::None,
                _ => (),
            },
            _ => (),
        }

        dispatch(&mut self.graphics_flows, app_state, |flow, ctx, state| {
            flow.on_window_events(ctx, state, &event)
        });

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                if app_state.resize(size.width, size.height) {
                    broadcast_scroll(&mut self.graphics_flows, app_state);
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * LINE_HEIGHT,
                    MouseScrollDelta::PixelDelta(position) => {
                        -(position.y as f32) / app_state.ctx.scale_factor()
                    }
                };
                if app_state.ctx.page.scroll_by(dy) {
                    broadcast_scroll(&mut self.graphics_flows, app_state);
                }
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                let now = app_state.ctx.elapsed();
                if app_state.ctx.page.tick(now) {
                    broadcast_scroll(&mut self.graphics_flows, app_state);
                }
                dispatch(&mut self.graphics_flows, app_state, |flow, ctx, state| {
                    flow.on_update(ctx, state, dt)
                });

                match app_state.render(
                    &self.graphics_flows,
                    #[cfg(feature = "integration-tests")]
                    &self.async_runtime,
                    #[cfg(feature = "integration-tests")]
                    &self.proxy,
                ) {
                    Ok(_) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = app_state.ctx.window.inner_size();
                        app_state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } if button_state.is_pressed() => {
                let hit = draw_to_pick_buffer::<S>(
                    #[cfg(not(target_arch = "wasm32"))]
                    &self.async_runtime,
                    &self.graphics_flows,
                    &app_state.ctx,
                    #[cfg(target_arch = "wasm32")]
                    self.proxy.clone(),
                );
                if let Some((pick_id, flow_ids)) = hit {
                    self.click(pick_id, flow_ids);
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(app_state) = self.state.as_mut() {
            for flow in self.graphics_flows.iter_mut() {
                flow.on_teardown(&mut app_state.state);
            }
        }
    }
}

fn handle_flow_output(ctx: &mut Context, out: Out) {
    match out {
        Out::Configure(f) => f(ctx),
        Out::Empty => (),
    }
}

pub fn run<S: 'static + Default>(constructors: Vec<FlowConsturctor<S>>) -> anyhow::Result<()> {
    run_with(constructors, WindowSettings::default())
}

pub fn run_with<S: 'static + Default>(
    constructors: Vec<FlowConsturctor<S>>,
    settings: WindowSettings,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        // A second initialisation only fails because a logger already exists.
        let _ = console_log::init_with_level(log::Level::Info);
    }

    #[cfg(all(feature = "integration-tests", target_os = "linux"))]
    let event_loop: EventLoop<FlowEvent<S>> = {
        use winit::platform::wayland::EventLoopBuilderExtWayland;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(all(feature = "integration-tests", target_os = "windows"))]
    let event_loop: EventLoop<FlowEvent<S>> = {
        use winit::platform::windows::EventLoopBuilderExtWindows;

        winit::event_loop::EventLoop::with_user_event()
            .with_any_thread(true)
            .build()?
    };

    #[cfg(not(feature = "integration-tests"))]
    let event_loop: EventLoop<FlowEvent<S>> = EventLoop::with_user_event().build()?;

    let mut app: App<S> = App::new(&event_loop, constructors, settings)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(all(test, feature = "integration-tests"))]
mod tests {
    use super::*;

    /// Implements only the required hooks.
    struct Backdrop;

    impl GraphicsFlow<()> for Backdrop {
        fn on_init(&mut self, _: &mut Context, _: &mut ()) -> Out {
            Out::Empty
        }

        fn on_click(&mut self, _: &Context, _: &mut (), _: u32) -> Out {
            Out::Empty
        }

        fn on_scroll(&mut self, _: &Context, _: &mut (), _: f32) -> Out {
            Out::Empty
        }

        fn on_update(&mut self, _: &Context, _: &mut (), _: Duration) -> Out {
            Out::Empty
        }

        fn on_window_events(&mut self, _: &Context, _: &mut (), _: &WindowEvent) -> Out {
            Out::Empty
        }

        fn on_render(&self) -> Render<'_> {
            Render::None
        }
    }

    #[test]
    fn image_checks_are_optional() {
        let flows: Vec<Box<dyn GraphicsFlow<()>>> = vec![Box::new(Backdrop)];
        assert!(matches!(flows[0].on_render(), Render::None));
    }
}
