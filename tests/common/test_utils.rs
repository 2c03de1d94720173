#![cfg(feature = "integration-tests")]

use labs_showcase::{
    context::{Context, InitContext},
    data_structures::{panel::Panel, texture::Texture},
    flow::{GraphicsFlow, ImageTestResult, Out},
    render::Render,
};

pub(crate) type Validate = dyn Fn(
    &Context,
    &mut FrameCounter,
    &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
) -> Result<ImageTestResult, anyhow::Error>;

#[derive(Default)]
pub(crate) struct FrameCounter(pub(crate) u32);

impl FrameCounter {
    pub(crate) fn frame(&self) -> u32 {
        self.0
    }

    pub(crate) fn progress(&mut self) {
        self.0 += 1;
    }
}

/// A flow that optionally covers the whole window with one panel and
/// checks every rendered frame with `validate`.
pub(crate) struct TestRender {
    setup: Box<dyn Fn(&mut Context)>,
    panel: Option<Panel>,
    validate: Box<Validate>,
}

impl TestRender {
    pub(crate) fn new(
        setup: impl Fn(&mut Context) + 'static,
        validate: impl Fn(
            &Context,
            &mut FrameCounter,
            &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
        ) -> Result<ImageTestResult, anyhow::Error>
        + 'static,
    ) -> Self {
        Self {
            setup: Box::new(setup),
            panel: None,
            validate: Box::new(validate),
        }
    }

    /// Adds a full-window panel of a single colour.
    pub(crate) fn with_panel(mut self, ctx: &InitContext, rgba: [u8; 4], depth: f32) -> Self {
        let texture = Texture::from_color(&ctx.device, &ctx.queue, rgba, "test panel");
        self.panel = Some(Panel::new(&ctx.device, &ctx.layouts.gui, &texture, depth, 0));
        self
    }
}

impl GraphicsFlow<FrameCounter> for TestRender {
    fn on_init(&mut self, ctx: &mut Context, _: &mut FrameCounter) -> Out {
        (self.setup)(ctx);
        Out::Empty
    }

    fn on_click(&mut self, _: &Context, _: &mut FrameCounter, _: u32) -> Out {
        Out::Empty
    }

    fn on_scroll(&mut self, _: &Context, _: &mut FrameCounter, _: f32) -> Out {
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, state: &mut FrameCounter, _: std::time::Duration) -> Out {
        if let Some(panel) = self.panel.as_mut() {
            panel.update(&ctx.queue, ctx.page.window_rect(), ctx.page.window());
        }
        state.progress();
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut FrameCounter, _: &labs_showcase::WindowEvent) -> Out {
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        match &self.panel {
            Some(panel) => panel.flat().into(),
            None => Render::None,
        }
    }

    fn render_to_texture(
        &self,
        ctx: &Context,
        state: &mut FrameCounter,
        texture: &mut image::ImageBuffer<image::Rgba<u8>, wgpu::BufferView>,
    ) -> Result<ImageTestResult, anyhow::Error> {
        (self.validate)(ctx, state, texture)
    }
}

/// Channel values of `colour` as stored in an 8 bit texture.
pub(crate) fn to_rgba8(colour: wgpu::Color) -> image::Rgba<u8> {
    let f_to_u8 = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    image::Rgba([
        f_to_u8(colour.r),
        f_to_u8(colour.g),
        f_to_u8(colour.b),
        f_to_u8(colour.a),
    ])
}

#[macro_export]
macro_rules! golden_image_test {
    ($graphics_elem:expr) => {{
        use crate::common::test_utils::FrameCounter;
        use labs_showcase::flow::{FlowConsturctor, GraphicsFlow};
        let model_constructor: FlowConsturctor<FrameCounter> = Box::new(|ctx| {
            Box::pin(async move {
                let g_flow: Box<dyn GraphicsFlow<FrameCounter>> = Box::new(($graphics_elem)(ctx).await);
                g_flow
            })
        });

        labs_showcase::flow::run(vec![model_constructor])
            .expect("Failed to run flow for integration test.");
    }};
}
