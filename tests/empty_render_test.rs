#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn should_render_clear_colour() {
    use labs_showcase::{
        context::{Context, InitContext},
        flow::ImageTestResult,
    };
    use wgpu::Color;

    use crate::common::test_utils::{FrameCounter, TestRender, to_rgba8};

    golden_image_test!(async move |_: InitContext| {
        TestRender::new(
            |ctx: &mut Context| {
                ctx.clear_colour = Color::WHITE;
            },
            |ctx: &Context, state: &mut FrameCounter, texture| {
                if state.frame() == 0 {
                    return Ok(ImageTestResult::Waiting);
                }
                let desired_pixel = to_rgba8(Color::WHITE);
                let width = ctx.config.width;
                for (x, _, pixel) in texture.enumerate_pixels() {
                    if x < width {
                        assert_eq!(*pixel, desired_pixel);
                    }
                }
                Ok(ImageTestResult::Passed)
            },
        )
    });
}
