#[cfg(feature = "integration-tests")]
mod common;

#[test]
#[cfg(feature = "integration-tests")]
fn background_panel_covers_the_window() {
    use labs_showcase::{
        context::{Context, InitContext},
        data_structures::panel::BACKGROUND_DEPTH,
        flow::ImageTestResult,
    };
    use wgpu::Color;

    use crate::common::test_utils::{FrameCounter, TestRender};

    // Green reads back the same from RGBA and BGRA surfaces.
    const GREEN: [u8; 4] = [0, 255, 0, 255];

    golden_image_test!(async move |ctx: InitContext| {
        TestRender::new(
            |ctx: &mut Context| {
                ctx.clear_colour = Color::WHITE;
            },
            |ctx: &Context, state: &mut FrameCounter, texture| {
                if state.frame() < 2 {
                    return Ok(ImageTestResult::Waiting);
                }
                let centre = texture.get_pixel(ctx.config.width / 2, ctx.config.height / 2);
                assert_eq!(*centre, image::Rgba(GREEN));
                Ok(ImageTestResult::Passed)
            },
        )
        .with_panel(&ctx, GREEN, BACKGROUND_DEPTH)
    });
}
