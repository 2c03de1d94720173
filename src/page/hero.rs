//! The hero banner at the top of the page.

use instant::Duration;
use winit::event::WindowEvent;

use crate::{
    context::{Context, InitContext},
    data_structures::{
        panel::{BACKGROUND_DEPTH, Panel},
        texture::Texture,
    },
    flow::{GraphicsFlow, Out},
    page::{NAVBAR_HEIGHT, Rect, root::ShowcaseState},
    render::Render,
    text::Label,
};

const BACKGROUND_COLOUR: [u8; 4] = [30, 27, 75, 255];
const ACCENT_COLOUR: [u8; 4] = [99, 102, 241, 255];
const ACCENT_HEIGHT: f32 = 6.0;
const TITLE_COLOUR: [u8; 4] = [255, 255, 255, 255];
const SUBTITLE_COLOUR: [u8; 4] = [199, 210, 254, 255];
const TITLE_SIZE: f32 = 64.0;
const SUBTITLE_SIZE: f32 = 24.0;
const TEXT_GAP: f32 = 32.0;

/// A thin rule centred at a third of the block width, halfway down the area
/// below the navbar.
fn accent_rect(block: Rect) -> Rect {
    Rect::new(
        block.x + block.w / 3.0,
        block.y + NAVBAR_HEIGHT + (block.h - NAVBAR_HEIGHT) / 2.0,
        block.w / 3.0,
        ACCENT_HEIGHT,
    )
}

/// Title above the accent rule and subtitle below it, centred on the block.
pub fn hero_labels(block: Rect, title: &str, subtitle: &str) -> [Label; 2] {
    let accent = accent_rect(block);
    let title_height = TITLE_SIZE * 2.0;
    let title = Label::new(
        title,
        Rect::new(block.x, accent.y - TEXT_GAP - title_height, block.w, title_height),
        TITLE_SIZE,
        TITLE_COLOUR,
    )
    .centered();
    let subtitle_height = SUBTITLE_SIZE * 2.0;
    let subtitle = Label::new(
        subtitle,
        Rect::new(block.x, accent.bottom() + TEXT_GAP, block.w, subtitle_height),
        SUBTITLE_SIZE,
        SUBTITLE_COLOUR,
    )
    .centered();
    [title, subtitle]
}

pub struct Hero {
    block_id: String,
    title: String,
    subtitle: String,
    background: Panel,
    accent: Panel,
    labels: Option<[Label; 2]>,
}

impl Hero {
    pub async fn new(
        ctx: InitContext,
        block_id: impl Into<String>,
        title: impl Into<String>,
        subtitle: impl Into<String>,
    ) -> Self {
        let panel = |rgba, label| {
            Panel::new(
                &ctx.device,
                &ctx.layouts.gui,
                &Texture::from_color(&ctx.device, &ctx.queue, rgba, label),
                BACKGROUND_DEPTH,
                0,
            )
        };
        Self {
            block_id: block_id.into(),
            title: title.into(),
            subtitle: subtitle.into(),
            background: panel(BACKGROUND_COLOUR, "hero background"),
            accent: panel(ACCENT_COLOUR, "hero accent"),
            labels: None,
        }
    }
}

impl GraphicsFlow<ShowcaseState> for Hero {
    fn on_init(&mut self, _: &mut Context, _: &mut ShowcaseState) -> Out {
        log::debug!("hero '{}'", self.title);
        Out::Empty
    }

    fn on_click(&mut self, _: &Context, _: &mut ShowcaseState, _: u32) -> Out {
        Out::Empty
    }

    fn on_scroll(&mut self, _: &Context, _: &mut ShowcaseState, _: f32) -> Out {
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut ShowcaseState, _: Duration) -> Out {
        let Some(block) = ctx.page.block_rect(&self.block_id) else {
            self.labels = None;
            return Out::Empty;
        };
        let window = ctx.page.window();
        self.background.update(&ctx.queue, block, window);
        self.accent.update(&ctx.queue, accent_rect(block), window);
        self.labels = Some(hero_labels(block, &self.title, &self.subtitle));
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut ShowcaseState, _: &WindowEvent) -> Out {
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        let mut renders: Vec<Render> = vec![self.background.flat().into(), self.accent.flat().into()];
        renders.extend(self.labels.iter().flatten().map(Render::from));
        Render::Composed(renders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_and_subtitle_frame_the_accent_rule() {
        let block = Rect::new(0.0, 0.0, 1200.0, 800.0);
        let [title, subtitle] = hero_labels(block, "AI Labs", "Interactive models");
        let accent = accent_rect(block);

        assert_eq!(title.text, "AI Labs");
        assert_eq!(subtitle.text, "Interactive models");
        assert_eq!(title.rect.bottom() + TEXT_GAP, accent.y);
        assert_eq!(subtitle.rect.y, accent.bottom() + TEXT_GAP);
        assert!(title.rect.y >= NAVBAR_HEIGHT);
        assert_eq!(title.align, crate::text::TextAlign::Center);
        assert_eq!(subtitle.rect.w, block.w);
    }
}
