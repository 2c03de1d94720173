//! Fixed navigation bar: logo and one button per section.
//!
//! Buttons and the keys `1` to `3` start a smooth scroll to their section.
//! The bar installs the page layout on init and keeps the highlighted button
//! and the window title in sync with the block in view.

use instant::Duration;
use winit::{
    event::WindowEvent,
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    context::{Context, InitContext},
    data_structures::{
        panel::{OVERLAY_DEPTH, Panel},
        texture::Texture,
    },
    flow::{GraphicsFlow, Out},
    page::{NAVBAR_HEIGHT, PageLayout, Rect, root::ShowcaseState},
    render::Render,
    resources::texture::load_texture,
    text::Label,
};

/// Pick id of the first button; the others follow consecutively.
pub const BUTTON_PICK_BASE: u32 = 101;
pub const BUTTON_SIZE: [f32; 2] = [140.0, 40.0];
pub const BUTTON_GAP: f32 = 12.0;
const MARGIN: f32 = 16.0;
const LOGO_SIZE: f32 = 40.0;
const TITLE_PREFIX: &str = "AI Labs";

const BAR_COLOUR: [u8; 4] = [17, 24, 39, 255];
const BUTTON_COLOUR: [u8; 4] = [55, 65, 81, 255];
const HIGHLIGHT_COLOUR: [u8; 4] = [99, 102, 241, 255];
const LOGO_FALLBACK_COLOUR: [u8; 4] = [236, 72, 153, 255];
const LABEL_COLOUR: [u8; 4] = [255, 255, 255, 255];
const LABEL_SIZE: f32 = 16.0;

/// One navigation target.
#[derive(Clone, Debug, PartialEq)]
pub struct NavItem {
    /// Id of the page block to scroll to.
    pub target: String,
    pub label: String,
}

impl NavItem {
    pub fn new(target: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            label: label.into(),
        }
    }
}

/// Rectangles of `count` buttons right-aligned in a window `window_width`
/// wide, in navigation order.
pub fn button_rects(window_width: f32, count: usize) -> Vec<Rect> {
    let [w, h] = BUTTON_SIZE;
    let y = (NAVBAR_HEIGHT - h) / 2.0;
    let row = count as f32 * w + count.saturating_sub(1) as f32 * BUTTON_GAP;
    let left = window_width - MARGIN - row;
    (0..count)
        .map(|i| Rect::new(left + i as f32 * (w + BUTTON_GAP), y, w, h))
        .collect()
}

/// One centred caption per button, drawn above the page.
pub fn button_labels(window_width: f32, items: &[NavItem]) -> Vec<Label> {
    items
        .iter()
        .zip(button_rects(window_width, items.len()))
        .map(|(item, rect)| {
            Label::new(item.label.as_str(), rect, LABEL_SIZE, LABEL_COLOUR)
                .centered()
                .overlay()
        })
        .collect()
}

pub fn window_title(block_title: &str) -> String {
    format!("{} · {}", TITLE_PREFIX, block_title)
}

fn navigate(target: &str) -> Out {
    let target = target.to_owned();
    Out::Configure(Box::new(move |ctx: &mut Context| {
        let now = ctx.elapsed();
        ctx.page.navigate_to(&target, now);
    }))
}

pub struct NavigationBar {
    items: Vec<NavItem>,
    layout: PageLayout,
    bar: Panel,
    logo: Panel,
    buttons: Vec<Panel>,
    labels: Vec<Label>,
}

impl NavigationBar {
    pub async fn new(ctx: InitContext, items: Vec<NavItem>, layout: PageLayout) -> Self {
        let colour = |rgba, label| Texture::from_color(&ctx.device, &ctx.queue, rgba, label);

        let bar = Panel::new(
            &ctx.device,
            &ctx.layouts.gui,
            &colour(BAR_COLOUR, "navbar"),
            OVERLAY_DEPTH,
            0,
        );
        let logo_texture = match load_texture("logo.png", &ctx.device, &ctx.queue, Some("png")).await {
            Ok(texture) => texture,
            Err(e) => {
                log::warn!("Using a plain logo: {:#}", e);
                colour(LOGO_FALLBACK_COLOUR, "logo")
            }
        };
        let logo = Panel::new(&ctx.device, &ctx.layouts.gui, &logo_texture, OVERLAY_DEPTH, 0);

        let normal = colour(BUTTON_COLOUR, "nav button");
        let highlight = colour(HIGHLIGHT_COLOUR, "nav button highlight");
        let buttons = (0..items.len())
            .map(|i| {
                Panel::new(
                    &ctx.device,
                    &ctx.layouts.gui,
                    &normal,
                    OVERLAY_DEPTH,
                    BUTTON_PICK_BASE + i as u32,
                )
                .with_highlight(&ctx.device, &ctx.layouts.gui, &highlight)
            })
            .collect();

        Self {
            items,
            layout,
            bar,
            logo,
            buttons,
            labels: Vec::new(),
        }
    }

    fn item_for_key(&self, code: KeyCode) -> Option<&NavItem> {
        let index = match code {
            KeyCode::Digit1 | KeyCode::Numpad1 => 0,
            KeyCode::Digit2 | KeyCode::Numpad2 => 1,
            KeyCode::Digit3 | KeyCode::Numpad3 => 2,
            _ => return None,
        };
        self.items.get(index)
    }
}

impl GraphicsFlow<ShowcaseState> for NavigationBar {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ShowcaseState) -> Out {
        ctx.page.set_layout(self.layout.clone());
        log::info!(
            "page layout: {:?}",
            self.layout.blocks().iter().map(|b| b.id.as_str()).collect::<Vec<_>>()
        );
        Out::Empty
    }

    fn on_click(&mut self, _: &Context, _: &mut ShowcaseState, id: u32) -> Out {
        let item = id
            .checked_sub(BUTTON_PICK_BASE)
            .and_then(|index| self.items.get(index as usize));
        match item {
            Some(item) => {
                log::debug!("navbar button '{}'", item.label);
                navigate(&item.target)
            }
            None => Out::Empty,
        }
    }

    fn on_scroll(&mut self, _: &Context, _: &mut ShowcaseState, _: f32) -> Out {
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, state: &mut ShowcaseState, _: Duration) -> Out {
        let window = ctx.page.window();
        self.bar
            .update(&ctx.queue, Rect::new(0.0, 0.0, window[0], NAVBAR_HEIGHT), window);
        let logo_y = (NAVBAR_HEIGHT - LOGO_SIZE) / 2.0;
        self.logo
            .update(&ctx.queue, Rect::new(MARGIN, logo_y, LOGO_SIZE, LOGO_SIZE), window);
        for (button, rect) in self
            .buttons
            .iter_mut()
            .zip(button_rects(window[0], self.items.len()))
        {
            button.update(&ctx.queue, rect, window);
        }
        self.labels = button_labels(window[0], &self.items);

        let active = ctx.page.active_block();
        let active_id = active.map(|block| block.id.clone());
        if active_id != state.active_block {
            for (button, item) in self.buttons.iter_mut().zip(&self.items) {
                button.set_highlighted(active_id.as_deref() == Some(item.target.as_str()));
            }
            if let Some(block) = active {
                ctx.set_title(&window_title(&block.title));
            }
            state.active_block = active_id;
        }
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut ShowcaseState, event: &WindowEvent) -> Out {
        match event {
            WindowEvent::KeyboardInput { event, .. } if event.state.is_pressed() && !event.repeat => {
                match event.physical_key {
                    PhysicalKey::Code(code) => self
                        .item_for_key(code)
                        .map(|item| navigate(&item.target))
                        .unwrap_or_default(),
                    PhysicalKey::Unidentified(_) => Out::Empty,
                }
            }
            _ => Out::Empty,
        }
    }

    fn on_render(&self) -> Render<'_> {
        let mut renders: Vec<Render> = vec![self.bar.flat().into(), self.logo.flat().into()];
        renders.extend(self.buttons.iter().map(|button| button.flat().into()));
        renders.extend(self.labels.iter().map(Render::from));
        Render::Composed(renders)
    }
}
