//! Page text.
//!
//! Flows describe their text as [`Label`]s in logical page coordinates and
//! return them from `on_render` like panels. With the `ui` feature the
//! event loop typesets and draws them with glyphon after every panel.

use crate::page::{NAVBAR_HEIGHT, Rect};

/// Distance between baselines relative to the font size.
pub const LINE_SPACING: f32 = 1.3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TextAlign {
    #[default]
    Left,
    /// Centred on both axes; meant for single-line labels.
    Center,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextLayer {
    /// Scrolls with the page and is hidden under the navbar.
    #[default]
    Page,
    /// Stays on top of everything, like the navbar's own labels.
    Overlay,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub text: String,
    /// Logical rectangle the text wraps in.
    pub rect: Rect,
    /// Font size in logical pixels.
    pub size: f32,
    pub color: [u8; 4],
    pub align: TextAlign,
    pub layer: TextLayer,
}

impl Label {
    pub fn new(text: impl Into<String>, rect: Rect, size: f32, color: [u8; 4]) -> Self {
        Self {
            text: text.into(),
            rect,
            size,
            color,
            align: TextAlign::Left,
            layer: TextLayer::Page,
        }
    }

    pub fn centered(mut self) -> Self {
        self.align = TextAlign::Center;
        self
    }

    pub fn overlay(mut self) -> Self {
        self.layer = TextLayer::Overlay;
        self
    }

    pub fn line_height(&self) -> f32 {
        self.size * LINE_SPACING
    }

    /// Top left corner of the first line.
    pub fn origin(&self) -> [f32; 2] {
        match self.align {
            TextAlign::Left => [self.rect.x, self.rect.y],
            TextAlign::Center => [
                self.rect.x,
                self.rect.y + (self.rect.h - self.line_height()) / 2.0,
            ],
        }
    }

    /// The part of the label that may be drawn in a `window` sized view.
    /// Page text is clipped below the navbar.
    pub fn clip(&self, window: [f32; 2]) -> Option<Rect> {
        let top = match self.layer {
            TextLayer::Page => NAVBAR_HEIGHT,
            TextLayer::Overlay => 0.0,
        };
        self.rect
            .intersect(&Rect::new(0.0, top, window[0], window[1] - top))
    }
}

#[cfg(feature = "ui")]
pub use glyphs::TextSystem;

#[cfg(feature = "ui")]
mod glyphs {
    use std::collections::{HashMap, HashSet};

    use glyphon::{
        Attrs, Buffer, Cache, Color, Family, FontSystem, Metrics, Resolution, Shaping,
        SwashCache, TextArea, TextAtlas, TextBounds, TextRenderer, Viewport,
    };

    use super::{Label, TextAlign};
    use crate::data_structures::texture::Texture;

    /// Shaped text is cached per string, physical size and wrap width.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    struct ShapeKey {
        text: String,
        size: u32,
        width: u32,
        align: TextAlign,
    }

    impl ShapeKey {
        fn new(label: &Label, scale: f32) -> Self {
            Self {
                text: label.text.clone(),
                size: (label.size * scale).to_bits(),
                width: (label.rect.w * scale).to_bits(),
                align: label.align,
            }
        }
    }

    pub struct TextSystem {
        font_system: FontSystem,
        swash_cache: SwashCache,
        viewport: Viewport,
        atlas: TextAtlas,
        renderer: TextRenderer,
        shaped: HashMap<ShapeKey, Buffer>,
    }

    impl std::fmt::Debug for TextSystem {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TextSystem")
                .field("shaped", &self.shaped.len())
                .finish()
        }
    }

    impl TextSystem {
        /// `fonts` are loaded next to the system fonts; the browser has none.
        pub fn new(
            device: &wgpu::Device,
            queue: &wgpu::Queue,
            format: wgpu::TextureFormat,
            fonts: Vec<Vec<u8>>,
        ) -> Self {
            let mut font_system = FontSystem::new();
            for font in fonts {
                font_system.db_mut().load_font_data(font);
            }
            let cache = Cache::new(device);
            let viewport = Viewport::new(device, &cache);
            let mut atlas = TextAtlas::new(device, queue, &cache, format);
            // matches the pass's depth target without testing against it
            let renderer = TextRenderer::new(
                &mut atlas,
                device,
                wgpu::MultisampleState::default(),
                Some(wgpu::DepthStencilState {
                    format: Texture::DEPTH_FORMAT,
                    depth_write_enabled: Some(false),
                    depth_compare: Some(wgpu::CompareFunction::Always),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
            );
            Self {
                font_system,
                swash_cache: SwashCache::new(),
                viewport,
                atlas,
                renderer,
                shaped: HashMap::new(),
            }
        }

        fn shape(font_system: &mut FontSystem, label: &Label, scale: f32) -> Buffer {
            let size = label.size * scale;
            let mut buffer = Buffer::new(font_system, Metrics::new(size, label.line_height() * scale));
            buffer.set_size(font_system, Some(label.rect.w * scale), None);
            let align = match label.align {
                TextAlign::Left => None,
                TextAlign::Center => Some(glyphon::cosmic_text::Align::Center),
            };
            buffer.set_text(
                font_system,
                &label.text,
                &Attrs::new().family(Family::SansSerif),
                Shaping::Advanced,
                align,
            );
            buffer.shape_until_scroll(font_system, false);
            buffer
        }

        /// Shapes and uploads `labels` for a `[width, height]` surface.
        /// Cached shapes no label uses any more are dropped.
        pub fn prepare(
            &mut self,
            device: &wgpu::Device,
            queue: &wgpu::Queue,
            labels: &[&Label],
            size: [u32; 2],
            scale: f32,
        ) -> anyhow::Result<()> {
            self.viewport.update(
                queue,
                Resolution {
                    width: size[0],
                    height: size[1],
                },
            );

            let keys: Vec<ShapeKey> = labels.iter().map(|label| ShapeKey::new(label, scale)).collect();
            for (key, label) in keys.iter().zip(labels) {
                if !self.shaped.contains_key(key) {
                    let buffer = Self::shape(&mut self.font_system, label, scale);
                    self.shaped.insert(key.clone(), buffer);
                }
            }
            let used: HashSet<&ShapeKey> = keys.iter().collect();
            self.shaped.retain(|key, _| used.contains(key));

            let window = [size[0] as f32 / scale, size[1] as f32 / scale];
            let areas: Vec<TextArea> = keys
                .iter()
                .zip(labels)
                .filter_map(|(key, label)| {
                    let buffer = self.shaped.get(key)?;
                    let clip = label.clip(window)?.scaled(scale);
                    let [left, top] = label.origin();
                    let [r, g, b, a] = label.color;
                    Some(TextArea {
                        buffer,
                        left: left * scale,
                        top: top * scale,
                        scale: 1.0,
                        bounds: TextBounds {
                            left: clip.x.floor() as i32,
                            top: clip.y.floor() as i32,
                            right: clip.right().ceil() as i32,
                            bottom: clip.bottom().ceil() as i32,
                        },
                        default_color: Color::rgba(r, g, b, a),
                        custom_glyphs: &[],
                    })
                })
                .collect();

            self.renderer.prepare(
                device,
                queue,
                &mut self.font_system,
                &mut self.atlas,
                &self.viewport,
                areas,
                &mut self.swash_cache,
            )?;
            Ok(())
        }

        pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) -> anyhow::Result<()> {
            self.renderer.render(&self.atlas, &self.viewport, pass)?;
            Ok(())
        }

        /// Frees atlas space of glyphs the last frame did not use.
        pub fn trim(&mut self) {
            self.atlas.trim();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: [f32; 2] = [1280.0, 800.0];

    #[test]
    fn page_text_is_hidden_under_the_navbar() {
        let label = Label::new("Title", Rect::new(10.0, 40.0, 200.0, 100.0), 20.0, [0; 4]);
        assert_eq!(label.clip(WINDOW), Some(Rect::new(10.0, NAVBAR_HEIGHT, 200.0, 76.0)));
        assert_eq!(
            label.clone().overlay().clip(WINDOW),
            Some(Rect::new(10.0, 40.0, 200.0, 100.0))
        );

        let scrolled_away = Label::new("Gone", Rect::new(0.0, -200.0, 200.0, 100.0), 20.0, [0; 4]);
        assert_eq!(scrolled_away.clip(WINDOW), None);
    }

    #[test]
    fn centred_labels_sit_in_the_middle_of_their_rect() {
        let label = Label::new("Go", Rect::new(0.0, 12.0, 140.0, 40.0), 10.0, [0; 4]).centered();
        assert_eq!(label.origin(), [0.0, 12.0 + (40.0 - label.line_height()) / 2.0]);
        assert_eq!(label.align, TextAlign::Center);

        let left = Label::new("Body", Rect::new(5.0, 7.0, 100.0, 400.0), 10.0, [0; 4]);
        assert_eq!(left.origin(), [5.0, 7.0]);
    }
}
