//! The scrolling page: block layout, scroll position and the flows that
//! make up the showcase.
//!
//! All geometry here is in logical pixels with the origin at the top left
//! of the window. The page is a vertical stack of blocks, each a multiple of
//! the window height tall; the navbar overlays the top of the window.

use instant::Duration;

pub mod hero;
pub mod navbar;
pub mod root;
pub mod section;

/// Height of the fixed navigation bar.
pub const NAVBAR_HEIGHT: f32 = 64.0;
/// Duration of a smooth scroll started by navigation.
pub const SCROLL_DURATION: Duration = Duration::from_millis(600);
/// Logical pixels scrolled per wheel line.
pub const LINE_HEIGHT: f32 = 100.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Overlap of both rectangles, `None` if they do not overlap.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > x && bottom > y).then(|| Rect::new(x, y, right - x, bottom - y))
    }

    pub fn scaled(&self, factor: f32) -> Rect {
        Rect::new(self.x * factor, self.y * factor, self.w * factor, self.h * factor)
    }

    /// Snaps to whole pixels and clips to a `[width, height]` target.
    pub fn to_pixels(&self, width: u32, height: u32) -> Option<[u32; 4]> {
        let x = self.x.round().max(0.0) as u32;
        let y = self.y.round().max(0.0) as u32;
        let right = (self.right().round().max(0.0) as u32).min(width);
        let bottom = (self.bottom().round().max(0.0) as u32).min(height);
        (right > x && bottom > y).then(|| [x, y, right - x, bottom - y])
    }

    /// The right-hand part of the rectangle, `fraction` of its width.
    pub fn right_part(&self, fraction: f32) -> Rect {
        let w = self.w * fraction;
        Rect::new(self.right() - w, self.y, w, self.h)
    }

    /// Position of `(x, y)` relative to the rectangle, each axis mapped to
    /// `[-1, 1]` with Y pointing up and clamped at the edges.
    pub fn normalized(&self, x: f32, y: f32) -> [f32; 2] {
        if self.w <= 0.0 || self.h <= 0.0 {
            return [0.0, 0.0];
        }
        let nx = (x - self.x) / self.w * 2.0 - 1.0;
        let ny = 1.0 - (y - self.y) / self.h * 2.0;
        [nx.clamp(-1.0, 1.0), ny.clamp(-1.0, 1.0)]
    }
}

/// One stacked block of the page.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub id: String,
    pub title: String,
    /// Height in multiples of the window height.
    pub height: f32,
}

impl Block {
    pub fn new(id: impl Into<String>, title: impl Into<String>, height: f32) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            height,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PageLayout {
    blocks: Vec<Block>,
}

impl PageLayout {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Offset of the block's top edge from the page top.
    pub fn block_top(&self, index: usize, window_height: f32) -> Option<f32> {
        (index < self.blocks.len()).then(|| {
            self.blocks[..index]
                .iter()
                .map(|b| b.height * window_height)
                .sum()
        })
    }

    pub fn content_height(&self, window_height: f32) -> f32 {
        self.blocks.iter().map(|b| b.height * window_height).sum()
    }

    pub fn max_scroll(&self, window_height: f32) -> f32 {
        (self.content_height(window_height) - window_height).max(0.0)
    }

    /// Index of the block under the middle of the window.
    pub fn block_at(&self, scroll: f32, window_height: f32) -> Option<usize> {
        let probe = scroll + window_height * 0.5;
        let mut top = 0.0;
        for (index, block) in self.blocks.iter().enumerate() {
            let bottom = top + block.height * window_height;
            if probe < bottom {
                return Some(index);
            }
            top = bottom;
        }
        self.blocks.len().checked_sub(1)
    }
}

fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// A running smooth scroll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollAnimation {
    pub from: f32,
    pub to: f32,
    pub start: Duration,
    pub duration: Duration,
}

impl ScrollAnimation {
    /// Position at clock time `now` and whether the animation has finished.
    pub fn sample(&self, now: Duration) -> (f32, bool) {
        let elapsed = now.saturating_sub(self.start);
        if elapsed >= self.duration || self.duration.is_zero() {
            return (self.to, true);
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        (self.from + (self.to - self.from) * ease_in_out_cubic(t), false)
    }
}

/// Vertical scroll position of the page.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PageScroll {
    position: f32,
    animation: Option<ScrollAnimation>,
}

impl PageScroll {
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn animation(&self) -> Option<&ScrollAnimation> {
        self.animation.as_ref()
    }

    /// Scrolls by `delta` immediately, cancelling any smooth scroll.
    pub fn scroll_by(&mut self, delta: f32, max: f32) -> bool {
        self.animation = None;
        self.set(self.position + delta, max)
    }

    pub fn animate_to(&mut self, target: f32, max: f32, now: Duration) {
        self.animation = Some(ScrollAnimation {
            from: self.position,
            to: target.clamp(0.0, max.max(0.0)),
            start: now,
            duration: SCROLL_DURATION,
        });
    }

    /// Advances a running smooth scroll; returns whether the position moved.
    pub fn tick(&mut self, now: Duration) -> bool {
        let Some(animation) = self.animation else {
            return false;
        };
        let (position, done) = animation.sample(now);
        if done {
            self.animation = None;
        }
        let moved = position != self.position;
        self.position = position;
        moved
    }

    /// Clamps into `[0, max]`; returns whether the position moved.
    pub fn set(&mut self, position: f32, max: f32) -> bool {
        let clamped = position.clamp(0.0, max.max(0.0));
        let moved = clamped != self.position;
        self.position = clamped;
        moved
    }
}

/// Layout, scroll state and window size of the page.
#[derive(Clone, Debug, Default)]
pub struct Page {
    layout: PageLayout,
    scroll: PageScroll,
    window: [f32; 2],
}

impl Page {
    pub fn new(layout: PageLayout, window: [f32; 2]) -> Self {
        Self {
            layout,
            scroll: PageScroll::default(),
            window,
        }
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    pub fn set_layout(&mut self, layout: PageLayout) {
        self.layout = layout;
        self.clamp();
    }

    pub fn scroll(&self) -> &PageScroll {
        &self.scroll
    }

    pub fn position(&self) -> f32 {
        self.scroll.position()
    }

    /// Logical window size.
    pub fn window(&self) -> [f32; 2] {
        self.window
    }

    pub fn window_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.window[0], self.window[1])
    }

    pub fn max_scroll(&self) -> f32 {
        self.layout.max_scroll(self.window[1])
    }

    /// Returns whether the scroll position had to move.
    pub fn resize(&mut self, width: f32, height: f32) -> bool {
        self.window = [width, height];
        self.clamp()
    }

    fn clamp(&mut self) -> bool {
        let max = self.max_scroll();
        self.scroll.set(self.scroll.position(), max)
    }

    pub fn scroll_by(&mut self, delta: f32) -> bool {
        let max = self.max_scroll();
        self.scroll.scroll_by(delta, max)
    }

    pub fn tick(&mut self, now: Duration) -> bool {
        self.scroll.tick(now)
    }

    /// Starts a smooth scroll that brings the block `id` to the top of the
    /// window. Unknown ids are logged and ignored.
    pub fn navigate_to(&mut self, id: &str, now: Duration) -> bool {
        let top = self
            .layout
            .index_of(id)
            .and_then(|index| self.layout.block_top(index, self.window[1]));
        match top {
            Some(top) => {
                let max = self.max_scroll();
                self.scroll.animate_to(top, max, now);
                log::debug!("scrolling to '{}' at {}px", id, top);
                true
            }
            None => {
                log::warn!("no page block with id '{}' to navigate to", id);
                false
            }
        }
    }

    /// The block's rectangle in window coordinates at the current scroll.
    pub fn block_rect(&self, id: &str) -> Option<Rect> {
        let index = self.layout.index_of(id)?;
        let top = self.layout.block_top(index, self.window[1])?;
        let height = self.layout.blocks[index].height * self.window[1];
        Some(Rect::new(0.0, top - self.position(), self.window[0], height))
    }

    pub fn active_block(&self) -> Option<&Block> {
        self.layout
            .block_at(self.position(), self.window[1])
            .and_then(|index| self.layout.blocks.get(index))
    }
}
