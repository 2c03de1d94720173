//! Flat, textured rectangles positioned in logical window coordinates.
//!
//! Panels carry the page chrome: navbar, logo, buttons and the block
//! backgrounds. Their vertices are rewritten whenever the page scrolls.

use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::Texture,
    page::Rect,
    pipelines::gui::{self, Vertex},
    render::Flat,
};

/// Depth of overlays drawn on top of everything.
pub const OVERLAY_DEPTH: f32 = 0.0;
/// Depth of backgrounds; anything a viewport draws lies in front of it.
pub const BACKGROUND_DEPTH: f32 = 0.9999;

const INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Corners of `rect` in normalized device coordinates, counter-clockwise
/// from the top left.
pub fn quad_vertices(rect: &Rect, window: [f32; 2], depth: f32) -> [Vertex; 4] {
    let to_ndc = |x: f32, y: f32| [2.0 * x / window[0] - 1.0, 1.0 - 2.0 * y / window[1], depth];
    let (left, top) = (rect.x, rect.y);
    let (right, bottom) = (rect.x + rect.w, rect.y + rect.h);
    [
        Vertex {
            position: to_ndc(left, top),
            tex_coords: [0.0, 0.0],
        },
        Vertex {
            position: to_ndc(left, bottom),
            tex_coords: [0.0, 1.0],
        },
        Vertex {
            position: to_ndc(right, bottom),
            tex_coords: [1.0, 1.0],
        },
        Vertex {
            position: to_ndc(right, top),
            tex_coords: [1.0, 0.0],
        },
    ]
}

pub struct Panel {
    group: wgpu::BindGroup,
    highlight_group: Option<wgpu::BindGroup>,
    highlighted: bool,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    depth: f32,
    rect: Rect,
    id: u32,
}

impl Panel {
    /// `id` is the pick id; 0 makes the panel block clicks without owning them.
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: &Texture,
        depth: f32,
        id: u32,
    ) -> Self {
        let rect = Rect::default();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Panel Vertex Buffer"),
            contents: bytemuck::cast_slice(&quad_vertices(&rect, [1.0, 1.0], depth)),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Panel Index Buffer"),
            contents: bytemuck::cast_slice(&INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            group: gui::mk_bind_group(device, texture, layout),
            highlight_group: None,
            highlighted: false,
            vertex_buffer,
            index_buffer,
            depth,
            rect,
            id,
        }
    }

    /// Adds an alternative texture shown while the panel is highlighted.
    pub fn with_highlight(
        mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        texture: &Texture,
    ) -> Self {
        self.highlight_group = Some(gui::mk_bind_group(device, texture, layout));
        self
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Moves the panel to `rect` in a window of logical size `window`.
    pub fn update(&mut self, queue: &wgpu::Queue, rect: Rect, window: [f32; 2]) {
        if window[0] <= 0.0 || window[1] <= 0.0 {
            return;
        }
        self.rect = rect;
        let vertices = quad_vertices(&self.rect, window, self.depth);
        queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
    }

    pub fn flat(&self) -> Flat<'_> {
        let group = match (&self.highlight_group, self.highlighted) {
            (Some(group), true) => group,
            _ => &self.group,
        };
        Flat {
            vertex: &self.vertex_buffer,
            index: &self.index_buffer,
            group,
            amount: INDICES.len(),
            id: self.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_window_quad_spans_ndc() {
        let rect = Rect::new(0.0, 0.0, 800.0, 600.0);
        let v = quad_vertices(&rect, [800.0, 600.0], BACKGROUND_DEPTH);
        assert_eq!(v[0].position, [-1.0, 1.0, BACKGROUND_DEPTH]);
        assert_eq!(v[2].position, [1.0, -1.0, BACKGROUND_DEPTH]);
    }

    #[test]
    fn navbar_strip_sits_at_top() {
        let rect = Rect::new(0.0, 0.0, 800.0, 60.0);
        let v = quad_vertices(&rect, [800.0, 600.0], OVERLAY_DEPTH);
        assert!((v[1].position[1] - 0.8).abs() < 1e-6);
        assert_eq!(v[3].position, [1.0, 1.0, 0.0]);
    }
}
