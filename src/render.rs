//! Render composition and pipeline batching.
//!
//! Flows describe what they draw each frame with a [`Render`]. The event loop
//! walks every flow's render tree, sorts the leaves into viewports (lit glTF
//! models behind a camera), flat panels and text labels, and then draws each
//! batch with its pipeline. The same tree drives picking; text is never
//! picked.
//!
//! # Key types
//!
//! - [`Render<'a>`] is the enum a flow returns from `on_render`
//! - [`Viewport<'a>`] is a camera plus the models drawn through it, clipped to a pixel rectangle
//! - [`Instanced<'a>`] contains data for instanced rendering (model + instance buffer)
//! - [`Flat<'a>`] contains data for flat (2D) rendering (vertex + index buffers)

use std::collections::{HashMap, HashSet};

use crate::{
    data_structures::{model::Model, scene_graph::SceneNode},
    text::Label,
};

/// Data for instanced object rendering: a model, instance buffer, and pick ID.
#[derive(Clone)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    /// Joint palette of the model's node.
    pub skin: &'a wgpu::BindGroup,
    pub amount: usize,
    pub id: u32,
}

/// Data for flat (2D) rendering: vertex and index buffers with a bind group.
///
/// Vertices are in normalized device coordinates and indices are `u16`.
#[derive(Clone)]
pub struct Flat<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    pub group: &'a wgpu::BindGroup,
    pub amount: usize,
    pub id: u32,
}

/// Models seen through one camera inside a window sub-rectangle.
#[derive(Clone)]
pub struct Viewport<'a> {
    /// `[x, y, width, height]` in physical pixels, already clipped to the window.
    pub rect: [u32; 4],
    pub camera: &'a wgpu::BindGroup,
    pub models: Vec<Instanced<'a>>,
}

/// Specifies how a flow should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `GUI(Flat)` renders a panel
/// - `Viewport(Viewport)` renders models through a camera into a sub-rectangle
/// - `Text(&Label)` renders a text label above every panel
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
pub enum Render<'a> {
    None,
    GUI(Flat<'a>),
    Viewport(Viewport<'a>),
    Text(&'a Label),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Map pick ids to the indices of the flows that own them.
    ///
    /// Id 0 is never mapped; it marks geometry that occludes without being
    /// clickable.
    pub(crate) fn map_ids(&self, flow_id: usize, map: &mut HashMap<u32, HashSet<usize>>) {
        match self {
            Render::GUI(flat) => insert_id(map, flat.id, flow_id),
            Render::Viewport(viewport) => viewport
                .models
                .iter()
                .for_each(|instanced| insert_id(map, instanced.id, flow_id)),
            Render::Composed(renders) => renders
                .iter()
                .for_each(|render| render.map_ids(flow_id, map)),
            Render::Text(_) | Render::None => (),
        }
    }

    pub(crate) fn set_pipelines(
        self,
        viewports: &mut Vec<Viewport<'a>>,
        guis: &mut Vec<Flat<'a>>,
        texts: &mut Vec<&'a Label>,
    ) {
        match self {
            Render::GUI(flat) => guis.push(flat),
            Render::Viewport(viewport) => viewports.push(viewport),
            Render::Text(label) => texts.push(label),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(viewports, guis, texts)),
            Render::None => (),
        }
    }
}

fn insert_id(map: &mut HashMap<u32, HashSet<usize>>, id: u32, flow_id: usize) {
    if id != 0 {
        map.entry(id).or_default().insert(flow_id);
    }
}

impl<'a> Viewport<'a> {
    /// A viewport drawing every model node of `scene`.
    pub fn of_scene(rect: [u32; 4], camera: &'a wgpu::BindGroup, scene: &'a dyn SceneNode) -> Self {
        Self {
            rect,
            camera,
            models: scene.get_render(),
        }
    }
}

impl<'a> From<Flat<'a>> for Render<'a> {
    fn from(flat: Flat<'a>) -> Self {
        Render::GUI(flat)
    }
}

impl<'a> From<&'a Label> for Render<'a> {
    fn from(label: &'a Label) -> Self {
        Render::Text(label)
    }
}

impl<'a> From<Viewport<'a>> for Render<'a> {
    fn from(viewport: Viewport<'a>) -> Self {
        Render::Viewport(viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Rect;

    #[test]
    fn labels_are_batched_and_never_picked() {
        let title = Label::new("Title", Rect::new(0.0, 0.0, 100.0, 40.0), 20.0, [0; 4]);
        let body = Label::new("Body", Rect::new(0.0, 40.0, 100.0, 40.0), 12.0, [0; 4]);
        let render = Render::Composed(vec![
            (&title).into(),
            Render::None,
            Render::Composed(vec![(&body).into()]),
        ]);

        let mut ids = HashMap::new();
        render.map_ids(0, &mut ids);
        assert!(ids.is_empty());

        let (mut viewports, mut guis, mut texts) = (Vec::new(), Vec::new(), Vec::new());
        render.set_pipelines(&mut viewports, &mut guis, &mut texts);
        assert!(viewports.is_empty() && guis.is_empty());
        assert_eq!(texts, vec![&title, &body]);
    }
}
