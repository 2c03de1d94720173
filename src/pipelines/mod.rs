//! Render pipelines and the bind group layouts they share.
//!
//! Pipelines are created once per [`crate::context::Context`] and reused by
//! every flow. Layouts are cloned into the [`crate::context::InitContext`] so
//! that flow constructors can build bind groups before the first frame.

pub mod basic;
pub mod gui;
pub mod light;
pub mod pick;
pub mod pick_gui;

use crate::{
    camera,
    data_structures::{model, skin},
    resources,
};

#[derive(Debug, Clone)]
pub struct Layouts {
    pub camera: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub light: wgpu::BindGroupLayout,
    pub gui: wgpu::BindGroupLayout,
    pub pick: wgpu::BindGroupLayout,
    pub skin: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            camera: camera::camera_layout(device),
            material: model::material_layout(device),
            light: light::light_layout(device),
            gui: gui::gui_layout(device),
            pick: resources::pick::pick_layout(device),
            skin: skin::skin_layout(device),
        }
    }
}

#[derive(Debug)]
pub struct Pipelines {
    pub model: wgpu::RenderPipeline,
    pub gui: wgpu::RenderPipeline,
    pub pick: wgpu::RenderPipeline,
    pub gui_pick: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, layouts: &Layouts) -> Self {
        Self {
            model: basic::mk_model_pipeline(
                device,
                format,
                &layouts.material,
                &layouts.camera,
                &layouts.light,
                &layouts.skin,
            ),
            gui: gui::mk_gui_pipeline(device, format, &layouts.gui),
            pick: pick::mk_pick_pipeline(device, &layouts.pick, &layouts.camera, &layouts.skin),
            gui_pick: pick_gui::mk_gui_pick_pipeline(device, &layouts.pick),
        }
    }
}
