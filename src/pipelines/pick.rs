use wgpu::BindGroupLayout;

use crate::{
    data_structures::{
        instance::InstanceRaw,
        model::{ModelVertex, Vertex},
        texture::Texture,
    },
    pipelines::basic::mk_render_pipeline,
};

/// The pick texture stores one object id per pixel.
pub const PICK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Uint;

/// Renders model geometry with a uniform id instead of shading.
///
/// Bind groups: 0 pick id, 1 camera, 2 joint palette.
pub fn mk_pick_pipeline(
    device: &wgpu::Device,
    pick_bind_group_layout: &BindGroupLayout,
    camera_bind_group_layout: &BindGroupLayout,
    skin_bind_group_layout: &BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Render Pipeline Layout (For picking)"),
        bind_group_layouts: &[
            Some(pick_bind_group_layout),
            Some(camera_bind_group_layout),
            Some(skin_bind_group_layout),
        ],
        ..Default::default()
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Pick Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("pick.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        PICK_FORMAT,
        None,
        Some(Texture::DEPTH_FORMAT),
        wgpu::CompareFunction::Less,
        &[ModelVertex::desc(), InstanceRaw::desc()],
        shader,
    )
}
