use crate::{
    data_structures::texture::Texture,
    pipelines::{basic::mk_render_pipeline, gui::Vertex, pick::PICK_FORMAT},
};

/// Renders panels with a uniform id. Panels with id 0 still occlude what
/// lies behind them.
pub fn mk_gui_pick_pipeline(
    device: &wgpu::Device,
    pick_bind_group_layout: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Panel Pick Pipeline Layout"),
        bind_group_layouts: &[Some(pick_bind_group_layout)],
        ..Default::default()
    });
    let shader = wgpu::ShaderModuleDescriptor {
        label: Some("Panel Pick Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("pick_gui.wgsl").into()),
    };
    mk_render_pipeline(
        device,
        &layout,
        PICK_FORMAT,
        None,
        Some(Texture::DEPTH_FORMAT),
        wgpu::CompareFunction::LessEqual,
        &[Vertex::desc()],
        shader,
    )
}
