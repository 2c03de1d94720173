use wgpu::util::DeviceExt;

pub fn pick_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("pick_bind_group_layout"),
    })
}

/// A uniform holding `id`, padded to the 16 bytes WebGL requires.
pub fn load_pick_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    id: u32,
) -> wgpu::BindGroup {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("Pick id {}", id)),
        contents: bytemuck::cast_slice(&[id, 0, 0, 0]),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: buffer.as_entire_binding(),
        }],
        label: Some("pick_bind_group"),
    })
}
