//! Object picking.
//!
//! A left click renders every flow's geometry into an offscreen `R32Uint`
//! texture where each fragment stores the pick id of what produced it,
//! reads back the texel under the cursor and maps the id to the flows that
//! own it. Only those flows get `on_click`.
//!
//! Section models are drawn through their own viewport and camera, exactly
//! as in the colour pass, so what is clicked is what is seen. Panels with
//! id 0 are drawn too: they hide models behind them without being
//! clickable themselves.

use std::{
    collections::{HashMap, HashSet},
    iter,
};

use anyhow::anyhow;

use crate::{
    context::Context,
    data_structures::{model::DrawModel, texture::Texture},
    flow::GraphicsFlow,
    pipelines::pick::PICK_FORMAT,
    render::{Flat, Viewport},
    resources::pick::load_pick_bind_group,
};

#[cfg(target_arch = "wasm32")]
use crate::flow::FlowEvent;

const BYTES_PER_PIXEL: u32 = std::mem::size_of::<u32>() as u32;

/// Row stride of a read-back buffer for a `width` texels wide texture.
/// Copies require rows aligned to 256 bytes.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Byte offset of the texel at physical `(x, y)` in a padded read-back
/// buffer, `None` if the point lies outside the texture.
pub fn pick_index(x: f64, y: f64, width: u32, height: u32) -> Option<usize> {
    if x < 0.0 || y < 0.0 {
        return None;
    }
    let (x, y) = (x as u32, y as u32);
    if x >= width || y >= height {
        return None;
    }
    Some((y * padded_bytes_per_row(width) + x * BYTES_PER_PIXEL) as usize)
}

/// Render all flows to the pick texture and determine which object was clicked.
///
/// # Arguments
///
/// * `async_runtime` blocks on the read-back natively
/// * `flows` are all active flows in dispatch order
/// * `ctx` is the rendering context; the cursor is taken from `ctx.mouse`
/// * `proxy` receives the result as [`FlowEvent::Id`] on wasm
///
/// # Returns
///
/// `Some((pick_id, flow_ids))` if something clickable was hit natively,
/// `None` on a miss or when the result is delivered through the event loop.
pub(crate) fn draw_to_pick_buffer<S: 'static>(
    #[cfg(not(target_arch = "wasm32"))] async_runtime: &tokio::runtime::Runtime,
    flows: &[Box<dyn GraphicsFlow<S>>],
    ctx: &Context,
    #[cfg(target_arch = "wasm32")] proxy: winit::event_loop::EventLoopProxy<FlowEvent<S>>,
) -> Option<(u32, HashSet<usize>)> {
    let width = ctx.config.width;
    let height = ctx.config.height;
    let extent3d = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let pick_texture = ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Pick texture"),
        size: extent3d,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: PICK_FORMAT,
        usage: wgpu::TextureUsages::COPY_SRC | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let pick_depth = Texture::create_depth_texture(&ctx.device, [width, height], "Pick depth texture");

    let mut translation: HashMap<u32, HashSet<usize>> = HashMap::new();
    let mut viewports: Vec<Viewport> = Vec::new();
    let mut flats: Vec<Flat> = Vec::new();
    flows.iter().enumerate().for_each(|(idx, flow)| {
        let render = flow.on_render();
        render.map_ids(idx, &mut translation);
        render.set_pipelines(&mut viewports, &mut flats, &mut Vec::new());
    });

    let ids = viewports
        .iter()
        .flat_map(|viewport| viewport.models.iter().map(|instanced| instanced.id))
        .chain(flats.iter().map(|flat| flat.id));
    let mut pick_groups: HashMap<u32, wgpu::BindGroup> = HashMap::new();
    for id in ids {
        pick_groups
            .entry(id)
            .or_insert_with(|| load_pick_bind_group(&ctx.device, &ctx.layouts.pick, id));
    }

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Pick Encoder"),
        });
    {
        let view = pick_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Pick Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &pick_depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            ..Default::default()
        });

        render_pass.set_pipeline(&ctx.pipelines.pick);
        for viewport in &viewports {
            let [x, y, w, h] = viewport.rect;
            render_pass.set_viewport(x as f32, y as f32, w as f32, h as f32, 0.0, 1.0);
            render_pass.set_scissor_rect(x, y, w, h);
            for instanced in &viewport.models {
                let Some(group) = pick_groups.get(&instanced.id) else {
                    continue;
                };
                let amount: Result<u32, _> = instanced.amount.try_into();
                match amount {
                    Err(e) => log::error!(
                        "Failed to pick object with id {}. Maximum amount of supported instances is {}. Error: {}",
                        instanced.id,
                        u32::MAX,
                        e
                    ),
                    Ok(0) => (),
                    Ok(amount) => {
                        render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                        render_pass.draw_pick_instanced(
                            instanced.model,
                            0..amount,
                            group,
                            viewport.camera,
                            instanced.skin,
                        );
                    }
                }
            }
        }
        render_pass.set_viewport(0.0, 0.0, width as f32, height as f32, 0.0, 1.0);
        render_pass.set_scissor_rect(0, 0, width, height);

        render_pass.set_pipeline(&ctx.pipelines.gui_pick);
        for flat in &flats {
            let Some(group) = pick_groups.get(&flat.id) else {
                continue;
            };
            render_pass.set_bind_group(0, group, &[]);
            render_pass.set_vertex_buffer(0, flat.vertex.slice(..));
            render_pass.set_index_buffer(flat.index.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..flat.amount as u32, 0, 0..1);
        }
    }

    let bytes_per_row = padded_bytes_per_row(width);
    let output_buffer = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        size: (bytes_per_row * height) as wgpu::BufferAddress,
        // this tells wgpu that we want to read this buffer from the cpu
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        label: Some("Pick read-back buffer"),
        mapped_at_creation: false,
    });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            aspect: wgpu::TextureAspect::All,
            texture: &pick_texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &output_buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        extent3d,
    );
    ctx.queue.submit(iter::once(encoder.finish()));

    let device = ctx.device.clone();
    let coords = ctx.mouse.coords;

    #[cfg(target_arch = "wasm32")]
    {
        wasm_bindgen_futures::spawn_local(async move {
            match read_texture_buffer(&output_buffer, &device, coords, width, height).await {
                Ok(id) => {
                    if let Some(flow_ids) = translation.get(&id) {
                        if proxy
                            .send_event(FlowEvent::Id((id, flow_ids.clone())))
                            .is_err()
                        {
                            log::warn!("event loop closed before pick {} was delivered", id);
                        }
                    }
                }
                Err(e) => log::error!("Picking failed: {}", e),
            }
        });
        None
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let id = async_runtime
            .block_on(read_texture_buffer(&output_buffer, &device, coords, width, height))
            .map_err(|e| log::error!("Picking failed: {}", e))
            .ok()?;
        translation.get(&id).map(|flow_ids| (id, flow_ids.clone()))
    }
}

async fn read_texture_buffer(
    buffer: &wgpu::Buffer,
    device: &wgpu::Device,
    coords: winit::dpi::PhysicalPosition<f64>,
    width: u32,
    height: u32,
) -> anyhow::Result<u32> {
    let index = pick_index(coords.x, coords.y, width, height)
        .ok_or_else(|| anyhow!("cursor {:?} outside of {}x{}", coords, width, height))?;

    // The mapping has to be requested before polling, otherwise the
    // future never resolves.
    let buffer_slice = buffer.slice(..);
    let (tx, rx) = futures_intrusive::channel::shared::oneshot_channel();
    buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    #[cfg(target_arch = "wasm32")]
    let polled = device.poll(wgpu::PollType::Poll);
    #[cfg(not(target_arch = "wasm32"))]
    let polled = device.poll(wgpu::PollType::Wait {
        submission_index: None,
        timeout: None,
    });
    if let Err(e) = polled {
        log::warn!("device poll failed: {}", e);
    }
    rx.receive()
        .await
        .ok_or_else(|| anyhow!("read-back was cancelled"))??;

    let id = {
        let data = buffer_slice.get_mapped_range();
        let texel = data
            .get(index..index + BYTES_PER_PIXEL as usize)
            .ok_or_else(|| anyhow!("texel {} outside of the read-back buffer", index))?;
        u32::from_le_bytes([texel[0], texel[1], texel[2], texel[3]])
    };
    buffer.unmap();

    log::info!("Selected obj with id {}", id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_padded_to_copy_alignment() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
        assert_eq!(padded_bytes_per_row(800), 3328);
    }

    #[test]
    fn pick_index_uses_padded_rows() {
        // 65 texels wide: 260 bytes per row, padded to 512
        assert_eq!(pick_index(0.0, 0.0, 65, 10), Some(0));
        assert_eq!(pick_index(3.0, 0.0, 65, 10), Some(12));
        assert_eq!(pick_index(3.7, 2.2, 65, 10), Some(2 * 512 + 12));
    }

    #[test]
    fn pick_index_rejects_points_outside() {
        assert_eq!(pick_index(65.0, 0.0, 65, 10), None);
        assert_eq!(pick_index(0.0, 10.0, 65, 10), None);
        assert_eq!(pick_index(-0.5, 3.0, 65, 10), None);
    }
}
