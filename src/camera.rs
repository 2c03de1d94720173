//! Orbit cameras, projections and their uniforms.
//!
//! Every section owns one [`CameraResources`]: a camera orbiting the origin,
//! a perspective projection with the section viewport's aspect and the
//! uniform buffer the model and pick shaders read.

use std::f32::consts::FRAC_PI_2;

use cgmath::{Matrix4, Point3, Rad, SquareMatrix, Vector3, perspective};
use wgpu::util::DeviceExt;

use crate::page::Rect;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const SAFE_PITCH: f32 = FRAC_PI_2 - 0.01;

/// A camera on a sphere around `target`.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub target: Point3<f32>,
    pub distance: f32,
    pub yaw: Rad<f32>,
    pub pitch: Rad<f32>,
}

impl Camera {
    pub fn new<T: Into<Point3<f32>>>(target: T, distance: f32) -> Self {
        Self {
            target: target.into(),
            distance,
            yaw: Rad(0.0),
            pitch: Rad(0.0),
        }
    }

    pub fn eye(&self) -> Point3<f32> {
        let (sin_yaw, cos_yaw) = self.yaw.0.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.0.sin_cos();
        self.target
            + Vector3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw) * self.distance
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye(), self.target, Vector3::unit_y())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: f32, height: f32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width / height.max(1.0),
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.aspect = width / height;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Clip-space transform that renders the `visible` part of a viewport
/// covering `full` into a viewport covering only `visible`.
///
/// Both rectangles are in the same pixel space with Y pointing down.
pub fn crop_matrix(full: &Rect, visible: &Rect) -> Matrix4<f32> {
    if visible.w <= 0.0 || visible.h <= 0.0 {
        return Matrix4::identity();
    }
    let sx = full.w / visible.w;
    let sy = full.h / visible.h;
    let tx = (2.0 * (full.x - visible.x) + full.w) / visible.w - 1.0;
    let ty = 1.0 - (2.0 * (full.y - visible.y) + full.h) / visible.h;
    #[rustfmt::skip]
    let crop = Matrix4::new(
        sx,  0.0, 0.0, 0.0,
        0.0, sy,  0.0, 0.0,
        0.0, 0.0, 1.0, 0.0,
        tx,  ty,  0.0, 1.0,
    );
    crop
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection, crop: Matrix4<f32>) {
        self.view_position = camera.eye().to_homogeneous().into();
        self.view_proj = (crop * projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// Turns right-button drags into orbit angles. Zoom and pan are not offered.
#[derive(Debug, Clone, Copy)]
pub struct OrbitController {
    sensitivity: f32,
    pending_yaw: f32,
    pending_pitch: f32,
}

impl OrbitController {
    /// `sensitivity` is radians per logical pixel dragged.
    pub fn new(sensitivity: f32) -> Self {
        Self {
            sensitivity,
            pending_yaw: 0.0,
            pending_pitch: 0.0,
        }
    }

    pub fn handle_drag(&mut self, dx: f64, dy: f64) {
        self.pending_yaw -= dx as f32 * self.sensitivity;
        self.pending_pitch += dy as f32 * self.sensitivity;
    }

    pub fn update(&mut self, camera: &mut Camera) {
        camera.yaw += Rad(self.pending_yaw);
        camera.pitch = Rad((camera.pitch.0 + self.pending_pitch).clamp(-SAFE_PITCH, SAFE_PITCH));
        self.pending_yaw = 0.0;
        self.pending_pitch = 0.0;
    }
}

pub fn camera_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("camera_bind_group_layout"),
    })
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub projection: Projection,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl CameraResources {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        camera: Camera,
        projection: Projection,
    ) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection, Matrix4::identity());
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });
        Self {
            camera,
            controller: OrbitController::new(0.005),
            projection,
            uniform,
            buffer,
            bind_group,
        }
    }

    /// Applies pending orbit input and uploads the view projection for a
    /// viewport covering `full` of which only `visible` is drawn.
    pub fn update(&mut self, queue: &wgpu::Queue, full: &Rect, visible: &Rect) {
        self.controller.update(&mut self.camera);
        self.projection.resize(full.w, full.h);
        self.uniform
            .update_view_proj(&self.camera, &self.projection, crop_matrix(full, visible));
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Vector4};

    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn default_orbit_looks_down_negative_z_from_distance() {
        let camera = Camera::new((0.0, 0.0, 0.0), 5.0);
        let eye = camera.eye();
        assert!((eye.x).abs() < EPS && (eye.y).abs() < EPS && (eye.z - 5.0).abs() < EPS);
    }

    #[test]
    fn orbit_pitch_is_clamped() {
        let mut camera = Camera::new((0.0, 0.0, 0.0), 5.0);
        let mut controller = OrbitController::new(0.01);
        controller.handle_drag(0.0, 10_000.0);
        controller.update(&mut camera);
        assert!((camera.pitch.0 - SAFE_PITCH).abs() < EPS);
        controller.update(&mut camera);
        assert!((camera.pitch.0 - SAFE_PITCH).abs() < EPS);
    }

    #[test]
    fn crop_of_full_viewport_is_identity() {
        let rect = Rect::new(10.0, 20.0, 300.0, 200.0);
        assert_eq!(crop_matrix(&rect, &rect), Matrix4::identity());
    }

    #[test]
    fn crop_maps_visible_part_onto_ndc() {
        // the upper half of the viewport is scrolled out of the window
        let full = Rect::new(0.0, -100.0, 100.0, 200.0);
        let visible = Rect::new(0.0, 0.0, 100.0, 100.0);
        let crop = crop_matrix(&full, &visible);
        // the centre line of the full viewport is the top edge of the visible part
        let centre = crop * Vector4::new(0.0, 0.0, 0.5, 1.0);
        assert!((centre.y - 1.0).abs() < EPS);
        let bottom = crop * Vector4::new(1.0, -1.0, 0.5, 1.0);
        assert!((bottom.x - 1.0).abs() < EPS && (bottom.y + 1.0).abs() < EPS);
    }

    #[test]
    fn projection_keeps_viewport_aspect() {
        let mut projection = Projection::new(600.0, 300.0, Deg(75.0), 0.1, 1000.0);
        assert!((projection.aspect() - 2.0).abs() < EPS);
        projection.resize(0.0, 300.0);
        assert!((projection.aspect() - 2.0).abs() < EPS);
    }
}
