//! A page section: text panel on the left, an interactive model in its own
//! viewport on the right.

use cgmath::{Deg, Vector2};
use instant::Duration;
use winit::event::{MouseButton, WindowEvent};

use crate::{
    camera::{Camera, CameraResources, Projection},
    context::{Context, InitContext, MouseButtonState},
    data_structures::{
        animation::{AnimationClip, AnimationPlayer},
        instance::Instance,
        panel::{BACKGROUND_DEPTH, Panel},
        scene_graph::{ContainerNode, SceneNode},
        texture::Texture,
    },
    flow::{GraphicsFlow, Out},
    interaction::{FrameInput, InteractiveModel, ModelConfiguration, TransformOptions},
    page::{Rect, root::ShowcaseState},
    render::{Render, Viewport},
    resources::load_model_gltf,
    text::{LINE_SPACING, Label},
};

/// Share of the block width taken by the model viewport.
pub const VIEWPORT_FRACTION: f32 = 0.6;

const BACKGROUND_COLOUR: [u8; 4] = [244, 246, 250, 255];
const TEXT_PANEL_COLOUR: [u8; 4] = [226, 232, 240, 255];
const HEADING_COLOUR: [u8; 4] = [17, 24, 39, 255];
const BODY_COLOUR: [u8; 4] = [55, 65, 81, 255];
const ASIDE_COLOUR: [u8; 4] = [99, 102, 241, 255];

const TEXT_PADDING: f32 = 48.0;
const TITLE_SIZE: f32 = 40.0;
const BODY_SIZE: f32 = 20.0;
const ASIDE_SIZE: f32 = 16.0;
const PARAGRAPH_GAP: f32 = 24.0;

/// Literal content of one section.
#[derive(Clone, Debug, PartialEq)]
pub struct SectionDescriptor {
    pub id: String,
    pub title: String,
    pub description: String,
    pub side_text: String,
    pub model: ModelConfiguration,
}

/// Title, description and side text stacked in the text panel `panel`.
///
/// The title starts a quarter down the panel and may wrap onto two lines,
/// the description gets up to a third of the panel and the side text the
/// rest.
pub fn section_labels(descriptor: &SectionDescriptor, panel: Rect) -> Vec<Label> {
    let inner = Rect::new(
        panel.x + TEXT_PADDING,
        panel.y + TEXT_PADDING,
        (panel.w - 2.0 * TEXT_PADDING).max(0.0),
        (panel.h - 2.0 * TEXT_PADDING).max(0.0),
    );
    let title = Label::new(
        descriptor.title.as_str(),
        Rect::new(inner.x, inner.y + inner.h / 4.0, inner.w, 2.0 * TITLE_SIZE * LINE_SPACING),
        TITLE_SIZE,
        HEADING_COLOUR,
    );
    let description = Label::new(
        descriptor.description.as_str(),
        Rect::new(inner.x, title.rect.bottom() + PARAGRAPH_GAP, inner.w, inner.h / 3.0),
        BODY_SIZE,
        BODY_COLOUR,
    );
    let aside_top = description.rect.bottom() + PARAGRAPH_GAP;
    let side_text = Label::new(
        descriptor.side_text.as_str(),
        Rect::new(inner.x, aside_top, inner.w, (inner.bottom() - aside_top).max(0.0)),
        ASIDE_SIZE,
        ASIDE_COLOUR,
    );
    vec![title, description, side_text]
}

/// The loaded asset together with the logic animating it.
struct MountedModel {
    model: InteractiveModel,
    root: ContainerNode,
    clips: Vec<AnimationClip>,
    player: Option<AnimationPlayer>,
}

impl MountedModel {
    fn advance(&mut self, input: &FrameInput, queue: &wgpu::Queue) {
        let transform = *self.model.on_frame(input);
        self.root.set_local_transform(transform);
        if let Some(player) = self.player.as_mut() {
            if let Some(clip) = self.clips.get(player.clip()) {
                player.advance(input.dt.as_secs_f32(), clip);
                self.root.apply_pose(clip, player.time());
            }
        }
        self.root.update_world_transforms(&Instance::new());
        self.root.update_skins();
        self.root.write_to_buffers(queue);
    }
}

pub struct SectionView {
    descriptor: SectionDescriptor,
    pick_id: u32,
    background: Panel,
    text_panel: Panel,
    camera: CameraResources,
    mounted: Option<MountedModel>,
    /// Logical rectangle of the model viewport, possibly off screen.
    area: Rect,
    /// Physical, clipped viewport; `None` while the section is off screen.
    viewport: Option<[u32; 4]>,
    dragging: bool,
    last_cursor: Option<[f32; 2]>,
    labels: Vec<Label>,
}

impl SectionView {
    /// Builds the section and mounts its model. A model that cannot be
    /// loaded is logged and the section shows its panels only.
    pub async fn new(
        ctx: InitContext,
        descriptor: SectionDescriptor,
        options: TransformOptions,
        pick_id: u32,
    ) -> Self {
        let background = Panel::new(
            &ctx.device,
            &ctx.layouts.gui,
            &Texture::from_color(&ctx.device, &ctx.queue, BACKGROUND_COLOUR, "section background"),
            BACKGROUND_DEPTH,
            0,
        );
        let text_panel = Panel::new(
            &ctx.device,
            &ctx.layouts.gui,
            &Texture::from_color(&ctx.device, &ctx.queue, TEXT_PANEL_COLOUR, "section text"),
            BACKGROUND_DEPTH,
            0,
        );
        let camera = CameraResources::new(
            &ctx.device,
            &ctx.layouts.camera,
            Camera::new((0.0, 0.0, 0.0), 5.0),
            Projection::new(1.0, 1.0, Deg(75.0), 0.1, 1000.0),
        );

        let asset = descriptor.model.asset_path().to_owned();
        let mounted = match load_model_gltf(&asset, &ctx.device, &ctx.queue, &ctx.layouts, pick_id).await {
            Ok(loaded) => {
                let model = InteractiveModel::new(descriptor.model.clone(), options);
                let player = model.mount_clip(&loaded.clips).map(AnimationPlayer::play);
                log::info!(
                    "section '{}' mounted {} ({} nodes)",
                    descriptor.id,
                    asset,
                    loaded.root.count()
                );
                Some(MountedModel {
                    model,
                    root: loaded.root,
                    clips: loaded.clips,
                    player,
                })
            }
            Err(e) => {
                log::error!("section '{}' could not load {}: {:#}", descriptor.id, asset, e);
                None
            }
        };

        Self {
            descriptor,
            pick_id,
            background,
            text_panel,
            camera,
            mounted,
            area: Rect::default(),
            viewport: None,
            dragging: false,
            last_cursor: None,
            labels: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> &SectionDescriptor {
        &self.descriptor
    }
}

impl GraphicsFlow<ShowcaseState> for SectionView {
    fn on_init(&mut self, _: &mut Context, _: &mut ShowcaseState) -> Out {
        Out::Empty
    }

    fn on_click(&mut self, ctx: &Context, _: &mut ShowcaseState, id: u32) -> Out {
        if id != self.pick_id {
            return Out::Empty;
        }
        if let Some(mounted) = self.mounted.as_mut() {
            if mounted.model.on_click(ctx.elapsed()) {
                log::debug!(
                    "'{}' {} at {:?}",
                    self.descriptor.id,
                    mounted.model.config().interaction_mode(),
                    ctx.elapsed()
                );
            }
        }
        Out::Empty
    }

    fn on_scroll(&mut self, _: &Context, _: &mut ShowcaseState, position: f32) -> Out {
        if let Some(mounted) = self.mounted.as_mut() {
            mounted.model.on_scroll(position);
        }
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut ShowcaseState, dt: Duration) -> Out {
        let Some(block) = ctx.page.block_rect(&self.descriptor.id) else {
            self.viewport = None;
            self.labels.clear();
            return Out::Empty;
        };
        let window = ctx.page.window();
        let panel = Rect::new(block.x, block.y, block.w * (1.0 - VIEWPORT_FRACTION), block.h);
        self.background.update(&ctx.queue, block, window);
        self.text_panel.update(&ctx.queue, panel, window);
        self.labels = section_labels(&self.descriptor, panel);
        self.area = block.right_part(VIEWPORT_FRACTION);

        let visible = self.area.intersect(&ctx.page.window_rect());
        self.viewport = visible.as_ref().and_then(|rect| ctx.to_viewport(rect));

        if let Some(mounted) = self.mounted.as_mut() {
            let [x, y] = ctx.cursor();
            let [px, py] = self.area.normalized(x, y);
            let input = FrameInput {
                pointer: Vector2::new(px, py),
                elapsed: ctx.elapsed(),
                dt,
            };
            mounted.advance(&input, &ctx.queue);
        }

        if let Some(visible) = visible {
            let scale = ctx.scale_factor();
            self.camera
                .update(&ctx.queue, &self.area.scaled(scale), &visible.scaled(scale));
        }
        Out::Empty
    }

    fn on_window_events(&mut self, ctx: &Context, _: &mut ShowcaseState, event: &WindowEvent) -> Out {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Right,
                ..
            } => {
                let [x, y] = ctx.cursor();
                self.dragging = state.is_pressed()
                    && self.viewport.is_some()
                    && self.mounted.is_some()
                    && self.area.contains(x, y);
                self.last_cursor = Some([x, y]);
            }
            WindowEvent::CursorMoved { .. } => {
                let cursor = ctx.cursor();
                if self.dragging && ctx.mouse.pressed == MouseButtonState::Right {
                    if let Some([lx, ly]) = self.last_cursor {
                        self.camera
                            .controller
                            .handle_drag((cursor[0] - lx) as f64, (cursor[1] - ly) as f64);
                    }
                }
                self.last_cursor = Some(cursor);
            }
            _ => (),
        }
        Out::Empty
    }

    fn on_teardown(&mut self, _: &mut ShowcaseState) {
        if let Some(mounted) = self.mounted.as_mut() {
            mounted.model.teardown();
        }
    }

    fn on_render(&self) -> Render<'_> {
        let mut renders: Vec<Render> = vec![self.background.flat().into(), self.text_panel.flat().into()];
        renders.extend(self.labels.iter().map(Render::from));
        if let (Some(mounted), Some(rect)) = (&self.mounted, self.viewport) {
            renders.push(Viewport::of_scene(rect, &self.camera.bind_group, &mounted.root).into());
        }
        Render::Composed(renders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::InteractionMode;

    fn descriptor() -> SectionDescriptor {
        SectionDescriptor {
            id: String::from("section1"),
            title: String::from("Advanced AI"),
            description: String::from("Models that see, listen and respond."),
            side_text: String::from("Scroll to lift the robot."),
            model: ModelConfiguration::new("cute_robot.glb", InteractionMode::Vibrate, true, 0.8, [0.0; 3])
                .unwrap(),
        }
    }

    #[test]
    fn text_stacks_inside_the_text_panel() {
        let panel = Rect::new(0.0, 800.0, 512.0, 800.0);
        let labels = section_labels(&descriptor(), panel);

        let texts: Vec<&str> = labels.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Advanced AI",
                "Models that see, listen and respond.",
                "Scroll to lift the robot."
            ]
        );
        for label in &labels {
            let inside = label.rect.x >= panel.x
                && label.rect.right() <= panel.right()
                && label.rect.y >= panel.y
                && label.rect.bottom() <= panel.bottom();
            assert!(inside, "{} leaves the panel", label.text);
            assert_eq!(label.rect.w, 512.0 - 2.0 * TEXT_PADDING);
        }
        assert!(labels.windows(2).all(|pair| pair[0].rect.bottom() < pair[1].rect.y));
        assert!(labels[0].size > labels[1].size && labels[1].size > labels[2].size);
    }

    #[test]
    fn labels_follow_the_scrolled_block() {
        let at_top = section_labels(&descriptor(), Rect::new(0.0, 800.0, 512.0, 800.0));
        let scrolled = section_labels(&descriptor(), Rect::new(0.0, 300.0, 512.0, 800.0));
        for (a, b) in at_top.iter().zip(&scrolled) {
            assert!((a.rect.y - b.rect.y - 500.0).abs() < 1e-3);
        }
    }
}
