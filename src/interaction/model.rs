use std::{f32::consts::PI, time::Duration};

use cgmath::{Quaternion, Rad, Rotation3, Vector2, Vector3};

use crate::{
    data_structures::{animation::AnimationClip, instance::Instance},
    interaction::{
        InteractionState, ROTATE_WINDOW, ResetTimer, SCROLL_SENSITIVITY, VIBRATE_AMPLITUDE,
        VIBRATE_FREQUENCY, VIBRATE_WINDOW,
        config::{InteractionMode, ModelConfiguration, PositionMode, SpinRate, TransformOptions},
    },
};

/// Inputs sampled once per rendered frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput {
    /// Pointer position relative to the model's viewport, each axis in `[-1, 1]`.
    pub pointer: Vector2<f32>,
    /// Clock time since the application started.
    pub elapsed: Duration,
    /// Time since the previous frame.
    pub dt: Duration,
}

/// One loaded model's interaction logic.
///
/// Owns the interaction state exclusively; the transform it produces is the
/// local transform of the model's root node.
#[derive(Debug)]
pub struct InteractiveModel {
    config: ModelConfiguration,
    options: TransformOptions,
    state: InteractionState,
    vibrate_reset: ResetTimer,
    rotate_reset: ResetTimer,
    yaw: f32,
    transform: Instance,
}

impl InteractiveModel {
    pub fn new(config: ModelConfiguration, options: TransformOptions) -> Self {
        let scale = config.scale();
        let transform = Instance {
            scale: Vector3::new(scale, scale, scale),
            ..Instance::new()
        };
        Self {
            config,
            options,
            state: InteractionState::default(),
            vibrate_reset: ResetTimer::new(),
            rotate_reset: ResetTimer::new(),
            yaw: 0.0,
            transform,
        }
    }

    pub fn config(&self) -> &ModelConfiguration {
        &self.config
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Current yaw in radians.
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn transform(&self) -> &Instance {
        &self.transform
    }

    /// Caches the scroll offset derived from the page scroll in logical pixels.
    pub fn on_scroll(&mut self, scroll_px: f32) {
        self.state.scroll_offset = scroll_px / SCROLL_SENSITIVITY;
    }

    /// Applies the click policy at clock time `now`.
    ///
    /// Returns whether the click changed the interaction state.
    pub fn on_click(&mut self, now: Duration) -> bool {
        match self.config.interaction_mode() {
            InteractionMode::Vibrate => {
                self.state.is_vibrating = true;
                self.vibrate_reset.arm(now, VIBRATE_WINDOW);
                true
            }
            InteractionMode::Rotate => {
                self.state.is_rotating = true;
                self.rotate_reset.arm(now, ROTATE_WINDOW);
                true
            }
            InteractionMode::Animate | InteractionMode::None => {
                log::debug!(
                    "click on {} ignored in mode {}",
                    self.config.asset_path(),
                    self.config.interaction_mode()
                );
                false
            }
        }
    }

    /// Runs the per-frame transform policy and returns the resulting root transform.
    pub fn on_frame(&mut self, input: &FrameInput) -> &Instance {
        if self.vibrate_reset.expire(input.elapsed) {
            self.state.is_vibrating = false;
        }
        if self.rotate_reset.expire(input.elapsed) {
            self.state.is_rotating = false;
        }

        if self.config.follow_cursor() {
            self.yaw = input.pointer.x * PI;
        }

        let [x, y, z] = self.config.position();
        let mut position = Vector3::new(x, y, z);
        match self.options.position_mode {
            PositionMode::ScrollOverride => position.y = self.state.scroll_offset - 1.0,
            PositionMode::Baseline => position.y = y + self.state.scroll_offset,
        }

        if self.state.is_vibrating {
            let shake = (input.elapsed.as_secs_f32() * VIBRATE_FREQUENCY).sin() * VIBRATE_AMPLITUDE;
            position.x = match self.options.position_mode {
                PositionMode::ScrollOverride => shake,
                PositionMode::Baseline => x + shake,
            };
        }

        if self.state.is_rotating {
            self.yaw += match self.options.spin_rate {
                SpinRate::PerFrame(step) => step,
                SpinRate::PerSecond(rate) => rate * input.dt.as_secs_f32(),
            };
        }

        let scale = self.config.scale();
        self.transform = Instance {
            position,
            rotation: Quaternion::from_angle_y(Rad(self.yaw)),
            scale: Vector3::new(scale, scale, scale),
        };
        &self.transform
    }

    /// Picks the clip to play at mount time: the first one, whatever the mode.
    pub fn mount_clip(&self, clips: &[AnimationClip]) -> Option<usize> {
        match clips.first() {
            Some(clip) => {
                log::info!(
                    "playing clip '{}' of {}",
                    clip.name,
                    self.config.asset_path()
                );
                Some(0)
            }
            None => {
                log::debug!("{} has no animation clips", self.config.asset_path());
                None
            }
        }
    }

    /// Cancels pending resets and clears both flags.
    pub fn teardown(&mut self) {
        self.vibrate_reset.cancel();
        self.rotate_reset.cancel();
        self.state.is_vibrating = false;
        self.state.is_rotating = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn model(mode: InteractionMode, follow_cursor: bool, scale: f32, position: [f32; 3]) -> InteractiveModel {
        let config = ModelConfiguration::new("model.glb", mode, follow_cursor, scale, position).unwrap();
        InteractiveModel::new(config, TransformOptions::default())
    }

    fn frame(ms: u64, pointer_x: f32) -> FrameInput {
        FrameInput {
            pointer: Vector2::new(pointer_x, 0.0),
            elapsed: Duration::from_millis(ms),
            dt: Duration::from_millis(16),
        }
    }

    #[test]
    fn follow_cursor_maps_pointer_to_half_turn() {
        let mut m = model(InteractionMode::None, true, 1.0, [0.0; 3]);
        for x in [-1.0, -0.25, 0.0, 0.5, 1.0] {
            m.on_frame(&frame(0, x));
            assert!((m.yaw() - x * PI).abs() < EPS);
        }
    }

    #[test]
    fn vertical_position_tracks_scroll_not_configuration() {
        let mut m = model(InteractionMode::None, false, 1.0, [0.0, 3.0, 0.0]);
        assert!((m.on_frame(&frame(0, 0.0)).position.y + 1.0).abs() < EPS);
        m.on_scroll(250.0);
        assert!((m.on_frame(&frame(16, 0.0)).position.y - (-0.5)).abs() < EPS);
        m.on_scroll(1000.0);
        assert!((m.on_frame(&frame(32, 0.0)).position.y - 1.0).abs() < EPS);
    }

    #[test]
    fn scroll_offset_is_cached_between_scroll_events() {
        let mut m = model(InteractionMode::None, false, 1.0, [0.0; 3]);
        m.on_scroll(500.0);
        for t in 0..5 {
            assert!((m.on_frame(&frame(t * 16, 0.0)).position.y).abs() < EPS);
        }
        assert!((m.state().scroll_offset - 1.0).abs() < EPS);
    }

    #[test]
    fn vibrate_window_is_exactly_500ms() {
        let mut m = model(InteractionMode::Vibrate, false, 1.0, [0.0; 3]);
        assert!(m.on_click(Duration::from_millis(1_000)));
        for t in (1_000..1_500).step_by(10) {
            let x = m.on_frame(&frame(t, 0.0)).position.x;
            let expected = ((t as f32 / 1000.0) * 50.0).sin() * 0.05;
            assert!((x - expected).abs() < 1e-4, "t={} x={} expected={}", t, x, expected);
            assert!(m.state().is_vibrating);
        }
        assert_eq!(m.on_frame(&frame(1_500, 0.0)).position.x, 0.0);
        assert!(!m.state().is_vibrating);
    }

    #[test]
    fn repeated_vibrate_click_extends_window() {
        let mut m = model(InteractionMode::Vibrate, false, 1.0, [0.0; 3]);
        m.on_click(Duration::from_millis(0));
        m.on_click(Duration::from_millis(400));
        m.on_frame(&frame(600, 0.0));
        assert!(m.state().is_vibrating);
        m.on_frame(&frame(900, 0.0));
        assert!(!m.state().is_vibrating);
    }

    #[test]
    fn rotate_spins_by_fixed_step_for_1064ms() {
        let mut m = model(InteractionMode::Rotate, false, 1.0, [0.0; 3]);
        m.on_click(Duration::from_millis(0));
        let mut previous = m.yaw();
        let mut t = 0;
        while t < 1_064 {
            m.on_frame(&frame(t, 0.0));
            assert!((m.yaw() - previous - 0.1).abs() < EPS);
            previous = m.yaw();
            t += 16;
        }
        m.on_frame(&frame(t, 0.0));
        assert!(!m.state().is_rotating);
        assert!((m.yaw() - previous).abs() < EPS);
        m.on_frame(&frame(t + 16, 0.0));
        assert!((m.yaw() - previous).abs() < EPS);
    }

    #[test]
    fn per_second_spin_uses_frame_delta() {
        let config = ModelConfiguration::new("model.glb", InteractionMode::Rotate, false, 1.0, [0.0; 3]).unwrap();
        let options = TransformOptions {
            spin_rate: SpinRate::PerSecond(6.0),
            ..Default::default()
        };
        let mut m = InteractiveModel::new(config, options);
        m.on_click(Duration::ZERO);
        m.on_frame(&FrameInput {
            pointer: Vector2::new(0.0, 0.0),
            elapsed: Duration::from_millis(500),
            dt: Duration::from_millis(500),
        });
        assert!((m.yaw() - 3.0).abs() < EPS);
    }

    #[test]
    fn follow_cursor_overwrites_spin() {
        let mut m = model(InteractionMode::Rotate, true, 1.0, [0.0; 3]);
        m.on_click(Duration::ZERO);
        m.on_frame(&frame(16, 0.5));
        assert!((m.yaw() - (0.5 * PI + 0.1)).abs() < EPS);
        m.on_frame(&frame(32, 0.5));
        assert!((m.yaw() - (0.5 * PI + 0.1)).abs() < EPS);
    }

    #[test]
    fn flags_are_independent() {
        let config = ModelConfiguration::new("model.glb", InteractionMode::Vibrate, false, 1.0, [0.0; 3]).unwrap();
        let mut m = InteractiveModel::new(config, TransformOptions::default());
        m.on_click(Duration::ZERO);
        m.rotate_reset.arm(Duration::ZERO, ROTATE_WINDOW);
        m.state.is_rotating = true;
        m.on_frame(&frame(100, 0.0));
        assert!(m.state().is_vibrating && m.state().is_rotating);
        assert!((m.yaw() - 0.1).abs() < EPS);
    }

    #[test]
    fn scale_is_always_configured_value() {
        let mut m = model(InteractionMode::Rotate, true, 1.2, [0.0; 3]);
        m.on_click(Duration::ZERO);
        m.on_scroll(800.0);
        for t in (0..2_000).step_by(100) {
            let s = m.on_frame(&frame(t, 0.3)).scale;
            assert_eq!(s, Vector3::new(1.2, 1.2, 1.2));
        }
    }

    #[test]
    fn animate_and_none_ignore_clicks() {
        for mode in [InteractionMode::Animate, InteractionMode::None] {
            let mut m = model(mode, false, 1.0, [0.0; 3]);
            assert!(!m.on_click(Duration::ZERO));
            m.on_frame(&frame(100, 0.0));
            assert_eq!(*m.state(), InteractionState::default());
        }
    }

    #[test]
    fn mount_plays_first_clip_regardless_of_mode() {
        let clips = vec![
            AnimationClip::new("Idle", Vec::new()),
            AnimationClip::new("Walk", Vec::new()),
        ];
        for mode in [InteractionMode::Animate, InteractionMode::Vibrate, InteractionMode::None] {
            let m = model(mode, false, 1.0, [0.0; 3]);
            assert_eq!(m.mount_clip(&clips), Some(0));
            assert_eq!(m.mount_clip(&[]), None);
        }
    }

    #[test]
    fn teardown_cancels_pending_resets() {
        let mut m = model(InteractionMode::Rotate, false, 1.0, [0.0; 3]);
        m.on_click(Duration::ZERO);
        m.teardown();
        assert!(!m.state().is_rotating);
        assert!(!m.rotate_reset.is_armed());
        let yaw = m.yaw();
        m.on_frame(&frame(16, 0.0));
        assert_eq!(m.yaw(), yaw);
    }

    #[test]
    fn baseline_mode_keeps_configured_position() {
        let config = ModelConfiguration::new("model.glb", InteractionMode::Vibrate, false, 1.0, [0.5, 2.0, 0.0]).unwrap();
        let options = TransformOptions {
            position_mode: PositionMode::Baseline,
            ..Default::default()
        };
        let mut m = InteractiveModel::new(config, options);
        m.on_scroll(500.0);
        let p = m.on_frame(&frame(0, 0.0)).position;
        assert!((p.x - 0.5).abs() < EPS);
        assert!((p.y - 3.0).abs() < EPS);
        m.on_click(Duration::from_millis(10));
        let p = m.on_frame(&frame(20, 0.0)).position;
        assert!((p.x - (0.5 + (0.02f32 * 50.0).sin() * 0.05)).abs() < 1e-4);
    }

    #[test]
    fn vibrate_scenario_end_to_end() {
        let mut m = model(InteractionMode::Vibrate, true, 0.8, [0.0, -1.0, 0.0]);
        m.on_scroll(0.0);
        m.on_click(Duration::ZERO);
        for t in (0..=700).step_by(20) {
            let p = m.on_frame(&frame(t, 0.0)).position;
            let expected_x = if t < 500 {
                ((t as f32 / 1000.0) * 50.0).sin() * 0.05
            } else {
                0.0
            };
            assert!((p.x - expected_x).abs() < 1e-4, "t={}", t);
            assert!((p.y + 1.0).abs() < EPS);
            assert!((p.z).abs() < EPS);
        }
    }
}
