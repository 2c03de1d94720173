//! Keyframe animation clips and playback.
//!
//! A clip is a set of channels, each driving one property (translation,
//! rotation or scale) of one scene node, addressed by the node's index in
//! the source asset.

use cgmath::{InnerSpace, Quaternion, Vector3, VectorSpace};

use crate::data_structures::instance::Instance;

#[derive(Clone, Debug, PartialEq)]
pub enum Keyframes {
    Translation(Vec<Vector3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
    Scale(Vec<Vector3<f32>>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
}

/// Keyframes for one property of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub target: usize,
    pub interpolation: Interpolation,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
}

impl Channel {
    /// Returns the keyframe pair surrounding `t` and the blend factor between them.
    fn locate(&self, t: f32) -> Option<(usize, usize, f32)> {
        let last = self.timestamps.len().checked_sub(1)?;
        if t <= self.timestamps[0] || last == 0 {
            return Some((0, 0, 0.0));
        }
        if t >= self.timestamps[last] {
            return Some((last, last, 0.0));
        }
        let next = self.timestamps.partition_point(|&ts| ts <= t);
        let prev = next - 1;
        let span = self.timestamps[next] - self.timestamps[prev];
        let factor = if span > 0.0 {
            (t - self.timestamps[prev]) / span
        } else {
            0.0
        };
        match self.interpolation {
            Interpolation::Linear => Some((prev, next, factor)),
            Interpolation::Step => Some((prev, prev, 0.0)),
        }
    }

    /// Writes the sampled value at time `t` into `pose`.
    pub fn apply(&self, t: f32, pose: &mut Instance) {
        let Some((a, b, f)) = self.locate(t) else {
            return;
        };
        match &self.keyframes {
            Keyframes::Translation(values) => {
                if let (Some(from), Some(to)) = (values.get(a), values.get(b)) {
                    pose.position = from.lerp(*to, f);
                }
            }
            Keyframes::Scale(values) => {
                if let (Some(from), Some(to)) = (values.get(a), values.get(b)) {
                    pose.scale = from.lerp(*to, f);
                }
            }
            Keyframes::Rotation(values) => {
                if let (Some(from), Some(to)) = (values.get(a), values.get(b)) {
                    // take the short way round
                    let to = if from.dot(*to) < 0.0 { -*to } else { *to };
                    pose.rotation = from.nlerp(to, f).normalize();
                }
            }
        }
    }

    fn end(&self) -> f32 {
        self.timestamps.last().copied().unwrap_or(0.0)
    }
}

/// A named animation.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels.iter().map(Channel::end).fold(0.0, f32::max);
        Self {
            name: name.into(),
            channels,
            duration,
        }
    }

    /// Channels that drive the node with the given asset index.
    pub fn channels_for(&self, node: usize) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(move |c| c.target == node)
    }
}

/// Looping playback of one clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationPlayer {
    clip: usize,
    time: f32,
}

impl AnimationPlayer {
    pub fn play(clip: usize) -> Self {
        Self { clip, time: 0.0 }
    }

    pub fn clip(&self) -> usize {
        self.clip
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Moves the playhead by `dt` seconds, wrapping at the clip's end.
    pub fn advance(&mut self, dt: f32, clip: &AnimationClip) {
        self.time += dt;
        if clip.duration > 0.0 {
            self.time %= clip.duration;
        } else {
            self.time = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Rotation3};

    use super::*;

    fn translation(target: usize, interpolation: Interpolation) -> Channel {
        Channel {
            target,
            interpolation,
            timestamps: vec![0.0, 1.0, 2.0],
            keyframes: Keyframes::Translation(vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(2.0, 4.0, 0.0),
            ]),
        }
    }

    #[test]
    fn linear_translation_blends_between_keys() {
        let channel = translation(0, Interpolation::Linear);
        let mut pose = Instance::new();
        channel.apply(0.5, &mut pose);
        assert_eq!(pose.position, Vector3::new(1.0, 0.0, 0.0));
        channel.apply(1.5, &mut pose);
        assert_eq!(pose.position, Vector3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn step_holds_previous_key() {
        let channel = translation(0, Interpolation::Step);
        let mut pose = Instance::new();
        channel.apply(1.9, &mut pose);
        assert_eq!(pose.position, Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn sampling_clamps_outside_range() {
        let channel = translation(0, Interpolation::Linear);
        let mut pose = Instance::new();
        channel.apply(-1.0, &mut pose);
        assert_eq!(pose.position, Vector3::new(0.0, 0.0, 0.0));
        channel.apply(10.0, &mut pose);
        assert_eq!(pose.position, Vector3::new(2.0, 4.0, 0.0));
    }

    #[test]
    fn rotation_halfway() {
        let channel = Channel {
            target: 3,
            interpolation: Interpolation::Linear,
            timestamps: vec![0.0, 1.0],
            keyframes: Keyframes::Rotation(vec![
                Quaternion::from_angle_y(Deg(0.0)),
                Quaternion::from_angle_y(Deg(90.0)),
            ]),
        };
        let mut pose = Instance::new();
        channel.apply(0.5, &mut pose);
        let expected = Quaternion::from_angle_y(Deg(45.0));
        assert!((pose.rotation.dot(expected).abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn clip_duration_and_looping() {
        let clip = AnimationClip::new("Wave", vec![translation(1, Interpolation::Linear)]);
        assert_eq!(clip.duration, 2.0);
        assert_eq!(clip.channels_for(1).count(), 1);
        assert_eq!(clip.channels_for(0).count(), 0);

        let mut player = AnimationPlayer::play(0);
        player.advance(1.5, &clip);
        player.advance(1.0, &clip);
        assert!((player.time() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn empty_clip_stays_at_zero() {
        let clip = AnimationClip::new("Empty", Vec::new());
        let mut player = AnimationPlayer::play(0);
        player.advance(0.3, &clip);
        assert_eq!(player.time(), 0.0);
    }
}
