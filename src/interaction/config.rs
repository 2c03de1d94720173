//! Literal model configuration supplied by the page composition.

use std::{fmt, str::FromStr};

use anyhow::{bail, ensure};

/// What a click on the model's geometry does.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionMode {
    /// Shake horizontally for a short window.
    Vibrate,
    /// Spin about the vertical axis for a short window.
    Rotate,
    /// No click behaviour; the mount-time clip carries the motion.
    Animate,
    None,
}

impl FromStr for InteractionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vibrate" => Ok(Self::Vibrate),
            "rotate" => Ok(Self::Rotate),
            "animate" => Ok(Self::Animate),
            "none" => Ok(Self::None),
            other => bail!("unknown interaction mode '{}'", other),
        }
    }
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vibrate => "vibrate",
            Self::Rotate => "rotate",
            Self::Animate => "animate",
            Self::None => "none",
        })
    }
}

/// How the configured position combines with the scroll-derived offset.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum PositionMode {
    /// The configured Y is replaced by `scroll_offset - 1` and vibration
    /// replaces X.
    #[default]
    ScrollOverride,
    /// The configured position is a baseline: Y is offset by the scroll
    /// offset and vibration is added to X.
    Baseline,
}

/// Yaw advance of the rotate interaction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpinRate {
    /// Fixed radians per rendered frame.
    PerFrame(f32),
    /// Radians per second of wall-clock time.
    PerSecond(f32),
}

impl Default for SpinRate {
    fn default() -> Self {
        SpinRate::PerFrame(super::SPIN_STEP)
    }
}

impl FromStr for SpinRate {
    type Err = anyhow::Error;

    /// Accepts `per-frame` or a number of radians per second.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "per-frame" {
            return Ok(SpinRate::default());
        }
        let rate: f32 = s
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid spin rate '{}': {}", s, e))?;
        ensure!(rate.is_finite() && rate > 0.0, "spin rate must be positive, got {}", rate);
        Ok(SpinRate::PerSecond(rate))
    }
}

/// Options resolving how the frame policy treats position and spin.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct TransformOptions {
    pub position_mode: PositionMode,
    pub spin_rate: SpinRate,
}

/// Immutable description of one interactive model.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfiguration {
    asset_path: String,
    interaction_mode: InteractionMode,
    follow_cursor: bool,
    scale: f32,
    position: [f32; 3],
}

impl ModelConfiguration {
    pub fn new(
        asset_path: impl Into<String>,
        interaction_mode: InteractionMode,
        follow_cursor: bool,
        scale: f32,
        position: [f32; 3],
    ) -> anyhow::Result<Self> {
        let asset_path = asset_path.into();
        ensure!(!asset_path.is_empty(), "model asset path must not be empty");
        ensure!(
            scale.is_finite() && scale > 0.0,
            "model scale must be a positive number, got {} for {}",
            scale,
            asset_path
        );
        ensure!(
            position.iter().all(|c| c.is_finite()),
            "model position must be finite, got {:?} for {}",
            position,
            asset_path
        );
        Ok(Self {
            asset_path,
            interaction_mode,
            follow_cursor,
            scale,
            position,
        })
    }

    pub fn asset_path(&self) -> &str {
        &self.asset_path
    }

    pub fn interaction_mode(&self) -> InteractionMode {
        self.interaction_mode
    }

    pub fn follow_cursor(&self) -> bool {
        self.follow_cursor
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn position(&self) -> [f32; 3] {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_modes() {
        assert_eq!("vibrate".parse::<InteractionMode>().unwrap(), InteractionMode::Vibrate);
        assert_eq!("rotate".parse::<InteractionMode>().unwrap(), InteractionMode::Rotate);
        assert_eq!("animate".parse::<InteractionMode>().unwrap(), InteractionMode::Animate);
        assert_eq!("none".parse::<InteractionMode>().unwrap(), InteractionMode::None);
        assert!("spin".parse::<InteractionMode>().is_err());
    }

    #[test]
    fn mode_display_matches_parse() {
        for mode in [
            InteractionMode::Vibrate,
            InteractionMode::Rotate,
            InteractionMode::Animate,
            InteractionMode::None,
        ] {
            assert_eq!(mode.to_string().parse::<InteractionMode>().unwrap(), mode);
        }
    }

    #[test]
    fn rejects_non_positive_scale() {
        assert!(ModelConfiguration::new("a.glb", InteractionMode::None, false, 0.0, [0.0; 3]).is_err());
        assert!(ModelConfiguration::new("a.glb", InteractionMode::None, false, -1.0, [0.0; 3]).is_err());
        assert!(ModelConfiguration::new("a.glb", InteractionMode::None, false, f32::NAN, [0.0; 3]).is_err());
    }

    #[test]
    fn rejects_empty_path() {
        assert!(ModelConfiguration::new("", InteractionMode::None, false, 1.0, [0.0; 3]).is_err());
    }

    #[test]
    fn spin_rate_parsing() {
        assert_eq!("per-frame".parse::<SpinRate>().unwrap(), SpinRate::PerFrame(0.1));
        assert_eq!("6".parse::<SpinRate>().unwrap(), SpinRate::PerSecond(6.0));
        assert!("0".parse::<SpinRate>().is_err());
        assert!("fast".parse::<SpinRate>().is_err());
    }
}
