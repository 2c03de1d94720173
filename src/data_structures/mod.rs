//! Engine data structures: models, textures, scene graphs, and instances.
//!
//! - `animation` holds keyframe clips and looping playback
//! - `instance` holds per-node transformation data and its GPU layout
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `panel` is a flat textured rectangle for page chrome
//! - `scene_graph` enables hierarchical scene organization
//! - `skin` holds joint palettes for skeletal animation
//! - `texture` contains GPU texture wrapper and creation utilities

pub mod animation;
pub mod instance;
pub mod model;
pub mod panel;
pub mod scene_graph;
pub mod skin;
pub mod texture;
