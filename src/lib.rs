//! labs-showcase
//!
//! A scroll-navigated showcase page rendered with wgpu, natively and in the
//! browser. A fixed navbar, a hero banner and three sections stack
//! vertically; each section mounts one glTF model in its own viewport and
//! animates it from the page scroll, the cursor and clicks on the model.
//!
//! High-level modules
//! - `camera`: per-section orbit camera, projection and viewport crop
//! - `context`: GPU, window and page state shared by every flow
//! - `data_structures`: meshes, instances, textures, panels, clips and the scene graph
//! - `flow`: the event loop and the `GraphicsFlow` trait the page parts implement
//! - `interaction`: the transform and click policies of an interactive model
//! - `page`: page layout and scroll, plus the navbar, hero and section flows
//! - `pick`: GPU object picking
//! - `pipelines`: model, panel and pick render pipelines
//! - `render`: render composition for pipeline batching
//! - `resources`: asset loading and glTF decoding
//! - `text`: text labels, drawn with glyphon under the `ui` feature

pub mod camera;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod interaction;
pub mod page;
pub mod pick;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod text;

pub use winit::event::WindowEvent;

/// Browser entry point: runs the page with the default options.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() -> Result<(), wasm_bindgen::JsValue> {
    page::root::run(
        interaction::TransformOptions::default(),
        flow::WindowSettings::default(),
    )
    .map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{:#}", e)))
}
