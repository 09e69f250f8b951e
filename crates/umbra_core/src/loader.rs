//! Scene file loading.
//!
//! Scenes are JSON documents (see [`SceneDesc`]). Loading parses and then
//! validates, so a returned description always has consistent references.

use std::path::Path;

use crate::scene::SceneDesc;
use crate::CoreResult;

/// Load and validate a scene description from a JSON file.
///
/// # Example
///
/// ```ignore
/// use umbra_core::load_scene;
///
/// let desc = load_scene("demos/cornell.json")?;
/// println!("{} surfaces, {} lights", desc.surfaces.len(), desc.lights.len());
/// ```
pub fn load_scene<P: AsRef<Path>>(path: P) -> CoreResult<SceneDesc> {
    let path = path.as_ref();
    log::info!("Loading scene: {}", path.display());

    let text = std::fs::read_to_string(path)?;
    load_scene_from_str(&text)
}

/// Parse and validate a scene description from a JSON string.
pub fn load_scene_from_str(json: &str) -> CoreResult<SceneDesc> {
    let desc: SceneDesc = serde_json::from_str(json)?;
    desc.validate()?;

    log::info!(
        "Scene: {} materials, {} surfaces, {} lights, {}x{} @ {} spp",
        desc.materials.len(),
        desc.surfaces.len(),
        desc.lights.len(),
        desc.render.width,
        desc.render.height,
        desc.render.samples_per_pixel
    );

    Ok(desc)
}
