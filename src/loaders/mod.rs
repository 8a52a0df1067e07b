use crate::integrator::SamplerRenderer;
use crate::kdtree::KdTree;
use crate::light::Light;
use crate::primitive::Primitive;
use crate::scene::Scene;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod constructors;

/// Loads a scene file and builds the scene plus its renderer. Paths inside
/// the file (meshes, the output image) resolve relative to the file itself.
pub fn load_scene(path: &Path) -> Result<(Scene, SamplerRenderer)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read scene file {}", path.display()))?;
    let root: Value = serde_json::from_str(&text)
        .with_context(|| format!("malformed scene file {}", path.display()))?;

    let scene_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    build_scene(&root, &scene_dir)
}

pub fn build_scene(root: &Value, scene_dir: &Path) -> Result<(Scene, SamplerRenderer)> {
    let renderer_node = root
        .get("Renderer")
        .context("scene has no Renderer node")?;

    let mut hitables: Vec<Arc<dyn Primitive>> = Vec::new();
    let mut lights: Vec<Arc<dyn Light>> = Vec::new();

    if let Some(entities) = root.get("Entity") {
        let entities = entities.as_array().context("Entity must be an array")?;
        for node in entities {
            constructors::create_entity(node, scene_dir, &mut hitables, &mut lights)?;
        }
    }

    let aggregate = KdTree::new(hitables);

    // Scene-level lights (infinite domes) need the finished world bound.
    if let Some(light_nodes) = root.get("Light") {
        let light_nodes = light_nodes.as_array().context("Light must be an array")?;
        for node in light_nodes {
            lights.push(constructors::create_scene_light(
                node,
                aggregate.bounds(),
            )?);
        }
    }

    let scene = Scene::new(aggregate, lights);
    let renderer = constructors::create_renderer(renderer_node, scene_dir)?;
    Ok((scene, renderer))
}
