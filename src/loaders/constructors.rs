//! String-typed construction of scene components: each category resolves its
//! `type` tag through a match, so an unknown name is a load-time error.

use crate::camera::{Camera, PerspectiveCamera};
use crate::film::Film;
use crate::filter::{BoxFilter, Filter};
use crate::integrator::path::PathIntegrator;
use crate::integrator::whitted::WhittedIntegrator;
use crate::integrator::{IntegratorRadiance, SamplerRenderer};
use crate::light::diffuse::DiffuseAreaLight;
use crate::light::infinite::InfiniteAreaLight;
use crate::light::{AreaLight, Light};
use crate::material::glass::GlassMaterial;
use crate::material::matte::MatteMaterial;
use crate::material::mirror::MirrorMaterial;
use crate::material::Material;
use crate::primitive::{GeometricPrimitive, Primitive};
use crate::sampler::random::RandomSampler;
use crate::sampler::Sampler;
use crate::shape::sphere::Sphere;
use crate::shape::triangle::{Triangle, TriangleMesh};
use crate::shape::Shape;
use crate::spectrum::Spectrum;
use crate::{Bounds2f, Bounds3f, Float, Point2f, Point3f, Transform, Vec2f, Vec3f, INFINITY};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

fn node_type(node: &Value) -> Result<&str> {
    node.get("type")
        .and_then(Value::as_str)
        .context("node is missing its type tag")
}

fn get_float(node: &Value, key: &str, default: Float) -> Result<Float> {
    match node.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_f64()
            .map(|x| x as Float)
            .with_context(|| format!("property {} must be a number", key)),
    }
}

fn require_float(node: &Value, key: &str) -> Result<Float> {
    node.get(key)
        .with_context(|| format!("missing required property {}", key))?
        .as_f64()
        .map(|x| x as Float)
        .with_context(|| format!("property {} must be a number", key))
}

fn get_bool(node: &Value, key: &str, default: bool) -> Result<bool> {
    match node.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_bool()
            .with_context(|| format!("property {} must be a boolean", key)),
    }
}

fn get_integer(node: &Value, key: &str, default: u64) -> Result<u64> {
    match node.get(key) {
        None => Ok(default),
        Some(v) => v
            .as_u64()
            .with_context(|| format!("property {} must be a non-negative integer", key)),
    }
}

fn number_array(node: &Value, key: &str) -> Result<Option<Vec<Float>>> {
    let Some(v) = node.get(key) else {
        return Ok(None);
    };
    let arr = v
        .as_array()
        .with_context(|| format!("property {} must be an array", key))?;
    let mut out = Vec::with_capacity(arr.len());
    for x in arr {
        out.push(
            x.as_f64()
                .with_context(|| format!("property {} must contain numbers", key))?
                as Float,
        );
    }
    Ok(Some(out))
}

fn get_vec2f(node: &Value, key: &str, default: Vec2f) -> Result<Vec2f> {
    match number_array(node, key)? {
        None => Ok(default),
        Some(v) if v.len() == 2 => Ok(Vec2f::new(v[0], v[1])),
        Some(_) => bail!("property {} must have 2 components", key),
    }
}

fn get_vec3f(node: &Value, key: &str, default: Vec3f) -> Result<Vec3f> {
    match number_array(node, key)? {
        None => Ok(default),
        Some(v) if v.len() == 3 => Ok(Vec3f::new(v[0], v[1], v[2])),
        Some(_) => bail!("property {} must have 3 components", key),
    }
}

fn require_vec3f(node: &Value, key: &str) -> Result<Vec3f> {
    node.get(key)
        .with_context(|| format!("missing required property {}", key))?;
    get_vec3f(node, key, Vec3f::new(0.0, 0.0, 0.0))
}

fn get_spectrum(node: &Value, key: &str) -> Result<Spectrum> {
    let v = require_vec3f(node, key)?;
    Ok(Spectrum::from_rgb([v.x, v.y, v.z]))
}

/// Interprets a `Transform` property as an opcode stream:
/// `0 tx ty tz` translate, `1 sx sy sz` scale, `2 ax ay az deg` rotate.
/// Accumulated transforms apply in reverse order.
fn parse_transform(shape_node: &Value) -> Result<Transform> {
    let Some(sequence) = number_array(shape_node, "Transform")? else {
        return Ok(Transform::identity());
    };

    let mut stack = Vec::new();
    let mut it = 0;
    while it < sequence.len() {
        let token = sequence[it] as i32;
        match token {
            0 => {
                if it + 3 >= sequence.len() {
                    bail!("truncated translate in Transform sequence");
                }
                stack.push(Transform::translate(Vec3f::new(
                    sequence[it + 1],
                    sequence[it + 2],
                    sequence[it + 3],
                )));
                it += 4;
            }
            1 => {
                if it + 3 >= sequence.len() {
                    bail!("truncated scale in Transform sequence");
                }
                stack.push(Transform::scale(
                    sequence[it + 1],
                    sequence[it + 2],
                    sequence[it + 3],
                ));
                it += 4;
            }
            2 => {
                if it + 4 >= sequence.len() {
                    bail!("truncated rotate in Transform sequence");
                }
                let axis = Vec3f::new(sequence[it + 1], sequence[it + 2], sequence[it + 3]);
                stack.push(Transform::rotate(sequence[it + 4], axis));
                it += 5;
            }
            t => bail!("undefined transform opcode {}", t),
        }
    }

    let mut object_to_world = Transform::identity();
    for t in stack.iter().rev() {
        object_to_world = object_to_world * *t;
    }
    Ok(object_to_world)
}

pub fn create_renderer(node: &Value, scene_dir: &Path) -> Result<SamplerRenderer> {
    let depth = get_integer(node, "Depth", 2)? as u32;
    let radiance: Box<dyn IntegratorRadiance> = match node_type(node)? {
        "Whitted" => Box::new(WhittedIntegrator::new(depth)),
        "Path" => Box::new(PathIntegrator::new(depth, 1.0)),
        name => bail!("unknown renderer type {:?}", name),
    };

    let sampler_node = node.get("Sampler").context("renderer has no Sampler")?;
    let sampler = create_sampler(sampler_node)?;

    let camera_node = node.get("Camera").context("renderer has no Camera")?;
    let camera = create_camera(camera_node, scene_dir)?;

    Ok(SamplerRenderer::new(camera, sampler, radiance))
}

pub fn create_sampler(node: &Value) -> Result<Box<dyn Sampler>> {
    match node_type(node)? {
        "Random" => {
            let spp = get_integer(node, "SPP", 1)?;
            Ok(Box::new(RandomSampler::new(spp, 0)))
        }
        name => bail!("unknown sampler type {:?}", name),
    }
}

pub fn create_camera(node: &Value, scene_dir: &Path) -> Result<Box<dyn Camera>> {
    match node_type(node)? {
        "Perspective" => {
            let fov = require_float(node, "Fov")?;
            let eye = require_vec3f(node, "Eye")?;
            let focus = require_vec3f(node, "Focus")?;
            let up = get_vec3f(node, "WorldUp", Vec3f::new(0.0, 1.0, 0.0))?;

            let film_node = node.get("Film").context("camera has no Film")?;
            let film = create_film(film_node, scene_dir)?;

            let camera_to_world = Transform::look_at(
                Point3f::new(eye.x, eye.y, eye.z),
                Point3f::new(focus.x, focus.y, focus.z),
                up,
            );
            Ok(Box::new(PerspectiveCamera::new(camera_to_world, fov, film)))
        }
        name => bail!("unknown camera type {:?}", name),
    }
}

pub fn create_film(node: &Value, scene_dir: &Path) -> Result<Film> {
    let res = get_vec2f(node, "Resolution", Vec2f::new(800.0, 600.0))?;
    let filename = node
        .get("Filename")
        .map(|v| v.as_str().context("Filename must be a string"))
        .transpose()?
        .unwrap_or("rendered.png");

    let crop_min = get_vec2f(node, "CropMin", Vec2f::new(0.0, 0.0))?;
    let crop_max = get_vec2f(node, "CropMax", Vec2f::new(1.0, 1.0))?;
    let diagonal = get_float(node, "Diagonal", 35.0)?;
    let scale = get_float(node, "Scale", 1.0)?;
    let max_lum = get_float(node, "MaxLum", INFINITY)?;

    let filter_node = node.get("Filter").context("film has no Filter")?;
    let filter = create_filter(filter_node)?;

    Ok(Film::new(
        crate::Point2i::new(res.x as i32, res.y as i32),
        Bounds2f::with_bounds(
            Point2f::new(crop_min.x, crop_min.y),
            Point2f::new(crop_max.x, crop_max.y),
        ),
        filter,
        scene_dir.join(filename),
        diagonal,
        scale,
        max_lum,
    ))
}

pub fn create_filter(node: &Value) -> Result<Box<dyn Filter>> {
    match node_type(node)? {
        "Box" => {
            let radius = get_vec2f(node, "Radius", Vec2f::new(0.5, 0.5))?;
            Ok(Box::new(BoxFilter::new(radius)))
        }
        name => bail!("unknown filter type {:?}", name),
    }
}

pub fn create_material(node: &Value) -> Result<Arc<dyn Material>> {
    match node_type(node)? {
        "Lambertian" => Ok(Arc::new(MatteMaterial::new(get_spectrum(node, "R")?))),
        "Mirror" => Ok(Arc::new(MirrorMaterial::new(get_spectrum(node, "R")?))),
        "Glass" => {
            let r = get_spectrum(node, "R")?;
            let t = get_spectrum(node, "T")?;
            let eta = get_float(node, "Eta", 1.5)?;
            Ok(Arc::new(GlassMaterial::new(r, t, eta)))
        }
        name => bail!("unknown material type {:?}", name),
    }
}

fn create_area_light(node: &Value, shape: Arc<dyn Shape>) -> Result<Arc<DiffuseAreaLight>> {
    match node_type(node)? {
        "AreaDiffuse" => {
            let radiance = get_spectrum(node, "Radiance")?;
            let two_sided = get_bool(node, "TwoSided", false)?;
            let n_samples = get_integer(node, "LightSamples", 1)? as usize;
            Ok(Arc::new(DiffuseAreaLight::new(
                radiance, shape, two_sided, n_samples,
            )))
        }
        name => bail!("unknown light type {:?}", name),
    }
}

pub fn create_scene_light(node: &Value, world_bound: Bounds3f) -> Result<Arc<dyn Light>> {
    match node_type(node)? {
        "Infinite" => {
            let radiance = get_spectrum(node, "Radiance")?;
            Ok(Arc::new(InfiniteAreaLight::new(radiance, world_bound)))
        }
        name => bail!("unknown scene light type {:?}", name),
    }
}

/// Builds an entity's hitables (and any area lights) into the output lists.
pub fn create_entity(
    node: &Value,
    scene_dir: &Path,
    hitables: &mut Vec<Arc<dyn Primitive>>,
    lights: &mut Vec<Arc<dyn Light>>,
) -> Result<()> {
    match node_type(node)? {
        "Entity" => {
            let shape_node = node.get("Shape").context("entity has no Shape")?;
            let object_to_world = parse_transform(shape_node)?;
            let shape = create_shape(shape_node, object_to_world)?;

            let material_node = node.get("Material").context("entity has no Material")?;
            let material = create_material(material_node)?;

            let area_light = node
                .get("Light")
                .map(|light_node| create_area_light(light_node, shape.clone()))
                .transpose()?;

            if let Some(light) = &area_light {
                lights.push(light.clone() as Arc<dyn Light>);
            }
            hitables.push(Arc::new(GeometricPrimitive::new(
                shape,
                Some(material),
                area_light.map(|l| l as Arc<dyn AreaLight>),
            )));
            Ok(())
        }
        "MeshEntity" => {
            let filename = node
                .get("Filename")
                .and_then(Value::as_str)
                .context("mesh entity has no Filename")?;

            let shape_node = node.get("Shape").context("entity has no Shape")?;
            let object_to_world = parse_transform(shape_node)?;

            let material_node = node.get("Material").context("entity has no Material")?;
            let material = create_material(material_node)?;

            let mesh = TriangleMesh::from_obj_file(&scene_dir.join(filename), &object_to_world)?;
            for tri_id in 0..mesh.n_triangles {
                let triangle: Arc<dyn Shape> = Arc::new(Triangle::new(mesh.clone(), tri_id));

                let area_light = node
                    .get("Light")
                    .map(|light_node| create_area_light(light_node, triangle.clone()))
                    .transpose()?;
                if let Some(light) = &area_light {
                    lights.push(light.clone() as Arc<dyn Light>);
                }

                hitables.push(Arc::new(GeometricPrimitive::new(
                    triangle,
                    Some(material.clone()),
                    area_light.map(|l| l as Arc<dyn AreaLight>),
                )));
            }
            Ok(())
        }
        name => bail!("unknown entity type {:?}", name),
    }
}

fn create_shape(node: &Value, object_to_world: Transform) -> Result<Arc<dyn Shape>> {
    match node_type(node)? {
        "Sphere" => {
            let radius = get_float(node, "Radius", 1.0)?;
            Ok(Arc::new(Sphere::new(object_to_world, radius)))
        }
        name => bail!("unknown shape type {:?}", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_transform_reverse_order() {
        // Reverse accumulation: the last opcode applies to the point first.
        let node = json!({ "Transform": [0, 1.0, 0.0, 0.0, 1, 2.0, 2.0, 2.0] });
        let t = parse_transform(&node).unwrap();
        // The point is scaled after being translated.
        let p = t.transform_point(Point3f::new(1.0, 0.0, 0.0));
        assert!((p.x - 4.0).abs() < 1e-5, "p = {:?}", p);
    }

    #[test]
    fn test_parse_transform_rotate() {
        let node = json!({ "Transform": [2, 0.0, 1.0, 0.0, 90.0] });
        let t = parse_transform(&node).unwrap();
        let p = t.transform_point(Point3f::new(1.0, 0.0, 0.0));
        assert!(p.x.abs() < 1e-5 && (p.z.abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_parse_transform_unknown_opcode() {
        let node = json!({ "Transform": [7, 1.0, 2.0, 3.0] });
        assert!(parse_transform(&node).is_err());
    }

    #[test]
    fn test_missing_transform_is_identity() {
        let node = json!({ "Radius": 1.0 });
        let t = parse_transform(&node).unwrap();
        let p = t.transform_point(Point3f::new(1.0, 2.0, 3.0));
        assert_eq!(p, Point3f::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_unknown_type_tags_fail() {
        assert!(create_sampler(&json!({"type": "Halton"})).is_err());
        assert!(create_filter(&json!({"type": "Gaussian"})).is_err());
        assert!(create_material(&json!({"type": "Velvet", "R": [1, 1, 1]})).is_err());
        assert!(create_shape(&json!({"type": "Torus"}), Transform::identity()).is_err());
    }

    #[test]
    fn test_sampler_defaults() {
        let sampler = create_sampler(&json!({"type": "Random"})).unwrap();
        assert_eq!(sampler.samples_per_pixel(), 1);

        let sampler = create_sampler(&json!({"type": "Random", "SPP": 16})).unwrap();
        assert_eq!(sampler.samples_per_pixel(), 16);
    }

    #[test]
    fn test_film_defaults() {
        let film = create_film(
            &json!({"Filter": {"type": "Box"}}),
            Path::new("/tmp/scenes"),
        )
        .unwrap();
        assert_eq!(film.full_resolution, crate::Point2i::new(800, 600));
        assert_eq!(film.filename, Path::new("/tmp/scenes/rendered.png"));
    }

    #[test]
    fn test_film_requires_filter() {
        assert!(create_film(&json!({}), Path::new(".")).is_err());
    }
}
