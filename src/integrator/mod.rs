use crate::camera::Camera;
use crate::interaction::SurfaceInteraction;
use crate::light::{is_delta_light, AreaLight, Light};
use crate::reflection::bsdf::Bsdf;
use crate::reflection::BxDFType;
use crate::sampler::Sampler;
use crate::sampling::{power_heuristic, Distribution1D};
use crate::scene::Scene;
use crate::spectrum::Spectrum;
use crate::{abs_dot, Bounds2i, Float, Point2i, Ray};
use bumpalo::Bump;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub mod path;
pub mod whitted;

const TILE_SIZE: i32 = 16;

/// The per-ray radiance estimator a `SamplerRenderer` drives.
pub trait IntegratorRadiance: Send + Sync {
    fn preprocess(&mut self, _scene: &Scene) {}

    fn li(
        &self,
        ray: Ray,
        scene: &Scene,
        sampler: &mut dyn Sampler,
        arena: &Bump,
        depth: u32,
    ) -> Spectrum;
}

/// Tiled, parallel sampling renderer: the image is split into 16x16 tiles,
/// each rendered by one worker with its own arena, its own sampler clone
/// seeded by the tile index, and its own film tile.
pub struct SamplerRenderer {
    pub camera: Box<dyn Camera>,
    pub sampler: Box<dyn Sampler>,
    pub radiance: Box<dyn IntegratorRadiance>,
}

static RADIANCE_ANOMALY_WARNED: AtomicBool = AtomicBool::new(false);

/// Quarantine for numerical anomalies: a NaN, negative, or infinite estimate
/// becomes a zero sample so one bad path cannot poison the image. Logged on
/// first occurrence.
fn quarantine_radiance(l: Spectrum, pixel: Point2i) -> Spectrum {
    let reason = if l.has_nans() {
        "NaN"
    } else if l.y() < -1e-5 {
        "negative-luminance"
    } else if l.y().is_infinite() {
        "infinite-luminance"
    } else {
        return l;
    };

    if !RADIANCE_ANOMALY_WARNED.swap(true, Ordering::Relaxed) {
        tracing::warn!(
            ?pixel,
            reason,
            "radiance estimate discarded; further anomalies will not be logged"
        );
    }
    Spectrum::new(0.0)
}

impl SamplerRenderer {
    pub fn new(
        camera: Box<dyn Camera>,
        sampler: Box<dyn Sampler>,
        radiance: Box<dyn IntegratorRadiance>,
    ) -> Self {
        Self {
            camera,
            sampler,
            radiance,
        }
    }

    pub fn preprocess(&mut self, scene: &Scene) {
        self.radiance.preprocess(scene);
    }

    pub fn render(&self, scene: &Scene) {
        let film = self.camera.film();
        let sample_bounds = film.sample_bounds();
        let sample_extent = sample_bounds.diagonal();
        let n_tiles = Point2i::new(
            (sample_extent.x + TILE_SIZE - 1) / TILE_SIZE,
            (sample_extent.y + TILE_SIZE - 1) / TILE_SIZE,
        );
        let total_tiles = (n_tiles.x * n_tiles.y) as usize;

        tracing::info!(
            tiles = total_tiles,
            spp = self.sampler.samples_per_pixel(),
            "rendering"
        );
        let progress = AtomicUsize::new(0);

        (0..total_tiles).into_par_iter().for_each(|t| {
            let tile = Point2i::new(t as i32 % n_tiles.x, t as i32 / n_tiles.x);
            let mut arena = Bump::new();

            // Determinism across runs hinges on this seed schedule.
            let mut tile_sampler = self.sampler.clone_with_seed(t as u64);

            let x0 = sample_bounds.min.x + tile.x * TILE_SIZE;
            let x1 = (x0 + TILE_SIZE).min(sample_bounds.max.x);
            let y0 = sample_bounds.min.y + tile.y * TILE_SIZE;
            let y1 = (y0 + TILE_SIZE).min(sample_bounds.max.y);
            let tile_bounds =
                Bounds2i::with_bounds(Point2i::new(x0, y0), Point2i::new(x1, y1));

            let mut film_tile = film.get_film_tile(tile_bounds);

            for pixel in tile_bounds.iter_points() {
                tile_sampler.start_pixel(pixel);

                while tile_sampler.start_next_sample() {
                    let camera_sample = tile_sampler.get_camera_sample(pixel);
                    let (ray, ray_weight) = self.camera.casting_ray(&camera_sample);

                    let mut l = Spectrum::new(0.0);
                    if ray_weight > 0.0 {
                        l = self
                            .radiance
                            .li(ray, scene, tile_sampler.as_mut(), &arena, 0);
                    }
                    let l = quarantine_radiance(l, pixel);

                    film_tile.add_sample(camera_sample.p_film, l, ray_weight);

                    // One shading event's allocations bound peak arena size.
                    arena.reset();
                }
            }

            film.merge_film_tile(film_tile);
            let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!(done, total_tiles, "merged tile");
        });

        tracing::info!("rendering finished");
    }
}

/// Estimates direct lighting at `it` from one light chosen by `distrib` (or
/// uniformly when absent).
pub fn uniform_sample_one_light(
    it: &SurfaceInteraction,
    bsdf: &Bsdf,
    scene: &Scene,
    sampler: &mut dyn Sampler,
    distrib: Option<&Distribution1D>,
) -> Spectrum {
    let n_lights = scene.lights.len();
    if n_lights == 0 {
        return Spectrum::new(0.0);
    }

    let (light_index, light_pdf) = match distrib {
        Some(d) => {
            let (index, pdf) = d.sample_discrete(sampler.get_1d());
            if pdf == 0.0 {
                return Spectrum::new(0.0);
            }
            (index, pdf)
        }
        None => {
            let index = ((sampler.get_1d() * n_lights as Float) as usize).min(n_lights - 1);
            (index, 1.0 / n_lights as Float)
        }
    };

    let light = scene.lights[light_index].as_ref();
    let u_light = sampler.get_2d();
    let u_scattering = sampler.get_2d();

    estimate_direct(it, bsdf, u_scattering, light, u_light, scene, false) / light_pdf
}

/// Multiple importance sampling of one light: one sample from the light's
/// distribution and one from the BSDF, combined with the power heuristic.
pub fn estimate_direct(
    it: &SurfaceInteraction,
    bsdf: &Bsdf,
    u_scattering: crate::Point2f,
    light: &dyn Light,
    u_light: crate::Point2f,
    scene: &Scene,
    specular: bool,
) -> Spectrum {
    let bsdf_flags = if specular {
        BxDFType::all()
    } else {
        BxDFType::all() & !BxDFType::SPECULAR
    };

    let mut ld = Spectrum::new(0.0);
    let it_ref = it.as_interaction();

    // Sample the light source.
    let li_sample = light.sample_li(&it_ref, u_light);
    if li_sample.pdf > 0.0 && !li_sample.radiance.is_black() {
        let f = bsdf.f(it.wo, li_sample.wi, bsdf_flags) * abs_dot(li_sample.wi, it.n);
        let scattering_pdf = bsdf.pdf(it.wo, li_sample.wi, bsdf_flags);

        if !f.is_black() {
            let li = if li_sample.vis.unoccluded(scene) {
                li_sample.radiance
            } else {
                Spectrum::new(0.0)
            };

            if !li.is_black() {
                if is_delta_light(light.flags()) {
                    ld += f * li / li_sample.pdf;
                } else {
                    let weight = power_heuristic(1, li_sample.pdf, 1, scattering_pdf);
                    ld += f * li * weight / li_sample.pdf;
                }
            }
        }
    }

    // Sample the BSDF; pointless for delta lights, which the BSDF sample can
    // never hit.
    if !is_delta_light(light.flags()) {
        if let Some(s) = bsdf.sample_f(it.wo, u_scattering, bsdf_flags) {
            let f = s.f * abs_dot(s.wi, it.n);
            let sampled_specular = s.sampled_type.contains(BxDFType::SPECULAR);

            if !f.is_black() && s.pdf > 0.0 {
                let mut weight = 1.0;
                if !sampled_specular {
                    let light_pdf = light.pdf_li(&it_ref, s.wi);
                    if light_pdf == 0.0 {
                        return ld;
                    }
                    weight = power_heuristic(1, s.pdf, 1, light_pdf);
                }

                let mut ray = it.spawn_ray(s.wi);
                let li = match scene.intersect(&mut ray) {
                    Some(light_isect) => match light_isect
                        .primitive
                        .and_then(|prim| prim.area_light())
                    {
                        Some(area) if same_light(area, light) => light_isect.le(-s.wi),
                        _ => Spectrum::new(0.0),
                    },
                    None => light.le(&ray),
                };

                if !li.is_black() {
                    ld += f * li * weight / s.pdf;
                }
            }
        }
    }

    ld
}

/// Identity comparison of two light trait objects by data pointer.
fn same_light(a: &dyn AreaLight, b: &dyn Light) -> bool {
    std::ptr::eq(
        a as *const dyn AreaLight as *const u8,
        b as *const dyn Light as *const u8,
    )
}
