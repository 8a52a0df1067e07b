use crate::integrator::{uniform_sample_one_light, IntegratorRadiance};
use crate::lightdistrib::{create_light_sample_distribution, LightDistribution};
use crate::material::TransportMode;
use crate::reflection::BxDFType;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::Spectrum;
use crate::{abs_dot, Float, Ray};
use bumpalo::Bump;
use cgmath::InnerSpace;

/// Iterative unidirectional path tracer with next-event estimation and
/// Russian-roulette termination.
pub struct PathIntegrator {
    max_depth: u32,
    rr_threshold: Float,
    light_distribution: Option<Box<dyn LightDistribution>>,
}

impl PathIntegrator {
    pub fn new(max_depth: u32, rr_threshold: Float) -> Self {
        Self {
            max_depth,
            rr_threshold,
            light_distribution: None,
        }
    }
}

impl IntegratorRadiance for PathIntegrator {
    fn preprocess(&mut self, scene: &Scene) {
        self.light_distribution = Some(create_light_sample_distribution("uniform", scene));
    }

    fn li(
        &self,
        r: Ray,
        scene: &Scene,
        sampler: &mut dyn Sampler,
        arena: &Bump,
        _depth: u32,
    ) -> Spectrum {
        let mut l = Spectrum::new(0.0);
        let mut beta = Spectrum::new(1.0);
        let mut ray = r;
        let mut specular_bounce = false;
        let mut bounces: u32 = 0;

        // Radiance scaling introduced by refraction; folded into the
        // Russian-roulette throughput so RR sees the real path weight.
        let mut eta_scale: Float = 1.0;

        loop {
            let isect = scene.intersect(&mut ray);

            // Emitted light is only added where no strategy has sampled it:
            // at the camera vertex and after delta bounces.
            if bounces == 0 || specular_bounce {
                match &isect {
                    Some(isect) => l += beta * isect.le(-ray.dir),
                    None => {
                        for light in &scene.infinite_lights {
                            l += beta * light.le(&ray);
                        }
                    }
                }
            }

            let isect = match isect {
                Some(isect) if bounces < self.max_depth => isect,
                _ => break,
            };

            let bsdf =
                match isect.compute_scattering_functions(arena, TransportMode::Radiance, true) {
                    // Optically inactive boundary; pass through without
                    // consuming a bounce.
                    None => {
                        ray = isect.spawn_ray(ray.dir);
                        continue;
                    }
                    Some(bsdf) => bsdf,
                };

            let distrib = self
                .light_distribution
                .as_ref()
                .map(|d| d.lookup(isect.p));

            // Next-event estimation, skipped for perfectly specular BSDFs.
            if bsdf.num_components(BxDFType::all() & !BxDFType::SPECULAR) > 0 {
                l += beta * uniform_sample_one_light(&isect, &bsdf, scene, sampler, distrib);
            }

            // Sample the BSDF for the next path direction.
            let wo = -ray.dir;
            let sample = match bsdf.sample_f(wo, sampler.get_2d(), BxDFType::all()) {
                Some(s) if !s.f.is_black() && s.pdf != 0.0 => s,
                _ => break,
            };
            beta *= sample.f * abs_dot(sample.wi, isect.n) / sample.pdf;

            specular_bounce = sample.sampled_type.contains(BxDFType::SPECULAR);
            if specular_bounce && sample.sampled_type.contains(BxDFType::TRANSMISSION) {
                let eta = bsdf.eta;
                eta_scale *= if wo.dot(isect.n) > 0.0 {
                    eta * eta
                } else {
                    1.0 / (eta * eta)
                };
            }

            ray = isect.spawn_ray(sample.wi);

            let rr_beta = beta * eta_scale;
            if rr_beta.max_component_value() < self.rr_threshold && bounces > 3 {
                let q = (1.0 - rr_beta.max_component_value()).max(0.05);
                if sampler.get_1d() < q {
                    break;
                }
                beta /= 1.0 - q;
            }

            bounces += 1;
        }

        l
    }
}
