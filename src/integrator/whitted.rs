use crate::integrator::IntegratorRadiance;
use crate::interaction::SurfaceInteraction;
use crate::material::TransportMode;
use crate::reflection::bsdf::Bsdf;
use crate::reflection::BxDFType;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::spectrum::Spectrum;
use crate::{abs_dot, Ray};
use bumpalo::Bump;

/// Whitted-style recursive estimator: direct lighting from every light plus
/// perfect specular reflection and transmission, up to `max_depth` bounces.
pub struct WhittedIntegrator {
    pub max_depth: u32,
}

impl WhittedIntegrator {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }

    fn specular_reflect(
        &self,
        isect: &SurfaceInteraction,
        bsdf: &Bsdf,
        scene: &Scene,
        sampler: &mut dyn Sampler,
        arena: &Bump,
        depth: u32,
    ) -> Spectrum {
        self.trace_specular(
            BxDFType::REFLECTION | BxDFType::SPECULAR,
            isect,
            bsdf,
            scene,
            sampler,
            arena,
            depth,
        )
    }

    fn specular_transmit(
        &self,
        isect: &SurfaceInteraction,
        bsdf: &Bsdf,
        scene: &Scene,
        sampler: &mut dyn Sampler,
        arena: &Bump,
        depth: u32,
    ) -> Spectrum {
        self.trace_specular(
            BxDFType::TRANSMISSION | BxDFType::SPECULAR,
            isect,
            bsdf,
            scene,
            sampler,
            arena,
            depth,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn trace_specular(
        &self,
        lobe_type: BxDFType,
        isect: &SurfaceInteraction,
        bsdf: &Bsdf,
        scene: &Scene,
        sampler: &mut dyn Sampler,
        arena: &Bump,
        depth: u32,
    ) -> Spectrum {
        let wo = isect.wo;
        let sample = match bsdf.sample_f(wo, sampler.get_2d(), lobe_type) {
            Some(s) => s,
            None => return Spectrum::new(0.0),
        };

        let cos = abs_dot(sample.wi, isect.n);
        if sample.pdf > 0.0 && !sample.f.is_black() && cos != 0.0 {
            let rd = isect.spawn_ray(sample.wi);
            sample.f * self.li(rd, scene, sampler, arena, depth + 1) * cos / sample.pdf
        } else {
            Spectrum::new(0.0)
        }
    }
}

impl IntegratorRadiance for WhittedIntegrator {
    fn li(
        &self,
        mut ray: Ray,
        scene: &Scene,
        sampler: &mut dyn Sampler,
        arena: &Bump,
        depth: u32,
    ) -> Spectrum {
        let mut l = Spectrum::new(0.0);

        let isect = match scene.intersect(&mut ray) {
            // Escaped: nothing but the lights' own background emission.
            None => {
                for light in &scene.lights {
                    l += light.le(&ray);
                }
                return l;
            }
            Some(isect) => isect,
        };

        let n = isect.n;
        let wo = isect.wo;

        let bsdf = match isect.compute_scattering_functions(arena, TransportMode::Radiance, false)
        {
            // Optically inactive boundary: continue the ray unchanged.
            None => return self.li(isect.spawn_ray(ray.dir), scene, sampler, arena, depth),
            Some(bsdf) => bsdf,
        };

        // Emission if the ray hit a light source directly.
        l += isect.le(wo);

        // One shadow ray per light.
        for light in &scene.lights {
            let s = light.sample_li(&isect.as_interaction(), sampler.get_2d());
            if s.radiance.is_black() || s.pdf == 0.0 {
                continue;
            }

            let f = bsdf.f(wo, s.wi, BxDFType::all());
            if !f.is_black() && s.vis.unoccluded(scene) {
                l += f * s.radiance * abs_dot(s.wi, n) / s.pdf;
            }
        }

        if depth + 1 < self.max_depth {
            l += self.specular_reflect(&isect, &bsdf, scene, sampler, arena, depth);
            l += self.specular_transmit(&isect, &bsdf, scene, sampler, arena, depth);
        }

        l
    }
}
