use crate::interaction::SurfaceInteraction;
use crate::reflection::{BxDF, BxDFType, ScatterSample};
use crate::spectrum::Spectrum;
use crate::{Float, Point2f, Vec3f, ONE_MINUS_EPSILON};
use arrayvec::ArrayVec;
use cgmath::InnerSpace;

const MAX_BXDFS: usize = 8;

/// The full scattering distribution at a surface point: a shading frame plus
/// up to eight lobes, all living in the per-tile arena.
pub struct Bsdf<'a> {
    /// Relative index of refraction over the boundary.
    pub eta: Float,

    /// Shading normal.
    ns: Vec3f,

    /// Primary tangent, from the surface parameterization.
    ss: Vec3f,

    /// Secondary tangent, completing the orthonormal frame.
    ts: Vec3f,

    bxdfs: ArrayVec<&'a dyn BxDF, MAX_BXDFS>,
}

impl<'a> Bsdf<'a> {
    pub fn new(si: &SurfaceInteraction, eta: Float) -> Self {
        let ns = si.n;
        let ss = si.dpdu.normalize();
        Self {
            eta,
            ns,
            ss,
            ts: ns.cross(ss),
            bxdfs: ArrayVec::new(),
        }
    }

    pub fn add(&mut self, bxdf: &'a dyn BxDF) {
        self.bxdfs.push(bxdf);
    }

    pub fn num_components(&self, flags: BxDFType) -> usize {
        self.bxdfs
            .iter()
            .filter(|bxdf| bxdf.matches_flags(flags))
            .count()
    }

    pub fn world_to_local(&self, v: Vec3f) -> Vec3f {
        Vec3f::new(v.dot(self.ss), v.dot(self.ts), v.dot(self.ns))
    }

    pub fn local_to_world(&self, v: Vec3f) -> Vec3f {
        Vec3f::new(
            self.ss.x * v.x + self.ts.x * v.y + self.ns.x * v.z,
            self.ss.y * v.x + self.ts.y * v.y + self.ns.y * v.z,
            self.ss.z * v.x + self.ts.z * v.y + self.ns.z * v.z,
        )
    }

    pub fn f(&self, wo_world: Vec3f, wi_world: Vec3f, flags: BxDFType) -> Spectrum {
        let wo = self.world_to_local(wo_world);
        let wi = self.world_to_local(wi_world);
        if wo.z == 0.0 {
            return Spectrum::new(0.0);
        }

        let reflect = wi_world.dot(self.ns) * wo_world.dot(self.ns) > 0.0;

        self.bxdfs
            .iter()
            .filter(|bxdf| bxdf.matches_flags(flags))
            .filter(|bxdf| {
                (reflect && bxdf.get_type().contains(BxDFType::REFLECTION))
                    || (!reflect && bxdf.get_type().contains(BxDFType::TRANSMISSION))
            })
            .map(|bxdf| bxdf.f(wo, wi))
            .sum()
    }

    /// Samples a lobe uniformly among those matching `flags`, then folds the
    /// remaining matching lobes into the returned pdf and value.
    pub fn sample_f(
        &self,
        wo_world: Vec3f,
        u: Point2f,
        flags: BxDFType,
    ) -> Option<ScatterSample> {
        let matching_comps = self.num_components(flags);
        if matching_comps == 0 {
            return None;
        }
        let comp = ((u[0] * matching_comps as Float).floor() as usize).min(matching_comps - 1);

        let bxdf: &dyn BxDF = *self
            .bxdfs
            .iter()
            .filter(|b| b.matches_flags(flags))
            .nth(comp)
            .unwrap();

        // Remap u[0] to [0, 1) now that it has chosen the lobe.
        let u_remapped = Point2f::new(
            (u[0] * matching_comps as Float - comp as Float).min(ONE_MINUS_EPSILON),
            u[1],
        );

        let wo = self.world_to_local(wo_world);
        if wo.z == 0.0 {
            return None;
        }

        let sample = bxdf.sample_f(wo, u_remapped)?;
        if sample.pdf == 0.0 {
            return None;
        }
        let wi = sample.wi;
        let wi_world = self.local_to_world(wi);
        let sampled_type = sample.sampled_type;
        let mut pdf = sample.pdf;
        let mut f = sample.f;

        let is_specular = bxdf.get_type().contains(BxDFType::SPECULAR);

        // Fold the other matching lobes into the pdf.
        if !is_specular && matching_comps > 1 {
            for (i, other) in self
                .bxdfs
                .iter()
                .filter(|b| b.matches_flags(flags))
                .enumerate()
            {
                if i != comp {
                    pdf += other.pdf(wo, wi);
                }
            }
        }
        if matching_comps > 1 {
            pdf /= matching_comps as Float;
        }

        // Re-evaluate the full BSDF over the matching, side-consistent lobes.
        if !is_specular {
            let reflect = wi_world.dot(self.ns) * wo_world.dot(self.ns) > 0.0;
            f = self
                .bxdfs
                .iter()
                .filter(|b| b.matches_flags(flags))
                .filter(|b| {
                    (reflect && b.get_type().contains(BxDFType::REFLECTION))
                        || (!reflect && b.get_type().contains(BxDFType::TRANSMISSION))
                })
                .map(|b| b.f(wo, wi))
                .sum();
        }

        Some(ScatterSample {
            f,
            wi: wi_world,
            pdf,
            sampled_type,
        })
    }

    /// Average pdf over the matching lobes.
    pub fn pdf(&self, wo_world: Vec3f, wi_world: Vec3f, flags: BxDFType) -> Float {
        if self.bxdfs.is_empty() {
            return 0.0;
        }

        let wo = self.world_to_local(wo_world);
        let wi = self.world_to_local(wi_world);
        if wo.z == 0.0 {
            return 0.0;
        }

        let mut pdf = 0.0;
        let mut matching_comps = 0;
        for bxdf in &self.bxdfs {
            if bxdf.matches_flags(flags) {
                matching_comps += 1;
                pdf += bxdf.pdf(wo, wi);
            }
        }

        if matching_comps > 0 {
            pdf / matching_comps as Float
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fresnel::FresnelNoOp;
    use crate::reflection::{LambertianReflection, SpecularReflection};
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn test_interaction() -> SurfaceInteraction<'static> {
        SurfaceInteraction::new(
            point3f!(0, 0, 0),
            point2f!(0, 0),
            vec3f!(0, 0, 1),
            vec3f!(1, 0, 0),
            vec3f!(0, 1, 0),
        )
    }

    #[test]
    fn test_frame_round_trip() {
        let si = test_interaction();
        let bsdf = Bsdf::new(&si, 1.0);
        let v = vec3f!(0.3, -0.4, 0.5).normalize();
        let local = bsdf.world_to_local(v);
        assert_abs_diff_eq!(bsdf.local_to_world(local), v, epsilon = 1e-6);
    }

    #[test]
    fn test_bsdf_round_trip_matches_lobe() {
        // sample_f, f, and pdf agree for a single diffuse lobe.
        let si = test_interaction();
        let lambertian = LambertianReflection {
            r: Spectrum::new(0.5),
        };
        let mut bsdf = Bsdf::new(&si, 1.0);
        bsdf.add(&lambertian);

        let wo = vec3f!(0.2, 0.1, 0.95).normalize();
        let mut rng = Pcg32::seed_from_u64(31);
        for _ in 0..1000 {
            let s = bsdf
                .sample_f(wo, Point2f::new(rng.gen(), rng.gen()), BxDFType::all())
                .unwrap();
            assert_abs_diff_eq!(bsdf.pdf(wo, s.wi, BxDFType::all()), s.pdf, epsilon = 1e-6);
            let f = bsdf.f(wo, s.wi, BxDFType::all());
            for i in 0..3 {
                assert_abs_diff_eq!(f[i], s.f[i], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_two_lobe_pdf_averaging() {
        let si = test_interaction();
        let l0 = LambertianReflection {
            r: Spectrum::new(0.4),
        };
        let l1 = LambertianReflection {
            r: Spectrum::new(0.2),
        };
        let mut bsdf = Bsdf::new(&si, 1.0);
        bsdf.add(&l0);
        bsdf.add(&l1);

        assert_eq!(bsdf.num_components(BxDFType::all()), 2);

        let wo = vec3f!(0, 0, 1);
        let wi = vec3f!(0.3, 0.3, 0.9).normalize();
        // Two identical-shape lobes: the average equals each one's pdf.
        let single = l0.pdf(wo, wi);
        assert_abs_diff_eq!(bsdf.pdf(wo, wi, BxDFType::all()), single, epsilon = 1e-6);

        // f sums both lobes.
        let f = bsdf.f(wo, wi, BxDFType::all());
        assert_abs_diff_eq!(f[0], 0.6 * std::f32::consts::FRAC_1_PI, epsilon = 1e-6);
    }

    #[test]
    fn test_flag_filtering() {
        let si = test_interaction();
        let diffuse = LambertianReflection {
            r: Spectrum::new(0.5),
        };
        let mirror = SpecularReflection::new(Spectrum::new(1.0), FresnelNoOp);
        let mut bsdf = Bsdf::new(&si, 1.0);
        bsdf.add(&diffuse);
        bsdf.add(&mirror);

        assert_eq!(bsdf.num_components(BxDFType::all()), 2);
        assert_eq!(
            bsdf.num_components(BxDFType::all() & !BxDFType::SPECULAR),
            1
        );

        // Sampling only specular lobes always picks the mirror direction.
        let wo = vec3f!(0.5, 0.0, 0.866).normalize();
        let s = bsdf
            .sample_f(
                wo,
                Point2f::new(0.7, 0.3),
                BxDFType::SPECULAR | BxDFType::REFLECTION,
            )
            .unwrap();
        assert!(s.sampled_type.contains(BxDFType::SPECULAR));
        assert_abs_diff_eq!(
            bsdf.world_to_local(s.wi).z,
            bsdf.world_to_local(wo).z,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_transmission_side_selection() {
        // A wi below the surface only sees transmission lobes in f().
        let si = test_interaction();
        let diffuse = LambertianReflection {
            r: Spectrum::new(0.5),
        };
        let mut bsdf = Bsdf::new(&si, 1.0);
        bsdf.add(&diffuse);

        let wo = vec3f!(0, 0, 1);
        let below = vec3f!(0.1, 0.1, -0.99).normalize();
        assert!(bsdf.f(wo, below, BxDFType::all()).is_black());
    }

    #[test]
    fn test_no_matching_lobes() {
        let si = test_interaction();
        let bsdf = Bsdf::new(&si, 1.0);
        assert!(bsdf
            .sample_f(vec3f!(0, 0, 1), Point2f::new(0.5, 0.5), BxDFType::all())
            .is_none());
        assert_eq!(bsdf.pdf(vec3f!(0, 0, 1), vec3f!(0, 0, 1), BxDFType::all()), 0.0);
    }
}
