use crate::interaction::Interaction;
use crate::light::{AreaLight, LeSample, LiSample, Light, LightFlags, VisibilityTester};
use crate::sampling::{cosine_hemisphere_pdf, cosine_sample_hemisphere};
use crate::shape::Shape;
use crate::spectrum::Spectrum;
use crate::{abs_dot, coordinate_system, Float, Point2f, Ray, Vec3f, ONE_MINUS_EPSILON};
use cgmath::InnerSpace;
use std::f32::consts::PI;
use std::sync::Arc;

/// Uniform diffuse emission over the surface of a shape.
pub struct DiffuseAreaLight {
    emit: Spectrum,
    shape: Arc<dyn Shape>,
    two_sided: bool,
    area: Float,
    n_samples: usize,
}

impl DiffuseAreaLight {
    pub fn new(emit: Spectrum, shape: Arc<dyn Shape>, two_sided: bool, n_samples: usize) -> Self {
        let area = shape.area();
        Self {
            emit,
            shape,
            two_sided,
            area,
            n_samples: n_samples.max(1),
        }
    }
}

impl Light for DiffuseAreaLight {
    fn flags(&self) -> LightFlags {
        LightFlags::AREA
    }

    fn n_samples(&self) -> usize {
        self.n_samples
    }

    fn power(&self) -> Spectrum {
        let sides = if self.two_sided { 2.0 } else { 1.0 };
        self.emit * (sides * self.area * PI)
    }

    fn sample_li(&self, reference: &Interaction, u: Point2f) -> LiSample {
        let (p_shape, mut pdf) = self.shape.sample_from_ref(reference, u);

        let to_light = p_shape.p - reference.p;
        if pdf == 0.0 || to_light.magnitude2() == 0.0 {
            pdf = 0.0;
            return LiSample {
                radiance: Spectrum::new(0.0),
                wi: Vec3f::new(0.0, 0.0, 1.0),
                pdf,
                vis: VisibilityTester::new(*reference, p_shape),
            };
        }

        let wi = to_light.normalize();
        LiSample {
            radiance: self.l(&p_shape, -wi),
            wi,
            pdf,
            vis: VisibilityTester::new(*reference, p_shape),
        }
    }

    fn pdf_li(&self, reference: &Interaction, wi: Vec3f) -> Float {
        self.shape.pdf_from_ref(reference, wi)
    }

    fn sample_le(&self, u1: Point2f, u2: Point2f) -> LeSample {
        let (p_shape, pdf_pos) = self.shape.sample(u1);
        let n = p_shape.n;

        // Cosine-weighted outgoing direction; two-sided lights pick a side
        // with the first sample dimension and remap it.
        let (mut w, pdf_dir) = if self.two_sided {
            let mut u = u2;
            if u[0] < 0.5 {
                u.x = (u[0] * 2.0).min(ONE_MINUS_EPSILON);
                let w = cosine_sample_hemisphere(u);
                (w, 0.5 * cosine_hemisphere_pdf(w.z.abs()))
            } else {
                u.x = ((u[0] - 0.5) * 2.0).min(ONE_MINUS_EPSILON);
                let mut w = cosine_sample_hemisphere(u);
                w.z = -w.z;
                (w, 0.5 * cosine_hemisphere_pdf(w.z.abs()))
            }
        } else {
            let w = cosine_sample_hemisphere(u2);
            (w, cosine_hemisphere_pdf(w.z))
        };

        let (v1, v2) = coordinate_system(n);
        w = w.x * v1 + w.y * v2 + w.z * n;

        LeSample {
            radiance: self.l(&p_shape, w),
            ray: p_shape.spawn_ray(w),
            n_light: n,
            pdf_pos,
            pdf_dir,
        }
    }

    fn pdf_le(&self, ray: &Ray, n_light: Vec3f) -> (Float, Float) {
        let it = Interaction::new(ray.origin, n_light, n_light);
        let pdf_pos = self.shape.pdf(&it);
        let pdf_dir = if self.two_sided {
            0.5 * cosine_hemisphere_pdf(abs_dot(n_light, ray.dir))
        } else {
            cosine_hemisphere_pdf(n_light.dot(ray.dir))
        };
        (pdf_pos, pdf_dir)
    }
}

impl AreaLight for DiffuseAreaLight {
    fn l(&self, intr: &Interaction, w: Vec3f) -> Spectrum {
        if self.two_sided || intr.n.dot(w) > 0.0 {
            self.emit
        } else {
            Spectrum::new(0.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::sphere::Sphere;
    use crate::Transform;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn light_on_unit_sphere(two_sided: bool) -> DiffuseAreaLight {
        let shape = Arc::new(Sphere::new(Transform::translate(vec3f!(0, 5, 0)), 1.0));
        DiffuseAreaLight::new(Spectrum::new(2.0), shape, two_sided, 1)
    }

    #[test]
    fn test_emission_is_one_sided_by_default() {
        let light = light_on_unit_sphere(false);
        let intr = Interaction::new(point3f!(0, 4, 0), vec3f!(0, -1, 0), vec3f!(0, -1, 0));
        assert_eq!(light.l(&intr, vec3f!(0, -1, 0)), Spectrum::new(2.0));
        assert!(light.l(&intr, vec3f!(0, 1, 0)).is_black());

        let two_sided = light_on_unit_sphere(true);
        assert_eq!(two_sided.l(&intr, vec3f!(0, 1, 0)), Spectrum::new(2.0));
    }

    #[test]
    fn test_power_scales_with_sides() {
        let one = light_on_unit_sphere(false);
        let two = light_on_unit_sphere(true);
        assert_abs_diff_eq!(two.power()[0], 2.0 * one.power()[0]);
        assert_abs_diff_eq!(one.power()[0], 2.0 * one.area * PI, epsilon = 1e-3);
    }

    #[test]
    fn test_sample_li_pdf_consistency() {
        let light = light_on_unit_sphere(false);
        let reference = Interaction::new(point3f!(0, 0, 0), vec3f!(0, 1, 0), vec3f!(0, 1, 0));
        let mut rng = Pcg32::seed_from_u64(15);

        for _ in 0..500 {
            let s = light.sample_li(&reference, Point2f::new(rng.gen(), rng.gen()));
            assert!(s.pdf > 0.0);
            assert!(!s.radiance.is_black());
            // The sampled direction points up toward the sphere at y = 5.
            assert!(s.wi.y > 0.0);
            assert_abs_diff_eq!(
                light.pdf_li(&reference, s.wi),
                s.pdf,
                epsilon = s.pdf * 1e-3
            );
        }
    }

    #[test]
    fn test_sample_le_leaves_surface() {
        let light = light_on_unit_sphere(false);
        let mut rng = Pcg32::seed_from_u64(16);
        for _ in 0..200 {
            let s = light.sample_le(
                Point2f::new(rng.gen(), rng.gen()),
                Point2f::new(rng.gen(), rng.gen()),
            );
            assert!(s.pdf_pos > 0.0);
            assert!(s.pdf_dir > 0.0);
            // Emitted rays leave on the outside of a one-sided light.
            assert!(s.ray.dir.dot(s.n_light) >= 0.0);
        }
    }
}
