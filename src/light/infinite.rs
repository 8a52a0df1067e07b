use crate::interaction::Interaction;
use crate::light::{LeSample, LiSample, Light, LightFlags, VisibilityTester};
use crate::sampling::{concentric_sample_disk, uniform_sample_sphere, uniform_sphere_pdf};
use crate::spectrum::Spectrum;
use crate::{coordinate_system, Bounds3f, Float, Point2f, Ray, Vec3f};
use std::f32::consts::PI;

/// An infinitely distant dome emitting constant radiance; lights rays that
/// escape the scene.
pub struct InfiniteAreaLight {
    radiance: Spectrum,
    world_center: crate::Point3f,
    world_radius: Float,
}

impl InfiniteAreaLight {
    /// `world_bound` sizes the visibility rays and emission disk; it should
    /// be the scene aggregate's bound.
    pub fn new(radiance: Spectrum, world_bound: Bounds3f) -> Self {
        let (world_center, world_radius) = if world_bound.min.x > world_bound.max.x {
            // Empty scene; any positive radius works.
            (crate::Point3f::new(0.0, 0.0, 0.0), 1.0)
        } else {
            let center = world_bound.centroid();
            (center, crate::distance(center, world_bound.max).max(1e-2))
        };

        Self {
            radiance,
            world_center,
            world_radius,
        }
    }
}

impl Light for InfiniteAreaLight {
    fn flags(&self) -> LightFlags {
        LightFlags::INFINITE
    }

    fn power(&self) -> Spectrum {
        self.radiance * (PI * self.world_radius * self.world_radius)
    }

    fn sample_li(&self, reference: &Interaction, u: Point2f) -> LiSample {
        let wi = uniform_sample_sphere(u);
        // A visibility target beyond every scene surface.
        let p_outside = reference.p + wi * (2.0 * self.world_radius);

        LiSample {
            radiance: self.radiance,
            wi,
            pdf: uniform_sphere_pdf(),
            vis: VisibilityTester::new(*reference, Interaction::from_point(p_outside)),
        }
    }

    fn pdf_li(&self, _reference: &Interaction, _wi: Vec3f) -> Float {
        uniform_sphere_pdf()
    }

    fn le(&self, _ray: &Ray) -> Spectrum {
        self.radiance
    }

    fn sample_le(&self, u1: Point2f, u2: Point2f) -> LeSample {
        // Direction of travel into the scene.
        let d = -uniform_sample_sphere(u1);

        // Launch point on a world-radius disk perpendicular to the direction.
        let (v1, v2) = coordinate_system(-d);
        let cd = concentric_sample_disk(u2);
        let p_disk = self.world_center + self.world_radius * (cd.x * v1 + cd.y * v2);
        let origin = p_disk + self.world_radius * -d;

        LeSample {
            radiance: self.radiance,
            ray: Ray::new(origin, d),
            n_light: d,
            pdf_pos: 1.0 / (PI * self.world_radius * self.world_radius),
            pdf_dir: uniform_sphere_pdf(),
        }
    }

    fn pdf_le(&self, _ray: &Ray, _n_light: Vec3f) -> (Float, Float) {
        (
            1.0 / (PI * self.world_radius * self.world_radius),
            uniform_sphere_pdf(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_le_is_constant() {
        let light = InfiniteAreaLight::new(Spectrum::new(0.3), Bounds3f::empty());
        let ray = Ray::new(point3f!(0, 0, 0), vec3f!(1, 2, 3));
        assert_eq!(light.le(&ray), Spectrum::new(0.3));
    }

    #[test]
    fn test_sample_li_uniform_pdf() {
        let bound = bounds3f!((-1, -1, -1), (1, 1, 1));
        let light = InfiniteAreaLight::new(Spectrum::new(1.0), bound);
        let reference = Interaction::from_point(point3f!(0, 0, 0));
        let s = light.sample_li(&reference, Point2f::new(0.3, 0.7));
        assert_abs_diff_eq!(s.pdf, crate::INV_4_PI, epsilon = 1e-6);
        assert_eq!(s.radiance, Spectrum::new(1.0));
        // The visibility endpoint is outside the scene bound.
        assert!(!bound.inside(s.vis.p1.p));
    }
}
