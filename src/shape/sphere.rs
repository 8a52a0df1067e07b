use crate::interaction::{Interaction, SurfaceInteraction};
use crate::shape::{pdf_from_ref_by_intersection, Shape};
use crate::{
    coordinate_system, distance, distance_squared, face_forward, spherical_direction_in_frame,
    Bounds3f, Float, Point2f, Point3f, Ray, Transform, Vec3f,
};
use crate::sampling::{uniform_cone_pdf, uniform_sample_sphere};
use cgmath::{EuclideanSpace, InnerSpace, Zero};
use std::f32::consts::{FRAC_PI_2, PI};

/// sin^2 of 1.5 degrees; below this subtended angle the cone sampling falls
/// back to a Taylor expansion to avoid catastrophic cancellation.
const MIN_SIN2_THETA_MAX: Float = 0.00068523;

/// A sphere of the given radius centered at the object-space origin.
pub struct Sphere {
    object_to_world: Transform,
    world_to_object: Transform,
    radius: Float,
}

impl Sphere {
    pub fn new(object_to_world: Transform, radius: Float) -> Self {
        Self {
            world_to_object: object_to_world.inverse(),
            object_to_world,
            radius,
        }
    }

    /// Solves the quadratic in object space, returning the nearest root in
    /// `(0, t_max]`.
    fn hit_quadratic(&self, world_ray: &Ray) -> Option<(Float, Ray)> {
        let ray = self.world_to_object.transform_ray(world_ray);

        let o = ray.origin.to_vec();
        let a = ray.dir.dot(ray.dir);
        let b = o.dot(ray.dir);
        let c = o.dot(o) - self.radius * self.radius;

        let discriminant = b * b - a * c;
        if discriminant <= 0.0 {
            return None;
        }

        let discr_sqrt = discriminant.sqrt();
        let mut t0 = (-b - discr_sqrt) / a;
        let mut t1 = (-b + discr_sqrt) / a;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }

        if t0 > ray.t_max || t1 <= 0.0 {
            return None;
        }

        let mut t_shape_hit = t0;
        if t_shape_hit <= 0.0 {
            t_shape_hit = t1;
            if t_shape_hit > ray.t_max {
                return None;
            }
        }

        Some((t_shape_hit, ray))
    }
}

impl Shape for Sphere {
    fn object_bound(&self) -> Bounds3f {
        let r = self.radius;
        bounds3f!((-r, -r, -r), (r, r, r))
    }

    fn world_bound(&self) -> Bounds3f {
        self.object_to_world.transform_bounds(self.object_bound())
    }

    fn intersect<'a>(&self, world_ray: &Ray) -> Option<(Float, SurfaceInteraction<'a>)> {
        let (t_shape_hit, ray) = self.hit_quadratic(world_ray)?;

        // Refine the hit point onto the sphere surface.
        let mut p_hit = ray.at(t_shape_hit);
        p_hit = p_hit * (self.radius / distance(p_hit, Point3f::origin()));
        if p_hit.x == 0.0 && p_hit.y == 0.0 {
            p_hit.x = 1e-5 * self.radius;
        }

        let mut phi = p_hit.y.atan2(p_hit.x);
        if phi < 0.0 {
            phi += 2.0 * PI;
        }
        let theta = Float::acos((p_hit.z / self.radius).clamp(-1.0, 1.0));

        let u = phi / (2.0 * PI);
        let v = (theta + FRAC_PI_2) / PI;

        let z_radius = (p_hit.x * p_hit.x + p_hit.y * p_hit.y).sqrt();
        let inv_z_radius = 1.0 / z_radius;
        let cos_phi = p_hit.x * inv_z_radius;
        let sin_phi = p_hit.y * inv_z_radius;
        let dpdu = Vec3f::new(-2.0 * PI * p_hit.y, 2.0 * PI * p_hit.x, 0.0);
        let dpdv = 2.0
            * PI
            * Vec3f::new(
                p_hit.z * cos_phi,
                p_hit.z * sin_phi,
                -self.radius * theta.sin(),
            );

        let object_isect =
            SurfaceInteraction::new(p_hit, Point2f::new(u, v), -ray.dir, dpdu, dpdv);
        let mut isect = self
            .object_to_world
            .transform_surface_interaction(&object_isect);
        isect.n = face_forward(isect.n, isect.wo);

        Some((t_shape_hit, isect))
    }

    fn intersect_test(&self, world_ray: &Ray) -> bool {
        self.hit_quadratic(world_ray).is_some()
    }

    fn area(&self) -> Float {
        4.0 * PI * self.radius * self.radius
    }

    fn sample(&self, u: Point2f) -> (Interaction, Float) {
        let mut p_obj = Point3f::origin() + self.radius * uniform_sample_sphere(u);

        let n = self
            .object_to_world
            .transform_vector(p_obj.to_vec())
            .normalize();

        // Reproject onto the sphere before transforming out.
        p_obj = p_obj * (self.radius / distance(p_obj, Point3f::origin()));
        let p = self.object_to_world.transform_point(p_obj);

        let pdf = 1.0 / self.area();
        (Interaction::new(p, n, Vec3f::zero()), pdf)
    }

    fn sample_from_ref(&self, reference: &Interaction, u: Point2f) -> (Interaction, Float) {
        let p_center = self.object_to_world.transform_point(Point3f::origin());

        // Inside the sphere: sample its whole surface and reweight.
        if distance_squared(reference.p, p_center) <= self.radius * self.radius {
            let (intr, mut pdf) = self.sample(u);
            let mut wi = intr.p - reference.p;
            if wi.dot(wi) == 0.0 {
                pdf = 0.0;
            } else {
                wi = wi.normalize();
                pdf *= distance_squared(reference.p, intr.p) / crate::abs_dot(intr.n, -wi);
            }
            if pdf.is_infinite() {
                pdf = 0.0;
            }
            return (intr, pdf);
        }

        // Sample uniformly inside the cone the sphere subtends.
        let dc = distance(reference.p, p_center);
        let inv_dc = 1.0 / dc;
        let wc = (p_center - reference.p) * inv_dc;
        let (wc_x, wc_y) = coordinate_system(wc);

        let sin_theta_max = self.radius * inv_dc;
        let sin_theta_max2 = sin_theta_max * sin_theta_max;
        let inv_sin_theta_max = 1.0 / sin_theta_max;
        let cos_theta_max = (1.0 - sin_theta_max2).max(0.0).sqrt();

        let mut cos_theta = (cos_theta_max - 1.0) * u[0] + 1.0;
        let mut sin_theta2 = 1.0 - cos_theta * cos_theta;

        if sin_theta_max2 < MIN_SIN2_THETA_MAX {
            // Taylor expansion of the above, stable for tiny cones.
            sin_theta2 = sin_theta_max2 * u[0];
            cos_theta = (1.0 - sin_theta2).sqrt();
        }

        // Angle from the sphere center to the sampled surface point.
        let cos_alpha = sin_theta2 * inv_sin_theta_max
            + cos_theta
                * (1.0 - sin_theta2 * inv_sin_theta_max * inv_sin_theta_max)
                    .max(0.0)
                    .sqrt();
        let sin_alpha = (1.0 - cos_alpha * cos_alpha).max(0.0).sqrt();
        let phi = u[1] * 2.0 * PI;

        let n_world =
            spherical_direction_in_frame(sin_alpha, cos_alpha, phi, -wc_x, -wc_y, -wc);
        let p_world = p_center + self.radius * n_world;

        let pdf = uniform_cone_pdf(cos_theta_max);
        (Interaction::new(p_world, n_world, Vec3f::zero()), pdf)
    }

    fn pdf_from_ref(&self, reference: &Interaction, wi: Vec3f) -> Float {
        let p_center = self.object_to_world.transform_point(Point3f::origin());
        if distance_squared(reference.p, p_center) <= self.radius * self.radius {
            return pdf_from_ref_by_intersection(self, reference, wi);
        }

        let sin_theta_max2 =
            self.radius * self.radius / distance_squared(reference.p, p_center);
        let cos_theta_max = (1.0 - sin_theta_max2).max(0.0).sqrt();
        uniform_cone_pdf(cos_theta_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn unit_sphere_at(center: Vec3f) -> Sphere {
        Sphere::new(Transform::translate(center), 1.0)
    }

    #[test]
    fn test_hit_consistency_with_predicate() {
        // hit(r) agrees with hit(r, t, isect), and the hit point lies on the
        // sphere within 1e-4 * r.
        let sphere = unit_sphere_at(vec3f!(0.5, -0.25, 3.0));
        let center = point3f!(0.5, -0.25, 3.0);
        let mut rng = Pcg32::seed_from_u64(11);

        for _ in 0..2000 {
            let origin = point3f!(
                rng.gen_range(-4.0..4.0),
                rng.gen_range(-4.0..4.0),
                rng.gen_range(-4.0..4.0)
            );
            let dir = vec3f!(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0)
            );
            if dir.magnitude2() < 1e-8 {
                continue;
            }
            let ray = Ray::new(origin, dir);

            let fast = sphere.intersect_test(&ray);
            let full = sphere.intersect(&ray);
            assert_eq!(fast, full.is_some());

            if let Some((t_hit, isect)) = full {
                assert!(t_hit > 0.0 && t_hit <= ray.t_max);
                assert_abs_diff_eq!(distance(isect.p, center), 1.0, epsilon = 1e-4);
                // Normal faces the viewer.
                assert!(isect.n.dot(isect.wo) >= 0.0);
            }
        }
    }

    #[test]
    fn test_hit_from_inside() {
        let sphere = unit_sphere_at(Vec3f::zero());
        let ray = Ray::new(point3f!(0, 0, 0), vec3f!(0, 0, 1));
        let (t_hit, isect) = sphere.intersect(&ray).expect("inside ray must hit");
        assert_abs_diff_eq!(t_hit, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(isect.p.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_miss_beyond_t_max() {
        let sphere = unit_sphere_at(vec3f!(0, 0, 10));
        let ray = Ray::with_t_max(point3f!(0, 0, 0), vec3f!(0, 0, 1), 5.0);
        assert!(!sphere.intersect_test(&ray));
    }

    #[test]
    fn test_uv_ranges() {
        let sphere = unit_sphere_at(Vec3f::zero());
        let ray = Ray::new(point3f!(5, 0.2, 0.1), vec3f!(-1, 0, 0));
        let (_, isect) = sphere.intersect(&ray).unwrap();
        assert!(isect.uv.x >= 0.0 && isect.uv.x <= 1.0);
        assert!(isect.uv.y >= 0.5 && isect.uv.y <= 1.5);
    }

    #[test]
    fn test_area() {
        let sphere = Sphere::new(Transform::identity(), 2.0);
        assert_abs_diff_eq!(sphere.area(), 16.0 * PI);
    }

    #[test]
    fn test_sample_points_on_surface() {
        let sphere = unit_sphere_at(vec3f!(1, 2, 3));
        let center = point3f!(1, 2, 3);
        let mut rng = Pcg32::seed_from_u64(5);
        for _ in 0..500 {
            let (it, pdf) = sphere.sample(Point2f::new(rng.gen(), rng.gen()));
            assert_abs_diff_eq!(distance(it.p, center), 1.0, epsilon = 1e-4);
            assert_abs_diff_eq!(pdf, 1.0 / sphere.area(), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_cone_sampling_subtends_sphere() {
        let sphere = unit_sphere_at(vec3f!(0, 0, 5));
        let reference = Interaction::from_point(point3f!(0, 0, 0));
        let mut rng = Pcg32::seed_from_u64(6);

        for _ in 0..500 {
            let (it, pdf) = sphere.sample_from_ref(&reference, Point2f::new(rng.gen(), rng.gen()));
            assert!(pdf > 0.0);
            // Sampled point is on the sphere and visible-ish from the reference.
            assert_abs_diff_eq!(distance(it.p, point3f!(0, 0, 5)), 1.0, epsilon = 1e-3);
            let wi = (it.p - reference.p).normalize();
            assert!(sphere.pdf_from_ref(&reference, wi) > 0.0);
        }
    }

    #[test]
    fn test_cone_pdf_matches_solid_angle() {
        // For a sphere of radius 1 at distance 5 the subtended solid angle is
        // 2 pi (1 - cos theta_max); a uniform cone pdf integrates to 1 over it.
        let sphere = unit_sphere_at(vec3f!(0, 0, 5));
        let reference = Interaction::from_point(point3f!(0, 0, 0));
        let wi = vec3f!(0, 0, 1);
        let cos_theta_max = (1.0f32 - 1.0 / 25.0).sqrt();
        assert_abs_diff_eq!(
            sphere.pdf_from_ref(&reference, wi),
            uniform_cone_pdf(cos_theta_max),
            epsilon = 1e-6
        );
    }
}
