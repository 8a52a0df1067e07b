use crate::geometry::Ray;
use crate::interaction::{Interaction, SurfaceInteraction};
use crate::{abs_dot, distance_squared, Bounds3f, Float, Point2f};
use cgmath::InnerSpace;

pub mod sphere;
pub mod triangle;

pub trait Shape: Send + Sync {
    fn object_bound(&self) -> Bounds3f;

    fn world_bound(&self) -> Bounds3f;

    /// Closest intersection in `(0, ray.t_max]`, with the hit parameter and a
    /// world-space interaction whose normal faces the outgoing direction.
    fn intersect<'a>(&self, ray: &Ray) -> Option<(Float, SurfaceInteraction<'a>)>;

    fn intersect_test(&self, ray: &Ray) -> bool {
        self.intersect(ray).is_some()
    }

    fn area(&self) -> Float;

    /// Samples a point on the shape; the returned pdf is with respect to
    /// surface area.
    fn sample(&self, u: Point2f) -> (Interaction, Float);

    /// Samples a point on the shape as seen from `reference`; the returned
    /// pdf is with respect to solid angle at the reference point.
    fn sample_from_ref(&self, reference: &Interaction, u: Point2f) -> (Interaction, Float) {
        let (intr, mut pdf) = self.sample(u);
        let mut wi = intr.p - reference.p;
        if wi.dot(wi) == 0.0 {
            pdf = 0.0;
        } else {
            wi = wi.normalize();
            // Convert from area measure to solid angle measure.
            pdf *= distance_squared(reference.p, intr.p) / abs_dot(intr.n, -wi);
            if pdf.is_infinite() {
                pdf = 0.0;
            }
        }
        (intr, pdf)
    }

    /// Area-measure pdf of sampling a given point on the shape.
    fn pdf(&self, _it: &Interaction) -> Float {
        1.0 / self.area()
    }

    /// Solid-angle pdf that `sample_from_ref` generates the direction `wi`.
    fn pdf_from_ref(&self, reference: &Interaction, wi: crate::Vec3f) -> Float {
        pdf_from_ref_by_intersection(self, reference, wi)
    }
}

/// Generic solid-angle pdf: intersect the shape along `wi` and convert the
/// area measure at the hit point.
pub(crate) fn pdf_from_ref_by_intersection<S: Shape + ?Sized>(
    shape: &S,
    reference: &Interaction,
    wi: crate::Vec3f,
) -> Float {
    let ray = reference.spawn_ray(wi);
    match shape.intersect(&ray) {
        None => 0.0,
        Some((_t, isect_light)) => {
            let pdf = distance_squared(reference.p, isect_light.p)
                / (abs_dot(isect_light.n, -wi) * shape.area());
            if pdf.is_infinite() {
                0.0
            } else {
                pdf
            }
        }
    }
}
