use crate::err_float::gamma;
use crate::geometry::Ray;
use crate::{Float, Scalar};
use cgmath::{Point2, Point3, Vector2, Vector3};

pub type Bounds2f = Bounds2<f32>;
pub type Bounds2i = Bounds2<i32>;
pub type Bounds3f = Bounds3<f32>;

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Bounds2<S: Scalar> {
    pub min: Point2<S>,
    pub max: Point2<S>,
}

impl<S: Scalar> Bounds2<S> {
    pub fn with_bounds(min: Point2<S>, max: Point2<S>) -> Self {
        Self { min, max }
    }

    pub fn diagonal(&self) -> Vector2<S> {
        self.max - self.min
    }

    pub fn area(&self) -> S {
        let d = self.diagonal();
        d.x * d.y
    }

    pub fn intersection(&self, other: &Self) -> Self {
        // Assign min/max directly so intersecting disjoint bounds yields a
        // degenerate box rather than a re-sorted one.
        Self {
            min: Point2::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            max: Point2::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        }
    }

    pub fn inside_exclusive(&self, p: Point2<S>) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }
}

impl Bounds2i {
    /// Iterates the contained integer points in row-major order; empty for
    /// degenerate bounds.
    pub fn iter_points(&self) -> impl Iterator<Item = Point2<i32>> {
        let b = *self;
        (b.min.y..b.max.y).flat_map(move |y| (b.min.x..b.max.x).map(move |x| Point2::new(x, y)))
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Bounds3<S: Scalar> {
    pub min: Point3<S>,
    pub max: Point3<S>,
}

impl<S: Scalar> Bounds3<S> {
    pub fn with_bounds(min: Point3<S>, max: Point3<S>) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self::with_bounds(
            Point3::new(S::max_value(), S::max_value(), S::max_value()),
            Point3::new(S::min_value(), S::min_value(), S::min_value()),
        )
    }

    pub fn join(&self, other: &Self) -> Self {
        Self::with_bounds(
            Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        )
    }

    pub fn join_point(&self, point: Point3<S>) -> Self {
        Self::with_bounds(
            Point3::new(
                self.min.x.min(point.x),
                self.min.y.min(point.y),
                self.min.z.min(point.z),
            ),
            Point3::new(
                self.max.x.max(point.x),
                self.max.y.max(point.y),
                self.max.z.max(point.z),
            ),
        )
    }

    pub fn inside(&self, p: Point3<S>) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    pub fn corner(&self, i: usize) -> Point3<S> {
        debug_assert!(i < 8);
        let x = if i & 1 == 0 { self.min.x } else { self.max.x };
        let y = if i & 2 == 0 { self.min.y } else { self.max.y };
        let z = if i & 4 == 0 { self.min.z } else { self.max.z };
        Point3::new(x, y, z)
    }

    pub fn diagonal(&self) -> Vector3<S> {
        self.max - self.min
    }

    pub fn surface_area(&self) -> S {
        let d = self.diagonal();
        let two = S::one() + S::one();
        two * (d.x * d.y + d.x * d.z + d.y * d.z)
    }

    pub fn maximum_extent(&self) -> usize {
        let d = self.diagonal();
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }
}

impl Bounds3f {
    pub fn centroid(&self) -> Point3<Float> {
        self.min + self.diagonal() / 2.0
    }

    /// Slab test returning the parametric overlap of the ray with the box,
    /// or `None` on a miss. The far plane is scaled by `1 + 2·gamma(3)` so
    /// rays grazing a slab never falsely miss.
    pub fn hit(&self, ray: &Ray) -> Option<(Float, Float)> {
        let mut t0: Float = 0.0;
        let mut t1 = ray.t_max;
        for i in 0..3 {
            let inv_ray_dir = 1.0 / ray.dir[i];
            let mut t_near = (self.min[i] - ray.origin[i]) * inv_ray_dir;
            let mut t_far = (self.max[i] - ray.origin[i]) * inv_ray_dir;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }

            t_far *= 1.0 + 2.0 * gamma(3);
            t0 = if t_near > t0 { t_near } else { t0 };
            t1 = if t_far < t1 { t_far } else { t1 };
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Point2i, INFINITY};

    #[test]
    fn test_empty_join() {
        let b = Bounds3f::empty();
        let joined = b.join_point(point3f!(1, 2, 3));
        assert_eq!(joined.min, point3f!(1, 2, 3));
        assert_eq!(joined.max, point3f!(1, 2, 3));
    }

    #[test]
    fn test_maximum_extent() {
        let b = bounds3f!((0, 0, 0), (1, 3, 2));
        assert_eq!(b.maximum_extent(), 1);
    }

    #[test]
    fn test_slab_hit_through_center() {
        let b = bounds3f!((-1, -1, -1), (1, 1, 1));
        let ray = Ray::new(point3f!(0, 0, -5), vec3f!(0, 0, 1));
        let (t0, t1) = b.hit(&ray).expect("ray through center must hit");
        assert!(t0 > 3.9 && t0 < 4.1);
        assert!(t1 > 5.9 && t1 < 6.1);
    }

    #[test]
    fn test_slab_hit_origin_on_face() {
        // No false miss when the ray origin lies exactly on a box face.
        let b = bounds3f!((-1, -1, -1), (1, 1, 1));
        let ray = Ray::new(point3f!(-1, 0, 0), vec3f!(1, 0, 0));
        let (t0, _t1) = b.hit(&ray).expect("origin on face must hit");
        assert_eq!(t0, 0.0);
    }

    #[test]
    fn test_slab_hit_respects_t_max() {
        let b = bounds3f!((-1, -1, -1), (1, 1, 1));
        let ray = Ray::with_t_max(point3f!(0, 0, -5), vec3f!(0, 0, 1), 2.0);
        assert!(b.hit(&ray).is_none());

        let behind = Ray::new(point3f!(0, 0, 5), vec3f!(0, 0, 1));
        assert!(b.hit(&behind).is_none());
    }

    #[test]
    fn test_slab_hit_axis_parallel_inside_slab() {
        let b = bounds3f!((-1, -1, -1), (1, 1, 1));
        // Parallel to x slabs but inside them; division by zero produces
        // infinities that must not poison the interval.
        let ray = Ray::with_t_max(point3f!(0.5, 0.5, -5.0), vec3f!(0, 0, 1), INFINITY);
        assert!(b.hit(&ray).is_some());
    }

    #[test]
    fn test_bounds2i_iteration() {
        let b = Bounds2i::with_bounds(Point2i::new(0, 0), Point2i::new(2, 2));
        let pts: Vec<_> = b.iter_points().collect();
        assert_eq!(pts.len(), 4);
        assert_eq!(pts[0], Point2i::new(0, 0));
        assert_eq!(pts[3], Point2i::new(1, 1));

        let degenerate = Bounds2i::with_bounds(Point2i::new(2, 2), Point2i::new(2, 2));
        assert_eq!(degenerate.iter_points().count(), 0);
    }

    #[test]
    fn test_intersection_degenerate_for_disjoint() {
        let a = Bounds2i::with_bounds(Point2i::new(0, 0), Point2i::new(1, 1));
        let b = Bounds2i::with_bounds(Point2i::new(5, 5), Point2i::new(6, 6));
        let i = a.intersection(&b);
        assert!(i.min.x > i.max.x);
        assert_eq!(i.iter_points().count(), 0);
    }
}
