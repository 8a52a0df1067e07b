use crate::{Float, Point3f, Vec3f, INFINITY};
use cgmath::InnerSpace;

pub mod bounds;
pub mod transform;

#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3f,
    pub dir: Vec3f,
    pub t_max: Float,
}

impl Ray {
    /// The direction is normalized on construction.
    pub fn new(origin: Point3f, dir: Vec3f) -> Self {
        Self::with_t_max(origin, dir, INFINITY)
    }

    pub fn with_t_max(origin: Point3f, dir: Vec3f, t_max: Float) -> Self {
        Self {
            origin,
            dir: dir.normalize(),
            t_max,
        }
    }

    pub fn at(&self, t: Float) -> Point3f {
        self.origin + self.dir * t
    }
}

pub fn distance(p1: Point3f, p2: Point3f) -> Float {
    (p1 - p2).magnitude()
}

pub fn distance_squared(p1: Point3f, p2: Point3f) -> Float {
    (p1 - p2).magnitude2()
}

pub fn abs_dot(v1: Vec3f, v2: Vec3f) -> Float {
    v1.dot(v2).abs()
}

pub fn face_forward(n: Vec3f, v: Vec3f) -> Vec3f {
    if n.dot(v) < 0.0 {
        -n
    } else {
        n
    }
}

/// Builds an orthonormal basis around `v1`, which must be normalized.
pub fn coordinate_system(v1: Vec3f) -> (Vec3f, Vec3f) {
    let v2 = if v1.x.abs() > v1.y.abs() {
        Vec3f::new(-v1.z, 0.0, v1.x) / (v1.x * v1.x + v1.z * v1.z).sqrt()
    } else {
        Vec3f::new(0.0, v1.z, -v1.y) / (v1.y * v1.y + v1.z * v1.z).sqrt()
    };
    let v3 = v1.cross(v2);
    (v2, v3)
}

pub fn spherical_direction_in_frame(
    sin_theta: Float,
    cos_theta: Float,
    phi: Float,
    x: Vec3f,
    y: Vec3f,
    z: Vec3f,
) -> Vec3f {
    sin_theta * phi.cos() * x + sin_theta * phi.sin() * y + cos_theta * z
}

pub fn max_dimension(v: Vec3f) -> usize {
    if v.x > v.y {
        if v.x > v.z {
            0
        } else {
            2
        }
    } else if v.y > v.z {
        1
    } else {
        2
    }
}

pub fn permute(v: Vec3f, x: usize, y: usize, z: usize) -> Vec3f {
    Vec3f::new(v[x], v[y], v[z])
}

pub trait ComponentWiseExt {
    fn abs(self) -> Self;
}

impl ComponentWiseExt for Vec3f {
    fn abs(self) -> Self {
        Vec3f::new(self.x.abs(), self.y.abs(), self.z.abs())
    }
}
