use crate::geometry::Ray;
use crate::interaction::SurfaceInteraction;
use crate::{Bounds3f, Float, Point3f, Vec3f};
use cgmath::{InnerSpace, Matrix, Matrix4, SquareMatrix, Vector4};

/// A 4x4 matrix paired with its inverse.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub m: Matrix4<Float>,
    pub m_inv: Matrix4<Float>,
}

impl Transform {
    pub const fn new(m: Matrix4<Float>, m_inv: Matrix4<Float>) -> Self {
        Self { m, m_inv }
    }

    pub fn from_mat(m: Matrix4<Float>) -> Self {
        let m_inv = m.invert().expect("transform matrix is not invertible");
        Self::new(m, m_inv)
    }

    pub fn identity() -> Self {
        Self::new(Matrix4::identity(), Matrix4::identity())
    }

    pub fn inverse(&self) -> Self {
        Self::new(self.m_inv, self.m)
    }

    pub fn translate(delta: Vec3f) -> Self {
        Self::new(
            Matrix4::from_translation(delta),
            Matrix4::from_translation(-delta),
        )
    }

    pub fn scale(x: Float, y: Float, z: Float) -> Self {
        Self::new(
            Matrix4::from_nonuniform_scale(x, y, z),
            Matrix4::from_nonuniform_scale(1.0 / x, 1.0 / y, 1.0 / z),
        )
    }

    /// Rotation of `theta` degrees about `axis`.
    pub fn rotate(theta: Float, axis: Vec3f) -> Self {
        let m = Matrix4::from_axis_angle(axis.normalize(), cgmath::Deg(theta));
        Self::new(m, m.transpose())
    }

    /// Camera-to-world transform for a camera at `eye` looking at `look`.
    pub fn look_at(eye: Point3f, look: Point3f, up: Vec3f) -> Self {
        let dir = (look - eye).normalize();
        let right = up.normalize().cross(dir).normalize();
        let new_up = dir.cross(right);

        let m = Matrix4::from_cols(
            right.extend(0.0),
            new_up.extend(0.0),
            dir.extend(0.0),
            Vector4::new(eye.x, eye.y, eye.z, 1.0),
        );
        let m_inv = m.invert().expect("look-at matrix is not invertible");
        Self::new(m, m_inv)
    }

    /// Perspective projection with the given vertical field of view in degrees.
    pub fn perspective(fov: Float, near: Float, far: Float) -> Self {
        #[rustfmt::skip]
        let persp = Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, far / (far - near), 1.0,
            0.0, 0.0, -far * near / (far - near), 0.0,
        );

        let inv_tan_ang = 1.0 / (fov.to_radians() / 2.0).tan();
        Self::scale(inv_tan_ang, inv_tan_ang, 1.0) * Self::from_mat(persp)
    }

    /// Applies the transform to a point (w = 1), dividing through by the
    /// homogeneous coordinate.
    pub fn transform_point(&self, p: Point3f) -> Point3f {
        let v = self.m * Vector4::new(p.x, p.y, p.z, 1.0);
        if v.w == 1.0 {
            Point3f::new(v.x, v.y, v.z)
        } else {
            Point3f::new(v.x / v.w, v.y / v.w, v.z / v.w)
        }
    }

    /// Applies the transform to a direction (w = 0).
    pub fn transform_vector(&self, v: Vec3f) -> Vec3f {
        (self.m * Vector4::new(v.x, v.y, v.z, 0.0)).truncate()
    }

    /// Normals transform by the transpose of the inverse.
    pub fn transform_normal(&self, n: Vec3f) -> Vec3f {
        let m = &self.m_inv;
        Vec3f::new(
            m[0][0] * n.x + m[0][1] * n.y + m[0][2] * n.z,
            m[1][0] * n.x + m[1][1] * n.y + m[1][2] * n.z,
            m[2][0] * n.x + m[2][1] * n.y + m[2][2] * n.z,
        )
    }

    /// The direction is deliberately not renormalized so parametric t values
    /// carry across spaces.
    pub fn transform_ray(&self, r: &Ray) -> Ray {
        Ray {
            origin: self.transform_point(r.origin),
            dir: self.transform_vector(r.dir),
            t_max: r.t_max,
        }
    }

    pub fn transform_bounds(&self, b: Bounds3f) -> Bounds3f {
        (0..8).fold(Bounds3f::empty(), |acc, i| {
            acc.join_point(self.transform_point(b.corner(i)))
        })
    }

    pub fn transform_surface_interaction<'a>(
        &self,
        si: &SurfaceInteraction<'a>,
    ) -> SurfaceInteraction<'a> {
        SurfaceInteraction {
            p: self.transform_point(si.p),
            n: self.transform_normal(si.n).normalize(),
            wo: self.transform_vector(si.wo).normalize(),
            uv: si.uv,
            dpdu: self.transform_vector(si.dpdu),
            dpdv: self.transform_vector(si.dpdv),
            primitive: si.primitive,
        }
    }
}

impl std::ops::Mul for Transform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(self.m * rhs.m, rhs.m_inv * self.m_inv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_point_vs_vector() {
        // Translation moves points but not directions.
        let t = Transform::translate(vec3f!(1, 2, 3));
        assert_abs_diff_eq!(t.transform_point(point3f!(0, 0, 0)), point3f!(1, 2, 3));
        assert_abs_diff_eq!(t.transform_vector(vec3f!(1, 0, 0)), vec3f!(1, 0, 0));
    }

    #[test]
    fn test_compose_applies_right_first() {
        let t = Transform::scale(2.0, 2.0, 2.0) * Transform::translate(vec3f!(1, 1, 1));
        let p = t.transform_point(point3f!(1, 1, 1));
        assert_abs_diff_eq!(p, point3f!(4, 4, 4), epsilon = 1e-5);

        let back = t.inverse().transform_point(p);
        assert_abs_diff_eq!(back, point3f!(1, 1, 1), epsilon = 1e-5);
    }

    #[test]
    fn test_rotate_inverse_is_transpose() {
        let t = Transform::rotate(90.0, vec3f!(0, 1, 0));
        let p = t.transform_point(point3f!(1, 0, 0));
        let back = t.inverse().transform_point(p);
        assert_abs_diff_eq!(back, point3f!(1, 0, 0), epsilon = 1e-5);
    }

    #[test]
    fn test_normal_under_nonuniform_scale() {
        // A plane normal must stay perpendicular after a non-uniform scale.
        let t = Transform::scale(2.0, 1.0, 1.0);
        let tangent = t.transform_vector(vec3f!(1, 1, 0));
        let n = t.transform_normal(vec3f!(-1, 1, 0)).normalize();
        assert_abs_diff_eq!(n.dot(tangent), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_look_at_maps_camera_axes() {
        let eye = point3f!(0, 0, -5);
        let t = Transform::look_at(eye, point3f!(0, 0, 0), vec3f!(0, 1, 0));
        // Camera origin goes to eye; camera +z goes toward the target.
        assert_abs_diff_eq!(t.transform_point(point3f!(0, 0, 0)), eye, epsilon = 1e-5);
        assert_abs_diff_eq!(
            t.transform_vector(vec3f!(0, 0, 1)),
            vec3f!(0, 0, 1),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_bounds_transform_contains_all_corners() {
        let b = bounds3f!((-1, -1, -1), (1, 1, 1));
        let t = Transform::rotate(45.0, vec3f!(0, 0, 1));
        let tb = t.transform_bounds(b);
        for i in 0..8 {
            assert!(tb.inside(t.transform_point(b.corner(i))));
        }
    }
}
