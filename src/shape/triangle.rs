use crate::interaction::{Interaction, SurfaceInteraction};
use crate::sampling::uniform_sample_triangle;
use crate::shape::Shape;
use crate::{
    coordinate_system, face_forward, max_dimension, permute, Bounds3f, ComponentWiseExt, Float,
    Point2f, Point3f, Ray, Transform, Vec3f,
};
use anyhow::Context;
use cgmath::{EuclideanSpace, InnerSpace, Zero};
use std::path::Path;
use std::sync::Arc;

/// Vertex buffers shared by all triangles of one mesh. Vertices are stored in
/// world space so the per-triangle hit needs no transform.
pub struct TriangleMesh {
    pub n_triangles: usize,
    pub vertex_indices: Vec<u32>,
    pub vertices: Vec<Point3f>,
    pub normals: Option<Vec<Vec3f>>,
    pub uvs: Option<Vec<Point2f>>,
}

impl TriangleMesh {
    pub fn new(
        object_to_world: &Transform,
        vertex_indices: Vec<u32>,
        mut vertices: Vec<Point3f>,
        mut normals: Option<Vec<Vec3f>>,
        uvs: Option<Vec<Point2f>>,
    ) -> Self {
        assert_eq!(vertex_indices.len() % 3, 0);
        let n_triangles = vertex_indices.len() / 3;
        let n_vertices = vertices.len();

        for v in &mut vertices {
            *v = object_to_world.transform_point(*v);
        }

        if let Some(ref mut normals) = normals {
            assert_eq!(normals.len(), n_vertices);
            for n in normals.iter_mut() {
                *n = object_to_world.transform_normal(*n);
            }
        }

        if let Some(ref uvs) = uvs {
            assert_eq!(uvs.len(), n_vertices);
        }

        Self {
            n_triangles,
            vertex_indices,
            vertices,
            normals,
            uvs,
        }
    }

    /// Loads a Wavefront OBJ file, merging all of its models into one mesh.
    pub fn from_obj_file(path: &Path, object_to_world: &Transform) -> anyhow::Result<Arc<Self>> {
        let (models, _materials) = tobj::load_obj(
            path,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
        )
        .with_context(|| format!("failed to load mesh {}", path.display()))?;

        let mut vertex_indices = Vec::new();
        let mut vertices = Vec::new();
        let mut normals = Vec::new();
        let mut uvs = Vec::new();

        for model in &models {
            let mesh = &model.mesh;
            let base = vertices.len() as u32;
            vertex_indices.extend(mesh.indices.iter().map(|&i| base + i));
            vertices.extend(
                mesh.positions
                    .chunks_exact(3)
                    .map(|p| Point3f::new(p[0], p[1], p[2])),
            );
            normals.extend(
                mesh.normals
                    .chunks_exact(3)
                    .map(|n| Vec3f::new(n[0], n[1], n[2])),
            );
            uvs.extend(
                mesh.texcoords
                    .chunks_exact(2)
                    .map(|t| Point2f::new(t[0], t[1])),
            );
        }

        let normals = (normals.len() == vertices.len()).then_some(normals);
        let uvs = (uvs.len() == vertices.len()).then_some(uvs);

        tracing::info!(
            mesh = %path.display(),
            triangles = vertex_indices.len() / 3,
            vertices = vertices.len(),
            "loaded mesh"
        );

        Ok(Arc::new(Self::new(
            object_to_world,
            vertex_indices,
            vertices,
            normals,
            uvs,
        )))
    }
}

/// One triangle of a shared mesh.
pub struct Triangle {
    mesh: Arc<TriangleMesh>,
    tri_id: usize,
}

impl Triangle {
    pub fn new(mesh: Arc<TriangleMesh>, tri_id: usize) -> Self {
        debug_assert!(tri_id < mesh.n_triangles);
        Self { mesh, tri_id }
    }

    fn positions(&self) -> [Point3f; 3] {
        let v = &self.mesh.vertex_indices[3 * self.tri_id..3 * self.tri_id + 3];
        [
            self.mesh.vertices[v[0] as usize],
            self.mesh.vertices[v[1] as usize],
            self.mesh.vertices[v[2] as usize],
        ]
    }

    fn get_uvs(&self) -> [Point2f; 3] {
        match &self.mesh.uvs {
            None => [
                Point2f::new(0.0, 0.0),
                Point2f::new(1.0, 0.0),
                Point2f::new(1.0, 1.0),
            ],
            Some(uvs) => {
                let v = &self.mesh.vertex_indices[3 * self.tri_id..3 * self.tri_id + 3];
                [
                    uvs[v[0] as usize],
                    uvs[v[1] as usize],
                    uvs[v[2] as usize],
                ]
            }
        }
    }

    /// Watertight intersection: translate so the ray starts at the origin,
    /// permute so z is the dominant direction, shear onto +z, then test edge
    /// functions. Returns barycentrics and the hit parameter.
    fn intersect_watertight(&self, ray: &Ray) -> Option<(Float, Float, Float, Float)> {
        let [p0, p1, p2] = self.positions();

        let kz = max_dimension(ray.dir.abs());
        let kx = (kz + 1) % 3;
        let ky = (kx + 1) % 3;
        let dir = permute(ray.dir, kx, ky, kz);
        let mut q0 = permute(p0 - ray.origin, kx, ky, kz);
        let mut q1 = permute(p1 - ray.origin, kx, ky, kz);
        let mut q2 = permute(p2 - ray.origin, kx, ky, kz);

        let shear_x = -dir.x / dir.z;
        let shear_y = -dir.y / dir.z;
        let shear_z = 1.0 / dir.z;
        q0.x += shear_x * q0.z;
        q0.y += shear_y * q0.z;
        q1.x += shear_x * q1.z;
        q1.y += shear_y * q1.z;
        q2.x += shear_x * q2.z;
        q2.y += shear_y * q2.z;

        let e0 = q1.x * q2.y - q1.y * q2.x;
        let e1 = q2.x * q0.y - q2.y * q0.x;
        let e2 = q0.x * q1.y - q0.y * q1.x;

        // The origin must be on the same side of all three edges.
        if (e0 < 0.0 || e1 < 0.0 || e2 < 0.0) && (e0 > 0.0 || e1 > 0.0 || e2 > 0.0) {
            return None;
        }
        let det = e0 + e1 + e2;
        if det == 0.0 {
            return None;
        }

        q0.z *= shear_z;
        q1.z *= shear_z;
        q2.z *= shear_z;
        let t_scaled = e0 * q0.z + e1 * q1.z + e2 * q2.z;
        if det < 0.0 && (t_scaled >= 0.0 || t_scaled < ray.t_max * det) {
            return None;
        } else if det > 0.0 && (t_scaled <= 0.0 || t_scaled > ray.t_max * det) {
            return None;
        }

        let inv_det = 1.0 / det;
        let b0 = e0 * inv_det;
        let b1 = e1 * inv_det;
        let b2 = e2 * inv_det;
        let t = t_scaled * inv_det;

        Some((b0, b1, b2, t))
    }
}

impl Shape for Triangle {
    fn object_bound(&self) -> Bounds3f {
        // Mesh vertices already live in world space.
        self.world_bound()
    }

    fn world_bound(&self) -> Bounds3f {
        let [p0, p1, p2] = self.positions();
        Bounds3f::with_bounds(p0, p0).join_point(p1).join_point(p2)
    }

    fn intersect<'a>(&self, ray: &Ray) -> Option<(Float, SurfaceInteraction<'a>)> {
        let (b0, b1, b2, t) = self.intersect_watertight(ray)?;
        let [p0, p1, p2] = self.positions();

        let uv = self.get_uvs();
        let duv02 = uv[0] - uv[2];
        let duv12 = uv[1] - uv[2];
        let dp02 = p0 - p2;
        let dp12 = p1 - p2;

        let determinant = duv02.x * duv12.y - duv02.y * duv12.x;
        let (dpdu, dpdv) = if determinant == 0.0 {
            // Degenerate parameterization; build any frame around the normal.
            coordinate_system(dp02.cross(dp12).normalize())
        } else {
            let inv_det = 1.0 / determinant;
            (
                (duv12.y * dp02 - duv02.y * dp12) * inv_det,
                (-duv12.x * dp02 + duv02.x * dp12) * inv_det,
            )
        };

        let p_hit = Point3f::from_vec(b0 * p0.to_vec() + b1 * p1.to_vec() + b2 * p2.to_vec());
        let uv_hit = Point2f::from_vec(
            b0 * uv[0].to_vec() + b1 * uv[1].to_vec() + b2 * uv[2].to_vec(),
        );

        let mut isect = SurfaceInteraction::new(p_hit, uv_hit, -ray.dir, dpdu, dpdv);
        isect.n = face_forward(dp02.cross(dp12).normalize(), isect.wo);

        Some((t, isect))
    }

    fn intersect_test(&self, ray: &Ray) -> bool {
        self.intersect_watertight(ray).is_some()
    }

    fn area(&self) -> Float {
        let [p0, p1, p2] = self.positions();
        0.5 * (p1 - p0).cross(p2 - p0).magnitude()
    }

    fn sample(&self, u: Point2f) -> (Interaction, Float) {
        let b = uniform_sample_triangle(u);
        let [p0, p1, p2] = self.positions();

        let p = Point3f::from_vec(
            b.x * p0.to_vec() + b.y * p1.to_vec() + (1.0 - b.x - b.y) * p2.to_vec(),
        );
        let n = (p1 - p0).cross(p2 - p0).normalize();

        let pdf = 1.0 / self.area();
        (Interaction::new(p, n, Vec3f::zero()), pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn unit_quad() -> Arc<TriangleMesh> {
        // Two triangles covering [0, 1]^2 in the z = 0 plane.
        Arc::new(TriangleMesh::new(
            &Transform::identity(),
            vec![0, 1, 2, 0, 2, 3],
            vec![
                point3f!(0, 0, 0),
                point3f!(1, 0, 0),
                point3f!(1, 1, 0),
                point3f!(0, 1, 0),
            ],
            None,
            None,
        ))
    }

    #[test]
    fn test_hit_inside_and_miss_outside() {
        let mesh = unit_quad();
        let tri = Triangle::new(mesh.clone(), 0);

        let hit_ray = Ray::new(point3f!(0.6, 0.3, -1), vec3f!(0, 0, 1));
        let (t, isect) = tri.intersect(&hit_ray).expect("must hit");
        assert_abs_diff_eq!(t, 1.0, epsilon = 1e-5);
        assert_abs_diff_eq!(isect.p.z, 0.0, epsilon = 1e-5);
        assert!(isect.n.dot(isect.wo) > 0.0);

        // Point inside the quad but in the other triangle.
        let miss_ray = Ray::new(point3f!(0.2, 0.8, -1), vec3f!(0, 0, 1));
        assert!(tri.intersect(&miss_ray).is_none());
        assert!(Triangle::new(mesh, 1).intersect(&miss_ray).is_some());
    }

    #[test]
    fn test_respects_t_max() {
        let tri = Triangle::new(unit_quad(), 0);
        let ray = Ray::with_t_max(point3f!(0.6, 0.3, -1), vec3f!(0, 0, 1), 0.5);
        assert!(!tri.intersect_test(&ray));
    }

    #[test]
    fn test_no_hit_behind_origin() {
        let tri = Triangle::new(unit_quad(), 0);
        let ray = Ray::new(point3f!(0.6, 0.3, 1), vec3f!(0, 0, 1));
        assert!(!tri.intersect_test(&ray));
    }

    #[test]
    fn test_area_and_sampling() {
        let tri = Triangle::new(unit_quad(), 0);
        assert_abs_diff_eq!(tri.area(), 0.5, epsilon = 1e-6);

        let mut rng = Pcg32::seed_from_u64(9);
        for _ in 0..500 {
            let (it, pdf) = tri.sample(Point2f::new(rng.gen(), rng.gen()));
            assert_abs_diff_eq!(it.p.z, 0.0, epsilon = 1e-6);
            // Inside the triangle (0,0), (1,0), (1,1): 0 <= y <= x <= 1.
            assert!(it.p.y <= it.p.x + 1e-5);
            assert_abs_diff_eq!(pdf, 2.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_mesh_transform_applied_once() {
        let mesh = Arc::new(TriangleMesh::new(
            &Transform::translate(vec3f!(0, 0, 5)),
            vec![0, 1, 2],
            vec![point3f!(0, 0, 0), point3f!(1, 0, 0), point3f!(0, 1, 0)],
            None,
            None,
        ));
        let tri = Triangle::new(mesh, 0);
        let ray = Ray::new(point3f!(0.25, 0.25, 0), vec3f!(0, 0, 1));
        let (t, _) = tri.intersect(&ray).expect("translated triangle must hit");
        assert_abs_diff_eq!(t, 5.0, epsilon = 1e-4);
    }

    #[test]
    fn test_edge_on_ray_does_not_crash() {
        // Ray in the plane of the triangle: degenerate but must not panic.
        let tri = Triangle::new(unit_quad(), 0);
        let ray = Ray::new(point3f!(-1, 0.5, 0), vec3f!(1, 0, 0));
        let _ = tri.intersect_test(&ray);
    }
}
