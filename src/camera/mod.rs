use crate::film::Film;
use crate::{Bounds2f, Float, Point2f, Point3f, Ray, Transform};
use cgmath::{EuclideanSpace, InnerSpace};

#[derive(Clone, Copy, Debug)]
pub struct CameraSample {
    pub p_film: Point2f,
}

pub trait Camera: Send + Sync {
    fn film(&self) -> &Film;

    /// Generates the world-space ray for a film sample, with its weight on
    /// the image.
    fn casting_ray(&self, sample: &CameraSample) -> (Ray, Float);
}

/// Pinhole perspective camera with the raster / screen / camera transform
/// chain precomputed.
pub struct PerspectiveCamera {
    camera_to_world: Transform,
    raster_to_camera: Transform,
    film: Film,

    /// Image plane area at z = 1; used by light-transport algorithms that
    /// need the importance function's normalization.
    pub image_plane_area: Float,
}

impl PerspectiveCamera {
    pub fn new(camera_to_world: Transform, fov: Float, film: Film) -> Self {
        let camera_to_screen = Transform::perspective(fov, 1e-2, 1000.0);

        // The screen window spans [-1, 1] along the narrower axis.
        let res = film.full_resolution;
        let frame = res.x as Float / res.y as Float;
        let screen = if frame > 1.0 {
            Bounds2f::with_bounds(
                Point2f::new(-frame, -1.0),
                Point2f::new(frame, 1.0),
            )
        } else {
            Bounds2f::with_bounds(
                Point2f::new(-1.0, -1.0 / frame),
                Point2f::new(1.0, 1.0 / frame),
            )
        };

        let screen_to_raster = Transform::scale(res.x as Float, res.y as Float, 1.0)
            * Transform::scale(
                1.0 / (screen.max.x - screen.min.x),
                1.0 / (screen.min.y - screen.max.y),
                1.0,
            )
            * Transform::translate(vec3f!(-screen.min.x, -screen.max.y, 0.0));
        let raster_to_screen = screen_to_raster.inverse();
        let raster_to_camera = camera_to_screen.inverse() * raster_to_screen;

        // Image plane bounds at z = 1.
        let mut p_min = raster_to_camera.transform_point(Point3f::origin());
        let mut p_max =
            raster_to_camera.transform_point(point3f!(res.x as Float, res.y as Float, 0.0));
        p_min = p_min / p_min.z;
        p_max = p_max / p_max.z;
        let image_plane_area = ((p_max.x - p_min.x) * (p_max.y - p_min.y)).abs();

        Self {
            camera_to_world,
            raster_to_camera,
            film,
            image_plane_area,
        }
    }
}

impl Camera for PerspectiveCamera {
    fn film(&self) -> &Film {
        &self.film
    }

    fn casting_ray(&self, sample: &CameraSample) -> (Ray, Float) {
        let p_film = point3f!(sample.p_film.x, sample.p_film.y, 0.0);
        let p_camera = self.raster_to_camera.transform_point(p_film);

        let ray = Ray::new(Point3f::origin(), p_camera.to_vec().normalize());
        (self.camera_to_world.transform_ray(&ray), 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::film::Film;
    use crate::filter::BoxFilter;
    use crate::{Bounds2f, Point2i, Vec2f, INFINITY};
    use approx::assert_abs_diff_eq;
    use std::path::PathBuf;

    fn test_camera(eye: Point3f, focus: Point3f) -> PerspectiveCamera {
        let film = Film::new(
            Point2i::new(100, 100),
            Bounds2f::with_bounds(Point2f::new(0.0, 0.0), Point2f::new(1.0, 1.0)),
            Box::new(BoxFilter::new(Vec2f::new(0.5, 0.5))),
            PathBuf::from("test.png"),
            35.0,
            1.0,
            INFINITY,
        );
        let camera_to_world = Transform::look_at(eye, focus, vec3f!(0, 1, 0));
        PerspectiveCamera::new(camera_to_world, 60.0, film)
    }

    #[test]
    fn test_center_ray_points_at_target() {
        let eye = point3f!(0, 0, -5);
        let camera = test_camera(eye, point3f!(0, 0, 0));
        let (ray, weight) = camera.casting_ray(&CameraSample {
            p_film: Point2f::new(50.0, 50.0),
        });

        assert_eq!(weight, 1.0);
        assert_abs_diff_eq!(ray.origin, eye, epsilon = 1e-4);
        assert_abs_diff_eq!(ray.dir, vec3f!(0, 0, 1), epsilon = 1e-4);
    }

    #[test]
    fn test_corner_rays_diverge() {
        let camera = test_camera(point3f!(0, 0, -5), point3f!(0, 0, 0));
        let (top_left, _) = camera.casting_ray(&CameraSample {
            p_film: Point2f::new(0.0, 0.0),
        });
        let (bottom_right, _) = camera.casting_ray(&CameraSample {
            p_film: Point2f::new(100.0, 100.0),
        });

        assert!(top_left.dir.dot(bottom_right.dir) < 1.0 - 1e-3);
        // Raster y grows downward, so the top-left ray looks up.
        assert!(top_left.dir.y > 0.0);
        assert!(top_left.dir.x < 0.0);
        assert_abs_diff_eq!(top_left.dir.magnitude(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_image_plane_area_square_fov() {
        // For a square image with fov 90 the plane at z = 1 is 2 x 2.
        let film = Film::new(
            Point2i::new(64, 64),
            Bounds2f::with_bounds(Point2f::new(0.0, 0.0), Point2f::new(1.0, 1.0)),
            Box::new(BoxFilter::new(Vec2f::new(0.5, 0.5))),
            PathBuf::from("test.png"),
            35.0,
            1.0,
            INFINITY,
        );
        let camera =
            PerspectiveCamera::new(Transform::identity(), 90.0, film);
        assert_abs_diff_eq!(camera.image_plane_area, 4.0, epsilon = 1e-3);
    }
}
