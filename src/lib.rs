#[macro_use]
pub mod macros; // must stay at the top

pub mod camera;
pub mod err_float;
pub mod film;
pub mod filter;
pub mod fresnel;
pub mod geometry;
pub mod integrator;
pub mod interaction;
pub mod kdtree;
pub mod light;
pub mod lightdistrib;
pub mod loaders;
pub mod material;
pub mod primitive;
pub mod reflection;
pub mod sampler;
pub mod sampling;
pub mod scene;
pub mod shape;
pub mod spectrum;

pub use geometry::bounds::{Bounds2, Bounds2f, Bounds2i, Bounds3, Bounds3f};
pub use geometry::transform::Transform;
pub use geometry::{
    abs_dot, coordinate_system, distance, distance_squared, face_forward, max_dimension, permute,
    spherical_direction_in_frame, ComponentWiseExt, Ray,
};
pub use interaction::{Interaction, SurfaceInteraction};
pub use spectrum::Spectrum;

pub type Float = f32;

pub type Point2f = cgmath::Point2<Float>;
pub type Point2i = cgmath::Point2<i32>;
pub type Point3f = cgmath::Point3<Float>;
pub type Vec2f = cgmath::Vector2<Float>;
pub type Vec2i = cgmath::Vector2<i32>;
pub type Vec3f = cgmath::Vector3<Float>;

pub const INFINITY: Float = Float::INFINITY;
pub const SHADOW_EPSILON: Float = 1e-4;
pub const INV_4_PI: Float = 0.079_577_47;

/// Largest representable float strictly below 1; keeps remapped samples in [0, 1).
pub const ONE_MINUS_EPSILON: Float = 0.999_999_94;

/// Scalar types the bounds types are generic over.
pub trait Scalar: cgmath::BaseNum + num::Bounded {
    fn min(self, other: Self) -> Self;
    fn max(self, other: Self) -> Self;
}

impl Scalar for f32 {
    fn min(self, other: Self) -> Self {
        self.min(other)
    }

    fn max(self, other: Self) -> Self {
        self.max(other)
    }
}

impl Scalar for i32 {
    fn min(self, other: Self) -> Self {
        Ord::min(self, other)
    }

    fn max(self, other: Self) -> Self {
        Ord::max(self, other)
    }
}
