use crate::interaction::Interaction;
use crate::scene::Scene;
use crate::spectrum::Spectrum;
use crate::{Float, Point2f, Ray, Vec3f};
use bitflags::bitflags;

pub mod diffuse;
pub mod infinite;

bitflags! {
    pub struct LightFlags: u8 {
        const DELTA_POSITION = 1;
        const DELTA_DIRECTION = 1 << 1;
        const AREA = 1 << 2;
        const INFINITE = 1 << 3;
    }
}

pub fn is_delta_light(flags: LightFlags) -> bool {
    flags.intersects(LightFlags::DELTA_POSITION | LightFlags::DELTA_DIRECTION)
}

/// An incident-radiance sample toward a light.
pub struct LiSample {
    pub radiance: Spectrum,

    /// Direction *towards* the illumination.
    pub wi: Vec3f,

    /// Pdf with respect to solid angle at the receiving point.
    pub pdf: Float,

    pub vis: VisibilityTester,
}

/// An emitted-ray sample leaving a light.
pub struct LeSample {
    pub radiance: Spectrum,
    pub ray: Ray,
    pub n_light: Vec3f,
    pub pdf_pos: Float,
    pub pdf_dir: Float,
}

pub trait Light: Send + Sync {
    fn flags(&self) -> LightFlags;

    fn n_samples(&self) -> usize {
        1
    }

    fn power(&self) -> Spectrum;

    /// Samples a direction from `reference` toward the light, returning the
    /// incident radiance along it.
    fn sample_li(&self, reference: &Interaction, u: Point2f) -> LiSample;

    /// Solid-angle pdf of `sample_li` generating the direction `wi`.
    fn pdf_li(&self, reference: &Interaction, wi: Vec3f) -> Float;

    /// Radiance added to rays that escape the scene.
    fn le(&self, _ray: &Ray) -> Spectrum {
        Spectrum::new(0.0)
    }

    /// Samples a ray leaving the light, for transport starting at emitters.
    fn sample_le(&self, u1: Point2f, u2: Point2f) -> LeSample;

    /// Positional and directional pdfs of `sample_le` producing `ray`.
    fn pdf_le(&self, ray: &Ray, n_light: Vec3f) -> (Float, Float);
}

pub trait AreaLight: Light {
    /// Radiance emitted from a point on the light's surface in direction `w`.
    fn l(&self, intr: &Interaction, w: Vec3f) -> Spectrum;
}

pub struct VisibilityTester {
    pub p0: Interaction,
    pub p1: Interaction,
}

impl VisibilityTester {
    pub fn new(p0: Interaction, p1: Interaction) -> Self {
        Self { p0, p1 }
    }

    /// True when the shortened shadow ray between the two points hits nothing.
    pub fn unoccluded(&self, scene: &Scene) -> bool {
        !scene.intersect_test(&self.p0.spawn_ray_to(&self.p1))
    }

    /// Transmittance along the segment; participating media are not modeled,
    /// so this is unity. The signature is kept for API stability.
    pub fn tr(&self, _scene: &Scene) -> Spectrum {
        Spectrum::new(1.0)
    }
}
