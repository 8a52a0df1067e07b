use crate::interaction::SurfaceInteraction;
use crate::reflection::bsdf::Bsdf;
use bumpalo::Bump;

pub mod glass;
pub mod matte;
pub mod mirror;

/// Whether a path carries radiance (from lights) or importance (from the
/// camera); specular transmission scales differently for the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Radiance,
    Importance,
}

pub trait Material: Send + Sync {
    /// Allocates this material's lobes into `arena` and assembles the BSDF
    /// for the given surface point.
    fn compute_scattering_functions<'a>(
        &self,
        si: &SurfaceInteraction,
        arena: &'a Bump,
        mode: TransportMode,
        allow_multiple_lobes: bool,
    ) -> Bsdf<'a>;
}
