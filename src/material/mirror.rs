use crate::fresnel::FresnelNoOp;
use crate::interaction::SurfaceInteraction;
use crate::material::{Material, TransportMode};
use crate::reflection::bsdf::Bsdf;
use crate::reflection::SpecularReflection;
use crate::spectrum::Spectrum;
use bumpalo::Bump;

/// A perfect mirror.
pub struct MirrorMaterial {
    reflectance: Spectrum,
}

impl MirrorMaterial {
    pub fn new(reflectance: Spectrum) -> Self {
        Self { reflectance }
    }
}

impl Material for MirrorMaterial {
    fn compute_scattering_functions<'a>(
        &self,
        si: &SurfaceInteraction,
        arena: &'a Bump,
        _mode: TransportMode,
        _allow_multiple_lobes: bool,
    ) -> Bsdf<'a> {
        let mut bsdf = Bsdf::new(si, 1.0);

        let r = self.reflectance.clamp_positive();
        if !r.is_black() {
            bsdf.add(arena.alloc(SpecularReflection::new(r, FresnelNoOp)));
        }
        bsdf
    }
}
