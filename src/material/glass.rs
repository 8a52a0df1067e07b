use crate::fresnel::FresnelDielectric;
use crate::interaction::SurfaceInteraction;
use crate::material::{Material, TransportMode};
use crate::reflection::bsdf::Bsdf;
use crate::reflection::{SpecularReflection, SpecularTransmission};
use crate::spectrum::Spectrum;
use crate::Float;
use bumpalo::Bump;

/// Smooth dielectric: a specular reflection lobe plus a specular
/// transmission lobe weighted by the Fresnel terms.
pub struct GlassMaterial {
    reflectance: Spectrum,
    transmittance: Spectrum,
    eta: Float,
}

impl GlassMaterial {
    pub fn new(reflectance: Spectrum, transmittance: Spectrum, eta: Float) -> Self {
        Self {
            reflectance,
            transmittance,
            eta,
        }
    }
}

impl Material for GlassMaterial {
    fn compute_scattering_functions<'a>(
        &self,
        si: &SurfaceInteraction,
        arena: &'a Bump,
        mode: TransportMode,
        _allow_multiple_lobes: bool,
    ) -> Bsdf<'a> {
        let mut bsdf = Bsdf::new(si, self.eta);

        let r = self.reflectance.clamp_positive();
        let t = self.transmittance.clamp_positive();

        if !r.is_black() {
            let fresnel = FresnelDielectric::new(1.0, self.eta);
            bsdf.add(arena.alloc(SpecularReflection::new(r, fresnel)));
        }
        if !t.is_black() {
            bsdf.add(arena.alloc(SpecularTransmission::new(t, 1.0, self.eta, mode)));
        }
        bsdf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::BxDFType;

    #[test]
    fn test_glass_carries_both_specular_lobes() {
        let si = SurfaceInteraction::new(
            point3f!(0, 0, 0),
            point2f!(0, 0),
            vec3f!(0, 0, 1),
            vec3f!(1, 0, 0),
            vec3f!(0, 1, 0),
        );
        let arena = Bump::new();
        let material = GlassMaterial::new(Spectrum::new(1.0), Spectrum::new(1.0), 1.5);
        let bsdf = material.compute_scattering_functions(
            &si,
            &arena,
            TransportMode::Radiance,
            true,
        );
        assert_eq!(bsdf.num_components(BxDFType::all()), 2);
        assert_eq!(
            bsdf.num_components(BxDFType::SPECULAR | BxDFType::TRANSMISSION),
            1
        );
        assert_eq!(bsdf.eta, 1.5);
    }
}
