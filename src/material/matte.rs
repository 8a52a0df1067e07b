use crate::interaction::SurfaceInteraction;
use crate::material::{Material, TransportMode};
use crate::reflection::bsdf::Bsdf;
use crate::reflection::LambertianReflection;
use crate::spectrum::Spectrum;
use bumpalo::Bump;

/// Purely diffuse reflection with constant reflectance.
pub struct MatteMaterial {
    diffuse: Spectrum,
}

impl MatteMaterial {
    pub fn new(diffuse: Spectrum) -> Self {
        Self { diffuse }
    }
}

impl Material for MatteMaterial {
    fn compute_scattering_functions<'a>(
        &self,
        si: &SurfaceInteraction,
        arena: &'a Bump,
        _mode: TransportMode,
        _allow_multiple_lobes: bool,
    ) -> Bsdf<'a> {
        let mut bsdf = Bsdf::new(si, 1.0);

        let r = self.diffuse.clamp_positive();
        if !r.is_black() {
            bsdf.add(arena.alloc(LambertianReflection { r }));
        }
        bsdf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::BxDFType;

    #[test]
    fn test_matte_has_single_diffuse_lobe() {
        let si = SurfaceInteraction::new(
            point3f!(0, 0, 0),
            point2f!(0, 0),
            vec3f!(0, 0, 1),
            vec3f!(1, 0, 0),
            vec3f!(0, 1, 0),
        );
        let arena = Bump::new();
        let material = MatteMaterial::new(Spectrum::new(0.5));
        let bsdf = material.compute_scattering_functions(
            &si,
            &arena,
            TransportMode::Radiance,
            false,
        );
        assert_eq!(bsdf.num_components(BxDFType::all()), 1);
        assert_eq!(bsdf.num_components(BxDFType::SPECULAR), 0);
    }

    #[test]
    fn test_black_reflectance_adds_no_lobe() {
        let si = SurfaceInteraction::new(
            point3f!(0, 0, 0),
            point2f!(0, 0),
            vec3f!(0, 0, 1),
            vec3f!(1, 0, 0),
            vec3f!(0, 1, 0),
        );
        let arena = Bump::new();
        let material = MatteMaterial::new(Spectrum::new(0.0));
        let bsdf = material.compute_scattering_functions(
            &si,
            &arena,
            TransportMode::Radiance,
            false,
        );
        assert_eq!(bsdf.num_components(BxDFType::all()), 0);
    }
}
