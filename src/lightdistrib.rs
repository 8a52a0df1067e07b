use crate::sampling::Distribution1D;
use crate::scene::Scene;
use crate::Point3f;

/// Maps a shading point to a distribution over the scene's lights.
pub trait LightDistribution: Send + Sync {
    fn lookup(&self, p: Point3f) -> &Distribution1D;
}

/// Samples every light with equal probability, independent of position.
pub struct UniformLightDistribution {
    distrib: Distribution1D,
}

impl UniformLightDistribution {
    pub fn new(scene: &Scene) -> Self {
        Self {
            distrib: Distribution1D::new(vec![1.0; scene.lights.len()]),
        }
    }
}

impl LightDistribution for UniformLightDistribution {
    fn lookup(&self, _p: Point3f) -> &Distribution1D {
        &self.distrib
    }
}

pub fn create_light_sample_distribution(
    _name: &str,
    scene: &Scene,
) -> Box<dyn LightDistribution> {
    Box::new(UniformLightDistribution::new(scene))
}
