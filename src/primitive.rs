use crate::interaction::SurfaceInteraction;
use crate::light::AreaLight;
use crate::material::{Material, TransportMode};
use crate::reflection::bsdf::Bsdf;
use crate::shape::Shape;
use crate::{Bounds3f, Ray};
use bumpalo::Bump;
use std::sync::Arc;

/// Anything a ray can hit: a single shape with appearance, or an aggregate
/// that delegates to an acceleration structure.
pub trait Primitive: Send + Sync {
    fn world_bound(&self) -> Bounds3f;

    /// Closest hit; shrinks `ray.t_max` so later tests only find nearer hits.
    fn intersect<'a>(&'a self, ray: &mut Ray) -> Option<SurfaceInteraction<'a>>;

    /// Predicate-only intersection for shadow rays.
    fn intersect_test(&self, ray: &Ray) -> bool;

    fn area_light(&self) -> Option<&dyn AreaLight>;

    fn material(&self) -> Option<&dyn Material>;

    fn compute_scattering_functions<'b>(
        &self,
        si: &SurfaceInteraction,
        arena: &'b Bump,
        mode: TransportMode,
        allow_multiple_lobes: bool,
    ) -> Option<Bsdf<'b>>;
}

/// A single shape paired with its material and, if emissive, its area light.
/// The primitive owns the shape; the area light shares it by `Arc`, and the
/// shape refers back to neither.
pub struct GeometricPrimitive {
    pub shape: Arc<dyn Shape>,
    pub material: Option<Arc<dyn Material>>,
    pub area_light: Option<Arc<dyn AreaLight>>,
}

impl GeometricPrimitive {
    pub fn new(
        shape: Arc<dyn Shape>,
        material: Option<Arc<dyn Material>>,
        area_light: Option<Arc<dyn AreaLight>>,
    ) -> Self {
        Self {
            shape,
            material,
            area_light,
        }
    }
}

impl Primitive for GeometricPrimitive {
    fn world_bound(&self) -> Bounds3f {
        self.shape.world_bound()
    }

    fn intersect<'a>(&'a self, ray: &mut Ray) -> Option<SurfaceInteraction<'a>> {
        let (t_hit, mut isect) = self.shape.intersect(ray)?;
        ray.t_max = t_hit;
        isect.primitive = Some(self);
        Some(isect)
    }

    fn intersect_test(&self, ray: &Ray) -> bool {
        self.shape.intersect_test(ray)
    }

    fn area_light(&self) -> Option<&dyn AreaLight> {
        self.area_light.as_deref()
    }

    fn material(&self) -> Option<&dyn Material> {
        self.material.as_deref()
    }

    fn compute_scattering_functions<'b>(
        &self,
        si: &SurfaceInteraction,
        arena: &'b Bump,
        mode: TransportMode,
        allow_multiple_lobes: bool,
    ) -> Option<Bsdf<'b>> {
        self.material
            .as_ref()
            .map(|m| m.compute_scattering_functions(si, arena, mode, allow_multiple_lobes))
    }
}
