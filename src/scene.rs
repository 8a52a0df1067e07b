use crate::interaction::SurfaceInteraction;
use crate::kdtree::KdTree;
use crate::light::{Light, LightFlags};
use crate::primitive::Primitive;
use crate::{Bounds3f, Ray};
use std::sync::Arc;

/// Everything the integrators see: lights plus the accelerated aggregate.
/// Immutable once built and shared by reference across workers.
pub struct Scene {
    pub lights: Vec<Arc<dyn Light>>,
    pub infinite_lights: Vec<Arc<dyn Light>>,
    aggregate: KdTree,
    world_bound: Bounds3f,
}

impl Scene {
    pub fn new(aggregate: KdTree, lights: Vec<Arc<dyn Light>>) -> Self {
        let world_bound = aggregate.world_bound();
        let infinite_lights = lights
            .iter()
            .filter(|l| l.flags().contains(LightFlags::INFINITE))
            .cloned()
            .collect();

        Self {
            lights,
            infinite_lights,
            aggregate,
            world_bound,
        }
    }

    pub fn world_bound(&self) -> Bounds3f {
        self.world_bound
    }

    pub fn intersect<'a>(&'a self, ray: &mut Ray) -> Option<SurfaceInteraction<'a>> {
        self.aggregate.intersect(ray)
    }

    pub fn intersect_test(&self, ray: &Ray) -> bool {
        self.aggregate.intersect_test(ray)
    }
}
