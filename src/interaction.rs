use crate::material::TransportMode;
use crate::primitive::Primitive;
use crate::reflection::bsdf::Bsdf;
use crate::spectrum::Spectrum;
use crate::{face_forward, Point2f, Point3f, Ray, Vec3f, SHADOW_EPSILON};
use bumpalo::Bump;
use cgmath::{InnerSpace, Zero};

/// A bare point on a surface (or in space), enough to spawn rays from and to
/// sample lights against.
#[derive(Clone, Copy, Debug)]
pub struct Interaction {
    pub p: Point3f,
    pub n: Vec3f,
    pub wo: Vec3f,
}

impl Interaction {
    pub fn new(p: Point3f, n: Vec3f, wo: Vec3f) -> Self {
        Self { p, n, wo }
    }

    pub fn from_point(p: Point3f) -> Self {
        Self {
            p,
            n: Vec3f::zero(),
            wo: Vec3f::zero(),
        }
    }

    /// Rays leave from just off the surface, on the side `d` points to, so a
    /// spawned ray cannot re-hit its own origin.
    pub fn spawn_ray(&self, d: Vec3f) -> Ray {
        let o = self.p + face_forward(self.n, d) * SHADOW_EPSILON;
        Ray::new(o, d)
    }

    /// A shadow ray toward `it`, shortened so it stops just before the target.
    pub fn spawn_ray_to(&self, it: &Interaction) -> Ray {
        let o = self.p + face_forward(self.n, it.p - self.p) * SHADOW_EPSILON;
        let d = it.p - o;
        let dist = d.magnitude();
        Ray::with_t_max(o, d / dist, dist * (1.0 - SHADOW_EPSILON))
    }
}

/// A ray/surface intersection: hit point, shading frame partials, and a
/// borrow of the primitive that produced it.
pub struct SurfaceInteraction<'a> {
    pub p: Point3f,
    pub n: Vec3f,
    pub wo: Vec3f,
    pub uv: Point2f,
    pub dpdu: Vec3f,
    pub dpdv: Vec3f,
    pub primitive: Option<&'a dyn Primitive>,
}

impl<'a> SurfaceInteraction<'a> {
    pub fn new(p: Point3f, uv: Point2f, wo: Vec3f, dpdu: Vec3f, dpdv: Vec3f) -> Self {
        Self {
            p,
            n: dpdu.cross(dpdv).normalize(),
            wo: wo.normalize(),
            uv,
            dpdu,
            dpdv,
            primitive: None,
        }
    }

    pub fn as_interaction(&self) -> Interaction {
        Interaction::new(self.p, self.n, self.wo)
    }

    pub fn spawn_ray(&self, d: Vec3f) -> Ray {
        self.as_interaction().spawn_ray(d)
    }

    pub fn spawn_ray_to(&self, it: &Interaction) -> Ray {
        self.as_interaction().spawn_ray_to(it)
    }

    /// Emitted radiance if the hit primitive carries an area light.
    pub fn le(&self, w: Vec3f) -> Spectrum {
        self.primitive
            .and_then(|prim| prim.area_light())
            .map_or(Spectrum::new(0.0), |light| {
                light.l(&self.as_interaction(), w)
            })
    }

    /// Builds the BSDF for this hit into `arena`. `None` means an optically
    /// inactive surface the integrator should pass straight through.
    pub fn compute_scattering_functions<'b>(
        &self,
        arena: &'b Bump,
        mode: TransportMode,
        allow_multiple_lobes: bool,
    ) -> Option<Bsdf<'b>> {
        self.primitive
            .expect("interaction has no primitive")
            .compute_scattering_functions(self, arena, mode, allow_multiple_lobes)
    }
}

impl std::fmt::Debug for SurfaceInteraction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceInteraction")
            .field("p", &self.p)
            .field("n", &self.n)
            .field("wo", &self.wo)
            .field("uv", &self.uv)
            .finish()
    }
}
