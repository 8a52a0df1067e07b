use crate::fresnel::{Fresnel, FresnelDielectric};
use crate::material::TransportMode;
use crate::sampling::cosine_sample_hemisphere;
use crate::spectrum::Spectrum;
use crate::{face_forward, Float, Point2f, Vec3f};
use bitflags::bitflags;
use cgmath::InnerSpace;
use std::f32::consts::FRAC_1_PI;
use std::fmt::Debug;

pub mod bsdf;

bitflags! {
    pub struct BxDFType: u8 {
        const REFLECTION = 1;
        const TRANSMISSION = 1 << 1;
        const DIFFUSE = 1 << 2;
        const GLOSSY = 1 << 3;
        const SPECULAR = 1 << 4;
    }
}

// Directions below are in the shading frame, so trigonometry reduces to
// component access.
pub fn cos_theta(w: Vec3f) -> Float {
    w.z
}

pub fn abs_cos_theta(w: Vec3f) -> Float {
    w.z.abs()
}

pub fn same_hemisphere(w: Vec3f, wp: Vec3f) -> bool {
    w.z * wp.z > 0.0
}

/// Refraction via Snell's law; `None` on total internal reflection.
pub fn refract(wi: Vec3f, n: Vec3f, eta: Float) -> Option<Vec3f> {
    let cos_theta_i = n.dot(wi);
    let sin2_theta_i = (1.0 - cos_theta_i * cos_theta_i).max(0.0);
    let sin2_theta_t = eta * eta * sin2_theta_i;
    if sin2_theta_t >= 1.0 {
        return None;
    }
    let cos_theta_t = (1.0 - sin2_theta_t).sqrt();
    Some(eta * -wi + (eta * cos_theta_i - cos_theta_t) * n)
}

#[derive(Clone, Copy)]
pub struct ScatterSample {
    pub f: Spectrum,
    pub wi: Vec3f,
    pub pdf: Float,
    pub sampled_type: BxDFType,
}

/// One scattering lobe of a BSDF. Directions are in the local shading frame.
pub trait BxDF: Debug {
    fn get_type(&self) -> BxDFType;

    fn matches_flags(&self, t: BxDFType) -> bool {
        t.contains(self.get_type())
    }

    /// Value of the distribution function for the given pair of directions.
    fn f(&self, wo: Vec3f, wi: Vec3f) -> Spectrum;

    /// Samples an incident direction for `wo`; cosine-weighted over the
    /// hemisphere unless the lobe overrides it.
    fn sample_f(&self, wo: Vec3f, u: Point2f) -> Option<ScatterSample> {
        let mut wi = cosine_sample_hemisphere(u);
        if wo.z < 0.0 {
            wi.z *= -1.0;
        }
        let pdf = self.pdf(wo, wi);
        if pdf == 0.0 {
            return None;
        }
        Some(ScatterSample {
            f: self.f(wo, wi),
            wi,
            pdf,
            sampled_type: self.get_type(),
        })
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f) -> Float {
        if same_hemisphere(wo, wi) {
            abs_cos_theta(wi) * FRAC_1_PI
        } else {
            0.0
        }
    }
}

#[derive(Debug)]
pub struct LambertianReflection {
    pub r: Spectrum,
}

impl BxDF for LambertianReflection {
    fn get_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::DIFFUSE
    }

    fn f(&self, _wo: Vec3f, _wi: Vec3f) -> Spectrum {
        self.r * FRAC_1_PI
    }
}

#[derive(Debug)]
pub struct SpecularReflection<F: Fresnel> {
    r: Spectrum,
    fresnel: F,
}

impl<F: Fresnel> SpecularReflection<F> {
    pub fn new(r: Spectrum, fresnel: F) -> Self {
        Self { r, fresnel }
    }
}

impl<F: Fresnel> BxDF for SpecularReflection<F> {
    fn get_type(&self) -> BxDFType {
        BxDFType::REFLECTION | BxDFType::SPECULAR
    }

    fn f(&self, _wo: Vec3f, _wi: Vec3f) -> Spectrum {
        Spectrum::new(0.0)
    }

    fn sample_f(&self, wo: Vec3f, _u: Point2f) -> Option<ScatterSample> {
        let wi = Vec3f::new(-wo.x, -wo.y, wo.z);
        let f = self.fresnel.evaluate(cos_theta(wi)) * self.r / abs_cos_theta(wi);
        Some(ScatterSample {
            f,
            wi,
            pdf: 1.0,
            sampled_type: self.get_type(),
        })
    }

    fn pdf(&self, _wo: Vec3f, _wi: Vec3f) -> Float {
        0.0
    }
}

#[derive(Debug)]
pub struct SpecularTransmission {
    t: Spectrum,
    eta_a: Float,
    eta_b: Float,
    fresnel: FresnelDielectric,
    mode: TransportMode,
}

impl SpecularTransmission {
    pub fn new(t: Spectrum, eta_a: Float, eta_b: Float, mode: TransportMode) -> Self {
        Self {
            t,
            eta_a,
            eta_b,
            fresnel: FresnelDielectric::new(eta_a, eta_b),
            mode,
        }
    }
}

impl BxDF for SpecularTransmission {
    fn get_type(&self) -> BxDFType {
        BxDFType::TRANSMISSION | BxDFType::SPECULAR
    }

    fn f(&self, _wo: Vec3f, _wi: Vec3f) -> Spectrum {
        Spectrum::new(0.0)
    }

    fn sample_f(&self, wo: Vec3f, _u: Point2f) -> Option<ScatterSample> {
        // Which eta is incident depends on which side wo leaves from.
        let entering = cos_theta(wo) > 0.0;
        let eta_i = if entering { self.eta_a } else { self.eta_b };
        let eta_t = if entering { self.eta_b } else { self.eta_a };

        let wi = refract(
            wo,
            face_forward(Vec3f::new(0.0, 0.0, 1.0), wo),
            eta_i / eta_t,
        )?;

        let mut ft = self.t * (Spectrum::new(1.0) - self.fresnel.evaluate(cos_theta(wi)));
        // Account for non-symmetry with transmission to a different medium.
        if self.mode == TransportMode::Radiance {
            ft *= (eta_i * eta_i) / (eta_t * eta_t);
        }

        Some(ScatterSample {
            f: ft / abs_cos_theta(wi),
            wi,
            pdf: 1.0,
            sampled_type: self.get_type(),
        })
    }

    fn pdf(&self, _wo: Vec3f, _wi: Vec3f) -> Float {
        0.0
    }
}
