use crate::{Float, Point2f, Vec2f, Vec3f};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

pub fn concentric_sample_disk(u: Point2f) -> Point2f {
    // map sample from [0, 1] to [-1, 1]
    let u_offset = 2.0 * Vec2f::new(u.x, u.y) - Vec2f::new(1.0, 1.0);
    if u_offset.x == 0.0 && u_offset.y == 0.0 {
        return Point2f::new(0.0, 0.0);
    }

    let (r, theta) = if u_offset.x.abs() > u_offset.y.abs() {
        (u_offset.x, FRAC_PI_4 * (u_offset.y / u_offset.x))
    } else {
        (u_offset.y, FRAC_PI_2 - FRAC_PI_4 * (u_offset.x / u_offset.y))
    };

    Point2f::new(r * theta.cos(), r * theta.sin())
}

pub fn cosine_sample_hemisphere(u: Point2f) -> Vec3f {
    let d = concentric_sample_disk(u);
    let z = Float::sqrt(Float::max(0.0, 1.0 - d.x * d.x - d.y * d.y));
    Vec3f::new(d.x, d.y, z)
}

pub fn cosine_hemisphere_pdf(cos_theta: Float) -> Float {
    cos_theta * std::f32::consts::FRAC_1_PI
}

pub fn uniform_sample_sphere(u: Point2f) -> Vec3f {
    let z = 1.0 - 2.0 * u[0];
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u[1];
    Vec3f::new(r * phi.cos(), r * phi.sin(), z)
}

pub fn uniform_sphere_pdf() -> Float {
    crate::INV_4_PI
}

pub fn uniform_cone_pdf(cos_theta_max: Float) -> Float {
    1.0 / (2.0 * PI * (1.0 - cos_theta_max))
}

/// Uniform barycentric coordinates over a triangle.
pub fn uniform_sample_triangle(u: Point2f) -> Point2f {
    let su0 = u[0].sqrt();
    Point2f::new(1.0 - su0, u[1] * su0)
}

/// Power heuristic with beta = 2 for combining two sampling strategies.
pub fn power_heuristic(nf: u32, f_pdf: Float, ng: u32, g_pdf: Float) -> Float {
    let f = nf as Float * f_pdf;
    let g = ng as Float * g_pdf;
    (f * f) / (f * f + g * g)
}

/// Binary search for the largest index where `pred` holds, clamped so the
/// result always brackets a valid CDF segment.
pub fn find_interval<F: Fn(usize) -> bool>(size: usize, pred: F) -> usize {
    let mut first = 0;
    let mut len = size;
    while len > 0 {
        let half = len >> 1;
        let middle = first + half;
        if pred(middle) {
            first = middle + 1;
            len -= half + 1;
        } else {
            len = half;
        }
    }
    (first as isize - 1).clamp(0, size as isize - 2) as usize
}

/// A piecewise-constant 1D distribution with its CDF.
pub struct Distribution1D {
    pub func: Vec<Float>,
    pub cdf: Vec<Float>,
    pub func_int: Float,
}

impl Distribution1D {
    pub fn new(func: Vec<Float>) -> Self {
        let n = func.len();
        let mut cdf = vec![0.0; n + 1];
        for i in 1..=n {
            cdf[i] = cdf[i - 1] + func[i - 1] / n as Float;
        }

        let func_int = cdf[n];
        if func_int == 0.0 {
            for (i, x) in cdf[1..].iter_mut().enumerate() {
                *x = (i + 1) as Float / n as Float;
            }
        } else {
            for x in cdf[1..].iter_mut() {
                *x /= func_int;
            }
        }

        Self { func, cdf, func_int }
    }

    pub fn count(&self) -> usize {
        self.func.len()
    }

    /// Samples a discrete index; returns (index, pdf).
    pub fn sample_discrete(&self, u: Float) -> (usize, Float) {
        let offset = find_interval(self.cdf.len(), |i| self.cdf[i] <= u);
        (offset, self.discrete_pdf(offset))
    }

    pub fn discrete_pdf(&self, index: usize) -> Float {
        if self.func_int > 0.0 {
            self.func[index] / (self.func_int * self.count() as Float)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    #[test]
    fn test_cosine_hemisphere_upper_and_density() {
        let mut rng = Pcg32::seed_from_u64(7);
        const N: usize = 200_000;
        const BINS: usize = 10;
        let mut counts = [0usize; BINS];

        for _ in 0..N {
            let w = cosine_sample_hemisphere(Point2f::new(rng.gen(), rng.gen()));
            assert!(w.z >= 0.0);
            let bin = ((w.z * BINS as Float) as usize).min(BINS - 1);
            counts[bin] += 1;
        }

        // p(cos theta = z) over z in [0, 1] is 2z, so the expected mass of bin
        // [a, b] is b^2 - a^2. A chi-square test over 10 bins at this sample
        // count has a comfortably tiny failure probability at 1% tolerance.
        let mut chi2 = 0.0;
        for (i, &count) in counts.iter().enumerate() {
            let a = i as Float / BINS as Float;
            let b = (i + 1) as Float / BINS as Float;
            let expected = (b * b - a * a) * N as Float;
            let diff = count as Float - expected;
            chi2 += diff * diff / expected;
        }
        // 9 degrees of freedom; critical value at p = 0.001 is 27.9.
        assert!(chi2 < 27.9, "chi2 = {}", chi2);
    }

    #[test]
    fn test_uniform_sphere_unit_length() {
        let mut rng = Pcg32::seed_from_u64(1);
        for _ in 0..1000 {
            let w = uniform_sample_sphere(Point2f::new(rng.gen(), rng.gen()));
            assert_abs_diff_eq!(w.x * w.x + w.y * w.y + w.z * w.z, 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_power_heuristic_complementary() {
        let cases = [(0.5, 0.5), (1.0, 3.0), (10.0, 0.1), (1e-3, 1e3)];
        for &(a, b) in &cases {
            let sum = power_heuristic(1, a, 1, b) + power_heuristic(1, b, 1, a);
            assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_uniform_triangle_barycentric_valid() {
        let mut rng = Pcg32::seed_from_u64(2);
        for _ in 0..1000 {
            let b = uniform_sample_triangle(Point2f::new(rng.gen(), rng.gen()));
            assert!(b.x >= 0.0 && b.y >= 0.0 && b.x + b.y <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn test_distribution_discrete_uniform_histogram() {
        const N: usize = 8;
        let d = Distribution1D::new(vec![1.0; N]);
        let mut rng = Pcg32::seed_from_u64(3);
        let mut counts = [0usize; N];

        for _ in 0..80_000 {
            let (idx, pdf) = d.sample_discrete(rng.gen());
            assert!(idx < N);
            assert_abs_diff_eq!(pdf, 1.0 / N as Float, epsilon = 1e-6);
            counts[idx] += 1;
        }

        for &c in &counts {
            let expected = 80_000.0 / N as Float;
            assert!((c as Float - expected).abs() < expected * 0.1);
        }
    }

    #[test]
    fn test_distribution_weighted() {
        let d = Distribution1D::new(vec![1.0, 3.0]);
        assert_abs_diff_eq!(d.discrete_pdf(0), 0.25);
        assert_abs_diff_eq!(d.discrete_pdf(1), 0.75);
        // u below the first CDF step picks index 0
        assert_eq!(d.sample_discrete(0.1).0, 0);
        assert_eq!(d.sample_discrete(0.9).0, 1);
    }

    #[test]
    fn test_distribution_zero_function() {
        let d = Distribution1D::new(vec![0.0; 4]);
        let (idx, pdf) = d.sample_discrete(0.6);
        assert!(idx < 4);
        assert_eq!(pdf, 0.0);
    }

    #[test]
    fn test_concentric_disk_in_unit_disk() {
        let mut rng = Pcg32::seed_from_u64(4);
        for _ in 0..1000 {
            let p = concentric_sample_disk(Point2f::new(rng.gen(), rng.gen()));
            assert!(p.x * p.x + p.y * p.y <= 1.0 + 1e-6);
        }
    }
}
