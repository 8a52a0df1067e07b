use crate::sampler::Sampler;
use crate::{Float, Point2f, Point2i};
use rand::Rng;
use rand_pcg::Pcg32;

const PCG32_DEFAULT_STATE: u64 = 0x853c49e6748fea9b;

/// A sampler that draws independent uniform variates from a PCG32 stream,
/// ignoring pixel locality.
pub struct RandomSampler {
    samples_per_pixel: u64,
    rng: Pcg32,
    current_pixel_sample: u64,

    samples_1d_sizes: Vec<usize>,
    samples_2d_sizes: Vec<usize>,
    sample_array_1d: Vec<Vec<Float>>,
    sample_array_2d: Vec<Vec<Point2f>>,
    array_1d_offset: usize,
    array_2d_offset: usize,
}

impl RandomSampler {
    pub fn new(samples_per_pixel: u64, seed: u64) -> Self {
        Self {
            samples_per_pixel,
            rng: Pcg32::new(PCG32_DEFAULT_STATE, seed),
            current_pixel_sample: 0,
            samples_1d_sizes: Vec::new(),
            samples_2d_sizes: Vec::new(),
            sample_array_1d: Vec::new(),
            sample_array_2d: Vec::new(),
            array_1d_offset: 0,
            array_2d_offset: 0,
        }
    }
}

impl Sampler for RandomSampler {
    fn start_pixel(&mut self, _pixel: Point2i) {
        // Refill the registered sample arrays for this pixel.
        for array in &mut self.sample_array_1d {
            for v in array.iter_mut() {
                *v = self.rng.gen();
            }
        }
        for array in &mut self.sample_array_2d {
            for v in array.iter_mut() {
                *v = Point2f::new(self.rng.gen(), self.rng.gen());
            }
        }

        self.current_pixel_sample = 0;
        self.array_1d_offset = 0;
        self.array_2d_offset = 0;
    }

    fn start_next_sample(&mut self) -> bool {
        self.array_1d_offset = 0;
        self.array_2d_offset = 0;
        self.current_pixel_sample += 1;
        self.current_pixel_sample <= self.samples_per_pixel
    }

    fn get_1d(&mut self) -> Float {
        self.rng.gen()
    }

    fn get_2d(&mut self) -> Point2f {
        Point2f::new(self.rng.gen(), self.rng.gen())
    }

    fn request_1d_array(&mut self, n: usize) {
        self.samples_1d_sizes.push(n);
        self.sample_array_1d
            .push(vec![0.0; n * self.samples_per_pixel as usize]);
    }

    fn request_2d_array(&mut self, n: usize) {
        self.samples_2d_sizes.push(n);
        self.sample_array_2d
            .push(vec![Point2f::new(0.0, 0.0); n * self.samples_per_pixel as usize]);
    }

    fn get_1d_array(&mut self, n: usize) -> Option<&[Float]> {
        if self.array_1d_offset == self.sample_array_1d.len() {
            return None;
        }
        debug_assert_eq!(self.samples_1d_sizes[self.array_1d_offset], n);
        let sample_index = (self.current_pixel_sample.max(1) - 1) as usize;
        let array = &self.sample_array_1d[self.array_1d_offset];
        self.array_1d_offset += 1;
        Some(&array[sample_index * n..(sample_index + 1) * n])
    }

    fn get_2d_array(&mut self, n: usize) -> Option<&[Point2f]> {
        if self.array_2d_offset == self.sample_array_2d.len() {
            return None;
        }
        debug_assert_eq!(self.samples_2d_sizes[self.array_2d_offset], n);
        let sample_index = (self.current_pixel_sample.max(1) - 1) as usize;
        let array = &self.sample_array_2d[self.array_2d_offset];
        self.array_2d_offset += 1;
        Some(&array[sample_index * n..(sample_index + 1) * n])
    }

    fn clone_with_seed(&self, seed: u64) -> Box<dyn Sampler> {
        let mut sampler = RandomSampler::new(self.samples_per_pixel, seed);
        for &n in &self.samples_1d_sizes {
            sampler.request_1d_array(n);
        }
        for &n in &self.samples_2d_sizes {
            sampler.request_2d_array(n);
        }
        Box::new(sampler)
    }

    fn samples_per_pixel(&self) -> u64 {
        self.samples_per_pixel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_loop_count() {
        let mut sampler = RandomSampler::new(4, 0);
        sampler.start_pixel(Point2i::new(0, 0));
        let mut n = 0;
        while sampler.start_next_sample() {
            n += 1;
            let _ = sampler.get_1d();
        }
        assert_eq!(n, 4);
    }

    #[test]
    fn test_samples_in_unit_interval() {
        let mut sampler = RandomSampler::new(1, 3);
        sampler.start_pixel(Point2i::new(1, 2));
        for _ in 0..1000 {
            let x = sampler.get_1d();
            assert!((0.0..1.0).contains(&x));
            let p = sampler.get_2d();
            assert!((0.0..1.0).contains(&p.x) && (0.0..1.0).contains(&p.y));
        }
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = RandomSampler::new(1, 42);
        let mut b = RandomSampler::new(1, 42);
        for _ in 0..100 {
            assert_eq!(a.get_1d(), b.get_1d());
        }

        let mut c = RandomSampler::new(1, 43);
        let differs = (0..100).any(|_| a.get_1d() != c.get_1d());
        assert!(differs);
    }

    #[test]
    fn test_clone_reseeds_stream() {
        let base = RandomSampler::new(8, 0);
        let mut c1 = base.clone_with_seed(5);
        let mut c2 = base.clone_with_seed(5);
        assert_eq!(c1.samples_per_pixel(), 8);
        for _ in 0..50 {
            assert_eq!(c1.get_1d(), c2.get_1d());
        }
    }

    #[test]
    fn test_sample_arrays() {
        let mut sampler = RandomSampler::new(2, 1);
        sampler.request_2d_array(4);
        sampler.start_pixel(Point2i::new(0, 0));

        while sampler.start_next_sample() {
            let arr = sampler.get_2d_array(4).expect("array was requested");
            assert_eq!(arr.len(), 4);
            // A second fetch has no array left.
            assert!(sampler.get_2d_array(4).is_none());
        }
    }

    #[test]
    fn test_camera_sample_jitters_within_pixel() {
        let mut sampler = RandomSampler::new(1, 9);
        let cs = sampler.get_camera_sample(Point2i::new(3, 7));
        assert!(cs.p_film.x >= 3.0 && cs.p_film.x < 4.0);
        assert!(cs.p_film.y >= 7.0 && cs.p_film.y < 8.0);
    }
}
