use crate::camera::CameraSample;
use crate::{Float, Point2f, Point2i, Vec2f};

pub mod random;

/// Supplies the random-sample stream for one tile's rendering. Cloned per
/// tile with a tile-specific seed.
pub trait Sampler: Send + Sync {
    fn start_pixel(&mut self, pixel: Point2i);

    /// Advances to the next sample of the current pixel; false once
    /// `samples_per_pixel` have been consumed.
    fn start_next_sample(&mut self) -> bool;

    fn get_1d(&mut self) -> Float;

    fn get_2d(&mut self) -> Point2f;

    /// Pre-registers an array of `n` 1D samples per pixel sample, available
    /// later through `get_1d_array`.
    fn request_1d_array(&mut self, n: usize);

    fn request_2d_array(&mut self, n: usize);

    fn get_1d_array(&mut self, n: usize) -> Option<&[Float]>;

    fn get_2d_array(&mut self, n: usize) -> Option<&[Point2f]>;

    /// Sample-count granularity; identity for samplers without stratification.
    fn round_count(&self, n: usize) -> usize {
        n
    }

    fn clone_with_seed(&self, seed: u64) -> Box<dyn Sampler>;

    fn samples_per_pixel(&self) -> u64;

    fn get_camera_sample(&mut self, p_raster: Point2i) -> CameraSample {
        let jitter = self.get_2d();
        CameraSample {
            p_film: Point2f::new(p_raster.x as Float, p_raster.y as Float)
                + Vec2f::new(jitter.x, jitter.y),
        }
    }
}
