use crate::filter::Filter;
use crate::spectrum::{xyz_to_rgb, Spectrum};
use crate::{Bounds2f, Bounds2i, Float, Point2f, Point2i, Vec2f};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

pub const FILTER_TABLE_WIDTH: usize = 16;

/// The sRGB opto-electronic transfer curve.
pub fn gamma_correct(value: Float) -> Float {
    if value <= 0.0031308 {
        12.92 * value
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

pub fn inverse_gamma_correct(value: Float) -> Float {
    if value <= 0.04045 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// A float accumulator updated by compare-exchange on the bit pattern, so
/// splats never take the film mutex.
#[derive(Default)]
pub struct AtomicFloat(AtomicU32);

impl AtomicFloat {
    pub fn new(v: Float) -> Self {
        Self(AtomicU32::new(v.to_bits()))
    }

    pub fn load(&self) -> Float {
        Float::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn add(&self, v: Float) {
        let mut old = self.0.load(Ordering::Relaxed);
        loop {
            let new = (Float::from_bits(old) + v).to_bits();
            match self
                .0
                .compare_exchange_weak(old, new, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(current) => old = current,
            }
        }
    }
}

#[derive(Default, Clone, Copy)]
struct Pixel {
    xyz: [Float; 3],
    filter_weight_sum: Float,
}

#[derive(Default, Clone, Copy)]
struct FilmTilePixel {
    contrib_sum: Spectrum,
    filter_weight_sum: Float,
}

/// Accumulates weighted radiance samples into XYZ pixels and splats, and
/// resolves them to the final tone-mapped image.
///
/// XYZ is display independent, which is why pixels store it rather than RGB.
pub struct Film {
    pub full_resolution: Point2i,
    pub cropped_pixel_bounds: Bounds2i,
    pub diagonal: Float,
    pub filename: PathBuf,
    filter: Box<dyn Filter>,
    pixels: Mutex<Vec<Pixel>>,
    splat_xyz: Vec<[AtomicFloat; 3]>,
    filter_table: [Float; FILTER_TABLE_WIDTH * FILTER_TABLE_WIDTH],
    scale: Float,
    max_sample_luminance: Float,
}

impl Film {
    pub fn new(
        resolution: Point2i,
        crop_window: Bounds2f,
        filter: Box<dyn Filter>,
        filename: PathBuf,
        diagonal: Float,
        scale: Float,
        max_sample_luminance: Float,
    ) -> Self {
        let cropped_pixel_bounds = Bounds2i::with_bounds(
            Point2i::new(
                (resolution.x as Float * crop_window.min.x).ceil() as i32,
                (resolution.y as Float * crop_window.min.y).ceil() as i32,
            ),
            Point2i::new(
                (resolution.x as Float * crop_window.max.x).ceil() as i32,
                (resolution.y as Float * crop_window.max.y).ceil() as i32,
            ),
        );
        tracing::info!(
            ?resolution,
            bounds = ?cropped_pixel_bounds,
            "created film"
        );

        let n_pixels = cropped_pixel_bounds.area().max(0) as usize;
        let pixels = Mutex::new(vec![Pixel::default(); n_pixels]);
        let splat_xyz = (0..n_pixels).map(|_| Default::default()).collect();

        // Precompute filter weights over the positive quadrant; the filter is
        // assumed to satisfy f(x, y) = f(|x|, |y|).
        let mut filter_table = [0.0; FILTER_TABLE_WIDTH * FILTER_TABLE_WIDTH];
        let mut offset = 0;
        for y in 0..FILTER_TABLE_WIDTH {
            for x in 0..FILTER_TABLE_WIDTH {
                let p = Point2f::new(
                    (x as Float + 0.5) * filter.radius().x / FILTER_TABLE_WIDTH as Float,
                    (y as Float + 0.5) * filter.radius().y / FILTER_TABLE_WIDTH as Float,
                );
                filter_table[offset] = filter.evaluate(p);
                offset += 1;
            }
        }

        Self {
            full_resolution: resolution,
            cropped_pixel_bounds,
            diagonal,
            filename,
            filter,
            pixels,
            splat_xyz,
            filter_table,
            scale,
            max_sample_luminance,
        }
    }

    /// The pixel range that must be sampled: the cropped bounds expanded by
    /// the filter radius so edge pixels get full filter support.
    pub fn sample_bounds(&self) -> Bounds2i {
        let radius = self.filter.radius();
        Bounds2i::with_bounds(
            Point2i::new(
                (self.cropped_pixel_bounds.min.x as Float + 0.5 - radius.x).floor() as i32,
                (self.cropped_pixel_bounds.min.y as Float + 0.5 - radius.y).floor() as i32,
            ),
            Point2i::new(
                (self.cropped_pixel_bounds.max.x as Float - 0.5 + radius.x).ceil() as i32,
                (self.cropped_pixel_bounds.max.y as Float - 0.5 + radius.y).ceil() as i32,
            ),
        )
    }

    pub fn get_film_tile(&self, sample_bounds: Bounds2i) -> FilmTile<'_> {
        let radius = self.filter.radius();
        let half_pixel = Vec2f::new(0.5, 0.5);
        let p0 = Point2i::new(
            (sample_bounds.min.x as Float - half_pixel.x - radius.x).ceil() as i32,
            (sample_bounds.min.y as Float - half_pixel.y - radius.y).ceil() as i32,
        );
        let p1 = Point2i::new(
            (sample_bounds.max.x as Float - half_pixel.x + radius.x).floor() as i32 + 1,
            (sample_bounds.max.y as Float - half_pixel.y + radius.y).floor() as i32 + 1,
        );
        let tile_pixel_bounds =
            Bounds2i::with_bounds(p0, p1).intersection(&self.cropped_pixel_bounds);

        FilmTile {
            pixel_bounds: tile_pixel_bounds,
            filter_radius: radius,
            inv_filter_radius: Vec2f::new(1.0 / radius.x, 1.0 / radius.y),
            filter_table: &self.filter_table,
            max_sample_luminance: self.max_sample_luminance,
            pixels: vec![
                FilmTilePixel::default();
                tile_pixel_bounds.area().max(0) as usize
            ],
        }
    }

    /// Folds a finished tile into the image under the film mutex.
    pub fn merge_film_tile(&self, tile: FilmTile) {
        let mut pixels = self.pixels.lock();
        for p in tile.pixel_bounds.iter_points() {
            let tile_pixel = tile.get_pixel(p);
            let xyz = tile_pixel.contrib_sum.to_xyz();
            let merge_pixel = &mut pixels[self.pixel_index(p)];
            for i in 0..3 {
                merge_pixel.xyz[i] += xyz[i];
            }
            merge_pixel.filter_weight_sum += tile_pixel.filter_weight_sum;
        }
    }

    /// Deposits an unfiltered contribution directly at a pixel, atomically.
    pub fn add_splat(&self, p: Point2f, mut v: Spectrum) {
        if v.has_nans() {
            tracing::error!("ignoring splatted spectrum with NaN values at ({}, {})", p.x, p.y);
            return;
        } else if v.y() < 0.0 {
            tracing::error!(
                "ignoring splatted spectrum with negative luminance at ({}, {})",
                p.x,
                p.y
            );
            return;
        } else if v.y().is_infinite() {
            tracing::error!(
                "ignoring splatted spectrum with infinite luminance at ({}, {})",
                p.x,
                p.y
            );
            return;
        }

        let pi = Point2i::new(p.x.floor() as i32, p.y.floor() as i32);
        if !self.cropped_pixel_bounds.inside_exclusive(pi) {
            return;
        }

        if v.y() > self.max_sample_luminance {
            v *= self.max_sample_luminance / v.y();
        }

        let xyz = v.to_xyz();
        let splat = &self.splat_xyz[self.pixel_index(pi)];
        for i in 0..3 {
            splat[i].add(xyz[i]);
        }
    }

    /// Resolves the accumulators to 8-bit sRGB, row-major over the cropped
    /// bounds.
    pub fn to_rgb8(&self, splat_scale: Float) -> Vec<u8> {
        let pixels = self.pixels.lock();
        let mut dst = Vec::with_capacity(3 * pixels.len());

        for p in self.cropped_pixel_bounds.iter_points() {
            let index = self.pixel_index(p);
            let pixel = &pixels[index];
            let mut rgb = xyz_to_rgb(pixel.xyz);

            // Normalize by the filter weight sum.
            if pixel.filter_weight_sum != 0.0 {
                let inv_wt = 1.0 / pixel.filter_weight_sum;
                for c in rgb.iter_mut() {
                    *c = (*c * inv_wt).max(0.0);
                }
            }

            // Mix in splats, which bypass filtering.
            let splat = &self.splat_xyz[index];
            let splat_rgb = xyz_to_rgb([splat[0].load(), splat[1].load(), splat[2].load()]);
            for (c, s) in rgb.iter_mut().zip(splat_rgb) {
                *c += splat_scale * s;
                *c *= self.scale;
            }

            for c in rgb {
                dst.push((255.0 * gamma_correct(c) + 0.5).clamp(0.0, 255.0) as u8);
            }
        }
        dst
    }

    pub fn write_image_to_file(&self, splat_scale: Float) -> anyhow::Result<()> {
        let extent = self.cropped_pixel_bounds.diagonal();
        tracing::info!(image = %self.filename.display(), "writing image");

        let dst = self.to_rgb8(splat_scale);
        image::save_buffer(
            &self.filename,
            &dst,
            extent.x as u32,
            extent.y as u32,
            image::ColorType::Rgb8,
        )?;
        Ok(())
    }

    pub fn clear(&self) {
        let mut pixels = self.pixels.lock();
        for pixel in pixels.iter_mut() {
            *pixel = Pixel::default();
        }
        for splat in &self.splat_xyz {
            for c in splat {
                let _ = c.0.swap(0, Ordering::Relaxed);
            }
        }
    }

    fn pixel_index(&self, p: Point2i) -> usize {
        debug_assert!(self.cropped_pixel_bounds.inside_exclusive(p));
        let width = self.cropped_pixel_bounds.max.x - self.cropped_pixel_bounds.min.x;
        ((p.x - self.cropped_pixel_bounds.min.x)
            + (p.y - self.cropped_pixel_bounds.min.y) * width) as usize
    }
}

/// The slice of film one worker renders into, with a halo wide enough for
/// the reconstruction filter.
pub struct FilmTile<'a> {
    pixel_bounds: Bounds2i,
    filter_radius: Vec2f,
    inv_filter_radius: Vec2f,
    filter_table: &'a [Float],
    max_sample_luminance: Float,
    pixels: Vec<FilmTilePixel>,
}

impl FilmTile<'_> {
    pub fn pixel_bounds(&self) -> Bounds2i {
        self.pixel_bounds
    }

    /// Spreads one radiance sample over the pixels inside the filter support.
    pub fn add_sample(&mut self, p_film: Point2f, mut l: Spectrum, sample_weight: Float) {
        if l.y() > self.max_sample_luminance {
            l *= self.max_sample_luminance / l.y();
        }

        // Discrete pixel region influenced by this sample.
        let p_film_discrete = p_film - Vec2f::new(0.5, 0.5);
        let mut p0 = Point2i::new(
            (p_film_discrete.x - self.filter_radius.x).ceil() as i32,
            (p_film_discrete.y - self.filter_radius.y).ceil() as i32,
        );
        let mut p1 = Point2i::new(
            (p_film_discrete.x + self.filter_radius.x).floor() as i32 + 1,
            (p_film_discrete.y + self.filter_radius.y).floor() as i32 + 1,
        );
        p0.x = p0.x.max(self.pixel_bounds.min.x);
        p0.y = p0.y.max(self.pixel_bounds.min.y);
        p1.x = p1.x.min(self.pixel_bounds.max.x);
        p1.y = p1.y.min(self.pixel_bounds.max.y);

        // Precompute filter-table offsets per axis.
        let table_size = FILTER_TABLE_WIDTH;
        let ifx: Vec<usize> = (p0.x..p1.x)
            .map(|x| {
                let fx = ((x as Float - p_film_discrete.x)
                    * self.inv_filter_radius.x
                    * table_size as Float)
                    .abs();
                (fx.floor() as usize).min(table_size - 1)
            })
            .collect();
        let ify: Vec<usize> = (p0.y..p1.y)
            .map(|y| {
                let fy = ((y as Float - p_film_discrete.y)
                    * self.inv_filter_radius.y
                    * table_size as Float)
                    .abs();
                (fy.floor() as usize).min(table_size - 1)
            })
            .collect();

        for y in p0.y..p1.y {
            for x in p0.x..p1.x {
                let offset =
                    ify[(y - p0.y) as usize] * table_size + ifx[(x - p0.x) as usize];
                let filter_weight = self.filter_table[offset];

                let pixel = self.get_pixel_mut(Point2i::new(x, y));
                pixel.contrib_sum += l * sample_weight * filter_weight;
                pixel.filter_weight_sum += filter_weight;
            }
        }
    }

    fn pixel_index(&self, p: Point2i) -> usize {
        debug_assert!(self.pixel_bounds.inside_exclusive(p));
        let width = self.pixel_bounds.max.x - self.pixel_bounds.min.x;
        ((p.x - self.pixel_bounds.min.x) + (p.y - self.pixel_bounds.min.y) * width) as usize
    }

    fn get_pixel(&self, p: Point2i) -> &FilmTilePixel {
        &self.pixels[self.pixel_index(p)]
    }

    fn get_pixel_mut(&mut self, p: Point2i) -> &mut FilmTilePixel {
        let index = self.pixel_index(p);
        &mut self.pixels[index]
    }
}
