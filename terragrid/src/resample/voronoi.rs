//! Jittered-site nearest-neighbour resampling.

use crate::coord::{CoordinateReference, DataView};
use crate::raster::Raster;

/// Maximum displacement of a cell's site from the cell centre, in source
/// cells.
const SITE_JITTER: f64 = 0.25;

const SITE_SEED: u64 = 0x5EED_0F_517E;
const PICK_SEED: u64 = 0xC0FF_EE00_D1CE;

/// Default distance exponent.
pub const DEFAULT_EXPONENT: f64 = 0.9;

/// Default weight magnitude.
pub const DEFAULT_MAGNITUDE: f64 = 1000.0;

/// Resamples a coarse source raster onto a finer destination grid.
///
/// Every source cell owns one site, displaced from its centre by a
/// deterministic jitter. A destination cell takes the value of a site from
/// the 3×3 source neighbourhood around it. Sites are scored by
/// `distance ^ exponent` and weighted by `exp(-magnitude * (score - best))`;
/// a per-destination hash then picks one by cumulative weight. A large
/// magnitude approaches plain nearest-site selection while a small one
/// dithers the boundaries between cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Voronoi {
    exponent: f64,
    magnitude: f64,
}

impl Default for Voronoi {
    fn default() -> Self {
        Self::new(DEFAULT_EXPONENT, DEFAULT_MAGNITUDE)
    }
}

impl Voronoi {
    pub fn new(exponent: f64, magnitude: f64) -> Self {
        Self {
            exponent,
            magnitude,
        }
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// Fills `dest` (covering the block-space `dest_view`) from `source`
    /// (covering `src_view` in the native grid of `src`).
    pub fn scale<T: Copy>(
        &self,
        source: &Raster<T>,
        src_view: &DataView,
        dest: &mut Raster<T>,
        dest_view: &DataView,
        src: &CoordinateReference,
    ) {
        if source.width() == 0 || source.height() == 0 {
            return;
        }

        let mut candidates: Vec<(f64, T)> = Vec::with_capacity(9);

        for dy in 0..dest.height() {
            let block_z = dest_view.y() as f64 + dy as f64 + 0.5;
            let sy = src.native_z(block_z) - src_view.y() as f64;

            for dx in 0..dest.width() {
                let block_x = dest_view.x() as f64 + dx as f64 + 0.5;
                let sx = src.native_x(block_x) - src_view.x() as f64;

                candidates.clear();
                self.collect_sites(source, src_view, sx, sy, &mut candidates);

                let global_x = dest_view.x() as i64 + dx as i64;
                let global_z = dest_view.y() as i64 + dy as i64;
                if let Some(value) = self.pick(&candidates, global_x, global_z) {
                    dest.set(dx, dy, value);
                }
            }
        }
    }

    fn collect_sites<T: Copy>(
        &self,
        source: &Raster<T>,
        src_view: &DataView,
        sx: f64,
        sy: f64,
        out: &mut Vec<(f64, T)>,
    ) {
        let cx = sx.floor() as i64;
        let cy = sy.floor() as i64;

        for ny in cy - 1..=cy + 1 {
            for nx in cx - 1..=cx + 1 {
                let Some(value) = source.try_get(nx, ny) else {
                    continue;
                };

                let global_x = src_view.x() as i64 + nx;
                let global_y = src_view.y() as i64 + ny;
                let (jx, jy) = site_jitter(global_x, global_y);

                let site_x = nx as f64 + 0.5 + jx;
                let site_y = ny as f64 + 0.5 + jy;
                let distance = ((site_x - sx).powi(2) + (site_y - sy).powi(2)).sqrt();

                out.push((distance.powf(self.exponent), value));
            }
        }
    }

    fn pick<T: Copy>(&self, candidates: &[(f64, T)], global_x: i64, global_z: i64) -> Option<T> {
        let best = candidates
            .iter()
            .map(|(score, _)| *score)
            .fold(f64::INFINITY, f64::min);
        if !best.is_finite() {
            return candidates.first().map(|(_, v)| *v);
        }

        let weight = |score: f64| (-self.magnitude * (score - best)).exp();
        let total: f64 = candidates.iter().map(|(score, _)| weight(*score)).sum();

        let mut target = unit_hash(global_x, global_z, PICK_SEED) * total;
        for (score, value) in candidates {
            target -= weight(*score);
            if target <= 0.0 {
                return Some(*value);
            }
        }

        candidates.last().map(|(_, v)| *v)
    }
}

fn site_jitter(x: i64, y: i64) -> (f64, f64) {
    let jx = unit_hash(x, y, SITE_SEED) * 2.0 - 1.0;
    let jy = unit_hash(x, y, SITE_SEED.rotate_left(17)) * 2.0 - 1.0;
    (jx * SITE_JITTER, jy * SITE_JITTER)
}

/// Deterministic hash of a grid cell mapped into `[0, 1)`.
fn unit_hash(x: i64, y: i64, seed: u64) -> f64 {
    let mut h = seed ^ (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    h ^= (y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 31;
    (h >> 11) as f64 / (1u64 << 53) as f64
}
