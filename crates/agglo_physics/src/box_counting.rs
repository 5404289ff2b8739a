use std::f64::consts::TAU;

use agglo_core::{MAX_BOX_PRECISION, Spherical, Vec3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::fractal_law::LineFit;

/// Coarsest scales the fitted window always starts from
const SEED_WINDOW: usize = 4;
/// A point this many RMS residuals off the current line is suspect
const OUTLIER_SIGMA: f64 = 2.0;
/// A suspect point ends the window once R² falls this far below its best
const R2_DROP_LIMIT: f64 = 0.02;
/// Windows within this much of the best R² still count as the best
const R2_SLACK: f64 = 0.01;
const RESIDUAL_FLOOR: f64 = 1e-12;

/// Box-counting dimension of a point cloud, counted on a Morton-ordered grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxCount {
    pub dimension: f64,
    pub r_squared: f64,
    /// Standard error of the fitted slope
    pub std_error: f64,
    /// 95% interval on the dimension
    pub confidence_interval: (f64, f64),
    /// ln(1/box size), finest scale first
    pub log_inverse_sizes: Vec<f64>,
    pub log_counts: Vec<f64>,
    /// First sample of the fitted window; everything before it was dropped
    pub linear_region_start: usize,
    pub points: usize,
}

impl BoxCount {
    /// Counts occupied boxes over `precision` dyadic levels of the cube that
    /// bounds `points`. Levels where every point sits alone, or all share one
    /// box, carry no scaling information and are skipped. None when fewer than
    /// two levels are left.
    pub fn from_points(points: &[Vec3], precision: u32) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let precision = precision.clamp(1, MAX_BOX_PRECISION);
        let (min, max) = points.iter().fold(
            (Vec3::repeat(f64::INFINITY), Vec3::repeat(f64::NEG_INFINITY)),
            |(lo, hi), p| (lo.inf(p), hi.sup(p)),
        );
        let extent = (max - min).max();
        let scale = if extent > 1e-15 { extent } else { 1.0 };
        let max_cell = (1u64 << precision) - 1;

        let mut codes: Vec<u64> = points
            .par_iter()
            .map(|p| {
                let cell = |value: f64, low: f64| {
                    (((value - low) / scale).clamp(0.0, 1.0) * max_cell as f64).round() as u64
                };
                morton_encode(cell(p.x, min.x), cell(p.y, min.y), cell(p.z, min.z))
            })
            .collect();
        codes.par_sort_unstable();

        let mut log_inverse_sizes = Vec::with_capacity(precision as usize);
        let mut log_counts = Vec::with_capacity(precision as usize);
        for level in 0..precision {
            let count = count_boxes(&codes, 3 * level);
            if count > 1 && count < codes.len() {
                let size = scale * (1u64 << level) as f64 / max_cell as f64;
                log_inverse_sizes.push((1.0 / size).ln());
                log_counts.push((count as f64).ln());
            }
        }

        let (start, line) = linear_region(&log_inverse_sizes, &log_counts)?;
        let half_width = 1.96 * line.slope_error;
        Some(Self {
            dimension: line.slope,
            r_squared: line.r_squared,
            std_error: line.slope_error,
            confidence_interval: (line.slope - half_width, line.slope + half_width),
            log_inverse_sizes,
            log_counts,
            linear_region_start: start,
            points: points.len(),
        })
    }

    /// Box counting over `points_per_sphere` surface samples of every sphere
    pub fn agglomerate<S: Spherical + Sync>(
        items: &[S],
        points_per_sphere: usize,
        precision: u32,
    ) -> Option<Self> {
        Self::from_points(&surface_points(items, points_per_sphere), precision)
    }
}

/// Spreads the low 21 bits of `x` so two zero bits follow each one
fn spread_bits(x: u64) -> u64 {
    let mut x = x & 0x1f_ffff;
    x = (x | x << 32) & 0x1f_0000_0000_ffff;
    x = (x | x << 16) & 0x1f_0000_ff00_00ff;
    x = (x | x << 8) & 0x100f_00f0_0f00_f00f;
    x = (x | x << 4) & 0x10c3_0c30_c30c_30c3;
    x = (x | x << 2) & 0x1249_2492_4924_9249;
    x
}

/// Interleaves x, y, z bits (x lowest) into one Z-order code
pub fn morton_encode(x: u64, y: u64, z: u64) -> u64 {
    spread_bits(x) | spread_bits(y) << 1 | spread_bits(z) << 2
}

/// Distinct codes in a sorted slice once the low `shift` bits are dropped
pub fn count_boxes(sorted: &[u64], shift: u32) -> usize {
    let Some(&first) = sorted.first() else {
        return 0;
    };
    if shift >= 64 {
        return 1;
    }
    let mask = !((1u64 << shift) - 1);
    let mut previous = first & mask;
    let mut count = 1;
    for &code in &sorted[1..] {
        let masked = code & mask;
        if masked != previous {
            count += 1;
            previous = masked;
        }
    }
    count
}

/// `n` near-uniform unit directions on a golden-angle spiral, pole to pole
pub fn fibonacci_directions(n: usize) -> Vec<Vec3> {
    let golden = 0.5 * (1.0 + 5f64.sqrt());
    (0..n)
        .map(|i| {
            let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.5 };
            let inclination = (1.0 - 2.0 * t).acos();
            let azimuth = TAU * i as f64 / golden;
            Vec3::new(
                inclination.sin() * azimuth.cos(),
                inclination.sin() * azimuth.sin(),
                inclination.cos(),
            )
        })
        .collect()
}

pub fn surface_points<S: Spherical + Sync>(items: &[S], per_sphere: usize) -> Vec<Vec3> {
    let directions = fibonacci_directions(per_sphere);
    items
        .par_iter()
        .flat_map_iter(|s| {
            let (center, radius) = (s.center(), s.radius());
            directions.iter().map(move |d| center + d * radius)
        })
        .collect()
}

/// Grows the fitted window from the coarsest scales toward finer ones and
/// stops at the first point that is both off the line and costs R²
fn linear_region(xs: &[f64], ys: &[f64]) -> Option<(usize, LineFit)> {
    let mut start = xs.len().saturating_sub(SEED_WINDOW);
    let mut fit = LineFit::fit(&xs[start..], &ys[start..])?;
    let (mut best_start, mut best_r2) = (start, fit.r_squared);

    while start > 0 {
        let candidate = start - 1;
        let Some(extended) = LineFit::fit(&xs[candidate..], &ys[candidate..]) else {
            break;
        };
        let spread = fit.residual_error.max(RESIDUAL_FLOOR);
        let residual = (ys[candidate] - fit.predict(xs[candidate])).abs() / spread;
        if residual > OUTLIER_SIGMA && best_r2 - extended.r_squared > R2_DROP_LIMIT {
            break;
        }
        if extended.r_squared > best_r2 - R2_SLACK {
            best_start = candidate;
            best_r2 = best_r2.max(extended.r_squared);
        }
        fit = extended;
        start = candidate;
    }

    let line = LineFit::fit(&xs[best_start..], &ys[best_start..])?;
    Some((best_start, line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agglo_core::Particle;
    use approx::assert_relative_eq;

    #[test]
    fn test_morton_interleaves_axes() {
        assert_eq!(morton_encode(1, 0, 0), 0b001);
        assert_eq!(morton_encode(0, 1, 0), 0b010);
        assert_eq!(morton_encode(0, 0, 1), 0b100);
        assert_eq!(morton_encode(3, 0, 0), 0b001_001);
        assert_eq!(morton_encode(0, 2, 1), 0b010_100);
        assert_eq!(morton_encode(1 << 20, 0, 0), 1 << 60);
    }

    #[test]
    fn test_count_boxes_masks_low_bits() {
        let codes = [0, 1, 7, 8, 15, 16, 63, 64];
        assert_eq!(count_boxes(&codes, 0), 8);
        assert_eq!(count_boxes(&codes, 3), 5);
        assert_eq!(count_boxes(&codes, 6), 2);
        assert_eq!(count_boxes(&codes, 64), 1);
        assert_eq!(count_boxes(&[], 3), 0);
    }

    #[test]
    fn test_line_is_one_dimensional() {
        let points: Vec<Vec3> = (0..1000).map(|i| Vec3::new(i as f64, 0.0, 0.0)).collect();
        let result = BoxCount::from_points(&points, 16).unwrap();
        assert_relative_eq!(result.dimension, 1.0, epsilon = 1e-9);
        assert!(result.r_squared > 0.999);
        assert_eq!(result.points, 1000);
    }

    #[test]
    fn test_plane_is_two_dimensional() {
        let points: Vec<Vec3> = (0..50)
            .flat_map(|i| (0..50).map(move |j| Vec3::new(i as f64, j as f64, 0.0)))
            .collect();
        let result = BoxCount::from_points(&points, 16).unwrap();
        assert_relative_eq!(result.dimension, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_filled_cube_is_three_dimensional() {
        let points: Vec<Vec3> = (0..20)
            .flat_map(|i| {
                (0..20).flat_map(move |j| {
                    (0..20).map(move |k| Vec3::new(i as f64, j as f64, k as f64))
                })
            })
            .collect();
        let result = BoxCount::from_points(&points, 16).unwrap();
        assert_relative_eq!(result.dimension, 3.0, epsilon = 1e-9);
        assert!(result.confidence_interval.1 - result.confidence_interval.0 < 1e-6);
    }

    #[test]
    fn test_fibonacci_directions_cover_sphere() {
        let dirs = fibonacci_directions(400);
        assert_eq!(dirs.len(), 400);
        for d in &dirs {
            assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-12);
        }
        let mean = dirs.iter().sum::<Vec3>() / dirs.len() as f64;
        assert!(mean.norm() < 0.05);
    }

    fn sphere_at(id: usize, center: Vec3) -> Particle {
        let mut p = Particle::new(id, 0.5);
        p.center = center;
        p
    }

    #[test]
    fn test_chain_scores_below_compact_block() {
        let chain: Vec<Particle> = (0..64)
            .map(|i| sphere_at(i, Vec3::new(i as f64, 0.0, 0.0)))
            .collect();
        let block: Vec<Particle> = (0..64)
            .map(|i| {
                let cell = Vec3::new((i % 4) as f64, (i / 4 % 4) as f64, (i / 16) as f64);
                sphere_at(i, cell)
            })
            .collect();
        let chain_count = BoxCount::agglomerate(&chain, 20, 10).unwrap();
        let block_count = BoxCount::agglomerate(&block, 20, 10).unwrap();
        assert_eq!(chain_count.points, 64 * 20);
        assert!(chain_count.dimension > 0.9 && chain_count.dimension < 2.0);
        assert!(block_count.dimension > chain_count.dimension);
    }

    #[test]
    fn test_degenerate_clouds() {
        assert!(BoxCount::from_points(&[Vec3::zeros()], 10).is_none());
        assert!(BoxCount::from_points(&[Vec3::zeros(); 5], 10).is_none());
    }
}
