use std::f64::consts::TAU;

use agglo_core::{GEOMETRY_EPSILON, Vec3};
use rand::Rng;

/// Uniform direction on the unit sphere (uniform azimuth, uniform cos θ)
pub fn random_unit_vector(rng: &mut impl Rng) -> Vec3 {
    let azimuth = rng.gen_range(0.0..TAU);
    let cos_theta: f64 = rng.gen_range(-1.0..=1.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    Vec3::new(sin_theta * azimuth.cos(), sin_theta * azimuth.sin(), cos_theta)
}

/// Uniform angle in [0, 2π)
pub fn random_angle(rng: &mut impl Rng) -> f64 {
    rng.gen_range(0.0..TAU)
}

/// Some unit vector perpendicular to `v` (deterministic)
pub fn perpendicular_unit(v: Vec3) -> Vec3 {
    // Cross with the axis least aligned to v
    let a = v.abs();
    let helper = if a.x <= a.y && a.x <= a.z {
        Vec3::x()
    } else if a.y <= a.z {
        Vec3::y()
    } else {
        Vec3::z()
    };
    v.cross(&helper)
        .try_normalize(GEOMETRY_EPSILON)
        .unwrap_or_else(Vec3::x)
}

/// Uniformly oriented unit vector perpendicular to `v`
pub fn random_perpendicular(v: Vec3, rng: &mut impl Rng) -> Vec3 {
    let base = perpendicular_unit(v);
    crate::quaternion::rotate(base, v, random_angle(rng))
}

/// Index drawn uniformly from 0..len. `len` must be positive.
pub fn random_index(len: usize, rng: &mut impl Rng) -> usize {
    rng.gen_range(0..len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_unit_vectors_are_unit() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..100 {
            assert_relative_eq!(random_unit_vector(&mut rng).norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_unit_vectors_are_isotropic() {
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let n = 20_000;
        let mean: Vec3 = (0..n).map(|_| random_unit_vector(&mut rng)).sum::<Vec3>() / n as f64;
        assert!(mean.norm() < 0.03);
    }

    #[test]
    fn test_perpendiculars() {
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        for v in [Vec3::x(), Vec3::new(0.3, -2.0, 0.7), Vec3::new(0.0, 0.0, -4.0)] {
            assert!(perpendicular_unit(v).dot(&v).abs() < 1e-12);
            let p = random_perpendicular(v, &mut rng);
            assert!(p.dot(&v).abs() < 1e-9);
            assert_relative_eq!(p.norm(), 1.0, epsilon = 1e-12);
        }
    }
}
