use agglo_core::Spherical;
use nalgebra::{Matrix3, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::geometry::{center_of_gravity, radius_of_gyration_about};

/// Shape descriptors derived from the mass inertia tensor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Morphology {
    /// 1 − V_particles / V_sphere(radius 2·Rg), clamped to [0, 1]
    pub porosity: f64,
    /// Ascending principal moments
    pub principal_moments: [f64; 3],
    /// Unit axes, same order as the moments
    pub principal_axes: [[f64; 3]; 3],
    /// I_max / I_min
    pub anisotropy: f64,
    pub asphericity: f64,
    pub acylindricity: f64,
}

impl Morphology {
    pub fn compute<S: Spherical>(items: &[S]) -> Self {
        let cog = center_of_gravity(items);
        let rg = radius_of_gyration_about(items, cog);
        let bounding = 4.0 / 3.0 * std::f64::consts::PI * (2.0 * rg).powi(3);
        let solid: f64 = items.iter().map(|s| s.volume()).sum();
        let porosity = if bounding > 0.0 { 1.0 - (solid / bounding).min(1.0) } else { 1.0 };

        let (principal_moments, principal_axes) = principal_inertia(items);
        let [i1, i2, i3] = principal_moments;
        let trace = i1 + i2 + i3;
        let (asphericity, acylindricity) = if trace > 0.0 {
            ((i3 - 0.5 * (i1 + i2)) / trace, (i2 - i1) / trace)
        } else {
            (0.0, 0.0)
        };

        Self {
            porosity,
            principal_moments,
            principal_axes,
            anisotropy: i3 / i1,
            asphericity,
            acylindricity,
        }
    }
}

/// Inertia tensor about the center of gravity, mass ∝ r³.
/// Each sphere adds its own 2/5·m·r² so a straight chain stays finite.
pub fn inertia_tensor<S: Spherical>(items: &[S]) -> Matrix3<f64> {
    let cog = center_of_gravity(items);
    items.iter().fold(Matrix3::zeros(), |acc, s| {
        let m = s.radius().powi(3);
        let d = s.center() - cog;
        let own = 0.4 * m * s.radius().powi(2);
        acc + (Matrix3::identity() * (m * d.norm_squared() + own)) - (d * d.transpose()) * m
    })
}

/// Sorted principal moments and matching axes
pub fn principal_inertia<S: Spherical>(items: &[S]) -> ([f64; 3], [[f64; 3]; 3]) {
    if items.is_empty() {
        return ([1.0; 3], [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
    }
    let eigen = SymmetricEigen::new(inertia_tensor(items));
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let mut moments = [0.0; 3];
    let mut axes = [[0.0; 3]; 3];
    for (slot, &k) in order.iter().enumerate() {
        moments[slot] = eigen.eigenvalues[k].max(1e-10);
        let axis = eigen.eigenvectors.column(k);
        axes[slot] = [axis[0], axis[1], axis[2]];
    }
    (moments, axes)
}
