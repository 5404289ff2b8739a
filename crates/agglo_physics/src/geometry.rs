use std::f64::consts::{PI, TAU};

use agglo_core::{ADJACENCY_TOLERANCE, Reference, Spherical, Vec3};
use serde::{Deserialize, Serialize};

/// Mean of particle centers
pub fn center_of_geometry<S: Spherical>(items: &[S]) -> Vec3 {
    if items.is_empty() {
        return Vec3::zeros();
    }
    items.iter().map(|s| s.center()).sum::<Vec3>() / items.len() as f64
}

/// Volume-weighted center: Σ(cᵢ·rᵢ³) / Σ rᵢ³
pub fn center_of_gravity<S: Spherical>(items: &[S]) -> Vec3 {
    let mass: f64 = items.iter().map(|s| s.radius().powi(3)).sum();
    if mass <= 0.0 {
        return center_of_geometry(items);
    }
    items.iter().map(|s| s.center() * s.radius().powi(3)).sum::<Vec3>() / mass
}

/// Rg about `cog`, each sphere contributing its own 3/5·r² inertia
pub fn radius_of_gyration_about<S: Spherical>(items: &[S], cog: Vec3) -> f64 {
    let (num, mass) = items.iter().fold((0.0, 0.0), |(num, mass), s| {
        let r3 = s.radius().powi(3);
        let d2 = (s.center() - cog).norm_squared();
        (num + 0.6 * r3 * s.radius().powi(2) + r3 * d2, mass + r3)
    });
    if mass <= 0.0 { 0.0 } else { (num / mass).sqrt() }
}

pub fn radius_of_gyration<S: Spherical>(items: &[S]) -> f64 {
    radius_of_gyration_about(items, center_of_gravity(items))
}

/// Largest distance from `origin` to any particle surface
pub fn bounding_radius<S: Spherical>(items: &[S], origin: Vec3) -> f64 {
    items
        .iter()
        .map(|s| (s.center() - origin).norm() + s.radius())
        .fold(0.0, f64::max)
}

pub fn reference<S: Spherical>(items: &[S]) -> Reference {
    let geometric_center = center_of_geometry(items);
    let center_of_gravity = center_of_gravity(items);
    Reference {
        geometric_center,
        bounding_radius: bounding_radius(items, geometric_center),
        center_of_gravity,
        radius_of_gyration: radius_of_gyration_about(items, center_of_gravity),
    }
}

/// Latitude/longitude grid of unit directions used to sample particle surfaces.
/// `resolution` polar bands, twice as many azimuth steps, poles once each.
#[derive(Debug, Clone)]
pub struct SurfaceMesh {
    directions: Vec<Vec3>,
}

impl SurfaceMesh {
    pub fn new(resolution: usize) -> Self {
        let bands = resolution.max(2);
        let steps = 2 * bands;
        let mut directions = Vec::with_capacity((bands - 1) * steps + 2);
        directions.push(Vec3::z());
        for i in 1..bands {
            let theta = PI * i as f64 / bands as f64;
            let (sin_t, cos_t) = theta.sin_cos();
            for j in 0..steps {
                let phi = TAU * j as f64 / steps as f64;
                directions.push(Vec3::new(sin_t * phi.cos(), sin_t * phi.sin(), cos_t));
            }
        }
        directions.push(-Vec3::z());
        Self { directions }
    }

    pub fn directions(&self) -> &[Vec3] {
        &self.directions
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }
}

/// Twice the largest distance from the center of gravity to any sampled
/// surface point. Converges to the bounding-sphere diameter from below as
/// the mesh gets finer.
pub fn bounding_diameter<S: Spherical>(items: &[S], mesh: &SurfaceMesh) -> f64 {
    let cog = center_of_gravity(items);
    let mut max_d2: f64 = 0.0;
    for s in items {
        let offset = s.center() - cog;
        let r = s.radius();
        for dir in mesh.directions() {
            max_d2 = max_d2.max((offset + dir * r).norm_squared());
        }
    }
    2.0 * max_d2.sqrt()
}

/// i ~ j iff ‖cᵢ − cⱼ‖ ≤ (rᵢ + rⱼ)/δ, self excluded
pub fn in_contact(a: &impl Spherical, b: &impl Spherical, delta: f64) -> bool {
    let reach = (a.radius() + b.radius()) / delta;
    (a.center() - b.center()).norm() <= reach * (1.0 + ADJACENCY_TOLERANCE)
}

/// Sparse adjacency lists
pub fn neighbors<S: Spherical>(items: &[S], delta: f64) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); items.len()];
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            if in_contact(&items[i], &items[j], delta) {
                adjacency[i].push(j);
                adjacency[j].push(i);
            }
        }
    }
    adjacency
}

/// Connected components of an adjacency list
pub fn component_count(adjacency: &[Vec<usize>]) -> usize {
    let mut seen = vec![false; adjacency.len()];
    let mut components = 0;
    let mut stack = Vec::new();
    for start in 0..adjacency.len() {
        if seen[start] {
            continue;
        }
        components += 1;
        seen[start] = true;
        stack.push(start);
        while let Some(i) = stack.pop() {
            for &j in &adjacency[i] {
                if !seen[j] {
                    seen[j] = true;
                    stack.push(j);
                }
            }
        }
    }
    components
}

/// Coordination numbers of an aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coordination {
    pub per_particle: Vec<usize>,
    pub mean: f64,
    pub std: f64,
    /// Connected components of the contact graph; 1 for a proper aggregate
    pub components: usize,
}

impl Coordination {
    pub fn compute<S: Spherical>(items: &[S], delta: f64) -> Self {
        let adjacency = neighbors(items, delta);
        let per_particle: Vec<usize> = adjacency.iter().map(Vec::len).collect();
        let n = per_particle.len().max(1) as f64;
        let mean = per_particle.iter().sum::<usize>() as f64 / n;
        let var = per_particle.iter().map(|&k| (k as f64 - mean).powi(2)).sum::<f64>() / n;
        Self {
            per_particle,
            mean,
            std: var.sqrt(),
            components: component_count(&adjacency),
        }
    }
}

/// Smallest ‖cᵢ − cⱼ‖ − (rᵢ + rⱼ)/δ over all pairs; negative means overlap
pub fn min_clearance<S: Spherical>(items: &[S], delta: f64) -> f64 {
    let mut min = f64::INFINITY;
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let reach = (items[i].radius() + items[j].radius()) / delta;
            let gap = (items[i].center() - items[j].center()).norm() - reach;
            min = min.min(gap);
        }
    }
    min
}

#[cfg(test)]
mod tests {
    use super::*;
    use agglo_core::ParticleRecord;
    use approx::assert_relative_eq;

    fn sphere(x: f64, y: f64, z: f64, radius: f64) -> ParticleRecord {
        ParticleRecord { x, y, z, radius }
    }

    #[test]
    fn test_single_sphere_rg() {
        let one = [sphere(1.0, 2.0, 3.0, 2.0)];
        assert_relative_eq!(radius_of_gyration(&one), (0.6f64).sqrt() * 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_dimer_rg() {
        let dimer = [sphere(-1.0, 0.0, 0.0, 1.0), sphere(1.0, 0.0, 0.0, 1.0)];
        assert_relative_eq!(radius_of_gyration(&dimer), 1.6f64.sqrt(), max_relative = 1e-12);
        assert_relative_eq!(bounding_radius(&dimer, Vec3::zeros()), 2.0);
    }

    #[test]
    fn test_center_of_gravity_weights_volume() {
        let pair = [sphere(0.0, 0.0, 0.0, 2.0), sphere(9.0, 0.0, 0.0, 1.0)];
        let cog = center_of_gravity(&pair);
        assert_relative_eq!(cog.x, 1.0, max_relative = 1e-12);
        assert_relative_eq!(center_of_geometry(&pair).x, 4.5);
    }

    #[test]
    fn test_bounding_diameter_converges() {
        let dimer = [sphere(-1.0, 0.0, 0.0, 1.0), sphere(1.0, 0.0, 0.0, 1.0)];
        let coarse = bounding_diameter(&dimer, &SurfaceMesh::new(4));
        let fine = bounding_diameter(&dimer, &SurfaceMesh::new(64));
        assert!(coarse <= fine + 1e-12);
        assert_relative_eq!(fine, 4.0, max_relative = 1e-9);
    }

    #[test]
    fn test_mesh_directions_are_unit() {
        let mesh = SurfaceMesh::new(6);
        assert_eq!(mesh.len(), 5 * 12 + 2);
        for d in mesh.directions() {
            assert_relative_eq!(d.norm(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_coordination_chain() {
        let chain = [
            sphere(0.0, 0.0, 0.0, 1.0),
            sphere(2.0, 0.0, 0.0, 1.0),
            sphere(4.0, 0.0, 0.0, 1.0),
            sphere(10.0, 0.0, 0.0, 1.0),
        ];
        let c = Coordination::compute(&chain, 1.0);
        assert_eq!(c.per_particle, vec![1, 2, 1, 0]);
        assert_eq!(c.components, 2);
        assert_relative_eq!(c.mean, 1.0);
    }

    #[test]
    fn test_sintering_widens_contact() {
        let a = sphere(0.0, 0.0, 0.0, 1.0);
        let b = sphere(1.9, 0.0, 0.0, 1.0);
        assert!(in_contact(&a, &b, 1.0));
        let far = sphere(2.05, 0.0, 0.0, 1.0);
        assert!(!in_contact(&a, &far, 1.0));
        assert!(in_contact(&a, &sphere(1.8, 0.0, 0.0, 1.0), 1.1));
        assert!(min_clearance(&[a, b], 1.0) < 0.0);
    }
}
