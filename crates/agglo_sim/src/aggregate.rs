use std::collections::BTreeMap;

use agglo_core::{Method, ParticleRecord, Reference};
use agglo_physics::{BoxCount, Coordination, FractalFit, Morphology};
use serde::{Deserialize, Serialize};

/// Counters collected while a build runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunDiagnostics {
    pub method: Method,
    pub seed: u64,
    pub particle_count: usize,
    /// Accepted placements/merges
    pub steps: usize,
    /// Ballistic trajectories that produced no contact, and DLA walkers that
    /// escaped or ran out of steps, each redrawn
    pub trajectory_resamples: usize,
    /// Tunable CC cluster pairs that could not be joined and were redrawn
    pub cluster_redraws: usize,
    /// Placements kept with an overlap under OverlapPolicy::AcceptLast
    pub unresolved_overlaps: usize,
    /// Tunable joins done at tangent contact because Γ could not be met
    /// (monomer pairs, and the dimer seed forced on single-monomer seeds)
    pub ballistic_joins: usize,
    /// Cluster moves made by the Brownian engine
    pub brownian_moves: usize,
    /// δ drawn for every merge or placement, in draw order
    pub sintering_samples: Vec<f64>,
    /// Rotations spent on each tunable placement, in step order
    pub rotation_attempts: Vec<usize>,
    /// rotations needed → number of placements
    pub retry_histogram: BTreeMap<usize, usize>,
    pub elapsed_ms: u64,
}

impl RunDiagnostics {
    pub fn new(method: Method, seed: u64, particle_count: usize) -> Self {
        Self {
            method,
            seed,
            particle_count,
            steps: 0,
            trajectory_resamples: 0,
            cluster_redraws: 0,
            unresolved_overlaps: 0,
            ballistic_joins: 0,
            brownian_moves: 0,
            sintering_samples: Vec::new(),
            rotation_attempts: Vec::new(),
            retry_histogram: BTreeMap::new(),
            elapsed_ms: 0,
        }
    }

    pub fn record_rotations(&mut self, attempts: usize) {
        self.rotation_attempts.push(attempts);
        *self.retry_histogram.entry(attempts).or_insert(0) += 1;
    }
}

/// A finished agglomerate: the last remaining cluster plus everything
/// measured on it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregate {
    /// Particle-id order, geometric center at the origin
    pub particles: Vec<ParticleRecord>,
    pub reference: Reference,
    pub bounding_diameter: f64,
    pub coordination: Coordination,
    pub morphology: Morphology,
    /// None when the growth history is too short to fit
    pub fractal_fit: Option<FractalFit>,
    /// Surface-sampled box counting; None when disabled or degenerate
    pub box_counting: Option<BoxCount>,
    /// (cluster size, Rg) after every step
    pub rg_evolution: Vec<(usize, f64)>,
    pub diagnostics: RunDiagnostics,
}

impl Aggregate {
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// x, y, z, radius per particle, 4N values
    pub fn as_flat_buffer(&self) -> &[f64] {
        bytemuck::cast_slice(&self.particles)
    }

    pub fn radius_of_gyration(&self) -> f64 {
        self.reference.radius_of_gyration
    }

    pub fn mean_primary_radius(&self) -> f64 {
        if self.particles.is_empty() {
            return 0.0;
        }
        self.particles.iter().map(|p| p.radius).sum::<f64>() / self.particles.len() as f64
    }
}
