use agglo_core::{
    AggregationError, OverlapPolicy, ParticleRecord, Result, SimulationParameters, Vec3,
};
use agglo_physics::{Cluster, ParticleArena};
use rand::Rng;
use tracing::warn;

use crate::aggregate::RunDiagnostics;

/// Mutable state of one build: the particle arena, the build's own RNG, and
/// the counters that end up in the diagnostics
pub struct BuildState<'p, R: Rng> {
    pub params: &'p SimulationParameters,
    pub arena: ParticleArena,
    pub rng: R,
    pub diagnostics: RunDiagnostics,
    pub rg_evolution: Vec<(usize, f64)>,
}

/// What a placement loop does after every rotation still overlapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exhausted {
    NextCandidate,
    AcceptLast,
}

impl<'p, R: Rng> BuildState<'p, R> {
    pub fn new(params: &'p SimulationParameters, radii: &[f64], rng: R) -> Self {
        Self {
            params,
            arena: ParticleArena::new(radii),
            rng,
            diagnostics: RunDiagnostics::new(params.method, params.random_seed, radii.len()),
            rg_evolution: Vec::with_capacity(radii.len()),
        }
    }

    /// Draws δ for one merge or placement and keeps it for the diagnostics
    pub fn sample_delta(&mut self) -> f64 {
        let delta = self.params.sample_sintering(&mut self.rng);
        self.diagnostics.sintering_samples.push(delta);
        delta
    }

    /// Logs one accepted step and the size/Rg of the cluster it produced
    pub fn record_growth(&mut self, cluster: &Cluster) {
        self.diagnostics.steps += 1;
        let rg = cluster.reference().radius_of_gyration;
        self.rg_evolution.push((cluster.len(), rg));
    }

    pub fn on_rotations_exhausted(&mut self, step: usize, attempts: usize) -> Result<Exhausted> {
        match self.params.overlap_policy {
            OverlapPolicy::NextReference => Ok(Exhausted::NextCandidate),
            OverlapPolicy::AcceptLast => {
                self.diagnostics.unresolved_overlaps += 1;
                warn!(step, attempts, "accepting overlapping placement");
                Ok(Exhausted::AcceptLast)
            }
            OverlapPolicy::Fail => Err(AggregationError::RetryExhausted { step, attempts }),
        }
    }
}

/// Copy of particle `index` moved to `center`
pub fn trial_sphere(arena: &ParticleArena, index: usize, center: Vec3) -> ParticleRecord {
    ParticleRecord {
        x: center.x,
        y: center.y,
        z: center.z,
        radius: arena.radius(index),
    }
}

/// Two distinct cluster indices, both uniform
pub fn distinct_pair(len: usize, rng: &mut impl Rng) -> (usize, usize) {
    let i = rng.gen_range(0..len);
    let mut j = rng.gen_range(0..len - 1);
    if j >= i {
        j += 1;
    }
    (i, j)
}

/// Removes cluster `j` and returns it with the index `i` now has
pub fn take_pair(clusters: &mut Vec<Cluster>, i: usize, j: usize) -> (usize, Cluster) {
    let taken = clusters.remove(j);
    (if j < i { i - 1 } else { i }, taken)
}

pub fn renumber(clusters: &mut [Cluster], arena: &mut ParticleArena) {
    for (k, cluster) in clusters.iter_mut().enumerate() {
        cluster.set_id(k, arena);
    }
}
