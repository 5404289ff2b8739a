//! Ballistic aggregation: clusters fly at each other along straight random
//! trajectories and stick at first contact, until one cluster is left.

use agglo_core::{AggregationError, Method, Particle, ParticleRecord, Result, Vec3};
use agglo_physics::collision::first_contact;
use agglo_physics::quaternion::RigidTransform;
use agglo_physics::sampling::{random_index, random_unit_vector};
use agglo_physics::Cluster;
use rand::Rng;
use tracing::{debug, warn};

use crate::state::{distinct_pair, renumber, take_pair, BuildState};

/// Aggregates the particles at `indices` (each starting as a singleton).
/// `Method::Pc` always grows the first cluster; anything else picks both
/// partners uniformly.
pub fn aggregate<R: Rng>(
    state: &mut BuildState<R>,
    indices: &[usize],
    method: Method,
) -> Result<Cluster> {
    if indices.is_empty() {
        return Err(AggregationError::invalid("cannot aggregate zero particles"));
    }
    let mut clusters: Vec<Cluster> = indices
        .iter()
        .enumerate()
        .map(|(k, &i)| Cluster::singleton(k, i, &mut state.arena))
        .collect();

    let mut merge = 0;
    while clusters.len() > 1 {
        merge += 1;
        let (i, j) = match method {
            Method::Pc => (0, state.rng.gen_range(1..clusters.len())),
            _ => distinct_pair(clusters.len(), &mut state.rng),
        };
        let delta = state.sample_delta();
        merge_ballistic(state, &mut clusters, i, j, merge, delta)?;
        renumber(&mut clusters, &mut state.arena);
    }

    clusters
        .pop()
        .ok_or_else(|| AggregationError::invalid("cluster list emptied during aggregation"))
}

/// Fires cluster `j` at cluster `i` and merges them at first contact. Cluster
/// `j` leaves the list; callers renumber afterwards.
pub(crate) fn merge_ballistic<R: Rng>(
    state: &mut BuildState<R>,
    clusters: &mut Vec<Cluster>,
    i: usize,
    j: usize,
    step: usize,
    delta: f64,
) -> Result<()> {
    let (i, mut impactant) = take_pair(clusters, i, j);
    let offset = launch(state, &clusters[i], &impactant, step, delta)?;

    impactant.transform(&mut state.arena, &RigidTransform::translation(offset));
    let impacted = &mut clusters[i];
    impacted.absorb(impactant, &mut state.arena);
    let rg = impacted.reference().radius_of_gyration;
    debug!(step, size = impacted.len(), rg, delta, "ballistic merge");
    state.record_growth(&clusters[i]);
    Ok(())
}

/// Fires `impactant` at `impacted` until a trajectory hits, returning the
/// translation that brings it to first contact. Both clusters are centered
/// at the origin of their own frames.
fn launch<R: Rng>(
    state: &mut BuildState<R>,
    impacted: &Cluster,
    impactant: &Cluster,
    step: usize,
    delta: f64,
) -> Result<Vec3> {
    let fixed = impacted.spheres(&state.arena);
    let moving = impactant.spheres(&state.arena);
    let r_max = fixed
        .iter()
        .chain(moving.iter())
        .map(|p| p.radius)
        .fold(0.0, f64::max);
    // Far enough that no pair overlaps before the impactant starts moving
    let bounds = impacted.reference().bounding_radius + impactant.reference().bounding_radius;
    let separation = 2.0 * bounds + 4.0 * r_max;

    for attempt in 0..state.params.max_placement_attempts {
        if attempt > 0 && attempt % 1000 == 0 {
            warn!(step, attempt, "trajectories keep missing the impacted cluster");
        }
        let direction = random_unit_vector(&mut state.rng);
        let target = fixed[random_index(fixed.len(), &mut state.rng)];
        let bullet = moving[random_index(moving.len(), &mut state.rng)];
        // Aim point on the δ-dilated surface of one impacted monomer
        let reach = (target.radius + bullet.radius) / delta;
        let aim = target.center + random_unit_vector(&mut state.rng) * reach;
        let offset = aim + direction * separation - bullet.center;

        let launched: Vec<ParticleRecord> = moving.iter().map(|p| shifted(p, offset)).collect();
        if let Some(contact) = first_contact(&fixed, &launched, direction, delta) {
            return Ok(offset - direction * contact.travel);
        }
        state.diagnostics.trajectory_resamples += 1;
    }

    Err(AggregationError::infeasible(
        step,
        format!(
            "no ballistic contact in {} trajectories",
            state.params.max_placement_attempts
        ),
    ))
}

fn shifted(p: &Particle, offset: Vec3) -> ParticleRecord {
    let c = p.center + offset;
    ParticleRecord {
        x: c.x,
        y: c.y,
        z: c.z,
        radius: p.radius,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agglo_core::{Distribution, SimulationParameters};
    use agglo_physics::geometry::{min_clearance, Coordination};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn run(method: Method, radii: &[f64], delta: f64, seed: u64) -> (Cluster, Vec<Particle>) {
        let params = SimulationParameters {
            method,
            sintering_coefficient: Distribution::Fixed(delta),
            ..Default::default()
        };
        let mut state = BuildState::new(&params, radii, ChaCha8Rng::seed_from_u64(seed));
        let indices: Vec<usize> = (0..radii.len()).collect();
        let cluster = aggregate(&mut state, &indices, method).unwrap();
        let particles = state.arena.particles().to_vec();
        (cluster, particles)
    }

    #[test]
    fn test_dimer_is_tangent() {
        let (cluster, particles) = run(Method::Pc, &[12.5, 12.5], 1.0, 7);
        assert_eq!(cluster.len(), 2);
        let gap = (particles[0].center - particles[1].center).norm();
        assert_relative_eq!(gap, 25.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cc_no_overlap_and_connected() {
        let radii = vec![5.0; 30];
        let (cluster, particles) = run(Method::Cc, &radii, 1.2, 21);
        assert_eq!(cluster.len(), 30);
        assert!(min_clearance(&particles, 1.2) > -1e-6);
        assert_eq!(Coordination::compute(&particles, 1.2).components, 1);
    }

    #[test]
    fn test_polydisperse_pc() {
        let radii: Vec<f64> = (0..20).map(|i| 4.0 + (i % 5) as f64).collect();
        let (cluster, particles) = run(Method::Pc, &radii, 1.0, 3);
        assert_eq!(cluster.len(), 20);
        assert!(min_clearance(&particles, 1.0) > -1e-6);
        assert_eq!(particles.iter().filter(|p| p.cluster_id == cluster.id).count(), 20);
    }

    #[test]
    fn test_sintering_drawn_per_merge() {
        let params = SimulationParameters {
            method: Method::Cc,
            sintering_coefficient: Distribution::Uniform { min: 1.1, max: 1.3 },
            ..Default::default()
        };
        let radii = vec![2.0; 30];
        let mut state = BuildState::new(&params, &radii, ChaCha8Rng::seed_from_u64(17));
        let indices: Vec<usize> = (0..30).collect();
        aggregate(&mut state, &indices, Method::Cc).unwrap();

        let samples = &state.diagnostics.sintering_samples;
        assert_eq!(samples.len(), 29);
        assert!(samples.iter().all(|d| (1.1..=1.3).contains(d)));
        assert!(samples.iter().any(|&d| (d - samples[0]).abs() > 1e-6));
        let particles = state.arena.particles();
        assert!(min_clearance(particles, 1.3) > -1e-6);
        assert_eq!(Coordination::compute(particles, 1.1).components, 1);
    }

    #[test]
    fn test_single_particle() {
        let (cluster, particles) = run(Method::Pc, &[3.0], 1.0, 0);
        assert_eq!(cluster.len(), 1);
        assert_eq!(particles[0].center, Vec3::zeros());
    }
}
