//! Tunable particle-cluster growth: every new monomer lands at the exact
//! distance γ(n) from the center of gravity that keeps the cluster on the
//! fractal law, touching one reference monomer.

use agglo_core::{AggregationError, GEOMETRY_EPSILON, Method, Result, SUBCLUSTER_SEED_SIZE, Vec3};
use agglo_physics::cluster::spheres_overlap;
use agglo_physics::quaternion::rotate;
use agglo_physics::sampling::{
    perpendicular_unit, random_angle, random_index, random_unit_vector,
};
use agglo_physics::Cluster;
use rand::Rng;
use tracing::debug;

use crate::generic;
use crate::state::{trial_sphere, BuildState, Exhausted};

/// Builds one cluster from the particles at `indices`: the first
/// `seed_size` aggregate ballistically, the rest are placed one at a time.
///
/// γ(2) asks a second monomer to sit at a fixed distance from the first,
/// which tangent contact can only meet by accident, so the seed is never
/// smaller than a dimer.
pub fn aggregate<R: Rng>(
    state: &mut BuildState<R>,
    indices: &[usize],
    seed_size: usize,
) -> Result<Cluster> {
    let requested = seed_size.clamp(1, indices.len().max(1));
    let seed_size = requested.max(SUBCLUSTER_SEED_SIZE).min(indices.len().max(1));
    state.diagnostics.ballistic_joins += seed_size - requested;
    let mut cluster = generic::aggregate(state, &indices[..seed_size], Method::Pc)?;

    for (k, &particle) in indices[seed_size..].iter().enumerate() {
        let n = seed_size + k + 1;
        place_monomer(state, &mut cluster, particle, n)?;
    }
    Ok(cluster)
}

/// Places `particle` as the `n`-th monomer of `cluster`
fn place_monomer<R: Rng>(
    state: &mut BuildState<R>,
    cluster: &mut Cluster,
    particle: usize,
    n: usize,
) -> Result<()> {
    let delta = state.sample_delta();
    let max_rotations = state.params.max_rotation_attempts;
    let r_new = state.arena.radius(particle);

    let mut members = cluster.members().to_vec();
    members.push(particle);
    let rp = state.arena.mean_radius(&members);
    members.pop();

    let gamma = state.params.fractal_law().particle_gamma(n, rp).ok_or_else(|| {
        AggregationError::invalid(format!("placement distance for monomer {n} is not real"))
    })?;
    let cog = cluster.reference().center_of_gravity;

    // LA: monomers a sphere at distance γ from the center of gravity can touch
    let mut references: Vec<usize> = members
        .iter()
        .copied()
        .filter(|&i| {
            let d = (state.arena.center(i) - cog).norm();
            let s = (state.arena.radius(i) + r_new) / delta;
            (d - gamma).abs() <= s && s <= d + gamma
        })
        .collect();
    if references.is_empty() {
        return Err(AggregationError::infeasible(
            n,
            format!("no monomer can be touched at γ = {gamma:.4} from the center of gravity"),
        ));
    }

    while !references.is_empty() {
        let b = references.swap_remove(random_index(references.len(), &mut state.rng));
        let center_b = state.arena.center(b);
        let r_b = state.arena.radius(b);
        let s = (r_b + r_new) / delta;
        let offset = center_b - cog;
        let d = offset.norm();
        let axis = offset.try_normalize(GEOMETRY_EPSILON);

        // Unit direction at angle α from b̂ so the new sphere touches B exactly
        let tilted = axis.map(|b_hat| {
            let cos_alpha =
                ((gamma * gamma + d * d - s * s) / (2.0 * gamma * d)).clamp(-1.0, 1.0);
            rotate(b_hat, perpendicular_unit(b_hat), cos_alpha.acos())
        });

        // LA+: the only monomers a sphere touching B can reach
        let neighbors: Vec<usize> = members
            .iter()
            .copied()
            .filter(|&j| {
                j != b
                    && (state.arena.center(j) - center_b).norm()
                        < (r_b + state.arena.radius(j) + 2.0 * r_new) / delta
            })
            .collect();

        let mut last = cog;
        for attempt in 1..=max_rotations {
            let direction = match (axis, tilted) {
                (Some(b_hat), Some(t)) => rotate(t, b_hat, random_angle(&mut state.rng)),
                // B sits on the center of gravity: any direction at γ touches it
                _ => random_unit_vector(&mut state.rng),
            };
            let candidate = cog + direction * gamma;
            last = candidate;
            let sphere = trial_sphere(&state.arena, particle, candidate);
            let clear = !neighbors
                .iter()
                .any(|&j| spheres_overlap(state.arena.get(j), &sphere, delta));
            if clear {
                commit(state, cluster, particle, candidate, attempt);
                return Ok(());
            }
        }

        match state.on_rotations_exhausted(n, max_rotations)? {
            Exhausted::NextCandidate => continue,
            Exhausted::AcceptLast => {
                commit(state, cluster, particle, last, max_rotations);
                return Ok(());
            }
        }
    }

    Err(AggregationError::infeasible(
        n,
        "every reference monomer exhausted without an overlap-free position",
    ))
}

fn commit<R: Rng>(
    state: &mut BuildState<R>,
    cluster: &mut Cluster,
    particle: usize,
    center: Vec3,
    attempts: usize,
) {
    state.arena.set_center(particle, center);
    cluster.attach(particle, &mut state.arena);
    state.diagnostics.record_rotations(attempts);
    state.record_growth(cluster);
    let rg = cluster.reference().radius_of_gyration;
    debug!(n = cluster.len(), attempts, rg, "monomer placed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use agglo_core::{Distribution, FractalLaw, SimulationParameters};
    use agglo_physics::geometry::{
        Coordination, center_of_gravity, min_clearance, radius_of_gyration_about,
    };
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_each_monomer_lands_at_gamma() {
        let params = SimulationParameters::default();
        let radii = vec![12.5; 12];
        let mut state = BuildState::new(&params, &radii, ChaCha8Rng::seed_from_u64(5));
        let mut cluster = aggregate(&mut state, &[0, 1], 2).unwrap();

        let law: FractalLaw = params.fractal_law();
        for n in 3..=12 {
            place_monomer(&mut state, &mut cluster, n - 1, n).unwrap();
            // Rigid recentering keeps the distance to the previous members' cog
            let previous: Vec<_> = (0..n - 1).map(|i| state.arena.get(i)).collect();
            let distance = (state.arena.center(n - 1) - center_of_gravity(&previous)).norm();
            let gamma = law.particle_gamma(n, 12.5).unwrap();
            assert_relative_eq!(distance, gamma, max_relative = 1e-9);
        }
        let particles = state.arena.particles();
        assert!(min_clearance(particles, 1.0) > -1e-6);
        let cog = center_of_gravity(particles);
        assert!(radius_of_gyration_about(particles, cog) > 0.0);
    }

    #[test]
    fn test_rotation_attempts_are_recorded() {
        let params = SimulationParameters::default();
        let radii = vec![1.0; 30];
        let mut state = BuildState::new(&params, &radii, ChaCha8Rng::seed_from_u64(8));
        let indices: Vec<usize> = (0..30).collect();
        let cluster = aggregate(&mut state, &indices, 2).unwrap();
        assert_eq!(cluster.len(), 30);
        assert_eq!(state.diagnostics.rotation_attempts.len(), 28);
        assert_eq!(state.diagnostics.retry_histogram.values().sum::<usize>(), 28);
        assert!(state.diagnostics.rotation_attempts.iter().all(|&a| (1..=25).contains(&a)));
    }

    #[test]
    fn test_single_monomer_seed_starts_from_dimer() {
        let params = SimulationParameters {
            seed_cluster_size: 1,
            ..Default::default()
        };
        let radii = vec![1.0; 20];
        let mut state = BuildState::new(&params, &radii, ChaCha8Rng::seed_from_u64(4));
        let indices: Vec<usize> = (0..20).collect();
        let cluster = aggregate(&mut state, &indices, 1).unwrap();
        assert_eq!(cluster.len(), 20);
        assert_eq!(state.diagnostics.ballistic_joins, 1);
        assert_eq!(state.diagnostics.rotation_attempts.len(), 18);
        assert!(min_clearance(state.arena.particles(), 1.0) > -1e-6);
    }

    #[test]
    fn test_sampled_delta_per_placement() {
        let params = SimulationParameters {
            sintering_coefficient: Distribution::Uniform { min: 1.0, max: 1.4 },
            ..Default::default()
        };
        let radii = vec![1.0; 25];
        let mut state = BuildState::new(&params, &radii, ChaCha8Rng::seed_from_u64(12));
        let indices: Vec<usize> = (0..25).collect();
        aggregate(&mut state, &indices, 2).unwrap();
        let samples = &state.diagnostics.sintering_samples;
        // One ballistic merge for the seed dimer, then one draw per placement
        assert_eq!(samples.len(), 24);
        assert!(samples.iter().all(|d| (1.0..=1.4).contains(d)));
        assert!(samples.iter().any(|&d| (d - samples[0]).abs() > 1e-6));
        let particles = state.arena.particles();
        assert!(min_clearance(particles, 1.4) > -1e-6);
        assert_eq!(Coordination::compute(particles, 1.0).components, 1);
    }

    #[test]
    fn test_compact_target_is_infeasible() {
        let params = SimulationParameters {
            target_df: 3.0,
            target_kf: 10.0,
            ..Default::default()
        };
        let radii = vec![1.0; 10];
        let mut state = BuildState::new(&params, &radii, ChaCha8Rng::seed_from_u64(1));
        let indices: Vec<usize> = (0..10).collect();
        let err = aggregate(&mut state, &indices, 2).unwrap_err();
        assert!(matches!(err, AggregationError::InfeasibleGeometry { step: 3, .. }));
    }
}
