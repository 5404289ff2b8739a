//! Diffusion-limited aggregation: monomers released around one growing
//! cluster random-walk until they stick to it.

use agglo_core::{AggregationError, Result, Vec3};
use agglo_physics::Cluster;
use agglo_physics::collision::first_contact;
use agglo_physics::sampling::random_unit_vector;
use rand::Rng;
use tracing::{debug, warn};

use crate::state::{BuildState, trial_sphere};

/// Grows one cluster from the first particle; every other particle arrives
/// by random walk, in `indices` order.
pub fn aggregate<R: Rng>(state: &mut BuildState<R>, indices: &[usize]) -> Result<Cluster> {
    let Some((&first, rest)) = indices.split_first() else {
        return Err(AggregationError::invalid("cannot aggregate zero particles"));
    };
    let mut cluster = Cluster::singleton(0, first, &mut state.arena);

    for (k, &particle) in rest.iter().enumerate() {
        let n = k + 2;
        let delta = state.sample_delta();
        let landing = release_walkers(state, &cluster, particle, n, delta)?;
        state.arena.set_center(particle, landing);
        cluster.attach(particle, &mut state.arena);
        state.record_growth(&cluster);
        debug!(n, rg = cluster.reference().radius_of_gyration, "walker stuck");
    }
    Ok(cluster)
}

/// Releases walkers for `particle` until one sticks, returning where it landed
fn release_walkers<R: Rng>(
    state: &mut BuildState<R>,
    cluster: &Cluster,
    particle: usize,
    n: usize,
    delta: f64,
) -> Result<Vec3> {
    let budget = state.params.max_placement_attempts;
    for attempt in 0..budget {
        if attempt > 0 && attempt % 1000 == 0 {
            warn!(n, attempt, "walkers keep escaping the cluster");
        }
        if let Some(landing) = walk(state, cluster, particle, delta) {
            return Ok(landing);
        }
        state.diagnostics.trajectory_resamples += 1;
    }
    Err(AggregationError::infeasible(
        n,
        format!("no walker stuck in {budget} releases"),
    ))
}

/// One walk from a random point of the spawn sphere. None when the walker
/// escapes or runs out of steps.
///
/// Wherever the walker is farther than one step from every surface it jumps
/// straight to a random point at its clearance, which leaves the distribution
/// of where it first gets close unchanged.
fn walk<R: Rng>(
    state: &mut BuildState<R>,
    cluster: &Cluster,
    particle: usize,
    delta: f64,
) -> Option<Vec3> {
    let settings = state.params.diffusion;
    let radius = state.arena.radius(particle);
    // Members sit in the cluster frame with the geometric center at the origin
    let bound = cluster.reference().bounding_radius;
    let spawn = bound + radius * (1.0 + settings.spawn_gap);
    let escape = settings.escape_multiplier * spawn;
    let step = settings.walk_step * radius;

    let mut position = random_unit_vector(&mut state.rng) * spawn;
    for _ in 0..settings.max_walk_steps {
        let distance = position.norm();
        if distance > escape {
            return None;
        }
        let heading = random_unit_vector(&mut state.rng);
        let mut clearance = distance - bound - radius;
        if clearance <= step {
            clearance = cluster
                .members()
                .iter()
                .map(|&i| {
                    let p = state.arena.get(i);
                    (p.center - position).norm() - p.radius - radius
                })
                .fold(f64::INFINITY, f64::min);
        }
        if clearance > step {
            position += heading * clearance;
            continue;
        }

        let walker = [trial_sphere(&state.arena, particle, position)];
        let nearby: Vec<_> = cluster
            .members()
            .iter()
            .map(|&i| state.arena.get(i))
            .filter(|p| (p.center - position).norm() <= step + (p.radius + radius) / delta)
            .collect();
        match first_contact(&nearby, &walker, -heading, delta) {
            Some(contact) if contact.travel <= step => {
                if sticks(&mut state.rng, settings.stickiness) {
                    return Some(position + heading * contact.travel);
                }
            }
            _ => position += heading * step,
        }
    }
    None
}

/// Whether a contact holds; refused contacts leave the mover where it was
pub(crate) fn sticks(rng: &mut impl Rng, stickiness: f64) -> bool {
    stickiness >= 1.0 || rng.gen_range(0.0..1.0) < stickiness
}
