//! Brownian cluster-cluster aggregation. Every monomer starts free inside a
//! closed box; one cluster at a time takes a random step scaled by its
//! mobility, and clusters that touch merge rigidly until one is left.

use std::f64::consts::PI;

use agglo_core::{AggregationError, LAPUERTA_CONSTANT, ParticleRecord, Result, Vec3};
use agglo_physics::collision::first_contact;
use agglo_physics::geometry::in_contact;
use agglo_physics::quaternion::RigidTransform;
use agglo_physics::sampling::{random_index, random_unit_vector};
use agglo_physics::{Cluster, ParticleArena};
use rand::Rng;
use tracing::{debug, warn};

use crate::dla::sticks;
use crate::state::{BuildState, renumber, trial_sphere};

/// Where a moving cluster first touches another one
#[derive(Debug, Clone, Copy)]
struct Touch {
    other: usize,
    travel: f64,
}

pub fn aggregate<R: Rng>(state: &mut BuildState<R>, indices: &[usize]) -> Result<Cluster> {
    if indices.is_empty() {
        return Err(AggregationError::invalid("cannot aggregate zero particles"));
    }
    let settings = state.params.diffusion;
    let solid: f64 = indices
        .iter()
        .map(|&i| 4.0 / 3.0 * PI * state.arena.radius(i).powi(3))
        .sum();
    let half = 0.5 * (solid / settings.volume_fraction).cbrt();

    // World position of each cluster's geometric center; members stay in
    // their cluster's own frame
    let mut offsets = scatter(state, indices, half)?;
    let mut clusters: Vec<Cluster> = indices
        .iter()
        .enumerate()
        .map(|(k, &i)| Cluster::singleton(k, i, &mut state.arena))
        .collect();
    debug!(n = indices.len(), box_side = 2.0 * half, "monomers scattered");

    let r_mean = state.arena.mean_radius(indices);
    let rg_monomer = r_mean * LAPUERTA_CONSTANT.sqrt();
    let mut delta = if clusters.len() > 1 { state.sample_delta() } else { 1.0 };
    let mut moves = 0;
    while clusters.len() > 1 {
        if moves == settings.max_brownian_moves {
            return Err(AggregationError::infeasible(
                indices.len() - clusters.len() + 1,
                format!(
                    "{} clusters still apart after {moves} Brownian moves",
                    clusters.len()
                ),
            ));
        }
        moves += 1;
        if moves % 1_000_000 == 0 {
            warn!(moves, clusters = clusters.len(), "Brownian build still running");
        }

        let k = random_index(clusters.len(), &mut state.rng);
        // Diffusivity ∝ 1/Rg, so the step shrinks as √(Rg₁/Rg)
        let rg = clusters[k].reference().radius_of_gyration.max(rg_monomer);
        let step = settings.walk_step * r_mean * (rg_monomer / rg).sqrt();
        let heading = random_unit_vector(&mut state.rng);
        let target = offsets[k] + heading * step;
        if target.abs().max() > half {
            continue;
        }

        let Some(touch) = first_touch(&state.arena, &clusters, &offsets, k, heading, step, delta)
        else {
            offsets[k] = target;
            continue;
        };
        if touch.travel > 0.0 && !sticks(&mut state.rng, settings.stickiness) {
            continue;
        }
        let landed = offsets[k] + heading * touch.travel;
        let merged = fuse(&mut state.arena, &mut clusters, &mut offsets, touch.other, k, landed);
        state.record_growth(&clusters[merged]);
        let rg = clusters[merged].reference().radius_of_gyration;
        debug!(moves, size = clusters[merged].len(), rg, "clusters collided");
        renumber(&mut clusters, &mut state.arena);
        if clusters.len() > 1 {
            delta = state.sample_delta();
        }
    }
    state.diagnostics.brownian_moves = moves;

    clusters
        .pop()
        .ok_or_else(|| AggregationError::invalid("cluster list emptied during aggregation"))
}

/// Random non-touching start positions inside the box
fn scatter<R: Rng>(
    state: &mut BuildState<R>,
    indices: &[usize],
    half: f64,
) -> Result<Vec<Vec3>> {
    let budget = state.params.max_placement_attempts;
    let mut placed: Vec<ParticleRecord> = Vec::with_capacity(indices.len());
    for &i in indices {
        let mut spot = None;
        for _ in 0..budget {
            let center = Vec3::from_fn(|_, _| state.rng.gen_range(-half..=half));
            let sphere = trial_sphere(&state.arena, i, center);
            if !placed.iter().any(|p| in_contact(p, &sphere, 1.0)) {
                spot = Some(sphere);
                break;
            }
        }
        let Some(sphere) = spot else {
            return Err(AggregationError::invalid(format!(
                "no free spot for monomer {} of {} at volume fraction {}",
                placed.len() + 1,
                indices.len(),
                state.params.diffusion.volume_fraction
            )));
        };
        placed.push(sphere);
    }
    Ok(placed.iter().map(|p| p.position()).collect())
}

/// World-frame copies of a cluster's members
fn world_spheres(arena: &ParticleArena, cluster: &Cluster, offset: Vec3) -> Vec<ParticleRecord> {
    cluster
        .members()
        .iter()
        .map(|&i| trial_sphere(arena, i, arena.center(i) + offset))
        .collect()
}

/// Earliest contact of cluster `k` moving up to `step` along `heading`.
/// A cluster already within reach (δ redrawn smaller since they last met)
/// touches at zero travel.
fn first_touch(
    arena: &ParticleArena,
    clusters: &[Cluster],
    offsets: &[Vec3],
    k: usize,
    heading: Vec3,
    step: f64,
    delta: f64,
) -> Option<Touch> {
    let bound_k = clusters[k].reference().bounding_radius;
    let moving = world_spheres(arena, &clusters[k], offsets[k]);
    let mut best: Option<Touch> = None;
    for (j, other) in clusters.iter().enumerate() {
        let gap = (offsets[j] - offsets[k]).norm() - bound_k - other.reference().bounding_radius;
        if j == k || gap > step {
            continue;
        }
        let fixed = world_spheres(arena, other, offsets[j]);
        let touching = fixed.iter().any(|f| moving.iter().any(|m| in_contact(f, m, delta)));
        let travel = if touching {
            Some(0.0)
        } else {
            first_contact(&fixed, &moving, -heading, delta)
                .map(|contact| contact.travel)
                .filter(|&t| t <= step)
        };
        if let Some(travel) = travel {
            if best.is_none_or(|b| travel < b.travel) {
                best = Some(Touch { other: j, travel });
            }
        }
    }
    best
}

/// Merges cluster `k`, whose center has landed at `landed`, into cluster `j`.
/// Returns `j`'s index once `k` is gone.
fn fuse(
    arena: &mut ParticleArena,
    clusters: &mut Vec<Cluster>,
    offsets: &mut Vec<Vec3>,
    j: usize,
    k: usize,
    landed: Vec3,
) -> usize {
    let shift = landed - offsets[j];
    let mut moving = clusters.swap_remove(k);
    offsets.swap_remove(k);
    let j = if j == clusters.len() { k } else { j };

    let (n_j, n_k) = (clusters[j].len() as f64, moving.len() as f64);
    moving.transform(arena, &RigidTransform::translation(shift));
    clusters[j].absorb(moving, arena);
    // absorb recenters on the combined geometric center
    offsets[j] += shift * (n_k / (n_j + n_k));
    j
}
