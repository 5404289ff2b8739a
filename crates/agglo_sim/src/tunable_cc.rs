//! Tunable cluster-cluster growth. Sub-clusters are grown with tunable PC,
//! then joined pairwise with their centers of gravity exactly Γ apart and
//! one monomer of each side in contact.

use agglo_core::{AggregationError, GEOMETRY_EPSILON, Method, Result, SUBCLUSTER_SEED_SIZE, Vec3};
use agglo_physics::cluster::spheres_overlap;
use agglo_physics::quaternion::{Quat, RigidTransform};
use agglo_physics::sampling::{
    random_angle, random_index, random_perpendicular, random_unit_vector,
};
use agglo_physics::{Cluster, ParticleArena};
use rand::Rng;
use tracing::{debug, warn};

use crate::generic;
use crate::state::{BuildState, Exhausted, distinct_pair, renumber, take_pair, trial_sphere};
use crate::tunable_pc;

/// Rigid moves that bring both clusters into the merged frame
#[derive(Debug, Clone, Copy)]
struct Join {
    a: RigidTransform,
    b: RigidTransform,
    attempts: usize,
}

/// Contact pair: particle indices plus their distances from their own cog
#[derive(Debug, Clone, Copy)]
struct Candidate {
    a: usize,
    b: usize,
    lo: f64,
    hi: f64,
}

pub fn aggregate<R: Rng>(state: &mut BuildState<R>, indices: &[usize]) -> Result<Cluster> {
    if indices.is_empty() {
        return Err(AggregationError::invalid("cannot aggregate zero particles"));
    }
    let chunk = state.params.seed_cluster_size.max(1);
    let mut clusters = Vec::with_capacity(indices.len().div_ceil(chunk));
    for (k, members) in indices.chunks(chunk).enumerate() {
        let mut cluster = grow_subcluster(state, members)?;
        cluster.set_id(k, &mut state.arena);
        clusters.push(cluster);
    }
    debug!(subclusters = clusters.len(), "sub-clusters grown");

    let mut merge = 0;
    while clusters.len() > 1 {
        merge += 1;
        join_some_pair(state, &mut clusters, merge)?;
        renumber(&mut clusters, &mut state.arena);
    }
    clusters
        .pop()
        .ok_or_else(|| AggregationError::invalid("cluster list emptied during aggregation"))
}

fn grow_subcluster<R: Rng>(state: &mut BuildState<R>, members: &[usize]) -> Result<Cluster> {
    if members.len() <= SUBCLUSTER_SEED_SIZE {
        generic::aggregate(state, members, Method::Pc)
    } else {
        tunable_pc::aggregate(state, members, SUBCLUSTER_SEED_SIZE)
    }
}

fn join_some_pair<R: Rng>(
    state: &mut BuildState<R>,
    clusters: &mut Vec<Cluster>,
    merge: usize,
) -> Result<()> {
    let budget = state.params.max_placement_attempts;
    let delta = state.sample_delta();
    for redraw in 0..budget {
        let (i, j) = distinct_pair(clusters.len(), &mut state.rng);
        // Two monomers meet at tangent contact whatever Γ(1, 1) asks for
        if clusters[i].len() == 1 && clusters[j].len() == 1 {
            state.diagnostics.ballistic_joins += 1;
            return generic::merge_ballistic(state, clusters, i, j, merge, delta);
        }
        if let Some(join) = plan_join(state, &clusters[i], &clusters[j], merge, delta)? {
            let (i, mut other) = take_pair(clusters, i, j);
            let base = &mut clusters[i];
            base.transform(&mut state.arena, &join.a);
            other.transform(&mut state.arena, &join.b);
            base.absorb(other, &mut state.arena);
            state.diagnostics.record_rotations(join.attempts);
            state.record_growth(&clusters[i]);
            debug!(merge, size = clusters[i].len(), redraws = redraw, "clusters joined");
            return Ok(());
        }
        state.diagnostics.cluster_redraws += 1;
        if redraw > 0 && redraw % 1000 == 0 {
            warn!(merge, redraw, "cluster pairs keep failing to join");
        }
    }
    Err(AggregationError::infeasible(
        merge,
        format!("no joinable cluster pair in {budget} draws"),
    ))
}

/// Range of |P_b| (b's distance from a's cog once joined) compatible with
/// both the Γ constraint and contact with a
fn contact_interval(gamma: f64, d_a: f64, d_b: f64, s: f64) -> Option<(f64, f64)> {
    let lo = (gamma - d_b).abs().max((d_a - s).abs());
    let hi = (gamma + d_b).min(d_a + s);
    (lo <= hi).then_some((lo, hi))
}

fn plan_join<R: Rng>(
    state: &mut BuildState<R>,
    a: &Cluster,
    b: &Cluster,
    merge: usize,
    delta: f64,
) -> Result<Option<Join>> {
    let (n1, n2) = (a.len(), b.len());
    let mut members = a.members().to_vec();
    members.extend_from_slice(b.members());
    let rp = state.arena.mean_radius(&members);
    let gamma = state.params.fractal_law().cluster_gamma(n1, n2, rp).ok_or_else(|| {
        AggregationError::invalid(format!("cluster distance for sizes {n1} + {n2} is not real"))
    })?;

    let cog_a = a.reference().center_of_gravity;
    let cog_b = b.reference().center_of_gravity;
    let dist_a = a.distances_from_cog(&state.arena);
    let dist_b = b.distances_from_cog(&state.arena);
    let reach = |cluster: &Cluster, dist: &[f64]| {
        cluster
            .members()
            .iter()
            .zip(dist)
            .map(|(&i, d)| d + state.arena.radius(i))
            .fold(0.0, f64::max)
    };
    if reach(a, &dist_a) + reach(b, &dist_b) < gamma {
        return Ok(None);
    }

    let mut candidates = Vec::new();
    for (&pa, &da) in a.members().iter().zip(&dist_a) {
        for (&pb, &db) in b.members().iter().zip(&dist_b) {
            let s = (state.arena.radius(pa) + state.arena.radius(pb)) / delta;
            if let Some((lo, hi)) = contact_interval(gamma, da, db, s) {
                candidates.push(Candidate { a: pa, b: pb, lo, hi });
            }
        }
    }

    let max_rotations = state.params.max_rotation_attempts;
    for _ in 0..state.params.max_pair_attempts {
        if candidates.is_empty() {
            break;
        }
        let pair = candidates.swap_remove(random_index(candidates.len(), &mut state.rng));
        let ell = if pair.hi > pair.lo {
            state.rng.gen_range(pair.lo..=pair.hi)
        } else {
            pair.lo
        };
        let vec_a = state.arena.center(pair.a) - cog_a;
        let vec_b = state.arena.center(pair.b) - cog_b;
        let s = (state.arena.radius(pair.a) + state.arena.radius(pair.b)) / delta;

        let mut last = None;
        for attempt in 1..=max_rotations {
            let (ta, tb) =
                orient(&mut state.rng, gamma, ell, s, (vec_a, cog_a), (vec_b, cog_b));
            let join = Join { a: ta, b: tb, attempts: attempt };
            last = Some(join);
            if !joined_overlap(&state.arena, a, b, &join, delta) {
                return Ok(Some(join));
            }
        }
        match state.on_rotations_exhausted(merge, max_rotations)? {
            Exhausted::NextCandidate => continue,
            Exhausted::AcceptLast => return Ok(last),
        }
    }
    Ok(None)
}

/// Random placement satisfying |cog_a' − cog_b'| = Γ, |P_b| = ℓ and
/// |P_a − P_b| = s, with A's cog at the origin of the merged frame.
/// `a`/`b` are (monomer offset from its cog, cog).
fn orient(
    rng: &mut impl Rng,
    gamma: f64,
    ell: f64,
    s: f64,
    a: (Vec3, Vec3),
    b: (Vec3, Vec3),
) -> (RigidTransform, RigidTransform) {
    let (vec_a, cog_a) = a;
    let (vec_b, cog_b) = b;
    let (d_a, d_b) = (vec_a.norm(), vec_b.norm());

    let u = random_unit_vector(rng);
    let w = random_perpendicular(u, rng);
    let p_b = if ell <= GEOMETRY_EPSILON {
        Vec3::zeros()
    } else {
        let cos_phi =
            ((gamma * gamma + ell * ell - d_b * d_b) / (2.0 * gamma * ell)).clamp(-1.0, 1.0);
        let sin_phi = (1.0 - cos_phi * cos_phi).max(0.0).sqrt();
        (u * cos_phi + w * sin_phi) * ell
    };

    let p_hat = match p_b.try_normalize(GEOMETRY_EPSILON) {
        Some(p) => p,
        None => random_unit_vector(rng),
    };
    let p_a = if d_a <= GEOMETRY_EPSILON {
        Vec3::zeros()
    } else {
        let cos_psi = if ell <= GEOMETRY_EPSILON {
            1.0
        } else {
            ((d_a * d_a + ell * ell - s * s) / (2.0 * d_a * ell)).clamp(-1.0, 1.0)
        };
        let sin_psi = (1.0 - cos_psi * cos_psi).max(0.0).sqrt();
        let w2 = random_perpendicular(p_hat, rng);
        (p_hat * cos_psi + w2 * sin_psi) * d_a
    };

    let rot_a = align(vec_a, p_a, rng);
    let rot_b = align(vec_b, p_b - u * gamma, rng);
    (
        RigidTransform::new(rot_a, -rot_a.rotate(cog_a)),
        RigidTransform::new(rot_b, u * gamma - rot_b.rotate(cog_b)),
    )
}

/// Rotation taking `from` onto `to` plus a random twist about `to`; a fully
/// random orientation when either vector is degenerate
fn align(from: Vec3, to: Vec3, rng: &mut impl Rng) -> Quat {
    match to.try_normalize(GEOMETRY_EPSILON) {
        Some(axis) if from.norm() > GEOMETRY_EPSILON => {
            let twist = Quat::from_axis_angle(axis, random_angle(rng));
            twist.multiply(&Quat::from_unit_vectors(from, to))
        }
        _ => Quat::from_axis_angle(random_unit_vector(rng), random_angle(rng)),
    }
}

/// Any A/B pair closer than contact once both moves are applied
fn joined_overlap(
    arena: &ParticleArena,
    a: &Cluster,
    b: &Cluster,
    join: &Join,
    delta: f64,
) -> bool {
    let placed_b: Vec<_> = b
        .members()
        .iter()
        .map(|&j| trial_sphere(arena, j, join.b.apply(arena.center(j))))
        .collect();
    a.members().iter().any(|&i| {
        let sphere = trial_sphere(arena, i, join.a.apply(arena.center(i)));
        placed_b.iter().any(|other| spheres_overlap(&sphere, other, delta))
    })
}
