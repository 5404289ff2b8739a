use std::time::Instant;

use agglo_core::{AggregationError, Method, Result, SimulationParameters};
use agglo_physics::geometry::{self, Coordination, SurfaceMesh};
use agglo_physics::{BoxCount, FractalFit, Morphology};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::aggregate::Aggregate;
use crate::state::BuildState;
use crate::{brownian, dla, generic, tunable_cc, tunable_pc};

/// Runs one complete build. Same parameters and seed, same coordinates.
pub fn simulate(params: &SimulationParameters) -> Result<Aggregate> {
    params.validate()?;
    let started = Instant::now();
    let mut rng = ChaCha8Rng::seed_from_u64(params.random_seed);

    let n = params.particle_count.resolve(&mut rng);
    if params.method.is_tunable() && params.seed_cluster_size > n {
        return Err(AggregationError::invalid(format!(
            "seed_cluster_size {} exceeds the drawn particle count {n}",
            params.seed_cluster_size
        )));
    }
    let radii = (0..n)
        .map(|_| params.primary_diameter.sample_positive(&mut rng).map(|d| 0.5 * d))
        .collect::<Result<Vec<f64>>>()?;

    info!(method = %params.method, n, seed = params.random_seed, "starting build");
    let mut state = BuildState::new(params, &radii, rng);
    let indices: Vec<usize> = (0..n).collect();
    let cluster = match params.method {
        Method::Pc | Method::Cc => generic::aggregate(&mut state, &indices, params.method)?,
        Method::TunablePc => {
            tunable_pc::aggregate(&mut state, &indices, params.seed_cluster_size)?
        }
        Method::TunableCc => tunable_cc::aggregate(&mut state, &indices)?,
        Method::Dla => dla::aggregate(&mut state, &indices)?,
        Method::BrownianCc => brownian::aggregate(&mut state, &indices)?,
    };
    if cluster.len() != n {
        return Err(AggregationError::infeasible(
            n,
            format!("aggregate holds {} of {n} particles", cluster.len()),
        ));
    }

    let BuildState {
        arena,
        mut diagnostics,
        rg_evolution,
        ..
    } = state;
    let particles: Vec<_> = arena.particles().iter().map(|p| p.record()).collect();
    let reference = geometry::reference(&particles);
    let mesh = SurfaceMesh::new(params.surface_mesh_resolution);
    let rp = arena.mean_radius(&indices);
    // Early growth is dominated by the seed; fit the last three quarters
    let fractal_fit = FractalFit::fit(&rg_evolution, rp, (n / 4).max(2));
    let settings = params.box_counting;
    let box_counting = settings
        .enabled()
        .then(|| BoxCount::agglomerate(&particles, settings.points_per_sphere, settings.precision))
        .flatten();
    // Every contact sits within (ri + rj)/δ of the loosest draw
    let (delta_lo, _) = params.sintering_range();
    diagnostics.elapsed_ms = started.elapsed().as_millis() as u64;

    let aggregate = Aggregate {
        bounding_diameter: geometry::bounding_diameter(&particles, &mesh),
        coordination: Coordination::compute(&particles, delta_lo),
        morphology: Morphology::compute(&particles),
        reference,
        fractal_fit,
        box_counting,
        rg_evolution,
        diagnostics,
        particles,
    };
    info!(
        n,
        rg = aggregate.reference.radius_of_gyration,
        df = aggregate.fractal_fit.map(|f| f.df),
        box_df = aggregate.box_counting.as_ref().map(|b| b.dimension),
        elapsed_ms = aggregate.diagnostics.elapsed_ms,
        "build finished"
    );
    Ok(aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agglo_core::{Distribution, ParticleCount};

    #[test]
    fn test_flat_buffer_matches_records() {
        let params = SimulationParameters {
            method: Method::Cc,
            particle_count: ParticleCount::Fixed(8),
            ..Default::default()
        };
        let aggregate = simulate(&params).unwrap();
        let flat = aggregate.as_flat_buffer();
        assert_eq!(flat.len(), 32);
        assert_eq!(flat[4], aggregate.particles[1].x);
        assert_eq!(flat[7], aggregate.particles[1].radius);
    }

    #[test]
    fn test_sampled_inputs_are_resolved_once() {
        let params = SimulationParameters {
            method: Method::Pc,
            particle_count: ParticleCount::Sampled {
                min: 10,
                max: 20,
                distribution: Distribution::Uniform { min: 10.0, max: 20.0 },
            },
            primary_diameter: Distribution::Normal { mean: 20.0, std: 3.0 },
            ..Default::default()
        };
        let a = simulate(&params).unwrap();
        let b = simulate(&params).unwrap();
        assert!((10..=20).contains(&a.len()));
        assert_eq!(a.particles, b.particles);
        assert!(a.particles.iter().all(|p| p.radius > 0.0));
    }

    #[test]
    fn test_invalid_parameters_fail_fast() {
        let params = SimulationParameters {
            sintering_coefficient: Distribution::Fixed(2.5),
            ..Default::default()
        };
        assert!(matches!(simulate(&params), Err(AggregationError::InvalidParameters(_))));
    }

    #[test]
    fn test_box_counting_follows_settings() {
        let mut params = SimulationParameters {
            method: Method::Dla,
            particle_count: ParticleCount::Fixed(40),
            ..Default::default()
        };
        let counted = simulate(&params).unwrap();
        let boxes = counted.box_counting.as_ref().unwrap();
        assert_eq!(boxes.points, 40 * params.box_counting.points_per_sphere);
        assert!(boxes.dimension > 1.0 && boxes.dimension < 3.2);

        params.box_counting.points_per_sphere = 0;
        let skipped = simulate(&params).unwrap();
        assert!(skipped.box_counting.is_none());
        assert_eq!(skipped.particles, counted.particles);
    }

    #[test]
    fn test_coordination_uses_loosest_contact() {
        let params = SimulationParameters {
            method: Method::Cc,
            particle_count: ParticleCount::Fixed(30),
            sintering_coefficient: Distribution::Uniform { min: 1.0, max: 1.5 },
            ..Default::default()
        };
        let aggregate = simulate(&params).unwrap();
        assert_eq!(aggregate.coordination.components, 1);
        assert_eq!(aggregate.diagnostics.sintering_samples.len(), 29);
    }
}
