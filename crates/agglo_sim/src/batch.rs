use agglo_core::{Result, STUDY_SEED_STRIDE, SimulationParameters};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::pipeline::simulate;

/// Grid of fractal targets, each built with several seeds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParametricStudy {
    pub base: SimulationParameters,
    /// (target Df, target kf) combinations
    pub grid: Vec<(f64, f64)>,
    pub seeds_per_combination: usize,
    pub base_seed: u64,
}

impl ParametricStudy {
    /// One parameter set per (combination, seed), combination-major.
    /// Seeds follow base_seed + k·7919 over the whole job list.
    pub fn jobs(&self) -> Vec<SimulationParameters> {
        let mut jobs = Vec::with_capacity(self.grid.len() * self.seeds_per_combination);
        for &(df, kf) in &self.grid {
            for _ in 0..self.seeds_per_combination {
                let k = jobs.len() as u64;
                jobs.push(SimulationParameters {
                    target_df: df,
                    target_kf: kf,
                    random_seed: self.base_seed.wrapping_add(k.wrapping_mul(STUDY_SEED_STRIDE)),
                    ..self.base.clone()
                });
            }
        }
        jobs
    }

    pub fn run(&self) -> Vec<Result<Aggregate>> {
        run_batch(&self.jobs())
    }
}

/// Builds every job in parallel; results come back in job order
pub fn run_batch(jobs: &[SimulationParameters]) -> Vec<Result<Aggregate>> {
    jobs.par_iter().map(simulate).collect()
}

/// Outcome of all seeds of one (Df, kf) combination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudySummary {
    pub target_df: f64,
    pub target_kf: f64,
    pub runs: usize,
    pub failures: usize,
    /// Means over successful runs with a usable fit
    pub mean_fitted_df: Option<f64>,
    pub mean_fitted_kf: Option<f64>,
    /// Mean over successful runs
    pub mean_rg: Option<f64>,
}

/// Groups `results` (as returned by [`ParametricStudy::run`]) per combination
pub fn summarize(study: &ParametricStudy, results: &[Result<Aggregate>]) -> Vec<StudySummary> {
    let per = study.seeds_per_combination.max(1);
    study
        .grid
        .iter()
        .zip(results.chunks(per))
        .map(|(&(df, kf), chunk)| {
            let built: Vec<&Aggregate> = chunk.iter().filter_map(|r| r.as_ref().ok()).collect();
            let fits: Vec<_> = built.iter().filter_map(|a| a.fractal_fit).collect();
            StudySummary {
                target_df: df,
                target_kf: kf,
                runs: chunk.len(),
                failures: chunk.len() - built.len(),
                mean_fitted_df: mean(fits.iter().map(|f| f.df)),
                mean_fitted_kf: mean(fits.iter().map(|f| f.kf)),
                mean_rg: mean(built.iter().map(|a| a.radius_of_gyration())),
            }
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agglo_core::{Method, ParticleCount};

    fn study() -> ParametricStudy {
        ParametricStudy {
            base: SimulationParameters {
                method: Method::TunablePc,
                particle_count: ParticleCount::Fixed(40),
                ..Default::default()
            },
            grid: vec![(1.8, 1.3), (2.0, 1.5)],
            seeds_per_combination: 3,
            base_seed: 1000,
        }
    }

    #[test]
    fn test_job_expansion() {
        let jobs = study().jobs();
        assert_eq!(jobs.len(), 6);
        assert_eq!(jobs[0].random_seed, 1000);
        assert_eq!(jobs[4].random_seed, 1000 + 4 * 7919);
        assert_eq!(jobs[3].target_df, 2.0);
        assert_eq!(jobs[2].target_kf, 1.3);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let study = study();
        let jobs = study.jobs();
        let parallel = run_batch(&jobs);
        for (job, result) in jobs.iter().zip(&parallel) {
            let sequential = simulate(job);
            match (result, sequential) {
                (Ok(a), Ok(b)) => assert_eq!(a.particles, b.particles),
                (Err(a), Err(b)) => assert_eq!(a, &b),
                _ => panic!("parallel and sequential builds disagree"),
            }
        }
        let summary = summarize(&study, &parallel);
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].runs, 3);
    }
}
