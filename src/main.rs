//! Builds one agglomerate and prints it as JSON on stdout.
//!
//! Parameters come from flags, or from a JSON file given with `--config`
//! (flags are then ignored). Logs go to stderr; `RUST_LOG` overrides the
//! default `info` level.

use std::path::PathBuf;

use agglo_core::{
    BoxCountingSettings, DiffusionSettings, Distribution, GammaModel, Method, OverlapPolicy,
    ParticleCount, SimulationParameters,
};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MethodArg {
    Pc,
    Cc,
    TuningPc,
    TuningCc,
    Dla,
    Cca,
}

impl From<MethodArg> for Method {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Pc => Method::Pc,
            MethodArg::Cc => Method::Cc,
            MethodArg::TuningPc => Method::TunablePc,
            MethodArg::TuningCc => Method::TunableCc,
            MethodArg::Dla => Method::Dla,
            MethodArg::Cca => Method::BrownianCc,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    NextReference,
    AcceptLast,
    Fail,
}

impl From<PolicyArg> for OverlapPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::NextReference => OverlapPolicy::NextReference,
            PolicyArg::AcceptLast => OverlapPolicy::AcceptLast,
            PolicyArg::Fail => OverlapPolicy::Fail,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "agglo", about = "Fractal agglomerate generator")]
struct Args {
    /// JSON parameter file; replaces every other flag
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "tuning-pc")]
    method: MethodArg,

    /// Number of primary particles
    #[arg(short = 'n', long, default_value_t = 100)]
    particles: usize,

    /// Mean primary diameter
    #[arg(long, default_value_t = 25.0)]
    diameter: f64,

    /// Standard deviation of a normal diameter law (0 = monodisperse)
    #[arg(long, default_value_t = 0.0)]
    diameter_std: f64,

    /// Sintering coefficient δ in [1, √3]
    #[arg(long, default_value_t = 1.0)]
    delta: f64,

    /// Upper end of a uniform δ law, drawn afresh for every merge
    #[arg(long)]
    delta_max: Option<f64>,

    /// Probability that a diffusing contact sticks (dla, cca)
    #[arg(long, default_value_t = 1.0)]
    stickiness: f64,

    /// Surface points per sphere for box counting (0 skips it)
    #[arg(long, default_value_t = 100)]
    box_points: usize,

    #[arg(long, default_value_t = 1.8)]
    df: f64,

    #[arg(long, default_value_t = 1.3)]
    kf: f64,

    /// Use the Filippov constant (c = 0) instead of Lapuerta (c = 3/5)
    #[arg(long)]
    filippov: bool,

    /// Seed cluster size for tunable methods
    #[arg(long, default_value_t = 2)]
    seed_size: usize,

    #[arg(long, default_value_t = 25)]
    rotations: usize,

    #[arg(long, value_enum, default_value = "next-reference")]
    policy: PolicyArg,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,
}

impl Args {
    fn parameters(&self) -> Result<SimulationParameters> {
        if let Some(path) = &self.config {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            return serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()));
        }
        let primary_diameter = if self.diameter_std > 0.0 {
            Distribution::Normal {
                mean: self.diameter,
                std: self.diameter_std,
            }
        } else {
            Distribution::Fixed(self.diameter)
        };
        let sintering_coefficient = match self.delta_max {
            Some(max) => Distribution::Uniform { min: self.delta, max },
            None => Distribution::Fixed(self.delta),
        };
        let defaults = SimulationParameters::default();
        Ok(SimulationParameters {
            method: self.method.into(),
            particle_count: ParticleCount::Fixed(self.particles),
            primary_diameter,
            sintering_coefficient,
            target_df: self.df,
            target_kf: self.kf,
            gamma_model: if self.filippov { GammaModel::Filippov } else { GammaModel::Lapuerta },
            seed_cluster_size: self.seed_size,
            max_rotation_attempts: self.rotations,
            overlap_policy: self.policy.into(),
            random_seed: self.seed,
            diffusion: DiffusionSettings {
                stickiness: self.stickiness,
                ..defaults.diffusion
            },
            box_counting: BoxCountingSettings {
                points_per_sphere: self.box_points,
                ..defaults.box_counting
            },
            ..defaults
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();
    let params = args.parameters()?;
    let aggregate = agglo_sim::simulate(&params)?;
    info!(
        particles = aggregate.len(),
        rg = aggregate.radius_of_gyration(),
        bounding_diameter = aggregate.bounding_diameter,
        box_df = aggregate.box_counting.as_ref().map(|b| b.dimension),
        "aggregate ready"
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&aggregate)?
    } else {
        serde_json::to_string(&aggregate)?
    };
    println!("{json}");
    Ok(())
}
