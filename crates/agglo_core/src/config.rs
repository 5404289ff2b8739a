use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::distribution::Distribution;
use crate::error::{AggregationError, Result};
use crate::fractal::FractalLaw;

/// Aggregation method family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Ballistic particle-cluster: monomers hit one growing cluster
    #[serde(rename = "PC")]
    Pc,
    /// Ballistic cluster-cluster: random pairs of clusters collide
    #[serde(rename = "CC")]
    Cc,
    #[serde(rename = "TuningPC")]
    TunablePc,
    #[serde(rename = "TuningCC")]
    TunableCc,
    /// Diffusion-limited: monomers random-walk in from far away
    #[serde(rename = "DLA")]
    Dla,
    /// Clusters diffuse in a closed box and stick on contact
    #[serde(rename = "CCA")]
    BrownianCc,
}

impl Method {
    pub fn is_tunable(self) -> bool {
        matches!(self, Method::TunablePc | Method::TunableCc)
    }

    pub fn is_diffusive(self) -> bool {
        matches!(self, Method::Dla | Method::BrownianCc)
    }

    pub fn label(self) -> &'static str {
        match self {
            Method::Pc => "PC",
            Method::Cc => "CC",
            Method::TunablePc => "TuningPC",
            Method::TunableCc => "TuningCC",
            Method::Dla => "DLA",
            Method::BrownianCc => "CCA",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for Method {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pc" => Ok(Method::Pc),
            "cc" => Ok(Method::Cc),
            "tuningpc" | "tunable-pc" | "tunablepc" => Ok(Method::TunablePc),
            "tuningcc" | "tunable-cc" | "tunablecc" => Ok(Method::TunableCc),
            "dla" => Ok(Method::Dla),
            "cca" | "brownian-cc" | "browniancc" => Ok(Method::BrownianCc),
            other => Err(AggregationError::invalid(format!("unknown method '{other}'"))),
        }
    }
}

/// Model constant in the placement-distance closed form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GammaModel {
    /// c = 3/5, sphere self-inertia
    Lapuerta,
    /// c = 0, point masses
    Filippov,
}

impl GammaModel {
    pub fn constant(self) -> f64 {
        match self {
            GammaModel::Lapuerta => LAPUERTA_CONSTANT,
            GammaModel::Filippov => FILIPPOV_CONSTANT,
        }
    }
}

/// What happens when every rotation of a candidate placement still overlaps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverlapPolicy {
    /// Drop the reference monomer (or candidate pair) and try the next one
    #[default]
    NextReference,
    /// Keep the last rotated position even though it overlaps
    AcceptLast,
    /// Abort the build with RetryExhausted
    Fail,
}

/// Number of primaries: literal, or drawn once per build and clamped to [min, max]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParticleCount {
    Fixed(usize),
    Sampled {
        min: usize,
        max: usize,
        distribution: Distribution,
    },
}

impl ParticleCount {
    pub fn resolve(&self, rng: &mut impl Rng) -> usize {
        match *self {
            ParticleCount::Fixed(n) => n,
            ParticleCount::Sampled { min, max, distribution } => {
                let drawn = distribution.sample(rng).round();
                let drawn = if drawn.is_finite() { drawn.max(0.0) as usize } else { min };
                drawn.clamp(min, max)
            }
        }
    }

    /// Largest count this setting can produce
    pub fn upper_bound(&self) -> usize {
        match *self {
            ParticleCount::Fixed(n) => n,
            ParticleCount::Sampled { max, .. } => max,
        }
    }

    fn lower_bound(&self) -> usize {
        match *self {
            ParticleCount::Fixed(n) => n,
            ParticleCount::Sampled { min, .. } => min,
        }
    }
}

/// Random-walk settings shared by the DLA and Brownian cluster-cluster engines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffusionSettings {
    /// Chance that a contact sticks; a refused contact cancels the move
    pub stickiness: f64,
    /// Step length in units of the moving monomer's radius
    pub walk_step: f64,
    /// DLA walkers spawn this many radii outside the cluster's bounding sphere
    pub spawn_gap: f64,
    /// DLA walkers beyond escape_multiplier × spawn radius are relaunched
    pub escape_multiplier: f64,
    pub max_walk_steps: usize,
    /// Solid volume fraction of the Brownian box
    pub volume_fraction: f64,
    pub max_brownian_moves: usize,
}

impl Default for DiffusionSettings {
    fn default() -> Self {
        Self {
            stickiness: 1.0,
            walk_step: DEFAULT_WALK_STEP,
            spawn_gap: DEFAULT_SPAWN_GAP,
            escape_multiplier: DEFAULT_ESCAPE_MULTIPLIER,
            max_walk_steps: DEFAULT_MAX_WALK_STEPS,
            volume_fraction: DEFAULT_VOLUME_FRACTION,
            max_brownian_moves: DEFAULT_MAX_BROWNIAN_MOVES,
        }
    }
}

impl DiffusionSettings {
    fn validate(&self) -> Result<()> {
        if !(self.stickiness > 0.0 && self.stickiness <= 1.0) {
            return Err(AggregationError::invalid(format!(
                "stickiness {} outside (0, 1]",
                self.stickiness
            )));
        }
        if !(self.walk_step > 0.0 && self.walk_step.is_finite()) {
            return Err(AggregationError::invalid("walk_step must be positive"));
        }
        if !(self.spawn_gap >= 0.0 && self.spawn_gap.is_finite()) {
            return Err(AggregationError::invalid("spawn_gap must be non-negative"));
        }
        if !(self.escape_multiplier > 1.0 && self.escape_multiplier.is_finite()) {
            return Err(AggregationError::invalid("escape_multiplier must exceed 1"));
        }
        if !(self.volume_fraction > 0.0 && self.volume_fraction <= 0.5) {
            return Err(AggregationError::invalid(format!(
                "volume_fraction {} outside (0, 0.5]",
                self.volume_fraction
            )));
        }
        if self.max_walk_steps == 0 || self.max_brownian_moves == 0 {
            return Err(AggregationError::invalid("walk budgets must be positive"));
        }
        Ok(())
    }
}

/// Surface-sampled 3D box counting of the finished aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxCountingSettings {
    /// Surface points per primary; 0 skips box counting
    pub points_per_sphere: usize,
    /// Bits per axis of the counting grid
    pub precision: u32,
}

impl Default for BoxCountingSettings {
    fn default() -> Self {
        Self {
            points_per_sphere: DEFAULT_BOX_POINTS_PER_SPHERE,
            precision: DEFAULT_BOX_PRECISION,
        }
    }
}

impl BoxCountingSettings {
    pub fn enabled(&self) -> bool {
        self.points_per_sphere > 0
    }
}

/// Everything one build needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    pub method: Method,
    pub particle_count: ParticleCount,
    /// Primary particle diameter, sampled once per particle
    pub primary_diameter: Distribution,
    /// δ: 1 = tangent contact, up to √3 = interpenetrating. Drawn once per
    /// merge or placement; draws are clamped to [1, √3].
    pub sintering_coefficient: Distribution,
    pub target_df: f64,
    pub target_kf: f64,
    pub gamma_model: GammaModel,
    /// Ballistic seed of tunable PC, sub-cluster size of tunable CC.
    /// A seed of 1 still starts tunable PC from a ballistic dimer.
    pub seed_cluster_size: usize,
    pub max_rotation_attempts: usize,
    pub max_pair_attempts: usize,
    pub max_placement_attempts: usize,
    pub overlap_policy: OverlapPolicy,
    pub diffusion: DiffusionSettings,
    pub box_counting: BoxCountingSettings,
    pub surface_mesh_resolution: usize,
    pub random_seed: u64,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            method: Method::TunablePc,
            particle_count: ParticleCount::Fixed(100),
            primary_diameter: Distribution::Fixed(25.0),
            sintering_coefficient: Distribution::Fixed(MIN_SINTERING_COEFFICIENT),
            target_df: 1.8,
            target_kf: 1.3,
            gamma_model: GammaModel::Lapuerta,
            seed_cluster_size: SUBCLUSTER_SEED_SIZE,
            max_rotation_attempts: DEFAULT_MAX_ROTATION_ATTEMPTS,
            max_pair_attempts: DEFAULT_MAX_PAIR_ATTEMPTS,
            max_placement_attempts: DEFAULT_MAX_PLACEMENT_ATTEMPTS,
            overlap_policy: OverlapPolicy::NextReference,
            diffusion: DiffusionSettings::default(),
            box_counting: BoxCountingSettings::default(),
            surface_mesh_resolution: DEFAULT_MESH_RESOLUTION,
            random_seed: 42,
        }
    }
}

impl SimulationParameters {
    pub fn fractal_law(&self) -> FractalLaw {
        FractalLaw::new(self.target_df, self.target_kf, self.gamma_model.constant())
    }

    /// Smallest and largest δ a draw can produce after clamping
    pub fn sintering_range(&self) -> (f64, f64) {
        let (lo, hi) = self.sintering_coefficient.support();
        let clamp = |d: f64| d.clamp(MIN_SINTERING_COEFFICIENT, MAX_SINTERING_COEFFICIENT);
        (clamp(lo), clamp(hi))
    }

    /// One δ draw; Fixed laws consume no randomness
    pub fn sample_sintering(&self, rng: &mut impl Rng) -> f64 {
        let delta = self.sintering_coefficient.sample(rng);
        if delta.is_finite() {
            delta.clamp(MIN_SINTERING_COEFFICIENT, MAX_SINTERING_COEFFICIENT)
        } else {
            self.sintering_range().0
        }
    }

    /// Eager checks. Tunable methods also get their closed-form placement
    /// distances checked for being real, using the mean radius.
    pub fn validate(&self) -> Result<()> {
        if let ParticleCount::Sampled { min, max, distribution } = self.particle_count {
            if min > max {
                return Err(AggregationError::invalid(format!(
                    "particle_count: min {min} > max {max}"
                )));
            }
            distribution.validate("particle_count")?;
        }
        if self.particle_count.lower_bound() == 0 {
            return Err(AggregationError::invalid("particle_count must be at least 1"));
        }
        self.primary_diameter.validate("primary_diameter")?;
        self.validate_sintering()?;

        if self.max_rotation_attempts == 0
            || self.max_pair_attempts == 0
            || self.max_placement_attempts == 0
        {
            return Err(AggregationError::invalid("attempt budgets must be positive"));
        }
        if self.surface_mesh_resolution < 2 {
            return Err(AggregationError::invalid(
                "surface_mesh_resolution must be at least 2",
            ));
        }
        if self.box_counting.enabled()
            && !(1..=MAX_BOX_PRECISION).contains(&self.box_counting.precision)
        {
            return Err(AggregationError::invalid(format!(
                "box_counting.precision {} outside [1, {MAX_BOX_PRECISION}]",
                self.box_counting.precision
            )));
        }
        if self.method.is_diffusive() {
            self.diffusion.validate()?;
        }
        if !self.method.is_tunable() {
            return Ok(());
        }

        let lower = self.particle_count.lower_bound();
        if self.seed_cluster_size == 0 || self.seed_cluster_size > lower {
            return Err(AggregationError::invalid(format!(
                "seed_cluster_size {} must lie in [1, {lower}]",
                self.seed_cluster_size
            )));
        }
        if !(self.target_df > 0.0 && self.target_df <= 3.0) {
            return Err(AggregationError::invalid(format!(
                "target_df {} outside (0, 3]",
                self.target_df
            )));
        }
        if !(self.target_kf > 0.0 && self.target_kf.is_finite()) {
            return Err(AggregationError::invalid(format!(
                "target_kf {} must be positive",
                self.target_kf
            )));
        }
        self.validate_law()
    }

    fn validate_sintering(&self) -> Result<()> {
        let law = self.sintering_coefficient;
        law.check_shape("sintering_coefficient")?;
        let range = MIN_SINTERING_COEFFICIENT..=MAX_SINTERING_COEFFICIENT;
        let ok = match law {
            Distribution::Fixed(delta) => range.contains(&delta),
            Distribution::Uniform { min, max } => range.contains(&min) && range.contains(&max),
            // Tails are clamped; the center has to be admissible
            Distribution::Normal { mean, .. } => range.contains(&mean),
        };
        if !ok {
            return Err(AggregationError::invalid(format!(
                "sintering_coefficient {law:?} outside [1, √3]"
            )));
        }
        Ok(())
    }

    /// Γ² is positive in exact arithmetic for every split, so what this
    /// catches is Df/kf combinations whose power terms leave f64 range.
    fn validate_law(&self) -> Result<()> {
        let rp = 0.5 * self.primary_diameter.mean();
        let law = self.fractal_law();
        let upper = self.particle_count.upper_bound();
        let infeasible = match self.method {
            Method::TunablePc => {
                let seed = self.seed_cluster_size.max(SUBCLUSTER_SEED_SIZE);
                law.first_infeasible_step(seed + 1, upper, rp)
            }
            Method::TunableCc => {
                let chunk = self.seed_cluster_size.min(upper);
                law.first_infeasible_step(SUBCLUSTER_SEED_SIZE + 1, chunk, rp)
                    .or_else(|| (!law.joins_feasible(upper, rp)).then_some(upper))
            }
            _ => None,
        };
        match infeasible {
            Some(n) => Err(AggregationError::invalid(format!(
                "placement distance is not real at n = {n} for Df = {}, kf = {}",
                self.target_df, self.target_kf
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_default_is_valid() {
        SimulationParameters::default().validate().unwrap();
    }

    #[test]
    fn test_sintering_bounds() {
        let mut p = SimulationParameters {
            sintering_coefficient: Distribution::Fixed(0.9),
            ..Default::default()
        };
        assert!(p.validate().is_err());
        p.sintering_coefficient = Distribution::Fixed(1.8);
        assert!(p.validate().is_err());
        p.sintering_coefficient = Distribution::Fixed(MAX_SINTERING_COEFFICIENT);
        assert!(p.validate().is_ok());
        p.sintering_coefficient = Distribution::Uniform { min: 1.0, max: 2.0 };
        assert!(p.validate().is_err());
        p.sintering_coefficient = Distribution::Normal { mean: 1.2, std: -0.1 };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_sintering_draws_are_clamped() {
        let p = SimulationParameters {
            sintering_coefficient: Distribution::Normal { mean: 1.05, std: 0.5 },
            ..Default::default()
        };
        p.validate().unwrap();
        assert_eq!(p.sintering_range(), (1.0, MAX_SINTERING_COEFFICIENT));
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..500 {
            let delta = p.sample_sintering(&mut rng);
            assert!((1.0..=MAX_SINTERING_COEFFICIENT).contains(&delta));
        }

        let p = SimulationParameters {
            sintering_coefficient: Distribution::Uniform { min: 1.1, max: 1.3 },
            ..Default::default()
        };
        assert_eq!(p.sintering_range(), (1.1, 1.3));
    }

    #[test]
    fn test_tunable_checks() {
        let p = SimulationParameters {
            target_df: 3.5,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(AggregationError::InvalidParameters(_))));

        let p = SimulationParameters {
            seed_cluster_size: 500,
            ..Default::default()
        };
        assert!(p.validate().is_err());

        // Ballistic methods ignore the fractal targets
        let p = SimulationParameters {
            method: Method::Cc,
            target_df: -1.0,
            ..Default::default()
        };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_law_overflow_is_rejected_for_both_tunable_methods() {
        for method in [Method::TunablePc, Method::TunableCc] {
            let p = SimulationParameters {
                method,
                particle_count: ParticleCount::Fixed(50),
                target_df: 0.5,
                target_kf: 1e-300,
                seed_cluster_size: 5,
                ..Default::default()
            };
            assert!(matches!(p.validate(), Err(AggregationError::InvalidParameters(_))));
        }
    }

    #[test]
    fn test_cluster_method_accepts_single_monomer_seeds() {
        let p = SimulationParameters {
            method: Method::TunableCc,
            particle_count: ParticleCount::Fixed(50),
            seed_cluster_size: 1,
            ..Default::default()
        };
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_diffusion_settings_checked_for_diffusive_methods() {
        let mut p = SimulationParameters {
            method: Method::Dla,
            ..Default::default()
        };
        p.validate().unwrap();
        p.diffusion.stickiness = 0.0;
        assert!(p.validate().is_err());
        p.method = Method::Pc;
        assert!(p.validate().is_ok());
        p.method = Method::BrownianCc;
        p.diffusion.stickiness = 0.5;
        p.diffusion.volume_fraction = 0.9;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_box_precision_range() {
        let mut p = SimulationParameters::default();
        p.box_counting.precision = 22;
        assert!(p.validate().is_err());
        p.box_counting.points_per_sphere = 0;
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_method_wire_names() {
        let json = serde_json::to_string(&Method::TunableCc).unwrap();
        assert_eq!(json, "\"TuningCC\"");
        let m: Method = serde_json::from_str("\"PC\"").unwrap();
        assert_eq!(m, Method::Pc);
        let m: Method = serde_json::from_str("\"CCA\"").unwrap();
        assert_eq!(m, Method::BrownianCc);
        assert_eq!("tuningpc".parse::<Method>().unwrap(), Method::TunablePc);
        assert_eq!("dla".parse::<Method>().unwrap(), Method::Dla);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let p: SimulationParameters =
            serde_json::from_str(r#"{ "method": "CC", "particle_count": { "Fixed": 40 } }"#)
                .unwrap();
        assert_eq!(p.method, Method::Cc);
        assert_eq!(p.particle_count, ParticleCount::Fixed(40));
        assert_eq!(p.max_rotation_attempts, DEFAULT_MAX_ROTATION_ATTEMPTS);
        assert_eq!(p.diffusion, DiffusionSettings::default());
    }

    #[test]
    fn test_sampled_count_is_clamped() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let count = ParticleCount::Sampled {
            min: 50,
            max: 60,
            distribution: Distribution::Normal { mean: 55.0, std: 40.0 },
        };
        for _ in 0..200 {
            let n = count.resolve(&mut rng);
            assert!((50..=60).contains(&n));
        }
    }
}
