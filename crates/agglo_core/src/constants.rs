// Length units are whatever the caller uses for the primary diameter (nm in
// practice). Every constant below is either dimensionless or a count.

/// Lapuerta model constant: self-inertia of a homogeneous sphere, Rg² = 3/5·r²
pub const LAPUERTA_CONSTANT: f64 = 3.0 / 5.0;

/// Filippov model constant: primaries treated as point masses
pub const FILIPPOV_CONSTANT: f64 = 0.0;

/// Tangent contact (no interpenetration)
pub const MIN_SINTERING_COEFFICIENT: f64 = 1.0;

/// √3, the largest admissible interpenetration
pub const MAX_SINTERING_COEFFICIENT: f64 = 1.732_050_807_568_877_2;

/// Relative slack applied to contact distances when testing for overlap.
/// Placements are solved exactly, so only rounding noise has to be absorbed.
pub const OVERLAP_TOLERANCE: f64 = 1e-9;

/// Relative slack for the adjacency criterion ‖ci − cj‖ ≤ (ri + rj)/δ
pub const ADJACENCY_TOLERANCE: f64 = 1e-6;

/// Degenerate-length threshold for directions and axes
pub const GEOMETRY_EPSILON: f64 = 1e-12;

/// Polar subdivisions of the surface sampling mesh
pub const DEFAULT_MESH_RESOLUTION: usize = 24;

/// β redraws per reference monomer / candidate pair
pub const DEFAULT_MAX_ROTATION_ATTEMPTS: usize = 25;

/// Candidate monomer pairs tried per tunable cluster-cluster merge
pub const DEFAULT_MAX_PAIR_ATTEMPTS: usize = 25;

/// Budget for every trajectory resample / cluster redraw loop, per step
pub const DEFAULT_MAX_PLACEMENT_ATTEMPTS: usize = 10_000;

/// Ballistic seed used when tunable PC grows the sub-clusters of tunable CC
pub const SUBCLUSTER_SEED_SIZE: usize = 2;

/// Draws allowed when a diameter distribution keeps producing non-positive values
pub const DIAMETER_RESAMPLE_LIMIT: usize = 1_000;

/// Seed stride between jobs of a parametric study
pub const STUDY_SEED_STRIDE: u64 = 7919;

/// Random-walk step of a diffusing monomer, in units of its radius
pub const DEFAULT_WALK_STEP: f64 = 0.5;

/// Walkers start this many of their own radii outside the cluster's bounding sphere
pub const DEFAULT_SPAWN_GAP: f64 = 2.0;

/// A walker farther than this multiple of its spawn radius is dropped
pub const DEFAULT_ESCAPE_MULTIPLIER: f64 = 3.0;

/// Steps one walker may take before it is dropped
pub const DEFAULT_MAX_WALK_STEPS: usize = 1_000_000;

/// Solid volume fraction of the box Brownian clusters move in
pub const DEFAULT_VOLUME_FRACTION: f64 = 0.05;

/// Single-cluster moves allowed in one Brownian cluster-cluster build
pub const DEFAULT_MAX_BROWNIAN_MOVES: usize = 10_000_000;

/// Surface points per sphere for 3D box counting (0 disables it)
pub const DEFAULT_BOX_POINTS_PER_SPHERE: usize = 100;

/// Bits per axis of the box-counting grid
pub const DEFAULT_BOX_PRECISION: u32 = 18;

/// 21 bits per axis fill a 63-bit Morton code
pub const MAX_BOX_PRECISION: u32 = 21;
