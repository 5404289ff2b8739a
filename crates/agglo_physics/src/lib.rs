pub mod box_counting;
pub mod cluster;
pub mod collision;
pub mod fractal_law;
pub mod geometry;
pub mod metrics;
pub mod quaternion;
pub mod sampling;

pub use box_counting::BoxCount;
pub use cluster::{Cluster, ParticleArena};
pub use fractal_law::{FractalFit, LineFit};
pub use geometry::{Coordination, SurfaceMesh};
pub use metrics::Morphology;
pub use quaternion::{Quat, RigidTransform};
