pub mod config;
pub mod constants;
pub mod distribution;
pub mod error;
pub mod fractal;
pub mod types;

pub use config::*;
pub use constants::*;
pub use distribution::Distribution;
pub use error::{AggregationError, Result};
pub use fractal::FractalLaw;
pub use types::*;
