use serde::{Deserialize, Serialize};

/// The fractal scaling law N = kf·(Rg/rp)^Df and the closed-form placement
/// distances derived from it.
///
/// For two clusters of sizes n1 and n2 whose centers of gravity sit Γ apart,
/// conservation of the second moment gives
///
/// Γ² = rp²·N/(n1·n2)·[N·A(N) − n1·A(n1) − n2·A(n2)],  A(k) = (k/kf)^(2/Df) − c
///
/// with N = n1 + n2 and `c` the model constant. Particle-cluster growth is the
/// n2 = 1 case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FractalLaw {
    pub df: f64,
    pub kf: f64,
    pub constant: f64,
}

impl FractalLaw {
    pub fn new(df: f64, kf: f64, constant: f64) -> Self {
        Self { df, kf, constant }
    }

    fn term(&self, k: f64) -> f64 {
        (k / self.kf).powf(2.0 / self.df) - self.constant
    }

    /// Radius of gyration the law prescribes for `n` primaries of radius `rp`
    pub fn radius_of_gyration(&self, n: usize, rp: f64) -> f64 {
        rp * (n as f64 / self.kf).powf(1.0 / self.df)
    }

    /// Γ² for joining clusters of `n1` and `n2` primaries. May be negative;
    /// the caller decides whether that is a parameter error.
    pub fn cluster_gamma_squared(&self, n1: usize, n2: usize, rp: f64) -> f64 {
        let (a, b) = (n1 as f64, n2 as f64);
        let n = a + b;
        rp * rp * n / (a * b) * (n * self.term(n) - a * self.term(a) - b * self.term(b))
    }

    /// Center-of-gravity separation Γ, or None when Γ² is not positive
    pub fn cluster_gamma(&self, n1: usize, n2: usize, rp: f64) -> Option<f64> {
        if n1 == 0 || n2 == 0 {
            return None;
        }
        let g2 = self.cluster_gamma_squared(n1, n2, rp);
        (g2.is_finite() && g2 > 0.0).then(|| g2.sqrt())
    }

    /// Distance from the current center of gravity at which the `n`-th
    /// monomer must be placed (γ = rp·sqrt(γ1 − γ2 − γ3))
    pub fn particle_gamma(&self, n: usize, rp: f64) -> Option<f64> {
        if n < 2 {
            return None;
        }
        self.cluster_gamma(n - 1, 1, rp)
    }

    /// First monomer count in `from..=to` whose placement distance is not real
    pub fn first_infeasible_step(&self, from: usize, to: usize, rp: f64) -> Option<usize> {
        (from.max(2)..=to).find(|&n| self.particle_gamma(n, rp).is_none())
    }

    /// Whether joins that end at `total` primaries have a real Γ.
    ///
    /// The constant cancels in N·A(N) − n1·A(n1) − n2·A(n2), and k^(1+2/Df)
    /// is superadditive, so Γ² only loses its sign when the power terms
    /// overflow or underflow. Those are monotone in k, so the most lopsided
    /// and the even split of the largest cluster cover every smaller join.
    pub fn joins_feasible(&self, total: usize, rp: f64) -> bool {
        if total < 2 {
            return true;
        }
        let half = total / 2;
        self.cluster_gamma(total - 1, 1, rp).is_some()
            && self.cluster_gamma(total - half, half, rp).is_some()
    }
}
