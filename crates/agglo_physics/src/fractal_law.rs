use serde::{Deserialize, Serialize};

/// Ordinary least-squares line y = intercept + slope·x
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Standard error of the slope
    pub slope_error: f64,
    /// Root-mean-square residual
    pub residual_error: f64,
}

impl LineFit {
    /// None for fewer than two points or no spread in x
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        let len = xs.len().min(ys.len());
        if len < 2 {
            return None;
        }
        let (xs, ys) = (&xs[..len], &ys[..len]);
        let n = len as f64;
        let sum_x: f64 = xs.iter().sum();
        let sum_y: f64 = ys.iter().sum();
        let sum_xx: f64 = xs.iter().map(|x| x * x).sum();
        let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
        let denom = n * sum_xx - sum_x * sum_x;
        if denom.abs() < 1e-15 {
            return None;
        }
        let slope = (n * sum_xy - sum_x * sum_y) / denom;
        let intercept = (sum_y - slope * sum_x) / n;

        let mean_x = sum_x / n;
        let mean_y = sum_y / n;
        let ss_tot: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
        let ss_res: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (y - intercept - slope * x).powi(2))
            .sum();
        let ss_x: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
        let slope_error = if len > 2 && ss_x > 0.0 {
            (ss_res / (n - 2.0) / ss_x).sqrt()
        } else {
            0.0
        };

        Some(Self {
            slope,
            intercept,
            r_squared: if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 },
            slope_error,
            residual_error: (ss_res / n).sqrt(),
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Least-squares estimate of the fractal law from an Rg growth history
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FractalFit {
    pub df: f64,
    pub kf: f64,
    pub r_squared: f64,
    pub samples: usize,
}

impl FractalFit {
    /// Fits ln N = ln kf + Df·ln(Rg/rp) over `(n, rg)` samples with n ≥ `min_n`.
    /// None with fewer than three usable samples or no spread in Rg.
    pub fn fit(history: &[(usize, f64)], rp: f64, min_n: usize) -> Option<Self> {
        if rp <= 0.0 {
            return None;
        }
        let (xs, ys): (Vec<f64>, Vec<f64>) = history
            .iter()
            .filter(|&&(n, rg)| n >= min_n.max(2) && rg > 0.0 && rg.is_finite())
            .map(|&(n, rg)| ((rg / rp).ln(), (n as f64).ln()))
            .unzip();
        if xs.len() < 3 {
            return None;
        }
        let line = LineFit::fit(&xs, &ys)?;

        Some(Self {
            df: line.slope,
            kf: line.intercept.exp(),
            r_squared: line.r_squared,
            samples: xs.len(),
        })
    }
}
