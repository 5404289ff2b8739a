//! Ballistic contact: which monomers can meet along a straight trajectory,
//! and how far the moving cluster travels before the first of them touch.

use agglo_core::{Spherical, Vec3};

/// Distance from `point` to the line through `origin` along unit `direction`
pub fn distance_to_line(point: Vec3, origin: Vec3, direction: Vec3) -> f64 {
    let w = point - origin;
    (w - direction * w.dot(&direction)).norm()
}

/// A culled (impacted, impactant) pair, as indices into the two input slices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidatePair {
    pub impacted: usize,
    pub impactant: usize,
}

/// First contact found along the trajectory
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub pair: CandidatePair,
    /// Distance the impactant travels along −v
    pub travel: f64,
}

/// Broad phase: impactant monomers move along −`direction`; keep every
/// impacted monomer whose center lies within (r_i + r_j)/δ of that path line.
pub fn cull<A: Spherical, B: Spherical>(
    impacted: &[A],
    impactant: &[B],
    direction: Vec3,
    delta: f64,
) -> Vec<CandidatePair> {
    let mut pairs = Vec::new();
    for (j, moving) in impactant.iter().enumerate() {
        let start = moving.center();
        for (i, fixed) in impacted.iter().enumerate() {
            let reach = (fixed.radius() + moving.radius()) / delta;
            if distance_to_line(fixed.center(), start, direction) <= reach {
                pairs.push(CandidatePair { impacted: i, impactant: j });
            }
        }
    }
    pairs
}

/// Narrow phase: smallest t ≥ 0 with ‖(q − t·v) − p‖ = `reach`, if any.
pub fn contact_travel(fixed: Vec3, moving: Vec3, direction: Vec3, reach: f64) -> Option<f64> {
    let w = moving - fixed;
    let b = w.dot(&direction);
    let disc = b * b - (w.norm_squared() - reach * reach);
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    let (near, far) = (b - root, b + root);
    if near >= 0.0 {
        Some(near)
    } else if far >= 0.0 {
        Some(far)
    } else {
        None
    }
}

/// Global resolution: the culled pair that touches first wins
pub fn first_contact<A: Spherical, B: Spherical>(
    impacted: &[A],
    impactant: &[B],
    direction: Vec3,
    delta: f64,
) -> Option<Contact> {
    cull(impacted, impactant, direction, delta)
        .into_iter()
        .filter_map(|pair| {
            let fixed = &impacted[pair.impacted];
            let moving = &impactant[pair.impactant];
            let reach = (fixed.radius() + moving.radius()) / delta;
            contact_travel(fixed.center(), moving.center(), direction, reach)
                .map(|travel| Contact { pair, travel })
        })
        .min_by(|a, b| a.travel.total_cmp(&b.travel))
}
