use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Three-component position/direction in the caller's length unit
pub type Vec3 = nalgebra::Vector3<f64>;

/// Anything with a center and a radius: primary particles, export records, trial spheres
pub trait Spherical {
    fn center(&self) -> Vec3;
    fn radius(&self) -> f64;

    fn volume(&self) -> f64 {
        4.0 / 3.0 * std::f64::consts::PI * self.radius().powi(3)
    }
}

impl<T: Spherical + ?Sized> Spherical for &T {
    fn center(&self) -> Vec3 {
        (**self).center()
    }

    fn radius(&self) -> f64 {
        (**self).radius()
    }
}

/// One primary particle (monomer). The radius never changes after creation;
/// the center is expressed in the frame of whichever cluster owns it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Particle {
    pub id: usize,
    pub cluster_id: usize,
    pub center: Vec3,
    pub radius: f64,
}

impl Particle {
    pub fn new(id: usize, radius: f64) -> Self {
        Self {
            id,
            cluster_id: id,
            center: Vec3::zeros(),
            radius,
        }
    }

    pub fn record(&self) -> ParticleRecord {
        ParticleRecord {
            x: self.center.x,
            y: self.center.y,
            z: self.center.z,
            radius: self.radius,
        }
    }
}

impl Spherical for Particle {
    fn center(&self) -> Vec3 {
        self.center
    }

    fn radius(&self) -> f64 {
        self.radius
    }
}

/// Cached shape summary of a cluster, recomputed after every mutation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Reference {
    /// Mean of particle centers
    pub geometric_center: Vec3,
    /// Max distance from the geometric center to any particle surface
    pub bounding_radius: f64,
    /// Volume-weighted center
    pub center_of_gravity: Vec3,
    /// Includes each sphere's own 3/5·r² inertia term
    pub radius_of_gyration: f64,
}

impl Reference {
    pub fn zero() -> Self {
        Self {
            geometric_center: Vec3::zeros(),
            bounding_radius: 0.0,
            center_of_gravity: Vec3::zeros(),
            radius_of_gyration: 0.0,
        }
    }
}

/// Flat export row {x, y, z, radius}
/// repr(C) + Pod so a whole aggregate can be handed out as one `&[f64]`
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct ParticleRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub radius: f64,
}

impl ParticleRecord {
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl Spherical for ParticleRecord {
    fn center(&self) -> Vec3 {
        self.position()
    }

    fn radius(&self) -> f64 {
        self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        assert_eq!(std::mem::size_of::<ParticleRecord>(), 4 * std::mem::size_of::<f64>());
        let records = [
            ParticleRecord { x: 1.0, y: 2.0, z: 3.0, radius: 0.5 },
            ParticleRecord { x: -1.0, y: 0.0, z: 4.0, radius: 0.25 },
        ];
        let flat: &[f64] = bytemuck::cast_slice(&records);
        assert_eq!(flat, &[1.0, 2.0, 3.0, 0.5, -1.0, 0.0, 4.0, 0.25]);
    }

    #[test]
    fn test_particle_record_copies_center() {
        let mut p = Particle::new(7, 12.5);
        p.center = Vec3::new(1.0, -2.0, 3.0);
        let r = p.record();
        assert_eq!(r.position(), p.center);
        assert_eq!(r.radius, 12.5);
        assert_eq!(p.cluster_id, 7);
    }
}
