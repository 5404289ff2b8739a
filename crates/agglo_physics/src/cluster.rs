use agglo_core::{OVERLAP_TOLERANCE, Particle, Reference, Spherical, Vec3};

use crate::geometry;
use crate::quaternion::RigidTransform;

/// Owns every primary particle of a build. Clusters refer to particles by
/// index, so a merge only moves indices between clusters.
#[derive(Debug, Clone, Default)]
pub struct ParticleArena {
    particles: Vec<Particle>,
}

impl ParticleArena {
    /// One particle per radius, each at the origin of its own singleton frame
    pub fn new(radii: &[f64]) -> Self {
        Self {
            particles: radii.iter().enumerate().map(|(i, &r)| Particle::new(i, r)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn get(&self, index: usize) -> &Particle {
        &self.particles[index]
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn center(&self, index: usize) -> Vec3 {
        self.particles[index].center
    }

    pub fn radius(&self, index: usize) -> f64 {
        self.particles[index].radius
    }

    pub fn set_center(&mut self, index: usize, center: Vec3) {
        self.particles[index].center = center;
    }

    pub fn gather(&self, members: &[usize]) -> Vec<&Particle> {
        members.iter().map(|&i| &self.particles[i]).collect()
    }

    pub fn mean_radius(&self, members: &[usize]) -> f64 {
        if members.is_empty() {
            return 0.0;
        }
        members.iter().map(|&i| self.particles[i].radius).sum::<f64>() / members.len() as f64
    }
}

/// A connected group of particles. Member centers are kept in the cluster's
/// own frame, geometric center at the origin, and the reference is
/// recomputed after every change.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: usize,
    members: Vec<usize>,
    reference: Reference,
}

impl Cluster {
    pub fn singleton(id: usize, particle: usize, arena: &mut ParticleArena) -> Self {
        Self::from_members(id, vec![particle], arena)
    }

    pub fn from_members(id: usize, members: Vec<usize>, arena: &mut ParticleArena) -> Self {
        let mut cluster = Self {
            id,
            members,
            reference: Reference::zero(),
        };
        cluster.set_id(id, arena);
        cluster.recenter(arena);
        cluster
    }

    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn spheres<'a>(&self, arena: &'a ParticleArena) -> Vec<&'a Particle> {
        arena.gather(&self.members)
    }

    pub fn set_id(&mut self, id: usize, arena: &mut ParticleArena) {
        self.id = id;
        for &i in &self.members {
            arena.particles[i].cluster_id = id;
        }
    }

    pub fn recompute(&mut self, arena: &ParticleArena) {
        self.reference = geometry::reference(&self.spheres(arena));
    }

    /// Shift members so the geometric center sits at the origin
    pub fn recenter(&mut self, arena: &mut ParticleArena) {
        let shift = geometry::center_of_geometry(&self.spheres(arena));
        for &i in &self.members {
            arena.particles[i].center -= shift;
        }
        self.recompute(arena);
    }

    /// Moves every member rigidly. The frame is left off-center; callers
    /// absorb or recenter afterwards.
    pub fn transform(&mut self, arena: &mut ParticleArena, transform: &RigidTransform) {
        for &i in &self.members {
            let p = &mut arena.particles[i];
            p.center = transform.apply(p.center);
        }
        self.recompute(arena);
    }

    /// Takes over `other`, whose members must already be expressed in this
    /// cluster's frame, then recenters.
    pub fn absorb(&mut self, other: Cluster, arena: &mut ParticleArena) {
        for &i in &other.members {
            arena.particles[i].cluster_id = self.id;
        }
        self.members.extend(other.members);
        self.recenter(arena);
    }

    /// Adds one particle whose center is already set in this cluster's
    /// frame, then recenters
    pub fn attach(&mut self, particle: usize, arena: &mut ParticleArena) {
        arena.particles[particle].cluster_id = self.id;
        self.members.push(particle);
        self.recenter(arena);
    }

    /// Center-of-gravity distance of every member, in member order
    pub fn distances_from_cog(&self, arena: &ParticleArena) -> Vec<f64> {
        let cog = self.reference.center_of_gravity;
        self.members.iter().map(|&i| (arena.center(i) - cog).norm()).collect()
    }

    /// Whether a trial sphere would sit closer than (r + r_trial)/δ to any
    /// member other than those in `skip`
    pub fn overlaps(
        &self,
        arena: &ParticleArena,
        trial: &impl Spherical,
        delta: f64,
        skip: &[usize],
    ) -> bool {
        self.members
            .iter()
            .filter(|&&i| !skip.contains(&i))
            .any(|&i| spheres_overlap(arena.get(i), trial, delta))
    }
}

/// Strictly closer than the sintered contact distance, up to rounding
pub fn spheres_overlap(a: &impl Spherical, b: &impl Spherical, delta: f64) -> bool {
    let contact = (a.radius() + b.radius()) / delta;
    (a.center() - b.center()).norm() < contact * (1.0 - OVERLAP_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quaternion::Quat;
    use agglo_core::ParticleRecord;
    use approx::assert_relative_eq;

    fn pair_arena() -> ParticleArena {
        let mut arena = ParticleArena::new(&[1.0, 1.0]);
        arena.set_center(0, Vec3::new(4.0, 0.0, 0.0));
        arena.set_center(1, Vec3::new(6.0, 0.0, 0.0));
        arena
    }

    #[test]
    fn test_from_members_recenters() {
        let mut arena = pair_arena();
        let cluster = Cluster::from_members(3, vec![0, 1], &mut arena);
        assert_relative_eq!(arena.center(0), Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(cluster.reference().geometric_center.norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(cluster.reference().bounding_radius, 2.0, epsilon = 1e-12);
        assert_eq!(arena.get(1).cluster_id, 3);
    }

    #[test]
    fn test_absorb_merges_and_recenters() {
        let mut arena = ParticleArena::new(&[1.0, 1.0, 1.0]);
        let mut a = Cluster::from_members(0, vec![0, 1], &mut arena);
        arena.set_center(2, Vec3::new(3.0, 0.0, 0.0));
        let mut b = Cluster::singleton(1, 2, &mut arena);
        b.transform(&mut arena, &RigidTransform::translation(Vec3::new(3.0, 0.0, 0.0)));
        a.absorb(b, &mut arena);
        assert_eq!(a.len(), 3);
        assert_eq!(arena.get(2).cluster_id, 0);
        let mean: Vec3 = a.members().iter().map(|&i| arena.center(i)).sum::<Vec3>() / 3.0;
        assert_relative_eq!(mean.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_keeps_shape() {
        let mut arena = pair_arena();
        let mut cluster = Cluster::from_members(0, vec![0, 1], &mut arena);
        let rg = cluster.reference().radius_of_gyration;
        let rotation = Quat::from_axis_angle(Vec3::new(0.2, 1.0, -0.4), 0.9);
        cluster.transform(&mut arena, &RigidTransform::new(rotation, Vec3::zeros()));
        assert_relative_eq!(cluster.reference().radius_of_gyration, rg, max_relative = 1e-12);
        assert_relative_eq!((arena.center(0) - arena.center(1)).norm(), 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_overlap_skips_listed_members() {
        let mut arena = pair_arena();
        let cluster = Cluster::from_members(0, vec![0, 1], &mut arena);
        let touching = ParticleRecord { x: 3.0, y: 0.0, z: 0.0, radius: 1.0 };
        let inside = ParticleRecord { x: 2.5, y: 0.0, z: 0.0, radius: 1.0 };
        assert!(!cluster.overlaps(&arena, &touching, 1.0, &[]));
        assert!(cluster.overlaps(&arena, &inside, 1.0, &[]));
        assert!(!cluster.overlaps(&arena, &inside, 1.0, &[1]));
    }
}
