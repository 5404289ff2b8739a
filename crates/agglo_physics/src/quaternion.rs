use agglo_core::{GEOMETRY_EPSILON, Vec3};

/// Rotation quaternion, scalar part `w`. Every exact-distance placement goes
/// through one of these: no Euler angles, no gimbal singularities.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quat {
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Pure quaternion [0, v]
    pub fn pure(v: Vec3) -> Self {
        Self::new(0.0, v.x, v.y, v.z)
    }

    fn vector(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Right-handed rotation of `angle` radians about `axis`.
    /// A degenerate axis yields the identity.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let len = axis.norm();
        if len <= GEOMETRY_EPSILON {
            return Self::identity();
        }
        let (sin_half, cos_half) = (0.5 * angle).sin_cos();
        let v = axis * (sin_half / len);
        Self::new(cos_half, v.x, v.y, v.z)
    }

    /// Shortest-arc rotation taking direction `from` onto direction `to`.
    /// Antiparallel inputs rotate by π about any perpendicular axis.
    pub fn from_unit_vectors(from: Vec3, to: Vec3) -> Self {
        let (a, b) = match (
            from.try_normalize(GEOMETRY_EPSILON),
            to.try_normalize(GEOMETRY_EPSILON),
        ) {
            (Some(a), Some(b)) => (a, b),
            _ => return Self::identity(),
        };
        let dot = a.dot(&b).clamp(-1.0, 1.0);
        if dot < -1.0 + 1e-12 {
            let axis = crate::sampling::perpendicular_unit(a);
            return Self::from_axis_angle(axis, std::f64::consts::PI);
        }
        Self::from_axis_angle(a.cross(&b), dot.acos())
    }

    /// Hamilton product `self * other`: applies `other` first, then `self`
    pub fn multiply(&self, other: &Self) -> Self {
        let (aw, bw) = (self.w, other.w);
        let (av, bv) = (self.vector(), other.vector());
        let v = bv * aw + av * bw + av.cross(&bv);
        Self::new(aw * bw - av.dot(&bv), v.x, v.y, v.z)
    }

    pub fn conjugate(&self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.norm();
        if len <= GEOMETRY_EPSILON {
            return Self::identity();
        }
        Self::new(self.w / len, self.x / len, self.y / len, self.z / len)
    }

    /// q·[0, v]·q⁻¹
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        let q = self.normalize();
        q.multiply(&Self::pure(v)).multiply(&q.conjugate()).vector()
    }
}

/// Rotates `v` by `angle` radians about `axis`
pub fn rotate(v: Vec3, axis: Vec3, angle: f64) -> Vec3 {
    Quat::from_axis_angle(axis, angle).rotate(v)
}

/// Rotation about the origin followed by a translation
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RigidTransform {
    pub rotation: Quat,
    pub translation: Vec3,
}

impl RigidTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Quat::identity(),
            translation: Vec3::zeros(),
        }
    }

    pub fn translation(translation: Vec3) -> Self {
        Self {
            rotation: Quat::identity(),
            translation,
        }
    }

    pub fn new(rotation: Quat, translation: Vec3) -> Self {
        Self { rotation, translation }
    }

    pub fn apply(&self, point: Vec3) -> Vec3 {
        self.rotation.rotate(point) + self.translation
    }
}
