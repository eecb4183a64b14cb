use serde::{Deserialize, Serialize};

use super::Vec3;

/// Unit quaternion rotation `[x, y, z, w]`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle_rad` about `axis` (need not be normalized).
    ///
    /// A zero axis yields the identity.
    pub fn from_axis_angle(axis: Vec3, angle_rad: f64) -> Self {
        let Some(axis) = axis.normalize() else {
            return Self::IDENTITY;
        };
        let half = angle_rad * 0.5;
        let s = half.sin();
        Self::new(axis.x * s, axis.y * s, axis.z * s, half.cos())
    }

    /// Shortest-arc rotation taking unit vector `a` onto unit vector `b`.
    pub fn from_unit_vectors(a: Vec3, b: Vec3) -> Self {
        let dot = a.dot(b).clamp(-1.0, 1.0);

        // Nearly opposite vectors: pick arbitrary orthogonal axis.
        if dot < -0.999999 {
            let mut axis = Vec3::X.cross(a);
            if axis.length_squared() < 1e-12 {
                axis = Vec3::Y.cross(a);
            }
            let axis = axis.normalize().unwrap_or(Vec3::Y);
            return Self::new(axis.x, axis.y, axis.z, 0.0);
        }

        // Nearly identical vectors: return identity.
        if dot > 0.999999 {
            return Self::IDENTITY;
        }

        let axis = a.cross(b);
        Self::new(axis.x, axis.y, axis.z, 1.0 + dot).normalize()
    }

    pub fn normalize(self) -> Self {
        let n = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if n > 1e-10 {
            Self::new(self.x / n, self.y / n, self.z / n, self.w / n)
        } else {
            Self::IDENTITY
        }
    }

    /// Inverse for unit quaternions.
    pub fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Rotate `v` by this (unit) quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let qv = Vec3::new(self.x, self.y, self.z);
        let t = qv.cross(v) * 2.0;
        v + t * self.w + qv.cross(t)
    }

    /// Rotation angle in radians, in `[0, 2π]`.
    pub fn angle(self) -> f64 {
        2.0 * self.w.clamp(-1.0, 1.0).acos()
    }

    /// Intrinsic X-then-Y-then-Z Euler angles (radians), the order most scene
    /// graphs default to.
    pub fn to_euler_xyz(self) -> Vec3 {
        let Self { x, y, z, w } = self;
        let m11 = 1.0 - 2.0 * (y * y + z * z);
        let m12 = 2.0 * (x * y - w * z);
        let m13 = 2.0 * (x * z + w * y);
        let m22 = 1.0 - 2.0 * (x * x + z * z);
        let m23 = 2.0 * (y * z - w * x);
        let m32 = 2.0 * (y * z + w * x);
        let m33 = 1.0 - 2.0 * (x * x + y * y);

        let ey = m13.clamp(-1.0, 1.0).asin();
        if m13.abs() < 0.999_999_9 {
            Vec3::new((-m23).atan2(m33), ey, (-m12).atan2(m11))
        } else {
            // Gimbal lock: fold Z into X.
            Vec3::new(m32.atan2(m22), ey, 0.0)
        }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

/// Hamilton product `a * b` (apply `b` first, then `a`).
impl std::ops::Mul for Quat {
    type Output = Self;

    fn mul(self, b: Self) -> Self::Output {
        let a = self;
        Self::new(
            a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
            a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        )
    }
}
