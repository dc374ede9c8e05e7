// src/sim/pose.rs

//! Minimal 3D math used by the evaluator and region triggers.

use std::fmt;
use std::ops::{Add, Mul, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3::new(0.0, 0.0, 0.0);
    pub const ONE: Vector3 = Vector3::new(1.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn lerp(self, other: Vector3, t: f64) -> Vector3 {
        self + (other - self) * t
    }
}

impl Add for Vector3 {
    type Output = Vector3;
    fn add(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;
    fn sub(self, rhs: Vector3) -> Vector3 {
        Vector3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;
    fn mul(self, rhs: f64) -> Vector3 {
        Vector3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.x, self.y, self.z)
    }
}

/// Unit quaternion, `w` first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Build from roll/pitch/yaw (rotation about fixed X, then Y, then Z).
    pub fn from_euler(roll: f64, pitch: f64, yaw: f64) -> Self {
        let (sr, cr) = (roll * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sy, cy) = (yaw * 0.5).sin_cos();

        Self {
            w: cr * cp * cy + sr * sp * sy,
            x: sr * cp * cy - cr * sp * sy,
            y: cr * sp * cy + sr * cp * sy,
            z: cr * cp * sy - sr * sp * cy,
        }
        .normalized()
    }

    pub fn normalized(self) -> Self {
        let n = (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if n <= f64::EPSILON {
            return Self::IDENTITY;
        }
        Self {
            w: self.w / n,
            x: self.x / n,
            y: self.y / n,
            z: self.z / n,
        }
    }

    /// Decompose into `(roll, pitch, yaw)`.
    ///
    /// Pitch is clamped to +-pi/2 when the rotation sits in gimbal lock.
    pub fn euler(&self) -> Vector3 {
        let q = self.normalized();

        let sinr_cosp = 2.0 * (q.w * q.x + q.y * q.z);
        let cosr_cosp = 1.0 - 2.0 * (q.x * q.x + q.y * q.y);
        let roll = sinr_cosp.atan2(cosr_cosp);

        let sinp = 2.0 * (q.w * q.y - q.z * q.x);
        let pitch = if sinp.abs() >= 1.0 {
            std::f64::consts::FRAC_PI_2.copysign(sinp)
        } else {
            sinp.asin()
        };

        let siny_cosp = 2.0 * (q.w * q.z + q.x * q.y);
        let cosy_cosp = 1.0 - 2.0 * (q.y * q.y + q.z * q.z);
        let yaw = siny_cosp.atan2(cosy_cosp);

        Vector3::new(roll, pitch, yaw)
    }

    /// Normalized linear interpolation; good enough between keyframes.
    pub fn nlerp(self, other: Quaternion, t: f64) -> Quaternion {
        let dot = self.w * other.w + self.x * other.x + self.y * other.y + self.z * other.z;
        let sign = if dot < 0.0 { -1.0 } else { 1.0 };
        Quaternion {
            w: self.w + (other.w * sign - self.w) * t,
            x: self.x + (other.x * sign - self.x) * t,
            y: self.y + (other.y * sign - self.y) * t,
            z: self.z + (other.z * sign - self.z) * t,
        }
        .normalized()
    }
}

/// Position plus orientation in the world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose3 {
    pub pos: Vector3,
    pub rot: Quaternion,
}

impl Pose3 {
    pub fn new(pos: Vector3, rot: Quaternion) -> Self {
        Self { pos, rot }
    }

    pub fn from_xyz_rpy(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self::new(Vector3::new(x, y, z), Quaternion::from_euler(roll, pitch, yaw))
    }

    /// Extract a scalar pose field by name.
    pub fn field(&self, field: PoseField) -> f64 {
        match field {
            PoseField::X => self.pos.x,
            PoseField::Y => self.pos.y,
            PoseField::Z => self.pos.z,
            PoseField::Roll => self.rot.euler().x,
            PoseField::Pitch => self.rot.euler().y,
            PoseField::Yaw => self.rot.euler().z,
        }
    }
}

impl fmt::Display for Pose3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pos, self.rot.euler())
    }
}

/// Scalar fields addressable through `<entity>.pose.<field>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseField {
    X,
    Y,
    Z,
    Roll,
    Pitch,
    Yaw,
}

impl PoseField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "x" => Some(PoseField::X),
            "y" => Some(PoseField::Y),
            "z" => Some(PoseField::Z),
            "roll" => Some(PoseField::Roll),
            "pitch" => Some(PoseField::Pitch),
            "yaw" => Some(PoseField::Yaw),
            _ => None,
        }
    }
}

/// Axis-aligned box, closed on both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAlignedBox {
    pub min: Vector3,
    pub max: Vector3,
}

impl AxisAlignedBox {
    /// Build a box centred on `center` with the full edge lengths in `size`.
    pub fn from_center_size(center: Vector3, size: Vector3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn contains(&self, p: Vector3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

impl fmt::Display for AxisAlignedBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "min[{}] max[{}]", self.min, self.max)
    }
}
