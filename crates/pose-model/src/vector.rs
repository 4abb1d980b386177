//! Fixed-size vector math.
//!
//! The free functions operate on `[f64; N]` so operands of different lengths
//! cannot be mixed; the one place lengths are checked at runtime is
//! [`Vector3::try_from`] on a slice.

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use mo_common::error::{MoError, MoResult};
use serde::{Deserialize, Serialize};

/// Linear interpolation. `r` is not clamped, so values outside `[0, 1]`
/// extrapolate.
pub fn lerp(a: f64, b: f64, r: f64) -> f64 {
    a + (b - a) * r
}

/// Per-component [`lerp`].
pub fn lerp_array<const N: usize>(a: [f64; N], b: [f64; N], r: f64) -> [f64; N] {
    std::array::from_fn(|i| lerp(a[i], b[i], r))
}

/// `scalar * (b - a)` per component.
pub fn vector_diff<const N: usize>(a: [f64; N], b: [f64; N], scalar: f64) -> [f64; N] {
    std::array::from_fn(|i| scalar * (b[i] - a[i]))
}

/// `pos + delta` per component.
pub fn translate<const N: usize>(pos: [f64; N], delta: [f64; N]) -> [f64; N] {
    std::array::from_fn(|i| pos[i] + delta[i])
}

pub fn midpoint<const N: usize>(a: [f64; N], b: [f64; N]) -> [f64; N] {
    std::array::from_fn(|i| (a[i] + b[i]) / 2.0)
}

/// Euclidean distance.
pub fn distance<const N: usize>(a: [f64; N], b: [f64; N]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(a, b)| (b - a) * (b - a))
        .sum::<f64>()
        .sqrt()
}

/// Map a pixel coordinate into `[-1, 1]` given the dimension's full extent.
pub fn normalize(value: f64, extent: f64) -> f64 {
    value / extent * 2.0 - 1.0
}

/// Distance between two points as a fraction of `extent` (a size proxy).
pub fn capture_size<const N: usize>(a: [f64; N], b: [f64; N], extent: f64) -> f64 {
    distance(a, b) / extent
}

/// [`capture_size`] mapped through `* 2 - 1` for a signed span estimate.
pub fn normalized_span<const N: usize>(a: [f64; N], b: [f64; N], extent: f64) -> f64 {
    capture_size(a, b, extent) * 2.0 - 1.0
}

/// Three floats: `(x, y, z)` for positions, `(pitch, roll, yaw)` for rotations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const ONE: Vector3 = Vector3 {
        x: 1.0,
        y: 1.0,
        z: 1.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub const fn from_array(a: [f64; 3]) -> Self {
        Self {
            x: a[0],
            y: a[1],
            z: a[2],
        }
    }

    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn lerp(self, target: Vector3, r: f64) -> Vector3 {
        Self::from_array(lerp_array(self.to_array(), target.to_array(), r))
    }

    /// `scalar * (target - self)`.
    pub fn diff_to(self, target: Vector3, scalar: f64) -> Vector3 {
        Self::from_array(vector_diff(self.to_array(), target.to_array(), scalar))
    }

    pub fn translate(self, delta: Vector3) -> Vector3 {
        Self::from_array(translate(self.to_array(), delta.to_array()))
    }

    /// Component-wise product.
    pub fn scale(self, factors: Vector3) -> Vector3 {
        Self::new(self.x * factors.x, self.y * factors.y, self.z * factors.z)
    }

    pub fn length(self) -> f64 {
        distance([0.0; 3], self.to_array())
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Largest absolute component difference.
    pub fn max_abs_diff(self, other: Vector3) -> f64 {
        (self.x - other.x)
            .abs()
            .max((self.y - other.y).abs())
            .max((self.z - other.z).abs())
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(a: [f64; 3]) -> Self {
        Self::from_array(a)
    }
}

impl TryFrom<&[f64]> for Vector3 {
    type Error = MoError;

    fn try_from(values: &[f64]) -> MoResult<Self> {
        match values {
            [x, y, z] => Ok(Self::new(*x, *y, *z)),
            _ => Err(MoError::dimension_mismatch(3, values.len())),
        }
    }
}

/// Parses `"x,y,z"` (whitespace around components is ignored).
impl FromStr for Vector3 {
    type Err = MoError;

    fn from_str(s: &str) -> MoResult<Self> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|e| MoError::config(format!("invalid component {part:?}: {e}")))
            })
            .collect::<MoResult<Vec<_>>>()?;
        Self::try_from(values.as_slice())
    }
}

/// Formats as `x, y, z`, honoring the formatter's precision
/// (`format!("{v:.2}")` gives `"0.10, -0.20, 0.00"`).
impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.*}, {:.*}, {:.*}", p, self.x, p, self.y, p, self.z),
            None => write!(f, "{}, {}, {}", self.x, self.y, self.z),
        }
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Vector3) -> Vector3 {
        self.translate(rhs)
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Vector3) -> Vector3 {
        rhs.diff_to(self, 1.0)
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: f64) -> Vector3 {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Vector3 {
        self * -1.0
    }
}
