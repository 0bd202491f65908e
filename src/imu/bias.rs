//! Constant accelerometer/gyroscope bias pair.

use nalgebra::{Vector3, Vector6};
use std::fmt;
use std::ops::Sub;

/// Accelerometer and gyroscope bias, treated as constant over a
/// preintegration interval.
///
/// The preintegrator holds a copy of the bias estimate valid at integration
/// time; the factor later compares it against the bias estimate at evaluation
/// time to re-linearize the deltas without re-integrating raw samples.
///
/// Vector form and tangent-space ordering: `[accelerometer, gyroscope]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImuBias {
    accelerometer: Vector3<f64>,
    gyroscope: Vector3<f64>,
}

impl fmt::Display for ImuBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let a = self.accelerometer;
        let g = self.gyroscope;
        write!(
            f,
            "ImuBias(accelerometer: [{:.4}, {:.4}, {:.4}], gyroscope: [{:.4}, {:.4}, {:.4}])",
            a.x, a.y, a.z, g.x, g.y, g.z
        )
    }
}

impl ImuBias {
    /// Create a new bias pair.
    pub fn new(accelerometer: Vector3<f64>, gyroscope: Vector3<f64>) -> Self {
        ImuBias {
            accelerometer,
            gyroscope,
        }
    }

    /// The zero bias.
    pub fn zero() -> Self {
        ImuBias {
            accelerometer: Vector3::zeros(),
            gyroscope: Vector3::zeros(),
        }
    }

    /// Get the accelerometer bias.
    #[inline]
    pub fn accelerometer(&self) -> Vector3<f64> {
        self.accelerometer
    }

    /// Get the gyroscope bias.
    #[inline]
    pub fn gyroscope(&self) -> Vector3<f64> {
        self.gyroscope
    }

    /// Remove the accelerometer bias from a raw measurement.
    pub fn correct_accelerometer(&self, measured: &Vector3<f64>) -> Vector3<f64> {
        measured - self.accelerometer
    }

    /// Remove the gyroscope bias from a raw measurement.
    pub fn correct_gyroscope(&self, measured: &Vector3<f64>) -> Vector3<f64> {
        measured - self.gyroscope
    }

    /// Stack as a 6-vector `[accelerometer, gyroscope]`.
    pub fn vector(&self) -> Vector6<f64> {
        let mut v = Vector6::zeros();
        v.fixed_rows_mut::<3>(0).copy_from(&self.accelerometer);
        v.fixed_rows_mut::<3>(3).copy_from(&self.gyroscope);
        v
    }

    /// Approximate equality within an absolute tolerance on both components.
    pub fn is_approx(&self, other: &ImuBias, tolerance: f64) -> bool {
        (self.accelerometer - other.accelerometer).norm() < tolerance
            && (self.gyroscope - other.gyroscope).norm() < tolerance
    }
}

impl Sub for ImuBias {
    type Output = ImuBias;

    /// Bias increment: the component-wise difference of two bias estimates.
    fn sub(self, rhs: ImuBias) -> ImuBias {
        ImuBias {
            accelerometer: self.accelerometer - rhs.accelerometer,
            gyroscope: self.gyroscope - rhs.gyroscope,
        }
    }
}
