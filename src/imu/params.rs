//! Sensor noise densities and integration options for the preintegrator.

use crate::imu::Matrix9;
use nalgebra::Matrix3;

/// Noise and integration configuration shared by every sample of one
/// preintegration interval.
///
/// The three covariance blocks are continuous-time spectral densities; the
/// covariance propagation multiplies them by Δt to obtain the discrete-time
/// process noise of one step.
#[derive(Clone, Debug, PartialEq)]
pub struct PreintegrationParams {
    /// Accelerometer white-noise density [m²/s⁴ · s]
    accelerometer_covariance: Matrix3<f64>,
    /// Gyroscope white-noise density [rad²/s² · s]
    gyroscope_covariance: Matrix3<f64>,
    /// Position integration-error density, modeling the velocity-hold
    /// assumption between samples
    integration_covariance: Matrix3<f64>,
    /// Include the ½·R·a·Δt² term in the position update
    use_2nd_order_integration: bool,
}

impl PreintegrationParams {
    /// Create parameters from full 3×3 covariance blocks.
    ///
    /// Second-order position integration defaults to off.
    pub fn new(
        accelerometer_covariance: Matrix3<f64>,
        gyroscope_covariance: Matrix3<f64>,
        integration_covariance: Matrix3<f64>,
    ) -> Self {
        PreintegrationParams {
            accelerometer_covariance,
            gyroscope_covariance,
            integration_covariance,
            use_2nd_order_integration: false,
        }
    }

    /// Create parameters from isotropic standard deviations.
    pub fn from_sigmas(accel_sigma: f64, gyro_sigma: f64, integration_sigma: f64) -> Self {
        PreintegrationParams::new(
            Matrix3::identity() * accel_sigma * accel_sigma,
            Matrix3::identity() * gyro_sigma * gyro_sigma,
            Matrix3::identity() * integration_sigma * integration_sigma,
        )
    }

    /// Enable or disable the second-order position integration term.
    pub fn with_second_order_integration(mut self, enabled: bool) -> Self {
        self.use_2nd_order_integration = enabled;
        self
    }

    /// Get the accelerometer noise density.
    pub fn accelerometer_covariance(&self) -> &Matrix3<f64> {
        &self.accelerometer_covariance
    }

    /// Get the gyroscope noise density.
    pub fn gyroscope_covariance(&self) -> &Matrix3<f64> {
        &self.gyroscope_covariance
    }

    /// Get the integration-error density.
    pub fn integration_covariance(&self) -> &Matrix3<f64> {
        &self.integration_covariance
    }

    /// Whether the position update includes the ½·R·a·Δt² term.
    pub fn use_2nd_order_integration(&self) -> bool {
        self.use_2nd_order_integration
    }

    /// Assemble the 9×9 block-diagonal process-noise density in
    /// `[integration-error, accelerometer, gyroscope]` block order, matching
    /// the `[position, velocity, rotation]` error space.
    pub fn process_noise(&self) -> Matrix9 {
        let mut q = Matrix9::zeros();
        q.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&self.integration_covariance);
        q.fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&self.accelerometer_covariance);
        q.fixed_view_mut::<3, 3>(6, 6)
            .copy_from(&self.gyroscope_covariance);
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_noise_block_layout() {
        let params = PreintegrationParams::from_sigmas(0.2, 0.01, 1e-4);
        let q = params.process_noise();

        assert!((q[(0, 0)] - 1e-8).abs() < 1e-20);
        assert!((q[(3, 3)] - 0.04).abs() < 1e-15);
        assert!((q[(6, 6)] - 1e-4).abs() < 1e-15);
        // off-diagonal blocks stay zero
        assert_eq!(q[(0, 3)], 0.0);
        assert_eq!(q[(3, 6)], 0.0);
    }

    #[test]
    fn test_second_order_flag_default_off() {
        let params = PreintegrationParams::from_sigmas(0.1, 0.01, 1e-4);
        assert!(!params.use_2nd_order_integration());
        let params = params.with_second_order_integration(true);
        assert!(params.use_2nd_order_integration());
    }
}
