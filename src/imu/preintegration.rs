//! On-manifold IMU preintegration with first-order covariance propagation.
//!
//! The preintegrator folds a sequence of (acceleration, angular rate, Δt)
//! samples into relative rotation / velocity / position deltas expressed in
//! the body frame at the start of the interval, together with the Jacobians
//! of those deltas with respect to the bias estimate used during integration
//! and a 9×9 covariance propagated through a first-order (EKF-style)
//! linearization at every step.
//!
//! The update order inside one step is fixed: the bias-sensitivity recursions
//! and the error-transition matrix are linearized at the *pre-update*
//! rotation delta, while the rotation-error block of the transition closes at
//! the *post-update* rotation. The delta advance therefore sits between the
//! two rotation snapshots.

use crate::error::{InertialError, InertialResult};
use crate::imu::{ImuBias, Matrix9, PreintegrationParams};
use crate::manifold::se3::SE3;
use crate::manifold::skew;
use crate::manifold::so3::{SO3, SO3Tangent};
use nalgebra::{Matrix3, Vector3};
use std::fmt;
use tracing::trace;

/// Capability exposed by any IMU preintegration scheme: accumulated deltas,
/// their bias sensitivities, and the integration loop itself.
///
/// [`ImuPreintegrator`] extends this capability with covariance propagation;
/// alternative IMU models can implement the same seam and feed the same
/// factor machinery.
pub trait Preintegration {
    /// Accumulated rotation delta `ΔR` (body frame at interval start → current).
    fn delta_rotation(&self) -> &SO3;

    /// Accumulated velocity delta `Δv`, expressed in the interval-start frame.
    fn delta_velocity(&self) -> &Vector3<f64>;

    /// Accumulated position delta `Δp`, expressed in the interval-start frame.
    fn delta_position(&self) -> &Vector3<f64>;

    /// Total integrated time.
    fn delta_time(&self) -> f64;

    /// Bias estimate removed from the raw samples during integration.
    fn bias_hat(&self) -> &ImuBias;

    /// Jacobian of the rotation delta with respect to the gyroscope bias.
    fn dr_dbg(&self) -> &Matrix3<f64>;

    /// Jacobian of the velocity delta with respect to the accelerometer bias.
    fn dv_dba(&self) -> &Matrix3<f64>;

    /// Jacobian of the velocity delta with respect to the gyroscope bias.
    fn dv_dbg(&self) -> &Matrix3<f64>;

    /// Jacobian of the position delta with respect to the accelerometer bias.
    fn dp_dba(&self) -> &Matrix3<f64>;

    /// Jacobian of the position delta with respect to the gyroscope bias.
    fn dp_dbg(&self) -> &Matrix3<f64>;

    /// Clear the accumulated state back to the identity. Idempotent.
    fn reset(&mut self);

    /// Fold one sample into the accumulated state.
    ///
    /// `body_t_sensor`, when present, is the fixed sensor-to-body transform
    /// applied to the sample before integration.
    fn integrate(
        &mut self,
        measured_acc: &Vector3<f64>,
        measured_omega: &Vector3<f64>,
        dt: f64,
        body_t_sensor: Option<&SE3>,
    ) -> InertialResult<()>;
}

/// IMU preintegrator accumulating deltas, bias Jacobians and a propagated
/// 9×9 covariance over the `[position, velocity, rotation]` error space.
///
/// Owned and mutated by a single producer; a factor takes an immutable clone
/// of the whole accumulator, so later integration cannot retroactively change
/// an already-built factor.
#[derive(Clone, Debug)]
pub struct ImuPreintegrator {
    params: PreintegrationParams,
    /// Continuous-time process-noise density, assembled once from the params
    process_noise: Matrix9,
    bias_hat: ImuBias,

    delta_rotation: SO3,
    delta_velocity: Vector3<f64>,
    delta_position: Vector3<f64>,
    delta_time: f64,

    dr_dbg: Matrix3<f64>,
    dv_dba: Matrix3<f64>,
    dv_dbg: Matrix3<f64>,
    dp_dba: Matrix3<f64>,
    dp_dbg: Matrix3<f64>,

    covariance: Matrix9,
}

impl fmt::Display for ImuPreintegrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.delta_velocity;
        let p = self.delta_position;
        write!(
            f,
            "ImuPreintegrator(dt: {:.4}, delta_rotation: {}, delta_velocity: [{:.4}, {:.4}, {:.4}], delta_position: [{:.4}, {:.4}, {:.4}])",
            self.delta_time, self.delta_rotation, v.x, v.y, v.z, p.x, p.y, p.z
        )
    }
}

impl ImuPreintegrator {
    /// Create a fresh preintegrator for one interval.
    ///
    /// # Arguments
    /// * `params` - Noise densities and integration options
    /// * `bias_hat` - Bias estimate to remove from every raw sample
    pub fn new(params: PreintegrationParams, bias_hat: ImuBias) -> Self {
        let process_noise = params.process_noise();
        ImuPreintegrator {
            params,
            process_noise,
            bias_hat,
            delta_rotation: SO3::identity(),
            delta_velocity: Vector3::zeros(),
            delta_position: Vector3::zeros(),
            delta_time: 0.0,
            dr_dbg: Matrix3::zeros(),
            dv_dba: Matrix3::zeros(),
            dv_dbg: Matrix3::zeros(),
            dp_dba: Matrix3::zeros(),
            dp_dbg: Matrix3::zeros(),
            covariance: Matrix9::zeros(),
        }
    }

    /// Get the integration parameters.
    pub fn params(&self) -> &PreintegrationParams {
        &self.params
    }

    /// Get the propagated 9×9 covariance of the deltas.
    ///
    /// Symmetric positive semi-definite; starts at zero and its trace is
    /// non-decreasing across integration steps.
    pub fn covariance(&self) -> &Matrix9 {
        &self.covariance
    }

    /// Fold one sample into the accumulated state, optionally reporting the
    /// 9×9 error-transition matrix `F` and noise-mapping matrix `G` of the
    /// step through the diagnostic out-slots.
    ///
    /// Fails with `InvalidInput` on a non-positive `dt` before any state is
    /// touched. The covariance update is
    ///
    /// ```text
    /// P ← F · P · Fᵀ + Q · Δt
    /// ```
    ///
    /// where `Q` is the block-diagonal continuous-time process-noise density
    /// and `F` is assembled from analytic partials of the
    /// `[position, velocity, rotation]` error.
    pub fn integrate_measurement(
        &mut self,
        measured_acc: &Vector3<f64>,
        measured_omega: &Vector3<f64>,
        dt: f64,
        body_t_sensor: Option<&SE3>,
        f_out: Option<&mut Matrix9>,
        g_out: Option<&mut Matrix9>,
    ) -> InertialResult<()> {
        if dt <= 0.0 {
            return Err(InertialError::InvalidInput(format!(
                "integration interval must be positive, got dt = {dt}"
            )));
        }

        // Exact (not linearized) bias removal and extrinsic correction.
        let (acc, omega) = self.correct_measurements(measured_acc, measured_omega, body_t_sensor);

        let theta_incr = SO3Tangent::new(omega * dt);
        let mut jr_incr = Matrix3::zeros();
        let rotation_incr = theta_incr.exp(Some(&mut jr_incr));

        // Bias-sensitivity recursions consume the pre-update rotation delta.
        self.update_bias_jacobians(&acc, &jr_incr, &rotation_incr, dt);

        // Transition linearization point: the pre-update cumulative rotation.
        let theta_i = self.delta_rotation.log(None);
        let rotation_i = self.delta_rotation.rotation_matrix();
        let jr_theta_i = theta_i.right_jacobian();

        self.advance_deltas(&acc, &rotation_incr, dt);

        // The rotation-error block closes at the post-update rotation.
        let theta_j = self.delta_rotation.log(None);
        let jr_inv_theta_j = theta_j.right_jacobian_inv();

        let mut f = Matrix9::identity();
        f.fixed_view_mut::<3, 3>(0, 3)
            .copy_from(&(Matrix3::identity() * dt));
        f.fixed_view_mut::<3, 3>(3, 6)
            .copy_from(&(-rotation_i * skew(&acc) * jr_theta_i * dt));
        f.fixed_view_mut::<3, 3>(6, 6).copy_from(
            &(jr_inv_theta_j * rotation_incr.inverse(None).rotation_matrix() * jr_theta_i),
        );

        self.covariance = f * self.covariance * f.transpose() + self.process_noise * dt;

        if let Some(f_slot) = f_out {
            *f_slot = f;
        }
        if let Some(g_slot) = g_out {
            let mut g = Matrix9::zeros();
            g.fixed_view_mut::<3, 3>(0, 0)
                .copy_from(&(Matrix3::identity() * dt));
            g.fixed_view_mut::<3, 3>(3, 3).copy_from(&(rotation_i * dt));
            g.fixed_view_mut::<3, 3>(6, 6)
                .copy_from(&(jr_inv_theta_j * jr_incr * dt));
            *g_slot = g;
        }

        trace!(dt, total = self.delta_time, "integrated imu sample");
        Ok(())
    }

    /// First-order re-linearization of the deltas at a new bias estimate.
    ///
    /// Applies the stored bias Jacobians to the difference between `bias` and
    /// the bias used during integration; no raw samples are re-integrated.
    /// Valid for small bias drift between integration and evaluation time.
    /// A zero difference returns the raw deltas exactly.
    pub fn bias_corrected_deltas(&self, bias: &ImuBias) -> (SO3, Vector3<f64>, Vector3<f64>) {
        let incr = *bias - self.bias_hat;
        let dba = incr.accelerometer();
        let dbg = incr.gyroscope();

        let rotation = self.delta_rotation.compose(
            &SO3Tangent::new(self.dr_dbg * dbg).exp(None),
            None,
            None,
        );
        let velocity = self.delta_velocity + self.dv_dba * dba + self.dv_dbg * dbg;
        let position = self.delta_position + self.dp_dba * dba + self.dp_dbg * dbg;
        (rotation, velocity, position)
    }

    /// Approximate equality within an absolute tolerance on the deltas, bias
    /// Jacobians and covariance.
    pub fn is_approx(&self, other: &ImuPreintegrator, tolerance: f64) -> bool {
        self.delta_rotation.is_approx(&other.delta_rotation, tolerance)
            && (self.delta_velocity - other.delta_velocity).norm() < tolerance
            && (self.delta_position - other.delta_position).norm() < tolerance
            && (self.delta_time - other.delta_time).abs() < tolerance
            && (self.dr_dbg - other.dr_dbg).norm() < tolerance
            && (self.dv_dba - other.dv_dba).norm() < tolerance
            && (self.dv_dbg - other.dv_dbg).norm() < tolerance
            && (self.dp_dba - other.dp_dba).norm() < tolerance
            && (self.dp_dbg - other.dp_dbg).norm() < tolerance
            && (self.covariance - other.covariance).norm() < tolerance
    }

    fn correct_measurements(
        &self,
        measured_acc: &Vector3<f64>,
        measured_omega: &Vector3<f64>,
        body_t_sensor: Option<&SE3>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let mut acc = self.bias_hat.correct_accelerometer(measured_acc);
        let mut omega = self.bias_hat.correct_gyroscope(measured_omega);

        if let Some(pose) = body_t_sensor {
            let body_r_sensor = pose.rotation();
            omega = body_r_sensor.act(&omega, None, None);
            // Centripetal lever-arm term for a sensor mounted away from the
            // body origin: a_body = R·a_sensor − [ω]ₓ[ω]ₓ·t_sensor.
            let omega_cross = skew(&omega);
            acc = body_r_sensor.act(&acc, None, None)
                - omega_cross * omega_cross * pose.translation();
        }

        (acc, omega)
    }

    /// Bias-sensitivity recursions. Must run before the deltas advance: every
    /// term is evaluated at the pre-update rotation delta.
    fn update_bias_jacobians(
        &mut self,
        acc: &Vector3<f64>,
        jr_incr: &Matrix3<f64>,
        rotation_incr: &SO3,
        dt: f64,
    ) {
        let rotation_i = self.delta_rotation.rotation_matrix();
        let dv_dbg_incr = -rotation_i * skew(acc) * dt * self.dr_dbg;

        if self.params.use_2nd_order_integration() {
            self.dp_dba += self.dv_dba * dt - 0.5 * rotation_i * dt * dt;
            self.dp_dbg += dt * (self.dv_dbg + 0.5 * dv_dbg_incr);
        } else {
            self.dp_dba += self.dv_dba * dt;
            self.dp_dbg += self.dv_dbg * dt;
        }
        self.dv_dba += -rotation_i * dt;
        self.dv_dbg += dv_dbg_incr;
        self.dr_dbg =
            rotation_incr.inverse(None).rotation_matrix() * self.dr_dbg - jr_incr * dt;
    }

    /// Advance the deltas by one Euler step: position from the old velocity
    /// (plus the ½·R·a·Δt² term when enabled), then velocity, then the
    /// rotation composition.
    fn advance_deltas(&mut self, acc: &Vector3<f64>, rotation_incr: &SO3, dt: f64) {
        let velocity_incr = self.delta_rotation.rotation_matrix() * acc * dt;

        if self.params.use_2nd_order_integration() {
            self.delta_position += self.delta_velocity * dt + 0.5 * velocity_incr * dt;
        } else {
            self.delta_position += self.delta_velocity * dt;
        }
        self.delta_velocity += velocity_incr;
        self.delta_rotation = self.delta_rotation.compose(rotation_incr, None, None);
        self.delta_time += dt;
    }
}

impl Preintegration for ImuPreintegrator {
    fn delta_rotation(&self) -> &SO3 {
        &self.delta_rotation
    }

    fn delta_velocity(&self) -> &Vector3<f64> {
        &self.delta_velocity
    }

    fn delta_position(&self) -> &Vector3<f64> {
        &self.delta_position
    }

    fn delta_time(&self) -> f64 {
        self.delta_time
    }

    fn bias_hat(&self) -> &ImuBias {
        &self.bias_hat
    }

    fn dr_dbg(&self) -> &Matrix3<f64> {
        &self.dr_dbg
    }

    fn dv_dba(&self) -> &Matrix3<f64> {
        &self.dv_dba
    }

    fn dv_dbg(&self) -> &Matrix3<f64> {
        &self.dv_dbg
    }

    fn dp_dba(&self) -> &Matrix3<f64> {
        &self.dp_dba
    }

    fn dp_dbg(&self) -> &Matrix3<f64> {
        &self.dp_dbg
    }

    fn reset(&mut self) {
        self.delta_rotation = SO3::identity();
        self.delta_velocity = Vector3::zeros();
        self.delta_position = Vector3::zeros();
        self.delta_time = 0.0;
        self.dr_dbg = Matrix3::zeros();
        self.dv_dba = Matrix3::zeros();
        self.dv_dbg = Matrix3::zeros();
        self.dp_dba = Matrix3::zeros();
        self.dp_dbg = Matrix3::zeros();
        self.covariance = Matrix9::zeros();
    }

    fn integrate(
        &mut self,
        measured_acc: &Vector3<f64>,
        measured_omega: &Vector3<f64>,
        dt: f64,
        body_t_sensor: Option<&SE3>,
    ) -> InertialResult<()> {
        self.integrate_measurement(measured_acc, measured_omega, dt, body_t_sensor, None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> PreintegrationParams {
        PreintegrationParams::from_sigmas(0.1, 0.01, 1e-4)
    }

    fn fresh() -> ImuPreintegrator {
        ImuPreintegrator::new(test_params(), ImuBias::zero())
    }

    #[test]
    fn test_rejects_non_positive_dt() {
        let mut pim = fresh();
        let acc = Vector3::new(0.0, 0.0, 9.81);
        let omega = Vector3::zeros();

        assert!(pim.integrate(&acc, &omega, 0.0, None).is_err());
        assert!(pim.integrate(&acc, &omega, -0.01, None).is_err());
        // no partial mutation
        assert!(pim.is_approx(&fresh(), 1e-15));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut pim = fresh();
        let acc = Vector3::new(0.3, -0.2, 9.9);
        let omega = Vector3::new(0.05, 0.02, -0.04);
        for _ in 0..10 {
            pim.integrate(&acc, &omega, 0.01, None).unwrap();
        }
        assert!(pim.delta_time() > 0.0);

        pim.reset();
        assert!(pim.is_approx(&fresh(), 1e-15));
        pim.reset();
        assert!(pim.is_approx(&fresh(), 1e-15));
    }

    #[test]
    fn test_single_sample_second_order() {
        let params = test_params().with_second_order_integration(true);
        let mut pim = ImuPreintegrator::new(params, ImuBias::zero());
        pim.integrate(&Vector3::new(0.0, 0.0, 9.81), &Vector3::zeros(), 0.1, None)
            .unwrap();

        assert!(pim.delta_rotation().is_approx(&SO3::identity(), 1e-12));
        assert!((pim.delta_velocity() - Vector3::new(0.0, 0.0, 0.981)).norm() < 1e-12);
        assert!((pim.delta_position() - Vector3::new(0.0, 0.0, 0.04905)).norm() < 1e-12);
    }

    #[test]
    fn test_single_sample_first_order() {
        // Euler position update from the old (zero) velocity
        let mut pim = fresh();
        pim.integrate(&Vector3::new(0.0, 0.0, 9.81), &Vector3::zeros(), 0.1, None)
            .unwrap();

        assert!((pim.delta_velocity() - Vector3::new(0.0, 0.0, 0.981)).norm() < 1e-12);
        assert!(pim.delta_position().norm() < 1e-15);
    }

    #[test]
    fn test_bias_removed_exactly() {
        let bias = ImuBias::new(Vector3::new(0.1, -0.05, 0.2), Vector3::new(0.02, 0.01, -0.03));
        let mut pim = ImuPreintegrator::new(test_params(), bias);
        // measurements equal to the bias integrate to nothing
        pim.integrate(&bias.accelerometer(), &bias.gyroscope(), 0.05, None)
            .unwrap();

        assert!(pim.delta_rotation().is_approx(&SO3::identity(), 1e-12));
        assert!(pim.delta_velocity().norm() < 1e-15);
        assert!(pim.delta_position().norm() < 1e-15);
    }

    #[test]
    fn test_sensor_pose_rotates_rate_into_body_frame() {
        // Sensor rotated 90° about x: sensor z-rate appears as body -y-rate ...
        let body_t_sensor = SE3::from_translation_euler(
            0.0,
            0.0,
            0.0,
            std::f64::consts::FRAC_PI_2,
            0.0,
            0.0,
        );
        let mut pim = fresh();
        pim.integrate(
            &Vector3::zeros(),
            &Vector3::new(0.0, 0.0, 0.5),
            0.1,
            Some(&body_t_sensor),
        )
        .unwrap();

        let expected = SO3::from_scaled_axis(Vector3::new(0.0, -0.05, 0.0));
        assert!(pim.delta_rotation().is_approx(&expected, 1e-10));
    }

    #[test]
    fn test_sensor_lever_arm_centripetal_term() {
        // Constant spin about z with the sensor offset along x: the body-frame
        // acceleration picks up +ω²·r along x from the lever arm.
        let body_t_sensor = SE3::new(Vector3::new(0.5, 0.0, 0.0), SO3::identity());
        let omega = Vector3::new(0.0, 0.0, 2.0);
        let mut pim = fresh();
        pim.integrate(&Vector3::zeros(), &omega, 0.01, Some(&body_t_sensor))
            .unwrap();

        // -[ω]ₓ[ω]ₓ t = ω² r x̂ for this geometry
        let expected_acc = Vector3::new(4.0 * 0.5, 0.0, 0.0);
        assert!((pim.delta_velocity() - expected_acc * 0.01).norm() < 1e-12);
    }

    #[test]
    fn test_covariance_trace_monotonic() {
        let mut pim = fresh();
        let mut previous_trace = 0.0;
        for k in 0..50 {
            let t = k as f64 * 0.01;
            let acc = Vector3::new(0.5 * t.sin(), -0.3 * t.cos(), 9.81 + 0.1 * t.sin());
            let omega = Vector3::new(0.2 * t.cos(), 0.1, -0.15 * t.sin());
            pim.integrate(&acc, &omega, 0.01, None).unwrap();

            let trace = pim.covariance().trace();
            assert!(trace >= previous_trace - 1e-12);
            previous_trace = trace;
        }
    }

    #[test]
    fn test_covariance_stays_symmetric() {
        let mut pim = fresh();
        for _ in 0..30 {
            pim.integrate(
                &Vector3::new(0.4, -0.2, 9.7),
                &Vector3::new(0.1, -0.05, 0.2),
                0.01,
                None,
            )
            .unwrap();
        }
        let p = pim.covariance();
        assert!((p - p.transpose()).norm() < 1e-12);
    }

    #[test]
    fn test_first_step_covariance_is_process_noise() {
        let mut pim = fresh();
        let mut f = Matrix9::zeros();
        let mut g = Matrix9::zeros();
        let dt = 0.02;
        pim.integrate_measurement(
            &Vector3::new(0.1, 0.2, 9.8),
            &Vector3::new(0.01, -0.02, 0.03),
            dt,
            None,
            Some(&mut f),
            Some(&mut g),
        )
        .unwrap();

        // F · 0 · Fᵀ vanishes, leaving Q·Δt
        let expected = test_params().process_noise() * dt;
        assert!((pim.covariance() - expected).norm() < 1e-15);

        // documented F block structure on the first step (ΔR starts at identity)
        let pos_vel = f.fixed_view::<3, 3>(0, 3).into_owned();
        assert!((pos_vel - Matrix3::identity() * dt).norm() < 1e-15);
        let pos_pos = f.fixed_view::<3, 3>(0, 0).into_owned();
        assert!((pos_pos - Matrix3::identity()).norm() < 1e-15);
        // G integration block
        let g_pos = g.fixed_view::<3, 3>(0, 0).into_owned();
        assert!((g_pos - Matrix3::identity() * dt).norm() < 1e-15);
    }

    #[test]
    fn test_composition_consistency_rotation() {
        // N increments of a constant rate compose to Exp(ω·T) for any N
        let omega = Vector3::new(0.01, -0.02, 0.03);
        let t_total = 1.0;
        let n = 40;
        let mut pim = fresh();
        for _ in 0..n {
            pim.integrate(&Vector3::zeros(), &omega, t_total / n as f64, None)
                .unwrap();
        }
        let closed_form = SO3::from_scaled_axis(omega * t_total);
        assert!(pim.delta_rotation().is_approx(&closed_form, 1e-9));
    }

    #[test]
    fn test_composition_consistency_velocity() {
        // Closed form for constant acc and rate: Δv(T) = T · Jl(ω·T) · a,
        // since ∫₀ᵀ Exp(ω t) dt = T · Jl(ω T). The Euler sum converges to it
        // as the step count grows.
        let omega = Vector3::new(0.01, -0.02, 0.03);
        let acc = Vector3::new(0.1, 0.2, 9.0);
        let t_total = 1.0;
        let closed_form = t_total * SO3Tangent::new(omega * t_total).left_jacobian() * acc;

        let integrate_n = |n: usize| {
            let mut pim = fresh();
            for _ in 0..n {
                pim.integrate(&acc, &omega, t_total / n as f64, None).unwrap();
            }
            (pim.delta_velocity() - closed_form).norm()
        };

        let coarse = integrate_n(20);
        let fine = integrate_n(200);
        assert!(coarse < 1e-2);
        assert!(fine < 1e-3);
        assert!(fine < coarse);
    }

    #[test]
    fn test_bias_corrected_deltas_zero_drift_is_exact() {
        let bias = ImuBias::new(Vector3::new(0.05, 0.0, -0.1), Vector3::new(0.01, 0.02, 0.0));
        let mut pim = ImuPreintegrator::new(
            test_params().with_second_order_integration(true),
            bias,
        );
        for _ in 0..20 {
            pim.integrate(
                &Vector3::new(0.3, -0.1, 9.8),
                &Vector3::new(0.1, 0.05, -0.2),
                0.01,
                None,
            )
            .unwrap();
        }

        let (rotation, velocity, position) = pim.bias_corrected_deltas(&bias);
        assert_eq!(rotation.quaternion(), pim.delta_rotation().quaternion());
        assert_eq!(&velocity, pim.delta_velocity());
        assert_eq!(&position, pim.delta_position());
    }

    #[test]
    fn test_bias_jacobians_predict_reintegration() {
        // The stored first-order sensitivities must match the delta change
        // produced by actually re-integrating with a shifted bias.
        let params = test_params().with_second_order_integration(true);
        let bias = ImuBias::new(Vector3::new(0.02, -0.01, 0.03), Vector3::new(0.005, 0.01, -0.02));
        let shift = ImuBias::new(
            Vector3::new(1e-4, -2e-4, 1.5e-4),
            Vector3::new(-1e-4, 5e-5, 2e-4),
        );
        let shifted = ImuBias::new(
            bias.accelerometer() + shift.accelerometer(),
            bias.gyroscope() + shift.gyroscope(),
        );

        let integrate_with = |bias_hat: ImuBias| {
            let mut pim = ImuPreintegrator::new(params.clone(), bias_hat);
            for k in 0..15 {
                let t = k as f64 * 0.01;
                let acc = Vector3::new(0.4 * t.cos(), 0.2 * t.sin(), 9.8);
                let omega = Vector3::new(0.3, -0.2 * t.cos(), 0.1 * t.sin());
                pim.integrate(&acc, &omega, 0.01, None).unwrap();
            }
            pim
        };

        let pim = integrate_with(bias);
        let pim_shifted = integrate_with(shifted);

        let (rotation, velocity, position) = pim.bias_corrected_deltas(&shifted);
        assert!(rotation.is_approx(pim_shifted.delta_rotation(), 1e-6));
        assert!((velocity - pim_shifted.delta_velocity()).norm() < 1e-6);
        assert!((position - pim_shifted.delta_position()).norm() < 1e-6);
    }

    #[test]
    fn test_deterministic_after_reset() {
        let run = |pim: &mut ImuPreintegrator| {
            for _ in 0..5 {
                pim.integrate(
                    &Vector3::new(0.1, 0.2, 9.8),
                    &Vector3::new(0.05, -0.02, 0.1),
                    0.01,
                    None,
                )
                .unwrap();
            }
        };

        let mut a = fresh();
        run(&mut a);
        let mut b = fresh();
        run(&mut b);
        b.reset();
        run(&mut b);
        assert!(a.is_approx(&b, 1e-15));
    }
}
