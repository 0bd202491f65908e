//! Inertial motion factor: the residual/Jacobian contract between a
//! preintegration snapshot and a nonlinear least-squares optimizer.
//!
//! The factor constrains two poses, two velocities and the bias through the
//! preintegrated deltas, first-order corrected for bias drift since
//! integration time, with gravity and (optionally) Coriolis terms folded
//! into the prediction.
//!
//! # Residual convention
//!
//! Rows ordered `[position, velocity, rotation]`, matching the covariance of
//! the snapshot. Position and velocity mismatches are expressed in frame i
//! (prediction subtracted from estimate, rotated by `Rᵢᵀ`); the rotation
//! mismatch is `Log(ΔR_corrected⁻¹ · Rᵢᵀ · Rⱼ)`.
//!
//! # Jacobian convention
//!
//! Pose columns follow the `[ρ, θ]` product retraction of [`SE3`], velocity
//! columns are plain vector perturbations, bias columns are ordered
//! `[δb_acc, δb_gyro]`. Each block is computed analytically and only when its
//! output slot is present.

use crate::error::{InertialError, InertialResult};
use crate::imu::preintegration::{ImuPreintegrator, Preintegration};
use crate::imu::{ImuBias, Matrix9, Matrix9x3, Matrix9x6, Vector9};
use crate::manifold::se3::SE3;
use crate::manifold::skew;
use crate::manifold::so3::SO3Tangent;
use nalgebra::{Matrix3, Vector3};
use std::fmt;
use tracing::debug;

/// Motion constraint between two (pose, velocity) end states and a bias,
/// built from an immutable preintegration snapshot.
///
/// The snapshot is cloned at construction: integrating further on the source
/// preintegrator cannot retroactively change an already-built factor.
/// `evaluate` is a pure function of its inputs and the snapshot, safe to call
/// concurrently from multiple optimizer threads.
#[derive(Clone, Debug)]
pub struct ImuFactor {
    /// Variable identifiers in order `[pose_i, vel_i, pose_j, vel_j, bias]`
    keys: [usize; 5],
    preintegration: ImuPreintegrator,
    gravity: Vector3<f64>,
    omega_coriolis: Option<Vector3<f64>>,
    use_2nd_order_coriolis: bool,
}

impl fmt::Display for ImuFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ImuFactor(keys: {:?}, dt: {:.4}, gravity: [{:.4}, {:.4}, {:.4}])",
            self.keys,
            self.preintegration.delta_time(),
            self.gravity.x,
            self.gravity.y,
            self.gravity.z
        )
    }
}

impl ImuFactor {
    /// Build a factor from a preintegration snapshot.
    ///
    /// # Arguments
    /// * `keys` - Variable identifiers `[pose_i, vel_i, pose_j, vel_j, bias]`
    /// * `preintegration` - Snapshot to constrain against (cloned)
    /// * `gravity` - Gravity vector in the world frame
    /// * `omega_coriolis` - Angular rate of the world frame, if it rotates
    /// * `use_2nd_order_coriolis` - Include the centrifugal position/velocity
    ///   terms; requires `omega_coriolis`
    ///
    /// Fails with `InvalidConfiguration` if the second-order Coriolis
    /// correction is requested without a Coriolis rate.
    pub fn new(
        keys: [usize; 5],
        preintegration: &ImuPreintegrator,
        gravity: Vector3<f64>,
        omega_coriolis: Option<Vector3<f64>>,
        use_2nd_order_coriolis: bool,
    ) -> InertialResult<Self> {
        if use_2nd_order_coriolis && omega_coriolis.is_none() {
            return Err(InertialError::InvalidConfiguration(
                "second-order Coriolis correction requires a Coriolis angular rate".to_string(),
            ));
        }

        debug!(
            delta_time = preintegration.delta_time(),
            "built imu factor"
        );
        Ok(ImuFactor {
            keys,
            preintegration: preintegration.clone(),
            gravity,
            omega_coriolis,
            use_2nd_order_coriolis,
        })
    }

    /// Variable identifiers in order `[pose_i, vel_i, pose_j, vel_j, bias]`.
    pub fn keys(&self) -> &[usize; 5] {
        &self.keys
    }

    /// The preintegration snapshot this factor constrains against.
    pub fn preintegration(&self) -> &ImuPreintegrator {
        &self.preintegration
    }

    /// The snapshot covariance, for the optimizer's noise-model adapter.
    pub fn covariance(&self) -> &Matrix9 {
        self.preintegration.covariance()
    }

    /// Get the gravity vector.
    pub fn gravity(&self) -> Vector3<f64> {
        self.gravity
    }

    /// Predict the end state (pose_j, vel_j) from the start state and a bias
    /// estimate, folding in gravity and the configured Coriolis terms.
    pub fn predict(
        &self,
        pose_i: &SE3,
        vel_i: &Vector3<f64>,
        bias_i: &ImuBias,
    ) -> (SE3, Vector3<f64>) {
        let dt = self.preintegration.delta_time();
        let rotation_i = pose_i.rotation();
        let rotation_i_mat = rotation_i.rotation_matrix();
        let omega_coriolis = self.omega_coriolis.unwrap_or_else(Vector3::zeros);

        let (delta_rotation, delta_velocity, delta_position) =
            self.preintegration.bias_corrected_deltas(bias_i);

        let (position_j, velocity_j) = self.predict_translational(
            &pose_i.translation(),
            &rotation_i_mat,
            vel_i,
            &delta_position,
            &delta_velocity,
        );

        let theta_corrected =
            delta_rotation.log(None).coeffs() - rotation_i_mat.transpose() * omega_coriolis * dt;
        let rotation_j = rotation_i.compose(
            &SO3Tangent::new(theta_corrected).exp(None),
            None,
            None,
        );

        (SE3::new(position_j, rotation_j), velocity_j)
    }

    /// Evaluate the residual and, for each output slot that is present, the
    /// analytic Jacobian with respect to that variable.
    ///
    /// Pure and reentrant; never fails on valid numeric input. A zero-length
    /// snapshot (never integrated) evaluates to a residual driven purely by
    /// the gravity and initial-condition terms.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        &self,
        pose_i: &SE3,
        vel_i: &Vector3<f64>,
        pose_j: &SE3,
        vel_j: &Vector3<f64>,
        bias_i: &ImuBias,
        h_pose_i: Option<&mut Matrix9x6>,
        h_vel_i: Option<&mut Matrix9x3>,
        h_pose_j: Option<&mut Matrix9x6>,
        h_vel_j: Option<&mut Matrix9x3>,
        h_bias: Option<&mut Matrix9x6>,
    ) -> Vector9 {
        let pim = &self.preintegration;
        let dt = pim.delta_time();
        let omega_coriolis = self.omega_coriolis.unwrap_or_else(Vector3::zeros);

        let bias_incr = *bias_i - *pim.bias_hat();
        let dba = bias_incr.accelerometer();
        let dbg = bias_incr.gyroscope();

        let rotation_i = pose_i.rotation();
        let rotation_i_mat = rotation_i.rotation_matrix();
        let rotation_i_t = rotation_i_mat.transpose();
        let rotation_j = pose_j.rotation();

        // First-order bias-corrected translational deltas
        let dp_corrected = pim.delta_position() + pim.dp_dba() * dba + pim.dp_dbg() * dbg;
        let dv_corrected = pim.delta_velocity() + pim.dv_dba() * dba + pim.dv_dbg() * dbg;

        let (position_j_pred, velocity_j_pred) = self.predict_translational(
            &pose_i.translation(),
            &rotation_i_mat,
            vel_i,
            &dp_corrected,
            &dv_corrected,
        );

        // Rᵢᵀ keeps the additive-noise model consistent with the covariance
        let fp = rotation_i_t * (pose_j.translation() - position_j_pred);
        let fv = rotation_i_t * (vel_j - velocity_j_pred);

        // Rotation residual: bias-correct the rotation delta, remove the frame
        // rotation accumulated over the interval, compare against Rᵢᵀ·Rⱼ.
        let xi = SO3Tangent::new(pim.dr_dbg() * dbg);
        let delta_rotation_corrected =
            pim.delta_rotation().compose(&xi.exp(None), None, None);
        let theta_corrected = delta_rotation_corrected.log(None);
        let coriolis = rotation_i_t * omega_coriolis * dt;
        let c_omega = SO3Tangent::new(theta_corrected.coeffs() - coriolis);
        let corrected_delta_rotation = c_omega.exp(None);
        let rotation_ij = rotation_i.between(rotation_j, None, None);
        let f_rrot = corrected_delta_rotation.between(&rotation_ij, None, None);
        let fr = f_rrot.log(None);

        let mut residual = Vector9::zeros();
        residual.fixed_rows_mut::<3>(0).copy_from(&fp);
        residual.fixed_rows_mut::<3>(3).copy_from(&fv);
        residual.fixed_rows_mut::<3>(6).copy_from(&fr.coeffs());

        // Shared derivative pieces, computed only when a Jacobian that needs
        // them is requested
        let need_rotation_chain = h_pose_i.is_some() || h_pose_j.is_some() || h_bias.is_some();
        let (d_fr_frrot, jr_c_omega, f_rrot_inv) = if need_rotation_chain {
            (
                fr.right_jacobian_inv(),
                c_omega.right_jacobian(),
                f_rrot.inverse(None).rotation_matrix(),
            )
        } else {
            (Matrix3::zeros(), Matrix3::zeros(), Matrix3::zeros())
        };
        let rotation_i_t_coriolis_hat = rotation_i_t * skew(&omega_coriolis);

        if let Some(h) = h_pose_i {
            let mut dfp_dpi = -Matrix3::identity();
            let mut dfv_dpi = Matrix3::zeros();
            if self.use_2nd_order_coriolis {
                // Rᵢᵀ [ω]ₓ [ω]ₓ Rᵢ
                let centrifugal_gain = rotation_i_t_coriolis_hat * skew(&omega_coriolis) * rotation_i_mat;
                dfp_dpi += 0.5 * centrifugal_gain * dt * dt;
                dfv_dpi += centrifugal_gain * dt;
            }
            let d_coriolis = -jr_c_omega * skew(&coriolis);
            let dfr_dri = d_fr_frrot
                * (-rotation_ij.inverse(None).rotation_matrix() - f_rrot_inv * d_coriolis);

            h.fill(0.0);
            h.fixed_view_mut::<3, 3>(0, 0).copy_from(&dfp_dpi);
            h.fixed_view_mut::<3, 3>(0, 3)
                .copy_from(&skew(&(fp + dp_corrected)));
            h.fixed_view_mut::<3, 3>(3, 0).copy_from(&dfv_dpi);
            h.fixed_view_mut::<3, 3>(3, 3)
                .copy_from(&skew(&(fv + dv_corrected)));
            h.fixed_view_mut::<3, 3>(6, 3).copy_from(&dfr_dri);
        }

        if let Some(h) = h_vel_i {
            h.fill(0.0);
            h.fixed_view_mut::<3, 3>(0, 0)
                .copy_from(&(-rotation_i_t * dt + rotation_i_t_coriolis_hat * dt * dt));
            h.fixed_view_mut::<3, 3>(3, 0)
                .copy_from(&(-rotation_i_t + 2.0 * rotation_i_t_coriolis_hat * dt));
        }

        if let Some(h) = h_pose_j {
            h.fill(0.0);
            h.fixed_view_mut::<3, 3>(0, 0)
                .copy_from(&(rotation_i_t * rotation_j.rotation_matrix()));
            h.fixed_view_mut::<3, 3>(6, 3).copy_from(&d_fr_frrot);
        }

        if let Some(h) = h_vel_j {
            h.fill(0.0);
            h.fixed_view_mut::<3, 3>(3, 0).copy_from(&rotation_i_t);
        }

        if let Some(h) = h_bias {
            let d_theta_dbg =
                theta_corrected.right_jacobian_inv() * xi.right_jacobian() * pim.dr_dbg();
            let dfr_dbg = d_fr_frrot * (-f_rrot_inv * (jr_c_omega * d_theta_dbg));

            h.fill(0.0);
            h.fixed_view_mut::<3, 3>(0, 0).copy_from(&(-pim.dp_dba()));
            h.fixed_view_mut::<3, 3>(0, 3).copy_from(&(-pim.dp_dbg()));
            h.fixed_view_mut::<3, 3>(3, 0).copy_from(&(-pim.dv_dba()));
            h.fixed_view_mut::<3, 3>(3, 3).copy_from(&(-pim.dv_dbg()));
            h.fixed_view_mut::<3, 3>(6, 3).copy_from(&dfr_dbg);
        }

        residual
    }

    /// Gravity / Coriolis prediction of the translational end state, shared
    /// by `predict` and `evaluate`.
    fn predict_translational(
        &self,
        position_i: &Vector3<f64>,
        rotation_i_mat: &Matrix3<f64>,
        vel_i: &Vector3<f64>,
        dp_corrected: &Vector3<f64>,
        dv_corrected: &Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let dt = self.preintegration.delta_time();
        let omega_coriolis = self.omega_coriolis.unwrap_or_else(Vector3::zeros);

        let mut position_j = position_i
            + rotation_i_mat * dp_corrected
            + vel_i * dt
            + 0.5 * self.gravity * dt * dt
            - omega_coriolis.cross(vel_i) * dt * dt;
        let mut velocity_j = vel_i
            + rotation_i_mat * dv_corrected
            + self.gravity * dt
            - 2.0 * omega_coriolis.cross(vel_i) * dt;

        if self.use_2nd_order_coriolis {
            let centrifugal = omega_coriolis.cross(&omega_coriolis.cross(position_i));
            position_j -= 0.5 * centrifugal * dt * dt;
            velocity_j -= centrifugal * dt;
        }

        (position_j, velocity_j)
    }
}
