//! SO(3) - Special Orthogonal Group in 3D
//!
//! This module implements the Special Orthogonal group SO(3), which represents
//! rotations in 3D space.
//!
//! SO(3) elements are represented using nalgebra's UnitQuaternion internally.
//! SO(3) tangent elements are represented as axis-angle vectors in R³,
//! where the direction gives the axis of rotation and the magnitude gives the angle.
//!
//! The implementation follows the [manif](https://github.com/artivis/manif) C++ library
//! conventions. Every map that degenerates at a zero rotation angle (Exp, Log,
//! the right/left Jacobians and their inverses) carries a small-angle series
//! branch keyed on the squared angle, so near-identity rotations never divide
//! by a vanishing norm.

use crate::manifold::skew;
use nalgebra::{Matrix3, Quaternion, Unit, UnitQuaternion, Vector3};
use std::fmt;

/// SO(3) group element representing rotations in 3D.
///
/// Internally represented using nalgebra's UnitQuaternion<f64> for efficient rotations.
#[derive(Clone, Debug, PartialEq)]
pub struct SO3 {
    /// Internal representation as a unit quaternion
    quaternion: UnitQuaternion<f64>,
}

impl fmt::Display for SO3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = self.quaternion.quaternion();
        write!(
            f,
            "SO3(quaternion: [w: {:.4}, x: {:.4}, y: {:.4}, z: {:.4}])",
            q.w, q.i, q.j, q.k
        )
    }
}

/// SO(3) tangent space element representing elements in the Lie algebra so(3).
///
/// Internally represented as axis-angle vectors in R³ where:
/// - Direction: axis of rotation (unit vector)
/// - Magnitude: angle of rotation (radians)
#[derive(Clone, Debug, PartialEq)]
pub struct SO3Tangent {
    /// Internal data: axis-angle vector [θx, θy, θz]
    data: Vector3<f64>,
}

impl fmt::Display for SO3Tangent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "so3(axis-angle: [{:.4}, {:.4}, {:.4}])",
            self.data.x, self.data.y, self.data.z
        )
    }
}

impl SO3 {
    /// Degrees of freedom - dimension of the tangent space
    pub const DOF: usize = 3;

    /// Get the identity element of the group.
    pub fn identity() -> Self {
        SO3 {
            quaternion: UnitQuaternion::identity(),
        }
    }

    /// Create a new SO(3) element from a unit quaternion.
    #[inline]
    pub fn new(quaternion: UnitQuaternion<f64>) -> Self {
        SO3 { quaternion }
    }

    /// Create SO(3) from axis-angle representation.
    pub fn from_axis_angle(axis: &Vector3<f64>, angle: f64) -> Self {
        let unit_axis = Unit::new_normalize(*axis);
        SO3::new(UnitQuaternion::from_axis_angle(&unit_axis, angle))
    }

    /// Create SO(3) from a scaled axis (axis-angle vector).
    pub fn from_scaled_axis(axis_angle: Vector3<f64>) -> Self {
        SO3Tangent::new(axis_angle).exp(None)
    }

    /// Create SO(3) from Euler angles (roll, pitch, yaw).
    pub fn from_euler_angles(roll: f64, pitch: f64, yaw: f64) -> Self {
        SO3::new(UnitQuaternion::from_euler_angles(roll, pitch, yaw))
    }

    /// Get the quaternion representation.
    #[inline]
    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        self.quaternion
    }

    /// Get the rotation matrix (3x3).
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.quaternion.to_rotation_matrix().into_inner()
    }

    /// SO(3) inverse.
    ///
    /// # Arguments
    /// * `jacobian` - Optional Jacobian of the inverse wrt self: `-Adj(R) = -R`
    ///
    /// # Notes
    /// R⁻¹ = Rᵀ, for quaternions: q⁻¹ = q*
    pub fn inverse(&self, jacobian: Option<&mut Matrix3<f64>>) -> SO3 {
        if let Some(jac) = jacobian {
            *jac = -self.rotation_matrix();
        }

        SO3 {
            quaternion: self.quaternion.inverse(),
        }
    }

    /// SO(3) composition: `self ∘ other`.
    ///
    /// # Arguments
    /// * `other` - Another SO(3) element.
    /// * `jacobian_self` - Optional Jacobian of the composition wrt self: `R_otherᵀ`
    /// * `jacobian_other` - Optional Jacobian of the composition wrt other: `I`
    pub fn compose(
        &self,
        other: &SO3,
        jacobian_self: Option<&mut Matrix3<f64>>,
        jacobian_other: Option<&mut Matrix3<f64>>,
    ) -> SO3 {
        if let Some(jac_self) = jacobian_self {
            *jac_self = other.rotation_matrix().transpose();
        }

        if let Some(jac_other) = jacobian_other {
            *jac_other = Matrix3::identity();
        }

        SO3 {
            quaternion: self.quaternion * other.quaternion,
        }
    }

    /// Relative rotation: `self⁻¹ ∘ other`.
    ///
    /// # Arguments
    /// * `jacobian_self` - Optional Jacobian wrt self: `-(self⁻¹ ∘ other)ᵀ`
    /// * `jacobian_other` - Optional Jacobian wrt other: `I`
    pub fn between(
        &self,
        other: &SO3,
        jacobian_self: Option<&mut Matrix3<f64>>,
        jacobian_other: Option<&mut Matrix3<f64>>,
    ) -> SO3 {
        let result = SO3 {
            quaternion: self.quaternion.inverse() * other.quaternion,
        };

        if let Some(jac_self) = jacobian_self {
            *jac_self = -result.rotation_matrix().transpose();
        }

        if let Some(jac_other) = jacobian_other {
            *jac_other = Matrix3::identity();
        }

        result
    }

    /// Get the corresponding Lie algebra element in vector form.
    ///
    /// # Arguments
    /// * `jacobian` - Optional Jacobian of the tangent wrt self: `Jr⁻¹(Log(R))`
    ///
    /// # Notes
    /// Logarithmic map for unit quaternions (S³):
    /// θu = Log(q) = (2 / ||v||) * v * arctan(||v||, w) ∈ R³
    pub fn log(&self, jacobian: Option<&mut Matrix3<f64>>) -> SO3Tangent {
        let q = self.quaternion.quaternion();
        let sin_angle_squared = q.i * q.i + q.j * q.j + q.k * q.k;

        let log_coeff = if sin_angle_squared > f64::EPSILON {
            let sin_angle = sin_angle_squared.sqrt();
            let cos_angle = q.w;

            // cos_angle < 0 means the quaternion encodes the long way around;
            // flip both arguments to keep the extracted angle in [0, pi].
            let two_angle = 2.0
                * if cos_angle < 0.0 {
                    f64::atan2(-sin_angle, -cos_angle)
                } else {
                    f64::atan2(sin_angle, cos_angle)
                };

            two_angle / sin_angle
        } else {
            // Small-angle approximation
            2.0
        };

        let axis_angle = SO3Tangent::new(Vector3::new(
            q.i * log_coeff,
            q.j * log_coeff,
            q.k * log_coeff,
        ));

        if let Some(jac) = jacobian {
            *jac = axis_angle.right_jacobian_inv();
        }

        axis_angle
    }

    /// Act on a vector: `R · v`.
    ///
    /// # Arguments
    /// * `jacobian_self` - Optional Jacobian wrt the rotation: `-R [v]ₓ`
    /// * `jacobian_vector` - Optional Jacobian wrt the vector: `R`
    pub fn act(
        &self,
        vector: &Vector3<f64>,
        jacobian_self: Option<&mut Matrix3<f64>>,
        jacobian_vector: Option<&mut Matrix3<f64>>,
    ) -> Vector3<f64> {
        if let Some(jac_self) = jacobian_self {
            *jac_self = -self.rotation_matrix() * skew(vector);
        }

        if let Some(jac_vector) = jacobian_vector {
            *jac_vector = self.rotation_matrix();
        }

        self.quaternion * vector
    }

    /// Adjoint matrix Ad(R). For SO(3) this is the rotation matrix itself.
    pub fn adjoint(&self) -> Matrix3<f64> {
        self.rotation_matrix()
    }

    /// Generate a random rotation (useful for testing).
    pub fn random() -> SO3 {
        SO3::from_scaled_axis(Vector3::new(
            rand::random::<f64>() * 2.0 - 1.0,
            rand::random::<f64>() * 2.0 - 1.0,
            rand::random::<f64>() * 2.0 - 1.0,
        ))
    }

    /// Approximate equality: the relative rotation's angle is below `tolerance`.
    pub fn is_approx(&self, other: &SO3, tolerance: f64) -> bool {
        self.between(other, None, None).log(None).angle() < tolerance
    }
}

impl SO3Tangent {
    /// Create a new SO3Tangent from an axis-angle vector.
    #[inline]
    pub fn new(axis_angle: Vector3<f64>) -> Self {
        SO3Tangent { data: axis_angle }
    }

    /// Zero tangent vector.
    pub fn zero() -> Self {
        SO3Tangent::new(Vector3::zeros())
    }

    /// Get the axis-angle vector.
    #[inline]
    pub fn coeffs(&self) -> Vector3<f64> {
        self.data
    }

    /// Get the angle of rotation.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.data.norm()
    }

    /// Check if the tangent vector is approximately zero.
    pub fn is_zero(&self, tolerance: f64) -> bool {
        self.data.norm() < tolerance
    }

    /// SO(3) exponential map.
    ///
    /// # Arguments
    /// * `jacobian` - Optional Jacobian of the SO(3) element wrt self: `Jr(θ)`
    ///
    /// # Notes
    /// Exponential map for unit quaternions (S³):
    /// q = Exp(θu) = cos(θ/2) + u sin(θ/2) ∈ H
    pub fn exp(&self, jacobian: Option<&mut Matrix3<f64>>) -> SO3 {
        let theta_squared = self.data.norm_squared();

        let quaternion = if theta_squared > f64::EPSILON {
            UnitQuaternion::from_scaled_axis(self.data)
        } else {
            // First-order quaternion: q ≈ [1, θ/2]
            UnitQuaternion::from_quaternion(Quaternion::new(
                1.0,
                self.data.x / 2.0,
                self.data.y / 2.0,
                self.data.z / 2.0,
            ))
        };

        if let Some(jac) = jacobian {
            *jac = self.right_jacobian();
        }

        SO3 { quaternion }
    }

    /// Right Jacobian for SO(3): `Jr(θ) = Jl(θ)ᵀ`.
    ///
    /// Relates a perturbation of the Exp argument to a right perturbation of
    /// the mapped rotation: Exp(θ + δθ) ≈ Exp(θ) ∘ Exp(Jr(θ) δθ).
    pub fn right_jacobian(&self) -> Matrix3<f64> {
        self.left_jacobian().transpose()
    }

    /// Left Jacobian for SO(3).
    ///
    /// # Notes
    /// Jl(θ) = I + (1 - cos θ)/θ² [θ]ₓ + (θ - sin θ)/θ³ [θ]ₓ²
    pub fn left_jacobian(&self) -> Matrix3<f64> {
        let theta_squared = self.data.norm_squared();
        let tangent_skew = self.hat();

        if theta_squared <= f64::EPSILON {
            Matrix3::identity() + 0.5 * tangent_skew
        } else {
            let theta = theta_squared.sqrt();
            let sin_theta = theta.sin();
            let cos_theta = theta.cos();

            Matrix3::identity()
                + (1.0 - cos_theta) / theta_squared * tangent_skew
                + (theta - sin_theta) / (theta_squared * theta) * tangent_skew * tangent_skew
        }
    }

    /// Inverse of the right Jacobian: `Jr⁻¹(θ) = Jl⁻¹(θ)ᵀ`.
    pub fn right_jacobian_inv(&self) -> Matrix3<f64> {
        self.left_jacobian_inv().transpose()
    }

    /// Inverse of the left Jacobian for SO(3).
    ///
    /// # Notes
    /// Jl⁻¹(θ) = I - (1/2) [θ]ₓ + (1/θ² - (1 + cos θ)/(2θ sin θ)) [θ]ₓ²
    pub fn left_jacobian_inv(&self) -> Matrix3<f64> {
        let theta_squared = self.data.norm_squared();
        let tangent_skew = self.hat();

        if theta_squared <= f64::EPSILON {
            Matrix3::identity() - 0.5 * tangent_skew
        } else {
            let theta = theta_squared.sqrt();
            let sin_theta = theta.sin();
            let cos_theta = theta.cos();

            Matrix3::identity() - 0.5 * tangent_skew
                + (1.0 / theta_squared - (1.0 + cos_theta) / (2.0 * theta * sin_theta))
                    * tangent_skew
                    * tangent_skew
        }
    }

    /// Hat operator: `[θ]ₓ` (vector to skew-symmetric matrix).
    pub fn hat(&self) -> Matrix3<f64> {
        skew(&self.data)
    }
}
