//! SE(3) - Special Euclidean Group in 3D
//!
//! This module implements the Special Euclidean group SE(3), which represents
//! rigid body transformations in 3D space (rotation + translation).
//!
//! SE(3) elements are represented as a combination of SO(3) rotation and Vector3
//! translation. Local coordinates are 6-vectors ordered `[ρ(3), θ(3)]` where ρ
//! is the translational component and θ the rotational (axis-angle) component.
//!
//! The local perturbation used throughout the crate is the product retraction
//!
//! ```text
//! (R, p) ⊕ [ρ, θ] = (R · Exp(θ), p + R · ρ)
//! ```
//!
//! i.e. rotation and translation are perturbed independently, with the
//! translational perturbation expressed in the body frame. All analytic
//! Jacobians with respect to a pose differentiate against this retraction.

use crate::manifold::so3::{SO3, SO3Tangent};
use nalgebra::{Vector3, Vector6};
use std::fmt;

/// SE(3) group element representing rigid body transformations in 3D.
#[derive(Clone, Debug, PartialEq)]
pub struct SE3 {
    /// Rotation part as SO(3) element
    rotation: SO3,
    /// Translation part as Vector3
    translation: Vector3<f64>,
}

impl fmt::Display for SE3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.translation();
        let q = self.rotation().quaternion();
        write!(
            f,
            "SE3(translation: [{:.4}, {:.4}, {:.4}], rotation: [w: {:.4}, x: {:.4}, y: {:.4}, z: {:.4}])",
            t.x, t.y, t.z, q.w, q.i, q.j, q.k
        )
    }
}

impl SE3 {
    /// Degrees of freedom - dimension of the tangent space
    pub const DOF: usize = 6;

    /// Create a new SE(3) element from translation and rotation.
    pub fn new(translation: Vector3<f64>, rotation: SO3) -> Self {
        SE3 {
            rotation,
            translation,
        }
    }

    /// Get the identity element of the group.
    pub fn identity() -> Self {
        SE3 {
            rotation: SO3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Create SE(3) from translation components and Euler angles.
    pub fn from_translation_euler(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        SE3::new(
            Vector3::new(x, y, z),
            SO3::from_euler_angles(roll, pitch, yaw),
        )
    }

    /// Get the rotation part.
    #[inline]
    pub fn rotation(&self) -> &SO3 {
        &self.rotation
    }

    /// Get the translation part.
    #[inline]
    pub fn translation(&self) -> Vector3<f64> {
        self.translation
    }

    /// Composition: `self ∘ other`.
    pub fn compose(&self, other: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation.compose(&other.rotation, None, None),
            translation: self.rotation.act(&other.translation, None, None) + self.translation,
        }
    }

    /// Inverse: `(R, p)⁻¹ = (Rᵀ, -Rᵀ p)`.
    pub fn inverse(&self) -> SE3 {
        let rot_inv = self.rotation.inverse(None);
        let trans_inv = -rot_inv.act(&self.translation, None, None);
        SE3::new(trans_inv, rot_inv)
    }

    /// Relative transformation: `self⁻¹ ∘ other`.
    pub fn between(&self, other: &SE3) -> SE3 {
        self.inverse().compose(other)
    }

    /// Transform a point: `R · v + p`.
    pub fn act(&self, vector: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.act(vector, None, None) + self.translation
    }

    /// Apply a local perturbation `[ρ, θ]` via the product retraction.
    ///
    /// Returns `(R · Exp(θ), p + R · ρ)`.
    pub fn retract(&self, xi: &Vector6<f64>) -> SE3 {
        let rho = xi.fixed_rows::<3>(0).into_owned();
        let theta = SO3Tangent::new(xi.fixed_rows::<3>(3).into_owned());
        SE3 {
            rotation: self.rotation.compose(&theta.exp(None), None, None),
            translation: self.translation + self.rotation.act(&rho, None, None),
        }
    }

    /// Generate a random pose (useful for testing).
    pub fn random() -> SE3 {
        SE3 {
            rotation: SO3::random(),
            translation: Vector3::new(
                rand::random::<f64>() * 2.0 - 1.0,
                rand::random::<f64>() * 2.0 - 1.0,
                rand::random::<f64>() * 2.0 - 1.0,
            ),
        }
    }

    /// Approximate equality on both factors.
    pub fn is_approx(&self, other: &SE3, tolerance: f64) -> bool {
        self.rotation.is_approx(&other.rotation, tolerance)
            && (self.translation - other.translation).norm() < tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const TOLERANCE: f64 = 1e-10;

    #[test]
    fn test_se3_identity() {
        let pose = SE3::identity();
        assert!(pose.translation().norm() < TOLERANCE);
        assert!(pose.rotation().is_approx(&SO3::identity(), TOLERANCE));
    }

    #[test]
    fn test_se3_compose_inverse() {
        let pose = SE3::from_translation_euler(1.0, -2.0, 0.5, 0.3, -0.1, 0.8);
        let composed = pose.compose(&pose.inverse());
        assert!(composed.is_approx(&SE3::identity(), TOLERANCE));
    }

    #[test]
    fn test_se3_between() {
        let a = SE3::from_translation_euler(1.0, 0.0, 0.0, 0.0, 0.0, 0.2);
        let b = SE3::from_translation_euler(0.0, 2.0, 1.0, 0.1, -0.3, 0.0);
        let between = a.between(&b);
        assert!(a.compose(&between).is_approx(&b, TOLERANCE));
    }

    #[test]
    fn test_se3_act() {
        let pose = SE3::from_translation_euler(1.0, 2.0, 3.0, 0.0, 0.0, FRAC_PI_2);
        let transformed = pose.act(&Vector3::new(1.0, 0.0, 0.0));
        assert!((transformed - Vector3::new(1.0, 3.0, 3.0)).norm() < TOLERANCE);
    }

    #[test]
    fn test_se3_retract_zero_is_identity() {
        let pose = SE3::random();
        let retracted = pose.retract(&Vector6::zeros());
        assert!(retracted.is_approx(&pose, TOLERANCE));
    }

    #[test]
    fn test_se3_retract_components() {
        let pose = SE3::from_translation_euler(0.5, -0.5, 1.0, 0.2, 0.0, -0.4);
        let xi = Vector6::new(0.1, -0.2, 0.3, 0.01, 0.02, -0.03);
        let retracted = pose.retract(&xi);

        let rho = Vector3::new(0.1, -0.2, 0.3);
        let theta = Vector3::new(0.01, 0.02, -0.03);
        let expected_rotation = pose
            .rotation()
            .compose(&SO3Tangent::new(theta).exp(None), None, None);
        let expected_translation = pose.translation() + pose.rotation().act(&rho, None, None);

        assert!(retracted.rotation().is_approx(&expected_rotation, TOLERANCE));
        assert!((retracted.translation() - expected_translation).norm() < TOLERANCE);
    }
}
