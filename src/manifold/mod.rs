//! Manifold representations for optimization on non-Euclidean spaces.
//!
//! This module provides the two manifolds the inertial core integrates and
//! linearizes on:
//! - **SO(3)**: Special Orthogonal group (rotations), with exponential and
//!   logarithmic maps and the right-Jacobian family needed for first-order
//!   uncertainty and bias-sensitivity propagation
//! - **SE(3)**: Special Euclidean group (rigid body poses)
//!
//! Rotations are dedicated value types composed via group multiplication,
//! never raw 3-vectors or quaternion arrays manipulated ad hoc. Operations
//! that have useful analytic derivatives accept optional mutable Jacobian
//! slots; passing `None` skips the corresponding computation entirely.
//!
//! Conventions follow the [manif](https://github.com/artivis/manif) C++
//! library: right perturbations (`R ⊕ θ = R · Exp(θ)`) and axis-angle tangent
//! vectors whose direction is the rotation axis and magnitude the angle.

use nalgebra::{Matrix3, Vector3};

pub mod se3;
pub mod so3;

/// Skew-symmetric (hat) operator: maps `v ∈ R³` to the matrix `[v]ₓ` such
/// that `[v]ₓ · w = v × w`.
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y, //
        v.z, 0.0, -v.x, //
        -v.y, v.x, 0.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skew_cross_product() {
        let v = Vector3::new(0.3, -1.2, 2.5);
        let w = Vector3::new(-0.7, 0.4, 1.1);
        assert!((skew(&v) * w - v.cross(&w)).norm() < 1e-15);
    }

    #[test]
    fn test_skew_antisymmetric() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let s = skew(&v);
        assert!((s + s.transpose()).norm() < 1e-15);
    }
}
