//! IMU preintegration and the inertial motion factor.
//!
//! The types in this module summarize a stream of high-rate inertial samples
//! into a single relative-motion constraint:
//!
//! - [`ImuBias`]: the constant accelerometer/gyroscope bias pair removed from
//!   raw measurements during integration.
//! - [`PreintegrationParams`]: continuous-time sensor noise densities and
//!   integration options.
//! - [`ImuPreintegrator`]: the stateful accumulator. Each call to
//!   [`Preintegration::integrate`] folds one sample into the running rotation /
//!   velocity / position deltas, their bias-sensitivity Jacobians, and the
//!   propagated 9×9 covariance.
//! - [`ImuFactor`]: the stateless evaluator. Built once from a preintegration
//!   snapshot, it produces the 9-dimensional residual and up to five analytic
//!   Jacobian blocks each time the optimizer linearizes.
//!
//! The 9-dimensional error space is ordered `[position, velocity, rotation]`
//! throughout: residual rows, covariance blocks, and the rows of every
//! Jacobian all follow this ordering.

use nalgebra::SMatrix;

pub mod bias;
pub mod factor;
pub mod params;
pub mod preintegration;

pub use bias::ImuBias;
pub use factor::ImuFactor;
pub use params::PreintegrationParams;
pub use preintegration::{ImuPreintegrator, Preintegration};

/// 9-dimensional error vector over `[position, velocity, rotation]`.
pub type Vector9 = nalgebra::SVector<f64, 9>;

/// 9×9 matrix over the `[position, velocity, rotation]` error space.
pub type Matrix9 = SMatrix<f64, 9, 9>;

/// Jacobian of a 9-dimensional residual with respect to a pose or bias (6 DOF).
pub type Matrix9x6 = SMatrix<f64, 9, 6>;

/// Jacobian of a 9-dimensional residual with respect to a velocity (3 DOF).
pub type Matrix9x3 = SMatrix<f64, 9, 3>;
