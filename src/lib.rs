//! # apex-inertial
//!
//! On-manifold IMU preintegration and inertial motion factors for nonlinear
//! least-squares estimation.
//!
//! The crate has two halves:
//!
//! - [`imu::ImuPreintegrator`] consumes a stream of high-rate accelerometer /
//!   gyroscope samples and summarizes them into relative rotation, velocity
//!   and position deltas, their sensitivity to the bias estimate used during
//!   integration, and a propagated 9×9 covariance of the deltas.
//! - [`imu::ImuFactor`] takes an immutable snapshot of that summary and turns
//!   it into a 9-dimensional residual with analytic Jacobians with respect to
//!   the two end poses, the two end velocities, and the bias: the contract a
//!   factor-graph optimizer linearizes against.
//!
//! The manifold machinery (SO(3) exponential/log maps, right Jacobians, SE(3)
//! poses) lives in [`manifold`].

pub mod error;
pub mod imu;
pub mod logger;
pub mod manifold;

pub use error::{InertialError, InertialResult};
pub use logger::{init_logger, init_logger_with_level};
