//! E-value statistics: distribution fits and the calibration simulation.

pub mod calibrate;
pub mod gumbel;

pub use calibrate::{calibrate, Calibration, CalibrationParams};
