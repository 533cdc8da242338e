//! Command implementations.

mod calibrate;
mod capture;
mod info;
mod validate;

pub use calibrate::run_calibrate;
pub use capture::run_capture;
pub use info::run_info;
pub use validate::run_validate;
