//! Document model and error types shared across the crate.

pub mod errors;
pub mod model;
