//! Infrastructure adapters for IO, config, logging, and terminal output.

pub mod config;
pub mod highlight;
pub mod logging;
pub mod source;
