//! Application layer: parsing, pattern analysis, and navigation over documents.

pub mod containment;
pub mod effective;
pub mod highlight;
pub mod navigate;
pub mod parse;
pub mod pattern;
pub mod report;
