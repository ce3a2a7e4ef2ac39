//! CLI command handlers. Each returns the text to print.

pub mod check;
pub mod policy;
