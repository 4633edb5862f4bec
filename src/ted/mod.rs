// src/ted/mod.rs
pub mod corpus;
pub mod diagnostics;
pub mod models;

pub use diagnostics::Diagnostic;
