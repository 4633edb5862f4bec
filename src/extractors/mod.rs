// src/extractors/mod.rs
pub mod accessor;
pub mod document;
pub mod sections;
pub mod value;

// Re-export key extraction types for convenience
pub use document::NoticeExtractor;
