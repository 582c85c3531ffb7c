pub mod analyzer;
pub mod config;
pub mod context;
pub mod errors;
pub mod export;
pub mod graph;
pub mod repository;
pub mod resolution;
pub mod signature;
pub mod types;

pub use analyzer::DependencyAnalyzer;
