/// Graph data structure with forward and reverse adjacency.
pub mod model;

/// Graph assembly and the signature-keyed build cache.
pub mod builder;

/// Strongly connected components and representative cycles.
pub mod cycles;

/// Direct and indirect dependency queries.
pub mod queries;

pub use builder::{assemble, GraphBuilder};
pub use cycles::find_cycles;
pub use model::{DependencyGraph, EdgeInsert, NodeHandle, NodeInsert};
pub use queries::{GraphQuery, QueryDirection, Reached};
