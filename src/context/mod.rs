/// Token-budgeted natural-language summaries of a dependency graph.
pub mod summarizer;

pub use summarizer::{
    estimate_tokens, generate_context, generate_context_with, ContextOptions, CHARS_PER_TOKEN,
};
