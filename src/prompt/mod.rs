//! Prompt template library and rendering

pub mod library;
pub mod render;

pub use library::{PromptLibrary, PromptTemplate};
pub use render::PromptRenderer;
