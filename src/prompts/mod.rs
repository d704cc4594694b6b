//! Prompt templates and the requests rendered from them.

pub mod template;

pub use template::{PromptTemplate, RenderedRequest};
