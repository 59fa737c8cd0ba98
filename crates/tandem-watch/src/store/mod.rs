//! Storage backends.

mod markdown;

pub use markdown::MarkdownStore;
