//! Document ingestion
//!
//! Turns web pages and uploaded files into Markdown text, and text into
//! token-bounded chunks ready for embedding.

pub mod files;
pub mod markdown;
pub mod splitter;
pub mod web;

pub use files::{extract_text, is_supported_content_type};
pub use markdown::html_to_markdown;
pub use splitter::{TokenTextSplitter, TokenTextSplitterConfig};
pub use web::{WebContent, WebFetcher};
