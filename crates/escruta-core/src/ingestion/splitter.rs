//! Token-based text splitting
//!
//! Text is encoded with `cl100k_base`, cut into windows of `chunk_size`
//! tokens and each window is shortened to its last sentence boundary.

use std::sync::Arc;

use tiktoken_rs::CoreBPE;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};

/// Characters that may end a chunk
const SENTENCE_BOUNDARIES: [char; 4] = ['.', '?', '!', '\n'];

/// Tokens dropped from the end of a window when it splits a multi-byte character
const MAX_TRAILING_TRIM: usize = 3;

/// Splitter settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTextSplitterConfig {
    /// Target size of each chunk in tokens
    pub chunk_size: usize,
    /// A boundary is only used when it lies past this many characters
    pub min_chunk_size_chars: usize,
    /// Chunks must be longer than this to be kept
    pub min_chunk_length_to_embed: usize,
    pub max_num_chunks: usize,
    /// Keep line breaks inside chunks instead of flattening them to spaces
    pub keep_separator: bool,
}

impl Default for TokenTextSplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            min_chunk_size_chars: 100,
            min_chunk_length_to_embed: 5,
            max_num_chunks: 10_000,
            keep_separator: true,
        }
    }
}

impl From<&RetrievalConfig> for TokenTextSplitterConfig {
    fn from(config: &RetrievalConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            min_chunk_size_chars: config.min_chunk_size_chars,
            min_chunk_length_to_embed: config.min_chunk_length_to_embed,
            max_num_chunks: config.max_num_chunks,
            keep_separator: config.keep_separator,
        }
    }
}

/// Splits text into chunks of at most `chunk_size` tokens
#[derive(Clone)]
pub struct TokenTextSplitter {
    bpe: Arc<CoreBPE>,
    config: TokenTextSplitterConfig,
}

impl std::fmt::Debug for TokenTextSplitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenTextSplitter")
            .field("config", &self.config)
            .finish()
    }
}

impl TokenTextSplitter {
    /// Create a splitter with the default settings
    pub fn new() -> Result<Self> {
        Self::with_config(TokenTextSplitterConfig::default())
    }

    pub fn with_config(config: TokenTextSplitterConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(Error::ConfigError("chunk_size must be positive".to_string()));
        }

        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| Error::Other(format!("Failed to load cl100k_base encoding: {}", e)))?;

        Ok(Self {
            bpe: Arc::new(bpe),
            config,
        })
    }

    pub fn config(&self) -> &TokenTextSplitterConfig {
        &self.config
    }

    /// Number of tokens in `text`
    pub fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Split `text` into chunks
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let tokens = self.bpe.encode_with_special_tokens(text);
        let mut remaining: &[u32] = &tokens;
        let mut chunks = Vec::new();
        let mut windows = 0;

        while !remaining.is_empty() && windows < self.config.max_num_chunks {
            let window = &remaining[..self.config.chunk_size.min(remaining.len())];
            let (decoded, used) = self.decode_prefix(window);

            if decoded.trim().is_empty() {
                remaining = &remaining[used.max(1)..];
                continue;
            }

            let chunk_text = self.cut_at_boundary(&decoded);
            let kept = self.finish_chunk(chunk_text);
            if kept.chars().count() > self.config.min_chunk_length_to_embed {
                chunks.push(kept);
            }

            let advance = self.count_tokens(chunk_text).clamp(1, remaining.len());
            remaining = &remaining[advance..];
            windows += 1;
        }

        if !remaining.is_empty() {
            let (tail, _) = self.decode_prefix(remaining);
            let tail = tail.replace('\n', " ");
            let tail = tail.trim();
            if tail.chars().count() > self.config.min_chunk_length_to_embed {
                chunks.push(tail.to_string());
            }
        }

        chunks
    }

    /// Decode as many leading tokens as form valid UTF-8
    fn decode_prefix(&self, tokens: &[u32]) -> (String, usize) {
        let floor = tokens.len().saturating_sub(MAX_TRAILING_TRIM).max(1);
        let mut end = tokens.len();

        while end >= floor {
            if let Ok(text) = self.bpe.decode(tokens[..end].to_vec()) {
                return (text, end);
            }
            end -= 1;
        }

        tracing::debug!(tokens = tokens.len(), "Skipping undecodable token window");
        (String::new(), tokens.len())
    }

    fn cut_at_boundary<'t>(&self, text: &'t str) -> &'t str {
        let Some(index) = text.rfind(SENTENCE_BOUNDARIES) else {
            return text;
        };

        if text[..index].chars().count() > self.config.min_chunk_size_chars {
            &text[..index + 1]
        } else {
            text
        }
    }

    fn finish_chunk(&self, text: &str) -> String {
        if self.config.keep_separator {
            text.trim().to_string()
        } else {
            text.replace('\n', " ").trim().to_string()
        }
    }
}
