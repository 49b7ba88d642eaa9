//! `toksmith` — a tiktoken-compatible byte-pair encoder, a CLIP text-encoder
//! specialization, and a SentencePiece-compatible Unigram (Viterbi) tokenizer.
//!
//! # Example
//!
//! ```no_run
//! use toksmith::{get_bpe, StaticFetcher};
//!
//! let fetcher = StaticFetcher::new();
//! let enc = get_bpe("cl100k_base", &fetcher).unwrap();
//! let ids = enc.encode_ordinary("Hello, world!");
//! assert_eq!(enc.decode(&ids).unwrap(), "Hello, world!");
//! ```

pub mod byte_utils;
pub mod clip;
pub mod fetcher;
pub mod invariants;
pub mod merge;
pub mod normalizer;
pub mod patterns;
pub mod spm_proto;
pub mod trie;
pub mod unigram;
pub mod vocab;

mod bpe;

pub use bpe::{BpeEncoding, CodecHooks, PlainHooks};
pub use clip::{ClipEncoding, ClipHooks};
pub use fetcher::{StaticFetcher, VocabFetcher};
pub use unigram::Unigram;
pub use vocab::get_bpe;

/// Token identifier shared by every encoding in this crate.
pub type TokenId = u32;

/// Upper bound on input text accepted by any `encode` entry point.
///
/// Mirrors the defensive sizing discipline used at every boundary reader in
/// this crate (the tiktoken loader, the open_clip loader, the SentencePiece
/// protobuf reader): reject absurd inputs before they drive unbounded work.
pub const MAX_INPUT_SIZE: usize = 10 * 1024 * 1024;

/// Upper bound on the number of tokens a single `encode` call may emit.
pub const MAX_OUTPUT_TOKENS: usize = 1_000_000;

/// Fixed context length of the CLIP text encoder.
pub const CLIP_CONTEXT_LENGTH: usize = 77;

/// Errors produced anywhere in this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown encoding name: {0}")]
    UnknownEncodingName(String),

    #[error("malformed vocabulary: {0}")]
    MalformedVocabulary(String),

    #[error("malformed pre-tokenization pattern: {0}")]
    MalformedPattern(String),

    #[error("unknown token id during decode: {0}")]
    UnknownToken(TokenId),

    #[error("input text of {0} bytes exceeds MAX_INPUT_SIZE ({MAX_INPUT_SIZE})")]
    InputTooLarge(usize),

    #[error("encode would produce more than MAX_OUTPUT_TOKENS ({MAX_OUTPUT_TOKENS}) tokens")]
    OutputTooLarge,

    #[error("malformed SentencePiece model: {0}")]
    MalformedModel(String),

    #[error("fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
