//! Pre-tokenization regex patterns, one per named encoding family.
//!
//! Every pattern below contains a trailing-space-preserving negative
//! lookahead (`\s+(?!\S)`) that a pure finite-automaton engine (the `regex`
//! crate) cannot express, so this crate compiles all of them through
//! `fancy-regex`. These pattern strings are literals taken directly from the
//! reference tokenizers; they are not generated and must not be edited for
//! style.

/// Used by `r50k_base`, `p50k_base`, and `p50k_edit`.
pub const R50K_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Used by `cl100k_base`.
pub const CL100K_PATTERN: &str = r"(?i:'s|'t|'re|'ve|'m|'ll|'d)|[^\r\n\p{L}\p{N}]?\p{L}+|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// Used by `o200k_base` and `o200k_harmony`.
pub const O200K_PATTERN: &str = r"[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]*[\p{Ll}\p{Lm}\p{Lo}\p{M}]+(?i:'s|'t|'re|'ve|'m|'ll|'d)?|[^\r\n\p{L}\p{N}]?[\p{Lu}\p{Lt}\p{Lm}\p{Lo}\p{M}]+[\p{Ll}\p{Lm}\p{Lo}\p{M}]*(?i:'s|'t|'re|'ve|'m|'ll|'d)?|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n/]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// Used by the CLIP text encoder (lowercase-only: normalization lowercases
/// the input before this pattern ever runs, per `clip::before_encode`).
pub const CLIP_PATTERN: &str = r"'s|'t|'re|'ve|'m|'ll|'d|[\p{L}]+|[\p{N}]|[^\s\p{L}\p{N}]+";

/// Compiles a pattern string, wrapping a syntax error as
/// [`crate::Error::MalformedPattern`].
pub fn compile(pattern: &str) -> Result<fancy_regex::Regex, crate::Error> {
    fancy_regex::Regex::new(pattern)
        .map_err(|e| crate::Error::MalformedPattern(format!("{pattern}: {e}")))
}
