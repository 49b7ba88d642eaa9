//! The CLIP text-encoder specialization: lowercase + whitespace
//! normalization, `</w>` end-of-word framing via the open_clip vocabulary's
//! space-suffixed pieces, and fixed-length 77 BOS/EOS/PAD framing.

use crate::bpe::{BpeEncoding, CodecHooks};
use crate::{TokenId, CLIP_CONTEXT_LENGTH};
use std::collections::HashMap;

/// Hook set implementing CLIP's normalization and fixed-length framing atop
/// the shared [`BpeEncoding`] pipeline.
pub struct ClipHooks {
    pub(crate) bos: TokenId,
    pub(crate) eos: TokenId,
    pad: TokenId,
}

impl CodecHooks for ClipHooks {
    fn before_encode(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        collapse_ascii_whitespace(&lowered)
    }

    fn after_encode(&self, mut ids: Vec<TokenId>) -> Vec<TokenId> {
        ids.truncate(CLIP_CONTEXT_LENGTH - 2);
        let mut framed = Vec::with_capacity(CLIP_CONTEXT_LENGTH);
        framed.push(self.bos);
        framed.extend(ids);
        framed.push(self.eos);
        framed.resize(CLIP_CONTEXT_LENGTH, self.pad);
        framed
    }

    fn before_decode(&self, ids: &[TokenId]) -> Vec<TokenId> {
        ids.iter().copied().filter(|&id| id != self.pad).collect()
    }

    // CLIP_PATTERN matches no whitespace, so a trailing space baked into a
    // match's text would fall in an unmatched region if the normal
    // regex-over-text pipeline ran a second time on space-augmented input.
    // Splitting here and appending the `</w>` space directly to each
    // fragment's bytes avoids ever re-matching the augmented text.
    fn pretokenize(&self, text: &str) -> Option<Vec<Vec<u8>>> {
        let pattern = crate::patterns::compile(crate::patterns::CLIP_PATTERN)
            .expect("CLIP_PATTERN is a fixed, valid literal");
        let mut fragments = Vec::new();
        for m in pattern.find_iter(text) {
            let Ok(m) = m else { continue };
            let mut bytes = m.as_str().as_bytes().to_vec();
            bytes.push(b' ');
            fragments.push(bytes);
        }
        Some(fragments)
    }
}

fn collapse_ascii_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// A [`BpeEncoding`] specialized for the CLIP text encoder: always emits
/// exactly [`CLIP_CONTEXT_LENGTH`] token ids, framed with BOS/EOS and
/// zero-padded.
pub type ClipEncoding = BpeEncoding<ClipHooks>;

/// Builds a [`ClipEncoding`] from an open_clip-format byte-rank table.
/// `bos`/`eos` are conventionally `vocab_len` and `vocab_len + 1`.
pub fn new_clip_encoding(
    encoder: HashMap<Vec<u8>, TokenId>,
    bos: TokenId,
    eos: TokenId,
) -> Result<ClipEncoding, crate::Error> {
    let mut special = HashMap::new();
    special.insert("<|startoftext|>".to_string(), bos);
    special.insert("<|endoftext|>".to_string(), eos);
    let hooks = ClipHooks { bos, eos, pad: 0 };
    BpeEncoding::new(encoder, crate::patterns::CLIP_PATTERN, special, hooks)
}
