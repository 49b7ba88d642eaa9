//! The tiktoken-compatible byte-pair encoder/decoder.

use crate::merge::byte_pair_encode;
use crate::{Error, TokenId, MAX_INPUT_SIZE, MAX_OUTPUT_TOKENS};
use fancy_regex::Regex;
use std::collections::{HashMap, HashSet};

/// Extension points a specialization (CLIP) hooks into around the plain
/// tiktoken encode/decode pipeline, per the "dynamic subclass hooks" design
/// note: expressed here as a trait over a zero-sized marker rather than
/// inheritance.
pub trait CodecHooks: Send + Sync {
    /// Runs before pre-tokenization; may rewrite the input text.
    fn before_encode(&self, text: &str) -> String {
        text.to_string()
    }

    /// Runs after the raw token id sequence has been produced.
    fn after_encode(&self, ids: Vec<TokenId>) -> Vec<TokenId> {
        ids
    }

    /// Runs before decoding; may drop or rewrite ids.
    fn before_decode(&self, ids: &[TokenId]) -> Vec<TokenId> {
        ids.to_vec()
    }

    /// Splits `text` into the byte fragments handed to the merge engine,
    /// bypassing the encoding's own pre-tokenization regex entirely.
    /// Returning `None` (the default) falls back to the ordinary
    /// regex-based pre-tokenization. A hook that needs to bake extra bytes
    /// into each fragment (CLIP's trailing-space `</w>` marker, for
    /// instance) must do so here rather than by re-running a regex over
    /// already-modified text, since the pre-tokenization pattern may not
    /// match the bytes it appended.
    fn pretokenize(&self, _text: &str) -> Option<Vec<Vec<u8>>> {
        None
    }
}

/// The hook set used by plain tiktoken encodings: every hook is a no-op.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainHooks;

impl CodecHooks for PlainHooks {}

/// A byte-pair encoding: rank tables, special tokens, and the
/// pre-tokenization pattern, optionally specialized via `H`.
pub struct BpeEncoding<H: CodecHooks = PlainHooks> {
    encoder: HashMap<Vec<u8>, TokenId>,
    decoder: HashMap<TokenId, Vec<u8>>,
    special_tokens_encoder: HashMap<String, TokenId>,
    special_tokens_decoder: HashMap<TokenId, String>,
    regex: Regex,
    special_regex: Regex,
    pub(crate) hooks: H,
}

impl<H: CodecHooks> BpeEncoding<H> {
    /// Builds an encoding from a byte-rank table, a pre-tokenization
    /// pattern, and a special-token table. Returns
    /// [`Error::MalformedVocabulary`] if any rank is shared between the
    /// regular and special tables.
    pub fn new(
        encoder: HashMap<Vec<u8>, TokenId>,
        pattern: &str,
        special_tokens: HashMap<String, TokenId>,
        hooks: H,
    ) -> Result<Self, Error> {
        let decoder: HashMap<TokenId, Vec<u8>> =
            encoder.iter().map(|(k, &v)| (v, k.clone())).collect();
        if decoder.len() != encoder.len() {
            return Err(Error::MalformedVocabulary(
                "duplicate rank in regular vocabulary".into(),
            ));
        }

        let special_tokens_decoder: HashMap<TokenId, String> = special_tokens
            .iter()
            .map(|(k, &v)| (v, k.clone()))
            .collect();

        for rank in special_tokens.values() {
            if decoder.contains_key(rank) {
                return Err(Error::MalformedVocabulary(format!(
                    "rank {rank} used by both regular and special vocabularies"
                )));
            }
        }

        let regex = crate::patterns::compile(pattern)?;
        let special_pattern = if special_tokens.is_empty() {
            // Never matches: an alternation with no branches.
            r"\A(?!)".to_string()
        } else {
            special_tokens
                .keys()
                .map(|s| escape_literal(s))
                .collect::<Vec<_>>()
                .join("|")
        };
        let special_regex = crate::patterns::compile(&special_pattern)?;

        tracing::debug!(
            vocab_size = encoder.len(),
            special_tokens = special_tokens.len(),
            "constructed BpeEncoding"
        );

        Ok(Self {
            encoder,
            decoder,
            special_tokens_encoder: special_tokens,
            special_tokens_decoder,
            regex,
            special_regex,
            hooks,
        })
    }

    pub fn special_tokens(&self) -> HashSet<&str> {
        self.special_tokens_encoder.keys().map(|s| s.as_str()).collect()
    }

    pub fn vocab_size(&self) -> usize {
        self.encoder.len() + self.special_tokens_encoder.len()
    }

    /// Encodes `text`, scanning for special-token literals but only
    /// accepting a match if its literal is present in `allowed_special`;
    /// rejected matches are skipped one character at a time and re-scanned.
    pub fn encode(&self, text: &str, allowed_special: &HashSet<&str>) -> Result<Vec<TokenId>, Error> {
        if text.len() > MAX_INPUT_SIZE {
            return Err(Error::InputTooLarge(text.len()));
        }
        let text = self.hooks.before_encode(text);
        let mut ids = Vec::new();
        let mut start = 0usize;

        loop {
            let next_special = self.find_next_allowed_special(&text, start, allowed_special);
            let end = next_special.map(|(s, _)| s).unwrap_or(text.len());
            self.encode_ordinary_into(&text[start..end], &mut ids)?;

            match next_special {
                Some((s, e)) => {
                    let literal = &text[s..e];
                    ids.push(self.special_tokens_encoder[literal]);
                    start = e;
                }
                None => break,
            }
            if ids.len() > MAX_OUTPUT_TOKENS {
                return Err(Error::OutputTooLarge);
            }
        }

        if ids.len() > MAX_OUTPUT_TOKENS {
            return Err(Error::OutputTooLarge);
        }
        Ok(self.hooks.after_encode(ids))
    }

    /// Encodes `text` allowing every registered special token.
    pub fn encode_with_special_tokens(&self, text: &str) -> Result<Vec<TokenId>, Error> {
        let allowed: HashSet<&str> = self.special_tokens_encoder.keys().map(|s| s.as_str()).collect();
        self.encode(text, &allowed)
    }

    /// Encodes `text` treating every special-token literal as ordinary text
    /// (tokenized byte-wise, never matched as a special).
    pub fn encode_ordinary(&self, text: &str) -> Vec<TokenId> {
        let text = self.hooks.before_encode(text);
        let mut ids = Vec::new();
        self.encode_ordinary_into(&text, &mut ids)
            .expect("fancy-regex compiled at construction time never fails to iterate");
        self.hooks.after_encode(ids)
    }

    fn encode_ordinary_into(&self, text: &str, out: &mut Vec<TokenId>) -> Result<(), Error> {
        if let Some(fragments) = self.hooks.pretokenize(text) {
            for fragment in fragments {
                if let Some(&rank) = self.encoder.get(&fragment) {
                    out.push(rank);
                } else {
                    out.extend(byte_pair_encode(&fragment, &self.encoder));
                }
            }
            return Ok(());
        }
        for m in self.regex.find_iter(text) {
            let m = m.map_err(|e| Error::MalformedPattern(e.to_string()))?;
            let fragment = m.as_str().as_bytes();
            if let Some(&rank) = self.encoder.get(fragment) {
                out.push(rank);
            } else {
                out.extend(byte_pair_encode(fragment, &self.encoder));
            }
        }
        Ok(())
    }

    /// Finds the next special-token match at or after `start` whose literal
    /// is in `allowed_special`, skipping over (and past) rejected matches.
    fn find_next_allowed_special(
        &self,
        text: &str,
        start: usize,
        allowed_special: &HashSet<&str>,
    ) -> Option<(usize, usize)> {
        let mut search_from = start;
        loop {
            if search_from > text.len() {
                return None;
            }
            let m = self.special_regex.find_from_pos(text, search_from).ok().flatten()?;
            let literal = m.as_str();
            if allowed_special.contains(literal) {
                return Some((m.start(), m.end()));
            }
            // Rejected: advance one char past the match start and rescan.
            let next_char_boundary = text[m.start()..]
                .char_indices()
                .nth(1)
                .map(|(i, _)| m.start() + i)
                .unwrap_or(text.len());
            if next_char_boundary <= search_from {
                return None;
            }
            search_from = next_char_boundary;
        }
    }

    /// Decodes a token id sequence back to a `String`, lossily substituting
    /// the Unicode replacement character for any invalid UTF-8 byte
    /// sequences produced by splitting a multi-byte character across a
    /// token boundary.
    pub fn decode(&self, ids: &[TokenId]) -> Result<String, Error> {
        let bytes = self.decode_bytes(ids)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn decode_bytes(&self, ids: &[TokenId]) -> Result<Vec<u8>, Error> {
        let ids = self.hooks.before_decode(ids);
        let mut out = Vec::new();
        for id in ids {
            if let Some(bytes) = self.decoder.get(&id) {
                out.extend_from_slice(bytes);
            } else if let Some(s) = self.special_tokens_decoder.get(&id) {
                out.extend_from_slice(s.as_bytes());
            } else {
                return Err(Error::UnknownToken(id));
            }
        }
        Ok(out)
    }
}

/// Escapes a literal string for safe inclusion as one alternation branch in
/// a `fancy_regex` pattern.
fn escape_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
