//! Vocabulary loaders: the tiktoken `.tiktoken` rank-file format, the
//! `open_clip` gzip merge-rule format, and the named-encoding registry
//! (`get_bpe`) that resolves a well-known encoding name to a pattern,
//! special-token table, and source URL.

use crate::bpe::{BpeEncoding, PlainHooks};
use crate::clip::{new_clip_encoding, ClipEncoding};
use crate::fetcher::VocabFetcher;
use crate::{patterns, Error, TokenId};
use base64::Engine;
use std::collections::HashMap;
use std::io::Read;

const MAX_VOCAB_FILE_SIZE: usize = 64 * 1024 * 1024;
const OPEN_CLIP_MERGE_LINES: usize = 48_894;

/// Parses a tiktoken-format file: one `base64(bytes) SPACE decimal_rank`
/// record per non-empty line.
pub fn load_tiktoken_bytes(bytes: &[u8]) -> Result<HashMap<Vec<u8>, TokenId>, Error> {
    if bytes.len() > MAX_VOCAB_FILE_SIZE {
        return Err(Error::MalformedVocabulary(format!(
            "tiktoken file of {} bytes exceeds MAX_VOCAB_FILE_SIZE",
            bytes.len()
        )));
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::MalformedVocabulary(format!("not valid UTF-8: {e}")))?;

    let mut encoder = HashMap::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let (b64, rank_str) = line
            .rsplit_once(' ')
            .ok_or_else(|| Error::MalformedVocabulary(format!("malformed line: {line:?}")))?;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| Error::MalformedVocabulary(format!("bad base64 in {line:?}: {e}")))?;
        let rank: TokenId = rank_str
            .parse()
            .map_err(|e| Error::MalformedVocabulary(format!("bad rank in {line:?}: {e}")))?;
        if encoder.insert(decoded, rank).is_some() {
            return Err(Error::MalformedVocabulary(format!(
                "duplicate byte sequence at rank {rank}"
            )));
        }
    }
    tracing::debug!(entries = encoder.len(), "loaded tiktoken vocabulary");
    Ok(encoder)
}

/// Parses an `open_clip`-format gzip payload into a byte-rank encoder,
/// following the construction described for the CLIP vocabulary: 512 seed
/// entries from the GPT-2 byte remapping (plain + space-suffixed forms),
/// followed by the merge-rule lines in rank order.
pub fn load_open_clip_bytes(gz_bytes: &[u8]) -> Result<HashMap<Vec<u8>, TokenId>, Error> {
    if gz_bytes.len() > MAX_VOCAB_FILE_SIZE {
        return Err(Error::MalformedVocabulary(format!(
            "open_clip file of {} bytes exceeds MAX_VOCAB_FILE_SIZE",
            gz_bytes.len()
        )));
    }
    let mut decoder = flate2::read::GzDecoder::new(gz_bytes);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|e| Error::MalformedVocabulary(format!("gzip decompression failed: {e}")))?;

    let mut lines = text.lines();
    lines.next(); // header line

    let byte_to_unicode = crate::byte_utils::bytes_to_unicode();
    let unicode_to_byte = crate::byte_utils::unicode_to_bytes();
    let rank_to_byte = crate::byte_utils::printable_bytes()
        .into_iter()
        .chain((0u8..=255).filter(|b| !crate::byte_utils::printable_bytes().contains(b)))
        .collect::<Vec<u8>>();

    let mut encoder: HashMap<Vec<u8>, TokenId> = HashMap::new();
    let space_char = byte_to_unicode[&b' '];

    for &b in &rank_to_byte {
        let c = byte_to_unicode[&b];
        encoder.insert(vec![b], encoder.len() as TokenId);
        let _ = c;
    }
    for &b in &rank_to_byte {
        // Space-suffixed ("</w>"-equivalent) variant: byte followed by a
        // literal space byte, ranked 256 positions after its plain form.
        let key = vec![b, b' '];
        let rank = 256 + rank_to_byte.iter().position(|&x| x == b).unwrap() as TokenId;
        encoder.insert(key, rank);
    }

    let mut count = 0usize;
    for line in lines {
        if count >= OPEN_CLIP_MERGE_LINES {
            break;
        }
        if line.is_empty() {
            continue;
        }
        let (first, second) = line
            .split_once(' ')
            .ok_or_else(|| Error::MalformedVocabulary(format!("malformed merge line: {line:?}")))?;
        let decoded_first = decode_unicode_word(first, unicode_to_byte, space_char)?;
        let decoded_second = decode_unicode_word(second, unicode_to_byte, space_char)?;
        let mut combined = decoded_first;
        combined.extend(decoded_second);
        let next_rank = encoder.len() as TokenId;
        encoder.insert(combined, next_rank);
        count += 1;
    }

    tracing::debug!(entries = encoder.len(), merge_lines = count, "loaded open_clip vocabulary");
    Ok(encoder)
}

/// Decodes one whitespace-delimited "word" of an open_clip merge-rule line
/// back into raw bytes, rewriting the literal `</w>` end-of-word marker to
/// the space byte it represents.
fn decode_unicode_word(
    word: &str,
    unicode_to_byte: &HashMap<char, u8>,
    space_char: char,
) -> Result<Vec<u8>, Error> {
    let word = word.replace("</w>", &space_char.to_string());
    word.chars()
        .map(|c| {
            unicode_to_byte
                .get(&c)
                .copied()
                .ok_or_else(|| Error::MalformedVocabulary(format!("unmapped code point {c:?}")))
        })
        .collect()
}

struct EncodingSpec {
    pattern: &'static str,
    special_tokens: &'static [(&'static str, TokenId)],
    url: &'static str,
}

fn registry(name: &str) -> Option<EncodingSpec> {
    match name {
        "r50k_base" => Some(EncodingSpec {
            pattern: patterns::R50K_PATTERN,
            special_tokens: &[("<|endoftext|>", 50256)],
            url: "https://openaipublic.blob.core.windows.net/encodings/r50k_base.tiktoken",
        }),
        "p50k_base" => Some(EncodingSpec {
            pattern: patterns::R50K_PATTERN,
            special_tokens: &[("<|endoftext|>", 50256)],
            url: "https://openaipublic.blob.core.windows.net/encodings/p50k_base.tiktoken",
        }),
        "p50k_edit" => Some(EncodingSpec {
            pattern: patterns::R50K_PATTERN,
            special_tokens: &[
                ("<|endoftext|>", 50256),
                ("<|fim_prefix|>", 50281),
                ("<|fim_middle|>", 50282),
                ("<|fim_suffix|>", 50283),
            ],
            url: "https://openaipublic.blob.core.windows.net/encodings/p50k_base.tiktoken",
        }),
        "cl100k_base" => Some(EncodingSpec {
            pattern: patterns::CL100K_PATTERN,
            special_tokens: &[
                ("<|endoftext|>", 100257),
                ("<|fim_prefix|>", 100258),
                ("<|fim_middle|>", 100259),
                ("<|fim_suffix|>", 100260),
                ("<|endofprompt|>", 100276),
            ],
            url: "https://openaipublic.blob.core.windows.net/encodings/cl100k_base.tiktoken",
        }),
        "o200k_base" => Some(EncodingSpec {
            pattern: patterns::O200K_PATTERN,
            special_tokens: &[("<|endoftext|>", 199999), ("<|endofprompt|>", 200018)],
            url: "https://openaipublic.blob.core.windows.net/encodings/o200k_base.tiktoken",
        }),
        // The harmony response format's named control tokens
        // (200002..200012, minus the gaps which are unnamed reserved
        // fillers with no literal to match against — see DESIGN.md).
        "o200k_harmony" => Some(EncodingSpec {
            pattern: patterns::O200K_PATTERN,
            special_tokens: &[
                ("<|startoftext|>", 199998),
                ("<|endoftext|>", 199999),
                ("<|return|>", 200002),
                ("<|constrain|>", 200003),
                ("<|channel|>", 200005),
                ("<|start|>", 200006),
                ("<|end|>", 200007),
                ("<|message|>", 200008),
                ("<|call|>", 200012),
            ],
            url: "https://openaipublic.blob.core.windows.net/encodings/o200k_harmony.tiktoken",
        }),
        _ => None,
    }
}

/// Resolves a named tiktoken-compatible encoding, fetching its rank table
/// through `fetcher`. `name` must be one of `r50k_base`, `p50k_base`,
/// `p50k_edit`, `cl100k_base`, `o200k_base`, or `o200k_harmony`; CLIP is
/// constructed via [`get_clip_bpe`] instead, since its framing behavior
/// makes it a distinct Rust type ([`ClipEncoding`]) rather than a same-typed
/// member of this registry.
pub fn get_bpe(name: &str, fetcher: &dyn VocabFetcher) -> Result<BpeEncoding<PlainHooks>, Error> {
    let spec = registry(name).ok_or_else(|| Error::UnknownEncodingName(name.to_string()))?;
    let bytes = fetcher.fetch(spec.url)?;
    let encoder = load_tiktoken_bytes(&bytes)?;
    let special_tokens: HashMap<String, TokenId> = spec
        .special_tokens
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();
    BpeEncoding::new(encoder, spec.pattern, special_tokens, PlainHooks)
}

/// Resolves the CLIP text-encoder vocabulary from its `open_clip`
/// gzip merge-rule source, fetched through `fetcher`.
pub fn get_clip_bpe(url: &str, fetcher: &dyn VocabFetcher) -> Result<ClipEncoding, Error> {
    let bytes = fetcher.fetch(url)?;
    let encoder = load_open_clip_bytes(&bytes)?;
    let vocab_len = encoder.len() as TokenId;
    new_clip_encoding(encoder, vocab_len, vocab_len + 1)
}

pub fn list_encoding_names() -> &'static [&'static str] {
    &[
        "r50k_base",
        "p50k_base",
        "p50k_edit",
        "cl100k_base",
        "o200k_base",
        "o200k_harmony",
    ]
}
