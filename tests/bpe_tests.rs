//! Integration tests for the tiktoken-compatible BPE encoder, built on
//! small in-memory vocabularies (the real OpenAI-hosted rank files are not
//! available in this environment, so these check the algorithmic
//! invariants rather than reproducing a specific published encoding).

use base64::Engine;
use std::collections::HashMap;
use toksmith::{get_bpe, StaticFetcher};

const R50K_URL: &str = "https://openaipublic.blob.core.windows.net/encodings/r50k_base.tiktoken";

fn byte_identity_tiktoken_file() -> Vec<u8> {
    let mut out = String::new();
    for b in 0u8..=255 {
        let encoded = base64::engine::general_purpose::STANDARD.encode([b]);
        out.push_str(&format!("{encoded} {b}\n"));
    }
    out.into_bytes()
}

#[test]
fn round_trip_holds_for_plain_text_without_special_tokens() {
    let fetcher = StaticFetcher::new().with_source(R50K_URL, byte_identity_tiktoken_file());
    let enc = get_bpe("r50k_base", &fetcher).unwrap();

    for text in ["hello world", "The quick brown fox.", "", "a\nb\tc"] {
        let ids = enc.encode_ordinary(text);
        assert_eq!(enc.decode(&ids).unwrap(), text, "round trip failed for {text:?}");
    }
}

#[test]
fn special_token_literal_is_tokenized_byte_wise_when_not_allowed() {
    let fetcher = StaticFetcher::new().with_source(R50K_URL, byte_identity_tiktoken_file());
    let enc = get_bpe("r50k_base", &fetcher).unwrap();

    let ids = enc.encode_ordinary("<|endoftext|>");
    assert!(!ids.contains(&50256));
    assert_eq!(enc.decode(&ids).unwrap(), "<|endoftext|>");
}

#[test]
fn special_token_is_emitted_once_allowed() {
    let fetcher = StaticFetcher::new().with_source(R50K_URL, byte_identity_tiktoken_file());
    let enc = get_bpe("r50k_base", &fetcher).unwrap();

    let mut allowed = std::collections::HashSet::new();
    allowed.insert("<|endoftext|>");
    let ids = enc.encode("before <|endoftext|> after", &allowed).unwrap();
    assert!(ids.contains(&50256));
    assert_eq!(enc.decode(&ids).unwrap(), "before <|endoftext|> after");
}

#[test]
fn unknown_encoding_name_is_rejected() {
    let fetcher = StaticFetcher::new();
    assert!(get_bpe("made_up_encoding", &fetcher).is_err());
}

#[test]
fn merge_engine_prefers_leftmost_pair_on_equal_rank() {
    // Custom vocabulary: "ab" and "bc" share a rank; "abc" is absent. The
    // leftmost pair must win, producing ["ab", "c"] rather than ["a", "bc"].
    let mut encoder: HashMap<Vec<u8>, u32> = HashMap::new();
    for (i, b) in (b'a'..=b'c').enumerate() {
        encoder.insert(vec![b], i as u32);
    }
    encoder.insert(b"ab".to_vec(), 10);
    encoder.insert(b"bc".to_vec(), 10);
    let special = HashMap::new();
    let enc = toksmith::BpeEncoding::new(
        encoder,
        r"[a-z]+",
        special,
        toksmith::PlainHooks,
    )
    .unwrap();
    let ids = enc.encode_ordinary("abc");
    assert_eq!(ids, vec![10, 2]); // "ab" then "c"
}

#[test]
fn encode_batch_matches_sequential_encode() {
    use rayon::prelude::*;
    let fetcher = StaticFetcher::new().with_source(R50K_URL, byte_identity_tiktoken_file());
    let enc = get_bpe("r50k_base", &fetcher).unwrap();
    let texts = ["alpha", "beta gamma", "", "delta epsilon zeta"];

    let sequential: Vec<Vec<u32>> = texts.iter().map(|t| enc.encode_ordinary(t)).collect();
    let batched: Vec<Vec<u32>> = texts.par_iter().map(|t| enc.encode_ordinary(t)).collect();
    assert_eq!(sequential, batched);
}
