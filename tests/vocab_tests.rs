//! Integration tests for the vocabulary loaders.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use toksmith::fetcher::StaticFetcher;
use toksmith::vocab::{get_clip_bpe, load_open_clip_bytes};

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

/// Builds a minimal open_clip-shaped payload: a header line followed by one
/// merge-rule line combining two of the GPT-2 byte-remapped single-byte
/// tokens.
fn toy_open_clip_payload() -> Vec<u8> {
    let byte_to_unicode = toksmith::byte_utils::bytes_to_unicode();
    let a = byte_to_unicode[&b'a'];
    let b = byte_to_unicode[&b'b'];
    let text = format!("#header comment\n{a} {b}\n");
    gzip(text.as_bytes())
}

#[test]
fn open_clip_loader_produces_512_seed_entries_plus_merges() {
    let bytes = toy_open_clip_payload();
    let encoder = load_open_clip_bytes(&bytes).unwrap();
    // 512 seed entries (256 plain + 256 space-suffixed) plus one merge.
    assert_eq!(encoder.len(), 513);
    assert!(encoder.contains_key(&vec![b'a']));
    assert!(encoder.contains_key(&vec![b'a', b'b']));
}

#[test]
fn get_clip_bpe_builds_a_working_encoding() {
    let bytes = toy_open_clip_payload();
    let fetcher = StaticFetcher::new().with_source("mem://open_clip.gz", bytes);
    let enc = get_clip_bpe("mem://open_clip.gz", &fetcher).unwrap();
    let ids = enc.encode_with_special_tokens("a").unwrap();
    assert_eq!(ids.len(), toksmith::CLIP_CONTEXT_LENGTH);
}
