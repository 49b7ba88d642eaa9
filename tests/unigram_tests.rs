//! Integration tests for the Unigram Viterbi segmenter, against a small
//! hand-encoded `ModelProto` payload (no real SentencePiece model file is
//! available in this environment).

use toksmith::Unigram;

fn encode_varint(mut v: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if v == 0 {
            break;
        }
    }
    out
}

fn encode_tag(field: u32, wire_type: u8) -> Vec<u8> {
    encode_varint(((field as u64) << 3) | wire_type as u64)
}

fn encode_piece(text: &str, score: f32, kind: i64) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(encode_tag(1, 2));
    out.extend(encode_varint(text.len() as u64));
    out.extend(text.as_bytes());
    out.extend(encode_tag(2, 5));
    out.extend(score.to_bits().to_le_bytes());
    out.extend(encode_tag(3, 0));
    out.extend(encode_varint(kind as u64));
    out
}

fn push_piece_field(buf: &mut Vec<u8>, text: &str, score: f32, kind: i64) {
    let p = encode_piece(text, score, kind);
    buf.extend(encode_tag(1, 2));
    buf.extend(encode_varint(p.len() as u64));
    buf.extend(p);
}

/// Builds a toy model: byte-fallback pieces for every byte (ids 3..259,
/// after unk/bos/eos), plus whole-word pieces for "hello" and "world"
/// (with and without a leading meta-symbol) that score far better than any
/// byte-fallback path.
fn toy_model_bytes() -> Vec<u8> {
    let mut buf = Vec::new();
    push_piece_field(&mut buf, "<unk>", 0.0, 2);
    push_piece_field(&mut buf, "<s>", 0.0, 3);
    push_piece_field(&mut buf, "</s>", 0.0, 3);
    for b in 0u8..=255 {
        push_piece_field(&mut buf, &format!("<0x{b:02X}>"), -10.0, 6);
    }
    push_piece_field(&mut buf, "\u{2581}hello", -1.0, 1);
    push_piece_field(&mut buf, "\u{2581}world", -1.0, 1);
    push_piece_field(&mut buf, "\u{2581}", -0.1, 1);
    push_piece_field(&mut buf, "hello", -2.0, 1);
    push_piece_field(&mut buf, "world", -2.0, 1);
    buf
}

#[test]
fn segments_known_words_without_byte_fallback() {
    let model = Unigram::from_binary(&toy_model_bytes()).unwrap();
    let ids = model.encode("hello world");
    assert_eq!(model.decode(&ids).unwrap(), "hello world");
    assert!(ids.iter().all(|&id| !(3..259).contains(&id)));
}

#[test]
fn byte_fallback_engages_for_unmodeled_codepoints() {
    let model = Unigram::from_binary(&toy_model_bytes()).unwrap();
    let ids = model.encode("\u{4e2d}\u{6587}");
    assert!(ids.iter().all(|&id| (3..259).contains(&id)));
    assert_eq!(model.decode(&ids).unwrap(), "\u{4e2d}\u{6587}");
}

#[test]
fn mixed_known_and_unknown_text_round_trips() {
    let model = Unigram::from_binary(&toy_model_bytes()).unwrap();
    let ids = model.encode("hello \u{4e2d} world");
    assert_eq!(model.decode(&ids).unwrap(), "hello \u{4e2d} world");
}

#[test]
fn special_ids_resolve_to_defaults_when_trainer_spec_is_absent() {
    let model = Unigram::from_binary(&toy_model_bytes()).unwrap();
    assert_eq!(model.unk_token(), 0);
    assert_eq!(model.bos_token(), 1);
    assert_eq!(model.eos_token(), 2);
}

#[test]
fn empty_text_yields_no_tokens() {
    let model = Unigram::from_binary(&toy_model_bytes()).unwrap();
    assert!(model.encode("").is_empty());
}
