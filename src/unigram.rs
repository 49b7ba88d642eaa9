//! SentencePiece-compatible Unigram language-model tokenization via Viterbi
//! segmentation, with byte-fallback for code points unreachable by any
//! vocabulary piece.

use crate::byte_utils::{format_byte_fallback_piece, parse_byte_fallback_piece};
use crate::fetcher::VocabFetcher;
use crate::normalizer::{self, NormalizerSpec};
use crate::spm_proto::{ModelProto, PieceType};
use crate::trie::Trie;
use crate::{Error, TokenId};
use std::collections::HashMap;

struct Piece {
    text: String,
    score: f32,
    kind: PieceType,
}

/// A SentencePiece Unigram model: vocabulary, trie, byte-fallback table,
/// and the normalizer settings the model was trained with.
pub struct Unigram {
    pieces: Vec<Piece>,
    trie: Trie,
    /// Maps a raw byte to the token id of its `<0xHH>` byte-fallback piece.
    byte_fallback: HashMap<u8, TokenId>,
    unk_id: TokenId,
    bos_id: TokenId,
    eos_id: TokenId,
    normalizer: NormalizerSpec,
}

impl Unigram {
    /// Loads a model from a SentencePiece `.model` protobuf file fetched
    /// from `url`.
    pub fn load_sentence_piece(url: &str, fetcher: &dyn VocabFetcher) -> Result<Self, Error> {
        let bytes = fetcher.fetch(url)?;
        Self::from_binary(&bytes)
    }

    /// Parses a model directly from an in-memory `ModelProto` payload.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, Error> {
        let proto = ModelProto::parse(bytes)?;

        let mut pieces = Vec::with_capacity(proto.pieces.len());
        let mut trie = Trie::new();
        let mut byte_fallback = HashMap::new();

        for (id, p) in proto.pieces.into_iter().enumerate() {
            let id = id as TokenId;
            match p.kind {
                PieceType::Normal | PieceType::UserDefined => {
                    trie.insert(&p.piece, id, p.score);
                }
                PieceType::Byte => {
                    if let Some(byte) = parse_byte_fallback_piece(&p.piece) {
                        byte_fallback.insert(byte, id);
                    }
                }
                PieceType::Unknown | PieceType::Control | PieceType::Unused => {}
            }
            pieces.push(Piece {
                text: p.piece,
                score: p.score,
                kind: p.kind,
            });
        }

        tracing::debug!(
            vocab_size = pieces.len(),
            byte_fallback_entries = byte_fallback.len(),
            "loaded Unigram model"
        );

        Ok(Self {
            pieces,
            trie,
            byte_fallback,
            unk_id: proto.unk_id,
            bos_id: proto.bos_id,
            eos_id: proto.eos_id,
            normalizer: proto.normalizer,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.pieces.len()
    }

    pub fn unk_token(&self) -> TokenId {
        self.unk_id
    }

    pub fn bos_token(&self) -> TokenId {
        self.bos_id
    }

    pub fn eos_token(&self) -> TokenId {
        self.eos_id
    }

    /// Segments `text` into the Viterbi-optimal (maximum total score)
    /// sequence of piece ids, falling back to per-byte `<0xHH>` tokens for
    /// any stretch no vocabulary piece reaches.
    pub fn encode(&self, text: &str) -> Vec<TokenId> {
        let normalized = normalizer::normalize(text, &self.normalizer);
        let chars: Vec<char> = normalized.chars().collect();
        let n = chars.len();
        if n == 0 {
            return Vec::new();
        }

        const NEG_INF: f32 = f32::NEG_INFINITY;
        let mut best = vec![NEG_INF; n + 1];
        best[0] = 0.0;
        // `prev[end] = (start, ids)`: the best way to reach `end`.
        let mut prev: Vec<Option<(usize, Vec<TokenId>)>> = vec![None; n + 1];

        for i in 0..n {
            if best[i] == NEG_INF {
                continue;
            }
            let mut reached_i_plus_1_by_vocab = false;
            for (end, id, score) in self.trie.find_pieces_at(&chars, i) {
                let candidate = best[i] + score;
                if candidate > best[end] {
                    best[end] = candidate;
                    prev[end] = Some((i, vec![id]));
                }
                if end == i + 1 {
                    reached_i_plus_1_by_vocab = true;
                }
            }
            if !reached_i_plus_1_by_vocab && prev[i + 1].is_none() {
                let byte_tokens = self.byte_fallback_for(chars[i]);
                best[i + 1] = best[i];
                prev[i + 1] = Some((i, byte_tokens));
            }
        }

        let mut ids = Vec::new();
        let mut pos = n;
        while pos > 0 {
            match prev[pos].take() {
                Some((start, mut chunk)) => {
                    chunk.reverse();
                    ids.extend(chunk);
                    pos = start;
                }
                None => {
                    // Defensive: a well-formed model with byte fallback
                    // never reaches this. Emit per-byte fallback for the
                    // single preceding code point and continue backtracking
                    // rather than producing a truncated token stream.
                    debug_assert!(false, "Viterbi backtrack reached an unset position");
                    let mut chunk = self.byte_fallback_for(chars[pos - 1]);
                    chunk.reverse();
                    ids.extend(chunk);
                    pos -= 1;
                }
            }
        }
        ids.reverse();
        ids
    }

    fn byte_fallback_for(&self, c: char) -> Vec<TokenId> {
        let mut buf = [0u8; 4];
        let encoded = c.encode_utf8(&mut buf);
        encoded
            .as_bytes()
            .iter()
            .map(|&b| self.byte_fallback.get(&b).copied().unwrap_or(self.unk_id))
            .collect()
    }

    /// Decodes a token id sequence back to text. Consecutive `<0xHH>`
    /// byte-fallback pieces are grouped into a maximal run and UTF-8
    /// decoded together, so multi-byte characters split across several
    /// fallback tokens are reassembled correctly.
    pub fn decode(&self, ids: &[TokenId]) -> Result<String, Error> {
        let mut out = String::new();
        let mut byte_run: Vec<u8> = Vec::new();

        let flush = |out: &mut String, byte_run: &mut Vec<u8>| {
            if !byte_run.is_empty() {
                out.push_str(&String::from_utf8_lossy(byte_run));
                byte_run.clear();
            }
        };

        for &id in ids {
            let piece = self
                .pieces
                .get(id as usize)
                .ok_or(Error::UnknownToken(id))?;
            if piece.kind == PieceType::Byte {
                if let Some(byte) = parse_byte_fallback_piece(&piece.text) {
                    byte_run.push(byte);
                    continue;
                }
            }
            flush(&mut out, &mut byte_run);
            out.push_str(&piece.text);
        }
        flush(&mut out, &mut byte_run);

        Ok(normalizer::denormalize(&out, &self.normalizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spm_proto::RawPiece;

    fn toy_model() -> Unigram {
        let mut pieces = vec![
            RawPiece { piece: "<unk>".into(), score: 0.0, kind: PieceType::Unknown },
            RawPiece { piece: "<s>".into(), score: 0.0, kind: PieceType::Control },
            RawPiece { piece: "</s>".into(), score: 0.0, kind: PieceType::Control },
        ];
        for b in 0u8..=255 {
            pieces.push(RawPiece {
                piece: format_byte_fallback_piece(b),
                score: -10.0,
                kind: PieceType::Byte,
            });
        }
        pieces.push(RawPiece { piece: "\u{2581}hello".into(), score: -1.0, kind: PieceType::Normal });
        pieces.push(RawPiece { piece: "\u{2581}world".into(), score: -1.0, kind: PieceType::Normal });
        pieces.push(RawPiece { piece: "\u{2581}".into(), score: -0.1, kind: PieceType::Normal });
        pieces.push(RawPiece { piece: "hello".into(), score: -2.0, kind: PieceType::Normal });
        pieces.push(RawPiece { piece: "world".into(), score: -2.0, kind: PieceType::Normal });

        let proto = ModelProto {
            pieces,
            unk_id: 0,
            bos_id: 1,
            eos_id: 2,
            normalizer: NormalizerSpec::default(),
        };
        Unigram::from_proto_for_test(proto)
    }

    impl Unigram {
        fn from_proto_for_test(proto: ModelProto) -> Self {
            let mut trie = Trie::new();
            let mut byte_fallback = HashMap::new();
            let mut pieces = Vec::with_capacity(proto.pieces.len());
            for (id, p) in proto.pieces.into_iter().enumerate() {
                let id = id as TokenId;
                match p.kind {
                    PieceType::Normal | PieceType::UserDefined => trie.insert(&p.piece, id, p.score),
                    PieceType::Byte => {
                        if let Some(b) = parse_byte_fallback_piece(&p.piece) {
                            byte_fallback.insert(b, id);
                        }
                    }
                    _ => {}
                }
                pieces.push(Piece { text: p.piece, score: p.score, kind: p.kind });
            }
            Self {
                pieces,
                trie,
                byte_fallback,
                unk_id: proto.unk_id,
                bos_id: proto.bos_id,
                eos_id: proto.eos_id,
                normalizer: proto.normalizer,
            }
        }
    }

    #[test]
    fn vocabulary_piece_wins_over_byte_fallback() {
        let model = toy_model();
        let ids = model.encode("hello world");
        let decoded = model.decode(&ids).unwrap();
        assert_eq!(decoded, "hello world");
        // The whole-word pieces "▁hello"/"▁world" score better than any
        // byte-fallback path, so the id sequence should not touch the
        // byte-fallback range (3..259).
        assert!(ids.iter().all(|&id| !(3..259).contains(&id)));
    }

    #[test]
    fn falls_back_to_bytes_for_unknown_codepoints() {
        let model = toy_model();
        let ids = model.encode("\u{4e2d}"); // a CJK character absent from the toy vocab
        assert!(!ids.is_empty());
        let decoded = model.decode(&ids).unwrap();
        assert_eq!(decoded, "\u{4e2d}");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let model = toy_model();
        assert!(model.encode("").is_empty());
    }
}
