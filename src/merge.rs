//! The canonical byte-pair merge engine (rank-driven, leftmost tie-break).
//!
//! Grounded on the reference `_byte_pair_merge`/`byte_pair_encode` routines:
//! a linear rescan per merge step rather than a heap, because the strict
//! less-than comparison used when hunting for the next minimum naturally
//! keeps the leftmost-on-ties invariant without any extra bookkeeping.

use std::collections::HashMap;

/// Splits `piece` into the ranked byte spans tiktoken's reference merge
/// algorithm would produce, returning the half-open byte ranges of each
/// resulting part in left-to-right order.
///
/// `ranks` must map every single byte to a rank (the base case); multi-byte
/// spans are looked up as merges proceed.
pub fn byte_pair_merge(piece: &[u8], ranks: &HashMap<Vec<u8>, u32>) -> Vec<std::ops::Range<usize>> {
    if piece.len() == 1 {
        return vec![0..1];
    }

    // `parts[i] = (start_byte, rank_of_merging_with_next)`, one entry per
    // byte boundary plus a sentinel at the end.
    let mut parts: Vec<(usize, u32)> = (0..=piece.len()).map(|i| (i, u32::MAX)).collect();

    for i in 0..parts.len().saturating_sub(2) {
        parts[i].1 = get_rank_after_merge(&parts, i, piece, ranks);
    }

    while parts.len() > 1 {
        let mut min_rank = u32::MAX;
        let mut min_index = 0usize;
        for (i, &(_, rank)) in parts.iter().enumerate().take(parts.len().saturating_sub(1)) {
            if rank < min_rank {
                min_rank = rank;
                min_index = i;
            }
        }
        if min_rank == u32::MAX {
            break;
        }
        parts[min_index].1 = get_rank_after_merge(&parts, min_index, piece, ranks);
        if min_index > 0 {
            parts[min_index - 1].1 = get_rank_after_merge(&parts, min_index - 1, piece, ranks);
        }
        parts.remove(min_index + 1);
    }

    parts
        .windows(2)
        .map(|w| w[0].0..w[1].0)
        .collect()
}

fn get_rank_after_merge(
    parts: &[(usize, u32)],
    i: usize,
    piece: &[u8],
    ranks: &HashMap<Vec<u8>, u32>,
) -> u32 {
    if i + 2 < parts.len() {
        ranks
            .get(&piece[parts[i].0..parts[i + 2].0])
            .copied()
            .unwrap_or(u32::MAX)
    } else {
        u32::MAX
    }
}

/// Runs [`byte_pair_merge`] and looks each resulting span up in `ranks`,
/// producing the final token id sequence for one pre-tokenized fragment.
pub fn byte_pair_encode(piece: &[u8], ranks: &HashMap<Vec<u8>, u32>) -> Vec<u32> {
    if piece.len() == 1 {
        return vec![ranks[piece]];
    }
    byte_pair_merge(piece, ranks)
        .into_iter()
        .map(|range| ranks[&piece[range]])
        .collect()
}
