//! Debug-only runtime invariant assertions. Compiles to no-ops in release
//! builds, matching the zero-overhead discipline the teacher crate's own
//! `invariants` module follows.

use crate::TokenId;

/// Asserts every token id in `tokens` is below `vocab_size`.
#[inline]
pub fn assert_tokens_in_bounds(tokens: &[TokenId], vocab_size: usize) {
    #[cfg(debug_assertions)]
    {
        for (i, &token) in tokens.iter().enumerate() {
            debug_assert!(
                (token as usize) < vocab_size,
                "Invariant violation: token[{i}] = {token} >= vocab_size ({vocab_size})"
            );
        }
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (tokens, vocab_size);
    }
}

/// Asserts that an encode call's output respects the crate's output-size
/// ceiling and stays within vocabulary bounds.
#[inline]
pub fn assert_encode_postconditions(tokens: &[TokenId], vocab_size: usize) {
    #[cfg(debug_assertions)]
    {
        assert_tokens_in_bounds(tokens, vocab_size);
        debug_assert!(
            tokens.len() <= crate::MAX_OUTPUT_TOKENS,
            "Invariant violation: token count {} exceeds MAX_OUTPUT_TOKENS ({})",
            tokens.len(),
            crate::MAX_OUTPUT_TOKENS
        );
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (tokens, vocab_size);
    }
}

/// Asserts that a merge step's chosen pair index is the leftmost among ties
/// at the minimum rank — used by `merge`'s tests to cross-check the
/// production algorithm against a naive reference scan.
#[inline]
pub fn assert_leftmost_tie_break(candidates: &[(usize, u32)], chosen_index: usize) {
    #[cfg(debug_assertions)]
    {
        let min_rank = candidates.iter().map(|&(_, r)| r).min();
        if let Some(min_rank) = min_rank {
            let leftmost = candidates
                .iter()
                .position(|&(_, r)| r == min_rank)
                .expect("min_rank was computed from this slice");
            debug_assert_eq!(
                leftmost, chosen_index,
                "Invariant violation: merge did not pick the leftmost minimum-rank pair"
            );
        }
    }
    #[cfg(not(debug_assertions))]
    {
        let _ = (candidates, chosen_index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_in_bounds_valid() {
        assert_tokens_in_bounds(&[0, 100, 999], 1000);
    }

    #[test]
    #[should_panic(expected = "Invariant violation")]
    #[cfg(debug_assertions)]
    fn tokens_in_bounds_invalid() {
        assert_tokens_in_bounds(&[0, 1000], 1000);
    }

    #[test]
    fn leftmost_tie_break_accepts_correct_choice() {
        assert_leftmost_tie_break(&[(0, 5), (1, 5), (2, 9)], 0);
    }

    #[test]
    #[should_panic(expected = "Invariant violation")]
    #[cfg(debug_assertions)]
    fn leftmost_tie_break_rejects_wrong_choice() {
        assert_leftmost_tie_break(&[(0, 5), (1, 5), (2, 9)], 1);
    }
}
