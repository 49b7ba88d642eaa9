//! SentencePiece-style text normalization: whitespace collapsing, dummy
//! prefix insertion, and the `▁` (U+2581) meta-symbol substitution.

pub const META_SYMBOL: char = '\u{2581}';

#[derive(Debug, Clone, Copy)]
pub struct NormalizerSpec {
    pub add_dummy_prefix: bool,
    pub remove_extra_whitespaces: bool,
}

impl Default for NormalizerSpec {
    fn default() -> Self {
        Self {
            add_dummy_prefix: true,
            remove_extra_whitespaces: true,
        }
    }
}

/// Normalizes `text` for Unigram encoding: collapses whitespace runs to a
/// single space and trims (if `remove_extra_whitespaces`), inserts a
/// leading space (if `add_dummy_prefix`), then replaces every space with
/// the meta-symbol.
pub fn normalize(text: &str, spec: &NormalizerSpec) -> String {
    let mut s = if spec.remove_extra_whitespaces {
        collapse_whitespace(text)
    } else {
        text.to_string()
    };
    if s.is_empty() {
        return s;
    }
    if spec.add_dummy_prefix {
        s.insert(0, ' ');
    }
    s.chars()
        .map(|c| if c == ' ' { META_SYMBOL } else { c })
        .collect()
}

/// Inverse of [`normalize`]'s space handling: meta-symbol back to space,
/// then a single leading space is stripped if `add_dummy_prefix` was set.
pub fn denormalize(text: &str, spec: &NormalizerSpec) -> String {
    let with_spaces: String = text
        .chars()
        .map(|c| if c == META_SYMBOL { ' ' } else { c })
        .collect();
    if spec.add_dummy_prefix {
        with_spaces.strip_prefix(' ').map(str::to_string).unwrap_or(with_spaces)
    } else {
        with_spaces
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_was_space = false;
    for c in text.chars() {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_adds_dummy_prefix() {
        let spec = NormalizerSpec::default();
        let normalized = normalize("hello   world", &spec);
        assert_eq!(normalized, format!("{META_SYMBOL}hello{META_SYMBOL}world"));
    }

    #[test]
    fn empty_input_stays_empty() {
        let spec = NormalizerSpec::default();
        assert_eq!(normalize("", &spec), "");
        assert_eq!(normalize("   \t\n", &spec), "");
    }

    #[test]
    fn denormalize_strips_dummy_prefix() {
        let spec = NormalizerSpec::default();
        let normalized = normalize("hi", &spec);
        assert_eq!(denormalize(&normalized, &spec), "hi");
    }

    #[test]
    fn no_dummy_prefix_when_disabled() {
        let spec = NormalizerSpec {
            add_dummy_prefix: false,
            remove_extra_whitespaces: true,
        };
        let normalized = normalize("hi there", &spec);
        assert_eq!(normalized, format!("hi{META_SYMBOL}there"));
    }
}
