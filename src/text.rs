//! Word-start matching shared by the side lexicons, short category keywords
//! and the synonym table.
//!
//! A needle matches when it begins at the start of the haystack or right
//! after a non-alphanumeric character. The needle may end mid-word, so
//! stems such as `ukrain` or `politic` match their inflections while short
//! keywords like `sea` do not fire inside `research`.

/// Byte offsets where `needle` starts a word in `hay`.
pub fn word_start_positions<'a>(hay: &'a str, needle: &'a str) -> impl Iterator<Item = usize> + 'a {
    hay.match_indices(needle).filter_map(move |(pos, _)| {
        if needle.is_empty() {
            return None;
        }
        let bounded = hay[..pos]
            .chars()
            .next_back()
            .map(|c| !c.is_alphanumeric())
            .unwrap_or(true);
        bounded.then_some(pos)
    })
}

pub fn contains_at_word_start(hay: &str, needle: &str) -> bool {
    word_start_positions(hay, needle).next().is_some()
}

pub fn count_at_word_start(hay: &str, needle: &str) -> usize {
    word_start_positions(hay, needle).count()
}

/// Replace every word-start occurrence of `from` with `to`.
/// Returns `None` when nothing was replaced.
pub fn replace_at_word_start(hay: &str, from: &str, to: &str) -> Option<String> {
    let positions: Vec<usize> = word_start_positions(hay, from).collect();
    if positions.is_empty() {
        return None;
    }
    let mut out = String::with_capacity(hay.len() + positions.len() * to.len());
    let mut cursor = 0;
    for pos in positions {
        out.push_str(&hay[cursor..pos]);
        out.push_str(to);
        cursor = pos + from.len();
    }
    out.push_str(&hay[cursor..]);
    Some(out)
}
