//! Preview highlighting with multi-level fallback.
//!
//! Builds a short `<b>`-marked excerpt for a search hit. Fragments come from
//! the contents first; a hit that only matched by path falls back to a
//! marked path fragment plus a plain contents prefix; a hit with neither
//! yields the plain prefix alone. The total preview stays within a fixed
//! character budget and is never empty.

/// Total preview budget in characters, net of any path fragment.
pub const PREVIEW_BUDGET: usize = 200;

/// Characters of context kept on each side of a marked match.
const FRAGMENT_CONTEXT: usize = 40;

/// Maximum number of marked fragments per preview.
const MAX_FRAGMENTS: usize = 2;

/// Build the preview for one hit.
///
/// `terms` are the whitespace-split query terms; matching is ASCII
/// case-insensitive so fragment offsets stay aligned with the original text.
pub fn build_preview(contents: &str, path: &str, terms: &[&str]) -> String {
    let fragments = best_fragments(contents, terms);
    if !fragments.is_empty() {
        return fragments;
    }

    let mut preview = best_fragments(path, terms);
    let budget = PREVIEW_BUDGET.saturating_sub(preview.chars().count());
    preview.extend(contents.chars().take(budget));

    if preview.is_empty() {
        // Nothing matched and the file is empty; fall back to the path so
        // the result still renders.
        preview = path.chars().take(PREVIEW_BUDGET).collect();
    }
    preview
}

/// Concatenate up to [`MAX_FRAGMENTS`] marked fragments for term occurrences
/// in `text`. Empty when no term occurs.
fn best_fragments(text: &str, terms: &[&str]) -> String {
    let haystack = text.to_ascii_lowercase();

    let mut hits: Vec<(usize, usize)> = Vec::new();
    for term in terms {
        let needle = term.to_ascii_lowercase();
        if needle.is_empty() {
            continue;
        }
        if let Some(start) = haystack.find(&needle) {
            hits.push((start, needle.len()));
        }
    }

    hits.sort();
    hits.dedup();

    let mut out = String::new();
    for (start, len) in hits.into_iter().take(MAX_FRAGMENTS) {
        out.push_str(&mark_fragment(text, start, len));
    }
    out
}

/// Slice a context window around `[start, start + len)` and wrap the match
/// in `<b>` tags, respecting UTF-8 character boundaries.
fn mark_fragment(text: &str, start: usize, len: usize) -> String {
    let char_indices: Vec<(usize, char)> = text.char_indices().collect();

    let match_char_idx = char_indices
        .iter()
        .position(|(byte_pos, _)| *byte_pos >= start)
        .unwrap_or(0);
    let match_char_len = text[start..start + len].chars().count();

    let from_char = match_char_idx.saturating_sub(FRAGMENT_CONTEXT);
    let to_char = (match_char_idx + match_char_len + FRAGMENT_CONTEXT).min(char_indices.len());

    let from_byte = char_indices.get(from_char).map(|(b, _)| *b).unwrap_or(0);
    let to_byte = char_indices
        .get(to_char)
        .map(|(b, _)| *b)
        .unwrap_or(text.len());

    format!(
        "{}<b>{}</b>{}",
        &text[from_byte..start],
        &text[start..start + len],
        &text[start + len..to_byte]
    )
}
