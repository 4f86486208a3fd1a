//! Shared low-level scanning helpers: offset clamping, active-line
//! resolution, and token-run extraction.

/// Characters that can appear inside a bare token in either grammar:
/// identifiers, metric names with dots, kebab-cased values.
#[must_use]
pub fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Clamp an offset to the text length and pull it back to the nearest
/// preceding `char` boundary, so slicing is always safe.
#[must_use]
pub fn clamp_offset(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Locate the line containing `offset`. Returns the line slice and the
/// offset re-based into it. `offset` must already be clamped.
#[must_use]
pub fn active_line(text: &str, offset: usize) -> (&str, usize) {
    let start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let end = text[offset..]
        .find('\n')
        .map_or(text.len(), |i| offset + i);
    (&text[start..end], offset - start)
}

/// Trailing run of token characters ending at `offset`.
#[must_use]
pub fn token_before(line: &str, offset: usize) -> &str {
    let start = line[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_token_char(*c))
        .last()
        .map_or(offset, |(i, _)| i);
    &line[start..offset]
}

/// Byte span of the maximal token-char run touching `offset` (the run may
/// extend on both sides of the cursor). Empty span at `offset` when the
/// cursor touches no token character.
#[must_use]
pub fn token_span(line: &str, offset: usize) -> (usize, usize) {
    let start = line[..offset]
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_token_char(*c))
        .last()
        .map_or(offset, |(i, _)| i);
    let end = line[offset..]
        .char_indices()
        .take_while(|(_, c)| is_token_char(*c))
        .last()
        .map_or(offset, |(i, c)| offset + i + c.len_utf8());
    (start, end)
}

/// Index of the closing brace matching the one at `open` (which must hold
/// `{`), or `line.len()` when unmatched — unmatched braces extend to end
/// of line.
#[must_use]
pub fn matching_brace(line: &str, open: usize) -> usize {
    let mut depth = 0usize;
    for (i, c) in line[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return open + i;
                }
            }
            _ => {}
        }
    }
    line.len()
}

/// Number of `(` not yet closed in `line[from..to]`.
#[must_use]
pub fn open_paren_depth(line: &str, from: usize, to: usize) -> usize {
    let mut depth = 0usize;
    for c in line[from..to].chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    depth
}
