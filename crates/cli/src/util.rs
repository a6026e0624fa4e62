// Table cell layout shared by the plain printer and the TUI grid.
// Widths are Unicode display columns, so accented labels count once.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Horizontal alignment inside a fixed-width cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Align {
    Left,
    Right,
}

pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` to at most `width` columns, marking the cut with "..".
/// Below 3 columns there is no room for the marker.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    let marker = if width >= 3 { ".." } else { "" };
    let budget = width - marker.len();

    let mut used = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let cw = ch.width().unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        out.push(ch);
    }
    out.push_str(marker);
    out
}

/// Exactly `width` columns: truncated when too long, padded on the side
/// opposite to `align` otherwise.
pub(crate) fn fit(s: &str, width: usize, align: Align) -> String {
    let cut = truncate_display(s, width);
    let pad = " ".repeat(width.saturating_sub(display_width(&cut)));
    match align {
        Align::Left => cut + &pad,
        Align::Right => pad + &cut,
    }
}
