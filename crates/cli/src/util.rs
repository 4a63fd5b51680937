use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if width < 3 {
        // First char if it fits, else nothing
        return s
            .chars()
            .find(|&ch| ch.width().unwrap_or(0) <= width)
            .map(|ch| ch.to_string())
            .unwrap_or_default();
    }

    if display_width(s) <= width {
        return s.to_string();
    }

    // Leave room for ".."
    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = ch.width().unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }

    format!("{}..", &s[..end_byte])
}

/// Pad or truncate a string to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        let cut = truncate_display(s, width);
        let pad = width.saturating_sub(display_width(&cut));
        format!("{}{}", cut, " ".repeat(pad))
    } else {
        format!("{}{}", s, " ".repeat(width - sw))
    }
}

/// Cell text on a single line: line breaks and tabs become spaces
fn flatten(cell: &str) -> String {
    cell.chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect()
}

/// Render an aligned text table: header, a dashed rule, then rows.
///
/// Each column is as wide as its widest cell, capped at `max_width`. Columns are
/// separated by two spaces; trailing padding is stripped.
pub(crate) fn render_table<S: AsRef<str>>(header: &[S], rows: &[Vec<String>], max_width: usize) -> String {
    let max_width = max_width.max(1);
    let header: Vec<String> = header.iter().map(|h| flatten(h.as_ref())).collect();
    let rows: Vec<Vec<String>> = rows.iter().map(|r| r.iter().map(|c| flatten(c)).collect()).collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|col| {
            let widest = rows
                .iter()
                .filter_map(|r| r.get(col))
                .map(|c| display_width(c))
                .chain(std::iter::once(display_width(&header[col])))
                .max()
                .unwrap_or(0);
            widest.clamp(1, max_width)
        })
        .collect();

    let line = |cells: &[String]| -> String {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(col, &w)| pad_right(cells.get(col).map(|c| c.as_str()).unwrap_or(""), w))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&line(&header));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for row in &rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}
