/// Drop every `<...>` tag and trim. Entities are left alone.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut tag_start: Option<usize> = None;
    for (i, c) in html.char_indices() {
        match (c, tag_start) {
            ('<', None) => tag_start = Some(i),
            ('>', Some(_)) => tag_start = None,
            (_, None) => out.push(c),
            _ => {}
        }
    }
    // An unclosed '<' is text, not a tag, and so is everything after it.
    if let Some(start) = tag_start {
        out.push_str(&html[start..]);
    }
    out.trim().to_string()
}

/// Stripped text cut to `max_chars` characters, with `...` when cut.
pub fn preview(html: &str, max_chars: usize) -> String {
    let text = strip_html(html);
    if text.chars().count() <= max_chars {
        return text;
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
