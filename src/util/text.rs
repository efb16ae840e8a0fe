use std::borrow::Cow;

/// Tags that start a new line of text when stripped.
const BLOCK_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "br", "p", "ul", "ol", "li", "blockquote", "section",
    "table", "tr", "div",
];

/// Builds a plain-text preview from an HTML fragment.
///
/// Markup is stripped with [`strip_html`], entities are decoded with
/// [`decode_entities`], and surrounding whitespace is trimmed.
///
/// # Examples
///
/// ```
/// use zenn_loader::util::html_to_snippet;
///
/// assert_eq!(html_to_snippet("<p>Fish &amp; chips</p>"), "Fish & chips");
/// ```
pub fn html_to_snippet(html: &str) -> String {
    let stripped = strip_html(html);
    decode_entities(&stripped).trim().to_string()
}

/// Removes HTML tags from `s`.
///
/// Block-level tags (paragraphs, list items, headings, line breaks, ...) are
/// replaced by a newline unless the text already breaks there, so that
/// adjacent paragraphs do not run together. All other tags are dropped.
///
/// Returns `Cow::Borrowed` when the input contains no `<`.
pub fn strip_html(s: &str) -> Cow<'_, str> {
    if !s.contains('<') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        let Some(end) = after.find('>') else {
            // Unterminated tag: keep the remainder as text
            out.push_str(after);
            rest = "";
            break;
        };

        let tag = &after[1..end];
        rest = &after[end + 1..];

        let follows_text = rest.chars().next().is_some_and(|c| c != '\n');
        if is_block_tag(tag) && !out.is_empty() && !out.ends_with('\n') && follows_text {
            out.push('\n');
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

fn is_block_tag(tag: &str) -> bool {
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or("");
    BLOCK_TAGS.iter().any(|b| b.eq_ignore_ascii_case(name))
}

/// Decodes the HTML entities commonly found in feed descriptions.
///
/// Handles the XML builtins, `&nbsp;`, and decimal/hex character references.
/// Unknown entities are left untouched.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let after = &rest[start..];

        let decoded = after
            .find(';')
            .filter(|&end| end <= 10)
            .and_then(|end| decode_entity(&after[1..end]).map(|c| (c, end)));

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = &after[1..];
            }
        }
    }
    out.push_str(rest);

    Cow::Owned(out)
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}
