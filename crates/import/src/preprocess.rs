use std::sync::OnceLock;

use regex::Regex;

use crate::error::OfxError;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_header_line,
    r"(?im)^[ \t]*(?:OFXHEADER|DATA|VERSION|SECURITY|ENCODING|CHARSET|COMPRESSION|OLDFILEUID|NEWFILEUID)[ \t]*:[^<\n]*(?:\n|$)");
re!(re_xml_decl,
    r"(?i)<\?xml[^>]*\?>");
re!(re_ofx_pi,
    r"(?i)<\?OFX[^>]*\?>");
re!(re_ofx_open,
    r"(?i)<[ \t]*OFX(?:\s[^>]*)?>");
re!(re_ofx_close,
    r"(?i)</[ \t]*OFX[ \t]*>");
re!(re_markup,
    r"<[A-Za-z/?!][^<>]*>|(?:[^<]|<[^A-Za-z/?!<])+|<");

const ENVELOPE_OPEN: &str = "<OFX>";
const ENVELOPE_CLOSE: &str = "</OFX>";
const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&apos;"];

/// Repair raw OFX/SGML text into one-element-per-line markup with balanced
/// leaf tags, wrapped in exactly one `<OFX>` envelope.
///
/// Applying it to its own output is a no-op.
pub fn sanitize(raw: &str) -> Result<String, OfxError> {
    let text = raw.replace("\r\n", "\n").replace('\r', "\n");
    let text = strip_headers(&text);
    let text = normalize_envelope_marker(&text);
    let text = layout_tags(&text);
    let text = escape_ampersands(&text);
    slice_envelope(&text)
}

/// Drops the `KEY:VALUE` header block and any `<?xml?>` declaration.
fn strip_headers(text: &str) -> String {
    let text = re_header_line().replace_all(text, "");
    re_xml_decl().replace_all(&text, "").into_owned()
}

/// `<?OFX ...?>` stands in for the envelope only when no plain `<OFX>` exists.
fn normalize_envelope_marker(text: &str) -> String {
    let has_plain_open = re_ofx_open().is_match(text);
    let text = if has_plain_open {
        re_ofx_pi().replace_all(text, "")
    } else {
        let first = re_ofx_pi().replace(text, ENVELOPE_OPEN);
        std::borrow::Cow::Owned(re_ofx_pi().replace_all(&first, "").into_owned())
    };
    let text = re_ofx_open().replace_all(&text, ENVELOPE_OPEN);
    re_ofx_close().replace_all(&text, ENVELOPE_CLOSE).into_owned()
}

#[derive(Debug, PartialEq)]
enum Markup {
    Open(String),
    Close(String),
    /// Self-closing elements and anything else kept verbatim on its own line.
    Verbatim(String),
    Text(String),
}

fn tokenize(text: &str) -> Vec<Markup> {
    let mut tokens = Vec::new();
    let mut pending = String::new();

    for piece in re_markup().find_iter(text).map(|m| m.as_str()) {
        match tag_inner(piece) {
            Some(inner) => {
                flush_text(&mut pending, &mut tokens);
                tokens.extend(classify_tag(inner));
            }
            None => pending.push_str(piece),
        }
    }
    flush_text(&mut pending, &mut tokens);
    tokens
}

/// Inside of `<...>` when the piece is a tag. A `<` not followed by a name
/// character is content.
fn tag_inner(piece: &str) -> Option<&str> {
    let inner = piece.strip_prefix('<')?.strip_suffix('>')?;
    let starts_tag = inner
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '/' | '?' | '!'));
    starts_tag.then(|| inner.trim())
}

fn flush_text(pending: &mut String, tokens: &mut Vec<Markup>) {
    let content = pending.trim();
    if !content.is_empty() {
        tokens.push(Markup::Text(content.replace('<', "&lt;")));
    }
    pending.clear();
}

fn classify_tag(inner: &str) -> Option<Markup> {
    if inner.starts_with('?') || inner.starts_with('!') || inner.is_empty() {
        return None;
    }
    if let Some(name) = inner.strip_prefix('/') {
        return Some(Markup::Close(name.trim().to_string()));
    }
    if inner.ends_with('/') {
        return Some(Markup::Verbatim(format!("<{inner}>")));
    }
    let name = inner.split_whitespace().next().unwrap_or(inner);
    Some(Markup::Open(name.to_string()))
}

/// One element per line. A leaf `<TAG>content` gets its `</TAG>` right after
/// the content unless the very next token already closes it.
fn layout_tags(text: &str) -> String {
    let tokens = tokenize(text);
    let mut lines = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Markup::Open(name) => {
                let mut line = format!("<{name}>");
                let closes_next = |idx: usize| {
                    matches!(tokens.get(idx), Some(Markup::Close(c)) if c.eq_ignore_ascii_case(name))
                };
                if let Some(Markup::Text(content)) = tokens.get(i + 1) {
                    line.push_str(content);
                    i += 1;
                    line.push_str(&format!("</{name}>"));
                    if closes_next(i + 1) {
                        i += 1;
                    }
                } else if closes_next(i + 1) {
                    line.push_str(&format!("</{name}>"));
                    i += 1;
                }
                lines.push(line);
            }
            Markup::Close(name) => lines.push(format!("</{name}>")),
            Markup::Verbatim(tag) => lines.push(tag.clone()),
            Markup::Text(content) => lines.push(content.clone()),
        }
        i += 1;
    }

    lines.join("\n")
}

fn escape_ampersands(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        if ch == '&' && !ENTITIES.iter().any(|e| text[idx..].starts_with(e)) {
            out.push_str("&amp;");
        } else {
            out.push(ch);
        }
    }
    out
}

/// First `<OFX>` through the end of the last `</OFX>`.
fn slice_envelope(text: &str) -> Result<String, OfxError> {
    let missing = || OfxError::Format("missing envelope".to_string());
    let start = text.find(ENVELOPE_OPEN).ok_or_else(missing)?;
    let close = text
        .rfind(ENVELOPE_CLOSE)
        .filter(|&close| close > start)
        .ok_or_else(missing)?;
    Ok(text[start..close + ENVELOPE_CLOSE.len()].to_string())
}
