// src/normalize.rs
use once_cell::sync::OnceCell;
use regex::Regex;

/// Normalize raw page bytes to comparable text. Pure and infallible:
/// malformed HTML or invalid UTF-8 degrades to best-effort extraction,
/// never an error. Line boundaries are preserved (block-level tags
/// become newlines) because downstream comparison is line-oriented.
pub fn to_normalized_text(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);

    // 1) Drop script/style blocks wholesale
    static RE_SCRIPT: OnceCell<Regex> = OnceCell::new();
    let re_script = RE_SCRIPT.get_or_init(|| {
        Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)\s*>").unwrap()
    });
    let mut out = re_script.replace_all(&text, "").to_string();

    // 2) Block-level boundaries become line breaks
    static RE_BLOCK: OnceCell<Regex> = OnceCell::new();
    let re_block = RE_BLOCK.get_or_init(|| {
        Regex::new(r"(?i)<br\s*/?>|<hr\s*/?>|</(p|div|li|h[1-6]|tr|td|th|section|article|header|footer|blockquote|table|ul|ol|pre)\s*>")
            .unwrap()
    });
    out = re_block.replace_all(&out, "\n").to_string();

    // 3) Strip remaining HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 4) HTML entity decode (after tag stripping so encoded brackets stay text)
    out = html_escape::decode_html_entities(&out).to_string();

    // 5) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 6) Collapse whitespace within each line, drop blank lines
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"[ \t\r\u{00A0}]+").unwrap());
    let lines: Vec<String> = out
        .lines()
        .map(|l| re_ws.replace_all(l, " ").trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        let html = b"<p>Hello,&nbsp;&nbsp; <b>world</b></p>";
        assert_eq!(to_normalized_text(html), "Hello, world");
    }

    #[test]
    fn block_tags_become_line_breaks() {
        let html = b"<div>Line1</div><div>Line2</div><p>Line3</p>";
        assert_eq!(to_normalized_text(html), "Line1\nLine2\nLine3");
    }

    #[test]
    fn script_and_style_are_dropped() {
        let html = b"<p>keep</p><script>var x = 'nope';</script><style>p{}</style>";
        assert_eq!(to_normalized_text(html), "keep");
    }

    #[test]
    fn entities_and_curly_quotes_are_normalized() {
        let html = "<p>\u{201C}quoted\u{201D} &amp; fine</p>".as_bytes();
        assert_eq!(to_normalized_text(html), "\"quoted\" & fine");
    }

    #[test]
    fn invalid_utf8_does_not_panic() {
        let raw = [0x68, 0x69, 0xFF, 0xFE, 0x21];
        let out = to_normalized_text(&raw);
        assert!(out.starts_with("hi"));
    }

    #[test]
    fn blank_lines_are_dropped() {
        let html = b"<p>a</p>\n\n\n<p>b</p>";
        assert_eq!(to_normalized_text(html), "a\nb");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(to_normalized_text(b"Line1\nLine2"), "Line1\nLine2");
    }
}
