//! Markdown to HTML conversion.
//!
//! Bodies go through pulldown-cmark, wrapped in two extra passes that the
//! converter must not see:
//!
//! ```text
//! raw ─▶ protect math ─▶ sized images ─▶ pulldown-cmark ─▶ image widths ─▶ restore math ─▶ html
//! ```
//!
//! ## Math protection
//!
//! `$$…$$` (block, may span lines) and `$…$` (inline, single line) spans
//! would otherwise be mangled: `_` becomes emphasis, `\\` collapses, `*`
//! turns into lists. Each span is swapped for an opaque token before
//! conversion and swapped back verbatim afterwards, so a client-side renderer
//! such as MathJax or KaTeX sees exactly what the author wrote.
//!
//! Tokens are a counter wrapped in a Unicode private-use delimiter
//! (`\u{E000}MATH7\u{E000}`). Markdown treats them as plain text. The
//! delimiter is the first private-use character absent from the source, so
//! author text can never collide with a token.
//!
//! A `$` preceded by a backslash never opens or closes a span. An unclosed
//! `$$` runs to the end of the document. An unclosed `$` runs to the end of
//! its line (inline spans never cross lines), so the rest of that line is
//! passed through untouched.
//!
//! ## Code blocks
//!
//! Fenced blocks whose language syntect knows are highlighted with inline
//! styles (`base16-ocean.light`). Unknown or missing languages fall back to
//! plain `<pre><code class="language-…">`. Math tokens inside a highlighted
//! block are restored before highlighting so they come out as written.
//!
//! ## Sized images
//!
//! `![Sunset|300px](sunset.jpg)` renders as
//! `<img src="sunset.jpg" alt="Sunset" width="300" />`. The width travels
//! through the converter as an HTML comment placed right after the image and
//! is folded into the tag afterwards. An explicit `width` already on the tag
//! (from raw HTML) is never overwritten.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html as md_html};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};

const PRIVATE_USE: std::ops::RangeInclusive<u32> = 0xE000..=0xF8FF;

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]\n]*)\]\(([^)\n]*)\)").expect("image pattern must compile")
});

static SIZED_IMG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(<img\b[^>]*?)(\s*/?>)<!--img-width:(\d+)-->").expect("img tag pattern must compile")
});

static WIDTH_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\swidth\s*=").expect("width pattern must compile"));

static SENTINEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--img-width:\d+-->").expect("sentinel pattern must compile"));

static HIGHLIGHTER: LazyLock<Highlighter> = LazyLock::new(Highlighter::new);

const CODE_THEME: &str = "base16-ocean.light";

/// Convert a Markdown body to an HTML fragment.
pub fn transform(raw: &str) -> String {
    let mut placeholders = Placeholders::for_source(raw);

    let text = protect_block_math(raw, &mut placeholders);
    let text = protect_inline_math(&text, &mut placeholders);
    let text = expand_sized_images(&text);

    let html = convert(&text, &|code: &str| placeholders.restore(code));
    let html = apply_image_widths(&html);
    placeholders.restore(&html)
}

/// Plain Markdown conversion with the site-wide extension set.
///
/// Fenced code blocks in a known language are syntax highlighted; others
/// carry `class="language-…"`. Raw HTML passes through unchanged.
pub fn markup(text: &str) -> String {
    convert(text, &|code: &str| code.to_string())
}

fn convert(text: &str, restore: &dyn Fn(&str) -> String) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut events = Vec::new();
    let mut fence: Option<FencedCode> = None;

    for event in Parser::new_ext(text, options) {
        if let Some(block) = fence.as_mut() {
            match event {
                Event::Text(code) => block.code.push_str(&code),
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(block) = fence.take() {
                        block.emit(restore, &mut events);
                    }
                }
                other => events.push(other),
            }
            continue;
        }

        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                match HIGHLIGHTER.syntax_for(&info) {
                    Some(syntax) => {
                        fence = Some(FencedCode {
                            info,
                            syntax,
                            code: String::new(),
                        })
                    }
                    None => events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))),
                }
            }
            other => events.push(other),
        }
    }

    let mut html = String::with_capacity(text.len() * 3 / 2);
    md_html::push_html(&mut html, events.into_iter());
    html
}

// ============================================================================
// Syntax highlighting
// ============================================================================

struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    fn new() -> Self {
        let syntaxes = SyntaxSet::load_defaults_newlines();
        let theme = ThemeSet::load_defaults()
            .themes
            .remove(CODE_THEME)
            .unwrap_or_default();
        Self { syntaxes, theme }
    }

    /// The syntax named by the first word of a fence's info string.
    fn syntax_for(&self, info: &str) -> Option<&SyntaxReference> {
        let lang = info.split_whitespace().next()?;
        self.syntaxes.find_syntax_by_token(lang)
    }
}

/// A fenced block being collected for highlighting.
struct FencedCode<'a> {
    info: CowStr<'a>,
    syntax: &'static SyntaxReference,
    code: String,
}

impl<'a> FencedCode<'a> {
    fn emit(self, restore: &dyn Fn(&str) -> String, events: &mut Vec<Event<'a>>) {
        let code = restore(&self.code);
        match highlighted_html_for_string(&code, &HIGHLIGHTER.syntaxes, self.syntax, &HIGHLIGHTER.theme) {
            Ok(html) => events.push(Event::Html(html.into())),
            Err(e) => {
                tracing::warn!(lang = %self.info, "syntax highlighting failed: {e}");
                events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(self.info))));
                events.push(Event::Text(self.code.into()));
                events.push(Event::End(TagEnd::CodeBlock));
            }
        }
    }
}

// ============================================================================
// Math placeholders
// ============================================================================

/// Ordered mapping from opaque token to the original span text.
#[derive(Debug)]
struct Placeholders {
    delimiter: char,
    entries: Vec<(String, String)>,
}

impl Placeholders {
    /// Pick a delimiter that does not occur anywhere in `source`.
    fn for_source(source: &str) -> Self {
        let delimiter = PRIVATE_USE
            .filter_map(char::from_u32)
            .find(|c| !source.contains(*c))
            .unwrap_or('\u{E000}');
        Self {
            delimiter,
            entries: Vec::new(),
        }
    }

    fn stash(&mut self, original: &str) -> String {
        let d = self.delimiter;
        let token = format!("{d}MATH{}{d}", self.entries.len());
        self.entries.push((token.clone(), original.to_string()));
        token
    }

    fn restore(&self, html: &str) -> String {
        let mut out = html.to_string();
        for (token, original) in &self.entries {
            out = out.replace(token.as_str(), original);
        }
        out
    }
}

fn is_escaped(bytes: &[u8], idx: usize) -> bool {
    idx > 0 && bytes[idx - 1] == b'\\'
}

/// Position of the next unescaped `delim` at or after `from`.
fn find_unescaped(bytes: &[u8], from: usize, delim: &[u8]) -> Option<usize> {
    let mut i = from;
    while i + delim.len() <= bytes.len() {
        if &bytes[i..i + delim.len()] == delim && !is_escaped(bytes, i) {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn protect_block_math(text: &str, placeholders: &mut Placeholders) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;

    while let Some(open) = find_unescaped(bytes, copied, b"$$") {
        let end = find_unescaped(bytes, open + 2, b"$$")
            .map(|close| close + 2)
            .unwrap_or(bytes.len());
        out.push_str(&text[copied..open]);
        out.push_str(&placeholders.stash(&text[open..end]));
        copied = end;
    }
    out.push_str(&text[copied..]);
    out
}

fn protect_inline_math(text: &str, placeholders: &mut Placeholders) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut search_from = 0;

    while let Some(open) = find_unescaped(bytes, search_from, b"$") {
        // Inline spans stay on one line and never swallow a block token.
        let limit = text[open + 1..]
            .find(['\n', placeholders.delimiter])
            .map(|offset| open + 1 + offset)
            .unwrap_or(bytes.len());

        match find_unescaped(&bytes[..limit], open + 1, b"$") {
            Some(close) => {
                out.push_str(&text[copied..open]);
                out.push_str(&placeholders.stash(&text[open..=close]));
                copied = close + 1;
                search_from = close + 1;
            }
            None => {
                out.push_str(&text[copied..open]);
                out.push_str(&placeholders.stash(&text[open..limit]));
                copied = limit;
                search_from = limit;
            }
        }
    }
    out.push_str(&text[copied..]);
    out
}

// ============================================================================
// Sized images
// ============================================================================

/// Parse a `300` / `300px` width suffix.
fn parse_width(suffix: &str) -> Option<u32> {
    let trimmed = suffix.trim();
    let digits = trimmed.strip_suffix("px").unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn expand_sized_images(text: &str) -> String {
    IMAGE_RE
        .replace_all(text, |caps: &Captures| {
            let alt = &caps[1];
            let src = &caps[2];
            match alt.rsplit_once('|') {
                Some((caption, suffix)) => match parse_width(suffix) {
                    Some(width) => format!("![{caption}]({src})<!--img-width:{width}-->"),
                    None => caps[0].to_string(),
                },
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn apply_image_widths(html: &str) -> String {
    let sized = SIZED_IMG_TAG_RE.replace_all(html, |caps: &Captures| {
        let tag = &caps[1];
        let close = &caps[2];
        if WIDTH_ATTR_RE.is_match(tag) {
            format!("{tag}{close}")
        } else {
            format!("{tag} width=\"{}\"{close}", &caps[3])
        }
    });
    SENTINEL_RE.replace_all(&sized, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_and_inline_math_survive_verbatim() {
        let html = transform("Energy: $$x^2$$ and $y$ here.");
        assert!(html.contains("$$x^2$$"), "{html}");
        assert!(html.contains("$y$"), "{html}");
    }

    #[test]
    fn math_is_not_touched_by_emphasis() {
        let html = transform("Inline $a_1 * b_2 * c_3$ stays.");
        assert!(html.contains("$a_1 * b_2 * c_3$"), "{html}");
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn multiline_block_math() {
        let raw = "Before\n\n$$\n\\begin{aligned}\na &= b \\\\\nc &= d\n\\end{aligned}\n$$\n\nAfter";
        let html = transform(raw);
        assert!(html.contains("$$\n\\begin{aligned}\na &= b \\\\\nc &= d\n\\end{aligned}\n$$"));
        assert!(html.contains("<p>After</p>"));
    }

    #[test]
    fn math_inside_list_and_heading() {
        let html = transform("# Title $k_n$\n\n- item $$a_b$$\n- other");
        assert!(html.contains("<h1>Title $k_n$</h1>"), "{html}");
        assert!(html.contains("<li>item $$a_b$$</li>"), "{html}");
    }

    #[test]
    fn escaped_dollar_is_literal() {
        let html = transform(r"Price \$5 and \$6 total");
        assert!(!html.contains("MATH"));
        assert!(html.contains("$5 and"), "{html}");
    }

    #[test]
    fn lone_dollar_is_literal() {
        let html = transform("It costs $5 today.\n\nAnd *more* later.");
        assert!(html.contains("It costs $5 today."));
        assert!(html.contains("<em>more</em>"));
    }

    #[test]
    fn unterminated_inline_math_runs_to_end_of_line() {
        let html = transform("Start $x_1 *y*\nnext *line*");
        assert!(html.contains("$x_1 *y*"), "{html}");
        assert!(html.contains("<em>line</em>"), "{html}");
        assert_eq!(html.matches("<em>").count(), 1);
    }

    #[test]
    fn unterminated_block_math_runs_to_end() {
        let html = transform("Start $$x_1 + *y*");
        assert!(html.contains("$$x_1 + *y*"), "{html}");
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn inline_math_does_not_cross_lines() {
        let html = transform("a $b\n\nc$ d");
        assert!(html.contains("<p>a $b</p>"), "{html}");
    }

    #[test]
    fn reserved_characters_in_source_do_not_collide() {
        let raw = "\u{E000}MATH0\u{E000} and $z$";
        let html = transform(raw);
        assert!(html.contains("\u{E000}MATH0\u{E000} and $z$"), "{html}");
        assert_eq!(html.matches("$z$").count(), 1);
    }

    #[test]
    fn many_spans_restore_independently() {
        let raw: String = (0..12).map(|i| format!("$v_{i}$ ")).collect();
        let html = transform(&raw);
        for i in 0..12 {
            assert!(html.contains(&format!("$v_{i}$")), "missing v_{i} in {html}");
        }
    }

    #[test]
    fn sized_image_gets_width() {
        let html = transform("![caption|300px](pic.png)");
        assert!(html.contains(r#"src="pic.png""#), "{html}");
        assert!(html.contains(r#"alt="caption""#), "{html}");
        assert!(html.contains(r#"width="300""#), "{html}");
        assert!(!html.contains("img-width"));
    }

    #[test]
    fn sized_image_without_unit() {
        let html = transform("![Dawn|640](dawn.jpg)");
        assert!(html.contains(r#"width="640""#), "{html}");
        assert!(html.contains(r#"alt="Dawn""#));
    }

    #[test]
    fn plain_image_has_no_width() {
        let html = transform("![caption](pic.png)");
        assert!(html.contains(r#"alt="caption""#));
        assert!(!html.contains("width="));
    }

    #[test]
    fn non_numeric_suffix_passes_through() {
        let html = transform("![a|wide](pic.png)");
        assert!(html.contains(r#"alt="a|wide""#), "{html}");
        assert!(!html.contains("width="));
    }

    #[test]
    fn caption_may_contain_pipes() {
        let html = transform("![a|b|120](pic.png)");
        assert!(html.contains(r#"alt="a|b""#), "{html}");
        assert!(html.contains(r#"width="120""#));
    }

    #[test]
    fn existing_width_attribute_wins() {
        let out = apply_image_widths(r#"<img src="a.png" width="50" /><!--img-width:300-->"#);
        assert_eq!(out, r#"<img src="a.png" width="50" />"#);
    }

    #[test]
    fn width_injected_before_self_closing_slash() {
        let out = apply_image_widths(r#"<img src="a.png" alt="x" /><!--img-width:300-->"#);
        assert_eq!(out, r#"<img src="a.png" alt="x" width="300" />"#);
    }

    #[test]
    fn tables_enabled() {
        let html = transform("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
    }

    #[test]
    fn fenced_rust_is_highlighted() {
        let html = transform("```rust\nfn main() {}\n```\n");
        assert!(html.contains("<pre style="), "{html}");
        assert!(html.contains("<span style="), "{html}");
        assert!(html.contains(">fn<"), "{html}");
        assert!(!html.contains("<code"), "{html}");
    }

    #[test]
    fn unknown_language_falls_back_to_plain_code() {
        let html = transform("```klingon\nqapla'\n```\n");
        assert!(html.contains(r#"<pre><code class="language-klingon">"#), "{html}");
    }

    #[test]
    fn math_inside_highlighted_code_is_restored() {
        let html = transform("```python\nprice = \"$a$\"\n```\n");
        assert!(html.contains("$a$"), "{html}");
        assert!(!html.contains("MATH"), "{html}");
    }

    #[test]
    fn inline_html_passes_through() {
        let html = transform("<div class=\"note\">raw</div>\n\ntext");
        assert!(html.contains("<div class=\"note\">raw</div>"));
    }

    #[test]
    fn parse_width_variants() {
        assert_eq!(parse_width("300"), Some(300));
        assert_eq!(parse_width(" 300px "), Some(300));
        assert_eq!(parse_width("px"), None);
        assert_eq!(parse_width("3.5"), None);
        assert_eq!(parse_width("-1"), None);
    }
}
