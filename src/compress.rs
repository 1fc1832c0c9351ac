//! Post-render output minification.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{ViewError, ViewResult};

pub const JAVASCRIPT_CONTENT_TYPES: [&str; 3] = [
    "application/x-javascript",
    "application/javascript",
    "text/javascript",
];
pub const CSS_CONTENT_TYPE: &str = "text/css";

const NOCOMPRESS_COMMENT_OPEN: &str = "<!--<nocompress>-->";
const NOCOMPRESS_COMMENT_CLOSE: &str = "<!--</nocompress>-->";
const NOCOMPRESS_OPEN: &str = "<nocompress>";
const NOCOMPRESS_CLOSE: &str = "</nocompress>";

static PROTECTED_REGIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?msi)<!--<nocompress>-->.*?<!--</nocompress>-->|<nocompress>.*?</nocompress>|<pre.*?/pre>|<textarea.*?/textarea>|<script.*?/script>",
    )
    .expect("protected region pattern is valid")
});
static LINE_BREAKS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\n\r\t]+").expect("line break pattern is valid"));
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("whitespace pattern is valid"));
static BLOCK_COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern is valid"));
static HTML_COMMENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--[^!]*-->").expect("html comment pattern is valid"));

/// Text transform applied to rendered output before it is emitted.
#[cfg_attr(feature = "test-mocks", mockall::automock)]
pub trait OutputTransform {
    fn transform(&self, content: &str, content_type: &str) -> ViewResult<String>;
}

/// Picks a minifier by content type: JavaScript, CSS, or HTML for the rest.
#[derive(Clone, Copy, Debug, Default)]
pub struct Minifier;

impl OutputTransform for Minifier {
    fn transform(&self, content: &str, content_type: &str) -> ViewResult<String> {
        let essence = mime_essence(content_type);
        if JAVASCRIPT_CONTENT_TYPES
            .iter()
            .any(|js| essence.eq_ignore_ascii_case(js))
        {
            Ok(minifier::js::minify(content).to_string())
        } else if essence.eq_ignore_ascii_case(CSS_CONTENT_TYPE) {
            minifier::css::minify(content)
                .map(|minified| minified.to_string())
                .map_err(|e| ViewError::Minify(e.to_string()))
        } else {
            Ok(compress_html(content))
        }
    }
}

/// Media type without parameters, e.g. `text/css; charset=utf-8` -> `text/css`.
pub fn mime_essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or_default().trim()
}

fn starts_with_ignore_case(chunk: &str, prefix: &str) -> bool {
    chunk
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

fn unwrap_region<'a>(chunk: &'a str, open: &str, close: &str) -> &'a str {
    chunk
        .get(open.len()..chunk.len().saturating_sub(close.len()))
        .unwrap_or_default()
}

/// Cuts a trailing `//` comment unless the slashes sit inside a string literal.
fn strip_line_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_double = false;
    let mut in_single = false;

    for (i, &b) in bytes.iter().enumerate() {
        let escaped = i > 0 && bytes[i - 1] == b'\\';
        match b {
            b'"' if !in_single && !escaped => in_double = !in_double,
            b'\'' if !in_double && !escaped => in_single = !in_single,
            b'/' if !in_double && !in_single && bytes.get(i + 1) == Some(&b'/') => {
                return &line[..i];
            }
            _ => {}
        }
    }
    line
}

/// Removes `//` comments from a multi-line script block, keeping its lines.
fn strip_script_comments(script: &str) -> String {
    script
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .map(|line| {
            if line.contains("//") {
                strip_line_comment(line).trim_end()
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse(chunk: &str) -> String {
    let chunk = BLOCK_COMMENTS.replace_all(chunk, "");
    let chunk = HTML_COMMENTS.replace_all(&chunk, "");
    let chunk = LINE_BREAKS.replace_all(&chunk, " ");
    WHITESPACE_RUNS.replace_all(&chunk, " ").into_owned()
}

fn compress_protected(chunk: &str, out: &mut String) {
    if starts_with_ignore_case(chunk, NOCOMPRESS_COMMENT_OPEN) {
        out.push_str(unwrap_region(
            chunk,
            NOCOMPRESS_COMMENT_OPEN,
            NOCOMPRESS_COMMENT_CLOSE,
        ));
    } else if starts_with_ignore_case(chunk, NOCOMPRESS_OPEN) {
        out.push_str(unwrap_region(chunk, NOCOMPRESS_OPEN, NOCOMPRESS_CLOSE));
    } else if starts_with_ignore_case(chunk, "<script")
        && chunk.contains("//")
        && chunk.contains(['\r', '\n'])
    {
        out.push_str(&strip_script_comments(chunk));
    } else {
        out.push_str(chunk);
    }
}

/// Best-effort HTML compressor.
///
/// Whitespace runs collapse to a single space and comments are dropped,
/// except inside `<pre>`, `<textarea>`, `<script>` and no-compress regions.
/// Multi-line scripts only lose their `//` comments.
pub fn compress_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;

    for region in PROTECTED_REGIONS.find_iter(html) {
        out.push_str(&collapse(&html[last..region.start()]));
        compress_protected(region.as_str(), &mut out);
        last = region.end();
    }
    out.push_str(&collapse(&html[last..]));
    out
}
