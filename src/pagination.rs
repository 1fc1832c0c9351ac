use std::collections::HashMap;
use std::fmt::Write;

use serde::Deserialize;
use tera::Value;
use thiserror::Error;

const PAGE_PLACEHOLDER: &str = "{0}";
const LINE_BREAK: &str = "\r\n";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page size must be greater than zero")]
    InvalidPageSize,
}

/// Paging parameters and display options of a navigation control.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PaginationRequest {
    /// 1-based index of the current page.
    pub page_index: usize,
    pub page_size: usize,
    pub row_count: usize,
    pub format_href: String,
    pub format_click: String,
    /// Numbered links per navigation block.
    pub show_links: usize,
    pub show_number_links: bool,
    pub first_text: String,
    pub previous_text: String,
    pub pre_multi_text: String,
    pub next_multi_text: String,
    pub next_text: String,
    pub last_text: String,
    pub no_result_text: String,
    pub class: String,
    pub current_class: String,
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self {
            page_index: 1,
            page_size: 10,
            row_count: 0,
            format_href: String::new(),
            format_click: String::new(),
            show_links: 10,
            show_number_links: true,
            first_text: "First".to_string(),
            previous_text: "Previous".to_string(),
            pre_multi_text: "...".to_string(),
            next_multi_text: "...".to_string(),
            next_text: "Next".to_string(),
            last_text: "Last".to_string(),
            no_result_text: String::new(),
            class: String::new(),
            current_class: String::new(),
        }
    }
}

impl PaginationRequest {
    pub fn new(page_index: usize, page_size: usize, row_count: usize) -> Self {
        Self {
            page_index,
            page_size,
            row_count,
            ..Default::default()
        }
    }

    pub fn page_count(&self) -> Result<usize, PaginationError> {
        if self.page_size == 0 {
            return Err(PaginationError::InvalidPageSize);
        }
        Ok(self.row_count.div_ceil(self.page_size).max(1))
    }

    fn show_window(&self) -> bool {
        self.show_number_links && self.show_links > 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    First,
    Previous,
    PreviousWindow,
    Page,
    NextWindow,
    Next,
    Last,
}

/// One entry of the navigation list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageItem {
    Link {
        kind: LinkKind,
        target: usize,
        text: String,
    },
    /// The current page inside the numbered window.
    Active(usize),
}

/// Result of laying out a pagination control.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageLayout {
    NoResults,
    SinglePage,
    Pages(Vec<PageItem>),
}

fn push_link(items: &mut Vec<PageItem>, kind: LinkKind, target: usize, text: &str) {
    if text.is_empty() {
        return;
    }
    let text = if text == PAGE_PLACEHOLDER {
        target.to_string()
    } else {
        text.to_string()
    };
    items.push(PageItem::Link { kind, target, text });
}

/// Computes the navigation items for a request.
///
/// A current page of zero is treated as the first page and a current page
/// past the end is clamped to the last page.
pub fn layout(request: &PaginationRequest) -> Result<PageLayout, PaginationError> {
    let page_count = request.page_count()?;

    if request.row_count == 0 {
        return Ok(PageLayout::NoResults);
    }
    if page_count <= 1 {
        return Ok(PageLayout::SinglePage);
    }

    let page_index = request.page_index.clamp(1, page_count);
    let show_window = request.show_window();
    let window = request.show_links;
    let mut items = Vec::new();

    if page_index > 1 {
        if show_window {
            push_link(&mut items, LinkKind::First, 1, &request.first_text);
        }
        push_link(
            &mut items,
            LinkKind::Previous,
            page_index - 1,
            &request.previous_text,
        );
    }

    if show_window {
        let nav_block_count = page_count.div_ceil(window).max(1);
        let nav_block_index = page_index.div_ceil(window);

        if nav_block_index > 1 {
            push_link(
                &mut items,
                LinkKind::PreviousWindow,
                page_index - window,
                &request.pre_multi_text,
            );
        }

        let skip = match page_index % window {
            0 => window,
            rest => rest,
        };
        let start = page_index - skip + 1;
        let end = (page_index - skip + window).min(page_count);
        for page in start..=end {
            if page == page_index {
                items.push(PageItem::Active(page));
            } else {
                push_link(&mut items, LinkKind::Page, page, PAGE_PLACEHOLDER);
            }
        }

        if nav_block_index < nav_block_count {
            push_link(
                &mut items,
                LinkKind::NextWindow,
                (page_index + window).min(page_count),
                &request.next_multi_text,
            );
        }
    }

    if page_index < page_count {
        push_link(
            &mut items,
            LinkKind::Next,
            page_index + 1,
            &request.next_text,
        );
        if show_window {
            push_link(&mut items, LinkKind::Last, page_count, &request.last_text);
        }
    }

    Ok(PageLayout::Pages(items))
}

fn open_container(out: &mut String, class: &str) {
    out.push_str("<div");
    if !class.is_empty() {
        let _ = write!(out, " class=\"{class}\"");
    }
    out.push('>');
    out.push_str(LINE_BREAK);
}

fn render_item(out: &mut String, item: &PageItem, request: &PaginationRequest) {
    match item {
        PageItem::Link { target, text, .. } => {
            let target = target.to_string();
            let mut link = String::from("<li><a");
            if !request.format_click.is_empty() {
                let _ = write!(link, " onclick=\"{}\"", request.format_click);
            }
            if !request.format_href.is_empty() {
                let _ = write!(link, " href=\"{}\"", request.format_href);
            }
            let _ = write!(link, ">{text}</a></li>");
            out.push_str(&link.replace(PAGE_PLACEHOLDER, &target));
        }
        PageItem::Active(page) if !request.current_class.is_empty() => {
            let _ = write!(
                out,
                "<li class=\"{}\"><span>{page}</span></li>",
                request.current_class
            );
        }
        PageItem::Active(page) => {
            let _ = write!(out, "<li><span>{page}</span></li>");
        }
    }
    out.push_str(LINE_BREAK);
}

/// Renders the pagination control as HTML markup.
pub fn build(request: &PaginationRequest) -> Result<String, PaginationError> {
    let items = match layout(request)? {
        PageLayout::SinglePage => return Ok(String::new()),
        PageLayout::NoResults => {
            let mut out = String::new();
            open_container(&mut out, &request.class);
            out.push_str(&request.no_result_text);
            out.push_str("</div>");
            return Ok(out);
        }
        PageLayout::Pages(items) => items,
    };

    let mut out = String::new();
    open_container(&mut out, &request.class);
    out.push_str("<ul>");
    for item in &items {
        render_item(&mut out, item, request);
    }
    out.push_str("</ul></div>");
    Ok(out)
}

fn usize_arg(args: &HashMap<String, Value>, key: &str) -> tera::Result<Option<usize>> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| tera::Error::msg(format!("`{key}` must be a non-negative integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| tera::Error::msg(format!("`{key}` must be a non-negative integer"))),
        Some(_) => Err(tera::Error::msg(format!("`{key}` must be a number"))),
    }
}

fn string_arg(args: &HashMap<String, Value>, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl PaginationRequest {
    /// Builds a request from template function arguments.
    ///
    /// Arguments that are not supplied keep the values of `self`.
    pub fn merge_args(&self, args: &HashMap<String, Value>) -> tera::Result<Self> {
        let mut request = self.clone();

        for (key, slot) in [
            ("page_index", &mut request.page_index),
            ("page_size", &mut request.page_size),
            ("row_count", &mut request.row_count),
            ("show_links", &mut request.show_links),
        ] {
            if let Some(value) = usize_arg(args, key)? {
                *slot = value;
            }
        }

        if let Some(value) = args.get("show_number_links") {
            request.show_number_links = match value {
                Value::Bool(b) => *b,
                Value::Null => false,
                Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
                Value::String(s) => !(s.is_empty() || s == "0" || s == "false"),
                _ => true,
            };
        }

        for (key, slot) in [
            ("format_href", &mut request.format_href),
            ("format_click", &mut request.format_click),
            ("first_text", &mut request.first_text),
            ("previous_text", &mut request.previous_text),
            ("pre_multi_text", &mut request.pre_multi_text),
            ("next_multi_text", &mut request.next_multi_text),
            ("next_text", &mut request.next_text),
            ("last_text", &mut request.last_text),
            ("no_result_text", &mut request.no_result_text),
            ("class", &mut request.class),
            ("current_class", &mut request.current_class),
        ] {
            if let Some(value) = string_arg(args, key) {
                *slot = value;
            }
        }

        Ok(request)
    }
}

/// Template function rendering a pagination control.
///
/// Defaults for every argument come from the wrapped request.
#[derive(Clone, Debug, Default)]
pub struct PaginationFunction {
    defaults: PaginationRequest,
}

impl PaginationFunction {
    pub fn new(defaults: PaginationRequest) -> Self {
        Self { defaults }
    }
}

impl tera::Function for PaginationFunction {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        for required in ["page_index", "page_size", "row_count"] {
            if !args.contains_key(required) {
                return Err(tera::Error::msg(format!(
                    "Function `pagination` requires the `{required}` argument"
                )));
            }
        }
        let request = self.defaults.merge_args(args)?;
        let markup = build(&request).map_err(|e| tera::Error::msg(e.to_string()))?;
        Ok(Value::String(markup))
    }

    fn is_safe(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(request: &PaginationRequest) -> Vec<PageItem> {
        match layout(request).unwrap() {
            PageLayout::Pages(items) => items,
            other => panic!("expected pages, got {other:?}"),
        }
    }

    fn link(kind: LinkKind, target: usize, text: &str) -> PageItem {
        PageItem::Link {
            kind,
            target,
            text: text.to_string(),
        }
    }

    #[test]
    fn no_rows_renders_only_the_no_result_block() {
        let mut request = PaginationRequest::new(3, 10, 0);
        request.no_result_text = "Nothing here".to_string();
        request.class = "pager".to_string();

        assert_eq!(
            build(&request).unwrap(),
            "<div class=\"pager\">\r\nNothing here</div>"
        );

        request.class.clear();
        assert_eq!(build(&request).unwrap(), "<div>\r\nNothing here</div>");
    }

    #[test]
    fn single_page_renders_nothing() {
        assert_eq!(build(&PaginationRequest::new(1, 10, 10)).unwrap(), "");
        assert_eq!(build(&PaginationRequest::new(1, 10, 3)).unwrap(), "");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert_eq!(
            build(&PaginationRequest::new(1, 0, 10)),
            Err(PaginationError::InvalidPageSize)
        );
    }

    #[test]
    fn single_block_window() {
        let items = links(&PaginationRequest::new(5, 10, 100));

        let mut expected = vec![
            link(LinkKind::First, 1, "First"),
            link(LinkKind::Previous, 4, "Previous"),
        ];
        for page in 1..=10 {
            if page == 5 {
                expected.push(PageItem::Active(5));
            } else {
                expected.push(link(LinkKind::Page, page, &page.to_string()));
            }
        }
        expected.push(link(LinkKind::Next, 6, "Next"));
        expected.push(link(LinkKind::Last, 10, "Last"));

        assert_eq!(items, expected);
    }

    #[test]
    fn first_and_last_need_text() {
        let mut request = PaginationRequest::new(5, 10, 100);
        request.first_text.clear();
        request.last_text.clear();

        let items = links(&request);

        assert!(
            !items
                .iter()
                .any(|i| matches!(i, PageItem::Link { kind: LinkKind::First | LinkKind::Last, .. }))
        );
        assert_eq!(items.first(), Some(&link(LinkKind::Previous, 4, "Previous")));
        assert_eq!(items.last(), Some(&link(LinkKind::Next, 6, "Next")));
    }

    #[test]
    fn middle_block_has_window_jumps() {
        let items = links(&PaginationRequest::new(15, 10, 300));

        assert!(items.contains(&link(LinkKind::PreviousWindow, 5, "...")));
        assert!(items.contains(&link(LinkKind::NextWindow, 25, "...")));

        let pages: Vec<usize> = items
            .iter()
            .filter_map(|item| match item {
                PageItem::Link {
                    kind: LinkKind::Page,
                    target,
                    ..
                } => Some(*target),
                PageItem::Active(page) => Some(*page),
                _ => None,
            })
            .collect();
        assert_eq!(pages, (11..=20).collect::<Vec<_>>());
    }

    #[test]
    fn next_window_is_capped_at_page_count() {
        let items = links(&PaginationRequest::new(18, 10, 250));

        assert!(items.contains(&link(LinkKind::NextWindow, 25, "...")));
    }

    #[test]
    fn last_block_is_truncated_at_page_count() {
        let items = links(&PaginationRequest::new(22, 10, 250));

        assert!(items.contains(&link(LinkKind::Page, 25, "25")));
        assert!(!items.contains(&link(LinkKind::Page, 26, "26")));
        assert!(
            !items
                .iter()
                .any(|i| matches!(i, PageItem::Link { kind: LinkKind::NextWindow, .. }))
        );
    }

    #[test]
    fn window_disabled_keeps_only_previous_and_next() {
        let mut request = PaginationRequest::new(5, 10, 100);
        request.show_number_links = false;

        assert_eq!(
            links(&request),
            vec![
                link(LinkKind::Previous, 4, "Previous"),
                link(LinkKind::Next, 6, "Next"),
            ]
        );

        request.show_number_links = true;
        request.show_links = 0;
        assert_eq!(links(&request).len(), 2);
    }

    #[test]
    fn placeholder_text_becomes_page_number() {
        let mut request = PaginationRequest::new(5, 10, 100);
        request.previous_text = "{0}".to_string();

        assert!(links(&request).contains(&link(LinkKind::Previous, 4, "4")));
    }

    #[test]
    fn empty_text_suppresses_link() {
        let mut request = PaginationRequest::new(5, 10, 100);
        request.previous_text.clear();
        request.show_number_links = false;

        assert_eq!(links(&request), vec![link(LinkKind::Next, 6, "Next")]);
        assert_eq!(
            build(&request).unwrap(),
            "<div>\r\n<ul><li><a>Next</a></li>\r\n</ul></div>"
        );
    }

    #[test]
    fn out_of_range_page_index_is_clamped() {
        let request = PaginationRequest::new(99, 10, 30);
        let items = links(&request);

        assert!(items.contains(&PageItem::Active(3)));
        assert!(
            !items
                .iter()
                .any(|i| matches!(i, PageItem::Link { kind: LinkKind::Next, .. }))
        );

        let request = PaginationRequest::new(0, 10, 30);
        assert!(links(&request).contains(&PageItem::Active(1)));
    }

    #[test]
    fn markup_substitutes_href_and_onclick() {
        let mut request = PaginationRequest::new(1, 10, 20);
        request.format_href = "?page={0}".to_string();
        request.format_click = "go({0})".to_string();
        request.current_class = "active".to_string();
        request.class = "pager".to_string();

        assert_eq!(
            build(&request).unwrap(),
            "<div class=\"pager\">\r\n<ul>\
             <li class=\"active\"><span>1</span></li>\r\n\
             <li><a onclick=\"go(2)\" href=\"?page=2\">2</a></li>\r\n\
             <li><a onclick=\"go(2)\" href=\"?page=2\">Next</a></li>\r\n\
             <li><a onclick=\"go(2)\" href=\"?page=2\">Last</a></li>\r\n\
             </ul></div>"
        );
    }

    #[test]
    fn function_merges_template_arguments() {
        use tera::Function;

        let function = PaginationFunction::default();
        let mut args = HashMap::new();
        args.insert("page_index".to_string(), Value::from(2));
        args.insert("page_size".to_string(), Value::from(10));
        args.insert("row_count".to_string(), Value::from("20"));
        args.insert("show_number_links".to_string(), Value::Bool(false));

        let value = function.call(&args).unwrap();
        assert_eq!(
            value,
            Value::String("<div>\r\n<ul><li><a>Previous</a></li>\r\n</ul></div>".to_string())
        );
        assert!(function.is_safe());

        args.remove("row_count");
        assert!(function.call(&args).is_err());
    }
}
