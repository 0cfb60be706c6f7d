//! Conversion of server-rendered post HTML into terminal text.
//!
//! The markup is displayed as-is: nothing is removed for safety reasons, it
//! is only laid out for a character grid. Mastodon wraps long URLs in
//! `invisible`/`ellipsis` spans, which are honoured the way its web UI
//! does.

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// One logical line of a post body. An empty `text` is a paragraph gap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextLine {
    pub text: String,
    /// Words that came from inside an `<a>` element
    pub link_words: HashSet<String>,
}

impl TextLine {
    pub fn is_link_word(&self, word: &str) -> bool {
        self.link_words.contains(word)
    }
}

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "blockquote", "pre", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Elements whose content is never displayed text.
const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "template"];

#[derive(Default)]
struct Collector {
    lines: Vec<TextLine>,
    current: TextLine,
    link_depth: usize,
    link_start: usize,
}

impl Collector {
    fn push_text(&mut self, raw: &str) {
        let mut collapsed = String::with_capacity(raw.len());
        let mut last_space = self.current.text.is_empty() || self.current.text.ends_with(' ');
        for c in raw.chars() {
            if c.is_whitespace() {
                if !last_space {
                    collapsed.push(' ');
                    last_space = true;
                }
            } else {
                collapsed.push(c);
                last_space = false;
            }
        }
        self.current.text.push_str(&collapsed);
    }

    fn mark_link_words(&mut self) {
        let start = self.link_start.min(self.current.text.len());
        let words: Vec<String> = self.current.text[start..]
            .split_whitespace()
            .map(str::to_string)
            .collect();
        self.current.link_words.extend(words);
    }

    fn break_line(&mut self) {
        if self.link_depth > 0 {
            self.mark_link_words();
        }
        self.link_start = 0;
        let mut line = std::mem::take(&mut self.current);
        line.text.truncate(line.text.trim_end().len());
        self.lines.push(line);
    }

    fn break_paragraph(&mut self) {
        if !self.current.text.is_empty() {
            self.break_line();
        }
        if self.lines.last().is_some_and(|l| !l.text.is_empty()) {
            self.lines.push(TextLine::default());
        }
    }

    fn walk(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => self.push_text(text),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.element(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        let has_class = |class: &str| element.value().classes().any(|c| c == class);

        if NON_TEXT_ELEMENTS.contains(&name) || has_class("invisible") {
            return;
        }

        match name {
            "br" => self.break_line(),
            "a" => {
                if self.link_depth == 0 {
                    self.link_start = self.current.text.len();
                }
                self.link_depth += 1;
                self.walk(element);
                self.link_depth -= 1;
                if self.link_depth == 0 {
                    self.mark_link_words();
                }
            }
            _ if BLOCK_ELEMENTS.contains(&name) => {
                self.break_paragraph();
                self.walk(element);
                self.break_paragraph();
            }
            _ => {
                self.walk(element);
                if has_class("ellipsis") {
                    self.push_text("…");
                }
            }
        }
    }

    fn finish(mut self) -> Vec<TextLine> {
        if !self.current.text.is_empty() {
            self.break_line();
        }
        while self.lines.last().is_some_and(|l| l.text.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Lay out a post body as lines of plain text, one per paragraph or `<br>`.
pub fn html_to_lines(html: &str) -> Vec<TextLine> {
    let fragment = Html::parse_fragment(html);
    let mut collector = Collector::default();
    collector.walk(fragment.root_element());
    collector.finish()
}

/// Targets of every link in the body, in document order, without duplicates.
pub fn extract_links(html: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let fragment = Html::parse_fragment(html);
    let mut seen = HashSet::new();
    fragment
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| seen.insert(href.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(html: &str) -> Vec<String> {
        html_to_lines(html).into_iter().map(|l| l.text).collect()
    }

    #[test]
    fn test_single_paragraph() {
        assert_eq!(texts("<p>Hello world</p>"), vec!["Hello world"]);
    }

    #[test]
    fn test_paragraphs_are_separated_by_gap() {
        assert_eq!(
            texts("<p>first</p><p>second</p>"),
            vec!["first", "", "second"]
        );
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(texts("<p>one<br>two<br/>three</p>"), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_whitespace_collapses() {
        assert_eq!(texts("<p>  lots \n of\t space  </p>"), vec!["lots of space"]);
    }

    #[test]
    fn test_entities_are_decoded() {
        assert_eq!(texts("<p>a &amp; b &lt;3</p>"), vec!["a & b <3"]);
    }

    #[test]
    fn test_link_words_are_marked() {
        let lines = html_to_lines(
            r#"<p>hi <a href="https://miao.social/@neko" class="u-url mention">@<span>neko</span></a> there</p>"#,
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "hi @neko there");
        assert!(lines[0].is_link_word("@neko"));
        assert!(!lines[0].is_link_word("hi"));
        assert!(!lines[0].is_link_word("there"));
    }

    #[test]
    fn test_mastodon_url_shortening() {
        let html = r#"<p><a href="https://example.org/a/very/long/path"><span class="invisible">https://</span><span class="ellipsis">example.org/a/very</span><span class="invisible">/long/path</span></a></p>"#;
        let lines = html_to_lines(html);
        assert_eq!(lines[0].text, "example.org/a/very…");
        assert!(lines[0].is_link_word("example.org/a/very…"));
    }

    #[test]
    fn test_plain_text_body() {
        assert_eq!(texts("just text"), vec!["just text"]);
    }

    #[test]
    fn test_empty_body() {
        assert!(html_to_lines("").is_empty());
    }

    #[test]
    fn test_extract_links_dedupes_in_order() {
        let html = r#"<p><a href="https://a.example">a</a> <a href="https://b.example">b</a> <a href="https://a.example">again</a></p>"#;
        assert_eq!(
            extract_links(html),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }
}
