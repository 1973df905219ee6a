//! Inline link markup in quest descriptions.
//!
//! Planner milestones can embed `[label](url)` links. Descriptions are stored
//! untouched; this module only splits them for whoever renders them.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]+)\]\(([^()\s]+)\)").expect("valid link pattern"));

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Segment<'a> {
    Text { text: &'a str },
    Link { label: &'a str, url: &'a str },
}

pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut last = 0;
    for caps in LINK_RE.captures_iter(text) {
        let (Some(whole), Some(label), Some(url)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if whole.start() > last {
            out.push(Segment::Text {
                text: &text[last..whole.start()],
            });
        }
        out.push(Segment::Link {
            label: label.as_str(),
            url: url.as_str(),
        });
        last = whole.end();
    }
    if last < text.len() {
        out.push(Segment::Text { text: &text[last..] });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_text_and_links() {
        let parts = segments("Read [the book](https://example.com/book) then [rest](http://x.io).");
        assert_eq!(
            parts,
            vec![
                Segment::Text { text: "Read " },
                Segment::Link { label: "the book", url: "https://example.com/book" },
                Segment::Text { text: " then " },
                Segment::Link { label: "rest", url: "http://x.io" },
                Segment::Text { text: "." },
            ]
        );
    }

    #[test]
    fn plain_text_is_one_segment() {
        assert_eq!(segments("Run 5km"), vec![Segment::Text { text: "Run 5km" }]);
        assert!(segments("").is_empty());
    }

    #[test]
    fn malformed_markup_stays_text() {
        let text = "see [broken](no close and [x] (y)";
        assert_eq!(segments(text), vec![Segment::Text { text }]);
    }
}
