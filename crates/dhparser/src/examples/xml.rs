//! A mini-XML grammar: `<tag>content</tag>`, where the closing tag name
//! must match the opening one. Exercises `Capture`/`Pop` as the
//! context-sensitive mechanism for tag matching, rather than hard-coding
//! tag names into the grammar.

use crate::{Error, Grammar, GrammarBuilder};

/// `element = "<" tagname ">" content "</" tagname(pop) ">"`
pub fn build() -> Result<Grammar, Error> {
    let mut b = GrammarBuilder::new();

    let tagname = b.regexp(r"[A-Za-z][A-Za-z0-9]*")?;
    let open_name = b.capture("tag", tagname);

    let lt = b.text("<");
    let gt = b.text(">");
    let lt_slash = b.text("</");

    let open_tag = b.series(vec![lt, open_name, gt]);
    b.define("open_tag", open_tag);

    let content = b.regexp(r"[^<]*")?;
    b.define("content", content);

    // The closing tag name is mandatory once "</" has matched: a mismatch
    // is a grammar-level error, not just a failed alternative.
    let close_name = b.pop("tag", None, true);
    let close_tag = b.series_with_mandatory(vec![lt_slash, close_name, gt], 1);
    b.with_error_message(close_tag, "closing tag mismatch");
    b.with_skip_patterns(close_tag, &[r"[^>]*>"])?;
    b.define("close_tag", close_tag);

    let open_tag_ref = b.forward("open_tag");
    let content_ref = b.forward("content");
    let close_tag_ref = b.forward("close_tag");
    let element = b.series(vec![open_tag_ref, content_ref, close_tag_ref]);
    b.define("element", element);

    b.build("element")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_tags_parse_cleanly() {
        let mut grammar = build().unwrap();
        let input = dhp_core::Input::new("<tag>hello</tag>");
        let root = grammar.parse(&input);
        assert!(!root.has_blocking_errors(), "{:?}", root.errors);
    }

    #[test]
    fn mismatched_closing_tag_reports_error_and_recovers() {
        let mut grammar = build().unwrap();
        let input = dhp_core::Input::new("<tag>hi</tga>");
        let root = grammar.parse(&input);

        let mismatch = root
            .errors
            .iter()
            .find(|e| e.message == "closing tag mismatch")
            .expect("expected a closing tag mismatch error");
        assert_eq!(mismatch.position, 9);
    }
}
