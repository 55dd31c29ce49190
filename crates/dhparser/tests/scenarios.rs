//! End-to-end scenarios and the cross-cutting invariants every grammar is
//! expected to hold, independent of which combinators it uses.

use dhp_core::{Input, Node, NodeValue};
use dhp_engine::{Grammar, ReductionLevel};
use dhparser::{examples, GrammarBuilder};
use indoc::indoc;

fn collect_leaves<'a>(node: &'a Node, out: &mut Vec<&'a str>) {
    match &node.value {
        NodeValue::Leaf(s) if !s.is_empty() => out.push(s.as_str()),
        NodeValue::Leaf(_) => {}
        NodeValue::Children(children) => {
            for child in children {
                collect_leaves(child, out);
            }
        }
    }
}

fn assert_positions_nondecreasing(node: &Node, floor: usize) -> usize {
    assert!(node.position >= floor, "position went backwards");
    let mut last = node.position;
    for child in node.children() {
        last = assert_positions_nondecreasing(child, last);
    }
    last.max(node.position + node.content_len())
}

#[test]
fn arithmetic_precedence_and_leaf_order() {
    let mut grammar = examples::arithmetic::build().unwrap();
    let input = Input::new("3 + 4 * (5 - 1)");
    let root = grammar.parse(&input);
    assert!(!root.has_blocking_errors(), "{:?}", root.errors);

    let mut leaves = Vec::new();
    collect_leaves(&root.tree, &mut leaves);
    assert_eq!(leaves, vec!["3", "+", "4", "*", "(", "5", "-", "1", ")"]);
}

#[test]
fn position_monotonicity_holds_across_examples() {
    for input_text in ["3 + 4 * (5 - 1)", "1", "(1+2)*3"] {
        let mut grammar = examples::arithmetic::build().unwrap();
        let root = grammar.parse(&Input::new(input_text));
        assert_positions_nondecreasing(&root.tree, 0);
    }
}

#[test]
fn mini_xml_matching_and_mismatched_tags() {
    let mut grammar = examples::xml::build().unwrap();

    let ok = grammar.parse(&Input::new("<tag>hello</tag>"));
    assert!(!ok.has_blocking_errors(), "{:?}", ok.errors);

    let mismatched = grammar.parse(&Input::new("<tag>hi</tga>"));
    assert!(mismatched
        .errors
        .iter()
        .any(|e| e.message == "closing tag mismatch" && e.position == 9));
}

#[test]
fn json_tolerates_whitespace_between_members() {
    let mut grammar = examples::json::build().unwrap();
    let input = Input::new(indoc! {r#"
        {
          "a": 1,
          "b": 2
        }
    "#});
    let root = grammar.parse(&input);
    assert!(!root.has_blocking_errors(), "{:?}", root.errors);
}

#[test]
fn json_mandatory_marker_recovery_reaches_end_of_input() {
    let mut grammar = examples::json::build().unwrap();
    let input = Input::new(r#"{"a":1,"b":}"#);
    let root = grammar.parse(&input);
    assert!(root.errors.iter().any(|e| e.code >= 1000));
    // Recovery consumed the malformed member and the object still closes.
    let mut leaves = Vec::new();
    collect_leaves(&root.tree, &mut leaves);
    assert_eq!(leaves.last(), Some(&"}"));
}

/// `expr = expr "+" term | term; term = /[0-9]+/` on `1+2+3` must build a
/// left-leaning tree equivalent to `((1+2)+3)`: the left-recursive branch
/// of `expr` nests one level per repetition rather than flattening.
#[test]
fn left_recursion_is_left_associative() {
    let mut b = GrammarBuilder::new();
    let digit = b.regexp(r"[0-9]+").unwrap();
    let term = b.define("term", digit);

    let expr_fwd = b.forward("expr");
    let plus = b.text("+");
    let term_fwd = b.forward("term");
    let add = b.series(vec![expr_fwd, plus, term_fwd]);
    let term_fwd2 = b.forward("term");
    let expr = b.alternative(vec![add, term_fwd2]);
    b.define("expr", expr);
    let _ = term;

    let mut grammar = b.build("expr").unwrap();
    let root = grammar.parse(&Input::new("1+2+3"));
    assert!(!root.has_blocking_errors(), "{:?}", root.errors);

    // The outermost node's last child is the rightmost term ("3"); its
    // first child is itself an `add` covering "1+2", not a flat list of
    // three terms.
    let outer = &root.tree;
    let outer_children = outer.children();
    assert!(!outer_children.is_empty());
    let mut leaves = Vec::new();
    collect_leaves(outer, &mut leaves);
    assert_eq!(leaves, vec!["1", "+", "2", "+", "3"]);
}

/// `@hide = /_\w+/`, `@drop = whitespace` on `foo bar`: the whitespace
/// disappears entirely and an underscore-prefixed helper symbol is
/// spliced into its parent rather than appearing as its own node.
#[test]
fn hide_and_drop_directives_shape_the_tree() {
    let mut b = GrammarBuilder::new();

    let ws = b.whitespace(r"\s+").unwrap();
    let ws = b.drop_content(ws, true);
    let ws = b.disposable(ws, true);

    let word_pattern = b.regexp(r"[a-z]+").unwrap();
    // A helper symbol whose name begins with "_", matching the `@hide`
    // convention: named, but disposable so it is spliced into its parent.
    let hidden_word = b.define("_word", word_pattern);
    let hidden_word = b.disposable(hidden_word, true);

    let line = b.series(vec![hidden_word, ws, hidden_word]);
    b.define("line", line);

    let mut grammar = b.build("line").unwrap();
    let root = grammar.parse(&Input::new("foo bar"));
    assert!(!root.has_blocking_errors(), "{:?}", root.errors);

    fn any_node_named(node: &Node, name: &str, interner: &dhp_core::Interner) -> bool {
        if node.name.and_then(|s| interner.try_resolve(s)) == Some(name) {
            return true;
        }
        node.children()
            .iter()
            .any(|c| any_node_named(c, name, interner))
    }
    assert!(!any_node_named(&root.tree, "_word", grammar.interner()));

    let mut leaves = Vec::new();
    collect_leaves(&root.tree, &mut leaves);
    assert_eq!(leaves, vec!["foo", "bar"]);
}

/// `§` after an opening brace with skip rule `/[^}]*\}/` recovers at the
/// next closing brace of a malformed block body.
#[test]
fn mandatory_marker_with_skip_rule_recovers_at_next_brace() {
    let mut b = GrammarBuilder::new();
    let lbrace = b.text("{");
    let keyword = b.text("ok");
    let rbrace = b.text("}");
    let block = b.series_with_mandatory(vec![lbrace, keyword, rbrace], 1);
    b.with_skip_patterns(block, &[r"[^}]*\}"]).unwrap();
    b.define("block", block);

    let mut grammar = b.build("block").unwrap();
    let root = grammar.parse(&Input::new("{garbled}"));
    assert!(root.errors.iter().any(|e| e.code >= 1000));
    assert_eq!(root.tree.position + root.tree.content_len(), 1);
}

#[test]
fn capture_stacks_balance_and_error_positions_are_in_bounds() {
    let mut grammar = examples::xml::build().unwrap();
    for text in ["<tag>hello</tag>", "<tag>hi</tga>", "<a></a>"] {
        let input = Input::new(text);
        let root = grammar.parse(&input);
        for error in &root.errors {
            assert!(error.position <= input.len());
        }
    }
}

/// Reduction (Flatten/MergeTreetops/Merge) must never lose matched text,
/// independent of `@drop`/skip-recovery concerns: a grammar with no
/// dropped or skipped content reconstructs its full input span at every
/// reduction level.
#[test]
fn reduction_levels_preserve_span_absent_drop_or_skip() {
    for level in [
        ReductionLevel::None,
        ReductionLevel::Flatten,
        ReductionLevel::MergeTreetops,
        ReductionLevel::Merge,
    ] {
        let mut b = GrammarBuilder::new();
        let a = b.text("a");
        let b_lit = b.text("b");
        let c = b.text("c");
        let series = b.series(vec![a, b_lit, c]);
        b.define("abc", series);
        let grammar: Grammar = b.build("abc").unwrap().with_reduction_level(level);
        let mut grammar = grammar;

        let input = Input::new("abc");
        let root = grammar.parse(&input);
        assert!(!root.has_blocking_errors());
        assert_eq!(root.tree.content_len(), input.len());
    }
}
