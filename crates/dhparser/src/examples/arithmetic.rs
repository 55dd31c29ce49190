//! A left-recursive arithmetic-expression grammar:
//!
//! ```text
//! expr   = expr "+" term | expr "-" term | term
//! term   = term "*" factor | term "/" factor | factor
//! factor = "(" expr ")" | number
//! ```
//!
//! `expr` and `term` are directly left-recursive, exercising the engine's
//! seed-and-grow recursion support end to end.

use dhp_engine::ParserId;

use crate::{Error, Grammar, GrammarBuilder};

fn padded(builder: &mut GrammarBuilder, ws: ParserId, inner: ParserId) -> ParserId {
    let series = builder.series(vec![ws, inner]);
    builder.disposable(series, true)
}

/// Builds the grammar and returns the id of its `"expr"` root symbol,
/// along with the builder itself so callers can keep composing or just
/// call [`GrammarBuilder::build`].
pub fn build() -> Result<Grammar, Error> {
    let mut b = GrammarBuilder::new();

    let ws = b.whitespace(r"\s*")?;
    let ws = b.drop_content(ws, true);
    let ws = b.disposable(ws, true);

    let number = b.regexp(r"[0-9]+(\.[0-9]+)?")?;
    let number = b.define("number", number);

    let plus_lit = b.text("+");
    let plus = padded(&mut b, ws, plus_lit);
    let minus_lit = b.text("-");
    let minus = padded(&mut b, ws, minus_lit);
    let star_lit = b.text("*");
    let star = padded(&mut b, ws, star_lit);
    let slash_lit = b.text("/");
    let slash = padded(&mut b, ws, slash_lit);
    let lparen_lit = b.text("(");
    let lparen = padded(&mut b, ws, lparen_lit);
    let rparen_lit = b.text(")");
    let rparen = padded(&mut b, ws, rparen_lit);
    let padded_number = padded(&mut b, ws, number);

    // expr = expr "+" term | expr "-" term | term
    let expr_fwd_plus = b.forward("expr");
    let expr_fwd_minus = b.forward("expr");
    let term_fwd = b.forward("term");
    let add = b.series(vec![expr_fwd_plus, plus, term_fwd]);
    let term_fwd2 = b.forward("term");
    let sub = b.series(vec![expr_fwd_minus, minus, term_fwd2]);
    let term_fwd3 = b.forward("term");
    let expr = b.alternative(vec![add, sub, term_fwd3]);
    b.define("expr", expr);

    // term = term "*" factor | term "/" factor | factor
    let term_fwd_mul = b.forward("term");
    let factor_fwd = b.forward("factor");
    let mul = b.series(vec![term_fwd_mul, star, factor_fwd]);
    let term_fwd_div = b.forward("term");
    let factor_fwd2 = b.forward("factor");
    let div = b.series(vec![term_fwd_div, slash, factor_fwd2]);
    let factor_fwd3 = b.forward("factor");
    let term = b.alternative(vec![mul, div, factor_fwd3]);
    b.define("term", term);

    // factor = "(" expr ")" | number
    let expr_fwd_paren = b.forward("expr");
    let grouped = b.series(vec![lparen, expr_fwd_paren, rparen]);
    let factor = b.alternative(vec![grouped, padded_number]);
    b.define("factor", factor);

    b.build("expr")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_operator_precedence_shape() {
        let mut grammar = build().unwrap();
        let input = dhp_core::Input::new("3 + 4 * (5 - 1)");
        let root = grammar.parse(&input);
        assert!(!root.has_blocking_errors(), "{:?}", root.errors);
        assert_eq!(root.tree.content_len(), "3 + 4 * (5 - 1)".len());
    }

    #[test]
    fn single_number_parses() {
        let mut grammar = build().unwrap();
        let input = dhp_core::Input::new("42");
        let root = grammar.parse(&input);
        assert!(!root.has_blocking_errors());
    }
}
