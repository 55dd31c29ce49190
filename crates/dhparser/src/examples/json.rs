//! A JSON grammar demonstrating mandatory-marker error recovery: a member
//! is `string ":" §value` — once the colon has matched, a missing value
//! is a grammar-level error (not a silent alternative-branch failure),
//! and the engine's skip-recovery kicks in so that one malformed member
//! doesn't abort parsing the rest of the object.

use dhp_engine::ParserId;

use crate::{Error, Grammar, GrammarBuilder};

fn padded(b: &mut GrammarBuilder, ws: ParserId, inner: ParserId) -> ParserId {
    let series = b.series(vec![ws, inner]);
    b.disposable(series, true)
}

pub fn build() -> Result<Grammar, Error> {
    let mut b = GrammarBuilder::new();

    let ws = b.whitespace(r"\s*")?;
    let ws = b.drop_content(ws, true);
    let ws = b.disposable(ws, true);

    let string = b.regexp(r#""[^"]*""#)?;
    let string = b.define("string", string);

    let number = b.regexp(r"-?[0-9]+(\.[0-9]+)?")?;
    let number = b.define("number", number);

    let true_lit = b.text("true");
    let false_lit = b.text("false");
    let null_lit = b.text("null");

    let colon_lit = b.text(":");
    let colon = padded(&mut b, ws, colon_lit);
    let comma_lit = b.text(",");
    let comma = padded(&mut b, ws, comma_lit);
    let lbrace_lit = b.text("{");
    let lbrace = padded(&mut b, ws, lbrace_lit);
    let rbrace_lit = b.text("}");
    let rbrace = padded(&mut b, ws, rbrace_lit);
    let lbracket_lit = b.text("[");
    let lbracket = padded(&mut b, ws, lbracket_lit);
    let rbracket_lit = b.text("]");
    let rbracket = padded(&mut b, ws, rbracket_lit);

    // value = object | array | string | number | true | false | null
    let object_fwd = b.forward("object");
    let array_fwd = b.forward("array");
    let padded_string = padded(&mut b, ws, string);
    let padded_number = padded(&mut b, ws, number);
    let padded_true = padded(&mut b, ws, true_lit);
    let padded_false = padded(&mut b, ws, false_lit);
    let padded_null = padded(&mut b, ws, null_lit);
    let value = b.alternative(vec![
        object_fwd,
        array_fwd,
        padded_string,
        padded_number,
        padded_true,
        padded_false,
        padded_null,
    ]);
    b.define("value", value);

    // member = string ":" §value, with skip-recovery scanning to the next
    // "," or "}" when the value is missing.
    let member_string = padded(&mut b, ws, string);
    let value_fwd = b.forward("value");
    let member = b.series_with_mandatory(vec![member_string, colon, value_fwd], 2);
    b.with_skip_patterns(member, &[r"[^,}]*"])?;
    b.with_error_message(member, "expected a value after ':'");
    b.define("member", member);

    // object = "{" (member ("," member)*)? "}"
    let member_fwd = b.forward("member");
    let member_fwd2 = b.forward("member");
    let more_members_body = b.series(vec![comma, member_fwd2]);
    let more_members = b.zero_or_more(more_members_body);
    let members = b.series(vec![member_fwd, more_members]);
    let members_opt = b.option(members);
    let object = b.series(vec![lbrace, members_opt, rbrace]);
    b.define("object", object);

    // array = "[" (value ("," value)*)? "]"
    let value_fwd2 = b.forward("value");
    let value_fwd3 = b.forward("value");
    let more_items_body = b.series(vec![comma, value_fwd3]);
    let more_items = b.zero_or_more(more_items_body);
    let items = b.series(vec![value_fwd2, more_items]);
    let items_opt = b.option(items);
    let array = b.series(vec![lbracket, items_opt, rbracket]);
    b.define("array", array);

    b.build("value")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_object() {
        let mut grammar = build().unwrap();
        let input = dhp_core::Input::new(r#"{"a":1,"b":2}"#);
        let root = grammar.parse(&input);
        assert!(!root.has_blocking_errors(), "{:?}", root.errors);
    }

    #[test]
    fn missing_value_triggers_mandatory_marker_recovery() {
        let mut grammar = build().unwrap();
        let input = dhp_core::Input::new(r#"{"a":1,"b":}"#);
        let root = grammar.parse(&input);
        assert!(root.errors.iter().any(|e| e.code >= 1000));
        let mandatory_error = root.errors.iter().find(|e| e.code >= 1000).unwrap();
        assert_eq!(mandatory_error.position, 11);
    }
}
