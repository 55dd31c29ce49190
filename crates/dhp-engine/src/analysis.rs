//! Static analysis of a grammar's parser graph, run once at construction
//! time rather than per-parse. Findings accumulate into a [`Diagnostics`]
//! value; callers decide whether an error-severity diagnostic blocks use of
//! the grammar (see [`crate::error::GrammarError::StaticAnalysisFailed`]).
//!
//! Implemented as a `Visitor`-style walk over the parser graph, grounded on
//! the teacher's `Visitor` trait and `ref_nodes`/`contains_ref` helpers for
//! walking its AST by reference rather than by owned traversal.

use std::collections::HashMap;

use dhp_core::Symbol;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::grammar::Grammar;
use crate::parser::{Parser, ParserId, ParserKind};

/// A read-only walk over every reachable parser in the graph. Implement
/// this to add a new analysis pass without touching the others.
pub trait Visitor {
    fn visit(&mut self, grammar: &Grammar, parser: &Parser);
}

/// Visit every parser reachable from `grammar`'s root, each exactly once.
pub fn walk(grammar: &Grammar, visitor: &mut impl Visitor) {
    let mut seen = vec![false; grammar_parser_count(grammar)];
    let root = grammar.root_id();
    walk_from(grammar, root, &mut seen, visitor);
}

fn grammar_parser_count(grammar: &Grammar) -> usize {
    grammar.parser_count()
}

fn walk_from(grammar: &Grammar, id: ParserId, seen: &mut [bool], visitor: &mut impl Visitor) {
    let idx = id.0 as usize;
    if seen[idx] {
        return;
    }
    seen[idx] = true;

    let parser = grammar.parser(id);
    visitor.visit(grammar, parser);

    for child in children_of(parser) {
        walk_from(grammar, child, seen, visitor);
    }
}

/// The direct sub-parser references of a parser, for graph traversal.
pub fn children_of(parser: &Parser) -> Vec<ParserId> {
    match &parser.kind {
        ParserKind::Text(_)
        | ParserKind::RegExp { .. }
        | ParserKind::PreprocessorToken(_)
        | ParserKind::Retrieve { .. }
        | ParserKind::Pop { .. } => vec![],
        ParserKind::Option(inner)
        | ParserKind::ZeroOrMore(inner)
        | ParserKind::OneOrMore(inner)
        | ParserKind::Counted { inner, .. }
        | ParserKind::Synonym(inner)
        | ParserKind::Capture { inner, .. } => vec![*inner],
        ParserKind::Lookahead { inner, .. } | ParserKind::Lookbehind { inner, .. } => vec![*inner],
        ParserKind::Series { parts, .. } | ParserKind::Alternative(parts) => parts.clone(),
        ParserKind::TextAlternative {
            by_first_byte,
            fallback,
        } => by_first_byte
            .iter()
            .flat_map(|(_, ids)| ids.iter().copied())
            .chain(fallback.iter().copied())
            .collect(),
        ParserKind::Interleave(operands) => operands.iter().map(|op| op.parser).collect(),
        ParserKind::Forward(target) => target.get().into_iter().collect(),
    }
}

/// Runs every check in this module and returns the accumulated findings.
pub fn analyze(grammar: &Grammar) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    check_unresolved_forwards(grammar, &mut diagnostics);
    check_nonterminating_repetitions(grammar, &mut diagnostics);
    check_unreachable_alternatives(grammar, &mut diagnostics);
    check_left_recursion_without_base_case(grammar, &mut diagnostics);
    check_misplaced_mandatory_markers(grammar, &mut diagnostics);
    diagnostics
}

fn check_unresolved_forwards(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    struct Check<'d> {
        diagnostics: &'d mut Diagnostics,
    }
    impl Visitor for Check<'_> {
        fn visit(&mut self, _grammar: &Grammar, parser: &Parser) {
            if let ParserKind::Forward(target) = &parser.kind
                && target.get().is_none()
            {
                let mut diag = Diagnostic::error("Forward parser was never resolved to a target");
                if let Some(name) = parser.name {
                    diag = diag.at_symbol(name);
                }
                self.diagnostics.push(diag);
            }
        }
    }
    walk(grammar, &mut Check { diagnostics });
}

/// A parser "can match empty" if there exists some input position at which
/// it succeeds while consuming zero bytes. Used both to flag non-
/// terminating `ZeroOrMore`/`OneOrMore` bodies and to find base cases for
/// left-recursion.
fn is_potentially_nullable(grammar: &Grammar, id: ParserId, visiting: &mut Vec<ParserId>) -> bool {
    if visiting.contains(&id) {
        // A cycle reached without resolving nullability independently is
        // treated as non-nullable here; `check_left_recursion_without_base_case`
        // reports the cycle itself.
        return false;
    }
    visiting.push(id);
    let result = match &grammar.parser(id).kind {
        ParserKind::Text(s) => s.is_empty(),
        ParserKind::RegExp { .. } => false,
        ParserKind::PreprocessorToken(_) => false,
        ParserKind::Option(_) => true,
        ParserKind::ZeroOrMore(_) => true,
        ParserKind::OneOrMore(inner) => is_potentially_nullable(grammar, *inner, visiting),
        ParserKind::Counted { inner, range } => {
            range.min == 0 || is_potentially_nullable(grammar, *inner, visiting)
        }
        ParserKind::Series {
            parts,
            mandatory_index,
            ..
        } => {
            // All parts up to the mandatory index must be nullable for the
            // whole series to be nullable; elements at/after it recover via
            // a zombie node rather than truly matching empty, so they don't
            // contribute to nullability.
            parts
                .iter()
                .take((*mandatory_index).min(parts.len()))
                .all(|p| is_potentially_nullable(grammar, *p, visiting))
        }
        ParserKind::Alternative(parts) | ParserKind::TextAlternative { fallback: parts, .. } => {
            parts.iter().any(|p| is_potentially_nullable(grammar, *p, visiting))
        }
        ParserKind::Interleave(operands) => {
            operands.iter().all(|op| op.range.min == 0)
        }
        ParserKind::Lookahead { .. } | ParserKind::Lookbehind { .. } => true,
        ParserKind::Synonym(inner) | ParserKind::Capture { inner, .. } => {
            is_potentially_nullable(grammar, *inner, visiting)
        }
        ParserKind::Forward(target) => target
            .get()
            .is_some_and(|t| is_potentially_nullable(grammar, t, visiting)),
        ParserKind::Retrieve { .. } => false,
        ParserKind::Pop { .. } => false,
    };
    visiting.pop();
    result
}

fn check_nonterminating_repetitions(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    struct Check<'d> {
        diagnostics: &'d mut Diagnostics,
    }
    impl Visitor for Check<'_> {
        fn visit(&mut self, grammar: &Grammar, parser: &Parser) {
            let inner = match &parser.kind {
                ParserKind::ZeroOrMore(inner) | ParserKind::OneOrMore(inner) => Some(*inner),
                _ => None,
            };
            if let Some(inner) = inner
                && is_potentially_nullable(grammar, inner, &mut Vec::new())
            {
                let mut diag = Diagnostic::warning(
                    "repetition body can match the empty string; the engine will stop after one empty iteration",
                );
                if let Some(name) = parser.name {
                    diag = diag.at_symbol(name);
                }
                self.diagnostics.push(diag);
            }
        }
    }
    walk(grammar, &mut Check { diagnostics });
}

/// Conservative check: an earlier `Text` alternative that is a literal
/// prefix of (or equal to) a later `Text` alternative makes the later one
/// unreachable under ordered choice.
fn check_unreachable_alternatives(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    struct Check<'d> {
        diagnostics: &'d mut Diagnostics,
    }
    impl Visitor for Check<'_> {
        fn visit(&mut self, grammar: &Grammar, parser: &Parser) {
            let branches = match &parser.kind {
                ParserKind::Alternative(b) => b.clone(),
                _ => return,
            };
            for i in 0..branches.len() {
                for j in (i + 1)..branches.len() {
                    if let (ParserKind::Text(a), ParserKind::Text(b)) = (
                        &grammar.parser(branches[i]).kind,
                        &grammar.parser(branches[j]).kind,
                    ) && b.starts_with(a.as_str())
                    {
                        let mut diag = Diagnostic::warning(format!(
                            "alternative {j} is unreachable: an earlier alternative matches every input it could match"
                        ));
                        if let Some(name) = parser.name {
                            diag = diag.at_symbol(name);
                        }
                        self.diagnostics.push(diag);
                    }
                }
            }
        }
    }
    walk(grammar, &mut Check { diagnostics });
}

/// A named parser's left corner: the set of parsers it can call at its own
/// starting location without first consuming input.
fn left_corner(grammar: &Grammar, id: ParserId, out: &mut Vec<ParserId>, visiting: &mut Vec<ParserId>) {
    if visiting.contains(&id) {
        return;
    }
    visiting.push(id);
    out.push(id);
    match &grammar.parser(id).kind {
        ParserKind::Option(inner)
        | ParserKind::ZeroOrMore(inner)
        | ParserKind::OneOrMore(inner)
        | ParserKind::Counted { inner, .. }
        | ParserKind::Synonym(inner)
        | ParserKind::Capture { inner, .. } => left_corner(grammar, *inner, out, visiting),
        ParserKind::Series { parts, .. } => {
            if let Some(&first) = parts.first() {
                left_corner(grammar, first, out, visiting);
            }
        }
        ParserKind::Alternative(parts) | ParserKind::TextAlternative { fallback: parts, .. } => {
            for &p in parts {
                left_corner(grammar, p, out, visiting);
            }
        }
        ParserKind::Interleave(operands) => {
            for op in operands {
                left_corner(grammar, op.parser, out, visiting);
            }
        }
        ParserKind::Forward(target) => {
            if let Some(t) = target.get() {
                left_corner(grammar, t, out, visiting);
            }
        }
        _ => {}
    }
    visiting.pop();
}

/// A named parser participates in unguarded left recursion when it appears
/// in its own left corner with no nullable base case breaking the cycle.
fn check_left_recursion_without_base_case(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    struct Check<'d> {
        diagnostics: &'d mut Diagnostics,
    }
    impl Visitor for Check<'_> {
        fn visit(&mut self, grammar: &Grammar, parser: &Parser) {
            let Some(name) = parser.name else { return };
            let mut corner = Vec::new();
            left_corner(grammar, parser.id, &mut corner, &mut Vec::new());
            if corner.contains(&parser.id) && corner.len() > 1 {
                let has_base_case = matches!(&parser.kind, ParserKind::Alternative(branches) if branches
                    .iter()
                    .any(|b| !left_corner_contains(grammar, *b, parser.id)));
                if !has_base_case {
                    self.diagnostics.push(
                        Diagnostic::error(
                            "left-recursive parser has no non-recursive alternative to serve as a base case",
                        )
                        .at_symbol(name),
                    );
                }
            }
        }
    }
    walk(grammar, &mut Check { diagnostics });
}

fn left_corner_contains(grammar: &Grammar, id: ParserId, target: ParserId) -> bool {
    let mut corner = Vec::new();
    left_corner(grammar, id, &mut corner, &mut Vec::new());
    corner.contains(&target)
}

/// A Series' mandatory marker placed at or before an element that can never
/// fail (e.g. an `Option` or `ZeroOrMore`) can never actually trigger error
/// recovery.
fn check_misplaced_mandatory_markers(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    struct Check<'d> {
        diagnostics: &'d mut Diagnostics,
    }
    impl Visitor for Check<'_> {
        fn visit(&mut self, grammar: &Grammar, parser: &Parser) {
            let ParserKind::Series {
                parts,
                mandatory_index,
                ..
            } = &parser.kind
            else {
                return;
            };
            if *mandatory_index >= parts.len() {
                return;
            }
            for &part in &parts[*mandatory_index..] {
                if always_matches(grammar, part) {
                    let mut diag = Diagnostic::warning(
                        "mandatory marker placed before an element that can never fail",
                    );
                    if let Some(name) = parser.name {
                        diag = diag.at_symbol(name);
                    }
                    self.diagnostics.push(diag);
                }
            }
        }
    }
    walk(grammar, &mut Check { diagnostics });
}

fn always_matches(grammar: &Grammar, id: ParserId) -> bool {
    matches!(
        &grammar.parser(id).kind,
        ParserKind::Option(_) | ParserKind::ZeroOrMore(_)
    )
}

/// Undefined-symbol check for a registry built before Forward resolution:
/// every referenced name must exist in the symbol table.
pub fn check_undefined_symbols(
    referenced: &[Symbol],
    defined: &HashMap<Symbol, ParserId>,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::new();
    for &symbol in referenced {
        if !defined.contains_key(&symbol) {
            diagnostics.push(Diagnostic::error("reference to an undefined symbol").at_symbol(symbol));
        }
    }
    diagnostics
}
