//! Parser graph type definitions.
//!
//! A grammar is a graph of [`Parser`] nodes identified by [`ParserId`], the
//! equivalence class used for memoization (two parsers share a class when
//! the builder assigns them the same id, which it does for pointer-equal
//! named-symbol targets and for structurally identical anonymous
//! sub-expressions).

use std::cell::Cell;

use dhp_core::Symbol;
use fancy_regex::Regex;

/// Index into the grammar's parser arena; doubles as the memoization
/// equivalence class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParserId(pub u32);

/// Minimum/maximum repetition count for [`ParserKind::Counted`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub min: usize,
    pub max: Option<usize>,
}

impl Range {
    pub fn contains(&self, n: usize) -> bool {
        n >= self.min && self.max.is_none_or(|max| n <= max)
    }
}

/// One operand of an [`ParserKind::Interleave`], with its own repetition
/// range and mandatory flag.
#[derive(Clone, Debug)]
pub struct InterleaveOperand {
    pub parser: ParserId,
    pub range: Range,
    pub mandatory: bool,
}

/// A source location (regex or nested-parser reference) the local-recovery
/// scan tries in order until one matches.
#[derive(Clone, Debug)]
pub enum RecoveryRule {
    Pattern(Regex),
    Parser(ParserId),
}

/// A node in the combinator graph.
#[derive(Clone, Debug)]
pub struct Parser {
    pub id: ParserId,
    /// Symbolic name; `None` for anonymous sub-expressions.
    pub name: Option<Symbol>,
    /// Elidable during tree reduction.
    pub disposable: bool,
    /// Discards matched text while still advancing position.
    pub drop_content: bool,
    pub kind: ParserKind,
}

/// The closed set of combinator variants. Dispatched with a single `match`
/// in [`crate::grammar::Grammar::parse_at`] rather than through a vtable,
/// since the variant set never grows after a grammar is built.
#[derive(Clone, Debug)]
pub enum ParserKind {
    /// Matches a literal string; produces an anonymous leaf.
    Text(String),
    /// Matches a Perl-compatible regular expression at the current location.
    RegExp { pattern: Regex, is_whitespace: bool },
    /// Matches a sentinel-wrapped token emitted by an external preprocessor.
    PreprocessorToken(Symbol),
    /// `A?`: matches `A` or the empty string; always succeeds.
    Option(ParserId),
    /// `{A}`: matches `A` repeatedly; refuses to iterate an empty match.
    ZeroOrMore(ParserId),
    /// `A+`: like `ZeroOrMore` but requires at least one match.
    OneOrMore(ParserId),
    /// `A{m,n}`: succeeds only if the match count falls in range.
    Counted { inner: ParserId, range: Range },
    /// `A B C`: concatenation with a mandatory index marking the `§` point.
    Series {
        parts: Vec<ParserId>,
        mandatory_index: usize,
        skip: Vec<RecoveryRule>,
        error_message: Option<String>,
    },
    /// `A | B | …`: first-match-wins ordered choice.
    Alternative(Vec<ParserId>),
    /// `Alternative` specialized with a first-character dispatch table over
    /// constant-prefix branches, falling back to the rest in order.
    TextAlternative {
        by_first_byte: Vec<(u8, Vec<ParserId>)>,
        fallback: Vec<ParserId>,
    },
    /// `A ° B ° C`: matches operands in any order, each within its range.
    Interleave(Vec<InterleaveOperand>),
    /// Consumes zero input; matches iff the sub-parser matches here.
    Lookahead { inner: ParserId, negative: bool },
    /// Consumes zero input; matches iff the sub-parser matches the reversed
    /// prefix ending here (pattern must be written in reversed form).
    Lookbehind { inner: ParserId, negative: bool },
    /// A transparent wrapper giving a symbol name to another parser without
    /// an extra tree level once reduced.
    Synonym(ParserId),
    /// Placeholder filled in after construction to close grammar cycles.
    Forward(Cell<Option<ParserId>>),
    /// Parses the sub-parser and pushes its match onto the named capture
    /// stack.
    Capture { symbol: Symbol, inner: ParserId },
    /// Matches the input literally against the top of the named capture
    /// stack, optionally through a registered filter function.
    Retrieve { symbol: Symbol, filter: Option<Symbol> },
    /// Like `Retrieve` but additionally pops the stack on match (or always,
    /// if `pop_on_failure` is set).
    Pop {
        symbol: Symbol,
        filter: Option<Symbol>,
        pop_on_failure: bool,
    },
}

impl Parser {
    pub fn new(id: ParserId, name: Option<Symbol>, kind: ParserKind) -> Self {
        Self {
            id,
            name,
            disposable: false,
            drop_content: false,
            kind,
        }
    }

    pub fn disposable(mut self, disposable: bool) -> Self {
        self.disposable = disposable;
        self
    }

    pub fn drop_content(mut self, drop: bool) -> Self {
        self.drop_content = drop;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_contains_bounded() {
        let r = Range { min: 1, max: Some(3) };
        assert!(!r.contains(0));
        assert!(r.contains(1));
        assert!(r.contains(3));
        assert!(!r.contains(4));
    }

    #[test]
    fn range_contains_unbounded() {
        let r = Range { min: 0, max: None };
        assert!(r.contains(0));
        assert!(r.contains(1_000_000));
    }
}
