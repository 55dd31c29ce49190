//! Grammar construction: the factory/registry shape of the external
//! "EBNF compiler collaborator" interface (see the grammar-construction
//! section of the top-level design notes). Instantiates parsers, wires
//! named references through a registry, and resolves `Forward`
//! placeholders once every parser exists.

use std::cell::Cell;

use dhp_core::{Interner, Symbol};
use dhp_engine::{Grammar, InterleaveOperand, Parser, ParserId, ParserKind, RecoveryRule};
use indexmap::IndexMap;

use crate::Error;

/// Builds a [`Grammar`] by instantiating parser nodes and naming them.
///
/// Every combinator method returns the [`ParserId`] of the node it just
/// created, so callers compose grammars bottom-up, e.g.:
///
/// ```ignore
/// let mut b = GrammarBuilder::new();
/// let digit = b.regexp(r"[0-9]+")?;
/// let number = b.define("number", digit);
/// ```
pub struct GrammarBuilder {
    parsers: Vec<Parser>,
    symbols: IndexMap<Symbol, ParserId>,
    interner: Interner,
    pending_forwards: Vec<(ParserId, Symbol)>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
            symbols: IndexMap::new(),
            interner: Interner::new(),
            pending_forwards: Vec::new(),
        }
    }

    fn push(&mut self, name: Option<Symbol>, kind: ParserKind) -> ParserId {
        let id = ParserId(self.parsers.len() as u32);
        self.parsers.push(Parser::new(id, name, kind));
        id
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    pub fn text(&mut self, literal: impl Into<String>) -> ParserId {
        self.push(None, ParserKind::Text(literal.into()))
    }

    pub fn regexp(&mut self, pattern: &str) -> Result<ParserId, Error> {
        let compiled = fancy_regex::Regex::new(pattern).map_err(Error::InvalidPattern)?;
        Ok(self.push(
            None,
            ParserKind::RegExp {
                pattern: compiled,
                is_whitespace: false,
            },
        ))
    }

    /// A `RegExp` variant marked as whitespace, whose content is typically
    /// configured to be dropped by a `@drop = whitespace` directive.
    pub fn whitespace(&mut self, pattern: &str) -> Result<ParserId, Error> {
        let compiled = fancy_regex::Regex::new(pattern).map_err(Error::InvalidPattern)?;
        Ok(self.push(
            None,
            ParserKind::RegExp {
                pattern: compiled,
                is_whitespace: true,
            },
        ))
    }

    pub fn option(&mut self, inner: ParserId) -> ParserId {
        self.push(None, ParserKind::Option(inner))
    }

    pub fn zero_or_more(&mut self, inner: ParserId) -> ParserId {
        self.push(None, ParserKind::ZeroOrMore(inner))
    }

    pub fn one_or_more(&mut self, inner: ParserId) -> ParserId {
        self.push(None, ParserKind::OneOrMore(inner))
    }

    pub fn counted(&mut self, inner: ParserId, min: usize, max: Option<usize>) -> ParserId {
        self.push(
            None,
            ParserKind::Counted {
                inner,
                range: dhp_engine::Range { min, max },
            },
        )
    }

    /// A `Series` with no mandatory marker (equivalent to placing `§` after
    /// the last element, i.e. it can never fire).
    pub fn series(&mut self, parts: Vec<ParserId>) -> ParserId {
        let len = parts.len();
        self.series_with_mandatory(parts, len)
    }

    pub fn series_with_mandatory(&mut self, parts: Vec<ParserId>, mandatory_index: usize) -> ParserId {
        self.push(
            None,
            ParserKind::Series {
                parts,
                mandatory_index,
                skip: Vec::new(),
                error_message: None,
            },
        )
    }

    /// Attach skip-recovery patterns to a `Series` (the ordered list the
    /// engine scans forward trying at a mandatory-marker failure).
    pub fn with_skip_patterns(&mut self, series: ParserId, patterns: &[&str]) -> Result<(), Error> {
        let rules = patterns
            .iter()
            .map(|p| fancy_regex::Regex::new(p).map(RecoveryRule::Pattern))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::InvalidPattern)?;
        if let ParserKind::Series { skip, .. } = &mut self.parsers[series.0 as usize].kind {
            *skip = rules;
        }
        Ok(())
    }

    pub fn with_error_message(&mut self, series: ParserId, message: impl Into<String>) {
        if let ParserKind::Series { error_message, .. } = &mut self.parsers[series.0 as usize].kind {
            *error_message = Some(message.into());
        }
    }

    pub fn alternative(&mut self, parts: Vec<ParserId>) -> ParserId {
        self.push(None, ParserKind::Alternative(parts))
    }

    pub fn interleave(&mut self, operands: Vec<InterleaveOperand>) -> ParserId {
        self.push(None, ParserKind::Interleave(operands))
    }

    pub fn lookahead(&mut self, inner: ParserId, negative: bool) -> ParserId {
        self.push(None, ParserKind::Lookahead { inner, negative })
    }

    pub fn lookbehind(&mut self, inner: ParserId, negative: bool) -> ParserId {
        self.push(None, ParserKind::Lookbehind { inner, negative })
    }

    pub fn synonym(&mut self, inner: ParserId) -> ParserId {
        self.push(None, ParserKind::Synonym(inner))
    }

    /// A placeholder resolved to `target_name`'s parser once it has been
    /// defined, closing a grammar cycle.
    pub fn forward(&mut self, target_name: &str) -> ParserId {
        let symbol = self.interner.intern(target_name);
        let id = self.push(None, ParserKind::Forward(Cell::new(None)));
        self.pending_forwards.push((id, symbol));
        id
    }

    pub fn capture(&mut self, symbol_name: &str, inner: ParserId) -> ParserId {
        let symbol = self.interner.intern(symbol_name);
        self.push(None, ParserKind::Capture { symbol, inner })
    }

    pub fn retrieve(&mut self, symbol_name: &str, filter: Option<&str>) -> ParserId {
        let symbol = self.interner.intern(symbol_name);
        let filter = filter.map(|f| self.interner.intern(f));
        self.push(None, ParserKind::Retrieve { symbol, filter })
    }

    pub fn pop(&mut self, symbol_name: &str, filter: Option<&str>, pop_on_failure: bool) -> ParserId {
        let symbol = self.interner.intern(symbol_name);
        let filter = filter.map(|f| self.interner.intern(f));
        self.push(
            None,
            ParserKind::Pop {
                symbol,
                filter,
                pop_on_failure,
            },
        )
    }

    /// Give `id` a symbolic name, registering it for lookup by
    /// [`GrammarBuilder::forward`] and recursive self-reference. Returns
    /// the same id for chaining.
    pub fn define(&mut self, name: &str, id: ParserId) -> ParserId {
        let symbol = self.interner.intern(name);
        self.parsers[id.0 as usize].name = Some(symbol);
        self.symbols.insert(symbol, id);
        id
    }

    pub fn disposable(&mut self, id: ParserId, disposable: bool) -> ParserId {
        self.parsers[id.0 as usize].disposable = disposable;
        id
    }

    pub fn drop_content(&mut self, id: ParserId, drop: bool) -> ParserId {
        self.parsers[id.0 as usize].drop_content = drop;
        id
    }

    /// Resolve every `Forward` placeholder to its named target, then
    /// assemble the finished [`Grammar`]. Fails if a forward reference
    /// names a symbol that was never [`GrammarBuilder::define`]d, or if
    /// `root_name` itself was never defined.
    pub fn build(mut self, root_name: &str) -> Result<Grammar, Error> {
        for (forward_id, target_symbol) in &self.pending_forwards {
            let Some(&target_id) = self.symbols.get(target_symbol) else {
                return Err(Error::Grammar(dhp_engine::GrammarError::UnresolvedForward(
                    Some(*target_symbol),
                )));
            };
            if let ParserKind::Forward(cell) = &self.parsers[forward_id.0 as usize].kind {
                cell.set(Some(target_id));
            }
        }

        let root_symbol = self.interner.intern(root_name);
        let root_id = *self
            .symbols
            .get(&root_symbol)
            .ok_or(Error::Grammar(dhp_engine::GrammarError::UnresolvedForward(
                Some(root_symbol),
            )))?;

        let grammar = Grammar::new(self.parsers, root_id, self.symbols, self.interner);
        grammar.check_forwards_resolved().map_err(Error::Grammar)?;

        let diagnostics = dhp_engine::analysis::analyze(&grammar);
        if diagnostics.has_errors() {
            return Err(Error::Grammar(dhp_engine::GrammarError::StaticAnalysisFailed(
                diagnostics.error_count(),
            )));
        }

        Ok(grammar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_simple_literal_grammar() {
        let mut builder = GrammarBuilder::new();
        let hello = builder.text("hello");
        builder.define("greeting", hello);

        let mut grammar = builder.build("greeting").unwrap();
        let input = dhp_core::Input::new("hello");
        let root = grammar.parse(&input);
        assert!(root.errors.is_empty());
        assert_eq!(root.tree.as_leaf(), Some("hello"));
    }

    #[test]
    fn unresolved_forward_fails_build() {
        let mut builder = GrammarBuilder::new();
        let fwd = builder.forward("never_defined");
        builder.define("root", fwd);

        let err = builder.build("root");
        assert!(err.is_err());
    }

    #[test]
    fn unguarded_left_recursion_fails_static_analysis() {
        let mut builder = GrammarBuilder::new();
        let self_ref = builder.forward("expr");
        let tail = builder.text("x");
        let series = builder.series(vec![self_ref, tail]);
        builder.define("expr", series);

        let err = builder.build("expr");
        assert!(matches!(
            err,
            Err(Error::Grammar(dhp_engine::GrammarError::StaticAnalysisFailed(_)))
        ));
    }
}
