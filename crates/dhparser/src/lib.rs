#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! DHParser: a packrat-parsing facade over [`dhp_core`] and [`dhp_engine`].
//!
//! [`GrammarBuilder`] assembles a parser graph from combinator calls and
//! [`Directives`] configures the ambient whitespace/comment/reduction
//! behavior that in a real EBNF grammar would come from `@` pragmas. This
//! crate does not parse EBNF source text itself — it is the collaborator
//! an EBNF compiler front end would target: give it parser combinators and
//! symbol names, it gives you back a runnable [`dhp_engine::Grammar`].
//!
//! See the `examples` module for worked grammars (arithmetic expressions,
//! mini-XML with tag matching, JSON with mandatory-marker recovery).

pub mod builder;
pub mod directives;
pub mod examples;

pub use builder::GrammarBuilder;
pub use directives::{Directives, LiteralWhitespace};

pub use dhp_core::{Input, Node, NodeValue, RootNode, Severity};
pub use dhp_engine::{Grammar, GrammarError, ParserId, ReductionLevel};

/// Errors that can occur while building or configuring a grammar through
/// this facade. Runtime parse failures are never represented as `Err`
/// values — a parse always returns a [`RootNode`], with failures recorded
/// as [`dhp_core::Error`] entries in its `errors` list (see §7 of the
/// design notes for why grammar-construction errors and parse-time
/// diagnostics are deliberately kept apart).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A regular expression given to the builder failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] fancy_regex::Error),

    /// Grammar assembly failed: an unresolved forward reference, a failed
    /// static-analysis pass, or another structural problem.
    #[error(transparent)]
    Grammar(#[from] dhp_engine::GrammarError),

    /// A [`Directives`] document failed to deserialize.
    #[error("invalid directives: {0}")]
    Directives(#[from] serde_json::Error),
}
