#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Packrat parsing engine for DHParser-style grammars: parser combinators,
//! packrat memoization, seed-and-grow left recursion, mandatory-marker
//! error recovery, tree reduction, and load-time static analysis.
//!
//! `dhp-core` owns the data (input view, node tree, interning); this crate
//! owns the behavior (the parser graph and the runtime that walks it).

pub mod analysis;
pub mod capture;
pub mod checkpoint;
pub mod diagnostics;
pub mod effect;
pub mod error;
pub mod grammar;
pub mod memo;
pub mod parser;
pub mod reduction;

pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics, Span};
pub use error::GrammarError;
pub use grammar::Grammar;
pub use parser::{InterleaveOperand, Parser, ParserId, ParserKind, Range, RecoveryRule};
pub use reduction::ReductionLevel;
