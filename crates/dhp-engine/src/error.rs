//! Errors that can occur while building or running a grammar.

use dhp_core::Symbol;

/// A grammar-level problem, detected either at construction time by static
/// analysis or at runtime as an anomaly the engine cannot recover from.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GrammarError {
    /// A `Forward` parser was never resolved to a target before use.
    #[error("unresolved forward reference ({0:?})")]
    UnresolvedForward(Option<Symbol>),

    /// Static analysis found a symbol referenced but never defined.
    #[error("undefined symbol {0:?}")]
    UndefinedSymbol(Symbol),

    /// Static analysis blocked construction; see the grammar's
    /// [`crate::diagnostics::Diagnostics`] for the full list.
    #[error("grammar failed static analysis with {0} blocking diagnostic(s)")]
    StaticAnalysisFailed(usize),
}
