#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures for the DHParser packrat parsing engine.
//!
//! This crate owns the data that survives a parse and is shared across the
//! engine: the [`Input`] view over the source text, the [`Node`]/[`RootNode`]
//! tree produced by a parse, the [`Error`] record format, and symbol
//! interning (see [`interner`]). It has no knowledge of grammars or parser
//! combinators — that lives in `dhp-engine`.

pub mod input;
pub mod interner;
pub mod node;

pub use input::Input;
pub use interner::{Interner, Symbol};
pub use node::{Error, Node, NodeValue, RootNode, Severity};

#[cfg(test)]
mod interner_tests;
