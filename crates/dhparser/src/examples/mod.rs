//! Worked grammars exercising every corner of the engine: left-recursive
//! arithmetic expressions, mini-XML (tag matching via `Capture`/`Pop`),
//! and JSON (mandatory-marker error recovery). Each also backs an
//! integration test under `tests/`.

pub mod arithmetic;
pub mod json;
pub mod xml;
