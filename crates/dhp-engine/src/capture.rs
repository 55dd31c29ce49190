//! Per-symbol capture stacks mutated by Capture/Retrieve/Pop parsers.

use indexmap::IndexMap;

use dhp_core::Symbol;

/// The grammar's capture state: one stack of matched strings per symbol
/// that has ever been captured.
#[derive(Debug, Default)]
pub struct CaptureStacks {
    stacks: IndexMap<Symbol, Vec<String>>,
}

impl CaptureStacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, symbol: Symbol, value: String) {
        self.stacks.entry(symbol).or_default().push(value);
    }

    pub fn pop(&mut self, symbol: Symbol) -> Option<String> {
        self.stacks.get_mut(&symbol)?.pop()
    }

    pub fn top(&self, symbol: Symbol) -> Option<&str> {
        self.stacks.get(&symbol)?.last().map(String::as_str)
    }

    /// Every stack that has ever been touched must be empty at the end of a
    /// successful parse; a non-empty stack signals a malformed grammar.
    pub fn non_empty_symbols(&self) -> Vec<Symbol> {
        self.stacks
            .iter()
            .filter(|(_, stack)| !stack.is_empty())
            .map(|(&sym, _)| sym)
            .collect()
    }

    pub fn is_balanced(&self) -> bool {
        self.stacks.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dhp_core::Interner;

    #[test]
    fn push_pop_roundtrip() {
        let mut interner = Interner::new();
        let tag = interner.intern("tag");
        let mut stacks = CaptureStacks::new();

        stacks.push(tag, "a".into());
        stacks.push(tag, "b".into());
        assert_eq!(stacks.top(tag), Some("b"));
        assert_eq!(stacks.pop(tag), Some("b".to_string()));
        assert_eq!(stacks.top(tag), Some("a"));
    }

    #[test]
    fn balance_detection() {
        let mut interner = Interner::new();
        let tag = interner.intern("tag");
        let mut stacks = CaptureStacks::new();
        assert!(stacks.is_balanced());

        stacks.push(tag, "a".into());
        assert!(!stacks.is_balanced());
        assert_eq!(stacks.non_empty_symbols(), vec![tag]);

        stacks.pop(tag);
        assert!(stacks.is_balanced());
    }
}
