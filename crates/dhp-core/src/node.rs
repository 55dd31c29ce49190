//! The parse tree: [`Node`], its [`RootNode`] specialization, and the
//! [`Error`] record format shared by every stage of the engine.

use indexmap::IndexMap;

use crate::interner::Symbol;

/// A node's content: either a matched leaf string or an ordered sequence of
/// children. A node never holds both at once, though either may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    Leaf(String),
    Children(Vec<Node>),
}

impl NodeValue {
    /// Total byte length of the matched content.
    pub fn content_len(&self) -> usize {
        match self {
            NodeValue::Leaf(s) => s.len(),
            NodeValue::Children(children) => children.iter().map(Node::content_len).sum(),
        }
    }
}

/// A single element of the parse tree.
///
/// Invariant: `content_len()` equals the sum of the children's content
/// lengths when `value` is `Children`. Position assignment is monotonic
/// under preorder traversal of a well-formed tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Symbolic name, or `None` for an anonymous node (name begins with the
    /// reserved anonymous sentinel and was never interned).
    pub name: Option<Symbol>,
    pub value: NodeValue,
    /// Absolute byte offset in the source where this node begins.
    pub position: usize,
    pub attributes: Option<IndexMap<String, String>>,
    /// Elidable during tree reduction (see `dhp-engine`'s reduction pass).
    pub disposable: bool,
}

impl Node {
    pub fn leaf(name: Option<Symbol>, text: impl Into<String>, position: usize) -> Self {
        Self {
            name,
            value: NodeValue::Leaf(text.into()),
            position,
            attributes: None,
            disposable: false,
        }
    }

    pub fn branch(name: Option<Symbol>, children: Vec<Node>, position: usize) -> Self {
        Self {
            name,
            value: NodeValue::Children(children),
            position,
            attributes: None,
            disposable: false,
        }
    }

    /// An anonymous node never carries a symbol name.
    #[inline]
    pub fn is_anonymous(&self) -> bool {
        self.name.is_none()
    }

    pub fn content_len(&self) -> usize {
        self.value.content_len()
    }

    pub fn children(&self) -> &[Node] {
        match &self.value {
            NodeValue::Children(c) => c,
            NodeValue::Leaf(_) => &[],
        }
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Leaf(s) => Some(s),
            NodeValue::Children(_) => None,
        }
    }

    pub fn set_disposable(mut self, disposable: bool) -> Self {
        self.disposable = disposable;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .get_or_insert_with(IndexMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Severity of an [`Error`], encoded in the numeric range of its code:
/// notices `< 100`, warnings `< 1000`, errors `< 10000`, fatal `>= 10000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Notice,
    Warning,
    Error,
    Fatal,
}

impl Severity {
    pub const NOTICE_MAX: u32 = 100;
    pub const WARNING_MAX: u32 = 1000;
    pub const ERROR_MAX: u32 = 10_000;

    pub fn from_code(code: u32) -> Self {
        if code < Self::NOTICE_MAX {
            Severity::Notice
        } else if code < Self::WARNING_MAX {
            Severity::Warning
        } else if code < Self::ERROR_MAX {
            Severity::Error
        } else {
            Severity::Fatal
        }
    }

    pub fn is_blocking(self) -> bool {
        matches!(self, Severity::Error | Severity::Fatal)
    }
}

/// A single diagnostic raised during a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub code: u32,
    pub position: usize,
    pub message: String,
    /// Symbol name of the node this error relates to, if any (e.g. the
    /// Series element a mandatory marker fired on).
    pub related_node: Option<Symbol>,
}

impl Error {
    pub fn new(code: u32, position: usize, message: impl Into<String>) -> Self {
        Self {
            code,
            position,
            message: message.into(),
            related_node: None,
        }
    }

    pub fn with_related_node(mut self, symbol: Symbol) -> Self {
        self.related_node = Some(symbol);
        self
    }

    #[inline]
    pub fn severity(&self) -> Severity {
        Severity::from_code(self.code)
    }
}

/// The root of a completed parse: the tree itself, plus the error list and
/// the position metadata needed to render errors against the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootNode {
    pub tree: Node,
    pub errors: Vec<Error>,
    /// Byte offset of the start of each source line, carried through from
    /// the `Input` this parse ran over.
    pub line_starts: Vec<usize>,
    /// Name of the processing stage that produced this tree (e.g. "cst",
    /// "ast" after a later reduction pass has run over it again).
    pub stage: String,
}

impl RootNode {
    pub fn new(tree: Node, line_starts: Vec<usize>, stage: impl Into<String>) -> Self {
        Self {
            tree,
            errors: Vec::new(),
            line_starts,
            stage: stage.into(),
        }
    }

    pub fn with_errors(mut self, errors: Vec<Error>) -> Self {
        self.errors = errors;
        self
    }

    /// Whether any recorded error is error-severity or worse.
    pub fn has_blocking_errors(&self) -> bool {
        self.errors.iter().any(|e| e.severity().is_blocking())
    }

    pub fn line_col(&self, position: usize) -> (usize, usize) {
        let line_idx = match self.line_starts.binary_search(&position) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        (line_idx + 1, position - line_start + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_content_len() {
        let node = Node::leaf(None, "hello", 0);
        assert_eq!(node.content_len(), 5);
        assert!(node.is_anonymous());
    }

    #[test]
    fn branch_content_len_sums_children() {
        let a = Node::leaf(None, "ab", 0);
        let b = Node::leaf(None, "cde", 2);
        let branch = Node::branch(None, vec![a, b], 0);
        assert_eq!(branch.content_len(), 5);
    }

    #[test]
    fn severity_from_code_ranges() {
        assert_eq!(Severity::from_code(0), Severity::Notice);
        assert_eq!(Severity::from_code(99), Severity::Notice);
        assert_eq!(Severity::from_code(100), Severity::Warning);
        assert_eq!(Severity::from_code(999), Severity::Warning);
        assert_eq!(Severity::from_code(1000), Severity::Error);
        assert_eq!(Severity::from_code(9999), Severity::Error);
        assert_eq!(Severity::from_code(10_000), Severity::Fatal);
    }

    #[test]
    fn error_severity_and_blocking() {
        let err = Error::new(1500, 10, "missing semicolon");
        assert_eq!(err.severity(), Severity::Error);
        assert!(err.severity().is_blocking());

        let notice = Error::new(5, 0, "empty repetition body");
        assert!(!notice.severity().is_blocking());
    }

    #[test]
    fn root_node_blocking_errors() {
        let tree = Node::leaf(None, "x", 0);
        let root = RootNode::new(tree, vec![0], "cst").with_errors(vec![Error::new(50, 0, "n")]);
        assert!(!root.has_blocking_errors());

        let root2 = RootNode::new(Node::leaf(None, "x", 0), vec![0], "cst")
            .with_errors(vec![Error::new(2000, 0, "e")]);
        assert!(root2.has_blocking_errors());
    }
}
