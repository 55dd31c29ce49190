//! Tree reduction: collapsing the raw combinator result tree according to
//! `disposable`/`drop-content` flags and a global reduction level.

use dhp_core::{Node, NodeValue};

/// Global policy applied to every combinator's result node as the tree is
/// assembled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReductionLevel {
    /// Preserve every combinator's result as a node.
    None,
    /// Splice anonymous single-child chains into their parent.
    #[default]
    Flatten,
    /// Additionally merge adjacent anonymous leaf siblings at the top of an
    /// anonymous subtree.
    MergeTreetops,
    /// Additionally merge all adjacent anonymous leaves wherever they occur.
    Merge,
}

/// Apply the reduction level to a freshly assembled node, recursively.
pub fn reduce(node: Node, level: ReductionLevel) -> Node {
    if level == ReductionLevel::None {
        return node;
    }

    let Node {
        name,
        value,
        position,
        attributes,
        disposable,
    } = node;

    let value = match value {
        NodeValue::Leaf(s) => NodeValue::Leaf(s),
        NodeValue::Children(children) => {
            let children: Vec<Node> = children.into_iter().map(|c| reduce(c, level)).collect();
            let children = splice_disposable(children);
            let children = match level {
                // A disposable node is itself a "treetop" about to be
                // spliced into its parent: merging its own children here
                // is as far up the tree as merge-treetops ever reaches.
                // Named (non-disposable) nodes are left alone.
                ReductionLevel::MergeTreetops if disposable => merge_adjacent_leaves(children),
                ReductionLevel::Merge => merge_adjacent_leaves(children),
                ReductionLevel::None | ReductionLevel::Flatten | ReductionLevel::MergeTreetops => {
                    children
                }
            };
            NodeValue::Children(children)
        }
    };

    Node {
        name,
        value,
        position,
        attributes,
        disposable,
    }
}

/// Flatten: a disposable node's children are spliced directly into the
/// parent's child list in place of the node itself. This applies equally
/// to anonymous nodes (unnamed sub-expressions) and to named nodes a
/// directive marked disposable by convention (e.g. `@hide = /_\w+/`) —
/// the node's own name is simply discarded along with it.
fn splice_disposable(children: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        if child.disposable {
            match child.value {
                NodeValue::Children(grandchildren) => out.extend(grandchildren),
                NodeValue::Leaf(ref s) if s.is_empty() => {}
                NodeValue::Leaf(s) => out.push(Node {
                    name: None,
                    value: NodeValue::Leaf(s),
                    position: child.position,
                    attributes: child.attributes,
                    disposable: false,
                }),
            }
        } else {
            out.push(child);
        }
    }
    out
}

/// Merge runs of adjacent anonymous leaf siblings in one child list into a
/// single leaf each. Called once per node by [`reduce`]; which nodes it
/// gets called for (every node, vs. only disposable ones) is what
/// distinguishes `Merge` from `MergeTreetops`.
fn merge_adjacent_leaves(children: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    for child in children {
        let mergeable = child.is_anonymous() && matches!(child.value, NodeValue::Leaf(_));
        if mergeable {
            if let Some(last) = out.last_mut() {
                let last_mergeable = last.is_anonymous() && matches!(last.value, NodeValue::Leaf(_));
                if last_mergeable {
                    if let (NodeValue::Leaf(acc), NodeValue::Leaf(new)) =
                        (&mut last.value, &child.value)
                    {
                        acc.push_str(new);
                        continue;
                    }
                }
            }
        }
        out.push(child);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_level_is_identity() {
        let leaf = Node::leaf(None, "a", 0);
        let branch = Node::branch(None, vec![leaf.clone()], 0);
        let reduced = reduce(branch.clone(), ReductionLevel::None);
        assert_eq!(reduced, branch);
    }

    #[test]
    fn flatten_splices_disposable_anonymous_chain() {
        let inner = Node::branch(None, vec![Node::leaf(None, "x", 0)], 0).set_disposable(true);
        let outer = Node::branch(None, vec![inner], 0);
        let reduced = reduce(outer, ReductionLevel::Flatten);
        assert_eq!(reduced.children().len(), 1);
        assert_eq!(reduced.children()[0].as_leaf(), Some("x"));
    }

    /// Builds a named (non-disposable) outer node with one disposable
    /// sub-branch of two adjacent anonymous leaves, plus a sibling leaf
    /// outside that sub-branch — the shape needed to tell `MergeTreetops`
    /// and `Merge` apart: the former only merges inside the disposable
    /// branch before it gets spliced up, the latter also merges the
    /// spliced result against its new sibling.
    fn named_outer_with_disposable_pair() -> Node {
        let pair = Node::branch(
            None,
            vec![Node::leaf(None, "a", 0), Node::leaf(None, "b", 1)],
            0,
        )
        .set_disposable(true);
        let sibling = Node::leaf(None, "c", 2);
        Node::branch(Some(dhp_core::Symbol::from_raw(0)), vec![pair, sibling], 0)
    }

    #[test]
    fn merge_treetops_stops_at_the_spliced_boundary() {
        let outer = named_outer_with_disposable_pair();
        let reduced = reduce(outer, ReductionLevel::MergeTreetops);
        let leaves: Vec<&str> = reduced.children().iter().map(|c| c.as_leaf().unwrap()).collect();
        assert_eq!(leaves, vec!["ab", "c"]);
    }

    #[test]
    fn merge_merges_across_the_spliced_boundary() {
        let outer = named_outer_with_disposable_pair();
        let reduced = reduce(outer, ReductionLevel::Merge);
        let leaves: Vec<&str> = reduced.children().iter().map(|c| c.as_leaf().unwrap()).collect();
        assert_eq!(leaves, vec!["abc"]);
    }

    #[test]
    fn merge_combines_adjacent_anonymous_leaves() {
        let a = Node::leaf(None, "a", 0);
        let b = Node::leaf(None, "b", 1);
        let branch = Node::branch(None, vec![a, b], 0);
        let reduced = reduce(branch, ReductionLevel::Merge);
        assert_eq!(reduced.children().len(), 1);
        assert_eq!(reduced.children()[0].as_leaf(), Some("ab"));
    }
}
