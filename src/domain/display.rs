//! Text rendering of a talent tree as nested `termtree` branches.

use termtree::Tree as TermTree;
use tracing::instrument;

use crate::domain::entities::{NodeId, Tree};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> TermTree<String>;
}

impl TreeNodeConvert for Tree {
    /// Roots hang below the tree name; a node with several prerequisites is
    /// listed under each of them.
    #[instrument(level = "debug", skip(self), fields(tree = %self.name()))]
    fn to_tree_string(&self) -> TermTree<String> {
        fn build(tree: &Tree, id: NodeId, path: &mut Vec<NodeId>) -> TermTree<String> {
            let label = tree
                .node(id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("[{id}]"));
            // cyclic trees are rendered up to the repeated node
            if path.contains(&id) {
                return TermTree::new(format!("{label} (cycle)"));
            }
            path.push(id);
            let leaves: Vec<_> = tree
                .children(id)
                .iter()
                .map(|&child| build(tree, child, path))
                .collect();
            path.pop();
            TermTree::new(label).with_leaves(leaves)
        }

        if self.is_empty() {
            return TermTree::new("Empty tree".to_string());
        }
        let mut path = Vec::new();
        let leaves: Vec<_> = self
            .roots()
            .map(|root| build(self, root.id, &mut path))
            .collect();
        TermTree::new(self.name().to_string()).with_leaves(leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Node, TreeBuilder};

    #[test]
    fn given_chain_when_rendering_then_nests_children() {
        let tree = TreeBuilder::new("chain")
            .node(Node::new(1, "A"))
            .node(Node::new(2, "B").requires([1]))
            .build()
            .unwrap();

        let rendered = tree.to_tree_string().to_string();

        assert!(rendered.starts_with("chain"));
        let a = rendered.find("A [1]").expect("root listed");
        let b = rendered.find("B [2]").expect("child listed");
        assert!(a < b);
    }
}
