//! Tree builder validating node ids and prerequisite links.

use std::collections::HashSet;

use crate::domain::entities::{Node, Tree};
use crate::domain::error::{DomainError, DomainResult};

/// Constructs talent trees from nodes.
///
/// Node order is kept as display order. Cycles are not rejected here; they
/// are reported by [`Tree::is_solvable`] so that partially authored trees can
/// still be inspected.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    name: String,
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
        }
    }

    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn nodes(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    /// Validate ids and links, then build the tree.
    pub fn build(self) -> DomainResult<Tree> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(DomainError::DuplicateNode(node.id));
            }
            if node.max_points == 0 {
                return Err(DomainError::InvalidCapacity(node.id));
            }
        }

        let mut nodes = self.nodes;
        for node in &mut nodes {
            // Repeated prerequisite ids would corrupt in-degree counting
            let mut unique = HashSet::new();
            node.prerequisites.retain(|id| unique.insert(*id));

            for &parent in &node.prerequisites {
                if parent == node.id {
                    return Err(DomainError::SelfPrerequisite(node.id));
                }
                if !seen.contains(&parent) {
                    return Err(DomainError::UnknownPrerequisite {
                        node: node.id,
                        prerequisite: parent,
                    });
                }
            }
            if node.pre_filled {
                node.points = node.max_points;
            } else if node.points > node.max_points {
                node.points = 0;
            }
        }

        Ok(Tree::from_validated(self.name, nodes))
    }
}
