//! Unlock rules and assignment validation

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::assignment::Assignment;
use crate::domain::entities::{Node, NodeId, Tree};
use crate::domain::error::{DomainError, DomainResult};

/// When a prerequisite counts as unlocking its children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnlockRule {
    /// A prerequisite with at least one point unlocks.
    #[default]
    AnyRank,
    /// A prerequisite unlocks only at full rank.
    Maxed,
}

impl UnlockRule {
    /// Rank a prerequisite needs before its children open up.
    pub fn required_rank(self, prerequisite: &Node) -> u8 {
        match self {
            UnlockRule::AnyRank => 1,
            UnlockRule::Maxed => prerequisite.max_points,
        }
    }
}

impl fmt::Display for UnlockRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockRule::AnyRank => write!(f, "any-rank"),
            UnlockRule::Maxed => write!(f, "maxed"),
        }
    }
}

impl FromStr for UnlockRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any-rank" | "any_rank" | "any" => Ok(UnlockRule::AnyRank),
            "maxed" | "max" => Ok(UnlockRule::Maxed),
            other => Err(format!(
                "invalid unlock rule '{other}' (expected any-rank|maxed)"
            )),
        }
    }
}

/// Check an assignment against capacities, thresholds and prerequisites.
///
/// Points are acquired greedily one at a time wherever the rules allow. Since
/// acquiring a point never revokes eligibility elsewhere, the assignment is
/// valid exactly when the greedy pass reaches every requested rank.
/// Pre-filled nodes always count as fully ranked and spend no free points.
pub fn validate(tree: &Tree, assignment: &Assignment, rule: UnlockRule) -> DomainResult<()> {
    let mut wanted: BTreeMap<NodeId, u8> = BTreeMap::new();
    for (id, rank) in assignment.iter() {
        let node = tree.node(id).ok_or(DomainError::UnknownNode(id))?;
        if rank > node.max_points {
            return Err(DomainError::RuleViolation {
                node: id,
                reason: format!("rank {} exceeds capacity {}", rank, node.max_points),
            });
        }
        if node.is_free() && rank > 0 {
            wanted.insert(id, rank);
        }
    }

    let mut held: BTreeMap<NodeId, u8> = BTreeMap::new();
    let mut spent = 0u32;
    loop {
        let mut progress = false;
        for (&id, &target) in &wanted {
            let current = held.get(&id).copied().unwrap_or(0);
            if current >= target {
                continue;
            }
            let Some(node) = tree.node(id) else { continue };
            if spent < node.points_required {
                continue;
            }
            if current == 0 && !is_unlocked(tree, node, &held, rule) {
                continue;
            }
            held.insert(id, current + 1);
            spent += 1;
            progress = true;
        }
        if !progress {
            break;
        }
    }

    for (&id, &target) in &wanted {
        let current = held.get(&id).copied().unwrap_or(0);
        if current < target {
            let node = tree.node(id).ok_or(DomainError::UnknownNode(id))?;
            let reason = if current == 0 && !is_unlocked(tree, node, &held, rule) {
                "no prerequisite unlocked".to_string()
            } else {
                format!(
                    "requires {} points spent, only {} reachable",
                    node.points_required, spent
                )
            };
            return Err(DomainError::RuleViolation { node: id, reason });
        }
    }
    Ok(())
}

fn is_unlocked(tree: &Tree, node: &Node, held: &BTreeMap<NodeId, u8>, rule: UnlockRule) -> bool {
    if node.prerequisites.is_empty() {
        return true;
    }
    node.prerequisites.iter().any(|&parent_id| match tree.node(parent_id) {
        Some(parent) if parent.pre_filled => true,
        Some(parent) => {
            held.get(&parent_id).copied().unwrap_or(0) >= rule.required_rank(parent)
        }
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Node, TreeBuilder};

    fn gated_tree() -> Tree {
        TreeBuilder::new("gated")
            .node(Node::new(1, "A").with_max_points(2))
            .node(Node::new(2, "B").requires([1]))
            .node(Node::new(3, "C").with_points_required(3))
            .build()
            .expect("valid tree")
    }

    #[test]
    fn given_child_without_parent_when_validating_then_reports_prerequisite() {
        let tree = gated_tree();
        let err = validate(&tree, &Assignment::new().with(2, 1), UnlockRule::AnyRank).unwrap_err();
        assert!(matches!(err, DomainError::RuleViolation { node: 2, .. }));
    }

    #[test]
    fn given_threshold_met_out_of_order_when_validating_then_accepts() {
        let tree = gated_tree();
        let assignment = Assignment::new().with(1, 2).with(2, 1).with(3, 1);
        assert!(validate(&tree, &assignment, UnlockRule::AnyRank).is_ok());
    }

    #[test]
    fn given_maxed_rule_when_parent_partial_then_rejects_child() {
        let tree = gated_tree();
        let assignment = Assignment::new().with(1, 1).with(2, 1);
        assert!(validate(&tree, &assignment, UnlockRule::AnyRank).is_ok());
        assert!(validate(&tree, &assignment, UnlockRule::Maxed).is_err());
    }

    #[test]
    fn test_unlock_rule_parsing() {
        assert_eq!("maxed".parse::<UnlockRule>(), Ok(UnlockRule::Maxed));
        assert_eq!("Any-Rank".parse::<UnlockRule>(), Ok(UnlockRule::AnyRank));
        assert!("all".parse::<UnlockRule>().is_err());
    }
}
