//! Domain entities: talent nodes and the tree that holds them

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::str::FromStr;

use crate::domain::assignment::Assignment;
use crate::domain::error::{DomainError, DomainResult};

/// Identifier of a node, unique within one tree.
pub type NodeId = u32;

/// Upper bound on the free points of a solvable tree: one index bit per point.
pub const MAX_INDEXED_POINTS: u32 = 64;

/// One of the two mutually exclusive variants of a switch node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SwitchSide {
    First,
    Second,
}

impl SwitchSide {
    /// Position of the variant name in `NodeKind::Switch::variants`.
    pub fn index(self) -> usize {
        match self {
            SwitchSide::First => 0,
            SwitchSide::Second => 1,
        }
    }
}

impl fmt::Display for SwitchSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchSide::First => write!(f, "first"),
            SwitchSide::Second => write!(f, "second"),
        }
    }
}

impl FromStr for SwitchSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "1" => Ok(SwitchSide::First),
            "second" | "2" => Ok(SwitchSide::Second),
            other => Err(format!("invalid switch side '{other}' (expected first|second)")),
        }
    }
}

/// Kind of a talent node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Active,
    Passive,
    /// Two named variants sharing one capacity.
    Switch { variants: [String; 2] },
}

impl NodeKind {
    pub fn is_switch(&self) -> bool {
        matches!(self, NodeKind::Switch { .. })
    }
}

/// A talent: a choice point with a point capacity and an unlock rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    /// Layout only, irrelevant to solving
    pub row: u32,
    /// Layout only, irrelevant to solving
    pub column: u32,
    pub kind: NodeKind,
    pub max_points: u8,
    /// Free points that must be spent tree-wide before this node takes a point
    pub points_required: u32,
    pub prerequisites: Vec<NodeId>,
    /// Granted by the tree definition at full rank, excluded from free choice
    pub pre_filled: bool,
    /// Transient rank assigned by a caller; never read by the solver
    pub points: u8,
}

impl Node {
    /// Active single-point root node.
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            row: 0,
            column: 0,
            kind: NodeKind::Active,
            max_points: 1,
            points_required: 0,
            prerequisites: Vec::new(),
            pre_filled: false,
            points: 0,
        }
    }

    pub fn with_max_points(mut self, max_points: u8) -> Self {
        self.max_points = max_points;
        self
    }

    pub fn with_points_required(mut self, points_required: u32) -> Self {
        self.points_required = points_required;
        self
    }

    pub fn requires(mut self, prerequisites: impl IntoIterator<Item = NodeId>) -> Self {
        self.prerequisites.extend(prerequisites);
        self
    }

    pub fn passive(mut self) -> Self {
        self.kind = NodeKind::Passive;
        self
    }

    pub fn switch(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.kind = NodeKind::Switch {
            variants: [first.into(), second.into()],
        };
        self
    }

    pub fn pre_filled(mut self) -> Self {
        self.pre_filled = true;
        self.points = self.max_points;
        self
    }

    pub fn at(mut self, row: u32, column: u32) -> Self {
        self.row = row;
        self.column = column;
        self
    }

    /// Name of the chosen variant for switch nodes, the node name otherwise.
    pub fn variant_name(&self, side: SwitchSide) -> &str {
        match &self.kind {
            NodeKind::Switch { variants } => &variants[side.index()],
            _ => &self.name,
        }
    }

    pub fn is_free(&self) -> bool {
        !self.pre_filled
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Switch { variants } => {
                write!(f, "{} [{}] {} | {}", self.name, self.id, variants[0], variants[1])?
            }
            _ => write!(f, "{} [{}]", self.name, self.id)?,
        }
        write!(f, " {}/{}", self.points, self.max_points)?;
        if self.points_required > 0 {
            write!(f, " (requires {} points)", self.points_required)?;
        }
        if self.pre_filled {
            write!(f, " (pre-filled)")?;
        }
        Ok(())
    }
}

/// A talent tree: a DAG of nodes in display order.
///
/// Built through [`TreeBuilder`](crate::domain::TreeBuilder), which guarantees
/// unique ids and known prerequisites. Acyclicity is checked by [`Tree::is_solvable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    name: String,
    nodes: Vec<Node>,
    positions: HashMap<NodeId, usize>,
    children: HashMap<NodeId, Vec<NodeId>>,
}

impl Tree {
    pub(crate) fn from_validated(name: String, nodes: Vec<Node>) -> Self {
        let positions = nodes
            .iter()
            .enumerate()
            .map(|(pos, node)| (node.id, pos))
            .collect();
        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for node in &nodes {
            for &parent in &node.prerequisites {
                children.entry(parent).or_default().push(node.id);
            }
        }
        Self {
            name,
            nodes,
            positions,
            children,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes in display order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.positions.get(&id).map(|&pos| &self.nodes[pos])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Direct children of a node, in display order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Nodes without prerequisites.
    pub fn roots(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.prerequisites.is_empty())
    }

    /// Nodes open to free choice.
    pub fn free_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.is_free())
    }

    /// Theoretical ceiling of spendable points: capacity of all free nodes.
    pub fn max_talent_points(&self) -> u32 {
        self.free_nodes().map(|n| u32::from(n.max_points)).sum()
    }

    pub fn pre_filled_talent_points(&self) -> u32 {
        self.nodes
            .iter()
            .filter(|n| n.pre_filled)
            .map(|n| u32::from(n.max_points))
            .sum()
    }

    /// Transient points currently assigned to free nodes.
    pub fn spent_points(&self) -> u32 {
        self.free_nodes().map(|n| u32::from(n.points)).sum()
    }

    /// Points an assignment spends on free nodes.
    pub fn spent_in(&self, assignment: &Assignment) -> u32 {
        assignment
            .iter()
            .filter(|(id, _)| self.node(*id).is_some_and(Node::is_free))
            .map(|(_, rank)| u32::from(rank))
            .sum()
    }

    /// Topological order of all nodes (Kahn's algorithm).
    ///
    /// Among ready nodes the lowest `(points_required, row, column, id)` goes
    /// first, so unlock thresholds are nondecreasing along the order whenever
    /// they are nondecreasing along prerequisite edges.
    pub fn topological_order(&self) -> DomainResult<Vec<NodeId>> {
        let mut in_degree: HashMap<NodeId, usize> = self
            .nodes
            .iter()
            .map(|n| (n.id, n.prerequisites.len()))
            .collect();

        let key = |node: &Node| Reverse((node.points_required, node.row, node.column, node.id));
        let mut ready: BinaryHeap<_> = self
            .nodes
            .iter()
            .filter(|n| n.prerequisites.is_empty())
            .map(key)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse((_, _, _, id))) = ready.pop() {
            order.push(id);
            for &child in self.children(id) {
                let degree = in_degree
                    .get_mut(&child)
                    .ok_or(DomainError::UnknownNode(child))?;
                *degree -= 1;
                if *degree == 0 {
                    if let Some(node) = self.node(child) {
                        ready.push(key(node));
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck = self
                .nodes
                .iter()
                .find(|n| in_degree.get(&n.id).is_some_and(|&d| d > 0))
                .map(|n| n.id)
                .unwrap_or_default();
            return Err(DomainError::CycleDetected(stuck));
        }
        Ok(order)
    }

    /// Check the tree can be handed to the solver: acyclic and indexable.
    pub fn is_solvable(&self) -> DomainResult<()> {
        self.topological_order()?;
        let ceiling = self.max_talent_points();
        if ceiling > MAX_INDEXED_POINTS {
            return Err(DomainError::TreeTooLarge {
                requested: ceiling,
                allowed: MAX_INDEXED_POINTS,
            });
        }
        Ok(())
    }

    /// Clear transient ranks; pre-filled nodes stay at full rank.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.points = if node.pre_filled { node.max_points } else { 0 };
        }
    }

    /// Materialize an assignment into the transient ranks.
    ///
    /// Free nodes absent from the assignment are cleared. Pre-filled nodes keep
    /// their fixed rank whatever the assignment says.
    pub fn apply(&mut self, assignment: &Assignment) -> DomainResult<()> {
        for (id, rank) in assignment.iter() {
            let node = self.node(id).ok_or(DomainError::UnknownNode(id))?;
            if rank > node.max_points {
                return Err(DomainError::RuleViolation {
                    node: id,
                    reason: format!("rank {} exceeds capacity {}", rank, node.max_points),
                });
            }
        }
        self.reset();
        for node in self.nodes.iter_mut().filter(|n| n.is_free()) {
            node.points = assignment.rank(node.id);
        }
        Ok(())
    }

    /// Current transient ranks as an assignment covering every node.
    pub fn current_assignment(&self) -> Assignment {
        self.nodes.iter().map(|n| (n.id, n.points)).collect()
    }
}
