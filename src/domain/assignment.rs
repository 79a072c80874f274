//! Point assignments, filter constraints and concrete loadouts

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::entities::{NodeId, SwitchSide};
use crate::domain::error::{DomainError, DomainResult};

/// Mapping from node to chosen rank; absent nodes are untouched (rank 0).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Assignment {
    ranks: BTreeMap<NodeId, u8>,
}

impl Assignment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, node: NodeId, rank: u8) {
        self.ranks.insert(node, rank);
    }

    pub fn with(mut self, node: NodeId, rank: u8) -> Self {
        self.set(node, rank);
        self
    }

    pub fn rank(&self, node: NodeId) -> u8 {
        self.ranks.get(&node).copied().unwrap_or(0)
    }

    /// Ranks in node id order, zero ranks included.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, u8)> + '_ {
        self.ranks.iter().map(|(&id, &rank)| (id, rank))
    }

    /// Nodes holding at least one point.
    pub fn selected(&self) -> impl Iterator<Item = (NodeId, u8)> + '_ {
        self.iter().filter(|&(_, rank)| rank > 0)
    }

    /// Sum of all ranks, pre-filled nodes included if present.
    pub fn total(&self) -> u32 {
        self.ranks.values().map(|&r| u32::from(r)).sum()
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

impl FromIterator<(NodeId, u8)> for Assignment {
    fn from_iter<I: IntoIterator<Item = (NodeId, u8)>>(iter: I) -> Self {
        Self {
            ranks: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (id, rank) in self.selected() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{id}:{rank}")?;
            first = false;
        }
        if first {
            write!(f, "(empty)")?;
        }
        Ok(())
    }
}

/// Restriction a filter places on one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pin {
    /// Node must hold no point.
    Excluded,
    /// Node must hold at least this many points.
    Rank(u8),
    /// Switch node must be taken on this variant.
    Side(SwitchSide),
}

/// Partial assignment used to narrow a solved result set.
///
/// Nodes without a pin are don't-care.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraint {
    pins: BTreeMap<NodeId, Pin>,
}

impl Constraint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin(mut self, node: NodeId, pin: Pin) -> Self {
        self.insert(node, pin);
        self
    }

    pub fn insert(&mut self, node: NodeId, pin: Pin) {
        self.pins.insert(node, pin);
    }

    pub fn remove(&mut self, node: NodeId) -> Option<Pin> {
        self.pins.remove(&node)
    }

    pub fn get(&self, node: NodeId) -> Option<Pin> {
        self.pins.get(&node).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Pin)> + '_ {
        self.pins.iter().map(|(&id, &pin)| (id, pin))
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Build from the integer form: `-1` excluded, `0` don't-care, `r > 0` at least `r`.
    pub fn from_ranks(ranks: impl IntoIterator<Item = (NodeId, i32)>) -> DomainResult<Self> {
        let mut constraint = Self::new();
        for (node, value) in ranks {
            match value {
                -1 => constraint.insert(node, Pin::Excluded),
                0 => {}
                r if r > 0 && r <= i32::from(u8::MAX) => {
                    constraint.insert(node, Pin::Rank(r as u8))
                }
                other => {
                    return Err(DomainError::RuleViolation {
                        node,
                        reason: format!("filter rank {other} out of range"),
                    })
                }
            }
        }
        Ok(constraint)
    }
}

/// Concrete choice on one selected node of a loadout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Choice {
    Ranked(u8),
    Switched { rank: u8, side: SwitchSide },
}

impl Choice {
    pub fn rank(self) -> u8 {
        match self {
            Choice::Ranked(rank) | Choice::Switched { rank, .. } => rank,
        }
    }

    pub fn side(self) -> Option<SwitchSide> {
        match self {
            Choice::Ranked(_) => None,
            Choice::Switched { side, .. } => Some(side),
        }
    }
}

/// Fully resolved configuration: every selected node with its switch variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Loadout {
    choices: BTreeMap<NodeId, Choice>,
}

impl Loadout {
    pub fn insert(&mut self, node: NodeId, choice: Choice) {
        self.choices.insert(node, choice);
    }

    pub fn choice(&self, node: NodeId) -> Option<Choice> {
        self.choices.get(&node).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Choice)> + '_ {
        self.choices.iter().map(|(&id, &choice)| (id, choice))
    }

    /// Ranks of the loadout with the variants dropped.
    pub fn assignment(&self) -> Assignment {
        self.iter().map(|(id, choice)| (id, choice.rank())).collect()
    }
}
