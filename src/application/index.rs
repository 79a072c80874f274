//! Configuration index (SIND) and the slot layout it is packed against.
//!
//! Every free node of capacity `m` owns `m` consecutive slots, one bit each.
//! A node at rank `r` sets its first `r` slots, so an index is a set of
//! slots and its budget is the population count. Slots follow the tree's
//! topological order: parents precede children and unlock thresholds do not
//! decrease along the order. Under that order a slot set is a valid
//! configuration exactly when acquiring its slots in ascending order obeys
//! every rule, which is what both the enumerator and [`IndexLayout::is_valid`]
//! rely on.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    Assignment, Choice, DomainError, DomainResult, Loadout, NodeId, SwitchSide, Tree,
    UnlockRule,
};

/// Packed point assignment of all free nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sind(pub u64);

impl Sind {
    pub const EMPTY: Sind = Sind(0);

    pub fn bits(self) -> u64 {
        self.0
    }

    /// Total free points spent, without decoding.
    pub fn budget(self) -> u32 {
        self.0.count_ones()
    }

    pub fn has_slot(self, slot: usize) -> bool {
        slot < 64 && self.0 & (1u64 << slot) != 0
    }

    pub(crate) fn with_slot(self, slot: usize) -> Sind {
        Sind(self.0 | (1u64 << slot))
    }
}

impl From<u64> for Sind {
    fn from(bits: u64) -> Self {
        Sind(bits)
    }
}

impl fmt::Display for Sind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// One point of one free node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub node: NodeId,
    /// 1-based rank this slot grants
    pub rank: u8,
    pub threshold: u32,
    /// Slots of which at least one must be held; `None` when always open
    gate: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeSlots {
    start: usize,
    len: usize,
    switch: bool,
}

impl NodeSlots {
    fn mask(&self, rank: usize) -> u64 {
        low_bits(rank.min(self.len)) << self.start
    }
}

/// Mapping between a tree's free nodes and index bits, fixed once per solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexLayout {
    slots: Vec<Slot>,
    free: BTreeMap<NodeId, NodeSlots>,
    pre_filled: BTreeMap<NodeId, u8>,
    /// Every switch node, pre-filled ones included
    switches: BTreeSet<NodeId>,
    /// First slot of every switch node
    switch_mask: u64,
    rule: UnlockRule,
}

impl IndexLayout {
    /// Lay out the slots of a solvable tree.
    pub fn build(tree: &Tree, rule: UnlockRule) -> DomainResult<Self> {
        tree.is_solvable()?;
        let order = tree.topological_order()?;

        let mut free = BTreeMap::new();
        let mut pre_filled = BTreeMap::new();
        let mut switches = BTreeSet::new();
        let mut next = 0usize;
        for &id in &order {
            let node = tree.node(id).ok_or(DomainError::UnknownNode(id))?;
            if node.kind.is_switch() {
                switches.insert(id);
            }
            if node.pre_filled {
                pre_filled.insert(id, node.max_points);
                continue;
            }
            let len = usize::from(node.max_points);
            free.insert(
                id,
                NodeSlots {
                    start: next,
                    len,
                    switch: node.kind.is_switch(),
                },
            );
            next += len;
        }

        let mut slots = Vec::with_capacity(next);
        let mut switch_mask = 0u64;
        for &id in &order {
            let Some(own) = free.get(&id).copied() else {
                continue;
            };
            let node = tree.node(id).ok_or(DomainError::UnknownNode(id))?;
            if own.switch {
                switch_mask |= 1u64 << own.start;
            }

            let entry_gate = if node.prerequisites.is_empty()
                || node.prerequisites.iter().any(|p| pre_filled.contains_key(p))
            {
                None
            } else {
                let mut mask = 0u64;
                for &parent_id in &node.prerequisites {
                    let parent = tree.node(parent_id).ok_or(DomainError::UnknownNode(parent_id))?;
                    if let Some(parent_slots) = free.get(&parent_id) {
                        let needed = usize::from(rule.required_rank(parent));
                        mask |= 1u64 << (parent_slots.start + needed - 1);
                    }
                }
                Some(mask)
            };

            for rank in 1..=own.len {
                let gate = if rank == 1 {
                    entry_gate
                } else {
                    Some(1u64 << (own.start + rank - 2))
                };
                slots.push(Slot {
                    node: id,
                    rank: rank as u8,
                    threshold: node.points_required,
                    gate,
                });
            }
        }

        Ok(Self {
            slots,
            free,
            pre_filled,
            switches,
            switch_mask,
            rule,
        })
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of index bits in use, equal to the tree's free point ceiling.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn rule(&self) -> UnlockRule {
        self.rule
    }

    pub fn is_free(&self, node: NodeId) -> bool {
        self.free.contains_key(&node)
    }

    pub fn is_pre_filled(&self, node: NodeId) -> bool {
        self.pre_filled.contains_key(&node)
    }

    pub fn is_switch(&self, node: NodeId) -> bool {
        self.switches.contains(&node)
    }

    pub fn capacity(&self, node: NodeId) -> Option<u8> {
        self.free
            .get(&node)
            .map(|s| s.len as u8)
            .or_else(|| self.pre_filled.get(&node).copied())
    }

    /// Whether `slot` may be added to the slots already in `set`.
    #[inline]
    pub fn eligible(&self, slot: usize, set: u64) -> bool {
        let s = &self.slots[slot];
        set.count_ones() >= s.threshold && s.gate.map_or(true, |gate| set & gate != 0)
    }

    /// Bits of the first `rank` slots of a free node.
    pub fn rank_mask(&self, node: NodeId, rank: u8) -> Option<u64> {
        self.free.get(&node).map(|s| s.mask(usize::from(rank)))
    }

    /// Whether an arbitrary value is a rule-valid configuration of this layout.
    pub fn is_valid(&self, index: Sind) -> bool {
        if index.0 & !low_bits(self.slots.len()) != 0 {
            return false;
        }
        let mut prefix = 0u64;
        let mut rest = index.0;
        while rest != 0 {
            let slot = rest.trailing_zeros() as usize;
            if !self.eligible(slot, prefix) {
                return false;
            }
            prefix |= 1u64 << slot;
            rest &= rest - 1;
        }
        true
    }

    /// Number of concrete loadouts behind an index: two per selected switch node.
    pub fn multiplicity(&self, index: Sind) -> u128 {
        1u128 << (index.0 & self.switch_mask).count_ones()
    }

    pub fn encode(&self, assignment: &Assignment) -> ApplicationResult<Sind> {
        let mut bits = 0u64;
        for (id, rank) in assignment.iter() {
            if let Some(slots) = self.free.get(&id) {
                if usize::from(rank) > slots.len {
                    return Err(ApplicationError::InvalidSelection {
                        node: id,
                        reason: format!("rank {} exceeds capacity {}", rank, slots.len),
                    });
                }
                bits |= slots.mask(usize::from(rank));
            } else if !self.pre_filled.contains_key(&id) {
                return Err(ApplicationError::InvalidSelection {
                    node: id,
                    reason: "unknown node".to_string(),
                });
            }
        }
        Ok(Sind(bits))
    }

    /// Ranks of every node: free nodes as encoded, pre-filled nodes at full rank.
    pub fn decode(&self, index: Sind) -> Assignment {
        let free = self.free.iter().map(|(&id, slots)| {
            let rank = ((index.0 >> slots.start) & low_bits(slots.len)).count_ones();
            (id, rank as u8)
        });
        let fixed = self.pre_filled.iter().map(|(&id, &rank)| (id, rank));
        free.chain(fixed).collect()
    }

    /// Every loadout an index stands for, switch variants expanded.
    ///
    /// Switch nodes listed in `pinned` keep their given side and do not
    /// multiply the result.
    pub fn loadouts(
        &self,
        index: Sind,
        pinned: BTreeMap<NodeId, SwitchSide>,
    ) -> impl Iterator<Item = Loadout> + '_ {
        let assignment = self.decode(index);
        let switched: Vec<NodeId> = self
            .free
            .iter()
            .filter(|(id, s)| s.switch && index.has_slot(s.start) && !pinned.contains_key(*id))
            .map(|(&id, _)| id)
            .collect();
        let count = 1u128 << switched.len();

        (0..count).map(move |variant| {
            let mut loadout = Loadout::default();
            for (id, rank) in assignment.selected() {
                let side = match switched.iter().position(|&s| s == id) {
                    Some(pos) if (variant >> pos) & 1 == 0 => Some(SwitchSide::First),
                    Some(_) => Some(SwitchSide::Second),
                    None if self.is_free(id) => pinned.get(&id).copied(),
                    None => None,
                };
                let choice = match side {
                    Some(side) => Choice::Switched { rank, side },
                    None => Choice::Ranked(rank),
                };
                loadout.insert(id, choice);
            }
            loadout
        })
    }
}

pub(crate) fn low_bits(n: usize) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}
