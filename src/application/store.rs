//! Result store: every solved configuration bucketed by budget, plus the
//! filtered view, the reconstructor and page-wise access.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::application::index::{IndexLayout, Sind};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{Assignment, Constraint, Loadout, NodeId, Pin, SwitchSide};

/// One solved configuration and the number of loadouts it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entry {
    pub index: Sind,
    pub multiplicity: u128,
}

/// Per-bucket entry lists, index = budget.
pub(crate) type Buckets = Vec<Vec<Entry>>;

/// Constraint compiled against a layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CompiledFilter {
    include: u64,
    exclude: u64,
    side_pins: u32,
    /// Set when a pre-filled node is excluded: nothing can match
    unsatisfiable: bool,
}

impl CompiledFilter {
    fn admit(&self, entry: &Entry) -> Option<Entry> {
        let bits = entry.index.bits();
        if self.unsatisfiable || bits & self.exclude != 0 || !bits & self.include != 0 {
            return None;
        }
        Some(Entry {
            index: entry.index,
            multiplicity: entry.multiplicity >> self.side_pins,
        })
    }
}

/// Solved configurations of one tree for budgets `0..=limit`.
///
/// Read-only after the solve except for the filtered view, which
/// [`ResultStore::apply_filter`] rebuilds. Must be discarded when the tree changes.
#[derive(Debug, Clone)]
pub struct ResultStore {
    layout: IndexLayout,
    limit: u32,
    all: Buckets,
    /// `None` while no constraint is active: the view is `all`
    filtered: Option<Buckets>,
    constraint: Constraint,
    generation: u64,
    truncated: bool,
    elapsed: Duration,
}

impl ResultStore {
    pub(crate) fn new(
        layout: IndexLayout,
        limit: u32,
        all: Buckets,
        truncated: bool,
        elapsed: Duration,
    ) -> Self {
        Self {
            layout,
            limit,
            all,
            filtered: None,
            constraint: Constraint::new(),
            generation: 0,
            truncated,
            elapsed,
        }
    }

    pub fn layout(&self) -> &IndexLayout {
        &self.layout
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Budgets held by the store, `0..=limit`.
    pub fn budgets(&self) -> impl Iterator<Item = u32> {
        0..=self.limit
    }

    /// Whether the safety guard stopped the enumeration early.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    /// Bumped on every filter change; pages are stable within one generation.
    pub fn filter_generation(&self) -> u64 {
        self.generation
    }

    pub fn all(&self, budget: u32) -> ApplicationResult<&[Entry]> {
        self.check_budget(budget)?;
        Ok(&self.all[budget as usize])
    }

    pub fn filtered(&self, budget: u32) -> ApplicationResult<&[Entry]> {
        self.check_budget(budget)?;
        Ok(&self.view()[budget as usize])
    }

    pub fn filtered_len(&self, budget: u32) -> ApplicationResult<usize> {
        self.filtered(budget).map(<[Entry]>::len)
    }

    /// Loadouts behind the filtered entries of one budget.
    pub fn configuration_count(&self, budget: u32) -> ApplicationResult<u128> {
        Ok(self.filtered(budget)?.iter().map(|e| e.multiplicity).sum())
    }

    pub fn total_entries(&self) -> usize {
        self.all.iter().map(Vec::len).sum()
    }

    pub fn total_configurations(&self) -> u128 {
        self.all.iter().flatten().map(|e| e.multiplicity).sum()
    }

    pub fn filtered_entries(&self) -> usize {
        self.view().iter().map(Vec::len).sum()
    }

    pub fn filtered_configurations(&self) -> u128 {
        self.view().iter().flatten().map(|e| e.multiplicity).sum()
    }

    fn view(&self) -> &Buckets {
        self.filtered.as_ref().unwrap_or(&self.all)
    }

    /// Rebuild the filtered view of every budget from the stored entries.
    ///
    /// Pins are checked against the layout first; an invalid constraint leaves
    /// the current view untouched. Entry order is preserved.
    #[instrument(level = "debug", skip(self, constraint), fields(pins = constraint.len()))]
    pub fn apply_filter(&mut self, constraint: &Constraint) -> ApplicationResult<()> {
        let compiled = self.compile(constraint)?;
        self.filtered = if constraint.is_empty() {
            None
        } else {
            Some(
                self.all
                    .iter()
                    .map(|bucket| bucket.iter().filter_map(|e| compiled.admit(e)).collect())
                    .collect(),
            )
        };
        self.constraint = constraint.clone();
        self.generation += 1;
        debug!(
            "apply_filter: {} of {} entries kept",
            self.filtered_entries(),
            self.total_entries()
        );
        Ok(())
    }

    /// Drop the constraint; the filtered view equals the full result set again.
    pub fn clear_filter(&mut self) {
        self.filtered = None;
        self.constraint = Constraint::new();
        self.generation += 1;
    }

    fn compile(&self, constraint: &Constraint) -> ApplicationResult<CompiledFilter> {
        let mut compiled = CompiledFilter::default();
        for (node, pin) in constraint.iter() {
            let Some(capacity) = self.layout.capacity(node) else {
                return Err(ApplicationError::InvalidSelection {
                    node,
                    reason: "unknown node".to_string(),
                });
            };
            let pre_filled = self.layout.is_pre_filled(node);
            match pin {
                Pin::Excluded if pre_filled => compiled.unsatisfiable = true,
                Pin::Excluded => compiled.exclude |= self.rank_mask(node, 1)?,
                Pin::Rank(rank) if rank > capacity => {
                    return Err(ApplicationError::InvalidSelection {
                        node,
                        reason: format!("rank {rank} exceeds capacity {capacity}"),
                    })
                }
                Pin::Rank(_) if pre_filled => {}
                Pin::Rank(rank) => compiled.include |= self.rank_mask(node, rank)?,
                Pin::Side(_) if !self.layout.is_switch(node) => {
                    return Err(ApplicationError::InvalidSelection {
                        node,
                        reason: "side pinned on a node without variants".to_string(),
                    })
                }
                Pin::Side(_) if pre_filled => {}
                Pin::Side(_) => {
                    compiled.include |= self.rank_mask(node, 1)?;
                    compiled.side_pins += 1;
                }
            }
        }
        Ok(compiled)
    }

    fn rank_mask(&self, node: NodeId, rank: u8) -> ApplicationResult<u64> {
        self.layout
            .rank_mask(node, rank)
            .ok_or_else(|| ApplicationError::InvalidSelection {
                node,
                reason: "node is not open to free choice".to_string(),
            })
    }

    /// Reconstruct the assignment behind an index.
    ///
    /// Any rule-valid index within the limit decodes; everything else is
    /// `InvalidIndex`.
    pub fn decode(&self, index: Sind) -> ApplicationResult<Assignment> {
        self.check_index(index)?;
        Ok(self.layout.decode(index))
    }

    /// Concrete loadouts behind an index, one per switch variant combination.
    ///
    /// Side pins of the active constraint fix their nodes, so a filtered
    /// entry yields exactly `multiplicity` loadouts.
    pub fn loadouts(&self, index: Sind) -> ApplicationResult<impl Iterator<Item = Loadout> + '_> {
        self.check_index(index)?;
        Ok(self.layout.loadouts(index, self.pinned_sides()))
    }

    /// Side pins of the active constraint on free switch nodes.
    pub fn pinned_sides(&self) -> BTreeMap<NodeId, SwitchSide> {
        self.constraint
            .iter()
            .filter_map(|(node, pin)| match pin {
                Pin::Side(side) if self.layout.is_free(node) => Some((node, side)),
                _ => None,
            })
            .collect()
    }

    pub fn encode(&self, assignment: &Assignment) -> ApplicationResult<Sind> {
        self.layout.encode(assignment)
    }

    /// Contiguous slice of filtered entries in insertion order.
    ///
    /// A page past the end is empty.
    pub fn page(&self, budget: u32, page: usize, page_size: usize) -> ApplicationResult<&[Entry]> {
        if page_size == 0 {
            return Err(ApplicationError::InvalidPageSize);
        }
        let entries = self.filtered(budget)?;
        let start = page.saturating_mul(page_size).min(entries.len());
        let end = start.saturating_add(page_size).min(entries.len());
        Ok(&entries[start..end])
    }

    pub fn page_count(&self, budget: u32, page_size: usize) -> ApplicationResult<usize> {
        if page_size == 0 {
            return Err(ApplicationError::InvalidPageSize);
        }
        Ok(self.filtered_len(budget)?.div_ceil(page_size))
    }

    /// Decode every entry of one page.
    pub fn decode_page(
        &self,
        budget: u32,
        page: usize,
        page_size: usize,
    ) -> ApplicationResult<Vec<(Entry, Assignment)>> {
        self.page(budget, page, page_size)?
            .iter()
            .map(|entry| Ok((*entry, self.decode(entry.index)?)))
            .collect()
    }

    fn check_budget(&self, budget: u32) -> ApplicationResult<()> {
        if budget > self.limit {
            return Err(ApplicationError::BudgetOutOfRange {
                budget,
                limit: self.limit,
            });
        }
        Ok(())
    }

    fn check_index(&self, index: Sind) -> ApplicationResult<()> {
        if index.budget() > self.limit || !self.layout.is_valid(index) {
            return Err(ApplicationError::InvalidIndex(index.bits()));
        }
        Ok(())
    }
}
