//! Solver service
//!
//! Enumerates every rule-valid configuration of a talent tree up to a point
//! limit and collects them into a [`ResultStore`], bucketed by budget.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::application::index::{IndexLayout, Sind};
use crate::application::store::{Buckets, Entry, ResultStore};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{DomainError, Tree};

/// Service turning a tree and a point limit into a result store.
pub struct SolverService {
    settings: Arc<Settings>,
}

impl SolverService {
    /// Create a new solver service.
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Enumerate all configurations spending `0..=limit` free points.
    ///
    /// Fails with `TreeTooLarge` before any traversal when the tree exposes
    /// more than 64 free points or `limit` exceeds the tree's ceiling. Blocks
    /// until every worker has finished.
    #[instrument(level = "debug", skip(self, tree), fields(tree = %tree.name()))]
    pub fn solve(&self, tree: &Tree, limit: u32) -> ApplicationResult<ResultStore> {
        let options = &self.settings.solver;
        let layout = IndexLayout::build(tree, options.unlock_rule)?;

        let ceiling = tree.max_talent_points();
        if limit > ceiling {
            return Err(DomainError::TreeTooLarge {
                requested: limit,
                allowed: ceiling,
            }
            .into());
        }
        debug!(
            "solve: {} slots, limit={}, rule={}",
            layout.len(),
            limit,
            options.unlock_rule
        );

        let started = Instant::now();
        let guard = SafetyGuard::new(options.max_configurations);
        let enumerator = Enumerator {
            layout: &layout,
            limit,
            guard: &guard,
        };
        let buckets = if options.threads == 0 {
            enumerator.run()
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(options.threads)
                .build()
                .map_err(|e| ApplicationError::OperationFailed {
                    context: format!("build thread pool with {} threads", options.threads),
                    source: Box::new(e),
                })?;
            pool.install(|| enumerator.run())
        };
        let elapsed = started.elapsed();

        let truncated = guard.tripped();
        if truncated {
            warn!(
                "solve: stopped after {} configurations, results are incomplete",
                options.max_configurations
            );
        }

        let store = ResultStore::new(layout, limit, buckets, truncated, elapsed);
        info!(
            "solve: {} entries, {} configurations in {:?}",
            store.total_entries(),
            store.total_configurations(),
            elapsed
        );
        Ok(store)
    }
}

/// Caps the number of stored entries across all workers.
struct SafetyGuard {
    capacity: usize,
    stored: AtomicUsize,
    tripped: AtomicBool,
}

impl SafetyGuard {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            stored: AtomicUsize::new(0),
            tripped: AtomicBool::new(false),
        }
    }

    /// Reserve room for one more entry.
    fn admit(&self) -> bool {
        if self.stored.fetch_add(1, Ordering::Relaxed) < self.capacity {
            true
        } else {
            self.tripped.store(true, Ordering::Relaxed);
            false
        }
    }

    fn tripped(&self) -> bool {
        self.tripped.load(Ordering::Relaxed)
    }
}

/// Depth-first walk over slot sets in ascending slot order.
///
/// From the last added slot only later slots are tried, so every set is
/// produced once; every state reached is itself a valid configuration.
struct Enumerator<'a> {
    layout: &'a IndexLayout,
    limit: u32,
    guard: &'a SafetyGuard,
}

impl Enumerator<'_> {
    fn run(&self) -> Buckets {
        let mut buckets = empty_buckets(self.limit);
        if self.guard.admit() {
            buckets[0].push(Entry {
                index: Sind::EMPTY,
                multiplicity: 1,
            });
        }
        if self.limit == 0 {
            return buckets;
        }

        // Every non-empty configuration starts at a slot open on an empty tree;
        // each worker owns the configurations of one such first slot.
        let roots: Vec<usize> = (0..self.layout.len())
            .filter(|&slot| self.layout.eligible(slot, 0))
            .collect();
        debug!("run: {} root slots", roots.len());

        let partials: Vec<Buckets> = roots
            .par_iter()
            .map(|&slot| {
                let mut own = empty_buckets(self.limit);
                self.visit(slot, Sind::EMPTY, &mut own);
                own
            })
            .collect();

        for partial in partials {
            for (budget, entries) in partial.into_iter().enumerate() {
                buckets[budget].extend(entries);
            }
        }
        buckets
    }

    /// Add `slot` to `set`, record the result and extend it further.
    /// Returns false once the safety guard trips.
    fn visit(&self, slot: usize, set: Sind, out: &mut Buckets) -> bool {
        let set = set.with_slot(slot);
        if !self.guard.admit() {
            return false;
        }
        let budget = set.budget();
        out[budget as usize].push(Entry {
            index: set,
            multiplicity: self.layout.multiplicity(set),
        });
        if budget == self.limit {
            return true;
        }
        for next in slot + 1..self.layout.len() {
            if self.layout.eligible(next, set.bits()) && !self.visit(next, set, out) {
                return false;
            }
        }
        true
    }
}

fn empty_buckets(limit: u32) -> Buckets {
    vec![Vec::new(); limit as usize + 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Node, TreeBuilder};

    #[test]
    fn given_guard_capacity_when_admitting_then_trips_after_capacity() {
        let guard = SafetyGuard::new(2);
        assert!(guard.admit());
        assert!(guard.admit());
        assert!(!guard.tripped());
        assert!(!guard.admit());
        assert!(guard.tripped());
    }

    #[test]
    fn given_single_node_when_solving_then_two_buckets() {
        let tree = TreeBuilder::new("one")
            .node(Node::new(1, "A"))
            .build()
            .unwrap();
        let service = SolverService::new(Arc::new(Settings::default()));

        let store = service.solve(&tree, 1).unwrap();

        assert_eq!(store.all(0).unwrap().len(), 1);
        assert_eq!(store.all(1).unwrap().len(), 1);
        assert_eq!(store.all(1).unwrap()[0].index, Sind(1));
        assert!(!store.is_truncated());
    }
}
