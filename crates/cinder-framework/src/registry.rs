//! The matcher registry.
//!
//! Matchers are grouped into tiers by priority. The registry is shared by
//! every in-flight dispatch, so the dispatcher never iterates a live tier:
//! it takes a [`snapshot`](MatcherRegistry::snapshot), runs the copies, and
//! applies the removals it collected with a single
//! [`remove_all`](MatcherRegistry::remove_all) call.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

use crate::matcher::Matcher;

/// Identifies one registration of a matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatcherId(u64);

impl fmt::Display for MatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Priority-tiered storage of registered matchers.
#[derive(Default)]
pub struct MatcherRegistry {
    tiers: RwLock<BTreeMap<u32, Vec<(MatcherId, Matcher)>>>,
    next_id: AtomicU64,
}

impl MatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a matcher to the tier of its priority.
    pub fn register(&self, matcher: Matcher) -> MatcherId {
        let id = MatcherId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let priority = matcher.get_priority();
        debug!(matcher = %matcher, id = %id, "Registering matcher");
        self.tiers
            .write()
            .entry(priority)
            .or_default()
            .push((id, matcher));
        id
    }

    /// Removes one registration. Returns false if it was already gone.
    pub fn unregister(&self, id: MatcherId) -> bool {
        let mut tiers = self.tiers.write();
        let mut found = false;
        for tier in tiers.values_mut() {
            let before = tier.len();
            tier.retain(|(entry, _)| *entry != id);
            found |= tier.len() != before;
        }
        tiers.retain(|_, tier| !tier.is_empty());
        found
    }

    /// Returns the registered priorities in ascending order.
    pub fn priorities(&self) -> Vec<u32> {
        self.tiers.read().keys().copied().collect()
    }

    /// Copies the current contents of one tier in registration order.
    pub fn snapshot(&self, priority: u32) -> Vec<(MatcherId, Matcher)> {
        self.tiers
            .read()
            .get(&priority)
            .cloned()
            .unwrap_or_default()
    }

    /// Removes every listed registration from a tier under one lock.
    ///
    /// Ids that are no longer present are ignored. Returns how many entries
    /// were removed.
    pub fn remove_all(&self, priority: u32, ids: &[MatcherId]) -> usize {
        if ids.is_empty() {
            return 0;
        }
        let mut tiers = self.tiers.write();
        let Some(tier) = tiers.get_mut(&priority) else {
            return 0;
        };
        let before = tier.len();
        tier.retain(|(id, _)| !ids.contains(id));
        let removed = before - tier.len();
        if tier.is_empty() {
            tiers.remove(&priority);
        }
        removed
    }

    pub fn contains(&self, id: MatcherId) -> bool {
        self.tiers
            .read()
            .values()
            .any(|tier| tier.iter().any(|(entry, _)| *entry == id))
    }

    /// Total number of registered matchers.
    pub fn len(&self) -> usize {
        self.tiers.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MatcherRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherRegistry")
            .field("priorities", &self.priorities())
            .field("matcher_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_are_ordered() {
        let registry = MatcherRegistry::new();
        registry.register(Matcher::new().priority(10));
        registry.register(Matcher::new().priority(1));
        registry.register(Matcher::new().priority(5));
        registry.register(Matcher::new().priority(5));

        assert_eq!(registry.priorities(), vec![1, 5, 10]);
        assert_eq!(registry.snapshot(5).len(), 2);
        assert!(registry.snapshot(7).is_empty());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_remove_all_handles_any_positions() {
        let registry = MatcherRegistry::new();
        let ids: Vec<_> = (0..5)
            .map(|i| registry.register(Matcher::new().priority(1).name(i.to_string())))
            .collect();

        let removed = registry.remove_all(1, &[ids[0], ids[1], ids[3]]);
        assert_eq!(removed, 3);

        let names: Vec<_> = registry
            .snapshot(1)
            .iter()
            .map(|(_, m)| m.get_name().unwrap_or_default().to_string())
            .collect();
        assert_eq!(names, vec!["2", "4"]);

        // Already removed ids are a no-op.
        assert_eq!(registry.remove_all(1, &[ids[0]]), 0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let registry = MatcherRegistry::new();
        let id = registry.register(Matcher::new());
        let snapshot = registry.snapshot(1);

        registry.remove_all(1, &[id]);
        assert_eq!(snapshot.len(), 1);
        assert!(!registry.contains(id));
        assert!(registry.priorities().is_empty());
    }

    #[test]
    fn test_unregister() {
        let registry = MatcherRegistry::new();
        let id = registry.register(Matcher::new().priority(3));
        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }
}
