use gd_document::RunHandle;
use std::collections::HashSet;

/// Runs that must be redrawn on the next sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationSet {
    runs: HashSet<RunHandle>,
}

impl InvalidationSet {
    pub fn insert(&mut self, handle: RunHandle) {
        self.runs.insert(handle);
    }

    pub fn extend(&mut self, handles: impl IntoIterator<Item = RunHandle>) {
        self.runs.extend(handles);
    }

    pub fn contains(&self, handle: RunHandle) -> bool {
        self.runs.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn clear(&mut self) {
        self.runs.clear();
    }

    /// Handles in a stable order, oldest generation first.
    pub fn sorted(&self) -> Vec<RunHandle> {
        let mut out: Vec<RunHandle> = self.runs.iter().copied().collect();
        out.sort_unstable();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::InvalidationSet;
    use gd_document::RunHandle;
    use proptest::prelude::*;

    fn handle(index: u32) -> RunHandle {
        RunHandle {
            generation: 1,
            index,
        }
    }

    #[test]
    fn duplicates_collapse() {
        let mut set = InvalidationSet::default();
        set.insert(handle(3));
        set.insert(handle(3));
        set.extend([handle(1), handle(3)]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.sorted(), vec![handle(1), handle(3)]);
        set.clear();
        assert!(set.is_empty());
    }

    proptest! {
        #[test]
        fn repeated_invalidation_is_idempotent(indices in proptest::collection::vec(0u32..64, 0..40)) {
            let mut once = InvalidationSet::default();
            let mut twice = InvalidationSet::default();
            for index in &indices {
                once.insert(handle(*index));
                twice.insert(handle(*index));
                twice.insert(handle(*index));
            }
            prop_assert_eq!(once, twice);
        }
    }
}
