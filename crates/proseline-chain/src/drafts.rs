//! Resolution of the draft DAG.
//!
//! Drafts name up to two parents by digest. A draft whose parents are all
//! known is resolved; otherwise it waits, and resolving a parent releases
//! every draft that was waiting only on it. No order is imposed beyond that.

use std::collections::{HashMap, HashSet};

use proseline_core::Digest;

/// Outcome of recording a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftStatus {
    /// The draft is resolved, along with the waiting drafts it released.
    Resolved { released: Vec<Digest> },
    /// The draft waits for these parents.
    Pending { missing: Vec<Digest> },
}

/// Known drafts of a project, across all of its logs.
#[derive(Debug, Clone, Default)]
pub struct DraftGraph {
    known: HashSet<Digest>,
    /// Pending draft -> parents it still waits for.
    pending: HashMap<Digest, HashSet<Digest>>,
    /// Missing parent -> pending drafts waiting for it.
    waiting: HashMap<Digest, Vec<Digest>>,
}

impl DraftGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_resolved(&self, draft: &Digest) -> bool {
        self.known.contains(draft)
    }

    pub fn is_pending(&self, draft: &Digest) -> bool {
        self.pending.contains_key(draft)
    }

    pub fn resolved_len(&self) -> usize {
        self.known.len()
    }

    /// Every parent some pending draft waits for.
    pub fn missing_parents(&self) -> Vec<Digest> {
        let mut missing: Vec<Digest> = self.waiting.keys().copied().collect();
        missing.sort_unstable();
        missing
    }

    /// Record a draft imported from elsewhere, with no parent check.
    pub fn import(&mut self, draft: Digest) -> Vec<Digest> {
        self.pending.remove(&draft);
        self.resolve(draft)
    }

    /// Record a draft and its parents.
    pub fn insert(&mut self, draft: Digest, parents: &[Digest]) -> DraftStatus {
        if self.known.contains(&draft) {
            return DraftStatus::Resolved {
                released: Vec::new(),
            };
        }

        let missing: HashSet<Digest> = parents
            .iter()
            .filter(|parent| !self.known.contains(*parent))
            .copied()
            .collect();

        if missing.is_empty() {
            return DraftStatus::Resolved {
                released: self.resolve(draft),
            };
        }

        for parent in &missing {
            let children = self.waiting.entry(*parent).or_default();
            if !children.contains(&draft) {
                children.push(draft);
            }
        }
        let mut list: Vec<Digest> = missing.iter().copied().collect();
        list.sort_unstable();
        self.pending.insert(draft, missing);
        DraftStatus::Pending { missing: list }
    }

    /// Mark `draft` known and release everything that was waiting on it.
    fn resolve(&mut self, draft: Digest) -> Vec<Digest> {
        let mut released = Vec::new();
        let mut queue = vec![draft];
        self.known.insert(draft);

        while let Some(parent) = queue.pop() {
            for child in self.waiting.remove(&parent).unwrap_or_default() {
                let Some(missing) = self.pending.get_mut(&child) else {
                    continue;
                };
                missing.remove(&parent);
                if missing.is_empty() {
                    self.pending.remove(&child);
                    self.known.insert(child);
                    released.push(child);
                    queue.push(child);
                }
            }
        }
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(byte: u8) -> Digest {
        Digest([byte; 32])
    }

    #[test]
    fn test_root_draft_resolves() {
        let mut graph = DraftGraph::new();
        assert_eq!(
            graph.insert(d(1), &[]),
            DraftStatus::Resolved { released: vec![] }
        );
        assert!(graph.is_resolved(&d(1)));
    }

    #[test]
    fn test_unknown_parent_pends_then_releases() {
        let mut graph = DraftGraph::new();
        assert_eq!(
            graph.insert(d(2), &[d(1)]),
            DraftStatus::Pending { missing: vec![d(1)] }
        );
        assert!(graph.is_pending(&d(2)));
        assert_eq!(graph.missing_parents(), vec![d(1)]);

        assert_eq!(
            graph.insert(d(1), &[]),
            DraftStatus::Resolved {
                released: vec![d(2)]
            }
        );
        assert!(graph.is_resolved(&d(2)));
        assert!(graph.missing_parents().is_empty());
    }

    #[test]
    fn test_merge_waits_for_both_parents() {
        let mut graph = DraftGraph::new();
        graph.insert(d(3), &[d(1), d(2)]);
        assert_eq!(
            graph.insert(d(1), &[]),
            DraftStatus::Resolved { released: vec![] }
        );
        assert!(graph.is_pending(&d(3)));
        assert_eq!(
            graph.insert(d(2), &[]),
            DraftStatus::Resolved {
                released: vec![d(3)]
            }
        );
    }

    #[test]
    fn test_release_cascades() {
        let mut graph = DraftGraph::new();
        graph.insert(d(3), &[d(2)]);
        graph.insert(d(2), &[d(1)]);
        match graph.import(d(1)).as_slice() {
            [a, b] => {
                assert_eq!(*a, d(2));
                assert_eq!(*b, d(3));
            }
            other => panic!("unexpected release {other:?}"),
        }
        assert_eq!(graph.resolved_len(), 3);
    }
}
