//! Duplicate detection by content fingerprint.
//!
//! Two records are duplicates when they have the same move list and the
//! same declared winner. Metadata such as player names or dates is not
//! part of the fingerprint, so the same game imported from two servers is
//! caught.

use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use parking_lot::Mutex;

/// Hash of the ordered move list plus the winner.
///
/// Each item is hashed with its length, so `["ab", "c"]` and `["a", "bc"]`
/// do not collide by construction.
pub fn fingerprint<S: AsRef<str>>(moves: &[S], winner: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    moves.len().hash(&mut hasher);
    for mv in moves {
        mv.as_ref().hash(&mut hasher);
    }
    winner.hash(&mut hasher);
    hasher.finish()
}

/// Append-only set of fingerprints already accepted.
#[derive(Debug, Default)]
pub struct DedupIndex {
    seen: Mutex<HashSet<u64>>,
}

impl DedupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `moves` and `winner`. Returns `true` for the first
    /// submission of this content and `false` for every later one.
    ///
    /// Hashing happens outside the lock; only the insert is serialized.
    pub fn submit<S: AsRef<str>>(&self, moves: &[S], winner: &str) -> bool {
        self.submit_fingerprint(fingerprint(moves, winner))
    }

    pub fn submit_fingerprint(&self, fp: u64) -> bool {
        self.seen.lock().insert(fp)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_first_submission_wins() {
        let index = DedupIndex::new();
        assert!(index.submit(&["Bdd", "Wpp"], "B"));
        assert!(!index.submit(&["Bdd", "Wpp"], "B"));
        assert!(index.submit(&["Bdd", "Wpp"], "W"), "winner is part of the content");
        assert!(index.submit(&["Wpp", "Bdd"], "B"), "order is part of the content");
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_item_boundaries_matter() {
        assert_ne!(fingerprint(&["ab", "c"], ""), fingerprint(&["a", "bc"], ""));
        assert_ne!(fingerprint::<&str>(&[], "B"), fingerprint(&["B"], ""));
    }

    #[test]
    fn test_one_acceptance_under_any_worker_count() {
        for workers in [1, 2, 8, 32] {
            let index = Arc::new(DedupIndex::new());
            let accepted = Arc::new(AtomicUsize::new(0));
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let index = index.clone();
                    let accepted = accepted.clone();
                    thread::spawn(move || {
                        if index.submit(&["Bdd", "Wdp", "Bpd"], "W") {
                            accepted.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                })
                .collect();
            for h in handles {
                h.join().unwrap();
            }
            assert_eq!(accepted.load(Ordering::SeqCst), 1, "{workers} workers");
            assert_eq!(index.len(), 1);
        }
    }
}
