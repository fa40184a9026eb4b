//! Handle identities
//!
//! A handle names one mutation origin (one edit widget, one form). It is
//! minted once when the origin is created and kept for its whole lifetime.
//! Handles are process-local and never serialized.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one mutation origin
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Mint a fresh handle from the process-wide minter
    #[inline]
    pub fn mint() -> Self {
        HandleMinter::global().mint()
    }

    /// Raw counter value, for logging
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:x})", self.0)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

static GLOBAL_MINTER: HandleMinter = HandleMinter::new();

/// Monotonic handle source
///
/// Ids start at 1 and are never reused by the same minter. The global
/// minter backs [`HandleId::mint`]; local minters exist for tests that
/// want predictable ids.
#[derive(Debug)]
pub struct HandleMinter {
    next: AtomicU64,
}

impl HandleMinter {
    pub const fn new() -> Self {
        HandleMinter {
            next: AtomicU64::new(1),
        }
    }

    pub fn global() -> &'static HandleMinter {
        &GLOBAL_MINTER
    }

    pub fn mint(&self) -> HandleId {
        HandleId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of handles minted so far
    pub fn minted(&self) -> u64 {
        self.next.load(Ordering::Relaxed) - 1
    }
}

impl Default for HandleMinter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_local_minter_is_sequential() {
        let minter = HandleMinter::new();
        let a = minter.mint();
        let b = minter.mint();

        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        assert_eq!(minter.minted(), 2);
    }

    #[test]
    fn test_global_handles_are_unique() {
        let handles: HashSet<HandleId> = (0..1000).map(|_| HandleId::mint()).collect();
        assert_eq!(handles.len(), 1000);
        assert!(!handles.iter().any(|h| h.get() == 0));
    }

    #[test]
    fn test_global_handles_unique_across_threads() {
        let threads: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..250).map(|_| HandleId::mint()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for t in threads {
            for h in t.join().unwrap() {
                assert!(seen.insert(h), "handle {:?} minted twice", h);
            }
        }
        assert_eq!(seen.len(), 1000);
    }

    #[test]
    fn test_handle_debug_format() {
        let minter = HandleMinter::new();
        minter.mint();
        let h = minter.mint();
        assert_eq!(format!("{:?}", h), "Handle(2)");
        assert_eq!(h.to_string(), "2");
    }
}
