//! Release tracking for pipeline scratch buffers.
//!
//! The capture pipeline allocates several intermediate images per run. Each
//! one is registered with a [`ScratchLedger`] and must be released exactly
//! once on every exit path, whether the run retextures the model, finds no
//! target, or bails out early. Guards release on drop; handing a buffer out
//! of the pipeline with [`Scratch::into_inner`] also counts as its release.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

#[derive(Debug)]
struct Entry {
    label: &'static str,
    releases: u32,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<Entry>,
}

impl Inner {
    fn release(&mut self, id: usize) {
        if let Some(entry) = self.entries.get_mut(id) {
            entry.releases += 1;
        }
    }
}

/// Accounting violation discovered by [`ScratchLedger::faults`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchFault {
    Leaked(&'static str),
    DoubleReleased(&'static str),
}

impl fmt::Display for ScratchFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScratchFault::Leaked(label) => write!(f, "scratch buffer '{}' never released", label),
            ScratchFault::DoubleReleased(label) => {
                write!(f, "scratch buffer '{}' released more than once", label)
            }
        }
    }
}

/// Ledger of scratch buffer acquisitions and releases for one pipeline run.
#[derive(Debug, Default, Clone)]
pub struct ScratchLedger {
    inner: Rc<RefCell<Inner>>,
}

impl ScratchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a buffer and wrap it in a releasing guard.
    pub fn track<T>(&self, label: &'static str, value: T) -> Scratch<T> {
        let id = {
            let mut inner = self.inner.borrow_mut();
            inner.entries.push(Entry { label, releases: 0 });
            inner.entries.len() - 1
        };
        Scratch {
            value: Some(value),
            id,
            inner: Rc::clone(&self.inner),
        }
    }

    /// Number of buffers registered so far.
    pub fn acquired(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Buffers not yet released.
    pub fn outstanding(&self) -> usize {
        self.inner
            .borrow()
            .entries
            .iter()
            .filter(|e| e.releases == 0)
            .count()
    }

    /// Every buffer released a number of times other than exactly one.
    pub fn faults(&self) -> Vec<ScratchFault> {
        self.inner
            .borrow()
            .entries
            .iter()
            .filter_map(|e| match e.releases {
                0 => Some(ScratchFault::Leaked(e.label)),
                1 => None,
                _ => Some(ScratchFault::DoubleReleased(e.label)),
            })
            .collect()
    }

    #[cfg(test)]
    fn release(&self, id: usize) {
        self.inner.borrow_mut().release(id);
    }
}

/// Guard owning one tracked scratch buffer.
pub struct Scratch<T> {
    value: Option<T>,
    id: usize,
    inner: Rc<RefCell<Inner>>,
}

impl<T> Scratch<T> {
    /// Take the buffer out of the guard, recording its release.
    pub fn into_inner(mut self) -> T {
        self.record_release();
        // The value is present until taken here; drop sees None afterwards.
        self.value.take().expect("scratch value already taken")
    }

    fn record_release(&self) {
        self.inner.borrow_mut().release(self.id);
    }
}

impl<T> Deref for Scratch<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.value {
            Some(value) => value,
            None => unreachable!("scratch value taken while guard alive"),
        }
    }
}

impl<T> DerefMut for Scratch<T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.value {
            Some(value) => value,
            None => unreachable!("scratch value taken while guard alive"),
        }
    }
}

impl<T> Drop for Scratch<T> {
    fn drop(&mut self) {
        if self.value.is_some() {
            self.inner.borrow_mut().release(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_releases_once() {
        let ledger = ScratchLedger::new();
        {
            let _a = ledger.track("a", vec![1u8, 2, 3]);
            let _b = ledger.track("b", String::from("edges"));
            assert_eq!(ledger.outstanding(), 2);
        }
        assert_eq!(ledger.acquired(), 2);
        assert_eq!(ledger.outstanding(), 0);
        assert!(ledger.faults().is_empty());
    }

    #[test]
    fn test_into_inner_counts_as_release() {
        let ledger = ScratchLedger::new();
        let buf = ledger.track("warp", vec![0u8; 16]);
        let taken = buf.into_inner();
        assert_eq!(taken.len(), 16);
        assert_eq!(ledger.outstanding(), 0);
        assert!(ledger.faults().is_empty());
    }

    #[test]
    fn test_leak_is_reported() {
        let ledger = ScratchLedger::new();
        let kept = ledger.track("gray", 7u32);
        assert_eq!(ledger.faults(), vec![ScratchFault::Leaked("gray")]);
        drop(kept);
        assert!(ledger.faults().is_empty());
    }

    #[test]
    fn test_double_release_is_reported() {
        let ledger = ScratchLedger::new();
        let guard = ledger.track("edges", 1u8);
        ledger.release(guard.id);
        drop(guard);
        assert_eq!(
            ledger.faults(),
            vec![ScratchFault::DoubleReleased("edges")]
        );
    }

    #[test]
    fn test_guard_derefs_to_value() {
        let ledger = ScratchLedger::new();
        let mut buf = ledger.track("gray", vec![1u8, 2]);
        buf.push(3);
        assert_eq!(buf.len(), 3);
    }
}
