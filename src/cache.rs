use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::nfp::NfpOutcome;

/// Identity of an NFP query. Rotations are stored as the bit pattern of the
/// angle in degrees; the same angle always produces the same bits, so keys
/// are deterministic and independent of insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NfpKey {
    pub a: usize,
    pub b: usize,
    pub a_rot: u64,
    pub b_rot: u64,
    pub inside: bool,
}

impl NfpKey {
    pub fn outer(a: usize, b: usize, a_rot: f64, b_rot: f64) -> Self {
        Self {
            a,
            b,
            a_rot: a_rot.to_bits(),
            b_rot: b_rot.to_bits(),
            inside: false,
        }
    }

    pub fn inner(a: usize, b: usize, a_rot: f64, b_rot: f64) -> Self {
        Self {
            a,
            b,
            a_rot: a_rot.to_bits(),
            b_rot: b_rot.to_bits(),
            inside: true,
        }
    }
}

/// Pseudo part id used for the container side of inner NFP keys.
pub const CONTAINER_ID: usize = usize::MAX;

/// Shared NFP store with at-most-one compute per key.
///
/// The first caller for a key runs the computation inside the entry's
/// `OnceLock`; concurrent callers for the same key block there until the
/// value is published and then read it lock-free. Failed computations are
/// cached like any other outcome so they are never retried.
#[derive(Default)]
pub struct NfpCache {
    entries: Mutex<HashMap<NfpKey, Arc<OnceLock<Arc<NfpOutcome>>>>>,
}

impl NfpCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the NFP for `key`, computing it with `compute` on first use.
    pub fn get_or_compute<F>(&self, key: NfpKey, compute: F) -> Arc<NfpOutcome>
    where
        F: FnOnce() -> NfpOutcome,
    {
        let cell = {
            let mut entries = self.entries.lock().unwrap();
            entries.entry(key).or_default().clone()
        };
        cell.get_or_init(|| Arc::new(compute())).clone()
    }

    /// Value previously computed for `key`, if any.
    pub fn get(&self, key: &NfpKey) -> Option<Arc<NfpOutcome>> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).and_then(|cell| cell.get().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
