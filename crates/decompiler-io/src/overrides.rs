//! Persisted form of the per-function Override set (spec.md §4.6, §6).
//!
//! `Funcdata::overrides` (decompiler-core) holds a function's overrides
//! while it is loaded; this module is the storage layer underneath it --
//! overrides keyed by the function's entry address so they survive across
//! a `clear_analysis`/reload cycle, the way they would be re-applied from
//! a project database in the real decompiler.
//!
//! Follows the one-insert/get/remove-method-per-stored-kind trait shape
//! used for persistence elsewhere in this workspace, plus its
//! `HashMap`-backed reference implementation; no SQL-backed
//! implementation is carried over (DESIGN.md).

use std::collections::HashMap;

use decompiler_core::{Address, Override};

use crate::error::IoError;

/// Storage contract for per-function override sets, keyed by the owning
/// function's entry address.
pub trait OverrideStore {
    fn put(&mut self, function: Address, overrides: Vec<Override>);
    fn get(&self, function: Address) -> Option<&[Override]>;
    fn append(&mut self, function: Address, entry: Override);
    fn remove(&mut self, function: Address) -> Result<(), IoError>;
    fn clear(&mut self, function: Address);
}

/// `HashMap`-backed reference implementation, the override-set analogue
/// of the in-memory store used elsewhere in this workspace.
#[derive(Debug, Default, Clone)]
pub struct InMemoryOverrideStore {
    by_function: HashMap<Address, Vec<Override>>,
}

impl InMemoryOverrideStore {
    pub fn new() -> Self {
        InMemoryOverrideStore { by_function: HashMap::new() }
    }

    pub fn function_count(&self) -> usize {
        self.by_function.len()
    }
}

impl OverrideStore for InMemoryOverrideStore {
    fn put(&mut self, function: Address, overrides: Vec<Override>) {
        self.by_function.insert(function, overrides);
    }

    fn get(&self, function: Address) -> Option<&[Override]> {
        self.by_function.get(&function).map(|v| v.as_slice())
    }

    fn append(&mut self, function: Address, entry: Override) {
        self.by_function.entry(function).or_default().push(entry);
    }

    fn remove(&mut self, function: Address) -> Result<(), IoError> {
        self.by_function
            .remove(&function)
            .map(|_| ())
            .ok_or_else(|| IoError::Malformed { what: "override set", detail: format!("no overrides for {function:?}") })
    }

    fn clear(&mut self, function: Address) {
        self.by_function.remove(&function);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decompiler_core::{FlowOverrideKind, SpaceId};

    fn addr(off: u64) -> Address {
        Address::new(SpaceId(1), off)
    }

    #[test]
    fn append_then_get_returns_in_insertion_order() {
        let mut store = InMemoryOverrideStore::new();
        let f = addr(0x1000);
        store.append(f, Override::ForcedGoto { from: addr(0x10), to: addr(0x20) });
        store.append(f, Override::FlowKind { at: addr(0x30), kind: FlowOverrideKind::Call });
        let got = store.get(f).unwrap();
        assert_eq!(got.len(), 2);
        assert!(matches!(got[0], Override::ForcedGoto { .. }));
        assert!(matches!(got[1], Override::FlowKind { .. }));
    }

    #[test]
    fn get_on_unknown_function_is_none() {
        let store = InMemoryOverrideStore::new();
        assert!(store.get(addr(0xdead)).is_none());
    }

    #[test]
    fn remove_on_unknown_function_errors() {
        let mut store = InMemoryOverrideStore::new();
        assert!(store.remove(addr(0xdead)).is_err());
    }

    #[test]
    fn put_replaces_whole_set() {
        let mut store = InMemoryOverrideStore::new();
        let f = addr(0x2000);
        store.append(f, Override::ForcedGoto { from: addr(0x10), to: addr(0x20) });
        store.put(f, vec![Override::FlowKind { at: addr(0x30), kind: FlowOverrideKind::Return }]);
        let got = store.get(f).unwrap();
        assert_eq!(got.len(), 1);
        assert!(matches!(got[0], Override::FlowKind { .. }));
    }
}
