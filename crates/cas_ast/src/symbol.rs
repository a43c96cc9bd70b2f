//! Name interning for unknowns, units, placeholders and functions.
//!
//! The arena hash-conses `Expr::Symbol` / `Expr::Function` nodes by a plain
//! integer, so every name is stored exactly once.

use rustc_hash::FxHashMap;

/// Index of an interned name.
pub type SymbolId = usize;

/// Interned names owned by a `Context`. Builtin function names are interned
/// first, so their ids are stable across contexts.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: Vec<Box<str>>,
    ids: FxHashMap<Box<str>, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len();
        self.names.push(name.into());
        self.ids.insert(name.into(), id);
        id
    }

    /// Name of an interned id. Ids only come from `intern` on the same
    /// table, so the index is always in range.
    #[inline]
    pub fn resolve(&self, id: SymbolId) -> &str {
        &self.names[id]
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<SymbolId> {
        self.ids.get(name).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
