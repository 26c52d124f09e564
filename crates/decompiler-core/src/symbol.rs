//! Symbols and the scope tree.
//!
//! Symbols bind names to storage; scopes form a tree rooted at the global
//! scope, with each function owning a local scope for its parameters and
//! locals (spec.md §3).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::datatype::{DisplayFormat, TypeId};
use crate::id::{ScopeId, SymbolId};

bitflags! {
    /// Boolean properties a Symbol may carry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SymbolFlags: u32 {
        /// The symbol's type must not be overwritten by the propagator.
        const TYPELOCK   = 1 << 0;
        /// The symbol's name must not be changed by renaming tools.
        const NAMELOCK   = 1 << 1;
        /// Suppresses speculative merging of Varnodes across this symbol.
        const ISOLATED   = 1 << 2;
    }
}

/// The role a symbol plays, used by the printer and the prototype model to
/// decide placement and formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolCategory {
    Local,
    FunctionParameter,
    Global,
    Equate,
}

/// A directive controlling how this symbol's value is printed or how a
/// union access through it should be resolved, beyond the plain
/// `DisplayFormat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SymbolDirective {
    /// Forces integer display in the given format.
    Convert(DisplayFormat),
    /// Equates this symbol's constant value to a named enumeration member.
    Equate { name: String },
    /// Pins a union access through this symbol to a specific field name.
    UnionFacet { field: String },
}

/// Binds a name to a storage location and a type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub scope: ScopeId,
    pub type_id: TypeId,
    pub storage: Address,
    pub size: u32,
    pub flags: SymbolFlags,
    pub category: SymbolCategory,
    pub directives: Vec<SymbolDirective>,
}

impl Symbol {
    pub fn new(
        id: SymbolId,
        name: impl Into<String>,
        scope: ScopeId,
        type_id: TypeId,
        storage: Address,
        size: u32,
        category: SymbolCategory,
    ) -> Self {
        Symbol {
            id,
            name: name.into(),
            scope,
            type_id,
            storage,
            size,
            flags: SymbolFlags::empty(),
            category,
            directives: Vec::new(),
        }
    }

    pub fn is_typelocked(&self) -> bool {
        self.flags.contains(SymbolFlags::TYPELOCK)
    }

    pub fn is_namelocked(&self) -> bool {
        self.flags.contains(SymbolFlags::NAMELOCK)
    }

    pub fn is_isolated(&self) -> bool {
        self.flags.contains(SymbolFlags::ISOLATED)
    }
}

/// A node in the scope tree. The global scope has no parent; a function's
/// local scope holds its parameter and local symbols.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub id: ScopeId,
    pub name: String,
    pub parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    symbols: Vec<SymbolId>,
}

impl Scope {
    pub fn new(id: ScopeId, name: impl Into<String>, parent: Option<ScopeId>) -> Self {
        Scope {
            id,
            name: name.into(),
            parent,
            children: Vec::new(),
            symbols: Vec::new(),
        }
    }

    pub fn is_global(&self) -> bool {
        self.parent.is_none()
    }

    pub fn add_child(&mut self, child: ScopeId) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    pub fn add_symbol(&mut self, symbol: SymbolId) {
        self.symbols.push(symbol);
    }

    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }
}

/// The scope tree for one `Architecture`: a global scope plus one local
/// scope per decompiled function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    global: ScopeId,
}

impl ScopeTree {
    pub fn new() -> Self {
        let global = Scope::new(ScopeId(0), "global", None);
        ScopeTree {
            scopes: vec![global],
            symbols: Vec::new(),
            global: ScopeId(0),
        }
    }

    pub fn global(&self) -> ScopeId {
        self.global
    }

    pub fn new_scope(&mut self, name: impl Into<String>, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(id, name, Some(parent)));
        if let Some(p) = self.scopes.get_mut(parent.0 as usize) {
            p.add_child(id);
        }
        id
    }

    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(id.0 as usize)
    }

    pub fn add_symbol(&mut self, mut symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        symbol.id = id;
        let scope = symbol.scope;
        self.symbols.push(symbol);
        if let Some(s) = self.scopes.get_mut(scope.0 as usize) {
            s.add_symbol(id);
        }
        id
    }

    pub fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0 as usize)
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> Option<&mut Symbol> {
        self.symbols.get_mut(id.0 as usize)
    }

    /// Walks from `scope` up through its ancestors looking for a symbol
    /// named `name`, the way a lexical lookup resolves shadowing.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut cur = Some(scope);
        while let Some(id) = cur {
            let s = self.scope(id)?;
            if let Some(found) = s
                .symbols()
                .iter()
                .find(|sid| self.symbol(**sid).map(|sym| sym.name == name).unwrap_or(false))
            {
                return Some(*found);
            }
            cur = s.parent;
        }
        None
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
