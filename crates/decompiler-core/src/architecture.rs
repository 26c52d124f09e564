//! Architecture: the process-local, explicitly-passed aggregate root.
//!
//! Per spec.md §9's "global state" design note, there is no hidden
//! singleton: every entry point that needs the type registry, scope tree,
//! space table, or function set receives `&Architecture`/`&mut Architecture`
//! explicitly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::address::{AddressSpace, Endian, SpaceKind};
use crate::datatype::TypeRegistry;
use crate::error::CoreError;
use crate::funcdata::Funcdata;
use crate::id::{FunctionId, SpaceId};
use crate::symbol::ScopeTree;

/// Immutable-after-setup configuration for an `Architecture`: default
/// endianness, default pointer size, and the unique-space word size used
/// when minting SSA temporaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    pub default_endian: Endian,
    pub default_address_size: u32,
    pub processor_id: String,
}

impl Default for ArchitectureConfig {
    fn default() -> Self {
        ArchitectureConfig {
            default_endian: Endian::Little,
            default_address_size: 8,
            processor_id: "generic".to_string(),
        }
    }
}

/// The top-level aggregate: address-space table, type registry, scope tree,
/// and the set of functions under analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Architecture {
    pub config: ArchitectureConfig,
    spaces: Vec<AddressSpace>,
    pub types: TypeRegistry,
    pub scopes: ScopeTree,
    functions: HashMap<FunctionId, Funcdata>,
    next_function_id: u32,
    constant_space: SpaceId,
    unique_space: SpaceId,
}

impl Architecture {
    pub fn new(config: ArchitectureConfig) -> Self {
        let constant_space = SpaceId(0);
        let unique_space = SpaceId(1);
        let spaces = vec![
            AddressSpace::new(
                constant_space,
                "const",
                '#',
                1,
                config.default_address_size,
                config.default_endian,
                SpaceKind::Constant,
            ),
            AddressSpace::new(
                unique_space,
                "unique",
                'u',
                1,
                config.default_address_size,
                config.default_endian,
                SpaceKind::Internal,
            ),
        ];
        Architecture {
            config,
            spaces,
            types: TypeRegistry::new(),
            scopes: ScopeTree::new(),
            functions: HashMap::new(),
            next_function_id: 0,
            constant_space,
            unique_space,
        }
    }

    pub fn constant_space(&self) -> SpaceId {
        self.constant_space
    }

    pub fn unique_space(&self) -> SpaceId {
        self.unique_space
    }

    pub fn add_space(&mut self, space: AddressSpace) -> SpaceId {
        let id = SpaceId(self.spaces.len() as u32);
        let mut space = space;
        space.id = id;
        self.spaces.push(space);
        id
    }

    pub fn space(&self, id: SpaceId) -> Result<&AddressSpace, CoreError> {
        self.spaces
            .get(id.0 as usize)
            .ok_or(CoreError::SpaceNotFound { id })
    }

    /// Creates a function symbol at `entry`, registering a local scope and
    /// an empty `Funcdata`. Raising p-code for it happens separately (the
    /// flow-follow step is owned by the decompile orchestration, which
    /// consumes a loader this crate does not implement -- spec.md §1).
    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        entry: crate::address::Address,
        size: u32,
    ) -> FunctionId {
        let id = FunctionId(self.next_function_id);
        self.next_function_id += 1;
        let name = name.into();
        let local_scope = self.scopes.new_scope(name.clone(), self.scopes.global());
        let fd = Funcdata::new(id, name, entry, size, local_scope, self.unique_space);
        self.functions.insert(id, fd);
        id
    }

    pub fn function(&self, id: FunctionId) -> Result<&Funcdata, CoreError> {
        self.functions
            .get(&id)
            .ok_or(CoreError::FunctionNotFound { id })
    }

    pub fn function_mut(&mut self, id: FunctionId) -> Result<&mut Funcdata, CoreError> {
        self.functions
            .get_mut(&id)
            .ok_or(CoreError::FunctionNotFound { id })
    }

    /// Borrows one function mutably alongside the (read-only) type registry
    /// -- split-field access so a caller can run the Action/Rule driver
    /// (which needs both at once) without `Funcdata` holding a back-reference
    /// to its owning `Architecture` (spec.md §9's "global state" note).
    pub fn function_and_types_mut(&mut self, id: FunctionId) -> Result<(&mut Funcdata, &TypeRegistry), CoreError> {
        let fd = self
            .functions
            .get_mut(&id)
            .ok_or(CoreError::FunctionNotFound { id })?;
        Ok((fd, &self.types))
    }

    pub fn function_ids(&self) -> impl Iterator<Item = &FunctionId> {
        self.functions.keys()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Releases a function entirely -- `dispose(fd)` of spec.md §5.
    pub fn dispose_function(&mut self, id: FunctionId) -> Result<(), CoreError> {
        self.functions
            .remove(&id)
            .map(|_| ())
            .ok_or(CoreError::FunctionNotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;

    #[test]
    fn new_architecture_has_constant_and_unique_spaces() {
        let arch = Architecture::new(ArchitectureConfig::default());
        assert!(arch.space(arch.constant_space()).unwrap().is_constant());
        assert!(arch.space(arch.unique_space()).unwrap().is_unique());
    }

    #[test]
    fn add_function_creates_local_scope_under_global() {
        let mut arch = Architecture::new(ArchitectureConfig::default());
        let fid = arch.add_function("main", Address::new(arch.constant_space(), 0x1000), 64);
        let fd = arch.function(fid).unwrap();
        let scope = arch.scopes.scope(fd.local_scope).unwrap();
        assert_eq!(scope.parent, Some(arch.scopes.global()));
    }

    #[test]
    fn dispose_function_removes_it() {
        let mut arch = Architecture::new(ArchitectureConfig::default());
        let fid = arch.add_function("f", Address::new(arch.constant_space(), 0), 0);
        arch.dispose_function(fid).unwrap();
        assert!(arch.function(fid).is_err());
    }

    #[test]
    fn unknown_space_lookup_errors() {
        let arch = Architecture::new(ArchitectureConfig::default());
        assert!(arch.space(SpaceId(99)).is_err());
    }
}
