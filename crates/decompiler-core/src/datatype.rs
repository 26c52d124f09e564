//! The datatype lattice and type registry.
//!
//! Every type has a unique [`TypeId`] giving O(1) nominal identity
//! comparison. The [`TypeRegistry`] owns all `Datatype` values and
//! pre-registers the fixed-size scalars, `void`, and `unknown` on
//! construction -- mirroring the built-in-slot pattern used for scalar types,
//! generalized to the full metatype lattice of spec.md §3.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Unique identifier for a type in a [`TypeRegistry`].
///
/// The inner value is an index into the registry's type vector, so identity
/// comparison is a plain integer compare regardless of how deeply two types
/// are structurally nested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// The coarse classification every [`Datatype`] reduces to. Used by the
/// propagator's lattice join and by `ScoreUnionFields`' scoring table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metatype {
    Unknown,
    Void,
    Int,
    Uint,
    Bool,
    Code,
    Float,
    Ptr,
    Array,
    Struct,
    Union,
}

/// A display-format directive attached to a Varnode or Symbol, controlling
/// how an integer constant is printed. Values match spec.md §6's fixed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayFormat {
    Hex = 1,
    Dec = 2,
    Oct = 3,
    Bin = 4,
    Char = 5,
}

/// One field of a struct or union: an offset (bytes, from the start of the
/// composite), a name, and the field's own type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub offset: u32,
    pub type_id: TypeId,
}

/// The datatype lattice of spec.md §3: void, bool, int, uint, float, code,
/// ptr, ptr-relative, array, struct, union, partial-union, typedef, unknown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Datatype {
    Void,
    Unknown { size: u32 },
    Bool,
    Int { size: u32 },
    Uint { size: u32 },
    Float { size: u32 },
    /// An executable address's type (function/label targets).
    Code,
    Ptr { pointee: TypeId, word_size: u32 },
    /// A pointer known to point somewhere inside a larger object, carrying
    /// the containing type and the constant byte offset into it.
    PtrRelative {
        pointee: TypeId,
        parent: TypeId,
        offset: i64,
    },
    Array { element: TypeId, length: u32 },
    Struct {
        name: String,
        size: u32,
        fields: IndexMap<String, Field>,
    },
    Union {
        name: String,
        size: u32,
        fields: IndexMap<String, Field>,
    },
    /// A sized window into a parent union, used when only part of the union
    /// is accessed through a given Varnode (spec.md §3, "partial union").
    PartialUnion {
        parent: TypeId,
        offset: u32,
        size: u32,
    },
    Typedef { name: String, underlying: TypeId },
}

impl Datatype {
    pub fn metatype(&self) -> Metatype {
        match self {
            Datatype::Void => Metatype::Void,
            Datatype::Unknown { .. } => Metatype::Unknown,
            Datatype::Bool => Metatype::Bool,
            Datatype::Int { .. } => Metatype::Int,
            Datatype::Uint { .. } => Metatype::Uint,
            Datatype::Float { .. } => Metatype::Float,
            Datatype::Code => Metatype::Code,
            Datatype::Ptr { .. } | Datatype::PtrRelative { .. } => Metatype::Ptr,
            Datatype::Array { .. } => Metatype::Array,
            Datatype::Struct { .. } => Metatype::Struct,
            Datatype::Union { .. } | Datatype::PartialUnion { .. } => Metatype::Union,
            Datatype::Typedef { .. } => Metatype::Unknown,
        }
    }

    /// Size in bytes, where meaningful; `0` for `Void`.
    pub fn size(&self, reg: &TypeRegistry) -> u32 {
        match self {
            Datatype::Void => 0,
            Datatype::Unknown { size } => *size,
            Datatype::Bool => 1,
            Datatype::Int { size } | Datatype::Uint { size } | Datatype::Float { size } => *size,
            Datatype::Code => 1,
            Datatype::Ptr { word_size, .. } => *word_size,
            Datatype::PtrRelative { .. } => reg
                .get(reg.pointer_word_size_type())
                .map(|d| d.size(reg))
                .unwrap_or(0),
            Datatype::Array { element, length } => {
                reg.get(*element).map(|d| d.size(reg)).unwrap_or(0) * length
            }
            Datatype::Struct { size, .. } | Datatype::Union { size, .. } => *size,
            Datatype::PartialUnion { size, .. } => *size,
            Datatype::Typedef { underlying, .. } => {
                reg.get(*underlying).map(|d| d.size(reg)).unwrap_or(0)
            }
        }
    }

    pub fn is_union_like(&self) -> bool {
        matches!(self, Datatype::Union { .. } | Datatype::PartialUnion { .. })
    }
}

/// Fields a union-like [`Datatype`] exposes, in declaration order, resolving
/// through `PartialUnion` to the owning union's fields that fall within its
/// window.
pub fn union_fields<'a>(ty: &'a Datatype, reg: &'a TypeRegistry) -> Vec<(&'a str, &'a Field)> {
    match ty {
        Datatype::Union { fields, .. } => fields.iter().map(|(n, f)| (n.as_str(), f)).collect(),
        Datatype::PartialUnion {
            parent,
            offset,
            size,
        } => match reg.get(*parent) {
            Some(Datatype::Union { fields, .. }) => fields
                .iter()
                .filter(|(_, f)| f.offset >= *offset && f.offset < *offset + *size)
                .map(|(n, f)| (n.as_str(), f))
                .collect(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Registry of every `Datatype` in an `Architecture`, providing nominal
/// identity via `TypeId`.
///
/// Pre-registered on construction: `void`, `bool`, signed/unsigned int at
/// common sizes, `float`/`double`, and an `unknown` catch-all sized to a
/// pointer word.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRegistry {
    types: Vec<Datatype>,
    names: HashMap<String, TypeId>,
    next_id: u32,
}

impl TypeId {
    pub const VOID: TypeId = TypeId(0);
    pub const BOOL: TypeId = TypeId(1);
    pub const INT1: TypeId = TypeId(2);
    pub const INT2: TypeId = TypeId(3);
    pub const INT4: TypeId = TypeId(4);
    pub const INT8: TypeId = TypeId(5);
    pub const UINT1: TypeId = TypeId(6);
    pub const UINT2: TypeId = TypeId(7);
    pub const UINT4: TypeId = TypeId(8);
    pub const UINT8: TypeId = TypeId(9);
    pub const FLOAT4: TypeId = TypeId(10);
    pub const FLOAT8: TypeId = TypeId(11);
    pub const CODE: TypeId = TypeId(12);
    pub const UNKNOWN8: TypeId = TypeId(13);
}

impl TypeRegistry {
    const BUILTIN_COUNT: u32 = 14;

    pub fn new() -> Self {
        let types = vec![
            Datatype::Void,
            Datatype::Bool,
            Datatype::Int { size: 1 },
            Datatype::Int { size: 2 },
            Datatype::Int { size: 4 },
            Datatype::Int { size: 8 },
            Datatype::Uint { size: 1 },
            Datatype::Uint { size: 2 },
            Datatype::Uint { size: 4 },
            Datatype::Uint { size: 8 },
            Datatype::Float { size: 4 },
            Datatype::Float { size: 8 },
            Datatype::Code,
            Datatype::Unknown { size: 8 },
        ];

        TypeRegistry {
            types,
            names: HashMap::new(),
            next_id: Self::BUILTIN_COUNT,
        }
    }

    pub fn register(&mut self, ty: Datatype) -> TypeId {
        let id = TypeId(self.next_id);
        self.types.push(ty);
        self.next_id += 1;
        id
    }

    /// Registers a named type (struct, union, typedef). Errors if the name
    /// is already taken.
    pub fn register_named(&mut self, name: &str, ty: Datatype) -> Result<TypeId, CoreError> {
        if self.names.contains_key(name) {
            return Err(CoreError::DuplicateTypeName {
                name: name.to_string(),
            });
        }
        let id = self.register(ty);
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn get(&self, id: TypeId) -> Option<&Datatype> {
        self.types.get(id.0 as usize)
    }

    pub fn get_by_name(&self, name: &str) -> Option<TypeId> {
        self.names.get(name).copied()
    }

    /// The registry's notion of a pointer-sized word, used when sizing a
    /// `PtrRelative` whose own pointee isn't directly queryable.
    pub fn pointer_word_size_type(&self) -> TypeId {
        TypeId::UNKNOWN8
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
