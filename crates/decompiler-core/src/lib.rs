//! decompiler-core: the p-code IR data model.
//!
//! Owns addresses and address spaces, Varnodes, PcodeOps, the datatype
//! lattice, symbols and scopes, the per-function IR store, and the
//! `Architecture` aggregate root. Dataflow/SSA construction, type
//! propagation, and control-flow structuring are built on top of this crate
//! in `decompiler-analysis` and `decompiler-structure`; this crate only
//! owns the data and the invariant-preserving mutation API over it.

pub mod address;
pub mod architecture;
pub mod block;
pub mod datatype;
pub mod error;
pub mod funcdata;
pub mod id;
pub mod opcode;
pub mod pcodeop;
pub mod seqnum;
pub mod store;
pub mod symbol;
pub mod varnode;

pub use address::{Address, AddressSpace, Endian, SpaceKind};
pub use architecture::{Architecture, ArchitectureConfig};
pub use block::{BasicBlock, BlockEdgeFlags, ConditionJoin, FlowBlockKind};
pub use datatype::{union_fields, Datatype, DisplayFormat, Field, Metatype, TypeId, TypeRegistry};
pub use error::{CoreError, DecompError};
pub use funcdata::{FlowOverrideKind, Funcdata, FuncdataFlags, Override};
pub use id::{BlockId, FunctionId, PcodeOpId, ScopeId, SpaceId, StructId, SymbolId, VarnodeId};
pub use opcode::{BranchKind, OpTypeEffect, Opcode};
pub use pcodeop::{PcodeOp, PcodeOpFlags};
pub use seqnum::{SeqNum, UNIQ_ANY};
pub use store::IrStore;
pub use symbol::{Scope, ScopeTree, Symbol, SymbolCategory, SymbolDirective, SymbolFlags};
pub use varnode::{Varnode, VarnodeFlags};
