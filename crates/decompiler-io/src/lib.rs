//! Serialization for decompiler IR (spec.md §6).
//!
//! The in-memory `Funcdata`/`IrStore` graph is the working representation;
//! this crate is what turns it into bytes and back. Two concerns live here:
//!
//! - A hand-rolled tagged element/attribute wire format ([`codec`],
//!   [`element`]) for `Varnode`/`PcodeOp`/`Address`/`Datatype` records. The
//!   wire shape (numeric element and attribute tags) is part of the
//!   specification, not an implementation detail, so it is not left to
//!   `serde`'s derive output.
//! - Deterministic content hashing ([`hash`]) so ids stay stable across
//!   independently-produced encodings of the same function.
//! - Persisted storage for the per-function [`Override`](decompiler_core::Override)
//!   set ([`overrides`]).
//!
//! # Modules
//!
//! - [`element`]: `ElementId`/`AttributeId` wire tag tables
//! - [`codec`]: `Encoder`/`Decoder` and the per-type encode/decode functions
//! - [`hash`]: content hashing for ops, datatypes, and whole functions
//! - [`overrides`]: persisted Override-set storage
//! - [`error`]: `IoError`

pub mod codec;
pub mod element;
pub mod error;
pub mod hash;
pub mod overrides;

pub use codec::{decode_address, decode_datatype, decode_pcodeop, decode_seqnum, decode_varnode};
pub use codec::{encode_address, encode_datatype, encode_pcodeop_fields, encode_seqnum, encode_varnode};
pub use codec::{Decoder, Encoder};
pub use element::{AttributeId, ElementId};
pub use error::IoError;
pub use hash::{hash_datatype, hash_function, hash_pcodeop};
pub use overrides::{InMemoryOverrideStore, OverrideStore};
