//! Encode/decode of core IR values into the element/attribute stream
//! (spec.md §6).
//!
//! Follows the decompose/recompose pair pattern used for persistence
//! elsewhere in this workspace: there, a graph flattened into row tuples
//! and back; here, a single IR value flattens into a tagged byte record
//! and back. Every `encode_*`/`decode_*` pair is round-trip tested
//! (spec.md §8).
//!
//! Wire shape: each record is `[ElementId tag][fields...]`, fields written
//! in a fixed order per element rather than as name/value attribute pairs,
//! to keep the format compact.

use indexmap::IndexMap;

use decompiler_core::{
    Address, Datatype, Field, Opcode, PcodeOpFlags, SeqNum, SpaceId, TypeId, Varnode, VarnodeFlags,
    VarnodeId,
};

use crate::element::ElementId;
use crate::error::IoError;

/// Every opcode in declaration order; the index into this table *is* the
/// wire-format discriminant. Kept as an explicit table (rather than
/// `Opcode as u32`, which would work today but silently renumber if a
/// variant were inserted mid-list) so the wire format's stability doesn't
/// depend on `decompiler-core`'s enum declaration order.
const OPCODES: &[Opcode] = &[
    Opcode::IntAdd,
    Opcode::IntSub,
    Opcode::IntMult,
    Opcode::IntDiv,
    Opcode::IntSDiv,
    Opcode::IntRem,
    Opcode::IntSRem,
    Opcode::IntCarry,
    Opcode::IntSCarry,
    Opcode::IntSBorrow,
    Opcode::Int2Comp,
    Opcode::IntNeg,
    Opcode::IntAnd,
    Opcode::IntOr,
    Opcode::IntXor,
    Opcode::IntNot,
    Opcode::IntLeft,
    Opcode::IntRight,
    Opcode::IntSRight,
    Opcode::IntEqual,
    Opcode::IntNotEqual,
    Opcode::IntLess,
    Opcode::IntSLess,
    Opcode::IntLessEqual,
    Opcode::IntSLessEqual,
    Opcode::IntZext,
    Opcode::IntSext,
    Opcode::BoolNegate,
    Opcode::BoolAnd,
    Opcode::BoolOr,
    Opcode::BoolXor,
    Opcode::FloatAdd,
    Opcode::FloatSub,
    Opcode::FloatMult,
    Opcode::FloatDiv,
    Opcode::FloatNeg,
    Opcode::FloatAbs,
    Opcode::FloatSqrt,
    Opcode::FloatEqual,
    Opcode::FloatNotEqual,
    Opcode::FloatLess,
    Opcode::FloatLessEqual,
    Opcode::FloatNan,
    Opcode::FloatInt2Float,
    Opcode::FloatFloat2Float,
    Opcode::FloatTrunc,
    Opcode::FloatCeil,
    Opcode::FloatFloor,
    Opcode::FloatRound,
    Opcode::Load,
    Opcode::Store,
    Opcode::Branch,
    Opcode::CBranch,
    Opcode::BranchInd,
    Opcode::Call,
    Opcode::CallInd,
    Opcode::CallOther,
    Opcode::Return,
    Opcode::Copy,
    Opcode::SubPiece,
    Opcode::Piece,
    Opcode::Cast,
    Opcode::PtrAdd,
    Opcode::PtrSub,
    Opcode::SegmentOp,
    Opcode::Multiequal,
    Opcode::Indirect,
];

fn opcode_tag(op: Opcode) -> u32 {
    OPCODES.iter().position(|&o| o == op).expect("OPCODES covers every Opcode variant") as u32
}

fn opcode_from_tag(tag: u32) -> Option<Opcode> {
    OPCODES.get(tag as usize).copied()
}

/// An append-only byte sink with varint helpers.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Encoder { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn varint(&mut self, mut v: u64) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
    }

    fn svarint(&mut self, v: i64) {
        let z = ((v << 1) ^ (v >> 63)) as u64;
        self.varint(z);
    }

    fn string(&mut self, s: &str) {
        self.varint(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn element(&mut self, id: ElementId) {
        self.u8(id.tag());
    }
}

/// A cursor over an encoded byte stream.
pub struct Decoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Decoder { buf, pos: 0 }
    }

    fn u8(&mut self) -> Result<u8, IoError> {
        let b = *self.buf.get(self.pos).ok_or(IoError::UnexpectedEof("u8"))?;
        self.pos += 1;
        Ok(b)
    }

    fn varint(&mut self) -> Result<u64, IoError> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.u8()?;
            result |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
        Ok(result)
    }

    fn svarint(&mut self) -> Result<i64, IoError> {
        let z = self.varint()?;
        Ok(((z >> 1) as i64) ^ -((z & 1) as i64))
    }

    fn string(&mut self) -> Result<String, IoError> {
        let len = self.varint()? as usize;
        let end = self.pos + len;
        let bytes = self.buf.get(self.pos..end).ok_or(IoError::UnexpectedEof("string"))?;
        self.pos = end;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| IoError::Malformed { what: "utf8 string", detail: e.to_string() })
    }

    fn element(&mut self) -> Result<ElementId, IoError> {
        let tag = self.u8()?;
        ElementId::from_tag(tag).ok_or(IoError::UnknownElement(tag))
    }

    fn expect(&mut self, expected: ElementId) -> Result<(), IoError> {
        let found = self.element()?;
        if found != expected {
            return Err(IoError::UnexpectedElement { expected: expected.tag(), found: found.tag() });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Address / SeqNum
// ---------------------------------------------------------------------------

pub fn encode_address(enc: &mut Encoder, addr: &Address) {
    enc.element(ElementId::Address);
    enc.varint(addr.space.0 as u64);
    enc.varint(addr.offset);
}

pub fn decode_address(dec: &mut Decoder) -> Result<Address, IoError> {
    dec.expect(ElementId::Address)?;
    let space = SpaceId(dec.varint()? as u32);
    let offset = dec.varint()?;
    Ok(Address::new(space, offset))
}

pub fn encode_seqnum(enc: &mut Encoder, seq: &SeqNum) {
    enc.element(ElementId::SeqNum);
    encode_address(enc, &seq.address);
    enc.varint(seq.uniq as u64);
}

pub fn decode_seqnum(dec: &mut Decoder) -> Result<SeqNum, IoError> {
    dec.expect(ElementId::SeqNum)?;
    let address = decode_address(dec)?;
    let uniq = dec.varint()? as u32;
    Ok(SeqNum { address, uniq })
}

// ---------------------------------------------------------------------------
// Varnode
// ---------------------------------------------------------------------------

/// Flattened form of a `Varnode`: descendants and `creation_index` are
/// function-local bookkeeping reconstructed by the IR store on load, not
/// part of the wire record (the same row-shaped flattening used
/// elsewhere in this workspace never serializes derived adjacency
/// either).
pub fn encode_varnode(enc: &mut Encoder, vn: &Varnode) {
    enc.element(ElementId::Varnode);
    encode_address(enc, &vn.address);
    enc.varint(vn.size as u64);
    enc.varint(vn.datatype.0 as u64);
    enc.varint(vn.flags.bits() as u64);
}

pub fn decode_varnode(dec: &mut Decoder) -> Result<Varnode, IoError> {
    dec.expect(ElementId::Varnode)?;
    let address = decode_address(dec)?;
    let size = dec.varint()? as u32;
    let datatype = TypeId(dec.varint()? as u32);
    let flags_bits = dec.varint()? as u32;
    let flags = VarnodeFlags::from_bits_truncate(flags_bits);
    let mut vn = Varnode::new_free(address, size, datatype, 0);
    vn.flags = flags;
    Ok(vn)
}

// ---------------------------------------------------------------------------
// PcodeOp
// ---------------------------------------------------------------------------

pub fn encode_pcodeop_fields(
    enc: &mut Encoder,
    seq: &SeqNum,
    opcode: Opcode,
    flags: PcodeOpFlags,
    inputs: &[VarnodeId],
    output: Option<VarnodeId>,
) {
    enc.element(ElementId::PcodeOp);
    encode_seqnum(enc, seq);
    enc.varint(opcode_tag(opcode) as u64);
    enc.varint(flags.bits() as u64);
    enc.varint(inputs.len() as u64);
    for input in inputs {
        enc.varint(input.0 as u64);
    }
    match output {
        Some(vid) => {
            enc.u8(1);
            enc.varint(vid.0 as u64);
        }
        None => enc.u8(0),
    }
}

pub struct DecodedPcodeOp {
    pub seq: SeqNum,
    pub opcode: Opcode,
    pub flags: PcodeOpFlags,
    pub inputs: Vec<VarnodeId>,
    pub output: Option<VarnodeId>,
}

pub fn decode_pcodeop(dec: &mut Decoder) -> Result<DecodedPcodeOp, IoError> {
    dec.expect(ElementId::PcodeOp)?;
    let seq = decode_seqnum(dec)?;
    let opcode_num = dec.varint()?;
    let opcode = opcode_from_tag(opcode_num as u32)
        .ok_or_else(|| IoError::Malformed { what: "opcode", detail: opcode_num.to_string() })?;
    let flags = PcodeOpFlags::from_bits_truncate(dec.varint()? as u32);
    let n_inputs = dec.varint()? as usize;
    let mut inputs = Vec::with_capacity(n_inputs);
    for _ in 0..n_inputs {
        inputs.push(VarnodeId(dec.varint()? as u32));
    }
    let has_output = dec.u8()? != 0;
    let output = if has_output { Some(VarnodeId(dec.varint()? as u32)) } else { None };
    Ok(DecodedPcodeOp { seq, opcode, flags, inputs, output })
}

// ---------------------------------------------------------------------------
// Datatype
// ---------------------------------------------------------------------------

const DT_VOID: u8 = 0;
const DT_UNKNOWN: u8 = 1;
const DT_BOOL: u8 = 2;
const DT_INT: u8 = 3;
const DT_UINT: u8 = 4;
const DT_FLOAT: u8 = 5;
const DT_CODE: u8 = 6;
const DT_PTR: u8 = 7;
const DT_PTR_RELATIVE: u8 = 8;
const DT_ARRAY: u8 = 9;
const DT_STRUCT: u8 = 10;
const DT_UNION: u8 = 11;
const DT_PARTIAL_UNION: u8 = 12;
const DT_TYPEDEF: u8 = 13;

pub fn encode_datatype(enc: &mut Encoder, ty: &Datatype) {
    enc.element(ElementId::Datatype);
    match ty {
        Datatype::Void => enc.u8(DT_VOID),
        Datatype::Unknown { size } => {
            enc.u8(DT_UNKNOWN);
            enc.varint(*size as u64);
        }
        Datatype::Bool => enc.u8(DT_BOOL),
        Datatype::Int { size } => {
            enc.u8(DT_INT);
            enc.varint(*size as u64);
        }
        Datatype::Uint { size } => {
            enc.u8(DT_UINT);
            enc.varint(*size as u64);
        }
        Datatype::Float { size } => {
            enc.u8(DT_FLOAT);
            enc.varint(*size as u64);
        }
        Datatype::Code => enc.u8(DT_CODE),
        Datatype::Ptr { pointee, word_size } => {
            enc.u8(DT_PTR);
            enc.varint(pointee.0 as u64);
            enc.varint(*word_size as u64);
        }
        Datatype::PtrRelative { pointee, parent, offset } => {
            enc.u8(DT_PTR_RELATIVE);
            enc.varint(pointee.0 as u64);
            enc.varint(parent.0 as u64);
            enc.svarint(*offset);
        }
        Datatype::Array { element, length } => {
            enc.u8(DT_ARRAY);
            enc.varint(element.0 as u64);
            enc.varint(*length as u64);
        }
        Datatype::Struct { name, size, fields } => {
            enc.u8(DT_STRUCT);
            enc.string(name);
            enc.varint(*size as u64);
            encode_fields(enc, fields);
        }
        Datatype::Union { name, size, fields } => {
            enc.u8(DT_UNION);
            enc.string(name);
            enc.varint(*size as u64);
            encode_fields(enc, fields);
        }
        Datatype::PartialUnion { parent, offset, size } => {
            enc.u8(DT_PARTIAL_UNION);
            enc.varint(parent.0 as u64);
            enc.varint(*offset as u64);
            enc.varint(*size as u64);
        }
        Datatype::Typedef { name, underlying } => {
            enc.u8(DT_TYPEDEF);
            enc.string(name);
            enc.varint(underlying.0 as u64);
        }
    }
}

fn encode_fields(enc: &mut Encoder, fields: &IndexMap<String, Field>) {
    enc.varint(fields.len() as u64);
    for (name, field) in fields.iter() {
        enc.string(name);
        enc.varint(field.offset as u64);
        enc.varint(field.type_id.0 as u64);
    }
}

pub fn decode_datatype(dec: &mut Decoder) -> Result<Datatype, IoError> {
    dec.expect(ElementId::Datatype)?;
    let disc = dec.u8()?;
    Ok(match disc {
        DT_VOID => Datatype::Void,
        DT_UNKNOWN => Datatype::Unknown { size: dec.varint()? as u32 },
        DT_BOOL => Datatype::Bool,
        DT_INT => Datatype::Int { size: dec.varint()? as u32 },
        DT_UINT => Datatype::Uint { size: dec.varint()? as u32 },
        DT_FLOAT => Datatype::Float { size: dec.varint()? as u32 },
        DT_CODE => Datatype::Code,
        DT_PTR => Datatype::Ptr {
            pointee: TypeId(dec.varint()? as u32),
            word_size: dec.varint()? as u32,
        },
        DT_PTR_RELATIVE => Datatype::PtrRelative {
            pointee: TypeId(dec.varint()? as u32),
            parent: TypeId(dec.varint()? as u32),
            offset: dec.svarint()?,
        },
        DT_ARRAY => Datatype::Array {
            element: TypeId(dec.varint()? as u32),
            length: dec.varint()? as u32,
        },
        DT_STRUCT => {
            let name = dec.string()?;
            let size = dec.varint()? as u32;
            let fields = decode_fields(dec)?;
            Datatype::Struct { name, size, fields }
        }
        DT_UNION => {
            let name = dec.string()?;
            let size = dec.varint()? as u32;
            let fields = decode_fields(dec)?;
            Datatype::Union { name, size, fields }
        }
        DT_PARTIAL_UNION => Datatype::PartialUnion {
            parent: TypeId(dec.varint()? as u32),
            offset: dec.varint()? as u32,
            size: dec.varint()? as u32,
        },
        DT_TYPEDEF => Datatype::Typedef {
            name: dec.string()?,
            underlying: TypeId(dec.varint()? as u32),
        },
        other => {
            return Err(IoError::Malformed { what: "datatype discriminant", detail: other.to_string() })
        }
    })
}

fn decode_fields(dec: &mut Decoder) -> Result<IndexMap<String, Field>, IoError> {
    let n = dec.varint()? as usize;
    let mut fields = IndexMap::new();
    for _ in 0..n {
        let name = dec.string()?;
        let offset = dec.varint()? as u32;
        let type_id = TypeId(dec.varint()? as u32);
        fields.insert(name.clone(), Field { name, offset, type_id });
    }
    Ok(fields)
}
