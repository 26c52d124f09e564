//! Stable element/attribute tag tables for the wire format (spec.md §6).
//!
//! Follows the migration-id-registry pattern used for schema versioning
//! elsewhere in this workspace: there, a numeric version identified a
//! schema revision; here a numeric tag identifies which kind of value a
//! stream record holds. Tags are assigned once and never renumbered, so
//! older encoded streams keep decoding correctly as new element kinds are
//! appended.

/// Tags identifying the kind of structured value a record in the stream
/// encodes. One element per encodable IR entity (spec.md §6: "Varnodes,
/// PcodeOps, Addresses, Datatypes, function prototypes, overrides").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ElementId {
    Address = 1,
    Varnode = 2,
    PcodeOp = 3,
    Datatype = 4,
    Prototype = 5,
    Override = 6,
    SeqNum = 7,
}

impl ElementId {
    pub fn from_tag(tag: u8) -> Option<ElementId> {
        Some(match tag {
            1 => ElementId::Address,
            2 => ElementId::Varnode,
            3 => ElementId::PcodeOp,
            4 => ElementId::Datatype,
            5 => ElementId::Prototype,
            6 => ElementId::Override,
            7 => ElementId::SeqNum,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Tags identifying a scalar field within an element record. Shared across
/// elements: `Space`/`Offset` appear inside both `Address` and `SeqNum`
/// records, for instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeId {
    Space = 1,
    Offset = 2,
    Size = 3,
    Uniq = 4,
    Opcode = 5,
    Flags = 6,
    Metatype = 7,
    Name = 8,
    FieldOffset = 9,
    DiscriminantCount = 10,
}

impl AttributeId {
    pub fn from_tag(tag: u8) -> Option<AttributeId> {
        Some(match tag {
            1 => AttributeId::Space,
            2 => AttributeId::Offset,
            3 => AttributeId::Size,
            4 => AttributeId::Uniq,
            5 => AttributeId::Opcode,
            6 => AttributeId::Flags,
            7 => AttributeId::Metatype,
            8 => AttributeId::Name,
            9 => AttributeId::FieldOffset,
            10 => AttributeId::DiscriminantCount,
            _ => return None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_tags_round_trip() {
        for e in [
            ElementId::Address,
            ElementId::Varnode,
            ElementId::PcodeOp,
            ElementId::Datatype,
            ElementId::Prototype,
            ElementId::Override,
            ElementId::SeqNum,
        ] {
            assert_eq!(ElementId::from_tag(e.tag()), Some(e));
        }
    }

    #[test]
    fn unknown_tag_is_none() {
        assert_eq!(ElementId::from_tag(200), None);
        assert_eq!(AttributeId::from_tag(200), None);
    }
}
